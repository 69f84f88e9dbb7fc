//! datesort - sort a flat folder of files into year/month subdirectories
//!
//! This library scans a directory for files of one category (images,
//! documents or everything), dates each file (EXIF capture time, last access
//! or last write time), orders them oldest first and moves or copies them into
//! `<root>/<year>/<month name>/`. The first failing file stops the run.

pub mod cli;
pub mod config;
pub mod date_resolver;
pub mod destination;
pub mod executor;
pub mod file_category;
pub mod output;
pub mod scanner;

pub use config::{CompiledFilters, ConfigError, SortConfig};
pub use date_resolver::DateResolver;
pub use destination::{Destination, DestinationResolver, LocaleMonthNames, MonthNaming};
pub use executor::{
    AbortReason, BatchExecutor, Confirmation, ExecutionFault, ExecutionOutcome, ExecutionRequest,
    FileProgress, ProgressReporter, RunError, RunOutcome, RunState, SilentReporter,
};
pub use file_category::FileCategory;
pub use scanner::{CandidateFile, FileScanner, ScanError};

pub use cli::{Args, run_cli};
