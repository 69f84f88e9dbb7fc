//! Batch execution of a sort run.
//!
//! A run moves through a small state machine:
//!
//! ```text
//! Idle -> Confirmed -> Running -> Completed
//!                         \-> Faulted
//! Idle -> Aborted   (no candidates, or the user declined)
//! ```
//!
//! Candidates are processed strictly in scan order. The first failure stops
//! the run; files that were already handled stay where they are and the fault
//! names the file and destination folder that failed so the user can inspect
//! the tree before running again.
//!
//! The existence check used for skipping and the move/copy itself are not
//! atomic with respect to other processes writing into the destination tree.
//! A file appearing in between is reported as a fault by the operation.

use crate::destination::{Destination, DestinationResolver};
use crate::file_category::FileCategory;
use crate::scanner::{CandidateFile, FileScanner, ScanError};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Parameters of one sort run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Directory the files are read from.
    pub source: PathBuf,
    /// Root of the year/month tree. Defaults to `source` when `None`.
    pub destination: Option<PathBuf>,
    pub category: FileCategory,
    /// Report every file instead of a progress bar.
    pub verbose: bool,
    /// Copy files instead of moving them.
    pub copy: bool,
    /// Leave files alone whose destination already exists.
    pub skip_existing: bool,
}

impl ExecutionRequest {
    /// A move run over `source` with every flag off.
    pub fn new(source: impl Into<PathBuf>, category: FileCategory) -> Self {
        Self {
            source: source.into(),
            destination: None,
            category,
            verbose: false,
            copy: false,
            skip_existing: false,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// The root the year/month folders are created in.
    pub fn destination_root(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.source)
    }
}

/// Aggregate result of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Number of candidates found by the scan.
    pub found: usize,
    /// Number of files moved or copied.
    pub handled: usize,
    /// Number of files left alone because their destination existed.
    pub skipped: usize,
    /// Wall-clock time spent processing candidates.
    pub elapsed: Duration,
    /// Whether files were copied rather than moved.
    pub copied: bool,
}

impl ExecutionOutcome {
    fn empty(copied: bool) -> Self {
        Self {
            found: 0,
            handled: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
            copied,
        }
    }
}

/// Why a run stopped before processing any file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The scan found no matching files. The user is not asked.
    NoCandidates,
    /// The user declined the confirmation prompt.
    Declined,
}

/// How a run ended, short of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ExecutionOutcome),
    Aborted {
        reason: AbortReason,
        /// Zero handled and zero skipped, with `found` set to the scan size.
        outcome: ExecutionOutcome,
    },
}

impl RunOutcome {
    pub fn outcome(&self) -> &ExecutionOutcome {
        match self {
            RunOutcome::Completed(outcome) | RunOutcome::Aborted { outcome, .. } => outcome,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// States a run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Confirmed,
    Running,
    Completed,
    Faulted,
    Aborted,
}

/// The step of processing a candidate that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStage {
    CreateFolder,
    Move,
    Copy,
}

/// A failure while processing one candidate. Raising it halts the run.
#[derive(Debug, Error)]
#[error("{}: {source}", fault_message(.stage, .file, .destination_folder))]
pub struct ExecutionFault {
    #[source]
    pub source: io::Error,
    /// The file that could not be processed.
    pub file: CandidateFile,
    /// Absolute destination folder computed for the file.
    pub destination_folder: PathBuf,
    pub stage: FaultStage,
}

fn fault_message(stage: &FaultStage, file: &CandidateFile, folder: &Path) -> String {
    match stage {
        FaultStage::CreateFolder => {
            format!("Failed to create {} for {}", folder.display(), file.name)
        }
        FaultStage::Move => format!("Failed to move {} into {}", file.name, folder.display()),
        FaultStage::Copy => format!("Failed to copy {} into {}", file.name, folder.display()),
    }
}

/// Any failure that ends a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Execution(#[from] ExecutionFault),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl RunError {
    /// The I/O error at the bottom of the failure.
    pub fn io_error(&self) -> &io::Error {
        match self {
            RunError::Execution(fault) => &fault.source,
            RunError::Scan(error) => error.io_error(),
        }
    }
}

/// Asks whether a run should proceed once its candidates are known.
pub trait Confirmation {
    fn confirm(&mut self, request: &ExecutionRequest, found: usize) -> bool;
}

impl<F> Confirmation for F
where
    F: FnMut(&ExecutionRequest, usize) -> bool,
{
    fn confirm(&mut self, request: &ExecutionRequest, found: usize) -> bool {
        self(request, found)
    }
}

/// Progress of a single candidate, reported before it is moved or copied.
#[derive(Debug, Clone, Copy)]
pub struct FileProgress<'a> {
    /// 1-based position in the run.
    pub index: usize,
    pub total: usize,
    pub file: &'a CandidateFile,
    pub destination: &'a Destination,
    pub skipped: bool,
}

/// Receives one-way notifications about a run.
///
/// Implementations have no say in what the run does.
pub trait ProgressReporter {
    /// Called once after scanning, before confirmation.
    fn scanned(&mut self, _request: &ExecutionRequest, _candidates: &[CandidateFile]) {}

    /// Called for each candidate while running.
    fn file(&mut self, _progress: &FileProgress<'_>) {}

    /// Called when every candidate has been processed.
    fn finished(&mut self, _outcome: &ExecutionOutcome) {}
}

/// A reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Runs sort requests.
pub struct BatchExecutor {
    scanner: FileScanner,
    destinations: DestinationResolver,
    state: RunState,
}

impl BatchExecutor {
    pub fn new(scanner: FileScanner, destinations: DestinationResolver) -> Self {
        Self {
            scanner,
            destinations,
            state: RunState::Idle,
        }
    }

    /// The state the last run ended in.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Scans the source directory, asks for confirmation and processes every
    /// candidate.
    ///
    /// The prompt is skipped when nothing was found.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Scan`] if the source directory cannot be scanned and
    /// [`RunError::Execution`] for the first candidate that fails.
    pub fn run(
        &mut self,
        request: &ExecutionRequest,
        confirmation: &mut dyn Confirmation,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<RunOutcome, RunError> {
        self.state = RunState::Idle;

        let candidates = self
            .scanner
            .scan(&request.source, request.category)
            .inspect_err(|_| self.state = RunState::Faulted)?;
        reporter.scanned(request, &candidates);

        if candidates.is_empty() {
            return Ok(self.abort(AbortReason::NoCandidates, 0, request.copy));
        }

        if !confirmation.confirm(request, candidates.len()) {
            return Ok(self.abort(AbortReason::Declined, candidates.len(), request.copy));
        }
        self.state = RunState::Confirmed;

        let outcome = self.execute(request, &candidates, reporter)?;
        Ok(RunOutcome::Completed(outcome))
    }

    /// Processes already scanned candidates in order.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionFault`] for the first candidate that fails. No
    /// further candidates are touched.
    pub fn execute(
        &mut self,
        request: &ExecutionRequest,
        candidates: &[CandidateFile],
        reporter: &mut dyn ProgressReporter,
    ) -> Result<ExecutionOutcome, ExecutionFault> {
        self.state = RunState::Running;
        info!(
            source = %request.source.display(),
            destination = %request.destination_root().display(),
            files = candidates.len(),
            copy = request.copy,
            "starting run"
        );

        let started = Instant::now();
        let total = candidates.len();
        let mut handled = 0;
        let mut skipped = 0;

        for (i, file) in candidates.iter().enumerate() {
            match self.process(request, i + 1, total, file, reporter) {
                Ok(true) => handled += 1,
                Ok(false) => skipped += 1,
                Err(fault) => {
                    self.state = RunState::Faulted;
                    return Err(fault);
                }
            }
        }

        let outcome = ExecutionOutcome {
            found: total,
            handled,
            skipped,
            elapsed: started.elapsed(),
            copied: request.copy,
        };
        self.state = RunState::Completed;
        info!(handled, skipped, "run complete");
        reporter.finished(&outcome);
        Ok(outcome)
    }

    /// Handles one candidate. Returns `false` if it was skipped.
    fn process(
        &self,
        request: &ExecutionRequest,
        index: usize,
        total: usize,
        file: &CandidateFile,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<bool, ExecutionFault> {
        let destination = self.destinations.resolve(
            &request.source,
            request.destination.as_deref(),
            file.date,
            &file.name,
        );
        let fault = |stage: FaultStage, source: io::Error| ExecutionFault {
            source,
            file: file.clone(),
            destination_folder: destination.folder.clone(),
            stage,
        };

        fs::create_dir_all(&destination.folder)
            .map_err(|e| fault(FaultStage::CreateFolder, e))?;

        let skip = request.skip_existing && destination.path.exists();
        reporter.file(&FileProgress {
            index,
            total,
            file,
            destination: &destination,
            skipped: skip,
        });
        if skip {
            debug!(file = %file.name, "destination exists, skipping");
            return Ok(false);
        }

        if request.copy {
            copy_file(&file.path, &destination.path).map_err(|e| fault(FaultStage::Copy, e))?;
        } else {
            move_file(&file.path, &destination.path).map_err(|e| fault(FaultStage::Move, e))?;
        }
        debug!(
            file = %file.name,
            to = %destination.path.display(),
            "file handled"
        );
        Ok(true)
    }

    fn abort(&mut self, reason: AbortReason, found: usize, copied: bool) -> RunOutcome {
        self.state = RunState::Aborted;
        info!(?reason, found, "run aborted");
        RunOutcome::Aborted {
            reason,
            outcome: ExecutionOutcome {
                found,
                ..ExecutionOutcome::empty(copied)
            },
        }
    }
}

/// Copies a file without ever replacing an existing target.
///
/// Permissions and the modification time are carried over. A partially
/// written target is removed again on failure.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from)?;
    let metadata = source.metadata()?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;

    let result = io::copy(&mut source, &mut target).and_then(|_| {
        target.set_permissions(metadata.permissions())?;
        target.set_modified(metadata.modified()?)
    });
    if result.is_err() {
        drop(target);
        let _ = fs::remove_file(to);
    }
    result
}

/// Moves a file without ever replacing an existing target.
///
/// The file is linked at the new location and unlinked at the old one. When
/// linking is not possible (another filesystem, no hard link support) the
/// file is copied and the source removed.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => fs::remove_file(from),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            debug!(error = %e, "hard link failed, falling back to copy");
            copy_file(from, to)?;
            fs::remove_file(from)
        }
    }
}
