//! Command-line interface module for datesort.
//!
//! This module handles:
//! - Argument parsing and validation
//! - Loading the configuration and picking the month-name locale
//! - Wiring the scanner, destination resolver and console output into a run

use crate::config::{ConfigError, SortConfig};
use crate::destination::{DestinationResolver, LocaleMonthNames};
use crate::executor::{BatchExecutor, ExecutionRequest, RunError, RunOutcome};
use crate::file_category::FileCategory;
use crate::output::{ConsolePrompt, ConsoleReporter, OutputFormatter};
use crate::scanner::FileScanner;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Organize all files of a given type in a folder into year and month
/// subfolders.
///
/// Files are MOVED from the input directory into `<destination>/<year>/<month>`
/// unless --copy is given. Images are dated by their EXIF capture time,
/// documents by their last access time and everything else by its last write
/// time.
#[derive(Parser, Debug, Clone)]
#[command(name = "datesort")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the files to sort
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Directory to build the year/month tree in (defaults to the input directory)
    #[arg(short = 'd', long = "destination")]
    pub destination: Option<PathBuf>,

    /// Kind of files to sort
    #[arg(short = 't', long = "type", value_enum)]
    pub file_type: CategoryArg,

    /// Print every file instead of a progress bar
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Copy files instead of moving them
    #[arg(short = 'c', long = "copy", action = ArgAction::SetTrue)]
    pub copy: bool,

    /// Skip files that already exist at the destination instead of failing
    #[arg(short = 's', long = "skip", action = ArgAction::SetTrue)]
    pub skip_existing: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
    pub yes: bool,

    /// Locale for month folder names, e.g. en_US or de_DE
    #[arg(long = "locale")]
    pub locale: Option<String>,

    /// Path to a configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

/// File type options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// JPEG images (jpg, jpeg)
    Images,
    /// Office and text documents (txt, pdf, docx, xlsx, ...)
    Documents,
    /// Every file in the directory
    AllFiles,
}

impl From<CategoryArg> for FileCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Images => FileCategory::Images,
            CategoryArg::Documents => FileCategory::Documents,
            CategoryArg::AllFiles => FileCategory::AllFiles,
        }
    }
}

/// Invalid command-line input, reported before anything is scanned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Path was not set!")]
    EmptyPath,
    #[error("Given directory was not found! ({})", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Given path is not a directory! ({})", .0.display())]
    NotADirectory(PathBuf),
    #[error("Unknown locale '{0}'")]
    UnknownLocale(String),
}

/// Everything that can make the binary fail.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Checks that a path names an existing directory.
pub fn validate_directory(path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    if !path.exists() {
        return Err(ValidationError::DirectoryNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ValidationError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

impl Args {
    /// Validates the paths and builds the request for the executor.
    pub fn to_request(&self) -> Result<ExecutionRequest, ValidationError> {
        validate_directory(&self.input)?;
        if let Some(destination) = &self.destination {
            validate_directory(destination)?;
        }

        Ok(ExecutionRequest {
            source: self.input.clone(),
            destination: self.destination.clone(),
            category: self.file_type.into(),
            verbose: self.verbose,
            copy: self.copy,
            skip_existing: self.skip_existing,
        })
    }
}

/// Picks month names from the flag, then the configuration, then the
/// environment.
pub fn month_names(
    flag: Option<&str>,
    config: &SortConfig,
) -> Result<LocaleMonthNames, ValidationError> {
    match flag.or(config.sort.locale.as_deref()) {
        Some(tag) => LocaleMonthNames::from_tag(tag)
            .ok_or_else(|| ValidationError::UnknownLocale(tag.to_string())),
        None => Ok(LocaleMonthNames::from_env()),
    }
}

/// Runs the application with parsed arguments.
///
/// Output for the user is printed as the run progresses. Errors are returned
/// for the caller to present.
pub fn run_cli(args: &Args) -> Result<RunOutcome, CliError> {
    let request = args.to_request()?;
    let config = SortConfig::load(args.config.as_deref())?;
    let filters = config.compile_filters()?;
    let names = month_names(args.locale.as_deref(), &config)?;
    debug!(locale = ?names.locale(), "month names selected");

    let mut executor = BatchExecutor::new(
        FileScanner::with_filters(filters),
        DestinationResolver::new(names),
    );
    let mut prompt = ConsolePrompt::new(args.yes);
    let mut reporter = ConsoleReporter::new(request.verbose);

    let outcome = executor.run(&request, &mut prompt, &mut reporter)?;
    if !outcome.is_completed() {
        OutputFormatter::stopping_execution();
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Locale;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("datesort").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_short_flags() {
        let args = parse(&["-i", "/in", "-t", "images", "-d", "/out", "-v", "-c", "-s", "-y"]);

        assert_eq!(args.input, PathBuf::from("/in"));
        assert_eq!(args.destination, Some(PathBuf::from("/out")));
        assert_eq!(args.file_type, CategoryArg::Images);
        assert!(args.verbose && args.copy && args.skip_existing && args.yes);
    }

    #[test]
    fn test_parse_long_flags() {
        let args = parse(&[
            "--input",
            "/in",
            "--type",
            "all-files",
            "--locale",
            "de_DE",
            "--config",
            "cfg.toml",
        ]);

        assert_eq!(args.file_type, CategoryArg::AllFiles);
        assert_eq!(args.locale.as_deref(), Some("de_DE"));
        assert_eq!(args.config, Some(PathBuf::from("cfg.toml")));
        assert!(!args.copy && !args.skip_existing && !args.verbose);
    }

    #[test]
    fn test_input_and_type_are_required() {
        assert!(Args::try_parse_from(["datesort", "-t", "images"]).is_err());
        assert!(Args::try_parse_from(["datesort", "-i", "/in"]).is_err());
        assert!(Args::try_parse_from(["datesort", "-i", "/in", "-t", "videos"]).is_err());
    }

    #[test]
    fn test_to_request_validates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().to_str().unwrap();
        let missing = temp_dir.path().join("missing");
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        let ok = parse(&["-i", input, "-t", "documents", "-c"]).to_request().unwrap();
        assert_eq!(ok.category, FileCategory::Documents);
        assert!(ok.copy);
        assert_eq!(ok.destination_root(), temp_dir.path());

        let bad_input = parse(&["-i", missing.to_str().unwrap(), "-t", "documents"]);
        assert_eq!(
            bad_input.to_request(),
            Err(ValidationError::DirectoryNotFound(missing.clone()))
        );

        let bad_destination = parse(&["-i", input, "-t", "images", "-d", file.to_str().unwrap()]);
        assert_eq!(
            bad_destination.to_request(),
            Err(ValidationError::NotADirectory(file.clone()))
        );
    }

    #[test]
    fn test_validate_empty_path() {
        assert_eq!(
            validate_directory(Path::new("")),
            Err(ValidationError::EmptyPath)
        );
    }

    #[test]
    fn test_month_names_precedence() {
        let mut config = SortConfig::default();
        config.sort.locale = Some("fr_FR".to_string());

        assert_eq!(
            month_names(Some("de_DE"), &config).unwrap().locale(),
            Locale::de_DE
        );
        assert_eq!(month_names(None, &config).unwrap().locale(), Locale::fr_FR);
        assert_eq!(
            month_names(Some("klingon"), &config),
            Err(ValidationError::UnknownLocale("klingon".to_string()))
        );
    }
}
