//! Output formatting and styling module.
//!
//! All console output of the binary goes through here: the run header, the
//! confirmation prompt, per-file progress, the final summary and fault
//! reports. The core never prints; it notifies a [`ConsoleReporter`] instead.

use crate::executor::{
    Confirmation, ExecutionFault, ExecutionOutcome, ExecutionRequest, FileProgress,
    ProgressReporter, RunError,
};
use crate::scanner::CandidateFile;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Format used when showing effective dates.
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a `label:<tab>value` line with the value highlighted.
    pub fn setting(label: &str, value: &str) {
        println!("{:<28}{}", format!("{}:", label), value.green());
    }

    pub fn stopping_execution() {
        println!("Stopping execution.");
    }

    /// Prints the settings of a run and how many files were found.
    pub fn execution_header(request: &ExecutionRequest, found: usize) {
        Self::setting("Selected Directory", &request.source.display().to_string());
        if let Some(destination) = &request.destination {
            Self::setting("Destination Directory", &destination.display().to_string());
        }
        Self::setting("Selected File-Type", request.category.display_name());
        if let Some(extensions) = request.category.extensions() {
            Self::setting("Supported File-Extensions", &extensions.join(", "));
        }
        Self::setting("Skip existing files", yes_no(request.skip_existing));
        Self::setting("Files will get", execution_verb(request.copy));
        Self::setting("Verbose", yes_no(request.verbose));
        println!(
            "{:<28}{}",
            "Files:",
            format!("{} {} found", found, plural(found, "file")).on_bright_black()
        );
        println!();
    }

    /// Prints one line per file in verbose mode.
    pub fn verbose_file(progress: &FileProgress<'_>) {
        let file = progress.file;
        let mut line = format!(
            "{}\t File-Name: {},\tType: {},\tDate: {}",
            format!("{}/{}.", progress.index, progress.total).green(),
            file.name.green(),
            file.extension.as_deref().unwrap_or("").green(),
            file.date.format(DATE_DISPLAY_FORMAT).to_string().green()
        );
        if progress.skipped {
            line.push_str(&format!("\t({})", "SKIPPED".yellow()));
        }
        println!("{}", line);
    }

    /// Creates a progress bar for the running phase.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Message shown next to the progress bar for the current file.
    pub fn progress_message(file: &CandidateFile) -> String {
        format!(
            "Handling: {}\t[{}]",
            file.name,
            file.date.format(DATE_DISPLAY_FORMAT)
        )
    }

    /// Prints the handled/skipped counts and the time taken.
    pub fn success_summary(outcome: &ExecutionOutcome) {
        println!();
        println!(
            "{} {} successfully {} (skipped {})",
            outcome.handled.to_string().green(),
            plural(outcome.handled, "file"),
            execution_verb(outcome.copied),
            outcome.skipped.to_string().yellow()
        );
        println!("This took: {}", format_duration(outcome.elapsed).green());
    }

    /// Prints a fault with the file and destination it concerns.
    pub fn execution_fault(fault: &ExecutionFault) {
        Self::error_line(&format!("{:?}", fault.source.kind()), &fault.to_string());
        eprintln!(
            "File-Name: {}, Destination-Path: {}",
            fault.file.name.yellow(),
            fault.destination_folder.display().to_string().yellow()
        );
    }

    /// Prints any error that ended a run.
    pub fn run_error(error: &RunError) {
        println!();
        match error {
            RunError::Execution(fault) => Self::execution_fault(fault),
            RunError::Scan(scan) => {
                Self::error_line(&format!("{:?}", scan.io_error().kind()), &scan.to_string())
            }
        }
        println!();
        Self::stopping_execution();
    }

    fn error_line(kind: &str, message: &str) {
        eprintln!(
            "{}: {}",
            format!("[{}]", kind).on_red(),
            message.red()
        );
    }
}

/// Asks a yes/no question until the answer is one of y, yes, n or no.
///
/// Returns `false` if the input ends before a valid answer.
pub fn prompt_confirmation<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<bool> {
    writeln!(output, "Do you want to execute this operation?")?;
    loop {
        write!(output, "Yes[{}] / No[{}]: ", "Y".green(), "N".green())?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                writeln!(output)?;
                return Ok(true);
            }
            "n" | "no" => {
                writeln!(output)?;
                return Ok(false);
            }
            _ => continue,
        }
    }
}

/// Formats a duration as e.g. `1 minute, 5 seconds, 20 milliseconds`.
///
/// Zero units are left out; a zero duration is `0 seconds`.
///
/// # Examples
///
/// ```
/// use datesort::output::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(61_020)), "1 minute, 1 second, 20 milliseconds");
/// assert_eq!(format_duration(Duration::ZERO), "0 seconds");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms == 0 {
        return "0 seconds".to_string();
    }

    let units = [
        (total_ms / 86_400_000, "day"),
        (total_ms / 3_600_000 % 24, "hour"),
        (total_ms / 60_000 % 60, "minute"),
        (total_ms / 1_000 % 60, "second"),
        (total_ms % 1_000, "millisecond"),
    ];

    units
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{} {}", value, plural(*value as usize, unit)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn execution_verb(copy: bool) -> &'static str {
    if copy { "copied" } else { "moved" }
}

/// Reports a run on the terminal: a header before confirmation, then either a
/// progress bar or one line per file, then the summary.
pub struct ConsoleReporter {
    verbose: bool,
    progress: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            progress: None,
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn scanned(&mut self, request: &ExecutionRequest, candidates: &[CandidateFile]) {
        OutputFormatter::execution_header(request, candidates.len());
    }

    fn file(&mut self, progress: &FileProgress<'_>) {
        if self.verbose {
            OutputFormatter::verbose_file(progress);
            return;
        }
        let pb = self
            .progress
            .get_or_insert_with(|| OutputFormatter::create_progress_bar(progress.total as u64));
        pb.set_position(progress.index as u64);
        pb.set_message(OutputFormatter::progress_message(progress.file));
    }

    fn finished(&mut self, outcome: &ExecutionOutcome) {
        if let Some(pb) = self.progress.take() {
            pb.finish_with_message("Done");
        }
        OutputFormatter::success_summary(outcome);
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        // A fault leaves the bar unfinished; clear it before the error is shown.
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

/// Interactive confirmation on stdin, or an automatic yes.
pub struct ConsolePrompt {
    assume_yes: bool,
}

impl ConsolePrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirmation for ConsolePrompt {
    fn confirm(&mut self, _request: &ExecutionRequest, _found: usize) -> bool {
        if self.assume_yes {
            return true;
        }
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        match prompt_confirmation(&mut stdin.lock(), &mut stdout) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "could not read confirmation, aborting");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use chrono::NaiveDate;
    use std::io::Cursor;
    use std::path::PathBuf;

    #[test]
    fn test_format_duration_zero() {
        assert_eq!(format_duration(Duration::ZERO), "0 seconds");
        assert_eq!(format_duration(Duration::from_micros(300)), "0 seconds");
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_millis(1)), "1 millisecond");
        assert_eq!(format_duration(Duration::from_secs(2)), "2 seconds");
        assert_eq!(
            format_duration(Duration::from_secs(90_061) + Duration::from_millis(5)),
            "1 day, 1 hour, 1 minute, 1 second, 5 milliseconds"
        );
        assert_eq!(
            format_duration(Duration::from_secs(2 * 86_400 + 3 * 3_600)),
            "2 days, 3 hours"
        );
    }

    #[test]
    fn test_prompt_accepts_yes_and_no() {
        for (input, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("No\n", false)] {
            let mut output = Vec::new();
            let answer = prompt_confirmation(&mut Cursor::new(input), &mut output).unwrap();
            assert_eq!(answer, expected, "input {input:?}");
        }
    }

    #[test]
    fn test_prompt_repeats_until_valid() {
        let mut output = Vec::new();
        let answer = prompt_confirmation(&mut Cursor::new("maybe\n\ny\n"), &mut output).unwrap();

        assert!(answer);
        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Yes[").count(), 3);
    }

    #[test]
    fn test_prompt_end_of_input_declines() {
        let mut output = Vec::new();
        assert!(!prompt_confirmation(&mut Cursor::new(""), &mut output).unwrap());
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file"), "file");
        assert_eq!(plural(0, "file"), "files");
        assert_eq!(plural(3, "file"), "files");
    }

    #[test]
    fn test_unfinished_progress_bar_is_finished_on_drop() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let file = CandidateFile::new(PathBuf::from("/r/a.txt"), date);
        let destination = Destination {
            folder: PathBuf::from("/r/2020/February"),
            path: PathBuf::from("/r/2020/February/a.txt"),
        };

        let mut reporter = ConsoleReporter::new(false);
        reporter.file(&FileProgress {
            index: 1,
            total: 2,
            file: &file,
            destination: &destination,
            skipped: false,
        });
        let pb = reporter.progress.clone().unwrap();
        assert!(!pb.is_finished());

        drop(reporter);
        assert!(pb.is_finished());
    }
}
