//! Directory scanning.
//!
//! Collects the immediate files of a directory that belong to a category,
//! resolves their effective dates and orders them oldest first.

use crate::config::CompiledFilters;
use crate::date_resolver::DateResolver;
use crate::file_category::FileCategory;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A file that passed the category filter, paired with its effective date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Full path of the file in the source directory.
    pub path: PathBuf,
    /// File name including the extension.
    pub name: String,
    /// Extension without the leading dot, if the file has one.
    pub extension: Option<String>,
    /// The date the file is bucketed by.
    pub date: NaiveDateTime,
}

impl CandidateFile {
    /// Builds a candidate from a path and an already resolved date.
    pub fn new(path: PathBuf, date: NaiveDateTime) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file_extension(&path);
        Self {
            path,
            name,
            extension,
            date,
        }
    }
}

/// Errors raised while scanning a directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Error reading directory {}: {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error reading the date of {}: {source}", .path.display())]
    ResolveDate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            ScanError::ReadDirectory { source, .. } | ScanError::ResolveDate { source, .. } => {
                source
            }
        }
    }
}

/// Enumerates and orders the candidate files of a directory.
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    filters: CompiledFilters,
}

impl FileScanner {
    /// Creates a scanner that keeps every file of the category.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scanner that additionally drops files excluded by `filters`.
    pub fn with_filters(filters: CompiledFilters) -> Self {
        Self { filters }
    }

    /// Scans the immediate files of `directory` for the given category.
    ///
    /// The result is ordered by effective date, oldest first. Files with the
    /// same date keep their directory enumeration order. An empty result is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or a file's date
    /// cannot be resolved.
    pub fn scan(
        &self,
        directory: &Path,
        category: FileCategory,
    ) -> Result<Vec<CandidateFile>, ScanError> {
        let read_error = |source: io::Error| ScanError::ReadDirectory {
            path: directory.to_path_buf(),
            source,
        };

        let mut candidates = Vec::new();
        for entry in fs::read_dir(directory).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            let file_type = entry.file_type().map_err(read_error)?;
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let accepted = match category.extensions() {
                Some(_) => file_extension(&path).is_some_and(|ext| category.accepts(&ext)),
                None => true,
            };
            if !accepted || !self.filters.should_include(&path) {
                continue;
            }

            let date = DateResolver::resolve(&path, category).map_err(|source| {
                ScanError::ResolveDate {
                    path: path.clone(),
                    source,
                }
            })?;
            candidates.push(CandidateFile::new(path, date));
        }

        // Stable sort keeps enumeration order for equal dates.
        candidates.sort_by_key(|candidate| candidate.date);

        debug!(
            directory = %directory.display(),
            category = %category,
            found = candidates.len(),
            "scan complete"
        );
        Ok(candidates)
    }
}

fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
}
