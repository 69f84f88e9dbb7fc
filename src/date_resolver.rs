//! Effective date resolution.
//!
//! Every candidate file is bucketed by exactly one date. Where that date comes
//! from depends on the category of the run:
//!
//! - documents use the last access time,
//! - images use the EXIF `DateTimeOriginal` tag and fall back to the last
//!   write time when the tag is missing or cannot be parsed,
//! - all other files use the last write time, except images found during an
//!   "all files" run, which follow the image rule.
//!
//! Only the metadata block of an image is read; the pixel data is never decoded.

use crate::file_category::{FileCategory, is_image_extension};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Formats tried, in order, after the date separators have been rewritten.
const DATE_TAKEN_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Resolves the effective date of a file.
pub struct DateResolver;

impl DateResolver {
    /// Returns the date a file is bucketed by for the given category.
    ///
    /// # Errors
    ///
    /// Fails only when the file or its filesystem metadata cannot be read.
    /// An unreadable or malformed EXIF block is not an error.
    pub fn resolve(path: &Path, category: FileCategory) -> io::Result<NaiveDateTime> {
        match category {
            FileCategory::Documents => last_access_time(path),
            FileCategory::Images => Self::image_date(path),
            FileCategory::AllFiles => {
                let is_image = path
                    .extension()
                    .is_some_and(|ext| is_image_extension(&ext.to_string_lossy()));
                if is_image {
                    Self::image_date(path)
                } else {
                    last_write_time(path)
                }
            }
        }
    }

    /// Returns the capture date of an image, or its last write time when the
    /// image carries no usable capture date.
    pub fn image_date(path: &Path) -> io::Result<NaiveDateTime> {
        match Self::date_taken(path)? {
            Some(date) => Ok(date),
            None => last_write_time(path),
        }
    }

    /// Reads the EXIF `DateTimeOriginal` tag of an image.
    ///
    /// Returns `Ok(None)` when the file has no EXIF block, the tag is absent,
    /// or its value is not a date.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn date_taken(path: &Path) -> io::Result<Option<NaiveDateTime>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no readable EXIF block");
                return Ok(None);
            }
        };

        let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) else {
            debug!(path = %path.display(), "EXIF block has no DateTimeOriginal tag");
            return Ok(None);
        };

        let text = match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|raw| String::from_utf8_lossy(raw).into_owned()),
            _ => None,
        };

        let parsed = text.as_deref().and_then(parse_date_taken);
        if parsed.is_none() {
            debug!(
                path = %path.display(),
                value = ?text,
                "DateTimeOriginal is not a valid date"
            );
        }
        Ok(parsed)
    }
}

/// Rewrites the first two colons of an EXIF date (`YYYY:MM:DD HH:MM:SS`)
/// into dashes, leaving the time of day untouched.
pub fn rewrite_date_separators(text: &str) -> String {
    text.replacen(':', "-", 2)
}

/// Parses an EXIF date-taken value.
///
/// # Examples
///
/// ```
/// use datesort::date_resolver::parse_date_taken;
///
/// let date = parse_date_taken("2021:05:01 10:00:00").unwrap();
/// assert_eq!(date.to_string(), "2021-05-01 10:00:00");
/// assert!(parse_date_taken("    :  :     :  :  ").is_none());
/// ```
pub fn parse_date_taken(text: &str) -> Option<NaiveDateTime> {
    let cleaned = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let rewritten = rewrite_date_separators(cleaned);

    DATE_TAKEN_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&rewritten, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&rewritten, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Returns the last write time of a file in local time.
pub fn last_write_time(path: &Path) -> io::Result<NaiveDateTime> {
    fs::metadata(path)?.modified().map(to_local)
}

/// Returns the last access time of a file in local time.
pub fn last_access_time(path: &Path) -> io::Result<NaiveDateTime> {
    fs::metadata(path)?.accessed().map(to_local)
}

fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::FileTimes;
    use tempfile::TempDir;

    /// Builds a minimal JPEG whose only segment is an EXIF block holding
    /// `DateTimeOriginal`.
    fn jpeg_with_date_taken(date: &str) -> Vec<u8> {
        let mut value = date.as_bytes().to_vec();
        value.push(0);

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II*\0");
        tiff.extend_from_slice(&8u32.to_le_bytes());
        // IFD0 with a single pointer to the Exif IFD at offset 26
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x8769u16.to_le_bytes());
        tiff.extend_from_slice(&4u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&26u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        // Exif IFD with DateTimeOriginal stored at offset 44
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x9003u16.to_le_bytes());
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&(value.len() as u32).to_le_bytes());
        tiff.extend_from_slice(&44u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(&value);

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    fn local(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn set_times(path: &Path, modified: NaiveDateTime, accessed: NaiveDateTime) {
        let to_system = |date: NaiveDateTime| {
            SystemTime::from(Local.from_local_datetime(&date).single().unwrap())
        };
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(
            FileTimes::new()
                .set_modified(to_system(modified))
                .set_accessed(to_system(accessed)),
        )
        .unwrap();
    }

    #[test]
    fn test_rewrite_only_first_two_colons() {
        assert_eq!(
            rewrite_date_separators("2021:05:01 10:00:00"),
            "2021-05-01 10:00:00"
        );
        assert_eq!(rewrite_date_separators("2021-05-01"), "2021-05-01");
    }

    #[test]
    fn test_parse_date_taken_variants() {
        let expected = NaiveDate::from_ymd_opt(2021, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_date_taken("2021:05:01 10:00:00"), Some(expected));
        assert_eq!(parse_date_taken("2021:05:01 10:00:00\0"), Some(expected));
        assert_eq!(parse_date_taken(" 2021:05:01 10:00 "), Some(expected));
        assert_eq!(
            parse_date_taken("2021:05:01"),
            NaiveDate::from_ymd_opt(2021, 5, 1).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_parse_date_taken_rejects_garbage() {
        assert_eq!(parse_date_taken(""), None);
        assert_eq!(parse_date_taken("    :  :     :  :  "), None);
        assert_eq!(parse_date_taken("0000:00:00 00:00:00"), None);
        assert_eq!(parse_date_taken("yesterday"), None);
    }

    #[test]
    fn test_date_taken_from_exif() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, jpeg_with_date_taken("2021:05:01 10:00:00")).unwrap();

        let date = DateResolver::date_taken(&path).unwrap();
        assert_eq!(
            date,
            NaiveDate::from_ymd_opt(2021, 5, 1).unwrap().and_hms_opt(10, 0, 0)
        );
    }

    #[test]
    fn test_image_without_exif_falls_back_to_write_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("b.jpg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        set_times(&path, local(2020, 2, 2), local(2023, 7, 7));

        assert_eq!(DateResolver::date_taken(&path).unwrap(), None);
        assert_eq!(
            DateResolver::resolve(&path, FileCategory::Images).unwrap(),
            local(2020, 2, 2)
        );
    }

    #[test]
    fn test_non_image_content_falls_back_to_write_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fake.jpg");
        fs::write(&path, "not an image").unwrap();
        set_times(&path, local(2019, 11, 3), local(2023, 7, 7));

        assert_eq!(
            DateResolver::resolve(&path, FileCategory::Images).unwrap(),
            local(2019, 11, 3)
        );
    }

    #[test]
    fn test_malformed_tag_falls_back_to_write_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blank.jpg");
        fs::write(&path, jpeg_with_date_taken("    :  :     :  :  ")).unwrap();
        set_times(&path, local(2018, 8, 8), local(2023, 7, 7));

        assert_eq!(
            DateResolver::resolve(&path, FileCategory::Images).unwrap(),
            local(2018, 8, 8)
        );
    }

    #[test]
    fn test_documents_use_access_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "notes").unwrap();
        set_times(&path, local(2020, 1, 1), local(2022, 9, 15));

        assert_eq!(
            DateResolver::resolve(&path, FileCategory::Documents).unwrap(),
            local(2022, 9, 15)
        );
    }

    #[test]
    fn test_all_files_dispatches_on_extension() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("photo.jpeg");
        let other = temp_dir.path().join("archive.zip");
        fs::write(&image, jpeg_with_date_taken("2017:03:04 05:06:07")).unwrap();
        fs::write(&other, "zip").unwrap();
        set_times(&image, local(2020, 1, 1), local(2020, 1, 1));
        set_times(&other, local(2016, 6, 6), local(2023, 7, 7));

        assert_eq!(
            DateResolver::resolve(&image, FileCategory::AllFiles).unwrap(),
            NaiveDate::from_ymd_opt(2017, 3, 4)
                .unwrap()
                .and_hms_opt(5, 6, 7)
                .unwrap()
        );
        assert_eq!(
            DateResolver::resolve(&other, FileCategory::AllFiles).unwrap(),
            local(2016, 6, 6)
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.jpg");

        assert!(DateResolver::resolve(&path, FileCategory::Images).is_err());
        assert!(DateResolver::resolve(&path, FileCategory::Documents).is_err());
    }
}
