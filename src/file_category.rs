//! File categories and their extension tables.
//!
//! A category decides two things for a sort run: which files are picked up
//! from the source directory, and where each file's effective date comes from.
//!
//! # Examples
//!
//! ```
//! use datesort::file_category::FileCategory;
//!
//! assert!(FileCategory::Images.accepts("jpeg"));
//! assert!(!FileCategory::Documents.accepts("jpg"));
//! assert!(FileCategory::AllFiles.extensions().is_none());
//! ```

/// Extensions treated as images, without the leading dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Extensions treated as documents, without the leading dot.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "json", "pdf", "docx", "docm", "doc", "rtf", "xlsx", "xls", "xlsm", "pptx", "ppt",
    "pptm",
];

/// The kind of files a sort run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// JPEG images, dated by their EXIF capture time.
    Images,
    /// Office and text documents, dated by their last access time.
    Documents,
    /// Every file in the directory.
    AllFiles,
}

impl FileCategory {
    /// Returns the recognized extensions for this category.
    ///
    /// `None` means the category is unrestricted.
    pub fn extensions(&self) -> Option<&'static [&'static str]> {
        match self {
            FileCategory::Images => Some(IMAGE_EXTENSIONS),
            FileCategory::Documents => Some(DOCUMENT_EXTENSIONS),
            FileCategory::AllFiles => None,
        }
    }

    /// Checks whether an extension (no leading dot) belongs to this category.
    ///
    /// Matching is case-sensitive.
    pub fn accepts(&self, extension: &str) -> bool {
        match self.extensions() {
            Some(list) => list.contains(&extension),
            None => true,
        }
    }

    /// Returns the name shown to the user.
    pub fn display_name(&self) -> &'static str {
        match self {
            FileCategory::Images => "Images",
            FileCategory::Documents => "Documents",
            FileCategory::AllFiles => "All files",
        }
    }
}

/// Checks whether an extension is one of the image extensions.
pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension)
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        assert_eq!(FileCategory::Images.extensions(), Some(IMAGE_EXTENSIONS));
        assert!(FileCategory::Images.accepts("jpg"));
        assert!(FileCategory::Images.accepts("jpeg"));
        assert!(!FileCategory::Images.accepts("png"));
    }

    #[test]
    fn test_document_extensions() {
        for ext in ["txt", "json", "pdf", "docx", "xlsm", "pptm"] {
            assert!(FileCategory::Documents.accepts(ext), "{ext} should be accepted");
        }
        assert!(!FileCategory::Documents.accepts("jpg"));
        assert!(!FileCategory::Documents.accepts("md"));
    }

    #[test]
    fn test_all_files_is_unrestricted() {
        assert!(FileCategory::AllFiles.extensions().is_none());
        assert!(FileCategory::AllFiles.accepts("anything"));
        assert!(FileCategory::AllFiles.accepts(""));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!FileCategory::Images.accepts("JPG"));
        assert!(!FileCategory::Documents.accepts("PDF"));
        assert!(!is_image_extension("Jpeg"));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FileCategory::Images.to_string(), "Images");
        assert_eq!(FileCategory::Documents.to_string(), "Documents");
        assert_eq!(FileCategory::AllFiles.to_string(), "All files");
    }
}
