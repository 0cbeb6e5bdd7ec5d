//! Client-side upload constraints: per-file size and type, and the number of
//! files one selection may add.

use crate::error::ValidationError;
use crate::models::PendingFile;

pub const MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_FILES_PER_SELECTION: usize = 50;

/// Mime type prefixes accepted in every variant of the upload form.
pub const ALLOWED_TYPE_PREFIXES: &[&str] = &["image/", "video/", "application/pdf", "text/"];

/// Office formats accepted by the richer upload form.
pub const OFFICE_DOCUMENT_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRules {
    pub max_file_size_bytes: u64,
    pub max_files_per_selection: usize,
    pub allowed_type_prefixes: Vec<String>,
}

impl Default for UploadRules {
    fn default() -> Self {
        UploadRules {
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            max_files_per_selection: MAX_FILES_PER_SELECTION,
            allowed_type_prefixes: ALLOWED_TYPE_PREFIXES
                .iter()
                .chain(OFFICE_DOCUMENT_TYPES.iter())
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadRules {
    /// Rules without the office document extension.
    pub fn basic() -> Self {
        UploadRules {
            allowed_type_prefixes: ALLOWED_TYPE_PREFIXES.iter().map(|s| s.to_string()).collect(),
            ..UploadRules::default()
        }
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_bytes / (1024 * 1024)
    }

    pub fn is_allowed_type(&self, mime_type: &str) -> bool {
        let mime = mime_type.trim().to_lowercase();
        self.allowed_type_prefixes
            .iter()
            .any(|prefix| mime.starts_with(prefix.as_str()))
    }

    /// Size is checked before type, so an oversized file of a disallowed
    /// type reports the size violation.
    pub fn check_file(&self, name: &str, size: u64, mime_type: &str) -> Result<(), ValidationError> {
        if size > self.max_file_size_bytes {
            return Err(ValidationError::FileTooLarge {
                name: name.to_string(),
                size,
                max_mb: self.max_file_size_mb(),
            });
        }
        if !self.is_allowed_type(mime_type) {
            return Err(ValidationError::UnsupportedType {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn check_selection_len(&self, selected: usize) -> Result<(), ValidationError> {
        if selected > self.max_files_per_selection {
            return Err(ValidationError::SelectionTooLarge {
                selected,
                max: self.max_files_per_selection,
            });
        }
        Ok(())
    }

    /// Check every pending file and report all violations together.
    pub fn check_batch<'a, I>(&self, files: I) -> Result<(), Vec<ValidationError>>
    where
        I: IntoIterator<Item = &'a PendingFile>,
    {
        let violations: Vec<ValidationError> = files
            .into_iter()
            .filter_map(|f| self.check_file(&f.name, f.size, &f.mime_type).err())
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
