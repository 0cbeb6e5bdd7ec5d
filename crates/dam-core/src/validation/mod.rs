//! Validation modules

pub mod upload;

pub use upload::{
    UploadRules, ALLOWED_TYPE_PREFIXES, MAX_FILES_PER_SELECTION, MAX_FILE_SIZE_BYTES,
    OFFICE_DOCUMENT_TYPES,
};
