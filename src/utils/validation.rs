//! Input validation for the pipeline boundary
//!
//! These are used as `validator` custom field checks.

use validator::ValidationError;

use crate::constants::{languages, MAX_SOURCE_CODE_SIZE};

/// Validate that the language maps to a judge language id
pub fn validate_language(language: &str) -> Result<(), ValidationError> {
    if languages::judge_id(language).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_language").with_message("Unsupported programming language".into()))
    }
}

/// Validate that source code is present and within the size limit
pub fn validate_source_code(source_code: &str) -> Result<(), ValidationError> {
    if source_code.trim().is_empty() {
        return Err(ValidationError::new("empty_source").with_message("Source code must not be empty".into()));
    }
    if source_code.len() > MAX_SOURCE_CODE_SIZE {
        return Err(ValidationError::new("source_too_large").with_message("Source code exceeds 1 MiB".into()));
    }
    Ok(())
}
