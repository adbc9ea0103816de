//! Client-side checks applied to a candidate before it may be staged.

use thiserror::Error;

use crate::candidate::CandidateFile;

/// Media type prefix every accepted upload must declare.
pub const IMAGE_MIME_PREFIX: &str = "image/";
/// Largest accepted upload, inclusive.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select an image file")]
    NotAnImage { mime_type: Option<String> },
    #[error("File size must be less than 5MB")]
    TooLarge { size: u64, limit: u64 },
}

pub fn validate_candidate(file: &CandidateFile) -> Result<(), ValidationError> {
    if !declares_image(file.mime_type.as_deref()) {
        return Err(ValidationError::NotAnImage {
            mime_type: file.mime_type.clone(),
        });
    }

    let size = file.size();
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(())
}

fn declares_image(mime_type: Option<&str>) -> bool {
    mime_type
        .map(|mime| {
            mime.get(..IMAGE_MIME_PREFIX.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_MIME_PREFIX))
        })
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
