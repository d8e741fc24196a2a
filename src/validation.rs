//! Synchronous payload checks run after quota admission and before commit.
//!
//! All validators are pure: no I/O, no allocation on the success path beyond
//! what the caller already owns.

use thiserror::Error;

use crate::error::{AppError, AppResult};

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum message length, in characters, after trimming.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum file name length, in characters, after trimming.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Why message content was rejected. The `Display` strings are shown to
/// callers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("Message cannot be empty")]
    Empty,

    #[error("Message too long (max 2000 characters)")]
    TooLong { length: usize },
}

/// Validate message content.
///
/// Rules:
/// - Leading and trailing whitespace is trimmed first
/// - The trimmed content must contain at least one character
/// - The trimmed content must not exceed 2000 characters
///
/// Returns the trimmed slice that should be stored.
pub fn validate_content(raw: &str) -> Result<&str, ContentError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ContentError::Empty);
    }

    let length = trimmed.chars().count();
    if length > MAX_MESSAGE_LENGTH {
        return Err(ContentError::TooLong { length });
    }

    Ok(trimmed)
}

/// Validate an uploaded file's name.
///
/// Rules:
/// - Between 1 and 255 characters after trimming
/// - No path separators (`/`, `\`) and no control characters
/// - Not `.` or `..`
pub fn validate_file_name(raw: &str) -> AppResult<&str> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(AppError::BadRequest("File name cannot be empty".to_string()));
    }

    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "File name cannot exceed {MAX_FILE_NAME_LENGTH} characters"
        )));
    }

    if name == "." || name == ".." {
        return Err(AppError::BadRequest(format!("'{name}' is not a valid file name")));
    }

    if let Some((pos, c)) = name
        .chars()
        .enumerate()
        .find(|(_, c)| *c == '/' || *c == '\\' || c.is_control())
    {
        return Err(AppError::BadRequest(format!(
            "File name contains invalid character {c:?} at position {pos}"
        )));
    }

    Ok(name)
}

/// Maximum email length accepted for admin grants (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Loose shape check for an email address given to an admin grant.
///
/// Only rejects values that could never match a session's email: empty,
/// over-long, containing whitespace, or without a `local@domain` shape.
pub fn validate_email(raw: &str) -> AppResult<&str> {
    let email = raw.trim();

    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Email must be between 1 and {MAX_EMAIL_LENGTH} characters"
        )));
    }

    let valid_shape = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));

    if !valid_shape || email.chars().any(char::is_whitespace) {
        return Err(AppError::BadRequest(format!("'{email}' is not a valid email address")));
    }

    Ok(email)
}

/// Validate an upload's size against the configured maximum.
pub fn validate_upload_size(size: usize, max_bytes: usize) -> AppResult<()> {
    if size == 0 {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    if size > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {size} bytes, the maximum is {max_bytes} bytes"
        )));
    }

    Ok(())
}
