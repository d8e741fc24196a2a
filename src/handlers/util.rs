//! Shared request parsing for handlers.
//!
//! Bodies and path ids are parsed here instead of with axum's `Json` and
//! `Path<Uuid>` extractors, so malformed input is reported with the same
//! `{ error, message }` JSON shape as every other failure.

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Deserialize a JSON request body.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    Ok(serde_json::from_slice(body)?)
}

/// Parse a record id taken from the request path.
pub fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("'{raw}' is not a valid id")))
}
