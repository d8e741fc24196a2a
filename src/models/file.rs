use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Fallback content type for uploads that do not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An uploaded file. Serializes as metadata only; the payload is served by
/// the download endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub owner_id: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub data: Bytes,
}

impl StoredFile {
    pub fn is_owned_by(&self, principal_id: &str) -> bool {
        self.owner_id == principal_id
    }
}
