use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Message, StoredFile};
use crate::identity::Principal;

/// Default page size for list endpoints.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Request to post a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Raw content; trimmed and length-checked before commit
    pub content: String,
}

/// Response after a message is committed.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Id of the new message
    pub id: Uuid,
    pub message: Message,
}

/// Query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Requested limit, defaulted and clamped to `1..=max`.
    pub fn effective_limit(&self, max: usize) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, max.max(1))
    }
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub count: usize,
}

/// Query parameters for `POST /files`.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<StoredFile>,
    pub count: usize,
}

/// Response after a record is removed.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

/// Request to grant the admin role.
#[derive(Debug, Deserialize)]
pub struct GrantAdminRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub admins: Vec<String>,
}

/// Result of a grant or revoke. `changed` is false when the email already
/// had (or already lacked) the role.
#[derive(Debug, Serialize)]
pub struct AdminChangeResponse {
    pub email: String,
    pub changed: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Statistics response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub messages_count: usize,
    pub files_count: usize,
    pub admins_count: usize,
    /// Partition keys currently holding a bucket, summed over all operations
    pub tracked_quota_keys: usize,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// Who the server thinks the caller is.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub display_name: String,
    /// Partition key the caller's quota is charged against
    pub quota_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}
