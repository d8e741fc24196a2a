mod api;
mod file;
mod message;

pub use api::{
    AdminChangeResponse, AdminListResponse, DEFAULT_LIST_LIMIT, DeletedResponse,
    FileListResponse, GrantAdminRequest, HealthResponse, ListQuery, MeResponse,
    MessageListResponse, SendMessageRequest, SendMessageResponse, StatsResponse, UploadQuery,
};
pub use file::{DEFAULT_CONTENT_TYPE, StoredFile};
pub use message::Message;
