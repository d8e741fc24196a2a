use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A committed board message.
///
/// `author_id` is absent for anonymous posts; `author_name` is always set and
/// reads "Anonymous" in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_authored_by(&self, principal_id: &str) -> bool {
        self.author_id.as_deref() == Some(principal_id)
    }
}
