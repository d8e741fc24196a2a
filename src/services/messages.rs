use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::Caller;
use crate::metrics;
use crate::models::Message;
use crate::quota::{Operation, QuotaGate, derive_key};
use crate::store::{Record, Repository};
use crate::validation::validate_content;

/// Posting, listing and deleting board messages.
///
/// Posting runs the full pipeline in order: partition key derivation, the
/// `sendMessage` quota, content validation, commit. Nothing is stored unless
/// every stage passes, and a rejected quota check stops the pipeline before
/// validation runs.
#[derive(Clone)]
pub struct MessageService {
    messages: Repository<Message>,
    gate: Arc<dyn QuotaGate>,
}

impl MessageService {
    pub fn new(messages: Repository<Message>, gate: Arc<dyn QuotaGate>) -> Self {
        Self { messages, gate }
    }

    #[instrument(skip(self, caller, content), fields(display_name = %caller.display_name()))]
    pub async fn send(&self, caller: &Caller, content: &str) -> AppResult<Message> {
        let result = self.send_inner(caller, content).await;
        record_outcome("create", &result);
        result
    }

    async fn send_inner(&self, caller: &Caller, content: &str) -> AppResult<Message> {
        let key = derive_key(caller.principal());
        self.gate.admit(Operation::SendMessage, &key)?;

        let content = validate_content(content)?;

        let message = Message {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author_id: caller.principal().map(|p| p.id.clone()),
            author_name: caller.display_name().to_string(),
            created_at: Utc::now(),
        };
        self.messages.insert(message.clone()).await?;

        info!(message_id = %message.id, key = %key, "Message posted");
        Ok(message)
    }

    pub async fn list(&self, limit: usize) -> Vec<Message> {
        self.messages.list(limit).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Message> {
        self.messages.get(id).await
    }

    pub async fn count(&self) -> usize {
        self.messages.count().await
    }

    /// Delete a message. Authors may delete their own messages, admins may
    /// delete any. Anonymous messages can only be removed by an admin.
    #[instrument(skip(self, caller))]
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> AppResult<Message> {
        let result = self.delete_inner(caller, id).await;
        record_outcome("delete", &result);
        result
    }

    async fn delete_inner(&self, caller: &Caller, id: Uuid) -> AppResult<Message> {
        let principal = caller.require_principal()?;

        let removed = self
            .messages
            .remove_if(id, |message| {
                if principal.is_admin() || message.is_authored_by(&principal.id) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(
                        "You can only delete your own messages".to_string(),
                    ))
                }
            })
            .await?;

        info!(message_id = %id, deleted_by = %principal.id, "Message deleted");
        Ok(removed)
    }
}

fn record_outcome<T>(action: &'static str, result: &AppResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::record_mutation(Message::KIND, action, outcome);
}
