//! Message board handlers.
//!
//! # Endpoints
//!
//! - `POST /messages` - Post a message (anonymous allowed, `sendMessage` quota)
//! - `GET /messages` - List recent messages, newest first
//! - `GET /messages/{id}` - Fetch one message
//! - `DELETE /messages/{id}` - Delete a message (author or admin)
//!
//! # Configurable Limits
//!
//! - `MESSAGE_LIST_MAX` - Maximum messages per list request (default: 100)

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::instrument;

use super::util::{parse_id, parse_json};
use crate::error::AppResult;
use crate::identity::Caller;
use crate::models::{
    DeletedResponse, ListQuery, Message, MessageListResponse, SendMessageRequest,
    SendMessageResponse,
};
use crate::state::AppState;

/// Post a message.
///
/// # Request Body
///
/// ```json
/// { "content": "hello" }
/// ```
#[instrument(skip(state, caller, body), fields(body_len = body.len()))]
pub async fn send_message(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<(StatusCode, Json<SendMessageResponse>)> {
    let payload: SendMessageRequest = parse_json(&body)?;

    let message = state.messages.send(&caller, &payload.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            id: message.id,
            message,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<MessageListResponse> {
    let limit = query.effective_limit(state.config.message_list_max);
    let messages = state.messages.list(limit).await;

    Json(MessageListResponse {
        count: messages.len(),
        messages,
    })
}

#[instrument(skip(state))]
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    let id = parse_id(&id)?;
    Ok(Json(state.messages.get(id).await?))
}

#[instrument(skip(state, caller))]
pub async fn delete_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedResponse>> {
    let id = parse_id(&id)?;
    state.messages.delete(&caller, id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}
