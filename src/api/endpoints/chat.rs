//! Animal-scoped chat endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::types::AppContext;
use crate::db::repository::chat_message;
use crate::models::ChatMessage;

/// `GET /api/chat/:animal_id` — full stored history, oldest first.
pub async fn history(
    State(ctx): State<AppContext>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    match &ctx.chat {
        Some(chat) => Ok(Json(chat.history(&animal_id)?)),
        None => {
            // History stays readable even without the AI backend.
            let conn = ctx.db.conn();
            Ok(Json(chat_message::get_chat_messages_by_animal(
                &conn, &animal_id,
            )?))
        }
    }
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub user_message: String,
    pub assistant_message: String,
}

/// `POST /api/chat/:animal_id` — ask the assistant.
pub async fn send(
    State(ctx): State<AppContext>,
    Path(animal_id): Path<Uuid>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let chat = ctx
        .chat
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable(messages::CHAT_NOT_CONFIGURED.to_string()))?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest(messages::MESSAGE_REQUIRED.to_string()));
    }

    let answer = chat.ask(&animal_id, message).await?;
    Ok(Json(SendResponse {
        user_message: message.to_string(),
        assistant_message: answer.message().content.clone(),
    }))
}

#[derive(Serialize)]
pub struct ClearedResponse {
    pub success: bool,
    pub deleted: usize,
}

/// `DELETE /api/chat/:animal_id` — wipe the conversation and drop the
/// backend binding so the next question starts fresh.
pub async fn clear(
    State(ctx): State<AppContext>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let deleted = {
        let conn = ctx.db.conn();
        chat_message::delete_chat_messages_by_animal(&conn, &animal_id)?
    };
    if let Some(chat) = &ctx.chat {
        chat.forget_animal(&animal_id).await;
    }
    Ok(Json(ClearedResponse {
        success: true,
        deleted,
    }))
}
