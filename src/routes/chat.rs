use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldError},
    middleware::{resolve_user_id, CurrentUser},
    models::ChatMessage,
    routes::AppState,
    services::{
        ai,
        chat::{self, ChatReply},
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

pub async fn chat(
    State(state): State<AppState>,
    session: Option<CurrentUser>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    let user_id = resolve_user_id(request.user_id, session)?;
    if request.message.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "message",
            "Message is required",
        )]));
    }

    let model = ai::build_conversation_model(&state.ai)
        .map_err(|e| AppError::from_ai(e, "Failed to get chat response"))?;
    let entries = state.catalog.all_for_user(user_id).await?;

    tracing::info!(user_id = %user_id, history = request.conversation_history.len(), "Chat request");

    let reply = chat::chat(
        model.as_ref(),
        &entries,
        request.conversation_history,
        &request.message,
    )
    .await?;
    Ok(Json(reply))
}
