// src/routes/chat.rs
use axum::{
    Json,
    extract::{Path, State},
};
use tracing::debug;

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse, SessionView},
    services::controller::{context_banner, handle_chat},
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let (session_id, mut session) = state.sessions.acquire(payload.session_id.as_deref()).await;

    let reply = handle_chat(&mut session.state, state.advisor.as_ref(), &payload.message).await?;
    debug!(%session_id, turns = session.state.messages.len(), "chat turn complete");

    Ok(Json(ChatResponse { session_id, reply }))
}

pub async fn session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let snapshot = state
        .sessions
        .snapshot(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Unknown session: {session_id}")))?;

    Ok(Json(SessionView {
        context: context_banner(snapshot.predicted_disease.as_deref()),
        session_id,
        predicted_disease: snapshot.predicted_disease,
        messages: snapshot.messages,
    }))
}
