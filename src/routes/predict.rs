// src/routes/predict.rs
use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::info;

use crate::{
    error::AppError,
    message::{PredictResponse, StatusResponse},
    services::controller::{ModelStatus, handle_upload},
    state::SharedState,
    vision::Classifier,
};

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn accepted_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub async fn predict_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, AppError> {
    let mut image = None;
    let mut session_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                if let Some(file_name) = field.file_name() {
                    if !accepted_file_name(file_name) {
                        return Err(AppError::Unprocessable(format!(
                            "Unsupported file type: {file_name} (expected jpg, jpeg or png)"
                        )));
                    }
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                image = Some(bytes.to_vec());
            }
            Some("session_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                session_id = Some(text);
            }
            _ => {}
        }
    }

    let image = image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'image' upload".to_string()))?;

    let (session_id, mut session) = state.sessions.acquire(session_id.as_deref()).await;

    let outcome =
        handle_upload(&mut session.state, &state.model, state.advisor.as_ref(), image).await?;
    info!(%session_id, label = %outcome.prediction.label, "prediction stored in session");

    Ok(Json(PredictResponse {
        session_id,
        prediction: outcome.prediction,
        explanation: outcome.explanation,
    }))
}

pub async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let (labels, detail) = match &state.model {
        ModelStatus::Ready(c) => (c.labels().len(), None),
        ModelStatus::Unavailable { reason, .. } => (0, Some(reason.clone())),
    };

    Json(StatusResponse {
        model_loaded: state.model.classifier().is_some(),
        labels,
        detail,
        sessions: state.sessions.len().await,
    })
}
