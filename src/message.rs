// src/message.rs
use serde::{Deserialize, Serialize};

use crate::{services::session_manager::ChatMessage, vision::PredictionResult};

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
}

#[derive(Serialize, Deserialize)]
pub struct PredictResponse {
    pub session_id: String,
    pub prediction: PredictionResult,
    pub explanation: String,
}

#[derive(Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub predicted_disease: Option<String>,
    pub context: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub model_loaded: bool,
    pub labels: usize,
    pub detail: Option<String>,
    pub sessions: usize,
}
