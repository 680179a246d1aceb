// src/services/controller.rs
//! Session controller: the two triggers (image upload, chat submission) and
//! the prompt construction that carries the last prediction into the chat.

use std::{path::PathBuf, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    advisor::AdviceService,
    session_manager::{ChatRole, SessionState},
};
use crate::vision::{
    Classifier, ClassifierError, LoadedModel, PredictionResult, PreprocessError, preprocess_image,
};

/// Phrases that make a chat message refer to the stored disease.
pub const REFERENTIAL_PHRASES: [&str; 5] =
    ["this disease", "that disease", "the disease", "about it", "more about"];

/// The classifier as loaded once at startup.
#[derive(Clone)]
pub enum ModelStatus {
    Ready(Arc<dyn Classifier>),
    Unavailable { path: PathBuf, reason: String },
}

impl ModelStatus {
    /// Load the model, turning any failure into an unavailable status.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match LoadedModel::load(&path) {
            Ok(model) => Self::Ready(Arc::new(model)),
            Err(e) => {
                match &e {
                    ClassifierError::NotFound(_) => warn!(
                        path = %path.display(),
                        "model file not found; predictions disabled"
                    ),
                    _ => warn!(error = %e, "error loading model; predictions disabled"),
                }
                Self::Unavailable { path, reason: e.to_string() }
            }
        }
    }

    pub fn classifier(&self) -> Option<&Arc<dyn Classifier>> {
        match self {
            Self::Ready(c) => Some(c),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(
        "❌ Cannot make predictions without a trained model. \
         💡 Place your model file at '{path}' and restart the server. ({reason})"
    )]
    ModelUnavailable { path: String, reason: String },
    #[error(transparent)]
    Decode(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] ClassifierError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub prediction: PredictionResult,
    pub explanation: String,
}

pub fn explanation_prompt(label: &str) -> String {
    format!(
        "The detected plant disease is {label}. \
         Explain its causes, symptoms, and prevention in simple terms."
    )
}

pub fn refers_to_disease(message: &str) -> bool {
    let lower = message.to_lowercase();
    REFERENTIAL_PHRASES.iter().any(|p| lower.contains(p))
}

/// Wrap a chat message with whatever prediction context the session holds.
pub fn build_prompt(predicted_disease: Option<&str>, message: &str) -> String {
    match predicted_disease.filter(|d| !d.is_empty()) {
        None => message.to_string(),
        Some(disease) if refers_to_disease(message) => format!(
            "The user is asking about {disease} (recently predicted plant disease). \
             User question: {message}"
        ),
        Some(disease) => format!(
            "Context: Recently detected plant disease is {disease}. User question: {message}"
        ),
    }
}

/// Banner shown above the chat.
pub fn context_banner(predicted_disease: Option<&str>) -> String {
    match predicted_disease.filter(|d| !d.is_empty()) {
        Some(disease) => format!(
            "💡 Current Disease Context: {disease}. \
             Ask about this disease or any other plant care topics!"
        ),
        None => "Ask anything about plant care, disease prevention, or remedies!".to_string(),
    }
}

/// Normalize, classify, remember the label and fetch an explanation.
pub async fn handle_upload(
    state: &mut SessionState,
    model: &ModelStatus,
    advisor: &dyn AdviceService,
    image: Vec<u8>,
) -> Result<UploadOutcome, UploadError> {
    let classifier = match model {
        ModelStatus::Ready(c) => Arc::clone(c),
        ModelStatus::Unavailable { path, reason } => {
            return Err(UploadError::ModelUnavailable {
                path: path.display().to_string(),
                reason: reason.clone(),
            });
        }
    };

    // Decoding and the forward pass are CPU bound.
    let prediction = tokio::task::spawn_blocking(move || -> Result<_, UploadError> {
        let tensor = preprocess_image(&image)?;
        Ok(classifier.predict(&tensor)?)
    })
    .await
    .map_err(|e| ClassifierError::Inference(e.to_string()))??;

    info!(label = %prediction.label, confidence = prediction.confidence, "image classified");
    state.predicted_disease = Some(prediction.label.clone());

    let explanation = advisor.ask(&explanation_prompt(&prediction.label)).await;
    Ok(UploadOutcome { prediction, explanation })
}

/// Record the user message, ask with context, record and return the reply.
pub async fn handle_chat(
    state: &mut SessionState,
    advisor: &dyn AdviceService,
    message: &str,
) -> Result<String, ChatError> {
    if message.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    state.push(ChatRole::User, message);
    let prompt = build_prompt(state.predicted_disease.as_deref(), message);
    let reply = advisor.ask(&prompt).await;
    state.push(ChatRole::Assistant, reply.clone());
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referential_branch_names_label() {
        let prompt = build_prompt(Some("Tomato Early Blight"), "tell me more about this disease");
        assert!(prompt.starts_with("The user is asking about Tomato Early Blight"));
        assert!(prompt.ends_with("User question: tell me more about this disease"));
    }

    #[test]
    fn generic_branch_prepends_context() {
        let prompt = build_prompt(Some("Tomato Early Blight"), "how often should I water tomatoes");
        assert_eq!(
            prompt,
            "Context: Recently detected plant disease is Tomato Early Blight. \
             User question: how often should I water tomatoes"
        );
    }

    #[test]
    fn no_context_passes_message_verbatim() {
        let msg = "What are common tomato plant diseases?";
        assert_eq!(build_prompt(None, msg), msg);
        assert_eq!(build_prompt(Some(""), msg), msg);
    }

    #[test]
    fn phrase_match_ignores_case() {
        assert!(refers_to_disease("Tell me MORE ABOUT it"));
        assert!(refers_to_disease("is THE DISEASE contagious?"));
        assert!(!refers_to_disease("how do I treat it"));
    }

    #[test]
    fn banner_reflects_context() {
        assert!(context_banner(Some("Apple Scab")).contains("Apple Scab"));
        assert!(context_banner(None).starts_with("Ask anything"));
    }
}
