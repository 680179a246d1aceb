mod common;

use std::sync::Arc;

use common::{LABELS, RecordingAdvisor, solid_png, write_model};
use leaf_doctor::services::{
    controller::{ChatError, ModelStatus, UploadError, handle_chat, handle_upload},
    session_manager::{ChatRole, SessionState},
};
use leaf_doctor::vision::PreprocessError;
use tempfile::TempDir;

fn ready_model() -> ModelStatus {
    ModelStatus::Ready(Arc::new(common::loaded_model()))
}

#[tokio::test]
async fn upload_then_ask_carries_label_into_prompt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("models/best_plant_model.json");
    write_model(&path);
    let model = ModelStatus::load(&path);
    assert!(model.classifier().is_some());

    let advisor = RecordingAdvisor::default();
    let mut state = SessionState::default();

    let outcome = handle_upload(&mut state, &model, &advisor, solid_png(320, 240, [40, 160, 40]))
        .await
        .unwrap();
    let label = outcome.prediction.label.clone();
    assert!(LABELS.contains(&label.as_str()));
    assert!((0.0..=100.0).contains(&outcome.prediction.confidence));
    assert_eq!(state.predicted_disease.as_deref(), Some(label.as_str()));

    // Automatic explanation request.
    let prompts = advisor.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with(&format!("The detected plant disease is {label}.")));
    assert_eq!(outcome.explanation, "advice #1");

    let reply = handle_chat(&mut state, &advisor, "explain prevention").await.unwrap();
    assert_eq!(reply, "advice #2");
    let prompts = advisor.prompts().await;
    assert!(prompts[1].contains(&label));
    assert!(prompts[1].ends_with("User question: explain prevention"));
}

#[tokio::test]
async fn chat_branches_follow_stored_context() {
    let advisor = RecordingAdvisor::default();
    let mut state = SessionState::default();

    handle_chat(&mut state, &advisor, "how do I prune roses").await.unwrap();

    state.predicted_disease = Some("Tomato Early Blight".to_string());
    handle_chat(&mut state, &advisor, "tell me more about this disease").await.unwrap();
    handle_chat(&mut state, &advisor, "how often should I water tomatoes").await.unwrap();

    let prompts = advisor.prompts().await;
    assert_eq!(prompts[0], "how do I prune roses");
    assert_eq!(
        prompts[1],
        "The user is asking about Tomato Early Blight (recently predicted plant disease). \
         User question: tell me more about this disease"
    );
    assert!(prompts[2].starts_with("Context: Recently detected plant disease is Tomato Early Blight."));
}

#[tokio::test]
async fn chat_history_is_appended_in_order() {
    let advisor = RecordingAdvisor::default();
    let mut state = SessionState::default();

    handle_chat(&mut state, &advisor, "first").await.unwrap();
    handle_chat(&mut state, &advisor, "second").await.unwrap();

    let roles: Vec<ChatRole> = state.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
    );
    assert_eq!(state.messages[2].content, "second");
    assert_eq!(state.messages[3].content, "advice #2");
}

#[tokio::test]
async fn padded_message_reaches_advisor_unchanged() {
    let advisor = RecordingAdvisor::default();
    let mut state = SessionState::default();
    let raw = "  how do I prune roses?\n";

    handle_chat(&mut state, &advisor, raw).await.unwrap();

    assert_eq!(advisor.prompts().await, vec![raw.to_string()]);
    assert_eq!(state.messages[0].content, raw);

    state.predicted_disease = Some("Apple Scab".to_string());
    handle_chat(&mut state, &advisor, raw).await.unwrap();
    assert!(advisor.prompts().await[1].ends_with(&format!("User question: {raw}")));
}

#[tokio::test]
async fn blank_chat_message_is_rejected() {
    let advisor = RecordingAdvisor::default();
    let mut state = SessionState::default();

    let err = handle_chat(&mut state, &advisor, "   ").await.unwrap_err();
    assert_eq!(err, ChatError::EmptyMessage);
    assert!(state.messages.is_empty());
    assert!(advisor.prompts().await.is_empty());
}

#[tokio::test]
async fn new_upload_overwrites_context() {
    let advisor = RecordingAdvisor::default();
    let model = ready_model();
    let mut state = SessionState {
        predicted_disease: Some("Grape Black Rot".to_string()),
        messages: Vec::new(),
    };

    let outcome = handle_upload(&mut state, &model, &advisor, solid_png(50, 50, [220, 20, 20]))
        .await
        .unwrap();
    let stored = state.predicted_disease.as_deref().unwrap();
    assert_eq!(stored, outcome.prediction.label);
    assert!(LABELS.contains(&stored));
}

#[tokio::test]
async fn missing_model_gives_guidance_without_touching_state() {
    let dir = TempDir::new().unwrap();
    let model = ModelStatus::load(dir.path().join("best_plant_model.json"));
    assert!(model.classifier().is_none());

    let advisor = RecordingAdvisor::default();
    let mut state = SessionState::default();
    let err = handle_upload(&mut state, &model, &advisor, solid_png(10, 10, [0, 0, 0]))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::ModelUnavailable { .. }));
    assert!(err.to_string().contains("Cannot make predictions without a trained model"));
    assert_eq!(state, SessionState::default());
    assert!(advisor.prompts().await.is_empty());
}

#[tokio::test]
async fn invalid_image_is_reported_and_context_kept() {
    let advisor = RecordingAdvisor::default();
    let mut state = SessionState {
        predicted_disease: Some("Apple Scab".to_string()),
        messages: Vec::new(),
    };

    let err = handle_upload(&mut state, &ready_model(), &advisor, b"not an image".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Decode(PreprocessError::Decode(_))));
    assert_eq!(state.predicted_disease.as_deref(), Some("Apple Scab"));
    assert!(advisor.prompts().await.is_empty());
}
