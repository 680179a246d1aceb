// src/state.rs
use std::sync::Arc;
use std::time::Duration;

use crate::services::{
    advisor::AdviceService, controller::ModelStatus, session_manager::SessionManager,
};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub sessions: SessionManager,
    pub model: ModelStatus,
    pub advisor: Arc<dyn AdviceService>,
}

impl AppState {
    pub fn new(session_ttl: Duration, model: ModelStatus, advisor: Arc<dyn AdviceService>) -> Self {
        Self {
            sessions: SessionManager::new(session_ttl),
            model,
            advisor,
        }
    }
}
