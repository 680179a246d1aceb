pub mod advisor;
pub mod controller;
pub mod credentials;
pub mod session_manager;
