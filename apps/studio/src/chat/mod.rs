pub mod extract;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod submit;
