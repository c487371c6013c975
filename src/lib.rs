// cu-relay - HTTP relay for Azure AI Content Understanding

pub mod analyzer;
pub mod config;
pub mod credential;
pub mod document;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use types::{AppError, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
