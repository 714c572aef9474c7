//! PR Assign - pull request reviewer assignment service.
//!
//! Teams, users and pull requests live in SQLite. The assignment engine picks
//! reviewers from the author's team on creation, swaps single reviewers on
//! request, and refills review slots when members are deactivated in bulk.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::ServerSettings;
pub use error::AppError;
pub use services::{AppState, AssignmentEngine, ServerHandle};

/// Open the database, run migrations and start serving.
pub async fn run(settings: &ServerSettings) -> Result<ServerHandle, AppError> {
    let pool = db::initialize(&settings.database_path)
        .await
        .map_err(|e| AppError::internal(format!("Failed to initialize database: {}", e)))?;
    log::info!("Database ready at {}", settings.database_path.display());

    services::start_server(settings, AppState::new(pool)).await
}
