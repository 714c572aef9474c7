//! Server configuration.
//!
//! Settings come from environment variables with built-in defaults for
//! anything unset. `RUST_LOG` keeps its usual meaning for the log filter.

use std::path::PathBuf;

use crate::error::AppError;

pub const ENV_HOST: &str = "PR_ASSIGN_HOST";
pub const ENV_PORT: &str = "PR_ASSIGN_PORT";
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind the HTTP server on.
    pub port: u16,
    /// SQLite database file; parent directories are created on startup.
    pub database_path: PathBuf,
    /// `tracing-subscriber` env filter directive.
    pub log_filter: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: PathBuf::from("data/pr-assign.db"),
            log_filter: "pr_assign=info,tower_http=info".to_string(),
        }
    }
}

impl ServerSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(host) = get(ENV_HOST) {
            settings.host = host.trim().to_string();
        }
        if let Some(raw) = get(ENV_PORT) {
            let port = raw.trim().parse::<u16>().map_err(|_| {
                AppError::validation_field(format!("Invalid port: {}", raw.trim()), "port")
            })?;
            validate_port(port)?;
            settings.port = port;
        }
        if let Some(path) = get(ENV_DATABASE_PATH) {
            settings.database_path = PathBuf::from(path.trim());
        }
        if let Some(filter) = get(ENV_LOG_FILTER) {
            settings.log_filter = filter;
        }

        Ok(settings)
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Validate that a port number is in the allowed range.
fn validate_port(port: u16) -> Result<(), AppError> {
    if port < 1024 {
        return Err(AppError::validation_field(
            "Port must be between 1024 and 65535",
            "port",
        ));
    }
    Ok(())
}
