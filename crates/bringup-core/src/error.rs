use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BringupError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("failed to start service '{service}': {reason}")]
    ServiceStart { service: String, reason: String },

    #[error(
        "service '{service}' not ready after {attempts} attempts ({}s elapsed)",
        .elapsed.as_secs()
    )]
    ReadinessTimeout {
        service: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, BringupError>;
