//! Final run report: status, reached endpoints, remediation hints.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Manifest;
use crate::orchestrate::RunOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: &'static str,
    pub exit_code: i32,
    pub message: String,
    /// Populated only on success.
    pub endpoints: Vec<Endpoint>,
    pub hints: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

pub fn build(outcome: &RunOutcome, manifest: &Manifest) -> RunReport {
    let (message, endpoints, hints) = match outcome {
        RunOutcome::Success => (
            "all services ready".to_string(),
            success_endpoints(manifest),
            Vec::new(),
        ),
        RunOutcome::ValidationFailed { reason } => (
            reason.clone(),
            Vec::new(),
            vec![format!(
                "review {} against .env.example before retrying",
                manifest.env_file
            )],
        ),
        RunOutcome::RuntimeUnavailable { reason } => (
            reason.clone(),
            Vec::new(),
            vec!["start the Docker daemon, then verify with: docker info".to_string()],
        ),
        RunOutcome::StartFailed { service, reason } => (
            format!("service '{service}' failed to start: {reason}"),
            Vec::new(),
            vec![format!("inspect the service logs: docker compose logs {service}")],
        ),
        RunOutcome::ReadinessTimeout {
            service,
            attempts,
            elapsed_secs,
        } => (
            format!("service '{service}' not ready after {attempts} attempts ({elapsed_secs}s)"),
            Vec::new(),
            vec![format!("inspect the service logs: docker compose logs {service}")],
        ),
        RunOutcome::MigrationFailed { reason } => (
            format!("migration failed: {reason}"),
            Vec::new(),
            vec![format!(
                "re-run manually: docker compose run --rm {} {}",
                manifest.migration.service,
                manifest.migration.command.join(" ")
            )],
        ),
    };

    RunReport {
        status: outcome.status(),
        exit_code: outcome.exit_code(),
        message,
        endpoints,
        hints,
        finished_at: Utc::now(),
    }
}

fn success_endpoints(manifest: &Manifest) -> Vec<Endpoint> {
    let base = manifest.app_url.trim_end_matches('/');
    vec![
        Endpoint {
            name: "api".to_string(),
            url: base.to_string(),
        },
        Endpoint {
            name: "docs".to_string(),
            url: format!("{base}/api/docs"),
        },
        Endpoint {
            name: "health".to_string(),
            url: format!("{base}/health"),
        },
    ]
}
