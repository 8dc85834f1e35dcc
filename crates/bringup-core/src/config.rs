//! Service manifest: which services to bring up, in which tier, and how to
//! probe them.
//!
//! A `bringup.yaml` at the project root overrides the built-in DevFlow stack
//! (postgres + redis data tier, backend app tier). A missing manifest is not
//! an error — the defaults describe the standard compose file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BringupError, Result};

pub const MANIFEST_FILE: &str = "bringup.yaml";

const DEFAULT_APP_URL: &str = "http://localhost:8000";

// ---------------------------------------------------------------------------
// ServiceDescriptor
// ---------------------------------------------------------------------------

/// Dependency rank of a service. All data-tier services must be ready before
/// any app-tier service is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Data,
    App,
}

/// How to ask a service whether it can accept functional requests.
/// Distinct from "process started" — a probe result is always binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeSpec {
    /// One-shot command exec'd inside the running container; exit 0 = ready.
    Exec { command: Vec<String> },
    /// HTTP GET; a success status = ready.
    Http { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub tier: Tier,
    /// Services without a probe are considered ready as soon as their start
    /// request is accepted.
    #[serde(default)]
    pub probe: Option<ProbeSpec>,
    #[serde(default = "default_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_secs() -> u64 {
    2
}

fn default_max_attempts() -> u32 {
    30
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Compose service whose image carries the migration tool.
    pub service: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_compose_file")]
    pub compose_file: String,
    #[serde(default = "default_env_file")]
    pub env_file: String,
    /// Public base URL of the application, reported on success.
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default = "default_services")]
    pub services: Vec<ServiceDescriptor>,
    #[serde(default = "default_migration")]
    pub migration: MigrationStep,
}

fn default_project() -> String {
    "devflow".to_string()
}

fn default_compose_file() -> String {
    "docker-compose.yml".to_string()
}

fn default_env_file() -> String {
    ".env".to_string()
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

fn default_services() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor {
            name: "postgres".to_string(),
            tier: Tier::Data,
            probe: Some(ProbeSpec::Exec {
                command: vec![
                    "pg_isready".to_string(),
                    "-U".to_string(),
                    "devflow".to_string(),
                ],
            }),
            // In-process check: poll fast, give up early.
            probe_interval_secs: 1,
            max_attempts: 30,
        },
        ServiceDescriptor {
            name: "redis".to_string(),
            tier: Tier::Data,
            probe: Some(ProbeSpec::Exec {
                command: vec!["redis-cli".to_string(), "ping".to_string()],
            }),
            probe_interval_secs: 1,
            max_attempts: 30,
        },
        ServiceDescriptor {
            name: "backend".to_string(),
            tier: Tier::App,
            // Full health check covering the app's own dependency connections,
            // so poll slower with a longer overall timeout.
            probe: Some(ProbeSpec::Http {
                url: format!("{DEFAULT_APP_URL}/health"),
            }),
            probe_interval_secs: 2,
            max_attempts: 30,
        },
    ]
}

fn default_migration() -> MigrationStep {
    MigrationStep {
        service: "backend".to_string(),
        command: vec![
            "alembic".to_string(),
            "upgrade".to_string(),
            "head".to_string(),
        ],
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            project: default_project(),
            compose_file: default_compose_file(),
            env_file: default_env_file(),
            app_url: default_app_url(),
            services: default_services(),
            migration: default_migration(),
        }
    }
}

impl Manifest {
    /// Load `bringup.yaml` from the project root, falling back to the
    /// built-in stack when the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            BringupError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&contents).map_err(|e| {
            BringupError::Configuration(format!("failed to parse {}: {e}", path.display()))
        })
    }

    pub fn tier_services(&self, tier: Tier) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter().filter(move |s| s.tier == tier)
    }
}
