//! The bring-up state machine.
//!
//! Stages run strictly sequentially because each depends on the previous one
//! succeeding: the data tier must be *ready* (not merely started) before
//! migrations run, and migrations must complete before the application tier
//! starts. Every stage either advances the machine or produces the run's
//! single terminal [`RunOutcome`]; there are no retries across stage
//! boundaries.

use std::time::Duration;

use tracing::info;

use crate::config::{Manifest, Tier};
use crate::env::{DeployMode, EnvConfig};
use crate::error::{BringupError, Result};
use crate::lifecycle::{self, TeardownGuard};
use crate::migrate;
use crate::probe;
use crate::readiness::{self, PollPolicy, ReadinessJob};
use crate::runtime::Runtime;
use crate::validate;

// ---------------------------------------------------------------------------
// Stage / Plan / RunOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    CheckingRuntime,
    StoppingExisting,
    StartingDataTier,
    AwaitingDataReady,
    Migrating,
    StartingAppTier,
    AwaitingAppReady,
    Succeeded,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::CheckingRuntime => "checking runtime",
            Stage::StoppingExisting => "stopping existing services",
            Stage::StartingDataTier => "starting data tier",
            Stage::AwaitingDataReady => "awaiting data tier readiness",
            Stage::Migrating => "migrating",
            Stage::StartingAppTier => "starting application tier",
            Stage::AwaitingAppReady => "awaiting application readiness",
            Stage::Succeeded => "succeeded",
        }
    }
}

/// Which bring-up flavor to run.
///
/// `Dev` brings up the full stack in place: data tier, migrations, then the
/// application. `Prod` assumes the data tier is managed separately and adds
/// configuration hardening and an image build before rolling the app tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Dev,
    Prod,
}

impl Plan {
    pub fn target_mode(&self) -> DeployMode {
        match self {
            Plan::Dev => DeployMode::Development,
            Plan::Prod => DeployMode::Production,
        }
    }
}

/// Terminal classification of one orchestration attempt. Produced exactly
/// once, by the first failing stage or by the final stage on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    ValidationFailed { reason: String },
    RuntimeUnavailable { reason: String },
    StartFailed { service: String, reason: String },
    ReadinessTimeout {
        service: String,
        attempts: u32,
        elapsed_secs: u64,
    },
    MigrationFailed { reason: String },
}

impl RunOutcome {
    pub fn from_error(err: BringupError) -> Self {
        match err {
            BringupError::Configuration(reason) => RunOutcome::ValidationFailed { reason },
            BringupError::RuntimeUnavailable(reason) => RunOutcome::RuntimeUnavailable { reason },
            BringupError::ServiceStart { service, reason } => {
                RunOutcome::StartFailed { service, reason }
            }
            BringupError::ReadinessTimeout {
                service,
                attempts,
                elapsed,
            } => RunOutcome::ReadinessTimeout {
                service,
                attempts,
                elapsed_secs: elapsed.as_secs(),
            },
            BringupError::Migration(reason) => RunOutcome::MigrationFailed { reason },
        }
    }

    /// Stable snake_case name, used for reporting and `--json` output.
    pub fn status(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::ValidationFailed { .. } => "validation_failed",
            RunOutcome::RuntimeUnavailable { .. } => "runtime_unavailable",
            RunOutcome::StartFailed { .. } => "start_failed",
            RunOutcome::ReadinessTimeout { .. } => "readiness_timeout",
            RunOutcome::MigrationFailed { .. } => "migration_failed",
        }
    }

    /// Distinct exit code per outcome so callers can branch on the failure
    /// kind without parsing output.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::ValidationFailed { .. } => 2,
            RunOutcome::RuntimeUnavailable { .. } => 3,
            RunOutcome::StartFailed { .. } => 4,
            RunOutcome::ReadinessTimeout { .. } => 5,
            RunOutcome::MigrationFailed { .. } => 6,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    env: &'a EnvConfig,
    manifest: &'a Manifest,
    runtime: &'a dyn Runtime,
}

impl<'a> Orchestrator<'a> {
    pub fn new(env: &'a EnvConfig, manifest: &'a Manifest, runtime: &'a dyn Runtime) -> Self {
        Self {
            env,
            manifest,
            runtime,
        }
    }

    /// Drive one bring-up attempt to its terminal outcome.
    pub fn run(&self, plan: Plan) -> RunOutcome {
        match self.try_run(plan) {
            Ok(()) => {
                self.enter(Stage::Succeeded);
                RunOutcome::Success
            }
            Err(err) => {
                tracing::error!(error = %err, "bring-up failed");
                RunOutcome::from_error(err)
            }
        }
    }

    fn try_run(&self, plan: Plan) -> Result<()> {
        self.enter(Stage::Validating);
        validate::validate(self.env, plan.target_mode())?;

        self.enter(Stage::CheckingRuntime);
        self.runtime.check_available()?;

        match plan {
            Plan::Dev => self.run_dev(),
            Plan::Prod => self.run_prod(),
        }
    }

    fn run_dev(&self) -> Result<()> {
        self.enter(Stage::StoppingExisting);
        lifecycle::stop_existing(self.runtime)?;

        let guard = TeardownGuard::new(self.runtime);

        self.enter(Stage::StartingDataTier);
        lifecycle::start_tier(self.runtime, self.manifest, Tier::Data)?;

        self.enter(Stage::AwaitingDataReady);
        self.await_tier(Tier::Data)?;

        self.enter(Stage::Migrating);
        migrate::run(self.runtime, &self.manifest.migration)?;

        self.enter(Stage::StartingAppTier);
        lifecycle::start_tier(self.runtime, self.manifest, Tier::App)?;

        self.enter(Stage::AwaitingAppReady);
        self.await_tier(Tier::App)?;

        guard.disarm();
        Ok(())
    }

    /// Production rollout. The data tier is managed outside this run, so no
    /// stop/start happens for it and no teardown guard is armed — a failed
    /// deploy leaves the previous state in place for the operator to inspect.
    fn run_prod(&self) -> Result<()> {
        lifecycle::build_tier(self.runtime, self.manifest, Tier::App)?;

        self.enter(Stage::Migrating);
        migrate::run(self.runtime, &self.manifest.migration)?;

        self.enter(Stage::StartingAppTier);
        lifecycle::start_tier(self.runtime, self.manifest, Tier::App)?;

        self.enter(Stage::AwaitingAppReady);
        self.await_tier(Tier::App)?;

        Ok(())
    }

    /// Await every probed service in the tier concurrently; the stage only
    /// advances once all of them report ready.
    fn await_tier(&self, tier: Tier) -> Result<()> {
        let client = reqwest::blocking::Client::new();
        let client = &client;
        let runtime = self.runtime;

        let jobs: Vec<ReadinessJob<_>> = self
            .manifest
            .tier_services(tier)
            .filter(|s| s.probe.is_some())
            .map(|svc| ReadinessJob {
                service: svc.name.clone(),
                policy: PollPolicy::new(
                    Duration::from_secs(svc.probe_interval_secs),
                    svc.max_attempts,
                ),
                probe: move || probe::check(runtime, client, svc),
            })
            .collect();

        let reports = readiness::await_all(jobs)?;
        for report in &reports {
            info!(
                service = %report.service,
                attempts = report.attempts,
                "service ready"
            );
        }
        Ok(())
    }

    fn enter(&self, stage: Stage) {
        info!(stage = stage.name(), "stage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationStep, ProbeSpec, ServiceDescriptor};
    use crate::env::PLACEHOLDER_SECRET;
    use crate::runtime::ExecResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockRuntime {
        available: bool,
        /// Exec probe for a service succeeds on the Nth call (default 1st).
        ready_after: HashMap<String, u32>,
        reject_start: Option<String>,
        migration_ok: bool,
        events: Mutex<Vec<String>>,
        exec_counts: Mutex<HashMap<String, u32>>,
    }

    impl Default for MockRuntime {
        fn default() -> Self {
            Self {
                available: true,
                ready_after: HashMap::new(),
                reject_start: None,
                migration_ok: true,
                events: Mutex::new(Vec::new()),
                exec_counts: Mutex::new(HashMap::new()),
            }
        }
    }

    impl MockRuntime {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn start_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| e.starts_with("up "))
                .count()
        }
    }

    impl Runtime for MockRuntime {
        fn check_available(&self) -> Result<()> {
            self.push("info".to_string());
            if self.available {
                Ok(())
            } else {
                Err(BringupError::RuntimeUnavailable(
                    "daemon not running".to_string(),
                ))
            }
        }

        fn stop_all(&self) -> Result<()> {
            self.push("down".to_string());
            Ok(())
        }

        fn start_service(&self, service: &str) -> Result<()> {
            self.push(format!("up {service}"));
            if self.reject_start.as_deref() == Some(service) {
                return Err(BringupError::ServiceStart {
                    service: service.to_string(),
                    reason: "no such image".to_string(),
                });
            }
            Ok(())
        }

        fn exec(&self, service: &str, _command: &[String]) -> Result<ExecResult> {
            let mut counts = self.exec_counts.lock().unwrap();
            let count = counts.entry(service.to_string()).or_insert(0);
            *count += 1;
            let needed = self.ready_after.get(service).copied().unwrap_or(1);
            Ok(ExecResult {
                success: *count >= needed,
                detail: String::new(),
            })
        }

        fn run_once(&self, service: &str, _command: &[String]) -> Result<ExecResult> {
            self.push(format!("run_once {service}"));
            Ok(ExecResult {
                success: self.migration_ok,
                detail: if self.migration_ok {
                    String::new()
                } else {
                    "alembic failed".to_string()
                },
            })
        }

        fn build(&self, service: &str) -> Result<()> {
            self.push(format!("build {service}"));
            Ok(())
        }
    }

    fn exec_service(name: &str, tier: Tier, max_attempts: u32) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.to_string(),
            tier,
            probe: Some(ProbeSpec::Exec {
                command: vec!["check".to_string()],
            }),
            probe_interval_secs: 0,
            max_attempts,
        }
    }

    fn test_manifest() -> Manifest {
        Manifest {
            services: vec![
                exec_service("postgres", Tier::Data, 5),
                exec_service("redis", Tier::Data, 5),
                exec_service("backend", Tier::App, 5),
            ],
            migration: MigrationStep {
                service: "backend".to_string(),
                command: vec!["alembic".to_string(), "upgrade".to_string(), "head".to_string()],
            },
            ..Manifest::default()
        }
    }

    fn dev_env() -> EnvConfig {
        EnvConfig::from_pairs([
            ("ENVIRONMENT", "development"),
            ("SECRET_KEY", PLACEHOLDER_SECRET),
        ])
    }

    fn position(events: &[String], event: &str) -> usize {
        events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event '{event}' missing from {events:?}"))
    }

    #[test]
    fn placeholder_secret_in_prod_fails_before_any_runtime_call() {
        let runtime = MockRuntime::default();
        let env = EnvConfig::from_pairs([
            ("ENVIRONMENT", "production"),
            ("SECRET_KEY", PLACEHOLDER_SECRET),
        ]);
        let manifest = test_manifest();

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Prod);

        assert!(matches!(outcome, RunOutcome::ValidationFailed { .. }));
        assert_eq!(outcome.exit_code(), 2);
        assert!(runtime.events().is_empty(), "no runtime call expected");
        assert_eq!(runtime.start_count(), 0);
    }

    #[test]
    fn unavailable_runtime_issues_no_start_requests() {
        let runtime = MockRuntime {
            available: false,
            ..Default::default()
        };
        let manifest = test_manifest();
        let env = dev_env();

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Dev);

        assert!(matches!(outcome, RunOutcome::RuntimeUnavailable { .. }));
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(runtime.start_count(), 0);
    }

    #[test]
    fn dev_path_succeeds_with_slow_postgres() {
        let runtime = MockRuntime {
            ready_after: HashMap::from([("postgres".to_string(), 3)]),
            ..Default::default()
        };
        let manifest = test_manifest();
        let env = dev_env();

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Dev);

        assert_eq!(outcome, RunOutcome::Success);
        assert_eq!(outcome.exit_code(), 0);

        let events = runtime.events();
        assert_eq!(events[0], "info");
        assert_eq!(events[1], "down");
        // Data tier starts before migration, migration before app start.
        assert!(position(&events, "up postgres") < position(&events, "run_once backend"));
        assert!(position(&events, "up redis") < position(&events, "run_once backend"));
        assert!(position(&events, "run_once backend") < position(&events, "up backend"));
        assert_eq!(runtime.exec_counts.lock().unwrap()["postgres"], 3);
    }

    #[test]
    fn app_tier_never_starts_before_data_tier_is_ready() {
        let runtime = MockRuntime {
            ready_after: HashMap::from([("postgres".to_string(), 100)]),
            ..Default::default()
        };
        let manifest = test_manifest();
        let env = dev_env();

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Dev);

        match &outcome {
            RunOutcome::ReadinessTimeout {
                service, attempts, ..
            } => {
                assert_eq!(service, "postgres");
                assert_eq!(*attempts, 5);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(outcome.exit_code(), 5);

        let events = runtime.events();
        assert!(!events.contains(&"run_once backend".to_string()), "migration ran");
        assert!(!events.contains(&"up backend".to_string()), "app tier started");
        // Teardown guard stops the partially started stack.
        assert_eq!(events.last().map(|s| s.as_str()), Some("down"));
    }

    #[test]
    fn migration_failure_halts_before_app_tier() {
        let runtime = MockRuntime {
            migration_ok: false,
            ..Default::default()
        };
        let manifest = test_manifest();
        let env = dev_env();

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Dev);

        assert!(matches!(outcome, RunOutcome::MigrationFailed { .. }));
        assert_eq!(outcome.exit_code(), 6);
        assert!(!runtime.events().contains(&"up backend".to_string()));
    }

    #[test]
    fn rejected_start_request_is_fatal_and_named() {
        let runtime = MockRuntime {
            reject_start: Some("redis".to_string()),
            ..Default::default()
        };
        let manifest = test_manifest();
        let env = dev_env();

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Dev);

        match outcome {
            RunOutcome::StartFailed { service, .. } => assert_eq!(service, "redis"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn prod_path_builds_and_skips_data_tier() {
        let runtime = MockRuntime::default();
        let manifest = test_manifest();
        let env = EnvConfig::from_pairs([
            ("ENVIRONMENT", "production"),
            ("SECRET_KEY", "real-secret"),
        ]);

        let outcome = Orchestrator::new(&env, &manifest, &runtime).run(Plan::Prod);

        assert_eq!(outcome, RunOutcome::Success);
        let events = runtime.events();
        assert!(!events.contains(&"up postgres".to_string()));
        assert!(!events.contains(&"up redis".to_string()));
        assert!(!events.contains(&"down".to_string()));
        assert!(position(&events, "build backend") < position(&events, "run_once backend"));
        assert!(position(&events, "run_once backend") < position(&events, "up backend"));
    }

    #[test]
    fn exit_codes_are_distinct_per_outcome() {
        let outcomes = [
            RunOutcome::Success,
            RunOutcome::ValidationFailed {
                reason: String::new(),
            },
            RunOutcome::RuntimeUnavailable {
                reason: String::new(),
            },
            RunOutcome::StartFailed {
                service: String::new(),
                reason: String::new(),
            },
            RunOutcome::ReadinessTimeout {
                service: String::new(),
                attempts: 0,
                elapsed_secs: 0,
            },
            RunOutcome::MigrationFailed {
                reason: String::new(),
            },
        ];

        let codes: Vec<i32> = outcomes.iter().map(|o| o.exit_code()).collect();
        let mut unique = codes.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        assert_eq!(codes[0], 0);
    }
}
