use std::path::Path;

use bringup_core::config::Manifest;
use bringup_core::env::EnvConfig;
use bringup_core::report;
use bringup_core::runtime::ComposeRuntime;
use bringup_core::{Orchestrator, Plan, RunOutcome};

use crate::output;

/// Run one bring-up attempt and print its report. The returned value is the
/// process exit code — distinct per outcome, 0 only on success.
pub fn run(root: &Path, env_file: Option<&Path>, json: bool, plan: Plan) -> anyhow::Result<i32> {
    let (outcome, manifest) = execute(root, env_file, plan);
    let report = report::build(&outcome, &manifest);

    if json {
        output::print_json(&report)?;
    } else {
        output::print_report(&report);
    }

    Ok(report.exit_code)
}

fn execute(root: &Path, env_file: Option<&Path>, plan: Plan) -> (RunOutcome, Manifest) {
    let manifest = match Manifest::load(root) {
        Ok(manifest) => manifest,
        Err(e) => return (RunOutcome::from_error(e), Manifest::default()),
    };

    let env_path = match env_file {
        Some(path) => path.to_path_buf(),
        None => root.join(&manifest.env_file),
    };

    let env = match EnvConfig::load(&env_path) {
        Ok(env) => env,
        Err(e) => return (RunOutcome::from_error(e), manifest),
    };

    let runtime = ComposeRuntime::new(root, &manifest);
    let outcome = Orchestrator::new(&env, &manifest, &runtime).run(plan);
    (outcome, manifest)
}
