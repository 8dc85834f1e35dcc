use std::path::Path;

use bringup_core::config::Manifest;
use bringup_core::env::{DeployMode, EnvConfig};
use bringup_core::{report, validate, RunOutcome};

use crate::output;

/// Run the precondition validator on its own — no runtime calls, no service
/// actions. Useful before a deploy or in CI.
pub fn run(root: &Path, env_file: Option<&Path>, production: bool, json: bool) -> anyhow::Result<i32> {
    let mode = if production {
        DeployMode::Production
    } else {
        DeployMode::Development
    };

    let (manifest, manifest_err) = match Manifest::load(root) {
        Ok(manifest) => (manifest, None),
        Err(e) => (Manifest::default(), Some(e)),
    };
    let env_path = match env_file {
        Some(path) => path.to_path_buf(),
        None => root.join(&manifest.env_file),
    };

    let checked = match manifest_err {
        Some(e) => Err(e),
        None => EnvConfig::load(&env_path).and_then(|env| validate::validate(&env, mode)),
    };

    match checked {
        Ok(()) => {
            if json {
                output::print_json(&serde_json::json!({
                    "status": "ok",
                    "mode": mode.as_str(),
                }))?;
            } else {
                println!("configuration ok ({} checks)", mode.as_str());
            }
            Ok(0)
        }
        Err(e) => {
            let outcome = RunOutcome::from_error(e);
            let report = report::build(&outcome, &manifest);
            if json {
                output::print_json(&report)?;
            } else {
                output::print_report(&report);
            }
            Ok(report.exit_code)
        }
    }
}
