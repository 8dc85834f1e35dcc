//! One-shot schema migration step.
//!
//! Runs only after the data tier is fully ready, and the app tier is never
//! started if it fails — an application instance must not come up against an
//! unmigrated schema. The migration tool itself is a black box that either
//! succeeds or fails.

use tracing::info;

use crate::config::MigrationStep;
use crate::error::{BringupError, Result};
use crate::runtime::Runtime;

pub fn run(runtime: &dyn Runtime, step: &MigrationStep) -> Result<()> {
    info!(service = %step.service, command = ?step.command, "running migrations");

    let result = runtime.run_once(&step.service, &step.command)?;
    if result.success {
        info!("migrations complete");
        Ok(())
    } else {
        Err(BringupError::Migration(if result.detail.is_empty() {
            "migration command exited non-zero".to_string()
        } else {
            result.detail
        }))
    }
}
