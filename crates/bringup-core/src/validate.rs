//! Precondition checks that gate every bring-up run.
//!
//! Checks short-circuit on the first failure and have no side effects beyond
//! reading the already-loaded configuration. A missing config file is caught
//! earlier, by [`EnvConfig::load`](crate::env::EnvConfig::load).

use crate::env::{DeployMode, EnvConfig, PLACEHOLDER_SECRET};
use crate::error::{BringupError, Result};

/// Validate the loaded configuration against the target deployment mode.
///
/// Development runs only require the configuration to exist. Production runs
/// additionally require the declared mode to literally be `production` and
/// the secret key to differ from the scaffold placeholder.
pub fn validate(env: &EnvConfig, target: DeployMode) -> Result<()> {
    if target != DeployMode::Production {
        return Ok(());
    }

    match env.mode() {
        Some("production") => {}
        Some(other) => {
            return Err(BringupError::Configuration(format!(
                "wrong mode: ENVIRONMENT={other}, expected production"
            )))
        }
        None => {
            return Err(BringupError::Configuration(
                "wrong mode: ENVIRONMENT is not set".to_string(),
            ))
        }
    }

    match env.secret_key() {
        None => Err(BringupError::Configuration(
            "insecure secret: SECRET_KEY is not set".to_string(),
        )),
        Some(PLACEHOLDER_SECRET) => Err(BringupError::Configuration(
            "insecure secret: SECRET_KEY is still the scaffold placeholder".to_string(),
        )),
        Some(_) => Ok(()),
    }
}
