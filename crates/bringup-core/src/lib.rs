pub mod config;
pub mod env;
pub mod error;
pub mod lifecycle;
pub mod migrate;
pub mod orchestrate;
pub mod probe;
pub mod readiness;
pub mod report;
pub mod runtime;
pub mod validate;

pub use error::{BringupError, Result};
pub use orchestrate::{Orchestrator, Plan, RunOutcome};
