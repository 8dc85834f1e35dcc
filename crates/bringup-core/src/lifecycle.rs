//! Service lifecycle: stop the previous set, start services tier by tier,
//! and guarantee best-effort teardown when a run dies partway.

use tracing::{info, warn};

use crate::config::{Manifest, Tier};
use crate::error::Result;
use crate::runtime::Runtime;

/// Stop whatever a previous run left behind. Idempotent — nothing running is
/// not an error.
pub fn stop_existing(runtime: &dyn Runtime) -> Result<()> {
    info!("stopping any previously running services");
    runtime.stop_all()
}

/// Issue start requests for every service in the tier, in declared order.
///
/// Returns once all requests are accepted; readiness is the poller's job.
/// A rejected start request aborts the run with the failing service's name.
pub fn start_tier(runtime: &dyn Runtime, manifest: &Manifest, tier: Tier) -> Result<()> {
    for service in manifest.tier_services(tier) {
        info!(service = %service.name, "start requested");
        runtime.start_service(&service.name)?;
    }
    Ok(())
}

/// Build images for every service in the tier (production path).
pub fn build_tier(runtime: &dyn Runtime, manifest: &Manifest, tier: Tier) -> Result<()> {
    for service in manifest.tier_services(tier) {
        info!(service = %service.name, "building image");
        runtime.build(&service.name)?;
    }
    Ok(())
}

/// Stops started services when dropped unless the run completed and the
/// guard was disarmed. The stop is best-effort: teardown failure must not
/// mask the error that triggered it.
pub struct TeardownGuard<'a> {
    runtime: &'a dyn Runtime,
    armed: bool,
}

impl<'a> TeardownGuard<'a> {
    pub fn new(runtime: &'a dyn Runtime) -> Self {
        Self {
            runtime,
            armed: true,
        }
    }

    /// The run succeeded — leave the services up.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("bring-up failed; stopping partially started services");
        if let Err(e) = self.runtime.stop_all() {
            warn!(error = %e, "teardown failed");
        }
    }
}
