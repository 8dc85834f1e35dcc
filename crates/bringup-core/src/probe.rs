//! Probe evaluation: turning a probe spec into a binary readiness signal.
//!
//! Probe failures of any kind (non-zero exit, connection refused, runtime
//! hiccup) all read as "not ready" — the poller's attempt budget decides when
//! not-ready becomes fatal.

use std::time::Duration;

use crate::config::{ProbeSpec, ServiceDescriptor};
use crate::runtime::Runtime;

const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run one probe attempt for a service. Services without a probe are always
/// considered ready.
pub fn check(
    runtime: &dyn Runtime,
    client: &reqwest::blocking::Client,
    service: &ServiceDescriptor,
) -> bool {
    match &service.probe {
        None => true,
        Some(ProbeSpec::Exec { command }) => runtime
            .exec(&service.name, command)
            .map(|r| r.success)
            .unwrap_or(false),
        Some(ProbeSpec::Http { url }) => client
            .get(url)
            .timeout(HTTP_PROBE_TIMEOUT)
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false),
    }
}
