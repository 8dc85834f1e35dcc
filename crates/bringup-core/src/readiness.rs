//! Bounded fixed-interval readiness polling.
//!
//! The poller is the only retry mechanism in the whole orchestrator: a probe
//! is tried up to `max_attempts` times with a fixed sleep between attempts.
//! No backoff — bring-up is expected to be short, and backing off would only
//! delay detection of a real failure.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{BringupError, Result};

/// Per-service polling knobs. Defaults mirror the two probe shapes: fast and
/// short for lightweight in-container checks, slower and longer for an HTTP
/// health endpoint that covers the app's dependency connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn data_default() -> Self {
        Self::new(Duration::from_secs(1), 30)
    }

    pub fn app_default() -> Self {
        Self::new(Duration::from_secs(2), 30)
    }
}

/// Last observed probe result for a service being polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Pending,
    Ready,
    Failed,
}

/// Attempt bookkeeping for one service. Created when polling begins and
/// discarded once the service is ready or the attempt budget is exhausted.
#[derive(Debug)]
struct AttemptState {
    attempts: u32,
    last: ProbeOutcome,
    policy: PollPolicy,
    started: Instant,
}

impl AttemptState {
    fn new(policy: PollPolicy) -> Self {
        Self {
            attempts: 0,
            last: ProbeOutcome::Pending,
            policy,
            started: Instant::now(),
        }
    }

    fn record(&mut self, ready: bool) {
        self.attempts += 1;
        self.last = if ready {
            ProbeOutcome::Ready
        } else {
            ProbeOutcome::Failed
        };
    }

    fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }
}

/// How a service became ready.
#[derive(Debug, Clone)]
pub struct ReadyReport {
    pub service: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Poll `probe` until it reports ready or the attempt budget runs out.
///
/// The probe is called immediately — a service that is already ready costs no
/// wait at all. Sleeps happen only *between* attempts, so a run that exhausts
/// `max_attempts` attempts sleeps `max_attempts - 1` times.
pub fn await_ready<F>(service: &str, mut probe: F, policy: PollPolicy) -> Result<ReadyReport>
where
    F: FnMut() -> bool,
{
    let mut state = AttemptState::new(policy);

    loop {
        state.record(probe());
        if state.last == ProbeOutcome::Ready {
            debug!(service, attempts = state.attempts, "service ready");
            return Ok(ReadyReport {
                service: service.to_string(),
                attempts: state.attempts,
                elapsed: state.started.elapsed(),
            });
        }

        if state.exhausted() {
            warn!(service, attempts = state.attempts, "readiness timeout");
            return Err(BringupError::ReadinessTimeout {
                service: service.to_string(),
                attempts: state.attempts,
                elapsed: state.started.elapsed(),
            });
        }

        debug!(
            service,
            attempt = state.attempts,
            max = policy.max_attempts,
            "not ready yet"
        );
        thread::sleep(policy.interval);
    }
}

/// One service's readiness wait, ready to hand to a worker thread.
pub struct ReadinessJob<F> {
    pub service: String,
    pub policy: PollPolicy,
    pub probe: F,
}

/// Await several sibling services concurrently, one worker per service.
///
/// Returns only once every service reported ready. On failure, the error for
/// the first service in declared order is returned, so the caller's message
/// is deterministic even when several probes time out together.
pub fn await_all<F>(jobs: Vec<ReadinessJob<F>>) -> Result<Vec<ReadyReport>>
where
    F: FnMut() -> bool + Send,
{
    let results: Vec<Result<ReadyReport>> = thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                scope.spawn(move || {
                    let ReadinessJob {
                        service,
                        policy,
                        probe,
                    } = job;
                    await_ready(&service, probe, policy)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    });

    let mut reports = Vec::with_capacity(results.len());
    for result in results {
        reports.push(result?);
    }
    Ok(reports)
}
