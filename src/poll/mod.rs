//! Convergence polling
//!
//! Observes an external declarative system from the outside: a predicate is
//! sampled at a fixed interval until it reports convergence or the deadline
//! expires. Observation failures are reported by the predicate as
//! [`Check::Transient`] and only ever count as "not converged yet".
//!
//! ```ignore
//! let config = PollConfig::new(Duration::from_secs(5), Duration::from_secs(120));
//! poll_until_converged("observed config", config, || async {
//!     match client.controller_manager("cluster").await {
//!         Ok(cfg) => check_modern_observed(&cfg),
//!         Err(e) => Check::transient(e),
//!     }
//! })
//! .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Outcome of evaluating a predicate against one observation
#[derive(Debug)]
pub enum Check {
    /// Observed state matches the desired state
    Converged,
    /// Observation succeeded, state has not converged yet
    Pending(String),
    /// Observation could not be made; retried on the next tick
    Transient(anyhow::Error),
}

impl Check {
    pub fn pending(reason: impl Into<String>) -> Self {
        Check::Pending(reason.into())
    }

    pub fn transient(error: impl Into<anyhow::Error>) -> Self {
        Check::Transient(error.into())
    }

    /// Converged when `converged` holds, otherwise pending with `reason`
    pub fn when(converged: bool, reason: impl FnOnce() -> String) -> Self {
        if converged {
            Check::Converged
        } else {
            Check::Pending(reason())
        }
    }

    #[cfg(test)]
    pub fn is_converged(&self) -> bool {
        matches!(self, Check::Converged)
    }
}

/// Poll session states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    Waiting,
    Checking,
    Converged,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Converged | PollState::TimedOut)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Waiting => write!(f, "waiting"),
            PollState::Checking => write!(f, "checking"),
            PollState::Converged => write!(f, "converged"),
            PollState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Timing of one poll session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between checks
    pub interval: Duration,
    /// Maximum total wait
    pub timeout: Duration,
    /// Check once before the first sleep
    pub immediate: bool,
}

impl PollConfig {
    /// Immediate-first-check session with the given interval and timeout
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            immediate: true,
        }
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

/// Poll session errors
#[derive(Debug, Error)]
pub enum PollError {
    #[error("{label}: poll interval must be greater than zero")]
    ZeroInterval { label: String },

    #[error("{label}: poll timeout must be greater than zero")]
    ZeroTimeout { label: String },

    #[error("timed out after {elapsed:?} waiting for {label} ({checks} checks, last observation: {last})")]
    DeadlineExceeded {
        label: String,
        elapsed: Duration,
        checks: u32,
        last: String,
    },
}

impl PollError {
    #[cfg(test)]
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::DeadlineExceeded { .. })
    }
}

/// Summary of a converged session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollReport {
    pub label: String,
    pub checks: u32,
    pub elapsed: Duration,
}

/// One bounded, repeated-check run
#[derive(Debug)]
pub struct PollSession {
    label: String,
    config: PollConfig,
    state: PollState,
    checks: u32,
    last_negative: Option<String>,
}

impl PollSession {
    pub fn new(label: impl Into<String>, config: PollConfig) -> Result<Self, PollError> {
        let label = label.into();
        if config.interval.is_zero() {
            return Err(PollError::ZeroInterval { label });
        }
        if config.timeout.is_zero() {
            return Err(PollError::ZeroTimeout { label });
        }

        Ok(Self {
            label,
            config,
            state: PollState::Waiting,
            checks: 0,
            last_negative: None,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> PollState {
        self.state
    }

    #[cfg(test)]
    pub fn checks(&self) -> u32 {
        self.checks
    }

    /// Drive the session to its terminal state
    ///
    /// Running a finished session starts it over with a fresh count and no
    /// remembered observation.
    pub async fn run<F, Fut>(&mut self, mut predicate: F) -> Result<PollReport, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Check>,
    {
        if self.state.is_terminal() {
            debug!("Restarting {} poll session ({})", self.label, self.state);
        }
        self.state = PollState::Waiting;
        self.checks = 0;
        self.last_negative = None;

        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut skip_wait = self.config.immediate;

        debug!(
            "Polling for {} every {:?} (timeout {:?})",
            self.label, self.config.interval, self.config.timeout
        );

        loop {
            if !skip_wait {
                self.state = PollState::Waiting;
                let wake = (Instant::now() + self.config.interval).min(deadline);
                sleep_until(wake).await;
            }
            skip_wait = false;

            if Instant::now() >= deadline {
                return Err(self.time_out(started));
            }

            self.state = PollState::Checking;
            self.checks += 1;

            // A check still running at the deadline is abandoned
            let check = match timeout_at(deadline, predicate()).await {
                Ok(check) => check,
                Err(_) => return Err(self.time_out(started)),
            };

            match check {
                Check::Converged => {
                    self.state = PollState::Converged;
                    let report = PollReport {
                        label: self.label.clone(),
                        checks: self.checks,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        "{} converged after {} check(s) in {:?}",
                        report.label, report.checks, report.elapsed
                    );
                    return Ok(report);
                }
                Check::Pending(reason) => {
                    debug!("{} not converged yet: {}", self.label, reason);
                    self.last_negative = Some(reason);
                }
                Check::Transient(error) => {
                    warn!("{}: observation failed: {:#}", self.label, error);
                    self.last_negative = Some(format!("observation failed: {error:#}"));
                }
            }
        }
    }

    fn time_out(&mut self, started: Instant) -> PollError {
        self.state = PollState::TimedOut;
        PollError::DeadlineExceeded {
            label: self.label.clone(),
            elapsed: started.elapsed(),
            checks: self.checks,
            last: self
                .last_negative
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        }
    }
}

/// Poll `predicate` until it reports convergence or `config.timeout` elapses
pub async fn poll_until_converged<F, Fut>(
    label: impl Into<String>,
    config: PollConfig,
    predicate: F,
) -> Result<PollReport, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Check>,
{
    PollSession::new(label, config)?.run(predicate).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    const INTERVAL: Duration = Duration::from_secs(5);
    const TIMEOUT: Duration = Duration::from_secs(60);

    fn counting() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_false_times_out_within_bound() {
        let start = Instant::now();
        let config = PollConfig::new(INTERVAL, TIMEOUT);

        let err = poll_until_converged("never", config, || async {
            Check::pending("still waiting")
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() <= TIMEOUT + INTERVAL);
        assert!(start.elapsed() >= TIMEOUT);
        assert!(err.to_string().contains("still waiting"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_at_or_before_next_tick() {
        for k in 1..=5u32 {
            let calls = counting();
            let c = calls.clone();
            let config = PollConfig::new(INTERVAL, TIMEOUT).immediate(false);

            let report = poll_until_converged("eventually", config, || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    Check::when(n > k, || format!("tick {n}"))
                }
            })
            .await
            .unwrap();

            assert!(report.checks <= k + 1);
            assert_eq!(calls.load(Ordering::SeqCst), report.checks);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_never_propagate() {
        let calls = counting();
        let c = calls.clone();
        let start = Instant::now();
        let config = PollConfig::new(INTERVAL, TIMEOUT);

        let result = poll_until_converged("flaky", config, || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Check::transient(anyhow::anyhow!("connection refused"))
            }
        })
        .await;

        let err = assert_err!(result);
        assert!(err.is_timeout());
        assert!(start.elapsed() >= TIMEOUT);
        assert!(calls.load(Ordering::SeqCst) > 1);
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_converged_is_immediate_and_repeatable() {
        for _ in 0..2 {
            let calls = counting();
            let c = calls.clone();
            let start = Instant::now();

            let report = assert_ok!(
                poll_until_converged("ready", PollConfig::new(INTERVAL, TIMEOUT), || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        Check::Converged
                    }
                })
                .await
            );

            assert_eq!(report.checks, 1);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(start.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_immediate_waits_one_interval() {
        let start = Instant::now();
        let config = PollConfig::new(INTERVAL, TIMEOUT).immediate(false);

        let report = poll_until_converged("delayed", config, || async { Check::Converged })
            .await
            .unwrap();

        assert_eq!(report.checks, 1);
        assert_eq!(start.elapsed(), INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_errors() {
        let calls = counting();
        let c = calls.clone();

        let report = poll_until_converged("recovering", PollConfig::new(INTERVAL, TIMEOUT), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 3 {
                    Check::transient(anyhow::anyhow!("503 Service Unavailable"))
                } else {
                    Check::Converged
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(report.checks, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_check_is_bounded_by_deadline() {
        let start = Instant::now();

        let err = poll_until_converged("hung", PollConfig::new(INTERVAL, TIMEOUT), || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Check::Converged
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test]
    async fn test_rejects_zero_timing() {
        let zero_interval = PollConfig::new(Duration::ZERO, TIMEOUT);
        let err = poll_until_converged("bad", zero_interval, || async { Check::Converged })
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::ZeroInterval { .. }));

        let zero_timeout = PollConfig::new(INTERVAL, Duration::ZERO);
        let err = poll_until_converged("bad", zero_timeout, || async { Check::Converged })
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::ZeroTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_states() {
        let mut session = PollSession::new("states", PollConfig::new(INTERVAL, TIMEOUT)).unwrap();
        assert_eq!(session.state(), PollState::Waiting);

        session.run(|| async { Check::Converged }).await.unwrap();
        assert_eq!(session.state(), PollState::Converged);
        assert!(session.state().is_terminal());

        let mut session = PollSession::new("states", PollConfig::new(INTERVAL, INTERVAL)).unwrap();
        session
            .run(|| async { Check::pending("no") })
            .await
            .unwrap_err();
        assert_eq!(session.state(), PollState::TimedOut);
        assert_eq!(session.checks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_starts_fresh() {
        let mut session = PollSession::new("rerun", PollConfig::new(INTERVAL, TIMEOUT)).unwrap();

        assert_err!(session.run(|| async { Check::pending("stale") }).await);
        let first = session.checks();
        assert!(first > 1);

        let err = assert_err!(session.run(|| async { Check::pending("fresh") }).await);
        assert_eq!(session.checks(), first);
        match err {
            PollError::DeadlineExceeded { checks, last, .. } => {
                assert_eq!(checks, first);
                assert_eq!(last, "fresh");
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        let report = assert_ok!(session.run(|| async { Check::Converged }).await);
        assert_eq!(report.checks, 1);
        assert_eq!(session.state(), PollState::Converged);
    }
}
