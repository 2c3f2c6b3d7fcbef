//! Liveness and readiness probes.
//!
//! - `GET /health` answers 200 while the process is up.
//! - `GET /ready` answers 200 when every registered check passes and the
//!   server is not draining, 503 otherwise.
//!
//! ```rust
//! use parley_server::{HealthCheck, ReadinessCheck};
//!
//! let health = HealthCheck::new("helpdesk-bot", "1.2.0");
//! assert_eq!(health.report().service, "helpdesk-bot");
//!
//! let readiness = ReadinessCheck::new().with_check("client", || true);
//! assert!(readiness.report().ready);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always `"healthy"` while the process can answer.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Seconds since the server was built.
    pub uptime_seconds: u64,
}

/// Liveness state.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started: Instant,
}

impl HealthCheck {
    /// Starts the uptime clock.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started: Instant::now(),
        }
    }

    /// Time since construction.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Current report.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
        }
    }
}

/// Body of `GET /ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// Overall readiness.
    pub ready: bool,
    /// Individual check results by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub checks: BTreeMap<String, bool>,
}

type CheckFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Readiness state: named checks plus a switch flipped off while draining.
#[derive(Clone)]
pub struct ReadinessCheck {
    checks: Vec<(String, CheckFn)>,
    accepting: Arc<AtomicBool>,
}

impl ReadinessCheck {
    /// Ready, with no checks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Adds a named check.
    #[must_use]
    pub fn with_check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.checks.push((name.into(), Arc::new(check)));
        self
    }

    /// Marks the server as accepting or draining.
    pub fn set_ready(&self, ready: bool) {
        self.accepting.store(ready, Ordering::SeqCst);
    }

    /// Evaluates every check.
    #[must_use]
    pub fn report(&self) -> ReadinessReport {
        let checks: BTreeMap<String, bool> = self
            .checks
            .iter()
            .map(|(name, check)| (name.clone(), check()))
            .collect();
        let ready = self.accepting.load(Ordering::SeqCst) && checks.values().all(|ok| *ok);
        ReadinessReport { ready, checks }
    }
}

impl Default for ReadinessCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessCheck")
            .field("checks", &self.checks.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("accepting", &self.accepting.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_report() {
        let report = HealthCheck::new("bot", "0.1.0").report();
        assert_eq!(report.status, "healthy");
        assert_eq!(report.version, "0.1.0");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("uptime_seconds").is_some());
    }

    #[test]
    fn test_failing_check_not_ready() {
        let readiness = ReadinessCheck::new()
            .with_check("client", || true)
            .with_check("store", || false);

        let report = readiness.report();
        assert!(!report.ready);
        assert_eq!(report.checks.get("client"), Some(&true));
        assert_eq!(report.checks.get("store"), Some(&false));
    }

    #[test]
    fn test_draining_not_ready() {
        let readiness = ReadinessCheck::new();
        assert!(readiness.report().ready);

        readiness.clone().set_ready(false);
        assert!(!readiness.report().ready);
        assert_eq!(serde_json::to_string(&readiness.report()).unwrap(), r#"{"ready":false}"#);
    }
}
