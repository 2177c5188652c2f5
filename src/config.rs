//! Pool configuration and environment helpers.
//!
//! # Environment Variables
//!
//! | Field | Variable | Default |
//! |-------|----------|---------|
//! | `root` | `LOSSY_MPI_ROOT` | `0` |
//! | `timeout` | `LOSSY_MPI_TIMEOUT` (seconds, may be fractional) | `2.0` |
//! | `n_tries` | `LOSSY_MPI_TRIES` | `10` |
//!
//! Unset or unparsable variables fall back to the default.

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

/// Default root rank.
pub const DEFAULT_ROOT: usize = 0;
/// Default per-request timeout budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default number of polls per request.
pub const DEFAULT_TRIES: u32 = 10;

/// How long a single pending request may take to resolve, and how many
/// times it is polled within that budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    timeout: Duration,
    n_tries: u32,
}

impl TimeoutPolicy {
    /// Create a policy. `n_tries` must be positive.
    pub fn new(timeout: Duration, n_tries: u32) -> Result<Self> {
        if n_tries == 0 {
            return Err(Error::InvalidConfig("n_tries must be positive".into()));
        }
        Ok(TimeoutPolicy { timeout, n_tries })
    }

    /// Total budget per request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of polls per request.
    pub fn n_tries(&self) -> u32 {
        self.n_tries
    }

    /// Sleep between two failed polls: `timeout / n_tries`.
    pub fn interval(&self) -> Duration {
        self.timeout / self.n_tries
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            timeout: DEFAULT_TIMEOUT,
            n_tries: DEFAULT_TRIES,
        }
    }
}

/// Construction parameters for a [`Pool`](crate::Pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Coordinating rank
    pub root: usize,
    /// Per-request timeout budget
    pub timeout: Duration,
    /// Polls per request
    pub n_tries: u32,
}

impl PoolConfig {
    /// Create a configuration from explicit values.
    pub fn new(root: usize, timeout: Duration, n_tries: u32) -> Self {
        PoolConfig {
            root,
            timeout,
            n_tries,
        }
    }

    /// Build a configuration from `LOSSY_MPI_*` environment variables.
    pub fn from_env() -> Self {
        PoolConfig {
            root: root_from_env().unwrap_or(DEFAULT_ROOT),
            timeout: timeout_from_env().unwrap_or(DEFAULT_TIMEOUT),
            n_tries: tries_from_env().unwrap_or(DEFAULT_TRIES),
        }
    }

    /// Check the configuration against a group of `size` ranks and derive
    /// its timeout policy.
    pub fn validate(&self, size: usize) -> Result<TimeoutPolicy> {
        if size == 0 {
            return Err(Error::InvalidConfig("group size must be positive".into()));
        }
        Error::check_rank(self.root, size)?;
        TimeoutPolicy::new(self.timeout, self.n_tries)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig::new(DEFAULT_ROOT, DEFAULT_TIMEOUT, DEFAULT_TRIES)
    }
}

/// Root rank from `LOSSY_MPI_ROOT`.
pub fn root_from_env() -> Option<usize> {
    env::var("LOSSY_MPI_ROOT").ok().and_then(|s| s.trim().parse().ok())
}

/// Timeout budget from `LOSSY_MPI_TIMEOUT`, in seconds.
pub fn timeout_from_env() -> Option<Duration> {
    env::var("LOSSY_MPI_TIMEOUT")
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Polls per request from `LOSSY_MPI_TRIES`. Zero is rejected.
pub fn tries_from_env() -> Option<u32> {
    env::var("LOSSY_MPI_TRIES")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n| n > 0)
}
