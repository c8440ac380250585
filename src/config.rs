//! # Detection Configuration
//!
//! Configuration structures for the detection pipeline and for the worker
//! pool that runs it off the caller's thread.

use crate::errors::{validate_parameter, AnomalyDetectionError, AnomalyResult};
use crate::garch::GarchConfig;
use crate::returns::ChangeKind;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a detection run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Two-tailed significance level of both anomaly tests
    pub significance_level: f64,
    /// How daily changes are derived from the price sequence
    pub change_kind: ChangeKind,
    /// Volatility model fitting options
    pub garch: GarchConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl DetectorConfig {
    /// Standard configuration: 95% two-tailed tests on absolute changes
    pub fn standard() -> Self {
        Self {
            significance_level: 0.05,
            change_kind: ChangeKind::Absolute,
            garch: GarchConfig::default(),
        }
    }

    /// Conservative configuration: 99% two-tailed tests
    pub fn conservative() -> Self {
        Self {
            significance_level: 0.01,
            ..Self::standard()
        }
    }

    /// Use percentage changes instead of absolute differences
    pub fn with_change_kind(mut self, change_kind: ChangeKind) -> Self {
        self.change_kind = change_kind;
        self
    }

    /// Check all parameters are within their valid ranges
    pub fn validate(&self) -> AnomalyResult<()> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(AnomalyDetectionError::InvalidParameter {
                parameter: "significance_level".to_string(),
                value: self.significance_level,
                constraint: "(0, 1)".to_string(),
            });
        }
        self.garch.validate()
    }
}

/// Configuration for the detection worker pool
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Number of worker threads
    pub worker_threads: usize,
    /// Default limit applied by `DetectionHandle::wait`
    pub timeout: Option<Duration>,
    /// Prefix for worker thread names
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let worker_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(8);
        Self {
            worker_threads,
            timeout: Some(Duration::from_secs(60)),
            thread_name: "anomaly-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Pool with a fixed number of workers and the default timeout
    pub fn with_workers(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            ..Self::default()
        }
    }

    /// Check the pool can be built from this configuration
    pub fn validate(&self) -> AnomalyResult<()> {
        validate_parameter(self.worker_threads as f64, 1.0, 1024.0, "worker_threads")?;
        if let Some(limit) = self.timeout {
            if limit.is_zero() {
                return Err(AnomalyDetectionError::InvalidParameter {
                    parameter: "timeout".to_string(),
                    value: 0.0,
                    constraint: "> 0 ms".to_string(),
                });
            }
        }
        Ok(())
    }
}
