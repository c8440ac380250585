//! # Worker Pool
//!
//! Runs detections on a bounded rayon pool so callers that must stay
//! responsive can hand a series off and wait for the result with a deadline.
//!
//! A timed-out or cancelled run raises a [`CancellationToken`] that the
//! optimiser polls once per iteration; the worker then abandons its partial
//! fit and the result is dropped. Nothing is retried.

use crate::config::{DetectorConfig, PoolConfig};
use crate::detector::{AnomalyRangeDetector, DetectionReport};
use crate::errors::{AnomalyDetectionError, AnomalyResult};
use crate::ranges::FormattedRange;
use crate::series::PriceSeries;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Bounded pool of detection workers.
pub struct DetectionPool {
    pool: rayon::ThreadPool,
    detector: Arc<AnomalyRangeDetector>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for DetectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionPool")
            .field("workers", &self.pool.current_num_threads())
            .field("detector", &self.detector)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DetectionPool {
    /// Build a pool with its own worker threads.
    ///
    /// # Errors
    /// `InvalidParameter` for a bad configuration, `PoolBuild` if the
    /// threads cannot be spawned.
    pub fn new(pool_config: PoolConfig, detector_config: DetectorConfig) -> AnomalyResult<Self> {
        pool_config.validate()?;
        let detector = AnomalyRangeDetector::with_config(detector_config)?;

        let prefix = pool_config.thread_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pool_config.worker_threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| AnomalyDetectionError::PoolBuild {
                reason: e.to_string(),
            })?;

        log::debug!(
            "Started detection pool with {} workers (timeout {:?})",
            pool_config.worker_threads,
            pool_config.timeout
        );

        Ok(Self {
            pool,
            detector: Arc::new(detector),
            timeout: pool_config.timeout,
        })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Detector shared by all workers.
    pub fn detector(&self) -> &AnomalyRangeDetector {
        &self.detector
    }

    /// Queue one series and return a handle to its result.
    pub fn submit(&self, series: PriceSeries) -> DetectionHandle {
        let (sender, receiver) = mpsc::channel();
        let token = CancellationToken::new();
        let detector = Arc::clone(&self.detector);
        let worker_token = token.clone();

        self.pool.spawn(move || {
            let result = if worker_token.is_cancelled() {
                Err(AnomalyDetectionError::Cancelled)
            } else {
                detector.analyze_with_cancel(&series, Some(&worker_token))
            };
            // The receiver is gone once the caller timed out or dropped the handle.
            let _ = sender.send(result);
        });

        DetectionHandle {
            receiver,
            token,
            timeout: self.timeout,
        }
    }

    /// Run many series in parallel on the pool and block until all finish.
    /// Results keep the input order.
    pub fn detect_batch(&self, series: &[PriceSeries]) -> Vec<AnomalyResult<Vec<FormattedRange>>> {
        let detector = &self.detector;
        self.pool
            .install(|| series.par_iter().map(|s| detector.detect(s)).collect())
    }
}

/// Pending result of a submitted detection.
#[derive(Debug)]
pub struct DetectionHandle {
    receiver: Receiver<AnomalyResult<DetectionReport>>,
    token: CancellationToken,
    timeout: Option<Duration>,
}

impl DetectionHandle {
    /// Block for the full report, bounded by the pool's default timeout.
    pub fn wait_report(self) -> AnomalyResult<DetectionReport> {
        match self.timeout {
            Some(limit) => self.wait_report_timeout(limit),
            None => {
                let result = self.receiver.recv();
                result.unwrap_or_else(|_| Err(worker_lost()))
            }
        }
    }

    /// Block for the full report for at most `limit`.
    ///
    /// # Errors
    /// `Timeout` when the limit elapses first; the worker is told to stop.
    pub fn wait_report_timeout(self, limit: Duration) -> AnomalyResult<DetectionReport> {
        match self.receiver.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.token.cancel();
                log::debug!("Detection timed out after {:?}", limit);
                Err(AnomalyDetectionError::Timeout {
                    limit_ms: limit.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(worker_lost()),
        }
    }

    /// Block for the formatted ranges, bounded by the pool's default timeout.
    pub fn wait(self) -> AnomalyResult<Vec<FormattedRange>> {
        self.wait_report().map(|report| report.formatted())
    }

    /// Block for the formatted ranges for at most `limit`.
    pub fn wait_timeout(self, limit: Duration) -> AnomalyResult<Vec<FormattedRange>> {
        self.wait_report_timeout(limit).map(|report| report.formatted())
    }

    /// Ask the worker to stop. A later wait returns `Cancelled` unless the
    /// result was already produced.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

fn worker_lost() -> AnomalyDetectionError {
    log::warn!("Detection worker exited without reporting a result");
    AnomalyDetectionError::WorkerLost
}
