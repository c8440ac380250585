//! # Detection Pipeline
//!
//! Runs every stage in order on one series:
//!
//! 1. validated [`PriceSeries`] to daily changes
//! 2. GARCH(1,1) fit for the conditional volatility path
//! 3. dual-test classification of each day
//! 4. gap-based grouping of flagged dates
//! 5. minimum-span adjustment, ordering by span and formatting
//!
//! Each stage fails fast and the first error is returned unchanged. The
//! pipeline holds no state between calls, so one detector can be shared
//! across threads.

use crate::classifier::{classify, Classification};
use crate::config::DetectorConfig;
use crate::errors::AnomalyResult;
use crate::executor::CancellationToken;
use crate::garch::{fit_garch_with_cancel, GarchFit};
use crate::grouping::group_dates;
use crate::ranges::{adjust_ranges, format_ranges, DateRange, FormattedRange};
use crate::returns::{daily_changes, ChangeSeries};
use crate::series::{PriceSeries, RawSeries};
use crate::stats::two_tailed_critical_value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything computed during one detection run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectionReport {
    /// Daily changes the model was fitted on
    pub changes: ChangeSeries,
    /// Fitted volatility model
    pub fit: GarchFit,
    /// Per-day scores, mask and flagged dates
    pub classification: Classification,
    /// Ranges straight out of the grouper, chronological
    pub candidate_ranges: Vec<DateRange>,
    /// Adjusted ranges ordered by descending span
    pub ranges: Vec<DateRange>,
}

impl DetectionReport {
    /// Final ranges as `YYYY-MM-DD` pairs.
    pub fn formatted(&self) -> Vec<FormattedRange> {
        format_ranges(&self.ranges)
    }
}

/// Volatility-based detector of unusual date ranges.
#[derive(Debug, Clone, Default)]
pub struct AnomalyRangeDetector {
    config: DetectorConfig,
}

impl AnomalyRangeDetector {
    /// Detector with the standard configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with a validated custom configuration.
    pub fn with_config(config: DetectorConfig) -> AnomalyResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect unusual ranges, longest first.
    ///
    /// # Errors
    /// Validation, model-fit and no-anomaly failures, told apart by
    /// [`AnomalyDetectionError::kind`](crate::errors::AnomalyDetectionError::kind).
    pub fn detect(&self, series: &PriceSeries) -> AnomalyResult<Vec<FormattedRange>> {
        self.analyze(series).map(|report| report.formatted())
    }

    /// Validate the two-array wire shape, then [`detect`](Self::detect).
    pub fn detect_raw(&self, raw: &RawSeries) -> AnomalyResult<Vec<FormattedRange>> {
        self.detect(&raw.validate()?)
    }

    /// Run the pipeline and keep every intermediate result.
    pub fn analyze(&self, series: &PriceSeries) -> AnomalyResult<DetectionReport> {
        self.analyze_with_cancel(series, None)
    }

    pub(crate) fn analyze_with_cancel(
        &self,
        series: &PriceSeries,
        cancel: Option<&CancellationToken>,
    ) -> AnomalyResult<DetectionReport> {
        let critical_value = two_tailed_critical_value(self.config.significance_level)?;

        let changes = daily_changes(series, self.config.change_kind)?;
        log::debug!(
            "Computed {} {:?} changes from {} prices",
            changes.len(),
            self.config.change_kind,
            series.len()
        );

        let fit = fit_garch_with_cancel(changes.values(), &self.config.garch, cancel)?;
        let classification = classify(&changes, &fit.conditional_volatility, critical_value)?;

        let candidate_ranges = group_dates(&classification.flagged_dates);
        let ranges = adjust_ranges(candidate_ranges.clone(), series.max_date());

        log::info!(
            "Detected {} unusual ranges from {} flagged days",
            ranges.len(),
            classification.flagged_dates.len()
        );

        Ok(DetectionReport {
            changes,
            fit,
            classification,
            candidate_ranges,
            ranges,
        })
    }
}

/// Detect with the standard configuration.
///
/// ```
/// use anomaly_ranges::{detect_unusual_ranges, ErrorKind, RawSeries};
///
/// let raw = RawSeries::new(
///     ["2025-01-01", "2025-01-02", "2025-01-03"],
///     vec![100.0, 101.0, 102.0],
/// );
/// // Constant changes leave nothing to fit.
/// let err = detect_unusual_ranges(&raw).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::ModelFit);
/// ```
pub fn detect_unusual_ranges(raw: &RawSeries) -> AnomalyResult<Vec<FormattedRange>> {
    AnomalyRangeDetector::new().detect_raw(raw)
}
