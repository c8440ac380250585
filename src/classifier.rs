//! Dual-test anomaly classification.
//!
//! A day is anomalous only when its change is extreme both against the
//! model's local volatility and against the unconditional distribution of
//! all changes in the window:
//!
//! 1. `|x_t| > z · σ_t`
//! 2. `|x_t − mean| / stdev > z`
//!
//! with `z = Φ⁻¹(1 − α/2)` and population moments over the whole window.

use crate::errors::{AnomalyDetectionError, AnomalyResult};
use crate::returns::ChangeSeries;
use crate::stats::{mean, population_std};
use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-day evidence from both tests.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DayScore {
    /// Date the change is attributed to
    pub date: NaiveDate,
    /// Daily change
    pub change: f64,
    /// Model-implied volatility for the day
    pub volatility: f64,
    /// `|change| / volatility`
    pub conditional_score: f64,
    /// `|change − mean| / stdev`
    pub unconditional_score: f64,
    /// Both scores exceed the critical value
    pub anomalous: bool,
}

/// Boolean flags aligned with the change series.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyMask(Vec<bool>);

impl AnomalyMask {
    /// Flags in change order.
    pub fn flags(&self) -> &[bool] {
        &self.0
    }

    /// Number of flagged days.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&f| f).count()
    }

    /// Length of the underlying change series.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty mask.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of classifying a change series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Classification {
    /// Critical value both tests used
    pub critical_value: f64,
    /// Sample mean of the changes
    pub mean: f64,
    /// Population standard deviation of the changes
    pub stdev: f64,
    /// Per-day scores
    pub scores: Vec<DayScore>,
    /// Flags aligned with the changes
    pub mask: AnomalyMask,
    /// Flagged dates in chronological order, never empty
    pub flagged_dates: Vec<NaiveDate>,
}

/// Apply both tests to every change.
///
/// # Errors
/// * `NumericalError` if `volatility` is not aligned with `changes`
/// * `DegenerateVariance` if the changes have zero spread
/// * `NoAnomalies` if no day passes both tests
pub fn classify(
    changes: &ChangeSeries,
    volatility: &[f64],
    critical_value: f64,
) -> AnomalyResult<Classification> {
    if volatility.len() != changes.len() {
        return Err(AnomalyDetectionError::NumericalError {
            reason: format!(
                "volatility path has {} values for {} changes",
                volatility.len(),
                changes.len()
            ),
        });
    }

    let values = changes.values();
    let m = mean(values);
    let stdev = population_std(values);
    if !(stdev > 0.0) {
        return Err(AnomalyDetectionError::DegenerateVariance {
            variance: stdev * stdev,
        });
    }

    let scores: Vec<DayScore> = changes
        .iter()
        .zip(volatility)
        .map(|(change, &vol)| {
            let conditional_score = change.value.abs() / vol;
            let unconditional_score = (change.value - m).abs() / stdev;
            DayScore {
                date: change.date,
                change: change.value,
                volatility: vol,
                conditional_score,
                unconditional_score,
                anomalous: change.value.abs() > critical_value * vol
                    && unconditional_score > critical_value,
            }
        })
        .collect();

    let mask = AnomalyMask(scores.iter().map(|s| s.anomalous).collect());
    let flagged_dates: Vec<NaiveDate> = scores.iter().filter(|s| s.anomalous).map(|s| s.date).collect();

    log::debug!(
        "Classified {} changes: {} flagged (z = {:.6}, mean = {:.6e}, stdev = {:.6e})",
        scores.len(),
        flagged_dates.len(),
        critical_value,
        m,
        stdev
    );

    if flagged_dates.is_empty() {
        return Err(AnomalyDetectionError::NoAnomalies {
            observations: changes.len(),
        });
    }

    Ok(Classification {
        critical_value,
        mean: m,
        stdev,
        scores,
        mask,
        flagged_dates,
    })
}
