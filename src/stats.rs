//! Descriptive statistics and distribution helpers used by the classifier and grouper.

use crate::errors::{validate_parameter, AnomalyDetectionError, AnomalyResult};
use statrs::distribution::{ContinuousCDF, Normal};

/// Safe comparison for floating point values (handles NaN)
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater, // push NaN to end
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Calculate median of already-sorted data (handles even-length correctly)
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Calculate median (handles even-length correctly)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(float_total_cmp);
    median_of_sorted(&v)
}

/// Arithmetic mean, NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`), zero for fewer than two values.
///
/// Two-pass form: the mean is removed before squaring.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Mean of squared values, the scale reference for degeneracy checks.
pub fn mean_square(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

/// Two-tailed standard normal critical value `Φ⁻¹(1 − α/2)`.
///
/// # Example
/// ```rust
/// use anomaly_ranges::stats::two_tailed_critical_value;
///
/// let z = two_tailed_critical_value(0.05).unwrap();
/// assert!((z - 1.959964).abs() < 1e-6);
/// ```
pub fn two_tailed_critical_value(significance_level: f64) -> AnomalyResult<f64> {
    validate_parameter(significance_level, f64::MIN_POSITIVE, 1.0 - f64::EPSILON, "significance_level")?;

    let normal = Normal::new(0.0, 1.0).map_err(|e| AnomalyDetectionError::NumericalError {
        reason: format!("standard normal construction failed: {}", e),
    })?;
    Ok(normal.inverse_cdf(1.0 - significance_level / 2.0))
}
