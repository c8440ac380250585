//! Error types and validation functions for anomaly range detection.
//!
//! Every failure of the detection pipeline is reported through
//! [`AnomalyDetectionError`]. Callers that only need to decide how to react
//! (reject the input, report an analysis failure, or report "nothing unusual")
//! should match on [`AnomalyDetectionError::kind`] instead of individual variants.

use thiserror::Error;

/// Error types for anomaly range detection.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnomalyDetectionError {
    /// A required input sequence was not supplied.
    #[error("Missing input: '{field}' sequence is required")]
    MissingField {
        /// Name of the absent field
        field: String,
    },

    /// Not enough observations for the requested operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Date and price sequences have different lengths.
    #[error("Length mismatch: {dates} dates but {prices} prices")]
    LengthMismatch {
        /// Number of dates supplied
        dates: usize,
        /// Number of prices supplied
        prices: usize,
    },

    /// A date string could not be parsed as `YYYY-MM-DD`.
    #[error("Invalid date at index {index}: '{value}'")]
    InvalidDate {
        /// Position in the input sequence
        index: usize,
        /// Offending input
        value: String,
    },

    /// Dates are not strictly increasing.
    #[error("Dates must be strictly increasing: {previous} followed by {current} at index {index}")]
    UnorderedDates {
        /// Position of the offending date
        index: usize,
        /// Date preceding the offending one
        previous: String,
        /// Offending date
        current: String,
    },

    /// An input value is NaN or infinite.
    #[error("Non-finite value in {name} at index {index}: {value}")]
    NonFiniteValue {
        /// Name of the sequence
        name: String,
        /// Position in the sequence
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Percentage changes cannot be computed from a zero base price.
    #[error("Cannot compute percentage change from zero price at index {index}")]
    ZeroBasePrice {
        /// Position of the zero price
        index: usize,
    },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// The change series carries no variance to model.
    #[error("Degenerate series: variance {variance:e} is too small to fit a volatility model")]
    DegenerateVariance {
        /// Sample variance of the change series
        variance: f64,
    },

    /// The likelihood optimiser did not converge.
    #[error("Volatility model did not converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Iterations performed before giving up
        iterations: usize,
    },

    /// Numerical failure while fitting or evaluating the model.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for the failure
        reason: String,
    },

    /// Computation succeeded but no day passed both tests.
    #[error("No unusual dates found with combined tests over {observations} daily changes")]
    NoAnomalies {
        /// Number of daily changes examined
        observations: usize,
    },

    /// The detection did not finish within the allotted time.
    #[error("Detection timed out after {limit_ms} ms")]
    Timeout {
        /// Time limit in milliseconds
        limit_ms: u64,
    },

    /// The detection was cancelled before it finished.
    #[error("Detection was cancelled")]
    Cancelled,

    /// The worker running the detection went away without a result.
    #[error("Detection worker terminated without producing a result")]
    WorkerLost,

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {reason}")]
    PoolBuild {
        /// Reason reported by the thread pool builder
        reason: String,
    },
}

/// Caller-visible failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or insufficient input. Never worth retrying unchanged.
    Validation,
    /// The volatility model could not be fitted to the series.
    ModelFit,
    /// The series was calm: the analysis ran and found nothing.
    NoAnomaly,
    /// The surrounding worker pool failed, timed out or was cancelled.
    Scheduling,
}

impl AnomalyDetectionError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        use AnomalyDetectionError::*;
        match self {
            MissingField { .. }
            | InsufficientData { .. }
            | LengthMismatch { .. }
            | InvalidDate { .. }
            | UnorderedDates { .. }
            | NonFiniteValue { .. }
            | ZeroBasePrice { .. }
            | InvalidParameter { .. } => ErrorKind::Validation,
            DegenerateVariance { .. } | ConvergenceFailed { .. } | NumericalError { .. } => {
                ErrorKind::ModelFit
            }
            NoAnomalies { .. } => ErrorKind::NoAnomaly,
            Timeout { .. } | Cancelled | WorkerLost | PoolBuild { .. } => ErrorKind::Scheduling,
        }
    }

    /// True when the error means "no findings" rather than a failure.
    pub fn is_no_findings(&self) -> bool {
        self.kind() == ErrorKind::NoAnomaly
    }
}

/// Result type for anomaly detection operations.
pub type AnomalyResult<T> = Result<T, AnomalyDetectionError>;

/// Validates that data has sufficient length.
///
/// # Example
/// ```rust
/// use anomaly_ranges::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length<T>(data: &[T], min_required: usize) -> AnomalyResult<()> {
    if data.len() < min_required {
        Err(AnomalyDetectionError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within inclusive bounds.
///
/// # Example
/// ```rust
/// use anomaly_ranges::errors::validate_parameter;
///
/// assert!(validate_parameter(0.05, 0.0, 1.0, "significance_level").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "significance_level").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> AnomalyResult<()> {
    if value.is_nan() {
        return Err(AnomalyDetectionError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if value < min || value > max {
        Err(AnomalyDetectionError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first NaN or infinite value.
///
/// # Example
/// ```rust
/// use anomaly_ranges::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "price").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "price").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> AnomalyResult<()> {
    match data.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(AnomalyDetectionError::NonFiniteValue {
            name: name.to_string(),
            index,
            value: data[index],
        }),
        None => Ok(()),
    }
}
