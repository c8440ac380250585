//! GARCH(1,1) volatility estimation.
//!
//! Fits a constant-mean GARCH(1,1) model with Gaussian innovations by
//! maximum likelihood and returns the in-sample conditional volatility path:
//!
//! ```text
//! ε_t  = x_t − μ
//! σ²_0 = backcast
//! σ²_t = ω + α·ε²_{t−1} + β·σ²_{t−1}
//! ```
//!
//! The likelihood is maximised over an unconstrained reparameterisation
//! (`ω = e^a`, `α + β = logistic(b)`, `α / (α + β) = logistic(c)`) so every
//! candidate is a stationary model with non-negative coefficients. The series
//! is standardised before fitting; GARCH is scale-equivariant, so results are
//! mapped back to the original units afterwards.

use crate::errors::{validate_all_finite, AnomalyDetectionError, AnomalyResult};
use crate::executor::CancellationToken;
use crate::optimizer::{nelder_mead, SimplexOptions};
use crate::stats::{mean, mean_square, population_variance};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const LN_2PI: f64 = 1.837_877_066_409_345_5;
// Keeps σ² strictly positive when ω underflows.
const VARIANCE_FLOOR: f64 = 1e-300;

/// Starting point of the likelihood search, in standardised units.
const START_OMEGA: f64 = 0.05;
const START_ALPHA: f64 = 0.10;
const START_BETA: f64 = 0.85;

/// Options for fitting the volatility model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GarchConfig {
    /// Maximum optimiser iterations before `ConvergenceFailed`
    pub max_iterations: usize,
    /// Convergence tolerance on the negative log-likelihood
    pub tolerance: f64,
    /// Number of leading observations used for the variance backcast
    pub backcast_window: usize,
    /// Exponential decay of backcast weights
    pub backcast_decay: f64,
    /// Variance below this fraction of the mean square counts as degenerate
    pub degenerate_ratio: f64,
}

impl Default for GarchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-10,
            backcast_window: 75,
            backcast_decay: 0.94,
            degenerate_ratio: 1e-12,
        }
    }
}

impl GarchConfig {
    /// Check option ranges.
    pub fn validate(&self) -> AnomalyResult<()> {
        let invalid = |parameter: &str, value: f64, constraint: &str| {
            Err(AnomalyDetectionError::InvalidParameter {
                parameter: parameter.to_string(),
                value,
                constraint: constraint.to_string(),
            })
        };
        if self.max_iterations == 0 {
            return invalid("max_iterations", 0.0, ">= 1");
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return invalid("tolerance", self.tolerance, "> 0");
        }
        if self.backcast_window == 0 {
            return invalid("backcast_window", 0.0, ">= 1");
        }
        if !(self.backcast_decay > 0.0 && self.backcast_decay <= 1.0) {
            return invalid("backcast_decay", self.backcast_decay, "(0, 1]");
        }
        if !(self.degenerate_ratio >= 0.0 && self.degenerate_ratio < 1.0) {
            return invalid("degenerate_ratio", self.degenerate_ratio, "[0, 1)");
        }
        Ok(())
    }
}

/// Fitted GARCH(1,1) model and its in-sample volatility path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GarchFit {
    /// Constant mean
    pub mu: f64,
    /// Variance intercept
    pub omega: f64,
    /// ARCH coefficient (reaction to yesterday's shock)
    pub alpha: f64,
    /// GARCH coefficient (carry-over of yesterday's variance)
    pub beta: f64,
    /// Maximised Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Optimiser iterations used
    pub iterations: usize,
    /// Conditional standard deviation at each observation
    pub conditional_volatility: Vec<f64>,
}

impl GarchFit {
    /// `α + β`
    pub fn persistence(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Long-run variance `ω / (1 − α − β)`.
    pub fn unconditional_variance(&self) -> f64 {
        self.omega / (1.0 - self.persistence()).max(f64::EPSILON)
    }

    /// Akaike information criterion with four parameters.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * 4.0
    }

    /// Bayesian information criterion with four parameters.
    pub fn bic(&self) -> f64 {
        let n = self.conditional_volatility.len() as f64;
        -2.0 * self.log_likelihood + 4.0 * n.ln()
    }
}

/// Model coefficients in standardised units.
#[derive(Debug, Clone, Copy)]
struct Params {
    mu: f64,
    omega: f64,
    alpha: f64,
    beta: f64,
}

impl Params {
    fn from_unconstrained(x: &[f64]) -> Self {
        let persistence = logistic(x[2]);
        let share = logistic(x[3]);
        Self {
            mu: x[0],
            omega: x[1].exp(),
            alpha: persistence * share,
            beta: persistence * (1.0 - share),
        }
    }

    fn to_unconstrained(self) -> [f64; 4] {
        let persistence = self.alpha + self.beta;
        [
            self.mu,
            self.omega.ln(),
            logit(persistence),
            logit(self.alpha / persistence),
        ]
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Exponentially weighted mean of the leading squared residuals.
fn backcast(residuals: &[f64], config: &GarchConfig) -> f64 {
    let tau = config.backcast_window.min(residuals.len());
    let mut weight = 1.0;
    let mut total_weight = 0.0;
    let mut acc = 0.0;
    for r in &residuals[..tau] {
        acc += weight * r * r;
        total_weight += weight;
        weight *= config.backcast_decay;
    }
    acc / total_weight
}

/// Run the variance recursion, writing σ²_t into `variances`.
fn variance_path(data: &[f64], p: &Params, initial: f64, variances: &mut Vec<f64>) {
    variances.clear();
    if data.is_empty() {
        return;
    }
    let mut sigma2 = initial;
    variances.push(sigma2);
    for x in &data[..data.len() - 1] {
        let e = x - p.mu;
        sigma2 = (p.omega + p.alpha * e * e + p.beta * sigma2).max(VARIANCE_FLOOR);
        variances.push(sigma2);
    }
}

fn negative_log_likelihood(data: &[f64], p: &Params, initial: f64) -> f64 {
    let mut variances = Vec::with_capacity(data.len());
    variance_path(data, p, initial, &mut variances);
    data.iter()
        .zip(&variances)
        .map(|(x, s2)| {
            let e = x - p.mu;
            0.5 * (LN_2PI + s2.ln() + e * e / s2)
        })
        .sum()
}

/// Fit GARCH(1,1) to `data` and return the in-sample volatility path.
///
/// # Errors
/// * `DegenerateVariance` when the series has (numerically) no variance,
///   which includes a single observation
/// * `ConvergenceFailed` when the optimiser hits `max_iterations`
/// * `NumericalError` when the likelihood cannot be evaluated
pub fn fit_garch(data: &[f64], config: &GarchConfig) -> AnomalyResult<GarchFit> {
    fit_garch_with_cancel(data, config, None)
}

/// [`fit_garch`] with cooperative cancellation polled once per iteration.
pub fn fit_garch_with_cancel(
    data: &[f64],
    config: &GarchConfig,
    cancel: Option<&CancellationToken>,
) -> AnomalyResult<GarchFit> {
    config.validate()?;
    validate_all_finite(data, "daily change")?;

    let variance = population_variance(data);
    if data.len() < 2 || variance <= config.degenerate_ratio * mean_square(data) {
        return Err(AnomalyDetectionError::DegenerateVariance { variance });
    }

    let scale = variance.sqrt();
    let scaled: Vec<f64> = data.iter().map(|x| x / scale).collect();
    let start_mu = mean(&scaled);
    let demeaned: Vec<f64> = scaled.iter().map(|x| x - start_mu).collect();
    let initial_variance = backcast(&demeaned, config).max(VARIANCE_FLOOR);

    let start = Params {
        mu: start_mu,
        omega: START_OMEGA,
        alpha: START_ALPHA,
        beta: START_BETA,
    };

    log::debug!(
        "Fitting GARCH(1,1) on {} observations (scale {:.6e}, backcast {:.6})",
        data.len(),
        scale,
        initial_variance
    );

    let objective = |x: &[f64]| {
        negative_log_likelihood(&scaled, &Params::from_unconstrained(x), initial_variance)
    };
    let minimum = nelder_mead(
        objective,
        &start.to_unconstrained(),
        &[0.1, 0.5, 0.5, 0.5],
        SimplexOptions {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        },
        cancel,
    )?;

    let fitted = Params::from_unconstrained(&minimum.point);
    let mut variances = Vec::with_capacity(scaled.len());
    variance_path(&scaled, &fitted, initial_variance, &mut variances);

    let conditional_volatility: Vec<f64> = variances.iter().map(|s2| s2.sqrt() * scale).collect();
    if conditional_volatility.iter().any(|v| !v.is_finite()) {
        return Err(AnomalyDetectionError::NumericalError {
            reason: "conditional volatility path is not finite".to_string(),
        });
    }

    let fit = GarchFit {
        mu: fitted.mu * scale,
        omega: fitted.omega * scale * scale,
        alpha: fitted.alpha,
        beta: fitted.beta,
        // Change of variables x = s·y adds n·ln(s) to the negative log-likelihood.
        log_likelihood: -(minimum.value + data.len() as f64 * scale.ln()),
        iterations: minimum.iterations,
        conditional_volatility,
    };

    log::debug!(
        "GARCH(1,1) converged in {} iterations: mu={:.6e} omega={:.6e} alpha={:.4} beta={:.4} ll={:.4}",
        fit.iterations,
        fit.mu,
        fit.omega,
        fit.alpha,
        fit.beta,
        fit.log_likelihood
    );

    Ok(fit)
}
