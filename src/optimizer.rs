//! Derivative-free minimisation for likelihood fitting.
//!
//! A plain Nelder-Mead simplex search. It uses no randomness, so the same
//! objective and starting point always produce the same result.

use crate::errors::{AnomalyDetectionError, AnomalyResult};
use crate::executor::CancellationToken;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Stopping rules for [`nelder_mead`]
#[derive(Debug, Clone, Copy)]
pub struct SimplexOptions {
    /// Iteration cap; reaching it is a convergence failure
    pub max_iterations: usize,
    /// Spread of objective values across the simplex at convergence,
    /// relative to `1 + |best|`
    pub tolerance: f64,
}

/// Outcome of a successful minimisation
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
}

/// Minimise `objective` starting from `start`, with per-coordinate initial
/// simplex offsets `steps`.
///
/// Non-finite objective values are treated as `+∞`, which lets callers
/// reject infeasible regions by returning NaN or infinity.
pub fn nelder_mead<F>(
    objective: F,
    start: &[f64],
    steps: &[f64],
    options: SimplexOptions,
    cancel: Option<&CancellationToken>,
) -> AnomalyResult<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = start.len();
    if dim == 0 || steps.len() != dim {
        return Err(AnomalyDetectionError::NumericalError {
            reason: format!(
                "simplex needs matching non-empty start ({}) and steps ({})",
                dim,
                steps.len()
            ),
        });
    }

    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(start.to_vec());
    for (i, step) in steps.iter().enumerate() {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    if values[0].is_infinite() {
        return Err(AnomalyDetectionError::NumericalError {
            reason: "objective is not finite at the starting point".to_string(),
        });
    }

    for iteration in 0..options.max_iterations {
        if cancel.map_or(false, |token| token.is_cancelled()) {
            return Err(AnomalyDetectionError::Cancelled);
        }

        order_simplex(&mut simplex, &mut values);

        let best = values[0];
        let worst = values[dim];
        if worst - best <= options.tolerance * (1.0 + best.abs()) {
            return Ok(Minimum {
                point: simplex.swap_remove(0),
                value: best,
                iterations: iteration,
            });
        }

        let centroid = centroid(&simplex[..dim]);
        let reflected = along(&centroid, &simplex[dim], -REFLECTION);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = along(&centroid, &simplex[dim], -EXPANSION);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
            continue;
        }

        // Contract towards the better of the reflected and the worst point.
        let (contracted, f_contracted) = if f_reflected < values[dim] {
            let outside = along(&centroid, &simplex[dim], -CONTRACTION);
            let f = eval(&outside);
            (outside, f)
        } else {
            let inside = along(&centroid, &simplex[dim], CONTRACTION);
            let f = eval(&inside);
            (inside, f)
        };

        if f_contracted < values[dim].min(f_reflected) {
            simplex[dim] = contracted;
            values[dim] = f_contracted;
            continue;
        }

        let anchor = simplex[0].clone();
        for i in 1..=dim {
            for (x, a) in simplex[i].iter_mut().zip(&anchor) {
                *x = a + SHRINK * (*x - a);
            }
            values[i] = eval(&simplex[i]);
        }
    }

    log::warn!(
        "Nelder-Mead stopped at the iteration cap ({}) without converging",
        options.max_iterations
    );
    Err(AnomalyDetectionError::ConvergenceFailed {
        iterations: options.max_iterations,
    })
}

fn order_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps ties in insertion order for determinism.
    order.sort_by(|&a, &b| crate::stats::float_total_cmp(&values[a], &values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let n = points.len() as f64;
    let mut c = vec![0.0; points[0].len()];
    for p in points {
        for (ci, pi) in c.iter_mut().zip(p) {
            *ci += pi / n;
        }
    }
    c
}

/// `centroid + t * (point - centroid)`
fn along(centroid: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(point)
        .map(|(c, p)| c + t * (p - c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn options() -> SimplexOptions {
        SimplexOptions {
            max_iterations: 5000,
            tolerance: 1e-12,
        }
    }

    #[test]
    fn test_quadratic_minimum() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2) + 5.0;
        let min = nelder_mead(f, &[0.0, 0.0], &[0.5, 0.5], options(), None).unwrap();
        assert_approx_eq!(min.point[0], 3.0, 1e-4);
        assert_approx_eq!(min.point[1], -1.0, 1e-4);
        assert_approx_eq!(min.value, 5.0, 1e-8);
    }

    #[test]
    fn test_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let min = nelder_mead(f, &[-1.2, 1.0], &[0.1, 0.1], options(), None).unwrap();
        assert_approx_eq!(min.point[0], 1.0, 1e-3);
        assert_approx_eq!(min.point[1], 1.0, 1e-3);
    }

    #[test]
    fn test_infeasible_region_is_avoided() {
        let f = |x: &[f64]| if x[0] < 0.0 { f64::NAN } else { (x[0] - 0.5).powi(2) };
        let min = nelder_mead(f, &[2.0], &[1.0], options(), None).unwrap();
        assert_approx_eq!(min.point[0], 0.5, 1e-4);
    }

    #[test]
    fn test_iteration_cap_is_a_convergence_failure() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
        let opts = SimplexOptions {
            max_iterations: 3,
            tolerance: 1e-14,
        };
        assert!(matches!(
            nelder_mead(f, &[10.0, 10.0], &[1.0, 1.0], opts, None),
            Err(AnomalyDetectionError::ConvergenceFailed { iterations: 3 })
        ));
    }

    #[test]
    fn test_bad_start_rejected() {
        let f = |_: &[f64]| f64::NAN;
        assert!(matches!(
            nelder_mead(f, &[0.0], &[1.0], options(), None),
            Err(AnomalyDetectionError::NumericalError { .. })
        ));
        let g = |x: &[f64]| x[0];
        assert!(nelder_mead(g, &[], &[], options(), None).is_err());
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let f = |x: &[f64]| x[0] * x[0];
        assert!(matches!(
            nelder_mead(f, &[1.0], &[1.0], options(), Some(&token)),
            Err(AnomalyDetectionError::Cancelled)
        ));
    }

    #[test]
    fn test_deterministic() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[0] * x[1] - 1.0).powi(2);
        let a = nelder_mead(f, &[1.0, 1.0], &[0.2, 0.2], options(), None).unwrap();
        let b = nelder_mead(f, &[1.0, 1.0], &[0.2, 0.2], options(), None).unwrap();
        assert_eq!(a.point, b.point);
        assert_eq!(a.iterations, b.iterations);
    }
}
