use log::debug;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use netpath_common::error::Error;
use netpath_common::numeric_kernel::{log1p_exp, sigmoid};

/// Settings of the ridge-penalised logistic regression fit.
///
/// - `lambda`: ridge penalty added to the diagonal of `XᵀWX`.
/// - `learning_rate`: fraction of each Newton step applied to `β`.
/// - `max_iterations`: hard cap on Newton steps.
/// - `tolerance`: stop once the weighted log-likelihood moves less than this.
#[derive(Debug, Clone, PartialEq)]
pub struct IrlsOptions {
    pub lambda: f64,
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for IrlsOptions {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            learning_rate: 1.0,
            max_iterations: 100,
            tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrlsFit {
    pub beta: Array1<f64>,
    /// `σ(Xβ)` for every row.
    pub probabilities: Array1<f64>,
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Weighted log-likelihood `Σ w_i (y_i η_i - ln(1 + e^η_i))`.
fn log_likelihood(eta: &Array1<f64>, y: ArrayView1<f64>, w: ArrayView1<f64>) -> f64 {
    eta.iter()
        .zip(y.iter())
        .zip(w.iter())
        .map(|((&e, &yi), &wi)| wi * (yi * e - log1p_exp(e)))
        .sum()
}

/// Newton direction `(XᵀWX + λI)⁻¹ g` for the square system `cov`.
///
/// # Errors
/// `Error::SingularMatrix` when `cov` has no inverse or the step is not finite.
fn newton_step(cov: &Array2<f64>, gradient: &Array1<f64>) -> Result<Array1<f64>, Error> {
    let n = gradient.len();
    let system = DMatrix::from_fn(n, n, |i, j| cov[[i, j]]);
    let inverse = system.try_inverse().ok_or(Error::SingularMatrix)?;
    let step = inverse * DVector::from_iterator(n, gradient.iter().copied());
    if step.iter().any(|s| !s.is_finite()) {
        return Err(Error::SingularMatrix);
    }
    Ok(step.iter().copied().collect())
}

/// Fits `β` by iteratively reweighted least squares, starting from `beta`.
///
/// Each step solves the ridge-regularised normal equations
/// `β += α (XᵀWX + λI)⁻¹ Xᵀ(w ∘ (y - p))` with `W = diag(w ∘ p ∘ (1 - p))`.
///
/// # Errors
/// - `Error::MalformedInput` on mismatched shapes.
/// - `Error::SingularMatrix` when `XᵀWX + λI` cannot be inverted.
pub fn irls(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    w: ArrayView1<f64>,
    beta: Array1<f64>,
    options: &IrlsOptions,
) -> Result<IrlsFit, Error> {
    let (rows, cols) = x.dim();
    if y.len() != rows || w.len() != rows || beta.len() != cols {
        return Err(Error::MalformedInput(format!(
            "irls shapes: x {}x{}, y {}, w {}, beta {}",
            rows,
            cols,
            y.len(),
            w.len(),
            beta.len()
        )));
    }
    if options.max_iterations == 0 {
        return Err(Error::InvalidParameter(
            "irls needs at least one iteration".to_string(),
        ));
    }

    let mut beta = beta;
    let mut eta = x.dot(&beta);
    let mut likelihood = log_likelihood(&eta, y, w);
    let penalty = Array2::<f64>::eye(cols) * options.lambda;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        let p = eta.mapv(sigmoid);
        let irls_weights = &w * &p.mapv(|pi| pi * (1.0 - pi));

        let xw = &x * &irls_weights.view().insert_axis(Axis(1));
        let cov = xw.t().dot(&x) + &penalty;
        let residual = &w * &(&y - &p);
        let gradient = x.t().dot(&residual);

        let step = newton_step(&cov, &gradient)?;
        beta.scaled_add(options.learning_rate, &step);

        eta = x.dot(&beta);
        let updated = log_likelihood(&eta, y, w);
        iterations += 1;

        let delta = (updated - likelihood).abs();
        likelihood = updated;
        if delta < options.tolerance {
            converged = true;
            break;
        }
    }

    debug!(
        "IRLS finished after {} iteration(s), log-likelihood {}",
        iterations, likelihood
    );
    Ok(IrlsFit {
        probabilities: eta.mapv(sigmoid),
        beta,
        log_likelihood: likelihood,
        iterations,
        converged,
    })
}
