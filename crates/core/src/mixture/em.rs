use std::collections::BTreeSet;

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use super::irls::{IrlsOptions, irls};
use super::{
    BernoulliLikelihood, Hme3mFit, MixtureFit, MixtureInit, MixtureOptions, hard_labels,
    initial_responsibilities, validate, validate_labels,
};
use netpath_common::error::Error;
use netpath_common::numeric_kernel::{log_sum_exp, log1p_exp, sigmoid};

/// Starting Bernoulli parameter of every non-boundary feature.
const INITIAL_THETA: f64 = 0.5;

/// Label term of the EM objective, refitted per component in every M-step.
trait LabelModel {
    /// `ln P(label of row i | component k)`.
    fn log_likelihood(&self, i: usize, k: usize) -> f64;

    fn refit(&mut self, x: ArrayView2<f64>, k: usize, weights: ArrayView1<f64>) -> Result<(), Error>;
}

/// No labels: the mixture is fitted on the features alone.
struct Unlabelled;

impl LabelModel for Unlabelled {
    fn log_likelihood(&self, _i: usize, _k: usize) -> f64 {
        0.0
    }

    fn refit(&mut self, _x: ArrayView2<f64>, _k: usize, _weights: ArrayView1<f64>) -> Result<(), Error> {
        Ok(())
    }
}

/// One logistic regression of the labels per component.
struct Classifier<'y, 'o> {
    y: ArrayView1<'y, f64>,
    options: &'o IrlsOptions,
    /// `components × features`.
    beta: Array2<f64>,
    /// `rows × components` linear predictors `Xβ_k`.
    eta: Array2<f64>,
    singular: BTreeSet<usize>,
}

impl LabelModel for Classifier<'_, '_> {
    fn log_likelihood(&self, i: usize, k: usize) -> f64 {
        let eta = self.eta[[i, k]];
        if self.y[i] == 1.0 {
            -log1p_exp(-eta)
        } else {
            -log1p_exp(eta)
        }
    }

    /// Refits component `k` from zero; singular normal equations keep the old fit.
    fn refit(&mut self, x: ArrayView2<f64>, k: usize, weights: ArrayView1<f64>) -> Result<(), Error> {
        match irls(x, self.y, weights, Array1::zeros(x.ncols()), self.options) {
            Ok(fit) => {
                self.eta.column_mut(k).assign(&x.dot(&fit.beta));
                self.beta.row_mut(k).assign(&fit.beta);
                Ok(())
            }
            Err(Error::SingularMatrix) => {
                if self.singular.insert(k) {
                    warn!(
                        "Singular normal equations for component {}; keeping its coefficients",
                        k
                    );
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// EM state shared by the unsupervised and supervised fits.
struct Em<'x, 'o, L> {
    x: ArrayView2<'x, f64>,
    options: &'o MixtureOptions,
    responsibilities: Array2<f64>,
    proportions: Array1<f64>,
    theta: Array2<f64>,
    degenerate: BTreeSet<usize>,
    uniform_rows: BTreeSet<usize>,
    labels: L,
}

impl<'x, 'o, L: LabelModel> Em<'x, 'o, L> {
    fn new(
        x: ArrayView2<'x, f64>,
        options: &'o MixtureOptions,
        responsibilities: Array2<f64>,
        labels: L,
    ) -> Self {
        let m = options.components;
        let mut theta = Array2::from_elem((m, x.ncols()), INITIAL_THETA);
        for &j in &options.boundary_features {
            theta.column_mut(j).fill(1.0);
        }
        Self {
            x,
            options,
            responsibilities,
            proportions: Array1::from_elem(m, 1.0 / m as f64),
            theta,
            degenerate: BTreeSet::new(),
            uniform_rows: BTreeSet::new(),
            labels,
        }
    }

    /// `ln L_k(i)`, the Bernoulli log-likelihood of row `i` under component `k`.
    fn log_bernoulli(&self, i: usize, k: usize) -> f64 {
        let theta = self.theta.row(k);
        let row = self.x.row(i);
        match self.options.likelihood {
            BernoulliLikelihood::PresenceOnly => row
                .iter()
                .zip(theta.iter())
                .filter(|(x, _)| **x == 1.0)
                .map(|(_, t)| t.ln())
                .sum(),
            BernoulliLikelihood::Full => row
                .iter()
                .zip(theta.iter())
                .map(|(&x, &t)| if x == 1.0 { t.ln() } else { (1.0 - t).ln() })
                .sum(),
        }
    }

    /// `rows × components` matrix of `ln π_k + ln L_k(i) + ln P(y_i | k)`.
    fn log_joint(&self) -> Array2<f64> {
        let (rows, m) = (self.x.nrows(), self.options.components);
        Array2::from_shape_fn((rows, m), |(i, k)| {
            self.proportions[k].ln() + self.log_bernoulli(i, k) + self.labels.log_likelihood(i, k)
        })
    }

    fn e_step(&mut self) {
        let joint = self.log_joint();
        let uniform = 1.0 / self.options.components as f64;
        self.uniform_rows.clear();

        for (i, log_row) in joint.rows().into_iter().enumerate() {
            let values = log_row.to_vec();
            let norm = log_sum_exp(&values);
            let mut row = self.responsibilities.row_mut(i);
            if norm.is_finite() {
                for (h, v) in row.iter_mut().zip(values) {
                    *h = (v - norm).exp();
                }
            } else {
                row.fill(uniform);
                self.uniform_rows.insert(i);
            }
        }
    }

    fn m_step(&mut self) -> Result<(), Error> {
        let masses: Vec<f64> = self
            .responsibilities
            .columns()
            .into_iter()
            .map(|col| col.sum())
            .collect();
        let total: f64 = masses.iter().sum();

        for (k, &mass) in masses.iter().enumerate() {
            self.proportions[k] = mass / total;

            if mass.is_nan() || mass <= 0.0 {
                if self.degenerate.insert(k) {
                    warn!(
                        "Mixture component {} lost all responsibility mass; keeping its parameters",
                        k
                    );
                }
                continue;
            }

            let weights = self.responsibilities.column(k);
            let mut theta = self.theta.row_mut(k);
            theta.assign(&(self.x.t().dot(&weights) / mass));
            // Rounding may push a near-certain feature past 1.
            theta.mapv_inplace(|t| t.clamp(0.0, 1.0));
            for &j in &self.options.boundary_features {
                theta[j] = 1.0;
            }

            self.labels.refit(self.x, k, weights)?;
        }
        Ok(())
    }

    fn log_likelihood(&self) -> f64 {
        self.log_joint()
            .rows()
            .into_iter()
            .map(|row| log_sum_exp(&row.to_vec()))
            .sum()
    }

    /// Runs EM from the current responsibilities: one M-step, then E/M iterations
    /// until the likelihood settles or the cap is reached, then a final E-step.
    fn run(&mut self) -> Result<(Vec<f64>, bool), Error> {
        self.m_step()?;

        let mut trace: Vec<f64> = Vec::with_capacity(self.options.max_iterations);
        let mut converged = false;
        for iteration in 0..self.options.max_iterations {
            self.e_step();
            self.m_step()?;
            let likelihood = self.log_likelihood();
            debug!("EM iteration {}: log-likelihood {}", iteration, likelihood);

            let settled = trace
                .last()
                .is_some_and(|&previous| (likelihood - previous).abs() < self.options.tolerance);
            trace.push(likelihood);
            if settled {
                converged = true;
                break;
            }
        }
        self.e_step();

        if converged {
            info!("EM converged after {} iteration(s)", trace.len());
        } else {
            warn!(
                "EM stopped at the iteration cap ({}) without converging",
                self.options.max_iterations
            );
        }
        Ok((trace, converged))
    }

    fn into_fit(self, log_likelihood: Vec<f64>, converged: bool) -> (MixtureFit, L) {
        let (labels, tied_rows) = hard_labels(&self.responsibilities);
        if !tied_rows.is_empty() {
            warn!(
                "{} row(s) tie between components; assigned to the lowest index",
                tied_rows.len()
            );
        }
        let fit = MixtureFit {
            responsibilities: self.responsibilities,
            proportions: self.proportions,
            theta: self.theta,
            log_likelihood,
            converged,
            labels,
            tied_rows,
            degenerate_components: self.degenerate.into_iter().collect(),
            uniform_rows: self.uniform_rows.into_iter().collect(),
        };
        (fit, self.labels)
    }
}

impl Em<'_, '_, Classifier<'_, '_>> {
    /// Classifier-weighted predictions, see [`Hme3mFit`].
    fn predictions(&self) -> Array1<f64> {
        let m = self.options.components;
        Array1::from_shape_fn(self.x.nrows(), |i| {
            let log_l: Vec<f64> = (0..m).map(|k| self.log_bernoulli(i, k)).collect();
            let log_lp: Vec<f64> = (0..m)
                .map(|k| log_l[k] - log1p_exp(-self.labels.eta[[i, k]]))
                .collect();
            let norm = log_sum_exp(&log_l);
            if norm.is_finite() {
                (log_sum_exp(&log_lp) - norm).exp()
            } else {
                (0..m).map(|k| sigmoid(self.labels.eta[[i, k]])).sum::<f64>() / m as f64
            }
        })
    }
}

/// Fits an unsupervised mixture of `options.components` Bernoulli components to the
/// binary matrix `x` (`rows × features`).
///
/// # Errors
/// - `Error::MalformedInput` for non-binary entries or mis-shaped initial values.
/// - `Error::DegenerateInput` when fewer features vary than there are components.
/// - `Error::InvalidParameter` for zero components or iterations.
pub fn path_mix<R: Rng>(
    x: ArrayView2<f64>,
    options: &MixtureOptions,
    init: MixtureInit,
    rng: &mut R,
) -> Result<MixtureFit, Error> {
    validate(x, options)?;
    let h = initial_responsibilities(init, x.nrows(), options.components, rng)?;

    let mut em = Em::new(x, options, h, Unlabelled);
    let (trace, converged) = em.run()?;
    Ok(em.into_fit(trace, converged).0)
}

/// Fits the supervised mixture: [`path_mix`] with one logistic regression of `y` on
/// `x` per component, weighted by that component's responsibilities.
///
/// Each M-step refits every component's coefficients from zero. A component whose
/// normal equations are singular keeps its previous coefficients and is reported in
/// `singular_components`.
pub fn hme3m<R: Rng>(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    options: &MixtureOptions,
    irls_options: &IrlsOptions,
    init: MixtureInit,
    rng: &mut R,
) -> Result<Hme3mFit, Error> {
    validate(x, options)?;
    validate_labels(y, x.nrows())?;
    if irls_options.max_iterations == 0 {
        return Err(Error::InvalidParameter(
            "plr iterations must be positive".to_string(),
        ));
    }
    let h = initial_responsibilities(init, x.nrows(), options.components, rng)?;

    let m = options.components;
    let classifier = Classifier {
        y,
        options: irls_options,
        beta: Array2::zeros((m, x.ncols())),
        eta: Array2::zeros((x.nrows(), m)),
        singular: BTreeSet::new(),
    };
    let mut em = Em::new(x, options, h, classifier);
    let (trace, converged) = em.run()?;

    let predictions = em.predictions();
    let (mixture, classifier) = em.into_fit(trace, converged);
    Ok(Hme3mFit {
        mixture,
        plr_probabilities: classifier.eta.mapv(sigmoid),
        beta: classifier.beta,
        predictions,
        singular_components: classifier.singular.into_iter().collect(),
    })
}
