//! Markov mixture models over binary path-membership matrices.
//!
//! - [`path_mix`]: unsupervised mixture of independent Bernoulli components (3M).
//! - [`hme3m`]: the same mixture with a ridge-penalised logistic regression per
//!   component, fitted by [`irls::irls`], for supervised classification.
//!
//! Both run EM in log space. Rows of the responsibility matrix always sum to 1.

pub mod em;
pub mod irls;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use netpath_common::error::Error;

pub use em::{hme3m, path_mix};
pub use irls::{IrlsFit, IrlsOptions};

/// How a component scores the features of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BernoulliLikelihood {
    /// `Π θ_j` over the features that are on; absent features contribute nothing.
    #[default]
    PresenceOnly,
    /// `Π θ_j^x_j (1 - θ_j)^(1 - x_j)` over every feature.
    Full,
}

/// Starting responsibilities of an EM run.
#[derive(Debug, Clone, PartialEq)]
pub enum MixtureInit {
    /// Uniform random weights per row, normalised.
    Random,
    /// Given `rows × components` weights, normalised per row.
    Responsibilities(Array2<f64>),
    /// One component index per row.
    Assignments(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixtureOptions {
    pub components: usize,
    pub max_iterations: usize,
    /// Stop once the log-likelihood moves less than this between iterations.
    pub tolerance: f64,
    pub likelihood: BernoulliLikelihood,
    /// Feature columns pinned to `θ = 1` in every component.
    pub boundary_features: Vec<usize>,
}

impl MixtureOptions {
    pub const DEFAULT_TOLERANCE: f64 = 0.001;

    pub fn new(components: usize, max_iterations: usize) -> Self {
        Self {
            components,
            max_iterations,
            tolerance: Self::DEFAULT_TOLERANCE,
            likelihood: BernoulliLikelihood::default(),
            boundary_features: Vec::new(),
        }
    }

    pub fn with_likelihood(mut self, likelihood: BernoulliLikelihood) -> Self {
        self.likelihood = likelihood;
        self
    }

    pub fn with_boundary_features(mut self, features: Vec<usize>) -> Self {
        self.boundary_features = features;
        self
    }
}

/// Fitted mixture.
///
/// Fields:
/// - `responsibilities`: `rows × components`, each row sums to 1.
/// - `proportions`: mixing weights, sum to 1.
/// - `theta`: `components × features` Bernoulli parameters.
/// - `log_likelihood`: one entry per EM iteration.
/// - `converged`: false when the iteration cap stopped the run.
/// - `labels`: argmax component per row, lowest index on ties.
/// - `tied_rows`: rows whose argmax was not unique.
/// - `degenerate_components`: components whose responsibility mass collapsed to 0;
///   their parameters were left at the last finite values.
/// - `uniform_rows`: rows no component could explain in the final E-step; their
///   responsibilities fell back to uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureFit {
    pub responsibilities: Array2<f64>,
    pub proportions: Array1<f64>,
    pub theta: Array2<f64>,
    pub log_likelihood: Vec<f64>,
    pub converged: bool,
    pub labels: Vec<usize>,
    pub tied_rows: Vec<usize>,
    pub degenerate_components: Vec<usize>,
    pub uniform_rows: Vec<usize>,
}

impl MixtureFit {
    pub fn iterations(&self) -> usize {
        self.log_likelihood.len()
    }
}

/// Fitted supervised mixture.
///
/// `predictions[i] = Σ_k L_k(i) p_k(i) / Σ_k L_k(i)`, where `L_k` is the Bernoulli
/// likelihood of row `i` under component `k` and `p_k(i)` that component's logistic
/// probability of label 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Hme3mFit {
    pub mixture: MixtureFit,
    /// `components × features` logistic coefficients.
    pub beta: Array2<f64>,
    /// `rows × components` logistic probabilities of label 1.
    pub plr_probabilities: Array2<f64>,
    pub predictions: Array1<f64>,
    /// Components whose normal equations were singular; their `β` was kept.
    pub singular_components: Vec<usize>,
}

impl Hme3mFit {
    /// Predicted class per row at the given probability threshold.
    pub fn predicted_classes(&self, threshold: f64) -> Vec<u8> {
        self.predictions
            .iter()
            .map(|&p| u8::from(p >= threshold))
            .collect()
    }
}

fn is_binary(v: f64) -> bool {
    v == 0.0 || v == 1.0
}

/// Checks the matrix and options shared by both variants.
fn validate(x: ArrayView2<f64>, options: &MixtureOptions) -> Result<(), Error> {
    if options.components == 0 {
        return Err(Error::InvalidParameter(
            "a mixture needs at least one component".to_string(),
        ));
    }
    if options.max_iterations == 0 {
        return Err(Error::InvalidParameter(
            "max_iterations must be positive".to_string(),
        ));
    }
    let (rows, cols) = x.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::MalformedInput(format!(
            "path matrix is {}x{}",
            rows, cols
        )));
    }
    if let Some(((i, j), v)) = x.indexed_iter().find(|(_, v)| !is_binary(**v)) {
        return Err(Error::MalformedInput(format!(
            "path matrix entry ({}, {}) is {}, expected 0 or 1",
            i, j, v
        )));
    }
    if let Some(&j) = options.boundary_features.iter().find(|&&j| j >= cols) {
        return Err(Error::InvalidParameter(format!(
            "boundary feature {} outside {} columns",
            j, cols
        )));
    }

    let varying = x
        .columns()
        .into_iter()
        .filter(|col| col.iter().any(|&v| v == 1.0) && col.iter().any(|&v| v == 0.0))
        .count();
    if varying < options.components {
        return Err(Error::DegenerateInput(format!(
            "{} varying feature(s) for {} components",
            varying, options.components
        )));
    }
    Ok(())
}

fn validate_labels(y: ArrayView1<f64>, rows: usize) -> Result<(), Error> {
    if y.len() != rows {
        return Err(Error::MalformedInput(format!(
            "{} labels for {} rows",
            y.len(),
            rows
        )));
    }
    if let Some((i, v)) = y.iter().enumerate().find(|(_, v)| !is_binary(**v)) {
        return Err(Error::MalformedInput(format!(
            "label {} is {}, expected 0 or 1",
            i, v
        )));
    }
    Ok(())
}

/// Normalises every row to sum to 1; an all-zero row becomes uniform.
fn normalise_rows(h: &mut Array2<f64>) {
    let uniform = 1.0 / h.ncols() as f64;
    for mut row in h.rows_mut() {
        let total: f64 = row.sum();
        if total > 0.0 {
            row.mapv_inplace(|v| v / total);
        } else {
            row.fill(uniform);
        }
    }
}

/// Builds the starting responsibility matrix.
fn initial_responsibilities<R: Rng>(
    init: MixtureInit,
    rows: usize,
    components: usize,
    rng: &mut R,
) -> Result<Array2<f64>, Error> {
    let mut h = match init {
        MixtureInit::Random => Array2::from_shape_fn((rows, components), |_| rng.random::<f64>()),
        MixtureInit::Responsibilities(h) => {
            if h.dim() != (rows, components) {
                return Err(Error::MalformedInput(format!(
                    "initial responsibilities are {:?}, expected ({}, {})",
                    h.dim(),
                    rows,
                    components
                )));
            }
            if h.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(Error::MalformedInput(
                    "initial responsibilities must be finite and non-negative".to_string(),
                ));
            }
            h
        }
        MixtureInit::Assignments(labels) => {
            if labels.len() != rows {
                return Err(Error::MalformedInput(format!(
                    "{} assignments for {} rows",
                    labels.len(),
                    rows
                )));
            }
            if let Some(&k) = labels.iter().find(|&&k| k >= components) {
                return Err(Error::InvalidParameter(format!(
                    "assignment {} outside {} components",
                    k, components
                )));
            }
            let mut h = Array2::zeros((rows, components));
            for (i, &k) in labels.iter().enumerate() {
                h[[i, k]] = 1.0;
            }
            h
        }
    };
    normalise_rows(&mut h);
    Ok(h)
}

/// Argmax per row with the lowest index winning, plus the rows where it tied.
fn hard_labels(h: &Array2<f64>) -> (Vec<usize>, Vec<usize>) {
    let mut labels = Vec::with_capacity(h.nrows());
    let mut tied = Vec::new();
    for (i, row) in h.rows().into_iter().enumerate() {
        let mut best = 0;
        for k in 1..row.len() {
            if row[k] > row[best] {
                best = k;
            }
        }
        if row.iter().enumerate().any(|(k, &v)| k != best && v == row[best]) {
            tied.push(i);
        }
        labels.push(best);
    }
    (labels, tied)
}
