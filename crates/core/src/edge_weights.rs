use log::debug;
use ndarray::ArrayView2;
use rand::Rng;

use netpath_common::error::Error;
use netpath_common::numeric_kernel::{median, pearson};

/// Weight given to an edge whose endpoints are the same gene.
pub const SAME_GENE_WEIGHT: f64 = -1.0;

/// An edge between two feature columns of an expression matrix. `None` marks an
/// endpoint without measurements.
pub type FeatureEdge = (Option<usize>, Option<usize>);

/// Correlation-based weight of every edge.
///
/// `expression` is `observations × features`; `NaN` marks a missing measurement
/// and is skipped pairwise. For each edge:
/// - a missing endpoint yields `None`;
/// - a same-gene edge yields [`SAME_GENE_WEIGHT`];
/// - otherwise the Pearson correlation of the two columns. With `resamples > 1` the
///   correlation is computed on `resamples` bootstrap resamples of the observations
///   and the median is returned.
///
/// A correlation that cannot be computed (fewer than 3 usable observations, zero
/// sums, or zero variance) counts as 0.
pub fn correlation_edge_weights<R: Rng>(
    expression: ArrayView2<f64>,
    edges: &[FeatureEdge],
    same_gene: &[bool],
    resamples: usize,
    rng: &mut R,
) -> Result<Vec<Option<f64>>, Error> {
    if edges.len() != same_gene.len() {
        return Err(Error::MalformedInput(format!(
            "{} edges but {} same-gene flags",
            edges.len(),
            same_gene.len()
        )));
    }
    if resamples == 0 {
        return Err(Error::InvalidParameter(
            "resamples must be at least 1".to_string(),
        ));
    }
    let (observations, features) = expression.dim();
    if let Some(j) = edges
        .iter()
        .flat_map(|&(a, b)| [a, b])
        .flatten()
        .find(|&j| j >= features)
    {
        return Err(Error::NodeIndexOutOfBounds(j));
    }

    let mut scratch = vec![0.0; resamples];
    let weights = edges
        .iter()
        .zip(same_gene)
        .map(|(&(from, to), &same)| {
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                _ => return None,
            };
            if same {
                return Some(SAME_GENE_WEIGHT);
            }

            let x = expression.column(from);
            let y = expression.column(to);
            if resamples == 1 {
                return Some(pearson(x.iter().copied().zip(y.iter().copied())).unwrap_or(0.0));
            }
            for value in scratch.iter_mut() {
                let rows: Vec<usize> = (0..observations)
                    .map(|_| rng.random_range(0..observations))
                    .collect();
                *value = pearson(rows.iter().map(|&r| (x[r], y[r]))).unwrap_or(0.0);
            }
            median(&mut scratch)
        })
        .collect();

    debug!(
        "Computed correlation weights for {} edges over {} observations",
        edges.len(),
        observations
    );
    Ok(weights)
}
