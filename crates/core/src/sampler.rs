use log::{debug, info, warn};
use rand::Rng;

use super::graph::{Graph, VertexId};
use super::traits::NullSampler;
use netpath_common::error::Error;

/// Empirical null distribution of path scores, one sorted sample per path length.
///
/// Row `ℓ` (1-based, counted in edges) holds the scores of `samples()` random paths
/// of `ℓ` edges in ascending order, so a p-value is a rank lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NullScoreTable {
    rows: Vec<Vec<f64>>,
}

impl NullScoreTable {
    /// Builds a table from externally supplied rows; `rows[0]` is length 1.
    ///
    /// Rows are sorted here. Every row must be non-empty, hold finite scores, and
    /// have the same sample count.
    pub fn from_rows(mut rows: Vec<Vec<f64>>) -> Result<Self, Error> {
        let samples = rows.first().map(Vec::len).ok_or(Error::EmptyNullTable)?;
        if samples == 0 {
            return Err(Error::EmptyNullTable);
        }
        for (i, row) in rows.iter_mut().enumerate() {
            if row.len() != samples {
                return Err(Error::MalformedInput(format!(
                    "null table row for length {} has {} samples, expected {}",
                    i + 1,
                    row.len(),
                    samples
                )));
            }
            if row.iter().any(|s| !s.is_finite()) {
                return Err(Error::MalformedInput(format!(
                    "null table row for length {} holds a non-finite score",
                    i + 1
                )));
            }
            row.sort_by(f64::total_cmp);
        }
        Ok(Self { rows })
    }

    /// Longest path length covered, in edges.
    pub fn max_length(&self) -> usize {
        self.rows.len()
    }

    /// Sample count per length.
    pub fn samples(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Sorted scores for paths of `length` edges.
    pub fn row(&self, length: usize) -> Option<&[f64]> {
        length
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }

    /// `(length, sorted scores)` for every length, shortest first.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[f64])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i + 1, row.as_slice()))
    }

    /// One-sided empirical p-value of `score` among paths of `length` edges.
    ///
    /// The first index whose sampled score is `>= score`, divided by the sample
    /// count: the fraction of null paths scoring strictly lower. Always in `[0, 1]`.
    ///
    /// # Errors
    /// `Error::InvalidParameter` when `length` is outside `1..=max_length()`.
    pub fn p_value(&self, score: f64, length: usize) -> Result<f64, Error> {
        let row = self.row(length).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "path length {} outside null table range 1..={}",
                length,
                self.max_length()
            ))
        })?;
        let below = row.partition_point(|&s| s < score);
        Ok(below as f64 / row.len() as f64)
    }
}

/// Metropolis-Hastings sampler over loopless random walks.
///
/// For each length `ℓ`, `warmup_steps × samples` walks are proposed. A walk starts at
/// a uniformly random vertex and repeatedly steps to a uniformly chosen unvisited
/// out-neighbour; its log proposal probability is `-Σ ln(valid choices)`. A proposal
/// replaces the current walk when `U(0,1) < exp(log_current - log_proposal)`. Every
/// `warmup_steps` iterations the current walk's score is recorded and the chain
/// restarts, so the next proposal is always accepted.
///
/// Walks that reach a vertex with no unvisited out-neighbour are discarded and
/// rebuilt, at most `max_attempts` times per proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct MetropolisSampler {
    pub max_length: usize,
    pub samples: usize,
    pub warmup_steps: usize,
    pub max_attempts: usize,
}

impl MetropolisSampler {
    pub fn new(max_length: usize, samples: usize, warmup_steps: usize) -> Self {
        Self {
            max_length,
            samples,
            warmup_steps,
            max_attempts: 10_000,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn validate(&self, graph: &Graph) -> Result<(), Error> {
        if self.max_length == 0 || self.samples == 0 {
            return Err(Error::InvalidParameter(
                "max_length and samples must be positive".to_string(),
            ));
        }
        if self.warmup_steps == 0 || self.max_attempts == 0 {
            return Err(Error::InvalidParameter(
                "warmup_steps and max_attempts must be positive".to_string(),
            ));
        }
        if graph.num_vertices() == 0 {
            return Err(Error::MalformedInput("graph has no vertices".to_string()));
        }
        Ok(())
    }

    fn sample_length<R: Rng>(&self, graph: &Graph, length: usize, rng: &mut R) -> Result<Vec<f64>, Error> {
        let mut row = Vec::with_capacity(self.samples);
        let mut current_score = 0.0;
        let mut log_current = f64::MAX;
        let mut failures = 0usize;
        let mut changes = 0usize;

        for iteration in 1..=self.warmup_steps * self.samples {
            let (score, mut log_proposal) = self.propose(graph, length, rng, &mut failures)?;
            if failures < row.len() {
                log_proposal -= (1.0 - failures as f64 / row.len() as f64).ln();
            }

            if rng.random::<f64>() < (log_current - log_proposal).exp() {
                current_score = score;
                log_current = log_proposal;
                changes += 1;
            }

            if iteration % self.warmup_steps == 0 {
                row.push(current_score);
                log_current = f64::MAX;
            }
        }

        debug!(
            "Length {}: {} samples, {} accepted proposals, {} dead-end walks",
            length,
            row.len(),
            changes,
            failures
        );
        Ok(row)
    }

    /// Builds one loopless walk of `length` edges; returns its score and log proposal
    /// probability.
    fn propose<R: Rng>(
        &self,
        graph: &Graph,
        length: usize,
        rng: &mut R,
        failures: &mut usize,
    ) -> Result<(f64, f64), Error> {
        let n = graph.num_vertices();
        let mut visited: Vec<VertexId> = Vec::with_capacity(length + 1);
        let mut choices: Vec<(VertexId, f64)> = Vec::new();

        'attempt: for _ in 0..self.max_attempts {
            visited.clear();
            let mut current = rng.random_range(0..n);
            visited.push(current);
            let mut score = 0.0;
            let mut log_proposal = 0.0;

            for _ in 0..length {
                choices.clear();
                choices.extend(graph.neighbors(current).filter(|(v, _)| !visited.contains(v)));
                if choices.is_empty() {
                    *failures += 1;
                    continue 'attempt;
                }
                log_proposal -= (choices.len() as f64).ln();
                let (next, weight) = choices[rng.random_range(0..choices.len())];
                score += weight;
                visited.push(next);
                current = next;
            }
            return Ok((score, log_proposal));
        }

        warn!(
            "No loopless walk of length {} found in {} attempts",
            length, self.max_attempts
        );
        Err(Error::SamplingExhausted {
            length,
            attempts: self.max_attempts,
        })
    }
}

impl NullSampler for MetropolisSampler {
    fn sample<R: Rng>(&self, graph: &Graph, rng: &mut R) -> Result<NullScoreTable, Error> {
        self.validate(graph)?;
        let rows = (1..=self.max_length)
            .map(|length| self.sample_length(graph, length, rng))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Metropolis null table: lengths 1..={}, {} samples each",
            self.max_length, self.samples
        );
        NullScoreTable::from_rows(rows)
    }
}

/// Null distribution from sums of edge weights drawn uniformly, with replacement,
/// from every edge of the graph. Ignores topology.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomEdgeSampler {
    pub max_length: usize,
    pub iterations: usize,
}

impl RandomEdgeSampler {
    pub const DEFAULT_ITERATIONS: usize = 10_000;

    pub fn new(max_length: usize, iterations: usize) -> Self {
        Self {
            max_length,
            iterations,
        }
    }
}

impl NullSampler for RandomEdgeSampler {
    fn sample<R: Rng>(&self, graph: &Graph, rng: &mut R) -> Result<NullScoreTable, Error> {
        if self.max_length == 0 || self.iterations == 0 {
            return Err(Error::InvalidParameter(
                "max_length and iterations must be positive".to_string(),
            ));
        }
        let weights = graph.edge_weights();
        if weights.is_empty() {
            return Err(Error::EmptyEdgeList);
        }

        let rows: Vec<Vec<f64>> = (1..=self.max_length)
            .map(|length| {
                (0..self.iterations)
                    .map(|_| {
                        (0..length)
                            .map(|_| weights[rng.random_range(0..weights.len())])
                            .sum::<f64>()
                    })
                    .collect()
            })
            .collect();
        info!(
            "Random-edge null table: lengths 1..={}, {} samples each over {} edges",
            self.max_length,
            self.iterations,
            weights.len()
        );
        NullScoreTable::from_rows(rows)
    }
}

#[cfg(test)]
mod sampler_tests {
    use super::*;
    use netpath_common::types::Edge;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn build_graph(names: &[&str], edges: &[(usize, usize, f64)]) -> Graph {
        let list: Vec<Edge> = edges.iter().map(|&(u, v, _)| (u, v, String::new())).collect();
        let weights: Vec<f64> = edges.iter().map(|&(_, _, w)| w).collect();
        Graph::from_parts(names, &list, &weights).unwrap()
    }

    fn triangle() -> Graph {
        build_graph(&["a", "b", "c"], &[(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)])
    }

    #[test]
    fn from_rows_sorts_and_reports_shape() {
        let table = NullScoreTable::from_rows(vec![vec![3.0, 1.0, 2.0], vec![6.0, 4.0, 5.0]]).unwrap();
        assert_eq!(table.max_length(), 2);
        assert_eq!(table.samples(), 3);
        assert_eq!(table.row(1), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(table.row(2), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(table.row(0), None);
        assert_eq!(table.row(3), None);
    }

    #[test]
    fn from_rows_rejects_bad_input() {
        assert_eq!(NullScoreTable::from_rows(vec![]), Err(Error::EmptyNullTable));
        assert_eq!(NullScoreTable::from_rows(vec![vec![]]), Err(Error::EmptyNullTable));
        assert!(matches!(
            NullScoreTable::from_rows(vec![vec![1.0, 2.0], vec![1.0]]),
            Err(Error::MalformedInput(_))
        ));
        assert!(matches!(
            NullScoreTable::from_rows(vec![vec![1.0, f64::NAN]]),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn p_value_counts_strictly_lower_scores() {
        let table = NullScoreTable::from_rows(vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]]).unwrap();
        assert_eq!(table.p_value(3.0, 1).unwrap(), 0.4);
        assert_eq!(table.p_value(0.5, 1).unwrap(), 0.0);
        assert_eq!(table.p_value(1.0, 1).unwrap(), 0.0);
        assert_eq!(table.p_value(3.5, 1).unwrap(), 0.6);
        assert_eq!(table.p_value(99.0, 1).unwrap(), 1.0);
        assert!(matches!(table.p_value(1.0, 2), Err(Error::InvalidParameter(_))));
        assert!(matches!(table.p_value(1.0, 0), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn random_edges_reproduce_weight_distribution() {
        let g = build_graph(
            &["a", "b", "c", "d", "e", "f"],
            &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0), (3, 4, 4.0), (4, 5, 5.0)],
        );
        let mut rng = SmallRng::seed_from_u64(7);
        let table = RandomEdgeSampler::new(2, 20_000).sample(&g, &mut rng).unwrap();

        assert_eq!(table.max_length(), 2);
        assert_eq!(table.samples(), 20_000);
        let p = table.p_value(3.0, 1).unwrap();
        assert!((p - 0.4).abs() < 0.03, "p = {}", p);

        let row2 = table.row(2).unwrap();
        assert!(row2[0] >= 2.0 && row2[row2.len() - 1] <= 10.0);
    }

    #[test]
    fn random_edges_need_edges() {
        let mut g = build_graph(&["a", "b"], &[(0, 1, 1.0)]);
        assert_eq!(g.remove_edge(0, 1), 1);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            RandomEdgeSampler::new(1, 10).sample(&g, &mut rng),
            Err(Error::EmptyEdgeList)
        );

        let mut bare = Graph::new();
        bare.add_vertex("a").unwrap();
        assert_eq!(
            RandomEdgeSampler::new(1, 10).sample(&bare, &mut rng),
            Err(Error::EmptyEdgeList)
        );
    }

    #[test]
    fn removed_edges_are_not_sampled() {
        let mut g = build_graph(&["a", "b", "c"], &[(0, 1, 1.0), (1, 2, 100.0)]);
        g.remove_edge(1, 2);
        let mut rng = SmallRng::seed_from_u64(3);
        let table = RandomEdgeSampler::new(1, 200).sample(&g, &mut rng).unwrap();
        assert!(table.row(1).unwrap().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn metropolis_scores_on_uniform_cycle() {
        let mut rng = SmallRng::seed_from_u64(11);
        let table = MetropolisSampler::new(2, 50, 3).sample(&triangle(), &mut rng).unwrap();

        assert_eq!(table.max_length(), 2);
        assert_eq!(table.samples(), 50);
        assert!(table.row(1).unwrap().iter().all(|&s| s == 1.0));
        assert!(table.row(2).unwrap().iter().all(|&s| s == 2.0));
    }

    #[test]
    fn metropolis_is_reproducible_with_seed() {
        let g = build_graph(
            &["a", "b", "c", "d"],
            &[(0, 1, 1.0), (0, 2, 2.0), (1, 3, 3.0), (2, 3, 4.0), (3, 0, 0.5), (1, 2, 0.25)],
        );
        let sampler = MetropolisSampler::new(3, 40, 5);
        let first = sampler.sample(&g, &mut SmallRng::seed_from_u64(42)).unwrap();
        let second = sampler.sample(&g, &mut SmallRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn metropolis_length_beyond_any_walk_is_exhausted() {
        let sampler = MetropolisSampler::new(3, 5, 2).with_max_attempts(50);
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(
            sampler.sample(&triangle(), &mut rng),
            Err(Error::SamplingExhausted {
                length: 3,
                attempts: 50
            })
        );
    }

    #[test]
    fn metropolis_rejects_zero_parameters() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(matches!(
            MetropolisSampler::new(2, 10, 0).sample(&triangle(), &mut rng),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            MetropolisSampler::new(0, 10, 1).sample(&triangle(), &mut rng),
            Err(Error::InvalidParameter(_))
        ));
    }
}
