use std::collections::BTreeMap;

use log::{debug, info, warn};
use rayon::prelude::*;

use super::graph::{Exclusions, Graph};
use super::path::Path;
use super::solver::DijkstraSolver;
use super::traits::ShortestPathSolver;
use netpath_common::{error::Error, types::RankedPath};

/// Parameters of a k-shortest-path ranking run.
///
/// Fields:
/// - `k`: number of retained paths to collect.
/// - `min_path_size`: a path is retained only with strictly more vertices than this.
/// - `trivial_hop_factor`: when set, a path is retained only if its score is strictly
///   greater than `factor × weight of its first edge`. With the default factor of 2
///   this discards paths that pass through a single gene when the source and sink
///   edges carry the same weight. `None` disables the rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    pub k: usize,
    pub min_path_size: usize,
    pub trivial_hop_factor: Option<f64>,
}

impl RankOptions {
    pub const DEFAULT_TRIVIAL_HOP_FACTOR: f64 = 2.0;

    pub fn new(k: usize, min_path_size: usize) -> Self {
        Self {
            k,
            min_path_size,
            trivial_hop_factor: Some(Self::DEFAULT_TRIVIAL_HOP_FACTOR),
        }
    }

    pub fn with_trivial_hop_factor(mut self, factor: Option<f64>) -> Self {
        self.trivial_hop_factor = factor;
        self
    }

    /// Whether an accepted path makes it into the result set.
    ///
    /// A direct `s -> t` edge (fewer than three vertices) is never retained, even with
    /// `min_path_size` of 0 and no trivial-hop factor: a result path always passes
    /// through at least one gene.
    pub fn retains(&self, path: &Path, graph: &Graph) -> bool {
        if path.len() <= self.min_path_size || path.len() < 3 {
            return false;
        }
        match self.trivial_hop_factor {
            None => true,
            Some(factor) => path
                .first_edge_weight(graph)
                .is_some_and(|w| path.score > factor * w),
        }
    }
}

/// Outcome of a ranking run.
///
/// - `paths`: retained paths, ascending by score.
/// - `examined`: candidates moved into the accepted set, filtered ones included.
/// - `exhausted`: the candidate pool ran dry before `k` paths were retained.
#[derive(Debug, Clone, PartialEq)]
pub struct RankOutcome {
    pub paths: Vec<Path>,
    pub examined: usize,
    pub exhausted: bool,
}

/// Yen–Lawler enumeration of loopless `"s" -> "t"` paths in ascending score order.
///
/// References:
/// - J. Y. Yen, Finding the k shortest loopless paths in a network,
///   Management Science 17(11), 1971.
/// - E. L. Lawler, A procedure for computing the k best solutions to discrete
///   optimization problems and its application to the shortest path problem,
///   Management Science 18(7), 1972.
#[derive(Debug, Clone, Default)]
pub struct PathRanker<S = DijkstraSolver> {
    solver: S,
}

impl<S> PathRanker<S>
where
    S: ShortestPathSolver,
{
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    /// Enumerates up to `options.k` retained paths.
    ///
    /// Each round sorts the candidate pool, truncates it to `k - retained + 1`
    /// entries, and moves the best candidate into the accepted set. The retention
    /// filter runs after acceptance, so filtered paths still spawn deviations and the
    /// run may examine more than `k` candidates. For every position `i` from the
    /// accepted path's deviation index onward, the spur search runs on the graph with
    /// - the edge `(r[i], r[i+1])` removed for every accepted `r` sharing the prefix
    ///   `p[0..=i]`, and
    /// - every vertex `p[0..i]` removed,
    ///
    /// applied as an [`Exclusions`] overlay, so the input graph is never modified.
    ///
    /// # Errors
    /// `Error::VertexNotFound` if the graph lacks the `"s"` or `"t"` vertex.
    pub fn rank(&self, graph: &Graph, options: &RankOptions) -> Result<RankOutcome, Error> {
        let (source, sink) = graph.source_sink().inspect_err(|e| {
            warn!("No start or end vertex found: {}", e);
        })?;

        let mut outcome = RankOutcome {
            paths: Vec::new(),
            examined: 0,
            exhausted: false,
        };
        if options.k == 0 {
            return Ok(outcome);
        }

        let mut accepted: Vec<Path> = Vec::new();
        let mut candidates: Vec<Path> = Vec::new();
        if let Some(first) = self
            .solver
            .shortest_path(graph, source, sink, &Exclusions::new())?
        {
            candidates.push(first);
        }

        while outcome.paths.len() < options.k {
            if candidates.is_empty() {
                outcome.exhausted = true;
                break;
            }

            // Stable sort: equal scores keep discovery order.
            candidates.sort_by(|a, b| a.score.total_cmp(&b.score));
            candidates.truncate(options.k - outcome.paths.len() + 1);
            let p = candidates.remove(0);
            outcome.examined += 1;

            if options.retains(&p, graph) {
                debug!("Retained path {:?} (score {})", p.vertices, p.score);
                outcome.paths.push(p.clone());
            } else {
                debug!("Filtered path {:?} (score {})", p.vertices, p.score);
            }
            accepted.push(p);
            let Some(p) = accepted.last() else { break };

            let mut prefix_score = 0.0;
            for i in 0..p.hops() {
                if i >= p.deviation {
                    let mut exclusions = Exclusions::new();
                    for r in accepted.iter().filter(|r| r.len() > i + 1 && r.shares_prefix(p, i)) {
                        exclusions.exclude_pair(r.vertices[i], r.vertices[i + 1]);
                    }
                    for &v in &p.vertices[..i] {
                        exclusions.exclude_vertex(v);
                    }

                    if let Some(spur) =
                        self.solver
                            .shortest_path(graph, p.vertices[i], sink, &exclusions)?
                    {
                        let mut vertices = p.vertices[..i].to_vec();
                        vertices.extend(spur.vertices);
                        let candidate = Path {
                            vertices,
                            score: prefix_score + spur.score,
                            deviation: i,
                        };
                        let known = accepted
                            .iter()
                            .chain(candidates.iter())
                            .any(|q| q.vertices == candidate.vertices);
                        if !known {
                            candidates.push(candidate);
                        }
                    }
                }

                prefix_score += graph
                    .edge_weight(p.vertices[i], p.vertices[i + 1])
                    .ok_or_else(|| {
                        Error::MalformedInput(format!(
                            "accepted path uses missing edge {} -> {}",
                            p.vertices[i],
                            p.vertices[i + 1]
                        ))
                    })?;
            }
        }

        info!(
            "Ranked {} path(s) after examining {} candidate(s){}",
            outcome.paths.len(),
            outcome.examined,
            if outcome.exhausted { ", candidate pool exhausted" } else { "" }
        );
        Ok(outcome)
    }

    /// Same as [`rank`](Self::rank), returning the named path records.
    pub fn rank_records(
        &self,
        graph: &Graph,
        options: &RankOptions,
    ) -> Result<Vec<RankedPath>, Error> {
        let outcome = self.rank(graph, options)?;
        Ok(outcome
            .paths
            .iter()
            .filter_map(|p| p.to_ranked(graph))
            .collect())
    }
}

/// Ranks with the default Dijkstra solver and the default trivial-hop filter.
pub fn rank(graph: &Graph, k: usize, min_path_size: usize) -> Result<Vec<Path>, Error> {
    PathRanker::<DijkstraSolver>::default()
        .rank(graph, &RankOptions::new(k, min_path_size))
        .map(|outcome| outcome.paths)
}

/// Ranked paths grouped by sample-label category.
///
/// A category whose graph cannot be ranked lands in `failures`; the others are
/// unaffected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRanking {
    pub by_label: BTreeMap<String, Vec<RankedPath>>,
    pub failures: BTreeMap<String, Error>,
}

/// Ranks every `(label, graph)` category independently, in parallel.
pub fn rank_categories(categories: &[(String, Graph)], options: &RankOptions) -> CategoryRanking {
    let ranker = PathRanker::<DijkstraSolver>::default();

    let results: Vec<(String, Result<Vec<RankedPath>, Error>)> = categories
        .par_iter()
        .map(|(label, graph)| (label.clone(), ranker.rank_records(graph, options)))
        .collect();

    let mut ranking = CategoryRanking::default();
    for (label, result) in results {
        match result {
            Ok(paths) => {
                ranking.by_label.insert(label, paths);
            }
            Err(e) => {
                warn!("Ranking failed for category '{}': {}", label, e);
                ranking.failures.insert(label, e);
            }
        }
    }
    ranking
}
