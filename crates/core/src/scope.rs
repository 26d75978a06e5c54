use log::{debug, info};
use rand::Rng;

use super::graph::{Graph, VertexId};
use super::sampler::{NullScoreTable, RandomEdgeSampler};
use super::traits::NullSampler;
use netpath_common::{error::Error, types::SignificantPath};

/// Parameters of a significance-filtered neighbourhood search.
///
/// `early_exit` stops scanning a target's path lengths once a p-value rises above
/// the bound; `None` scans every length.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeOptions {
    pub alpha: f64,
    pub early_exit: Option<f64>,
}

impl ScopeOptions {
    pub const DEFAULT_EARLY_EXIT: f64 = 0.1;

    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            early_exit: Some(Self::DEFAULT_EARLY_EXIT),
        }
    }
}

/// Significant paths, one per resolved target, and the resolved target names in
/// the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeResult {
    pub paths: Vec<SignificantPath>,
    pub scope: Vec<String>,
}

/// Best loopless path scores from a fixed source, by path length.
///
/// `score[l][v]` is the lowest score of a loopless `l`-edge path from the source to
/// `v`; `predecessor[l][v]` is the vertex before `v` on that path.
struct LengthTable {
    source: VertexId,
    score: Vec<Vec<Option<f64>>>,
    predecessor: Vec<Vec<Option<VertexId>>>,
}

impl LengthTable {
    fn build(graph: &Graph, source: VertexId, max_length: usize) -> Self {
        let n = graph.num_vertices();
        let mut table = Self {
            source,
            score: vec![vec![None; n]; max_length + 1],
            predecessor: vec![vec![None; n]; max_length + 1],
        };
        table.score[0][source] = Some(0.0);

        for length in 0..max_length {
            for u in 0..n {
                let Some(du) = table.score[length][u] else {
                    continue;
                };
                for (v, weight) in graph.neighbors(u) {
                    if table.on_path(u, length, v) {
                        continue;
                    }
                    let rhs = du + weight;
                    if table.score[length + 1][v].is_none_or(|dv| rhs < dv) {
                        table.score[length + 1][v] = Some(rhs);
                        table.predecessor[length + 1][v] = Some(u);
                    }
                }
            }
        }
        table
    }

    /// Whether `v` already lies on the best `length`-edge path ending at `u`.
    fn on_path(&self, u: VertexId, length: usize, v: VertexId) -> bool {
        if v == u {
            return true;
        }
        let (mut current, mut l) = (u, length);
        while current != self.source && l > 0 {
            let Some(previous) = self.predecessor[l][current] else {
                break;
            };
            if previous == v {
                return true;
            }
            current = previous;
            l -= 1;
        }
        false
    }

    /// Vertices of the best `length`-edge path ending at `target`, source first.
    fn trace(&self, target: VertexId, length: usize) -> Vec<VertexId> {
        let mut vertices = Vec::with_capacity(length + 1);
        vertices.push(target);
        let (mut current, mut l) = (target, length);
        while l > 0 {
            let Some(previous) = self.predecessor[l][current] else {
                break;
            };
            vertices.push(previous);
            current = previous;
            l -= 1;
        }
        vertices.reverse();
        vertices
    }
}

/// Finds, for one `target`, the first path length whose best loopless path from
/// `source` is significant against `null`.
///
/// Lengths run from 1 to the smaller of `null.max_length()` and `|V| - 1`. The
/// returned record's genes exclude the source and end with the target; compounds and
/// weights cover the edges between genes, while `distance` also counts the source
/// edge.
pub fn best_significant_path(
    graph: &Graph,
    source: VertexId,
    target: VertexId,
    null: &NullScoreTable,
    options: &ScopeOptions,
) -> Result<Option<SignificantPath>, Error> {
    graph.check_vertex(source)?;
    graph.check_vertex(target)?;
    let max_length = null
        .max_length()
        .min(graph.num_vertices().saturating_sub(1));
    let table = LengthTable::build(graph, source, max_length);
    significant_in(graph, &table, target, null, options)
}

fn significant_in(
    graph: &Graph,
    table: &LengthTable,
    target: VertexId,
    null: &NullScoreTable,
    options: &ScopeOptions,
) -> Result<Option<SignificantPath>, Error> {
    for length in 1..table.score.len() {
        let Some(distance) = table.score[length][target] else {
            continue;
        };
        let p_value = null.p_value(distance, length)?;
        debug!(
            "Target '{}' length {}: score {}, p = {}",
            graph.name(target),
            length,
            distance,
            p_value
        );

        if p_value < options.alpha {
            return significant_path(graph, table, target, length, distance, p_value).map(Some);
        }
        if options.early_exit.is_some_and(|bound| p_value > bound) {
            break;
        }
    }
    Ok(None)
}

fn significant_path(
    graph: &Graph,
    table: &LengthTable,
    target: VertexId,
    length: usize,
    distance: f64,
    p_value: f64,
) -> Result<SignificantPath, Error> {
    let vertices = table.trace(target, length);
    let genes_ids = &vertices[1..];

    let mut compounds = Vec::with_capacity(genes_ids.len().saturating_sub(1));
    let mut weights = Vec::with_capacity(genes_ids.len().saturating_sub(1));
    for pair in genes_ids.windows(2) {
        let missing = || Error::MalformedInput(format!("no edge {} -> {}", pair[0], pair[1]));
        compounds.push(graph.edge_label(pair[0], pair[1]).ok_or_else(missing)?.to_string());
        weights.push(graph.edge_weight(pair[0], pair[1]).ok_or_else(missing)?);
    }

    Ok(SignificantPath {
        target: graph.name(target).to_string(),
        genes: genes_ids.iter().map(|&v| graph.name(v).to_string()).collect(),
        compounds,
        weights,
        distance,
        p_value,
    })
}

/// Runs the search from `"s"` for every distinct vertex with an edge into `"t"`.
///
/// Targets are visited once each, in vertex-index order. A target without a
/// significant path is left out of both `paths` and `scope`.
///
/// # Errors
/// `Error::VertexNotFound` if `"s"` or `"t"` is missing.
pub fn scope(graph: &Graph, null: &NullScoreTable, options: &ScopeOptions) -> Result<ScopeResult, Error> {
    let (source, sink) = graph.source_sink()?;

    let mut targets: Vec<VertexId> = graph.in_neighbors(sink).map(|(v, _)| v).collect();
    targets.sort_unstable();
    targets.dedup();

    let max_length = null
        .max_length()
        .min(graph.num_vertices().saturating_sub(1));
    let table = LengthTable::build(graph, source, max_length);

    let mut result = ScopeResult::default();
    for target in targets {
        match significant_in(graph, &table, target, null, options)? {
            Some(path) => {
                debug!("Found a path to '{}'", path.target);
                result.scope.push(path.target.clone());
                result.paths.push(path);
            }
            None => debug!("Vertex '{}' out of scope", graph.name(target)),
        }
    }

    info!(
        "Scope resolved {} of the vertices adjacent to the sink",
        result.scope.len()
    );
    Ok(result)
}

/// [`scope`] with `null` when supplied, otherwise a random-edge null table covering
/// lengths up to `|V|` with 10 000 samples per length.
pub fn scope_or_sample<R: Rng>(
    graph: &Graph,
    null: Option<&NullScoreTable>,
    options: &ScopeOptions,
    rng: &mut R,
) -> Result<ScopeResult, Error> {
    match null {
        Some(table) => scope(graph, table, options),
        None => {
            let sampler = RandomEdgeSampler::new(
                graph.num_vertices(),
                RandomEdgeSampler::DEFAULT_ITERATIONS,
            );
            let table = sampler.sample(graph, rng)?;
            scope(graph, &table, options)
        }
    }
}
