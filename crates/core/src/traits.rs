use rand::Rng;

use super::graph::{Exclusions, Graph, VertexId};
use super::path::Path;
use super::sampler::NullScoreTable;
use super::solver::ShortestPathTree;
use netpath_common::error::Error;

/// Trait for single-source shortest-path engines.
pub trait ShortestPathSolver {
    /// Computes distances and predecessors from `source` to every vertex of
    /// `graph` with `exclusions` applied.
    ///
    /// Returns `Err(e)` if `source` is not a vertex of `graph`.
    fn single_source(
        &self,
        graph: &Graph,
        source: VertexId,
        exclusions: &Exclusions,
    ) -> Result<ShortestPathTree, Error>;

    /// Shortest `source -> target` path, `Ok(None)` when `target` is unreachable.
    fn shortest_path(
        &self,
        graph: &Graph,
        source: VertexId,
        target: VertexId,
        exclusions: &Exclusions,
    ) -> Result<Option<Path>, Error> {
        graph.check_vertex(target)?;
        let tree = self.single_source(graph, source, exclusions)?;
        Ok(tree.path_to(target))
    }
}

/// Trait for generators of empirical path-score null distributions.
pub trait NullSampler {
    /// Builds a table with one sorted score sample per path length.
    fn sample<R: Rng>(&self, graph: &Graph, rng: &mut R) -> Result<NullScoreTable, Error>;
}
