use std::collections::HashSet;

use netpath_common::types::RankedPath;

use crate::graph::{Graph, VertexId};

/// An ordered vertex sequence with its cumulative score.
///
/// `deviation` is the first position from which the ranker may still branch off this
/// path; it is only meaningful while the path sits in the candidate pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub vertices: Vec<VertexId>,
    pub score: f64,
    pub deviation: usize,
}

impl Path {
    pub fn new(vertices: Vec<VertexId>, score: f64) -> Self {
        Self {
            vertices,
            score,
            deviation: 0,
        }
    }

    /// Number of vertices, endpoints included.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn hops(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// True when no vertex is visited twice.
    pub fn is_loopless(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.vertices.len());
        self.vertices.iter().all(|v| seen.insert(*v))
    }

    /// `self[0..=i] == other[0..=i]`, false when either path is too short.
    pub fn shares_prefix(&self, other: &Path, i: usize) -> bool {
        self.vertices.len() > i
            && other.vertices.len() > i
            && self.vertices[..=i] == other.vertices[..=i]
    }

    /// Weight of the edge leaving the first vertex.
    pub fn first_edge_weight(&self, graph: &Graph) -> Option<f64> {
        match self.vertices.as_slice() {
            [a, b, ..] => graph.edge_weight(*a, *b),
            _ => None,
        }
    }

    /// Converts the path into a named record, stripping the two endpoints.
    ///
    /// Returns `None` when the path has no interior vertex or refers to an edge the
    /// graph no longer holds.
    pub fn to_ranked(&self, graph: &Graph) -> Option<RankedPath> {
        if self.vertices.len() < 3 {
            return None;
        }
        let interior = &self.vertices[1..self.vertices.len() - 1];

        let genes = interior.iter().map(|&v| graph.name(v).to_string()).collect();
        let mut compounds = Vec::with_capacity(interior.len() - 1);
        let mut weights = Vec::with_capacity(interior.len() - 1);
        for pair in interior.windows(2) {
            compounds.push(graph.edge_label(pair[0], pair[1])?.to_string());
            weights.push(graph.edge_weight(pair[0], pair[1])?);
        }

        Some(RankedPath {
            genes,
            compounds,
            weights,
            distance: self.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Graph {
        Graph::from_parts(
            &["s", "g1", "g2", "g3", "t"],
            &[
                (0, 1, "c0".to_string()),
                (1, 2, "c1".to_string()),
                (2, 3, "c2".to_string()),
                (3, 4, "c3".to_string()),
            ],
            &[0.5, 1.0, 2.0, 0.5],
        )
        .unwrap()
    }

    #[test]
    fn to_ranked_strips_endpoints() {
        let g = chain();
        let p = Path::new(vec![0, 1, 2, 3, 4], 4.0);
        let record = p.to_ranked(&g).unwrap();

        assert_eq!(record.genes, vec!["g1", "g2", "g3"]);
        assert_eq!(record.compounds, vec!["c1", "c2"]);
        assert_eq!(record.weights, vec![1.0, 2.0]);
        assert_eq!(record.distance, 4.0);
        assert_eq!(record.hops(), 2);
    }

    #[test]
    fn to_ranked_needs_an_interior_vertex() {
        let g = chain();
        assert!(Path::new(vec![0, 4], 1.0).to_ranked(&g).is_none());
    }

    #[test]
    fn single_gene_path_has_no_compounds() {
        let g = chain();
        let record = Path::new(vec![0, 1, 4], 1.0).to_ranked(&g).unwrap();
        assert_eq!(record.genes, vec!["g1"]);
        assert!(record.compounds.is_empty());
    }

    #[test]
    fn loop_detection() {
        assert!(Path::new(vec![0, 1, 2], 0.0).is_loopless());
        assert!(!Path::new(vec![0, 1, 0, 2], 0.0).is_loopless());
    }

    #[test]
    fn prefix_comparison() {
        let a = Path::new(vec![0, 1, 2, 4], 0.0);
        let b = Path::new(vec![0, 1, 3, 4], 0.0);
        assert!(a.shares_prefix(&b, 1));
        assert!(!a.shares_prefix(&b, 2));
        assert!(!a.shares_prefix(&Path::new(vec![0], 0.0), 1));
    }

    #[test]
    fn first_edge_weight_reads_graph() {
        let g = chain();
        assert_eq!(Path::new(vec![0, 1, 2], 0.0).first_edge_weight(&g), Some(0.5));
        assert_eq!(Path::new(vec![0], 0.0).first_edge_weight(&g), None);
    }
}
