use super::graph::{Exclusions, Graph, VertexId};
use super::path::Path;
use super::traits::ShortestPathSolver;
use netpath_common::error::Error;

/// Strict ordering on tentative distances: `better(a, b)` is true when `a` should be
/// settled before `b`.
pub type DistanceOrder = fn(f64, f64) -> bool;

/// Numeric less-than, the ordering every ranking and search in this crate uses.
pub fn less_than(a: f64, b: f64) -> bool {
    a < b
}

/// Result of a single-source shortest-path run.
///
/// `distance[v]` is `None` for vertices the search never reached; `predecessor[v]`
/// is the previous vertex on the best known path to `v`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPathTree {
    pub source: VertexId,
    pub distance: Vec<Option<f64>>,
    pub predecessor: Vec<Option<VertexId>>,
}

impl ShortestPathTree {
    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.distance.get(v).is_some_and(Option::is_some)
    }

    /// Walks the predecessor chain back from `target`.
    ///
    /// Returns `None` if `target` was not reached or the chain does not lead back
    /// to the source within `|V|` steps.
    pub fn path_to(&self, target: VertexId) -> Option<Path> {
        let score = (*self.distance.get(target)?)?;

        let mut vertices = vec![target];
        let mut current = target;
        while current != self.source {
            if vertices.len() > self.distance.len() {
                return None;
            }
            current = self.predecessor[current]?;
            vertices.push(current);
        }
        vertices.reverse();

        Some(Path::new(vertices, score))
    }
}

/// Dijkstra's algorithm over an indexed heap with decrease-key.
///
/// Vertices whose distance improves after they were settled are pushed back onto
/// the heap, so graphs with negative edges but no negative cycle still resolve
/// correctly. A vertex settled more than `|V|` times means a negative cycle is
/// reachable and the run fails with `Error::MalformedInput`.
#[derive(Debug, Clone, Copy)]
pub struct DijkstraSolver {
    better: DistanceOrder,
}

impl Default for DijkstraSolver {
    fn default() -> Self {
        Self { better: less_than }
    }
}

impl DijkstraSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver settling vertices in the order given by `better`.
    pub fn with_order(better: DistanceOrder) -> Self {
        Self { better }
    }
}

impl ShortestPathSolver for DijkstraSolver {
    fn single_source(
        &self,
        graph: &Graph,
        source: VertexId,
        exclusions: &Exclusions,
    ) -> Result<ShortestPathTree, Error> {
        graph.check_vertex(source)?;

        let n = graph.num_vertices();
        let mut distance: Vec<Option<f64>> = vec![None; n];
        let mut predecessor = vec![None; n];
        let mut settled = vec![0usize; n];
        let mut heap = RelaxedHeap::new(n, self.better);

        distance[source] = Some(0.0);
        heap.push(source, &distance);

        while let Some(u) = heap.pop(&distance) {
            settled[u] += 1;
            if settled[u] > n {
                return Err(Error::MalformedInput(format!(
                    "negative cycle reachable from vertex '{}'",
                    graph.name(source)
                )));
            }
            let Some(du) = distance[u] else { continue };

            for (v, weight) in graph.neighbors(u) {
                if !exclusions.allows_edge(u, v) {
                    continue;
                }
                let rhs = du + weight;
                // edge relaxation
                if distance[v].is_none_or(|dv| (self.better)(rhs, dv)) {
                    distance[v] = Some(rhs);
                    predecessor[v] = Some(u);
                    if heap.contains(v) {
                        heap.update(v, &distance);
                    } else {
                        heap.push(v, &distance);
                    }
                }
            }
        }

        Ok(ShortestPathTree {
            source,
            distance,
            predecessor,
        })
    }
}

/// Binary heap of vertex ids keyed by an external distance array, with a position
/// index so a vertex's key can be decreased in place.
struct RelaxedHeap {
    heap: Vec<VertexId>,
    position: Vec<Option<usize>>,
    better: DistanceOrder,
}

impl RelaxedHeap {
    fn new(num_vertices: usize, better: DistanceOrder) -> Self {
        Self {
            heap: Vec::with_capacity(num_vertices),
            position: vec![None; num_vertices],
            better,
        }
    }

    fn contains(&self, v: VertexId) -> bool {
        self.position[v].is_some()
    }

    fn push(&mut self, v: VertexId, distance: &[Option<f64>]) {
        self.heap.push(v);
        let i = self.heap.len() - 1;
        self.position[v] = Some(i);
        self.sift_up(i, distance);
    }

    fn pop(&mut self, distance: &[Option<f64>]) -> Option<VertexId> {
        let top = *self.heap.first()?;
        let last = self.heap.pop()?;
        self.position[top] = None;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.position[last] = Some(0);
            self.sift_down(0, distance);
        }
        Some(top)
    }

    /// Restores heap order after `distance[v]` improved.
    fn update(&mut self, v: VertexId, distance: &[Option<f64>]) {
        if let Some(i) = self.position[v] {
            self.sift_up(i, distance);
        }
    }

    fn before(&self, a: VertexId, b: VertexId, distance: &[Option<f64>]) -> bool {
        match (distance[a], distance[b]) {
            (Some(x), Some(y)) => (self.better)(x, y),
            (Some(_), None) => true,
            _ => false,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.position[self.heap[i]] = Some(i);
        self.position[self.heap[j]] = Some(j);
    }

    fn sift_up(&mut self, mut i: usize, distance: &[Option<f64>]) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.before(self.heap[i], self.heap[parent], distance) {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize, distance: &[Option<f64>]) {
        let len = self.heap.len();
        loop {
            let (left, right) = (2 * i + 1, 2 * i + 2);
            let mut best = i;
            if left < len && self.before(self.heap[left], self.heap[best], distance) {
                best = left;
            }
            if right < len && self.before(self.heap[right], self.heap[best], distance) {
                best = right;
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }
}

#[cfg(test)]
mod dijkstra_tests {
    use super::*;
    use netpath_common::types::Edge;

    fn build_graph(names: &[&str], edges: &[(usize, usize, f64)]) -> Graph {
        let list: Vec<Edge> = edges
            .iter()
            .map(|&(u, v, _)| (u, v, format!("{}-{}", u, v)))
            .collect();
        let weights: Vec<f64> = edges.iter().map(|&(_, _, w)| w).collect();
        Graph::from_parts(names, &list, &weights).unwrap()
    }

    #[test]
    fn chain_distances_and_predecessors() {
        let g = build_graph(&["a", "b", "c", "d"], &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0)]);
        let tree = DijkstraSolver::new()
            .single_source(&g, 0, &Exclusions::new())
            .unwrap();

        assert_eq!(tree.distance, vec![Some(0.0), Some(1.0), Some(3.0), Some(6.0)]);
        assert_eq!(tree.predecessor, vec![None, Some(0), Some(1), Some(2)]);
        assert_eq!(tree.path_to(3).unwrap().vertices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn picks_cheaper_detour() {
        let g = build_graph(&["s", "a", "b", "t"], &[(0, 3, 10.0), (0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
        let path = DijkstraSolver::new()
            .shortest_path(&g, 0, 3, &Exclusions::new())
            .unwrap()
            .unwrap();

        assert_eq!(path.vertices, vec![0, 1, 2, 3]);
        assert_eq!(path.score, 3.0);
    }

    #[test]
    fn unreachable_target_returns_none() {
        let g = build_graph(&["a", "b", "c"], &[(0, 1, 1.0)]);
        let solver = DijkstraSolver::new();
        let tree = solver.single_source(&g, 0, &Exclusions::new()).unwrap();

        assert!(!tree.is_reachable(2));
        assert!(tree.path_to(2).is_none());
        assert!(solver.shortest_path(&g, 0, 2, &Exclusions::new()).unwrap().is_none());
    }

    #[test]
    fn source_out_of_bounds_is_an_error() {
        let g = build_graph(&["a", "b"], &[(0, 1, 1.0)]);
        let result = DijkstraSolver::new().single_source(&g, 7, &Exclusions::new());
        assert_eq!(result.unwrap_err(), Error::NodeIndexOutOfBounds(7));
    }

    #[test]
    fn source_to_itself_is_a_single_vertex_path() {
        let g = build_graph(&["a", "b"], &[(0, 1, 1.0)]);
        let tree = DijkstraSolver::new().single_source(&g, 0, &Exclusions::new()).unwrap();
        let path = tree.path_to(0).unwrap();
        assert_eq!(path.vertices, vec![0]);
        assert_eq!(path.score, 0.0);
    }

    #[test]
    fn exclusions_match_structural_removal() {
        let g = build_graph(
            &["s", "a", "b", "t"],
            &[(0, 1, 1.0), (1, 3, 1.0), (0, 2, 2.0), (2, 3, 2.0), (1, 2, 0.1)],
        );
        let solver = DijkstraSolver::new();

        let mut ex = Exclusions::new();
        ex.exclude_pair(1, 3);
        let masked = solver.shortest_path(&g, 0, 3, &ex).unwrap().unwrap();

        let mut copy = g.clone();
        copy.remove_edge(1, 3);
        let removed = solver
            .shortest_path(&copy, 0, 3, &Exclusions::new())
            .unwrap()
            .unwrap();

        assert_eq!(masked, removed);
        assert_eq!(masked.vertices, vec![0, 1, 2, 3]);

        let mut ex = Exclusions::new();
        ex.exclude_vertex(1);
        let masked = solver.shortest_path(&g, 0, 3, &ex).unwrap().unwrap();
        assert_eq!(masked.vertices, vec![0, 2, 3]);
    }

    #[test]
    fn negative_edge_without_cycle_is_resolved() {
        // b is settled through the direct edge before the cheaper route via a is seen.
        let g = build_graph(&["s", "a", "b", "t"], &[(0, 2, 1.0), (0, 1, 3.0), (1, 2, -3.0), (2, 3, 1.0)]);
        let path = DijkstraSolver::new()
            .shortest_path(&g, 0, 3, &Exclusions::new())
            .unwrap()
            .unwrap();

        assert_eq!(path.vertices, vec![0, 1, 2, 3]);
        assert_eq!(path.score, 1.0);
    }

    #[test]
    fn negative_cycle_is_reported() {
        let g = build_graph(&["a", "b"], &[(0, 1, 1.0), (1, 0, -2.0)]);
        let result = DijkstraSolver::new().single_source(&g, 0, &Exclusions::new());
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn custom_order_finds_longest_path_on_dag() {
        let g = build_graph(&["s", "a", "b", "t"], &[(0, 1, 1.0), (0, 2, 5.0), (1, 3, 10.0), (2, 3, 1.0)]);
        let solver = DijkstraSolver::with_order(|a, b| a > b);
        let path = solver
            .shortest_path(&g, 0, 3, &Exclusions::new())
            .unwrap()
            .unwrap();

        assert_eq!(path.vertices, vec![0, 1, 3]);
        assert_eq!(path.score, 11.0);
    }
}
