use std::collections::{HashMap, HashSet};

use netpath_common::error::Error;
use netpath_common::types::Edge;

/// Dense vertex index in `[0, num_vertices)`.
pub type VertexId = usize;

/// Index into the edge arrays. Stable for the lifetime of a graph, removed edges included.
pub type EdgeId = usize;

/// Name of the distinguished path source.
pub const SOURCE_NAME: &str = "s";

/// Name of the distinguished path sink.
pub const SINK_NAME: &str = "t";

/// Weighted directed multigraph with named vertices and labelled edges.
///
/// Edge data is stored as a struct of arrays, indexed by `EdgeId`:
/// - `edge_sources[e]` → tail vertex of edge `e`
/// - `edge_targets[e]` → head vertex of edge `e`
/// - `edge_weights[e]` → weight of edge `e`
/// - `edge_labels[e]` → label (compound name) of edge `e`
///
/// `outgoing[u]` and `incoming[v]` hold the live edge ids touching each vertex, so
/// both directions are iterable in O(degree). `pair_index` maps an ordered vertex
/// pair to the first live edge between them, giving O(1) amortized edge queries.
///
/// Removal tombstones an edge instead of compacting the arrays, so edge ids handed
/// out earlier never change meaning.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    names: Vec<String>,
    name_index: HashMap<String, VertexId>,
    edge_sources: Vec<VertexId>,
    edge_targets: Vec<VertexId>,
    edge_weights: Vec<f64>,
    edge_labels: Vec<String>,
    edge_alive: Vec<bool>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    pair_index: HashMap<(VertexId, VertexId), EdgeId>,
    live_edges: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for a known graph size.
    pub fn with_capacity(vertex_count: usize, edge_count: usize) -> Self {
        Self {
            names: Vec::with_capacity(vertex_count),
            name_index: HashMap::with_capacity(vertex_count),
            edge_sources: Vec::with_capacity(edge_count),
            edge_targets: Vec::with_capacity(edge_count),
            edge_weights: Vec::with_capacity(edge_count),
            edge_labels: Vec::with_capacity(edge_count),
            edge_alive: Vec::with_capacity(edge_count),
            outgoing: Vec::with_capacity(vertex_count),
            incoming: Vec::with_capacity(vertex_count),
            pair_index: HashMap::with_capacity(edge_count),
            live_edges: 0,
        }
    }

    /// Builds a graph from a vertex name list, a 0-based `(from, to, label)` edge list
    /// and a parallel array of edge weights.
    ///
    /// # Errors
    /// - `Error::EmptyEdgeList` if `edges` is empty.
    /// - `Error::MalformedInput` if `edges` and `weights` differ in length, a weight is
    ///   not finite, or a vertex name is repeated.
    /// - `Error::NodeIndexOutOfBounds` if an edge endpoint is not a valid vertex index.
    pub fn from_parts<S: AsRef<str>>(
        vertex_names: &[S],
        edges: &[Edge],
        weights: &[f64],
    ) -> Result<Self, Error> {
        if edges.is_empty() {
            return Err(Error::EmptyEdgeList);
        }
        if edges.len() != weights.len() {
            return Err(Error::MalformedInput(format!(
                "{} edges but {} weights",
                edges.len(),
                weights.len()
            )));
        }

        let mut graph = Self::with_capacity(vertex_names.len(), edges.len());
        for name in vertex_names {
            graph.add_vertex(name.as_ref())?;
        }
        for ((from, to, label), &weight) in edges.iter().zip(weights) {
            graph.add_edge(*from, *to, weight, label)?;
        }
        Ok(graph)
    }

    /// Registers a vertex and returns its dense index.
    ///
    /// # Errors
    /// `Error::MalformedInput` if a vertex with the same name already exists.
    pub fn add_vertex(&mut self, name: &str) -> Result<VertexId, Error> {
        if self.name_index.contains_key(name) {
            return Err(Error::MalformedInput(format!(
                "duplicate vertex name '{}'",
                name
            )));
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.name_index.insert(name.to_string(), id);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Ok(id)
    }

    /// Adds a directed edge `from -> to`. Parallel edges are allowed; pair queries
    /// resolve to the first one added.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: f64,
        label: &str,
    ) -> Result<EdgeId, Error> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        if !weight.is_finite() {
            return Err(Error::MalformedInput(format!(
                "edge {} -> {} has non-finite weight {}",
                from, to, weight
            )));
        }

        let id = self.edge_targets.len();
        self.edge_sources.push(from);
        self.edge_targets.push(to);
        self.edge_weights.push(weight);
        self.edge_labels.push(label.to_string());
        self.edge_alive.push(true);
        self.outgoing[from].push(id);
        self.incoming[to].push(id);
        self.pair_index.entry((from, to)).or_insert(id);
        self.live_edges += 1;
        Ok(id)
    }

    /// Removes every edge `from -> to` and returns how many were removed.
    pub fn remove_edge(&mut self, from: VertexId, to: VertexId) -> usize {
        if self.pair_index.remove(&(from, to)).is_none() {
            return 0;
        }

        let doomed: Vec<EdgeId> = self.outgoing[from]
            .iter()
            .copied()
            .filter(|&e| self.edge_targets[e] == to)
            .collect();
        for &e in &doomed {
            self.edge_alive[e] = false;
        }
        let (targets, sources) = (&self.edge_targets, &self.edge_sources);
        self.outgoing[from].retain(|&e| targets[e] != to);
        self.incoming[to].retain(|&e| sources[e] != from);
        self.live_edges -= doomed.len();
        doomed.len()
    }

    /// Removes every edge entering or leaving `v`. The vertex itself stays, isolated.
    pub fn clear_vertex(&mut self, v: VertexId) -> Result<(), Error> {
        self.check_vertex(v)?;

        let targets: HashSet<VertexId> = self.outgoing[v]
            .iter()
            .map(|&e| self.edge_targets[e])
            .collect();
        let sources: HashSet<VertexId> = self.incoming[v]
            .iter()
            .map(|&e| self.edge_sources[e])
            .collect();

        for to in targets {
            self.remove_edge(v, to);
        }
        for from in sources {
            self.remove_edge(from, v);
        }
        Ok(())
    }

    pub fn num_vertices(&self) -> usize {
        self.names.len()
    }

    /// Number of live edges.
    pub fn num_edges(&self) -> usize {
        self.live_edges
    }

    /// Looks up a vertex index by name.
    pub fn vertex_id(&self, name: &str) -> Result<VertexId, Error> {
        self.name_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::VertexNotFound(name.to_string()))
    }

    /// Resolves the `"s"` / `"t"` sentinels.
    pub fn source_sink(&self) -> Result<(VertexId, VertexId), Error> {
        Ok((self.vertex_id(SOURCE_NAME)?, self.vertex_id(SINK_NAME)?))
    }

    /// Name of vertex `v`. Panics on an invalid index, like slice indexing.
    pub fn name(&self, v: VertexId) -> &str {
        &self.names[v]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First live edge `from -> to`, if any.
    pub fn edge(&self, from: VertexId, to: VertexId) -> Option<EdgeId> {
        self.pair_index.get(&(from, to)).copied()
    }

    /// Weight of the first live edge `from -> to`.
    pub fn edge_weight(&self, from: VertexId, to: VertexId) -> Option<f64> {
        self.edge(from, to).map(|e| self.edge_weights[e])
    }

    /// Label of the first live edge `from -> to`.
    pub fn edge_label(&self, from: VertexId, to: VertexId) -> Option<&str> {
        self.edge(from, to).map(|e| self.edge_labels[e].as_str())
    }

    /// Live out-edges of `u` as `(target, weight)` pairs, parallel edges included.
    ///
    /// Parallel edges report the weight of the first edge between the same pair, so
    /// every search agrees with `edge_weight`.
    pub fn neighbors(&self, u: VertexId) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        self.outgoing[u].iter().map(move |&e| {
            let to = self.edge_targets[e];
            (to, self.pair_weight(u, to, e))
        })
    }

    /// Live in-edges of `v` as `(source, weight)` pairs.
    pub fn in_neighbors(&self, v: VertexId) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        self.incoming[v].iter().map(move |&e| {
            let from = self.edge_sources[e];
            (from, self.pair_weight(from, v, e))
        })
    }

    fn pair_weight(&self, from: VertexId, to: VertexId, fallback: EdgeId) -> f64 {
        let e = self.pair_index.get(&(from, to)).copied().unwrap_or(fallback);
        self.edge_weights[e]
    }

    pub fn out_degree(&self, u: VertexId) -> usize {
        self.outgoing[u].len()
    }

    /// Weights of all live edges, in insertion order.
    pub fn edge_weights(&self) -> Vec<f64> {
        self.edge_weights
            .iter()
            .zip(&self.edge_alive)
            .filter(|(_, alive)| **alive)
            .map(|(w, _)| *w)
            .collect()
    }

    pub fn check_vertex(&self, v: VertexId) -> Result<(), Error> {
        if v < self.names.len() {
            Ok(())
        } else {
            Err(Error::NodeIndexOutOfBounds(v))
        }
    }
}

/// Removed vertices and vertex pairs layered over an unmodified [`Graph`].
///
/// Searching `graph` under an `Exclusions` set gives the same answer as searching a
/// copy of `graph` after `clear_vertex` on every excluded vertex and `remove_edge` on
/// every excluded pair, without copying any edge data.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    vertices: HashSet<VertexId>,
    pairs: HashSet<(VertexId, VertexId)>,
}

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_vertex(&mut self, v: VertexId) {
        self.vertices.insert(v);
    }

    pub fn exclude_pair(&mut self, from: VertexId, to: VertexId) {
        self.pairs.insert((from, to));
    }

    pub fn allows_vertex(&self, v: VertexId) -> bool {
        !self.vertices.contains(&v)
    }

    /// Whether `from -> to` survives: neither endpoint excluded and the pair not removed.
    pub fn allows_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.allows_vertex(from) && self.allows_vertex(to) && !self.pairs.contains(&(from, to))
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.pairs.is_empty()
    }
}
