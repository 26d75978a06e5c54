use serde::Serialize;

/// Type alias for a single labelled edge: (from, to, label).
///
/// Indices are 0-based positions into the vertex name list.
pub type Edge = (usize, usize, String);

/// A path retained by the k-shortest-path ranker, expressed with vertex and edge names.
///
/// Fields:
/// - `genes`: interior vertex names, the `"s"`/`"t"` endpoints stripped.
/// - `compounds`: labels of the edges between consecutive genes (`genes.len() - 1` entries).
/// - `weights`: weights of those same edges.
/// - `distance`: total path score, endpoint edges included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPath {
    pub genes: Vec<String>,
    pub compounds: Vec<String>,
    pub weights: Vec<f64>,
    pub distance: f64,
}

impl RankedPath {
    /// Number of edges between genes.
    pub fn hops(&self) -> usize {
        self.compounds.len()
    }
}

/// A significant path found by the neighbourhood search, from the source to one target.
///
/// `genes` excludes the source and ends with the target. `distance` includes the
/// first edge leaving the source even though `weights` does not list it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantPath {
    pub target: String,
    pub genes: Vec<String>,
    pub compounds: Vec<String>,
    pub weights: Vec<f64>,
    pub distance: f64,
    pub p_value: f64,
}
