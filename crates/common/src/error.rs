use thiserror::Error;

/// Failures of the numerical core.
///
/// Only structural and input problems are reported through this type. Exhausted
/// candidate pools, missed significance thresholds, collapsed mixture components
/// and non-convergence are part of the regular results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A named vertex (usually the `"s"` source or `"t"` sink sentinel) is absent.
    #[error("Vertex '{0}' not found in graph.")]
    VertexNotFound(String),

    /// Indicates an attempt to access a node index that exceeds the graph size (N).
    #[error("Node index {0} is out of bounds.")]
    NodeIndexOutOfBounds(usize),

    #[error("Edge list is empty.")]
    EmptyEdgeList,

    /// Parallel inputs disagree in length, or values fall outside their domain.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No walk of the requested length could be built within the attempt budget.
    #[error("Could not sample a loop-free walk of length {length} after {attempts} attempts.")]
    SamplingExhausted { length: usize, attempts: usize },

    #[error("Null score table holds no samples.")]
    EmptyNullTable,

    #[error("Matrix is singular and cannot be inverted.")]
    SingularMatrix,

    /// The mixture input cannot separate the requested number of components.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
}
