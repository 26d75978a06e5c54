pub mod edge_weights;
pub mod graph;
pub mod mixture;
pub mod path;
pub mod ranker;
pub mod sampler;
pub mod scope;
pub mod solver;
pub mod traits;

pub use graph::{Exclusions, Graph, VertexId};
pub use path::Path;
pub use ranker::{CategoryRanking, PathRanker, RankOptions, RankOutcome, rank, rank_categories};
pub use sampler::{MetropolisSampler, NullScoreTable, RandomEdgeSampler};
pub use scope::{ScopeOptions, ScopeResult, scope, scope_or_sample};
pub use solver::DijkstraSolver;
pub use traits::{NullSampler, ShortestPathSolver};
