use ndarray::{Array1, Array2};
use std::path::PathBuf;

use super::error::Error;

pub const USAGE: &str = "\
Usage: netpath [--config FILE] <command> ...
  rank <vertices.csv> <edges.csv> <out.csv>              k shortest source-sink paths per category
  sample <vertices.csv> <edges.csv> <out.csv>            null path-score table
  scope <vertices.csv> <edges.csv> <out.csv> [null.csv]  significant paths into the sink
  cluster <matrix.csv> <out.csv>                         Bernoulli mixture of paths
  classify <matrix.csv> <out.csv>                        mixture of logistic experts (needs a label column)";

/// One executor job, parsed from the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Rank {
        vertices: PathBuf,
        edges: PathBuf,
        out: PathBuf,
    },
    Sample {
        vertices: PathBuf,
        edges: PathBuf,
        out: PathBuf,
    },
    Scope {
        vertices: PathBuf,
        edges: PathBuf,
        out: PathBuf,
        null: Option<PathBuf>,
    },
    Cluster {
        matrix: PathBuf,
        out: PathBuf,
    },
    Classify {
        matrix: PathBuf,
        out: PathBuf,
    },
}

/// Parsed command line: an optional configuration file and the job.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub command: Command,
}

impl Command {
    /// Routine name used for logging and health tracking.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Rank { .. } => "rank",
            Command::Sample { .. } => "sample",
            Command::Scope { .. } => "scope",
            Command::Cluster { .. } => "cluster",
            Command::Classify { .. } => "classify",
        }
    }
}

impl Invocation {
    /// Parses the arguments that follow the program name.
    pub fn parse(args: &[String]) -> Result<Self, Error> {
        let mut args = args;
        let mut config = None;
        if args.first().map(String::as_str) == Some("--config") {
            let path = args
                .get(1)
                .ok_or_else(|| Error::Usage(format!("--config needs a file\n{}", USAGE)))?;
            config = Some(PathBuf::from(path));
            args = &args[2..];
        }

        let (name, rest) = args
            .split_first()
            .ok_or_else(|| Error::Usage(USAGE.to_string()))?;
        let paths: Vec<PathBuf> = rest.iter().map(PathBuf::from).collect();

        let command = match (name.to_lowercase().as_str(), paths.as_slice()) {
            ("rank", [vertices, edges, out]) => Command::Rank {
                vertices: vertices.clone(),
                edges: edges.clone(),
                out: out.clone(),
            },
            ("sample", [vertices, edges, out]) => Command::Sample {
                vertices: vertices.clone(),
                edges: edges.clone(),
                out: out.clone(),
            },
            ("scope", [vertices, edges, out]) => Command::Scope {
                vertices: vertices.clone(),
                edges: edges.clone(),
                out: out.clone(),
                null: None,
            },
            ("scope", [vertices, edges, out, null]) => Command::Scope {
                vertices: vertices.clone(),
                edges: edges.clone(),
                out: out.clone(),
                null: Some(null.clone()),
            },
            ("cluster", [matrix, out]) => Command::Cluster {
                matrix: matrix.clone(),
                out: out.clone(),
            },
            ("classify", [matrix, out]) => Command::Classify {
                matrix: matrix.clone(),
                out: out.clone(),
            },
            _ => return Err(Error::Usage(USAGE.to_string())),
        };

        Ok(Invocation { config, command })
    }
}

/// Binary path matrix read from CSV: one row per path, one column per feature, and
/// the class labels when the file carries a `label` column.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatrix {
    pub features: Vec<String>,
    pub x: Array2<f64>,
    pub labels: Option<Array1<f64>>,
}
