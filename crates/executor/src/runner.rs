use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::Path;

use super::config::{Config, SamplerStrategy};
use super::csv_reader::{read_graph, read_graphs, read_matrix, read_null_table};
use super::error::Error;
use super::health::HealthRegistry;
use super::types::Command;
use super::writer::{write_classification, write_mixture, write_null_table, write_ranking, write_scope};
use netpath_common::error::Error as NetpathError;
use netpath_core::mixture::{MixtureInit, hme3m, path_mix};
use netpath_core::ranker::rank_categories;
use netpath_core::scope::scope_or_sample;
use netpath_core::traits::NullSampler;

/// Predicted probability from which a path is assigned class 1.
pub const CLASS_THRESHOLD: f64 = 0.5;

/// Runs one command under the health registry.
pub fn run(command: &Command, config: &Config, health: &mut HealthRegistry) -> Result<(), Error> {
    info!("Running '{}'", command.name());
    health.run(command.name(), || match command {
        Command::Rank {
            vertices,
            edges,
            out,
        } => rank_job(vertices, edges, out, config),
        Command::Sample {
            vertices,
            edges,
            out,
        } => sample_job(vertices, edges, out, config),
        Command::Scope {
            vertices,
            edges,
            out,
            null,
        } => scope_job(vertices, edges, out, null.as_deref(), config),
        Command::Cluster { matrix, out } => cluster_job(matrix, out, config),
        Command::Classify { matrix, out } => classify_job(matrix, out, config),
    })
}

fn rank_job(vertices: &Path, edges: &Path, out: &Path, config: &Config) -> Result<(), Error> {
    let graphs = read_graphs(vertices, edges)?;
    let ranking = rank_categories(&graphs, &config.ranker.options());

    if ranking.by_label.is_empty() {
        if let Some(e) = ranking.failures.values().next() {
            return Err(Error::Core(e.clone()));
        }
    }
    write_ranking(out, &ranking)?;
    Ok(())
}

fn sample_job(vertices: &Path, edges: &Path, out: &Path, config: &Config) -> Result<(), Error> {
    let graph = read_graph(vertices, edges)?;
    let mut rng = SmallRng::seed_from_u64(config.sampler.seed);
    let table = match config.sampler.strategy {
        SamplerStrategy::Metropolis => config.sampler.metropolis().sample(&graph, &mut rng)?,
        SamplerStrategy::RandomEdges => config.sampler.random_edges().sample(&graph, &mut rng)?,
    };
    write_null_table(out, &table)
}

fn scope_job(
    vertices: &Path,
    edges: &Path,
    out: &Path,
    null: Option<&Path>,
    config: &Config,
) -> Result<(), Error> {
    let graph = read_graph(vertices, edges)?;
    let table = null.map(read_null_table).transpose()?;
    if table.is_none() {
        info!("No null table given; sampling random edge sums");
    }

    let mut rng = SmallRng::seed_from_u64(config.sampler.seed);
    let result = scope_or_sample(&graph, table.as_ref(), &config.scope.options(), &mut rng)?;
    info!("Scope: {:?}", result.scope);
    write_scope(out, &result.paths)
}

fn cluster_job(matrix: &Path, out: &Path, config: &Config) -> Result<(), Error> {
    let matrix = read_matrix(matrix)?;
    let mut rng = SmallRng::seed_from_u64(config.mixture.seed);
    let fit = path_mix(
        matrix.x.view(),
        &config.mixture.options(),
        MixtureInit::Random,
        &mut rng,
    )?;

    info!(
        "Mixture of {} component(s) over {} feature(s): proportions {:?}, converged: {}",
        fit.proportions.len(),
        matrix.features.len(),
        fit.proportions.to_vec(),
        fit.converged
    );
    if !fit.degenerate_components.is_empty() {
        warn!("Components without members: {:?}", fit.degenerate_components);
    }
    write_mixture(out, &fit)
}

fn classify_job(matrix: &Path, out: &Path, config: &Config) -> Result<(), Error> {
    let matrix = read_matrix(matrix)?;
    let labels = matrix.labels.as_ref().ok_or_else(|| {
        Error::Core(NetpathError::MalformedInput(
            "classification needs a 'label' column".to_string(),
        ))
    })?;

    let mut rng = SmallRng::seed_from_u64(config.mixture.seed);
    let fit = hme3m(
        matrix.x.view(),
        labels.view(),
        &config.mixture.options(),
        &config.mixture.irls_options(),
        MixtureInit::Random,
        &mut rng,
    )?;

    if !fit.singular_components.is_empty() {
        warn!(
            "Logistic fits of components {:?} hit a singular system",
            fit.singular_components
        );
    }
    write_classification(out, &fit, CLASS_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LikelihoodConfig, MixtureConfig, RankerConfig, SamplerConfig, ScopeConfig};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn test_config() -> Config {
        Config {
            ranker: RankerConfig {
                k: 3,
                min_path_size: 0,
                trivial_hop_factor: None,
            },
            sampler: SamplerConfig {
                strategy: SamplerStrategy::RandomEdges,
                max_length: 3,
                samples: 200,
                warmup_steps: 5,
                max_attempts: 100,
                seed: 42,
            },
            scope: ScopeConfig {
                alpha: 0.05,
                early_exit: None,
            },
            mixture: MixtureConfig {
                components: 2,
                max_iterations: 50,
                seed: 3,
                likelihood: LikelihoodConfig::Bernoulli,
                lambda: 1.0,
                learning_rate: 1.0,
                plr_iterations: 20,
                boundary_features: Vec::new(),
            },
        }
    }

    fn temp_csv(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(content.as_bytes())
            .expect("Failed to write mock content");
        temp_file
    }

    const DIAMOND_VERTICES: &str = "name\ns\na\nb\nt\n";
    const DIAMOND_EDGES: &str = "from,to,label,weight\n0,1,c1,1.0\n1,3,c2,1.0\n0,2,c3,2.0\n2,3,c4,2.0\n";

    #[test]
    fn test_rank_command_writes_paths() {
        let vertices = temp_csv(DIAMOND_VERTICES);
        let edges = temp_csv(DIAMOND_EDGES);
        let dir = TempDir::new().expect("Failed to create temp dir");
        let out = dir.path().join("ranked.csv");

        let command = Command::Rank {
            vertices: vertices.path().to_path_buf(),
            edges: edges.path().to_path_buf(),
            out: out.clone(),
        };
        run(&command, &test_config(), &mut HealthRegistry::new()).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            written,
            "category,rank,genes,compounds,weights,distance\nall,0,a,,,2.0\nall,1,b,,,4.0\n"
        );
    }

    #[test]
    fn test_sample_then_scope_with_table() {
        let vertices = temp_csv(DIAMOND_VERTICES);
        let edges = temp_csv(DIAMOND_EDGES);
        let dir = TempDir::new().expect("Failed to create temp dir");
        let null = dir.path().join("null.csv");
        let out = dir.path().join("scope.csv");
        let config = test_config();
        let mut health = HealthRegistry::new();

        let sample = Command::Sample {
            vertices: vertices.path().to_path_buf(),
            edges: edges.path().to_path_buf(),
            out: null.clone(),
        };
        run(&sample, &config, &mut health).unwrap();
        let table = read_null_table(&null).unwrap();
        assert_eq!(table.max_length(), 3);
        assert_eq!(table.samples(), 200);

        let scope = Command::Scope {
            vertices: vertices.path().to_path_buf(),
            edges: edges.path().to_path_buf(),
            out: out.clone(),
            null: Some(null),
        };
        run(&scope, &config, &mut health).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("target,genes,compounds,weights,distance,p_value"));
    }

    #[test]
    fn test_cluster_and_classify_commands() {
        let matrix = temp_csv(
            "g1,g2,g3,label\n1,1,0,1\n1,1,0,1\n1,1,0,1\n0,0,1,0\n0,0,1,0\n0,0,1,0\n",
        );
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config();
        let mut health = HealthRegistry::new();

        let clusters = dir.path().join("clusters.csv");
        let cluster = Command::Cluster {
            matrix: matrix.path().to_path_buf(),
            out: clusters.clone(),
        };
        run(&cluster, &config, &mut health).unwrap();
        let written = std::fs::read_to_string(&clusters).unwrap();
        assert_eq!(written.lines().count(), 7);
        assert!(written.starts_with("row,component,tied,h_0,h_1\n"));

        let predictions = dir.path().join("predictions.csv");
        let classify = Command::Classify {
            matrix: matrix.path().to_path_buf(),
            out: predictions.clone(),
        };
        run(&classify, &config, &mut health).unwrap();
        let written = std::fs::read_to_string(&predictions).unwrap();
        assert_eq!(written.lines().count(), 7);
        assert!(written.starts_with("row,component,prediction,class\n"));
    }

    #[test]
    fn test_classify_requires_labels() {
        let matrix = temp_csv("g1,g2\n1,0\n0,1\n");
        let dir = TempDir::new().expect("Failed to create temp dir");
        let command = Command::Classify {
            matrix: matrix.path().to_path_buf(),
            out: dir.path().join("out.csv"),
        };
        let result = run(&command, &test_config(), &mut HealthRegistry::new());
        assert!(matches!(
            result,
            Err(Error::Core(NetpathError::MalformedInput(_)))
        ));
    }

    #[test]
    fn test_missing_sink_fails_every_category() {
        let vertices = temp_csv("name\ns\na\n");
        let edges = temp_csv("from,to,label,weight\n0,1,x,1.0\n");
        let dir = TempDir::new().expect("Failed to create temp dir");
        let command = Command::Rank {
            vertices: vertices.path().to_path_buf(),
            edges: edges.path().to_path_buf(),
            out: dir.path().join("out.csv"),
        };
        let result = run(&command, &test_config(), &mut HealthRegistry::new());
        assert!(matches!(
            result,
            Err(Error::Core(NetpathError::VertexNotFound(_)))
        ));
    }
}
