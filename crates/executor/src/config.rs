use config::{Config as ConfigLoader, Environment, File, Map};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::error::Error;
use netpath_core::mixture::{BernoulliLikelihood, IrlsOptions, MixtureOptions};
use netpath_core::ranker::RankOptions;
use netpath_core::sampler::{MetropolisSampler, RandomEdgeSampler};
use netpath_core::scope::ScopeOptions;

/// Ranking settings. Leaving `trivial_hop_factor` out disables the trivial-hop filter.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RankerConfig {
    pub k: usize,
    pub min_path_size: usize,
    pub trivial_hop_factor: Option<f64>,
}

impl RankerConfig {
    pub fn options(&self) -> RankOptions {
        RankOptions::new(self.k, self.min_path_size).with_trivial_hop_factor(self.trivial_hop_factor)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SamplerStrategy {
    Metropolis,
    RandomEdges,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SamplerConfig {
    pub strategy: SamplerStrategy,
    pub max_length: usize,
    pub samples: usize,
    pub warmup_steps: usize,
    pub max_attempts: usize,
    pub seed: u64,
}

impl SamplerConfig {
    pub fn metropolis(&self) -> MetropolisSampler {
        MetropolisSampler::new(self.max_length, self.samples, self.warmup_steps)
            .with_max_attempts(self.max_attempts)
    }

    pub fn random_edges(&self) -> RandomEdgeSampler {
        RandomEdgeSampler::new(self.max_length, self.samples)
    }
}

/// Significance settings. Leaving `early_exit` out scans every path length.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScopeConfig {
    pub alpha: f64,
    pub early_exit: Option<f64>,
}

impl ScopeConfig {
    pub fn options(&self) -> ScopeOptions {
        ScopeOptions {
            alpha: self.alpha,
            early_exit: self.early_exit,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodConfig {
    PresenceOnly,
    Bernoulli,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MixtureConfig {
    pub components: usize,
    pub max_iterations: usize,
    pub seed: u64,
    pub likelihood: LikelihoodConfig,
    pub lambda: f64,
    pub learning_rate: f64,
    pub plr_iterations: usize,
    #[serde(default)]
    pub boundary_features: Vec<usize>,
}

impl MixtureConfig {
    pub fn options(&self) -> MixtureOptions {
        let likelihood = match self.likelihood {
            LikelihoodConfig::PresenceOnly => BernoulliLikelihood::PresenceOnly,
            LikelihoodConfig::Bernoulli => BernoulliLikelihood::Full,
        };
        MixtureOptions::new(self.components, self.max_iterations)
            .with_likelihood(likelihood)
            .with_boundary_features(self.boundary_features.clone())
    }

    pub fn irls_options(&self) -> IrlsOptions {
        IrlsOptions {
            lambda: self.lambda,
            learning_rate: self.learning_rate,
            max_iterations: self.plr_iterations,
            ..IrlsOptions::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub ranker: RankerConfig,
    pub sampler: SamplerConfig,
    pub scope: ScopeConfig,
    pub mixture: MixtureConfig,
}

/// Path of the configuration file used when none is given on the command line.
pub fn default_config_path() -> Result<PathBuf, Error> {
    let base_path = env::current_dir().map_err(|e| {
        Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
    })?;

    Ok(base_path
        .join("crates")
        .join("executor")
        .join("Config.toml"))
}

/// Builds the run configuration: the TOML file at `path` (or
/// [`default_config_path`]) with `NETPATH_<SECTION>__<KEY>` overrides on top.
///
/// `overrides` replaces the process environment when given. The double underscore
/// separates section from key, so `NETPATH_RANKER__MIN_PATH_SIZE=3` sets
/// `ranker.min_path_size`. A missing file is an error, never an empty config.
fn load_layered(
    path: Option<&Path>,
    overrides: Option<Map<String, String>>,
) -> Result<Config, Error> {
    let file = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    if !file.is_file() {
        return Err(Error::ConfigLoadError(format!(
            "no configuration file at {}",
            file.display()
        )));
    }

    let environment = Environment::with_prefix("NETPATH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(overrides);

    ConfigLoader::builder()
        .add_source(File::from(file.as_path()).required(true))
        .add_source(environment)
        .build()
        .and_then(|loaded| loaded.try_deserialize::<Config>())
        .map_err(|e| Error::ConfigLoadError(format!("{}: {}", file.display(), e)))
}

/// Loads the configuration, reading overrides from the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, Error> {
    load_layered(path, None)
}
