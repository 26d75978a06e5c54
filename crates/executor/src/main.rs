pub mod config;
pub mod csv_reader;
pub mod error;
pub mod health;
pub mod runner;
pub mod types;
pub mod writer;

use log::error;
use std::env;
use std::process::ExitCode;

use health::HealthRegistry;
use types::Invocation;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match Invocation::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match config::load_config(invocation.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut health = HealthRegistry::new();
    match runner::run(&invocation.command, &config, &mut health) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("'{}' failed: {}", invocation.command.name(), e);
            ExitCode::FAILURE
        }
    }
}
