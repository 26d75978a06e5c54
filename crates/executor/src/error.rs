use thiserror::Error;

use netpath_common::error::Error as NetpathError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Path analysis error: {0}")]
    Core(#[from] NetpathError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(String),

    /// The routine panicked earlier in this process and will not run again.
    #[error("Routine '{0}' is disabled after an earlier panic.")]
    RoutineDisabled(String),

    #[error("Routine '{0}' panicked: {1}")]
    RoutinePanicked(String, String),

    #[error("{0}")]
    Usage(String),
}
