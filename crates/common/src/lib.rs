pub mod error;
pub mod numeric_kernel;
pub mod types;

pub use error::Error;
