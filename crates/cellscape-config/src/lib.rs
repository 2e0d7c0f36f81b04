//! Configuration for the cellscape terrain pipeline.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Every section defaults independently, so older or partial
//! files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, default_config_dir};
pub use error::ConfigError;
