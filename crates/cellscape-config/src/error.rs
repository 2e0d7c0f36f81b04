//! Configuration error types.

use cellscape_noise::ParamError;

/// Errors that can occur when loading, saving, parsing or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content, including unknown enum names.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// A section holds out-of-range values.
    #[error("invalid `{section}` config: {source}")]
    Invalid {
        section: &'static str,
        #[source]
        source: ParamError,
    },

    /// A command-line override could not be applied.
    #[error("invalid --{flag}: {source}")]
    InvalidOverride {
        flag: &'static str,
        #[source]
        source: ParamError,
    },
}
