//! Parameter error types.

/// Errors raised while parsing or validating noise parameters.
///
/// These are configuration-time failures: a sampler is only ever built from
/// parameters that already passed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// A named option (distance function, border mode, ...) was not recognized.
    #[error("unknown {kind} `{value}` (expected one of: {expected})")]
    UnknownVariant {
        /// Which option was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Comma-separated list of accepted names.
        expected: &'static str,
    },

    /// A numeric parameter is outside its valid range.
    #[error("invalid {name}: {reason}")]
    OutOfRange {
        /// Parameter name as it appears in the config file.
        name: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },
}

impl ParamError {
    /// Shorthand for [`ParamError::OutOfRange`].
    pub fn out_of_range(name: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            name,
            reason: reason.into(),
        }
    }
}
