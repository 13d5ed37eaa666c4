//! Configuration error types.

/// Errors produced while loading or validating a policy document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The policy document is not valid TOML.
    #[error("failed to parse policy {path}: {source}")]
    Parse {
        /// Path (or `<embedded defaults>`).
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged document does not match the expected schema.
    #[error("invalid policy schema: {0}")]
    Schema(toml::de::Error),

    /// The merged configuration violates an internal constraint.
    #[error("policy validation failed: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
