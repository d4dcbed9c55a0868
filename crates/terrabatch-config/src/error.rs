//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading flow settings or parsing property
/// values.
///
/// Binder failures are deliberately absent: per-key binding problems are
/// recovered locally and logged, never surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a settings file.
    #[error("failed to read settings file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `key=value` map token without a `=` separator.
    #[error("malformed map pair '{token}'")]
    MalformedPair { token: String },
}
