//! Errors raised while reading `ripple.toml`.

/// Why a `ripple.toml` could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read ripple.toml: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the expected sections.
    #[error("malformed ripple.toml: {0}")]
    ParseError(String),

    /// A setting is out of range or conflicts with another one.
    #[error("bad setting in ripple.toml: {0}")]
    ValidationError(String),
}
