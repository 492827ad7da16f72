//! Result and Error types for the crate.
use miette::Diagnostic;
use thiserror::Error;

/// Result containing an error variant from this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Ball localizer error variants.
///
/// Tracking itself never fails, these only come from loading and checking configuration.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// IO error, this wraps a [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Deserialize error, this wraps a [`toml::de::Error`]
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// A configuration value is outside of its valid range.
    #[error("invalid value for `{field}`: {reason}")]
    #[diagnostic(help("check the ball localizer configuration file and its overlay"))]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}
