//! Error types for the midimaker-core crate.

use thiserror::Error;

/// Errors that can occur while resolving or rendering a composition.
///
/// Most of these are recovered from during score resolution: the offending
/// directive is logged and skipped. They surface as hard errors only from
/// the lookup functions themselves and from file I/O.
#[derive(Error, Debug)]
pub enum Error {
    /// A chord symbol could not be parsed or has an unknown quality.
    #[error("Unknown chord: {0}")]
    UnknownChord(String),

    /// A note name is not one of C..B with an optional `#` or `b`.
    #[error("Unknown note: {0}")]
    UnknownNote(String),

    /// A command referenced a voice that was never declared.
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    /// A command referenced a rhythm that was never defined.
    #[error("Unknown rhythm: {0}")]
    UnknownRhythm(String),

    /// A play command referenced a tune that was never defined.
    #[error("Unknown tune: {0}")]
    UnknownTune(String),

    /// No composition or opus with this name exists.
    #[error("Unknown composition: {0}")]
    UnknownComposition(String),

    /// A duration expression could not be evaluated.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A parameter is outside its permitted range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
