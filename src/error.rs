use std::path::PathBuf;
use thiserror::Error;

use crate::types::{Source, ValueType};

#[derive(Debug, Error)]
pub enum SetfigError {
    #[error("Setting name must not be empty")]
    EmptyName,

    #[error("Setting '{0}' is already registered")]
    DuplicateName(String),

    #[error("Short flag '{short}' is already bound to '{bound_to}'")]
    DuplicateShort { short: String, bound_to: String },

    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    #[error("Setting '{0}' is a core setting and cannot be changed")]
    Immutable(String),

    #[error("Setting '{0}' is not a flag and cannot be overridden")]
    NotOverridable(String),

    #[error("Cannot update '{name}' from {origin}: flags have already been parsed")]
    LockedAfterFlags { name: String, origin: Source },

    #[error("Setting '{name}' may not be updated from {origin}")]
    SourceNotPermitted { name: String, origin: Source },

    #[error("Setting '{name}' is {is}, not {want}")]
    TypeMismatch {
        name: String,
        is: ValueType,
        want: ValueType,
    },

    #[error("Cannot convert '{text}' to {target} for setting '{name}'")]
    ConversionError {
        name: String,
        text: String,
        target: ValueType,
    },

    #[error("Unsupported config file format for '{path}': {reason}")]
    UnsupportedFormat { path: String, reason: FormatReason },

    #[error("Config file not found: {0}")]
    MissingConfFile(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse flags: {0}")]
    FlagParseError(String),

    #[error("Failed to decode {path}: {message}")]
    DecoderError { path: PathBuf, message: String },
}

/// Why a config file name did not map to a known format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatReason {
    EmptyName,
    NoExtension,
    UnknownExtension(String),
}

impl std::fmt::Display for FormatReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatReason::EmptyName => write!(f, "no file name given"),
            FormatReason::NoExtension => write!(f, "file name has no extension"),
            FormatReason::UnknownExtension(ext) => write!(f, "unknown extension '{ext}'"),
        }
    }
}
