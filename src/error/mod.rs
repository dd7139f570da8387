//! Error handling module for probe-report

use thiserror::Error;

/// Main error type for report generation
#[derive(Error, Debug)]
pub enum ReportError {
    /// Output format name not registered
    #[error("Unknown output format with name '{name}'")]
    UnknownFormat { name: String },

    /// A writer option could not be applied
    #[error("Failed to set option '{option}' with value '{value}' for writer '{writer}': {message}")]
    InvalidOption {
        writer: String,
        option: String,
        value: String,
        message: String,
    },

    /// XSD-strict XML requested together with an incompatible presentation option
    #[error(
        "XSD-compliant output selected but option '{option}' was selected, XML output may be \
         non-compliant. You need to disable such option with '-no{option}'"
    )]
    XsdIncompatible { option: String },

    /// Section name in a show_entries expression matched nothing
    #[error("No match for section '{name}'")]
    UnknownSection { name: String },

    /// Malformed show_entries expression
    #[error("Invalid show_entries expression '{expr}': {message}")]
    InvalidShowEntries { expr: String, message: String },

    /// Digest algorithm not provided by the digest provider
    #[error("Unknown hash algorithm '{name}', known algorithms: {known}")]
    UnknownDigest { name: String, known: String },

    /// Replacement string for invalid UTF-8 is itself invalid
    #[error("Invalid UTF8 sequence found in string validation replacement '{replacement}'")]
    InvalidReplacement { replacement: String },

    /// String field failed UTF-8 validation under the fail policy
    #[error("Invalid UTF-8 sequence found in value of key '{key}' in section '{section}'")]
    InvalidString { section: String, key: String },

    /// Configuration file problem
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Media snapshot could not be loaded
    #[error("Failed to load media snapshot: {message}")]
    Snapshot { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Shorthand for an option error raised by a backend during init
    pub fn invalid_option(
        writer: &str,
        option: &str,
        value: &str,
        message: impl Into<String>,
    ) -> Self {
        ReportError::InvalidOption {
            writer: writer.to_string(),
            option: option.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// True for errors detected before any output is produced
    pub fn is_config_error(&self) -> bool {
        !matches!(
            self,
            ReportError::InvalidString { .. } | ReportError::Io(_)
        )
    }
}

/// Result type alias for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;
