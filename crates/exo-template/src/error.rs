//! Error types for exo-template.

use std::path::PathBuf;

use exo_config::ConfigError;
use exo_root::RootError;
use thiserror::Error;

/// Template pipeline error.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Histogram arithmetic or ROOT decoding error.
    #[error(transparent)]
    Root(#[from] RootError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An input file could not be read.
    #[error("failed to load input file {}: {source}", path.display())]
    InputFile {
        /// File path.
        path: PathBuf,
        /// Underlying reader error.
        source: RootError,
    },

    /// A later input lacks a histogram the first input provided.
    #[error("channel '{channel}': input '{input}' has no histogram '{key}'")]
    MissingHistogram {
        /// Channel being loaded.
        channel: String,
        /// Input that lacks the key.
        input: String,
        /// Histogram path.
        key: String,
    },

    /// Every input of the channel is disabled.
    #[error("channel '{0}' has no enabled inputs")]
    EmptyChannel(String),

    /// The channel is not declared.
    #[error("channel '{0}' is not declared")]
    UnknownChannel(String),

    /// A plot required for the operation was not loaded.
    #[error("plot '{0}' was not loaded")]
    MissingPlot(String),

    /// No signal channel contributes to a plot.
    #[error("no signal is loaded for plot '{0}'")]
    NoSignal(String),

    /// No background channel contributes to a plot.
    #[error("no background is loaded for plot '{0}'")]
    NoBackground(String),

    /// Statistics evaluation failed.
    #[error("statistics error: {0}")]
    Statistics(String),

    /// Artifact serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
