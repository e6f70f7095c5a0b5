//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading or resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("yaml config file does not exist: {}", .0.display())]
    Missing(PathBuf),

    /// The config file exists but could not be read.
    #[error("failed to read yaml config {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML or does not match the expected shape.
    #[error("YAML parse error in {origin}: {source}")]
    Yaml {
        /// File name, or `<memory>` for parsed strings.
        origin: String,
        /// Underlying error.
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The document parsed to nothing.
    #[error("failed to read yaml config (no data): {0}")]
    Empty(String),

    /// A record lacks a required field.
    #[error("missing {field} in {kind}: {name}")]
    MissingField {
        /// Record kind, e.g. `channel`.
        kind: &'static str,
        /// Record name.
        name: String,
        /// Missing field.
        field: &'static str,
    },

    /// A field has an unusable value.
    #[error("invalid {field} in {kind} '{name}': {reason}")]
    InvalidField {
        /// Record kind.
        kind: &'static str,
        /// Record name.
        name: String,
        /// Offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `order` names channels that are not declared.
    #[error("channels order has undefined channels: {}", .0.join(","))]
    UndefinedOrder(Vec<String>),

    /// A channel lists an input that is not declared.
    #[error("channel '{channel}' uses undefined input '{input}'")]
    UndefinedInput {
        /// Channel name.
        channel: String,
        /// Undeclared input name.
        input: String,
    },

    /// Two records of the same kind share a name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Record kind.
        kind: &'static str,
        /// Repeated name.
        name: String,
    },

    /// An abbreviation or plot pattern does not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        /// Pattern text after translation.
        pattern: String,
        /// Underlying error.
        #[source]
        source: regex::Error,
    },

    /// A channel selection resolved to nothing.
    #[error("no channels selected by '{0}'")]
    NoChannels(String),
}

/// Result alias for `exo-config`.
pub type Result<T> = std::result::Result<T, ConfigError>;
