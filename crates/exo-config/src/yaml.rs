//! Shared YAML document reading.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_yaml_ng::Value;

use crate::error::{ConfigError, Result};

/// Origin label for documents parsed from memory.
pub(crate) const MEMORY: &str = "<memory>";

/// Read a config file, distinguishing a missing file from an unreadable one.
pub(crate) fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

/// Parse a document into a raw value, failing on null or empty documents.
pub(crate) fn parse_value(text: &str, origin: &str) -> Result<Value> {
    let value: Value = serde_yaml_ng::from_str(text)
        .map_err(|source| ConfigError::Yaml { origin: origin.to_string(), source })?;
    let empty = match &value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ConfigError::Empty(origin.to_string()));
    }
    Ok(value)
}

/// Parse a non-empty document into `T`.
pub(crate) fn parse<T: DeserializeOwned>(text: &str, origin: &str) -> Result<T> {
    let value = parse_value(text, origin)?;
    from_value(value, origin)
}

pub(crate) fn from_value<T: DeserializeOwned>(value: Value, origin: &str) -> Result<T> {
    serde_yaml_ng::from_value(value)
        .map_err(|source| ConfigError::Yaml { origin: origin.to_string(), source })
}

/// Label for error messages.
pub(crate) fn origin(path: &Path) -> String {
    path.display().to_string()
}
