//! Application config (`~/.exo/template.yaml`).
//!
//! ```yaml
//! core:
//!   verbose: false
//!   batch: true
//! template:
//!   channel: ~/.exo/channel.yaml
//!   plot: ~/.exo/plot.yaml
//! ```
//!
//! Command-line options take precedence over every value here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::yaml;

/// Default location of the application config.
pub const DEFAULT_APP_CONFIG: &str = "~/.exo/template.yaml";

/// `core:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSection {
    /// Print progress and warnings.
    pub verbose: bool,
    /// Do not display anything interactively.
    pub batch: bool,
}

/// `template:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSection {
    /// Channel config path.
    pub channel: Option<String>,
    /// Plot config path.
    pub plot: Option<String>,
}

/// Parsed application config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General switches.
    pub core: CoreSection,
    /// Template config locations.
    pub template: TemplateSection,
}

impl AppConfig {
    /// Channel config path, `~` expanded.
    pub fn channel_path(&self) -> Option<PathBuf> {
        self.template.channel.as_deref().map(expand_home)
    }

    /// Plot config path, `~` expanded.
    pub fn plot_path(&self) -> Option<PathBuf> {
        self.template.plot.as_deref().map(expand_home)
    }
}

/// Load an application config.
pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let text = yaml::read_file(path)?;
    yaml::parse(&text, &yaml::origin(path))
}

/// Load an application config, or defaults when the file does not exist.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<AppConfig> {
    match load(path.as_ref()) {
        Err(ConfigError::Missing(p)) => {
            tracing::debug!(path = %p.display(), "no application config, using defaults");
            Ok(AppConfig::default())
        }
        other => other,
    }
}

/// Replace a leading `~` with `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_default_when_absent() {
        let cfg: AppConfig = yaml::parse("core: {verbose: true}\n", yaml::MEMORY).unwrap();
        assert!(cfg.core.verbose);
        assert!(!cfg.core.batch);
        assert_eq!(cfg.template, TemplateSection::default());
    }

    #[test]
    fn home_is_expanded() {
        let Some(home) = std::env::var_os("HOME") else { return };
        assert_eq!(expand_home("~/.exo/plot.yaml"), PathBuf::from(home).join(".exo/plot.yaml"));
        assert_eq!(expand_home("/abs/path.yaml"), PathBuf::from("/abs/path.yaml"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn missing_default_file_falls_back() {
        let cfg = load_or_default("/no/such/dir/template.yaml").unwrap();
        assert_eq!(cfg, AppConfig::default());
    }
}
