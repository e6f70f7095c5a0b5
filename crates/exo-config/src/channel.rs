//! Channel/input declaration files.
//!
//! On disk, inputs and channels are lists of records carrying a `name`, and
//! channel colors are lists of components:
//!
//! ```yaml
//! luminosity: 4683.0
//! input:
//!   - {name: ttbar_powheg, xsection: 157.5, events: 16330000, enable: true}
//! channel:
//!   - {name: ttbar, color: [2], inputs: [ttbar_powheg], legend: "QCD t#bar{t}", fill: true}
//! order: [ttbar]
//! ```
//!
//! Loading normalizes the lists into name-keyed maps and sums colors into a
//! single index. The normalized form serializes back with [`to_yaml`] and
//! loads again with [`parse_normalized`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::yaml;

/// A physical sample contributing histograms to channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Cross-section in pb.
    #[serde(default)]
    pub xsection: Option<f64>,
    /// Number of generated events.
    #[serde(default)]
    pub events: Option<f64>,
    /// Whether the input is loaded at all.
    #[serde(default = "enabled")]
    pub enable: bool,
}

fn enabled() -> bool {
    true
}

impl Input {
    /// Weight `xsection * luminosity / events`, when both values are present
    /// and non-zero.
    pub fn normalization(&self, luminosity: f64) -> Option<f64> {
        match (self.xsection, self.events) {
            (Some(x), Some(n)) if x != 0.0 && n != 0.0 => Some(x * luminosity / n),
            _ => None,
        }
    }
}

/// A logical sample group built from one or more inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Input names, in load order.
    pub inputs: Vec<String>,
    /// Color index (components summed).
    pub color: i32,
    /// Legend text.
    #[serde(default)]
    pub legend: String,
    /// Draw filled.
    #[serde(default)]
    pub fill: bool,
    /// Line style, if not solid.
    #[serde(default)]
    pub line: Option<i32>,
}

/// A normalized channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Integrated luminosity in pb⁻¹.
    pub luminosity: f64,
    /// Inputs by name.
    pub input: BTreeMap<String, Input>,
    /// Channels by name.
    pub channel: BTreeMap<String, Channel>,
    /// Legend order; every entry names a declared channel.
    #[serde(default)]
    pub order: Vec<String>,
    /// Abbreviation token → regular expression, replacing the built-in table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expand: BTreeMap<String, String>,
}

impl ChannelConfig {
    /// Whether `name` is declared and has at least one enabled input.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.channel.get(name).is_some_and(|c| {
            c.inputs.iter().any(|i| self.input.get(i).is_some_and(|input| input.enable))
        })
    }

    /// `order` first, then the remaining names of `channels` sorted.
    pub fn ordered<'a, I>(&'a self, channels: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut rest: BTreeSet<&str> = channels.into_iter().collect();
        let mut out = Vec::with_capacity(rest.len());
        for name in &self.order {
            if rest.remove(name.as_str()) {
                out.push(name.as_str());
            }
        }
        out.extend(rest);
        out
    }

    fn validate(&self) -> Result<()> {
        let undefined: Vec<String> =
            self.order.iter().filter(|c| !self.channel.contains_key(*c)).cloned().collect();
        if !undefined.is_empty() {
            return Err(ConfigError::UndefinedOrder(undefined));
        }
        for (name, channel) in &self.channel {
            if let Some(input) = channel.inputs.iter().find(|i| !self.input.contains_key(*i)) {
                return Err(ConfigError::UndefinedInput {
                    channel: name.clone(),
                    input: input.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawConfig {
    luminosity: f64,
    #[serde(default)]
    input: Vec<RawInput>,
    #[serde(default)]
    channel: Vec<RawChannel>,
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    expand: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawInput {
    name: String,
    #[serde(flatten)]
    input: Input,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Color {
    Index(i32),
    Components(Vec<i32>),
}

#[derive(Deserialize)]
struct RawChannel {
    name: String,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    legend: String,
    #[serde(default)]
    fill: bool,
    #[serde(default)]
    line: Option<i32>,
}

/// Load and normalize a channel declaration file.
pub fn load(path: impl AsRef<Path>) -> Result<ChannelConfig> {
    let path = path.as_ref();
    let text = yaml::read_file(path)?;
    parse_as(&text, &yaml::origin(path))
}

/// Parse and normalize a channel declaration document.
pub fn parse(text: &str) -> Result<ChannelConfig> {
    parse_as(text, yaml::MEMORY)
}

fn parse_as(text: &str, origin: &str) -> Result<ChannelConfig> {
    let raw: RawConfig = yaml::parse(text, origin)?;

    let mut input = BTreeMap::new();
    for RawInput { name, input: value } in raw.input {
        if input.insert(name.clone(), value).is_some() {
            return Err(ConfigError::DuplicateName { kind: "input", name });
        }
    }

    let mut channel = BTreeMap::new();
    for c in raw.channel {
        let color = match c.color {
            Some(Color::Index(i)) => i,
            Some(Color::Components(parts)) => parts.iter().sum(),
            None => {
                return Err(ConfigError::MissingField {
                    kind: "channel",
                    name: c.name,
                    field: "color",
                });
            }
        };
        let value =
            Channel { inputs: c.inputs, color, legend: c.legend, fill: c.fill, line: c.line };
        if channel.insert(c.name.clone(), value).is_some() {
            return Err(ConfigError::DuplicateName { kind: "channel", name: c.name });
        }
    }

    let config = ChannelConfig {
        luminosity: raw.luminosity,
        input,
        channel,
        order: raw.order,
        expand: raw.expand,
    };
    config.validate()?;
    tracing::debug!(
        origin,
        inputs = config.input.len(),
        channels = config.channel.len(),
        "loaded channel config"
    );
    Ok(config)
}

/// Serialize a normalized config (name-keyed maps, integer colors).
pub fn to_yaml(config: &ChannelConfig) -> Result<String> {
    serde_yaml_ng::to_string(config)
        .map_err(|source| ConfigError::Yaml { origin: yaml::MEMORY.to_string(), source })
}

/// Parse a document produced by [`to_yaml`], re-checking its invariants.
pub fn parse_normalized(text: &str) -> Result<ChannelConfig> {
    let config: ChannelConfig = yaml::parse(text, yaml::MEMORY)?;
    config.validate()?;
    Ok(config)
}

/// Load a file produced by [`to_yaml`].
pub fn load_normalized(path: impl AsRef<Path>) -> Result<ChannelConfig> {
    let path = path.as_ref();
    let text = yaml::read_file(path)?;
    let config: ChannelConfig = yaml::parse(&text, &yaml::origin(path))?;
    config.validate()?;
    Ok(config)
}
