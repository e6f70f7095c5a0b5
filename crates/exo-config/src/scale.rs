//! Per-channel scale factors applied on top of `xsection * luminosity / events`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::channel::ChannelConfig;
use crate::error::Result;
use crate::expand::{AbbreviationTable, ChannelRequest, expand_with};
use crate::yaml;

/// Expanded channel name → factor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleTable {
    factors: BTreeMap<String, f64>,
}

impl ScaleTable {
    /// Factor for `channel`, if one was declared.
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.factors.get(channel).copied()
    }

    /// Number of channels with a factor.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether no factor was declared.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Channels and factors in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.factors.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Load a scale file and expand it against `config`.
pub fn load(path: impl AsRef<Path>, config: &ChannelConfig) -> Result<ScaleTable> {
    let path = path.as_ref();
    let text = yaml::read_file(path)?;
    parse_as(&text, &yaml::origin(path), config)
}

/// Parse a scale document and expand it against `config`.
pub fn parse(text: &str, config: &ChannelConfig) -> Result<ScaleTable> {
    parse_as(text, yaml::MEMORY, config)
}

fn parse_as(text: &str, origin: &str, config: &ChannelConfig) -> Result<ScaleTable> {
    let raw: BTreeMap<String, f64> = yaml::parse(text, origin)?;
    let table = AbbreviationTable::for_config(config)?;

    // abbreviations first so that literal entries override them
    let (abbreviated, literal): (Vec<_>, Vec<_>) = raw
        .iter()
        .partition(|(name, _)| matches!(table.classify(name), ChannelRequest::Abbreviation(_)));

    let mut factors = BTreeMap::new();
    for (name, factor) in abbreviated.into_iter().chain(literal) {
        let requested = BTreeSet::from([name.clone()]);
        for channel in expand_with(&table, config, &requested) {
            factors.insert(channel, *factor);
        }
    }
    tracing::debug!(origin, channels = factors.len(), "loaded channel scales");
    Ok(ScaleTable { factors })
}
