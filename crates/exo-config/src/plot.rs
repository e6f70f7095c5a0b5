//! Plot configuration: rebinning, axis titles and visible ranges per histogram.
//!
//! ```yaml
//! plot:
//!   - {name: /mttbar, rebin: 2, title: "M_{t#bar{t}}", units: GeV, range: [0, 3000]}
//!   - {name: /dr_vs_ptrel, xrebin: 1, yrebin: 2, xtitle: "#Delta R", xunits: ~,
//!      ytitle: "p_{T}^{rel}", yunits: GeV}
//! ```
//!
//! Entries with a `rebin` key are 1-D; all others are 2-D.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml_ng::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::yaml;

/// Settings for one axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisSpec {
    /// Merge this many bins when greater than one.
    pub rebin: Option<u32>,
    /// Axis title.
    pub title: Option<String>,
    /// Units appended to the title as `[units]`.
    pub units: Option<String>,
    /// Visible range.
    pub range: Option<(f64, f64)>,
}

impl AxisSpec {
    /// `"{title} [{units}]"`, or `"{title}"` without units.
    pub fn axis_title(&self) -> Option<String> {
        let title = self.title.as_deref().filter(|t| !t.is_empty())?;
        Some(match self.units.as_deref().filter(|u| !u.is_empty()) {
            Some(units) => format!("{title} [{units}]"),
            None => title.to_string(),
        })
    }

    /// Rebin factor when it actually merges bins.
    pub fn effective_rebin(&self) -> Option<usize> {
        self.rebin.filter(|&r| r > 1).map(|r| r as usize)
    }
}

/// Settings for one histogram.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotEntry {
    /// A 1-D histogram.
    OneD(AxisSpec),
    /// A 2-D histogram.
    TwoD {
        /// X axis.
        x: AxisSpec,
        /// Y axis.
        y: AxisSpec,
    },
}

/// Histogram path → settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotConfig {
    plots: BTreeMap<String, PlotEntry>,
}

impl PlotConfig {
    /// Settings for the histogram at `path` (e.g. `/jet1/pt`).
    pub fn get(&self, path: &str) -> Option<&PlotEntry> {
        self.plots.get(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlotEntry)> {
        self.plots.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Deserialize)]
struct RawAxis {
    #[serde(default)]
    rebin: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    range: Option<Vec<f64>>,
}

/// Load a plot configuration file.
pub fn load(path: impl AsRef<Path>) -> Result<PlotConfig> {
    let path = path.as_ref();
    let text = yaml::read_file(path)?;
    parse_as(&text, &yaml::origin(path))
}

/// Parse a plot configuration document.
pub fn parse(text: &str) -> Result<PlotConfig> {
    parse_as(text, yaml::MEMORY)
}

fn parse_as(text: &str, origin: &str) -> Result<PlotConfig> {
    #[derive(Deserialize)]
    struct Raw {
        #[serde(default)]
        plot: Vec<Mapping>,
    }
    let raw: Raw = yaml::parse(text, origin)?;

    let mut plots = BTreeMap::new();
    for mut record in raw.plot {
        let name = match record.remove("name") {
            Some(Value::String(name)) => name,
            _ => {
                return Err(ConfigError::MissingField {
                    kind: "plot",
                    name: format!("#{}", plots.len()),
                    field: "name",
                });
            }
        };
        let entry = if record.contains_key("rebin") {
            PlotEntry::OneD(axis(&name, record, "", origin)?)
        } else {
            PlotEntry::TwoD {
                x: axis(&name, record.clone(), "x", origin)?,
                y: axis(&name, record, "y", origin)?,
            }
        };
        if plots.insert(name.clone(), entry).is_some() {
            return Err(ConfigError::DuplicateName { kind: "plot", name });
        }
    }
    Ok(PlotConfig { plots })
}

/// Read the `{prefix}rebin`, `{prefix}title`, ... keys of one record.
fn axis(name: &str, record: Mapping, prefix: &str, origin: &str) -> Result<AxisSpec> {
    let fields: Mapping = record
        .into_iter()
        .filter_map(|(k, v)| {
            let key = k.as_str()?.strip_prefix(prefix)?.to_string();
            Some((Value::String(key), v))
        })
        .collect();
    let raw: RawAxis = yaml::from_value(Value::Mapping(fields), origin)?;
    let range = match raw.range.as_deref() {
        None => None,
        Some([lo, hi]) => Some((*lo, *hi)),
        Some(other) => {
            return Err(ConfigError::InvalidField {
                kind: "plot",
                name: name.to_string(),
                field: format!("{prefix}range"),
                reason: format!("expected [low, high], got {} values", other.len()),
            });
        }
    };
    Ok(AxisSpec { rebin: raw.rebin, title: raw.title, units: raw.units, range })
}
