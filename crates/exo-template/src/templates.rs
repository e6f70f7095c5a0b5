//! Loaded plots of every selected channel, grouped by plot.

use std::collections::{BTreeMap, BTreeSet};

use exo_config::{ChannelConfig, PlotConfig, PlotPatterns};
use exo_root::Histogram;

use crate::error::Result;
use crate::loader::{ChannelLoader, add_percent_error};
use crate::source::{HistogramSource, PlotMap};

/// Channel → histogram of one plot.
pub type ChannelPlots = BTreeMap<String, Histogram>;

/// Role of a channel in a comparison plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Stacked background.
    Background,
    /// Overlaid signal.
    Signal,
    /// Measured data.
    Data,
    /// Not drawn.
    Other,
}

const SIGNAL_PREFIXES: [&str; 3] = ["zprime", "kkgluon", "rsgluon"];

/// Assigns a [`ChannelKind`] to channel names.
#[derive(Debug, Clone)]
pub struct Classifier {
    background: BTreeSet<String>,
}

impl Classifier {
    /// Backgrounds are the `mc` token plus a `qcd` channel when declared.
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        let requested = ["mc", "qcd"].into_iter().map(String::from).collect();
        Ok(Self { background: exo_config::expand(config, &requested)? })
    }

    /// Classifier with an explicit background set.
    pub fn with_background(background: BTreeSet<String>) -> Self {
        Self { background }
    }

    /// Role of `channel`.
    pub fn kind(&self, channel: &str) -> ChannelKind {
        if self.background.contains(channel) {
            ChannelKind::Background
        } else if SIGNAL_PREFIXES.iter().any(|p| channel.starts_with(p)) {
            ChannelKind::Signal
        } else if channel == "data" {
            ChannelKind::Data
        } else {
            ChannelKind::Other
        }
    }
}

/// Plot path → channel → histogram.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    plots: BTreeMap<String, ChannelPlots>,
}

impl Templates {
    /// No plots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every channel of `channels` through `loader`.
    pub fn load<S: HistogramSource + ?Sized>(
        loader: &ChannelLoader<'_, S>,
        config: &ChannelConfig,
        plots: &PlotConfig,
        channels: &BTreeSet<String>,
        patterns: &PlotPatterns,
    ) -> Result<Self> {
        let mut out = Self::new();
        for channel in channels {
            let loaded = loader.load(config, plots, channel, patterns)?;
            tracing::info!(channel = %channel, plots = loaded.len(), "channel loaded");
            out.insert(channel, loaded);
        }
        Ok(out)
    }

    /// Store the plots of one channel.
    pub fn insert(&mut self, channel: &str, plots: PlotMap) {
        for (key, h) in plots {
            self.plots.entry(key).or_default().insert(channel.to_string(), h);
        }
    }

    /// Channels of `plot`.
    pub fn get(&self, plot: &str) -> Option<&ChannelPlots> {
        self.plots.get(plot)
    }

    /// Every plot in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelPlots)> {
        self.plots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of plots.
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// Add `percent` of the content to the error of every background histogram.
    pub fn add_background_error(&mut self, classifier: &Classifier, percent: f64) {
        for channels in self.plots.values_mut() {
            for (channel, h) in channels.iter_mut() {
                if classifier.kind(channel) == ChannelKind::Background {
                    add_percent_error(h, percent);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use approx::assert_relative_eq;
    use exo_root::Axis;

    const CHANNELS: &str = r#"
luminosity: 1.0
input:
  - {name: tt}
  - {name: wb}
  - {name: zp}
  - {name: dt}
channel:
  - {name: ttbar, color: [2], inputs: [tt]}
  - {name: wb, color: [3], inputs: [wb]}
  - {name: zprime_m1000_w10, color: [4], inputs: [zp]}
  - {name: data, color: [1], inputs: [dt]}
  - {name: qcd, color: [5], inputs: [dt]}
"#;

    fn hist(path: &str, v: f64) -> Histogram {
        let mut h = Histogram::from_contents("h", Axis::uniform(1, 0.0, 1.0), &[v]).unwrap();
        h.path = path.to_string();
        h
    }

    #[test]
    fn classification() {
        let config = exo_config::channel::parse(CHANNELS).unwrap();
        let c = Classifier::new(&config).unwrap();
        assert_eq!(c.kind("ttbar"), ChannelKind::Background);
        assert_eq!(c.kind("qcd"), ChannelKind::Background);
        assert_eq!(c.kind("zprime_m1000_w10"), ChannelKind::Signal);
        assert_eq!(c.kind("kkgluon_m2000"), ChannelKind::Signal);
        assert_eq!(c.kind("data"), ChannelKind::Data);
        assert_eq!(c.kind("wjets"), ChannelKind::Other);
    }

    #[test]
    fn loading_groups_by_plot() {
        let config = exo_config::channel::parse(CHANNELS).unwrap();
        let src = MemorySource::new()
            .with("tt", hist("/mttbar", 1.0))
            .with("tt", hist("/njets", 2.0))
            .with("dt", hist("/mttbar", 3.0));
        let loader = ChannelLoader::new(&src, "p");
        let channels: BTreeSet<String> = ["ttbar", "data"].into_iter().map(String::from).collect();
        let plots = PlotConfig::default();
        let t =
            Templates::load(&loader, &config, &plots, &channels, &PlotPatterns::all()).unwrap();

        assert_eq!(t.len(), 2);
        let mttbar = t.get("/mttbar").unwrap();
        assert_eq!(mttbar.keys().collect::<Vec<_>>(), vec!["data", "ttbar"]);
        assert_eq!(t.get("/njets").unwrap().len(), 1);
    }

    #[test]
    fn background_error_only_touches_backgrounds() {
        let config = exo_config::channel::parse(CHANNELS).unwrap();
        let mut t = Templates::new();
        t.insert("ttbar", [("/m".to_string(), hist("/m", 100.0))].into_iter().collect());
        t.insert("data", [("/m".to_string(), hist("/m", 100.0))].into_iter().collect());
        t.add_background_error(&Classifier::new(&config).unwrap(), 10.0);

        let m = t.get("/m").unwrap();
        // sqrt(100 + 10^2)
        assert_relative_eq!(m["ttbar"].bin_error(1), 200.0f64.sqrt(), epsilon = 1e-12);
        assert_eq!(m["data"].bin_error(1), 10.0);
    }
}
