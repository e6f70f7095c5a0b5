//! Channel loader: reads every enabled input of a channel, normalizes it to
//! the configured luminosity and sums the inputs into one histogram per path.
//!
//! The stages run in a fixed order:
//!
//! 1. load each enabled input through a [`HistogramSource`]
//! 2. scale by `xsection * luminosity / events` when both are known
//! 3. accumulate: the first input with plots seeds every key, later inputs
//!    add into it
//! 4. apply the channel scale factor, if any
//! 5. style each histogram from the channel declaration
//! 6. apply the plot configuration (rebin, titles, visible range)
//!
//! Background systematics are a separate stage, [`add_percent_error`],
//! composed by the caller.

use exo_config::{AxisSpec, ChannelConfig, PlotConfig, PlotEntry, PlotPatterns, ScaleTable};
use exo_root::{AxisId, Histogram};

use crate::error::{Result, TemplateError};
use crate::source::{HistogramSource, PlotMap};

/// Y title of every configured 1-D plot.
pub const EVENT_YIELD: &str = "event yield";

/// Loads channels from one file prefix.
pub struct ChannelLoader<'a, S: HistogramSource + ?Sized> {
    source: &'a S,
    prefix: String,
    scale: Option<&'a ScaleTable>,
}

impl<'a, S: HistogramSource + ?Sized> ChannelLoader<'a, S> {
    /// Loader reading `{prefix}.{input}.root` through `source`.
    pub fn new(source: &'a S, prefix: impl Into<String>) -> Self {
        Self { source, prefix: prefix.into(), scale: None }
    }

    /// Multiply each loaded channel by its factor in `table`.
    pub fn with_scale(mut self, table: &'a ScaleTable) -> Self {
        self.scale = Some(table);
        self
    }

    /// File prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Load, combine, style and configure every plot of `channel`.
    ///
    /// A missing input file aborts the channel. A histogram without a plot
    /// configuration entry is kept as loaded.
    pub fn load(
        &self,
        config: &ChannelConfig,
        plots: &PlotConfig,
        channel: &str,
        patterns: &PlotPatterns,
    ) -> Result<PlotMap> {
        let mut combined = self.combine(config, channel, patterns)?;

        if let Some(factor) = self.scale.and_then(|t| t.get(channel)) {
            tracing::debug!(channel, factor, "apply channel scale");
            for h in combined.values_mut() {
                h.scale(factor);
            }
        }

        let declared = &config.channel[channel];
        for (key, h) in combined.iter_mut() {
            apply_style(h, channel, declared.color, declared.fill, declared.line);
            match plots.get(key) {
                Some(entry) => apply_plot_config(h, entry)?,
                None => tracing::warn!(plot = %key, "plot is not found in the plot configuration"),
            }
        }
        Ok(combined)
    }

    /// Stages 1 to 3 only: the normalized sum of the channel's inputs.
    pub fn combine(
        &self,
        config: &ChannelConfig,
        channel: &str,
        patterns: &PlotPatterns,
    ) -> Result<PlotMap> {
        let declared = config
            .channel
            .get(channel)
            .ok_or_else(|| TemplateError::UnknownChannel(channel.to_string()))?;

        let mut combined: Option<PlotMap> = None;
        for name in &declared.inputs {
            let Some(input) = config.input.get(name) else {
                return Err(exo_config::ConfigError::UndefinedInput {
                    channel: channel.to_string(),
                    input: name.clone(),
                }
                .into());
            };
            if !input.enable {
                tracing::warn!(channel, input = %name, "skip input because it is disabled");
                continue;
            }

            tracing::info!(channel, input = %name, "load input");
            let mut plots = self.source.load(&self.prefix, name, patterns)?;
            if let Some(norm) = input.normalization(config.luminosity) {
                tracing::debug!(input = %name, normalization = norm, "normalize input");
                for h in plots.values_mut() {
                    h.scale(norm);
                }
            }

            match combined.as_mut().filter(|acc| !acc.is_empty()) {
                Some(acc) => accumulate(acc, &plots, channel, name)?,
                None => combined = Some(plots),
            }
        }

        combined.ok_or_else(|| TemplateError::EmptyChannel(channel.to_string()))
    }
}

/// Add `plots` into `acc` key by key; every key of `acc` must be present.
fn accumulate(acc: &mut PlotMap, plots: &PlotMap, channel: &str, input: &str) -> Result<()> {
    for (key, h) in acc.iter_mut() {
        let other = plots.get(key).ok_or_else(|| TemplateError::MissingHistogram {
            channel: channel.to_string(),
            input: input.to_string(),
            key: key.clone(),
        })?;
        h.add(other)?;
    }
    let extra = plots.keys().filter(|k| !acc.contains_key(*k)).count();
    if extra > 0 {
        tracing::debug!(channel, input, extra, "ignoring plots absent from the first input");
    }
    Ok(())
}

/// Channel styling: colors, fill, markers and line.
pub fn apply_style(h: &mut Histogram, channel: &str, color: i32, fill: bool, line: Option<i32>) {
    let style = &mut h.style;
    style.line_color = color;
    style.fill_color = color;
    style.fill_style = if fill { 1001 } else { 0 };
    if channel == "data" {
        style.marker_style = 20;
        style.marker_size = 1.0;
    } else {
        style.marker_style = 1;
    }
    style.line_width = 2;
    if let Some(line) = line.filter(|&l| l != 0) {
        style.line_style = line;
    }
}

/// Apply a plot entry. An entry of the wrong dimension is skipped.
pub fn apply_plot_config(h: &mut Histogram, entry: &PlotEntry) -> Result<()> {
    match (entry, h.dimension()) {
        (PlotEntry::OneD(spec), 1) => {
            apply_axis(h, AxisId::X, spec)?;
            h.y_title = EVENT_YIELD.to_string();
        }
        (PlotEntry::TwoD { x, y }, 2) => {
            apply_axis(h, AxisId::X, x)?;
            apply_axis(h, AxisId::Y, y)?;
        }
        (_, dim) => {
            tracing::warn!(plot = %h.path, dimension = dim, "plot configuration does not fit");
        }
    }
    Ok(())
}

fn apply_axis(h: &mut Histogram, id: AxisId, spec: &AxisSpec) -> Result<()> {
    if let Some(group) = spec.effective_rebin()
        && let Err(err) = h.rebin_axis(id, group)
    {
        tracing::warn!(plot = %h.path, group, %err, "rebin is skipped");
    }
    let axis = match id {
        AxisId::X => &mut h.x,
        AxisId::Y => match h.y.as_mut() {
            Some(y) => y,
            None => return Ok(()),
        },
    };
    if let Some(title) = spec.axis_title() {
        axis.title = title;
    }
    if let Some((lo, hi)) = spec.range {
        axis.set_range_user(lo, hi);
    }
    Ok(())
}

/// Add `percent` of each bin content to its error, in quadrature.
///
/// Covers every visible cell of a 1-D or 2-D histogram; flows are untouched.
pub fn add_percent_error(h: &mut Histogram, percent: f64) {
    let fraction = percent / 100.0;
    let cells: Vec<usize> = h.visible_cells().collect();
    for cell in cells {
        let content = h.bin_content(cell);
        let error = h.bin_error(cell).hypot(content * fraction);
        h.set_bin_error(cell, error);
    }
}
