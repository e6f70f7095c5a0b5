//! Plot-ready comparison artifacts (numbers only, no drawing).
//!
//! Each artifact carries the bin edges, per-series contents and errors,
//! styles and axis settings a renderer needs to draw the canvas.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use exo_config::ChannelConfig;
use exo_root::{Histogram, Style};
use serde::Serialize;

use crate::error::{Result, TemplateError};
use crate::stats::{self, EfficiencyPoint};
use crate::templates::{ChannelKind, ChannelPlots, Classifier, Templates};

/// Schema of [`TemplatesArtifact`].
pub const TEMPLATES_SCHEMA: &str = "exo.templates.v1";
/// Schema of [`SignificanceArtifact`].
pub const SIGNIFICANCE_SCHEMA: &str = "exo.significance.v1";
/// Schema of [`EfficiencyArtifact`].
pub const EFFICIENCY_SCHEMA: &str = "exo.efficiency.v1";

/// Channels summed into the S/B background.
pub const SB_BACKGROUND: [&str; 3] = ["wb", "wc", "wlight"];

/// Y title of S/B curves.
pub const SB_TITLE: &str = "S / B , B = W#rightarrowl#nu";

/// Y title of the data/MC ratio.
pub const RATIO_TITLE: &str = "#frac{Data - MC}{MC}";

/// Headroom above the tallest series.
pub const Y_MAX_FACTOR: f64 = 1.2;

/// Tool metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMeta {
    /// Always `exo`.
    pub tool: String,
    /// Crate version that wrote the artifact.
    pub tool_version: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_unix_ms: u128,
    /// Free-form label from `--label`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ArtifactMeta {
    /// Metadata stamped with the current time.
    pub fn now(label: Option<String>) -> Self {
        let created_unix_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
        Self {
            tool: "exo".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            created_unix_ms,
            label,
        }
    }
}

/// Visible contents and errors of one histogram.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    /// Channel name.
    pub channel: String,
    /// Legend entry of the channel.
    pub legend: String,
    /// Visible cells; 2-D histograms are flattened with x running fastest.
    pub y: Vec<f64>,
    /// Errors of `y`.
    pub yerr: Vec<f64>,
    /// Drawing style.
    pub style: Style,
}

impl Series {
    fn new(channel: &str, legend: &str, h: &Histogram) -> Self {
        let (y, yerr) = visible(h);
        Self {
            channel: channel.to_string(),
            legend: legend.to_string(),
            y,
            yerr,
            style: h.style,
        }
    }
}

fn visible(h: &Histogram) -> (Vec<f64>, Vec<f64>) {
    let cells: Vec<usize> = h.visible_cells().collect();
    let y = cells.iter().map(|&c| h.bin_content(c)).collect();
    let yerr = cells.iter().map(|&c| h.bin_error(c)).collect();
    (y, yerr)
}

/// `content ± error` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct BandEnvelope {
    /// `content - error` per visible cell.
    pub lo: Vec<f64>,
    /// `content + error` per visible cell.
    pub hi: Vec<f64>,
}

impl BandEnvelope {
    fn from_histogram(h: &Histogram) -> Self {
        let (y, yerr) = visible(h);
        let lo = y.iter().zip(&yerr).map(|(v, e)| v - e).collect();
        let hi = y.iter().zip(&yerr).map(|(v, e)| v + e).collect();
        Self { lo, hi }
    }
}

/// What the ratio pad divides and how empty denominators are handled.
#[derive(Debug, Clone, Serialize)]
pub struct RatioPolicy {
    /// Numerator description, e.g. `data - background`.
    pub numerator: String,
    /// Denominator description.
    pub denominator: String,
    /// Value used where the denominator is zero.
    pub zero_policy: String,
}

/// Lower-pad comparison.
#[derive(Debug, Clone, Serialize)]
pub struct RatioSeries {
    /// Numerator, denominator and zero handling.
    pub policy: RatioPolicy,
    /// Y title of the pad.
    pub y_title: String,
    /// Fixed y range of the pad.
    pub y_range: (f64, f64),
    /// Ratio values and errors.
    pub series: Series,
}

/// Binning and titles shared by the series of a plot.
#[derive(Debug, Clone, Serialize)]
pub struct AxisInfo {
    /// X axis title.
    pub x_title: String,
    /// Y axis title; the y axis title of a 2-D histogram.
    pub y_title: String,
    /// X bin edges, `n + 1` values.
    pub bin_edges: Vec<f64>,
    /// Y bin edges of a 2-D histogram.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_bin_edges: Option<Vec<f64>>,
    /// Visible x range set by the plot configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_range: Option<(f64, f64)>,
}

impl AxisInfo {
    fn from_histogram(h: &Histogram) -> Self {
        Self {
            x_title: h.x.title.clone(),
            y_title: match &h.y {
                Some(y) => y.title.clone(),
                None => h.y_title.clone(),
            },
            bin_edges: h.x.edges().to_vec(),
            y_bin_edges: h.y.as_ref().map(|y| y.edges().to_vec()),
            x_range: h.x.range,
        }
    }
}

/// Stacked background, overlaid signal and data for one plot.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonPlot {
    /// Histogram path.
    pub plot: String,
    /// Binning and titles.
    pub axis: AxisInfo,
    /// Lower edge of the y axis.
    pub y_min: f64,
    /// Upper edge of the y axis, with headroom.
    pub y_max: f64,
    /// Bottom to top.
    pub stack_order: Vec<String>,
    /// Background series in legend order.
    pub background: Vec<Series>,
    /// Signal series, drawn unstacked.
    pub signal: Vec<Series>,
    /// Data series, if the data channel is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Series>,
    /// Statistical band around the background sum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<BandEnvelope>,
    /// `(data - mc) / mc` of a 1-D plot with data and background.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<RatioSeries>,
}

/// Output of `exo templates` and `exo mc-stat`.
#[derive(Debug, Clone, Serialize)]
pub struct TemplatesArtifact {
    /// [`TEMPLATES_SCHEMA`].
    pub schema_version: String,
    /// Tool metadata.
    pub meta: ArtifactMeta,
    /// One entry per loaded plot.
    pub plots: Vec<ComparisonPlot>,
}

fn legend<'a>(config: &'a ChannelConfig, channel: &'a str) -> &'a str {
    config.channel.get(channel).map_or(channel, |c| c.legend.as_str())
}

/// Comparison of every channel of one plot.
///
/// Backgrounds are stacked in reverse legend order so that the first legend
/// entry ends on top. The y axis spans `[0, 1.2 * max]` over the background
/// total, every signal and data.
pub fn comparison(
    plot: &str,
    channels: &ChannelPlots,
    config: &ChannelConfig,
    classifier: &Classifier,
) -> Result<ComparisonPlot> {
    let Some(first) = channels.values().next() else {
        return Err(TemplateError::MissingPlot(plot.to_string()));
    };

    let mut backgrounds: Vec<(&str, &Histogram)> = Vec::new();
    let mut signal = Vec::new();
    let mut data = None;
    for channel in config.ordered(channels.keys().map(String::as_str)) {
        let h = &channels[channel];
        match classifier.kind(channel) {
            ChannelKind::Background => backgrounds.push((channel, h)),
            ChannelKind::Signal => signal.push(Series::new(channel, legend(config, channel), h)),
            ChannelKind::Data => data = Some(h),
            ChannelKind::Other => {
                tracing::debug!(plot, channel, "channel is neither signal, background nor data");
            }
        }
    }
    backgrounds.reverse();

    let stack: Vec<&Histogram> = backgrounds.iter().map(|(_, h)| *h).collect();
    let total = stats::uncertainty_band(&stack)?;

    let mut y_max = total.as_ref().map_or(0.0, Histogram::maximum);
    for (_, h) in channels.iter().filter(|(c, _)| classifier.kind(c) == ChannelKind::Signal) {
        y_max = y_max.max(h.maximum());
    }
    if let Some(d) = data {
        y_max = y_max.max(d.maximum());
    }

    let ratio = match (data, total.as_ref()) {
        (Some(d), Some(t)) if d.dimension() == 1 => {
            let mut r = stats::data_minus_bg_over_bg(d, t)?;
            r.y_title = RATIO_TITLE.to_string();
            Some(RatioSeries {
                policy: RatioPolicy {
                    numerator: "data - background".to_string(),
                    denominator: "background".to_string(),
                    zero_policy: "zero".to_string(),
                },
                y_title: r.y_title.clone(),
                y_range: (-1.0, 1.0),
                series: Series::new("data", "Data / MC", &r),
            })
        }
        _ => None,
    };

    Ok(ComparisonPlot {
        plot: plot.to_string(),
        axis: AxisInfo::from_histogram(first),
        y_min: 0.0,
        y_max: Y_MAX_FACTOR * y_max,
        stack_order: backgrounds.iter().map(|(c, _)| c.to_string()).collect(),
        background: backgrounds
            .iter()
            .map(|(c, h)| Series::new(c, legend(config, c), h))
            .collect(),
        signal,
        data: data.map(|d| Series::new("data", legend(config, "data"), d)),
        band: total.as_ref().map(BandEnvelope::from_histogram),
        ratio,
    })
}

/// Comparisons of every loaded plot.
pub fn templates_artifact(
    templates: &Templates,
    config: &ChannelConfig,
    classifier: &Classifier,
    label: Option<String>,
) -> Result<TemplatesArtifact> {
    let plots = templates
        .iter()
        .map(|(plot, channels)| comparison(plot, channels, config, classifier))
        .collect::<Result<Vec<_>>>()?;
    Ok(TemplatesArtifact {
        schema_version: TEMPLATES_SCHEMA.to_string(),
        meta: ArtifactMeta::now(label),
        plots,
    })
}

/// Which significance estimate a [`SignificancePlot`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `S / B`.
    SOverB,
    /// `S / sqrt(S + B)`.
    SOverSqrtSPlusB,
}

/// Signal significance curves of one plot.
#[derive(Debug, Clone, Serialize)]
pub struct SignificancePlot {
    /// Histogram path.
    pub plot: String,
    /// Binning and titles of the curves.
    pub axis: AxisInfo,
    /// Channels summed into the background.
    pub background_channels: Vec<String>,
    /// One transformed curve per signal channel.
    pub signal: Vec<Series>,
}

/// Output of `exo sb`.
#[derive(Debug, Clone, Serialize)]
pub struct SignificanceArtifact {
    /// [`SIGNIFICANCE_SCHEMA`].
    pub schema_version: String,
    /// Tool metadata.
    pub meta: ArtifactMeta,
    /// Transform applied to every curve.
    pub transform: Transform,
    /// One entry per 1-D plot.
    pub plots: Vec<SignificancePlot>,
}

/// S/B or S/√(S+B) over cumulative event counts above each bin.
///
/// Every channel becomes an unnormalized [`stats::efficiency`] curve. The
/// background is the sum of the W+X channels; signals are the Z' and KK
/// gluon channels.
pub fn significance(
    plot: &str,
    channels: &ChannelPlots,
    config: &ChannelConfig,
    transform: Transform,
) -> Result<SignificancePlot> {
    let mut background: Option<Histogram> = None;
    let mut background_channels = Vec::new();
    let mut signals = Vec::new();
    for channel in config.ordered(channels.keys().map(String::as_str)) {
        let mut curve = stats::efficiency(&channels[channel], false, false)?;
        curve.y_title = SB_TITLE.to_string();
        if SB_BACKGROUND.contains(&channel) {
            background_channels.push(channel.to_string());
            match background.as_mut() {
                None => background = Some(curve),
                Some(b) => b.add(&curve)?,
            }
        } else if channel.starts_with("zprime") || channel.starts_with("kkgluon") {
            signals.push((channel, curve));
        }
    }

    if signals.is_empty() {
        return Err(TemplateError::NoSignal(plot.to_string()));
    }
    let background = background.ok_or_else(|| TemplateError::NoBackground(plot.to_string()))?;

    let mut axis = AxisInfo::from_histogram(&background);
    if transform == Transform::SOverSqrtSPlusB {
        axis.y_title = stats::SQRT_TOTAL_TITLE.to_string();
    }
    let mut signal = Vec::with_capacity(signals.len());
    for (channel, curve) in &signals {
        let h = match transform {
            Transform::SOverB => stats::signal_over_background(curve, &background)?,
            Transform::SOverSqrtSPlusB => stats::signal_over_sqrt_total(curve, &background)?,
        };
        signal.push(Series::new(channel, legend(config, channel), &h));
    }

    Ok(SignificancePlot { plot: plot.to_string(), axis, background_channels, signal })
}

/// Significance curves of every loaded 1-D plot; 2-D plots are skipped.
pub fn significance_artifact(
    templates: &Templates,
    config: &ChannelConfig,
    transform: Transform,
    label: Option<String>,
) -> Result<SignificanceArtifact> {
    let mut plots = Vec::new();
    for (plot, channels) in templates.iter() {
        if channels.values().any(|h| h.dimension() != 1) {
            tracing::warn!(plot = %plot, "skip significance of a 2-D plot");
            continue;
        }
        plots.push(significance(plot, channels, config, transform)?);
    }
    Ok(SignificanceArtifact {
        schema_version: SIGNIFICANCE_SCHEMA.to_string(),
        meta: ArtifactMeta::now(label),
        transform,
        plots,
    })
}

/// Efficiency graph of one channel.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyCurve {
    /// Channel name.
    pub channel: String,
    /// Legend entry of the channel.
    pub legend: String,
    /// Style of the passing histogram.
    pub style: Style,
    /// One point per bin with a non-empty total.
    pub points: Vec<EfficiencyPoint>,
}

/// Output of `exo efficiency`.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyArtifact {
    /// [`EFFICIENCY_SCHEMA`].
    pub schema_version: String,
    /// Tool metadata.
    pub meta: ArtifactMeta,
    /// Plot of passing events.
    pub pass: String,
    /// Plot of all events.
    pub total: String,
    /// Probability held by the error bars.
    pub confidence_level: f64,
    /// X title of the total plot.
    pub x_title: String,
    /// Channels holding both plots, in legend order.
    pub channels: Vec<EfficiencyCurve>,
}

/// Bayesian `pass / total` efficiency of every channel holding both plots.
pub fn efficiency_artifact(
    templates: &Templates,
    config: &ChannelConfig,
    pass: &str,
    total: &str,
    cl: f64,
    label: Option<String>,
) -> Result<EfficiencyArtifact> {
    let pass_plots = templates.get(pass).ok_or_else(|| TemplateError::MissingPlot(pass.into()))?;
    let total_plots =
        templates.get(total).ok_or_else(|| TemplateError::MissingPlot(total.into()))?;

    let both: BTreeSet<&str> = pass_plots
        .keys()
        .filter(|c| total_plots.contains_key(*c))
        .map(String::as_str)
        .collect();

    let mut x_title = String::new();
    let mut channels = Vec::new();
    for channel in config.ordered(both) {
        let (p, t) = (&pass_plots[channel], &total_plots[channel]);
        if x_title.is_empty() {
            x_title = t.x.title.clone();
        }
        channels.push(EfficiencyCurve {
            channel: channel.to_string(),
            legend: legend(config, channel).to_string(),
            style: p.style,
            points: stats::bayes_efficiency(p, t, cl)?,
        });
    }

    Ok(EfficiencyArtifact {
        schema_version: EFFICIENCY_SCHEMA.to_string(),
        meta: ArtifactMeta::now(label),
        pass: pass.to_string(),
        total: total.to_string(),
        confidence_level: cl,
        x_title,
        channels,
    })
}

/// Pretty JSON of any artifact.
pub fn to_json<T: Serialize>(artifact: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(artifact)?)
}

#[cfg(test)]
mod tests;
