//! Selection cutflow tables.
//!
//! The `/cutflow` histogram stores the event yield after each selection
//! stage in a fixed bin. A table lists the signal channels, the main
//! backgrounds, their total and data, split over two groups of four stages.

use std::collections::{BTreeMap, BTreeSet};

use exo_config::ChannelConfig;
use exo_root::Histogram;
use serde::Serialize;

use crate::error::{Result, TemplateError};
use crate::stats::binomial_efficiency;

/// Default cutflow plot.
pub const CUTFLOW_PLOT: &str = "/cutflow";

/// Plots a cutflow table can be built from.
pub const CUTFLOW_PLOTS: [&str; 2] = [CUTFLOW_PLOT, "/cutflow_no_weight"];

/// A selection stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Jet multiplicity.
    Jets,
    /// Good electron.
    Electron,
    /// Second lepton veto.
    VetoLepton,
    /// 2D isolation cut.
    TwodCut,
    /// Leading jet pT.
    Jet1,
    /// Leptonic HT.
    Htlep,
    /// Triangular cut.
    Tricut,
    /// Missing transverse energy.
    Met,
}

impl Stage {
    /// Every stage in selection order.
    pub const ALL: [Stage; 8] = [
        Self::Jets,
        Self::Electron,
        Self::VetoLepton,
        Self::TwodCut,
        Self::Jet1,
        Self::Htlep,
        Self::Tricut,
        Self::Met,
    ];

    /// Stage groups printed one after the other.
    pub const GROUPS: [[Stage; 4]; 2] = [
        [Self::Jets, Self::Electron, Self::VetoLepton, Self::TwodCut],
        [Self::Jet1, Self::Htlep, Self::Tricut, Self::Met],
    ];

    /// Stage name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jets => "jets",
            Self::Electron => "electron",
            Self::VetoLepton => "veto_lepton",
            Self::TwodCut => "twod_cut",
            Self::Jet1 => "jet1",
            Self::Htlep => "htlep",
            Self::Tricut => "tricut",
            Self::Met => "met",
        }
    }

    /// X value whose bin holds the stage yield.
    pub fn x(self) -> f64 {
        match self {
            Self::Jets => 5.0,
            Self::Electron => 6.0,
            Self::VetoLepton => 8.0,
            Self::TwodCut => 9.0,
            Self::Jet1 => 10.0,
            Self::Htlep => 14.0,
            Self::Tricut => 15.0,
            Self::Met => 16.0,
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|&s| s == self).unwrap_or(0)
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Aligned plain text.
    #[default]
    Text,
    /// LaTeX table rows.
    Tex,
}

/// Yield and error after every stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cutflow {
    /// Yields, in [`Stage::ALL`] order.
    pub values: [f64; 8],
    /// Errors, in [`Stage::ALL`] order.
    pub errors: [f64; 8],
}

impl Cutflow {
    /// Read the stage bins of a cutflow histogram.
    pub fn from_histogram(h: &Histogram) -> Self {
        let mut out = Self { values: [0.0; 8], errors: [0.0; 8] };
        for (i, stage) in Stage::ALL.into_iter().enumerate() {
            let bin = h.find_bin(stage.x());
            out.values[i] = h.bin_content(bin);
            out.errors[i] = h.bin_error(bin);
        }
        out
    }

    /// `(yield, error)` after `stage`.
    pub fn get(&self, stage: Stage) -> (f64, f64) {
        let i = stage.index();
        (self.values[i], self.errors[i])
    }

    /// Efficiency of `stage` relative to the first stage.
    pub fn efficiency(&self, stage: Stage) -> (f64, f64) {
        binomial_efficiency(self.get(stage), self.get(Stage::Jets))
    }
}

/// `"{value:>8.0} {sep} {error:<5.0}"`.
pub fn format_stats((value, error): (f64, f64), sep: &str) -> String {
    format!("{value:>8.0} {sep} {error:<5.0}")
}

/// One table line for `stages`.
pub fn format_row(mode: Mode, label: &str, cutflow: &Cutflow, stages: &[Stage]) -> String {
    match mode {
        Mode::Text => {
            let mut cells = vec![format!("{label:>20}")];
            cells.extend(stages.iter().map(|&s| format_stats(cutflow.get(s), "+-")));
            cells.join(" | ")
        }
        Mode::Tex => {
            let mut cells = vec![label.to_string()];
            cells.extend(stages.iter().map(|&s| format_stats(cutflow.get(s), "&")));
            format!("{} \\\\", cells.join(" & "))
        }
    }
}

/// Printed name of a channel.
pub fn display_name(channel: &str) -> &str {
    match channel {
        "zprime_m1000_w10" => r"Z' 1 Tev/c\textsuperscript{2}",
        "zprime_m2000_w20" => r"Z' 2 Tev/c\textsuperscript{2}",
        "zprime_m3000_w30" => r"Z' 3 Tev/c\textsuperscript{2}",
        "stop" => "Single-Top",
        "zjets" => r"$Z/\gamma^{\ast}\rightarrow l^{+}l^{-}$",
        "wjets" => r"$W\rightarrow l\nu$",
        "ttbar" => r"QCD t\bar{t}",
        other => other,
    }
}

/// Background rows, in print order.
const BACKGROUND_ROWS: [&str; 4] = ["stop", "zjets", "wjets", "ttbar"];

/// A labelled cutflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutflowRow {
    /// Channel or summary name.
    pub channel: String,
    /// Stage yields.
    pub cutflow: Cutflow,
}

/// A complete cutflow table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutflowTable {
    /// Z' signal rows in legend order.
    pub signal: Vec<CutflowRow>,
    /// Background rows.
    pub background: Vec<CutflowRow>,
    /// Sum of every background channel.
    pub total_mc: Cutflow,
    /// Data, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Cutflow>,
}

impl CutflowTable {
    /// Build the table from the cutflow histogram of each channel.
    ///
    /// Signal channels are those of the `zp`, `zpwide` and `kk` tokens, the
    /// background is the `mc` token. Fails without any background channel.
    pub fn build(config: &ChannelConfig, channels: &BTreeMap<String, Histogram>) -> Result<Self> {
        let signal_set = exo_config::expand(config, &tokens(&["zp", "zpwide", "kk"]))?;
        let background_set = exo_config::expand(config, &tokens(&["mc"]))?;

        let mut signal = BTreeMap::new();
        let mut background = BTreeMap::new();
        let mut total: Option<Histogram> = None;
        let mut data = None;
        for (channel, h) in channels {
            if signal_set.contains(channel) {
                signal.insert(channel.as_str(), Cutflow::from_histogram(h));
            } else if background_set.contains(channel) {
                background.insert(channel.as_str(), Cutflow::from_histogram(h));
                match total.as_mut() {
                    None => total = Some(h.clone()),
                    Some(t) => t.add(h)?,
                }
            } else if channel == "data" {
                data = Some(Cutflow::from_histogram(h));
            }
        }
        let total = total.ok_or_else(|| TemplateError::NoBackground(CUTFLOW_PLOT.to_string()))?;

        let signal = config
            .order
            .iter()
            .filter(|c| c.starts_with("zprime"))
            .filter_map(|c| signal.get(c.as_str()).map(|&cutflow| row(c, cutflow)))
            .collect();
        let background = BACKGROUND_ROWS
            .iter()
            .filter_map(|&c| background.get(c).map(|&cutflow| row(c, cutflow)))
            .collect();

        Ok(Self { signal, background, total_mc: Cutflow::from_histogram(&total), data })
    }

    fn rows(&self) -> Vec<(&str, &Cutflow)> {
        let mut rows: Vec<(&str, &Cutflow)> = self
            .signal
            .iter()
            .chain(&self.background)
            .map(|r| (display_name(&r.channel), &r.cutflow))
            .collect();
        rows.push(("Total MC", &self.total_mc));
        if let Some(data) = &self.data {
            rows.push(("Data 2011", data));
        }
        rows
    }

    /// The table text: each stage group followed by an empty line.
    pub fn render(&self, mode: Mode) -> String {
        let mut out = String::new();
        for group in &Stage::GROUPS {
            for (label, cutflow) in self.rows() {
                out.push_str(&format_row(mode, label, cutflow, group));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Efficiency of every stage relative to the first, per row.
    pub fn efficiency_summary(&self) -> String {
        let mut out = String::new();
        for (label, cutflow) in self.rows() {
            let mut cells = vec![format!("{label:>20}")];
            for stage in Stage::ALL {
                let (eff, err) = cutflow.efficiency(stage);
                cells.push(format!("{eff:.3} +- {:.3}", err.abs()));
            }
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        out
    }
}

fn tokens(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn row(channel: &str, cutflow: Cutflow) -> CutflowRow {
    CutflowRow { channel: channel.to_string(), cutflow }
}
