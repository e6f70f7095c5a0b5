//! MC-statistics rebinning of the `/mttbar_after_htlep` templates.
//!
//! Bins below 0.4 and above 1.3 (TeV) are merged into one wide bin on each
//! side so that sparse tails do not dominate the template fit.

use std::collections::BTreeMap;

use exo_root::{Axis, Histogram};

use crate::error::Result;

/// Plot the rebinning applies to.
pub const MC_STAT_PLOT: &str = "/mttbar_after_htlep";

/// Range of low edges that are kept.
pub const KEPT_LOW_EDGES: (f64, f64) = (0.4, 1.3);

/// `[0] + low edges within [0.4, 1.3] + [4]`.
pub fn mc_stat_edges(axis: &Axis) -> Vec<f64> {
    let (lo, hi) = KEPT_LOW_EDGES;
    let mut edges = vec![0.0];
    let kept = (1..=axis.n_bins()).map(|b| axis.low_edge(b)).filter(|e| (lo..=hi).contains(e));
    edges.extend(kept);
    edges.push(4.0);
    edges
}

/// Rebin every channel of a plot on the edges of its first histogram.
///
/// Rebinned histograms are named `{name}_rebin`.
pub fn rebin_all(channels: &BTreeMap<String, Histogram>) -> Result<BTreeMap<String, Histogram>> {
    let Some(first) = channels.values().next() else {
        return Ok(BTreeMap::new());
    };
    let edges = mc_stat_edges(&first.x);
    tracing::debug!(bins = edges.len() - 1, "mc-stat rebinning");

    let mut out = BTreeMap::new();
    for (channel, h) in channels {
        let mut rebinned = h.rebinned(&edges)?;
        rebinned.name = format!("{}_rebin", h.name);
        out.insert(channel.clone(), rebinned);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn edges_keep_the_core_range() {
        let axis = Axis::uniform(16, 0.0, 4.0);
        assert_eq!(mc_stat_edges(&axis), vec![0.0, 0.5, 0.75, 1.0, 1.25, 4.0]);

        let axis = Axis::variable(vec![0.0, 0.4, 1.3, 2.0]).unwrap();
        assert_eq!(mc_stat_edges(&axis), vec![0.0, 0.4, 1.3, 4.0]);
    }

    #[test]
    fn rebinning_merges_tails_and_keeps_totals() {
        let axis = Axis::uniform(8, 0.0, 4.0);
        let bins = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let mut channels = BTreeMap::new();
        let tt = Histogram::from_contents("tt", axis, &bins).unwrap();
        channels.insert("ttbar".to_string(), tt);

        let out = rebin_all(&channels).unwrap();
        let tt = &out["ttbar"];
        // low edges in range: 0.5, 1.0
        assert_eq!(tt.x.edges(), &[0.0, 0.5, 1.0, 4.0]);
        assert_eq!(tt.bin_contents(), vec![1.0, 2.0, 33.0]);
        assert_eq!(tt.name, "tt_rebin");
        assert_relative_eq!(tt.integral(), 36.0);
    }
}
