//! Derived histograms: cumulative efficiency curves, background uncertainty
//! bands, signal/background ratios and pass/total efficiencies.
//!
//! Every function borrows its inputs and returns a fresh histogram; callers'
//! histograms are never modified.

use exo_root::{Histogram, RootError};
use serde::Serialize;
use statrs::distribution::{Beta, ContinuousCDF};

use crate::error::{Result, TemplateError};

/// ROOT `kGray`.
pub const GRAY: i32 = 920;

/// Hatched fill pattern of the uncertainty band.
pub const BAND_FILL_STYLE: i32 = 3004;

/// Y title of the S/√(S+B) transform.
pub const SQRT_TOTAL_TITLE: &str = "S / #sqrt{S + B}";

/// Error unless `h` is one-dimensional.
fn require_1d(h: &Histogram, what: &str) -> Result<()> {
    if h.dimension() != 1 {
        return Err(RootError::InvalidOperation(format!(
            "{what} needs a 1-D histogram, '{}' has {} dimensions",
            h.path,
            h.dimension()
        ))
        .into());
    }
    Ok(())
}

/// Cumulative efficiency curve of a 1-D histogram.
///
/// Bin `i` holds the integral from `i` through the overflow, or from bin 1
/// through `i` when `invert` is set, with its error. With `normalize` every
/// bin is divided by the total integral; a zero integral leaves the curve
/// unnormalized. A 2-D histogram is an error.
pub fn efficiency(h: &Histogram, invert: bool, normalize: bool) -> Result<Histogram> {
    require_1d(h, "efficiency")?;
    let mut out = h.empty_like();
    let n = h.x.n_bins();
    for bin in 1..=n {
        let (sum, error) =
            if invert { h.integral_and_error(1, bin) } else { h.integral_and_error(bin, n + 1) };
        out.set_bin_content(bin, sum);
        out.set_bin_error(bin, error);
    }
    if normalize {
        let total = h.integral();
        if total != 0.0 {
            out.scale(1.0 / total);
        } else {
            tracing::warn!(plot = %h.path, "zero integral, efficiency is not normalized");
        }
    }
    Ok(out)
}

/// Bin-wise sum of `backgrounds`, styled as a hatched band.
///
/// Returns `None` for an empty slice.
pub fn uncertainty_band(backgrounds: &[&Histogram]) -> Result<Option<Histogram>> {
    let Some((first, rest)) = backgrounds.split_first() else {
        return Ok(None);
    };
    let mut band = (*first).clone();
    for h in rest {
        band.add(h)?;
    }
    band.name = format!("{}_band", first.name);
    let style = &mut band.style;
    style.marker_size = 0.0;
    style.line_width = 0;
    style.fill_style = BAND_FILL_STYLE;
    style.fill_color = GRAY + 1;
    Ok(Some(band))
}

/// `S / B`, bin by bin; zero background gives zero.
pub fn signal_over_background(signal: &Histogram, background: &Histogram) -> Result<Histogram> {
    let mut out = signal.clone();
    out.divide(background)?;
    Ok(out)
}

/// `S / sqrt(S + B)` over the visible x bins.
///
/// Only contents are transformed and every error is set to zero; the
/// background uncertainty is not propagated. Bins with `S + B <= 0` get zero.
pub fn signal_over_sqrt_total(signal: &Histogram, background: &Histogram) -> Result<Histogram> {
    require_1d(signal, "S / sqrt(S + B)")?;
    signal.check_compatible(background)?;
    let mut out = signal.empty_like();
    out.y_title = SQRT_TOTAL_TITLE.to_string();
    for bin in 1..=signal.x.n_bins() {
        let s = signal.bin_content(bin);
        let total = s + background.bin_content(bin);
        out.set_bin_content(bin, if total > 0.0 { s / total.sqrt() } else { 0.0 });
    }
    Ok(out)
}

/// Pass/total efficiency with linear error propagation.
///
/// `eff = p / t`, `err = (t * σp - p * σt) / t²`. A zero total gives `(0, 0)`.
pub fn binomial_efficiency(pass: (f64, f64), total: (f64, f64)) -> (f64, f64) {
    let ((p, sp), (t, st)) = (pass, total);
    if t == 0.0 {
        return (0.0, 0.0);
    }
    (p / t, (t * sp - p * st) / (t * t))
}

/// One point of an efficiency graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EfficiencyPoint {
    /// Bin center.
    pub x: f64,
    /// Half bin width, left.
    pub x_err_lo: f64,
    /// Half bin width, right.
    pub x_err_hi: f64,
    /// Posterior mode.
    pub y: f64,
    /// Distance from the mode to the lower interval edge.
    pub y_err_lo: f64,
    /// Distance from the mode to the upper interval edge.
    pub y_err_hi: f64,
}

/// Per-bin Bayesian efficiency `pass / total`.
///
/// A flat Beta(1, 1) prior gives the posterior Beta(k + 1, n - k + 1). The
/// point is its mode `k / n` and the error bars span the central interval
/// holding `cl` of the probability, widened to contain the mode. Bins with
/// an empty total are skipped. Only 1-D histograms are accepted.
pub fn bayes_efficiency(
    pass: &Histogram,
    total: &Histogram,
    cl: f64,
) -> Result<Vec<EfficiencyPoint>> {
    require_1d(total, "Bayesian efficiency")?;
    pass.check_compatible(total)?;
    let valid = cl > 0.0 && cl < 1.0;
    if !valid {
        return Err(TemplateError::Statistics(format!("confidence level {cl} is not in (0, 1)")));
    }

    let mut points = Vec::new();
    for bin in 1..=total.x.n_bins() {
        let n = total.bin_content(bin);
        if n <= 0.0 {
            continue;
        }
        let k = pass.bin_content(bin).clamp(0.0, n);
        let posterior = Beta::new(k + 1.0, n - k + 1.0)
            .map_err(|e| TemplateError::Statistics(format!("bin {bin}: {e}")))?;
        let mode = k / n;
        let lo = posterior.inverse_cdf((1.0 - cl) / 2.0).min(mode);
        let hi = posterior.inverse_cdf((1.0 + cl) / 2.0).max(mode);

        let center = total.x.center(bin);
        points.push(EfficiencyPoint {
            x: center,
            x_err_lo: center - total.x.low_edge(bin),
            x_err_hi: total.x.up_edge(bin) - center,
            y: mode,
            y_err_lo: mode - lo,
            y_err_hi: hi - mode,
        });
    }
    Ok(points)
}

fn ratio_style(h: &mut Histogram) {
    let style = &mut h.style;
    style.marker_size = 1.0;
    style.marker_style = 20;
    style.marker_color = 1;
    style.line_width = 2;
    style.line_color = GRAY + 2;
    style.line_style = 1;
}

/// `numerator / denominator` styled for a ratio pad.
pub fn ratio(numerator: &Histogram, denominator: &Histogram) -> Result<Histogram> {
    let mut out = numerator.clone();
    out.divide(denominator)?;
    ratio_style(&mut out);
    Ok(out)
}

/// `(data - background) / background` styled for a ratio pad.
pub fn data_minus_bg_over_bg(data: &Histogram, background: &Histogram) -> Result<Histogram> {
    let mut out = data.clone();
    out.add_scaled(background, -1.0)?;
    out.divide(background)?;
    ratio_style(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use exo_root::Axis;

    fn h1(bins: &[f64]) -> Histogram {
        let x = Axis::uniform(bins.len(), 0.0, bins.len() as f64);
        Histogram::from_contents("h", x, bins).unwrap()
    }

    #[test]
    fn efficiency_is_cumulative_from_the_right() {
        let h = h1(&[1.0, 2.0, 3.0, 4.0]);
        let eff = efficiency(&h, false, false).unwrap();
        assert_eq!(eff.bin_contents(), vec![10.0, 9.0, 7.0, 4.0]);
        assert_relative_eq!(eff.bin_error(2), 3.0, epsilon = 1e-12);

        let norm = efficiency(&h, false, true).unwrap();
        assert_relative_eq!(norm.bin_content(1), 1.0);
        assert_relative_eq!(norm.bin_content(4), 0.4);
    }

    #[test]
    fn efficiency_includes_overflow() {
        let mut h = h1(&[1.0, 1.0]);
        h.set_bin_content(3, 2.0);
        let eff = efficiency(&h, false, false).unwrap();
        assert_eq!(eff.bin_contents(), vec![4.0, 3.0]);
    }

    #[test]
    fn inverted_efficiency_is_cumulative_from_the_left() {
        let h = h1(&[1.0, 2.0, 3.0, 4.0]);
        let eff = efficiency(&h, true, true).unwrap();
        let got = eff.bin_contents();
        for (g, want) in got.iter().zip([0.1, 0.3, 0.6, 1.0]) {
            assert_relative_eq!(*g, want, epsilon = 1e-12);
        }
        // the input is untouched
        assert_eq!(h.bin_contents(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn zero_integral_stays_unnormalized() {
        let eff = efficiency(&h1(&[0.0, 0.0]), false, true).unwrap();
        assert_eq!(eff.bin_contents(), vec![0.0, 0.0]);
    }

    fn h2() -> Histogram {
        let mut h = Histogram::new_2d("h2", Axis::uniform(2, 0.0, 2.0), Axis::uniform(2, 0.0, 2.0));
        h.path = "/h2".to_string();
        for iy in 1..=2 {
            for ix in 1..=2 {
                let cell = h.cell(ix, iy);
                h.set_bin_content(cell, 10.0);
            }
        }
        h
    }

    #[test]
    fn one_dimensional_operations_reject_2d() {
        let h = h2();
        let err = efficiency(&h, false, false).unwrap_err();
        assert!(err.to_string().contains("/h2"), "err={err}");
        assert!(signal_over_sqrt_total(&h, &h).is_err());
        assert!(bayes_efficiency(&h, &h, 0.683).is_err());
    }

    #[test]
    fn band_sums_and_restyles() {
        let (a, b) = (h1(&[1.0, 2.0]), h1(&[3.0, 4.0]));
        let band = uncertainty_band(&[&a, &b]).unwrap().unwrap();
        assert_eq!(band.bin_contents(), vec![4.0, 6.0]);
        assert_relative_eq!(band.bin_error(2), 6.0f64.sqrt());
        assert_eq!(band.style.fill_style, BAND_FILL_STYLE);
        assert_eq!(band.style.line_width, 0);
        assert_eq!(band.style.marker_size, 0.0);
        assert!(uncertainty_band(&[]).unwrap().is_none());
    }

    #[test]
    fn sqrt_total_matches_closed_form() {
        let s = h1(&[4.0, 0.0]);
        let b = h1(&[12.0, 0.0]);
        let out = signal_over_sqrt_total(&s, &b).unwrap();
        assert_relative_eq!(out.bin_content(1), 1.0);
        assert_eq!(out.bin_content(2), 0.0);
        assert_eq!(out.y_title, SQRT_TOTAL_TITLE);
    }

    #[test]
    fn sqrt_total_drops_errors() {
        let out = signal_over_sqrt_total(&h1(&[4.0]), &h1(&[12.0])).unwrap();
        assert_eq!(out.bin_error(1), 0.0);
    }

    #[test]
    fn signal_over_background_divides() {
        let out = signal_over_background(&h1(&[2.0, 3.0]), &h1(&[4.0, 0.0])).unwrap();
        assert_eq!(out.bin_contents(), vec![0.5, 0.0]);
    }

    #[test]
    fn binomial_efficiency_cases() {
        assert_eq!(binomial_efficiency((0.0, 0.0), (0.0, 0.0)), (0.0, 0.0));
        let (eff, err) = binomial_efficiency((50.0, 5.0), (100.0, 10.0));
        assert_relative_eq!(eff, 0.5);
        assert_abs_diff_eq!(err, (100.0 * 5.0 - 50.0 * 10.0) / 100.0f64.powi(2));

        let (eff, err) = binomial_efficiency((30.0, 3.0), (60.0, 4.0));
        assert_relative_eq!(eff, 0.5);
        assert_relative_eq!(err, (60.0 * 3.0 - 30.0 * 4.0) / 3600.0);
    }

    #[test]
    fn bayes_efficiency_brackets_the_mode() {
        let pass = h1(&[5.0, 0.0, 10.0, 0.0]);
        let total = h1(&[10.0, 10.0, 10.0, 0.0]);
        let points = bayes_efficiency(&pass, &total, 0.683).unwrap();
        assert_eq!(points.len(), 3);

        let half = points[0];
        assert_relative_eq!(half.x, 0.5);
        assert_relative_eq!(half.y, 0.5);
        assert!(half.y_err_lo > 0.0 && half.y_err_hi > 0.0);
        // symmetric posterior, symmetric interval
        assert_relative_eq!(half.y_err_lo, half.y_err_hi, epsilon = 1e-4);

        assert_eq!(points[1].y, 0.0);
        assert_eq!(points[1].y_err_lo, 0.0);
        assert!(points[1].y_err_hi > 0.0);

        assert_eq!(points[2].y, 1.0);
        assert_eq!(points[2].y_err_hi, 0.0);
    }

    #[test]
    fn bayes_efficiency_rejects_bad_level() {
        let h = h1(&[1.0]);
        assert!(bayes_efficiency(&h, &h, 1.5).is_err());
    }

    #[test]
    fn data_minus_background_ratio() {
        let out = data_minus_bg_over_bg(&h1(&[6.0, 1.0]), &h1(&[4.0, 0.0])).unwrap();
        assert_eq!(out.bin_contents(), vec![0.5, 0.0]);
        assert_eq!(out.style.marker_style, 20);
        assert_eq!(ratio(&h1(&[2.0]), &h1(&[4.0])).unwrap().bin_content(1), 0.5);
    }
}
