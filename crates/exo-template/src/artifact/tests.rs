use super::*;
use approx::assert_relative_eq;
use exo_root::Axis;

const CHANNELS: &str = r#"
luminosity: 1.0
input:
  - {name: tt}
  - {name: w1}
  - {name: w2}
  - {name: zp}
  - {name: dt}
channel:
  - {name: ttbar, color: [2], inputs: [tt], legend: "QCD t#bar{t}", fill: true}
  - {name: wb, color: [3], inputs: [w1], legend: "W+b", fill: true}
  - {name: wc, color: [4], inputs: [w2], legend: "W+c", fill: true}
  - {name: zprime_m1000_w10, color: [6], inputs: [zp], legend: "Z' 1 TeV"}
  - {name: data, color: [1], inputs: [dt], legend: Data}
order: [data, zprime_m1000_w10, ttbar, wb, wc]
"#;

fn config() -> ChannelConfig {
    exo_config::channel::parse(CHANNELS).unwrap()
}

fn h1(bins: &[f64]) -> Histogram {
    let x = Axis::uniform(bins.len(), 0.0, bins.len() as f64);
    Histogram::from_contents("h", x, bins).unwrap()
}

fn channels(entries: &[(&str, &[f64])]) -> ChannelPlots {
    entries.iter().map(|(c, bins)| (c.to_string(), h1(bins))).collect()
}

#[test]
fn comparison_stacks_in_reverse_legend_order() {
    let config = config();
    let classifier = Classifier::new(&config).unwrap();
    let plot = channels(&[
        ("ttbar", &[4.0, 1.0]),
        ("wb", &[2.0, 1.0]),
        ("wc", &[1.0, 1.0]),
        ("zprime_m1000_w10", &[0.5, 9.0]),
        ("data", &[8.0, 2.0]),
    ]);

    let cmp = comparison("/mttbar", &plot, &config, &classifier).unwrap();
    assert_eq!(cmp.stack_order, vec!["wc", "wb", "ttbar"]);
    assert_eq!(cmp.background[2].legend, "QCD t#bar{t}");
    assert_eq!(cmp.signal.len(), 1);
    assert_eq!(cmp.data.as_ref().unwrap().y, vec![8.0, 2.0]);

    // tallest: signal bin 2
    assert_relative_eq!(cmp.y_max, 1.2 * 9.0);
    assert_eq!(cmp.y_min, 0.0);

    let band = cmp.band.as_ref().unwrap();
    assert_relative_eq!(band.lo[0], 7.0 - 7.0f64.sqrt());
    assert_relative_eq!(band.hi[0], 7.0 + 7.0f64.sqrt());

    let ratio = cmp.ratio.as_ref().unwrap();
    // (8 - 7) / 7 and (2 - 3) / 3
    assert_relative_eq!(ratio.series.y[0], 1.0 / 7.0);
    assert_relative_eq!(ratio.series.y[1], -1.0 / 3.0);
    assert_eq!(ratio.y_title, RATIO_TITLE);
    assert_eq!(ratio.y_range, (-1.0, 1.0));
}

#[test]
fn comparison_without_data_has_no_ratio() {
    let config = config();
    let classifier = Classifier::new(&config).unwrap();
    let plot = channels(&[("ttbar", &[4.0]), ("wb", &[2.0])]);
    let cmp = comparison("/njets", &plot, &config, &classifier).unwrap();
    assert!(cmp.data.is_none());
    assert!(cmp.ratio.is_none());
    assert_relative_eq!(cmp.y_max, 1.2 * 6.0);
}

#[test]
fn significance_over_sqrt_total() {
    let config = config();
    let plot = channels(&[("zprime_m1000_w10", &[4.0]), ("wb", &[12.0]), ("ttbar", &[100.0])]);
    let sb = significance("/mttbar", &plot, &config, Transform::SOverSqrtSPlusB).unwrap();
    assert_eq!(sb.background_channels, vec!["wb"]);
    assert_relative_eq!(sb.signal[0].y[0], 1.0);
    assert_eq!(sb.signal[0].yerr[0], 0.0);
    assert_eq!(sb.axis.y_title, crate::stats::SQRT_TOTAL_TITLE);
}

#[test]
fn significance_over_background_uses_cumulative_counts() {
    let config = config();
    let plot = channels(&[
        ("zprime_m1000_w10", &[1.0, 3.0]),
        ("wb", &[4.0, 2.0]),
        ("wc", &[2.0, 2.0]),
    ]);
    let sb = significance("/mttbar", &plot, &config, Transform::SOverB).unwrap();
    // signal above bins: 4, 3; background: 10, 4
    assert_relative_eq!(sb.signal[0].y[0], 0.4);
    assert_relative_eq!(sb.signal[0].y[1], 0.75);
    assert_eq!(sb.axis.y_title, SB_TITLE);
}

#[test]
fn significance_needs_signal_and_background() {
    let config = config();
    let err = significance("/m", &channels(&[("wb", &[1.0])]), &config, Transform::SOverB)
        .unwrap_err();
    assert!(matches!(err, TemplateError::NoSignal(_)));

    let only_signal = channels(&[("zprime_m1000_w10", &[1.0])]);
    let err = significance("/m", &only_signal, &config, Transform::SOverB).unwrap_err();
    assert!(matches!(err, TemplateError::NoBackground(_)));
}

#[test]
fn significance_artifact_skips_2d_plots() {
    let config = config();
    let mut templates = Templates::new();
    for (channel, v) in [("ttbar", 4.0), ("zprime_m1000_w10", 1.0)] {
        let mut m = h1(&[v, v]);
        m.path = "/mttbar".to_string();
        let mut h2 =
            Histogram::new_2d("h2", Axis::uniform(2, 0.0, 2.0), Axis::uniform(2, 0.0, 2.0));
        h2.path = "/pt_vs_eta".to_string();
        templates.insert(
            channel,
            [("/mttbar".to_string(), m), ("/pt_vs_eta".to_string(), h2)].into_iter().collect(),
        );
    }

    let art = significance_artifact(&templates, &config, Transform::SOverB, None).unwrap();
    let plots: Vec<&str> = art.plots.iter().map(|p| p.plot.as_str()).collect();
    assert_eq!(plots, vec!["/mttbar"]);
}

#[test]
fn efficiency_pairs_pass_and_total() {
    let config = config();
    let mut templates = Templates::new();
    for (channel, pass, total) in [("ttbar", 5.0, 10.0), ("data", 2.0, 4.0)] {
        let mut p = h1(&[pass]);
        p.path = "/pass".to_string();
        let mut t = h1(&[total]);
        t.path = "/total".to_string();
        templates.insert(
            channel,
            [("/pass".to_string(), p), ("/total".to_string(), t)].into_iter().collect(),
        );
    }

    let art = efficiency_artifact(&templates, &config, "/pass", "/total", 0.683, None).unwrap();
    let names: Vec<&str> = art.channels.iter().map(|c| c.channel.as_str()).collect();
    assert_eq!(names, vec!["data", "ttbar"]);
    assert_relative_eq!(art.channels[0].points[0].y, 0.5);

    let missing = efficiency_artifact(&templates, &config, "/nope", "/total", 0.683, None);
    assert!(matches!(missing, Err(TemplateError::MissingPlot(_))));
}

#[test]
fn artifact_json_shape() {
    let config = config();
    let classifier = Classifier::new(&config).unwrap();
    let mut templates = Templates::new();
    for (channel, v) in [("ttbar", 2.0), ("data", 3.0)] {
        let mut h = h1(&[v]);
        h.path = "/mttbar".to_string();
        templates.insert(channel, [("/mttbar".to_string(), h)].into_iter().collect());
    }
    let art = templates_artifact(&templates, &config, &classifier, Some("CMS".into())).unwrap();
    let json: serde_json::Value = serde_json::from_str(&to_json(&art).unwrap()).unwrap();
    assert_eq!(json["schema_version"], TEMPLATES_SCHEMA);
    assert_eq!(json["meta"]["label"], "CMS");
    assert_eq!(json["plots"][0]["plot"], "/mttbar");
    assert_eq!(json["plots"][0]["stack_order"][0], "ttbar");
    assert!(json["plots"][0].get("ratio").is_some());
}
