use std::collections::BTreeSet;

use super::*;

const CHANNELS: &str = r#"
luminosity: 4683.0
input:
  - {name: ttbar_powheg, xsection: 157.5, events: 16330000, enable: true}
  - {name: wjets_madgraph, xsection: 31314.0, events: 77105816, enable: true}
  - {name: stop_s, xsection: 3.19, events: 259971, enable: false}
  - {name: zprime_m1000_w10, xsection: 1.0, events: 200000, enable: true}
  - {name: zprime_m1500_w15, xsection: 1.0, events: 200000, enable: true}
  - {name: zprime_m2000_w20, xsection: 1.0, events: 200000, enable: false}
  - {name: zprime_m1000_w100, xsection: 1.0, events: 200000, enable: true}
  - {name: kkgluon_m1000, xsection: 1.0, events: 100000, enable: true}
  - {name: data_2011a, enable: true}
  - {name: data_2011b, enable: true}
channel:
  - {name: ttbar, color: [2], inputs: [ttbar_powheg], legend: "QCD t#bar{t}", fill: true}
  - {name: wjets, color: [800, -3], inputs: [wjets_madgraph], legend: "W#rightarrowl#nu", fill: true}
  - {name: stop, color: [6], inputs: [stop_s], legend: "Single-Top", fill: true}
  - {name: zprime_m1000_w10, color: [1], inputs: [zprime_m1000_w10], legend: "Z' 1 TeV", line: 2}
  - {name: zprime_m1500_w15, color: [1], inputs: [zprime_m1500_w15], legend: "Z' 1.5 TeV", line: 3}
  - {name: zprime_m2000_w20, color: [1], inputs: [zprime_m2000_w20], legend: "Z' 2 TeV"}
  - {name: zprime_m1000_w100, color: [4], inputs: [zprime_m1000_w100], legend: "wide Z'"}
  - {name: kkgluon_m1000, color: [7], inputs: [kkgluon_m1000], legend: "KK gluon"}
  - {name: data, color: [1], inputs: [data_2011a, data_2011b], legend: "CMS Data 2011"}
order: [data, ttbar, wjets, stop, zprime_m1000_w10]
"#;

fn config() -> ChannelConfig {
    channel::parse(CHANNELS).unwrap()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn tmp_path(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("exo_config_{}_{}_{}", std::process::id(), nanos, name))
}

// ---------------------------------------------------------------------------
// Config loader
// ---------------------------------------------------------------------------

#[test]
fn load_sums_colors_and_keys_by_name() {
    let cfg = config();
    assert_eq!(cfg.luminosity, 4683.0);
    assert_eq!(cfg.channel["wjets"].color, 797);
    assert_eq!(cfg.channel["data"].inputs, vec!["data_2011a", "data_2011b"]);
    assert_eq!(cfg.channel["zprime_m1000_w10"].line, Some(2));
    assert!(cfg.channel["ttbar"].fill);
    assert_eq!(cfg.input.len(), 10);
    assert!(!cfg.input["stop_s"].enable);
}

#[test]
fn order_with_undeclared_channel_fails() {
    let text = r#"
luminosity: 1.0
input:
  - {name: i1, enable: true}
  - {name: i2, enable: true}
channel:
  - {name: a, color: [1], inputs: [i1]}
  - {name: b, color: [2], inputs: [i2]}
order: [a, c]
"#;
    match channel::parse(text) {
        Err(ConfigError::UndefinedOrder(names)) => assert_eq!(names, vec!["c"]),
        other => panic!("expected UndefinedOrder, got {other:?}"),
    }
}

#[test]
fn channel_without_color_fails() {
    let text = "luminosity: 1\ninput: [{name: i1}]\nchannel: [{name: a, inputs: [i1]}]\n";
    assert!(matches!(
        channel::parse(text),
        Err(ConfigError::MissingField { field: "color", .. })
    ));
}

#[test]
fn channel_with_undeclared_input_fails() {
    let text =
        "luminosity: 1\ninput: [{name: i1}]\nchannel: [{name: a, color: [1], inputs: [i9]}]\n";
    assert!(matches!(channel::parse(text), Err(ConfigError::UndefinedInput { .. })));
}

#[test]
fn duplicate_channel_fails() {
    let text = "luminosity: 1
input: [{name: i1}]
channel:
  - {name: a, color: [1], inputs: [i1]}
  - {name: a, color: [2], inputs: [i1]}
";
    assert!(matches!(
        channel::parse(text),
        Err(ConfigError::DuplicateName { kind: "channel", .. })
    ));
}

#[test]
fn missing_and_empty_files_fail() {
    assert!(matches!(channel::load("/no/such/channel.yaml"), Err(ConfigError::Missing(_))));

    let path = tmp_path("empty.yaml");
    std::fs::write(&path, "\n").unwrap();
    assert!(matches!(channel::load(&path), Err(ConfigError::Empty(_))));
    std::fs::remove_file(&path).ok();
}

#[test]
fn normalized_form_round_trips() {
    let first = config();
    let text = channel::to_yaml(&first).unwrap();
    let second = channel::parse_normalized(&text).unwrap();
    assert_eq!(first, second);
    assert_eq!(channel::to_yaml(&second).unwrap(), text);

    let path = tmp_path("normalized.yaml");
    std::fs::write(&path, &text).unwrap();
    assert_eq!(channel::load_normalized(&path).unwrap(), first);
    std::fs::remove_file(&path).ok();
}

#[test]
fn input_normalization_needs_both_values() {
    let cfg = config();
    let w = cfg.input["ttbar_powheg"].normalization(cfg.luminosity).unwrap();
    approx_eq(w, 157.5 * 4683.0 / 16_330_000.0);
    assert_eq!(cfg.input["data_2011a"].normalization(cfg.luminosity), None);
}

fn approx_eq(a: f64, b: f64) {
    assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0), "{a} != {b}");
}

#[test]
fn ordered_puts_order_first() {
    let cfg = config();
    let names = ["kkgluon_m1000", "ttbar", "data", "wjets"];
    assert_eq!(cfg.ordered(names), vec!["data", "ttbar", "wjets", "kkgluon_m1000"]);
}

// ---------------------------------------------------------------------------
// Channel expander
// ---------------------------------------------------------------------------

#[test]
fn expanding_nothing_yields_nothing() {
    assert!(expand(&config(), &BTreeSet::new()).unwrap().is_empty());
}

#[test]
fn narrow_zprime_requires_width_to_match_mass() {
    let zp = Abbreviation::NarrowZprime;
    assert!(zp.matches("zprime_m1000_w10"));
    assert!(zp.matches("zprime_m1500_w15"));
    assert!(!zp.matches("zprime_m1500_w10"));
    assert!(!zp.matches("zprime_m1000_w100"));
    assert!(Abbreviation::WideZprime.matches("zprime_m1000_w100"));
    assert!(!Abbreviation::WideZprime.matches("zprime_m1000_w10"));
    assert!(Abbreviation::KkGluon.matches("kkgluon_m3000"));
    assert!(Abbreviation::MonteCarlo.matches("wlight"));
    assert!(!Abbreviation::MonteCarlo.matches("wjets"));
    assert_eq!(Abbreviation::from_token("zpwide"), Some(Abbreviation::WideZprime));
}

#[test]
fn abbreviation_skips_channels_with_all_inputs_disabled() {
    let out = expand(&config(), &set(&["zp"])).unwrap();
    assert_eq!(out, set(&["zprime_m1000_w10", "zprime_m1500_w15"]));
}

#[test]
fn literal_disabled_channel_is_excluded_too() {
    let out = expand(&config(), &set(&["stop", "ttbar"])).unwrap();
    assert_eq!(out, set(&["ttbar"]));
}

#[test]
fn unknown_names_are_dropped() {
    let out = expand(&config(), &set(&["ttbar", "qcd", "nope"])).unwrap();
    assert_eq!(out, set(&["ttbar"]));
}

#[test]
fn literal_and_abbreviation_collapse() {
    let out = expand(&config(), &set(&["mc", "ttbar"])).unwrap();
    assert_eq!(out, set(&["ttbar"]));
}

#[test]
fn expansion_never_fabricates_names() {
    let cfg = config();
    let requested = set(&["zp", "zpwide", "kk", "mc", "data", "bogus"]);
    let out = expand(&cfg, &requested).unwrap();
    for name in &out {
        assert!(requested.contains(name) || cfg.channel.contains_key(name), "{name}");
    }
}

#[test]
fn expansion_is_idempotent() {
    let cfg = config();
    let requests = [set(&["zp", "data"]), set(&["mc", "kk", "zpwide"]), set(&["ttbar", "stop"])];
    for requested in requests {
        let once = expand(&cfg, &requested).unwrap();
        assert_eq!(expand(&cfg, &once).unwrap(), once);
    }
}

#[test]
fn config_expand_table_replaces_builtin() {
    let mut cfg = config();
    cfg.expand.insert("signal".into(), r"zprime_m\d+_w\d+$".into());
    let out = expand(&cfg, &set(&["signal", "zp"])).unwrap();
    assert_eq!(out, set(&["zprime_m1000_w10", "zprime_m1000_w100", "zprime_m1500_w15"]));
}

#[test]
fn bad_expand_pattern_is_reported() {
    let mut cfg = config();
    cfg.expand.insert("broken".into(), "zprime_(".into());
    assert!(matches!(expand(&cfg, &set(&["broken"])), Err(ConfigError::Pattern { .. })));
}

#[test]
fn classify_requests() {
    let table = AbbreviationTable::builtin();
    assert_eq!(table.classify("mc"), ChannelRequest::Abbreviation("mc".into()));
    assert_eq!(table.classify("ttbar"), ChannelRequest::Literal("ttbar".into()));
}

#[test]
fn split_use_and_ban_cases() {
    let (use_, ban) = split_use_and_ban([]);
    assert!(use_.is_empty() && ban.is_empty());

    let (use_, ban) = split_use_and_ban(["a", "b"]);
    assert_eq!((use_, ban), (set(&["a", "b"]), set(&[])));

    let (use_, ban) = split_use_and_ban(["-a", "-b"]);
    assert_eq!((use_, ban), (set(&[]), set(&["a", "b"])));

    let (use_, ban) = split_use_and_ban(["-a", "b", "-c", "d"]);
    assert_eq!((use_, ban), (set(&["b", "d"]), set(&["a", "c"])));
}

#[test]
fn select_subtracts_banned_channels() {
    let out = select(&config(), "zp, data, -zprime_m1000_w10").unwrap();
    assert_eq!(out, set(&["data", "zprime_m1500_w15"]));

    let out = select(&config(), "mc,data").unwrap();
    assert_eq!(out, set(&["data", "ttbar"]));
}

#[test]
fn select_with_nothing_left_fails() {
    assert!(matches!(select(&config(), "ttbar,-mc"), Err(ConfigError::NoChannels(_))));
}

// ---------------------------------------------------------------------------
// Scale resolver
// ---------------------------------------------------------------------------

#[test]
fn abbreviation_scale_reaches_every_channel() {
    let scales = scale::parse("zp: 0.5\n", &config()).unwrap();
    assert_eq!(scales.len(), 2);
    assert_eq!(scales.get("zprime_m1000_w10"), Some(0.5));
    assert_eq!(scales.get("zprime_m1500_w15"), Some(0.5));
}

#[test]
fn literal_scale_wins_over_abbreviation() {
    let scales = scale::parse("zp: 0.5\nzprime_m1500_w15: 2.0\nnope: 3\n", &config()).unwrap();
    assert_eq!(scales.get("zprime_m1000_w10"), Some(0.5));
    assert_eq!(scales.get("zprime_m1500_w15"), Some(2.0));
    assert_eq!(scales.get("nope"), None);
}

#[test]
fn empty_scale_file_fails() {
    assert!(matches!(scale::parse("{}", &config()), Err(ConfigError::Empty(_))));
}

// ---------------------------------------------------------------------------
// Plot config
// ---------------------------------------------------------------------------

const PLOTS: &str = r##"
plot:
  - {name: /mttbar, rebin: 2, title: "M_{t#bar{t}}", units: GeV, range: [0, 3000]}
  - {name: /njets, rebin: 1, title: "N_{jets}", units: ~, range: ~}
  - {name: /dr_vs_ptrel, xrebin: 1, yrebin: 2, xtitle: "#Delta R", xunits: ~,
     ytitle: "p_{T}^{rel}", yunits: GeV, yrange: [0, 100]}
unused: 1
"##;

#[test]
fn plot_entries_split_by_dimension() {
    let plots = plot::parse(PLOTS).unwrap();
    assert_eq!(plots.len(), 3);

    let PlotEntry::OneD(m) = plots.get("/mttbar").unwrap() else { panic!("expected 1-D") };
    assert_eq!(m.effective_rebin(), Some(2));
    assert_eq!(m.axis_title().as_deref(), Some("M_{t#bar{t}} [GeV]"));
    assert_eq!(m.range, Some((0.0, 3000.0)));

    let PlotEntry::OneD(n) = plots.get("/njets").unwrap() else { panic!("expected 1-D") };
    assert_eq!(n.effective_rebin(), None);
    assert_eq!(n.axis_title().as_deref(), Some("N_{jets}"));

    let PlotEntry::TwoD { x, y } = plots.get("/dr_vs_ptrel").unwrap() else {
        panic!("expected 2-D")
    };
    assert_eq!(x.axis_title().as_deref(), Some("#Delta R"));
    assert_eq!(y.effective_rebin(), Some(2));
    assert_eq!(y.range, Some((0.0, 100.0)));
    assert_eq!(x.range, None);
}

#[test]
fn plot_range_needs_two_values() {
    let text = "plot:\n  - {name: /a, rebin: 1, range: [1, 2, 3]}\n";
    assert!(matches!(plot::parse(text), Err(ConfigError::InvalidField { .. })));
}

#[test]
fn plot_without_name_fails() {
    let text = "plot:\n  - {rebin: 1}\n";
    assert!(matches!(plot::parse(text), Err(ConfigError::MissingField { field: "name", .. })));
}
