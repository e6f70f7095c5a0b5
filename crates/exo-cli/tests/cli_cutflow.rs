use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use exo_root::fixture::FileBuilder;
use exo_root::{Axis, Histogram};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_exo"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "exo_cli_cutflow_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const CHANNELS: &str = r#"
luminosity: 1.0
input:
  - {name: tt, xsection: 1.0, events: 1.0}
  - {name: zp, xsection: 1.0, events: 1.0}
  - {name: dt}
channel:
  - {name: ttbar, color: [2], inputs: [tt], fill: true}
  - {name: zprime_m1000_w10, color: [1], inputs: [zp]}
  - {name: data, color: [1], inputs: [dt]}
order: [data, ttbar, zprime_m1000_w10]
"#;

/// Stage yields at x = 5, 6, 8, 9, 10, 14, 15, 16.
fn cutflow(name: &str, stages: [f64; 8]) -> Histogram {
    let mut bins = [0.0; 20];
    for (x, v) in [5, 6, 8, 9, 10, 14, 15, 16].into_iter().zip(stages) {
        bins[x] = v;
    }
    Histogram::from_contents(name, Axis::uniform(20, 0.0, 20.0), &bins).unwrap()
}

/// Returns the channel config path and the input prefix.
fn setup(name: &str) -> (String, String) {
    let dir = tmp_dir(name);
    let inputs = [
        ("tt", [1000.0, 800.0, 700.0, 600.0, 500.0, 400.0, 300.0, 200.0]),
        ("zp", [100.0, 90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0]),
        ("dt", [1100.0, 850.0, 720.0, 610.0, 520.0, 410.0, 330.0, 240.0]),
    ];
    for (input, stages) in inputs {
        let flow = cutflow("cutflow", stages);
        let unweighted = cutflow("cutflow_no_weight", stages.map(|v| v / 10.0));
        FileBuilder::new()
            .with("", &flow)
            .with("", &unweighted)
            .write_to(dir.join(format!("cms.{input}.root")))
            .unwrap();
    }
    let channel = dir.join("channel.yaml");
    let plot = dir.join("plot.yaml");
    std::fs::write(&channel, CHANNELS).unwrap();
    std::fs::write(&plot, "plot: []\n").unwrap();

    // Keep the user's application config out of the way.
    let app = dir.join("template.yaml");
    std::fs::write(
        &app,
        format!("template:\n  channel: {}\n  plot: {}\n", channel.display(), plot.display()),
    )
    .unwrap();
    (app.display().to_string(), dir.join("cms").display().to_string())
}

fn stdout_of(out: &Output) -> String {
    assert!(
        out.status.success(),
        "exo should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout.clone()).unwrap()
}

#[test]
fn text_table_lists_every_row_per_stage_group() {
    let (app, prefix) = setup("text");
    let text = stdout_of(&run(&[
        "cutflow",
        "--config",
        &app,
        "--prefix",
        &prefix,
        "--channels",
        "ttbar,zp,data",
    ]));

    let lines: Vec<&str> = text.lines().collect();
    // zp, ttbar, Total MC, Data 2011, blank; twice
    assert_eq!(lines.len(), 10, "text={text}");
    assert!(lines[0].starts_with(&format!("{:>20} | ", r"Z' 1 Tev/c\textsuperscript{2}")));
    assert!(lines[1].contains(r"QCD t\bar{t}"));
    assert!(lines[1].contains("    1000 +- 32   "), "line={}", lines[1]);
    assert!(lines[2].trim_start().starts_with("Total MC"));
    assert!(lines[3].trim_start().starts_with("Data 2011"));
    assert!(lines[4].is_empty());
    // second group starts with the leading jet stage
    assert!(lines[6].contains("     500 +- 22   "), "line={}", lines[6]);
}

#[test]
fn tex_rows_end_with_line_breaks() {
    let (app, prefix) = setup("tex");
    let text = stdout_of(&run(&[
        "cutflow",
        "--mode",
        "tex",
        "--config",
        &app,
        "--prefix",
        &prefix,
        "--channels",
        "ttbar,data",
    ]));
    let rows: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(rows.len(), 6);
    for row in rows {
        assert!(row.ends_with(r" \\"), "row={row}");
        assert_eq!(row.matches(" & ").count(), 8, "row={row}");
    }
}

#[test]
fn efficiency_summary_is_appended() {
    let (app, prefix) = setup("efficiency");
    let text = stdout_of(&run(&[
        "cutflow",
        "--efficiency",
        "--config",
        &app,
        "--prefix",
        &prefix,
        "--channels",
        "ttbar",
    ]));
    let last = text.lines().last().unwrap();
    assert!(last.trim_start().starts_with("Total MC"), "last={last}");
    assert!(last.starts_with(&format!("{:>20} | 1.000 +- ", "Total MC")), "last={last}");
    assert!(last.contains("| 0.200 +- "), "last={last}");
}

#[test]
fn efficiency_help_describes_stage_ratios() {
    let help = stdout_of(&run(&["cutflow", "--help"]));
    assert!(help.contains("efficiency relative to the first stage"), "help={help}");
    assert!(!help.contains("final-stage"), "help={help}");
}

#[test]
fn unweighted_cutflow_and_json_output() {
    let (app, prefix) = setup("json");
    let out_path = std::env::temp_dir().join(format!(
        "exo_cli_cutflow_{}_table.json",
        std::process::id()
    ));
    let out = run(&[
        "cutflow",
        "--plots",
        "/cutflow_no_weight",
        "--config",
        &app,
        "--prefix",
        &prefix,
        "--channels",
        "ttbar,zp,data",
        "--output",
        out_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&out_path).unwrap()).unwrap();
    assert_eq!(v["total_mc"]["values"][0], 100.0);
    assert_eq!(v["signal"][0]["channel"], "zprime_m1000_w10");
    assert_eq!(v["background"][0]["channel"], "ttbar");
    assert_eq!(v["data"]["values"][7], 24.0);
}

#[test]
fn other_plots_and_missing_background_are_rejected() {
    let (app, prefix) = setup("errors");

    let out = run(&["cutflow", "--plots", "/mttbar", "--config", &app, "--prefix", &prefix]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("choose either /cutflow or /cutflow_no_weight"), "stderr={stderr}");

    let out = run(&["cutflow", "--config", &app, "--prefix", &prefix, "--channels", "zp,data"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no background"), "stderr={stderr}");
}
