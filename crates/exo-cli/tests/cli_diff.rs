use std::path::{Path, PathBuf};
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
        "exo_cli_diff_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn hist(name: &str, bins: &[f64]) -> Histogram {
    Histogram::from_contents(name, Axis::uniform(bins.len(), 0.0, 4.0), bins).unwrap()
}

fn write(path: &Path, hists: &[Histogram]) {
    let mut builder = FileBuilder::new().with("jet1", &hist("pt", &[1.0, 2.0]));
    for h in hists {
        builder = builder.with("", h);
    }
    builder.write_to(path).unwrap();
}

fn report(out: &Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!("stdout is not JSON ({e}), stderr={}", String::from_utf8_lossy(&out.stderr))
    })
}

fn names(v: &serde_json::Value) -> Vec<&str> {
    v.as_array().unwrap().iter().map(|s| s.as_str().unwrap()).collect()
}

#[test]
fn exclusive_keys_and_changed_integrals_exit_one() {
    let dir = tmp_dir("differ");
    let (a, b) = (dir.join("a.root"), dir.join("b.root"));
    write(&a, &[hist("mttbar", &[1.0, 2.0, 3.0, 4.0]), hist("njets", &[5.0, 6.0])]);
    write(&b, &[hist("mttbar", &[1.0, 2.0, 3.0, 6.0]), hist("met", &[1.0])]);

    let out = run(&["diff", a.to_str().unwrap(), b.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let v = report(&out);
    assert_eq!(v["different"], true);
    assert_eq!(names(&v["only_in_a"]), vec!["njets"]);
    assert_eq!(names(&v["only_in_b"]), vec!["met"]);
    assert_eq!(names(&v["common"]), vec!["jet1", "mttbar"]);

    let changed = v["changed"].as_array().unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0]["key"], "mttbar");
    assert_eq!(changed[0]["integral_a"], 10.0);
    assert_eq!(changed[0]["integral_b"], 12.0);
}

#[test]
fn identical_files_exit_zero_without_channel_config() {
    let dir = tmp_dir("same");
    let (a, b) = (dir.join("a.root"), dir.join("b.root"));
    let plots = [hist("mttbar", &[1.0, 2.0, 3.0, 4.0])];
    write(&a, &plots);
    write(&b, &plots);

    // an empty application config defines no channel or plot config
    let app = dir.join("template.yaml");
    std::fs::write(&app, "{}\n").unwrap();
    let (a, b, app) = (a.to_str().unwrap(), b.to_str().unwrap(), app.to_str().unwrap());
    let out = run(&["diff", "--config", app, a, b]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let v = report(&out);
    assert_eq!(v["different"], false);
    assert!(v["only_in_a"].as_array().unwrap().is_empty());
    assert!(v["changed"].as_array().unwrap().is_empty());
}

#[test]
fn missing_file_is_an_error() {
    let dir = tmp_dir("missing");
    let a = dir.join("a.root");
    write(&a, &[hist("mttbar", &[1.0])]);

    let missing = dir.join("nope.root");
    let out = run(&["diff", a.to_str().unwrap(), missing.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to open"), "stderr={stderr}");
    assert!(stderr.contains("nope.root"), "stderr={stderr}");
}
