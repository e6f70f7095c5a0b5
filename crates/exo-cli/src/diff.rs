//! Comparison of the top-level keys of two ROOT files.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use exo_root::{KeyInfo, RootFile};
use serde::Serialize;

/// A histogram present in both files whose integrals differ.
#[derive(Debug, Serialize)]
pub struct IntegralChange {
    pub key: String,
    pub integral_a: f64,
    pub integral_b: f64,
}

/// Key sets of two files and the common histograms that changed.
#[derive(Debug, Serialize)]
pub struct FileDiff {
    pub a: String,
    pub b: String,
    pub different: bool,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub common: Vec<String>,
    pub changed: Vec<IntegralChange>,
}

fn top_keys(file: &RootFile) -> Result<BTreeMap<String, KeyInfo>> {
    Ok(file.list_keys()?.into_iter().map(|k| (k.name.clone(), k)).collect())
}

fn open(path: &Path) -> Result<RootFile> {
    RootFile::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Compare the top directories of `a` and `b`.
///
/// Only top-level keys are listed. Common keys holding histograms in both
/// files are read and compared by integral; other objects count as equal.
pub fn diff(a: &Path, b: &Path) -> Result<FileDiff> {
    let (file_a, file_b) = (open(a)?, open(b)?);
    let (keys_a, keys_b) = (top_keys(&file_a)?, top_keys(&file_b)?);

    let only_in_a: Vec<String> =
        keys_a.keys().filter(|k| !keys_b.contains_key(*k)).cloned().collect();
    let only_in_b: Vec<String> =
        keys_b.keys().filter(|k| !keys_a.contains_key(*k)).cloned().collect();

    let mut common = Vec::new();
    let mut changed = Vec::new();
    for (name, key_a) in &keys_a {
        let Some(key_b) = keys_b.get(name) else {
            continue;
        };
        common.push(name.clone());
        if !(key_a.is_histogram() && key_b.is_histogram()) {
            continue;
        }
        let integral_a = file_a.get_histogram(name)?.integral();
        let integral_b = file_b.get_histogram(name)?.integral();
        if integral_a != integral_b {
            tracing::debug!(key = %name, integral_a, integral_b, "integrals differ");
            changed.push(IntegralChange { key: name.clone(), integral_a, integral_b });
        }
    }

    let different = !(only_in_a.is_empty() && only_in_b.is_empty() && changed.is_empty());
    Ok(FileDiff {
        a: a.display().to_string(),
        b: b.display().to_string(),
        different,
        only_in_a,
        only_in_b,
        common,
        changed,
    })
}
