//! Where per-input histograms come from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use exo_config::PlotPatterns;
use exo_root::{Histogram, RootFile};

use crate::error::{Result, TemplateError};

/// Histogram path (`/dir/name`) → histogram.
pub type PlotMap = BTreeMap<String, Histogram>;

/// Loads the histograms of one input.
pub trait HistogramSource {
    /// Histograms of `input` whose paths match `patterns`.
    fn load(&self, prefix: &str, input: &str, patterns: &PlotPatterns) -> Result<PlotMap>;
}

/// `{prefix}.{input}.root` file name.
pub fn input_path(prefix: &str, input: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}.{input}.root"))
}

/// Reads inputs from ROOT files on disk.
///
/// Each call maps its file, walks every directory and drops the mapping
/// before returning, on success and on error alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootFileSource;

impl RootFileSource {
    fn read(path: &Path, patterns: &PlotPatterns) -> exo_root::Result<PlotMap> {
        let file = RootFile::open(path)?;
        let mut plots = PlotMap::new();
        file.visit_histograms(|h| {
            if patterns.matches(&h.path) {
                plots.insert(h.path.clone(), h);
            }
            Ok(())
        })?;
        Ok(plots)
    }
}

impl HistogramSource for RootFileSource {
    fn load(&self, prefix: &str, input: &str, patterns: &PlotPatterns) -> Result<PlotMap> {
        let path = input_path(prefix, input);
        tracing::debug!(path = %path.display(), "load input");
        let plots = Self::read(&path, patterns)
            .map_err(|source| TemplateError::InputFile { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), plots = plots.len(), "input loaded");
        Ok(plots)
    }
}

/// Inputs held in memory, keyed by input name.
///
/// The prefix is ignored. Unknown inputs fail like a missing file would.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inputs: BTreeMap<String, Vec<Histogram>>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a histogram to `input`; its `path` is the key.
    pub fn insert(&mut self, input: &str, h: Histogram) {
        self.inputs.entry(input.to_string()).or_default().push(h);
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(mut self, input: &str, h: Histogram) -> Self {
        self.insert(input, h);
        self
    }
}

impl HistogramSource for MemorySource {
    fn load(&self, prefix: &str, input: &str, patterns: &PlotPatterns) -> Result<PlotMap> {
        let hists = self.inputs.get(input).ok_or_else(|| TemplateError::InputFile {
            path: input_path(prefix, input),
            source: exo_root::RootError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such input",
            )),
        })?;
        Ok(hists
            .iter()
            .filter(|h| patterns.matches(&h.path))
            .map(|h| (h.path.clone(), h.clone()))
            .collect())
    }
}
