//! Resolution of command-line options against the application config.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use exo_config::{AppConfig, ChannelConfig, PlotConfig, PlotPatterns, ScaleTable};
use exo_template::{ChannelLoader, Classifier, RootFileSource, Templates};

/// Options shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalOptions {
    /// Application config [default: ~/.exo/template.yaml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Channel config (overrides `template.channel`)
    #[arg(long, global = true)]
    pub channel_config: Option<PathBuf>,

    /// Plot config (overrides `template.plot`)
    #[arg(long, global = true)]
    pub plot_config: Option<PathBuf>,

    /// Per-channel scale factors
    #[arg(long, global = true)]
    pub channel_scale: Option<PathBuf>,

    /// Comma separated channels; `-name` bans a channel
    #[arg(long, global = true, default_value = "mc,data")]
    pub channels: String,

    /// Comma separated plot globs, e.g. `/jet*/pt,/met`
    #[arg(long, global = true)]
    pub plots: Option<String>,

    /// Input file prefix; files are `{prefix}.{input}.root`
    #[arg(long, global = true, default_value = "cms.2011")]
    pub prefix: String,

    /// Extra background error, in percent of the bin content
    #[arg(long, global = true)]
    pub bg_error: Option<f64>,

    /// Free-form label stored in artifact metadata
    #[arg(long, global = true)]
    pub label: Option<String>,

    /// Do not print the plot summary
    #[arg(short, long, global = true)]
    pub batch: bool,

    /// Debug logging and full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Load the application config named on the command line, or the default one.
///
/// An explicit path must exist; the default location is optional.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => exo_config::app::load(p)
            .with_context(|| format!("failed to load application config {}", p.display())),
        None => {
            let default = exo_config::app::expand_home(exo_config::app::DEFAULT_APP_CONFIG);
            Ok(exo_config::app::load_or_default(default)?)
        }
    }
}

/// Everything a subcommand needs to load templates.
#[derive(Debug)]
pub struct Session {
    pub config: ChannelConfig,
    plots: Option<PlotConfig>,
    pub scale: Option<ScaleTable>,
    pub channels: BTreeSet<String>,
    pub prefix: String,
    pub bg_error: Option<f64>,
    pub label: Option<String>,
    pub batch: bool,
}

impl Session {
    /// Command-line values win over the application config.
    pub fn resolve(opts: &GlobalOptions, app: &AppConfig) -> Result<Self> {
        let channel_path = opts
            .channel_config
            .clone()
            .or_else(|| app.channel_path())
            .context("channel config is not defined")?;
        let config = exo_config::channel::load(&channel_path)
            .with_context(|| format!("failed to load channel config {}", channel_path.display()))?;

        let plots = match opts.plot_config.clone().or_else(|| app.plot_path()) {
            Some(path) => Some(
                exo_config::plot::load(&path)
                    .with_context(|| format!("failed to load plot config {}", path.display()))?,
            ),
            None => None,
        };

        let scale = match &opts.channel_scale {
            Some(path) => Some(
                exo_config::scale::load(path, &config)
                    .with_context(|| format!("failed to load channel scale {}", path.display()))?,
            ),
            None => None,
        };

        if opts.channels.trim().is_empty() {
            anyhow::bail!("no channels are specified");
        }
        let channels = exo_config::select(&config, &opts.channels)?;

        if let Some(p) = opts.bg_error
            && !(p.is_finite() && p >= 0.0)
        {
            anyhow::bail!("background error must be a non-negative percentage, got {p}");
        }

        tracing::debug!(
            channel_config = %channel_path.display(),
            prefix = %opts.prefix,
            channels = channels.len(),
            "session resolved"
        );
        Ok(Self {
            config,
            plots,
            scale,
            channels,
            prefix: opts.prefix.clone(),
            bg_error: opts.bg_error,
            label: opts.label.clone(),
            batch: opts.batch || app.core.batch,
        })
    }

    /// Plot config; required by every command that loads histograms.
    pub fn plots(&self) -> Result<&PlotConfig> {
        self.plots.as_ref().context("plot config is not defined")
    }

    /// Classifier for the selected channel config.
    pub fn classifier(&self) -> Result<Classifier> {
        Ok(Classifier::new(&self.config)?)
    }

    /// Load every selected channel from `{prefix}.{input}.root` files.
    pub fn load(&self, patterns: &PlotPatterns) -> Result<Templates> {
        let plots = self.plots()?;
        let source = RootFileSource;
        let mut loader = ChannelLoader::new(&source, &self.prefix);
        if let Some(scale) = &self.scale {
            loader = loader.with_scale(scale);
        }
        let templates = Templates::load(&loader, &self.config, plots, &self.channels, patterns)?;
        if templates.is_empty() {
            tracing::warn!(plots = %patterns.globs().join(","), "no plots matched");
        }
        Ok(templates)
    }
}
