//! exo CLI
//!
//! Builds channel templates from `{prefix}.{input}.root` files and writes the
//! comparison, significance and efficiency artifacts as JSON.

mod diff;
mod session;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use exo_config::{AppConfig, PlotPatterns};
use exo_template::artifact::{self, Transform};
use exo_template::cutflow::{self, CutflowTable, Mode};
use exo_template::rebin;
use exo_template::{TemplateError, Templates};
use serde::Serialize;

use session::{GlobalOptions, Session};

#[derive(Parser)]
#[command(name = "exo")]
#[command(about = "exo - channel templates for resonance searches")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Output file (pretty JSON or text); stdout when omitted
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data/MC comparison of every selected plot
    Templates,

    /// Event yields after each selection stage
    Cutflow {
        /// Table format
        #[arg(long, value_enum, default_value = "text")]
        mode: CutflowFormat,

        /// Append each stage's efficiency relative to the first stage
        #[arg(long)]
        efficiency: bool,
    },

    /// Signal significance over cumulative yields, S/B by default
    Sb {
        /// Use S / sqrt(S + B) instead of S / B
        #[arg(long)]
        sqrt: bool,
    },

    /// Bayesian efficiency of one plot with respect to another
    Efficiency {
        /// Plot of passing events
        #[arg(long)]
        pass: String,

        /// Plot of all events
        #[arg(long)]
        total: String,

        /// Confidence level of the error bars
        #[arg(long, default_value = "0.683")]
        cl: f64,
    },

    /// Comparison of /mttbar_after_htlep, optionally with merged tails
    McStat {
        /// Merge bins outside [0.4, 1.3] TeV
        #[arg(long)]
        rebin: bool,
    },

    /// Selected channels and the normalized channel config
    Channels {
        /// Print the normalized config as YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },

    /// Compare the top-level keys of two ROOT files; exits 1 when they differ
    Diff {
        /// First file
        a: PathBuf,

        /// Second file
        b: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CutflowFormat {
    Text,
    Tex,
}

impl From<CutflowFormat> for Mode {
    fn from(f: CutflowFormat) -> Self {
        match f {
            CutflowFormat::Text => Mode::Text,
            CutflowFormat::Tex => Mode::Tex,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let app = match session::load_app_config(cli.global.config.as_deref()) {
        Ok(app) => app,
        Err(err) => return fail(&err, cli.global.verbose),
    };
    let verbose = cli.global.verbose || app.core.verbose;
    let level = if verbose { cli.log_level.max(tracing::Level::DEBUG) } else { cli.log_level };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli, &app) {
        Ok(code) => code,
        Err(err) => fail(&err, verbose),
    }
}

fn fail(err: &anyhow::Error, verbose: bool) -> ExitCode {
    eprintln!("error: {err:#}");
    if verbose {
        eprintln!("{err:?}");
    }
    ExitCode::FAILURE
}

/// Every command but `diff` needs a resolved session.
fn run(cli: &Cli, app: &AppConfig) -> Result<ExitCode> {
    let output = cli.output.as_ref();
    let plots = cli.global.plots.as_deref();
    let session = || Session::resolve(&cli.global, app);
    match &cli.command {
        Commands::Diff { a, b } => return cmd_diff(a, b, output),
        Commands::Templates => cmd_templates(&session()?, plots, output)?,
        Commands::Cutflow { mode, efficiency } => {
            cmd_cutflow(&session()?, plots, (*mode).into(), *efficiency, output)?
        }
        Commands::Sb { sqrt } => {
            let transform = if *sqrt { Transform::SOverSqrtSPlusB } else { Transform::SOverB };
            cmd_sb(&session()?, plots, transform, output)?
        }
        Commands::Efficiency { pass, total, cl } => {
            cmd_efficiency(&session()?, pass, total, *cl, output)?
        }
        Commands::McStat { rebin } => cmd_mc_stat(&session()?, *rebin, output)?,
        Commands::Channels { yaml } => cmd_channels(&session()?, *yaml, output)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn plot_patterns(plots: Option<&str>) -> Result<PlotPatterns> {
    Ok(match plots {
        Some(list) => PlotPatterns::parse_list(list)?,
        None => PlotPatterns::all(),
    })
}

fn cmd_templates(session: &Session, plots: Option<&str>, output: Option<&PathBuf>) -> Result<()> {
    let patterns = plot_patterns(plots)?;
    let mut templates = session.load(&patterns)?;
    let classifier = session.classifier()?;
    if let Some(percent) = session.bg_error {
        templates.add_background_error(&classifier, percent);
    }

    let out = artifact::templates_artifact(
        &templates,
        &session.config,
        &classifier,
        session.label.clone(),
    )?;
    if !session.batch {
        for plot in &out.plots {
            eprintln!(
                "{}: {} background, {} signal, data: {}",
                plot.plot,
                plot.background.len(),
                plot.signal.len(),
                if plot.data.is_some() { "yes" } else { "no" },
            );
        }
    }
    write_json(output, &out)
}

fn cmd_cutflow(
    session: &Session,
    plots: Option<&str>,
    mode: Mode,
    efficiency: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let plot = match plots {
        None => cutflow::CUTFLOW_PLOT,
        Some(p) => match cutflow::CUTFLOW_PLOTS.iter().copied().find(|c| *c == p.trim()) {
            Some(c) => c,
            None => anyhow::bail!(
                "choose either {} or {} plot, got '{p}'",
                cutflow::CUTFLOW_PLOTS[0],
                cutflow::CUTFLOW_PLOTS[1]
            ),
        },
    };

    let templates = session.load(&PlotPatterns::new([plot])?)?;
    let channels = templates.get(plot).ok_or_else(|| TemplateError::MissingPlot(plot.into()))?;
    let table = CutflowTable::build(&session.config, channels)?;

    let mut text = table.render(mode);
    if efficiency {
        text.push_str(&table.efficiency_summary());
    }
    match output {
        Some(path) => write_json(Some(path), &table)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn cmd_sb(
    session: &Session,
    plots: Option<&str>,
    transform: Transform,
    output: Option<&PathBuf>,
) -> Result<()> {
    let templates = session.load(&plot_patterns(plots)?)?;
    let label = session.label.clone();
    let out = artifact::significance_artifact(&templates, &session.config, transform, label)?;
    write_json(output, &out)
}

fn cmd_efficiency(
    session: &Session,
    pass: &str,
    total: &str,
    cl: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let templates = session.load(&PlotPatterns::new([pass, total])?)?;
    let out = artifact::efficiency_artifact(
        &templates,
        &session.config,
        pass,
        total,
        cl,
        session.label.clone(),
    )?;
    write_json(output, &out)
}

fn cmd_mc_stat(session: &Session, merge_tails: bool, output: Option<&PathBuf>) -> Result<()> {
    let loaded = session.load(&PlotPatterns::new([rebin::MC_STAT_PLOT])?)?;
    let channels = loaded
        .get(rebin::MC_STAT_PLOT)
        .ok_or_else(|| TemplateError::MissingPlot(rebin::MC_STAT_PLOT.into()))?;

    let channels = if merge_tails { rebin::rebin_all(channels)? } else { channels.clone() };
    let mut templates = Templates::new();
    for (channel, h) in channels {
        templates.insert(&channel, [(rebin::MC_STAT_PLOT.to_string(), h)].into_iter().collect());
    }

    let classifier = session.classifier()?;
    if let Some(percent) = session.bg_error {
        templates.add_background_error(&classifier, percent);
    }
    let out = artifact::templates_artifact(
        &templates,
        &session.config,
        &classifier,
        session.label.clone(),
    )?;
    write_json(output, &out)
}

#[derive(Serialize)]
struct ChannelsReport<'a> {
    selected: Vec<&'a str>,
    config: &'a exo_config::ChannelConfig,
}

fn cmd_channels(session: &Session, yaml: bool, output: Option<&PathBuf>) -> Result<()> {
    if yaml {
        let text = exo_config::channel::to_yaml(&session.config)?;
        match output {
            Some(path) => std::fs::write(path, text)?,
            None => print!("{text}"),
        }
        return Ok(());
    }
    let report = ChannelsReport {
        selected: session.config.ordered(session.channels.iter().map(String::as_str)),
        config: &session.config,
    };
    write_json(output, &report)
}

fn cmd_diff(a: &Path, b: &Path, output: Option<&PathBuf>) -> Result<ExitCode> {
    let report = diff::diff(a, b)?;
    write_json(output, &report)?;
    Ok(if report.different { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

fn write_json<T: Serialize>(output: Option<&PathBuf>, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    if let Some(path) = output {
        std::fs::write(path, text)?;
    } else {
        println!("{text}");
    }
    Ok(())
}
