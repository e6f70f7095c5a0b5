//! # exo-template
//!
//! Channel templates for resonance searches: loads the histograms of every
//! input of a channel, normalizes them to the luminosity and sums them, then
//! derives the numbers the comparison plots need (stacked backgrounds,
//! uncertainty bands, data/MC ratios, S/B curves, efficiencies and cutflow
//! tables).
//!
//! ```no_run
//! use exo_config::PlotPatterns;
//! use exo_template::{ChannelLoader, RootFileSource};
//!
//! let config = exo_config::channel::load("channel.yaml").unwrap();
//! let plots = exo_config::plot::load("plot.yaml").unwrap();
//! let loader = ChannelLoader::new(&RootFileSource, "cms.2011");
//! let ttbar = loader.load(&config, &plots, "ttbar", &PlotPatterns::all()).unwrap();
//! println!("{} plots", ttbar.len());
//! ```

#![warn(missing_docs)]

pub mod artifact;
pub mod cutflow;
pub mod error;
pub mod loader;
pub mod rebin;
pub mod source;
pub mod stats;
pub mod templates;

pub use error::{Result, TemplateError};
pub use loader::{ChannelLoader, add_percent_error};
pub use source::{HistogramSource, MemorySource, PlotMap, RootFileSource};
pub use templates::{ChannelKind, Classifier, Templates};
