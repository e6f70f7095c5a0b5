//! # exo-config
//!
//! YAML configuration for the exo template tools: channel/input
//! declarations with abbreviation expansion, per-channel scale factors, plot
//! settings, the application config and plot path patterns.
//!
//! ```no_run
//! let config = exo_config::channel::load("channel.yaml").unwrap();
//! let channels = exo_config::expand::select(&config, "zp,mc,-zprime_m1000_w10").unwrap();
//! assert!(!channels.is_empty());
//! ```

#![warn(missing_docs)]

pub mod app;
pub mod channel;
pub mod error;
pub mod expand;
pub mod pattern;
pub mod plot;
pub mod scale;
mod yaml;

pub use app::AppConfig;
pub use channel::{Channel, ChannelConfig, Input};
pub use error::{ConfigError, Result};
pub use expand::{
    Abbreviation, AbbreviationTable, ChannelRequest, expand, select, split_use_and_ban,
};
pub use pattern::PlotPatterns;
pub use plot::{AxisSpec, PlotConfig, PlotEntry};
pub use scale::ScaleTable;

#[cfg(test)]
mod tests;
