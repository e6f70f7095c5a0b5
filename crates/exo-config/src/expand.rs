//! Channel abbreviations and the channel expander.
//!
//! A requested channel name is either a literal channel or an abbreviation
//! token standing for every declared channel its matcher accepts. The
//! built-in tokens are:
//!
//! | token    | channels                                   |
//! |----------|--------------------------------------------|
//! | `zp`     | narrow Z' (`zprime_m1000_w10`)             |
//! | `zpwide` | wide Z' (`zprime_m1000_w100`)              |
//! | `kk`     | KK gluon (`kkgluon_m1000`)                 |
//! | `mc`     | `ttbar`, `wb`, `wc`, `wlight`, `stop`      |
//!
//! A config with an `expand:` section replaces the table with its own
//! token → regular expression map.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::channel::ChannelConfig;
use crate::error::{ConfigError, Result};

static NARROW_ZPRIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^zprime_m(\d{2})\d{2}_w(\d{2})$").expect("invalid narrow Z' regex")
});

static WIDE_ZPRIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^zprime_m(\d{3})\d_w(\d{3})$").expect("invalid wide Z' regex")
});

static KK_GLUON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^kkgluon_m\d{4}$").expect("invalid KK gluon regex"));

/// Built-in abbreviation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abbreviation {
    /// `zp`: Z' with 1% width; the width equals the first two mass digits.
    NarrowZprime,
    /// `zpwide`: Z' with 10% width; the width equals the first three mass digits.
    WideZprime,
    /// `kk`: Kaluza-Klein gluon mass points.
    KkGluon,
    /// `mc`: nominal Monte-Carlo backgrounds.
    MonteCarlo,
}

const MONTE_CARLO: &[&str] = &["ttbar", "wb", "wc", "wlight", "stop"];

impl Abbreviation {
    /// Every built-in token, in table order.
    pub const ALL: [Abbreviation; 4] =
        [Self::NarrowZprime, Self::WideZprime, Self::KkGluon, Self::MonteCarlo];

    /// Token as written on the command line.
    pub fn token(self) -> &'static str {
        match self {
            Self::NarrowZprime => "zp",
            Self::WideZprime => "zpwide",
            Self::KkGluon => "kk",
            Self::MonteCarlo => "mc",
        }
    }

    /// Look a token up in the built-in table.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.token() == token)
    }

    /// Whether `channel` belongs to this abbreviation.
    pub fn matches(self, channel: &str) -> bool {
        match self {
            Self::NarrowZprime => width_matches_mass(&NARROW_ZPRIME, channel),
            Self::WideZprime => width_matches_mass(&WIDE_ZPRIME, channel),
            Self::KkGluon => KK_GLUON.is_match(channel),
            Self::MonteCarlo => MONTE_CARLO.contains(&channel),
        }
    }
}

fn width_matches_mass(re: &Regex, channel: &str) -> bool {
    re.captures(channel).is_some_and(|c| {
        let mass_prefix = c.get(1).map(|m| m.as_str());
        mass_prefix.is_some() && mass_prefix == c.get(2).map(|m| m.as_str())
    })
}

/// How an abbreviation selects channels.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// A built-in token.
    Builtin(Abbreviation),
    /// A configured pattern, anchored at the start of the name.
    Pattern(Regex),
}

impl Matcher {
    /// Whether `channel` is selected.
    pub fn matches(&self, channel: &str) -> bool {
        match self {
            Self::Builtin(a) => a.matches(channel),
            Self::Pattern(re) => re.is_match(channel),
        }
    }
}

/// A requested channel name, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRequest {
    /// A concrete channel name.
    Literal(String),
    /// An abbreviation token.
    Abbreviation(String),
}

/// The token → matcher table in effect for one config.
#[derive(Debug, Clone)]
pub struct AbbreviationTable {
    entries: Vec<(String, Matcher)>,
}

impl AbbreviationTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        let entries = Abbreviation::ALL
            .into_iter()
            .map(|a| (a.token().to_string(), Matcher::Builtin(a)))
            .collect();
        Self { entries }
    }

    /// The config's `expand` table, or the built-in one when it has none.
    pub fn for_config(config: &ChannelConfig) -> Result<Self> {
        if config.expand.is_empty() {
            return Ok(Self::builtin());
        }
        let entries = config
            .expand
            .iter()
            .map(|(token, pattern)| {
                let anchored = format!("^(?:{pattern})");
                Regex::new(&anchored)
                    .map(|re| (token.clone(), Matcher::Pattern(re)))
                    .map_err(|source| ConfigError::Pattern { pattern: pattern.clone(), source })
            })
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    /// Matcher of `token`, if it is an abbreviation.
    pub fn get(&self, token: &str) -> Option<&Matcher> {
        self.entries.iter().find(|(t, _)| t == token).map(|(_, m)| m)
    }

    /// Classify a requested name.
    pub fn classify(&self, name: &str) -> ChannelRequest {
        if self.get(name).is_some() {
            ChannelRequest::Abbreviation(name.to_string())
        } else {
            ChannelRequest::Literal(name.to_string())
        }
    }
}

/// Resolve abbreviations in `requested` against `config`.
///
/// The result holds only declared channels with at least one enabled input.
/// Disabled and undeclared channels are dropped with a warning.
pub fn expand(config: &ChannelConfig, requested: &BTreeSet<String>) -> Result<BTreeSet<String>> {
    let table = AbbreviationTable::for_config(config)?;
    Ok(expand_with(&table, config, requested))
}

/// [`expand`] with an already built table.
pub fn expand_with(
    table: &AbbreviationTable,
    config: &ChannelConfig,
    requested: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for name in requested {
        match table.classify(name) {
            ChannelRequest::Literal(name) => {
                out.insert(name);
            }
            ChannelRequest::Abbreviation(token) => {
                let Some(matcher) = table.get(&token) else { continue };
                let matched = config.channel.keys().filter(|c| matcher.matches(c)).cloned();
                out.extend(matched);
            }
        }
    }

    let undeclared: Vec<&str> =
        out.iter().filter(|c| !config.channel.contains_key(*c)).map(String::as_str).collect();
    if !undeclared.is_empty() {
        tracing::warn!(channels = %undeclared.join(","), "removing unsupported channels");
    }
    let disabled: Vec<&str> = out
        .iter()
        .filter(|c| config.channel.contains_key(*c) && !config.is_enabled(c))
        .map(String::as_str)
        .collect();
    if !disabled.is_empty() {
        tracing::warn!(channels = %disabled.join(","), "channels have all inputs turned off");
    }

    out.into_iter().filter(|c| config.is_enabled(c)).collect()
}

/// Split values into `(use, ban)`; a leading `-` bans.
pub fn split_use_and_ban<'a, I>(values: I) -> (BTreeSet<String>, BTreeSet<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut use_ = BTreeSet::new();
    let mut ban = BTreeSet::new();
    for value in values {
        match value.strip_prefix('-') {
            Some(banned) => ban.insert(banned.to_string()),
            None => use_.insert(value.to_string()),
        };
    }
    (use_, ban)
}

/// Resolve a comma separated selection such as `zp,mc,-zprime_m1000_w10`.
///
/// Both sides are expanded; the result is `use − ban` and must not be empty.
pub fn select(config: &ChannelConfig, selection: &str) -> Result<BTreeSet<String>> {
    let table = AbbreviationTable::for_config(config)?;
    let values = selection.split(',').map(str::trim).filter(|s| !s.is_empty());
    let (use_, ban) = split_use_and_ban(values);
    let banned = expand_with(&table, config, &ban);
    let selected: BTreeSet<String> =
        expand_with(&table, config, &use_).difference(&banned).cloned().collect();
    if selected.is_empty() {
        return Err(ConfigError::NoChannels(selection.to_string()));
    }
    let names: Vec<&str> = selected.iter().map(String::as_str).collect();
    tracing::info!(channels = %names.join(","), "selected channels");
    Ok(selected)
}
