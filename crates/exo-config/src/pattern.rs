//! Shell-style plot path patterns.
//!
//! | glob      | meaning                                   |
//! |-----------|-------------------------------------------|
//! | `*`       | any run of word characters                |
//! | `?`       | one word character                        |
//! | `[a-d]`   | one character of the class                |
//! | `[!a-c]`  | one character outside the class           |
//! | `{ab,cd}` | either alternative                        |
//!
//! Patterns match the full histogram path, e.g. `/jet?/pt` matches
//! `/jet1/pt` but not `/jet3a/pt`.

use regex::Regex;

use crate::error::{ConfigError, Result};

/// A set of compiled plot patterns; an empty set matches every path.
#[derive(Debug, Clone, Default)]
pub struct PlotPatterns {
    globs: Vec<String>,
    compiled: Vec<Regex>,
}

impl PlotPatterns {
    /// A set that accepts every path.
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile each glob.
    pub fn new<I, S>(globs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::default();
        for glob in globs {
            let glob = glob.as_ref();
            let pattern = glob_to_regex(glob);
            let re = Regex::new(&pattern)
                .map_err(|source| ConfigError::Pattern { pattern: pattern.clone(), source })?;
            out.globs.push(glob.to_string());
            out.compiled.push(re);
        }
        Ok(out)
    }

    /// Compile a comma separated list such as `/mttbar,/jet{1,2}/pt`.
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::new(split_list(list).into_iter().filter(|s| !s.is_empty()))
    }

    /// Whether `path` is selected.
    pub fn matches(&self, path: &str) -> bool {
        self.compiled.is_empty() || self.compiled.iter().any(|re| re.is_match(path))
    }

    /// Whether the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// The globs as given.
    pub fn globs(&self) -> &[String] {
        &self.globs
    }
}

/// Translate a glob into an anchored regular expression.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut braces = 0usize;
    let mut in_class = false;
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        if in_class {
            if c == ']' {
                in_class = false;
            }
            if c == '\\' {
                out.push_str("\\\\");
            } else {
                out.push(c);
            }
            continue;
        }
        match c {
            '*' => out.push_str(r"\w*"),
            '?' => out.push_str(r"\w"),
            '[' => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
            }
            '{' => {
                braces += 1;
                out.push_str("(?:");
            }
            '}' if braces > 0 => {
                braces -= 1;
                out.push(')');
            }
            ',' if braces > 0 => out.push('|'),
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }
    out.push('$');
    out
}

/// Split on commas that are not inside `{...}`.
pub fn split_list(list: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(list[start..].trim());
    out
}
