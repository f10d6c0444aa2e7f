//! Exclusion pattern matching for snapshot copies.
//!
//! Patterns come in two flavours:
//!
//! * **Wildcard** patterns contain `*`. Literal segments are regex-escaped and
//!   each `*` matches any run of characters. The compiled expression is
//!   searched (not anchored) in the path relative to the walk root and in the
//!   entry's base name.
//! * **Literal** patterns match when the relative path equals the pattern, the
//!   base name equals it, the relative path contains it, or the relative path
//!   starts with `pattern` followed by a separator.
//!
//! A path is excluded when any pattern matches.

use crate::utils::{Result, VersionerError};
use regex::Regex;
use std::path::{Path, MAIN_SEPARATOR};

#[derive(Debug, Clone)]
enum Rule {
    Wildcard(Regex),
    Literal(String),
}

impl Rule {
    fn compile(pattern: &str) -> Result<Self> {
        if !pattern.contains('*') {
            return Ok(Rule::Literal(pattern.to_string()));
        }

        let expr = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        Regex::new(&expr)
            .map(Rule::Wildcard)
            .map_err(|source| VersionerError::Pattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn matches(&self, relative: &str, file_name: &str) -> bool {
        match self {
            Rule::Wildcard(re) => re.is_match(relative) || re.is_match(file_name),
            Rule::Literal(p) => {
                relative == p.as_str()
                    || file_name == p.as_str()
                    || relative.contains(p.as_str())
                    || relative.starts_with(&format!("{p}{MAIN_SEPARATOR}"))
            }
        }
    }
}

/// Compiled set of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    rules: Vec<Rule>,
}

impl PathMatcher {
    /// Compile a list of patterns. Empty patterns are ignored.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.is_empty())
            .map(Rule::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// A matcher that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add one more pattern to the set.
    pub fn push(&mut self, pattern: &str) -> Result<()> {
        if !pattern.is_empty() {
            self.rules.push(Rule::compile(pattern)?);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether `candidate` (somewhere under `root`) is excluded.
    pub fn is_excluded(&self, root: &Path, candidate: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let relative = candidate.strip_prefix(root).unwrap_or(candidate);
        let relative = relative.to_string_lossy();
        let file_name = candidate
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.rules.iter().any(|rule| rule.matches(&relative, &file_name))
    }
}
