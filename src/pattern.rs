//! Guarded compilation of user-configured regex patterns
//!
//! Every pattern that comes from configuration (lock file extraction, detect
//! rules, raw command output, custom version regexes, incremental package
//! patterns) goes through [`compile_pattern`]. The `regex` crate already
//! matches in linear time; the shape checks here reject patterns that are
//! catastrophic on backtracking engines so a configuration stays portable,
//! and the builder limits bound compile-time memory.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{
    MAX_REGEX_PATTERN_LEN, MAX_REGEX_QUANTIFIERS, REGEX_DFA_SIZE_LIMIT, REGEX_SIZE_LIMIT,
};

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Empty regex pattern")]
    Empty,

    #[error("Regex pattern too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Regex pattern too complex ({reason}): {pattern}")]
    TooComplex {
        pattern: String,
        reason: &'static str,
    },

    #[error("Invalid regex pattern {pattern:?}: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Quantified group containing a quantified wildcard: `(.*)+`, `(\w+x)*`
static NESTED_QUANTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\([^)]*(?:\.\*|\.\+|\\w\*|\\w\+|\\s\*|\\s\+)[^)]*\)[+*]").unwrap()
});

/// `(a+)+`, `(x*)*`
static SIMPLE_NESTED_QUANTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([a-zA-Z][+*]\)[+*]").unwrap());

/// Quantified two-way alternation, checked for shared prefixes: `(a|aa)+`
static QUANTIFIED_ALTERNATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^|)]+)\|([^)]+)\)[+*]").unwrap());

/// Check a pattern against length and catastrophic-shape limits without compiling it
pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    if pattern.len() > MAX_REGEX_PATTERN_LEN {
        return Err(PatternError::TooLong {
            len: pattern.len(),
            max: MAX_REGEX_PATTERN_LEN,
        });
    }

    let too_complex = |reason| PatternError::TooComplex {
        pattern: pattern.to_string(),
        reason,
    };

    if NESTED_QUANTIFIER.is_match(pattern) {
        return Err(too_complex("nested quantifiers"));
    }

    if SIMPLE_NESTED_QUANTIFIER.is_match(pattern) {
        return Err(too_complex("simple nested quantifiers"));
    }

    if let Some(caps) = QUANTIFIED_ALTERNATION.captures(pattern) {
        let (first, second) = (&caps[1], &caps[2]);
        if first.starts_with(second) || second.starts_with(first) {
            return Err(too_complex("overlapping alternatives"));
        }
    }

    let quantifiers = pattern.chars().filter(|c| matches!(c, '+' | '*')).count();
    if quantifiers > MAX_REGEX_QUANTIFIERS {
        return Err(too_complex("excessive quantifiers"));
    }

    Ok(())
}

/// Validate and compile a configured pattern with bounded program size
pub fn compile_pattern(pattern: &str) -> Result<Regex, PatternError> {
    validate_pattern(pattern).inspect_err(|e| warn!("Rejected regex pattern: {}", e))?;

    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_DFA_SIZE_LIMIT)
        .build()
        .map_err(|source| PatternError::Invalid {
            pattern: pattern.to_string(),
            source,
        })
}

/// Every match of `regex` in `text` as a map from capture-group name to value.
///
/// Groups that did not participate in a match are omitted from its map.
pub fn capture_all(regex: &Regex, text: &str) -> Vec<HashMap<String, String>> {
    regex
        .captures_iter(text)
        .map(|caps| {
            regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect::<HashMap<_, _>>()
        })
        .filter(|groups| !groups.is_empty())
        .collect()
}

/// Compiled patterns keyed by their source text
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Mutex<HashMap<String, Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached regex for `pattern`, compiling it on first use
    pub fn get_or_compile(&self, pattern: &str) -> Result<Regex, PatternError> {
        if let Some(regex) = self.lock().get(pattern) {
            return Ok(regex.clone());
        }

        let regex = compile_pattern(pattern)?;
        debug!("Compiled pattern: {}", pattern);
        self.lock().insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Regex>> {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
