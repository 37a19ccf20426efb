//! Key normalization for flat and hierarchical backends.
//!
//! Keys are `/`-separated on every backend. Flat stores (S3, blob containers)
//! have no directory entity, so "directories" are derived from key prefixes
//! and the number of separators in a key.
//!
//! # Examples
//!
//! ```
//! use cross_storage::path::{directory_prefix, is_direct_child, normalize_key};
//!
//! assert_eq!(normalize_key(r"avatars\\2024//logo.png"), "avatars/2024/logo.png");
//! assert_eq!(directory_prefix("avatars"), "avatars/");
//!
//! assert!(is_direct_child("avatars/logo.png", "avatars/"));
//! assert!(!is_direct_child("avatars/2024/logo.png", "avatars/"));
//! ```

use regex::Regex;

/// Key separator used by every backend.
pub const SEPARATOR: char = '/';

/// Canonicalize separators in a key.
///
/// Runs of `/` and `\` collapse into a single `/`, and leading `./` and `/`
/// are stripped so the key is relative to the storage root.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last_was_sep = false;
    for c in key.chars() {
        if c == '/' || c == '\\' {
            if !last_was_sep {
                out.push(SEPARATOR);
            }
            last_was_sep = true;
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }

    let mut trimmed = out.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    if trimmed == "." {
        trimmed = "";
    }
    trimmed.to_string()
}

/// Normalize a directory path into a listing prefix ending in exactly one `/`.
///
/// The storage root normalizes to the empty prefix.
pub fn directory_prefix(path: &str) -> String {
    let normalized = normalize_key(path);
    let trimmed = normalized.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}{}", trimmed, SEPARATOR)
    }
}

/// Number of separators in a key.
pub fn separator_count(key: &str) -> usize {
    key.chars().filter(|c| *c == SEPARATOR).count()
}

/// Whether `key` sits directly under the directory `prefix`.
///
/// `prefix` must come from [`directory_prefix`]. A key is a direct child when
/// it carries the same number of separators as the prefix itself.
pub fn is_direct_child(key: &str, prefix: &str) -> bool {
    key.starts_with(prefix) && separator_count(key) == separator_count(prefix)
}

/// The deepest directory boundary contained in a plain string prefix.
///
/// `"avatars/log"` yields `"avatars/"`, `"some"` yields `""`.
pub fn enclosing_directory(prefix: &str) -> &str {
    match prefix.rfind(SEPARATOR) {
        Some(idx) => &prefix[..=idx],
        None => "",
    }
}

/// Final component of a key.
pub fn file_name(key: &str) -> &str {
    match key.rfind(SEPARATOR) {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Directory portion of a key, or an empty string when it has none.
pub fn directory_name(path: &str) -> String {
    let normalized = normalize_key(path);
    let trimmed = normalized.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => trimmed[..idx].to_string(),
        None => String::new(),
    }
}

/// File-name pattern used by path listings.
///
/// - empty, `*` or `*.*` match everything
/// - glob alternatives separated by `|` (`*.jpg|*.png`) match the file name
/// - anything else is a regular expression searched within the full key
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Matches every key
    Any,
    /// Anchored glob alternatives applied to the file name
    Globs(Vec<Regex>),
    /// Regular expression applied to the full key
    Regex(Regex),
}

impl NamePattern {
    /// Parse a search pattern.
    pub fn parse(pattern: &str) -> crate::Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern == "*" || pattern == "*.*" {
            return Ok(NamePattern::Any);
        }

        if pattern.contains('*') || pattern.contains('?') {
            let alternatives: Vec<&str> = pattern
                .split('|')
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
                .collect();
            if alternatives.iter().any(|alt| *alt == "*" || *alt == "*.*") {
                return Ok(NamePattern::Any);
            }
            let globs = alternatives
                .into_iter()
                .map(glob_to_regex)
                .collect::<crate::Result<Vec<_>>>()?;
            return Ok(NamePattern::Globs(globs));
        }

        Ok(NamePattern::Regex(Regex::new(pattern)?))
    }

    /// Check a key against the pattern.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            NamePattern::Any => true,
            NamePattern::Globs(globs) => {
                let name = file_name(key);
                globs.iter().any(|glob| glob.is_match(name))
            }
            NamePattern::Regex(re) => re.is_match(key),
        }
    }
}

fn glob_to_regex(glob: &str) -> crate::Result<Regex> {
    let mut expr = String::with_capacity(glob.len() + 8);
    expr.push('^');
    for c in glob.chars() {
        match c {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Ok(Regex::new(&expr)?)
}
