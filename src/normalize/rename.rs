//! Keyword-driven column renaming.
//!
//! Source labels drift between files (line wraps, punctuation, casing), so they
//! are matched on a normalized form against an ordered rule list; the first rule
//! that matches wins.

/// Trimmed, lower-cased, with every run of whitespace collapsed to one space.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Test applied to a normalized label. Keywords are written normalized.
#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    Contains(&'static [&'static str]),
    StartsWith(&'static [&'static str]),
}

impl Predicate {
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Predicate::Contains(keys) => keys.iter().any(|k| normalized.contains(k)),
            Predicate::StartsWith(keys) => keys.iter().any(|k| normalized.starts_with(k)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub predicate: Predicate,
    pub canonical: &'static str,
}

impl ColumnRule {
    pub const fn contains(keys: &'static [&'static str], canonical: &'static str) -> Self {
        Self {
            predicate: Predicate::Contains(keys),
            canonical,
        }
    }

    pub const fn starts_with(keys: &'static [&'static str], canonical: &'static str) -> Self {
        Self {
            predicate: Predicate::StartsWith(keys),
            canonical,
        }
    }
}

/// Outcome of renaming one source label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renamed {
    Matched {
        original: String,
        canonical: &'static str,
    },
    Unmatched(String),
}

impl Renamed {
    /// The label the column ends up with.
    pub fn label(&self) -> &str {
        match self {
            Renamed::Matched { canonical, .. } => canonical,
            Renamed::Unmatched(original) => original,
        }
    }

    pub fn original(&self) -> &str {
        match self {
            Renamed::Matched { original, .. } => original,
            Renamed::Unmatched(original) => original,
        }
    }
}

pub fn rename_label(label: &str, rules: &[ColumnRule]) -> Renamed {
    let normalized = normalize_label(label);
    rules
        .iter()
        .find(|r| r.predicate.matches(&normalized))
        .map(|r| Renamed::Matched {
            original: label.to_string(),
            canonical: r.canonical,
        })
        .unwrap_or_else(|| Renamed::Unmatched(label.to_string()))
}

pub fn rename_columns(labels: &[String], rules: &[ColumnRule]) -> Vec<Renamed> {
    labels.iter().map(|l| rename_label(l, rules)).collect()
}
