// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Comparison operators for predicate evaluation.
//!
//! The recognized operator set is fixed and externally enumerable
//! ([`Cmp::ALL`]); unknown names are rejected when a [`Comparison`] is
//! built, never mid-batch. Regex patterns compile once at that point so an
//! invalid pattern is a configuration error rather than a silent non-match.

use std::cmp::Ordering;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde_json::Value;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    NotContains,
    In,
    NotIn,
    Regex,
    Glob,
}

impl Cmp {
    /// Every recognized operator, for schema declaration and error messages.
    pub const ALL: [Cmp; 12] = [
        Cmp::Equal,
        Cmp::NotEqual,
        Cmp::LessThan,
        Cmp::LessThanOrEqual,
        Cmp::GreaterThan,
        Cmp::GreaterThanOrEqual,
        Cmp::Contains,
        Cmp::NotContains,
        Cmp::In,
        Cmp::NotIn,
        Cmp::Regex,
        Cmp::Glob,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cmp::Equal => "equal",
            Cmp::NotEqual => "not-equal",
            Cmp::LessThan => "less-than",
            Cmp::LessThanOrEqual => "less-than-or-equal",
            Cmp::GreaterThan => "greater-than",
            Cmp::GreaterThanOrEqual => "greater-than-or-equal",
            Cmp::Contains => "contains",
            Cmp::NotContains => "not-contains",
            Cmp::In => "in",
            Cmp::NotIn => "not-in",
            Cmp::Regex => "regex",
            Cmp::Glob => "glob",
        }
    }

    /// Parse an operator name. Accepts the canonical kebab-case names plus
    /// the short aliases (`eq`, `ne`, `lt`, `le`, `gt`, `ge`).
    pub fn parse(name: &str) -> Option<Cmp> {
        match name {
            "equal" | "eq" => Some(Cmp::Equal),
            "not-equal" | "ne" => Some(Cmp::NotEqual),
            "less-than" | "lt" => Some(Cmp::LessThan),
            "less-than-or-equal" | "le" => Some(Cmp::LessThanOrEqual),
            "greater-than" | "gt" => Some(Cmp::GreaterThan),
            "greater-than-or-equal" | "ge" => Some(Cmp::GreaterThanOrEqual),
            "contains" => Some(Cmp::Contains),
            "not-contains" => Some(Cmp::NotContains),
            "in" => Some(Cmp::In),
            "not-in" => Some(Cmp::NotIn),
            "regex" => Some(Cmp::Regex),
            "glob" => Some(Cmp::Glob),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated operator/value pair, ready to evaluate against observed
/// values. Construction is the fail-fast point for unknown operators,
/// invalid regex patterns, and shape mismatches.
#[derive(Debug, Clone)]
pub struct Comparison {
    op: Cmp,
    value: Value,
    regex: Option<Regex>,
}

impl Comparison {
    pub fn new(op_name: &str, value: Value) -> Result<Self> {
        let op = Cmp::parse(op_name).with_context(|| {
            let known: Vec<&str> = Cmp::ALL.iter().map(Cmp::as_str).collect();
            format!(
                "unknown operator '{}' (expected one of: {})",
                op_name,
                known.join(", ")
            )
        })?;

        let regex = match op {
            Cmp::Regex => {
                let pattern = value
                    .as_str()
                    .context("regex operator requires a string pattern")?;
                Some(
                    Regex::new(pattern)
                        .with_context(|| format!("invalid regex pattern '{}'", pattern))?,
                )
            }
            _ => None,
        };

        if op == Cmp::Glob && !value.is_string() {
            bail!("glob operator requires a string pattern");
        }
        if matches!(op, Cmp::In | Cmp::NotIn) && !value.is_array() {
            bail!("{} operator requires a list value", op);
        }

        Ok(Self { op, value, regex })
    }

    pub fn op(&self) -> Cmp {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluate the comparison against an observed value. Pure; shape
    /// mismatches (e.g. ordering a string against a number) are `false`,
    /// never errors.
    pub fn matches(&self, actual: &Value) -> bool {
        match self.op {
            Cmp::Equal => values_equal(actual, &self.value),
            Cmp::NotEqual => !values_equal(actual, &self.value),
            Cmp::LessThan => order(actual, &self.value) == Some(Ordering::Less),
            Cmp::LessThanOrEqual => {
                matches!(order(actual, &self.value), Some(Ordering::Less | Ordering::Equal))
            }
            Cmp::GreaterThan => order(actual, &self.value) == Some(Ordering::Greater),
            Cmp::GreaterThanOrEqual => {
                matches!(order(actual, &self.value), Some(Ordering::Greater | Ordering::Equal))
            }
            Cmp::Contains => contains(actual, &self.value),
            Cmp::NotContains => !contains(actual, &self.value),
            Cmp::In => contains(&self.value, actual),
            Cmp::NotIn => !contains(&self.value, actual),
            Cmp::Regex => match (&self.regex, actual.as_str()) {
                (Some(re), Some(s)) => re.is_match(s),
                _ => false,
            },
            Cmp::Glob => match (self.value.as_str(), actual.as_str()) {
                (Some(pattern), Some(s)) => glob_match::glob_match(pattern, s),
                _ => false,
            },
        }
    }
}

/// Equality with numeric coercion: `1` and `1.0` are equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}

/// Total order where one exists: numeric if both sides are numeric,
/// lexicographic if both are strings, otherwise incomparable.
fn order(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

/// Membership: substring for strings, element equality for lists.
fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle.as_str().map(|n| s.contains(n)).unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => false,
    }
}
