// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Server-side query filter builders.
//!
//! The engine never talks to the remote service itself, but it owns the
//! filter expression the caller sends when fetching records. Clauses are
//! collected and joined explicitly — zero resources yield `None` (an empty
//! selector the caller can detect) instead of a dangling trailing operator,
//! and one resource yields a single well-formed clause.

use serde_json::Value;

use crate::path::PathExpr;
use crate::util::scalar_key;

/// Build a metric time-series filter:
/// `metric.type = "<metric_type>" AND (<record_key> = "k1" OR <record_key> = "k2" ...)`.
///
/// `record_key` is the server-side label path (e.g.
/// `metric.labels.instance_name`); `resource_key` extracts each resource's
/// correlation key locally. Resources whose key does not resolve contribute
/// no clause. Clause order follows resource order; duplicates are kept (the
/// remote service treats them as a no-op union).
pub fn metric_filter(
    metric_type: &str,
    resources: &[Value],
    resource_key: &PathExpr,
    record_key: &str,
) -> Option<String> {
    let clauses: Vec<String> = resources
        .iter()
        .filter_map(|r| resource_key.extract(r))
        .filter_map(|v| scalar_key(&v))
        .map(|key| format!("{} = \"{}\"", record_key, key))
        .collect();
    if clauses.is_empty() {
        return None;
    }
    Some(format!(
        "metric.type = \"{}\" AND ({})",
        metric_type,
        clauses.join(" OR ")
    ))
}

/// Build a findings filter over resource identifiers:
/// `<match_field>:"v1" OR <match_field>:"v2" ...` (no fixed-type prefix).
pub fn findings_filter(
    resources: &[Value],
    resource_key: &PathExpr,
    match_field: &str,
) -> Option<String> {
    let clauses: Vec<String> = resources
        .iter()
        .filter_map(|r| resource_key.extract(r))
        .filter_map(|v| scalar_key(&v))
        .map(|key| format!("{}:\"{}\"", match_field, key))
        .collect();
    if clauses.is_empty() {
        return None;
    }
    Some(clauses.join(" OR "))
}
