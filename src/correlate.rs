// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Record correlation — indexes fetched remote records by their extracted
//! correlation key.
//!
//! The index is built fresh for every evaluation run and never shared across
//! invocations. Two shapes:
//!
//! - [`latest_by_key`] for metric time series: one record per key,
//!   last occurrence wins.
//! - [`group_by_key`] for finding events: every record is kept, grouped per
//!   key in fetch order, with fully-qualified names shortened to their final
//!   path segment.

use std::collections::HashMap;

use serde_json::Value;

use crate::path::PathExpr;
use crate::util::{scalar_key, short_name};

/// Index metric records by key, keeping the last record seen per key.
///
/// When the remote service returns duplicate keys the winner depends on its
/// response ordering, which is not guaranteed — callers should treat the
/// choice among duplicates as unspecified. Records whose key path does not
/// resolve to a scalar are skipped.
pub fn latest_by_key(records: &[Value], key: &PathExpr) -> HashMap<String, Value> {
    let mut index = HashMap::new();
    let mut skipped = 0usize;
    for record in records {
        match key.extract(record).as_ref().and_then(scalar_key) {
            Some(k) => {
                index.insert(k, record.clone());
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, key = key.as_str(), "records without correlation key");
    }
    index
}

/// Grouped correlation index for finding events.
#[derive(Debug, Default)]
pub struct Grouped {
    by_key: HashMap<String, Vec<Value>>,
    /// Records whose key path did not resolve; excluded from the index but
    /// counted so totals remain auditable.
    pub unmatched: usize,
}

impl Grouped {
    /// Records correlated to `key`, in fetch order. Empty for unknown keys.
    pub fn get(&self, key: &str) -> &[Value] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct correlation keys.
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    /// Total records held in the index (excludes `unmatched`).
    pub fn total(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }
}

/// Group finding records by key, preserving fetch order within each group.
///
/// The resolved key is shortened to its final `/` segment: the remote
/// service embeds fully-qualified resource names, while local resources
/// carry the short identifier.
pub fn group_by_key(records: &[Value], key: &PathExpr) -> Grouped {
    let mut grouped = Grouped::default();
    for record in records {
        match key.extract(record).as_ref().and_then(scalar_key) {
            Some(k) => {
                grouped
                    .by_key
                    .entry(short_name(&k).to_string())
                    .or_default()
                    .push(record.clone());
            }
            None => grouped.unmatched += 1,
        }
    }
    tracing::debug!(
        keys = grouped.key_count(),
        records = grouped.total(),
        unmatched = grouped.unmatched,
        "built findings correlation index"
    );
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metric_key() -> PathExpr {
        PathExpr::parse("metric.labels.instance_name").unwrap()
    }

    fn finding_key() -> PathExpr {
        PathExpr::parse("finding.resourceName").unwrap()
    }

    fn metric_record(instance: &str, value: f64) -> Value {
        json!({
            "metric": {"labels": {"instance_name": instance}},
            "points": [{"value": {"doubleValue": value}}]
        })
    }

    fn finding_record(resource: &str, category: &str) -> Value {
        json!({"finding": {"resourceName": resource, "category": category}})
    }

    #[test]
    fn latest_indexes_by_extracted_key() {
        let records = vec![metric_record("vm-1", 0.5), metric_record("vm-2", 0.7)];
        let index = latest_by_key(&records, &metric_key());
        assert_eq!(index.len(), 2);
        assert!(index.contains_key("vm-1"));
        assert!(index.contains_key("vm-2"));
    }

    #[test]
    fn latest_duplicate_key_last_wins() {
        let records = vec![metric_record("vm-1", 0.5), metric_record("vm-1", 0.9)];
        let index = latest_by_key(&records, &metric_key());
        assert_eq!(index.len(), 1);
        let kept = &index["vm-1"];
        assert_eq!(kept["points"][0]["value"]["doubleValue"], json!(0.9));
    }

    #[test]
    fn latest_skips_unresolvable_records() {
        let records = vec![metric_record("vm-1", 0.5), json!({"metric": {"type": "x"}})];
        let index = latest_by_key(&records, &metric_key());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn latest_empty_input() {
        let index = latest_by_key(&[], &metric_key());
        assert!(index.is_empty());
    }

    #[test]
    fn grouped_preserves_multiplicity_and_order() {
        let records = vec![
            finding_record("x/bucket-1", "FIRST"),
            finding_record("y/bucket-2", "OTHER"),
            finding_record("z/bucket-1", "SECOND"),
        ];
        let grouped = group_by_key(&records, &finding_key());
        let bucket1 = grouped.get("bucket-1");
        assert_eq!(bucket1.len(), 2);
        assert_eq!(bucket1[0]["finding"]["category"], json!("FIRST"));
        assert_eq!(bucket1[1]["finding"]["category"], json!("SECOND"));
        assert_eq!(grouped.get("bucket-2").len(), 1);
    }

    #[test]
    fn grouped_shortens_qualified_names() {
        let records = vec![finding_record(
            "//storage.googleapis.com/projects/p/buckets/bucket-1",
            "X",
        )];
        let grouped = group_by_key(&records, &finding_key());
        assert_eq!(grouped.get("bucket-1").len(), 1);
        assert_eq!(grouped.get("//storage.googleapis.com/projects/p/buckets/bucket-1").len(), 0);
    }

    #[test]
    fn grouped_never_drops_resolvable_records() {
        let records: Vec<Value> = (0..20)
            .map(|i| finding_record(&format!("p/bucket-{}", i % 3), "X"))
            .collect();
        let grouped = group_by_key(&records, &finding_key());
        assert_eq!(grouped.total() + grouped.unmatched, records.len());
        assert_eq!(grouped.unmatched, 0);
        assert_eq!(grouped.key_count(), 3);
    }

    #[test]
    fn grouped_counts_unresolvable_records() {
        let records = vec![
            finding_record("p/bucket-1", "X"),
            json!({"finding": {"category": "NO_NAME"}}),
            json!({"unrelated": true}),
        ];
        let grouped = group_by_key(&records, &finding_key());
        assert_eq!(grouped.total(), 1);
        assert_eq!(grouped.unmatched, 2);
        assert_eq!(grouped.total() + grouped.unmatched, records.len());
    }

    #[test]
    fn grouped_unknown_key_is_empty_slice() {
        let grouped = group_by_key(&[], &finding_key());
        assert!(grouped.get("anything").is_empty());
    }
}
