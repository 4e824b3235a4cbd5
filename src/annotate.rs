// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Resource annotation — attaches correlated data to each resource under a
//! namespaced container, before the retain/drop decision is made, so
//! downstream consumers can inspect the raw correlation regardless of the
//! filter outcome. Unrelated resource fields are never touched.

use serde_json::{Map, Value};

/// Container key for metric annotations (an object keyed by composite
/// metric key; repeated annotation with the same key overwrites).
pub const METRICS_NS: &str = "cloudsift.metrics";

/// Container key for finding annotations (an array; repeated annotation
/// appends, so chained filters accumulate).
pub const FINDINGS_NS: &str = "cloudsift.findings";

/// Write a metric annotation under `key`, creating the container if absent.
pub fn set_metric(resource: &mut Value, key: &str, record: Value) {
    let Some(fields) = resource.as_object_mut() else {
        return;
    };
    let container = fields
        .entry(METRICS_NS)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(metrics) = container.as_object_mut() {
        metrics.insert(key.to_string(), record);
    }
}

/// Append correlated findings, creating the container if absent. An empty
/// slice still creates the (empty) container so every processed resource
/// carries an annotation entry.
pub fn append_findings(resource: &mut Value, findings: &[Value]) {
    let Some(fields) = resource.as_object_mut() else {
        return;
    };
    let container = fields
        .entry(FINDINGS_NS)
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(list) = container.as_array_mut() {
        list.extend(findings.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_metric_creates_container() {
        let mut resource = json!({"name": "vm-1"});
        set_metric(&mut resource, "cpu.ALIGN_NONE.REDUCE_NONE", json!({"points": []}));
        assert_eq!(
            resource[METRICS_NS]["cpu.ALIGN_NONE.REDUCE_NONE"],
            json!({"points": []})
        );
        // Unrelated fields untouched.
        assert_eq!(resource["name"], json!("vm-1"));
    }

    #[test]
    fn set_metric_same_key_overwrites() {
        let mut resource = json!({"name": "vm-1"});
        set_metric(&mut resource, "cpu.ALIGN_NONE.REDUCE_NONE", json!(1));
        set_metric(&mut resource, "cpu.ALIGN_NONE.REDUCE_NONE", json!(2));
        let metrics = resource[METRICS_NS].as_object().unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["cpu.ALIGN_NONE.REDUCE_NONE"], json!(2));
    }

    #[test]
    fn set_metric_different_keys_coexist() {
        let mut resource = json!({});
        set_metric(&mut resource, "cpu.ALIGN_MEAN.REDUCE_NONE", json!(1));
        set_metric(&mut resource, "cpu.ALIGN_MAX.REDUCE_NONE", json!(2));
        assert_eq!(resource[METRICS_NS].as_object().unwrap().len(), 2);
    }

    #[test]
    fn append_findings_accumulates_across_invocations() {
        let mut resource = json!({"name": "bucket-1"});
        append_findings(&mut resource, &[json!({"finding": {"category": "X"}})]);
        append_findings(&mut resource, &[json!({"finding": {"category": "Y"}})]);
        let list = resource[FINDINGS_NS].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["finding"]["category"], json!("X"));
        assert_eq!(list[1]["finding"]["category"], json!("Y"));
    }

    #[test]
    fn append_empty_still_creates_container() {
        let mut resource = json!({"name": "bucket-1"});
        append_findings(&mut resource, &[]);
        assert_eq!(resource[FINDINGS_NS], json!([]));
    }

    #[test]
    fn non_object_resource_is_left_alone() {
        let mut resource = json!("not-an-object");
        set_metric(&mut resource, "k", json!(1));
        append_findings(&mut resource, &[json!(1)]);
        assert_eq!(resource, json!("not-an-object"));
    }
}
