// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Predicate evaluation and the filter engine itself.
//!
//! A [`Filter`] is the validated, tagged form of a definition: threshold
//! comparison over a correlated metric record, or structured match over a
//! correlated finding list. Evaluation is a single synchronous pass with no
//! state across invocations — the correlation index is built per call and
//! never mutated, resources are annotated unconditionally before the
//! retain/drop decision, and input order is preserved.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::{json, Value};

use crate::annotate;
use crate::config::{Aligner, FilterDef, MatchMode, Reducer};
use crate::correlate::{self, Grouped};
use crate::ops::Comparison;
use crate::path::PathExpr;
use crate::query;
use crate::remote::{Aggregation, RecordSource, ResourceRegistry, TimeWindow};

// ── Validated filters ────────────────────────────────────────────────────────

/// Threshold variant: compare a single observed metric value per resource
/// against a configured threshold.
#[derive(Debug, Clone)]
pub struct MetricFilter {
    /// Metric type name; doubles as the base clause of the query filter.
    pub name: String,
    pub resource_key: PathExpr,
    pub metric_key: PathExpr,
    pub group_by_fields: Vec<String>,
    pub days: i64,
    pub period: Option<i64>,
    pub aligner: Aligner,
    pub reducer: Reducer,
    pub comparison: Comparison,
    pub missing_value: f64,
}

/// Structured-match variant: retain resources by the findings correlated to
/// them, either by existence or by a sub-value comparison.
#[derive(Debug, Clone)]
pub struct FindingsFilter {
    pub org: i64,
    pub resource_key: PathExpr,
    pub record_key: PathExpr,
    pub match_field: String,
    pub matcher: Option<FindingsMatcher>,
    pub mode: MatchMode,
}

/// The configured sub-path/comparison pair of a findings filter.
#[derive(Debug, Clone)]
pub struct FindingsMatcher {
    pub key: PathExpr,
    pub comparison: Comparison,
}

/// A validated filter of either variant.
#[derive(Debug, Clone)]
pub enum Filter {
    Metric(MetricFilter),
    Findings(FindingsFilter),
}

// ── Threshold variant ────────────────────────────────────────────────────────

impl MetricFilter {
    /// Composite annotation key: metric name plus the alignment and
    /// reduction modes, so repeated filters with different aggregation
    /// settings do not collide.
    pub fn annotation_key(&self) -> String {
        format!("{}.{}.{}", self.name, self.aligner.as_str(), self.reducer.as_str())
    }

    /// The query window for this filter's fetch.
    pub fn window(&self) -> TimeWindow {
        let window = TimeWindow::last_days(self.days);
        match self.period {
            Some(seconds) => window.with_period(seconds),
            None => window,
        }
    }

    /// The aggregation parameters for this filter's fetch.
    pub fn aggregation(&self) -> Aggregation {
        Aggregation {
            aligner: self.aligner,
            reducer: self.reducer,
            group_by_fields: self.group_by_fields.clone(),
        }
    }

    /// Annotate the resource with its correlated record (or null) and
    /// evaluate the threshold predicate. Missing or malformed records fall
    /// back to the configured missing value.
    pub fn process_resource(
        &self,
        resource: &mut Value,
        index: &HashMap<String, Value>,
    ) -> bool {
        let key = self.resource_key.extract(resource);
        let record = key
            .as_ref()
            .and_then(crate::util::scalar_key)
            .and_then(|k| index.get(k.as_str()));

        annotate::set_metric(
            resource,
            &self.annotation_key(),
            record.cloned().unwrap_or(Value::Null),
        );

        let observed = record.and_then(observed_value).unwrap_or(self.missing_value);
        self.comparison.matches(&json!(observed))
    }
}

/// Read the observed numeric value from a metric record: the first value of
/// the first point. The remote service encodes the value as a single-entry
/// object (`doubleValue`, `int64Value` as a decimal string, `boolValue`);
/// anything unreadable is `None`, not an error.
fn observed_value(record: &Value) -> Option<f64> {
    let value = record.get("points")?.get(0)?.get("value")?;
    let first = value.as_object()?.values().next()?;
    match first {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// ── Structured-match variant ─────────────────────────────────────────────────

impl FindingsFilter {
    /// Append the correlated findings to the resource's annotation list and
    /// evaluate the match predicate: existence when no sub-path is
    /// configured, otherwise the comparison over values extracted from each
    /// correlated finding (any-match or all-match per configuration).
    pub fn process_resource(&self, resource: &mut Value, grouped: &Grouped) -> bool {
        let key = self.resource_key.extract(resource);
        let findings = key
            .as_ref()
            .and_then(crate::util::scalar_key)
            .map(|k| grouped.get(&k))
            .unwrap_or(&[]);

        annotate::append_findings(resource, findings);

        let matcher = match &self.matcher {
            None => return !findings.is_empty(),
            Some(m) => m,
        };

        let element_matches = |finding: &Value| {
            matcher
                .key
                .extract(finding)
                .map(|v| matcher.comparison.matches(&v))
                .unwrap_or(false)
        };
        match self.mode {
            MatchMode::Any => findings.iter().any(element_matches),
            MatchMode::All => !findings.is_empty() && findings.iter().all(element_matches),
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

impl Filter {
    /// Build the server-side query filter for a fetch over `resources`.
    /// `None` is the empty selector: nothing to fetch.
    pub fn query_filter(&self, resources: &[Value]) -> Option<String> {
        match self {
            Filter::Metric(f) => query::metric_filter(
                &f.name,
                resources,
                &f.resource_key,
                f.metric_key.as_str(),
            ),
            Filter::Findings(f) => {
                query::findings_filter(resources, &f.resource_key, &f.match_field)
            }
        }
    }

    /// Correlate `records` to `resources`, annotate every resource, and
    /// retain the matching subset in place, preserving input order.
    pub fn apply(&self, resources: &mut Vec<Value>, records: &[Value]) {
        let before = resources.len();
        match self {
            Filter::Metric(f) => {
                let index = correlate::latest_by_key(records, &f.metric_key);
                resources.retain_mut(|r| f.process_resource(r, &index));
            }
            Filter::Findings(f) => {
                let grouped = correlate::group_by_key(records, &f.record_key);
                resources.retain_mut(|r| f.process_resource(r, &grouped));
            }
        }
        tracing::debug!(
            records = records.len(),
            before,
            retained = resources.len(),
            "filter applied"
        );
    }

    /// End-to-end pass: build the query filter, fetch records through the
    /// collaborator, and apply. An empty selector skips the fetch entirely
    /// and applies against zero records.
    pub fn run(&self, source: &dyn RecordSource, resources: &mut Vec<Value>) -> Result<()> {
        let records = match self.query_filter(resources) {
            Some(filter) => match self {
                Filter::Metric(f) => {
                    source.fetch_records(&filter, Some(&f.window()), Some(&f.aggregation()))?
                }
                Filter::Findings(_) => source.fetch_records(&filter, None, None)?,
            },
            None => Vec::new(),
        };
        self.apply(resources, &records);
        Ok(())
    }
}

/// Validate a definition against the host registry's key path for
/// `resource_type`, run it, and hand the retained subset back to the
/// registry.
pub fn run_registered(
    def: &FilterDef,
    source: &dyn RecordSource,
    registry: &mut dyn ResourceRegistry,
    resource_type: &str,
    mut resources: Vec<Value>,
) -> Result<()> {
    let mut def = def.clone();
    def.resolve_resource_key(registry, resource_type);
    let filter = def.validate()?;
    filter.run(source, &mut resources)?;
    registry.accept(resources);
    Ok(())
}
