// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Path expressions for extracting correlation keys from structured records.
//!
//! A restricted dotted/bracketed grammar evaluated by explicit recursive
//! descent over [`serde_json::Value`]:
//!
//! - `metric.labels.instance_name` — nested field access
//! - `points[0].value` — list indexing
//! - `findings[].category` — wildcard projection: applies the remaining path
//!   to every element and collects the results into a list
//!
//! Parsing is strict and happens at configuration-validation time; evaluation
//! never errors — a path that does not resolve yields `None`, which callers
//! must treat distinctly from a resolved falsy value.

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// One step of a parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Object field access by name.
    Field(String),
    /// List element access by index.
    Index(usize),
    /// Projection over every element of a list.
    Wildcard,
}

/// A parsed, reusable path expression.
#[derive(Debug, Clone)]
pub struct PathExpr {
    steps: Vec<Step>,
    raw: String,
}

impl PathExpr {
    /// Parse a path expression. Malformed syntax is rejected here so that
    /// bad configuration fails before any evaluation runs.
    pub fn parse(expr: &str) -> Result<Self> {
        if expr.is_empty() {
            bail!("empty path expression");
        }
        let mut steps = Vec::new();
        for segment in expr.split('.') {
            let (name, mut rest) = match segment.find('[') {
                Some(pos) => (&segment[..pos], &segment[pos..]),
                None => (segment, ""),
            };
            if name.is_empty() && rest.is_empty() {
                bail!("empty segment in path '{}'", expr);
            }
            if !name.is_empty() {
                steps.push(Step::Field(name.to_string()));
            }
            while !rest.is_empty() {
                let inner_end = rest
                    .strip_prefix('[')
                    .and_then(|r| r.find(']'))
                    .with_context(|| format!("unbalanced brackets in path '{}'", expr))?;
                let inner = &rest[1..inner_end + 1];
                if inner.is_empty() || inner == "*" {
                    steps.push(Step::Wildcard);
                } else {
                    let index: usize = inner
                        .parse()
                        .with_context(|| format!("bad list index '{}' in path '{}'", inner, expr))?;
                    steps.push(Step::Index(index));
                }
                rest = &rest[inner_end + 2..];
            }
        }
        Ok(Self {
            steps,
            raw: expr.to_string(),
        })
    }

    /// The original expression text (used verbatim when building server-side
    /// query filters).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate the path against a record. `None` means the path did not
    /// resolve; it is never an error.
    pub fn extract(&self, record: &Value) -> Option<Value> {
        eval(record, &self.steps)
    }
}

fn eval(value: &Value, steps: &[Step]) -> Option<Value> {
    let (step, rest) = match steps.split_first() {
        Some(pair) => pair,
        None => return Some(value.clone()),
    };
    match step {
        Step::Field(name) => value.get(name.as_str()).and_then(|v| eval(v, rest)),
        Step::Index(i) => value.get(*i).and_then(|v| eval(v, rest)),
        Step::Wildcard => {
            let items = value.as_array()?;
            let projected = items.iter().filter_map(|item| eval(item, rest)).collect();
            Some(Value::Array(projected))
        }
    }
}

/// One-shot extraction for call sites with a pre-validated path string.
pub fn extract(record: &Value, path: &str) -> Option<Value> {
    PathExpr::parse(path).ok()?.extract(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_field() {
        let record = json!({"metric": {"labels": {"instance_name": "vm-1"}}});
        let path = PathExpr::parse("metric.labels.instance_name").unwrap();
        assert_eq!(path.extract(&record), Some(json!("vm-1")));
    }

    #[test]
    fn extracts_top_level_field() {
        let record = json!({"name": "bucket-1"});
        assert_eq!(extract(&record, "name"), Some(json!("bucket-1")));
    }

    #[test]
    fn missing_path_is_none_not_error() {
        let record = json!({"metric": {"type": "x"}});
        let path = PathExpr::parse("metric.labels.instance_name").unwrap();
        assert_eq!(path.extract(&record), None);
    }

    #[test]
    fn resolved_falsy_value_is_distinct_from_missing() {
        let record = json!({"count": 0, "enabled": false, "label": ""});
        assert_eq!(extract(&record, "count"), Some(json!(0)));
        assert_eq!(extract(&record, "enabled"), Some(json!(false)));
        assert_eq!(extract(&record, "label"), Some(json!("")));
        assert_eq!(extract(&record, "absent"), None);
    }

    #[test]
    fn list_indexing() {
        let record = json!({"points": [{"value": 1.5}, {"value": 2.5}]});
        assert_eq!(extract(&record, "points[0].value"), Some(json!(1.5)));
        assert_eq!(extract(&record, "points[1].value"), Some(json!(2.5)));
        assert_eq!(extract(&record, "points[2].value"), None);
    }

    #[test]
    fn wildcard_projects_across_list() {
        let record = json!({"findings": [
            {"category": "X"},
            {"category": "Y"},
            {"other": 1}
        ]});
        assert_eq!(
            extract(&record, "findings[].category"),
            Some(json!(["X", "Y"]))
        );
    }

    #[test]
    fn wildcard_star_alias() {
        let record = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(extract(&record, "items[*].id"), Some(json!([1, 2])));
    }

    #[test]
    fn wildcard_on_empty_list_is_empty_list() {
        let record = json!({"findings": []});
        assert_eq!(extract(&record, "findings[].category"), Some(json!([])));
    }

    #[test]
    fn wildcard_on_non_list_is_none() {
        let record = json!({"findings": {"category": "X"}});
        assert_eq!(extract(&record, "findings[].category"), None);
    }

    #[test]
    fn index_into_non_list_is_none() {
        let record = json!({"points": {"0": "x"}});
        assert_eq!(extract(&record, "points[0]"), None);
    }

    #[test]
    fn field_on_scalar_is_none() {
        let record = json!({"name": "vm-1"});
        assert_eq!(extract(&record, "name.nested"), None);
    }

    #[test]
    fn parse_rejects_empty_expression() {
        assert!(PathExpr::parse("").is_err());
    }

    #[test]
    fn parse_rejects_empty_segment() {
        assert!(PathExpr::parse("metric..labels").is_err());
        assert!(PathExpr::parse("metric.").is_err());
        assert!(PathExpr::parse(".metric").is_err());
    }

    #[test]
    fn parse_rejects_unbalanced_brackets() {
        assert!(PathExpr::parse("points[0").is_err());
        assert!(PathExpr::parse("points]0[").is_err());
    }

    #[test]
    fn parse_rejects_non_numeric_index() {
        assert!(PathExpr::parse("points[abc]").is_err());
        assert!(PathExpr::parse("points[-1]").is_err());
    }

    #[test]
    fn raw_text_round_trips() {
        let path = PathExpr::parse("metric.labels.instance_name").unwrap();
        assert_eq!(path.as_str(), "metric.labels.instance_name");
    }

    #[test]
    fn bare_bracket_segment() {
        // A projection directly on the root of a list-valued record.
        let record = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(extract(&record, "[].id"), Some(json!([1, 2])));
    }
}
