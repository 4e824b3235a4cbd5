// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Shared utility functions used across multiple modules.

use serde_json::Value;

/// Extract the final segment from a '/'-delimited name (everything after the
/// last '/').
///
/// Remote services embed fully-qualified resource names like
/// `//storage.googleapis.com/projects/p/buckets/bucket-1`; correlation only
/// uses the short identifier. Returns the full string if no '/' is present.
///
/// # Examples
/// ```ignore
/// assert_eq!(short_name("projects/p/buckets/bucket-1"), "bucket-1");
/// assert_eq!(short_name("bucket-1"), "bucket-1");
/// ```
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Render a scalar JSON value as a correlation-index key string.
///
/// Objects and arrays are not usable as keys and yield `None`. Strings are
/// used as-is (no quoting); numbers and booleans use their display form.
pub fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_name_strips_hierarchy() {
        assert_eq!(
            short_name("//storage.googleapis.com/projects/p/buckets/bucket-1"),
            "bucket-1"
        );
        assert_eq!(short_name("a/b/c"), "c");
    }

    #[test]
    fn short_name_passthrough_without_slash() {
        assert_eq!(short_name("vm-1"), "vm-1");
        assert_eq!(short_name(""), "");
    }

    #[test]
    fn short_name_trailing_slash() {
        assert_eq!(short_name("a/b/"), "");
    }

    #[test]
    fn scalar_key_string() {
        assert_eq!(scalar_key(&json!("vm-1")), Some("vm-1".to_string()));
    }

    #[test]
    fn scalar_key_number_and_bool() {
        assert_eq!(scalar_key(&json!(42)), Some("42".to_string()));
        assert_eq!(scalar_key(&json!(true)), Some("true".to_string()));
    }

    #[test]
    fn scalar_key_rejects_containers() {
        assert_eq!(scalar_key(&json!({"a": 1})), None);
        assert_eq!(scalar_key(&json!([1, 2])), None);
        assert_eq!(scalar_key(&Value::Null), None);
    }
}
