// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! Collaborator seams — the two narrow interfaces the engine consumes.
//!
//! The engine constructs the filter expression and the window/aggregation
//! parameters; a [`RecordSource`] implementation owns transport, auth, and
//! pagination. A [`ResourceRegistry`] supplies per-type resource key paths
//! and receives the retained subset. Registration of filters under host
//! names is owned by the host, not this crate.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::config::{Aligner, Reducer};

/// The time range a metric query covers, with the alignment period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_seconds: i64,
}

impl TimeWindow {
    /// A window ending now and spanning the last `days` days; the period
    /// defaults to the whole window.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        let start = end - Duration::days(days);
        Self {
            start,
            end,
            period_seconds: (end - start).num_seconds(),
        }
    }

    /// Override the alignment period.
    pub fn with_period(mut self, seconds: i64) -> Self {
        self.period_seconds = seconds;
        self
    }

    /// RFC 3339 interval endpoints, as sent to the remote service.
    pub fn interval(&self) -> (String, String) {
        (self.start.to_rfc3339(), self.end.to_rfc3339())
    }

    /// Period in the remote service's `<seconds>s` form.
    pub fn period(&self) -> String {
        format!("{}s", self.period_seconds)
    }
}

/// Aggregation parameters accompanying a metric fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub aligner: Aligner,
    pub reducer: Reducer,
    pub group_by_fields: Vec<String>,
}

/// Fetches already-shaped record collections for a filter expression.
/// Implementations own auth, pagination, and transport.
pub trait RecordSource {
    fn fetch_records(
        &self,
        filter: &str,
        window: Option<&TimeWindow>,
        aggregation: Option<&Aggregation>,
    ) -> Result<Vec<Value>>;
}

/// Host-side resource registry: supplies the resource key path per resource
/// type and accepts the engine's retained subset.
pub trait ResourceRegistry {
    fn resource_key(&self, resource_type: &str) -> Option<&str>;
    fn accept(&mut self, retained: Vec<Value>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_spans_requested_days() {
        let window = TimeWindow::last_days(14);
        assert_eq!((window.end - window.start).num_days(), 14);
        assert_eq!(window.period_seconds, 14 * 24 * 3600);
        assert_eq!(window.period(), "1209600s");
    }

    #[test]
    fn period_override() {
        let window = TimeWindow::last_days(7).with_period(300);
        assert_eq!(window.period(), "300s");
        // The interval itself is unchanged.
        assert_eq!((window.end - window.start).num_days(), 7);
    }

    #[test]
    fn interval_is_rfc3339() {
        let (start, end) = TimeWindow::last_days(1).interval();
        assert!(DateTime::parse_from_rfc3339(&start).is_ok());
        assert!(DateTime::parse_from_rfc3339(&end).is_ok());
    }
}
