// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025-2026 JR Morton

//! cloudsift — correlation and predicate-filter engine for cloud resource
//! policies.
//!
//! Given locally-known resources and a remotely-fetched collection of metric
//! time series or finding events, the engine correlates each record to a
//! resource via keys extracted from both sides, annotates every resource
//! with its correlated data, and retains the subset that satisfies a
//! configured predicate — a numeric threshold for metrics, a structured
//! match for findings.
//!
//! The pipeline per evaluation run:
//! resources + config → [`query`] filter expression → caller fetches via
//! [`remote::RecordSource`] → [`correlate`] index by key → per resource:
//! [`path`] key extraction → [`annotate`] → predicate ([`engine`]) →
//! retained subset.
//!
//! The engine does no network I/O, holds no state across invocations, and
//! is synchronous: all inputs are fully materialized before it runs.

pub mod annotate;
pub mod config;
pub mod correlate;
pub mod engine;
pub mod ops;
pub mod path;
pub mod query;
pub mod remote;
pub mod util;

pub use config::{Aligner, FilterDef, FindingsFilterDef, MatchMode, MetricFilterDef, Reducer};
pub use engine::{run_registered, Filter, FindingsFilter, FindingsMatcher, MetricFilter};
pub use ops::{Cmp, Comparison};
pub use path::PathExpr;
pub use remote::{Aggregation, RecordSource, ResourceRegistry, TimeWindow};
