//! Filter definitions and validation.
//!
//! Raw definitions deserialize from YAML the way policy rule files do; all
//! semantic checks (operator names, path syntax, required pairings) happen in
//! `validate()`, producing the tagged [`Filter`](crate::engine::Filter)
//! variant before any evaluation runs. Unknown aligner/reducer names are
//! rejected by serde at parse time.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::{Filter, FindingsFilter, FindingsMatcher, MetricFilter};
use crate::ops::Comparison;
use crate::path::PathExpr;

// ── Aggregation mode enums ───────────────────────────────────────────────────

/// Per-series alignment strategy for resampling a metric time series onto a
/// fixed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aligner {
    #[default]
    AlignNone,
    AlignDelta,
    AlignRate,
    AlignInterpolate,
    AlignMin,
    AlignMax,
    AlignMean,
    AlignCount,
    AlignSum,
    AlignStddev,
    AlignCountTrue,
    AlignCountFalse,
    AlignFractionTrue,
    #[serde(rename = "ALIGN_PERCENTILE_99")]
    AlignPercentile99,
    #[serde(rename = "ALIGN_PERCENTILE_95")]
    AlignPercentile95,
    #[serde(rename = "ALIGN_PERCENTILE_50")]
    AlignPercentile50,
    #[serde(rename = "ALIGN_PERCENTILE_05")]
    AlignPercentile05,
    AlignPercentChange,
}

impl Aligner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aligner::AlignNone => "ALIGN_NONE",
            Aligner::AlignDelta => "ALIGN_DELTA",
            Aligner::AlignRate => "ALIGN_RATE",
            Aligner::AlignInterpolate => "ALIGN_INTERPOLATE",
            Aligner::AlignMin => "ALIGN_MIN",
            Aligner::AlignMax => "ALIGN_MAX",
            Aligner::AlignMean => "ALIGN_MEAN",
            Aligner::AlignCount => "ALIGN_COUNT",
            Aligner::AlignSum => "ALIGN_SUM",
            Aligner::AlignStddev => "ALIGN_STDDEV",
            Aligner::AlignCountTrue => "ALIGN_COUNT_TRUE",
            Aligner::AlignCountFalse => "ALIGN_COUNT_FALSE",
            Aligner::AlignFractionTrue => "ALIGN_FRACTION_TRUE",
            Aligner::AlignPercentile99 => "ALIGN_PERCENTILE_99",
            Aligner::AlignPercentile95 => "ALIGN_PERCENTILE_95",
            Aligner::AlignPercentile50 => "ALIGN_PERCENTILE_50",
            Aligner::AlignPercentile05 => "ALIGN_PERCENTILE_05",
            Aligner::AlignPercentChange => "ALIGN_PERCENT_CHANGE",
        }
    }
}

/// Cross-series reduction strategy for combining multiple time series into
/// one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reducer {
    #[default]
    ReduceNone,
    ReduceMean,
    ReduceMin,
    ReduceMax,
    ReduceSum,
    ReduceStddev,
    ReduceCount,
    ReduceCountTrue,
    ReduceCountFalse,
    ReduceFractionTrue,
    #[serde(rename = "REDUCE_PERCENTILE_99")]
    ReducePercentile99,
    #[serde(rename = "REDUCE_PERCENTILE_95")]
    ReducePercentile95,
    #[serde(rename = "REDUCE_PERCENTILE_50")]
    ReducePercentile50,
    #[serde(rename = "REDUCE_PERCENTILE_05")]
    ReducePercentile05,
}

impl Reducer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::ReduceNone => "REDUCE_NONE",
            Reducer::ReduceMean => "REDUCE_MEAN",
            Reducer::ReduceMin => "REDUCE_MIN",
            Reducer::ReduceMax => "REDUCE_MAX",
            Reducer::ReduceSum => "REDUCE_SUM",
            Reducer::ReduceStddev => "REDUCE_STDDEV",
            Reducer::ReduceCount => "REDUCE_COUNT",
            Reducer::ReduceCountTrue => "REDUCE_COUNT_TRUE",
            Reducer::ReduceCountFalse => "REDUCE_COUNT_FALSE",
            Reducer::ReduceFractionTrue => "REDUCE_FRACTION_TRUE",
            Reducer::ReducePercentile99 => "REDUCE_PERCENTILE_99",
            Reducer::ReducePercentile95 => "REDUCE_PERCENTILE_95",
            Reducer::ReducePercentile50 => "REDUCE_PERCENTILE_50",
            Reducer::ReducePercentile05 => "REDUCE_PERCENTILE_05",
        }
    }
}

/// Whether a structured match requires any element or every element of the
/// correlated finding list to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

// ── Raw definitions ──────────────────────────────────────────────────────────

/// Threshold filter definition as written in a filter file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetricFilterDef {
    /// Metric type name, e.g. `firewallinsights.googleapis.com/subnet/firewall_hit_count`.
    pub name: String,
    /// Path extracting the correlation key from each local resource.
    pub resource_key: String,
    /// Path extracting the correlation key from each fetched record; also
    /// sent verbatim as the server-side label selector.
    pub metric_key: String,
    #[serde(default)]
    pub group_by_fields: Vec<String>,
    /// Query window size in days.
    #[serde(default = "default_days")]
    pub days: i64,
    pub op: String,
    #[serde(default)]
    pub reducer: Reducer,
    #[serde(default)]
    pub aligner: Aligner,
    /// Threshold the observed value is compared against.
    pub value: f64,
    /// Alignment period override in seconds; defaults to the whole window.
    #[serde(default)]
    pub period: Option<i64>,
    /// Observed value to assume when no record correlates.
    #[serde(default)]
    pub missing_value: f64,
}

fn default_days() -> i64 {
    14
}

/// Findings filter definition as written in a filter file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FindingsFilterDef {
    /// Organization the findings are fetched under.
    pub org: i64,
    /// Path extracting the correlation key from each local resource. When
    /// absent the host registry supplies it, falling back to `name`.
    #[serde(default)]
    pub resource_key: Option<String>,
    /// Path extracting the qualified resource name from each finding record.
    #[serde(default = "default_record_key")]
    pub record_key: String,
    /// Server-side field the query filter matches identifiers against.
    #[serde(default = "default_match_field")]
    pub match_field: String,
    /// Optional sub-path evaluated within each correlated finding. Without
    /// it the predicate is a pure existence check.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

fn default_record_key() -> String {
    "finding.resourceName".to_string()
}

fn default_match_field() -> String {
    "resourceName".to_string()
}

/// A filter definition of either variant, tagged by `type`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FilterDef {
    Metrics(MetricFilterDef),
    SccFindings(FindingsFilterDef),
}

/// Top-level YAML structure of a filter file.
#[derive(Debug, Deserialize)]
struct FilterFile {
    #[serde(default)]
    filters: Vec<FilterDef>,
}

// ── Validation ───────────────────────────────────────────────────────────────

impl MetricFilterDef {
    pub fn validate(&self) -> Result<MetricFilter> {
        ensure!(!self.name.is_empty(), "metric filter requires a metric type name");
        ensure!(self.days > 0, "days must be positive, got {}", self.days);
        if let Some(period) = self.period {
            ensure!(period > 0, "period must be positive, got {}", period);
        }
        let resource_key = PathExpr::parse(&self.resource_key)
            .with_context(|| format!("invalid resource-key in metric filter '{}'", self.name))?;
        let metric_key = PathExpr::parse(&self.metric_key)
            .with_context(|| format!("invalid metric-key in metric filter '{}'", self.name))?;
        let comparison = Comparison::new(&self.op, json!(self.value))
            .with_context(|| format!("invalid op in metric filter '{}'", self.name))?;
        Ok(MetricFilter {
            name: self.name.clone(),
            resource_key,
            metric_key,
            group_by_fields: self.group_by_fields.clone(),
            days: self.days,
            period: self.period,
            aligner: self.aligner,
            reducer: self.reducer,
            comparison,
            missing_value: self.missing_value,
        })
    }
}

impl FindingsFilterDef {
    pub fn validate(&self) -> Result<FindingsFilter> {
        ensure!(self.org > 0, "findings filter requires a positive org id");
        let resource_key_str = self.resource_key.as_deref().unwrap_or("name");
        let resource_key = PathExpr::parse(resource_key_str)
            .context("invalid resource-key in findings filter")?;
        let record_key = PathExpr::parse(&self.record_key)
            .context("invalid record-key in findings filter")?;

        let matcher = match (&self.key, &self.value) {
            (Some(key), Some(value)) => {
                let key = PathExpr::parse(key).context("invalid key in findings filter")?;
                let op = self.op.as_deref().unwrap_or("equal");
                let comparison = Comparison::new(op, value.clone())
                    .context("invalid op in findings filter")?;
                Some(FindingsMatcher { key, comparison })
            }
            (Some(_), None) => bail!("findings filter key requires a value to compare against"),
            (None, Some(_)) => bail!("findings filter value requires a key to extract"),
            (None, None) => {
                if self.op.is_some() {
                    bail!("findings filter op requires a key and value");
                }
                None
            }
        };

        Ok(FindingsFilter {
            org: self.org,
            resource_key,
            record_key,
            match_field: self.match_field.clone(),
            matcher,
            mode: self.match_mode,
        })
    }
}

impl FilterDef {
    /// Validate into the tagged engine variant. All configuration errors
    /// surface here, before any evaluation runs.
    pub fn validate(&self) -> Result<Filter> {
        match self {
            FilterDef::Metrics(def) => Ok(Filter::Metric(def.validate()?)),
            FilterDef::SccFindings(def) => Ok(Filter::Findings(def.validate()?)),
        }
    }

    /// Fill an absent findings resource-key from the host registry's entry
    /// for `resource_type`. Metric definitions carry their own key.
    pub fn resolve_resource_key(
        &mut self,
        registry: &dyn crate::remote::ResourceRegistry,
        resource_type: &str,
    ) {
        if let FilterDef::SccFindings(def) = self {
            if def.resource_key.is_none() {
                def.resource_key = registry.resource_key(resource_type).map(str::to_string);
            }
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// Load all `.yaml`/`.yml` filter definition files from a directory.
/// A missing directory yields an empty set.
pub fn load_defs(dir: &Path) -> Result<Vec<FilterDef>> {
    let mut defs = Vec::new();

    if !dir.exists() {
        return Ok(defs);
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read filter dir: {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let file: FilterFile = serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                defs.extend(file.filters);
            }
            _ => {}
        }
    }

    tracing::debug!(count = defs.len(), dir = %dir.display(), "loaded filter definitions");
    Ok(defs)
}

/// Load and validate every definition in a directory.
pub fn load(dir: &Path) -> Result<Vec<Filter>> {
    load_defs(dir)?.iter().map(FilterDef::validate).collect()
}
