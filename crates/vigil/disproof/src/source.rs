//! Evidence-gathering port.
//!
//! Strategies query observability backends only through [`EvidenceSource`];
//! wire protocols live in the implementations. [`InMemoryEvidenceSource`]
//! serves canned data for tests and dry runs.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use vigil_types::{Cost, TimeRange};

use crate::error::{DisproofError, DisproofResult};

/// One point of a metric time series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub at: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(at: DateTime<Utc>, value: f64) -> Self {
        Self { at, value }
    }
}

/// A query result together with what the query cost.
#[derive(Clone, Debug, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub cost: Cost,
}

impl<T> Metered<T> {
    pub fn new(value: T, cost: Cost) -> Self {
        Self { value, cost }
    }
}

/// Capability for querying observability backends during the Act phase.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Samples of `metric` whose timestamps fall inside `window`, oldest first.
    async fn metric_series(
        &self,
        metric: &str,
        window: TimeRange,
    ) -> DisproofResult<Metered<Vec<MetricSample>>>;

    /// Services showing incident impact during `window`.
    async fn impacted_services(
        &self,
        window: TimeRange,
    ) -> DisproofResult<Metered<BTreeSet<String>>>;
}

/// Evidence source backed by in-memory data.
#[derive(Debug, Default)]
pub struct InMemoryEvidenceSource {
    series: HashMap<String, Vec<MetricSample>>,
    impacted: BTreeSet<String>,
    failing_metrics: HashSet<String>,
    query_cost: Cost,
    queries: Mutex<Vec<String>>,
}

impl InMemoryEvidenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric series. Samples are kept sorted by time.
    pub fn with_series(
        mut self,
        metric: impl Into<String>,
        samples: impl IntoIterator<Item = MetricSample>,
    ) -> Self {
        let mut samples: Vec<MetricSample> = samples.into_iter().collect();
        samples.sort_by_key(|s| s.at);
        self.series.insert(metric.into(), samples);
        self
    }

    pub fn with_impacted_services(
        mut self,
        services: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.impacted = services.into_iter().map(Into::into).collect();
        self
    }

    /// Make every query for `metric` fail with a backend error.
    pub fn with_failing_metric(mut self, metric: impl Into<String>) -> Self {
        self.failing_metrics.insert(metric.into());
        self
    }

    /// Cost charged for each query.
    pub fn with_query_cost(mut self, cost: Cost) -> Self {
        self.query_cost = cost;
        self
    }

    /// Queries issued so far, in order (`"metric:<name>"` or `"impact"`).
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl EvidenceSource for InMemoryEvidenceSource {
    async fn metric_series(
        &self,
        metric: &str,
        window: TimeRange,
    ) -> DisproofResult<Metered<Vec<MetricSample>>> {
        self.queries.lock().push(format!("metric:{metric}"));
        if self.failing_metrics.contains(metric) {
            return Err(DisproofError::Source(format!(
                "metrics backend unavailable for '{metric}'"
            )));
        }
        let samples = self
            .series
            .get(metric)
            .map(|all| {
                all.iter()
                    .filter(|s| window.contains(s.at))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Metered::new(samples, self.query_cost))
    }

    async fn impacted_services(
        &self,
        _window: TimeRange,
    ) -> DisproofResult<Metered<BTreeSet<String>>> {
        self.queries.lock().push("impact".to_string());
        Ok(Metered::new(self.impacted.clone(), self.query_cost))
    }
}
