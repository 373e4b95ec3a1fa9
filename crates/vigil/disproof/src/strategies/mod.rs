//! Built-in disproof strategies.

mod scope;
mod temporal;
mod threshold;

pub use scope::ScopeVerification;
pub use temporal::TemporalContradiction;
pub use threshold::{MetricThresholdValidation, ThresholdDirection};

use vigil_types::Hypothesis;

use crate::error::{DisproofError, DisproofResult};
use crate::source::MetricSample;

fn required_str<'h>(hypothesis: &'h Hypothesis, key: &str) -> DisproofResult<&'h str> {
    hypothesis
        .metadata_str(key)
        .ok_or_else(|| DisproofError::InvalidMetadata {
            key: key.to_string(),
            reason: "expected a non-empty string".into(),
        })
}

fn mean(samples: &[MetricSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use vigil_types::{Hypothesis, Incident, Severity, WorkerId};

    use crate::source::{InMemoryEvidenceSource, MetricSample};
    use crate::strategy::DisproofContext;

    pub fn incident_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
    }

    pub fn incident() -> Incident {
        Incident::new("INC-42", incident_start(), ["checkout", "payments"], Severity::High)
    }

    pub fn hypothesis() -> Hypothesis {
        Hypothesis::new(
            WorkerId::new("database"),
            "orders-db p99 latency exceeded 500ms at 13:55 UTC",
            0.6,
        )
        .unwrap()
    }

    /// One sample per minute from `from` for `minutes`, valued by `f(minute)`.
    pub fn series(
        from: DateTime<Utc>,
        minutes: i64,
        f: impl Fn(i64) -> f64,
    ) -> Vec<MetricSample> {
        (0..minutes)
            .map(|m| MetricSample::new(from + Duration::minutes(m), f(m)))
            .collect()
    }

    pub fn context<'a>(
        incident: &'a Incident,
        source: InMemoryEvidenceSource,
    ) -> DisproofContext<'a> {
        DisproofContext {
            incident,
            source: Arc::new(source),
        }
    }
}
