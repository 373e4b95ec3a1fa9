//! Incidents and the time windows investigated around them.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};
use crate::ids::IncidentId;

/// Severity assigned to an incident by whoever raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A production incident under investigation.
///
/// Immutable once an investigation has been created from it: the
/// investigation holds its own copy and exposes it by shared reference only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub started_at: DateTime<Utc>,
    pub affected_services: BTreeSet<String>,
    pub severity: Severity,
}

impl Incident {
    pub fn new(
        id: impl Into<String>,
        started_at: DateTime<Utc>,
        affected_services: impl IntoIterator<Item = impl Into<String>>,
        severity: Severity,
    ) -> Self {
        Self {
            id: IncidentId::new(id),
            started_at,
            affected_services: affected_services.into_iter().map(Into::into).collect(),
            severity,
        }
    }

    /// Window spanning `lookback` before the incident start to `lookahead` after it.
    pub fn observation_window(&self, lookback: Duration, lookahead: Duration) -> TimeRange {
        TimeRange {
            start: self.started_at - lookback,
            end: self.started_at + lookahead,
        }
    }
}

/// Closed time interval `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> TypesResult<Self> {
        if end < start {
            return Err(TypesError::InvalidTimeRange);
        }
        Ok(Self { start, end })
    }

    /// Symmetric window of `radius` on each side of `center`.
    pub fn around(center: DateTime<Utc>, radius: Duration) -> Self {
        let radius = radius.abs();
        Self {
            start: center - radius,
            end: center + radius,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn around_is_symmetric() {
        let t = Utc::now();
        let range = TimeRange::around(t, Duration::hours(1));
        assert_eq!(range.duration(), Duration::hours(2));
        assert!(range.contains(t));
        assert!(range.contains(t - Duration::minutes(59)));
        assert!(!range.contains(t + Duration::minutes(61)));
    }

    #[test]
    fn inverted_range_rejected() {
        let t = Utc::now();
        assert_eq!(
            TimeRange::new(t, t - Duration::seconds(1)),
            Err(TypesError::InvalidTimeRange)
        );
        assert!(TimeRange::new(t, t).is_ok());
    }

    #[test]
    fn incident_collects_services() {
        let incident = Incident::new("INC-1", Utc::now(), ["checkout", "payments"], Severity::High);
        assert_eq!(incident.affected_services.len(), 2);
        assert!(incident.affected_services.contains("checkout"));
        assert_eq!(incident.id.to_string(), "INC-1");
    }
}
