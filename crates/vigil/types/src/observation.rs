//! Exploratory observations gathered during the Observe phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::WorkerId;

/// Something a worker noticed while surveying the incident window.
///
/// Observations are not tied to any hypothesis. The producing worker owns
/// them until the orchestrator copies them into the investigation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Worker that produced the observation.
    pub source: WorkerId,
    /// Raw payload (query result, log excerpt, metric snapshot).
    pub data: serde_json::Value,
    /// Human-readable summary.
    pub description: String,
    /// How much the worker trusts this observation (0.0 to 1.0).
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        source: WorkerId,
        description: impl Into<String>,
        data: serde_json::Value,
        confidence: f64,
    ) -> Self {
        Self {
            source,
            data,
            description: description.into(),
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            timestamp: Utc::now(),
        }
    }
}
