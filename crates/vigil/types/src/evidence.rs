//! Evidence gathered while testing a hypothesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered grade of how directly a piece of evidence bears on a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceQuality {
    Weak,
    Circumstantial,
    Indirect,
    Corroborated,
    Direct,
}

impl EvidenceQuality {
    /// Fixed weight used by confidence revision.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Direct => 1.0,
            Self::Corroborated => 0.9,
            Self::Indirect => 0.6,
            Self::Circumstantial => 0.3,
            Self::Weak => 0.1,
        }
    }
}

impl std::fmt::Display for EvidenceQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "DIRECT"),
            Self::Corroborated => write!(f, "CORROBORATED"),
            Self::Indirect => write!(f, "INDIRECT"),
            Self::Circumstantial => write!(f, "CIRCUMSTANTIAL"),
            Self::Weak => write!(f, "WEAK"),
        }
    }
}

/// A piece of evidence for or against a hypothesis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Backend or query that produced it (e.g. `"metrics:p99_latency_ms"`).
    pub source: String,
    pub data: serde_json::Value,
    pub quality: EvidenceQuality,
    /// `true` if the evidence supports the hypothesis, `false` if it contradicts it.
    pub supports_hypothesis: bool,
    pub collected_at: DateTime<Utc>,
}

impl Evidence {
    pub fn supporting(
        source: impl Into<String>,
        quality: EvidenceQuality,
        data: serde_json::Value,
    ) -> Self {
        Self {
            source: source.into(),
            data,
            quality,
            supports_hypothesis: true,
            collected_at: Utc::now(),
        }
    }

    pub fn contradicting(
        source: impl Into<String>,
        quality: EvidenceQuality,
        data: serde_json::Value,
    ) -> Self {
        Self {
            supports_hypothesis: false,
            ..Self::supporting(source, quality, data)
        }
    }
}
