//! Falsifiable hypotheses about an incident's cause.
//!
//! `current_confidence` has no setter. It changes only through
//! [`Hypothesis::add_evidence`] and [`Hypothesis::record_disproof_attempt`],
//! both of which append to the ordered history and re-run
//! [`ConfidenceUpdater`] on the new entry. Deserialization goes through the
//! same rules: the initial confidence is validated and the current one is
//! replayed from the history, never read from the input.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceUpdater;
use crate::disproof::{withstood_disproof, DisproofAttempt};
use crate::error::{TypesError, TypesResult};
use crate::evidence::Evidence;
use crate::ids::{HypothesisId, WorkerId};

/// Well-known metadata keys consumed by disproof strategies.
pub mod metadata_keys {
    /// RFC 3339 timestamp (or unix seconds) at which the cause is claimed to occur.
    pub const SUSPECTED_TIME: &str = "suspected_time";
    /// Name of the metric the hypothesis is about.
    pub const METRIC: &str = "metric";
    /// Numeric threshold the metric is claimed to have crossed.
    pub const THRESHOLD: &str = "threshold";
    /// Service name or list of service names the impact is claimed to be confined to.
    pub const CLAIMED_SCOPE: &str = "claimed_scope";
    /// Optional `"above"` (default) or `"below"` for threshold crossings.
    pub const DIRECTION: &str = "direction";
}

/// One append to a hypothesis' history, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HypothesisEntry {
    Evidence(Evidence),
    DisproofAttempt(DisproofAttempt),
}

/// A specific, falsifiable claim about what caused an incident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HypothesisRecord")]
pub struct Hypothesis {
    id: HypothesisId,
    owner: WorkerId,
    statement: String,
    initial_confidence: f64,
    current_confidence: f64,
    affected_systems: Vec<String>,
    metadata: BTreeMap<String, serde_json::Value>,
    history: Vec<HypothesisEntry>,
    created_at: DateTime<Utc>,
}

/// Wire form of a [`Hypothesis`]. Any `current_confidence` in the input is
/// ignored.
#[derive(Deserialize)]
struct HypothesisRecord {
    #[serde(default)]
    id: HypothesisId,
    owner: WorkerId,
    statement: String,
    initial_confidence: f64,
    #[serde(default)]
    affected_systems: Vec<String>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    history: Vec<HypothesisEntry>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl TryFrom<HypothesisRecord> for Hypothesis {
    type Error = TypesError;

    fn try_from(record: HypothesisRecord) -> TypesResult<Self> {
        let mut hypothesis = Hypothesis::new(record.owner, record.statement, record.initial_confidence)?;
        hypothesis.id = record.id;
        hypothesis.affected_systems = record.affected_systems;
        hypothesis.metadata = record.metadata;
        hypothesis.created_at = record.created_at;
        hypothesis.current_confidence =
            ConfidenceUpdater.replay(hypothesis.initial_confidence, &record.history);
        hypothesis.history = record.history;
        Ok(hypothesis)
    }
}

impl Hypothesis {
    /// Create a hypothesis owned by `owner`.
    ///
    /// Fails if the statement is blank or the confidence lies outside `[0, 1]`.
    pub fn new(
        owner: WorkerId,
        statement: impl Into<String>,
        initial_confidence: f64,
    ) -> TypesResult<Self> {
        let statement = statement.into();
        if statement.trim().is_empty() {
            return Err(TypesError::EmptyStatement);
        }
        if !(0.0..=1.0).contains(&initial_confidence) {
            return Err(TypesError::InvalidConfidence(initial_confidence));
        }
        Ok(Self {
            id: HypothesisId::new(),
            owner,
            statement,
            initial_confidence,
            current_confidence: initial_confidence,
            affected_systems: Vec::new(),
            metadata: BTreeMap::new(),
            history: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn with_affected_systems(
        mut self,
        systems: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.affected_systems = systems.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> &HypothesisId {
        &self.id
    }

    pub fn owner(&self) -> &WorkerId {
        &self.owner
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn initial_confidence(&self) -> f64 {
        self.initial_confidence
    }

    pub fn current_confidence(&self) -> f64 {
        self.current_confidence
    }

    pub fn affected_systems(&self) -> &[String] {
        &self.affected_systems
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Full ordered history of evidence and disproof attempts.
    pub fn history(&self) -> &[HypothesisEntry] {
        &self.history
    }

    pub fn evidence(&self) -> impl Iterator<Item = &Evidence> {
        self.history.iter().filter_map(|entry| match entry {
            HypothesisEntry::Evidence(e) => Some(e),
            HypothesisEntry::DisproofAttempt(_) => None,
        })
    }

    pub fn disproof_attempts(&self) -> impl Iterator<Item = &DisproofAttempt> {
        self.history.iter().filter_map(|entry| match entry {
            HypothesisEntry::DisproofAttempt(a) => Some(a),
            HypothesisEntry::Evidence(_) => None,
        })
    }

    pub fn last_disproof_attempt(&self) -> Option<&DisproofAttempt> {
        self.disproof_attempts().last()
    }

    /// Survived at least one disproof attempt and was never disproven.
    pub fn withstood_disproof(&self) -> bool {
        withstood_disproof(self.disproof_attempts())
    }

    // ── Metadata helpers ─────────────────────────────────────────────

    /// Whether `key` is present with a usable value. `null` and blank
    /// strings count as absent.
    pub fn has_metadata(&self, key: &str) -> bool {
        match self.metadata.get(key) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(serde_json::Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Numeric metadata; numeric strings (`"500"`) are accepted too.
    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        match self.metadata.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamp metadata as RFC 3339 or integer unix seconds.
    pub fn metadata_time(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.metadata.get(key)? {
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            serde_json::Value::Number(n) => {
                n.as_i64().and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            }
            _ => None,
        }
    }

    /// String or list-of-strings metadata.
    pub fn metadata_list(&self, key: &str) -> Vec<String> {
        match self.metadata.get(key) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Drop metadata entries that are present but carry no usable value.
    /// Returns the removed keys.
    pub fn strip_empty_metadata(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .metadata
            .keys()
            .filter(|k| !self.has_metadata(k))
            .cloned()
            .collect();
        for key in &empty {
            self.metadata.remove(key);
        }
        empty
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Append one piece of evidence and revise confidence. Returns the new
    /// confidence.
    pub fn add_evidence(&mut self, evidence: Evidence) -> f64 {
        let entry = HypothesisEntry::Evidence(evidence);
        self.current_confidence = ConfidenceUpdater.apply(self.current_confidence, &entry);
        self.history.push(entry);
        self.current_confidence
    }

    /// Append a disproof attempt and revise confidence. Returns the new
    /// confidence.
    pub fn record_disproof_attempt(&mut self, attempt: DisproofAttempt) -> f64 {
        let entry = HypothesisEntry::DisproofAttempt(attempt);
        self.current_confidence = ConfidenceUpdater.apply(self.current_confidence, &entry);
        self.history.push(entry);
        self.current_confidence
    }

    /// Confidence re-derived from scratch from the recorded history.
    pub fn replayed_confidence(&self) -> f64 {
        ConfidenceUpdater.replay(self.initial_confidence, &self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disproof::DisproofOutcome;
    use crate::evidence::EvidenceQuality;
    use serde_json::json;

    fn hypothesis(confidence: f64) -> Hypothesis {
        Hypothesis::new(
            WorkerId::new("database"),
            "orders-db p99 latency exceeded 500ms at 14:02 UTC due to lock contention",
            confidence,
        )
        .unwrap()
    }

    #[test]
    fn deserialize_replays_current_confidence() {
        let mut h = hypothesis(0.1);
        h.add_evidence(Evidence::supporting("metrics", EvidenceQuality::Weak, json!(1)));
        let mut value = serde_json::to_value(&h).unwrap();
        value["current_confidence"] = json!(0.99);

        let parsed: Hypothesis = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.id(), h.id());
        assert_eq!(parsed.current_confidence(), h.current_confidence());
        assert_eq!(parsed.current_confidence(), parsed.replayed_confidence());
        assert!(parsed.current_confidence() < 0.2);
    }

    #[test]
    fn deserialize_validates_like_new() {
        let drafted = json!({
            "owner": "application",
            "statement": "checkout pods were OOM-killed",
            "initial_confidence": 1.4,
        });
        assert!(serde_json::from_value::<Hypothesis>(drafted).is_err());

        let blank = json!({"owner": "application", "statement": " ", "initial_confidence": 0.4});
        assert!(serde_json::from_value::<Hypothesis>(blank).is_err());

        let minimal = json!({
            "owner": "application",
            "statement": "checkout pods were OOM-killed",
            "initial_confidence": 0.4,
            "current_confidence": 0.9,
        });
        let h: Hypothesis = serde_json::from_value(minimal).unwrap();
        assert_eq!(h.current_confidence(), 0.4);
        assert!(h.history().is_empty());
    }

    #[test]
    fn withstood_ignores_inconclusive_attempts() {
        let mut h = hypothesis(0.8);
        h.record_disproof_attempt(DisproofAttempt::inconclusive("preflight", "metadata missing"));
        assert!(!h.withstood_disproof());
        h.record_disproof_attempt(DisproofAttempt::survived("scope_verification", "matched"));
        assert!(h.withstood_disproof());
    }

    #[test]
    fn rejects_blank_statement() {
        let err = Hypothesis::new(WorkerId::new("app"), "   ", 0.5).unwrap_err();
        assert_eq!(err, TypesError::EmptyStatement);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(Hypothesis::new(WorkerId::new("app"), "x", 1.2).is_err());
        assert!(Hypothesis::new(WorkerId::new("app"), "x", -0.1).is_err());
        assert!(Hypothesis::new(WorkerId::new("app"), "x", f64::NAN).is_err());
    }

    #[test]
    fn disproof_attempt_revises_confidence() {
        let mut h = hypothesis(0.5);
        let c = h.record_disproof_attempt(DisproofAttempt::survived("s", "held"));
        assert!((c - 0.575).abs() < 1e-12);
        assert_eq!(h.current_confidence(), c);
        assert_eq!(h.initial_confidence(), 0.5);

        h.record_disproof_attempt(DisproofAttempt::disproven("s", "metric flat"));
        assert_eq!(h.current_confidence(), 0.2);
        assert_eq!(
            h.last_disproof_attempt().map(|a| a.outcome),
            Some(DisproofOutcome::Disproven)
        );
    }

    #[test]
    fn evidence_append_revises_confidence() {
        let mut h = hypothesis(0.5);
        let c = h.add_evidence(Evidence::supporting(
            "metrics",
            EvidenceQuality::Direct,
            json!({"p99": 812}),
        ));
        assert!(c > 0.5);
        assert_eq!(h.evidence().count(), 1);
        assert_eq!(h.disproof_attempts().count(), 0);
    }

    #[test]
    fn replay_reproduces_current() {
        let mut h = hypothesis(0.6);
        h.add_evidence(Evidence::supporting("a", EvidenceQuality::Indirect, json!(null)));
        h.record_disproof_attempt(DisproofAttempt::survived("s", "ok"));
        h.add_evidence(Evidence::contradicting("b", EvidenceQuality::Weak, json!(null)));
        h.record_disproof_attempt(DisproofAttempt::inconclusive("s", "gap"));
        assert_eq!(h.replayed_confidence(), h.current_confidence());
        assert_eq!(h.history().len(), 4);
    }

    #[test]
    fn serde_roundtrip_preserves_replay() {
        let mut h = hypothesis(0.6).with_metadata(metadata_keys::METRIC, "p99_latency_ms");
        h.add_evidence(Evidence::supporting("a", EvidenceQuality::Direct, json!(1)));
        let json = serde_json::to_string(&h).unwrap();
        let back: Hypothesis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.replayed_confidence(), back.current_confidence());
        assert_eq!(back.metadata_str(metadata_keys::METRIC), Some("p99_latency_ms"));
    }

    #[test]
    fn metadata_helpers() {
        let h = hypothesis(0.5)
            .with_metadata(metadata_keys::METRIC, "error_rate")
            .with_metadata(metadata_keys::THRESHOLD, "0.05")
            .with_metadata(metadata_keys::SUSPECTED_TIME, "2024-03-01T14:02:00Z")
            .with_metadata(metadata_keys::CLAIMED_SCOPE, json!(["checkout", "cart"]))
            .with_metadata("empty", "  ")
            .with_metadata("nothing", json!(null));

        assert!(h.has_metadata(metadata_keys::METRIC));
        assert_eq!(h.metadata_f64(metadata_keys::THRESHOLD), Some(0.05));
        assert!(h.metadata_time(metadata_keys::SUSPECTED_TIME).is_some());
        assert_eq!(h.metadata_list(metadata_keys::CLAIMED_SCOPE), vec!["checkout", "cart"]);
        assert!(!h.has_metadata("empty"));
        assert!(!h.has_metadata("nothing"));
        assert!(!h.has_metadata("missing"));
    }

    #[test]
    fn unix_seconds_suspected_time() {
        let h = hypothesis(0.5).with_metadata(metadata_keys::SUSPECTED_TIME, 1_709_301_720);
        let t = h.metadata_time(metadata_keys::SUSPECTED_TIME).unwrap();
        assert_eq!(t.timestamp(), 1_709_301_720);
    }

    #[test]
    fn strip_empty_metadata_removes_placeholders() {
        let mut h = hypothesis(0.5)
            .with_metadata(metadata_keys::METRIC, "cpu")
            .with_metadata(metadata_keys::THRESHOLD, json!(null))
            .with_metadata(metadata_keys::CLAIMED_SCOPE, json!([]));
        let mut removed = h.strip_empty_metadata();
        removed.sort();
        assert_eq!(removed, vec!["claimed_scope", "threshold"]);
        assert!(h.has_metadata(metadata_keys::METRIC));
        assert_eq!(h.metadata().len(), 1);
    }
}
