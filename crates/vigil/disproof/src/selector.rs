//! Strategy selection and registration.
//!
//! Selection looks only at which metadata keys a hypothesis carries. It does
//! not guarantee the chosen strategy can run: callers must pass the result
//! through [`StrategyRegistry::preflight`] before spending anything on it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use vigil_types::{metadata_keys, Hypothesis};

use crate::config::DisproofConfig;
use crate::error::{DisproofError, DisproofResult};
use crate::strategies::{MetricThresholdValidation, ScopeVerification, TemporalContradiction};
use crate::strategy::{DisproofStrategy, StrategyKind};

/// Picks a strategy kind from hypothesis metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategySelector;

impl StrategySelector {
    /// First match wins:
    ///
    /// 1. `metric` and `threshold` → metric threshold validation
    /// 2. `suspected_time` → temporal contradiction
    /// 3. `claimed_scope` → scope verification
    /// 4. otherwise temporal contradiction
    pub fn select(&self, hypothesis: &Hypothesis) -> StrategyKind {
        let kind = if hypothesis.has_metadata(metadata_keys::METRIC)
            && hypothesis.has_metadata(metadata_keys::THRESHOLD)
        {
            StrategyKind::MetricThresholdValidation
        } else if hypothesis.has_metadata(metadata_keys::SUSPECTED_TIME) {
            StrategyKind::TemporalContradiction
        } else if hypothesis.has_metadata(metadata_keys::CLAIMED_SCOPE) {
            StrategyKind::ScopeVerification
        } else {
            StrategyKind::TemporalContradiction
        };
        debug!(hypothesis = %hypothesis.id(), strategy = %kind, "Selected disproof strategy");
        kind
    }
}

/// Keys from `required` that `hypothesis` does not carry.
pub fn missing_metadata(hypothesis: &Hypothesis, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|key| !hypothesis.has_metadata(key))
        .map(|key| key.to_string())
        .collect()
}

/// Strategy implementations by kind.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyKind, Arc<dyn DisproofStrategy>>,
    selector: StrategySelector,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three built-in strategies.
    pub fn standard(config: &DisproofConfig) -> Self {
        Self::new()
            .with(Arc::new(TemporalContradiction::new(config.clone())))
            .with(Arc::new(ScopeVerification::new(config.clone())))
            .with(Arc::new(MetricThresholdValidation::new(config.clone())))
    }

    pub fn with(mut self, strategy: Arc<dyn DisproofStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Register a strategy, replacing any previous one of the same kind.
    pub fn register(&mut self, strategy: Arc<dyn DisproofStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn get(&self, kind: StrategyKind) -> DisproofResult<Arc<dyn DisproofStrategy>> {
        self.strategies
            .get(&kind)
            .cloned()
            .ok_or(DisproofError::StrategyNotRegistered(kind))
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<_> = self.strategies.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Select a strategy for `hypothesis` and check it has every metadata
    /// key the strategy requires.
    pub fn preflight(&self, hypothesis: &Hypothesis) -> DisproofResult<Arc<dyn DisproofStrategy>> {
        let kind = self.selector.select(hypothesis);
        let strategy = self.get(kind)?;
        let missing = missing_metadata(hypothesis, strategy.required_metadata_fields());
        if missing.is_empty() {
            Ok(strategy)
        } else {
            Err(DisproofError::MissingMetadata {
                strategy: kind,
                missing,
            })
        }
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.kinds())
            .finish()
    }
}
