//! The four phases of the investigation loop.

use serde::{Deserialize, Serialize};

/// Observe–Orient–Decide–Act phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OodaPhase {
    Observe,
    Orient,
    Decide,
    Act,
}

impl OodaPhase {
    pub const ALL: [OodaPhase; 4] = [Self::Observe, Self::Orient, Self::Decide, Self::Act];
}

impl std::fmt::Display for OodaPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Observe => write!(f, "observe"),
            Self::Orient => write!(f, "orient"),
            Self::Decide => write!(f, "decide"),
            Self::Act => write!(f, "act"),
        }
    }
}
