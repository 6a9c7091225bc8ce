//! Stage automaton for a single evaluation call.

use serde::{Deserialize, Serialize};

/// Evaluation stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStage {
    /// Claim and stamps accepted, nothing checked yet.
    Received,
    /// Checking claim geometry and time window.
    ValidatingClaim,
    /// Looking up the owning plugin of every stamp.
    ResolvingPlugins,
    /// Awaiting plugin verification of every stamp.
    Verifying,
    /// Computing spatial, temporal and correlation scores.
    Scoring,
    /// Terminal state - vector produced.
    Done,
    /// Terminal state - evaluation aborted.
    Failed,
}

impl EvaluationStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Get valid transitions from current stage.
    pub fn valid_transitions(&self) -> &'static [EvaluationStage] {
        match self {
            Self::Received => &[Self::ValidatingClaim, Self::Failed],
            Self::ValidatingClaim => &[Self::ResolvingPlugins, Self::Failed],
            Self::ResolvingPlugins => &[Self::Verifying, Self::Failed],
            Self::Verifying => &[Self::Scoring, Self::Failed],
            Self::Scoring => &[Self::Done, Self::Failed],
            Self::Done => &[],
            Self::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: EvaluationStage) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::ValidatingClaim => write!(f, "validating_claim"),
            Self::ResolvingPlugins => write!(f, "resolving_plugins"),
            Self::Verifying => write!(f, "verifying"),
            Self::Scoring => write!(f, "scoring"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
