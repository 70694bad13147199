use serde::{Deserialize, Serialize};

use crate::STATE_DIM;

/// Difficulty delta the policy can apply between consecutive questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Action {
    Lower,
    #[default]
    Hold,
    Raise,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Lower, Action::Hold, Action::Raise];

    pub fn delta(&self) -> i32 {
        match self {
            Self::Lower => -1,
            Self::Hold => 0,
            Self::Raise => 1,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Lower => 0,
            Self::Hold => 1,
            Self::Raise => 2,
        }
    }

    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Lower,
            2 => Self::Raise,
            _ => Self::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Hold => "hold",
            Self::Raise => "raise",
        }
    }
}

/// Fused affect scores produced upstream by the emotion-inference pipeline.
///
/// Values are nominally probabilities in [0,1] but are not trusted: the
/// engine coerces non-finite or out-of-range values before use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSignal {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub frustrated: f64,
}

/// One answered question, as reported by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub current_mastery: f64,
    pub current_difficulty: i32,
    pub is_correct: bool,
    #[serde(default)]
    pub emotions: EmotionSignal,
}

/// How the chosen action was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Warmup,
    Explore,
    Exploit,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Explore => "explore",
            Self::Exploit => "exploit",
        }
    }
}

/// Decision bundle returned to the caller after each answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDecision {
    pub next_difficulty: i32,
    pub updated_mastery: f64,
    pub reward: f64,
    pub chosen_delta: i32,
    pub recent_acc: f64,
    pub source: DecisionSource,
}

/// Read-only view of one session's learning state, for observability.
///
/// Nothing consumes this inside the engine; it exists so operators can
/// inspect a live session without giving anyone a mutation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub steps: u64,
    pub epsilon: f64,
    pub q: [f64; 3],
    pub n: [u64; 3],
    pub a: [[[f64; STATE_DIM]; STATE_DIM]; 3],
    pub b: [[f64; STATE_DIM]; 3],
    pub recent: Vec<f64>,
    pub recent_pos: Vec<f64>,
    pub consecutive_wrong: u32,
    pub pending_delta: Option<i32>,
    pub last_updated: i64,
}
