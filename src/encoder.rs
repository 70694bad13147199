use crate::mastery::sanitize_unit;
use crate::types::EmotionSignal;
use crate::STATE_DIM;

/// Consecutive-wrong counts saturate here before normalization.
const CONSECUTIVE_WRONG_CAP: u32 = 3;

/// Inputs for one context vector. All fields are sanitized individually; the
/// encoder itself holds no state.
#[derive(Debug, Clone, Copy)]
pub struct ContextInputs {
    pub mastery: f64,
    pub emotions: EmotionSignal,
    pub is_correct: bool,
    pub recent_accuracy: f64,
    pub recent_positive_avg: f64,
    pub consecutive_wrong: u32,
}

/// Build the 6-dim context vector consumed by the bandit. Every component is
/// clamped to [0,1]; non-finite inputs collapse to 0 before clamping.
pub fn build_context(inputs: &ContextInputs) -> [f64; STATE_DIM] {
    let capped_wrong = inputs.consecutive_wrong.min(CONSECUTIVE_WRONG_CAP);
    [
        sanitize_unit(inputs.mastery),
        sanitize_unit(inputs.recent_positive_avg),
        sanitize_unit(inputs.emotions.frustrated),
        if inputs.is_correct { 1.0 } else { 0.0 },
        sanitize_unit(inputs.recent_accuracy),
        capped_wrong as f64 / CONSECUTIVE_WRONG_CAP as f64,
    ]
}
