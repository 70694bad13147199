use crate::config::MasteryParams;
use crate::{DIFFICULTY_MAX, DIFFICULTY_MIN};

/// Difficulty-weighted EMA update of the mastery estimate.
///
/// The pull term is `correct − m`, so the update is deliberately asymmetric:
/// a correct answer at a hard level raises mastery more, and an incorrect
/// answer at a hard level lowers it more. A correct answer at the top level
/// that lands at or above the ceiling threshold snaps to exactly 1.0 so the
/// estimate can terminate instead of asymptoting.
pub fn update_mastery(
    params: &MasteryParams,
    current_mastery: f64,
    is_correct: bool,
    difficulty: i32,
) -> f64 {
    let m = sanitize_unit(current_mastery);
    let target = if is_correct { 1.0 } else { 0.0 };
    let weight = difficulty_weight(params, difficulty);

    let mut m_new = (m + params.alpha * weight * (target - m)).clamp(0.0, 1.0);
    if is_correct && difficulty >= DIFFICULTY_MAX && m_new >= params.ceiling_threshold {
        m_new = 1.0;
    }
    m_new
}

pub fn difficulty_weight(params: &MasteryParams, difficulty: i32) -> f64 {
    let level = difficulty.clamp(DIFFICULTY_MIN, DIFFICULTY_MAX);
    params.difficulty_weights[(level - 1) as usize]
}

/// Coerce a nominally-[0,1] input: non-finite values fall back to 0.
pub fn sanitize_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
