use crate::config::RewardParams;
use crate::mastery::sanitize_unit;
use crate::types::EmotionSignal;
use crate::{DIFFICULTY_MAX, DIFFICULTY_MIN};

/// The difficulty level a learner at this mastery should be working at.
/// Reward penalizes deviation from it, which keeps the policy from camping
/// at the extremes of the scale.
pub fn target_difficulty(mastery: f64) -> i32 {
    let m = sanitize_unit(mastery);
    if m < 0.20 {
        1
    } else if m < 0.40 {
        2
    } else if m < 0.60 {
        3
    } else if m < 0.80 {
        4
    } else {
        5
    }
}

/// Inputs for reward shaping. `difficulty` is the level the answered
/// question was actually posed at, not the level about to be chosen.
#[derive(Debug, Clone, Copy)]
pub struct RewardInputs {
    pub is_correct: bool,
    pub emotions: EmotionSignal,
    pub difficulty: i32,
    pub delta_mastery: f64,
    pub mastery_after: f64,
    pub recent_positive_avg: f64,
}

/// Bounded scalar reward blending correctness, engagement, mastery gain and
/// soft difficulty-zone constraints.
pub fn compute_reward(params: &RewardParams, inputs: &RewardInputs) -> f64 {
    let difficulty = inputs.difficulty.clamp(DIFFICULTY_MIN, DIFFICULTY_MAX);
    let pos = sanitize_unit(inputs.recent_positive_avg);
    let fru = sanitize_unit(inputs.emotions.frustrated);

    let engagement = pos - fru;
    let correctness = if inputs.is_correct { 1.0 } else { -1.0 };
    let diff_bonus = if inputs.is_correct {
        params.difficulty_bonus * difficulty as f64
    } else {
        0.0
    };
    let zone_target = target_difficulty(inputs.mastery_after);
    let zone_penalty = -params.zone_lambda * (difficulty - zone_target).abs() as f64;
    let fru_penalty =
        -params.frustration_kappa * fru * (difficulty - 3).max(0) as f64;

    let delta_mastery = if inputs.delta_mastery.is_finite() {
        inputs.delta_mastery
    } else {
        0.0
    };

    let reward = correctness
        + params.engagement_weight * engagement
        + params.mastery_gain_weight * delta_mastery
        + diff_bonus
        + zone_penalty
        + fru_penalty;

    reward.clamp(params.min_reward, params.max_reward)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inputs() -> RewardInputs {
        RewardInputs {
            is_correct: true,
            emotions: EmotionSignal {
                positive: 0.8,
                frustrated: 0.1,
            },
            difficulty: 3,
            delta_mastery: 0.12,
            mastery_after: 0.62,
            recent_positive_avg: 0.8,
        }
    }

    #[test]
    fn target_difficulty_bucket_table() {
        assert_eq!(target_difficulty(0.0), 1);
        assert_eq!(target_difficulty(0.19), 1);
        assert_eq!(target_difficulty(0.2), 2);
        assert_eq!(target_difficulty(0.59), 3);
        assert_eq!(target_difficulty(0.6), 4);
        assert_eq!(target_difficulty(0.8), 5);
        assert_eq!(target_difficulty(1.0), 5);
    }

    #[test]
    fn reward_matches_hand_computed_value() {
        let params = RewardParams::default();
        let inputs = sample_inputs();
        // correctness 1.0, engagement 0.3*(0.8-0.1), gain 0.5*0.12,
        // bonus 0.2*3, zone -0.3*|3-4|, no frustration penalty at level 3.
        let expected = 1.0 + 0.3 * 0.7 + 0.5 * 0.12 + 0.6 - 0.3;
        let reward = compute_reward(&params, &inputs);
        assert!((reward - expected).abs() < 1e-9);
    }

    #[test]
    fn incorrect_answers_lose_the_difficulty_bonus() {
        let params = RewardParams::default();
        let mut inputs = sample_inputs();
        inputs.is_correct = false;
        inputs.delta_mastery = -0.1;
        let reward = compute_reward(&params, &inputs);
        assert!(reward < 0.0);
    }

    #[test]
    fn frustration_penalty_only_bites_above_level_three() {
        let params = RewardParams::default();
        let mut low = sample_inputs();
        low.emotions.frustrated = 1.0;
        low.difficulty = 3;
        let mut high = low;
        high.difficulty = 5;

        // Same zone distance, so the difference isolates the bonus and the
        // frustration term.
        let at_three = compute_reward(&params, &low);
        let at_five = compute_reward(&params, &high);
        let bonus_delta = params.difficulty_bonus * 2.0;
        let zone_delta = params.zone_lambda * ((5 - 4) as f64 - (4 - 3) as f64);
        let fru_delta = params.frustration_kappa * 1.0 * 2.0;
        assert!((at_five - at_three - (bonus_delta - zone_delta - fru_delta)).abs() < 1e-9);
    }

    #[test]
    fn reward_is_always_bounded() {
        let params = RewardParams::default();
        let mut inputs = sample_inputs();
        inputs.delta_mastery = 1e9;
        assert_eq!(compute_reward(&params, &inputs), 2.0);
        inputs.delta_mastery = -1e9;
        assert_eq!(compute_reward(&params, &inputs), -2.0);
        inputs.delta_mastery = f64::NAN;
        let reward = compute_reward(&params, &inputs);
        assert!((-2.0..=2.0).contains(&reward));
    }
}
