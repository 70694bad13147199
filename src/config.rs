use serde::{Deserialize, Serialize};

/// Which decision rule the policy uses once warmup is over.
///
/// `LinTs` is the production behavior. `EpsilonGreedy` selects by tabular Q
/// instead; the Q statistics are maintained under both families, so flipping
/// this switch mid-session is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PolicyFamily {
    #[default]
    LinTs,
    EpsilonGreedy,
}

impl PolicyFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinTs => "lints",
            Self::EpsilonGreedy => "epsilon-greedy",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "epsilon-greedy" | "epsilon_greedy" | "greedy" => Self::EpsilonGreedy,
            _ => Self::LinTs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryParams {
    pub alpha: f64,
    /// Update weight per difficulty level 1..=5. Monotone increasing: harder
    /// questions move the estimate more, in both directions.
    pub difficulty_weights: [f64; 5],
    /// A correct answer at the top level that lands at or above this value
    /// snaps mastery to exactly 1.0.
    pub ceiling_threshold: f64,
}

impl Default for MasteryParams {
    fn default() -> Self {
        Self {
            alpha: 0.37,
            difficulty_weights: [
                0.13391245590321205,
                0.3337729969832603,
                0.6690883728286914,
                0.7176417046170667,
                0.9192635382533815,
            ],
            ceiling_threshold: 0.99,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardParams {
    pub engagement_weight: f64,
    pub mastery_gain_weight: f64,
    pub difficulty_bonus: f64,
    pub zone_lambda: f64,
    pub frustration_kappa: f64,
    pub min_reward: f64,
    pub max_reward: f64,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            engagement_weight: 0.3,
            mastery_gain_weight: 0.5,
            difficulty_bonus: 0.2,
            zone_lambda: 0.3,
            frustration_kappa: 0.25,
            min_reward: -2.0,
            max_reward: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyParams {
    pub family: PolicyFamily,
    pub initial_epsilon: f64,
    pub min_epsilon: f64,
    pub epsilon_decay: f64,
    /// Steps during which the action is drawn uniformly, ignoring statistics.
    pub warmup_steps: u64,
    /// Posterior noise scale before / after `noise_switch_step`.
    pub early_noise: f64,
    pub late_noise: f64,
    pub noise_switch_step: u64,
    /// When set, per-session RNG streams are derived from this seed and the
    /// session id, making decisions reproducible across runs.
    pub seed: Option<u64>,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            family: PolicyFamily::default(),
            initial_epsilon: 0.3,
            min_epsilon: 0.05,
            epsilon_decay: 0.99,
            warmup_steps: 5,
            early_noise: 0.059,
            late_noise: 0.1,
            noise_switch_step: 15,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mastery: MasteryParams,
    pub reward: RewardParams,
    pub policy: PolicyParams,
    /// Length of the rolling correctness / positive-affect windows.
    pub window_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mastery: MasteryParams::default(),
            reward: RewardParams::default(),
            policy: PolicyParams::default(),
            window_size: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ADAPTIVE_TUTOR_POLICY") {
            config.policy.family = PolicyFamily::parse(&val);
        }
        if let Ok(val) = std::env::var("ADAPTIVE_TUTOR_SEED") {
            config.policy.seed = val.parse().ok();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_weights_are_monotone() {
        let params = MasteryParams::default();
        for pair in params.difficulty_weights.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn policy_family_parse_is_lenient() {
        assert_eq!(PolicyFamily::parse("epsilon-greedy"), PolicyFamily::EpsilonGreedy);
        assert_eq!(PolicyFamily::parse("EPSILON_GREEDY"), PolicyFamily::EpsilonGreedy);
        assert_eq!(PolicyFamily::parse("lints"), PolicyFamily::LinTs);
        assert_eq!(PolicyFamily::parse("anything-else"), PolicyFamily::LinTs);
    }
}
