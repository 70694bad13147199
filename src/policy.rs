use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PolicyFamily, PolicyParams};
use crate::error::EngineError;
use crate::matrix::{self, Matrix, Vector};
use crate::types::{Action, DecisionSource};

/// Regularization added when a design matrix refuses to invert cleanly.
const RIDGE_LAMBDA: f64 = 1e-6;

/// The decision taken last call, waiting for its outcome. Credit assignment
/// is delayed by one interaction: an action chosen at step t is only
/// evaluated when the next call reports how the question it produced went.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDecision {
    pub context: Vector,
    pub action: Action,
}

/// Per-session bandit statistics: tabular Q/N alongside the per-action
/// linear model (design matrix A, response vector b).
///
/// Both representations are updated on every credit. Which one drives
/// selection after warmup is a [`PolicyFamily`] choice; in the default
/// `LinTs` family the tabular values are maintained but never consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanditState {
    pub q: [f64; 3],
    pub n: [u64; 3],
    pub a: [Matrix; 3],
    pub b: [Vector; 3],
    pub steps: u64,
    pub epsilon: f64,
    pub pending: Option<PendingDecision>,
}

impl BanditState {
    pub fn new(params: &PolicyParams) -> Self {
        Self {
            q: [0.0; 3],
            n: [0; 3],
            a: [Matrix::identity(); 3],
            b: [[0.0; crate::STATE_DIM]; 3],
            steps: 0,
            epsilon: params.initial_epsilon,
            pending: None,
        }
    }

    /// Update the previous decision's statistics with the reward just
    /// observed for it. The first call of a session has nothing pending and
    /// changes nothing. The stored context is used, not the new one.
    pub fn credit(&mut self, reward: f64) {
        let Some(pending) = self.pending else {
            return;
        };
        let idx = pending.action.index();

        self.n[idx] += 1;
        self.q[idx] += (reward - self.q[idx]) / self.n[idx] as f64;

        self.a[idx].add_outer(&pending.context);
        self.b[idx] = matrix::add(&self.b[idx], &matrix::scale(&pending.context, reward));
    }

    /// Advance the step counter and decay epsilon toward its floor.
    pub fn advance(&mut self, params: &PolicyParams) {
        self.steps += 1;
        self.epsilon = (self.epsilon * params.epsilon_decay).max(params.min_epsilon);
    }

    /// Choose the next action for the given context.
    pub fn select<R: Rng>(
        &self,
        params: &PolicyParams,
        context: &Vector,
        rng: &mut R,
    ) -> Result<(Action, DecisionSource), EngineError> {
        if self.steps <= params.warmup_steps {
            return Ok((uniform_action(rng), DecisionSource::Warmup));
        }
        if rng.random::<f64>() < self.epsilon {
            return Ok((uniform_action(rng), DecisionSource::Explore));
        }
        let action = match params.family {
            PolicyFamily::LinTs => self.sample_lints(params, context, rng)?,
            PolicyFamily::EpsilonGreedy => self.greedy_by_q(),
        };
        Ok((action, DecisionSource::Exploit))
    }

    /// Linear Thompson Sampling: per action draw
    /// `theta ~ N(A⁻¹b, v²·A⁻¹)` and keep the argmax of `theta · context`.
    fn sample_lints<R: Rng>(
        &self,
        params: &PolicyParams,
        context: &Vector,
        rng: &mut R,
    ) -> Result<Action, EngineError> {
        let v = if self.steps < params.noise_switch_step {
            params.early_noise
        } else {
            params.late_noise
        };

        let mut best = Action::Hold;
        let mut best_score = f64::NEG_INFINITY;
        for action in Action::ALL {
            let idx = action.index();
            let a_inv = self.invert_design(action)?;
            let mu = a_inv.mul_vec(&self.b[idx]);
            let chol = a_inv.cholesky();

            let mut noise = [0.0; crate::STATE_DIM];
            for val in noise.iter_mut() {
                *val = sample_standard_normal(rng);
            }
            let theta = matrix::add(&mu, &matrix::scale(&chol.mul_vec(&noise), v));

            let score = matrix::dot(&theta, context);
            if score > best_score {
                best_score = score;
                best = action;
            }
        }
        Ok(best)
    }

    fn invert_design(&self, action: Action) -> Result<Matrix, EngineError> {
        let a = &self.a[action.index()];
        if let Some(inv) = a.invert() {
            return Ok(inv);
        }
        tracing::warn!(
            action = action.as_str(),
            lambda = RIDGE_LAMBDA,
            "design matrix near-singular, retrying with ridge regularization"
        );
        a.ridged(RIDGE_LAMBDA)
            .invert()
            .ok_or(EngineError::SingularDesignMatrix {
                delta: action.delta(),
            })
    }

    fn greedy_by_q(&self) -> Action {
        let mut best = Action::Lower;
        let mut best_q = f64::NEG_INFINITY;
        for action in Action::ALL {
            let q = self.q[action.index()];
            if q > best_q {
                best_q = q;
                best = action;
            }
        }
        best
    }
}

fn uniform_action<R: Rng>(rng: &mut R) -> Action {
    Action::from_index(rng.random_range(0..3))
}

/// Box-Muller standard normal draw.
fn sample_standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> PolicyParams {
        PolicyParams::default()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn credit_without_pending_is_a_no_op() {
        let mut state = BanditState::new(&params());
        state.credit(1.5);
        assert_eq!(state.n, [0; 3]);
        assert_eq!(state.q, [0.0; 3]);
        assert_eq!(state.a[0], Matrix::identity());
        assert!(state.b.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn credit_updates_the_pending_action_only() {
        let mut state = BanditState::new(&params());
        let context = [0.5, 0.7, 0.1, 1.0, 0.6, 0.0];
        state.pending = Some(PendingDecision {
            context,
            action: Action::Raise,
        });

        state.credit(1.0);
        assert_eq!(state.n, [0, 0, 1]);
        assert!((state.q[2] - 1.0).abs() < 1e-12);
        assert_eq!(state.q[0], 0.0);
        assert_eq!(state.a[0], Matrix::identity());
        assert_ne!(state.a[2], Matrix::identity());
        assert!((state.b[2][0] - 0.5).abs() < 1e-12);

        // Running mean: second credit of 0 should pull Q to 0.5.
        state.credit(0.0);
        assert_eq!(state.n[2], 2);
        assert!((state.q[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn advance_decays_epsilon_to_the_floor() {
        let p = params();
        let mut state = BanditState::new(&p);
        for _ in 0..500 {
            state.advance(&p);
        }
        assert_eq!(state.steps, 500);
        assert!((state.epsilon - p.min_epsilon).abs() < 1e-12);
    }

    #[test]
    fn epsilon_follows_the_closed_form() {
        let p = params();
        let mut state = BanditState::new(&p);
        for k in 1..=40u32 {
            state.advance(&p);
            let expected = (p.initial_epsilon * p.epsilon_decay.powi(k as i32)).max(p.min_epsilon);
            assert!((state.epsilon - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn warmup_ignores_learned_statistics() {
        let p = params();
        let mut state = BanditState::new(&p);
        // Stack the statistics heavily toward Raise.
        state.q = [-10.0, -10.0, 10.0];
        state.b[2] = [5.0; crate::STATE_DIM];
        state.steps = 1;

        let context = [1.0; crate::STATE_DIM];
        let mut counts = [0usize; 3];
        let mut r = rng();
        for _ in 0..600 {
            let (action, source) = state.select(&p, &context, &mut r).unwrap();
            assert_eq!(source, DecisionSource::Warmup);
            counts[action.index()] += 1;
        }
        for &c in &counts {
            assert!(c > 120, "warmup draw not uniform enough: {:?}", counts);
        }
    }

    #[test]
    fn lints_prefers_the_rewarded_action() {
        let p = params();
        let mut state = BanditState::new(&p);
        let context = [0.5, 0.5, 0.1, 1.0, 0.6, 0.0];

        // Feed Raise consistently high reward, Lower consistently low.
        for _ in 0..50 {
            state.pending = Some(PendingDecision {
                context,
                action: Action::Raise,
            });
            state.credit(1.5);
            state.pending = Some(PendingDecision {
                context,
                action: Action::Lower,
            });
            state.credit(-1.5);
        }
        state.steps = 100;
        state.epsilon = 0.0;

        let mut r = rng();
        let mut raises = 0;
        for _ in 0..200 {
            let (action, source) = state.select(&p, &context, &mut r).unwrap();
            assert_eq!(source, DecisionSource::Exploit);
            if action == Action::Raise {
                raises += 1;
            }
        }
        assert!(raises > 180, "LinTS failed to exploit: {}/200", raises);
    }

    #[test]
    fn epsilon_greedy_family_consults_tabular_q() {
        let mut p = params();
        p.family = PolicyFamily::EpsilonGreedy;
        let mut state = BanditState::new(&p);
        state.q = [0.2, -0.5, 0.9];
        state.steps = 100;
        state.epsilon = 0.0;

        let mut r = rng();
        let (action, source) = state
            .select(&p, &[0.5; crate::STATE_DIM], &mut r)
            .unwrap();
        assert_eq!(action, Action::Raise);
        assert_eq!(source, DecisionSource::Exploit);
    }
}
