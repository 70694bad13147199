use tracing::debug;

use crate::config::EngineConfig;
use crate::encoder::{self, ContextInputs};
use crate::error::EngineError;
use crate::mastery::{self, sanitize_unit};
use crate::policy::PendingDecision;
use crate::reward::{self, RewardInputs};
use crate::session::SessionStore;
use crate::types::{SessionSnapshot, StepDecision, StepInput};
use crate::{DIFFICULTY_MAX, DIFFICULTY_MIN};

/// Entry point for the surrounding service: one engine instance, any number
/// of concurrently active sessions.
pub struct AdaptiveEngine {
    config: EngineConfig,
    store: SessionStore,
}

impl AdaptiveEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: SessionStore::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one answered question for a session and decide the next
    /// difficulty.
    ///
    /// Sequencing: mastery update → rolling windows → reward for the
    /// *previous* pending decision → bandit credit → epsilon decay → encode
    /// the new context → select → clamp → store the new pending pair.
    ///
    /// The per-session mutex is held for the whole call, and the step runs
    /// on a working copy that is only committed on success, so a failed call
    /// leaves the session exactly as it was.
    pub fn step(&self, session_id: &str, input: &StepInput) -> Result<StepDecision, EngineError> {
        let handle = self.store.get_or_create(session_id, &self.config);
        let mut guard = handle.lock();
        let mut session = guard.clone();

        let current_mastery = sanitize_unit(input.current_mastery);
        let difficulty = input.current_difficulty.clamp(DIFFICULTY_MIN, DIFFICULTY_MAX);

        let updated_mastery = mastery::update_mastery(
            &self.config.mastery,
            current_mastery,
            input.is_correct,
            difficulty,
        );
        let delta_mastery = updated_mastery - current_mastery;

        let (recent_acc, recent_pos_avg) = session.observe(
            input.is_correct,
            input.emotions.positive,
            self.config.window_size,
        );

        let reward_value = reward::compute_reward(
            &self.config.reward,
            &RewardInputs {
                is_correct: input.is_correct,
                emotions: input.emotions,
                difficulty,
                delta_mastery,
                mastery_after: updated_mastery,
                recent_positive_avg: recent_pos_avg,
            },
        );

        session.bandit.credit(reward_value);
        session.bandit.advance(&self.config.policy);

        let context = encoder::build_context(&ContextInputs {
            mastery: updated_mastery,
            emotions: input.emotions,
            is_correct: input.is_correct,
            recent_accuracy: recent_acc,
            recent_positive_avg: recent_pos_avg,
            consecutive_wrong: session.consecutive_wrong,
        });

        let (action, source) =
            session
                .bandit
                .select(&self.config.policy, &context, &mut session.rng)?;

        let next_difficulty = (difficulty + action.delta()).clamp(DIFFICULTY_MIN, DIFFICULTY_MAX);
        session.bandit.pending = Some(PendingDecision { context, action });
        session.last_updated = chrono::Utc::now().timestamp_millis();

        debug!(
            session_id,
            step = session.bandit.steps,
            source = source.as_str(),
            chosen_delta = action.delta(),
            next_difficulty,
            reward = reward_value,
            "difficulty decision"
        );

        *guard = session;

        Ok(StepDecision {
            next_difficulty,
            updated_mastery,
            reward: reward_value,
            chosen_delta: action.delta(),
            recent_acc,
            source,
        })
    }

    /// Forget a session. Idempotent; unknown ids are a no-op.
    pub fn reset(&self, session_id: &str) {
        self.store.reset(session_id);
    }

    /// Read-only view of a live session, if one exists.
    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let handle = self.store.get(session_id)?;
        let session = handle.lock();
        let bandit = &session.bandit;
        Some(SessionSnapshot {
            steps: bandit.steps,
            epsilon: bandit.epsilon,
            q: bandit.q,
            n: bandit.n,
            a: [
                *bandit.a[0].rows(),
                *bandit.a[1].rows(),
                *bandit.a[2].rows(),
            ],
            b: bandit.b,
            recent: session.recent.iter().copied().collect(),
            recent_pos: session.recent_pos.iter().copied().collect(),
            consecutive_wrong: session.consecutive_wrong,
            pending_delta: bandit.pending.map(|p| p.action.delta()),
            last_updated: session.last_updated,
        })
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Drop sessions idle longer than `max_age_ms`; returns how many.
    pub fn purge_stale(&self, max_age_ms: i64) -> usize {
        self.store.purge_stale(max_age_ms)
    }
}

impl Default for AdaptiveEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
