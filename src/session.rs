use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::mastery::sanitize_unit;
use crate::policy::BanditState;

/// Everything the engine remembers about one session. Lives only for the
/// process lifetime; a restart cold-starts every session id.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub bandit: BanditState,
    pub consecutive_wrong: u32,
    pub recent: VecDeque<f64>,
    pub recent_pos: VecDeque<f64>,
    pub rng: StdRng,
    pub last_updated: i64,
}

impl SessionState {
    fn new(config: &EngineConfig, session_id: &str) -> Self {
        Self {
            bandit: BanditState::new(&config.policy),
            consecutive_wrong: 0,
            recent: VecDeque::with_capacity(config.window_size),
            recent_pos: VecDeque::with_capacity(config.window_size),
            rng: rng_for(config.policy.seed, session_id),
            last_updated: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Fold one answer into the rolling windows and the wrong-streak
    /// counter. Returns `(recent_accuracy, recent_positive_avg)` over the
    /// capped windows, the just-pushed entry included.
    pub fn observe(&mut self, is_correct: bool, positive: f64, window: usize) -> (f64, f64) {
        push_capped(&mut self.recent, if is_correct { 1.0 } else { 0.0 }, window);
        push_capped(&mut self.recent_pos, sanitize_unit(positive), window);

        if is_correct {
            self.consecutive_wrong = 0;
        } else {
            self.consecutive_wrong += 1;
        }

        (window_avg(&self.recent), window_avg(&self.recent_pos))
    }
}

fn push_capped(window: &mut VecDeque<f64>, value: f64, cap: usize) {
    window.push_back(value);
    while window.len() > cap.max(1) {
        window.pop_front();
    }
}

fn window_avg(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Derive a per-session RNG. With a configured seed, streams are stable
/// across runs and distinct across session ids.
fn rng_for(seed: Option<u64>, session_id: &str) -> StdRng {
    match seed {
        Some(seed) => {
            let mut hasher = DefaultHasher::new();
            session_id.hash(&mut hasher);
            StdRng::seed_from_u64(seed ^ hasher.finish())
        }
        None => StdRng::from_os_rng(),
    }
}

/// Keyed lazy-init registry of session states.
///
/// The registry lock only guards insertion, lookup and deletion; each
/// session carries its own mutex, held for the full duration of a step so
/// racing calls on the same id serialize instead of interleaving.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        session_id: &str,
        config: &EngineConfig,
    ) -> Arc<Mutex<SessionState>> {
        {
            let sessions = self.sessions.read();
            if let Some(session) = sessions.get(session_id) {
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write();
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(config, session_id)))),
        )
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        self.sessions.read().get(session_id).map(Arc::clone)
    }

    /// Delete a session's state. Safe to call on unknown ids; the next
    /// access is indistinguishable from a brand-new session.
    pub fn reset(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop sessions idle longer than `max_age_ms`. Returns how many were
    /// removed.
    pub fn purge_stale(&self, max_age_ms: i64) -> usize {
        let now = chrono::Utc::now().timestamp_millis();

        let stale: Vec<String> = {
            let sessions = self.sessions.read();
            sessions
                .iter()
                .filter(|(_, session)| now - session.lock().last_updated > max_age_ms)
                .map(|(id, _)| id.clone())
                .collect()
        };

        if !stale.is_empty() {
            let mut sessions = self.sessions.write();
            for id in &stale {
                sessions.remove(id);
            }
        }

        stale.len()
    }
}
