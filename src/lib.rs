//! Adaptive difficulty controller for a tutoring service.
//!
//! Given the outcome of the question a learner just answered, an inferred
//! affect signal and the learner's running mastery estimate, the engine
//! decides how to adjust difficulty for the next question and updates its
//! per-session contextual-bandit model from the observed outcome.
//!
//! The crate is a synchronous library: transport, persistence, question
//! generation and emotion fusion live in the surrounding service and talk to
//! this engine through [`AdaptiveEngine::step`] and [`AdaptiveEngine::reset`].

pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod mastery;
pub mod matrix;
pub mod policy;
pub mod reward;
pub mod session;
pub mod types;

pub use config::EngineConfig;
pub use engine::AdaptiveEngine;
pub use error::EngineError;
pub use types::{Action, DecisionSource, EmotionSignal, SessionSnapshot, StepDecision, StepInput};

/// Dimension of the bandit context vector.
pub const STATE_DIM: usize = 6;

/// Number of difficulty levels the controller steers across.
pub const DIFFICULTY_MIN: i32 = 1;
pub const DIFFICULTY_MAX: i32 = 5;
