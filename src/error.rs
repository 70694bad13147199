use thiserror::Error;

/// Failures that abort a `step` call and leave session state untouched.
///
/// Numeric noise in the inputs is never an error; it is clamped away. The
/// only structural failure is a per-action design matrix that stays
/// non-invertible after ridge regularization, which means the
/// positive-definiteness invariant has been lost.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("design matrix for action delta {delta} is numerically singular")]
    SingularDesignMatrix { delta: i32 },
}
