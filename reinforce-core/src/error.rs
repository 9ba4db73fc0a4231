//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum ReinforceError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The reward and log-probability buffers of an episode differ in length.
    #[error("Trajectory length mismatch: {rewards} rewards, {log_probs} log-probabilities")]
    TrajectoryLengthMismatch {
        /// Number of stored rewards.
        rewards: usize,

        /// Number of stored log-probabilities.
        log_probs: usize,
    },

    /// A probability vector could not be turned into a categorical distribution.
    #[error("Invalid action probabilities: {0}")]
    InvalidProbabilities(String),

    /// Discount rate outside of `[0, 1]`.
    #[error("Discount rate must be in [0, 1], got {0}")]
    InvalidDiscountRate(f64),

    /// Non-positive or non-finite learning rate.
    #[error("Learning rate must be positive, got {0}")]
    InvalidLearningRate(f64),

    /// Action index not supported by the environment.
    #[error("Invalid action {action}, the environment has {n_actions} actions")]
    InvalidAction {
        /// The given action index.
        action: usize,

        /// The number of discrete actions.
        n_actions: usize,
    },
}
