#![warn(missing_docs)]
//! Core of the REINFORCE agent.
//!
//! This crate defines the interfaces between an agent and an environment
//! ([`Env`], [`Policy`], [`Agent`]), the per-episode [`Trajectory`] from which
//! the discounted return is computed, the [`record`] types used for logging
//! metrics, and the episode-driven [`Trainer`].
pub mod dummy;
pub mod error;
pub mod record;
mod trajectory;
pub use trajectory::{discounted_return, reward_to_go, LearningPhase, Trajectory};

mod base;
pub use base::{Act, Agent, Configurable, Env, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{Trainer, TrainerConfig, TrainingResults};
