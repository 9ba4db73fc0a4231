//! Agent.
use super::{Env, Policy, Step};
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
///
/// An agent learning from whole episodes collects its trajectory while
/// [`Agent::observe`] is called at every environment step, and performs an
/// optimization step when the episode ends.
pub trait Agent<E: Env>: Policy<E> {
    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Clears per-episode state so that a new episode can be played.
    fn reset_game(&mut self);

    /// Stores the outcome of an environment step.
    ///
    /// When the step ends the episode, the agent learns from the collected
    /// trajectory and returns information on the optimization step.
    fn observe(&mut self, step: &Step<E>) -> Result<Option<Record>>;

    /// Returns `true` when the agent should perform an optimization step.
    fn time_to_learn(&self) -> bool;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
