//! Per-episode trajectory and discounted returns.
use crate::error::ReinforceError;

/// Discounted return of a whole episode, `G = Σ_t γ^t r_t`.
///
/// An empty sequence of rewards gives `0`.
pub fn discounted_return(rewards: &[f32], gamma: f64) -> f64 {
    let mut discount = 1f64;
    let mut g = 0f64;

    for &r in rewards {
        g += discount * r as f64;
        discount *= gamma;
    }

    g
}

/// Discounted return from each timestep to the end of the episode,
/// `G_t = Σ_{t'≥t} γ^(t'-t) r_t'`.
pub fn reward_to_go(rewards: &[f32], gamma: f64) -> Vec<f64> {
    let mut acc = 0f64;
    let mut returns = vec![0f64; rewards.len()];

    for (t, &r) in rewards.iter().enumerate().rev() {
        acc = r as f64 + gamma * acc;
        returns[t] = acc;
    }

    returns
}

/// Phase of an agent learning from complete episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningPhase {
    /// Within an episode, transitions are being collected.
    Collecting,

    /// The episode has ended and the agent is ready for an optimization step.
    Learning,
}

impl LearningPhase {
    /// Phase after observing a step with the given done flag.
    pub fn from_done(is_done: bool) -> Self {
        match is_done {
            true => Self::Learning,
            false => Self::Collecting,
        }
    }
}

impl Default for LearningPhase {
    fn default() -> Self {
        Self::Collecting
    }
}

/// Rewards and log-probabilities of the actions taken in one episode.
///
/// `L` is the type of a log-probability; agents with a differentiable policy
/// store values attached to the computation graph of the policy here.
#[derive(Debug, Clone)]
pub struct Trajectory<L> {
    rewards: Vec<f32>,
    log_probs: Vec<L>,
}

impl<L> Default for Trajectory<L> {
    fn default() -> Self {
        Self {
            rewards: Vec::new(),
            log_probs: Vec::new(),
        }
    }
}

impl<L> Trajectory<L> {
    /// Creates an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the reward of a step.
    pub fn push_reward(&mut self, reward: f32) {
        self.rewards.push(reward);
    }

    /// Appends the log-probability of the action taken at a step.
    pub fn push_log_prob(&mut self, log_prob: L) {
        self.log_probs.push(log_prob);
    }

    /// Rewards in the order they were received.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Log-probabilities in the order the actions were taken.
    pub fn log_probs(&self) -> &[L] {
        &self.log_probs
    }

    /// The number of steps, counted by rewards.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if neither a reward nor a log-probability is stored.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty() && self.log_probs.is_empty()
    }

    /// Returns `true` if both buffers have the same length.
    pub fn is_consistent(&self) -> bool {
        self.rewards.len() == self.log_probs.len()
    }

    /// Checks that every reward has its log-probability.
    pub fn check_consistency(&self) -> Result<(), ReinforceError> {
        match self.is_consistent() {
            true => Ok(()),
            false => Err(ReinforceError::TrajectoryLengthMismatch {
                rewards: self.rewards.len(),
                log_probs: self.log_probs.len(),
            }),
        }
    }

    /// Sum of the rewards without discount.
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    /// Discounted return of the whole episode.
    pub fn discounted_return(&self, gamma: f64) -> f64 {
        discounted_return(&self.rewards, gamma)
    }

    /// Empties both buffers.
    pub fn clear(&mut self) {
        self.rewards.clear();
        self.log_probs.clear();
    }
}
