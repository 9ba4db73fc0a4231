//! Configuration of REINFORCE agent.
use crate::{opt::OptimizerConfig, util::OutDim, Device};
use anyhow::Result;
use log::info;
use reinforce_core::error::ReinforceError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// How the return weighting each log-probability is computed.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum ReturnMode {
    /// Every log-probability of an episode is weighted by the discounted
    /// return of the whole episode, `Σ_t γ^t r_t`.
    TotalEpisode,

    /// The log-probability at timestep `t` is weighted by the discounted
    /// return from `t` to the end of the episode.
    RewardToGo,
}

impl Default for ReturnMode {
    fn default() -> Self {
        Self::TotalEpisode
    }
}

/// Hyperparameters recognized by the agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Hyperparameters {
    /// Learning rate of the Adam optimizer.
    pub learning_rate: f64,

    /// Discount factor in `[0, 1]`.
    pub discount_rate: f64,
}

/// Configuration of [`Reinforce`](super::Reinforce) agent.
///
/// `C` is the configuration of the policy model.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReinforceConfig<C> {
    /// Configuration of the policy model.
    pub policy_config: Option<C>,

    /// Configuration of the optimizer.
    #[serde(default)]
    pub opt_config: OptimizerConfig,

    /// Discount factor.
    pub discount_rate: f64,

    /// Return weighting the log-probabilities.
    #[serde(default)]
    pub return_mode: ReturnMode,

    /// Device on which the policy model runs.
    pub device: Option<Device>,

    /// Seed of the random number generator used for sampling actions.
    pub seed: u64,

    /// With `2` or more, statistics of the parameters are recorded at every
    /// optimization step.
    pub record_verbose_level: usize,
}

impl<C> Default for ReinforceConfig<C> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::default(),
            discount_rate: 0.99,
            return_mode: ReturnMode::default(),
            device: None,
            seed: 42,
            record_verbose_level: 0,
        }
    }
}

impl<C> ReinforceConfig<C>
where
    C: OutDim,
{
    /// Sets the number of actions, the output dimension of the policy model.
    pub fn out_dim(mut self, v: usize) -> Self {
        if let Some(policy_config) = &mut self.policy_config {
            policy_config.set_out_dim(v);
        }
        self
    }
}

impl<C> ReinforceConfig<C> {
    /// Creates configuration from the hyperparameters.
    pub fn from_hyperparameters(hyperparameters: &Hyperparameters) -> Self {
        Self::default()
            .learning_rate(hyperparameters.learning_rate)
            .discount_rate(hyperparameters.discount_rate)
    }

    /// Sets the configuration of the policy model.
    pub fn policy_config(mut self, v: C) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the learning rate of the optimizer.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.opt_config = self.opt_config.learning_rate(v);
        self
    }

    /// Sets the discount factor.
    pub fn discount_rate(mut self, v: f64) -> Self {
        self.discount_rate = v;
        self
    }

    /// Sets the return mode.
    pub fn return_mode(mut self, v: ReturnMode) -> Self {
        self.return_mode = v;
        self
    }

    /// Sets device.
    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the verbosity of the records of optimization steps.
    pub fn record_verbose_level(mut self, v: usize) -> Self {
        self.record_verbose_level = v;
        self
    }

    /// Checks the discount factor and the learning rate.
    pub fn validate(&self) -> Result<(), ReinforceError> {
        if !(0.0..=1.0).contains(&self.discount_rate) {
            return Err(ReinforceError::InvalidDiscountRate(self.discount_rate));
        }
        self.opt_config.validate()
    }
}

impl<C> ReinforceConfig<C>
where
    C: Serialize + serde::de::DeserializeOwned,
{
    /// Loads [`ReinforceConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of REINFORCE agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [`ReinforceConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of REINFORCE agent into {:?}", path_);
        Ok(())
    }
}
