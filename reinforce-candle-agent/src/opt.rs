//! Optimizers.
use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use reinforce_core::error::ReinforceError;
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training the policy network.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        /// Coefficient of the running average of gradients.
        #[serde(default = "default_beta1")]
        beta1: f64,
        /// Coefficient of the running average of squared gradients.
        #[serde(default = "default_beta2")]
        beta2: f64,
        /// Term added to the denominator for numerical stability.
        #[serde(default = "default_eps")]
        eps: f64,
        /// Weight decay.
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// Constructs the optimizer over the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                let opt = AdamW::new(vars, params)?;
                Ok(Optimizer::AdamW(opt))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::AdamW {
                lr: _,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            },
            Self::Adam { lr: _ } => Self::Adam { lr },
        }
    }

    /// Returns the learning rate.
    pub fn lr(&self) -> f64 {
        match self {
            Self::AdamW { lr, .. } => *lr,
            Self::Adam { lr } => *lr,
        }
    }

    /// Checks that the learning rate is positive and finite.
    pub fn validate(&self) -> Result<(), ReinforceError> {
        let lr = self.lr();
        match lr.is_finite() && lr > 0.0 {
            true => Ok(()),
            false => Err(ReinforceError::InvalidLearningRate(lr)),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: ParamsAdam::default().lr,
        }
    }
}

/// Optimizers.
///
/// This is a thin wrapper of [`candle_nn::Optimizer`] implementations.
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),
}

impl Optimizer {
    /// Computes gradients of `loss` and updates the parameters with them.
    ///
    /// Gradients are computed from scratch at every call, which plays the role
    /// of zeroing the gradients before the backward pass.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.backward_step(loss)?),
            Self::Adam(opt) => Ok(opt.backward_step(loss)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_rate() {
        let config = OptimizerConfig::default().learning_rate(0.01);
        assert_eq!(config, OptimizerConfig::Adam { lr: 0.01 });
        assert!(config.validate().is_ok());
        assert_eq!(
            OptimizerConfig::default().learning_rate(0.0).validate(),
            Err(ReinforceError::InvalidLearningRate(0.0))
        );
    }

    #[test]
    fn test_serde_adamw_defaults() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("AdamW:\n  lr: 0.001\n")?;
        assert_eq!(
            config,
            OptimizerConfig::AdamW {
                lr: 0.001,
                beta1: ParamsAdamW::default().beta1,
                beta2: ParamsAdamW::default().beta2,
                eps: ParamsAdamW::default().eps,
                weight_decay: ParamsAdamW::default().weight_decay,
            }
        );
        Ok(())
    }
}
