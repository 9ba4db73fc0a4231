use crate::{util::OutDim, Activation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
    pub(super) activation_out: Activation,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `activation_out` - Activation function of the final layer.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, activation_out: Activation) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }

    /// Creates configuration of an MLP outputting action probabilities.
    pub fn policy(in_dim: usize, units: Vec<usize>, n_actions: usize) -> Self {
        Self::new(in_dim, units, n_actions, Activation::Softmax)
    }

    /// Input dimension.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> usize {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: usize) {
        self.out_dim = out_dim;
    }
}
