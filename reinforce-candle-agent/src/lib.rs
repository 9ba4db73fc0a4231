//! REINFORCE agent implemented with [candle](https://crates.io/crates/candle-core).
pub mod categorical;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod reinforce;
pub mod util;
use anyhow::Result;
use candle_core::{Tensor, D};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl From<&candle_core::Device> for Device {
    fn from(device: &candle_core::Device) -> Self {
        match device.location() {
            candle_core::DeviceLocation::Cuda { gpu_id } => Self::Cuda(gpu_id),
            _ => Self::Cpu,
        }
    }
}

impl From<candle_core::Device> for Device {
    fn from(device: candle_core::Device) -> Self {
        Self::from(&device)
    }
}

impl Device {
    /// Creates the corresponding [`candle_core::Device`].
    pub fn build(&self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => Ok(candle_core::Device::new_cuda(*n)?),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
/// Activation function applied to the output of a layer.
pub enum Activation {
    /// No activation.
    None,

    /// Rectified linear unit.
    ReLU,

    /// Hyperbolic tangent.
    Tanh,

    /// Softmax over the last dimension.
    Softmax,
}

impl Activation {
    /// Applies the activation function.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Ok(match self {
            Self::None => xs.clone(),
            Self::ReLU => xs.relu()?,
            Self::Tanh => xs.tanh()?,
            Self::Softmax => candle_nn::ops::softmax(xs, D::Minus1)?,
        })
    }
}
