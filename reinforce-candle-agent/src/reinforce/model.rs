use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use reinforce_core::record::Record;
use std::path::Path;

/// Policy network of the REINFORCE agent with its parameters and optimizer.
///
/// The output of `P` is interpreted as a probability vector over actions.
pub struct ReinforceModel<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    device: Device,
    varmap: VarMap,

    /// Policy network.
    policy: P,

    /// Optimizer.
    opt: Optimizer,
}

impl<P> ReinforceModel<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    /// Constructs [`ReinforceModel`].
    pub fn build(
        policy_config: P::Config,
        opt_config: &OptimizerConfig,
        device: Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            P::build(vb, policy_config)?
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            policy,
            opt,
        })
    }

    /// Outputs action probabilities given observation(s).
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        self.policy.forward(obs)
    }

    /// Device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Takes a gradient step minimizing `loss`.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save policy model to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load policy model from {:?}", path.as_ref());
        Ok(())
    }

    pub fn param_stats(&self) -> Result<Record> {
        crate::util::param_stats(&self.varmap)
    }
}
