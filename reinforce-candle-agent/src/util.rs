//! Utilities.
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use reinforce_core::record::{Record, RecordValue};

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// Converts an observation into a tensor with a batch dimension of size 1.
pub fn obs_to_tensor(obs: Vec<f32>, device: &Device) -> Result<Tensor> {
    let n = obs.len();
    Ok(Tensor::from_vec(obs, (1, n), device)?)
}

/// Returns the standard deviation of a tensor.
pub fn std(t: &Tensor) -> Result<f32> {
    Ok(t
        .broadcast_sub(&t.mean_all()?)?
        .sqr()?
        .mean_all()?
        .sqrt()?
        .to_vec0::<f32>()?)
}

/// Returns the mean and standard deviation of the parameters.
pub fn param_stats(varmap: &VarMap) -> Result<Record> {
    let mut record = Record::empty();

    let data = varmap
        .data()
        .lock()
        .map_err(|e| anyhow::anyhow!("Failed to lock varmap: {}", e))?;
    for (k, v) in data.iter() {
        let m: f32 = v.mean_all()?.to_vec0()?;
        record.insert(format!("{}_mean", &k), RecordValue::Scalar(m));
        record.insert(format!("{}_std", &k), RecordValue::Scalar(std(v.as_tensor())?));
    }

    Ok(record)
}
