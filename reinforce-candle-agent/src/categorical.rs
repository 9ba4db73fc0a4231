//! Categorical distribution over discrete actions.
use anyhow::Result;
use candle_core::{DType, Tensor};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use reinforce_core::error::ReinforceError;

const SUM_TOLERANCE: f32 = 1e-4;

/// Categorical distribution built from a probability vector.
///
/// The probability tensor is kept as given, so log-probabilities returned by
/// [`Categorical::log_prob`] stay attached to the computation graph of the
/// network that produced them.
pub struct Categorical {
    probs: Tensor,
    weights: Vec<f32>,
}

impl Categorical {
    /// Constructs the distribution.
    ///
    /// `probs` must be a 1-D tensor, or a 2-D tensor with a batch dimension of
    /// size 1, holding non-negative finite values that sum to 1.
    pub fn new(probs: Tensor) -> Result<Self> {
        let dims = probs.dims().to_vec();
        let probs = match dims.as_slice() {
            [_] => probs,
            [1, _] => probs.squeeze(0)?,
            dims => {
                return Err(ReinforceError::InvalidProbabilities(format!(
                    "expected a single probability vector, got shape {:?}",
                    dims
                ))
                .into())
            }
        };
        let weights: Vec<f32> = probs.to_dtype(DType::F32)?.to_vec1()?;

        if weights.is_empty() {
            return Err(ReinforceError::InvalidProbabilities("empty vector".to_string()).into());
        }
        if let Some(p) = weights.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(ReinforceError::InvalidProbabilities(format!(
                "invalid probability {} in {:?}",
                p, weights
            ))
            .into());
        }
        let sum: f32 = weights.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(ReinforceError::InvalidProbabilities(format!(
                "probabilities sum to {}",
                sum
            ))
            .into());
        }

        Ok(Self { probs, weights })
    }

    /// The number of actions.
    pub fn n_actions(&self) -> usize {
        self.weights.len()
    }

    /// Action probabilities.
    pub fn probs(&self) -> &[f32] {
        &self.weights
    }

    /// Samples an action index.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        let dist = WeightedIndex::new(&self.weights)
            .map_err(|e| ReinforceError::InvalidProbabilities(e.to_string()))?;
        Ok(dist.sample(rng))
    }

    /// Log-probability of `action` as a tensor of shape `[1]`.
    pub fn log_prob(&self, action: usize) -> Result<Tensor> {
        anyhow::ensure!(
            action < self.n_actions(),
            ReinforceError::InvalidAction {
                action,
                n_actions: self.n_actions()
            }
        );
        Ok(self.probs.narrow(0, action, 1)?.log()?)
    }

    /// The most probable action.
    pub fn mode(&self) -> usize {
        self.weights
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |(i_max, p_max), (i, &p)| match p > p_max {
                true => (i, p),
                false => (i_max, p_max),
            })
            .0
    }
}

/// Samples an action from `probs` and returns it with its log-probability.
pub fn sample_categorical<R: Rng + ?Sized>(probs: Tensor, rng: &mut R) -> Result<(usize, Tensor)> {
    let dist = Categorical::new(probs)?;
    let action = dist.sample(rng)?;
    let log_prob = dist.log_prob(action)?;
    Ok((action, log_prob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use rand::{rngs::SmallRng, SeedableRng};

    fn tensor(v: &[f32]) -> Tensor {
        Tensor::new(v, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_log_prob() -> Result<()> {
        let dist = Categorical::new(tensor(&[0.2, 0.5, 0.3]).unsqueeze(0)?)?;
        assert_eq!(dist.n_actions(), 3);
        assert_eq!(dist.mode(), 1);
        let lp: Vec<f32> = dist.log_prob(2)?.to_vec1()?;
        assert_eq!(lp.len(), 1);
        assert!((lp[0] - 0.3f32.ln()).abs() < 1e-6);
        assert!(dist.log_prob(3).is_err());
        Ok(())
    }

    #[test]
    fn test_sample_frequencies() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);
        let dist = Categorical::new(tensor(&[0.1, 0.0, 0.9]))?;
        let mut counts = [0usize; 3];
        for _ in 0..2000 {
            counts[dist.sample(&mut rng)?] += 1;
        }
        assert_eq!(counts[1], 0);
        assert!(counts[2] > counts[0] * 4);
        Ok(())
    }

    #[test]
    fn test_sample_categorical_returns_log_prob_of_sample() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let probs = [0.25f32, 0.75];
        let (action, log_prob) = sample_categorical(tensor(&probs), &mut rng)?;
        let lp: Vec<f32> = log_prob.to_vec1()?;
        assert!((lp[0] - probs[action].ln()).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_malformed_probabilities() {
        assert!(Categorical::new(tensor(&[0.5, 0.6])).is_err());
        assert!(Categorical::new(tensor(&[1.5, -0.5])).is_err());
        assert!(Categorical::new(tensor(&[f32::NAN, 1.0])).is_err());
        assert!(Categorical::new(tensor(&[])).is_err());
        let batch = Tensor::new(&[[0.5f32, 0.5], [0.5, 0.5]], &Device::Cpu).unwrap();
        assert!(Categorical::new(batch).is_err());
    }
}
