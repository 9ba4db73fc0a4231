//! REINFORCE agent implemented with candle.
use super::{ReinforceConfig, ReinforceModel, ReturnMode};
use crate::{
    categorical::{sample_categorical, Categorical},
    model::SubModel1,
    util::obs_to_tensor,
};
use anyhow::{Context, Result};
use candle_core::{DType, Tensor};
use log::debug;
use rand::{rngs::SmallRng, SeedableRng};
use reinforce_core::{
    record::{Record, RecordValue},
    reward_to_go, Agent, Configurable, Env, LearningPhase, Policy, Step, Trajectory,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, marker::PhantomData, path::Path};

/// REINFORCE agent implemented with candle.
///
/// The agent samples actions from the categorical distribution given by the
/// policy network `P`, keeps the log-probability of every action taken in the
/// current episode together with the rewards, and performs a single gradient
/// step on `L = Σ_t -log π(a_t|s_t) G` when the episode ends.
pub struct Reinforce<E, P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    model: ReinforceModel<P>,
    discount_rate: f64,
    return_mode: ReturnMode,
    trajectory: Trajectory<Tensor>,
    phase: LearningPhase,
    action: Option<usize>,
    episode_step_number: usize,
    total_episode_score_so_far: f32,
    n_opts: usize,
    train: bool,
    rng: SmallRng,
    record_verbose_level: usize,
    phantom: PhantomData<E>,
}

impl<E, P> Reinforce<E, P>
where
    E: Env,
    E::Obs: Into<Vec<f32>>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    /// Runs the policy on `obs` and samples an action.
    ///
    /// Returns the action index and its log-probability, which is still
    /// attached to the computation graph of the policy network.
    pub fn pick_action_and_get_log_probabilities(
        &mut self,
        obs: &E::Obs,
    ) -> Result<(usize, Tensor)> {
        let obs = obs_to_tensor(obs.clone().into(), self.model.device())?;
        let probs = self.model.forward(&obs)?;
        sample_categorical(probs, &mut self.rng)
    }

    /// Appends the log-probability of the action taken at the current step.
    pub fn store_log_probabilities(&mut self, log_prob: Tensor) {
        self.trajectory.push_log_prob(log_prob);
    }

    /// Remembers the action taken at the current step.
    pub fn store_action(&mut self, action: usize) {
        self.action = Some(action);
    }

    /// Appends the reward received at the current step.
    pub fn store_reward(&mut self, reward: f32) {
        self.trajectory.push_reward(reward);
        self.total_episode_score_so_far += reward;
    }

    /// Discounted return of the episode so far, `Σ_t γ^t r_t`.
    pub fn calculate_episode_discounted_reward(&self) -> f64 {
        self.trajectory.discounted_return(self.discount_rate)
    }

    /// Policy loss `Σ_t -log π(a_t|s_t) · total_discounted_reward`.
    ///
    /// The loss is a differentiable scalar. It is zero when no log-probability
    /// has been stored.
    pub fn calculate_policy_loss_on_episode(&self, total_discounted_reward: f64) -> Result<Tensor> {
        if self.trajectory.log_probs().is_empty() {
            return Ok(Tensor::zeros((), DType::F32, self.model.device())?);
        }
        let log_probs = Tensor::cat(self.trajectory.log_probs(), 0)?;
        Ok(log_probs.affine(-total_discounted_reward, 0.0)?.sum_all()?)
    }

    /// Policy loss where each log-probability is weighted by the discounted
    /// return from its timestep.
    fn calculate_reward_to_go_policy_loss(&self) -> Result<Tensor> {
        if self.trajectory.log_probs().is_empty() {
            return Ok(Tensor::zeros((), DType::F32, self.model.device())?);
        }
        let log_probs = Tensor::cat(self.trajectory.log_probs(), 0)?;
        let returns: Vec<f32> = reward_to_go(self.trajectory.rewards(), self.discount_rate)
            .into_iter()
            .map(|g| g as f32)
            .collect();
        let returns = Tensor::from_vec(returns, log_probs.dims1()?, self.model.device())?;
        Ok(log_probs.mul(&returns)?.neg()?.sum_all()?)
    }

    /// Performs a gradient step on the policy loss of the current episode.
    pub fn policy_learn(&mut self) -> Result<Record> {
        self.trajectory.check_consistency()?;
        let total_discounted_reward = self.calculate_episode_discounted_reward();
        let policy_loss = match self.return_mode {
            ReturnMode::TotalEpisode => {
                self.calculate_policy_loss_on_episode(total_discounted_reward)?
            }
            ReturnMode::RewardToGo => self.calculate_reward_to_go_policy_loss()?,
        };

        if !self.trajectory.is_empty() {
            self.model.backward_step(&policy_loss)?;
            self.n_opts += 1;
        }

        let loss: f32 = policy_loss.to_dtype(DType::F32)?.to_vec0()?;
        debug!(
            "Optimization step {}: loss = {}, discounted return = {}, length = {}",
            self.n_opts,
            loss,
            total_discounted_reward,
            self.trajectory.len()
        );

        let mut record = Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("episode_return", RecordValue::Scalar(self.total_episode_score_so_far)),
            (
                "discounted_return",
                RecordValue::Scalar(total_discounted_reward as f32),
            ),
            (
                "episode_length",
                RecordValue::Scalar(self.episode_step_number as f32),
            ),
        ]);
        if self.record_verbose_level >= 2 {
            record.merge_inplace(self.model.param_stats()?);
        }

        Ok(record)
    }

    /// Rewards and log-probabilities stored in the current episode.
    pub fn trajectory(&self) -> &Trajectory<Tensor> {
        &self.trajectory
    }

    /// The last action taken.
    pub fn action(&self) -> Option<usize> {
        self.action
    }

    /// The number of optimization steps performed so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Action probabilities for `obs`, detached from the computation graph.
    pub fn action_probs(&self, obs: &E::Obs) -> Result<Vec<f32>> {
        let obs = obs_to_tensor(obs.clone().into(), self.model.device())?;
        let probs = self.model.forward(&obs)?.detach();
        Ok(Categorical::new(probs)?.probs().to_vec())
    }
}

impl<E, P> Policy<E> for Reinforce<E, P>
where
    E: Env,
    E::Obs: Into<Vec<f32>>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    /// Sample an action.
    ///
    /// In training mode, the action is sampled from the policy and its
    /// log-probability is stored. In evaluation mode, the most probable action
    /// is returned and nothing is stored.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act> {
        let action = match self.train {
            true => {
                let (action, log_prob) = self.pick_action_and_get_log_probabilities(obs)?;
                self.store_log_probabilities(log_prob);
                self.store_action(action);
                action
            }
            false => {
                let obs = obs_to_tensor(obs.clone().into(), self.model.device())?;
                let probs = self.model.forward(&obs)?.detach();
                Categorical::new(probs)?.mode()
            }
        };
        Ok(action.into())
    }
}

impl<E, P> Configurable for Reinforce<E, P>
where
    E: Env,
    E::Obs: Into<Vec<f32>>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: DeserializeOwned + Serialize + Clone,
{
    type Config = ReinforceConfig<P::Config>;

    /// Constructs REINFORCE agent.
    fn build(config: Self::Config) -> Result<Self> {
        config.validate()?;
        let device = config
            .device
            .unwrap_or(crate::Device::Cpu)
            .build()?;
        let policy_config = config
            .policy_config
            .context("policy_config is not set.")?;
        let model = ReinforceModel::build(policy_config, &config.opt_config, device)?;

        Ok(Self {
            model,
            discount_rate: config.discount_rate,
            return_mode: config.return_mode,
            trajectory: Trajectory::new(),
            phase: LearningPhase::default(),
            action: None,
            episode_step_number: 0,
            total_episode_score_so_far: 0.0,
            n_opts: 0,
            train: false,
            rng: SmallRng::seed_from_u64(config.seed),
            record_verbose_level: config.record_verbose_level,
            phantom: PhantomData,
        })
    }
}

impl<E, P> Agent<E> for Reinforce<E, P>
where
    E: Env,
    E::Obs: Into<Vec<f32>>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn reset_game(&mut self) {
        self.trajectory.clear();
        self.phase = LearningPhase::Collecting;
        self.action = None;
        self.episode_step_number = 0;
        self.total_episode_score_so_far = 0.0;
    }

    fn observe(&mut self, step: &Step<E>) -> Result<Option<Record>> {
        if !self.train {
            return Ok(None);
        }

        self.store_reward(step.reward);
        self.episode_step_number += 1;
        self.phase = LearningPhase::from_done(step.is_done());

        match self.time_to_learn() {
            true => Ok(Some(self.policy_learn()?)),
            false => Ok(None),
        }
    }

    /// Returns `true` when the episode has ended.
    fn time_to_learn(&self) -> bool {
        self.phase == LearningPhase::Learning
    }

    /// Save model parameters in the given directory.
    ///
    /// The parameters of the policy are saved as `policy.safetensors`.
    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.model.save(path.join("policy.safetensors"))?;
        Ok(())
    }

    /// Load model parameters in the given directory.
    ///
    /// The parameters of the policy are loaded from `policy.safetensors`.
    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.model.load(path.join("policy.safetensors"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::{Mlp, MlpConfig};
    use reinforce_core::{
        dummy::{CountdownEnv, CountdownEnvConfig, DummyObs},
        error::ReinforceError,
    };

    type Agent_ = Reinforce<CountdownEnv, Mlp>;

    fn agent(lr: f64) -> Result<Agent_> {
        let config = ReinforceConfig::default()
            .policy_config(MlpConfig::policy(1, vec![8], 2))
            .learning_rate(lr)
            .discount_rate(0.9)
            .seed(1);
        let mut agent = Agent_::build(config)?;
        agent.train();
        Ok(agent)
    }

    fn env(episode_length: usize) -> Result<CountdownEnv> {
        CountdownEnv::build(
            &CountdownEnvConfig {
                episode_length,
                reward: 1.0,
            },
            0,
        )
    }

    fn scalar(t: &Tensor) -> f32 {
        t.to_vec0::<f32>().unwrap()
    }

    #[test]
    fn test_loss_is_linear_in_return() -> Result<()> {
        let mut agent = agent(0.01)?;
        for i in 0..3 {
            agent.sample(&DummyObs(i))?;
            agent.store_reward(1.0);
        }

        let l1 = scalar(&agent.calculate_policy_loss_on_episode(1.5)?);
        let l2 = scalar(&agent.calculate_policy_loss_on_episode(3.0)?);
        let l0 = scalar(&agent.calculate_policy_loss_on_episode(0.0)?);

        // -log π > 0, so the loss has the sign of the return
        assert!(l1 > 0.0);
        assert!((l2 - 2.0 * l1).abs() < 1e-4);
        assert_eq!(l0, 0.0);

        let neg = scalar(&agent.calculate_policy_loss_on_episode(-1.5)?);
        assert!((neg + l1).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_scaling_rewards_scales_return_and_loss() -> Result<()> {
        let c = 3.0;
        let mut agent = agent(0.01)?;
        for (i, r) in [1.0, 2.0, 0.5].into_iter().enumerate() {
            agent.sample(&DummyObs(i))?;
            agent.store_reward(*r);
        }
        let g1 = agent.calculate_episode_discounted_reward();
        let l1 = scalar(&agent.calculate_policy_loss_on_episode(g1)?);

        // Same actions and log-probabilities, rewards multiplied by c
        let log_probs = agent.trajectory.log_probs().to_vec();
        let rewards = agent.trajectory.rewards().to_vec();
        agent.trajectory.clear();
        for (log_prob, r) in log_probs.into_iter().zip(rewards) {
            agent.store_log_probabilities(log_prob);
            agent.store_reward(c * r);
        }
        let g2 = agent.calculate_episode_discounted_reward();
        let l2 = scalar(&agent.calculate_policy_loss_on_episode(g2)?);

        // 1 + 0.9 * 2 + 0.81 * 0.5
        assert!((g1 - 3.205).abs() < 1e-6);
        assert!((g2 - c as f64 * g1).abs() < 1e-6);
        assert!(l1 > 0.0);
        assert!((l2 - c * l1).abs() < 1e-4 * l2.abs().max(1.0));
        Ok(())
    }

    #[test]
    fn test_loss_of_empty_episode_is_zero() -> Result<()> {
        let agent = agent(0.01)?;
        assert_eq!(agent.calculate_episode_discounted_reward(), 0.0);
        assert_eq!(scalar(&agent.calculate_policy_loss_on_episode(10.0)?), 0.0);
        Ok(())
    }

    #[test]
    fn test_discounted_reward_of_episode() -> Result<()> {
        let mut agent = agent(0.01)?;
        for r in [2.0, 4.0] {
            agent.sample(&DummyObs(0))?;
            agent.store_reward(r);
        }
        assert!((agent.calculate_episode_discounted_reward() - 5.6).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_time_to_learn_only_at_end_of_episode() -> Result<()> {
        let mut env = env(3)?;
        let mut agent = agent(0.01)?;
        agent.reset_game();
        let mut obs = env.reset()?;

        for t in 0..3 {
            let act = agent.sample(&obs)?;
            let (step, _) = env.step(&act)?;
            let record = agent.observe(&step)?;

            if t < 2 {
                assert!(!agent.time_to_learn());
                assert!(record.is_none());
            } else {
                assert!(agent.time_to_learn());
                let record = record.unwrap();
                assert!(record.get_scalar("loss").is_ok());
                assert_eq!(record.get_scalar("episode_return")?, 3.0);
                assert_eq!(record.get_scalar("episode_length")?, 3.0);
            }
            obs = step.obs;
        }

        assert_eq!(agent.n_opts(), 1);
        assert_eq!(agent.trajectory().len(), 3);
        assert!(agent.trajectory().is_consistent());
        Ok(())
    }

    #[test]
    fn test_reset_game_clears_episode() -> Result<()> {
        let mut env = env(2)?;
        let mut agent = agent(0.01)?;
        let mut obs = env.reset()?;
        loop {
            let act = agent.sample(&obs)?;
            let (step, _) = env.step(&act)?;
            agent.observe(&step)?;
            if step.is_done() {
                break;
            }
            obs = step.obs;
        }
        assert!(agent.time_to_learn());
        assert!(agent.action().is_some());

        agent.reset_game();

        assert!(!agent.time_to_learn());
        assert!(agent.trajectory().is_empty());
        assert!(agent.trajectory().log_probs().is_empty());
        assert_eq!(agent.action(), None);
        assert_eq!(agent.calculate_episode_discounted_reward(), 0.0);
        Ok(())
    }

    #[test]
    fn test_length_mismatch_is_rejected() -> Result<()> {
        let mut agent = agent(0.01)?;
        agent.sample(&DummyObs(0))?;
        agent.store_reward(1.0);
        agent.store_reward(1.0);

        let err = agent.policy_learn().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReinforceError>(),
            Some(&ReinforceError::TrajectoryLengthMismatch {
                rewards: 2,
                log_probs: 1
            })
        );
        assert_eq!(agent.n_opts(), 0);
        Ok(())
    }

    #[test]
    fn test_empty_episode_skips_optimization() -> Result<()> {
        let mut agent = agent(0.01)?;
        let record = agent.policy_learn()?;
        assert_eq!(record.get_scalar("loss")?, 0.0);
        assert_eq!(agent.n_opts(), 0);
        Ok(())
    }

    #[test]
    fn test_positive_return_reinforces_action() -> Result<()> {
        let mut agent = agent(0.01)?;
        let obs = DummyObs(1);
        let before = agent.action_probs(&obs)?;
        agent.sample(&obs)?;
        agent.store_reward(1.0);
        let action = agent.action().unwrap();

        agent.policy_learn()?;

        let after = agent.action_probs(&obs)?;
        assert!(after[action] > before[action]);
        Ok(())
    }

    #[test]
    fn test_reward_to_go_loss() -> Result<()> {
        let config = ReinforceConfig::default()
            .policy_config(MlpConfig::policy(1, vec![8], 2))
            .discount_rate(1.0)
            .return_mode(ReturnMode::RewardToGo);
        let mut agent = Agent_::build(config)?;
        agent.train();
        agent.sample(&DummyObs(0))?;
        agent.store_reward(1.0);
        agent.sample(&DummyObs(1))?;
        agent.store_reward(1.0);

        let lp: Vec<f32> = Tensor::cat(agent.trajectory().log_probs(), 0)?.to_vec1()?;
        let expected = -(lp[0] * 2.0 + lp[1] * 1.0);
        let loss = scalar(&agent.calculate_reward_to_go_policy_loss()?);
        assert!((loss - expected).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_eval_mode_stores_nothing() -> Result<()> {
        let mut env = env(2)?;
        let mut agent = agent(0.01)?;
        agent.eval();
        let obs = env.reset()?;
        let act = agent.sample(&obs)?;
        let (step, _) = env.step(&act)?;

        assert!(agent.observe(&step)?.is_none());
        assert!(agent.trajectory().is_empty());
        assert_eq!(agent.action(), None);
        Ok(())
    }
}
