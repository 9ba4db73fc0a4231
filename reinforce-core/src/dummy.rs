//! Environment and agent used for tests.
use crate::{
    record::{Record, RecordValue},
    Act, Agent, Env, LearningPhase, Obs, Policy, Step, Trajectory,
};
use anyhow::Result;
use std::path::Path;

/// Observation of [`CountdownEnv`], the number of remaining steps.
#[derive(Clone, Debug, PartialEq)]
pub struct DummyObs(pub usize);

impl Obs for DummyObs {}

impl From<DummyObs> for Vec<f32> {
    fn from(obs: DummyObs) -> Self {
        vec![obs.0 as f32]
    }
}

/// Action of [`CountdownEnv`]; the value is ignored by the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct DummyAct(pub usize);

impl Act for DummyAct {}

impl From<usize> for DummyAct {
    fn from(a: usize) -> Self {
        Self(a)
    }
}

/// Configuration of [`CountdownEnv`].
#[derive(Clone, Debug)]
pub struct CountdownEnvConfig {
    /// Number of steps in every episode.
    pub episode_length: usize,

    /// Reward given at every step.
    pub reward: f32,
}

/// Environment whose episodes terminate after a fixed number of steps.
pub struct CountdownEnv {
    config: CountdownEnvConfig,
    remaining: usize,
}

impl Env for CountdownEnv {
    type Config = CountdownEnvConfig;
    type Obs = DummyObs;
    type Act = DummyAct;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            remaining: config.episode_length,
        })
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.remaining = self.config.episode_length;
        Ok(DummyObs(self.remaining))
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        anyhow::ensure!(self.remaining > 0, "Step after the end of an episode");
        self.remaining -= 1;
        let step = Step::new(
            DummyObs(self.remaining),
            a.clone(),
            self.config.reward,
            self.remaining == 0,
            false,
            (),
        );
        Ok((step, Record::empty()))
    }

    fn reset_with_index(&mut self, _ix: usize) -> Result<Self::Obs> {
        self.reset()
    }
}

/// Agent counting the calls made by a trainer.
#[derive(Default)]
pub struct CountingAgent {
    /// Training mode.
    pub train: bool,

    /// The number of calls of [`Agent::reset_game`].
    pub n_reset_game: usize,

    /// The number of optimization steps.
    pub n_learn: usize,

    /// The number of actions sampled.
    pub n_sample: usize,

    /// Rewards of the current episode.
    pub trajectory: Trajectory<()>,

    /// Lengths of the trajectories at each optimization step.
    pub learned_lengths: Vec<usize>,

    phase: LearningPhase,
}

impl Policy<CountdownEnv> for CountingAgent {
    fn sample(&mut self, _obs: &DummyObs) -> Result<DummyAct> {
        self.n_sample += 1;
        if self.train {
            self.trajectory.push_log_prob(());
        }
        Ok(DummyAct(0))
    }
}

impl Agent<CountdownEnv> for CountingAgent {
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
        self.n_reset_game += 1;
        self.trajectory.clear();
        self.phase = LearningPhase::Collecting;
    }

    fn observe(&mut self, step: &Step<CountdownEnv>) -> Result<Option<Record>> {
        if !self.train {
            return Ok(None);
        }
        self.trajectory.push_reward(step.reward);
        self.phase = LearningPhase::from_done(step.is_done());

        if self.time_to_learn() {
            self.trajectory.check_consistency()?;
            self.n_learn += 1;
            self.learned_lengths.push(self.trajectory.len());
            let mut record = Record::empty();
            record.insert("loss", RecordValue::Scalar(-self.trajectory.total_reward()));
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    fn time_to_learn(&self) -> bool {
        self.phase == LearningPhase::Learning
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    fn load_params(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
