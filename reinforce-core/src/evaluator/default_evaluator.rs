//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{record::Record, Agent, Env};
use anyhow::Result;
use log::info;

/// Runs a fixed number of episodes and returns the average return
/// under the key `"Episode return"`.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<A: Agent<E>>(&mut self, agent: &mut A) -> Result<Record> {
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;
            let mut r_episode = 0f32;

            loop {
                let act = agent.sample(&prev_obs)?;
                let (step, _) = self.env.step(&act)?;
                r_episode += step.reward;
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }

            info!("Evaluation episode {}, return = {}", ix, r_episode);
            r_total += r_episode;
        }

        Ok(Record::from_scalar(
            "Episode return",
            r_total / self.n_episodes.max(1) as f32,
        ))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a [`DefaultEvaluator`] with an environment built from `config`.
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }

    /// Constructs a [`DefaultEvaluator`] with a given environment.
    pub fn from_env(env: E, n_episodes: usize) -> Self {
        Self { n_episodes, env }
    }
}
