//! Train [`Agent`].
mod config;
mod results;
use crate::{
    record::{
        AggregateRecorder, Record,
        RecordValue::{DateTime, Scalar},
    },
    Agent, Env, Evaluator,
};
use anyhow::Result;
use chrono::Local;
pub use config::TrainerConfig;
use log::{info, trace, warn};
pub use results::TrainingResults;
use std::{path::Path, time::SystemTime};

/// Outcome of a single episode.
struct Episode {
    score: f32,
    length: usize,
    record: Record,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the episode loop of an agent learning from complete episodes.
///
/// # Training loop
///
/// 1. `agent.reset_game()` and `env.reset()` start a new episode.
/// 2. The agent samples an action for the current observation, and the
///    environment is stepped with it. The resulting [`Step`] is given to
///    [`Agent::observe`].
/// 3. While the step does not end the episode, the agent keeps collecting
///    its trajectory (back to 2). When the episode ends, the agent performs
///    an optimization step inside [`Agent::observe`].
/// 4. The score of the episode and the rolling score over the last
///    `rolling_score_window` episodes are recorded.
/// 5. Every `eval_interval` episodes, the agent is evaluated and the best
///    model is saved in `(model_dir)/best`. Every `save_interval` episodes,
///    the model is saved in `(model_dir)/(episode)`.
/// 6. Training finishes after `max_episodes` episodes, or when the rolling
///    score reaches `score_required_to_win`.
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Collecting: reset_game
///     Collecting --> Collecting: step, not done
///     Collecting --> Learning: step, done
///     Learning --> Collecting: reset_game
///     Learning --> [*]: max_episodes or solved
/// ```
///
/// [`Step`]: crate::Step
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig) -> Self {
        Self { config }
    }

    fn save_model<E: Env, A: Agent<E>>(agent: &A, model_dir: &Path) {
        match agent.save_params(model_dir) {
            Ok(()) => info!("Saved the model in {:?}.", model_dir),
            Err(e) => warn!("Failed to save model in {:?}: {}", model_dir, e),
        }
    }

    fn model_dir(&self) -> Option<&Path> {
        self.config.model_dir.as_ref().map(Path::new)
    }

    /// Plays one episode, letting the agent learn at its end.
    fn run_episode<E, A>(env: &mut E, agent: &mut A) -> Result<Episode>
    where
        E: Env,
        A: Agent<E>,
    {
        agent.reset_game();
        let mut obs = env.reset()?;
        let mut score = 0f32;
        let mut length = 0;
        let mut record = Record::empty();

        loop {
            let act = agent.sample(&obs)?;
            let (step, record_env) = env.step(&act)?;
            trace!("step {}, reward = {}", length, step.reward);
            score += step.reward;
            length += 1;
            record.merge_inplace(record_env);

            if let Some(record_agent) = agent.observe(&step)? {
                record.merge_inplace(record_agent);
            }

            if step.is_done() {
                break;
            }
            obs = step.obs;
        }

        Ok(Episode {
            score,
            length,
            record,
        })
    }

    /// Train the agent.
    pub fn train<E, A, D>(
        &mut self,
        mut env: E,
        agent: &mut A,
        recorder: &mut Box<dyn AggregateRecorder>,
        evaluator: &mut D,
    ) -> Result<TrainingResults>
    where
        E: Env,
        A: Agent<E>,
        D: Evaluator<E>,
    {
        let timer = SystemTime::now();
        let mut results = TrainingResults::new(self.config.rolling_score_window);
        let mut max_eval_reward = f32::MIN;
        let mut last_flushed_episode = 0;
        agent.train();

        for episode in 1..=self.config.max_episodes {
            let Episode {
                score,
                length,
                mut record,
            } = Self::run_episode(&mut env, agent)?;
            let rolling_score = results.push(score);

            info!(
                "Episode {}, length = {}, return = {}, rolling return = {:.2}",
                episode, length, score, rolling_score
            );
            record.insert("episode", Scalar(episode as _));
            record.insert("episode_return", Scalar(score));
            record.insert("episode_length", Scalar(length as _));
            record.insert("rolling_return", Scalar(rolling_score));
            record.insert("datetime", DateTime(Local::now()));

            // Evaluation
            if self.config.eval_interval > 0 && episode % self.config.eval_interval == 0 {
                info!("Starts evaluation of the trained model");
                agent.eval();
                let eval_reward = evaluator.evaluate(agent)?.get_scalar_without_key();
                agent.train();

                if let Some(eval_reward) = eval_reward {
                    record.insert("eval_reward", Scalar(eval_reward));

                    // Save the best model up to the current iteration
                    if eval_reward > max_eval_reward {
                        max_eval_reward = eval_reward;
                        if let Some(model_dir) = self.model_dir() {
                            Self::save_model(agent, &model_dir.join("best"));
                        }
                    }
                }
            }

            // Save the current model
            if self.config.save_interval > 0 && episode % self.config.save_interval == 0 {
                if let Some(model_dir) = self.model_dir() {
                    Self::save_model(agent, &model_dir.join(episode.to_string()));
                }
            }

            recorder.store(record);

            if self.config.flush_record_interval > 0
                && episode % self.config.flush_record_interval == 0
            {
                recorder.flush(episode as _);
                last_flushed_episode = episode;
            }

            if let Some(required) = self.config.score_required_to_win {
                if rolling_score >= required {
                    info!(
                        "Rolling return {:.2} reached {} at episode {}",
                        rolling_score, required, episode
                    );
                    results.solved_at_episode = Some(episode);
                    break;
                }
            }
        }

        // Records stored since the last periodic flush
        if results.n_episodes() > last_flushed_episode {
            recorder.flush(results.n_episodes() as _);
        }

        results.time_taken = timer.elapsed()?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{CountdownEnv, CountdownEnvConfig, CountingAgent},
        record::{BufferedRecorder, NullRecorder},
        DefaultEvaluator,
    };
    use std::{cell::RefCell, rc::Rc};
    use tempdir::TempDir;

    /// Keeps the steps and the records written at each flush.
    #[derive(Default)]
    struct FlushLog {
        stored: Vec<Record>,
        flushed: Rc<RefCell<Vec<(i64, usize)>>>,
    }

    impl AggregateRecorder for FlushLog {
        fn store(&mut self, record: Record) {
            assert!(matches!(record.get("datetime"), Some(DateTime(_))));
            self.stored.push(record);
        }

        fn flush(&mut self, step: i64) {
            self.flushed.borrow_mut().push((step, self.stored.len()));
            self.stored.clear();
        }
    }

    fn env_config() -> CountdownEnvConfig {
        CountdownEnvConfig {
            episode_length: 4,
            reward: 1.0,
        }
    }

    #[test]
    fn test_learns_once_per_episode() -> Result<()> {
        let config = env_config();
        let env = CountdownEnv::build(&config, 0)?;
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&config, 0, 1)?;
        let mut agent = CountingAgent::default();
        let mut recorder: Box<dyn AggregateRecorder> = Box::new(NullRecorder::new());
        let mut trainer = Trainer::build(TrainerConfig::default().max_episodes(3));

        let results = trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(agent.n_reset_game, 3);
        assert_eq!(agent.n_learn, 3);
        assert_eq!(agent.n_sample, 12);
        assert_eq!(agent.learned_lengths, vec![4, 4, 4]);
        assert_eq!(results.episode_scores, vec![4.0, 4.0, 4.0]);
        assert_eq!(results.solved_at_episode, None);
        Ok(())
    }

    #[test]
    fn test_stops_when_solved() -> Result<()> {
        let config = env_config();
        let env = CountdownEnv::build(&config, 0)?;
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&config, 0, 1)?;
        let mut agent = CountingAgent::default();
        let mut recorder: Box<dyn AggregateRecorder> = Box::new(NullRecorder::new());
        let mut trainer = Trainer::build(
            TrainerConfig::default()
                .max_episodes(100)
                .rolling_score_window(2)
                .score_required_to_win(4.0),
        );

        let results = trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(results.solved_at_episode, Some(1));
        assert_eq!(results.episode_scores.len(), 1);
        assert_eq!(agent.n_learn, 1);
        Ok(())
    }

    #[test]
    fn test_eval_and_save() -> Result<()> {
        let tmp_dir = TempDir::new("trainer")?;
        let model_dir = tmp_dir.path().to_str().unwrap().to_string();
        let config = env_config();
        let env = CountdownEnv::build(&config, 0)?;
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&config, 0, 2)?;
        let mut agent = CountingAgent::default();
        let mut trainer = Trainer::build(
            TrainerConfig::default()
                .max_episodes(4)
                .eval_interval(2)
                .save_interval(4)
                .model_dir(model_dir),
        );
        let mut recorder: Box<dyn AggregateRecorder> = Box::new(BufferedRecorder::new());

        trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

        // Evaluation does not add optimization steps
        assert_eq!(agent.n_learn, 4);
        assert!(agent.is_train());
        assert!(tmp_dir.path().join("best").is_dir());
        assert!(tmp_dir.path().join("4").is_dir());
        Ok(())
    }

    #[test]
    fn test_flushes_remaining_records() -> Result<()> {
        let config = env_config();
        let env = CountdownEnv::build(&config, 0)?;
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&config, 0, 1)?;
        let mut agent = CountingAgent::default();
        let flushed = Rc::new(RefCell::new(vec![]));
        let mut recorder: Box<dyn AggregateRecorder> = Box::new(FlushLog {
            stored: vec![],
            flushed: flushed.clone(),
        });
        let mut trainer = Trainer::build(
            TrainerConfig::default()
                .max_episodes(3)
                .flush_record_interval(2),
        );

        trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(*flushed.borrow(), vec![(2, 2), (3, 1)]);
        Ok(())
    }

    #[test]
    fn test_flushes_once_when_solved_at_interval() -> Result<()> {
        let config = env_config();
        let env = CountdownEnv::build(&config, 0)?;
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&config, 0, 1)?;
        let mut agent = CountingAgent::default();
        let flushed = Rc::new(RefCell::new(vec![]));
        let mut recorder: Box<dyn AggregateRecorder> = Box::new(FlushLog {
            stored: vec![],
            flushed: flushed.clone(),
        });
        let mut trainer = Trainer::build(
            TrainerConfig::default()
                .max_episodes(10)
                .flush_record_interval(1)
                .rolling_score_window(2)
                .score_required_to_win(4.0),
        );

        trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(*flushed.borrow(), vec![(1, 1)]);
        Ok(())
    }

    #[test]
    fn test_evaluator_sets_episodes_per_eval() -> Result<()> {
        let config = env_config();
        let env = CountdownEnv::build(&config, 0)?;
        let mut evaluator = DefaultEvaluator::<CountdownEnv>::new(&config, 0, 7)?;
        let mut agent = CountingAgent::default();
        let mut recorder: Box<dyn AggregateRecorder> = Box::new(NullRecorder::new());
        let mut trainer = Trainer::build(
            TrainerConfig::default()
                .max_episodes(1)
                .eval_interval(1),
        );

        trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

        // One training episode and seven evaluation episodes of length 4
        assert_eq!(agent.n_sample, 4 + 7 * 4);
        assert_eq!(agent.n_learn, 1);
        Ok(())
    }
}
