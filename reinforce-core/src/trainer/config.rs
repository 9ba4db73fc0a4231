//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
///
/// All intervals are counted in episodes.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The maximum number of episodes.
    pub max_episodes: usize,

    /// Interval of evaluation. `0` disables evaluation.
    pub eval_interval: usize,

    /// Interval of flushing records.
    pub flush_record_interval: usize,

    /// Interval of saving model parameters.
    pub save_interval: usize,

    /// The number of recent episodes averaged into the rolling score.
    pub rolling_score_window: usize,

    /// Training stops once the rolling score reaches this value.
    pub score_required_to_win: Option<f32>,

    /// Where to save the trained model.
    pub model_dir: Option<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 0,
            eval_interval: 0,
            flush_record_interval: 1,
            save_interval: usize::MAX,
            rolling_score_window: 100,
            score_required_to_win: None,
            model_dir: None,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the interval of evaluation in episodes.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of flushing records in episodes.
    pub fn flush_record_interval(mut self, v: usize) -> Self {
        self.flush_record_interval = v;
        self
    }

    /// Sets the interval of saving in episodes.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the window of the rolling score.
    pub fn rolling_score_window(mut self, v: usize) -> Self {
        self.rolling_score_window = v;
        self
    }

    /// Sets the rolling score at which the task counts as solved.
    pub fn score_required_to_win(mut self, v: f32) -> Self {
        self.score_required_to_win = Some(v);
        self
    }

    /// Sets the directory where the trained model is saved.
    pub fn model_dir(mut self, model_dir: impl Into<String>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(1000)
            .eval_interval(50)
            .score_required_to_win(195.0)
            .model_dir("some/directory");

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");

        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
