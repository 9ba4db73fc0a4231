//! Scores collected by [`Trainer`](super::Trainer).
use std::time::Duration;

/// Episode scores and rolling scores of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingResults {
    /// Undiscounted return of every episode.
    pub episode_scores: Vec<f32>,

    /// Mean of the last `rolling_score_window` episode scores, one per episode.
    pub rolling_scores: Vec<f32>,

    /// The best episode score.
    pub max_episode_score: f32,

    /// The best rolling score.
    pub max_rolling_score: f32,

    /// The first episode (1-based) at which the rolling score reached the
    /// required score.
    pub solved_at_episode: Option<usize>,

    /// Wall-clock time of the training.
    pub time_taken: Duration,

    rolling_score_window: usize,
}

impl TrainingResults {
    pub(super) fn new(rolling_score_window: usize) -> Self {
        Self {
            episode_scores: vec![],
            rolling_scores: vec![],
            max_episode_score: f32::MIN,
            max_rolling_score: f32::MIN,
            solved_at_episode: None,
            time_taken: Duration::default(),
            rolling_score_window: rolling_score_window.max(1),
        }
    }

    /// Adds the score of an episode and returns the updated rolling score.
    pub(super) fn push(&mut self, score: f32) -> f32 {
        self.episode_scores.push(score);
        let n = self.episode_scores.len();
        let window = &self.episode_scores[n.saturating_sub(self.rolling_score_window)..];
        let rolling_score = window.iter().sum::<f32>() / window.len() as f32;
        self.rolling_scores.push(rolling_score);
        self.max_episode_score = self.max_episode_score.max(score);
        self.max_rolling_score = self.max_rolling_score.max(rolling_score);
        rolling_score
    }

    /// The number of episodes played.
    pub fn n_episodes(&self) -> usize {
        self.episode_scores.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_score() {
        let mut results = TrainingResults::new(2);
        assert_eq!(results.push(1.0), 1.0);
        assert_eq!(results.push(3.0), 2.0);
        assert_eq!(results.push(7.0), 5.0);
        assert_eq!(results.push(1.0), 4.0);
        assert_eq!(results.rolling_scores, vec![1.0, 2.0, 5.0, 4.0]);
        assert_eq!(results.max_episode_score, 7.0);
        assert_eq!(results.max_rolling_score, 5.0);
        assert_eq!(results.n_episodes(), 4);
    }
}
