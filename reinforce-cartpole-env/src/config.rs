use serde::{Deserialize, Serialize};

/// Configuration of [`CartPoleEnv`](super::CartPoleEnv).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CartPoleConfig {
    /// Episodes are truncated after this number of steps.
    pub max_episode_steps: usize,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            max_episode_steps: 500,
        }
    }
}

impl CartPoleConfig {
    /// Sets the maximum number of steps in an episode.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = v;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let config: CartPoleConfig = serde_yaml::from_str("max_episode_steps: 200\n").unwrap();
        assert_eq!(config, CartPoleConfig::default().max_episode_steps(200));
    }
}
