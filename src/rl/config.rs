//! DQN hyperparameter configuration

use serde::{Deserialize, Serialize};

use crate::game::NUM_ACTIONS;

/// Hyperparameters of the experience-replay DQN agent
///
/// Passed by value to [`DqnAgent::new`](super::DqnAgent::new) and validated
/// there; the agent never reads configuration from anywhere else.
///
/// ```rust
/// use snake_dqn::rl::DqnConfig;
///
/// let config = DqnConfig {
///     batch_size: 64,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Learning rate for the AdamW optimizer
    pub learning_rate: f64,

    /// Discount factor for bootstrapped values
    pub gamma: f32,

    /// Epsilon at the first episode
    pub epsilon_start: f32,

    /// Floor the decayed epsilon never drops below before the threshold
    pub epsilon_end: f32,

    /// Multiplicative decay base, raised to `episode - 1` on every action
    pub epsilon_decay: f32,

    /// Past this episode exploration stops entirely
    pub exploitation_threshold: usize,

    /// Transitions per optimization step
    pub batch_size: usize,

    /// Replay memory size
    pub replay_capacity: usize,

    /// Copy policy weights to the target every this many episodes
    pub target_update_frequency: usize,

    /// Every gradient element is clipped to `[-clip_gradients, clip_gradients]`
    pub clip_gradients: f32,

    pub num_actions: usize,

    /// Losses averaged into each metrics row
    pub loss_window: usize,

    /// Episode rewards and lengths averaged into each metrics row
    pub reward_window: usize,

    /// Seed for exploration and replay sampling; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay: 0.999,
            exploitation_threshold: 1_000,
            batch_size: 32,
            replay_capacity: 10_000,
            target_update_frequency: 10,
            clip_gradients: 100.0,
            num_actions: NUM_ACTIONS,
            loss_window: 100,
            reward_window: 10,
            seed: None,
        }
    }
}

impl DqnConfig {
    /// Check every hyperparameter is in range
    pub fn validate(&self) -> Result<(), String> {
        if !(self.learning_rate > 0.0) {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1), got {}", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.epsilon_start) {
            return Err(format!(
                "epsilon_start must be in [0, 1], got {}",
                self.epsilon_start
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_end) {
            return Err(format!(
                "epsilon_end must be in [0, 1], got {}",
                self.epsilon_end
            ));
        }
        if self.epsilon_end > self.epsilon_start {
            return Err(format!(
                "epsilon_end ({}) must not exceed epsilon_start ({})",
                self.epsilon_end, self.epsilon_start
            ));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(format!(
                "epsilon_decay must be in (0, 1], got {}",
                self.epsilon_decay
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        if self.replay_capacity < self.batch_size {
            return Err(format!(
                "replay_capacity ({}) must be at least batch_size ({})",
                self.replay_capacity, self.batch_size
            ));
        }
        if self.target_update_frequency == 0 {
            return Err("target_update_frequency must be positive".to_string());
        }
        if !(self.clip_gradients > 0.0 && self.clip_gradients.is_finite()) {
            return Err(format!(
                "clip_gradients must be positive and finite, got {}",
                self.clip_gradients
            ));
        }
        if self.num_actions == 0 {
            return Err("num_actions must be positive".to_string());
        }
        if self.loss_window == 0 || self.reward_window == 0 {
            return Err("metric windows must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DqnConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_actions, 4);
        assert_eq!(config.loss_window, 100);
        assert_eq!(config.reward_window, 10);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            DqnConfig { learning_rate: 0.0, ..Default::default() },
            DqnConfig { gamma: 1.5, ..Default::default() },
            DqnConfig { gamma: 1.0, ..Default::default() },
            DqnConfig { epsilon_end: 0.9, epsilon_start: 0.5, ..Default::default() },
            DqnConfig { epsilon_decay: 0.0, ..Default::default() },
            DqnConfig { batch_size: 0, ..Default::default() },
            DqnConfig { replay_capacity: 8, batch_size: 16, ..Default::default() },
            DqnConfig { target_update_frequency: 0, ..Default::default() },
            DqnConfig { clip_gradients: f32::INFINITY, ..Default::default() },
            DqnConfig { learning_rate: f64::NAN, ..Default::default() },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
    }

    #[test]
    fn test_toml_round_trip_with_defaults() {
        let config: DqnConfig = toml::from_str("batch_size = 8\nseed = 5").unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.gamma, 0.99);
    }
}
