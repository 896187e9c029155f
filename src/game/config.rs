use serde::{Deserialize, Serialize};

use super::action::Direction;

/// Configuration for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Initial length of the snake
    pub initial_snake_length: usize,
    /// Heading of the snake after a reset
    pub initial_direction: Direction,

    // Rewards
    /// Reward for eating food
    pub food_reward: f32,
    /// Reward added on every surviving step
    pub step_penalty: f32,
    /// Reward for dying
    pub death_penalty: f32,

    /// Seed for food placement; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            initial_snake_length: 3,
            initial_direction: Direction::Right,
            food_reward: 10.0,
            step_penalty: -0.01,
            death_penalty: -10.0,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10, 10)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.grid_width < 4 || self.grid_height < 4 {
            return Err(format!(
                "grid must be at least 4x4, got {}x{}",
                self.grid_width, self.grid_height
            ));
        }
        if self.initial_snake_length == 0 {
            return Err("initial_snake_length must be at least 1".to_string());
        }
        // The snake is laid out behind the centred head along its heading
        let room = match self.initial_direction {
            Direction::Left | Direction::Right => self.grid_width / 2,
            Direction::Up | Direction::Down => self.grid_height / 2,
        };
        if self.initial_snake_length > room {
            return Err(format!(
                "initial_snake_length {} does not fit on a {}x{} grid",
                self.initial_snake_length, self.grid_width, self.grid_height
            ));
        }
        for (name, value) in [
            ("food_reward", self.food_reward),
            ("step_penalty", self.step_penalty),
            ("death_penalty", self.death_penalty),
        ] {
            if !value.is_finite() {
                return Err(format!("{} must be finite, got {}", name, value));
            }
        }
        Ok(())
    }
}
