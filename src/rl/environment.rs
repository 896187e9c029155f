use burn::tensor::{Tensor, backend::Backend};
use tracing::debug;

use super::observation::{create_observation, observation_shape};
use crate::game::{Direction, GameConfig, GameEngine, GameState, StepInfo, NUM_ACTIONS};

/// Outcome of one environment step
#[derive(Debug, Clone)]
pub struct StepOutcome<B: Backend> {
    pub observation: Tensor<B, 3>,
    pub reward: f32,
    /// The game ended (death or full board)
    pub terminated: bool,
    /// The step limit cut the episode short
    pub truncated: bool,
    pub info: StepInfo,
}

impl<B: Backend> StepOutcome<B> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Snake environment for reinforcement learning
///
/// Wraps the game engine behind a tensor interface: `[3, height, width]`
/// observations and a discrete action space indexed Up, Right, Down, Left.
pub struct SnakeEnvironment<B: Backend> {
    engine: GameEngine,
    state: GameState,
    device: B::Device,
    max_steps: Option<usize>,
    episode_steps: usize,
}

impl<B: Backend> SnakeEnvironment<B> {
    pub fn new(config: GameConfig, device: B::Device) -> Self {
        let mut engine = GameEngine::new(config);
        let state = engine.reset();
        Self {
            engine,
            state,
            device,
            max_steps: None,
            episode_steps: 0,
        }
    }

    /// Truncate episodes after `max_steps` steps
    pub fn with_step_limit(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn num_actions(&self) -> usize {
        NUM_ACTIONS
    }

    pub fn observation_shape(&self) -> [usize; 3] {
        let config = self.engine.config();
        observation_shape(config.grid_width, config.grid_height)
    }

    /// Start a new episode
    pub fn reset(&mut self) -> (Tensor<B, 3>, StepInfo) {
        self.state = self.engine.reset();
        self.episode_steps = 0;
        let info = StepInfo {
            ate_food: false,
            collision_type: None,
            score: 0,
            snake_length: self.state.snake.len(),
        };
        (self.observation(), info)
    }

    /// Apply action `action_idx`. An index outside the action space keeps the
    /// current heading.
    pub fn step(&mut self, action_idx: usize) -> StepOutcome<B> {
        let direction = Direction::from_index(action_idx).unwrap_or_else(|| {
            debug!(action_idx, "action index out of range, keeping heading");
            self.state.snake.direction
        });
        let result = self.engine.step(&mut self.state, direction);
        self.episode_steps += 1;

        let truncated = !result.terminated
            && self.max_steps.is_some_and(|limit| self.episode_steps >= limit);

        StepOutcome {
            observation: self.observation(),
            reward: result.reward,
            terminated: result.terminated,
            truncated,
            info: result.info,
        }
    }

    /// Current observation without stepping
    pub fn observation(&self) -> Tensor<B, 3> {
        create_observation(&self.state, &self.device)
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }
}
