use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{
    action::Direction,
    config::GameConfig,
    state::{CollisionType, GameState, Position, Snake},
};

/// Information about a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether the snake ate food this step
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
    /// Food eaten so far this episode
    pub score: u32,
    /// Current snake length
    pub snake_length: usize,
}

impl StepInfo {
    fn of(state: &GameState, ate_food: bool, collision_type: Option<CollisionType>) -> Self {
        Self {
            ate_food,
            collision_type,
            score: state.score,
            snake_length: state.snake.len(),
        }
    }
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub reward: f32,
    /// The snake died or filled the board
    pub terminated: bool,
    pub info: StepInfo,
}

/// Owns the game rules and the food RNG
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(config: GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Fresh game with a centred snake and one food item
    pub fn reset(&mut self) -> GameState {
        let head = Position::new(
            (self.config.grid_width / 2) as i32,
            (self.config.grid_height / 2) as i32,
        );
        let snake = Snake::new(
            head,
            self.config.initial_direction,
            self.config.initial_snake_length,
        );

        let mut state = GameState::new(snake, None, self.config.grid_width, self.config.grid_height);
        state.food = self.spawn_food(&state);
        state
    }

    /// Advance the game by one tick. Reversing into the neck is ignored.
    pub fn step(&mut self, state: &mut GameState, direction: Direction) -> StepResult {
        if !state.is_alive {
            return StepResult {
                reward: 0.0,
                terminated: true,
                info: StepInfo::of(state, false, None),
            };
        }

        if state.snake.len() == 1 || !state.snake.direction.is_opposite(direction) {
            state.snake.direction = direction;
        }

        let new_head = state.snake.head().step(state.snake.direction);
        let ate_food = state.food == Some(new_head);
        state.steps += 1;

        let collision = if !state.is_in_bounds(new_head) {
            Some(CollisionType::Wall)
        } else if state.snake.would_bite(new_head, ate_food) {
            Some(CollisionType::SelfCollision)
        } else {
            None
        };
        if let Some(collision_type) = collision {
            state.is_alive = false;
            return StepResult {
                reward: self.config.death_penalty,
                terminated: true,
                info: StepInfo::of(state, false, Some(collision_type)),
            };
        }

        state.snake.advance(ate_food);

        let mut reward = self.config.step_penalty;
        let mut terminated = false;
        if ate_food {
            state.score += 1;
            reward += self.config.food_reward;
            state.food = self.spawn_food(state);
            // Board full: nothing left to eat
            if state.food.is_none() {
                terminated = true;
                state.is_alive = false;
            }
        }

        StepResult {
            reward,
            terminated,
            info: StepInfo::of(state, ate_food, None),
        }
    }

    /// Uniform pick over the cells the snake does not cover
    fn spawn_food(&mut self, state: &GameState) -> Option<Position> {
        state.free_cells().choose(&mut self.rng).copied()
    }
}
