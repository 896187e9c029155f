//! Core game logic module for Snake
//!
//! Pure simulation: movement, food spawning, collision and scoring, with no
//! rendering or I/O. The RL environment wraps it.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

pub use action::{Direction, NUM_ACTIONS};
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use state::{CollisionType, GameState, Position, Snake};
