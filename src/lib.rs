//! Snake DQN - deep Q-learning for the Snake game
//!
//! This library provides:
//! - Core game logic (game module)
//! - DQN agent, replay memory and environment wrapper (rl module)
//! - Training history, CSV/JSON export and rolling stats (metrics module)
//! - The training driver (modes module)
//! - TOML application config (config module)

pub mod config;
pub mod error;
pub mod game;
pub mod metrics;
pub mod modes;
pub mod rl;
