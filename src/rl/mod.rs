//! Reinforcement learning for Snake
//!
//! Provides:
//! - 3-channel grid observations (body, head, food)
//! - Burn-compatible environment wrapper with episode truncation
//! - Convolutional Q-network with a frozen target copy
//! - Experience replay, epsilon-greedy exploration and the DQN update
//! - Checkpointing of the full training state

pub mod agent;
pub mod backend;
pub mod config;
pub mod dqn;
pub mod environment;
pub mod exploration;
pub mod network;
pub mod observation;
pub mod persistence;
pub mod replay_buffer;

pub use agent::{Agent, RandomAgent};
pub use backend::{InferenceBackend, TrainingBackend, default_device};
pub use config::DqnConfig;
pub use dqn::DqnAgent;
pub use environment::{SnakeEnvironment, StepOutcome};
pub use exploration::{EpsilonGreedy, argmax};
pub use network::{QNetwork, QNetworkConfig};
pub use observation::{OBSERVATION_CHANNELS, create_observation, observation_shape};
pub use persistence::{CHECKPOINT_VERSION, Checkpoint};
pub use replay_buffer::{NextState, ReplayBuffer, Transition};
