//! Backend type aliases and device management
//!
//! The DQN agent is generic over an autodiff backend `B`. Its policy network
//! lives on `B` and is trained; the target network, the replay buffer and the
//! environment's observations live on `B::InnerBackend`, which cannot record
//! gradients.
//!
//! - **TrainingBackend**: autodiff NdArray backend that drives the agent (CPU)
//! - **InferenceBackend**: its inner backend, used for observations and the target network
//!
//! ```rust
//! use snake_dqn::rl::{default_device, InferenceBackend, TrainingBackend};
//! use snake_dqn::rl::{DqnAgent, DqnConfig, QNetworkConfig, SnakeEnvironment};
//! use snake_dqn::game::GameConfig;
//!
//! let device = default_device();
//! let env = SnakeEnvironment::<InferenceBackend>::new(GameConfig::small(), device.clone());
//! let agent = DqnAgent::<TrainingBackend>::new(
//!     DqnConfig::default(),
//!     QNetworkConfig::new(10, 10),
//!     device,
//! );
//! assert!(agent.is_ok());
//! # let _ = env;
//! ```

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Backend the agent is trained on
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Gradient-free backend for observations and the target network
pub type InferenceBackend = NdArray<f32>;

/// Default CPU device
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}
