use std::path::{Path, PathBuf};

use burn::tensor::{Tensor, backend::Backend};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CheckpointError, TrainingError};

/// What the training driver needs from an agent.
///
/// `B` is the backend observations live on. Learning agents override the
/// hooks; the defaults make a non-learning agent.
pub trait Agent<B: Backend> {
    fn name(&self) -> &str;

    /// Choose an action index for `state` during `episode`
    fn select_action(&mut self, state: &Tensor<B, 3>, episode: usize) -> usize;

    /// Observe one transition. Returns the loss when an update ran.
    fn on_step(
        &mut self,
        _state: Tensor<B, 3>,
        _action: usize,
        _reward: f32,
        _next_state: Tensor<B, 3>,
        _done: bool,
    ) -> Result<Option<f32>, TrainingError> {
        Ok(None)
    }

    fn on_episode_end(&mut self, _episode: usize) {}

    fn record_episode(&mut self, _reward: f32, _length: usize) {}

    /// Current exploration rate, if the agent has one
    fn epsilon(&self) -> Option<f32> {
        None
    }

    /// Persist state for `episode`; `None` when there is nothing to save
    fn save(&self, _dir: &Path, _episode: usize) -> Result<Option<PathBuf>, CheckpointError> {
        Ok(None)
    }

    /// Restore state and return the episode it was saved at
    fn load(&mut self, _path: &Path) -> Result<usize, CheckpointError> {
        Ok(0)
    }
}

/// Uniformly random baseline
pub struct RandomAgent {
    num_actions: usize,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(num_actions: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { num_actions, rng }
    }
}

impl<B: Backend> Agent<B> for RandomAgent {
    fn name(&self) -> &str {
        "random"
    }

    fn select_action(&mut self, _state: &Tensor<B, 3>, _episode: usize) -> usize {
        self.rng.gen_range(0..self.num_actions)
    }
}
