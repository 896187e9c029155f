use std::collections::VecDeque;

use burn::tensor::{Tensor, backend::Backend};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::error::ReplayError;

/// What followed a transition
#[derive(Debug, Clone)]
pub enum NextState<B: Backend> {
    Continuing(Tensor<B, 3>),
    /// The episode ended on this step; nothing to bootstrap from
    Terminal,
}

impl<B: Backend> NextState<B> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NextState::Terminal)
    }
}

/// One step of experience
#[derive(Debug, Clone)]
pub struct Transition<B: Backend> {
    pub state: Tensor<B, 3>,
    pub action: usize,
    pub next_state: NextState<B>,
    pub reward: f32,
}

/// Bounded FIFO memory with uniform sampling without replacement.
///
/// Pushing onto a full buffer evicts exactly the oldest entry.
pub struct ReplayBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
    rng: StdRng,
}

impl<T: Clone> ReplayBuffer<T> {
    /// `capacity` must be positive
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "replay capacity must be positive");
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            rng,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    /// Draw `batch_size` distinct entries.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<T>, ReplayError> {
        if batch_size > self.buffer.len() {
            return Err(ReplayError::InsufficientSamples {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }
        let indices = index::sample(&mut self.rng, self.buffer.len(), batch_size);
        Ok(indices.iter().map(|i| self.buffer[i].clone()).collect())
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
