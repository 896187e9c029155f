//! Epsilon-greedy exploration
//!
//! The schedule is stateful: each call multiplies the *current* epsilon by
//! `decay^(episode - 1)`, so the value reached depends on how many times the
//! scheduler was consulted per episode, not only on the episode number.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::error::EstimatorError;

/// Exploration schedule plus the explore/exploit coin flip
pub struct EpsilonGreedy {
    epsilon_start: f32,
    epsilon_end: f32,
    decay: f32,
    exploitation_threshold: usize,
    num_actions: usize,
    current_epsilon: f32,
    steps_done: u64,
    rng: StdRng,
}

impl EpsilonGreedy {
    pub fn new(
        epsilon_start: f32,
        epsilon_end: f32,
        decay: f32,
        exploitation_threshold: usize,
        num_actions: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            epsilon_start,
            epsilon_end,
            decay,
            exploitation_threshold,
            num_actions,
            current_epsilon: epsilon_start,
            steps_done: 0,
            rng,
        }
    }

    /// Move the schedule forward for `episode` and return the new epsilon
    pub fn advance(&mut self, episode: usize) -> f32 {
        self.current_epsilon = if episode <= 1 {
            self.epsilon_start
        } else if episode > self.exploitation_threshold {
            0.0
        } else {
            let factor = self.decay.powf((episode - 1) as f32);
            (self.current_epsilon * factor).max(self.epsilon_end)
        };
        self.current_epsilon
    }

    /// Pick an action for `episode`.
    ///
    /// Advances the schedule, counts the step and flips the coin: with
    /// probability `1 - epsilon` the greedy action is taken.
    ///
    /// # Arguments
    ///
    /// * `episode` - Current episode number, 1-based
    /// * `greedy` - Computes the greedy action; only evaluated on the exploit
    ///   branch. If it fails, a uniform random action is returned instead.
    ///
    /// # Returns
    ///
    /// An action index in `0..num_actions`
    ///
    /// # Example
    ///
    /// ```rust
    /// use snake_dqn::rl::EpsilonGreedy;
    ///
    /// let mut exploration = EpsilonGreedy::new(1.0, 0.05, 0.999, 1000, 4, Some(7));
    ///
    /// // Past the threshold epsilon is 0, so the greedy action always wins
    /// let action = exploration.select_action(2000, || Ok(3));
    /// assert_eq!(action, 3);
    /// assert_eq!(exploration.steps_done(), 1);
    /// ```
    pub fn select_action<F>(&mut self, episode: usize, greedy: F) -> usize
    where
        F: FnOnce() -> Result<usize, EstimatorError>,
    {
        let epsilon = self.advance(episode);
        self.steps_done += 1;

        if self.rng.gen::<f32>() > epsilon {
            match greedy() {
                Ok(action) => return action,
                Err(err) => {
                    warn!(episode, error = %err, "greedy evaluation failed, acting randomly");
                }
            }
        }
        self.random_action()
    }

    pub fn random_action(&mut self) -> usize {
        self.rng.gen_range(0..self.num_actions)
    }

    pub fn epsilon(&self) -> f32 {
        self.current_epsilon
    }

    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    /// Overwrite the schedule state, used when resuming from a checkpoint
    pub fn restore(&mut self, epsilon: f32, steps_done: u64) {
        self.current_epsilon = epsilon;
        self.steps_done = steps_done;
    }
}

/// Index of the largest value; ties resolve to the first index.
pub fn argmax(values: &[f32]) -> Result<usize, EstimatorError> {
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::NonFinite(values.to_vec()));
    }
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    Ok(best)
}
