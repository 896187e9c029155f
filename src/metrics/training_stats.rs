//! Rolling statistics for progress logging
//!
//! These windows feed log lines and the end-of-run summary. The persisted
//! per-run history lives in [`TrainingMetrics`](super::TrainingMetrics).

use std::collections::VecDeque;

/// Training statistics tracker with rolling averages
///
/// ```rust
/// use snake_dqn::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
/// stats.record_episode(15.5, 150, 5);
/// stats.record_loss(0.02);
///
/// assert_eq!(stats.total_episodes(), 1);
/// assert!(stats.format_summary(0.5).contains("Reward: 15.50"));
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    episode_rewards: VecDeque<f32>,
    episode_lengths: VecDeque<usize>,
    episode_scores: VecDeque<u32>,
    losses: VecDeque<f32>,

    /// Best values over the whole run, not just the window
    max_reward: Option<f32>,
    max_length: usize,
    max_score: u32,

    total_episodes: usize,
    total_steps: usize,
    total_updates: usize,

    window_size: usize,
}

impl TrainingStats {
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            episode_scores: VecDeque::with_capacity(window_size),
            losses: VecDeque::with_capacity(window_size),
            max_reward: None,
            max_length: 0,
            max_score: 0,
            total_episodes: 0,
            total_steps: 0,
            total_updates: 0,
            window_size,
        }
    }

    /// Record a finished episode
    ///
    /// # Arguments
    ///
    /// * `reward` - Total reward over the episode
    /// * `length` - Number of steps taken
    /// * `score` - Food eaten
    ///
    /// # Example
    ///
    /// ```rust
    /// use snake_dqn::metrics::TrainingStats;
    ///
    /// let mut stats = TrainingStats::new(2);
    /// stats.record_episode(4.0, 40, 1);
    /// stats.record_episode(-2.0, 10, 0);
    /// stats.record_episode(1.0, 30, 2);
    ///
    /// // The window keeps the last two; maxima cover the whole run
    /// assert_eq!(stats.mean_episode_reward(), -0.5);
    /// assert_eq!(stats.max_reward(), 4.0);
    /// ```
    pub fn record_episode(&mut self, reward: f32, length: usize, score: u32) {
        Self::push_deque(&mut self.episode_rewards, reward, self.window_size);
        Self::push_deque(&mut self.episode_lengths, length, self.window_size);
        Self::push_deque(&mut self.episode_scores, score, self.window_size);

        self.max_reward = Some(self.max_reward.map_or(reward, |m| m.max(reward)));
        self.max_length = self.max_length.max(length);
        self.max_score = self.max_score.max(score);
        self.total_episodes += 1;
        self.total_steps += length;
    }

    /// Record the loss of one optimization step
    pub fn record_loss(&mut self, loss: f32) {
        Self::push_deque(&mut self.losses, loss, self.window_size);
        self.total_updates += 1;
    }

    pub fn mean_episode_reward(&self) -> f32 {
        Self::mean(self.episode_rewards.iter().copied())
    }

    pub fn mean_episode_length(&self) -> f32 {
        Self::mean(self.episode_lengths.iter().map(|&l| l as f32))
    }

    pub fn mean_episode_score(&self) -> f32 {
        Self::mean(self.episode_scores.iter().map(|&s| s as f32))
    }

    /// Mean loss over the window, 0.0 before the first update
    pub fn mean_loss(&self) -> f32 {
        Self::mean(self.losses.iter().copied())
    }

    /// Highest episode reward seen, 0.0 before the first episode
    pub fn max_reward(&self) -> f32 {
        self.max_reward.unwrap_or(0.0)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line progress summary
    pub fn format_summary(&self, epsilon: f32) -> String {
        format!(
            "Episodes: {} | Steps: {} | Reward: {:.2} | Score: {:.2} | Len: {:.1} | Loss: {:.4} | Eps: {:.3}",
            self.total_episodes,
            self.total_steps,
            self.mean_episode_reward(),
            self.mean_episode_score(),
            self.mean_episode_length(),
            self.mean_loss(),
            epsilon,
        )
    }

    fn mean(values: impl ExactSizeIterator<Item = f32>) -> f32 {
        let len = values.len();
        if len == 0 {
            0.0
        } else {
            values.sum::<f32>() / len as f32
        }
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}
