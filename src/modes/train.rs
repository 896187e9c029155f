//! Training driver
//!
//! Runs episodes `start..=max_episodes` against the Snake environment, feeding
//! every transition to the agent, syncing on episode boundaries, logging
//! rolling progress and checkpointing on a fixed cadence.
//!
//! ```rust,no_run
//! use snake_dqn::game::GameConfig;
//! use snake_dqn::modes::{TrainMode, TrainingConfig};
//! use snake_dqn::rl::{DqnAgent, DqnConfig, QNetworkConfig, SnakeEnvironment};
//! use snake_dqn::rl::{default_device, InferenceBackend, TrainingBackend};
//!
//! let device = default_device();
//! let game = GameConfig::default();
//! let agent = DqnAgent::<TrainingBackend>::new(
//!     DqnConfig::default(),
//!     QNetworkConfig::new(game.grid_height, game.grid_width),
//!     device.clone(),
//! )?;
//! let env = SnakeEnvironment::<InferenceBackend>::new(game, device);
//!
//! let mut train_mode = TrainMode::new(agent, env, TrainingConfig::default());
//! let summary = train_mode.run()?;
//! println!("best reward {}", summary.max_reward);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::TrainingStats;
use crate::rl::{Agent, SnakeEnvironment};

/// Episode loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Last episode number to run
    pub max_episodes: usize,

    /// Episodes are truncated after this many steps
    pub max_steps_per_episode: usize,

    /// Save a checkpoint every N episodes
    pub checkpoint_frequency: usize,

    /// Log rolling progress every N episodes
    pub log_frequency: usize,

    /// Directory for checkpoint files
    pub model_dir: PathBuf,

    /// Parent directory for per-run metrics folders
    pub metrics_dir: PathBuf,

    /// Checkpoints are named `<prefix>_episode_<N>.ckpt`
    pub model_name_prefix: String,

    /// Checkpoint to resume from; training continues at its episode + 1
    pub resume_from: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_episodes: 1_000,
            max_steps_per_episode: 1_000,
            checkpoint_frequency: 100,
            log_frequency: 10,
            model_dir: PathBuf::from("models"),
            metrics_dir: PathBuf::from("data"),
            model_name_prefix: "snake_dqn".to_string(),
            resume_from: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_episodes == 0 {
            return Err("max_episodes must be positive".to_string());
        }
        if self.max_steps_per_episode == 0 {
            return Err("max_steps_per_episode must be positive".to_string());
        }
        if self.checkpoint_frequency == 0 || self.log_frequency == 0 {
            return Err("checkpoint_frequency and log_frequency must be positive".to_string());
        }
        if self.model_name_prefix.is_empty() {
            return Err("model_name_prefix must not be empty".to_string());
        }
        Ok(())
    }
}

/// Result of one episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub reward: f32,
    pub steps: usize,
    pub score: u32,
    /// Ended by the step limit rather than by the game
    pub truncated: bool,
}

/// End-of-run figures
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub first_episode: usize,
    pub episodes_run: usize,
    pub mean_reward: f32,
    pub max_reward: f32,
    pub mean_length: f32,
    pub max_length: usize,
    pub max_score: u32,
    pub last_checkpoint: Option<PathBuf>,
}

/// Drives any [`Agent`] through the Snake environment
pub struct TrainMode<B: Backend, A: Agent<B>> {
    agent: A,
    env: SnakeEnvironment<B>,
    stats: TrainingStats,
    config: TrainingConfig,
    _backend: PhantomData<B>,
}

impl<B: Backend, A: Agent<B>> TrainMode<B, A> {
    /// The environment's step limit is set from `config`
    pub fn new(agent: A, env: SnakeEnvironment<B>, config: TrainingConfig) -> Self {
        let env = env.with_step_limit(config.max_steps_per_episode);
        let stats = TrainingStats::new(config.log_frequency.max(1));
        Self {
            agent,
            env,
            stats,
            config,
            _backend: PhantomData,
        }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Train to `max_episodes`, resuming first if configured
    pub fn run(&mut self) -> Result<TrainingSummary> {
        let first_episode = match &self.config.resume_from {
            Some(path) => {
                let saved = self
                    .agent
                    .load(path)
                    .with_context(|| format!("Failed to resume from {:?}", path))?;
                saved + 1
            }
            None => 1,
        };

        self.log_header(first_episode);

        // Overall maxima and means come from this full-run tracker
        let mut run_stats = TrainingStats::new(self.config.max_episodes);
        let mut last_checkpoint = None;
        let mut last_saved_episode = None;

        for episode in first_episode..=self.config.max_episodes {
            let outcome = self.run_episode(episode)?;

            self.stats
                .record_episode(outcome.reward, outcome.steps, outcome.score);
            run_stats.record_episode(outcome.reward, outcome.steps, outcome.score);
            self.agent.record_episode(outcome.reward, outcome.steps);
            self.agent.on_episode_end(episode);

            if episode % self.config.log_frequency == 0 {
                self.log_progress(episode);
            }

            if episode % self.config.checkpoint_frequency == 0 {
                if let Some(path) = self.save_checkpoint(episode)? {
                    last_checkpoint = Some(path);
                }
                last_saved_episode = Some(episode);
            }
        }

        let episodes_run = run_stats.total_episodes();
        if episodes_run == 0 {
            warn!(
                first_episode,
                max_episodes = self.config.max_episodes,
                "nothing to train, checkpoint is already past max_episodes"
            );
        } else if last_saved_episode != Some(self.config.max_episodes) {
            if let Some(path) = self.save_checkpoint(self.config.max_episodes)? {
                last_checkpoint = Some(path);
            }
        }

        let summary = TrainingSummary {
            first_episode,
            episodes_run,
            mean_reward: run_stats.mean_episode_reward(),
            max_reward: run_stats.max_reward(),
            mean_length: run_stats.mean_episode_length(),
            max_length: run_stats.max_length(),
            max_score: run_stats.max_score(),
            last_checkpoint,
        };
        info!(
            agent = self.agent.name(),
            episodes = summary.episodes_run,
            mean_reward = summary.mean_reward,
            max_reward = summary.max_reward,
            mean_length = summary.mean_length,
            max_length = summary.max_length,
            max_score = summary.max_score,
            "training complete"
        );
        Ok(summary)
    }

    /// Play one episode, handing each transition to the agent
    pub fn run_episode(&mut self, episode: usize) -> Result<EpisodeOutcome> {
        let (mut obs, _) = self.env.reset();
        let mut episode_reward = 0.0;
        let mut episode_steps = 0;

        loop {
            let action = self.agent.select_action(&obs, episode);
            let outcome = self.env.step(action);
            let done = outcome.done();

            episode_reward += outcome.reward;
            episode_steps += 1;

            let loss = self
                .agent
                .on_step(obs, action, outcome.reward, outcome.observation.clone(), done)
                .with_context(|| format!("Update failed in episode {}", episode))?;
            if let Some(loss) = loss {
                self.stats.record_loss(loss);
            }

            obs = outcome.observation;
            if done {
                return Ok(EpisodeOutcome {
                    reward: episode_reward,
                    steps: episode_steps,
                    score: self.env.state().score,
                    truncated: outcome.truncated,
                });
            }
        }
    }

    fn save_checkpoint(&self, episode: usize) -> Result<Option<PathBuf>> {
        self.agent
            .save(&self.config.model_dir, episode)
            .with_context(|| {
                format!(
                    "Failed to save checkpoint for episode {} in {:?}",
                    episode, self.config.model_dir
                )
            })
    }

    fn log_header(&self, first_episode: usize) {
        let [_, height, width] = self.env.observation_shape();
        info!(
            agent = self.agent.name(),
            first_episode,
            max_episodes = self.config.max_episodes,
            grid = %format!("{}x{}", width, height),
            max_steps = self.config.max_steps_per_episode,
            checkpoint_every = self.config.checkpoint_frequency,
            model_dir = %self.config.model_dir.display(),
            "starting training"
        );
    }

    fn log_progress(&self, episode: usize) {
        let epsilon = self.agent.epsilon().unwrap_or(0.0);
        info!(
            "[Episode {}/{}] {}",
            episode,
            self.config.max_episodes,
            self.stats.format_summary(epsilon)
        );
    }
}
