//! Append-only training history and its on-disk forms
//!
//! The agent keeps every loss, episode reward, episode length and epsilon it
//! has produced. Checkpoints carry the whole history; the CSV table receives
//! one row of tail averages per save.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Header of the metrics table
pub const METRICS_CSV_HEADER: &str = "episode,loss,reward,episode_length,epsilon,timestamp";

/// Raw history of one training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub losses: Vec<f32>,
    pub rewards: Vec<f32>,
    pub episode_lengths: Vec<usize>,
    /// Epsilon at each optimization step, parallel to `losses`
    pub epsilon_values: Vec<f32>,
}

impl TrainingMetrics {
    pub fn record_update(&mut self, loss: f32, epsilon: f32) {
        self.losses.push(loss);
        self.epsilon_values.push(epsilon);
    }

    pub fn record_episode(&mut self, reward: f32, length: usize) {
        self.rewards.push(reward);
        self.episode_lengths.push(length);
    }

    /// Tail averages for the row written at `episode`
    pub fn summary(
        &self,
        episode: usize,
        epsilon: f32,
        loss_window: usize,
        reward_window: usize,
    ) -> MetricsRow {
        let lengths: Vec<f32> = self.episode_lengths.iter().map(|&l| l as f32).collect();
        MetricsRow {
            episode,
            loss: tail_mean(&self.losses, loss_window),
            reward: tail_mean(&self.rewards, reward_window),
            episode_length: tail_mean(&lengths, reward_window),
            epsilon,
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
        }
    }

    /// Dump the raw arrays as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<(), crate::error::CheckpointError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Mean of the last `window` values, `None` when there are none
pub fn tail_mean(values: &[f32], window: usize) -> Option<f32> {
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        None
    } else {
        Some(tail.iter().sum::<f32>() / tail.len() as f32)
    }
}

/// One line of the metrics table
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub episode: usize,
    pub loss: Option<f32>,
    pub reward: Option<f32>,
    pub episode_length: Option<f32>,
    pub epsilon: f32,
    pub timestamp: String,
}

impl MetricsRow {
    /// CSV line without trailing newline; empty windows are written as `NaN`
    pub fn to_csv(&self) -> String {
        let cell = |v: Option<f32>| v.map_or_else(|| "NaN".to_string(), |v| v.to_string());
        format!(
            "{},{},{},{},{},{}",
            self.episode,
            cell(self.loss),
            cell(self.reward),
            cell(self.episode_length),
            self.epsilon,
            self.timestamp
        )
    }

    /// Append to `path`, writing the header first if the file is new
    pub fn append_to(&self, path: &Path) -> std::io::Result<()> {
        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if is_new {
            writeln!(file, "{}", METRICS_CSV_HEADER)?;
        }
        writeln!(file, "{}", self.to_csv())?;
        file.flush()
    }
}
