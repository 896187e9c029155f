use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::game::{GameConfig, NUM_ACTIONS};
use crate::modes::TrainingConfig;
use crate::rl::{DqnConfig, QNetworkConfig};

/// Top-level application configuration, loadable from TOML.
///
/// Every table and every key is optional; missing values take their defaults.
///
/// ```toml
/// [game]
/// grid_width = 10
/// grid_height = 10
///
/// [dqn]
/// batch_size = 64
///
/// [training]
/// max_episodes = 5000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub dqn: DqnConfig,
    pub training: TrainingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game
            .validate()
            .map_err(|e| ConfigError::Validation(format!("game: {}", e)))?;
        self.dqn
            .validate()
            .map_err(|e| ConfigError::Validation(format!("dqn: {}", e)))?;
        self.training
            .validate()
            .map_err(|e| ConfigError::Validation(format!("training: {}", e)))?;

        if self.dqn.num_actions != NUM_ACTIONS {
            return Err(ConfigError::Validation(format!(
                "dqn.num_actions must be {} for Snake, got {}",
                NUM_ACTIONS, self.dqn.num_actions
            )));
        }
        self.network()
            .validate()
            .map_err(|e| ConfigError::Validation(format!("network: {}", e)))?;
        Ok(())
    }

    /// Q-network layout matching the configured board
    pub fn network(&self) -> QNetworkConfig {
        QNetworkConfig::new(self.game.grid_height, self.game.grid_width)
    }

    /// The default configuration rendered as TOML
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}
