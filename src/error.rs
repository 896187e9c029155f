use std::path::PathBuf;

/// Errors raised by the replay memory.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("cannot sample {requested} transitions from a buffer holding {available}")]
    InsufficientSamples { requested: usize, available: usize },
}

/// Failures of a greedy Q-value evaluation.
///
/// Action selection never surfaces these; it falls back to a random action.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EstimatorError {
    #[error("observation shape {actual:?} does not match network input {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("network produced non-finite Q-values: {0:?}")]
    NonFinite(Vec<f32>),

    #[error("failed to read tensor data: {0}")]
    Readback(String),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("checkpoint container is malformed: {0}")]
    Container(#[from] bincode::Error),

    #[error("checkpoint version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("checkpoint does not match this agent: {0}")]
    Incompatible(String),

    #[error("failed to encode {component} record: {reason}")]
    RecordEncode {
        component: &'static str,
        reason: String,
    },

    #[error("failed to decode {component} record: {reason}")]
    RecordDecode {
        component: &'static str,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("transition shape {actual:?} does not match the network input {expected:?}")]
    TransitionShape {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("loss became non-finite: {0}")]
    NonFiniteLoss(f32),

    #[error("failed to read tensor data: {0}")]
    Readback(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_error_display() {
        let err = ReplayError::InsufficientSamples {
            requested: 32,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "cannot sample 32 transitions from a buffer holding 10"
        );
    }

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::UnsupportedVersion {
            found: 9,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "checkpoint version 9 is not supported (expected 1)"
        );
    }

    #[test]
    fn test_training_error_wraps_replay() {
        let err: TrainingError = ReplayError::InsufficientSamples {
            requested: 2,
            available: 1,
        }
        .into();
        assert!(err.to_string().starts_with("replay error:"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("dqn.gamma must be in [0, 1]".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: dqn.gamma must be in [0, 1]"
        );
    }
}
