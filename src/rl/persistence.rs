//! Checkpoint container for the DQN agent
//!
//! A checkpoint is a single bincode file holding the schedule state, the
//! training history and three opaque blobs: the policy, target and optimizer
//! records, each serialized with Burn's `BinBytesRecorder`. Files are written
//! to a temporary path and renamed into place so a crash never leaves a
//! truncated checkpoint behind.

use std::fs;
use std::path::Path;

use burn::{
    record::{BinBytesRecorder, FullPrecisionSettings, Record, Recorder},
    tensor::backend::Backend,
};
use serde::{Deserialize, Serialize};

use super::network::QNetworkConfig;
use crate::error::CheckpointError;
use crate::metrics::TrainingMetrics;

/// Bumped whenever the container layout changes
pub const CHECKPOINT_VERSION: u32 = 1;

/// Everything needed to resume training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Crate version that wrote the file
    pub crate_version: String,
    pub episode: usize,
    /// Layout the three records were produced for
    pub network: QNetworkConfig,
    pub policy: Vec<u8>,
    pub target: Vec<u8>,
    pub optimizer: Vec<u8>,
    pub steps_done: u64,
    pub epsilon: f32,
    pub training_metrics: TrainingMetrics,
}

impl Checkpoint {
    /// `<prefix>_episode_<N>.ckpt`
    pub fn file_name(prefix: &str, episode: usize) -> String {
        format!("{}_episode_{}.ckpt", prefix, episode)
    }

    /// Write atomically to `path`, creating parent directories
    pub fn write(&self, path: &Path) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        let tmp_path = path.with_extension("ckpt.tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, CheckpointError> {
        let bytes = fs::read(path).map_err(|source| CheckpointError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let checkpoint: Checkpoint = bincode::deserialize(&bytes)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(checkpoint)
    }
}

/// Serialize a Burn record to bytes at full precision
pub fn encode_record<B: Backend, R: Record<B>>(
    component: &'static str,
    record: R,
) -> Result<Vec<u8>, CheckpointError> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::record(&recorder, record, ()).map_err(|e| CheckpointError::RecordEncode {
        component,
        reason: format!("{:?}", e),
    })
}

/// Inverse of [`encode_record`]
pub fn decode_record<B: Backend, R: Record<B>>(
    component: &'static str,
    bytes: Vec<u8>,
    device: &B::Device,
) -> Result<R, CheckpointError> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::load(&recorder, bytes, device).map_err(|e| CheckpointError::RecordDecode {
        component,
        reason: format!("{:?}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::module::Module;
    use tempfile::TempDir;

    type TestBackend = NdArray<f32>;

    fn sample_checkpoint() -> Checkpoint {
        let mut metrics = TrainingMetrics::default();
        metrics.record_episode(1.5, 20);
        Checkpoint {
            version: CHECKPOINT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            episode: 7,
            network: QNetworkConfig::new(10, 10),
            policy: vec![1, 2, 3],
            target: vec![4, 5],
            optimizer: vec![],
            steps_done: 321,
            epsilon: 0.42,
            training_metrics: metrics,
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(Checkpoint::file_name("dqn", 50), "dqn_episode_50.ckpt");
    }

    #[test]
    fn test_write_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("a.ckpt");

        sample_checkpoint().write(&path).unwrap();
        let loaded = Checkpoint::read(&path).unwrap();

        assert_eq!(loaded.episode, 7);
        assert_eq!(loaded.steps_done, 321);
        assert_eq!(loaded.epsilon, 0.42);
        assert_eq!(loaded.policy, vec![1, 2, 3]);
        assert_eq!(loaded.training_metrics.episode_lengths, vec![20]);
        assert!(!path.with_extension("ckpt.tmp").exists());
    }

    #[test]
    fn test_rejects_other_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.ckpt");
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION + 1,
            ..sample_checkpoint()
        };
        checkpoint.write(&path).unwrap();

        assert!(matches!(
            Checkpoint::read(&path),
            Err(CheckpointError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.ckpt");
        fs::write(&path, b"not a checkpoint").unwrap();

        assert!(Checkpoint::read(&path).is_err());
    }

    #[test]
    fn test_record_round_trip() {
        let device = NdArrayDevice::default();
        let network = QNetworkConfig::new(8, 8).init::<TestBackend>(&device);

        let bytes = encode_record::<TestBackend, _>("policy", network.clone().into_record()).unwrap();
        let record = decode_record::<TestBackend, _>("policy", bytes.clone(), &device).unwrap();
        let restored = QNetworkConfig::new(8, 8)
            .init::<TestBackend>(&device)
            .load_record(record);

        let again = encode_record::<TestBackend, _>("policy", restored.into_record()).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_decode_garbage_record_fails() {
        type PolicyRecord = <crate::rl::QNetwork<TestBackend> as Module<TestBackend>>::Record;

        let device = NdArrayDevice::default();
        let result = decode_record::<TestBackend, PolicyRecord>("policy", vec![0xff; 16], &device);

        assert!(matches!(
            result,
            Err(CheckpointError::RecordDecode { component: "policy", .. })
        ));
    }
}
