pub mod train;

pub use train::{EpisodeOutcome, TrainMode, TrainingConfig, TrainingSummary};
