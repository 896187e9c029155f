pub mod training_metrics;
pub mod training_stats;

pub use training_metrics::{METRICS_CSV_HEADER, MetricsRow, TrainingMetrics, tail_mean};
pub use training_stats::TrainingStats;
