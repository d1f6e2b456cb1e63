//! Utility functions for forecasting models.

pub mod metrics;
pub mod stats;

pub use metrics::{calculate_metrics, interval_coverage, quantile_loss, AccuracyMetrics};
pub use stats::{ensemble_spread, lower_median, quantile_normal};
