//! # flood-forecast
//!
//! Probabilistic time series forecasting for flood and streamflow prediction.
//!
//! The core model is a DeepAR-style autoregressive forecaster: a stacked LSTM
//! conditioned on covariates and a learned series-identity embedding, emitting
//! a Gaussian per step. Inference rolls the model forward over the horizon,
//! either deterministically or by Monte Carlo sampling of trajectories.
//! A point-forecast GRU, rollout evaluation and the network building blocks
//! are provided alongside.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod nn;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{DeterministicForecast, Forecast, RecurrentState, RolloutOutput, SampledForecast};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::{DeepAr, DeepArConfig, StepModel, VanillaGru, VanillaGruConfig};
    pub use crate::transform::SeriesScale;
    pub use crate::utils::{calculate_metrics, quantile_normal, AccuracyMetrics};
    pub use crate::validation::evaluate;
}
