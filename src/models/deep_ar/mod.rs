//! DeepAR probabilistic autoregressive forecaster.
//!
//! A series-identity embedding and the covariates of each timestep feed a
//! stacked LSTM whose flattened hidden state parameterizes a per-step Gaussian.
//! Inference is two-phase: [`DeepAr::condition`] warms the decoder state over
//! the observed history, then [`DeepAr::rollout`] advances over the horizon,
//! feeding each prediction back as the next target input.

mod config;
mod loss;
mod model;
mod rollout;

pub use config::DeepArConfig;
pub use loss::gaussian_nll;
pub use model::{Conditioning, DeepAr};
pub use rollout::Rollout;
