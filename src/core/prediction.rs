//! Outputs of multi-step rollouts.

use ndarray::{Array2, Array3, Axis};

use super::Forecast;
use crate::error::{ForecastError, Result};
use crate::utils::stats::{quantile, quantile_normal, reduce_samples};

/// Result of a deterministic rollout.
#[derive(Debug, Clone)]
pub struct DeterministicForecast {
    /// De-normalized location per `[batch, step]`
    pub mu: Array2<f64>,
    /// De-normalized standard deviation per `[batch, step]`
    pub sigma: Array2<f64>,
    /// The rollout's own copy of the input buffer after feedback was written
    /// `[total_len, batch, 1 + cov_dim]`
    pub inputs: Array3<f64>,
}

impl DeterministicForecast {
    pub fn batch_size(&self) -> usize {
        self.mu.nrows()
    }

    pub fn horizon(&self) -> usize {
        self.mu.ncols()
    }

    /// Gaussian interval `mu ± z·sigma` at the given nominal level.
    pub fn to_forecast(&self, level: f64) -> Result<Forecast> {
        check_level(level)?;
        let z = quantile_normal((1.0 + level) / 2.0);
        let lower = &self.mu - &(&self.sigma * z);
        let upper = &self.mu + &(&self.sigma * z);
        Forecast::from_batch_with_intervals(self.mu.view(), lower.view(), upper.view(), level)
    }
}

/// Result of a stochastic rollout.
#[derive(Debug, Clone)]
pub struct SampledForecast {
    /// De-normalized trajectories `[sample_times, batch, step]`
    pub samples: Array3<f64>,
    /// Per-`[batch, step]` median across trajectories
    pub median: Array2<f64>,
    /// Per-`[batch, step]` standard deviation across trajectories
    pub std: Array2<f64>,
}

impl SampledForecast {
    pub fn sample_times(&self) -> usize {
        self.samples.len_of(Axis(0))
    }

    pub fn batch_size(&self) -> usize {
        self.median.nrows()
    }

    pub fn horizon(&self) -> usize {
        self.median.ncols()
    }

    /// Median point forecast with an empirical central interval at `level`.
    pub fn to_forecast(&self, level: f64) -> Result<Forecast> {
        check_level(level)?;
        let alpha = (1.0 - level) / 2.0;
        let lower = reduce_samples(self.samples.view(), |s| quantile(s, alpha))?;
        let upper = reduce_samples(self.samples.view(), |s| quantile(s, 1.0 - alpha))?;
        Forecast::from_batch_with_intervals(self.median.view(), lower.view(), upper.view(), level)
    }
}

/// Output of a rollout, depending on whether sampling was requested.
#[derive(Debug, Clone)]
pub enum RolloutOutput {
    Deterministic(DeterministicForecast),
    Sampled(SampledForecast),
}

impl RolloutOutput {
    /// Point forecast: `mu` for deterministic rollouts, the median for sampled ones.
    pub fn point(&self) -> &Array2<f64> {
        match self {
            RolloutOutput::Deterministic(f) => &f.mu,
            RolloutOutput::Sampled(f) => &f.median,
        }
    }

    /// Spread: `sigma` for deterministic rollouts, the sample std for sampled ones.
    pub fn spread(&self) -> &Array2<f64> {
        match self {
            RolloutOutput::Deterministic(f) => &f.sigma,
            RolloutOutput::Sampled(f) => &f.std,
        }
    }

    pub fn samples(&self) -> Option<&Array3<f64>> {
        match self {
            RolloutOutput::Deterministic(_) => None,
            RolloutOutput::Sampled(f) => Some(&f.samples),
        }
    }

    pub fn to_forecast(&self, level: f64) -> Result<Forecast> {
        match self {
            RolloutOutput::Deterministic(f) => f.to_forecast(level),
            RolloutOutput::Sampled(f) => f.to_forecast(level),
        }
    }
}

fn check_level(level: f64) -> Result<()> {
    if level > 0.0 && level < 1.0 {
        Ok(())
    } else {
        Err(ForecastError::InvalidParameter(format!(
            "interval level must be in (0, 1), got {level}"
        )))
    }
}
