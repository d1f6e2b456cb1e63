//! DeepAR model configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Hyper-parameters of a [`DeepAr`](super::DeepAr) model.
///
/// Field names accept the aliases used by JSON experiment configs
/// (`num_class`, `lstm_dropout`, `lstm_hidden_dim`, `lstm_layers`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepArConfig {
    /// Number of distinct series identities (embedding table rows)
    #[serde(alias = "num_class")]
    pub num_classes: usize,
    /// Number of covariates per timestep
    pub cov_dim: usize,
    /// Dropout between stacked LSTM layers
    #[serde(alias = "lstm_dropout", default)]
    pub recurrent_dropout: f64,
    /// Width of the series-identity embedding
    pub embedding_dim: usize,
    /// LSTM hidden units per layer
    #[serde(alias = "lstm_hidden_dim")]
    pub hidden_dim: usize,
    /// Number of stacked LSTM layers
    #[serde(alias = "lstm_layers")]
    pub num_layers: usize,
    /// Trajectories drawn by a sampling rollout
    pub sample_times: usize,
    /// Forecast horizon
    pub predict_steps: usize,
    /// Index of the first forecast row in the input window
    pub predict_start: usize,
    /// Seed for weight initialization (entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl DeepArConfig {
    /// Create a configuration with a small default architecture.
    ///
    /// # Arguments
    ///
    /// * `num_classes` - Number of series identities
    /// * `cov_dim` - Number of covariates per timestep
    /// * `predict_start` - Length of the conditioning range
    /// * `predict_steps` - Forecast horizon
    pub fn new(num_classes: usize, cov_dim: usize, predict_start: usize, predict_steps: usize) -> Self {
        Self {
            num_classes,
            cov_dim,
            recurrent_dropout: 0.1,
            embedding_dim: 20,
            hidden_dim: 40,
            num_layers: 3,
            sample_times: 200,
            predict_steps,
            predict_start,
            seed: None,
        }
    }

    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    pub fn with_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.recurrent_dropout = dropout;
        self
    }

    pub fn with_sample_times(mut self, sample_times: usize) -> Self {
        self.sample_times = sample_times;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Width of one timestep input row: the target value plus covariates.
    pub fn input_dim(&self) -> usize {
        1 + self.cov_dim
    }

    /// Width of the LSTM input: input row plus embedding.
    pub fn lstm_input_dim(&self) -> usize {
        self.input_dim() + self.embedding_dim
    }

    /// Rows needed in an input window: conditioning range plus horizon.
    pub fn window_len(&self) -> usize {
        self.predict_start + self.predict_steps
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("num_classes", self.num_classes),
            ("hidden_dim", self.hidden_dim),
            ("num_layers", self.num_layers),
            ("sample_times", self.sample_times),
            ("predict_steps", self.predict_steps),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ForecastError::InvalidParameter(format!(
                "{name} must be positive"
            )));
        }
        if !(0.0..1.0).contains(&self.recurrent_dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "recurrent_dropout must be in [0, 1), got {}",
                self.recurrent_dropout
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ForecastError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
