//! Point-forecast GRU.
//!
//! A stacked GRU reads a batch-first window and a linear layer projects the
//! last timestep's top-layer output to `output_dim` values per series.

use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ensure_shape, ForecastError, Result};
use crate::nn::{Gru, Linear};

/// Hyper-parameters of a [`VanillaGru`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VanillaGruConfig {
    /// Features per timestep
    pub n_time_series: usize,
    pub hidden_dim: usize,
    /// Number of stacked GRU layers
    #[serde(alias = "layer_dim")]
    pub num_layers: usize,
    pub output_dim: usize,
    #[serde(alias = "dropout_prob", default)]
    pub dropout: f64,
    /// Carry the final hidden state into the next forward call
    #[serde(default)]
    pub use_hidden: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl VanillaGruConfig {
    pub fn new(n_time_series: usize, hidden_dim: usize, num_layers: usize, output_dim: usize) -> Self {
        Self {
            n_time_series,
            hidden_dim,
            num_layers,
            output_dim,
            dropout: 0.0,
            use_hidden: false,
            seed: None,
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_hidden_carry(mut self, use_hidden: bool) -> Self {
        self.use_hidden = use_hidden;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_time_series == 0 || self.hidden_dim == 0 || self.num_layers == 0 || self.output_dim == 0 {
            return Err(ForecastError::InvalidParameter(
                "GRU dimensions must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Stacked GRU with a linear read-out of the last timestep.
#[derive(Debug, Clone)]
pub struct VanillaGru {
    config: VanillaGruConfig,
    gru: Gru,
    fc: Linear,
    /// Final hidden state of the previous forward call `[num_layers, batch, hidden_dim]`
    hidden: Option<Array3<f64>>,
}

impl VanillaGru {
    /// Build a freshly initialized model, seeded from `config.seed` or entropy.
    pub fn new(config: VanillaGruConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, &mut rng)
    }

    pub fn with_rng<R: Rng + ?Sized>(config: VanillaGruConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let gru = Gru::new(
            config.n_time_series,
            config.hidden_dim,
            config.num_layers,
            config.dropout,
            rng,
        );
        let fc = Linear::new(config.hidden_dim, config.output_dim, rng);
        info!(
            n_time_series = config.n_time_series,
            hidden_dim = config.hidden_dim,
            num_layers = config.num_layers,
            "initialized vanilla GRU"
        );
        Ok(Self {
            config,
            gru,
            fc,
            hidden: None,
        })
    }

    /// Assemble a model from trained components.
    pub fn from_parts(config: VanillaGruConfig, gru: Gru, fc: Linear) -> Result<Self> {
        config.validate()?;
        ensure_shape(
            "GRU",
            &[config.n_time_series, config.hidden_dim, config.num_layers],
            &[gru.input_size(), gru.hidden_size(), gru.num_layers()],
        )?;
        ensure_shape(
            "GRU read-out",
            &[config.output_dim, config.hidden_dim],
            fc.weight().shape(),
        )?;
        Ok(Self {
            config,
            gru,
            fc,
            hidden: None,
        })
    }

    pub fn config(&self) -> &VanillaGruConfig {
        &self.config
    }

    pub fn gru(&self) -> &Gru {
        &self.gru
    }

    pub fn fc(&self) -> &Linear {
        &self.fc
    }

    /// Hidden state kept from the last forward call.
    pub fn hidden(&self) -> Option<&Array3<f64>> {
        self.hidden.as_ref()
    }

    pub fn reset_hidden(&mut self) {
        self.hidden = None;
    }

    /// Forecast `[batch, output_dim]` from a window `[batch, seq_len, n_time_series]`.
    ///
    /// Starts from zero state unless hidden-state carry is enabled and the
    /// previous call saw the same batch size.
    pub fn forward(&mut self, x: ArrayView3<f64>) -> Result<Array2<f64>> {
        let batch = x.len_of(Axis(0));
        let carried = self
            .hidden
            .as_ref()
            .filter(|h| self.config.use_hidden && h.shape()[1] == batch);
        let out = match carried {
            Some(h) => {
                debug!(batch, "reusing carried GRU hidden state");
                self.gru.forward(x, h.view())?
            }
            None => {
                let h0 = Array3::zeros((self.config.num_layers, batch, self.config.hidden_dim));
                self.gru.forward(x, h0.view())?
            }
        };

        let last = out.output.slice(s![.., -1, ..]);
        let projected = self.fc.forward(last)?;
        self.hidden = Some(out.hidden);
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model(use_hidden: bool) -> VanillaGru {
        let config = VanillaGruConfig::new(3, 5, 2, 1)
            .with_hidden_carry(use_hidden)
            .with_seed(21);
        VanillaGru::new(config).unwrap()
    }

    fn window(batch: usize, seq: usize) -> Array3<f64> {
        Array3::from_shape_fn((batch, seq, 3), |(b, t, f)| ((b + 2 * t + f) as f64).sin())
    }

    #[test]
    fn forward_shape() {
        let mut gru = model(false);
        let y = gru.forward(window(4, 6).view()).unwrap();
        assert_eq!(y.shape(), &[4, 1]);
        assert_eq!(gru.hidden().map(|h| h.shape().to_vec()), Some(vec![2, 4, 5]));
    }

    #[test]
    fn forward_is_stateless_without_carry() {
        let mut gru = model(false);
        let x = window(2, 4);
        let first = gru.forward(x.view()).unwrap();
        let second = gru.forward(x.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn carried_state_changes_the_next_forecast() {
        let mut gru = model(true);
        let x = window(2, 4);
        let first = gru.forward(x.view()).unwrap();
        let second = gru.forward(x.view()).unwrap();
        assert_ne!(first, second);

        // a new batch size starts from zero again
        let mut fresh = model(true);
        let expected = fresh.forward(window(3, 4).view()).unwrap();
        let got = gru.forward(window(3, 4).view()).unwrap();
        for (a, b) in got.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }

        gru.reset_hidden();
        assert!(gru.hidden().is_none());
    }

    #[test]
    fn read_out_uses_last_timestep() {
        let mut gru = model(false);
        let x = window(1, 5);
        let y = gru.forward(x.view()).unwrap();
        let h0 = Array3::zeros((2, 1, 5));
        let out = gru.gru().forward(x.view(), h0.view()).unwrap();
        let top_last = out.hidden.slice(s![1, .., ..]).to_owned();
        let manual = gru.fc().forward(top_last.view()).unwrap();
        assert_relative_eq!(y[[0, 0]], manual[[0, 0]], epsilon = 1e-12);
    }

    #[test]
    fn config_accepts_experiment_names() {
        let json = r#"{
            "n_time_series": 3,
            "hidden_dim": 8,
            "layer_dim": 2,
            "output_dim": 1,
            "dropout_prob": 0.1,
            "use_hidden": true
        }"#;
        let config = VanillaGruConfig::from_json(json).unwrap();
        assert_eq!(config.num_layers, 2);
        assert!(config.use_hidden);
        assert!(VanillaGruConfig::from_json("{\"n_time_series\": 3}").is_err());
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let mut gru = model(false);
        assert!(gru.forward(Array3::zeros((2, 4, 2)).view()).is_err());
    }

    #[test]
    fn failed_forward_keeps_carried_state() {
        let mut gru = model(true);
        let x = window(2, 4);
        gru.forward(x.view()).unwrap();
        let carried = gru.hidden().cloned();
        assert!(carried.is_some());

        assert!(gru.forward(Array3::zeros((2, 4, 2)).view()).is_err());
        assert_eq!(gru.hidden().cloned(), carried);

        // the next valid call continues from the carried state
        let mut reference = model(true);
        reference.forward(x.view()).unwrap();
        let expected = reference.forward(x.view()).unwrap();
        let got = gru.forward(x.view()).unwrap();
        assert_eq!(got, expected);
    }
}
