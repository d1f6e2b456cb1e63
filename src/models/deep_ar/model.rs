//! DeepAR network: embedding, stacked LSTM and Gaussian output heads.

use ndarray::{concatenate, s, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::config::DeepArConfig;
use super::rollout::Rollout;
use crate::core::{DeterministicForecast, RecurrentState, RolloutOutput, SampledForecast, StepOutput};
use crate::error::{ensure_shape, ForecastError, Result};
use crate::models::StepModel;
use crate::nn::activation::softplus_array;
use crate::nn::{flatten_layers, Embedding, GateBiasInit, Linear, Lstm};

/// Per-step Gaussian parameters of a teacher-forced pass, plus the state it
/// ends in.
#[derive(Debug, Clone)]
pub struct Conditioning {
    /// Location per `[step, batch]` (normalized scale)
    pub mu: Array2<f64>,
    /// Standard deviation per `[step, batch]` (normalized scale)
    pub sigma: Array2<f64>,
    /// State after the last conditioning row
    pub state: RecurrentState,
}

/// Probabilistic autoregressive forecaster.
///
/// # Example
///
/// ```
/// use flood_forecast::models::deep_ar::{DeepAr, DeepArConfig};
/// use ndarray::{Array1, Array2, Array3};
///
/// let config = DeepArConfig::new(3, 2, 4, 2)
///     .with_hidden_dim(8)
///     .with_layers(2)
///     .with_embedding_dim(4)
///     .with_seed(42);
/// let model = DeepAr::new(config).unwrap();
///
/// let x = Array3::zeros((6, 2, 3));
/// let ids = Array1::from(vec![0, 2]);
/// let v = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 1.0, 0.0]).unwrap();
/// let forecast = model.forecast(x.view(), v.view(), ids.view()).unwrap();
/// assert_eq!(forecast.mu.shape(), &[2, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct DeepAr {
    config: DeepArConfig,
    embedding: Embedding,
    lstm: Lstm,
    distribution_mu: Linear,
    distribution_presigma: Linear,
}

impl DeepAr {
    /// Build a freshly initialized model, seeded from `config.seed` or entropy.
    pub fn new(config: DeepArConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, &mut rng)
    }

    /// Build a freshly initialized model drawing every parameter from `rng`.
    ///
    /// Forget-gate biases of every LSTM layer are set to 1.0.
    pub fn with_rng<R: Rng + ?Sized>(config: DeepArConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let embedding = Embedding::new(config.num_classes, config.embedding_dim, rng);
        let mut lstm = Lstm::new(
            config.lstm_input_dim(),
            config.hidden_dim,
            config.num_layers,
            config.recurrent_dropout,
            rng,
        );
        lstm.apply_bias_init(GateBiasInit::unit_forget_bias())?;
        let flat_dim = config.hidden_dim * config.num_layers;
        let distribution_mu = Linear::new(flat_dim, 1, rng);
        let distribution_presigma = Linear::new(flat_dim, 1, rng);

        info!(
            num_classes = config.num_classes,
            input_dim = config.lstm_input_dim(),
            hidden_dim = config.hidden_dim,
            num_layers = config.num_layers,
            "initialized DeepAR model"
        );

        Ok(Self {
            config,
            embedding,
            lstm,
            distribution_mu,
            distribution_presigma,
        })
    }

    /// Assemble a model from trained components.
    pub fn from_parts(
        config: DeepArConfig,
        embedding: Embedding,
        lstm: Lstm,
        distribution_mu: Linear,
        distribution_presigma: Linear,
    ) -> Result<Self> {
        config.validate()?;
        ensure_shape(
            "embedding table",
            &[config.num_classes, config.embedding_dim],
            embedding.table().shape(),
        )?;
        ensure_shape(
            "LSTM",
            &[config.lstm_input_dim(), config.hidden_dim, config.num_layers],
            &[lstm.input_size(), lstm.hidden_size(), lstm.num_layers()],
        )?;
        let flat_dim = config.hidden_dim * config.num_layers;
        ensure_shape("mu head", &[1, flat_dim], distribution_mu.weight().shape())?;
        ensure_shape(
            "presigma head",
            &[1, flat_dim],
            distribution_presigma.weight().shape(),
        )?;

        Ok(Self {
            config,
            embedding,
            lstm,
            distribution_mu,
            distribution_presigma,
        })
    }

    pub fn config(&self) -> &DeepArConfig {
        &self.config
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn lstm(&self) -> &Lstm {
        &self.lstm
    }

    pub fn distribution_mu(&self) -> &Linear {
        &self.distribution_mu
    }

    pub fn distribution_presigma(&self) -> &Linear {
        &self.distribution_presigma
    }

    /// Zeroed hidden state `[num_layers, batch, hidden_dim]`.
    pub fn init_hidden(&self, batch: usize) -> Array3<f64> {
        Array3::zeros((self.config.num_layers, batch, self.config.hidden_dim))
    }

    /// Zeroed cell state `[num_layers, batch, hidden_dim]`.
    pub fn init_cell(&self, batch: usize) -> Array3<f64> {
        Array3::zeros((self.config.num_layers, batch, self.config.hidden_dim))
    }

    /// Zeroed `(hidden, cell)` pair for a batch.
    pub fn init_state(&self, batch: usize) -> RecurrentState {
        RecurrentState::new(self.init_hidden(batch), self.init_cell(batch))
    }

    /// Predict the next-step Gaussian for one timestep.
    ///
    /// `x` is `[1, batch, 1 + cov_dim]` and `ids` is `[batch]`.
    pub fn step(
        &self,
        x: ArrayView3<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<StepOutput> {
        ensure_shape(
            "step input",
            &[1, ids.len(), self.config.input_dim()],
            x.shape(),
        )?;
        let embedded = self.embedding.lookup(ids)?;
        let lstm_input = concatenate(Axis(1), &[x.index_axis(Axis(0), 0), embedded.view()])?;
        let state = self.lstm.step(lstm_input.view(), state)?;

        let flat = flatten_layers(state.hidden.view());
        let mu = self
            .distribution_mu
            .forward(flat.view())?
            .index_axis_move(Axis(1), 0);
        let presigma = self
            .distribution_presigma
            .forward(flat.view())?
            .index_axis_move(Axis(1), 0);
        let sigma = softplus_array(&presigma);

        Ok(StepOutput { mu, sigma, state })
    }

    /// Teacher-forced pass over rows `0..predict_start` of `x`.
    pub fn condition(
        &self,
        x: ArrayView3<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<Conditioning> {
        let steps = self.config.predict_start;
        let (total_len, batch, _) = x.dim();
        if total_len < steps {
            return Err(ForecastError::InsufficientData {
                needed: steps,
                got: total_len,
            });
        }

        let mut mu = Array2::zeros((steps, batch));
        let mut sigma = Array2::zeros((steps, batch));
        let mut state = state.clone();
        for t in 0..steps {
            let out = self.step(x.slice(s![t..t + 1, .., ..]), ids, &state)?;
            mu.row_mut(t).assign(&out.mu);
            sigma.row_mut(t).assign(&out.sigma);
            state = out.state;
        }
        Ok(Conditioning { mu, sigma, state })
    }

    /// Roll the model forward over the configured horizon.
    ///
    /// `hidden` and `cell` are the decoder state to start from, normally the
    /// output of [`condition`](Self::condition). With `sampling` set,
    /// `config.sample_times` trajectories are drawn from `rng`; otherwise the
    /// rollout is deterministic and `rng` is unused.
    pub fn rollout<R: Rng + ?Sized>(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
        hidden: Array3<f64>,
        cell: Array3<f64>,
        sampling: bool,
        rng: &mut R,
    ) -> Result<RolloutOutput> {
        let state = RecurrentState::new(hidden, cell);
        if sampling {
            self.sample(x, v, ids, &state, rng).map(RolloutOutput::Sampled)
        } else {
            self.predict(x, v, ids, &state)
                .map(RolloutOutput::Deterministic)
        }
    }

    /// Deterministic rollout from `state`.
    pub fn predict(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<DeterministicForecast> {
        self.rollout_engine()?.deterministic(x, v, ids, state)
    }

    /// Sampling rollout from `state` with `config.sample_times` trajectories.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
        rng: &mut R,
    ) -> Result<SampledForecast> {
        self.rollout_engine()?
            .sample(x, v, ids, state, self.config.sample_times, rng)
    }

    /// Condition from a zero state, then roll out deterministically.
    pub fn forecast(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
    ) -> Result<DeterministicForecast> {
        let conditioned = self.condition(x, ids, &self.init_state(ids.len()))?;
        self.predict(x, v, ids, &conditioned.state)
    }

    /// Condition from a zero state, then draw `config.sample_times` trajectories.
    pub fn forecast_samples<R: Rng + ?Sized>(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
        rng: &mut R,
    ) -> Result<SampledForecast> {
        let conditioned = self.condition(x, ids, &self.init_state(ids.len()))?;
        self.sample(x, v, ids, &conditioned.state, rng)
    }

    fn rollout_engine(&self) -> Result<Rollout<'_, Self>> {
        Rollout::new(self, self.config.predict_start, self.config.predict_steps)
    }
}

impl StepModel for DeepAr {
    fn input_dim(&self) -> usize {
        self.config.input_dim()
    }

    fn num_layers(&self) -> usize {
        self.config.num_layers
    }

    fn hidden_dim(&self) -> usize {
        self.config.hidden_dim
    }

    fn step(
        &self,
        x: ArrayView3<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<StepOutput> {
        DeepAr::step(self, x, ids, state)
    }

    fn name(&self) -> &str {
        "DeepAR"
    }
}
