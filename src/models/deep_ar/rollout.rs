//! Multi-step autoregressive rollout.
//!
//! Starting from a conditioned decoder state, the model is advanced over rows
//! `predict_start .. predict_start + predict_steps` of the input window. After
//! every step but the last, the value just predicted (the raw `mu`, or a raw
//! Gaussian draw when sampling) is written into the target slot (feature 0) of
//! the next row, so the next step consumes the model's own prediction.
//!
//! Every trajectory works on its own copy of the input window and its own clone
//! of the initial state; the caller's buffer is never written and feedback from
//! one sample cannot reach another.

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, trace};

use crate::core::{DeterministicForecast, RecurrentState, SampledForecast, StepOutput};
use crate::error::{ensure_shape, ForecastError, Result};
use crate::models::StepModel;
use crate::transform::{denormalize, denormalize_spread, scale_columns};
use crate::utils::stats::{ensemble_spread, lower_median, reduce_samples};

/// Rollout engine over any [`StepModel`].
pub struct Rollout<'m, M: StepModel + ?Sized> {
    model: &'m M,
    predict_start: usize,
    predict_steps: usize,
}

impl<'m, M: StepModel + ?Sized> Rollout<'m, M> {
    pub fn new(model: &'m M, predict_start: usize, predict_steps: usize) -> Result<Self> {
        if predict_steps == 0 {
            return Err(ForecastError::InvalidParameter(
                "predict_steps must be positive".to_string(),
            ));
        }
        Ok(Self {
            model,
            predict_start,
            predict_steps,
        })
    }

    pub fn predict_start(&self) -> usize {
        self.predict_start
    }

    pub fn predict_steps(&self) -> usize {
        self.predict_steps
    }

    /// Roll out using `mu` as each step's prediction.
    ///
    /// Returns de-normalized `mu`/`sigma` of shape `[batch, predict_steps]`
    /// together with the trajectory's input buffer after feedback.
    pub fn deterministic(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<DeterministicForecast> {
        let batch = self.validate(x, ids, state)?;
        let (scale, shift) = scale_columns(v, batch)?;
        debug!(
            model = self.model.name(),
            batch,
            predict_start = self.predict_start,
            predict_steps = self.predict_steps,
            "deterministic rollout"
        );

        let mut mu = Array2::zeros((batch, self.predict_steps));
        let mut sigma = Array2::zeros((batch, self.predict_steps));
        let mut inputs = x.to_owned();

        self.trajectory(&mut inputs, ids, state.clone(), |t, out| {
            mu.column_mut(t)
                .assign(&denormalize(out.mu.view(), scale, shift));
            sigma
                .column_mut(t)
                .assign(&denormalize_spread(out.sigma.view(), scale));
            Ok(out.mu.clone())
        })?;

        Ok(DeterministicForecast { mu, sigma, inputs })
    }

    /// Roll out `sample_times` independent trajectories, drawing each step from
    /// `Normal(mu, sigma)`.
    ///
    /// Trajectory `j` is written to `samples[j]`; the summary is the per-cell
    /// lower median and sample standard deviation across trajectories.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        x: ArrayView3<f64>,
        v: ArrayView2<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
        sample_times: usize,
        rng: &mut R,
    ) -> Result<SampledForecast> {
        if sample_times == 0 {
            return Err(ForecastError::InvalidParameter(
                "sample_times must be positive".to_string(),
            ));
        }
        let batch = self.validate(x, ids, state)?;
        let (scale, shift) = scale_columns(v, batch)?;
        debug!(
            model = self.model.name(),
            batch,
            sample_times,
            predict_start = self.predict_start,
            predict_steps = self.predict_steps,
            "sampling rollout"
        );

        let mut samples = Array3::zeros((sample_times, batch, self.predict_steps));

        for (j, mut trajectory) in samples.axis_iter_mut(Axis(0)).enumerate() {
            let mut inputs = x.to_owned();
            self.trajectory(&mut inputs, ids, state.clone(), |t, out| {
                let draw = draw_gaussian(&out.mu, &out.sigma, &mut *rng)?;
                trajectory
                    .column_mut(t)
                    .assign(&denormalize(draw.view(), scale, shift));
                Ok(draw)
            })?;
            trace!(sample = j, "trajectory complete");
        }

        let median = reduce_samples(samples.view(), lower_median)?;
        let std = reduce_samples(samples.view(), ensemble_spread)?;
        Ok(SampledForecast {
            samples,
            median,
            std,
        })
    }

    /// Check argument shapes; returns the batch size.
    fn validate(
        &self,
        x: ArrayView3<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<usize> {
        let (total_len, batch, features) = x.dim();
        ensure_shape(
            "rollout input",
            &[total_len, ids.len(), self.model.input_dim()],
            &[total_len, batch, features],
        )?;
        let needed = self.predict_start + self.predict_steps;
        if total_len < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: total_len,
            });
        }
        let expected = [self.model.num_layers(), batch, self.model.hidden_dim()];
        ensure_shape("decoder hidden state", &expected, state.hidden.shape())?;
        ensure_shape("decoder cell state", &expected, state.cell.shape())?;
        Ok(batch)
    }

    /// Run one trajectory over `buffer`, which the trajectory owns.
    ///
    /// `emit` records step `t` and returns the raw value to feed back into the
    /// target slot of the next row.
    fn trajectory<F>(
        &self,
        buffer: &mut Array3<f64>,
        ids: ArrayView1<usize>,
        mut state: RecurrentState,
        mut emit: F,
    ) -> Result<()>
    where
        F: FnMut(usize, &StepOutput) -> Result<Array1<f64>>,
    {
        for t in 0..self.predict_steps {
            let row = self.predict_start + t;
            let out = self
                .model
                .step(buffer.slice(s![row..row + 1, .., ..]), ids, &state)?;
            let feedback = emit(t, &out)?;
            if t < self.predict_steps - 1 {
                buffer.slice_mut(s![row + 1, .., 0]).assign(&feedback);
            }
            trace!(step = t, row, "rollout step");
            state = out.state;
        }
        Ok(())
    }
}

/// One draw per batch element from `Normal(mu[b], sigma[b])`.
fn draw_gaussian<R: Rng + ?Sized>(
    mu: &Array1<f64>,
    sigma: &Array1<f64>,
    rng: &mut R,
) -> Result<Array1<f64>> {
    let mut draw = Array1::zeros(mu.len());
    for ((d, &m), &s) in draw.iter_mut().zip(mu.iter()).zip(sigma.iter()) {
        let dist = Normal::new(m, s).map_err(|e| {
            ForecastError::ComputationError(format!("cannot sample Normal({m}, {s}): {e}"))
        })?;
        *d = dist.sample(rng);
    }
    Ok(draw)
}
