//! Multi-layer GRU over batch-first sequences.
//!
//! Gate rows are packed `[reset | update | new]`:
//!
//! ```text
//! r  = σ(W_ir x + b_ir + W_hr h + b_hr)
//! z  = σ(W_iz x + b_iz + W_hz h + b_hz)
//! n  = tanh(W_in x + b_in + r ⊙ (W_hn h + b_hn))
//! h' = (1 - z) ⊙ n + z ⊙ h
//! ```

use ndarray::{s, Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::activation::{sigmoid_array, tanh_array};
use crate::error::{ensure_shape, ForecastError, Result};

/// Parameters of a single GRU layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GruLayer {
    weight_ih: Array2<f64>,
    weight_hh: Array2<f64>,
    bias_ih: Array1<f64>,
    bias_hh: Array1<f64>,
}

impl GruLayer {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden_size.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let gates = 3 * hidden_size;
        Self {
            weight_ih: Array2::random_using((gates, input_size), dist, rng),
            weight_hh: Array2::random_using((gates, hidden_size), dist, rng),
            bias_ih: Array1::random_using(gates, dist, rng),
            bias_hh: Array1::random_using(gates, dist, rng),
        }
    }

    pub fn from_weights(
        weight_ih: Array2<f64>,
        weight_hh: Array2<f64>,
        bias_ih: Array1<f64>,
        bias_hh: Array1<f64>,
    ) -> Result<Self> {
        let gates = weight_ih.nrows();
        if gates == 0 || gates % 3 != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "GRU weight_ih has {gates} rows, expected a positive multiple of 3"
            )));
        }
        let hidden = gates / 3;
        ensure_shape("GRU weight_hh", &[gates, hidden], weight_hh.shape())?;
        ensure_shape("GRU bias_ih", &[gates], bias_ih.shape())?;
        ensure_shape("GRU bias_hh", &[gates], bias_hh.shape())?;
        Ok(Self {
            weight_ih,
            weight_hh,
            bias_ih,
            bias_hh,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weight_ih.ncols()
    }

    pub fn hidden_size(&self) -> usize {
        self.weight_hh.ncols()
    }

    /// One timestep: `x [batch, input_size]`, `h [batch, hidden_size]` -> new `h`.
    pub fn step(&self, x: ArrayView2<f64>, h: ArrayView2<f64>) -> Array2<f64> {
        let hs = self.hidden_size();
        let gi = x.dot(&self.weight_ih.t()) + &self.bias_ih;
        let gh = h.dot(&self.weight_hh.t()) + &self.bias_hh;

        let r = sigmoid_array(&(&gi.slice(s![.., 0..hs]) + &gh.slice(s![.., 0..hs])));
        let z = sigmoid_array(&(&gi.slice(s![.., hs..2 * hs]) + &gh.slice(s![.., hs..2 * hs])));
        let n = tanh_array(&(&gi.slice(s![.., 2 * hs..]) + &(&r * &gh.slice(s![.., 2 * hs..]))));

        &n + &(&z * &(&h - &n))
    }
}

/// Stack of GRU layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Gru {
    layers: Vec<GruLayer>,
    dropout: f64,
}

/// Output of running a [`Gru`] over a whole sequence.
#[derive(Debug, Clone)]
pub struct GruOutput {
    /// Top-layer hidden output at every timestep `[batch, seq_len, hidden]`
    pub output: Array3<f64>,
    /// Final hidden state of every layer `[num_layers, batch, hidden]`
    pub hidden: Array3<f64>,
}

impl Gru {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        dropout: f64,
        rng: &mut R,
    ) -> Self {
        let layers = (0..num_layers)
            .map(|k| {
                let layer_input = if k == 0 { input_size } else { hidden_size };
                GruLayer::new(layer_input, hidden_size, rng)
            })
            .collect();
        Self { layers, dropout }
    }

    pub fn from_layers(layers: Vec<GruLayer>, dropout: f64) -> Result<Self> {
        let first = layers.first().ok_or(ForecastError::EmptyData)?;
        let hidden = first.hidden_size();
        for layer in &layers[1..] {
            ensure_shape(
                "stacked GRU layer",
                &[hidden, hidden],
                &[layer.input_size(), layer.hidden_size()],
            )?;
        }
        Ok(Self { layers, dropout })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(GruLayer::input_size).unwrap_or(0)
    }

    pub fn hidden_size(&self) -> usize {
        self.layers.first().map(GruLayer::hidden_size).unwrap_or(0)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn dropout(&self) -> f64 {
        self.dropout
    }

    /// Run a batch-first sequence `[batch, seq_len, input_size]` from initial state `h0`.
    pub fn forward(&self, x: ArrayView3<f64>, h0: ArrayView3<f64>) -> Result<GruOutput> {
        let (batch, seq_len, features) = x.dim();
        ensure_shape(
            "GRU input",
            &[batch, seq_len, self.input_size()],
            &[batch, seq_len, features],
        )?;
        if seq_len == 0 {
            return Err(ForecastError::EmptyData);
        }
        let state_shape = [self.num_layers(), batch, self.hidden_size()];
        ensure_shape("GRU hidden state", &state_shape, h0.shape())?;

        let mut hidden = h0.to_owned();
        let mut output = Array3::zeros((batch, seq_len, self.hidden_size()));

        for t in 0..seq_len {
            let mut layer_input = x.index_axis(Axis(1), t).to_owned();
            for (k, layer) in self.layers.iter().enumerate() {
                let h_next = layer.step(layer_input.view(), hidden.index_axis(Axis(0), k));
                hidden.index_axis_mut(Axis(0), k).assign(&h_next);
                layer_input = h_next;
            }
            output.index_axis_mut(Axis(1), t).assign(&layer_input);
        }

        Ok(GruOutput { output, hidden })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn single_unit_step_matches_hand_computation() {
        let layer = GruLayer::from_weights(
            array![[1.0], [0.5], [-1.0]],
            array![[0.2], [0.3], [0.4]],
            array![0.0, 0.1, 0.2],
            array![0.1, 0.0, 0.3],
        )
        .unwrap();
        let h = layer.step(array![[1.5]].view(), array![[0.25]].view());

        let sig = |v: f64| 1.0 / (1.0 + (-v).exp());
        let r = sig(1.5 + 0.0 + 0.2 * 0.25 + 0.1);
        let z = sig(0.5 * 1.5 + 0.1 + 0.3 * 0.25);
        let n = (-1.5 + 0.2 + r * (0.4 * 0.25 + 0.3)).tanh();
        assert_relative_eq!(h[[0, 0]], (1.0 - z) * n + z * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn forward_shapes() {
        let mut rng = StdRng::seed_from_u64(2);
        let gru = Gru::new(3, 6, 2, 0.1, &mut rng);
        let out = gru
            .forward(
                Array3::zeros((4, 7, 3)).view(),
                Array3::zeros((2, 4, 6)).view(),
            )
            .unwrap();
        assert_eq!(out.output.shape(), &[4, 7, 6]);
        assert_eq!(out.hidden.shape(), &[2, 4, 6]);
        // Last output row is the top layer's final hidden state
        assert_eq!(
            out.output.index_axis(Axis(1), 6),
            out.hidden.index_axis(Axis(0), 1)
        );
    }

    #[test]
    fn forward_rejects_wrong_feature_count() {
        let mut rng = StdRng::seed_from_u64(2);
        let gru = Gru::new(3, 6, 1, 0.0, &mut rng);
        let err = gru
            .forward(
                Array3::zeros((1, 2, 4)).view(),
                Array3::zeros((1, 1, 6)).view(),
            )
            .unwrap_err();
        assert!(matches!(err, ForecastError::ShapeMismatch { name: "GRU input", .. }));
    }
}
