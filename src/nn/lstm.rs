//! Multi-layer LSTM operating one timestep at a time on a batch.
//!
//! Parameters follow the packed layout used by cuDNN-style implementations:
//! every layer holds `weight_ih [4H, in]`, `weight_hh [4H, H]` and the two bias
//! vectors `bias_ih`, `bias_hh` of length `4H`, with gate rows ordered
//! `[input | forget | cell | output]`.

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::activation::{sigmoid_array, tanh_array};
use super::init::{GateBiasInit, GateLayout};
use crate::core::RecurrentState;
use crate::error::{ensure_shape, ForecastError, Result};

/// Parameters of a single LSTM layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmLayer {
    weight_ih: Array2<f64>,
    weight_hh: Array2<f64>,
    bias_ih: Array1<f64>,
    bias_hh: Array1<f64>,
}

impl LstmLayer {
    /// Create a layer with every parameter drawn from `U(-1/√H, 1/√H)`.
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden_size.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let gates = 4 * hidden_size;
        Self {
            weight_ih: Array2::random_using((gates, input_size), dist, rng),
            weight_hh: Array2::random_using((gates, hidden_size), dist, rng),
            bias_ih: Array1::random_using(gates, dist, rng),
            bias_hh: Array1::random_using(gates, dist, rng),
        }
    }

    /// Build a layer from trained parameters.
    pub fn from_weights(
        weight_ih: Array2<f64>,
        weight_hh: Array2<f64>,
        bias_ih: Array1<f64>,
        bias_hh: Array1<f64>,
    ) -> Result<Self> {
        let gates = weight_ih.nrows();
        if gates == 0 || gates % 4 != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "LSTM weight_ih has {gates} rows, expected a positive multiple of 4"
            )));
        }
        let hidden = gates / 4;
        ensure_shape("LSTM weight_hh", &[gates, hidden], weight_hh.shape())?;
        ensure_shape("LSTM bias_ih", &[gates], bias_ih.shape())?;
        ensure_shape("LSTM bias_hh", &[gates], bias_hh.shape())?;
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

    pub fn weight_ih(&self) -> &Array2<f64> {
        &self.weight_ih
    }

    pub fn weight_hh(&self) -> &Array2<f64> {
        &self.weight_hh
    }

    pub fn bias_ih(&self) -> &Array1<f64> {
        &self.bias_ih
    }

    pub fn bias_hh(&self) -> &Array1<f64> {
        &self.bias_hh
    }

    /// One timestep for a batch.
    ///
    /// `x` is `[batch, input_size]`, `h` and `c` are `[batch, hidden_size]`.
    /// Returns the new `(h, c)`.
    pub fn step(
        &self,
        x: ArrayView2<f64>,
        h: ArrayView2<f64>,
        c: ArrayView2<f64>,
    ) -> (Array2<f64>, Array2<f64>) {
        let hs = self.hidden_size();
        let gates =
            x.dot(&self.weight_ih.t()) + &self.bias_ih + h.dot(&self.weight_hh.t()) + &self.bias_hh;

        let i_gate = sigmoid_array(&gates.slice(s![.., 0..hs]).to_owned());
        let f_gate = sigmoid_array(&gates.slice(s![.., hs..2 * hs]).to_owned());
        let g = tanh_array(&gates.slice(s![.., 2 * hs..3 * hs]).to_owned());
        let o_gate = sigmoid_array(&gates.slice(s![.., 3 * hs..4 * hs]).to_owned());

        let c_next = &f_gate * &c + &i_gate * &g;
        let h_next = &o_gate * &tanh_array(&c_next);
        (h_next, c_next)
    }

    fn apply_bias_init(&mut self, init: GateBiasInit) -> Result<()> {
        init.apply(GateLayout::Lstm, &mut self.bias_ih)?;
        init.apply(GateLayout::Lstm, &mut self.bias_hh)
    }
}

/// Stack of LSTM layers; layer `k > 0` consumes the hidden output of layer `k - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lstm {
    layers: Vec<LstmLayer>,
    /// Inter-layer dropout probability. Only meaningful to a training harness;
    /// forward passes here run in inference mode.
    dropout: f64,
}

impl Lstm {
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
                LstmLayer::new(layer_input, hidden_size, rng)
            })
            .collect();
        Self { layers, dropout }
    }

    /// Assemble a stack from trained layers, checking that consecutive layers chain.
    pub fn from_layers(layers: Vec<LstmLayer>, dropout: f64) -> Result<Self> {
        let first = layers.first().ok_or(ForecastError::EmptyData)?;
        let hidden = first.hidden_size();
        for layer in &layers[1..] {
            ensure_shape(
                "stacked LSTM layer",
                &[hidden, hidden],
                &[layer.input_size(), layer.hidden_size()],
            )?;
        }
        Ok(Self { layers, dropout })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(LstmLayer::input_size).unwrap_or(0)
    }

    pub fn hidden_size(&self) -> usize {
        self.layers.first().map(LstmLayer::hidden_size).unwrap_or(0)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn dropout(&self) -> f64 {
        self.dropout
    }

    pub fn layers(&self) -> &[LstmLayer] {
        &self.layers
    }

    /// Apply a gate-keyed initializer to both bias vectors of every layer.
    pub fn apply_bias_init(&mut self, init: GateBiasInit) -> Result<()> {
        for layer in &mut self.layers {
            layer.apply_bias_init(init)?;
        }
        Ok(())
    }

    /// Advance every layer by one timestep.
    ///
    /// `x` is `[batch, input_size]`; `state` must be `[num_layers, batch, hidden_size]`.
    pub fn step(&self, x: ArrayView2<f64>, state: &RecurrentState) -> Result<RecurrentState> {
        let batch = x.nrows();
        ensure_shape("LSTM input", &[batch, self.input_size()], x.shape())?;
        let expected = [self.num_layers(), batch, self.hidden_size()];
        ensure_shape("LSTM hidden state", &expected, state.hidden.shape())?;
        ensure_shape("LSTM cell state", &expected, state.cell.shape())?;

        let mut hidden = Array3::zeros(expected);
        let mut cell = Array3::zeros(expected);
        let mut layer_input = x.to_owned();

        for (k, layer) in self.layers.iter().enumerate() {
            let (h_next, c_next) = layer.step(
                layer_input.view(),
                state.hidden.index_axis(Axis(0), k),
                state.cell.index_axis(Axis(0), k),
            );
            hidden.index_axis_mut(Axis(0), k).assign(&h_next);
            cell.index_axis_mut(Axis(0), k).assign(&c_next);
            layer_input = h_next;
        }

        Ok(RecurrentState { hidden, cell })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::init::Gate;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn step_produces_state_of_expected_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let lstm = Lstm::new(5, 8, 3, 0.0, &mut rng);
        let state = RecurrentState::zeros(3, 2, 8);
        let next = lstm.step(Array2::zeros((2, 5)).view(), &state).unwrap();
        assert_eq!(next.hidden.shape(), &[3, 2, 8]);
        assert_eq!(next.cell.shape(), &[3, 2, 8]);
    }

    #[test]
    fn single_unit_step_matches_hand_computation() {
        // H = 1, input = 1; gate rows [i, f, g, o]
        let layer = LstmLayer::from_weights(
            array![[0.5], [-0.5], [1.0], [2.0]],
            array![[0.1], [0.2], [0.3], [0.4]],
            array![0.0, 1.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0, 0.1],
        )
        .unwrap();
        let (h, c) = layer.step(
            array![[2.0]].view(),
            array![[1.0]].view(),
            array![[0.5]].view(),
        );

        let sig = |v: f64| 1.0 / (1.0 + (-v).exp());
        let i = sig(0.5 * 2.0 + 0.1);
        let f = sig(-0.5 * 2.0 + 1.0 + 0.2);
        let g = (1.0 * 2.0 + 0.3_f64).tanh();
        let o = sig(2.0 * 2.0 + 0.4 + 0.1);
        let c_expected = f * 0.5 + i * g;
        let h_expected = o * c_expected.tanh();

        assert_relative_eq!(c[[0, 0]], c_expected, epsilon = 1e-12);
        assert_relative_eq!(h[[0, 0]], h_expected, epsilon = 1e-12);
    }

    #[test]
    fn step_rejects_mismatched_state() {
        let mut rng = StdRng::seed_from_u64(11);
        let lstm = Lstm::new(2, 4, 2, 0.0, &mut rng);
        let state = RecurrentState::zeros(1, 3, 4);
        let err = lstm.step(Array2::zeros((3, 2)).view(), &state).unwrap_err();
        assert!(matches!(err, ForecastError::ShapeMismatch { name: "LSTM hidden state", .. }));
    }

    #[test]
    fn bias_init_hits_forget_quarter_of_both_biases_in_every_layer() {
        let mut rng = StdRng::seed_from_u64(5);
        let baseline = Lstm::new(3, 4, 2, 0.0, &mut rng);
        let mut lstm = baseline.clone();
        lstm.apply_bias_init(GateBiasInit::new(Gate::Forget, 1.0)).unwrap();

        for (layer, base) in lstm.layers().iter().zip(baseline.layers()) {
            for (bias, base_bias) in [
                (layer.bias_ih(), base.bias_ih()),
                (layer.bias_hh(), base.bias_hh()),
            ] {
                let n = bias.len();
                for idx in 0..n {
                    if (n / 4..n / 2).contains(&idx) {
                        assert_eq!(bias[idx], 1.0);
                    } else {
                        assert_eq!(bias[idx], base_bias[idx]);
                    }
                }
            }
            assert_eq!(layer.weight_ih(), base.weight_ih());
            assert_eq!(layer.weight_hh(), base.weight_hh());
        }
    }

    #[test]
    fn from_layers_checks_chaining() {
        let mut rng = StdRng::seed_from_u64(5);
        let first = LstmLayer::new(3, 4, &mut rng);
        let bad = LstmLayer::new(3, 4, &mut rng);
        assert!(Lstm::from_layers(vec![first.clone(), bad], 0.0).is_err());
        let good = LstmLayer::new(4, 4, &mut rng);
        assert_eq!(Lstm::from_layers(vec![first, good], 0.0).unwrap().num_layers(), 2);
        assert!(Lstm::from_layers(Vec::new(), 0.0).is_err());
    }
}
