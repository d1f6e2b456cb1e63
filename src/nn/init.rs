//! Gate-keyed initialization of recurrent bias vectors.
//!
//! Recurrent layers pack the parameters of every gate into a single bias vector
//! of length `gates * hidden`. Rather than slicing by position, initializers here
//! name the gate they target and resolve the sub-range through a [`GateLayout`].

use std::ops::Range;

use ndarray::{s, Array1};

use crate::error::{ForecastError, Result};

/// Individual gates of the supported recurrent cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// LSTM input gate `i`.
    Input,
    /// LSTM forget gate `f`.
    Forget,
    /// LSTM cell candidate `g`.
    Cell,
    /// LSTM output gate `o`.
    Output,
    /// GRU reset gate `r`.
    Reset,
    /// GRU update gate `z`.
    Update,
    /// GRU candidate `n`.
    New,
}

/// Order in which a recurrent cell packs its gates into weight rows and biases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateLayout {
    /// `[input | forget | cell | output]`
    Lstm,
    /// `[reset | update | new]`
    Gru,
}

impl GateLayout {
    /// Gates in packing order.
    pub fn gates(self) -> &'static [Gate] {
        match self {
            GateLayout::Lstm => &[Gate::Input, Gate::Forget, Gate::Cell, Gate::Output],
            GateLayout::Gru => &[Gate::Reset, Gate::Update, Gate::New],
        }
    }

    pub fn num_gates(self) -> usize {
        self.gates().len()
    }

    /// Index range occupied by `gate` in a packed vector of length `len`.
    pub fn range(self, gate: Gate, len: usize) -> Result<Range<usize>> {
        let n = self.num_gates();
        if len == 0 || len % n != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "bias of length {len} cannot be split into {n} gates"
            )));
        }
        let position = self
            .gates()
            .iter()
            .position(|&g| g == gate)
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!("{gate:?} gate is not part of {self:?}"))
            })?;
        let width = len / n;
        Ok(position * width..(position + 1) * width)
    }
}

/// Fill the sub-range of a bias vector belonging to one gate with a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateBiasInit {
    pub gate: Gate,
    pub value: f64,
}

impl GateBiasInit {
    pub fn new(gate: Gate, value: f64) -> Self {
        Self { gate, value }
    }

    /// Forget-gate bias of 1.0 (Jozefowicz et al., 2015).
    pub fn unit_forget_bias() -> Self {
        Self::new(Gate::Forget, 1.0)
    }

    pub fn apply(&self, layout: GateLayout, bias: &mut Array1<f64>) -> Result<()> {
        let range = layout.range(self.gate, bias.len())?;
        bias.slice_mut(s![range]).fill(self.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lstm_forget_range_is_second_quarter() {
        let range = GateLayout::Lstm.range(Gate::Forget, 32).unwrap();
        assert_eq!(range, 8..16);
        // Identical to the positional [n/4, n/2) slice
        assert_eq!(range, 32 / 4..32 / 2);
    }

    #[test]
    fn gru_ranges_are_thirds() {
        assert_eq!(GateLayout::Gru.range(Gate::Reset, 12).unwrap(), 0..4);
        assert_eq!(GateLayout::Gru.range(Gate::Update, 12).unwrap(), 4..8);
        assert_eq!(GateLayout::Gru.range(Gate::New, 12).unwrap(), 8..12);
    }

    #[test]
    fn foreign_gate_is_rejected() {
        assert!(GateLayout::Gru.range(Gate::Forget, 12).is_err());
        assert!(GateLayout::Lstm.range(Gate::Update, 12).is_err());
    }

    #[test]
    fn indivisible_length_is_rejected() {
        assert!(GateLayout::Lstm.range(Gate::Input, 10).is_err());
        assert!(GateLayout::Lstm.range(Gate::Input, 0).is_err());
    }

    #[test]
    fn apply_touches_only_the_named_gate() {
        let mut bias = Array1::from_elem(8, -0.5);
        GateBiasInit::unit_forget_bias()
            .apply(GateLayout::Lstm, &mut bias)
            .unwrap();
        assert_eq!(bias.to_vec(), vec![-0.5, -0.5, 1.0, 1.0, -0.5, -0.5, -0.5, -0.5]);
    }
}
