//! Recurrent decoder state.

use ndarray::{Array1, Array3};

/// LSTM `(hidden, cell)` pair, each `[num_layers, batch, hidden_dim]`.
///
/// A rollout owns its state: every step consumes the current state by reference
/// and hands back a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    pub hidden: Array3<f64>,
    pub cell: Array3<f64>,
}

impl RecurrentState {
    pub fn new(hidden: Array3<f64>, cell: Array3<f64>) -> Self {
        Self { hidden, cell }
    }

    /// All-zero state.
    pub fn zeros(num_layers: usize, batch: usize, hidden_dim: usize) -> Self {
        Self {
            hidden: Array3::zeros((num_layers, batch, hidden_dim)),
            cell: Array3::zeros((num_layers, batch, hidden_dim)),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.hidden.shape()[0]
    }

    pub fn batch_size(&self) -> usize {
        self.hidden.shape()[1]
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden.shape()[2]
    }

    pub fn into_parts(self) -> (Array3<f64>, Array3<f64>) {
        (self.hidden, self.cell)
    }
}

/// Result of one step of a probabilistic recurrent model.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Location of the next-step Gaussian `[batch]` (normalized scale)
    pub mu: Array1<f64>,
    /// Standard deviation of the next-step Gaussian `[batch]`, strictly positive
    pub sigma: Array1<f64>,
    /// State after the step
    pub state: RecurrentState,
}
