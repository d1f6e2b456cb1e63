//! Step-model trait: the seam between recurrent models and the rollout engine.

use ndarray::{ArrayView1, ArrayView3};

use crate::core::{RecurrentState, StepOutput};
use crate::error::Result;

/// A probabilistic recurrent model that can be advanced one timestep at a time.
///
/// The rollout engine only needs this interface, so any model producing a
/// per-step Gaussian from `(input row, series ids, state)` can be rolled out.
/// Implementations must not mutate themselves during a step; parameters are
/// shared read-only across every step and sample of a rollout.
pub trait StepModel {
    /// Width of one timestep input: `1 + cov_dim`.
    fn input_dim(&self) -> usize;

    /// Number of stacked recurrent layers.
    fn num_layers(&self) -> usize;

    /// Hidden units per layer.
    fn hidden_dim(&self) -> usize;

    /// Advance one timestep.
    ///
    /// `x` is `[1, batch, input_dim]`, `ids` is `[batch]`, `state` is
    /// `[num_layers, batch, hidden_dim]`.
    fn step(
        &self,
        x: ArrayView3<f64>,
        ids: ArrayView1<usize>,
        state: &RecurrentState,
    ) -> Result<StepOutput>;

    /// Zero state for a batch.
    fn init_state(&self, batch: usize) -> RecurrentState {
        RecurrentState::zeros(self.num_layers(), batch, self.hidden_dim())
    }

    /// Get the model name.
    fn name(&self) -> &str;
}
