//! Core data structures shared by the forecasting models.

mod forecast;
mod prediction;
mod state;

pub use forecast::Forecast;
pub use prediction::{DeterministicForecast, RolloutOutput, SampledForecast};
pub use state::{RecurrentState, StepOutput};
