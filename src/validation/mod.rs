//! Evaluation of rollouts against held-out targets.
//!
//! Reports point accuracy on both the normalized and the original scale,
//! ρ-risk at the median and the 0.9 quantile, and interval coverage.
//!
//! # Example
//!
//! ```
//! use flood_forecast::core::{DeterministicForecast, RolloutOutput};
//! use flood_forecast::validation::evaluate;
//! use ndarray::{array, Array3};
//!
//! let output = RolloutOutput::Deterministic(DeterministicForecast {
//!     mu: array![[7.0, 9.5]],
//!     sigma: array![[1.0, 1.0]],
//!     inputs: Array3::zeros((1, 1, 1)),
//! });
//! // normalized targets with scale 2 and shift 5
//! let eval = evaluate(&output, array![[1.0, 2.0]].view(), array![[2.0, 5.0]].view(), Some(0.9)).unwrap();
//! assert!(eval.unscaled.mae > 0.0);
//! assert_eq!(eval.coverage, Some(1.0));
//! ```

mod evaluate;

pub use evaluate::{evaluate, quantile_forecast, RolloutEvaluation, RHO_LEVELS};
