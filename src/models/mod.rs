//! Forecasting models.

mod traits;

pub mod deep_ar;
pub mod gru_vanilla;

pub use deep_ar::{DeepAr, DeepArConfig};
pub use gru_vanilla::{VanillaGru, VanillaGruConfig};
pub use traits::StepModel;
