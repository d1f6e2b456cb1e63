//! Data transformations between the original and the normalized scale.
//!
//! # Example
//!
//! ```
//! use flood_forecast::transform::{standardize, SeriesScale};
//!
//! let discharge = vec![120.0, 135.0, 180.0, 160.0, 150.0];
//! let scale = standardize(&discharge);
//!
//! let z = scale.normalize_all(&discharge);
//! assert!((scale.denormalize(z[2]) - 180.0).abs() < 1e-9);
//! ```

pub mod scale;

pub use scale::{
    denormalize, denormalize_spread, from_scale_array, mean_scale, scale_columns, standardize,
    to_scale_array, SeriesScale,
};
