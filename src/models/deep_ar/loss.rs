//! Gaussian likelihood loss.

use ndarray::{ArrayView, Dimension};
use statrs::distribution::{Continuous, Normal};

use crate::error::{ensure_shape, ForecastError, Result};

/// Mean negative log-likelihood of `labels` under `Normal(mu, sigma)`.
///
/// Positions whose label is exactly `0.0` are treated as missing and skipped.
/// `mu`, `sigma` and `labels` must share a shape, typically `[steps, batch]` as
/// returned by a conditioning pass.
pub fn gaussian_nll<D: Dimension>(
    mu: ArrayView<f64, D>,
    sigma: ArrayView<f64, D>,
    labels: ArrayView<f64, D>,
) -> Result<f64> {
    ensure_shape("sigma", mu.shape(), sigma.shape())?;
    ensure_shape("labels", mu.shape(), labels.shape())?;

    let mut total = 0.0;
    let mut observed = 0usize;
    for ((&m, &s), &y) in mu.iter().zip(sigma.iter()).zip(labels.iter()) {
        if y == 0.0 {
            continue;
        }
        let dist = Normal::new(m, s).map_err(|e| {
            ForecastError::ComputationError(format!("invalid Normal({m}, {s}): {e}"))
        })?;
        total -= dist.ln_pdf(y);
        observed += 1;
    }

    if observed == 0 {
        return Err(ForecastError::EmptyData);
    }
    Ok(total / observed as f64)
}
