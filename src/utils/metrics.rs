//! Accuracy metrics for probabilistic forecasts.
//!
//! Deviation metrics are normalized by the total absolute target so that
//! series on very different scales (a creek and a river gauge) can be compared.

use crate::error::{ForecastError, Result};

/// Point accuracy of a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Normalized deviation `Σ|a - p| / Σ|a|` (None if actuals are all zero)
    pub nd: Option<f64>,
    /// RMSE divided by the mean absolute actual (None if actuals are all zero)
    pub nrmse: Option<f64>,
}

fn check_lengths(actual: &[f64], other: &[f64]) -> Result<()> {
    if actual.is_empty() || other.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != other.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: other.len(),
        });
    }
    Ok(())
}

/// Point accuracy of `predicted` against `actual`.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    check_lengths(actual, predicted)?;

    let n = actual.len() as f64;
    let (abs_err, sq_err, abs_actual) = actual.iter().zip(predicted).fold(
        (0.0, 0.0, 0.0),
        |(abs_err, sq_err, abs_actual), (a, p)| {
            let e = a - p;
            (abs_err + e.abs(), sq_err + e * e, abs_actual + a.abs())
        },
    );

    let mse = sq_err / n;
    let rmse = mse.sqrt();
    let (nd, nrmse) = if abs_actual == 0.0 {
        (None, None)
    } else {
        (Some(abs_err / abs_actual), Some(rmse / (abs_actual / n)))
    };

    Ok(AccuracyMetrics {
        mae: abs_err / n,
        mse,
        rmse,
        nd,
        nrmse,
    })
}

/// Normalized quantile loss (ρ-risk) of a quantile forecast at level `rho`.
///
/// `2 Σ (a - p)(ρ·1[a > p] - (1 - ρ)·1[a ≤ p]) / Σ|a|`
pub fn quantile_loss(actual: &[f64], predicted: &[f64], rho: f64) -> Result<f64> {
    check_lengths(actual, predicted)?;
    if !(0.0..=1.0).contains(&rho) {
        return Err(ForecastError::InvalidParameter(format!(
            "quantile level must be in [0, 1], got {rho}"
        )));
    }
    let denom: f64 = actual.iter().map(|a| a.abs()).sum();
    if denom == 0.0 {
        return Err(ForecastError::ComputationError(
            "quantile loss undefined for all-zero actuals".to_string(),
        ));
    }
    let numer: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let diff = a - p;
            if diff > 0.0 {
                rho * diff
            } else {
                (rho - 1.0) * diff
            }
        })
        .sum();
    Ok(2.0 * numer / denom)
}

/// Share of actuals falling inside `[lower, upper]`.
pub fn interval_coverage(actual: &[f64], lower: &[f64], upper: &[f64]) -> Result<f64> {
    check_lengths(actual, lower)?;
    check_lengths(actual, upper)?;
    let inside = actual
        .iter()
        .zip(lower.iter().zip(upper))
        .filter(|(&a, (&lo, &up))| a >= lo && a <= up)
        .count();
    Ok(inside as f64 / actual.len() as f64)
}
