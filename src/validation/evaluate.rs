//! Accuracy of a rollout against held-out targets.

use ndarray::{Array2, ArrayView2, Zip};

use crate::core::RolloutOutput;
use crate::error::{ensure_shape, ForecastError, Result};
use crate::transform::scale_columns;
use crate::utils::metrics::{calculate_metrics, interval_coverage, quantile_loss, AccuracyMetrics};
use crate::utils::stats::{quantile, quantile_normal, reduce_samples};

/// Quantile levels reported as ρ-risk.
pub const RHO_LEVELS: [f64; 2] = [0.5, 0.9];

/// Accuracy of one rollout.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutEvaluation {
    /// Metrics on the normalized scale
    pub scaled: AccuracyMetrics,
    /// Metrics on the original scale
    pub unscaled: AccuracyMetrics,
    /// `(ρ, loss)` for every level in [`RHO_LEVELS`], original scale
    pub rho_risk: Vec<(f64, f64)>,
    /// Share of targets inside the central interval at `level`
    pub coverage: Option<f64>,
    pub level: Option<f64>,
    /// Number of target cells scored (NaN targets are skipped)
    pub observed: usize,
}

/// Score a rollout against normalized targets `labels` `[batch, predict_steps]`.
///
/// NaN targets are treated as missing; zeros are scored. Point forecasts are `mu`
/// for deterministic rollouts and the sample median otherwise. With a
/// `level`, interval coverage of the matching central interval is reported.
pub fn evaluate(
    output: &RolloutOutput,
    labels: ArrayView2<f64>,
    v: ArrayView2<f64>,
    level: Option<f64>,
) -> Result<RolloutEvaluation> {
    let point = output.point();
    ensure_shape("evaluation labels", point.shape(), labels.shape())?;
    let (scale, shift) = scale_columns(v, point.nrows())?;

    let mut actual = Array2::<f64>::zeros(labels.raw_dim());
    Zip::from(actual.rows_mut())
        .and(labels.rows())
        .and(&scale)
        .and(&shift)
        .for_each(|mut out, row, &s, &m| out.assign(&row.mapv(|y| y * s + m)));

    let mut normalized_point = Array2::<f64>::zeros(point.raw_dim());
    Zip::from(normalized_point.rows_mut())
        .and(point.rows())
        .and(&scale)
        .and(&shift)
        .for_each(|mut out, row, &s, &m| {
            out.assign(&row.mapv(|p| if s == 0.0 { 0.0 } else { (p - m) / s }))
        });

    let mask: Vec<bool> = labels.iter().map(|y| !y.is_nan()).collect();
    let observed = mask.iter().filter(|&&m| m).count();
    if observed == 0 {
        return Err(ForecastError::EmptyData);
    }
    let pick = |a: &Array2<f64>| -> Vec<f64> {
        a.iter()
            .zip(mask.iter())
            .filter_map(|(&x, &keep)| keep.then_some(x))
            .collect()
    };

    let actual_obs = pick(&actual);
    let labels_obs = pick(&labels.to_owned());
    let scaled = calculate_metrics(&labels_obs, &pick(&normalized_point))?;
    let unscaled = calculate_metrics(&actual_obs, &pick(point))?;

    let rho_risk = RHO_LEVELS
        .iter()
        .map(|&rho| -> Result<(f64, f64)> {
            let q = quantile_forecast(output, rho)?;
            Ok((rho, quantile_loss(&actual_obs, &pick(&q), rho)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let coverage = match level {
        Some(level) => {
            let forecast = output.to_forecast(level)?;
            let lower = Array2::from_shape_fn(point.raw_dim(), |(b, t)| {
                forecast.lower_series(b).map(|s| s[t]).unwrap_or(f64::NAN)
            });
            let upper = Array2::from_shape_fn(point.raw_dim(), |(b, t)| {
                forecast.upper_series(b).map(|s| s[t]).unwrap_or(f64::NAN)
            });
            Some(interval_coverage(&actual_obs, &pick(&lower), &pick(&upper))?)
        }
        None => None,
    };

    Ok(RolloutEvaluation {
        scaled,
        unscaled,
        rho_risk,
        coverage,
        level,
        observed,
    })
}

/// Original-scale quantile `rho` of the predictive distribution per `[batch, step]`.
///
/// Gaussian `mu + z·sigma` for deterministic rollouts, the empirical quantile
/// of the trajectories for sampled ones.
pub fn quantile_forecast(output: &RolloutOutput, rho: f64) -> Result<Array2<f64>> {
    if !(rho > 0.0 && rho < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "quantile level must be in (0, 1), got {rho}"
        )));
    }
    match output {
        RolloutOutput::Deterministic(f) => {
            let z = quantile_normal(rho);
            Ok(&f.mu + &(&f.sigma * z))
        }
        RolloutOutput::Sampled(f) => reduce_samples(f.samples.view(), |s| quantile(s, rho)),
    }
}
