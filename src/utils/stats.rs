//! Statistical utility functions.

use ndarray::{Array2, ArrayView3, Axis};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{ForecastError, Result};

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use flood_forecast::utils::quantile_normal;
///
/// // 95% confidence level -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(standard) => standard.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Sample standard deviation; `NaN` for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Spread of an ensemble: sample standard deviation, `0.0` for a single member.
pub fn ensemble_spread(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => 0.0,
        _ => std_dev(values),
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Lower median: the smaller of the two middle values for even lengths.
///
/// Always returns one of the inputs, so the median of an ensemble is itself
/// an ensemble member.
pub fn lower_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted(values);
    sorted[(sorted.len() - 1) / 2]
}

/// Empirical quantile with linear interpolation between order statistics.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted(values);
    let n = sorted.len();
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    if lower == upper || upper >= n {
        sorted[lower.min(n - 1)]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Reduce `[samples, batch, steps]` along the sample axis with `reduce`.
pub fn reduce_samples<F>(samples: ArrayView3<f64>, reduce: F) -> Result<Array2<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if samples.len_of(Axis(0)) == 0 {
        return Err(ForecastError::EmptyData);
    }
    let (_, batch, steps) = samples.dim();
    let mut buf = Vec::with_capacity(samples.len_of(Axis(0)));
    Ok(Array2::from_shape_fn((batch, steps), |(b, t)| {
        buf.clear();
        buf.extend(samples.slice(ndarray::s![.., b, t]).iter().copied());
        reduce(&buf)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(quantile_normal(0.975), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(quantile_normal(0.025), -1.959964, epsilon = 1e-5);
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn std_dev_calculates_correctly() {
        assert_relative_eq!(
            std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            2.5_f64.sqrt(),
            epsilon = 1e-10
        );
        assert!(std_dev(&[1.0]).is_nan());
    }

    #[test]
    fn ensemble_spread_of_single_member_is_zero() {
        assert_eq!(ensemble_spread(&[3.7]), 0.0);
        assert!(ensemble_spread(&[]).is_nan());
        assert_relative_eq!(ensemble_spread(&[1.0, 3.0]), 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn lower_median_picks_an_ensemble_member() {
        assert_eq!(lower_median(&[5.0, 1.0, 3.0, 2.0, 4.0]), 3.0);
        assert_eq!(lower_median(&[4.0, 1.0, 3.0, 2.0]), 2.0);
        assert_eq!(lower_median(&[9.0]), 9.0);
        assert!(lower_median(&[]).is_nan());
    }

    #[test]
    fn quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 5.0);
        assert_relative_eq!(quantile(&values, 0.5), 3.0, epsilon = 1e-12);
        assert_relative_eq!(quantile(&values, 0.125), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn reduce_samples_works_per_cell() {
        // samples[s, b, t] = s + 10 * b + 100 * t
        let samples = Array3::from_shape_fn((3, 2, 2), |(s, b, t)| (s + 10 * b + 100 * t) as f64);
        let med = reduce_samples(samples.view(), lower_median).unwrap();
        assert_eq!(med[[0, 0]], 1.0);
        assert_eq!(med[[1, 1]], 111.0);
        let spread = reduce_samples(samples.view(), ensemble_spread).unwrap();
        assert!(spread.iter().all(|&s| (s - 1.0).abs() < 1e-12));
        assert!(reduce_samples(Array3::zeros((0, 2, 2)).view(), lower_median).is_err());
    }
}
