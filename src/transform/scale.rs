//! Per-series scaling for network inputs and de-normalization of predictions.
//!
//! Models consume normalized targets; predictions are mapped back with a
//! per-series `(scale, shift)` pair. A batch of pairs is carried as a
//! `[batch, 2]` array `v` whose column 0 is the scale and column 1 the shift.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{ensure_shape, ForecastError, Result};

/// Scale and shift mapping normalized values back to the original scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesScale {
    pub scale: f64,
    pub shift: f64,
}

impl Default for SeriesScale {
    fn default() -> Self {
        Self::identity()
    }
}

impl SeriesScale {
    pub fn new(scale: f64, shift: f64) -> Self {
        Self { scale, shift }
    }

    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            shift: 0.0,
        }
    }

    /// Map a normalized location back: `x * scale + shift`.
    pub fn denormalize(&self, x: f64) -> f64 {
        x * self.scale + self.shift
    }

    /// Map a normalized spread back: `sigma * scale` (shift does not apply).
    pub fn denormalize_spread(&self, sigma: f64) -> f64 {
        sigma * self.scale
    }

    /// Map an original-scale value to the normalized scale.
    pub fn normalize(&self, x: f64) -> f64 {
        if self.scale.abs() < 1e-10 {
            0.0
        } else {
            (x - self.shift) / self.scale
        }
    }

    pub fn normalize_all(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.normalize(x)).collect()
    }
}

/// Z-score scaling: shift = mean, scale = sample std (1 when degenerate).
pub fn standardize(series: &[f64]) -> SeriesScale {
    if series.is_empty() {
        return SeriesScale::identity();
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = if series.len() > 1 {
        series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let std = variance.sqrt();

    SeriesScale {
        scale: if std < 1e-10 { 1.0 } else { std },
        shift: mean,
    }
}

/// Mean scaling: scale = `1 + mean(|x|)` over observed values, shift = 0.
///
/// NaN marks a missing value. Zeros are real observations (a dry gauge), and a
/// series with nothing observed gets scale 1.
pub fn mean_scale(series: &[f64]) -> SeriesScale {
    let observed: Vec<f64> = series.iter().copied().filter(|x| !x.is_nan()).collect();
    if observed.is_empty() {
        return SeriesScale::identity();
    }
    let mean_abs = observed.iter().map(|x| x.abs()).sum::<f64>() / observed.len() as f64;
    SeriesScale {
        scale: 1.0 + mean_abs,
        shift: 0.0,
    }
}

/// Pack per-series scales into a `[batch, 2]` array.
pub fn to_scale_array(scales: &[SeriesScale]) -> Array2<f64> {
    Array2::from_shape_fn((scales.len(), 2), |(b, col)| {
        if col == 0 {
            scales[b].scale
        } else {
            scales[b].shift
        }
    })
}

/// Unpack a `[batch, 2]` array into per-series scales.
pub fn from_scale_array(v: ArrayView2<f64>) -> Result<Vec<SeriesScale>> {
    ensure_shape("scale/shift", &[v.nrows(), 2], v.shape())?;
    Ok(v.rows()
        .into_iter()
        .map(|row| SeriesScale::new(row[0], row[1]))
        .collect())
}

/// Validated `(scale, shift)` columns of `v` for a batch of `batch` series.
pub fn scale_columns<'a>(
    v: ArrayView2<'a, f64>,
    batch: usize,
) -> Result<(ArrayView1<'a, f64>, ArrayView1<'a, f64>)> {
    ensure_shape("scale/shift", &[batch, 2], v.shape())?;
    if v.column(0).iter().any(|s| !s.is_finite()) {
        return Err(ForecastError::InvalidParameter(
            "series scale must be finite".to_string(),
        ));
    }
    Ok((v.index_axis_move(Axis(1), 0), v.index_axis_move(Axis(1), 1)))
}

/// `x * scale + shift`, elementwise over a batch.
pub fn denormalize(x: ArrayView1<f64>, scale: ArrayView1<f64>, shift: ArrayView1<f64>) -> Array1<f64> {
    &x * &scale + &shift
}

/// `sigma * scale`, elementwise over a batch.
pub fn denormalize_spread(sigma: ArrayView1<f64>, scale: ArrayView1<f64>) -> Array1<f64> {
    &sigma * &scale
}
