//! Interval forecast for a batch of series.

use ndarray::{Array2, ArrayView2};

use crate::error::{ensure_shape, ForecastError, Result};

/// Point predictions and optional prediction intervals, one row per series.
///
/// Values are indexed `[series][step]` and live on the de-normalized scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<Vec<f64>>,
    lower: Option<Vec<Vec<f64>>>,
    upper: Option<Vec<Vec<f64>>>,
    /// Nominal coverage of the interval, if any
    level: Option<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a single-series forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: vec![values],
            ..Self::default()
        }
    }

    /// Create a single-series forecast with a prediction interval.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
    ) -> Self {
        Self {
            point: vec![values],
            lower: Some(vec![lower]),
            upper: Some(vec![upper]),
            level: Some(level),
        }
    }

    /// Build from `[batch, horizon]` arrays.
    pub fn from_batch(point: ArrayView2<f64>) -> Self {
        Self {
            point: rows(point),
            ..Self::default()
        }
    }

    /// Build from `[batch, horizon]` point and bound arrays.
    pub fn from_batch_with_intervals(
        point: ArrayView2<f64>,
        lower: ArrayView2<f64>,
        upper: ArrayView2<f64>,
        level: f64,
    ) -> Result<Self> {
        ensure_shape("lower bound", point.shape(), lower.shape())?;
        ensure_shape("upper bound", point.shape(), upper.shape())?;
        if !(0.0..1.0).contains(&level) || level == 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "interval level must be in (0, 1), got {level}"
            )));
        }
        Ok(Self {
            point: rows(point),
            lower: Some(rows(lower)),
            upper: Some(rows(upper)),
            level: Some(level),
        })
    }

    /// Number of series in the forecast.
    pub fn num_series(&self) -> usize {
        self.point.len()
    }

    /// Forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.first().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.point.iter().all(|s| s.is_empty())
    }

    /// Point predictions of one series.
    pub fn series(&self, index: usize) -> Result<&[f64]> {
        self.point
            .get(index)
            .map(|v| v.as_slice())
            .ok_or(ForecastError::IndexOutOfBounds {
                index,
                size: self.point.len(),
            })
    }

    /// Point predictions of the first series.
    pub fn primary(&self) -> &[f64] {
        self.point.first().map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn point(&self) -> &[Vec<f64>] {
        &self.point
    }

    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Lower bounds of one series.
    pub fn lower_series(&self, index: usize) -> Result<&[f64]> {
        bound_series(self.lower.as_deref(), index)
    }

    /// Upper bounds of one series.
    pub fn upper_series(&self, index: usize) -> Result<&[f64]> {
        bound_series(self.upper.as_deref(), index)
    }

    /// Point predictions as a `[batch, horizon]` array.
    pub fn point_array(&self) -> Result<Array2<f64>> {
        let flat: Vec<f64> = self.point.iter().flatten().copied().collect();
        Ok(Array2::from_shape_vec(
            (self.num_series(), self.horizon()),
            flat,
        )?)
    }
}

fn rows(values: ArrayView2<f64>) -> Vec<Vec<f64>> {
    values.rows().into_iter().map(|r| r.to_vec()).collect()
}

fn bound_series(bounds: Option<&[Vec<f64>]>, index: usize) -> Result<&[f64]> {
    bounds
        .and_then(|b| b.get(index))
        .map(|v| v.as_slice())
        .ok_or(ForecastError::IndexOutOfBounds {
            index,
            size: bounds.map(|b| b.len()).unwrap_or(0),
        })
}
