//! Elementwise activation functions.

use ndarray::{Array, Dimension};

/// Inputs above this are passed through `softplus` unchanged (PyTorch's default threshold).
pub const SOFTPLUS_THRESHOLD: f64 = 20.0;

/// Smallest value `softplus` returns.
///
/// `ln(1 + e^x)` underflows to exactly zero once `e^x` does (x below roughly -745),
/// so the result is floored to keep predicted standard deviations strictly positive.
pub const SOFTPLUS_FLOOR: f64 = f64::MIN_POSITIVE;

/// Logistic sigmoid.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Softplus `ln(1 + e^x)`, linear above [`SOFTPLUS_THRESHOLD`], never below [`SOFTPLUS_FLOOR`].
///
/// NaN passes through unchanged.
#[inline]
pub fn softplus(x: f64) -> f64 {
    let y = if x > SOFTPLUS_THRESHOLD {
        x
    } else {
        x.exp().ln_1p()
    };
    if y.is_nan() {
        y
    } else {
        y.max(SOFTPLUS_FLOOR)
    }
}

pub fn sigmoid_array<D: Dimension>(x: &Array<f64, D>) -> Array<f64, D> {
    x.mapv(sigmoid)
}

pub fn tanh_array<D: Dimension>(x: &Array<f64, D>) -> Array<f64, D> {
    x.mapv(f64::tanh)
}

pub fn softplus_array<D: Dimension>(x: &Array<f64, D>) -> Array<f64, D> {
    x.mapv(softplus)
}
