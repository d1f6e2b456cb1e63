//! Fully connected projection layer.

use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::error::{ensure_shape, Result};

/// Affine map `y = x · Wᵀ + b` applied row-wise to a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// Weights `[out_features, in_features]`
    weight: Array2<f64>,
    /// Bias `[out_features]`
    bias: Array1<f64>,
}

impl Linear {
    /// Create a layer with weights and bias drawn from `U(-1/√in, 1/√in)`.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        Self {
            weight: Array2::random_using((out_features, in_features), dist, rng),
            bias: Array1::random_using(out_features, dist, rng),
        }
    }

    /// Build a layer from trained parameters.
    pub fn from_weights(weight: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        ensure_shape("linear bias", &[weight.nrows()], bias.shape())?;
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn weight(&self) -> &Array2<f64> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    /// Project a batch `[batch, in_features]` to `[batch, out_features]`.
    pub fn forward(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        ensure_shape(
            "linear input",
            &[x.nrows(), self.in_features()],
            x.shape(),
        )?;
        Ok(x.dot(&self.weight.t()) + &self.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn forward_computes_affine_map() {
        let layer = Linear::from_weights(array![[1.0, 2.0], [0.0, -1.0]], array![0.5, 1.0]).unwrap();
        let y = layer.forward(array![[1.0, 1.0], [2.0, 0.0]].view()).unwrap();
        assert_eq!(y, array![[3.5, 0.0], [2.5, 1.0]]);
    }

    #[test]
    fn default_init_is_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Linear::new(16, 4, &mut rng);
        let bound = 0.25;
        assert!(layer.weight().iter().all(|w| w.abs() <= bound));
        assert!(layer.bias().iter().all(|b| b.abs() <= bound));
        assert_eq!(layer.weight().shape(), &[4, 16]);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Linear::new(3, 1, &mut rng);
        let err = layer.forward(Array2::zeros((2, 4)).view()).unwrap_err();
        assert!(matches!(err, ForecastError::ShapeMismatch { .. }));
    }

    #[test]
    fn from_weights_checks_bias_length() {
        assert!(Linear::from_weights(Array2::zeros((2, 3)), Array1::zeros(3)).is_err());
    }
}
