//! Reinterpretation of per-layer recurrent state as a flat feature vector.

use ndarray::{Array2, ArrayView3};

/// Flatten `[layers, batch, hidden]` into `[batch, hidden * layers]`.
///
/// Axes are permuted to `(batch, hidden, layers)` before flattening, so unit `k`
/// of layer `l` lands in column `k * layers + l`: the layer index varies fastest,
/// not the layer-major order a plain reshape would give. Trained `mu` and
/// `presigma` head weights expect this column order, so changing it silently
/// scrambles a loaded model's outputs.
pub fn flatten_layers(state: ArrayView3<f64>) -> Array2<f64> {
    let (layers, batch, hidden) = state.dim();
    Array2::from_shape_fn((batch, hidden * layers), |(b, col)| {
        state[[col % layers, b, col / layers]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn flatten_ordering_is_pinned() {
        // value encodes (layer, batch, unit) as 100*l + 10*b + k
        let state = Array3::from_shape_fn((2, 2, 3), |(l, b, k)| (100 * l + 10 * b + k) as f64);
        let flat = flatten_layers(state.view());
        assert_eq!(
            flat,
            array![
                [0.0, 100.0, 1.0, 101.0, 2.0, 102.0],
                [10.0, 110.0, 11.0, 111.0, 12.0, 112.0],
            ]
        );
    }

    #[test]
    fn single_layer_is_plain_reshape() {
        let state = Array3::from_shape_fn((1, 2, 4), |(_, b, k)| (b * 4 + k) as f64);
        let flat = flatten_layers(state.view());
        assert_eq!(flat.shape(), &[2, 4]);
        assert_eq!(flat.row(1).to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
    }
}
