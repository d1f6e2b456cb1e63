//! Property-based tests for the forecaster and its building blocks.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated windows, scales and parameters.

use flood_forecast::models::deep_ar::{gaussian_nll, DeepAr, DeepArConfig};
use flood_forecast::nn::{flatten_layers, softplus};
use flood_forecast::utils::{ensemble_spread, lower_median};
use ndarray::{Array1, Array2, Array3};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Strategy for a normalized input window `[len, batch, 1 + cov_dim]`.
fn window_strategy(
    len: usize,
    batch: usize,
    features: usize,
) -> impl Strategy<Value = Array3<f64>> {
    prop::collection::vec(-3.0..3.0_f64, len * batch * features).prop_map(move |values| {
        Array3::from_shape_vec((len, batch, features), values).unwrap()
    })
}

/// Strategy for per-series `(scale, shift)` pairs with positive scale.
fn scale_strategy(batch: usize) -> impl Strategy<Value = Array2<f64>> {
    prop::collection::vec((0.1..50.0_f64, -100.0..100.0_f64), batch).prop_map(move |pairs| {
        Array2::from_shape_fn((batch, 2), |(b, col)| {
            if col == 0 {
                pairs[b].0
            } else {
                pairs[b].1
            }
        })
    })
}

fn small_model(seed: u64, predict_steps: usize, sample_times: usize) -> DeepAr {
    let config = DeepArConfig::new(4, 1, 3, predict_steps)
        .with_embedding_dim(2)
        .with_hidden_dim(4)
        .with_layers(2)
        .with_sample_times(sample_times);
    DeepAr::with_rng(config, &mut StdRng::seed_from_u64(seed)).unwrap()
}

// =============================================================================
// Property: softplus is strictly positive and finite
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn softplus_is_positive(x in -1e6..1e6_f64) {
        let y = softplus(x);
        prop_assert!(y > 0.0);
        prop_assert!(y.is_finite());
        prop_assert!(y >= x);
    }
}

// =============================================================================
// Property: rollout output shapes and positive spread for any window
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn deterministic_rollout_shapes(
        seed in 0u64..1000,
        steps in 1usize..5,
        x in window_strategy(8, 3, 2),
        v in scale_strategy(3),
    ) {
        let model = small_model(seed, steps, 2);
        let ids = Array1::from(vec![0, 1, 3]);
        let out = model.forecast(x.view(), v.view(), ids.view()).unwrap();
        prop_assert_eq!(out.mu.shape(), &[3, steps]);
        prop_assert!(out.sigma.iter().all(|&s| s > 0.0));
        // rows at or past predict_start + predict_steps are the caller's
        for t in (3 + steps)..8 {
            for b in 0..3 {
                prop_assert_eq!(out.inputs[[t, b, 0]], x[[t, b, 0]]);
            }
        }
    }

    #[test]
    fn sampled_summary_is_consistent(
        seed in 0u64..1000,
        sample_times in 1usize..8,
        x in window_strategy(6, 2, 2),
        v in scale_strategy(2),
    ) {
        let model = small_model(seed, 3, sample_times);
        let ids = Array1::from(vec![2, 0]);
        let out = model
            .forecast_samples(x.view(), v.view(), ids.view(), &mut StdRng::seed_from_u64(seed))
            .unwrap();
        prop_assert_eq!(out.samples.shape(), &[sample_times, 2, 3]);
        for b in 0..2 {
            for t in 0..3 {
                let cell: Vec<f64> = (0..sample_times).map(|j| out.samples[[j, b, t]]).collect();
                prop_assert_eq!(out.median[[b, t]], lower_median(&cell));
                prop_assert_eq!(out.std[[b, t]], ensemble_spread(&cell));
                prop_assert!(cell.contains(&out.median[[b, t]]));
                prop_assert!(out.std[[b, t]] >= 0.0);
            }
        }
    }
}

// =============================================================================
// Property: flatten places unit k of layer l at column k * layers + l
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn flatten_is_layer_fastest(layers in 1usize..4, batch in 1usize..4, hidden in 1usize..6) {
        let state = Array3::from_shape_fn((layers, batch, hidden), |(l, b, k)| {
            (l * 10_000 + b * 100 + k) as f64
        });
        let flat = flatten_layers(state.view());
        prop_assert_eq!(flat.shape(), &[batch, hidden * layers]);
        for l in 0..layers {
            for b in 0..batch {
                for k in 0..hidden {
                    prop_assert_eq!(flat[[b, k * layers + l]], state[[l, b, k]]);
                }
            }
        }
    }
}

// =============================================================================
// Property: NLL ignores zero labels
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn nll_ignores_missing_labels(
        observed in prop::collection::vec((-5.0..5.0_f64, 0.1..3.0_f64, 0.5..5.0_f64), 1..10),
        missing in 1usize..5,
    ) {
        let mu: Vec<f64> = observed.iter().map(|o| o.0).collect();
        let sigma: Vec<f64> = observed.iter().map(|o| o.1).collect();
        let labels: Vec<f64> = observed.iter().map(|o| o.2).collect();
        let base = gaussian_nll(
            Array1::from(mu.clone()).view(),
            Array1::from(sigma.clone()).view(),
            Array1::from(labels.clone()).view(),
        )
        .unwrap();

        let mut mu_padded = mu;
        let mut sigma_padded = sigma;
        let mut labels_padded = labels;
        for i in 0..missing {
            mu_padded.push(i as f64);
            sigma_padded.push(1.0);
            labels_padded.push(0.0);
        }
        let padded = gaussian_nll(
            Array1::from(mu_padded).view(),
            Array1::from(sigma_padded).view(),
            Array1::from(labels_padded).view(),
        )
        .unwrap();
        prop_assert!((base - padded).abs() < 1e-12);
    }
}
