use super::*;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;

#[test]
fn filter_sums_channel_correlations() {
    let filter = Filter::from_kernels(vec![
        array![[1.0, 0.0], [0.0, 1.0]],
        array![[0.0, 1.0], [1.0, 0.0]],
    ])
    .unwrap();
    assert_eq!(filter.shape(), (2, 2, 2));

    let input = vec![ramp(3, 3, 1.0), Array2::ones((3, 3))];
    let output = filter.convolve(&input).unwrap();

    // channel 0: x[i][j] + x[i+1][j+1] = 2*(3i + j) + 4; channel 1 adds 2
    let expected = array![[6.0, 8.0], [12.0, 14.0]];
    assert_eq!(output, expected);
}

#[test]
fn filter_rejects_channel_mismatch() {
    let mut rng = StdRng::seed_from_u64(0);
    let filter = Filter::new((2, 2), 3, &mut rng);
    let result = filter.convolve(&[ramp(3, 3, 1.0), ramp(3, 3, 1.0)]);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));

    let result = filter.convolve(&[]);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
}

#[test]
fn filter_initialization_is_uniform_unit() {
    let mut rng = StdRng::seed_from_u64(21);
    let filter = Filter::new((3, 3), 2, &mut rng);
    assert_eq!(filter.param_count(), 18);
    assert!(
        filter
            .kernels()
            .iter()
            .flat_map(|k| k.iter())
            .all(|v| v.abs() <= 1.0)
    );
}

#[test]
fn filter_fix_subtracts_scaled_gradient() {
    let mut filter = Filter::from_kernels(vec![Array2::ones((2, 2))]).unwrap();
    filter.fix(&[Array2::from_elem((2, 2), 2.0)], 0.25).unwrap();
    assert_eq!(filter.kernels()[0], Array2::from_elem((2, 2), 0.5));

    let result = filter.fix(&[Array2::ones((3, 3))], 0.1);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
}

#[test]
fn filter_from_kernels_requires_matching_shapes() {
    assert!(Filter::from_kernels(vec![]).is_err());
    assert!(Filter::from_kernels(vec![Array2::zeros((2, 2)), Array2::zeros((3, 3))]).is_err());
}

#[test]
fn filter_randomize_rejects_non_finite_deviation() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut filter = Filter::from_kernels(vec![ramp(2, 2, 0.5)]).unwrap();
    let before = filter.clone();

    assert!(filter.randomize(f32::NAN, &mut rng).is_err());
    assert!(filter.randomize(f32::INFINITY, &mut rng).is_err());
    assert_eq!(filter, before);

    filter.randomize(0.2, &mut rng).unwrap();
    assert_abs_diff_eq!(filter.kernels()[0], before.kernels()[0], epsilon = 0.2 + 1e-6);
}
