use super::*;

#[test]
fn dense_forward_computes_affine_then_activation() {
    let mut dense = Dense::with_input(2, 2, Activation::ReLU);
    dense
        .set_weights(array![[1.0, 2.0], [-1.0, 0.5]], array![0.5, -3.0])
        .unwrap();

    let output = dense.compute_output(&array![1.0, 1.0]).unwrap();
    // raw = [3.5, -3.5]
    assert_eq!(output, array![3.5, 0.0]);
    assert_eq!(dense.value(), Some(&array![3.5, 0.0]));
    assert_eq!(dense.derivative(), Some(&array![1.0, 0.0]));
}

#[test]
fn dense_rejects_wrong_input_length() {
    let mut dense = Dense::with_input(3, 2, Activation::Sigmoid);
    let result = dense.compute_output(&array![1.0, 2.0]);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
}

#[test]
fn unbound_dense_cannot_run() {
    let mut dense = Dense::new(2, Activation::Linear);
    assert!(!dense.is_ready());
    assert_eq!(dense.param_count(), 0);
    assert!(matches!(
        dense.compute_output(&array![1.0]),
        Err(ModelError::ConfigurationError(_))
    ));
}

#[test]
fn dense_initialization_scale() {
    let relu = Dense::with_input(8, 16, Activation::ReLU).with_seed(3);
    let bound = (2.0f32 / 8.0).sqrt();
    assert!(relu.weights().iter().all(|w| w.abs() <= bound));
    assert_eq!(relu.weights().dim(), (16, 8));
    assert_eq!(relu.bias().len(), 16);
    assert!(relu.bias().iter().all(|b| b.abs() <= 1.0));

    let tanh = Dense::with_input(4, 16, Activation::Tanh).with_seed(3);
    assert!(tanh.weights().iter().all(|w| w.abs() <= 0.5));
    assert_eq!(tanh.param_count(), 16 * 4 + 16);
}

#[test]
fn dense_seed_is_reproducible() {
    let a = Dense::with_input(5, 3, Activation::Sigmoid).with_seed(11);
    let b = Dense::with_input(5, 3, Activation::Sigmoid).with_seed(11);
    let c = Dense::with_input(5, 3, Activation::Sigmoid).with_seed(12);
    assert_eq!(a.weights(), b.weights());
    assert_eq!(a.bias(), b.bias());
    assert_ne!(a.weights(), c.weights());
}

#[test]
fn dense_bind_keeps_parameters_for_same_input() {
    let mut dense = Dense::with_input(3, 2, Activation::Linear).with_seed(5);
    let weights = dense.weights().clone();

    dense.bind(3).unwrap();
    assert_eq!(dense.weights(), &weights);

    dense.bind(4).unwrap();
    assert_eq!(dense.weights().dim(), (2, 4));
    assert!(matches!(dense.bind(0), Err(ModelError::ConfigurationError(_))));
}

#[test]
fn dense_set_weights_checks_shapes() {
    let mut dense = Dense::with_input(3, 2, Activation::Linear);
    let result = dense.set_weights(Array2::zeros((3, 2)), Array1::zeros(2));
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));

    let result = dense.set_weights(Array2::zeros((2, 3)), Array1::zeros(3));
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));

    let mut unbound = Dense::new(2, Activation::Linear);
    unbound
        .set_weights(Array2::ones((2, 4)), Array1::zeros(2))
        .unwrap();
    assert_eq!(unbound.input_dim(), Some(4));
}

#[test]
fn dense_randomize_stays_within_deviation() {
    let mut dense = Dense::with_input(4, 3, Activation::Linear).with_seed(9);
    let weights = dense.weights().clone();
    let bias = dense.bias().clone();

    dense.randomize(0.1).unwrap();
    for (before, after) in weights.iter().zip(dense.weights().iter()) {
        assert!((before - after).abs() <= 0.1 + 1e-6);
    }
    for (before, after) in bias.iter().zip(dense.bias().iter()) {
        assert!((before - after).abs() <= 0.1 + 1e-6);
    }
}

#[test]
fn dense_randomize_rejects_non_finite_deviation() {
    let mut dense = Dense::with_input(2, 2, Activation::Linear).with_seed(9);
    let before = dense.clone();

    for deviation in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        assert!(matches!(
            dense.randomize(deviation),
            Err(ModelError::ConfigurationError(_))
        ));
    }
    assert_eq!(dense, before);
}
