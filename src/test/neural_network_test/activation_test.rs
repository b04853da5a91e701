use super::*;

fn numeric_derivative(activation: Activation, x: f32) -> f32 {
    let h = 1e-3;
    let plus = activation.compute(&array![x + h]).value[0];
    let minus = activation.compute(&array![x - h]).value[0];
    (plus - minus) / (2.0 * h)
}

#[test]
fn derivative_matches_finite_difference() {
    let points = [-2.5, -0.7, -0.1, 0.3, 1.2, 2.8];

    for activation in [
        Activation::Sigmoid,
        Activation::ReLU,
        Activation::Tanh,
        Activation::Softplus,
        Activation::Linear,
    ] {
        let raw = Array1::from(points.to_vec());
        let output = activation.compute(&raw);
        for (i, &x) in points.iter().enumerate() {
            assert_abs_diff_eq!(
                output.derivative[i],
                numeric_derivative(activation, x),
                epsilon = 1e-2
            );
        }
    }
}

#[test]
fn activation_values() {
    let raw = array![-1.0, 0.0, 2.0];

    let relu = Activation::ReLU.compute(&raw);
    assert_eq!(relu.value, array![0.0, 0.0, 2.0]);
    assert_eq!(relu.derivative, array![0.0, 0.0, 1.0]);

    let step = Activation::BinaryStep.compute(&raw);
    assert_eq!(step.value, array![0.0, 0.0, 1.0]);
    assert_eq!(step.derivative, array![0.0, 0.0, 0.0]);

    let linear = Activation::Linear.compute(&raw);
    assert_eq!(linear.value, raw);
    assert_eq!(linear.derivative, array![1.0, 1.0, 1.0]);

    let sigmoid = Activation::Sigmoid.compute(&array![0.0]);
    assert_relative_eq!(sigmoid.value[0], 0.5);
    assert_relative_eq!(sigmoid.derivative[0], 0.25);

    let softplus = Activation::Softplus.compute(&array![0.0, 100.0]);
    assert_relative_eq!(softplus.value[0], 2.0f32.ln(), epsilon = 1e-6);
    assert_relative_eq!(softplus.value[1], 100.0);
    assert_relative_eq!(softplus.derivative[0], 0.5);
}

#[test]
fn softmax_sums_to_one() {
    let inputs = [
        array![1.0, 2.0, 3.0],
        array![-5.0, 0.0, 5.0, 10.0],
        array![1000.0, 1001.0, 999.0],
        array![-1000.0, -1000.0],
    ];

    for raw in inputs.iter() {
        let output = Activation::Softmax.compute(raw);
        assert!(output.value.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(output.value.sum(), 1.0, epsilon = 1e-5);
        for (v, d) in output.value.iter().zip(output.derivative.iter()) {
            assert_relative_eq!(*d, v * (1.0 - v));
        }
    }
}

#[test]
fn softmax_backward_matches_jacobian() {
    let a = Activation::Softmax.compute(&array![0.2, -0.4, 1.1]).value;
    let upstream = array![0.5, -1.0, 0.25];
    let result = Activation::softmax_backward(&a, &upstream);

    for i in 0..3 {
        let expected: f32 = (0..3)
            .map(|j| {
                let jacobian = if i == j { a[i] * (1.0 - a[i]) } else { -a[i] * a[j] };
                jacobian * upstream[j]
            })
            .sum();
        assert_abs_diff_eq!(result[i], expected, epsilon = 1e-6);
    }
}

#[test]
fn empty_input_yields_empty_output() {
    for activation in Activation::ALL {
        let output = activation.compute(&Array1::zeros(0));
        assert_eq!(output.value.len(), 0);
        assert_eq!(output.derivative.len(), 0);
    }
}
