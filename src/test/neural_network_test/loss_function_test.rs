use super::*;

#[test]
fn mean_squared_error_is_sum_of_squares() {
    let loss = LossFunction::MeanSquaredError
        .compute_loss(&array![1.0, 2.0, 3.0], &array![1.5, 2.0, 1.0])
        .unwrap();
    assert_relative_eq!(loss, 0.25 + 4.0);
}

#[test]
fn cross_entropy_one_hot_and_general() {
    let guess = array![0.2, 0.7, 0.1];

    let one_hot = LossFunction::CrossEntropy
        .compute_loss(&guess, &array![0.0, 1.0, 0.0])
        .unwrap();
    assert_relative_eq!(one_hot, -(0.7f32).ln());

    let soft = LossFunction::CrossEntropy
        .compute_loss(&guess, &array![0.5, 0.5, 0.0])
        .unwrap();
    assert_relative_eq!(soft, -(0.5 * 0.2f32.ln() + 0.5 * 0.7f32.ln()), epsilon = 1e-6);
}

#[test]
fn cross_entropy_is_clamped_at_zero() {
    let loss = LossFunction::CrossEntropy
        .compute_loss(&array![0.0, 1.0], &array![1.0, 0.0])
        .unwrap();
    assert!(loss.is_finite());
    assert_relative_eq!(loss, -(1e-7f32).ln());
}

#[test]
fn loss_rejects_length_mismatch() {
    let result = LossFunction::MeanSquaredError.compute_loss(&array![1.0], &array![1.0, 2.0]);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
}

#[test]
fn output_head_resolution() {
    let mse = LossFunction::MeanSquaredError;
    let ce = LossFunction::CrossEntropy;

    assert_eq!(mse.head(Some(Activation::Sigmoid)).unwrap(), OutputHead::MeanSquaredDense);
    assert_eq!(mse.head(Some(Activation::Softmax)).unwrap(), OutputHead::MeanSquaredSoftmax);
    assert_eq!(ce.head(Some(Activation::Softmax)).unwrap(), OutputHead::SoftmaxCrossEntropy);
    assert!(matches!(
        ce.head(Some(Activation::Sigmoid)),
        Err(ModelError::ConfigurationError(_))
    ));
    assert_eq!(mse.head(None).unwrap(), OutputHead::MeanSquaredConv);
    assert_eq!(ce.head(None).unwrap(), OutputHead::CrossEntropyConv);
    assert_eq!(OutputHead::CrossEntropyConv.loss_function(), ce);
}

#[test]
fn output_head_derivatives() {
    let guess = array![0.6, 0.4];
    let label = array![1.0, 0.0];

    let chained = OutputHead::MeanSquaredDense
        .derivative(&guess, &label, Some(&array![0.5, 2.0]))
        .unwrap();
    assert_abs_diff_eq!(chained, array![-0.2, 0.8], epsilon = 1e-6);
    assert!(matches!(
        OutputHead::MeanSquaredDense.derivative(&guess, &label, None),
        Err(ModelError::ProcessingError(_))
    ));

    let shortcut = OutputHead::SoftmaxCrossEntropy
        .derivative(&guess, &label, None)
        .unwrap();
    assert_abs_diff_eq!(shortcut, array![-0.4, 0.4], epsilon = 1e-6);

    let conv = OutputHead::CrossEntropyConv
        .derivative(&array![0.5, 0.0], &array![1.0, 0.0], None)
        .unwrap();
    assert_abs_diff_eq!(conv, array![-2.0, 0.0], epsilon = 1e-6);

    // e = [-0.4, 0.4]; a·e = -0.08
    let softmax = OutputHead::MeanSquaredSoftmax
        .derivative(&guess, &label, None)
        .unwrap();
    assert_abs_diff_eq!(softmax, array![0.6 * -0.32, 0.4 * 0.48], epsilon = 1e-6);
}
