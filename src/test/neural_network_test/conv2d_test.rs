use super::*;

#[test]
fn conv2d_output_shape_valid_and_same() {
    let input = VolumeShape::new(5, 5, 1);

    let valid = Conv2D::with_input(input, 2, (3, 3), Activation::ReLU).unwrap();
    assert_eq!(valid.output_volume_shape(), Some(VolumeShape::new(3, 3, 2)));
    assert_eq!(valid.pooled_output_shape(), Some(VolumeShape::new(3, 3, 2)));
    assert_eq!(valid.pad_layers(), Some(PadLayers::default()));

    let mut same = Conv2D::new(2, (3, 3), Activation::ReLU).with_padding(PaddingType::Same);
    same.bind(input).unwrap();
    assert_eq!(same.output_volume_shape(), Some(VolumeShape::new(5, 5, 2)));
    assert_eq!(same.filters().len(), 2);
    assert_eq!(same.filters()[0].shape(), (3, 3, 1));
    assert_eq!(same.param_count(), 18);
}

#[test]
fn conv2d_even_kernel_same_padding_keeps_size() {
    let mut conv = Conv2D::new(1, (2, 4), Activation::Linear).with_padding(PaddingType::Same);
    conv.bind(VolumeShape::new(4, 6, 3)).unwrap();
    assert_eq!(conv.output_volume_shape(), Some(VolumeShape::new(4, 6, 1)));

    let output = conv
        .compute_output(&vec![Array2::ones((4, 6)); 3])
        .unwrap();
    assert_eq!(output[0].dim(), (4, 6));
}

#[test]
fn conv2d_forward_with_known_filter() {
    let mut conv = Conv2D::with_input(VolumeShape::new(3, 3, 1), 1, (2, 2), Activation::Linear)
        .unwrap();
    conv.set_filters(vec![Filter::from_kernels(vec![Array2::ones((2, 2))]).unwrap()])
        .unwrap();

    let output = conv.compute_output(&[ramp(3, 3, 1.0)]).unwrap();
    assert_eq!(output, vec![array![[8.0, 12.0], [20.0, 24.0]]]);
    assert_eq!(conv.derivative().unwrap()[0], Array2::<f32>::ones((2, 2)));
    assert_eq!(conv.output().unwrap(), conv.pooled_output().unwrap());
}

#[test]
fn conv2d_pooling_reduces_output() {
    let mut conv = Conv2D::new(1, (1, 1), Activation::Linear).with_pooling(PoolingType::Max, 2);
    conv.bind(VolumeShape::new(4, 4, 1)).unwrap();
    conv.set_filters(vec![Filter::from_kernels(vec![array![[1.0]]]).unwrap()])
        .unwrap();
    assert_eq!(conv.pooled_output_shape(), Some(VolumeShape::new(2, 2, 1)));
    assert_eq!(conv.output_size(), 4);

    let pooled = conv.compute_output(&[ramp(4, 4, 1.0)]).unwrap();
    assert_eq!(pooled, vec![array![[5.0, 7.0], [13.0, 15.0]]]);
    assert_eq!(conv.output().unwrap()[0].dim(), (4, 4));

    conv.set_pooling(PoolingType::Average, 2).unwrap();
    let pooled = conv.compute_output(&[ramp(4, 4, 1.0)]).unwrap();
    assert_eq!(pooled, vec![array![[2.5, 4.5], [10.5, 12.5]]]);
}

#[test]
fn conv2d_bind_rejects_bad_geometry() {
    let too_small = Conv2D::with_input(VolumeShape::new(2, 2, 1), 1, (3, 3), Activation::ReLU);
    assert!(matches!(too_small, Err(ModelError::ConfigurationError(_))));

    let empty = Conv2D::with_input(VolumeShape::new(5, 5, 1), 0, (3, 3), Activation::ReLU);
    assert!(matches!(empty, Err(ModelError::ConfigurationError(_))));

    let mut over_pooled = Conv2D::new(1, (3, 3), Activation::ReLU).with_pooling(PoolingType::Max, 4);
    let result = over_pooled.bind(VolumeShape::new(5, 5, 1));
    assert!(matches!(result, Err(ModelError::ConfigurationError(_))));

    let mut zero_stride = Conv2D::new(1, (3, 3), Activation::ReLU).with_pooling(PoolingType::Max, 0);
    assert!(zero_stride.bind(VolumeShape::new(5, 5, 1)).is_err());

    // same padding makes a kernel larger than the input usable
    let mut padded = Conv2D::new(1, (3, 3), Activation::ReLU).with_padding(PaddingType::Same);
    padded.bind(VolumeShape::new(2, 2, 1)).unwrap();
    assert_eq!(padded.output_volume_shape(), Some(VolumeShape::new(2, 2, 1)));
}

#[test]
fn conv2d_failed_reconfiguration_leaves_layer_unchanged() {
    let mut conv = Conv2D::with_input(VolumeShape::new(4, 4, 1), 1, (3, 3), Activation::ReLU)
        .unwrap();
    let before = conv.clone();
    assert!(conv.set_pooling(PoolingType::Max, 3).is_err());
    assert_eq!(conv, before);

    conv.set_padding(PaddingType::Same).unwrap();
    assert_eq!(conv.output_volume_shape(), Some(VolumeShape::new(4, 4, 1)));
    assert_eq!(conv.filters(), before.filters());
}

#[test]
fn conv2d_rejects_wrong_input_volume() {
    let mut conv = Conv2D::with_input(VolumeShape::new(4, 4, 2), 1, (3, 3), Activation::ReLU)
        .unwrap();
    let result = conv.compute_output(&[Array2::zeros((4, 4))]);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));

    let result = conv.compute_output(&[Array2::zeros((4, 4)), Array2::zeros((3, 4))]);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
}

#[test]
fn conv2d_volume_conversion_uses_orientation() {
    let conv = Conv2D::with_input(VolumeShape::new(2, 2, 2), 1, (1, 1), Activation::Linear)
        .unwrap();
    let vector = array![1.0, 2.0, 5.0, 6.0, 3.0, 4.0, 7.0, 8.0];

    let horizontal = conv.to_input_volume(&vector, Orientation::Horizontal).unwrap();
    assert_eq!(horizontal[1], array![[5.0, 6.0], [7.0, 8.0]]);

    let vertical = conv.to_input_volume(&vector, Orientation::Vertical).unwrap();
    assert_eq!(vertical[1], array![[3.0, 4.0], [7.0, 8.0]]);

    let error = conv
        .to_error_volume(&array![1.0, 2.0, 3.0, 4.0], Orientation::Horizontal)
        .unwrap();
    assert_eq!(error, vec![array![[1.0, 2.0], [3.0, 4.0]]]);
}

#[test]
fn conv2d_seed_is_reproducible() {
    let shape = VolumeShape::new(4, 4, 2);
    let mut a = Conv2D::new(3, (2, 2), Activation::Tanh).with_seed(17);
    let mut b = Conv2D::new(3, (2, 2), Activation::Tanh).with_seed(17);
    a.bind(shape).unwrap();
    b.bind(shape).unwrap();
    assert_eq!(a.filters(), b.filters());
    assert!(
        a.filters()
            .iter()
            .flat_map(|f| f.kernels().iter())
            .flat_map(|k| k.iter())
            .all(|v| v.abs() <= 1.0)
    );
}
