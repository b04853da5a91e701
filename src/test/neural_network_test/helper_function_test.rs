use super::*;

#[test]
fn convolve_valid_shape_and_values() {
    let input = ramp(4, 5, 1.0);
    let kernel = Array2::ones((2, 3));
    let output = convolve_valid(input.view(), kernel.view());
    assert_eq!(output.dim(), (3, 3));
    // window sum at (0, 0): 0 + 1 + 2 + 5 + 6 + 7
    assert_eq!(output[[0, 0]], 21.0);
    assert_eq!(output[[2, 2]], 21.0 + 6.0 * 12.0);
}

#[test]
fn zero_pad_and_unpad_are_inverse() {
    let matrix = ramp(2, 3, 1.0);
    let padded = zero_pad(matrix.view(), 1, 2, 0, 1);
    assert_eq!(padded.dim(), (5, 4));
    assert_eq!(padded.row(0).sum(), 0.0);
    assert_eq!(padded.column(3).sum(), 0.0);
    assert_eq!(unpad(padded.view(), 1, 0, 2, 3), matrix);
}

#[test]
fn rotate_180_flips_both_axes() {
    let matrix = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
    assert_eq!(
        rotate_180(matrix.view()),
        array![[6.0, 5.0], [4.0, 3.0], [2.0, 1.0]]
    );
}

#[test]
fn pooling_drops_partial_windows() {
    let matrix = ramp(5, 4, 1.0);
    let max = max_pool(matrix.view(), 2);
    assert_eq!(max, array![[5.0, 7.0], [13.0, 15.0]]);

    let average = average_pool(matrix.view(), 2);
    assert_eq!(average, array![[2.5, 4.5], [10.5, 12.5]]);

    assert_eq!(pool(matrix.view(), PoolingType::None, 2), matrix);
    assert_eq!(pooled_dim(5, 4, 2), (2, 2));
}

#[test]
fn max_unpool_routes_to_maximum() {
    let values = array![[0.1, 0.9], [0.3, 0.2]];
    let unpooled = unpool(array![[4.0]].view(), values.view(), PoolingType::Max, 2);
    assert_eq!(unpooled, array![[0.0, 4.0], [0.0, 0.0]]);
}

#[test]
fn max_unpool_ties_resolve_row_major() {
    let values = array![[0.5, 0.7], [0.7, 0.7]];
    let unpooled = unpool(array![[2.0]].view(), values.view(), PoolingType::Max, 2);
    assert_eq!(unpooled, array![[0.0, 2.0], [0.0, 0.0]]);

    let flat = Array2::from_elem((2, 2), 1.0);
    let unpooled = unpool(array![[3.0]].view(), flat.view(), PoolingType::Max, 2);
    assert_eq!(unpooled, array![[3.0, 0.0], [0.0, 0.0]]);
}

#[test]
fn average_unpool_spreads_error() {
    let values = ramp(3, 4, 1.0);
    let unpooled = unpool(array![[4.0, 8.0]].view(), values.view(), PoolingType::Average, 2);
    assert_eq!(
        unpooled,
        array![
            [1.0, 1.0, 2.0, 2.0],
            [1.0, 1.0, 2.0, 2.0],
            [0.0, 0.0, 0.0, 0.0]
        ]
    );

    let error = ramp(3, 4, 1.0);
    assert_eq!(unpool(error.view(), values.view(), PoolingType::None, 1), error);
}

#[test]
fn volume_orientation_layout() {
    let volume = vec![array![[1.0, 2.0], [3.0, 4.0]], array![[5.0, 6.0], [7.0, 8.0]]];
    let shape = VolumeShape::new(2, 2, 2);

    let horizontal = flatten_volume(&volume, Orientation::Horizontal).unwrap();
    assert_eq!(horizontal, array![1.0, 2.0, 5.0, 6.0, 3.0, 4.0, 7.0, 8.0]);
    assert_eq!(split_volume(&horizontal, shape, Orientation::Horizontal).unwrap(), volume);

    let vertical = flatten_volume(&volume, Orientation::Vertical).unwrap();
    assert_eq!(vertical, array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(split_volume(&vertical, shape, Orientation::Vertical).unwrap(), volume);
}

#[test]
fn split_volume_rejects_wrong_length() {
    let result = split_volume(&Array1::zeros(7), VolumeShape::new(2, 2, 2), Orientation::Vertical);
    assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
}

#[test]
fn orientation_parses_from_str() {
    assert_eq!("horizontal".parse::<Orientation>().unwrap(), Orientation::Horizontal);
    assert_eq!("vertical".parse::<Orientation>().unwrap(), Orientation::Vertical);
    assert!(matches!(
        "diagonal".parse::<Orientation>(),
        Err(ModelError::ConfigurationError(_))
    ));
}

#[test]
fn same_padding_layers() {
    assert_eq!(
        PadLayers::same((3, 3)),
        PadLayers { top: 1, bottom: 1, left: 1, right: 1 }
    );
    assert_eq!(
        PadLayers::same((2, 4)),
        PadLayers { top: 0, bottom: 1, left: 1, right: 2 }
    );
    assert_eq!(PadLayers::for_padding(PaddingType::Valid, (5, 5)), PadLayers::default());
}
