use crate::ModelError;
use crate::neural_network::layer::{Orientation, PoolingType, VolumeShape};
use crate::neural_network::{Matrix, Vector};
use ndarray::{Array1, Array2, ArrayView2, Axis, concatenate, s};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;

/// Performs a stride-1 valid-mode 2D cross-correlation.
///
/// The kernel slides over every position where it fully overlaps the input, so the result has
/// shape `(rows - kernel_rows + 1, cols - kernel_cols + 1)`.
///
/// # Parameters
///
/// - `input` - Matrix to slide over
/// - `kernel` - Kernel to correlate with; must not be larger than `input` in either dimension
///
/// # Returns
///
/// * `Matrix` - The correlation result
pub fn convolve_valid(input: ArrayView2<f32>, kernel: ArrayView2<f32>) -> Matrix {
    let (kernel_rows, kernel_cols) = kernel.dim();
    let out_rows = (input.nrows() + 1).saturating_sub(kernel_rows);
    let out_cols = (input.ncols() + 1).saturating_sub(kernel_cols);

    Array2::from_shape_fn((out_rows, out_cols), |(i, j)| {
        let window = input.slice(s![i..i + kernel_rows, j..j + kernel_cols]);
        (&window * &kernel).sum()
    })
}

/// Surrounds a matrix with zeros.
///
/// # Parameters
///
/// - `matrix` - Matrix to pad
/// - `top` / `bottom` - Number of zero rows added above and below
/// - `left` / `right` - Number of zero columns added left and right
///
/// # Returns
///
/// * `Matrix` - A new matrix of shape `(rows + top + bottom, cols + left + right)`
pub fn zero_pad(
    matrix: ArrayView2<f32>,
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
) -> Matrix {
    let (rows, cols) = matrix.dim();
    let mut padded = Array2::zeros((rows + top + bottom, cols + left + right));
    padded
        .slice_mut(s![top..top + rows, left..left + cols])
        .assign(&matrix);
    padded
}

/// Cuts a `rows x cols` block starting at `(top, left)` out of a padded matrix.
pub fn unpad(matrix: ArrayView2<f32>, top: usize, left: usize, rows: usize, cols: usize) -> Matrix {
    matrix
        .slice(s![top..top + rows, left..left + cols])
        .to_owned()
}

/// Rotates a matrix by 180 degrees (flips both axes).
pub fn rotate_180(matrix: ArrayView2<f32>) -> Matrix {
    matrix.slice(s![..;-1, ..;-1]).to_owned()
}

/// Output spatial size of pooling a `rows x cols` matrix with non-overlapping `stride x stride`
/// windows. Trailing rows and columns that do not fill a window are dropped.
pub fn pooled_dim(rows: usize, cols: usize, stride: usize) -> (usize, usize) {
    (rows / stride, cols / stride)
}

/// Max pooling over non-overlapping `stride x stride` windows.
pub fn max_pool(matrix: ArrayView2<f32>, stride: usize) -> Matrix {
    let (rows, cols) = pooled_dim(matrix.nrows(), matrix.ncols(), stride);
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        window(matrix, i, j, stride)
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max)
    })
}

/// Average pooling over non-overlapping `stride x stride` windows.
pub fn average_pool(matrix: ArrayView2<f32>, stride: usize) -> Matrix {
    let (rows, cols) = pooled_dim(matrix.nrows(), matrix.ncols(), stride);
    let area = (stride * stride) as f32;
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        window(matrix, i, j, stride).sum() / area
    })
}

/// Applies the given pooling mode. `PoolingType::None` returns a copy of the input.
pub fn pool(matrix: ArrayView2<f32>, pooling: PoolingType, stride: usize) -> Matrix {
    match pooling {
        PoolingType::Max => max_pool(matrix, stride),
        PoolingType::Average => average_pool(matrix, stride),
        PoolingType::None => matrix.to_owned(),
    }
}

/// Reconstructs a pre-pooling-shaped gradient from a post-pooling gradient.
///
/// - `Max`: each pooled error goes entirely to the position that held the window maximum in
///   `values`; ties resolve to the first position scanned row-major
/// - `Average`: each pooled error is divided evenly across its window
/// - `None`: the error passes through unchanged
///
/// Positions outside every full window receive zero.
///
/// # Parameters
///
/// - `pooled_error` - Error with the pooled shape
/// - `values` - The forward-pass values that were pooled (pre-pooling shape)
/// - `pooling` - Pooling mode used in the forward pass
/// - `stride` - Pooling window size and step
///
/// # Returns
///
/// * `Matrix` - Error with the shape of `values`
pub fn unpool(
    pooled_error: ArrayView2<f32>,
    values: ArrayView2<f32>,
    pooling: PoolingType,
    stride: usize,
) -> Matrix {
    if pooling == PoolingType::None {
        return pooled_error.to_owned();
    }

    let mut unpooled = Array2::zeros(values.raw_dim());
    let area = (stride * stride) as f32;

    for ((i, j), &error) in pooled_error.indexed_iter() {
        let (row, col) = (i * stride, j * stride);
        match pooling {
            PoolingType::Max => {
                let (max_i, max_j) = index_max(window(values, i, j, stride));
                unpooled[[row + max_i, col + max_j]] = error;
            }
            PoolingType::Average => {
                unpooled
                    .slice_mut(s![row..row + stride, col..col + stride])
                    .fill(error / area);
            }
            PoolingType::None => {}
        }
    }

    unpooled
}

fn window(matrix: ArrayView2<f32>, i: usize, j: usize, stride: usize) -> ArrayView2<f32> {
    let (row, col) = (i * stride, j * stride);
    matrix.slice_move(s![row..row + stride, col..col + stride])
}

/// Position of the first maximum in row-major scan order
fn index_max(window: ArrayView2<f32>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f32::NEG_INFINITY;
    for ((i, j), &v) in window.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (i, j);
        }
    }
    best
}

/// Flattens a volume into a vector using the given orientation.
///
/// `Horizontal` concatenates the channels column-wise before flattening row-major, `Vertical`
/// concatenates them row-wise.
pub fn flatten_volume(volume: &[Matrix], orientation: Orientation) -> Result<Vector, ModelError> {
    if volume.is_empty() {
        return Ok(Array1::zeros(0));
    }

    let views: Vec<ArrayView2<f32>> = volume.iter().map(|m| m.view()).collect();
    let axis = match orientation {
        Orientation::Horizontal => Axis(1),
        Orientation::Vertical => Axis(0),
    };
    let joined = concatenate(axis, &views).map_err(|e| {
        ModelError::ShapeMismatch(format!("Cannot concatenate volume channels: {}", e))
    })?;

    Ok(joined.iter().cloned().collect())
}

/// Splits a flat vector into a volume of the given shape; inverse of `flatten_volume`.
pub fn split_volume(
    vector: &Vector,
    shape: VolumeShape,
    orientation: Orientation,
) -> Result<Vec<Matrix>, ModelError> {
    if vector.len() != shape.size() {
        return Err(ModelError::ShapeMismatch(format!(
            "Cannot reshape a vector of length {} into a volume of shape {}",
            vector.len(),
            shape
        )));
    }

    let (rows, cols, axis, chunk) = match orientation {
        Orientation::Horizontal => (
            shape.height,
            shape.width * shape.channels,
            Axis(1),
            shape.width,
        ),
        Orientation::Vertical => (
            shape.height * shape.channels,
            shape.width,
            Axis(0),
            shape.height,
        ),
    };

    let undivided = Array2::from_shape_vec((rows, cols), vector.to_vec())
        .map_err(|e| ModelError::ShapeMismatch(format!("Cannot reshape vector: {}", e)))?;

    if chunk == 0 {
        return Ok(vec![Array2::zeros((shape.height, shape.width)); shape.channels]);
    }

    Ok(undivided
        .axis_chunks_iter(axis, chunk)
        .map(|part| part.to_owned())
        .collect())
}

/// Reshapes a flat row-major vector into a `rows x cols` matrix.
pub fn to_matrix(vector: &Vector, rows: usize, cols: usize) -> Result<Matrix, ModelError> {
    Array2::from_shape_vec((rows, cols), vector.to_vec()).map_err(|e| {
        ModelError::ShapeMismatch(format!(
            "Cannot reshape a vector of length {} into ({}, {}): {}",
            vector.len(),
            rows,
            cols,
            e
        ))
    })
}

/// Random number generator for parameter initialization, seeded when a seed is given.
pub fn parameter_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
