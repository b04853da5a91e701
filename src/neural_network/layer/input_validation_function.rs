use crate::ModelError;
use crate::neural_network::layer::VolumeShape;

/// Validates the number of filters of a convolutional layer.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if filters is 0.
pub(super) fn validate_filters(filters: usize) -> Result<(), ModelError> {
    if filters == 0 {
        return Err(ModelError::ConfigurationError(
            "Cannot add empty conv layer".to_string(),
        ));
    }
    Ok(())
}

/// Validates kernel size for 2D convolution.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if any dimension is 0.
pub(super) fn validate_kernel_size_2d(kernel_size: (usize, usize)) -> Result<(), ModelError> {
    if kernel_size.0 == 0 || kernel_size.1 == 0 {
        return Err(ModelError::ConfigurationError(
            "Kernel dimensions must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates the pooling stride.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if stride is 0.
pub(super) fn validate_pool_stride(stride: usize) -> Result<(), ModelError> {
    if stride == 0 {
        return Err(ModelError::ConfigurationError(
            "Pooling stride must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates the input volume shape of a convolutional layer.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if:
/// - Any dimension is 0
/// - The (padded) input is smaller than the kernel
pub(super) fn validate_input_shape_2d(
    input_shape: VolumeShape,
    padded: (usize, usize),
    kernel_size: (usize, usize),
) -> Result<(), ModelError> {
    if input_shape.height == 0 || input_shape.width == 0 || input_shape.channels == 0 {
        return Err(ModelError::ConfigurationError(format!(
            "All input dimensions must be greater than 0, got {}",
            input_shape
        )));
    }
    if padded.0 < kernel_size.0 || padded.1 < kernel_size.1 {
        return Err(ModelError::ConfigurationError(format!(
            "Input {} is smaller than the {}x{} kernel",
            input_shape, kernel_size.0, kernel_size.1
        )));
    }
    Ok(())
}

/// Validates the input dimension of a dense layer.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if the dimension is 0.
pub(super) fn validate_input_dim(input_dim: usize) -> Result<(), ModelError> {
    if input_dim == 0 {
        return Err(ModelError::ConfigurationError(
            "Dense input dimension must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates the deviation of a random perturbation.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if the deviation is NaN or infinite.
pub(super) fn validate_deviation(deviation: f32) -> Result<(), ModelError> {
    if !deviation.is_finite() {
        return Err(ModelError::ConfigurationError(format!(
            "Perturbation deviation must be finite, got {}",
            deviation
        )));
    }
    Ok(())
}
