use super::helper_function::{
    flatten_volume, parameter_rng, pool, pooled_dim, split_volume, to_matrix, zero_pad,
};
use super::input_validation_function::*;
use super::{Filter, Orientation, PadLayers, PaddingType, PoolingType, VolumeShape};
use crate::ModelError;
use crate::neural_network::neural_network_trait::Layer;
use crate::neural_network::{Activation, Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Shapes derived when a conv layer is bound to an input volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvGeometry {
    /// Activated output before pooling, `channels == filter_count`
    pub output_shape: VolumeShape,
    /// Output after pooling
    pub pooled_output_shape: VolumeShape,
    /// Zero padding applied to every input channel
    pub pad_layers: PadLayers,
}

/// Forward intermediates of the last `compute_output` call, one matrix per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2DCache {
    /// Input channels after zero padding
    pub padded_input: Vec<Matrix>,
    /// Activated output before pooling, one matrix per filter
    pub output: Vec<Matrix>,
    /// Activation derivative, one matrix per filter
    pub derivative: Vec<Matrix>,
    /// Pooled output, one matrix per filter
    pub pooled_output: Vec<Matrix>,
}

/// 2D convolutional layer (stride 1) with optional zero padding and pooling.
///
/// Each of the `filter_count` filters correlates the whole input volume with one kernel per
/// input channel and produces one output channel. The raw output of a filter is activated,
/// then pooled with non-overlapping `pool_stride x pool_stride` windows.
///
/// A layer created with `Conv2D::new` is unbound. It becomes ready once `bind` (or adding it to
/// a `Sequential` model) fixes its input shape, which creates the filters and derives
/// `output_shape`, `pooled_output_shape` and `pad_layers`.
///
/// # Example
/// ```rust
/// use rustynet::neural_network::*;
///
/// let layer = Conv2D::with_input(VolumeShape::new(5, 5, 1), 2, (3, 3), Activation::ReLU).unwrap();
/// assert_eq!(layer.output_volume_shape(), Some(VolumeShape::new(3, 3, 2)));
///
/// let mut same = Conv2D::new(2, (3, 3), Activation::ReLU)
///     .with_padding(PaddingType::Same)
///     .with_pooling(PoolingType::Max, 2);
/// same.bind(VolumeShape::new(5, 5, 1)).unwrap();
/// assert_eq!(same.output_volume_shape(), Some(VolumeShape::new(5, 5, 2)));
/// assert_eq!(same.pooled_output_shape(), Some(VolumeShape::new(2, 2, 2)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2D {
    filter_count: usize,
    kernel_size: (usize, usize),
    activation: Activation,
    padding: PaddingType,
    pooling: PoolingType,
    pool_stride: usize,
    seed: Option<u64>,
    input_shape: Option<VolumeShape>,
    filters: Vec<Filter>,
    geometry: Option<ConvGeometry>,
    #[serde(skip)]
    cache: Option<Conv2DCache>,
}

impl Conv2D {
    /// Creates an unbound conv layer with `Valid` padding and no pooling.
    ///
    /// # Parameters
    ///
    /// - `filter_count` - Number of filters, i.e. output channels
    /// - `kernel_size` - Kernel height and width
    /// - `activation` - Activation applied to every raw output channel
    pub fn new(filter_count: usize, kernel_size: (usize, usize), activation: Activation) -> Self {
        Conv2D {
            filter_count,
            kernel_size,
            activation,
            padding: PaddingType::Valid,
            pooling: PoolingType::None,
            pool_stride: 1,
            seed: None,
            input_shape: None,
            filters: Vec::new(),
            geometry: None,
            cache: None,
        }
    }

    /// Creates a conv layer and binds it to `input_shape` right away.
    ///
    /// # Errors
    ///
    /// Same as `bind`.
    pub fn with_input(
        input_shape: VolumeShape,
        filter_count: usize,
        kernel_size: (usize, usize),
        activation: Activation,
    ) -> Result<Self, ModelError> {
        let mut layer = Conv2D::new(filter_count, kernel_size, activation);
        layer.bind(input_shape)?;
        Ok(layer)
    }

    /// Records the input shape of a first layer. The layer is bound when added to a model.
    pub fn with_input_shape(mut self, input_shape: VolumeShape) -> Self {
        self.input_shape = Some(input_shape);
        self.unbind();
        self
    }

    pub fn with_padding(mut self, padding: PaddingType) -> Self {
        self.padding = padding;
        self.unbind();
        self
    }

    pub fn with_pooling(mut self, pooling: PoolingType, stride: usize) -> Self {
        self.pooling = pooling;
        self.pool_stride = stride;
        self.unbind();
        self
    }

    /// Sets the seed used for filter initialization; existing filters are discarded.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.filters.clear();
        self.unbind();
        self
    }

    fn unbind(&mut self) {
        self.geometry = None;
        self.cache = None;
    }

    /// Binds the layer to an input volume shape.
    ///
    /// Derives the padding, the activated output shape and the pooled output shape. Filters are
    /// created unless the existing ones already match the kernel size and channel count.
    ///
    /// # Parameters
    ///
    /// * `input_shape` - Shape of the input volume
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The layer is ready
    /// - `Err(ModelError::ConfigurationError)` - If the filter count, a kernel dimension, the pooling
    ///   stride or an input dimension is zero, if the padded input is smaller than the kernel, or if
    ///   pooling leaves an empty output
    pub fn bind(&mut self, input_shape: VolumeShape) -> Result<(), ModelError> {
        validate_filters(self.filter_count)?;
        validate_kernel_size_2d(self.kernel_size)?;
        validate_pool_stride(self.pool_stride)?;

        let (kh, kw) = self.kernel_size;
        let pad_layers = PadLayers::for_padding(self.padding, self.kernel_size);
        let padded = (
            input_shape.height + pad_layers.vertical(),
            input_shape.width + pad_layers.horizontal(),
        );
        validate_input_shape_2d(input_shape, padded, self.kernel_size)?;

        let output_shape = VolumeShape::new(padded.0 - kh + 1, padded.1 - kw + 1, self.filter_count);
        let (pooled_height, pooled_width) = match self.pooling {
            PoolingType::None => (output_shape.height, output_shape.width),
            _ => pooled_dim(output_shape.height, output_shape.width, self.pool_stride),
        };
        if pooled_height == 0 || pooled_width == 0 {
            return Err(ModelError::ConfigurationError(format!(
                "Pooling stride {} leaves no output for a convolution output of {}",
                self.pool_stride, output_shape
            )));
        }

        let filters_match = self.filters.len() == self.filter_count
            && self
                .filters
                .iter()
                .all(|f| {
                    f.shape() == (kh, kw, input_shape.channels)
                        && f.kernels().iter().all(|k| k.dim() == (kh, kw))
                });
        if !filters_match {
            let mut rng = parameter_rng(self.seed);
            self.filters = (0..self.filter_count)
                .map(|_| Filter::new(self.kernel_size, input_shape.channels, &mut rng))
                .collect();
        }

        self.input_shape = Some(input_shape);
        self.geometry = Some(ConvGeometry {
            output_shape,
            pooled_output_shape: VolumeShape::new(pooled_height, pooled_width, self.filter_count),
            pad_layers,
        });
        self.cache = None;
        Ok(())
    }

    /// Changes the padding mode and re-derives the shapes of a bound layer.
    ///
    /// The layer is left unchanged when the new configuration does not fit its input.
    pub fn set_padding(&mut self, padding: PaddingType) -> Result<(), ModelError> {
        let mut updated = self.clone();
        updated.padding = padding;
        updated.rebind()?;
        *self = updated;
        Ok(())
    }

    /// Changes the pooling mode and stride and re-derives the shapes of a bound layer.
    ///
    /// The layer is left unchanged when the new configuration does not fit its input.
    pub fn set_pooling(&mut self, pooling: PoolingType, stride: usize) -> Result<(), ModelError> {
        let mut updated = self.clone();
        updated.pooling = pooling;
        updated.pool_stride = stride;
        updated.rebind()?;
        *self = updated;
        Ok(())
    }

    fn rebind(&mut self) -> Result<(), ModelError> {
        match self.input_shape {
            Some(shape) => self.bind(shape),
            None => {
                validate_pool_stride(self.pool_stride)?;
                self.unbind();
                Ok(())
            }
        }
    }

    /// Replaces the filters of a bound layer.
    ///
    /// # Errors
    ///
    /// - `ModelError::ShapeMismatch` - If the number of filters or any filter shape differs from
    ///   the layer's `(kh, kw, input_channels)`
    /// - `ModelError::ConfigurationError` - If the layer is unbound
    pub fn set_filters(&mut self, filters: Vec<Filter>) -> Result<(), ModelError> {
        let input_shape = self.input_shape.filter(|_| self.geometry.is_some()).ok_or_else(unbound)?;
        let expected = (self.kernel_size.0, self.kernel_size.1, input_shape.channels);
        if filters.len() != self.filter_count || filters.iter().any(|f| f.shape() != expected) {
            return Err(ModelError::ShapeMismatch(format!(
                "Expected {} filters of shape {:?}",
                self.filter_count, expected
            )));
        }
        self.filters = filters;
        self.cache = None;
        Ok(())
    }

    /// Forward pass for a single sample.
    ///
    /// Pads every input channel, convolves the padded volume with each filter, activates the
    /// flattened result, reshapes it back to 2D and pools it. The padded input and every
    /// intermediate are cached for backpropagation.
    ///
    /// # Parameters
    ///
    /// * `input` - Input volume matching the bound input shape
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Matrix>)` - The pooled output, one matrix per filter
    /// - `Err(ModelError::ConfigurationError)` - If the layer is unbound
    /// - `Err(ModelError::ShapeMismatch)` - If the input does not match the bound input shape
    pub fn compute_output(&mut self, input: &[Matrix]) -> Result<Vec<Matrix>, ModelError> {
        let input_shape = self.input_shape.ok_or_else(unbound)?;
        let geometry = self.geometry.ok_or_else(unbound)?;
        if input.len() != input_shape.channels
            || input
                .iter()
                .any(|m| m.dim() != (input_shape.height, input_shape.width))
        {
            return Err(ModelError::ShapeMismatch(format!(
                "Conv layer expects an input volume of shape {}",
                input_shape
            )));
        }

        let pads = geometry.pad_layers;
        let padded_input: Vec<Matrix> = input
            .iter()
            .map(|m| zero_pad(m.view(), pads.top, pads.bottom, pads.left, pads.right))
            .collect();

        let (rows, cols) = (geometry.output_shape.height, geometry.output_shape.width);
        let mut output = Vec::with_capacity(self.filter_count);
        let mut derivative = Vec::with_capacity(self.filter_count);
        let mut pooled_output = Vec::with_capacity(self.filter_count);

        for filter in &self.filters {
            let raw = filter.convolve(&padded_input)?;
            let flat: Vector = raw.iter().cloned().collect();
            let activated = self.activation.compute(&flat);
            let value = to_matrix(&activated.value, rows, cols)?;
            derivative.push(to_matrix(&activated.derivative, rows, cols)?);
            pooled_output.push(pool(value.view(), self.pooling, self.pool_stride));
            output.push(value);
        }

        let result = pooled_output.clone();
        self.cache = Some(Conv2DCache {
            padded_input,
            output,
            derivative,
            pooled_output,
        });
        Ok(result)
    }

    /// Reshapes a flat input vector into this layer's input volume.
    pub fn to_input_volume(
        &self,
        vector: &Vector,
        orientation: Orientation,
    ) -> Result<Vec<Matrix>, ModelError> {
        let shape = self.input_shape.ok_or_else(unbound)?;
        split_volume(vector, shape, orientation)
    }

    /// Reshapes a flat error vector into a volume shaped like the pooled output.
    pub fn to_error_volume(
        &self,
        vector: &Vector,
        orientation: Orientation,
    ) -> Result<Vec<Matrix>, ModelError> {
        let shape = self.pooled_output_shape().ok_or_else(unbound)?;
        split_volume(vector, shape, orientation)
    }

    /// Flattens the cached pooled output of the last forward pass.
    pub fn flattened_output(&self, orientation: Orientation) -> Result<Vector, ModelError> {
        flatten_volume(&self.forward_cache()?.pooled_output, orientation)
    }

    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        self.kernel_size
    }

    pub fn padding(&self) -> PaddingType {
        self.padding
    }

    pub fn pooling(&self) -> PoolingType {
        self.pooling
    }

    pub fn pool_stride(&self) -> usize {
        self.pool_stride
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn input_shape(&self) -> Option<VolumeShape> {
        self.input_shape
    }

    pub fn geometry(&self) -> Option<ConvGeometry> {
        self.geometry
    }

    /// Activated output shape before pooling
    pub fn output_volume_shape(&self) -> Option<VolumeShape> {
        self.geometry.map(|g| g.output_shape)
    }

    pub fn pooled_output_shape(&self) -> Option<VolumeShape> {
        self.geometry.map(|g| g.pooled_output_shape)
    }

    pub fn pad_layers(&self) -> Option<PadLayers> {
        self.geometry.map(|g| g.pad_layers)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub(crate) fn filters_mut(&mut self) -> &mut [Filter] {
        &mut self.filters
    }

    /// Activated (pre-pooling) output channels of the last forward pass
    pub fn output(&self) -> Option<&[Matrix]> {
        self.cache.as_ref().map(|c| c.output.as_slice())
    }

    pub fn derivative(&self) -> Option<&[Matrix]> {
        self.cache.as_ref().map(|c| c.derivative.as_slice())
    }

    pub fn pooled_output(&self) -> Option<&[Matrix]> {
        self.cache.as_ref().map(|c| c.pooled_output.as_slice())
    }

    pub(crate) fn forward_cache(&self) -> Result<&Conv2DCache, ModelError> {
        self.cache.as_ref().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })
    }
}

fn unbound() -> ModelError {
    ModelError::ConfigurationError("Conv layer has no input shape".to_string())
}

impl Layer for Conv2D {
    fn layer_type(&self) -> &str {
        "Conv2D"
    }

    fn output_shape(&self) -> String {
        match self.pooled_output_shape() {
            Some(shape) => shape.to_string(),
            None => "Unbound".to_string(),
        }
    }

    fn param_count(&self) -> usize {
        self.filters.iter().map(|f| f.param_count()).sum()
    }

    fn activation(&self) -> Activation {
        self.activation
    }

    fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }

    fn input_size(&self) -> usize {
        self.input_shape.map(|s| s.size()).unwrap_or(0)
    }

    fn output_size(&self) -> usize {
        self.pooled_output_shape().map(|s| s.size()).unwrap_or(0)
    }

    fn randomize(&mut self, deviation: f32) -> Result<(), ModelError> {
        validate_deviation(deviation)?;
        let mut rng = parameter_rng(None);
        for filter in &mut self.filters {
            filter.randomize(deviation, &mut rng)?;
        }
        Ok(())
    }
}
