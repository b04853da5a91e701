use crate::ModelError;
use crate::neural_network::Activation;
use crate::neural_network::neural_network_trait::Layer;
use serde::{Deserialize, Serialize};

/// 2D convolutional layer with padding and pooling
pub mod conv_2d;
/// Fully connected layer
pub mod dense;
/// Convolution kernel stack, one kernel per input channel
pub mod filter;
/// Numeric primitives (convolution, padding, pooling, volume reshaping) used by the layers
pub mod helper_function;
mod input_validation_function;
/// Volume flattening orientation
pub mod orientation;
/// Padding modes for convolution
pub mod padding_type;
/// Pooling modes for convolution
pub mod pooling_type;

pub use conv_2d::*;
pub use dense::*;
pub use filter::*;
pub use orientation::*;
pub use padding_type::*;
pub use pooling_type::*;

/// Spatial shape of a multi-channel volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl VolumeShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        VolumeShape {
            height,
            width,
            channels,
        }
    }

    /// Number of scalars in a volume of this shape
    pub fn size(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl std::fmt::Display for VolumeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.height, self.width, self.channels)
    }
}

/// A layer stored in a `Sequential` model.
///
/// Conv layers always precede dense layers in a model; the model checks this when layers are
/// added, so code walking the stack can rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequentialLayer {
    Conv2D(Conv2D),
    Dense(Dense),
}

impl SequentialLayer {
    pub fn as_conv(&self) -> Option<&Conv2D> {
        match self {
            SequentialLayer::Conv2D(conv) => Some(conv),
            SequentialLayer::Dense(_) => None,
        }
    }

    pub fn as_conv_mut(&mut self) -> Option<&mut Conv2D> {
        match self {
            SequentialLayer::Conv2D(conv) => Some(conv),
            SequentialLayer::Dense(_) => None,
        }
    }

    pub fn as_dense(&self) -> Option<&Dense> {
        match self {
            SequentialLayer::Dense(dense) => Some(dense),
            SequentialLayer::Conv2D(_) => None,
        }
    }

    pub fn as_dense_mut(&mut self) -> Option<&mut Dense> {
        match self {
            SequentialLayer::Dense(dense) => Some(dense),
            SequentialLayer::Conv2D(_) => None,
        }
    }

    pub fn is_conv(&self) -> bool {
        matches!(self, SequentialLayer::Conv2D(_))
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, SequentialLayer::Dense(_))
    }

    /// Number of output units (filters for a conv layer, neurons for a dense layer)
    pub fn units(&self) -> usize {
        match self {
            SequentialLayer::Conv2D(conv) => conv.filter_count(),
            SequentialLayer::Dense(dense) => dense.neurons(),
        }
    }

    /// Binds the first layer of a model to its explicit input shape.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If the layer carries no input shape or the shape does
    ///   not fit its configuration
    pub(crate) fn bind_first(&mut self) -> Result<(), ModelError> {
        let missing = || {
            ModelError::ConfigurationError("The first layer must have an input shape".to_string())
        };
        match self {
            SequentialLayer::Conv2D(conv) => {
                let shape = conv.input_shape().ok_or_else(missing)?;
                conv.bind(shape)
            }
            SequentialLayer::Dense(dense) => {
                let input_dim = dense.input_dim().ok_or_else(missing)?;
                dense.bind(input_dim)
            }
        }
    }

    /// Binds this layer to the output of the layer before it.
    ///
    /// A dense layer following a conv layer takes the flattened pooled output of that conv
    /// layer as its input.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If this is a conv layer and `previous` is dense, or
    ///   the derived input does not fit this layer's kernel/pooling configuration
    pub(crate) fn bind_after(&mut self, previous: &SequentialLayer) -> Result<(), ModelError> {
        match (self, previous) {
            (SequentialLayer::Conv2D(_), SequentialLayer::Dense(_)) => {
                Err(ModelError::ConfigurationError(
                    "Cannot add a conv layer after a dense layer".to_string(),
                ))
            }
            (SequentialLayer::Conv2D(conv), SequentialLayer::Conv2D(prev)) => {
                let shape = prev.pooled_output_shape().ok_or_else(unbound_previous)?;
                conv.bind(shape)
            }
            (SequentialLayer::Dense(dense), previous) => {
                if !previous.is_ready() {
                    return Err(unbound_previous());
                }
                dense.bind(previous.output_size())
            }
        }
    }
}

fn unbound_previous() -> ModelError {
    ModelError::ConfigurationError("Previous layer has no input shape".to_string())
}

impl From<Conv2D> for SequentialLayer {
    fn from(conv: Conv2D) -> Self {
        SequentialLayer::Conv2D(conv)
    }
}

impl From<Dense> for SequentialLayer {
    fn from(dense: Dense) -> Self {
        SequentialLayer::Dense(dense)
    }
}

impl Layer for SequentialLayer {
    fn layer_type(&self) -> &str {
        match self {
            SequentialLayer::Conv2D(conv) => conv.layer_type(),
            SequentialLayer::Dense(dense) => dense.layer_type(),
        }
    }

    fn output_shape(&self) -> String {
        match self {
            SequentialLayer::Conv2D(conv) => conv.output_shape(),
            SequentialLayer::Dense(dense) => dense.output_shape(),
        }
    }

    fn param_count(&self) -> usize {
        match self {
            SequentialLayer::Conv2D(conv) => conv.param_count(),
            SequentialLayer::Dense(dense) => dense.param_count(),
        }
    }

    fn activation(&self) -> Activation {
        match self {
            SequentialLayer::Conv2D(conv) => conv.activation(),
            SequentialLayer::Dense(dense) => dense.activation(),
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            SequentialLayer::Conv2D(conv) => conv.is_ready(),
            SequentialLayer::Dense(dense) => dense.is_ready(),
        }
    }

    fn input_size(&self) -> usize {
        match self {
            SequentialLayer::Conv2D(conv) => conv.input_size(),
            SequentialLayer::Dense(dense) => dense.input_size(),
        }
    }

    fn output_size(&self) -> usize {
        match self {
            SequentialLayer::Conv2D(conv) => conv.output_size(),
            SequentialLayer::Dense(dense) => dense.output_size(),
        }
    }

    fn randomize(&mut self, deviation: f32) -> Result<(), ModelError> {
        match self {
            SequentialLayer::Conv2D(conv) => conv.randomize(deviation),
            SequentialLayer::Dense(dense) => dense.randomize(deviation),
        }
    }
}
