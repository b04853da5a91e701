/// Module that contains activation function implementations
pub mod activation;
/// Module that contains neural network layer implementations
pub mod layer;
/// Module that contains loss function implementations
pub mod loss_function;
/// Module that contains the common layer capability trait
pub mod neural_network_trait;
/// Module that contains the backpropagation optimizer
pub mod optimizer;
/// Module that contains implementations for sequential model architecture
pub mod sequential;

pub use activation::*;
pub use layer::*;
pub use loss_function::*;
pub use neural_network_trait::*;
pub use optimizer::*;
pub use sequential::*;

use ndarray::{Array1, Array2};

/// Type alias for flat vectors flowing between dense layers
pub type Vector = Array1<f32>;

/// Type alias for 2D matrices (weights, kernels and single volume channels)
pub type Matrix = Array2<f32>;

/// Type alias for a multi-channel volume, one matrix per channel
pub type Volume = Vec<Matrix>;
