//! A from-scratch neural network trainer.
//!
//! `rustynet` builds a linear stack of convolutional and fully connected layers, runs forward
//! inference, computes losses, backpropagates gradients by hand through dense, convolution,
//! padding and pooling stages, and applies minibatched gradient-descent updates with optional
//! regularization.

/// Error types shared by the whole crate.
pub mod error;

pub use error::{IoError, ModelError};

/// Components for building and training sequential neural networks.
///
/// This module provides the numerical training engine: activation functions and their
/// derivatives, dense layers, convolutional layers with padding and pooling, the filter
/// (convolution kernel stack) primitive, the loss functions and the optimizer that performs
/// backpropagation and parameter updates.
///
/// # Core Components
///
/// ## Layer Types
/// - **Dense**: Fully connected layer, `activation(W·x + b)`
/// - **Conv2D**: Convolutional layer owning a set of `Filter`s, with `Valid`/`Same` padding and
///   optional max or average pooling
///
/// ## Activation Functions
/// Sigmoid, ReLU, Tanh, Softplus, BinaryStep, Softmax and Linear, each producing values and
/// derivatives in one pass
///
/// ## Loss Functions
/// - **MeanSquaredError**: For regression tasks
/// - **CrossEntropy**: For classification tasks ending in a softmax layer
///
/// ## Model Architecture
/// - **Sequential**: Conv layers followed by dense layers, with volume reshaping at the boundary
/// - **Optimizer**: Per-parameter gradient accumulators, backpropagation and updates
///
/// # Examples
/// ```rust
/// use rustynet::neural_network::*;
/// use ndarray::array;
///
/// let inputs = vec![array![0.0, 0.0], array![0.0, 1.0], array![1.0, 0.0], array![1.0, 1.0]];
/// let labels = vec![array![0.0], array![1.0], array![1.0], array![0.0]];
///
/// let mut model = Sequential::new();
/// model
///     .add(Dense::with_input(2, 3, Activation::Sigmoid))
///     .unwrap()
///     .add(Dense::new(1, Activation::Linear))
///     .unwrap()
///     .optimizer(LossFunction::MeanSquaredError)
///     .unwrap();
///
/// let options = TrainingOptions::new(0.1, 1, 10).with_progress(false);
/// model.fit(&inputs, &labels, &options).unwrap();
///
/// let prediction = model.feed_forward(&inputs[1]).unwrap();
/// assert_eq!(prediction.len(), 1);
/// ```
pub mod neural_network;

/// A convenience module that re-exports the most commonly used types of this crate.
pub mod prelude;
