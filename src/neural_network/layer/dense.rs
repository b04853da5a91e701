use super::helper_function::parameter_rng;
use super::input_validation_function::{validate_deviation, validate_input_dim};
use crate::ModelError;
use crate::neural_network::neural_network_trait::Layer;
use crate::neural_network::{Activation, ActivationOutput, Matrix, Vector};
use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// Dense (fully connected) layer computing `activation(W·x + b)`.
///
/// The weight matrix has shape `[neurons, input_dim]` and the bias has length `neurons`. A layer
/// created with `Dense::new` is unbound: its input dimension is inferred when it is added to a
/// `Sequential` model after another layer.
///
/// Weights are drawn uniformly from `[-1, 1]` and scaled by `sqrt(2 / input_dim)` for ReLU
/// layers and `1 / sqrt(input_dim)` otherwise; bias entries are drawn from `[-1, 1]`.
///
/// # Example
/// ```rust
/// use rustynet::neural_network::*;
/// use ndarray::array;
///
/// let mut layer = Dense::with_input(3, 2, Activation::ReLU).with_seed(7);
/// let output = layer.compute_output(&array![1.0, -2.0, 0.5]).unwrap();
/// assert_eq!(output.len(), 2);
/// assert!(output.iter().all(|&v| v >= 0.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    neurons: usize,
    input_dim: Option<usize>,
    activation: Activation,
    seed: Option<u64>,
    weights: Matrix,
    bias: Vector,
    #[serde(skip)]
    cache: Option<ActivationOutput>,
}

impl Dense {
    /// Creates an unbound dense layer.
    ///
    /// # Parameters
    ///
    /// - `neurons` - Number of output units
    /// - `activation` - Activation applied to the raw output
    pub fn new(neurons: usize, activation: Activation) -> Self {
        Dense {
            neurons,
            input_dim: None,
            activation,
            seed: None,
            weights: Array2::zeros((neurons, 0)),
            bias: Array1::zeros(neurons),
            cache: None,
        }
    }

    /// Creates a dense layer bound to an explicit input dimension, as required for the first
    /// layer of a model.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Length of the input vector
    /// - `neurons` - Number of output units
    /// - `activation` - Activation applied to the raw output
    pub fn with_input(input_dim: usize, neurons: usize, activation: Activation) -> Self {
        let mut layer = Dense::new(neurons, activation);
        layer.input_dim = Some(input_dim);
        layer.initialize(input_dim);
        layer
    }

    /// Sets the seed used for parameter initialization. A bound layer is re-initialized.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        if let Some(input_dim) = self.input_dim {
            self.initialize(input_dim);
        }
        self
    }

    /// Binds the layer to an input dimension.
    ///
    /// Parameters are kept when the layer is already bound to the same dimension and their shapes
    /// fit it, otherwise they are freshly initialized.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If `input_dim` is 0
    pub fn bind(&mut self, input_dim: usize) -> Result<(), ModelError> {
        validate_input_dim(input_dim)?;
        if self.input_dim != Some(input_dim)
            || self.weights.dim() != (self.neurons, input_dim)
            || self.bias.len() != self.neurons
        {
            self.initialize(input_dim);
        }
        self.input_dim = Some(input_dim);
        self.cache = None;
        Ok(())
    }

    fn initialize(&mut self, input_dim: usize) {
        let mut rng = parameter_rng(self.seed);
        let unit = Uniform::new(-1.0f32, 1.0);
        let scale = match self.activation {
            Activation::ReLU => (2.0 / input_dim as f32).sqrt(),
            _ => 1.0 / (input_dim as f32).sqrt(),
        };

        self.weights = Array2::random_using((self.neurons, input_dim), unit, &mut rng) * scale;
        self.bias = Array1::random_using(self.neurons, unit, &mut rng);
        self.cache = None;
    }

    /// Forward pass for a single sample.
    ///
    /// Computes `raw = W·x + b`, applies the activation and caches the activated value together
    /// with its derivative for backpropagation.
    ///
    /// # Parameters
    ///
    /// * `input` - Input vector of length `input_dim`
    ///
    /// # Returns
    ///
    /// - `Ok(Vector)` - The activated output of length `neurons`
    /// - `Err(ModelError::ConfigurationError)` - If the layer is unbound
    /// - `Err(ModelError::ShapeMismatch)` - If the input length differs from `input_dim`
    pub fn compute_output(&mut self, input: &Vector) -> Result<Vector, ModelError> {
        let input_dim = self.input_dim.ok_or_else(|| {
            ModelError::ConfigurationError("Dense layer has no input size".to_string())
        })?;
        if input.len() != input_dim {
            return Err(ModelError::ShapeMismatch(format!(
                "Dense layer expects an input of length {}, got {}",
                input_dim,
                input.len()
            )));
        }

        let raw = self.weights.dot(input) + &self.bias;
        let output = self.activation.compute(&raw);
        let value = output.value.clone();
        self.cache = Some(output);
        Ok(value)
    }

    /// Replaces the layer parameters.
    ///
    /// An unbound layer becomes bound to `weights.ncols()`.
    ///
    /// # Errors
    ///
    /// - `ModelError::ShapeMismatch` - If `weights` is not `[neurons, input_dim]` or `bias` is not
    ///   of length `neurons`
    pub fn set_weights(&mut self, weights: Matrix, bias: Vector) -> Result<(), ModelError> {
        let expected_cols = self.input_dim.unwrap_or(weights.ncols());
        validate_input_dim(expected_cols)?;
        if weights.dim() != (self.neurons, expected_cols) || bias.len() != self.neurons {
            return Err(ModelError::ShapeMismatch(format!(
                "Expected weights of shape ({}, {}) and bias of length {}, got {:?} and {}",
                self.neurons,
                expected_cols,
                self.neurons,
                weights.dim(),
                bias.len()
            )));
        }
        self.input_dim = Some(expected_cols);
        self.weights = weights;
        self.bias = bias;
        self.cache = None;
        Ok(())
    }

    pub fn neurons(&self) -> usize {
        self.neurons
    }

    pub fn input_dim(&self) -> Option<usize> {
        self.input_dim
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Weight matrix of shape `[neurons, input_dim]`
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn bias(&self) -> &Vector {
        &self.bias
    }

    /// Activated output of the last forward pass
    pub fn value(&self) -> Option<&Vector> {
        self.cache.as_ref().map(|c| &c.value)
    }

    /// Activation derivative of the last forward pass
    pub fn derivative(&self) -> Option<&Vector> {
        self.cache.as_ref().map(|c| &c.derivative)
    }

    pub(crate) fn forward_cache(&self) -> Result<&ActivationOutput, ModelError> {
        self.cache.as_ref().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })
    }

    /// `W -= step·ΔW`, `b -= step·Δb`
    pub(crate) fn apply_gradients(&mut self, weights: &Matrix, bias: &Vector, step: f32) {
        self.weights.scaled_add(-step, weights);
        self.bias.scaled_add(-step, bias);
    }
}

impl Layer for Dense {
    fn layer_type(&self) -> &str {
        "Dense"
    }

    fn output_shape(&self) -> String {
        format!("({})", self.neurons)
    }

    fn param_count(&self) -> usize {
        match self.input_dim {
            Some(input_dim) => self.neurons * input_dim + self.neurons,
            None => 0,
        }
    }

    fn activation(&self) -> Activation {
        self.activation
    }

    fn is_ready(&self) -> bool {
        self.input_dim.is_some()
    }

    fn input_size(&self) -> usize {
        self.input_dim.unwrap_or(0)
    }

    fn output_size(&self) -> usize {
        self.neurons
    }

    fn randomize(&mut self, deviation: f32) -> Result<(), ModelError> {
        validate_deviation(deviation)?;
        let mut rng = parameter_rng(None);
        let noise = Uniform::new_inclusive(-deviation.abs(), deviation.abs());
        let weight_noise = Array2::random_using(self.weights.raw_dim(), noise, &mut rng);
        let bias_noise = Array1::random_using(self.bias.raw_dim(), noise, &mut rng);
        self.weights += &weight_noise;
        self.bias += &bias_noise;
        Ok(())
    }
}
