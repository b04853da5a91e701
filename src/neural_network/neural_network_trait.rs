use crate::ModelError;
use crate::neural_network::Activation;

/// Defines the read-only capabilities shared by every layer of a sequential model.
///
/// The model and its consumers (summaries, visualisation, persistence) use this interface to
/// inspect a layer without branching on its concrete type.
pub trait Layer {
    /// Returns the type name of the layer (e.g. "Dense").
    ///
    /// # Returns
    ///
    /// * `&str` - A string slice representing the layer type
    fn layer_type(&self) -> &str {
        "Unknown"
    }

    /// Returns a description of the output shape of the layer.
    ///
    /// # Returns
    ///
    /// - `String` - A string describing the output dimensions, or "Unbound" before the layer
    ///   has an input shape
    fn output_shape(&self) -> String {
        "Unknown".to_string()
    }

    /// Returns the total number of trainable parameters in the layer.
    fn param_count(&self) -> usize;

    /// Activation applied to the layer's raw output
    fn activation(&self) -> Activation;

    /// Whether the layer has been bound to an input shape and owns its parameters
    fn is_ready(&self) -> bool;

    /// Length of the flat input this layer accepts, 0 while unbound
    fn input_size(&self) -> usize;

    /// Length of the flat output this layer produces (after pooling), 0 while unbound
    fn output_size(&self) -> usize;

    /// Perturbs every parameter by a uniform draw in `[-deviation, deviation]`.
    ///
    /// # Parameters
    ///
    /// * `deviation` - Maximum absolute perturbation
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If `deviation` is not finite; no parameter is changed
    fn randomize(&mut self, deviation: f32) -> Result<(), ModelError>;
}
