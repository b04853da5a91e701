use crate::ModelError;
use crate::neural_network::layer::helper_function::{convolve_valid, rotate_180, unpad, unpool, zero_pad};
use crate::neural_network::neural_network_trait::Layer;
use crate::neural_network::{
    Conv2D, LossFunction, Matrix, OutputHead, Sequential, TrainingOptions, Vector,
};
use ndarray::{Array1, Array2, Axis};

/// Accumulated gradients of one dense layer
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGradient {
    /// Same shape as the layer's weight matrix, `[neurons, input_dim]`
    pub weights: Matrix,
    pub bias: Vector,
}

/// Accumulated gradients of one conv layer, indexed `[filter][input_channel]`
#[derive(Debug, Clone, PartialEq)]
pub struct ConvGradient {
    pub filters: Vec<Vec<Matrix>>,
}

/// Gradient-descent optimizer bound to one `Sequential` model.
///
/// The optimizer owns gradient accumulators shaped like the model's parameters. Gradients of
/// consecutive samples are summed by `backpropagate` until `fix` applies them and `zero_grad`
/// clears them, which is how minibatches are formed.
///
/// Every operation that takes the model first checks that the accumulators still mirror it; a
/// model whose layers changed after the optimizer was created needs a new optimizer.
///
/// # Example
/// ```rust
/// use rustynet::neural_network::*;
/// use ndarray::array;
///
/// let mut model = Sequential::new();
/// model.add(Dense::with_input(2, 1, Activation::Linear).with_seed(1)).unwrap();
///
/// let mut optimizer = Optimizer::new(&model, LossFunction::MeanSquaredError).unwrap();
/// let input = array![1.0, 2.0];
/// let label = array![0.5];
///
/// let guess = model.feed_forward(&input).unwrap();
/// let before = optimizer.compute_loss(&guess, &label).unwrap();
/// let deriv = optimizer.compute_loss_deriv(&model, &guess, &label).unwrap();
/// optimizer.backpropagate(&model, &input, &deriv).unwrap();
/// optimizer.fix(&mut model, &TrainingOptions::new(0.05, 1, 1)).unwrap();
/// optimizer.zero_grad();
///
/// let after = optimizer.compute_loss(&model.feed_forward(&input).unwrap(), &label).unwrap();
/// assert!(after < before);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Optimizer {
    loss: LossFunction,
    head: OutputHead,
    dense_gradients: Vec<DenseGradient>,
    conv_gradients: Vec<ConvGradient>,
}

impl Optimizer {
    /// Creates an optimizer for `model` with zeroed accumulators.
    ///
    /// # Parameters
    ///
    /// - `model` - The model whose parameters will be trained
    /// - `loss` - Loss function to minimise
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If `loss` is cross entropy and the last dense layer does
    ///   not use softmax
    pub fn new(model: &Sequential, loss: LossFunction) -> Result<Self, ModelError> {
        let head = loss.head(model.final_activation())?;

        let dense_gradients = model
            .dense_layers()
            .iter()
            .map(|dense| DenseGradient {
                weights: Array2::zeros(dense.weights().raw_dim()),
                bias: Array1::zeros(dense.bias().len()),
            })
            .collect();

        let conv_gradients = model
            .conv_layers()
            .iter()
            .map(|conv| ConvGradient {
                filters: conv
                    .filters()
                    .iter()
                    .map(|filter| {
                        filter
                            .kernels()
                            .iter()
                            .map(|kernel| Array2::zeros(kernel.raw_dim()))
                            .collect()
                    })
                    .collect(),
            })
            .collect();

        Ok(Optimizer {
            loss,
            head,
            dense_gradients,
            conv_gradients,
        })
    }

    pub fn loss(&self) -> LossFunction {
        self.loss
    }

    pub fn head(&self) -> OutputHead {
        self.head
    }

    pub fn dense_gradients(&self) -> &[DenseGradient] {
        &self.dense_gradients
    }

    pub fn conv_gradients(&self) -> &[ConvGradient] {
        &self.conv_gradients
    }

    /// Checks that the accumulators and the output head still match `model`.
    pub fn is_bound_to(&self, model: &Sequential) -> bool {
        let dense = model.dense_layers();
        let conv = model.conv_layers();

        let dense_match = dense.len() == self.dense_gradients.len()
            && dense.iter().zip(&self.dense_gradients).all(|(layer, grad)| {
                layer.weights().dim() == grad.weights.dim() && layer.bias().len() == grad.bias.len()
            });

        let conv_match = conv.len() == self.conv_gradients.len()
            && conv.iter().zip(&self.conv_gradients).all(|(layer, grad)| {
                layer.filters().len() == grad.filters.len()
                    && layer.filters().iter().zip(&grad.filters).all(|(filter, kernels)| {
                        filter.kernels().len() == kernels.len()
                            && filter
                                .kernels()
                                .iter()
                                .zip(kernels)
                                .all(|(k, g)| k.dim() == g.dim())
                    })
            });

        dense_match && conv_match && self.loss.head(model.final_activation()).ok() == Some(self.head)
    }

    fn ensure_bound(&self, model: &Sequential) -> Result<(), ModelError> {
        if !self.is_bound_to(model) {
            return Err(ModelError::ConfigurationError(
                "Optimizer does not match the model's layers".to_string(),
            ));
        }
        Ok(())
    }

    /// Computes the loss of one prediction with the configured loss function.
    pub fn compute_loss(&self, guess: &Vector, label: &Vector) -> Result<f32, ModelError> {
        self.loss.compute_loss(guess, label)
    }

    /// Computes the loss derivative for the last forward pass of `model`.
    ///
    /// For a model ending in a dense layer this is the derivative with respect to that layer's
    /// pre-activation output; for a conv-only model it is the derivative with respect to the last
    /// conv layer's pooled output.
    ///
    /// # Parameters
    ///
    /// - `model` - The model that produced `guess`
    /// - `guess` - Output of the last forward pass
    /// - `label` - Expected output
    ///
    /// # Returns
    ///
    /// - `Ok(Vector)` - The loss derivative
    /// - `Err(ModelError)` - If the optimizer is not bound to `model`, lengths differ, or no
    ///   forward pass has been run
    pub fn compute_loss_deriv(
        &self,
        model: &Sequential,
        guess: &Vector,
        label: &Vector,
    ) -> Result<Vector, ModelError> {
        self.ensure_bound(model)?;

        let final_derivative = if self.head.needs_final_derivative() {
            let last = model.dense_layers().last().copied().ok_or_else(|| {
                ModelError::ConfigurationError("Model has no dense layer".to_string())
            })?;
            Some(&last.forward_cache()?.derivative)
        } else {
            None
        };

        self.head.derivative(guess, label, final_derivative)
    }

    /// Backpropagates one sample and adds its gradients to the accumulators.
    ///
    /// Reads the forward caches of every layer, so `model.feed_forward(input)` must have been
    /// the last forward pass.
    ///
    /// # Parameters
    ///
    /// - `model` - The model, holding the forward caches of `input`
    /// - `input` - The sample that was fed forward
    /// - `loss_deriv` - Loss derivative from `compute_loss_deriv`
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If the optimizer is not bound to `model`
    /// - `ModelError::ShapeMismatch` - If `loss_deriv` or `input` do not fit the model
    /// - `ModelError::ProcessingError` - If a layer has no forward cache
    pub fn backpropagate(
        &mut self,
        model: &Sequential,
        input: &Vector,
        loss_deriv: &Vector,
    ) -> Result<(), ModelError> {
        self.ensure_bound(model)?;

        let layers = model.layers();
        if layers.is_empty() {
            return Ok(());
        }
        if loss_deriv.len() != model.output_size() {
            return Err(ModelError::ShapeMismatch(format!(
                "Loss derivative has length {}, the model outputs {}",
                loss_deriv.len(),
                model.output_size()
            )));
        }
        if input.len() != layers[0].input_size() {
            return Err(ModelError::ShapeMismatch(format!(
                "Model expects an input of length {}, got {}",
                layers[0].input_size(),
                input.len()
            )));
        }

        let orientation = model.orientation();
        let conv_layers = model.conv_layers();
        let dense_layers = model.dense_layers();
        let mut error = loss_deriv.clone();

        for (i, dense) in dense_layers.iter().enumerate().rev() {
            let previous_value = if i > 0 {
                dense_layers[i - 1].forward_cache()?.value.clone()
            } else if let Some(conv) = conv_layers.last() {
                conv.flattened_output(orientation)?
            } else {
                input.clone()
            };

            let gradient = &mut self.dense_gradients[i];
            gradient.weights += &outer(&error, &previous_value);
            gradient.bias += &error;

            if i > 0 {
                let derivative = &dense_layers[i - 1].forward_cache()?.derivative;
                error = dense.weights().t().dot(&error) * derivative;
            } else if !conv_layers.is_empty() {
                error = dense.weights().t().dot(&error);
            }
        }

        let Some(last_conv) = conv_layers.last() else {
            return Ok(());
        };
        let mut pooled_error = last_conv.to_error_volume(&error, orientation)?;

        for (i, conv) in conv_layers.iter().enumerate().rev() {
            let cache = conv.forward_cache()?;

            let channel_error: Vec<Matrix> = pooled_error
                .iter()
                .zip(&cache.output)
                .zip(&cache.derivative)
                .map(|((err, value), derivative)| {
                    unpool(err.view(), value.view(), conv.pooling(), conv.pool_stride()) * derivative
                })
                .collect();

            for (filter_grad, err) in self.conv_gradients[i].filters.iter_mut().zip(&channel_error) {
                for (kernel_grad, channel) in filter_grad.iter_mut().zip(&cache.padded_input) {
                    *kernel_grad += &convolve_valid(channel.view(), err.view());
                }
            }

            if i > 0 {
                pooled_error = input_error(conv, &channel_error)?;
            }
        }

        Ok(())
    }

    /// Applies the accumulated gradients to the model.
    ///
    /// With a regularization factor `r` every accumulated gradient becomes `Δ + r·Δ` before it is
    /// scaled by the learning rate and subtracted from its parameter. The accumulators are left
    /// untouched; call `zero_grad` before the next minibatch.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If the optimizer is not bound to `model`
    pub fn fix(&self, model: &mut Sequential, options: &TrainingOptions) -> Result<(), ModelError> {
        self.ensure_bound(model)?;

        let regularization = options.regularization.unwrap_or(0.0);
        let step = (1.0 + regularization) * options.learning_rate;

        for (dense, gradient) in model.dense_layers_mut().zip(&self.dense_gradients) {
            dense.apply_gradients(&gradient.weights, &gradient.bias, step);
        }
        for (conv, gradient) in model.conv_layers_mut().zip(&self.conv_gradients) {
            for (filter, kernels) in conv.filters_mut().iter_mut().zip(&gradient.filters) {
                filter.fix(kernels, step)?;
            }
        }

        Ok(())
    }

    /// Resets every accumulator to zero.
    pub fn zero_grad(&mut self) {
        for gradient in &mut self.dense_gradients {
            gradient.weights.fill(0.0);
            gradient.bias.fill(0.0);
        }
        for gradient in &mut self.conv_gradients {
            gradient
                .filters
                .iter_mut()
                .flatten()
                .for_each(|kernel| kernel.fill(0.0));
        }
    }
}

/// `a ⊗ b`, shape `[a.len(), b.len()]`
fn outer(a: &Vector, b: &Vector) -> Matrix {
    let column = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    column.dot(&row)
}

/// Error of the previous layer's pooled output given this layer's per-filter error.
///
/// Each input channel receives the sum over filters of the full correlation of the filter error
/// with the 180° rotated kernel for that channel, i.e. the valid correlation of the error padded
/// by `kernel - 1` on every side. Rows and columns that belong to this layer's zero padding are
/// cut off again.
fn input_error(conv: &Conv2D, channel_error: &[Matrix]) -> Result<Vec<Matrix>, ModelError> {
    let unbound = || ModelError::ConfigurationError("Conv layer has no input shape".to_string());
    let input_shape = conv.input_shape().ok_or_else(unbound)?;
    let pads = conv.pad_layers().ok_or_else(unbound)?;
    let (kh, kw) = conv.kernel_size();

    let padded_error: Vec<Matrix> = channel_error
        .iter()
        .map(|err| zero_pad(err.view(), kh - 1, kh - 1, kw - 1, kw - 1))
        .collect();

    let mut result = Vec::with_capacity(input_shape.channels);
    for channel in 0..input_shape.channels {
        let mut sum: Option<Matrix> = None;
        for (filter, err) in conv.filters().iter().zip(&padded_error) {
            let contribution = convolve_valid(err.view(), rotate_180(filter.kernels()[channel].view()).view());
            sum = Some(match sum {
                Some(acc) => acc + &contribution,
                None => contribution,
            });
        }
        let full = sum.ok_or_else(|| {
            ModelError::ProcessingError("Conv layer has no filters".to_string())
        })?;
        result.push(unpad(
            full.view(),
            pads.top,
            pads.left,
            input_shape.height,
            input_shape.width,
        ));
    }

    Ok(result)
}
