use crate::neural_network::layer::helper_function::flatten_volume;
use crate::neural_network::neural_network_trait::Layer;
use crate::neural_network::{
    Activation, Conv2D, Dense, LossFunction, Matrix, Optimizer, Orientation, PaddingType,
    PoolingType, SequentialLayer, Vector,
};
use crate::{IoError, ModelError};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer};
use std::fs::File;
use std::io::{BufWriter, Read, Write};

mod input_validation_function;
/// Training options, status and lifecycle hooks of `fit`
pub mod training_options;

use input_validation_function::validate_training;
pub use training_options::*;

/// A sequential neural network model: zero or more `Conv2D` layers followed by zero or more
/// `Dense` layers.
///
/// Every layer after the first infers its input shape from the previous layer's output. The
/// first layer must carry an explicit input shape (`Dense::with_input` or
/// `Conv2D::with_input_shape`). At the conv/dense boundary the pooled output volume of the last
/// conv layer is flattened according to the model's `Orientation`; a flat model input is
/// reshaped into the first conv layer's input volume the same way.
///
/// # Example
/// ```rust
/// use rustynet::neural_network::*;
/// use ndarray::Array1;
///
/// let mut model = Sequential::new();
/// model
///     .add(Conv2D::new(2, (3, 3), Activation::ReLU).with_input_shape(VolumeShape::new(6, 6, 1)))
///     .unwrap()
///     .pool(PoolingType::Max, 2)
///     .unwrap()
///     .add(Dense::new(3, Activation::Softmax))
///     .unwrap()
///     .optimizer(LossFunction::CrossEntropy)
///     .unwrap();
///
/// let output = model.feed_forward(&Array1::linspace(0.0, 1.0, 36)).unwrap();
/// assert_eq!(output.len(), 3);
/// assert!((output.sum() - 1.0).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequential {
    layers: Vec<SequentialLayer>,
    orientation: Orientation,
    #[serde(skip)]
    optimizer: Option<Optimizer>,
}

impl Sequential {
    /// Creates an empty model with `Horizontal` orientation
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer and binds it to the output of the previous layer.
    ///
    /// # Parameters
    ///
    /// * `layer` - A `Dense` or `Conv2D` layer
    ///
    /// # Returns
    ///
    /// - `Ok(&mut Self)` - The model, for chaining
    /// - `Err(ModelError::ConfigurationError)` - If the layer has no units, a conv layer follows a
    ///   dense layer, the first layer has no input shape, or the inferred input does not fit the
    ///   layer
    pub fn add<L: Into<SequentialLayer>>(&mut self, layer: L) -> Result<&mut Self, ModelError> {
        let mut layer = layer.into();
        if layer.units() == 0 {
            return Err(ModelError::ConfigurationError(format!(
                "Cannot add empty {} layer",
                layer.layer_type()
            )));
        }

        match self.layers.last() {
            Some(previous) => layer.bind_after(previous)?,
            None => layer.bind_first()?,
        }
        self.layers.push(layer);
        Ok(self)
    }

    /// Removes the layer at `index` and re-derives the input shapes of the layers after it.
    ///
    /// The model is left unchanged when a following layer does not fit its new input.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If `index` is out of range or re-binding fails
    pub fn remove(&mut self, index: usize) -> Result<&mut Self, ModelError> {
        if index >= self.layers.len() {
            return Err(ModelError::ConfigurationError(format!(
                "Layer index {} is out of range for a model with {} layers",
                index,
                self.layers.len()
            )));
        }

        let mut layers = self.layers.clone();
        layers.remove(index);
        for i in index..layers.len() {
            if i == 0 {
                layers[0].bind_first()?;
            } else {
                let (before, after) = layers.split_at_mut(i);
                after[0].bind_after(&before[i - 1])?;
            }
        }

        self.layers = layers;
        Ok(self)
    }

    /// Removes the `index`-th dense layer
    pub fn remove_dense(&mut self, index: usize) -> Result<&mut Self, ModelError> {
        let dense_count = self.dense_layers().len();
        if index >= dense_count {
            return Err(ModelError::ConfigurationError(format!(
                "Dense layer index {} is out of range, the model has {} dense layers",
                index, dense_count
            )));
        }
        let offset = self.conv_layers().len();
        self.remove(offset + index)
    }

    /// Removes the `index`-th conv layer
    pub fn remove_conv(&mut self, index: usize) -> Result<&mut Self, ModelError> {
        let conv_count = self.conv_layers().len();
        if index >= conv_count {
            return Err(ModelError::ConfigurationError(format!(
                "Conv layer index {} is out of range, the model has {} conv layers",
                index, conv_count
            )));
        }
        self.remove(index)
    }

    /// Removes every layer
    pub fn clear(&mut self) -> &mut Self {
        self.layers.clear();
        self
    }

    /// Sets the pooling of the last conv layer.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If the model has a dense layer or no conv layer, or the
    ///   pooling does not fit the conv output
    pub fn pool(&mut self, pooling: PoolingType, stride: usize) -> Result<&mut Self, ModelError> {
        self.last_conv_for_update()?.set_pooling(pooling, stride)?;
        Ok(self)
    }

    /// Sets the padding of the last conv layer.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If the model has a dense layer or no conv layer, or the
    ///   padding does not fit the conv input
    pub fn padding(&mut self, padding: PaddingType) -> Result<&mut Self, ModelError> {
        self.last_conv_for_update()?.set_padding(padding)?;
        Ok(self)
    }

    fn last_conv_for_update(&mut self) -> Result<&mut Conv2D, ModelError> {
        if self.layers.iter().any(|layer| layer.is_dense()) {
            return Err(ModelError::ConfigurationError(
                "Cannot reconfigure a conv layer once dense layers have been added".to_string(),
            ));
        }
        self.layers
            .last_mut()
            .and_then(|layer| layer.as_conv_mut())
            .ok_or_else(|| ModelError::ConfigurationError("Model has no conv layer".to_string()))
    }

    /// Sets how volumes are flattened and reshaped at the conv/dense boundary
    pub fn set_orientation(&mut self, orientation: Orientation) -> &mut Self {
        self.orientation = orientation;
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Binds a new optimizer using `loss`.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If the loss cannot be combined with the output layer
    pub fn optimizer(&mut self, loss: LossFunction) -> Result<&mut Self, ModelError> {
        self.optimizer = Some(Optimizer::new(self, loss)?);
        Ok(self)
    }

    /// The optimizer bound with `optimizer`, if any
    pub fn get_optimizer(&self) -> Option<&Optimizer> {
        self.optimizer.as_ref()
    }

    pub fn layers(&self) -> &[SequentialLayer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn conv_layers(&self) -> Vec<&Conv2D> {
        self.layers.iter().filter_map(|layer| layer.as_conv()).collect()
    }

    pub fn dense_layers(&self) -> Vec<&Dense> {
        self.layers.iter().filter_map(|layer| layer.as_dense()).collect()
    }

    pub(crate) fn conv_layers_mut(&mut self) -> impl Iterator<Item = &mut Conv2D> {
        self.layers.iter_mut().filter_map(|layer| layer.as_conv_mut())
    }

    pub(crate) fn dense_layers_mut(&mut self) -> impl Iterator<Item = &mut Dense> {
        self.layers.iter_mut().filter_map(|layer| layer.as_dense_mut())
    }

    /// Activation of the last dense layer, `None` without dense layers
    pub fn final_activation(&self) -> Option<Activation> {
        self.dense_layers().last().map(|dense| dense.activation())
    }

    /// Length of the model input, 0 for an empty model
    pub fn input_size(&self) -> usize {
        self.layers.first().map(|layer| layer.input_size()).unwrap_or(0)
    }

    /// Length of the model output, 0 for an empty model
    pub fn output_size(&self) -> usize {
        self.layers.last().map(|layer| layer.output_size()).unwrap_or(0)
    }

    /// Cached activated (pre-pooling) output channels of the `index`-th conv layer.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If there is no such conv layer
    /// - `ModelError::ProcessingError` - If no forward pass has been run
    pub fn feature_maps(&self, index: usize) -> Result<&[Matrix], ModelError> {
        let conv = self
            .layers
            .iter()
            .filter_map(|layer| layer.as_conv())
            .nth(index)
            .ok_or_else(|| {
                ModelError::ConfigurationError(format!("Model has no conv layer {}", index))
            })?;
        conv.output().ok_or_else(|| {
            ModelError::ProcessingError("Forward pass has not been run".to_string())
        })
    }

    /// Runs one sample through every layer.
    ///
    /// A model without layers returns its input unchanged.
    ///
    /// # Parameters
    ///
    /// * `input` - Flat input vector, reshaped into a volume when the first layer is a conv layer
    ///
    /// # Returns
    ///
    /// - `Ok(Vector)` - The model output; the flattened pooled output for a conv-only model
    /// - `Err(ModelError::ShapeMismatch)` - If the input length differs from the model input size
    pub fn feed_forward(&mut self, input: &Vector) -> Result<Vector, ModelError> {
        if self.layers.is_empty() {
            return Ok(input.clone());
        }
        let expected = self.input_size();
        if input.len() != expected {
            return Err(ModelError::ShapeMismatch(format!(
                "Model expects an input of length {}, got {}",
                expected,
                input.len()
            )));
        }

        let orientation = self.orientation;
        let mut vector = input.clone();
        let mut volume: Option<Vec<Matrix>> = None;

        for layer in &mut self.layers {
            match layer {
                SequentialLayer::Conv2D(conv) => {
                    let conv_input = match volume.take() {
                        Some(volume) => volume,
                        None => conv.to_input_volume(&vector, orientation)?,
                    };
                    volume = Some(conv.compute_output(&conv_input)?);
                }
                SequentialLayer::Dense(dense) => {
                    if let Some(volume) = volume.take() {
                        vector = flatten_volume(&volume, orientation)?;
                    }
                    vector = dense.compute_output(&vector)?;
                }
            }
        }

        match volume {
            Some(volume) => flatten_volume(&volume, orientation),
            None => Ok(vector),
        }
    }

    /// Trains the model with the bound optimizer.
    ///
    /// # Parameters
    ///
    /// - `inputs` - Training inputs
    /// - `labels` - Expected outputs, one per input
    /// - `options` - Hyperparameters and reporting switches
    ///
    /// # Returns
    ///
    /// - `Ok(&mut Self)` - The trained model
    /// - `Err(ModelError)` - See `fit_with_callbacks`
    pub fn fit(
        &mut self,
        inputs: &[Vector],
        labels: &[Vector],
        options: &TrainingOptions,
    ) -> Result<&mut Self, ModelError> {
        self.fit_with_callbacks(inputs, labels, options, &mut TrainingCallbacks::default())
    }

    /// Trains the model, invoking `callbacks` at training start, after every parameter update,
    /// after every epoch and at training end.
    ///
    /// Each sample is assigned once per call to either the training or the validation set.
    /// Training samples are fed forward and backpropagated; every `batch_size` of them the
    /// accumulated gradients are applied and cleared. A trailing partial batch is applied at
    /// the end of each epoch. Validation samples only contribute to the validation loss.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If no optimizer is bound, the loss no longer fits the
    ///   output layer, or the data/options are invalid (see `TrainingOptions`)
    /// - `ModelError::ShapeMismatch` - If a sample or label does not fit the model
    ///
    /// Every check runs before the first parameter update, so a failed call leaves the
    /// parameters untouched.
    pub fn fit_with_callbacks(
        &mut self,
        inputs: &[Vector],
        labels: &[Vector],
        options: &TrainingOptions,
        callbacks: &mut TrainingCallbacks,
    ) -> Result<&mut Self, ModelError> {
        let loss = self
            .optimizer
            .as_ref()
            .map(|optimizer| optimizer.loss())
            .ok_or_else(|| ModelError::ConfigurationError("Optimizer is not set".to_string()))?;
        validate_training(self, inputs, labels, options)?;

        let mut optimizer = match self.optimizer.take() {
            Some(optimizer) if optimizer.is_bound_to(self) => optimizer,
            stale => {
                let rebound = Optimizer::new(self, loss);
                self.optimizer = stale;
                rebound?
            }
        };

        let result = self.train(&mut optimizer, inputs, labels, options, callbacks);
        self.optimizer = Some(optimizer);
        result?;
        Ok(self)
    }

    fn train(
        &mut self,
        optimizer: &mut Optimizer,
        inputs: &[Vector],
        labels: &[Vector],
        options: &TrainingOptions,
        callbacks: &mut TrainingCallbacks,
    ) -> Result<(), ModelError> {
        let n_samples = inputs.len();
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut split: Vec<f32> = (0..n_samples)
            .map(|i| 1.0 - i as f32 / n_samples as f32)
            .collect();
        split.shuffle(&mut rng);
        let is_training: Vec<bool> = split
            .iter()
            .map(|&value| value >= options.validation_split)
            .collect();

        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut iteration = 0;
        let mut status = TrainingStatus::new(0, options.epochs, 0, 0.0, None);

        optimizer.zero_grad();
        callbacks.training_start(&status);

        let progress_bar = if options.show_progress {
            ProgressBar::new(options.epochs as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | {msg}")
                .map_err(|e| ModelError::ProcessingError(e.to_string()))?
                .progress_chars("█▓░"),
        );

        for epoch in 1..=options.epochs {
            if options.shuffle {
                order.shuffle(&mut rng);
            }

            let mut train_loss = 0.0;
            let mut train_count = 0;
            let mut validation_loss = 0.0;
            let mut validation_count = 0;
            let mut pending = 0;

            for &sample in &order {
                let guess = self.feed_forward(&inputs[sample])?;
                let loss = optimizer.compute_loss(&guess, &labels[sample])?;

                if !is_training[sample] {
                    validation_loss += loss;
                    validation_count += 1;
                    continue;
                }
                train_loss += loss;
                train_count += 1;

                let mut deriv = optimizer.compute_loss_deriv(self, &guess, &labels[sample])?;
                if let Some(mask) = &options.selective_update {
                    keep_only(&mut deriv, mask[sample])?;
                }
                optimizer.backpropagate(self, &inputs[sample], &deriv)?;
                pending += 1;

                if pending == options.batch_size {
                    optimizer.fix(self, options)?;
                    optimizer.zero_grad();
                    pending = 0;
                    iteration += 1;

                    status = TrainingStatus::new(
                        epoch,
                        options.epochs,
                        iteration,
                        mean(train_loss, train_count),
                        mean_of_any(validation_loss, validation_count),
                    );
                    if options.iteration_log {
                        report(&progress_bar, options, &status.message);
                    }
                    callbacks.iteration_end(&status);
                }
            }

            if pending > 0 {
                optimizer.fix(self, options)?;
                optimizer.zero_grad();
                iteration += 1;
            }

            status = TrainingStatus::new(
                epoch,
                options.epochs,
                iteration,
                mean(train_loss, train_count),
                mean_of_any(validation_loss, validation_count),
            );
            if pending > 0 {
                if options.iteration_log {
                    report(&progress_bar, options, &status.message);
                }
                callbacks.iteration_end(&status);
            }
            if options.epoch_log {
                report(&progress_bar, options, &status.message);
            }
            progress_bar.set_message(format!("loss: {:.6}", status.train_loss));
            progress_bar.inc(1);
            callbacks.epoch_end(&status);
        }

        progress_bar.finish_with_message("Training completed");
        callbacks.training_end(&status);
        Ok(())
    }

    /// Perturbs every parameter of every layer by a uniform draw in `[-deviation, deviation]`.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If `deviation` is not finite; the model is left
    ///   unchanged
    pub fn randomize(&mut self, deviation: f32) -> Result<&mut Self, ModelError> {
        for layer in &mut self.layers {
            layer.randomize(deviation)?;
        }
        Ok(self)
    }

    /// Prints a summary of the model's structure
    ///
    /// Displays each layer's type, activation, input and output shape and parameter count in a
    /// tabular format; pooling is listed as its own row.
    pub fn summary(&self) {
        let col1_width = 26;
        let col2_width = 14;
        let col3_width = 16;
        let col4_width = 16;
        let col5_width = 11;
        let rule = |left: &str, mid: &str, right: &str, fill: &str| {
            println!(
                "{}{}{}{}{}{}{}{}{}{}{}",
                left,
                fill.repeat(col1_width),
                mid,
                fill.repeat(col2_width),
                mid,
                fill.repeat(col3_width),
                mid,
                fill.repeat(col4_width),
                mid,
                fill.repeat(col5_width),
                right
            )
        };

        println!("Model: \"sequential\"");
        rule("┏", "┳", "┓", "━");
        println!(
            "┃ {:<24} ┃ {:<12} ┃ {:<14} ┃ {:<14} ┃ {:>9} ┃",
            "Layer (type)", "Activation", "Input Shape", "Output Shape", "Param #"
        );
        rule("┡", "╇", "┩", "━");

        let mut total_params = 0;
        for (i, layer) in self.layers.iter().enumerate() {
            let layer_name = if i == 0 {
                "Layer".to_string()
            } else {
                format!("Layer_{}", i)
            };
            let params = layer.param_count();
            total_params += params;

            match layer {
                SequentialLayer::Conv2D(conv) => {
                    let input = shape_or_unbound(conv.input_shape().map(|s| s.to_string()));
                    let output = shape_or_unbound(conv.output_volume_shape().map(|s| s.to_string()));
                    println!(
                        "│ {:<24} │ {:<12} │ {:<14} │ {:<14} │ {:>9} │",
                        format!("{} ({})", layer_name, layer.layer_type()),
                        layer.activation().to_string(),
                        input,
                        output,
                        params
                    );
                    if conv.pooling() != PoolingType::None {
                        println!(
                            "│ {:<24} │ {:<12} │ {:<14} │ {:<14} │ {:>9} │",
                            format!("  {} ({})", conv.pooling(), conv.pool_stride()),
                            "",
                            output,
                            layer.output_shape(),
                            0
                        );
                    }
                }
                SequentialLayer::Dense(dense) => {
                    println!(
                        "│ {:<24} │ {:<12} │ {:<14} │ {:<14} │ {:>9} │",
                        format!("{} ({})", layer_name, layer.layer_type()),
                        layer.activation().to_string(),
                        format!("({})", dense.input_size()),
                        layer.output_shape(),
                        params
                    );
                }
            }
        }

        rule("└", "┴", "┘", "─");
        println!(" Total params: {} ({} B)", total_params, total_params * 4);
        println!(" Orientation: {:?}", self.orientation);
    }

    /// Serializes layers, parameters and orientation as JSON. Forward caches and the optimizer
    /// are not written.
    pub fn save_to_writer<W: Write>(&self, writer: W) -> Result<(), IoError> {
        to_writer(writer, self).map_err(IoError::JsonError)
    }

    /// Saves the model as JSON to `path`, creating or overwriting the file
    pub fn save_to_path(&self, path: &str) -> Result<(), IoError> {
        let file = File::create(path).map_err(IoError::StdIoError)?;
        let mut writer = BufWriter::new(file);
        self.save_to_writer(&mut writer)?;
        writer.flush().map_err(IoError::StdIoError)
    }

    /// Reads a model written by `save_to_writer`. The model has no optimizer.
    ///
    /// Every layer is bound again in order, exactly as `add` would do it.
    ///
    /// # Errors
    ///
    /// - `IoError::JsonError` - If the data is not a serialized model
    /// - `IoError::InvalidModel` - If the layers break the conv-before-dense order, or a stored
    ///   input shape, weight, bias or kernel shape disagrees with the layer before it
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self, IoError> {
        let stored: Sequential = from_reader(reader).map_err(IoError::JsonError)?;
        stored.rebound().map_err(IoError::InvalidModel)
    }

    fn rebound(self) -> Result<Self, ModelError> {
        let mut model = Sequential {
            layers: Vec::with_capacity(self.layers.len()),
            orientation: self.orientation,
            optimizer: None,
        };
        for (index, layer) in self.layers.into_iter().enumerate() {
            let stored = layer.clone();
            model.add(layer)?;
            if model.layers.last() != Some(&stored) {
                return Err(ModelError::ConfigurationError(format!(
                    "Stored parameters of layer {} do not fit its input shape",
                    index
                )));
            }
        }
        Ok(model)
    }

    /// Reads a model saved with `save_to_path`
    pub fn load_from_path(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        Self::load_from_reader(reader)
    }
}

fn shape_or_unbound(shape: Option<String>) -> String {
    shape.unwrap_or_else(|| "Unbound".to_string())
}

fn mean(sum: f32, count: usize) -> f32 {
    if count == 0 { 0.0 } else { sum / count as f32 }
}

fn mean_of_any(sum: f32, count: usize) -> Option<f32> {
    (count > 0).then(|| sum / count as f32)
}

/// Zeroes every component of `deriv` except `index`
fn keep_only(deriv: &mut Vector, index: usize) -> Result<(), ModelError> {
    if index >= deriv.len() {
        return Err(ModelError::ConfigurationError(format!(
            "Selective update index {} is out of range for an output of length {}",
            index,
            deriv.len()
        )));
    }
    for (i, value) in deriv.iter_mut().enumerate() {
        if i != index {
            *value = 0.0;
        }
    }
    Ok(())
}

fn report(progress_bar: &ProgressBar, options: &TrainingOptions, message: &str) {
    if options.show_progress {
        progress_bar.println(message);
    } else {
        println!("{}", message);
    }
}
