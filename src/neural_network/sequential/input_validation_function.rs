use super::{Sequential, TrainingOptions};
use crate::ModelError;
use crate::neural_network::Vector;

/// Validates a training set and the options of a `fit` call against `model`, so that no
/// sample can fail once parameters have started to change.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if:
/// - Inputs and labels differ in count
/// - `batch_size` is 0
/// - `validation_split` is not in `[0, 1)`
/// - `learning_rate` is not a positive finite number
/// - `regularization` is negative or not finite
/// - `selective_update` does not have one entry per sample, or an entry is not an output index
///
/// Returns `ModelError::ShapeMismatch` if an input or label length does not fit a model with
/// layers.
pub(super) fn validate_training(
    model: &Sequential,
    inputs: &[Vector],
    labels: &[Vector],
    options: &TrainingOptions,
) -> Result<(), ModelError> {
    let (input_count, label_count) = (inputs.len(), labels.len());
    if input_count != label_count {
        return Err(ModelError::ConfigurationError(format!(
            "Got {} inputs but {} labels",
            input_count, label_count
        )));
    }
    if options.batch_size < 1 {
        return Err(ModelError::ConfigurationError(
            "Batch size must be greater than 0".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&options.validation_split) {
        return Err(ModelError::ConfigurationError(format!(
            "Validation split must be in [0, 1), got {}",
            options.validation_split
        )));
    }
    if !options.learning_rate.is_finite() || options.learning_rate <= 0.0 {
        return Err(ModelError::ConfigurationError(format!(
            "Learning rate must be positive and finite, got {}",
            options.learning_rate
        )));
    }
    if let Some(factor) = options.regularization {
        if !factor.is_finite() || factor < 0.0 {
            return Err(ModelError::ConfigurationError(format!(
                "Regularization factor must be non-negative and finite, got {}",
                factor
            )));
        }
    }
    if let Some(mask) = &options.selective_update {
        if mask.len() != input_count {
            return Err(ModelError::ConfigurationError(format!(
                "Selective update mask has {} entries for {} samples",
                mask.len(),
                input_count
            )));
        }
    }
    if model.layer_count() == 0 {
        return Ok(());
    }

    let output_size = model.output_size();
    if let Some(index) = options
        .selective_update
        .iter()
        .flatten()
        .find(|&&index| index >= output_size)
    {
        return Err(ModelError::ConfigurationError(format!(
            "Selective update index {} is out of range for an output of length {}",
            index, output_size
        )));
    }
    check_lengths("Input", inputs, model.input_size())?;
    check_lengths("Label", labels, output_size)
}

fn check_lengths(kind: &str, samples: &[Vector], expected: usize) -> Result<(), ModelError> {
    match samples.iter().position(|sample| sample.len() != expected) {
        Some(i) => Err(ModelError::ShapeMismatch(format!(
            "{} {} has length {}, the model expects {}",
            kind,
            i,
            samples[i].len(),
            expected
        ))),
        None => Ok(()),
    }
}
