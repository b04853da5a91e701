use crate::ModelError;
use crate::neural_network::{Activation, Vector};
use serde::{Deserialize, Serialize};

/// Floor applied to predictions before taking a logarithm
pub const LOG_EPSILON: f32 = 1e-7;

/// Loss functions supported by the optimizer.
///
/// - `MeanSquaredError`: `Σ(guess - label)²`
/// - `CrossEntropy`: `-ln(max(guess[k], 1e-7))` for a one-hot label with hot index `k`,
///   otherwise `-Σ label_i·ln(max(guess_i, 1e-7))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossFunction {
    MeanSquaredError,
    CrossEntropy,
}

impl LossFunction {
    /// Computes the loss of one prediction.
    ///
    /// # Parameters
    ///
    /// - `guess` - Model output
    /// - `label` - Expected output
    ///
    /// # Returns
    ///
    /// - `Ok(f32)` - The loss value
    /// - `Err(ModelError::ShapeMismatch)` - If `guess` and `label` differ in length
    pub fn compute_loss(&self, guess: &Vector, label: &Vector) -> Result<f32, ModelError> {
        check_lengths(guess, label)?;

        match self {
            LossFunction::MeanSquaredError => Ok(guess
                .iter()
                .zip(label.iter())
                .map(|(g, l)| (g - l) * (g - l))
                .sum()),
            LossFunction::CrossEntropy => {
                let (hot, max_label) = label.iter().enumerate().fold(
                    (0, f32::NEG_INFINITY),
                    |(best, best_val), (i, &v)| if v > best_val { (i, v) } else { (best, best_val) },
                );

                if max_label == 1.0 {
                    Ok(-guess[hot].max(LOG_EPSILON).ln())
                } else {
                    Ok(-guess
                        .iter()
                        .zip(label.iter())
                        .map(|(g, l)| l * g.max(LOG_EPSILON).ln())
                        .sum::<f32>())
                }
            }
        }
    }

    /// Resolves how the loss gradient flows into the output layer.
    ///
    /// # Parameters
    ///
    /// * `final_activation` - Activation of the last dense layer, `None` when the model has no
    ///   dense layer
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - For cross entropy on a dense layer that does not use
    ///   softmax, where the `guess - label` shortcut would give a wrong gradient
    pub fn head(&self, final_activation: Option<Activation>) -> Result<OutputHead, ModelError> {
        match (self, final_activation) {
            (LossFunction::MeanSquaredError, Some(Activation::Softmax)) => {
                Ok(OutputHead::MeanSquaredSoftmax)
            }
            (LossFunction::MeanSquaredError, Some(_)) => Ok(OutputHead::MeanSquaredDense),
            (LossFunction::CrossEntropy, Some(Activation::Softmax)) => {
                Ok(OutputHead::SoftmaxCrossEntropy)
            }
            (LossFunction::CrossEntropy, Some(other)) => Err(ModelError::ConfigurationError(
                format!(
                    "Cross entropy requires a Softmax output layer, found {}",
                    other
                ),
            )),
            (LossFunction::MeanSquaredError, None) => Ok(OutputHead::MeanSquaredConv),
            (LossFunction::CrossEntropy, None) => Ok(OutputHead::CrossEntropyConv),
        }
    }
}

impl std::fmt::Display for LossFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LossFunction::MeanSquaredError => write!(f, "MeanSquaredError"),
            LossFunction::CrossEntropy => write!(f, "CrossEntropy"),
        }
    }
}

/// Combination of loss function and output layer that fixes the form of the loss derivative.
///
/// For dense heads the derivative is taken with respect to the pre-activation output of the last
/// dense layer. For conv-only models it is taken with respect to the pooled output of the last
/// conv layer, because backpropagation applies that layer's activation derivative after
/// unpooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputHead {
    /// `(guess - label) ⊙ derivative`
    MeanSquaredDense,
    /// Full softmax Jacobian applied to `guess - label`
    MeanSquaredSoftmax,
    /// `guess - label`
    SoftmaxCrossEntropy,
    /// `guess - label`
    MeanSquaredConv,
    /// `-label / max(guess, 1e-7)`
    CrossEntropyConv,
}

impl OutputHead {
    pub fn loss_function(&self) -> LossFunction {
        match self {
            OutputHead::MeanSquaredDense
            | OutputHead::MeanSquaredSoftmax
            | OutputHead::MeanSquaredConv => LossFunction::MeanSquaredError,
            OutputHead::SoftmaxCrossEntropy | OutputHead::CrossEntropyConv => {
                LossFunction::CrossEntropy
            }
        }
    }

    /// Whether `derivative` needs the cached activation derivative of the output layer
    pub fn needs_final_derivative(&self) -> bool {
        *self == OutputHead::MeanSquaredDense
    }

    /// Computes the loss derivative fed into backpropagation.
    ///
    /// # Parameters
    ///
    /// - `guess` - Model output
    /// - `label` - Expected output
    /// - `final_derivative` - Cached activation derivative of the output layer; required by
    ///   `MeanSquaredDense` and ignored otherwise
    ///
    /// # Returns
    ///
    /// - `Ok(Vector)` - The derivative, same length as `guess`
    /// - `Err(ModelError::ShapeMismatch)` - If lengths differ
    /// - `Err(ModelError::ProcessingError)` - If a required final derivative is missing
    pub fn derivative(
        &self,
        guess: &Vector,
        label: &Vector,
        final_derivative: Option<&Vector>,
    ) -> Result<Vector, ModelError> {
        check_lengths(guess, label)?;
        let error = guess - label;

        match self {
            OutputHead::MeanSquaredDense => {
                let derivative = final_derivative.ok_or_else(|| {
                    ModelError::ProcessingError(
                        "Output layer derivative is not available".to_string(),
                    )
                })?;
                check_lengths(guess, derivative)?;
                Ok(error * derivative)
            }
            OutputHead::MeanSquaredSoftmax => Ok(Activation::softmax_backward(guess, &error)),
            OutputHead::SoftmaxCrossEntropy | OutputHead::MeanSquaredConv => Ok(error),
            OutputHead::CrossEntropyConv => Ok(guess
                .iter()
                .zip(label.iter())
                .map(|(g, l)| -l / g.max(LOG_EPSILON))
                .collect()),
        }
    }
}

fn check_lengths(a: &Vector, b: &Vector) -> Result<(), ModelError> {
    if a.len() != b.len() {
        return Err(ModelError::ShapeMismatch(format!(
            "Vectors of length {} and {} cannot be compared",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}
