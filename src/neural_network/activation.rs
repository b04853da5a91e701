use super::Vector;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Activation function enum, supporting Sigmoid, ReLU, Tanh, Softplus, BinaryStep, Softmax and Linear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Sigmoid,
    ReLU,
    Tanh,
    Softplus,
    BinaryStep,
    Softmax,
    Linear,
}

/// Values and derivatives produced by one activation pass.
///
/// Both vectors have the length of the raw pre-activation input. Layers keep this around
/// after a forward pass because backpropagation reads the derivative of the same sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationOutput {
    /// Activated values
    pub value: Vector,
    /// Per-element derivatives of the activation with respect to the raw input
    pub derivative: Vector,
}

impl Activation {
    /// Every supported activation kind, in declaration order
    pub const ALL: [Activation; 7] = [
        Activation::Sigmoid,
        Activation::ReLU,
        Activation::Tanh,
        Activation::Softplus,
        Activation::BinaryStep,
        Activation::Softmax,
        Activation::Linear,
    ];

    /// Applies the activation function to a raw pre-activation vector.
    ///
    /// Values and derivatives are computed in one pass:
    ///
    /// - Sigmoid: `v = 1/(1+e^-x)`, `d = v(1-v)`
    /// - ReLU: `v = max(0, x)`, `d = 1 if x > 0 else 0`
    /// - Tanh: `v = tanh(x)`, `d = 1 - v²`
    /// - Softplus: `v = ln(1+e^x)`, `d = 1/(1+e^-x)`
    /// - BinaryStep: `v = 1 if x > 0 else 0`, `d = 0`
    /// - Softmax: `v_i = e^(x_i-max)/Σe^(x_j-max)`, `d_i = v_i(1-v_i)` (diagonal of the Jacobian only)
    /// - Linear: `v = x`, `d = 1`
    ///
    /// # Parameters
    ///
    /// * `raw` - Raw pre-activation vector
    ///
    /// # Returns
    ///
    /// * `ActivationOutput` - Activated values and their derivatives
    pub fn compute(&self, raw: &Vector) -> ActivationOutput {
        match self {
            Activation::Sigmoid => {
                let value = raw.mapv(sigmoid);
                let derivative = value.mapv(|v| v * (1.0 - v));
                ActivationOutput { value, derivative }
            }
            Activation::ReLU => ActivationOutput {
                value: raw.mapv(|x| x.max(0.0)),
                derivative: raw.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 }),
            },
            Activation::Tanh => {
                let value = raw.mapv(f32::tanh);
                let derivative = value.mapv(|v| 1.0 - v * v);
                ActivationOutput { value, derivative }
            }
            Activation::Softplus => ActivationOutput {
                value: raw.mapv(softplus),
                // derivative of softplus is the sigmoid of the raw input
                derivative: raw.mapv(sigmoid),
            },
            Activation::BinaryStep => ActivationOutput {
                value: raw.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 }),
                derivative: Array1::zeros(raw.len()),
            },
            Activation::Softmax => {
                let max_val = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                let mut value = raw.mapv(|x| (x - max_val).exp());
                let sum = value.sum();
                value.mapv_inplace(|x| x / sum);
                let derivative = value.mapv(|v| v * (1.0 - v));
                ActivationOutput { value, derivative }
            }
            Activation::Linear => ActivationOutput {
                value: raw.clone(),
                derivative: Array1::ones(raw.len()),
            },
        }
    }

    /// Backward propagation through the full softmax Jacobian
    ///
    /// Computes `new_grad[i] = a[i] * (upstream[i] - sum_j(a[j]*upstream[j]))`, the exact
    /// Jacobian-vector product the diagonal derivative of `compute` leaves out.
    ///
    /// # Parameters
    ///
    /// - `a` - The output from the softmax activation
    /// - `upstream` - The gradient with respect to the softmax output
    ///
    /// # Returns
    ///
    /// * `Vector` - The gradient with respect to the input of the softmax function
    pub fn softmax_backward(a: &Vector, upstream: &Vector) -> Vector {
        let dot = a.dot(upstream);
        a * &upstream.mapv(|g| g - dot)
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Activation::Sigmoid => "Sigmoid",
            Activation::ReLU => "ReLU",
            Activation::Tanh => "Tanh",
            Activation::Softplus => "Softplus",
            Activation::BinaryStep => "BinaryStep",
            Activation::Softmax => "Softmax",
            Activation::Linear => "Linear",
        };
        write!(f, "{}", name)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `ln(1 + e^x)` without overflowing for large `x`
fn softplus(x: f32) -> f32 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}
