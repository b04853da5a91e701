use super::helper_function::convolve_valid;
use super::input_validation_function::validate_deviation;
use crate::ModelError;
use crate::neural_network::Matrix;
use ndarray::Array2;
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// One convolution kernel stack: a `kh x kw` kernel for each input channel.
///
/// Convolving a multi-channel volume correlates every channel with its own kernel and sums the
/// results, so a filter always produces a single output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    kernels: Vec<Matrix>,
}

impl Filter {
    /// Creates a filter with kernels drawn uniformly from `[-1, 1]`.
    ///
    /// # Parameters
    ///
    /// - `kernel_size` - Kernel height and width
    /// - `channels` - Number of input channels (one kernel each)
    /// - `rng` - Random number generator used for the draws
    pub fn new<R: Rng + ?Sized>(kernel_size: (usize, usize), channels: usize, rng: &mut R) -> Self {
        let unit = Uniform::new(-1.0f32, 1.0);
        let kernels = (0..channels)
            .map(|_| Array2::random_using(kernel_size, unit, &mut *rng))
            .collect();
        Filter { kernels }
    }

    /// Creates a filter from explicit kernels.
    ///
    /// # Errors
    ///
    /// - `ModelError::ShapeMismatch` - If `kernels` is empty or the kernels differ in shape
    pub fn from_kernels(kernels: Vec<Matrix>) -> Result<Self, ModelError> {
        let first = kernels
            .first()
            .ok_or_else(|| ModelError::ShapeMismatch("A filter needs at least one kernel".to_string()))?
            .dim();
        if let Some(other) = kernels.iter().find(|k| k.dim() != first) {
            return Err(ModelError::ShapeMismatch(format!(
                "All kernels of a filter must share one shape, got {:?} and {:?}",
                first,
                other.dim()
            )));
        }
        Ok(Filter { kernels })
    }

    /// `(kh, kw, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        let (kh, kw) = self.kernel_size();
        (kh, kw, self.kernels.len())
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        self.kernels.first().map(|k| k.dim()).unwrap_or((0, 0))
    }

    pub fn channels(&self) -> usize {
        self.kernels.len()
    }

    pub fn kernels(&self) -> &[Matrix] {
        &self.kernels
    }

    pub fn param_count(&self) -> usize {
        self.kernels.iter().map(|k| k.len()).sum()
    }

    /// Correlates every input channel with its kernel (valid mode, stride 1) and sums the
    /// per-channel results.
    ///
    /// # Parameters
    ///
    /// * `input` - Input volume, one matrix per channel
    ///
    /// # Returns
    ///
    /// - `Ok(Matrix)` - Output of shape `(h - kh + 1, w - kw + 1)`
    /// - `Err(ModelError::ShapeMismatch)` - If the channel count differs from the filter's, or a
    ///   channel is smaller than the kernel or differs in size from the others
    pub fn convolve(&self, input: &[Matrix]) -> Result<Matrix, ModelError> {
        if input.is_empty() || input.len() != self.kernels.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "Filter has {} channels but the input volume has {}",
                self.kernels.len(),
                input.len()
            )));
        }

        let (kh, kw) = self.kernel_size();
        let dim = input[0].dim();
        if dim.0 < kh || dim.1 < kw || input.iter().any(|m| m.dim() != dim) {
            return Err(ModelError::ShapeMismatch(format!(
                "Cannot convolve channels of shape {:?} with a {}x{} kernel",
                dim, kh, kw
            )));
        }

        let mut output = Array2::zeros((dim.0 - kh + 1, dim.1 - kw + 1));
        for (channel, kernel) in input.iter().zip(&self.kernels) {
            output += &convolve_valid(channel.view(), kernel.view());
        }
        Ok(output)
    }

    /// Subtracts `step` times the per-channel gradients from the kernels.
    ///
    /// # Errors
    ///
    /// - `ModelError::ShapeMismatch` - If the gradient count or any gradient shape differs from the
    ///   kernels
    pub fn fix(&mut self, gradients: &[Matrix], step: f32) -> Result<(), ModelError> {
        if gradients.len() != self.kernels.len()
            || gradients.iter().zip(&self.kernels).any(|(g, k)| g.dim() != k.dim())
        {
            return Err(ModelError::ShapeMismatch(
                "Filter gradients do not match the kernel shapes".to_string(),
            ));
        }
        for (kernel, gradient) in self.kernels.iter_mut().zip(gradients) {
            kernel.scaled_add(-step, gradient);
        }
        Ok(())
    }

    /// Adds a uniform draw in `[-deviation, deviation]` to every kernel entry.
    ///
    /// # Errors
    ///
    /// - `ModelError::ConfigurationError` - If `deviation` is not finite
    pub fn randomize<R: Rng + ?Sized>(
        &mut self,
        deviation: f32,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        validate_deviation(deviation)?;
        let noise = Uniform::new_inclusive(-deviation.abs(), deviation.abs());
        for kernel in &mut self.kernels {
            let perturbation = Array2::random_using(kernel.raw_dim(), noise, &mut *rng);
            *kernel += &perturbation;
        }
        Ok(())
    }
}
