use serde::{Deserialize, Serialize};

/// Defines the padding method used in convolutional layers.
///
/// The padding type determines how the input is padded before applying convolution:
/// - `Valid`: No padding is applied, which reduces the output dimensions.
/// - `Same`: Padding is added to preserve the input spatial dimensions in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddingType {
    /// No padding is applied. The convolution is only computed where the filter
    /// fully overlaps with the input, resulting in an output with reduced dimensions.
    Valid,

    /// Padding is added around the input to ensure that the output has the same
    /// spatial dimensions as the input (stride 1). This is done by adding
    /// zeros around the borders of the input.
    Same,
}

/// Number of zero rows/columns added on each side of every input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PadLayers {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl PadLayers {
    /// Padding that keeps the spatial size of a stride-1 convolution with the given kernel.
    ///
    /// The kernel needs `kernel - 1` extra rows/columns in total; half of them (rounded down)
    /// go before the input and the rest after it, so even kernels pad one more at the end.
    pub fn same(kernel_size: (usize, usize)) -> Self {
        let pad_height = kernel_size.0.saturating_sub(1);
        let pad_width = kernel_size.1.saturating_sub(1);
        PadLayers {
            top: pad_height / 2,
            bottom: pad_height - pad_height / 2,
            left: pad_width / 2,
            right: pad_width - pad_width / 2,
        }
    }

    /// Padding for the given padding type and kernel size
    pub fn for_padding(padding: PaddingType, kernel_size: (usize, usize)) -> Self {
        match padding {
            PaddingType::Valid => PadLayers::default(),
            PaddingType::Same => PadLayers::same(kernel_size),
        }
    }

    /// Total rows added
    pub fn vertical(&self) -> usize {
        self.top + self.bottom
    }

    /// Total columns added
    pub fn horizontal(&self) -> usize {
        self.left + self.right
    }
}
