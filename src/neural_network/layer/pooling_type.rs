use serde::{Deserialize, Serialize};

/// Pooling applied to every output channel of a convolutional layer.
///
/// Pooling windows are `stride x stride` and do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolingType {
    /// Maximum of each window
    Max,
    /// Mean of each window
    Average,
    /// No pooling, the activated output passes through
    None,
}

impl std::fmt::Display for PoolingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolingType::Max => write!(f, "MaxPooling"),
            PoolingType::Average => write!(f, "AveragePooling"),
            PoolingType::None => write!(f, "None"),
        }
    }
}
