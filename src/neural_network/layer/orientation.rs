use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a flat vector maps onto a multi-channel volume at the conv/dense boundary.
///
/// - `Horizontal`: channels sit side by side (concatenated column-wise) before the result is
///   flattened row by row
/// - `Vertical`: channels are stacked on top of each other (concatenated row-wise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl FromStr for Orientation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(Orientation::Horizontal),
            "vertical" => Ok(Orientation::Vertical),
            other => Err(ModelError::ConfigurationError(format!(
                "Unknown orientation: {}",
                other
            ))),
        }
    }
}
