/// Prelude module for neural network functionality.
pub mod neural_network_prelude;

pub use neural_network_prelude::*;
