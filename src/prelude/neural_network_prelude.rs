pub use crate::error::{IoError, ModelError};
pub use crate::neural_network::activation::{Activation, ActivationOutput};
pub use crate::neural_network::layer::{
    Conv2D, Dense, Filter, Orientation, PaddingType, PoolingType, SequentialLayer, VolumeShape,
};
pub use crate::neural_network::loss_function::{LossFunction, OutputHead};
pub use crate::neural_network::neural_network_trait::Layer;
pub use crate::neural_network::optimizer::Optimizer;
pub use crate::neural_network::sequential::{
    Sequential, TrainingCallbacks, TrainingOptions, TrainingStatus,
};
pub use crate::neural_network::{Matrix, Vector, Volume};
