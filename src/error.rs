use std::fs::File;
use std::io::BufReader;

/// Error types that can occur during model construction, inference and training
///
/// # Variants
///
/// - `ConfigurationError` - Indicates an illegal model construction or training setup, e.g. a conv layer
///   appended after a dense layer, a first layer without an input shape, an empty layer, or bad hyperparameters
/// - `ShapeMismatch` - Indicates that a vector or volume does not have the length or depth the receiving
///   operation expects
/// - `ProcessingError` - Indicates that there is something wrong while processing, e.g. reading forward
///   caches before a forward pass has been run
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    ConfigurationError(String),
    ShapeMismatch(String),
    ProcessingError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            ModelError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Input/Output error types that can occur during model serialization and file operations
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations (reading, writing, file access)
/// - `JsonError` - Wraps JSON serialization/deserialization errors when working with JSON data formats
/// - `InvalidModel` - A deserialized model whose layers or parameters do not form a valid model
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
    InvalidModel(ModelError),
}

impl IoError {
    pub fn load_in_buf_reader(path: &str) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
            IoError::InvalidModel(e) => write!(f, "Invalid model: {}", e),
        }
    }
}

impl std::error::Error for IoError {}
