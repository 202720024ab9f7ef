use thiserror::Error;

/// Errors returned by TensorFlow Lite operations.
#[derive(Debug, Error)]
pub enum TfliteError {
    #[error("tflite: load {path:?}: {message}")]
    Load { path: String, message: String },

    #[error("tflite: symbol {0} not found")]
    MissingSymbol(&'static str),

    #[error("tflite: {op} failed with status {status}")]
    Status { op: &'static str, status: i32 },

    #[error("tflite: {0}")]
    Internal(String),

    #[error("tflite: tensor #{index} out of range ({count} tensors)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("tflite: size mismatch: tensor has {expected} bytes, buffer has {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("tflite: empty data")]
    EmptyData,
}
