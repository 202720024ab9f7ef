use thiserror::Error;

use crate::delegate::DelegateKind;
use crate::tensor::ElementType;

/// Errors returned by [`ModelRunner`](crate::ModelRunner) operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("modelrt: model load: {0}")]
    ModelLoad(String),

    #[error("modelrt: interpreter build: {0}")]
    InterpreterBuild(String),

    #[error("modelrt: input index {index} out of range ({count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("modelrt: output index {index} out of range ({count} outputs)")]
    OutputIndexOutOfRange { index: usize, count: usize },

    #[error("modelrt: invoke: {0}")]
    Invocation(String),

    #[error("modelrt: interpreter is not built")]
    NotBuilt,

    #[error("modelrt: no model loaded")]
    NoModel,

    #[error("modelrt: input #{index} needs {expected} bytes, buffer has {got}")]
    BufferTooSmall {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("modelrt: output #{index} is {actual}, requested {requested}")]
    TypeMismatch {
        index: usize,
        actual: ElementType,
        requested: ElementType,
    },

    #[error("modelrt: a {0} delegate is already attached")]
    DuplicateDelegate(DelegateKind),

    #[error("modelrt: delegate: {0}")]
    Delegate(String),

    #[error("modelrt: tensor copy: {0}")]
    TensorCopy(String),

    #[error("modelrt: config: {0}")]
    Config(String),
}
