//! The inference engine interface consumed by [`ModelRunner`](crate::ModelRunner).

use std::fmt;
use std::path::Path;

use crate::delegate::DelegateOptions;
use crate::tensor::TensorInfo;

/// Error reported by an engine backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EngineError {}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError(s.to_string())
    }
}

/// An inference engine: a factory for native handles.
///
/// Every handle type releases its native resource when dropped. Handles
/// have creation-order dependencies; the runner drops them in reverse.
pub trait Engine {
    /// A parsed model. Must stay valid after the source buffer is gone.
    type Model;
    /// Interpreter construction options.
    type Options;
    /// A delegate handle. The native delegate must live behind a pointer:
    /// moving the handle must not move it.
    type Delegate;
    /// An interpreter built from a model and options.
    type Interpreter: EngineInterpreter;

    fn model_from_buffer(&self, data: &[u8]) -> Result<Self::Model, EngineError>;

    fn model_from_file(&self, path: &Path) -> Result<Self::Model, EngineError>;

    fn create_options(&self) -> Result<Self::Options, EngineError>;

    /// Sets the thread count. Values `<= 0` select the engine default.
    fn set_num_threads(&self, options: &mut Self::Options, n: i32);

    fn create_delegate(&self, options: &DelegateOptions) -> Result<Self::Delegate, EngineError>;

    /// Registers `delegate` with `options` without taking ownership.
    ///
    /// # Safety
    ///
    /// `delegate` must outlive `options` and every interpreter built from them.
    unsafe fn add_delegate(&self, options: &mut Self::Options, delegate: &Self::Delegate);

    fn create_interpreter(
        &self,
        model: &Self::Model,
        options: &Self::Options,
    ) -> Result<Self::Interpreter, EngineError>;
}

/// Operations on a built interpreter.
pub trait EngineInterpreter {
    fn allocate_tensors(&mut self) -> Result<(), EngineError>;

    /// Runs one inference pass. Blocks until it completes.
    fn invoke(&mut self) -> Result<(), EngineError>;

    fn input_count(&self) -> usize;

    fn output_count(&self) -> usize;

    fn input_tensor(&self, index: usize) -> Option<TensorInfo>;

    fn output_tensor(&self, index: usize) -> Option<TensorInfo>;

    /// Read-only view of an input tensor's storage.
    fn input_data(&self, index: usize) -> Option<&[u8]>;

    /// Read-only view of an output tensor's storage.
    fn output_data(&self, index: usize) -> Option<&[u8]>;

    /// Copies `data` into input `index`. `data.len()` must equal the
    /// tensor's byte size.
    fn copy_to_input(&mut self, index: usize, data: &[u8]) -> Result<(), EngineError>;

    /// Copies output `index` into `out`. `out.len()` must equal the
    /// tensor's byte size.
    fn copy_from_output(&self, index: usize, out: &mut [u8]) -> Result<(), EngineError>;
}
