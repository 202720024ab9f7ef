//! Rust bindings for the TensorFlow Lite C API.
//!
//! The C library (`libtensorflowlite_c`) is loaded at run time with
//! `libloading`, so building this crate does not require TensorFlow Lite
//! to be installed. Every handle keeps the [`Library`] alive through an
//! `Arc`.
//!
//! # Usage
//!
//! ```no_run
//! use giztoy_tflite::{Interpreter, InterpreterOptions, Library, Model};
//!
//! let lib = Library::load_default().unwrap();
//! let model = Model::from_file(&lib, "model.tflite").unwrap();
//! let mut opts = InterpreterOptions::new(&lib).unwrap();
//! opts.set_num_threads(2);
//!
//! let mut interp = Interpreter::new(&model, Some(&opts)).unwrap();
//! interp.allocate_tensors().unwrap();
//! interp.copy_to_input(0, &[0u8; 16]).unwrap();
//! interp.invoke().unwrap();
//! let out = interp.output_tensor(0).unwrap().data().to_vec();
//! ```
//!
//! # Library Lookup
//!
//! [`Library::load_default`] tries `$TFLITE_LIB`, then
//! `$TFLITE_DIR/lib/libtensorflowlite_c.so` (platform-specific name), then
//! lets the system loader search for the bare file name.
//!
//! # Delegates
//!
//! GPU and NNAPI delegates are optional. Their entry points are resolved
//! when the library is loaded; creating a delegate the library does not
//! export returns [`TfliteError::MissingSymbol`].

mod error;
mod ffi;
mod library;
mod tflite;

pub use error::TfliteError;
pub use library::{default_library_name, Library, ENV_DIR, ENV_LIBRARY};
pub use tflite::{
    Delegate, GpuDelegate, GpuDelegateConfig, Interpreter, InterpreterOptions, Model,
    NnApiDelegate, NnApiDelegateConfig, Tensor,
};

/// `TfLiteGpuInferenceUsage` values.
pub mod gpu {
    pub use crate::ffi::{
        GPU_INFERENCE_PREFERENCE_FAST_SINGLE_ANSWER as PREFERENCE_FAST_SINGLE_ANSWER,
        GPU_INFERENCE_PREFERENCE_SUSTAINED_SPEED as PREFERENCE_SUSTAINED_SPEED,
        GPU_INFERENCE_PRIORITY_AUTO as PRIORITY_AUTO,
        GPU_INFERENCE_PRIORITY_MAX_PRECISION as PRIORITY_MAX_PRECISION,
        GPU_INFERENCE_PRIORITY_MIN_LATENCY as PRIORITY_MIN_LATENCY,
        GPU_INFERENCE_PRIORITY_MIN_MEMORY_USAGE as PRIORITY_MIN_MEMORY_USAGE,
    };
}

/// NNAPI execution preference values.
pub mod nnapi {
    pub use crate::ffi::{
        NNAPI_PREFERENCE_FAST_SINGLE_ANSWER as PREFERENCE_FAST_SINGLE_ANSWER,
        NNAPI_PREFERENCE_LOW_POWER as PREFERENCE_LOW_POWER,
        NNAPI_PREFERENCE_SUSTAINED_SPEED as PREFERENCE_SUSTAINED_SPEED,
        NNAPI_PREFERENCE_UNDEFINED as PREFERENCE_UNDEFINED,
    };
}
