//! Lifecycle management and typed tensor I/O over an inference engine.
//!
//! [`ModelRunner`] owns the four coupled native resources of one network
//! (model, interpreter options, delegates, interpreter), creates them in
//! dependency order and releases them in reverse. On top of that it binds
//! typed host buffers to input tensors, runs inference and copies outputs
//! back into typed vectors.
//!
//! # Usage
//!
//! ```ignore
//! use giztoy_modelrt::{set_inputs, GpuDelegateOptions, ModelRunner, TfliteEngine};
//!
//! let mut runner = ModelRunner::new(TfliteEngine::shared()?);
//! runner.build_model_from_file("detector.tflite")?;
//! runner.set_num_threads(4)?;
//! runner.attach_delegate(GpuDelegateOptions::default())?;
//! runner.build_interpreter()?;
//!
//! set_inputs!(runner, &image, &scale)?;
//! runner.invoke()?;
//! let boxes: Vec<f32> = runner.output(0)?;
//! ```
//!
//! # Engines
//!
//! The runner is generic over [`Engine`]. Enable the `tflite` feature for
//! [`TfliteEngine`], which loads `libtensorflowlite_c` at run time. The
//! `mock` feature provides [`mock::MockEngine`], an in-process engine that
//! reads JSON model descriptions.
//!
//! # Input Binding
//!
//! Inputs are bound in index order through a cursor that advances once per
//! [`ModelRunner::set_input`] and resets to 0 on every
//! [`ModelRunner::invoke`]. [`ModelRunner::bind_inputs`] and
//! [`ModelRunner::set_input_at`] bind by explicit index instead.
//!
//! # Thread Safety
//!
//! A runner has no internal locking. Use it from one thread at a time.

mod binder;
mod config;
mod delegate;
mod engine;
#[cfg(feature = "tflite")]
mod engine_tflite;
mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod registry;
mod runner;
mod summary;
pub mod tensor;

pub use config::{ModelConfig, RunnerConfig};
pub use delegate::{
    DelegateKind, DelegateOptions, ExecutionPreference, GpuDelegateOptions, InferencePreference,
    InferencePriority, NnApiDelegateOptions,
};
pub use engine::{Engine, EngineError, EngineInterpreter};
#[cfg(feature = "tflite")]
pub use engine_tflite::TfliteEngine;
pub use error::RunnerError;
pub use registry::{is_registered, list_models, register_model, unregister_model};
pub use runner::{ModelRunner, ModelSource, OwnedModelSource};
pub use tensor::{ElementType, TensorElement, TensorInfo};
