//! [`Engine`] implementation on TensorFlow Lite.

use std::path::Path;
use std::sync::Arc;

use giztoy_tflite::{
    Delegate, GpuDelegate, GpuDelegateConfig, Interpreter, InterpreterOptions, Library, Model,
    NnApiDelegate, NnApiDelegateConfig, TfliteError, gpu, nnapi,
};

use crate::delegate::{
    DelegateOptions, ExecutionPreference, GpuDelegateOptions, InferencePreference, InferencePriority,
    NnApiDelegateOptions,
};
use crate::engine::{Engine, EngineError, EngineInterpreter};
use crate::tensor::{ElementType, TensorInfo};

impl From<TfliteError> for EngineError {
    fn from(e: TfliteError) -> Self {
        EngineError(e.to_string())
    }
}

/// TensorFlow Lite engine.
///
/// Delegate handles are released with `TfLiteGpuDelegateV2Delete` and
/// `TfLiteNnapiDelegateDelete`.
#[derive(Clone)]
pub struct TfliteEngine {
    lib: Arc<Library>,
}

impl TfliteEngine {
    pub fn new(lib: Arc<Library>) -> Self {
        Self { lib }
    }

    /// Uses the process-wide library from [`Library::shared`].
    pub fn shared() -> Result<Self, EngineError> {
        Ok(Self::new(Library::shared()?))
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.lib
    }
}

fn priority_code(p: InferencePriority) -> i32 {
    match p {
        InferencePriority::Auto => gpu::PRIORITY_AUTO,
        InferencePriority::MaxPrecision => gpu::PRIORITY_MAX_PRECISION,
        InferencePriority::MinLatency => gpu::PRIORITY_MIN_LATENCY,
        InferencePriority::MinMemoryUsage => gpu::PRIORITY_MIN_MEMORY_USAGE,
    }
}

fn gpu_config(o: &GpuDelegateOptions) -> GpuDelegateConfig {
    GpuDelegateConfig {
        precision_loss_allowed: o.precision_loss_allowed,
        inference_preference: match o.inference_preference {
            InferencePreference::FastSingleAnswer => gpu::PREFERENCE_FAST_SINGLE_ANSWER,
            InferencePreference::SustainedSpeed => gpu::PREFERENCE_SUSTAINED_SPEED,
        },
        inference_priorities: o.inference_priorities.map(priority_code),
        ..GpuDelegateConfig::default()
    }
}

fn nnapi_config(o: &NnApiDelegateOptions) -> NnApiDelegateConfig {
    NnApiDelegateConfig {
        execution_preference: match o.execution_preference {
            ExecutionPreference::Undefined => nnapi::PREFERENCE_UNDEFINED,
            ExecutionPreference::LowPower => nnapi::PREFERENCE_LOW_POWER,
            ExecutionPreference::FastSingleAnswer => nnapi::PREFERENCE_FAST_SINGLE_ANSWER,
            ExecutionPreference::SustainedSpeed => nnapi::PREFERENCE_SUSTAINED_SPEED,
        },
        accelerator_name: o.accelerator_name.clone(),
        cache_dir: o.cache_dir.clone(),
        model_token: o.model_token.clone(),
        disallow_nnapi_cpu: o.disallow_nnapi_cpu,
        allow_fp16: o.allow_fp16,
        max_number_delegated_partitions: o.max_delegated_partitions,
    }
}

impl Engine for TfliteEngine {
    type Model = Model;
    type Options = InterpreterOptions;
    type Delegate = Delegate;
    type Interpreter = Interpreter;

    fn model_from_buffer(&self, data: &[u8]) -> Result<Model, EngineError> {
        Ok(Model::from_buffer(&self.lib, data)?)
    }

    fn model_from_file(&self, path: &Path) -> Result<Model, EngineError> {
        Ok(Model::from_file(&self.lib, path)?)
    }

    fn create_options(&self) -> Result<InterpreterOptions, EngineError> {
        Ok(InterpreterOptions::new(&self.lib)?)
    }

    fn set_num_threads(&self, options: &mut InterpreterOptions, n: i32) {
        options.set_num_threads(if n > 0 { n } else { -1 });
    }

    fn create_delegate(&self, options: &DelegateOptions) -> Result<Delegate, EngineError> {
        let delegate = match options {
            DelegateOptions::Gpu(o) => GpuDelegate::new(&self.lib, &gpu_config(o))?.into(),
            DelegateOptions::NnApi(o) => NnApiDelegate::new(&self.lib, &nnapi_config(o))?.into(),
        };
        Ok(delegate)
    }

    unsafe fn add_delegate(&self, options: &mut InterpreterOptions, delegate: &Delegate) {
        unsafe { options.add_delegate(delegate) };
    }

    fn create_interpreter(
        &self,
        model: &Model,
        options: &InterpreterOptions,
    ) -> Result<Interpreter, EngineError> {
        Ok(Interpreter::new(model, Some(options))?)
    }
}

fn tensor_info(tensor: &giztoy_tflite::Tensor<'_>) -> TensorInfo {
    TensorInfo {
        name: tensor.name(),
        element_type: ElementType::from_code(tensor.type_code()).unwrap_or(ElementType::NoType),
        byte_size: tensor.byte_size(),
        shape: tensor.shape(),
    }
}

impl EngineInterpreter for Interpreter {
    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        Ok(Interpreter::allocate_tensors(self)?)
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        Ok(Interpreter::invoke(self)?)
    }

    fn input_count(&self) -> usize {
        Interpreter::input_count(self)
    }

    fn output_count(&self) -> usize {
        Interpreter::output_count(self)
    }

    fn input_tensor(&self, index: usize) -> Option<TensorInfo> {
        Interpreter::input_tensor(self, index).map(|t| tensor_info(&t))
    }

    fn output_tensor(&self, index: usize) -> Option<TensorInfo> {
        Interpreter::output_tensor(self, index).map(|t| tensor_info(&t))
    }

    fn input_data(&self, index: usize) -> Option<&[u8]> {
        Interpreter::input_tensor(self, index).map(|t| t.data())
    }

    fn output_data(&self, index: usize) -> Option<&[u8]> {
        Interpreter::output_tensor(self, index).map(|t| t.data())
    }

    fn copy_to_input(&mut self, index: usize, data: &[u8]) -> Result<(), EngineError> {
        Ok(Interpreter::copy_to_input(self, index, data)?)
    }

    fn copy_from_output(&self, index: usize, out: &mut [u8]) -> Result<(), EngineError> {
        let tensor = Interpreter::output_tensor(self, index)
            .ok_or_else(|| EngineError(format!("no output #{index}")))?;
        Ok(tensor.copy_to_buffer(out)?)
    }
}
