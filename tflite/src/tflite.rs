//! Safe Rust wrappers for the TensorFlow Lite model, interpreter, tensor
//! and delegate handles.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use crate::error::TfliteError;
use crate::ffi;
use crate::library::Library;

fn c_string(s: &str) -> Result<CString, TfliteError> {
    CString::new(s).map_err(|e| TfliteError::Internal(e.to_string()))
}

fn opt_c_string(s: Option<&str>) -> Result<Option<CString>, TfliteError> {
    s.map(c_string).transpose()
}

fn opt_ptr(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(ptr::null(), |c| c.as_ptr())
}

fn check(op: &'static str, status: ffi::TfLiteStatus) -> Result<(), TfliteError> {
    if status == ffi::TFLITE_OK {
        Ok(())
    } else {
        Err(TfliteError::Status { op, status })
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A loaded `.tflite` flatbuffer.
///
/// Models built from memory keep their own copy of the bytes; the engine
/// reads from that buffer for as long as any interpreter built from the
/// model is alive.
pub struct Model {
    lib: Arc<Library>,
    model: *mut ffi::TfLiteModel,
    // Backing flatbuffer for models created from memory.
    pinned: Option<Arc<[u8]>>,
}

// A TfLiteModel is immutable once created.
unsafe impl Send for Model {}
unsafe impl Sync for Model {}

impl Model {
    /// Creates a model from an in-memory flatbuffer. The bytes are copied.
    pub fn from_buffer(lib: &Arc<Library>, data: &[u8]) -> Result<Self, TfliteError> {
        if data.is_empty() {
            return Err(TfliteError::EmptyData);
        }
        let pinned: Arc<[u8]> = Arc::from(data);
        let model = unsafe { (lib.model_create)(pinned.as_ptr().cast(), pinned.len()) };
        if model.is_null() {
            return Err(TfliteError::Internal("model_create failed".into()));
        }
        Ok(Self {
            lib: Arc::clone(lib),
            model,
            pinned: Some(pinned),
        })
    }

    /// Creates a model by memory-mapping a file.
    pub fn from_file(lib: &Arc<Library>, path: impl AsRef<Path>) -> Result<Self, TfliteError> {
        let path = path.as_ref();
        let c_path = c_string(&path.to_string_lossy())?;
        let model = unsafe { (lib.model_create_from_file)(c_path.as_ptr()) };
        if model.is_null() {
            return Err(TfliteError::Internal(format!(
                "model_create_from_file {:?} failed",
                path.display().to_string()
            )));
        }
        Ok(Self {
            lib: Arc::clone(lib),
            model,
            pinned: None,
        })
    }

    /// Returns the library this model was created with.
    pub fn library(&self) -> &Arc<Library> {
        &self.lib
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        if !self.model.is_null() {
            unsafe { (self.lib.model_delete)(self.model) };
            self.model = ptr::null_mut();
        }
    }
}

// ---------------------------------------------------------------------------
// InterpreterOptions
// ---------------------------------------------------------------------------

/// Interpreter construction options (thread count, delegates).
pub struct InterpreterOptions {
    lib: Arc<Library>,
    options: *mut ffi::TfLiteInterpreterOptions,
}

unsafe impl Send for InterpreterOptions {}

impl InterpreterOptions {
    /// Creates options with the engine defaults.
    pub fn new(lib: &Arc<Library>) -> Result<Self, TfliteError> {
        let options = unsafe { (lib.options_create)() };
        if options.is_null() {
            return Err(TfliteError::Internal("interpreter_options_create failed".into()));
        }
        Ok(Self {
            lib: Arc::clone(lib),
            options,
        })
    }

    /// Sets the number of CPU threads. `-1` lets the engine decide.
    pub fn set_num_threads(&mut self, n: i32) -> &mut Self {
        unsafe { (self.lib.options_set_num_threads)(self.options, n) };
        self
    }

    /// Registers a delegate with these options.
    ///
    /// # Safety
    ///
    /// The engine keeps a raw pointer to the delegate. The delegate must
    /// outlive these options and every interpreter created from them.
    pub unsafe fn add_delegate(&mut self, delegate: &Delegate) -> &mut Self {
        unsafe { (self.lib.options_add_delegate)(self.options, delegate.as_ptr()) };
        self
    }
}

impl Drop for InterpreterOptions {
    fn drop(&mut self) {
        if !self.options.is_null() {
            unsafe { (self.lib.options_delete)(self.options) };
            self.options = ptr::null_mut();
        }
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Executes a model.
///
/// An Interpreter may be moved between threads but must not be used from
/// more than one thread at a time.
pub struct Interpreter {
    lib: Arc<Library>,
    interpreter: *mut ffi::TfLiteInterpreter,
    // The engine reads the flatbuffer lazily, so the bytes outlive the interpreter.
    _pinned: Option<Arc<[u8]>>,
}

unsafe impl Send for Interpreter {}

impl Interpreter {
    /// Creates an interpreter for `model`. Tensors are not allocated yet.
    pub fn new(model: &Model, options: Option<&InterpreterOptions>) -> Result<Self, TfliteError> {
        let lib = Arc::clone(&model.lib);
        let opts = options.map_or(ptr::null(), |o| o.options as *const _);
        let interpreter = unsafe { (lib.interpreter_create)(model.model, opts) };
        if interpreter.is_null() {
            return Err(TfliteError::Internal("interpreter_create failed".into()));
        }
        Ok(Self {
            lib,
            interpreter,
            _pinned: model.pinned.clone(),
        })
    }

    /// Allocates (or re-allocates) all tensor buffers.
    pub fn allocate_tensors(&mut self) -> Result<(), TfliteError> {
        check("allocate_tensors", unsafe {
            (self.lib.interpreter_allocate_tensors)(self.interpreter)
        })
    }

    /// Runs the model once.
    pub fn invoke(&mut self) -> Result<(), TfliteError> {
        check("invoke", unsafe { (self.lib.interpreter_invoke)(self.interpreter) })
    }

    /// Number of input tensors.
    pub fn input_count(&self) -> usize {
        let n = unsafe { (self.lib.interpreter_input_count)(self.interpreter) };
        n.max(0) as usize
    }

    /// Number of output tensors.
    pub fn output_count(&self) -> usize {
        let n = unsafe { (self.lib.interpreter_output_count)(self.interpreter) };
        n.max(0) as usize
    }

    /// Returns input tensor `index`, or `None` when out of range.
    pub fn input_tensor(&self, index: usize) -> Option<Tensor<'_>> {
        if index >= self.input_count() {
            return None;
        }
        let tensor = unsafe { (self.lib.interpreter_input_tensor)(self.interpreter, index as i32) };
        Tensor::wrap(&self.lib, tensor)
    }

    /// Returns output tensor `index`, or `None` when out of range.
    pub fn output_tensor(&self, index: usize) -> Option<Tensor<'_>> {
        if index >= self.output_count() {
            return None;
        }
        let tensor = unsafe { (self.lib.interpreter_output_tensor)(self.interpreter, index as i32) };
        Tensor::wrap(&self.lib, tensor)
    }

    /// Copies `data` into input tensor `index`. The length must equal the
    /// tensor's byte size.
    pub fn copy_to_input(&mut self, index: usize, data: &[u8]) -> Result<(), TfliteError> {
        let count = self.input_count();
        if index >= count {
            return Err(TfliteError::IndexOutOfRange { index, count });
        }
        let tensor = unsafe { (self.lib.interpreter_input_tensor)(self.interpreter, index as i32) };
        if tensor.is_null() {
            return Err(TfliteError::Internal(format!("input tensor #{index} is null")));
        }
        let expected = unsafe { (self.lib.tensor_byte_size)(tensor) };
        if expected != data.len() {
            return Err(TfliteError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }
        check("tensor_copy_from_buffer", unsafe {
            (self.lib.tensor_copy_from_buffer)(tensor, data.as_ptr().cast(), data.len())
        })
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if !self.interpreter.is_null() {
            unsafe { (self.lib.interpreter_delete)(self.interpreter) };
            self.interpreter = ptr::null_mut();
        }
    }
}

// ---------------------------------------------------------------------------
// Tensor
// ---------------------------------------------------------------------------

/// A borrowed view of a tensor owned by an [`Interpreter`].
pub struct Tensor<'a> {
    lib: &'a Library,
    tensor: *const ffi::TfLiteTensor,
}

impl<'a> Tensor<'a> {
    fn wrap(lib: &'a Library, tensor: *const ffi::TfLiteTensor) -> Option<Self> {
        if tensor.is_null() {
            None
        } else {
            Some(Self { lib, tensor })
        }
    }

    /// Raw `TfLiteType` code.
    pub fn type_code(&self) -> i32 {
        unsafe { (self.lib.tensor_type)(self.tensor) }
    }

    /// Engine name of the element type, e.g. "FLOAT32".
    pub fn type_name(&self) -> String {
        self.lib.type_name(self.type_code())
    }

    /// Tensor name; empty if the model does not name it.
    pub fn name(&self) -> String {
        unsafe {
            let ptr = (self.lib.tensor_name)(self.tensor);
            if ptr.is_null() {
                return String::new();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }

    /// Size of the tensor buffer in bytes.
    pub fn byte_size(&self) -> usize {
        unsafe { (self.lib.tensor_byte_size)(self.tensor) }
    }

    /// Dimensions, outermost first.
    pub fn shape(&self) -> Vec<i32> {
        let n = unsafe { (self.lib.tensor_num_dims)(self.tensor) };
        (0..n.max(0))
            .map(|i| unsafe { (self.lib.tensor_dim)(self.tensor, i) })
            .collect()
    }

    /// Borrows the tensor buffer. Empty when the buffer is not allocated.
    pub fn data(&self) -> &'a [u8] {
        let ptr = unsafe { (self.lib.tensor_data)(self.tensor) };
        let len = self.byte_size();
        if ptr.is_null() || len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(ptr as *const u8, len) }
    }

    /// Copies the tensor buffer into `out`, which must be exactly
    /// [`Tensor::byte_size`] bytes long.
    pub fn copy_to_buffer(&self, out: &mut [u8]) -> Result<(), TfliteError> {
        let expected = self.byte_size();
        if expected != out.len() {
            return Err(TfliteError::SizeMismatch {
                expected,
                got: out.len(),
            });
        }
        check("tensor_copy_to_buffer", unsafe {
            (self.lib.tensor_copy_to_buffer)(self.tensor, out.as_mut_ptr().cast(), out.len())
        })
    }
}

// ---------------------------------------------------------------------------
// Delegates
// ---------------------------------------------------------------------------

/// Settings for the GPU delegate (`TfLiteGpuDelegateOptionsV2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDelegateConfig {
    pub precision_loss_allowed: bool,
    pub inference_preference: i32,
    pub inference_priorities: [i32; 3],
    pub enable_quantized_inference: bool,
    pub max_delegated_partitions: i32,
    pub serialization_dir: Option<String>,
    pub model_token: Option<String>,
}

impl Default for GpuDelegateConfig {
    /// Mirrors `TfLiteGpuDelegateOptionsV2Default()`.
    fn default() -> Self {
        Self {
            precision_loss_allowed: false,
            inference_preference: ffi::GPU_INFERENCE_PREFERENCE_FAST_SINGLE_ANSWER,
            inference_priorities: [
                ffi::GPU_INFERENCE_PRIORITY_MAX_PRECISION,
                ffi::GPU_INFERENCE_PRIORITY_AUTO,
                ffi::GPU_INFERENCE_PRIORITY_AUTO,
            ],
            enable_quantized_inference: true,
            max_delegated_partitions: 1,
            serialization_dir: None,
            model_token: None,
        }
    }
}

/// Settings for the NNAPI delegate (`TfLiteNnapiDelegateOptions`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NnApiDelegateConfig {
    pub execution_preference: i32,
    pub accelerator_name: Option<String>,
    pub cache_dir: Option<String>,
    pub model_token: Option<String>,
    pub disallow_nnapi_cpu: bool,
    pub allow_fp16: bool,
    pub max_number_delegated_partitions: i32,
}

impl Default for NnApiDelegateConfig {
    /// Mirrors `TfLiteNnapiDelegateOptionsDefault()`.
    fn default() -> Self {
        Self {
            execution_preference: ffi::NNAPI_PREFERENCE_UNDEFINED,
            accelerator_name: None,
            cache_dir: None,
            model_token: None,
            disallow_nnapi_cpu: true,
            allow_fp16: false,
            max_number_delegated_partitions: 3,
        }
    }
}

/// GPU delegate handle.
pub struct GpuDelegate {
    lib: Arc<Library>,
    delegate: *mut ffi::TfLiteDelegate,
    _options: Box<ffi::TfLiteGpuDelegateOptionsV2>,
    _strings: [Option<CString>; 2],
}

impl GpuDelegate {
    pub fn new(lib: &Arc<Library>, config: &GpuDelegateConfig) -> Result<Self, TfliteError> {
        let (Some(create), Some(_)) = (lib.gpu_delegate_create, lib.gpu_delegate_delete) else {
            return Err(TfliteError::MissingSymbol("TfLiteGpuDelegateV2Create"));
        };
        let serialization_dir = opt_c_string(config.serialization_dir.as_deref())?;
        let model_token = opt_c_string(config.model_token.as_deref())?;
        let options = Box::new(ffi::TfLiteGpuDelegateOptionsV2 {
            is_precision_loss_allowed: config.precision_loss_allowed as i32,
            inference_preference: config.inference_preference,
            inference_priority1: config.inference_priorities[0],
            inference_priority2: config.inference_priorities[1],
            inference_priority3: config.inference_priorities[2],
            experimental_flags: if config.enable_quantized_inference {
                ffi::GPU_EXPERIMENTAL_FLAGS_ENABLE_QUANT
            } else {
                0
            },
            max_delegated_partitions: config.max_delegated_partitions,
            serialization_dir: opt_ptr(&serialization_dir),
            model_token: opt_ptr(&model_token),
        });
        let delegate = unsafe { create(&*options) };
        if delegate.is_null() {
            return Err(TfliteError::Internal("gpu_delegate_v2_create failed".into()));
        }
        tracing::debug!("tflite: created GPU delegate");
        Ok(Self {
            lib: Arc::clone(lib),
            delegate,
            _options: options,
            _strings: [serialization_dir, model_token],
        })
    }
}

impl Drop for GpuDelegate {
    fn drop(&mut self) {
        if !self.delegate.is_null() {
            if let Some(delete) = self.lib.gpu_delegate_delete {
                unsafe { delete(self.delegate) };
            }
            self.delegate = ptr::null_mut();
        }
    }
}

/// NNAPI delegate handle.
pub struct NnApiDelegate {
    lib: Arc<Library>,
    delegate: *mut ffi::TfLiteDelegate,
    _options: Box<ffi::TfLiteNnapiDelegateOptions>,
    _strings: [Option<CString>; 3],
}

impl NnApiDelegate {
    pub fn new(lib: &Arc<Library>, config: &NnApiDelegateConfig) -> Result<Self, TfliteError> {
        let (Some(create), Some(_)) = (lib.nnapi_delegate_create, lib.nnapi_delegate_delete) else {
            return Err(TfliteError::MissingSymbol("TfLiteNnapiDelegateCreate"));
        };
        let accelerator_name = opt_c_string(config.accelerator_name.as_deref())?;
        let cache_dir = opt_c_string(config.cache_dir.as_deref())?;
        let model_token = opt_c_string(config.model_token.as_deref())?;
        let options = Box::new(ffi::TfLiteNnapiDelegateOptions {
            execution_preference: config.execution_preference,
            accelerator_name: opt_ptr(&accelerator_name),
            cache_dir: opt_ptr(&cache_dir),
            model_token: opt_ptr(&model_token),
            disallow_nnapi_cpu: config.disallow_nnapi_cpu as i32,
            allow_fp16: config.allow_fp16 as i32,
            max_number_delegated_partitions: config.max_number_delegated_partitions,
            nnapi_support_library_handle: ptr::null_mut(),
        });
        let delegate = unsafe { create(&*options) };
        if delegate.is_null() {
            return Err(TfliteError::Internal("nnapi_delegate_create failed".into()));
        }
        tracing::debug!("tflite: created NNAPI delegate");
        Ok(Self {
            lib: Arc::clone(lib),
            delegate,
            _options: options,
            _strings: [accelerator_name, cache_dir, model_token],
        })
    }
}

impl Drop for NnApiDelegate {
    fn drop(&mut self) {
        if !self.delegate.is_null() {
            if let Some(delete) = self.lib.nnapi_delegate_delete {
                unsafe { delete(self.delegate) };
            }
            self.delegate = ptr::null_mut();
        }
    }
}

/// Any supported hardware delegate.
pub enum Delegate {
    Gpu(GpuDelegate),
    NnApi(NnApiDelegate),
}

unsafe impl Send for Delegate {}

impl Delegate {
    fn as_ptr(&self) -> *mut ffi::TfLiteDelegate {
        match self {
            Delegate::Gpu(d) => d.delegate,
            Delegate::NnApi(d) => d.delegate,
        }
    }
}

impl From<GpuDelegate> for Delegate {
    fn from(d: GpuDelegate) -> Self {
        Delegate::Gpu(d)
    }
}

impl From<NnApiDelegate> for Delegate {
    fn from(d: NnApiDelegate) -> Self {
        Delegate::NnApi(d)
    }
}
