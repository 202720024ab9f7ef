//! Raw FFI declarations for the TensorFlow Lite C API.
//!
//! These match `tensorflow/lite/c/c_api.h`, `delegates/gpu/delegate.h` and
//! `delegates/nnapi/nnapi_delegate_c_api.h` (TF 2.12 layout). Functions are
//! resolved from the shared library at run time, so only the signatures
//! live here.

use std::os::raw::{c_char, c_int, c_void};

// Opaque types.
pub type TfLiteModel = c_void;
pub type TfLiteInterpreterOptions = c_void;
pub type TfLiteInterpreter = c_void;
pub type TfLiteTensor = c_void;
pub type TfLiteDelegate = c_void;

/// `TfLiteStatus`; zero is `kTfLiteOk`.
pub type TfLiteStatus = c_int;
pub const TFLITE_OK: TfLiteStatus = 0;

/// `TfLiteType` enum value.
pub type TfLiteType = c_int;

// GPU delegate enum values.
pub const GPU_INFERENCE_PREFERENCE_FAST_SINGLE_ANSWER: i32 = 0;
pub const GPU_INFERENCE_PREFERENCE_SUSTAINED_SPEED: i32 = 1;
pub const GPU_INFERENCE_PRIORITY_AUTO: i32 = 0;
pub const GPU_INFERENCE_PRIORITY_MAX_PRECISION: i32 = 1;
pub const GPU_INFERENCE_PRIORITY_MIN_LATENCY: i32 = 2;
pub const GPU_INFERENCE_PRIORITY_MIN_MEMORY_USAGE: i32 = 3;
pub const GPU_EXPERIMENTAL_FLAGS_ENABLE_QUANT: i64 = 1;

// NNAPI execution preference values.
pub const NNAPI_PREFERENCE_UNDEFINED: c_int = -1;
pub const NNAPI_PREFERENCE_LOW_POWER: c_int = 0;
pub const NNAPI_PREFERENCE_FAST_SINGLE_ANSWER: c_int = 1;
pub const NNAPI_PREFERENCE_SUSTAINED_SPEED: c_int = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TfLiteGpuDelegateOptionsV2 {
    pub is_precision_loss_allowed: i32,
    pub inference_preference: i32,
    pub inference_priority1: i32,
    pub inference_priority2: i32,
    pub inference_priority3: i32,
    pub experimental_flags: i64,
    pub max_delegated_partitions: i32,
    pub serialization_dir: *const c_char,
    pub model_token: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TfLiteNnapiDelegateOptions {
    pub execution_preference: c_int,
    pub accelerator_name: *const c_char,
    pub cache_dir: *const c_char,
    pub model_token: *const c_char,
    pub disallow_nnapi_cpu: c_int,
    pub allow_fp16: c_int,
    pub max_number_delegated_partitions: c_int,
    pub nnapi_support_library_handle: *mut c_void,
}

// Core API.
pub type VersionFn = unsafe extern "C" fn() -> *const c_char;
pub type ModelCreateFn = unsafe extern "C" fn(data: *const c_void, size: usize) -> *mut TfLiteModel;
pub type ModelCreateFromFileFn = unsafe extern "C" fn(path: *const c_char) -> *mut TfLiteModel;
pub type ModelDeleteFn = unsafe extern "C" fn(model: *mut TfLiteModel);
pub type InterpreterOptionsCreateFn = unsafe extern "C" fn() -> *mut TfLiteInterpreterOptions;
pub type InterpreterOptionsDeleteFn = unsafe extern "C" fn(options: *mut TfLiteInterpreterOptions);
pub type InterpreterOptionsSetNumThreadsFn =
    unsafe extern "C" fn(options: *mut TfLiteInterpreterOptions, num_threads: i32);
pub type InterpreterOptionsAddDelegateFn =
    unsafe extern "C" fn(options: *mut TfLiteInterpreterOptions, delegate: *mut TfLiteDelegate);
pub type InterpreterCreateFn = unsafe extern "C" fn(
    model: *const TfLiteModel,
    options: *const TfLiteInterpreterOptions,
) -> *mut TfLiteInterpreter;
pub type InterpreterDeleteFn = unsafe extern "C" fn(interpreter: *mut TfLiteInterpreter);
pub type InterpreterGetTensorCountFn = unsafe extern "C" fn(interpreter: *const TfLiteInterpreter) -> i32;
pub type InterpreterGetInputTensorFn =
    unsafe extern "C" fn(interpreter: *const TfLiteInterpreter, index: i32) -> *mut TfLiteTensor;
pub type InterpreterGetOutputTensorFn =
    unsafe extern "C" fn(interpreter: *const TfLiteInterpreter, index: i32) -> *const TfLiteTensor;
pub type InterpreterAllocateTensorsFn =
    unsafe extern "C" fn(interpreter: *mut TfLiteInterpreter) -> TfLiteStatus;
pub type InterpreterInvokeFn = unsafe extern "C" fn(interpreter: *mut TfLiteInterpreter) -> TfLiteStatus;

// Tensor accessors.
pub type TensorTypeFn = unsafe extern "C" fn(tensor: *const TfLiteTensor) -> TfLiteType;
pub type TensorNumDimsFn = unsafe extern "C" fn(tensor: *const TfLiteTensor) -> i32;
pub type TensorDimFn = unsafe extern "C" fn(tensor: *const TfLiteTensor, dim_index: i32) -> i32;
pub type TensorByteSizeFn = unsafe extern "C" fn(tensor: *const TfLiteTensor) -> usize;
pub type TensorDataFn = unsafe extern "C" fn(tensor: *const TfLiteTensor) -> *mut c_void;
pub type TensorNameFn = unsafe extern "C" fn(tensor: *const TfLiteTensor) -> *const c_char;
pub type TensorCopyFromBufferFn = unsafe extern "C" fn(
    tensor: *mut TfLiteTensor,
    input_data: *const c_void,
    input_data_size: usize,
) -> TfLiteStatus;
pub type TensorCopyToBufferFn = unsafe extern "C" fn(
    tensor: *const TfLiteTensor,
    output_data: *mut c_void,
    output_data_size: usize,
) -> TfLiteStatus;
pub type TypeGetNameFn = unsafe extern "C" fn(ty: TfLiteType) -> *const c_char;

// Delegates.
pub type GpuDelegateV2CreateFn =
    unsafe extern "C" fn(options: *const TfLiteGpuDelegateOptionsV2) -> *mut TfLiteDelegate;
pub type GpuDelegateV2DeleteFn = unsafe extern "C" fn(delegate: *mut TfLiteDelegate);
pub type NnapiDelegateCreateFn =
    unsafe extern "C" fn(options: *const TfLiteNnapiDelegateOptions) -> *mut TfLiteDelegate;
pub type NnapiDelegateDeleteFn = unsafe extern "C" fn(delegate: *mut TfLiteDelegate);
