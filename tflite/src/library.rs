//! Run-time loading of the TensorFlow Lite C library.

use std::ffi::{CStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::TfliteError;
use crate::ffi;

/// Environment variable naming the library file to load.
pub const ENV_LIBRARY: &str = "TFLITE_LIB";
/// Environment variable naming an install prefix containing `lib/`.
pub const ENV_DIR: &str = "TFLITE_DIR";

static SHARED: OnceCell<Arc<Library>> = OnceCell::new();

/// A loaded TensorFlow Lite C library and its resolved entry points.
///
/// Every handle created from a `Library` keeps an `Arc` to it, so the
/// shared object stays mapped until the last model, interpreter or
/// delegate is released.
pub struct Library {
    pub(crate) version: ffi::VersionFn,
    pub(crate) model_create: ffi::ModelCreateFn,
    pub(crate) model_create_from_file: ffi::ModelCreateFromFileFn,
    pub(crate) model_delete: ffi::ModelDeleteFn,
    pub(crate) options_create: ffi::InterpreterOptionsCreateFn,
    pub(crate) options_delete: ffi::InterpreterOptionsDeleteFn,
    pub(crate) options_set_num_threads: ffi::InterpreterOptionsSetNumThreadsFn,
    pub(crate) options_add_delegate: ffi::InterpreterOptionsAddDelegateFn,
    pub(crate) interpreter_create: ffi::InterpreterCreateFn,
    pub(crate) interpreter_delete: ffi::InterpreterDeleteFn,
    pub(crate) interpreter_input_count: ffi::InterpreterGetTensorCountFn,
    pub(crate) interpreter_input_tensor: ffi::InterpreterGetInputTensorFn,
    pub(crate) interpreter_output_count: ffi::InterpreterGetTensorCountFn,
    pub(crate) interpreter_output_tensor: ffi::InterpreterGetOutputTensorFn,
    pub(crate) interpreter_allocate_tensors: ffi::InterpreterAllocateTensorsFn,
    pub(crate) interpreter_invoke: ffi::InterpreterInvokeFn,
    pub(crate) tensor_type: ffi::TensorTypeFn,
    pub(crate) tensor_num_dims: ffi::TensorNumDimsFn,
    pub(crate) tensor_dim: ffi::TensorDimFn,
    pub(crate) tensor_byte_size: ffi::TensorByteSizeFn,
    pub(crate) tensor_data: ffi::TensorDataFn,
    pub(crate) tensor_name: ffi::TensorNameFn,
    pub(crate) tensor_copy_from_buffer: ffi::TensorCopyFromBufferFn,
    pub(crate) tensor_copy_to_buffer: ffi::TensorCopyToBufferFn,
    pub(crate) type_get_name: ffi::TypeGetNameFn,
    // Delegate entry points are optional; most desktop builds ship without them.
    pub(crate) gpu_delegate_create: Option<ffi::GpuDelegateV2CreateFn>,
    pub(crate) gpu_delegate_delete: Option<ffi::GpuDelegateV2DeleteFn>,
    pub(crate) nnapi_delegate_create: Option<ffi::NnapiDelegateCreateFn>,
    pub(crate) nnapi_delegate_delete: Option<ffi::NnapiDelegateDeleteFn>,
    path: PathBuf,
    // Declared last: the function pointers above must not outlive the mappings.
    _delegate_lib: Option<libloading::Library>,
    _lib: libloading::Library,
}

/// Resolves a required symbol.
fn required<T: Copy>(lib: &libloading::Library, name: &'static str) -> Result<T, TfliteError> {
    optional(lib, name).ok_or(TfliteError::MissingSymbol(name))
}

/// Resolves a symbol that may be absent.
fn optional<T: Copy>(lib: &libloading::Library, name: &'static str) -> Option<T> {
    unsafe { lib.get::<T>(name.as_bytes()).ok().map(|symbol| *symbol) }
}

/// Resolves a delegate symbol, preferring the separate delegate library.
fn delegate_symbol<T: Copy>(
    lib: &libloading::Library,
    delegate_lib: Option<&libloading::Library>,
    name: &'static str,
) -> Option<T> {
    delegate_lib
        .and_then(|d| optional::<T>(d, name))
        .or_else(|| optional::<T>(lib, name))
}

fn open(path: &Path) -> Result<libloading::Library, TfliteError> {
    unsafe { libloading::Library::new(path) }.map_err(|e| TfliteError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

impl Library {
    /// Loads the library from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Self>, TfliteError> {
        Self::load_inner(path.as_ref(), None)
    }

    /// Loads the library plus a separate delegate library (for example
    /// `libtensorflowlite_gpu_delegate.so`). Delegate symbols are looked up
    /// in the delegate library first and in the main library second.
    pub fn load_with_delegate_library(
        path: impl AsRef<Path>,
        delegate_path: impl AsRef<Path>,
    ) -> Result<Arc<Self>, TfliteError> {
        Self::load_inner(path.as_ref(), Some(delegate_path.as_ref()))
    }

    /// Loads the library from the default locations: `$TFLITE_LIB`,
    /// `$TFLITE_DIR/lib/<platform name>`, then the bare platform name
    /// resolved by the system loader.
    pub fn load_default() -> Result<Arc<Self>, TfliteError> {
        let mut last_error = None;
        for candidate in default_candidates() {
            match Self::load(&candidate) {
                Ok(lib) => return Ok(lib),
                Err(e) => {
                    tracing::debug!("tflite: {} not loadable: {}", candidate.display(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| TfliteError::Internal("no library candidates".into())))
    }

    /// Returns a process-wide library loaded with [`Library::load_default`].
    /// The first successful load is cached.
    pub fn shared() -> Result<Arc<Self>, TfliteError> {
        SHARED.get_or_try_init(Self::load_default).cloned()
    }

    fn load_inner(path: &Path, delegate_path: Option<&Path>) -> Result<Arc<Self>, TfliteError> {
        let lib = open(path)?;
        let delegate_lib = delegate_path.map(open).transpose()?;

        let gpu_delegate_create = delegate_symbol(&lib, delegate_lib.as_ref(), "TfLiteGpuDelegateV2Create");
        let gpu_delegate_delete = delegate_symbol(&lib, delegate_lib.as_ref(), "TfLiteGpuDelegateV2Delete");
        let nnapi_delegate_create =
            delegate_symbol(&lib, delegate_lib.as_ref(), "TfLiteNnapiDelegateCreate");
        let nnapi_delegate_delete =
            delegate_symbol(&lib, delegate_lib.as_ref(), "TfLiteNnapiDelegateDelete");

        let library = Self {
            version: required(&lib, "TfLiteVersion")?,
            model_create: required(&lib, "TfLiteModelCreate")?,
            model_create_from_file: required(&lib, "TfLiteModelCreateFromFile")?,
            model_delete: required(&lib, "TfLiteModelDelete")?,
            options_create: required(&lib, "TfLiteInterpreterOptionsCreate")?,
            options_delete: required(&lib, "TfLiteInterpreterOptionsDelete")?,
            options_set_num_threads: required(&lib, "TfLiteInterpreterOptionsSetNumThreads")?,
            options_add_delegate: required(&lib, "TfLiteInterpreterOptionsAddDelegate")?,
            interpreter_create: required(&lib, "TfLiteInterpreterCreate")?,
            interpreter_delete: required(&lib, "TfLiteInterpreterDelete")?,
            interpreter_input_count: required(&lib, "TfLiteInterpreterGetInputTensorCount")?,
            interpreter_input_tensor: required(&lib, "TfLiteInterpreterGetInputTensor")?,
            interpreter_output_count: required(&lib, "TfLiteInterpreterGetOutputTensorCount")?,
            interpreter_output_tensor: required(&lib, "TfLiteInterpreterGetOutputTensor")?,
            interpreter_allocate_tensors: required(&lib, "TfLiteInterpreterAllocateTensors")?,
            interpreter_invoke: required(&lib, "TfLiteInterpreterInvoke")?,
            tensor_type: required(&lib, "TfLiteTensorType")?,
            tensor_num_dims: required(&lib, "TfLiteTensorNumDims")?,
            tensor_dim: required(&lib, "TfLiteTensorDim")?,
            tensor_byte_size: required(&lib, "TfLiteTensorByteSize")?,
            tensor_data: required(&lib, "TfLiteTensorData")?,
            tensor_name: required(&lib, "TfLiteTensorName")?,
            tensor_copy_from_buffer: required(&lib, "TfLiteTensorCopyFromBuffer")?,
            tensor_copy_to_buffer: required(&lib, "TfLiteTensorCopyToBuffer")?,
            type_get_name: required(&lib, "TfLiteTypeGetName")?,
            gpu_delegate_create,
            gpu_delegate_delete,
            nnapi_delegate_create,
            nnapi_delegate_delete,
            path: path.to_path_buf(),
            _delegate_lib: delegate_lib,
            _lib: lib,
        };

        tracing::debug!(
            "tflite: loaded {} (version {})",
            library.path.display(),
            library.version()
        );
        Ok(Arc::new(library))
    }

    /// Returns the TensorFlow Lite version string reported by the library.
    pub fn version(&self) -> String {
        unsafe {
            let ptr = (self.version)();
            if ptr.is_null() {
                return String::new();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }

    /// Returns the path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the engine's name for a `TfLiteType` code (e.g. "FLOAT32").
    pub fn type_name(&self, code: i32) -> String {
        unsafe {
            let ptr = (self.type_get_name)(code);
            if ptr.is_null() {
                return "UNKNOWN".to_string();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }

    /// True if the GPU delegate entry points were found.
    pub fn has_gpu_delegate(&self) -> bool {
        self.gpu_delegate_create.is_some() && self.gpu_delegate_delete.is_some()
    }

    /// True if the NNAPI delegate entry points were found.
    pub fn has_nnapi_delegate(&self) -> bool {
        self.nnapi_delegate_create.is_some() && self.nnapi_delegate_delete.is_some()
    }
}

/// Platform file name of the C library, e.g. `libtensorflowlite_c.so`.
pub fn default_library_name() -> OsString {
    libloading::library_filename("tensorflowlite_c")
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = std::env::var_os(ENV_LIBRARY).filter(|p| !p.is_empty()) {
        candidates.push(PathBuf::from(path));
    }
    if let Some(dir) = std::env::var_os(ENV_DIR).filter(|p| !p.is_empty()) {
        candidates.push(PathBuf::from(dir).join("lib").join(default_library_name()));
    }
    candidates.push(PathBuf::from(default_library_name()));
    candidates
}
