//! [`ModelRunner`]: owns the model, options, delegates and interpreter of
//! one loaded network and sequences their creation and release.

use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};

use crate::delegate::{DelegateKind, DelegateOptions};
use crate::engine::{Engine, EngineInterpreter};
use crate::error::RunnerError;
use crate::registry;
use crate::tensor::{TensorInfo, tensor_length};

/// Where a model comes from.
#[derive(Debug, Clone, Copy)]
pub enum ModelSource<'a> {
    /// An in-memory flatbuffer. The engine keeps its own copy.
    Buffer(&'a [u8]),
    /// A model file on disk.
    File(&'a Path),
    /// A model registered with [`register_model`](crate::register_model).
    Registered(&'a str),
}

/// A delegate handle together with the options it was created from.
pub(crate) struct AttachedDelegate<E: Engine> {
    pub(crate) handle: E::Delegate,
    pub(crate) options: DelegateOptions,
}

/// Owns one network and the engine resources needed to run it.
///
/// Lifecycle:
///
/// 1. [`build_model_from_buffer`](Self::build_model_from_buffer) or
///    [`build_model_from_file`](Self::build_model_from_file) loads the model
///    and creates fresh default interpreter options. Threads and delegates
///    from a previous model are discarded.
/// 2. [`set_num_threads`](Self::set_num_threads) and
///    [`attach_delegate`](Self::attach_delegate) configure those options.
/// 3. [`build_interpreter`](Self::build_interpreter) creates the interpreter
///    and allocates tensors, unless an attached delegate allocates them.
/// 4. Bind inputs, [`invoke`](Self::invoke), read outputs, repeat.
///
/// Resources are released interpreter first, then options, then model,
/// then delegates.
///
/// A runner is not synchronized. Use it from one thread at a time.
pub struct ModelRunner<E: Engine> {
    // Declaration order is release order; see the Drop impl.
    pub(crate) interpreter: Option<E::Interpreter>,
    pub(crate) options: Option<E::Options>,
    pub(crate) model: Option<E::Model>,
    pub(crate) delegates: Vec<AttachedDelegate<E>>,
    pub(crate) num_threads: Option<i32>,
    // Set once the options have been handed to create_interpreter.
    pub(crate) options_consumed: bool,
    pub(crate) input_cursor: usize,
    pub(crate) engine: E,
}

impl<E: Engine> ModelRunner<E> {
    /// Creates an empty runner. Nothing is loaded.
    pub fn new(engine: E) -> Self {
        Self {
            interpreter: None,
            options: None,
            model: None,
            delegates: Vec::new(),
            num_threads: None,
            options_consumed: false,
            input_cursor: 0,
            engine,
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    // -----------------------------------------------------------------------
    // Model
    // -----------------------------------------------------------------------

    /// Loads a model from memory, discarding any previous model, options,
    /// delegates and interpreter. On failure the runner holds no model.
    pub fn build_model_from_buffer(&mut self, data: &[u8]) -> Result<&mut Self, RunnerError> {
        self.build_model(ModelSource::Buffer(data))
    }

    /// Loads a model from a file, discarding any previous model, options,
    /// delegates and interpreter. On failure the runner holds no model.
    pub fn build_model_from_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, RunnerError> {
        self.build_model(ModelSource::File(path.as_ref()))
    }

    /// Loads a model from `source`.
    pub fn build_model(&mut self, source: ModelSource<'_>) -> Result<&mut Self, RunnerError> {
        self.release_model();
        self.delegates.clear();
        self.num_threads = None;

        let model = match source {
            ModelSource::Buffer(data) => {
                if data.is_empty() {
                    return Err(RunnerError::ModelLoad("empty model buffer".into()));
                }
                self.engine.model_from_buffer(data)
            }
            ModelSource::File(path) => self.engine.model_from_file(path),
            ModelSource::Registered(id) => {
                let data = registry::model_data(id)
                    .ok_or_else(|| RunnerError::ModelLoad(format!("model {id:?} not registered")))?;
                self.engine.model_from_buffer(data)
            }
        }
        .map_err(|e| RunnerError::ModelLoad(e.0))?;
        self.model = Some(model);

        if let Err(e) = self.reset_options() {
            self.release_model();
            return Err(e);
        }
        tracing::debug!("modelrt: model loaded from {}", source_label(&source));
        Ok(self)
    }

    /// True if a model is loaded.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    // -----------------------------------------------------------------------
    // Options and delegates
    // -----------------------------------------------------------------------

    /// Sets the interpreter thread count. `n <= 0` selects the engine default.
    ///
    /// Needs a loaded model. Has no effect on an interpreter that is already
    /// built; a later [`build_interpreter`](Self::build_interpreter) uses it.
    pub fn set_num_threads(&mut self, n: i32) -> Result<&mut Self, RunnerError> {
        let Some(options) = self.options.as_mut() else {
            return Err(RunnerError::NoModel);
        };
        self.engine.set_num_threads(options, n);
        self.num_threads = (n > 0).then_some(n);
        if self.interpreter.is_some() {
            tracing::warn!("modelrt: thread count changed after build; applies to the next build");
        }
        Ok(self)
    }

    /// Thread count, or `None` for the engine default.
    pub fn num_threads(&self) -> Option<i32> {
        self.num_threads
    }

    /// Creates a delegate from a copy of `options` and registers it with the
    /// interpreter options. One delegate per kind.
    ///
    /// Needs a loaded model. Has no effect on an interpreter that is already
    /// built; a later [`build_interpreter`](Self::build_interpreter) uses it.
    pub fn attach_delegate(&mut self, options: impl Into<DelegateOptions>) -> Result<&mut Self, RunnerError> {
        let options = options.into();
        let kind = options.kind();
        if self.options.is_none() {
            return Err(RunnerError::NoModel);
        }
        if self.delegates.iter().any(|d| d.options.kind() == kind) {
            return Err(RunnerError::DuplicateDelegate(kind));
        }

        let handle = self
            .engine
            .create_delegate(&options)
            .map_err(|e| RunnerError::Delegate(e.0))?;
        if let Some(engine_options) = self.options.as_mut() {
            // The handle is stored in `self.delegates`, which is released last.
            unsafe { self.engine.add_delegate(engine_options, &handle) };
        }
        if self.interpreter.is_some() {
            tracing::warn!("modelrt: {kind} delegate attached after build; applies to the next build");
        }
        self.delegates.push(AttachedDelegate { handle, options });
        tracing::debug!("modelrt: {kind} delegate attached");
        Ok(self)
    }

    /// Kinds of the attached delegates, in attach order.
    pub fn delegate_kinds(&self) -> Vec<DelegateKind> {
        self.delegates.iter().map(|d| d.options.kind()).collect()
    }

    /// Options of the attached delegates, in attach order.
    pub fn delegate_options(&self) -> impl Iterator<Item = &DelegateOptions> {
        self.delegates.iter().map(|d| &d.options)
    }

    // -----------------------------------------------------------------------
    // Interpreter
    // -----------------------------------------------------------------------

    /// Builds the interpreter from the loaded model and options, then
    /// allocates tensors unless an attached delegate allocates them.
    ///
    /// On failure the runner is left not built.
    pub fn build_interpreter(&mut self) -> Result<&mut Self, RunnerError> {
        if self.interpreter.is_some() {
            tracing::warn!("modelrt: rebuilding over a live interpreter");
            self.release_interpreter();
        }
        if self.model.is_none() {
            return Err(RunnerError::InterpreterBuild("no model loaded".into()));
        }
        // A delegate is applied to one interpreter only. Options that went
        // into an earlier attempt, or that a failed reset left behind, are
        // recreated together with fresh delegate handles.
        if self.options_consumed || self.options.is_none() {
            self.reset_options()?;
        }

        let (Some(model), Some(options)) = (self.model.as_ref(), self.options.as_ref()) else {
            return Err(RunnerError::InterpreterBuild("interpreter options missing".into()));
        };
        self.options_consumed = true;
        let mut interpreter = self
            .engine
            .create_interpreter(model, options)
            .map_err(|e| RunnerError::InterpreterBuild(e.0))?;

        if self.delegates.iter().any(|d| d.options.kind().allocates_tensors()) {
            tracing::debug!("modelrt: tensor allocation left to delegate");
        } else {
            interpreter
                .allocate_tensors()
                .map_err(|e| RunnerError::InterpreterBuild(e.0))?;
        }

        tracing::debug!(
            "modelrt: interpreter built ({} inputs, {} outputs)",
            interpreter.input_count(),
            interpreter.output_count()
        );
        self.interpreter = Some(interpreter);
        self.input_cursor = 0;
        Ok(self)
    }

    /// True iff an interpreter is built.
    pub fn is_built(&self) -> bool {
        self.interpreter.is_some()
    }

    // -----------------------------------------------------------------------
    // Tensor metadata
    // -----------------------------------------------------------------------

    /// Number of input tensors; 0 when not built.
    pub fn input_tensor_count(&self) -> usize {
        self.interpreter.as_ref().map_or(0, |i| i.input_count())
    }

    /// Number of output tensors; 0 when not built.
    pub fn output_tensor_count(&self) -> usize {
        self.interpreter.as_ref().map_or(0, |i| i.output_count())
    }

    /// Metadata of input `index`, or `None` when not built or out of range.
    pub fn input_tensor(&self, index: usize) -> Option<TensorInfo> {
        self.interpreter.as_ref()?.input_tensor(index)
    }

    /// Metadata of output `index`, or `None` when not built or out of range.
    pub fn output_tensor(&self, index: usize) -> Option<TensorInfo> {
        self.interpreter.as_ref()?.output_tensor(index)
    }

    /// Metadata of every input, in index order.
    pub fn input_tensors(&self) -> Vec<TensorInfo> {
        (0..self.input_tensor_count())
            .filter_map(|i| self.input_tensor(i))
            .collect()
    }

    /// Metadata of every output, in index order.
    pub fn output_tensors(&self) -> Vec<TensorInfo> {
        (0..self.output_tensor_count())
            .filter_map(|i| self.output_tensor(i))
            .collect()
    }

    /// Element count of input `index`.
    pub fn input_tensor_length(&self, index: usize) -> Option<usize> {
        let interpreter = self.interpreter.as_ref()?;
        let info = interpreter.input_tensor(index)?;
        let data = interpreter.input_data(index).unwrap_or_default();
        Some(tensor_length(&info, data))
    }

    /// Element count of output `index`.
    pub fn output_tensor_length(&self, index: usize) -> Option<usize> {
        let interpreter = self.interpreter.as_ref()?;
        let info = interpreter.output_tensor(index)?;
        let data = interpreter.output_data(index).unwrap_or_default();
        Some(tensor_length(&info, data))
    }

    // -----------------------------------------------------------------------
    // Release
    // -----------------------------------------------------------------------

    fn release_interpreter(&mut self) {
        if self.interpreter.take().is_some() {
            tracing::debug!("modelrt: interpreter released");
        }
        self.input_cursor = 0;
    }

    /// Releases interpreter, options and model, in that order. Delegates
    /// are kept.
    fn release_model(&mut self) {
        self.release_interpreter();
        self.options = None;
        self.options_consumed = false;
        if self.model.take().is_some() {
            tracing::debug!("modelrt: model released");
        }
    }

    /// Recreates the options and the delegate handles from the stored
    /// settings. The interpreter must already be released.
    fn reset_options(&mut self) -> Result<(), RunnerError> {
        debug_assert!(self.interpreter.is_none());
        self.options = None;
        self.options_consumed = false;

        for attached in &mut self.delegates {
            let handle = self
                .engine
                .create_delegate(&attached.options)
                .map_err(|e| RunnerError::Delegate(e.0))?;
            attached.handle = handle;
        }

        let mut options = self
            .engine
            .create_options()
            .map_err(|e| RunnerError::ModelLoad(e.0))?;
        if let Some(n) = self.num_threads {
            self.engine.set_num_threads(&mut options, n);
        }
        for attached in &self.delegates {
            // Delegates outlive the options: see the field order of ModelRunner.
            unsafe { self.engine.add_delegate(&mut options, &attached.handle) };
        }
        self.options = Some(options);
        Ok(())
    }

    /// Releases everything, including delegates and the thread count.
    pub fn reset(&mut self) {
        self.release_model();
        self.delegates.clear();
        self.num_threads = None;
    }
}

impl<E: Engine + Clone> ModelRunner<E> {
    /// Moves all resources out into a new runner, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        let empty = ModelRunner::new(self.engine.clone());
        mem::replace(self, empty)
    }
}

impl<E: Engine> fmt::Debug for ModelRunner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRunner")
            .field("has_model", &self.model.is_some())
            .field("is_built", &self.interpreter.is_some())
            .field("delegates", &self.delegate_kinds())
            .field("num_threads", &self.num_threads)
            .field("options_consumed", &self.options_consumed)
            .field("input_cursor", &self.input_cursor)
            .finish()
    }
}

impl<E: Engine + Default> Default for ModelRunner<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: Engine> Drop for ModelRunner<E> {
    fn drop(&mut self) {
        if self.model.is_none() && self.delegates.is_empty() {
            return;
        }
        self.release_model();
        self.delegates.clear();
        tracing::debug!("modelrt: runner dropped");
    }
}

fn source_label(source: &ModelSource<'_>) -> String {
    match source {
        ModelSource::Buffer(data) => format!("buffer ({} bytes)", data.len()),
        ModelSource::File(path) => format!("file {}", path.display()),
        ModelSource::Registered(id) => format!("registry {id:?}"),
    }
}

/// Owned form of [`ModelSource`], used by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedModelSource {
    File(PathBuf),
    Registered(String),
}

impl OwnedModelSource {
    /// Borrows this as a [`ModelSource`].
    pub fn as_source(&self) -> ModelSource<'_> {
        match self {
            OwnedModelSource::File(p) => ModelSource::File(p),
            OwnedModelSource::Registered(id) => ModelSource::Registered(id),
        }
    }
}
