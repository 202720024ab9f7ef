//! Typed input binding and output retrieval on [`ModelRunner`].

use bytemuck::Pod;

use crate::engine::{Engine, EngineInterpreter};
use crate::error::RunnerError;
use crate::runner::ModelRunner;
use crate::tensor::{TensorElement, TensorInfo};

/// Binds each argument to the next input slot of a runner, in order.
///
/// Expands to a sequence of [`ModelRunner::set_input`] calls and stops at
/// the first error.
///
/// ```ignore
/// set_inputs!(runner, &features, &mask)?;
/// runner.invoke()?;
/// ```
#[macro_export]
macro_rules! set_inputs {
    ($runner:expr $(, $input:expr)+ $(,)?) => {{
        let runner = &mut $runner;
        let result: ::std::result::Result<(), $crate::RunnerError> = Ok(());
        $( let result = result.and_then(|()| runner.set_input($input).map(|_| ())); )+
        result
    }};
}

impl<E: Engine> ModelRunner<E> {
    fn interpreter_mut(&mut self) -> Result<&mut E::Interpreter, RunnerError> {
        self.interpreter.as_mut().ok_or(RunnerError::NotBuilt)
    }

    fn interpreter_ref(&self) -> Result<&E::Interpreter, RunnerError> {
        self.interpreter.as_ref().ok_or(RunnerError::NotBuilt)
    }

    /// Copies `data` into input `index`. Exactly the tensor's byte size is
    /// copied; `data` may be longer.
    fn copy_input(&mut self, index: usize, data: &[u8]) -> Result<(), RunnerError> {
        let interpreter = self.interpreter_mut()?;
        let count = interpreter.input_count();
        let Some(info) = interpreter.input_tensor(index).filter(|_| index < count) else {
            tracing::error!("modelrt: input index {index} out of range ({count} inputs)");
            return Err(RunnerError::InputIndexOutOfRange { index, count });
        };
        if data.len() < info.byte_size {
            return Err(RunnerError::BufferTooSmall {
                index,
                expected: info.byte_size,
                got: data.len(),
            });
        }
        interpreter
            .copy_to_input(index, &data[..info.byte_size])
            .map_err(|e| RunnerError::TensorCopy(e.0))?;
        tracing::trace!("modelrt: bound input #{index} ({} bytes)", info.byte_size);
        Ok(())
    }

    /// Binds `data` to the input at the cursor and advances the cursor.
    ///
    /// Binding past the last input fails with
    /// [`RunnerError::InputIndexOutOfRange`]; no tensor is touched and the
    /// cursor does not move.
    pub fn set_input<T: Pod>(&mut self, data: &[T]) -> Result<&mut Self, RunnerError> {
        let index = self.input_cursor;
        self.copy_input(index, bytemuck::cast_slice(data))?;
        self.input_cursor += 1;
        Ok(self)
    }

    /// Binds `data` to input `index` without using the cursor.
    pub fn set_input_at<T: Pod>(&mut self, index: usize, data: &[T]) -> Result<&mut Self, RunnerError> {
        self.copy_input(index, bytemuck::cast_slice(data))?;
        Ok(self)
    }

    /// Binds `inputs[i]` to input `i` for every `i`.
    ///
    /// All buffers are checked before any is copied, so a failed call leaves
    /// the input tensors untouched. On success the cursor points past the
    /// last bound input.
    pub fn bind_inputs(&mut self, inputs: &[&[u8]]) -> Result<&mut Self, RunnerError> {
        let interpreter = self.interpreter_ref()?;
        let count = interpreter.input_count();
        if inputs.len() > count {
            return Err(RunnerError::InputIndexOutOfRange { index: count, count });
        }
        for (index, data) in inputs.iter().enumerate() {
            let info = interpreter
                .input_tensor(index)
                .ok_or(RunnerError::InputIndexOutOfRange { index, count })?;
            if data.len() < info.byte_size {
                return Err(RunnerError::BufferTooSmall {
                    index,
                    expected: info.byte_size,
                    got: data.len(),
                });
            }
        }
        for (index, data) in inputs.iter().enumerate() {
            self.copy_input(index, data)?;
        }
        self.input_cursor = inputs.len();
        Ok(self)
    }

    /// Index the next [`set_input`](Self::set_input) binds to.
    pub fn input_cursor(&self) -> usize {
        self.input_cursor
    }

    /// Runs one inference pass. Blocks until the engine returns.
    ///
    /// The input cursor is reset to 0 whatever the outcome.
    pub fn invoke(&mut self) -> Result<(), RunnerError> {
        let result = match self.interpreter.as_mut() {
            Some(interpreter) => interpreter
                .invoke()
                .map_err(|e| RunnerError::Invocation(e.0)),
            None => Err(RunnerError::NotBuilt),
        };
        self.input_cursor = 0;
        match &result {
            Ok(()) => tracing::trace!("modelrt: invoked"),
            Err(e) => tracing::debug!("{e}"),
        }
        result
    }

    fn output_info(&self, index: usize) -> Result<TensorInfo, RunnerError> {
        let interpreter = self.interpreter_ref()?;
        let count = interpreter.output_count();
        interpreter
            .output_tensor(index)
            .filter(|_| index < count)
            .ok_or(RunnerError::OutputIndexOutOfRange { index, count })
    }

    /// Copies output `index` into `out` and returns the number of bytes
    /// written. `out` must hold at least the tensor's byte size.
    pub fn copy_output(&self, index: usize, out: &mut [u8]) -> Result<usize, RunnerError> {
        let info = self.output_info(index)?;
        if out.len() < info.byte_size {
            return Err(RunnerError::TensorCopy(format!(
                "output #{index} needs {} bytes, buffer has {}",
                info.byte_size,
                out.len()
            )));
        }
        self.interpreter_ref()?
            .copy_from_output(index, &mut out[..info.byte_size])
            .map_err(|e| RunnerError::TensorCopy(e.0))?;
        Ok(info.byte_size)
    }

    /// Reads output `index` into `out` as `byte_size / size_of::<T>()`
    /// elements and returns that count. On error `out` is left unchanged.
    ///
    /// The bytes are reinterpreted as `T` without checking the tensor's
    /// element type; see [`output_checked`](Self::output_checked).
    pub fn output_into<T: Pod>(&self, index: usize, out: &mut Vec<T>) -> Result<usize, RunnerError> {
        let info = self.output_info(index)?;
        let mut bytes = vec![0u8; info.byte_size];
        self.copy_output(index, &mut bytes)?;

        out.clear();
        let size = std::mem::size_of::<T>();
        if size == 0 {
            return Ok(0);
        }
        // Trailing bytes that do not fill a whole element are dropped.
        let len = info.byte_size / size;
        out.resize(len, T::zeroed());
        bytemuck::cast_slice_mut::<T, u8>(out.as_mut_slice()).copy_from_slice(&bytes[..len * size]);
        Ok(len)
    }

    /// Returns output `index` as a vector of `T`.
    ///
    /// The bytes are reinterpreted as `T` without checking the tensor's
    /// element type. Reading a FLOAT32 tensor as `u8` yields four times as
    /// many elements.
    pub fn output<T: Pod>(&self, index: usize) -> Result<Vec<T>, RunnerError> {
        let mut out = Vec::new();
        self.output_into(index, &mut out)?;
        Ok(out)
    }

    /// Like [`output`](Self::output), but fails with
    /// [`RunnerError::TypeMismatch`] if `T` does not match the tensor's
    /// element type.
    pub fn output_checked<T: TensorElement>(&self, index: usize) -> Result<Vec<T>, RunnerError> {
        let info = self.output_info(index)?;
        if info.element_type != T::ELEMENT_TYPE {
            return Err(RunnerError::TypeMismatch {
                index,
                actual: info.element_type,
                requested: T::ELEMENT_TYPE,
            });
        }
        self.output(index)
    }

    /// Returns every output as a vector of `T`, in index order.
    pub fn outputs<T: Pod>(&self) -> Result<Vec<Vec<T>>, RunnerError> {
        (0..self.output_tensor_count()).map(|i| self.output(i)).collect()
    }
}
