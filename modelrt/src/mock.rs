//! In-process [`Engine`] for tests and benches.
//!
//! A mock "model" is a JSON document describing the input and output
//! tensors:
//!
//! ```json
//! {
//!   "inputs":  [{"name": "x", "type": "float32", "shape": [3]}],
//!   "outputs": [{"name": "y", "type": "float32", "shape": [3]}]
//! }
//! ```
//!
//! Invoking fills each output by cycling through the concatenated input
//! bytes, unless the output declares fixed `data`. Every handle records its
//! creation and release in a shared event journal.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::delegate::{DelegateKind, DelegateOptions};
use crate::engine::{Engine, EngineError, EngineInterpreter};
use crate::tensor::{ElementType, TensorInfo};

type Journal = Rc<RefCell<Vec<String>>>;

fn record(journal: &Journal, event: impl Into<String>) {
    journal.borrow_mut().push(event.into());
}

/// One tensor of a mock model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockTensor {
    pub name: String,
    /// Element type name, e.g. "float32".
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub shape: Vec<i32>,
    /// Overrides the size computed from shape and type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<usize>,
    /// Initial contents. Outputs with data keep it across invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl MockTensor {
    pub fn new(name: &str, element_type: ElementType, shape: &[i32]) -> Self {
        Self {
            name: name.to_string(),
            element_type: element_type.name().to_ascii_lowercase(),
            shape: shape.to_vec(),
            byte_size: None,
            data: None,
        }
    }

    pub fn with_data(mut self, data: &[u8]) -> Self {
        self.byte_size = Some(data.len());
        self.data = Some(data.to_vec());
        self
    }

    fn info(&self) -> Result<TensorInfo, EngineError> {
        let element_type: ElementType = self.element_type.parse().map_err(EngineError)?;
        let byte_size = match self.byte_size {
            Some(n) => n,
            None => {
                let elements: usize = self.shape.iter().map(|d| (*d).max(0) as usize).product();
                elements * element_type.byte_size().unwrap_or(1)
            }
        };
        Ok(TensorInfo {
            name: self.name.clone(),
            element_type,
            byte_size,
            shape: self.shape.clone(),
        })
    }
}

/// A mock model description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockModel {
    #[serde(default)]
    pub inputs: Vec<MockTensor>,
    #[serde(default)]
    pub outputs: Vec<MockTensor>,
    /// Interpreter creation fails.
    #[serde(default)]
    pub fail_build: bool,
    /// Every invocation fails.
    #[serde(default)]
    pub fail_invoke: bool,
    /// Every output copy fails.
    #[serde(default)]
    pub fail_output: bool,
}

impl MockModel {
    pub fn new(inputs: Vec<MockTensor>, outputs: Vec<MockTensor>) -> Self {
        Self {
            inputs,
            outputs,
            ..Self::default()
        }
    }

    /// Serializes the description; the result is a valid model buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Engine that runs [`MockModel`] descriptions.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    journal: Journal,
    unavailable: Rc<RefCell<Vec<DelegateKind>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes creating a delegate of `kind` fail, as on a device without it.
    pub fn without_delegate(self, kind: DelegateKind) -> Self {
        self.set_delegate_available(kind, false);
        self
    }

    /// Toggles whether delegates of `kind` can be created. Shared by every
    /// clone of this engine.
    pub fn set_delegate_available(&self, kind: DelegateKind, available: bool) {
        let mut unavailable = self.unavailable.borrow_mut();
        unavailable.retain(|k| *k != kind);
        if !available {
            unavailable.push(kind);
        }
    }

    /// Events recorded so far, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    /// Events starting with `prefix`.
    pub fn events_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear_events(&self) {
        self.journal.borrow_mut().clear();
    }
}

/// Parsed model handle.
pub struct MockModelHandle {
    model: MockModel,
    journal: Journal,
}

impl Drop for MockModelHandle {
    fn drop(&mut self) {
        record(&self.journal, "drop model");
    }
}

/// Interpreter options handle.
pub struct MockOptions {
    num_threads: i32,
    delegates: Vec<DelegateKind>,
    journal: Journal,
}

impl Drop for MockOptions {
    fn drop(&mut self) {
        record(&self.journal, "drop options");
    }
}

/// Delegate handle.
pub struct MockDelegate {
    kind: DelegateKind,
    journal: Journal,
}

impl Drop for MockDelegate {
    fn drop(&mut self) {
        record(&self.journal, format!("drop delegate {}", self.kind));
    }
}

struct Slot {
    info: TensorInfo,
    data: Vec<u8>,
    fixed: bool,
}

/// Interpreter handle.
pub struct MockInterpreter {
    inputs: Vec<Slot>,
    outputs: Vec<Slot>,
    allocated: bool,
    allocated_by_delegate: bool,
    fail_invoke: bool,
    fail_output: bool,
    journal: Journal,
}

impl Drop for MockInterpreter {
    fn drop(&mut self) {
        record(&self.journal, "drop interpreter");
    }
}

fn slots(tensors: &[MockTensor]) -> Result<Vec<Slot>, EngineError> {
    tensors
        .iter()
        .map(|t| {
            let info = t.info()?;
            let mut data = vec![0u8; info.byte_size];
            if let Some(init) = &t.data {
                let n = init.len().min(data.len());
                data[..n].copy_from_slice(&init[..n]);
            }
            Ok(Slot {
                info,
                data,
                fixed: t.data.is_some(),
            })
        })
        .collect()
}

impl Engine for MockEngine {
    type Model = MockModelHandle;
    type Options = MockOptions;
    type Delegate = MockDelegate;
    type Interpreter = MockInterpreter;

    fn model_from_buffer(&self, data: &[u8]) -> Result<MockModelHandle, EngineError> {
        let model: MockModel =
            serde_json::from_slice(data).map_err(|e| EngineError(format!("parse model: {e}")))?;
        // Reject bad type names at load time, like a real flatbuffer check.
        for t in model.inputs.iter().chain(&model.outputs) {
            t.info()?;
        }
        record(&self.journal, "create model");
        Ok(MockModelHandle {
            model,
            journal: Rc::clone(&self.journal),
        })
    }

    fn model_from_file(&self, path: &Path) -> Result<MockModelHandle, EngineError> {
        let data = std::fs::read(path).map_err(|e| EngineError(format!("read {}: {e}", path.display())))?;
        self.model_from_buffer(&data)
    }

    fn create_options(&self) -> Result<MockOptions, EngineError> {
        record(&self.journal, "create options");
        Ok(MockOptions {
            num_threads: -1,
            delegates: Vec::new(),
            journal: Rc::clone(&self.journal),
        })
    }

    fn set_num_threads(&self, options: &mut MockOptions, n: i32) {
        options.num_threads = if n > 0 { n } else { -1 };
    }

    fn create_delegate(&self, options: &DelegateOptions) -> Result<MockDelegate, EngineError> {
        let kind = options.kind();
        if self.unavailable.borrow().contains(&kind) {
            return Err(EngineError(format!("{kind} delegate unavailable")));
        }
        record(&self.journal, format!("create delegate {kind}"));
        Ok(MockDelegate {
            kind,
            journal: Rc::clone(&self.journal),
        })
    }

    unsafe fn add_delegate(&self, options: &mut MockOptions, delegate: &MockDelegate) {
        options.delegates.push(delegate.kind);
    }

    fn create_interpreter(
        &self,
        model: &MockModelHandle,
        options: &MockOptions,
    ) -> Result<MockInterpreter, EngineError> {
        if model.model.fail_build {
            return Err(EngineError("model rejected by engine".into()));
        }
        let delegates: Vec<String> = options.delegates.iter().map(|k| k.to_string()).collect();
        record(
            &self.journal,
            format!(
                "create interpreter threads={} delegates=[{}]",
                options.num_threads,
                delegates.join(",")
            ),
        );
        let allocated_by_delegate = options.delegates.iter().any(|k| k.allocates_tensors());
        if allocated_by_delegate {
            record(&self.journal, "allocate by delegate");
        }
        Ok(MockInterpreter {
            inputs: slots(&model.model.inputs)?,
            outputs: slots(&model.model.outputs)?,
            allocated: allocated_by_delegate,
            allocated_by_delegate,
            fail_invoke: model.model.fail_invoke,
            fail_output: model.model.fail_output,
            journal: Rc::clone(&self.journal),
        })
    }
}

impl EngineInterpreter for MockInterpreter {
    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        if self.allocated_by_delegate {
            return Err(EngineError("tensors already allocated by delegate".into()));
        }
        self.allocated = true;
        record(&self.journal, "allocate");
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        if !self.allocated {
            return Err(EngineError("tensors not allocated".into()));
        }
        if self.fail_invoke {
            return Err(EngineError("invoke failed".into()));
        }
        let source: Vec<u8> = self.inputs.iter().flat_map(|s| s.data.iter().copied()).collect();
        for slot in self.outputs.iter_mut().filter(|s| !s.fixed) {
            if source.is_empty() {
                slot.data.fill(0);
            } else {
                for (dst, src) in slot.data.iter_mut().zip(source.iter().cycle()) {
                    *dst = *src;
                }
            }
        }
        record(&self.journal, "invoke");
        Ok(())
    }

    fn input_count(&self) -> usize {
        self.inputs.len()
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn input_tensor(&self, index: usize) -> Option<TensorInfo> {
        self.inputs.get(index).map(|s| s.info.clone())
    }

    fn output_tensor(&self, index: usize) -> Option<TensorInfo> {
        self.outputs.get(index).map(|s| s.info.clone())
    }

    fn input_data(&self, index: usize) -> Option<&[u8]> {
        self.inputs.get(index).filter(|_| self.allocated).map(|s| s.data.as_slice())
    }

    fn output_data(&self, index: usize) -> Option<&[u8]> {
        self.outputs.get(index).filter(|_| self.allocated).map(|s| s.data.as_slice())
    }

    fn copy_to_input(&mut self, index: usize, data: &[u8]) -> Result<(), EngineError> {
        if !self.allocated {
            return Err(EngineError("tensors not allocated".into()));
        }
        let slot = self
            .inputs
            .get_mut(index)
            .ok_or_else(|| EngineError(format!("no input #{index}")))?;
        if slot.data.len() != data.len() {
            return Err(EngineError(format!(
                "input #{index} has {} bytes, got {}",
                slot.data.len(),
                data.len()
            )));
        }
        slot.data.copy_from_slice(data);
        Ok(())
    }

    fn copy_from_output(&self, index: usize, out: &mut [u8]) -> Result<(), EngineError> {
        if !self.allocated {
            return Err(EngineError("tensors not allocated".into()));
        }
        if self.fail_output {
            return Err(EngineError(format!("output #{index} unreadable")));
        }
        let slot = self
            .outputs
            .get(index)
            .ok_or_else(|| EngineError(format!("no output #{index}")))?;
        if slot.data.len() != out.len() {
            return Err(EngineError(format!(
                "output #{index} has {} bytes, got {}",
                slot.data.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&slot.data);
        Ok(())
    }
}
