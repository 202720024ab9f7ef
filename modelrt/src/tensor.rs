//! Tensor metadata and host element types.

use std::fmt;
use std::str::FromStr;

use bytemuck::Pod;

/// Element type of a tensor. Discriminants are the engine's type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ElementType {
    NoType = 0,
    Float32 = 1,
    Int32 = 2,
    UInt8 = 3,
    Int64 = 4,
    String = 5,
    Bool = 6,
    Int16 = 7,
    Complex64 = 8,
    Int8 = 9,
    Float16 = 10,
    Float64 = 11,
}

impl ElementType {
    const ALL: [ElementType; 12] = [
        ElementType::NoType,
        ElementType::Float32,
        ElementType::Int32,
        ElementType::UInt8,
        ElementType::Int64,
        ElementType::String,
        ElementType::Bool,
        ElementType::Int16,
        ElementType::Complex64,
        ElementType::Int8,
        ElementType::Float16,
        ElementType::Float64,
    ];

    /// Maps an engine type code. Unknown codes return `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| *t as i32 == code)
    }

    /// Engine type code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Upper-case engine name, e.g. "FLOAT32".
    pub fn name(self) -> &'static str {
        match self {
            ElementType::NoType => "NOTYPE",
            ElementType::Float32 => "FLOAT32",
            ElementType::Int32 => "INT32",
            ElementType::UInt8 => "UINT8",
            ElementType::Int64 => "INT64",
            ElementType::String => "STRING",
            ElementType::Bool => "BOOL",
            ElementType::Int16 => "INT16",
            ElementType::Complex64 => "COMPLEX64",
            ElementType::Int8 => "INT8",
            ElementType::Float16 => "FLOAT16",
            ElementType::Float64 => "FLOAT64",
        }
    }

    /// Fixed size of one element in bytes. `None` for strings, whose size
    /// depends on the data.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            ElementType::NoType => Some(0),
            ElementType::Float32 | ElementType::Int32 => Some(4),
            ElementType::UInt8 | ElementType::Bool | ElementType::Int8 => Some(1),
            ElementType::Int64 | ElementType::Complex64 | ElementType::Float64 => Some(8),
            ElementType::Int16 | ElementType::Float16 => Some(2),
            ElementType::String => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = String;

    /// Parses an engine name, case-insensitively ("float32", "FLOAT32").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown element type {s:?}"))
    }
}

/// Metadata of one input or output tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub element_type: ElementType,
    pub byte_size: usize,
    pub shape: Vec<i32>,
}

impl TensorInfo {
    /// Shape rendered as `1x3x224x224`, or "none" for a scalar.
    pub fn shape_string(&self) -> String {
        if self.shape.is_empty() {
            return "none".to_string();
        }
        self.shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("x")
    }
}

/// Per-element byte size used for length computations.
///
/// For STRING tensors this is the length of the first string record, i.e.
/// the number of bytes before the first NUL in `data`.
pub fn element_byte_size(info: &TensorInfo, data: &[u8]) -> usize {
    match info.element_type.byte_size() {
        Some(n) => n,
        None => data.iter().position(|b| *b == 0).unwrap_or(data.len()),
    }
}

/// Number of elements: byte size divided by element size. Zero when the
/// element size is zero.
pub fn tensor_length(info: &TensorInfo, data: &[u8]) -> usize {
    match element_byte_size(info, data) {
        0 => 0,
        n => info.byte_size / n,
    }
}

/// A host element type with a known tensor element type.
pub trait TensorElement: Pod {
    const ELEMENT_TYPE: ElementType;
}

macro_rules! tensor_element {
    ($($t:ty => $e:ident),* $(,)?) => {
        $(impl TensorElement for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$e;
        })*
    };
}

tensor_element! {
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
}
