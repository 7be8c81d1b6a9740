use bytes::Bytes;
use smallvec::SmallVec;

use crate::{Error, Result};

/// Largest element count a single initializer may hold (1 GiB of `f32`).
pub const MAX_TENSOR_ELEMENTS: usize = 1 << 28;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
}

impl DType {
    pub fn byte_size(&self) -> usize {
        match self {
            DType::F32 => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 4]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    /// Element count, saturating at `usize::MAX`.
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }
    pub fn checked_numel(&self) -> Option<usize> {
        self.0
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(*d))
            .map(|n| n.max(1))
    }
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Rejects zero-sized dimensions.
    pub fn ensure_positive(&self, what: &str) -> Result<()> {
        if let Some(axis) = self.0.iter().position(|d| *d == 0) {
            return Err(Error::Shape(format!(
                "{what} has non-positive dimension at axis {axis} (shape {self})"
            )));
        }
        Ok(())
    }

    /// Positive dimensions and at most [`MAX_TENSOR_ELEMENTS`] elements.
    /// Returns the element count.
    pub fn ensure_allocatable(&self, what: &str) -> Result<usize> {
        self.ensure_positive(what)?;
        self.checked_numel()
            .filter(|n| *n <= MAX_TENSOR_ELEMENTS)
            .ok_or_else(|| {
                Error::Shape(format!(
                    "{what} with shape {self} exceeds {MAX_TENSOR_ELEMENTS} elements"
                ))
            })
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// A named tensor in a graph.
///
/// Initializers carry their values as little-endian bytes in `data`; graph
/// input and output descriptors leave it empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub data: Option<Bytes>,
}

impl Tensor {
    pub fn descriptor(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            dtype: DType::F32,
            shape,
            data: None,
        }
    }

    pub fn from_f32(name: impl Into<String>, shape: Shape, values: &[f32]) -> Result<Self> {
        let name = name.into();
        let numel = shape.ensure_allocatable(&format!("tensor `{name}`"))?;
        if values.len() != numel {
            return Err(Error::Shape(format!(
                "tensor `{name}` has {} values but shape {shape} holds {numel}",
                values.len()
            )));
        }
        Ok(Self {
            name,
            dtype: DType::F32,
            shape,
            data: Some(bytes_from_f32(values)),
        })
    }

    pub fn zeros(name: impl Into<String>, shape: Shape) -> Result<Self> {
        let name = name.into();
        let numel = shape.ensure_allocatable(&format!("tensor `{name}`"))?;
        let values = vec![0.0f32; numel];
        Self::from_f32(name, shape, &values)
    }

    pub fn is_initializer(&self) -> bool {
        self.data.is_some()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Byte length the shape calls for.
    pub fn expected_byte_len(&self) -> usize {
        self.numel().saturating_mul(self.dtype.byte_size())
    }

    pub fn byte_len(&self) -> usize {
        self.data.as_ref().map_or(0, Bytes::len)
    }

    pub fn to_f32(&self) -> Vec<f32> {
        match &self.data {
            Some(bytes) => bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            None => Vec::new(),
        }
    }
}

fn bytes_from_f32(values: &[f32]) -> Bytes {
    let mut buf = Vec::with_capacity(values.len() * 4);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Bytes::from(buf)
}
