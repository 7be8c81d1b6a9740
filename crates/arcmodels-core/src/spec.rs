use crate::{DType, ExporterVariant, Tensor};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

/// Declared type of a graph input or output as it appears in a model file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: IOName,
    pub dtype: DType,
    pub dims: Vec<Option<usize>>, // None = dynamic
}

impl TensorSpec {
    /// Describes a graph IO tensor the way `variant` declares it.
    pub fn for_io(tensor: &Tensor, variant: ExporterVariant) -> Self {
        let dims = tensor
            .shape
            .dims()
            .iter()
            .enumerate()
            .map(|(axis, d)| match (variant, axis) {
                (ExporterVariant::Legacy, 0) => None,
                _ => Some(*d),
            })
            .collect();
        Self {
            name: IOName(tensor.name.clone()),
            dtype: tensor.dtype,
            dims,
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Concrete shape with every dynamic axis pinned to `fill`.
    pub fn concrete_dims(&self, fill: usize) -> Vec<usize> {
        self.dims.iter().map(|d| d.unwrap_or(fill)).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}
