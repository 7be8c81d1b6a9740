//! Structural checks on the serialized form.
//!
//! These run against the ONNX message itself rather than the core graph, so
//! they also catch lowering mistakes and problems in files read back from
//! disk.

use std::collections::HashSet;

use arcmodels_core::{
    default_ir_version, OpKind, Result, ValidationError, ValidationErrorKind, MAX_OPSET,
    MIN_OPSET,
};
use arcmodels_proto::onnx::{self, tensor_shape_proto::dimension, type_proto, DATA_TYPE_FLOAT};

fn fail(kind: ValidationErrorKind, detail: String) -> arcmodels_core::Error {
    ValidationError::new(kind, detail).into()
}

pub fn check_model(model: &onnx::ModelProto) -> Result<()> {
    let opset = model
        .opset_import
        .iter()
        .find(|o| o.domain.is_empty() || o.domain == "ai.onnx")
        .ok_or_else(|| {
            fail(
                ValidationErrorKind::Metadata,
                "no opset import for the default domain".to_string(),
            )
        })?;
    if !(MIN_OPSET..=MAX_OPSET).contains(&opset.version) {
        return Err(fail(
            ValidationErrorKind::Metadata,
            format!("unsupported opset version {}", opset.version),
        ));
    }
    if model.ir_version < default_ir_version(opset.version) {
        return Err(fail(
            ValidationErrorKind::Metadata,
            format!(
                "ir_version {} is too old for opset {}",
                model.ir_version, opset.version
            ),
        ));
    }

    let graph = model.graph.as_ref().ok_or_else(|| {
        fail(ValidationErrorKind::Metadata, "model has no graph".to_string())
    })?;
    check_graph(graph)
}

pub fn check_graph(graph: &onnx::GraphProto) -> Result<()> {
    if graph.name.is_empty() {
        return Err(fail(
            ValidationErrorKind::Metadata,
            "graph name is empty".to_string(),
        ));
    }
    if graph.input.is_empty() || graph.output.is_empty() {
        return Err(fail(
            ValidationErrorKind::Metadata,
            "graph declares no input or no output".to_string(),
        ));
    }
    for info in graph.input.iter().chain(&graph.output) {
        check_value_info(info)?;
    }

    let mut defined: HashSet<&str> = HashSet::new();
    for info in &graph.input {
        if !defined.insert(&info.name) {
            return Err(fail(
                ValidationErrorKind::DuplicateName,
                format!("graph input `{}` declared twice", info.name),
            ));
        }
    }
    for tensor in &graph.initializer {
        check_initializer(tensor)?;
        // Initializers may double as graph inputs (IR < 4 style).
        defined.insert(&tensor.name);
    }

    for node in &graph.node {
        let op = OpKind::from_op_type(&node.op_type)
            .filter(|_| node.domain.is_empty() || node.domain == "ai.onnx")
            .ok_or_else(|| {
                fail(
                    ValidationErrorKind::UnsupportedOperator,
                    format!("node `{}` uses `{}`", node.name, node.op_type),
                )
            })?;
        if node.input.len() != op.arity() || node.output.len() != 1 {
            return Err(fail(
                ValidationErrorKind::Arity,
                format!(
                    "node `{}` ({}) has {} inputs and {} outputs",
                    node.name,
                    node.op_type,
                    node.input.len(),
                    node.output.len()
                ),
            ));
        }
        for input in &node.input {
            if !defined.contains(input.as_str()) {
                return Err(fail(
                    ValidationErrorKind::UnresolvedInput,
                    format!(
                        "node `{}` input `{input}` is not defined before use (graph is not topologically sorted)",
                        node.name
                    ),
                ));
            }
        }
        for output in &node.output {
            if output.is_empty() || !defined.insert(output) {
                return Err(fail(
                    ValidationErrorKind::DuplicateName,
                    format!("node `{}` output `{output}` is not a fresh name", node.name),
                ));
            }
        }
    }

    for info in &graph.output {
        if !defined.contains(info.name.as_str()) {
            return Err(fail(
                ValidationErrorKind::OutputReference,
                format!("graph output `{}` is never produced", info.name),
            ));
        }
    }
    Ok(())
}

fn check_value_info(info: &onnx::ValueInfoProto) -> Result<()> {
    if info.name.is_empty() {
        return Err(fail(
            ValidationErrorKind::Metadata,
            "value info without a name".to_string(),
        ));
    }
    let Some(type_proto::Value::TensorType(tensor)) =
        info.r#type.as_ref().and_then(|t| t.value.as_ref())
    else {
        return Err(fail(
            ValidationErrorKind::TensorType,
            format!("`{}` has no tensor type", info.name),
        ));
    };
    if tensor.elem_type != DATA_TYPE_FLOAT {
        return Err(fail(
            ValidationErrorKind::TensorType,
            format!("`{}` has element type {}", info.name, tensor.elem_type),
        ));
    }
    for dim in tensor.shape.iter().flat_map(|s| &s.dim) {
        let ok = match &dim.value {
            Some(dimension::Value::DimValue(v)) => *v > 0,
            Some(dimension::Value::DimParam(p)) => !p.is_empty(),
            None => true,
        };
        if !ok {
            return Err(fail(
                ValidationErrorKind::ShapeMismatch,
                format!("`{}` has an invalid dimension", info.name),
            ));
        }
    }
    Ok(())
}

fn check_initializer(tensor: &onnx::TensorProto) -> Result<()> {
    if tensor.name.is_empty() {
        return Err(fail(
            ValidationErrorKind::Metadata,
            "initializer without a name".to_string(),
        ));
    }
    if tensor.data_type != DATA_TYPE_FLOAT {
        return Err(fail(
            ValidationErrorKind::TensorType,
            format!(
                "initializer `{}` has element type {}",
                tensor.name, tensor.data_type
            ),
        ));
    }
    if tensor.dims.iter().any(|d| *d <= 0) {
        return Err(fail(
            ValidationErrorKind::ShapeMismatch,
            format!("initializer `{}` has a non-positive dimension", tensor.name),
        ));
    }
    let numel = tensor
        .dims
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(usize::try_from(*d).ok()?))
        .ok_or_else(|| {
            fail(
                ValidationErrorKind::InitializerSize,
                format!("initializer `{}` has too many elements", tensor.name),
            )
        })?;
    let stored = if tensor.raw_data.is_empty() {
        tensor.float_data.len()
    } else {
        tensor.raw_data.len() / 4
    };
    if !tensor.raw_data.len().is_multiple_of(4) || stored != numel {
        return Err(fail(
            ValidationErrorKind::InitializerSize,
            format!(
                "initializer `{}` stores {} bytes of raw data and {} floats for {} elements",
                tensor.name,
                tensor.raw_data.len(),
                tensor.float_data.len(),
                numel
            ),
        ));
    }
    Ok(())
}
