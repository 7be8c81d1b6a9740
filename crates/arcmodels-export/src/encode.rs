use arcmodels_core::{
    DType, Error, ExporterVariant, Graph, Model, Node, OpKind, Result, Shape, Tensor, TensorSpec,
    LEGACY_BATCH_PARAM,
};
use arcmodels_proto::onnx::{
    self, tensor_shape_proto::dimension, tensor_shape_proto::Dimension, type_proto,
    DATA_TYPE_FLOAT,
};
use bytes::Bytes;

pub const PRODUCER_NAME: &str = "arcmodels";
pub const PRODUCER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lowers a model to its ONNX message.
pub fn to_proto(model: &Model, variant: ExporterVariant) -> onnx::ModelProto {
    let graph = model.graph();
    onnx::ModelProto {
        ir_version: model.format_revision(),
        opset_import: vec![onnx::OperatorSetIdProto {
            domain: String::new(),
            version: model.opset_version(),
        }],
        producer_name: PRODUCER_NAME.to_string(),
        producer_version: PRODUCER_VERSION.to_string(),
        graph: Some(graph_to_proto(graph, variant)),
        ..Default::default()
    }
}

fn graph_to_proto(graph: &Graph, variant: ExporterVariant) -> onnx::GraphProto {
    onnx::GraphProto {
        node: graph.nodes.iter().map(node_to_proto).collect(),
        name: graph.name.clone(),
        initializer: graph.initializers.iter().map(tensor_to_proto).collect(),
        input: vec![value_info(&TensorSpec::for_io(&graph.input, variant))],
        output: vec![value_info(&TensorSpec::for_io(&graph.output, variant))],
        ..Default::default()
    }
}

fn node_to_proto(node: &Node) -> onnx::NodeProto {
    onnx::NodeProto {
        input: node.inputs.clone(),
        output: node.outputs.clone(),
        name: node.name.clone(),
        op_type: node.op.op_type().to_string(),
        ..Default::default()
    }
}

fn tensor_to_proto(tensor: &Tensor) -> onnx::TensorProto {
    onnx::TensorProto {
        dims: tensor.shape.dims().iter().map(|d| *d as i64).collect(),
        data_type: dtype_to_proto(tensor.dtype),
        name: tensor.name.clone(),
        raw_data: tensor.data.as_ref().map(|b| b.to_vec()).unwrap_or_default(),
        ..Default::default()
    }
}

fn value_info(spec: &TensorSpec) -> onnx::ValueInfoProto {
    let dim = spec
        .dims
        .iter()
        .map(|d| Dimension {
            value: Some(match d {
                Some(v) => dimension::Value::DimValue(*v as i64),
                None => dimension::Value::DimParam(LEGACY_BATCH_PARAM.to_string()),
            }),
            ..Default::default()
        })
        .collect();

    onnx::ValueInfoProto {
        name: spec.name.0.clone(),
        r#type: Some(onnx::TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type: dtype_to_proto(spec.dtype),
                shape: Some(onnx::TensorShapeProto { dim }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn dtype_to_proto(dtype: DType) -> i32 {
    match dtype {
        DType::F32 => DATA_TYPE_FLOAT,
    }
}

/// Rebuilds a core model from an ONNX message.
///
/// Only graphs made of the dense operator set decode; symbolic dimensions
/// are read as batch 1.
pub fn from_proto(proto: &onnx::ModelProto) -> Result<Model> {
    let graph = proto
        .graph
        .as_ref()
        .ok_or_else(|| Error::Format("model has no graph".to_string()))?;
    let opset = proto
        .opset_import
        .iter()
        .find(|o| o.domain.is_empty() || o.domain == "ai.onnx")
        .ok_or_else(|| Error::Format("model imports no default-domain opset".to_string()))?;

    let [input] = graph.input.as_slice() else {
        return Err(Error::Format(format!(
            "expected one graph input, found {}",
            graph.input.len()
        )));
    };
    let [output] = graph.output.as_slice() else {
        return Err(Error::Format(format!(
            "expected one graph output, found {}",
            graph.output.len()
        )));
    };

    let nodes = graph
        .node
        .iter()
        .map(|n| {
            let op = OpKind::from_op_type(&n.op_type).ok_or_else(|| {
                Error::Format(format!("node `{}` uses unsupported op `{}`", n.name, n.op_type))
            })?;
            Ok(Node {
                name: n.name.clone(),
                op,
                inputs: n.input.clone(),
                outputs: n.output.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let initializers = graph
        .initializer
        .iter()
        .map(tensor_from_proto)
        .collect::<Result<Vec<_>>>()?;

    let graph = Graph {
        name: graph.name.clone(),
        input: descriptor_from_proto(input)?,
        output: descriptor_from_proto(output)?,
        nodes,
        initializers,
    };
    Ok(Model::assemble(graph, opset.version, proto.ir_version))
}

fn tensor_from_proto(t: &onnx::TensorProto) -> Result<Tensor> {
    if t.data_type != DATA_TYPE_FLOAT {
        return Err(Error::Format(format!(
            "initializer `{}` has element type {}, only float is supported",
            t.name, t.data_type
        )));
    }
    let shape = shape_from_dims(&t.name, t.dims.iter().map(|d| Some(*d)))?;
    let data = if t.raw_data.is_empty() && !t.float_data.is_empty() {
        t.float_data.iter().flat_map(|v| v.to_le_bytes()).collect()
    } else {
        t.raw_data.clone()
    };
    Ok(Tensor {
        name: t.name.clone(),
        dtype: DType::F32,
        shape,
        data: Some(Bytes::from(data)),
    })
}

fn descriptor_from_proto(info: &onnx::ValueInfoProto) -> Result<Tensor> {
    let Some(type_proto::Value::TensorType(tensor_type)) =
        info.r#type.as_ref().and_then(|t| t.value.as_ref())
    else {
        return Err(Error::Format(format!("`{}` is not a tensor", info.name)));
    };
    if tensor_type.elem_type != DATA_TYPE_FLOAT {
        return Err(Error::Format(format!(
            "`{}` has element type {}, only float is supported",
            info.name, tensor_type.elem_type
        )));
    }
    let dims = tensor_type
        .shape
        .as_ref()
        .map(|s| s.dim.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|d| match &d.value {
            Some(dimension::Value::DimValue(v)) => Some(*v),
            Some(dimension::Value::DimParam(_)) | None => None,
        });
    let shape = shape_from_dims(&info.name, dims.map(|d| d.or(Some(1))))?;
    Ok(Tensor::descriptor(info.name.clone(), shape))
}

fn shape_from_dims(name: &str, dims: impl Iterator<Item = Option<i64>>) -> Result<Shape> {
    let dims = dims
        .map(|d| match d {
            Some(v) if v > 0 => Ok(v as usize),
            _ => Err(Error::Format(format!("`{name}` has a non-positive dimension"))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Shape::from_slice(&dims))
}
