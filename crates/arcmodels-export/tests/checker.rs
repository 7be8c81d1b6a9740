use arcmodels_core::{
    assemble, build_layered_graph, Activation, Error, ExporterVariant, TensorInitializer,
    ValidationErrorKind, WeightInit, MIN_OPSET,
};
use arcmodels_export::{check_model, decode_model, to_proto};
use arcmodels_proto::onnx;
use prost::Message;

fn proto() -> onnx::ModelProto {
    let graph = build_layered_graph(
        4,
        &[8, 1],
        &[Activation::Relu, Activation::Sigmoid],
        &mut TensorInitializer::new(7, WeightInit::XavierUniform),
    )
    .expect("valid layout");
    to_proto(&assemble(graph, 17, 8), ExporterVariant::Current)
}

fn kind(model: &onnx::ModelProto) -> ValidationErrorKind {
    match check_model(model) {
        Err(Error::Validation(v)) => v.kind,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

fn graph_mut(model: &mut onnx::ModelProto) -> &mut onnx::GraphProto {
    model.graph.as_mut().expect("graph")
}

#[test]
fn generated_model_passes() {
    assert!(check_model(&proto()).is_ok());
}

#[test]
fn foreign_operator_is_rejected() {
    let mut model = proto();
    graph_mut(&mut model).node[2].op_type = "Gelu".to_string();
    assert_eq!(kind(&model), ValidationErrorKind::UnsupportedOperator);
}

#[test]
fn unsorted_nodes_are_rejected() {
    let mut model = proto();
    graph_mut(&mut model).node.swap(1, 2);
    assert_eq!(kind(&model), ValidationErrorKind::UnresolvedInput);
}

#[test]
fn short_raw_data_is_rejected() {
    let mut model = proto();
    graph_mut(&mut model).initializer[0].raw_data.truncate(6);
    assert_eq!(kind(&model), ValidationErrorKind::InitializerSize);
}

#[test]
fn missing_opset_is_rejected() {
    let mut model = proto();
    model.opset_import.clear();
    assert_eq!(kind(&model), ValidationErrorKind::Metadata);

    let mut model = proto();
    model.ir_version = 3;
    assert_eq!(kind(&model), ValidationErrorKind::Metadata);
}

#[test]
fn dangling_graph_output_is_rejected() {
    let mut model = proto();
    graph_mut(&mut model).output[0].name = "logits".to_string();
    assert_eq!(kind(&model), ValidationErrorKind::OutputReference);
}

#[test]
fn untyped_output_is_rejected() {
    let mut model = proto();
    graph_mut(&mut model).output[0].r#type = None;
    assert_eq!(kind(&model), ValidationErrorKind::TensorType);
}

#[test]
fn opset_bounds_match_model_validation() {
    for opset in 1..=23 {
        let graph = build_layered_graph(
            4,
            &[2],
            &[Activation::Relu],
            &mut TensorInitializer::new(1, WeightInit::XavierUniform),
        )
        .expect("valid layout");
        let model = assemble(graph, opset, 10);
        let proto = to_proto(&model, ExporterVariant::Current);
        assert_eq!(
            check_model(&proto).is_ok(),
            model.validate().is_ok(),
            "opset {opset}"
        );
    }

    let mut model = proto();
    model.opset_import[0].version = MIN_OPSET - 1;
    assert_eq!(kind(&model), ValidationErrorKind::Metadata);
}

#[test]
fn overflowing_initializer_dims_are_rejected() {
    let mut model = proto();
    graph_mut(&mut model).initializer[0].dims = vec![i64::MAX, i64::MAX, 4];
    assert_eq!(kind(&model), ValidationErrorKind::InitializerSize);

    let bytes = model.encode_to_vec();
    let err = decode_model(&bytes).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
}
