use anyhow::Result;
use arcmodels_core::{
    build_layered_graph, initialize, Activation, Error, GraphBuilder, OpKind, Shape,
    TensorInitializer, WeightInit, MAX_TENSOR_ELEMENTS,
};
use proptest::prelude::*;

fn initializer() -> TensorInitializer {
    TensorInitializer::new(42, WeightInit::SMALL_NORMAL)
}

#[test]
fn spending_layout_has_eight_nodes() -> Result<()> {
    let graph = build_layered_graph(
        8,
        &[16, 8, 3],
        &[Activation::Relu, Activation::Relu, Activation::None],
        &mut initializer(),
    )?;

    let ops: Vec<OpKind> = graph.nodes.iter().map(|n| n.op).collect();
    assert_eq!(
        ops,
        vec![
            OpKind::MatMul,
            OpKind::Add,
            OpKind::Relu,
            OpKind::MatMul,
            OpKind::Add,
            OpKind::Relu,
            OpKind::MatMul,
            OpKind::Add,
        ]
    );
    assert_eq!(graph.input.shape, Shape::from_slice(&[1, 8]));
    assert_eq!(graph.output.shape, Shape::from_slice(&[1, 3]));
    assert_eq!(graph.nodes.last().and_then(|n| n.output()), Some("output"));
    assert_eq!(graph.layer_shapes(), vec![(8, 16), (16, 8), (8, 3)]);
    assert_eq!(graph.parameter_count(), 8 * 16 + 16 + 16 * 8 + 8 + 8 * 3 + 3);
    Ok(())
}

#[test]
fn tensor_names_follow_layer_prefixes() -> Result<()> {
    let graph = build_layered_graph(
        4,
        &[2, 1],
        &[Activation::Relu, Activation::Sigmoid],
        &mut initializer(),
    )?;

    let first = &graph.nodes[0];
    assert_eq!(first.inputs, vec!["input", "fc1_weight"]);
    assert_eq!(first.outputs, vec!["fc1_mm"]);
    assert_eq!(graph.nodes[1].inputs, vec!["fc1_mm", "fc1_bias"]);
    assert_eq!(graph.nodes[2].outputs, vec!["fc1_relu"]);
    assert_eq!(graph.nodes[3].inputs, vec!["fc1_relu", "fc2_weight"]);

    let last = graph.nodes.last().expect("nodes");
    assert_eq!(last.op, OpKind::Sigmoid);
    assert_eq!(last.inputs, vec!["fc2_out"]);
    assert_eq!(last.outputs, vec!["output"]);
    Ok(())
}

#[test]
fn biases_are_zero_and_weights_are_not() -> Result<()> {
    let graph = build_layered_graph(3, &[5], &[Activation::None], &mut initializer())?;

    let bias = graph.initializer("fc1_bias").expect("bias");
    assert!(bias.to_f32().iter().all(|v| *v == 0.0));
    let weight = graph.initializer("fc1_weight").expect("weight");
    assert_eq!(weight.to_f32().len(), 15);
    assert!(weight.to_f32().iter().any(|v| *v != 0.0));
    Ok(())
}

#[test]
fn custom_io_names_are_declared() -> Result<()> {
    let graph = GraphBuilder::new("Scorer")
        .with_io_names("features", "score")
        .build(6, &[4, 1], &[Activation::Relu, Activation::Sigmoid], &mut initializer())?;

    assert_eq!(graph.name, "Scorer");
    assert_eq!(graph.input.name, "features");
    assert_eq!(graph.output.name, "score");
    assert_eq!(graph.nodes[0].inputs[0], "features");
    Ok(())
}

#[test]
fn empty_layer_list_is_a_shape_error() {
    let err = build_layered_graph(8, &[], &[], &mut initializer()).unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn zero_dimensions_are_shape_errors() {
    let err = build_layered_graph(0, &[4], &[Activation::Relu], &mut initializer()).unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");

    let err = build_layered_graph(4, &[4, 0, 1], &[Activation::None; 3], &mut initializer())
        .unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn oversized_layers_are_shape_errors() {
    let acts = [Activation::Relu, Activation::Relu, Activation::Sigmoid];
    for input_dim in [usize::MAX / 8, 1 << 32, MAX_TENSOR_ELEMENTS] {
        let err = build_layered_graph(input_dim, &[16, 8, 1], &acts, &mut initializer()).unwrap_err();
        assert!(matches!(err, Error::Shape(_)), "{input_dim}: {err}");
    }

    let err = build_layered_graph(4, &[usize::MAX, 1], &acts[1..], &mut initializer()).unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn element_counts_do_not_overflow() {
    let shape = Shape::from_slice(&[usize::MAX, 2]);
    assert_eq!(shape.checked_numel(), None);
    assert_eq!(shape.numel(), usize::MAX);

    let err = initialize("w", &[1 << 20, 1 << 20], 1, WeightInit::XavierUniform).unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn activation_count_must_match_layers() {
    let err = build_layered_graph(4, &[4, 1], &[Activation::Relu], &mut initializer()).unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");
}

#[test]
fn shape_error_does_not_advance_the_generator() -> Result<()> {
    let mut init = initializer();
    assert!(build_layered_graph(4, &[4, 0], &[Activation::None; 2], &mut init).is_err());
    let after_error = build_layered_graph(4, &[2], &[Activation::None], &mut init)?;
    let fresh = build_layered_graph(4, &[2], &[Activation::None], &mut initializer())?;
    assert_eq!(after_error, fresh);
    Ok(())
}

fn activation() -> impl Strategy<Value = Activation> {
    prop_oneof![
        Just(Activation::None),
        Just(Activation::Relu),
        Just(Activation::Sigmoid),
    ]
}

proptest! {
    #[test]
    fn consecutive_layers_chain(
        input_dim in 1usize..32,
        layers in prop::collection::vec((1usize..32, activation()), 1..6),
    ) {
        let dims: Vec<usize> = layers.iter().map(|(d, _)| *d).collect();
        let acts: Vec<Activation> = layers.iter().map(|(_, a)| *a).collect();
        let graph = build_layered_graph(input_dim, &dims, &acts, &mut initializer()).unwrap();

        let shapes = graph.layer_shapes();
        prop_assert_eq!(shapes.len(), dims.len());
        prop_assert_eq!(shapes[0].0, input_dim);
        for pair in shapes.windows(2) {
            prop_assert_eq!(pair[0].1, pair[1].0);
        }
        let expected_nodes = 2 * dims.len() + acts.iter().filter(|a| a.op().is_some()).count();
        prop_assert_eq!(graph.node_count(), expected_nodes);
        prop_assert_eq!(graph.output.shape.dims(), &[1, *dims.last().unwrap()][..]);
    }
}
