use anyhow::Result;
use arcmodels_core::{
    initialize, Error, ExporterVariant, ModelConfig, ModelRegistry, OpKind, WeightInit,
};
use arcmodels_export::{load_model, Exporter};
use arcmodels_generator::{build_model, generate_model, spending_config, Recipe, SPENDING_SEED};

#[test]
fn spending_model_matches_its_layout() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let generated = generate_model(
        &spending_config(),
        &Recipe::spending(),
        &Exporter::default(),
        dir.path(),
    )?;

    assert_eq!(generated.artifact.path, dir.path().join("spending-model.onnx"));
    assert_eq!(generated.seed, SPENDING_SEED);

    let model = load_model(&generated.artifact.path)?;
    assert_eq!(model.graph().name, "SpendingModel");
    assert_eq!(model.graph().node_count(), 8);
    assert_eq!(model.graph().output.shape.dims(), &[1, 3]);
    assert_eq!(model.opset_version(), 11);
    assert_eq!(model.format_revision(), 6);
    Ok(())
}

#[test]
fn fixed_seed_pipeline_agrees_with_stateless_initializer() -> Result<()> {
    let model = build_model(&spending_config(), &Recipe::spending())?;
    let fc1 = model.graph().initializer("fc1_weight").expect("fc1_weight");
    let expected = initialize("fc1_weight", &[8, 16], SPENDING_SEED, WeightInit::SMALL_NORMAL)?;
    assert_eq!(fc1.data, expected.data);
    Ok(())
}

#[test]
fn name_seeded_pipeline_agrees_with_stateless_initializer() -> Result<()> {
    let config = ModelConfig::new("risk-scorer", 6, "");
    let model = build_model(&config, &Recipe::default())?;
    let fc1 = model.graph().initializer("fc1_weight").expect("fc1_weight");
    let seed = u64::from(arcmodels_core::name_seed("risk-scorer"));
    let expected = initialize("fc1_weight", &[6, 16], seed, WeightInit::XavierUniform)?;
    assert_eq!(fc1.data, expected.data);
    Ok(())
}

#[test]
fn decision_models_end_in_sigmoid() -> Result<()> {
    let config = ModelConfig::new("threshold-checker", 4, "");
    let model = build_model(&config, &Recipe::decision(32))?;
    let last = model.graph().nodes.last().expect("nodes");
    assert_eq!(last.op, OpKind::Sigmoid);
    assert_eq!(model.graph().layer_shapes(), vec![(4, 32), (32, 16), (16, 1)]);
    Ok(())
}

#[test]
fn single_model_errors_surface() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = ModelRegistry::builtin().get("unknown-model").unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));

    let err = generate_model(
        &ModelConfig::new("empty", 0, ""),
        &Recipe::default(),
        &Exporter::default(),
        dir.path(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Shape(_)), "{err}");
    Ok(())
}

#[test]
fn out_dir_is_created_and_secondary_copy_made() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("public").join("models");
    let prover = dir.path().join("prover");
    std::fs::create_dir(&prover)?;

    let exporter = Exporter::new(ExporterVariant::Legacy).with_secondary_dir(&prover);
    let generated = generate_model(&spending_config(), &Recipe::spending(), &exporter, &out)?;

    assert!(out.join("spending-model.onnx").is_file());
    assert_eq!(generated.artifact.copied_to, Some(prover.join("spending-model.onnx")));
    Ok(())
}

#[test]
fn names_that_leave_the_output_directory_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("models");
    let config = ModelConfig::new("../escaped", 4, "path traversal");

    let err = generate_model(&config, &Recipe::default(), &Exporter::default(), &out).unwrap_err();
    assert!(matches!(err, Error::Catalog(_)), "{err}");
    assert!(!dir.path().join("escaped.onnx").exists());
    assert!(!out.exists());
    Ok(())
}
