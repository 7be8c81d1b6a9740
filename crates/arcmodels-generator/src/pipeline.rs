use std::path::Path;

use arcmodels_core::{
    check_model_name, Error, GraphBuilder, Model, ModelArtifact, ModelConfig, Result,
    TensorInitializer,
};
use arcmodels_export::Exporter;
use tracing::info;

use crate::Recipe;

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedModel {
    pub name: String,
    pub description: String,
    pub seed: u64,
    pub parameters: usize,
    pub artifact: ModelArtifact,
}

/// Builds and assembles the model for `config`. Nothing is validated or
/// written yet.
pub fn build_model(config: &ModelConfig, recipe: &Recipe) -> Result<Model> {
    let mut init = TensorInitializer::for_model(&config.name, recipe.seed, recipe.weight_init);
    let graph = GraphBuilder::new(recipe.graph_name(config))
        .with_io_names(recipe.input_name.clone(), recipe.output_name.clone())
        .build(
            config.input_size,
            &recipe.layers,
            &recipe.activations,
            &mut init,
        )?;
    Ok(Model::assemble(
        graph,
        recipe.opset_version,
        recipe.format_revision(),
    ))
}

/// Full single-model path: build, validate, write `<out_dir>/<name>.onnx`.
pub fn generate_model(
    config: &ModelConfig,
    recipe: &Recipe,
    exporter: &Exporter,
    out_dir: &Path,
) -> Result<GeneratedModel> {
    check_model_name(&config.name)?;
    let model = build_model(config, recipe)?;
    model.validate()?;

    ensure_out_dir(out_dir)?;
    let path = out_dir.join(format!("{}.onnx", config.name));
    let artifact = exporter.export(&model, &path)?;

    let seed = recipe.seed.resolve(&config.name);
    info!(
        model = %config.name,
        seed,
        nodes = model.graph().node_count(),
        "generated model"
    );
    Ok(GeneratedModel {
        name: config.name.clone(),
        description: config.description.clone(),
        seed,
        parameters: model.graph().parameter_count(),
        artifact,
    })
}

/// Creates `dir` if missing. Safe to race with other generators.
pub fn ensure_out_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}
