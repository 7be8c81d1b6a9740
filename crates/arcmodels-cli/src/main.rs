mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use arcmodels_backend_ort::{parse_device, OrtBackend};
use arcmodels_core::ModelRegistry;
use arcmodels_export::{load_model, Exporter};
use arcmodels_generator::{
    generate_model, run_batch, run_batch_parallel, spending_config, GeneratedModel, Recipe,
};
use clap::Parser;
use cli::{Cli, Command, GenerateOpts};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    std::env::set_var("RUST_LOG", &cli.log);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match cli.command {
        Command::List { catalog } => list(catalog.as_deref()),
        Command::Generate { opts, jobs } => generate(opts, jobs).await,
        Command::GenerateOne { name, opts } => generate_one(&name, opts),
        Command::Spending {
            out_dir,
            secondary_dir,
        } => spending(&out_dir, &secondary_dir),
        Command::Verify { path, device } => verify(&path, &device),
    }
}

fn load_registry(catalog: Option<&Path>) -> Result<ModelRegistry> {
    match catalog {
        Some(path) => ModelRegistry::from_json_file(path)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => Ok(ModelRegistry::builtin()),
    }
}

fn exporter_for(opts: &GenerateOpts) -> Exporter {
    let exporter = Exporter::new(opts.variant);
    match &opts.secondary_dir {
        Some(dir) => exporter.with_secondary_dir(dir),
        None => exporter,
    }
}

fn list(catalog: Option<&Path>) -> Result<()> {
    let registry = load_registry(catalog)?;
    for config in registry.list() {
        println!(
            "{:<24} {:>5} inputs  {}",
            config.name, config.input_size, config.description
        );
    }
    Ok(())
}

fn print_generated(model: &GeneratedModel) {
    println!("  {}: {}", model.name, model.description);
    println!(
        "  -> {} ({} bytes)",
        model.artifact.path.display(),
        model.artifact.size_bytes
    );
    if let Some(copy) = &model.artifact.copied_to {
        println!("  -> copied to {}", copy.display());
    }
}

async fn generate(opts: GenerateOpts, jobs: usize) -> Result<()> {
    let registry = load_registry(opts.catalog.as_deref())?;
    let recipe = Recipe::decision(opts.hidden);
    let exporter = exporter_for(&opts);

    println!("Generating {} models...", registry.len());
    let report = if jobs > 1 {
        run_batch_parallel(&registry, &recipe, &exporter, &opts.out_dir, jobs).await?
    } else {
        run_batch(&registry, &recipe, &exporter, &opts.out_dir)
    };

    for model in &report.generated {
        print_generated(model);
    }
    for failure in &report.failures {
        println!("  {}: FAILED ({})", failure.name, failure.error);
    }
    println!(
        "Generated {} of {} models in {}",
        report.generated.len(),
        report.total(),
        opts.out_dir.display()
    );

    if report.all_failed() {
        bail!("every model in the catalog failed to generate");
    }
    Ok(())
}

fn generate_one(name: &str, opts: GenerateOpts) -> Result<()> {
    let registry = load_registry(opts.catalog.as_deref())?;
    let config = registry.get(name)?;
    let model = generate_model(
        config,
        &Recipe::decision(opts.hidden),
        &exporter_for(&opts),
        &opts.out_dir,
    )
    .with_context(|| format!("failed to generate `{name}`"))?;
    print_generated(&model);
    Ok(())
}

fn spending(out_dir: &Path, secondary_dir: &Path) -> Result<()> {
    let exporter = Exporter::default().with_secondary_dir(secondary_dir);
    let model = generate_model(&spending_config(), &Recipe::spending(), &exporter, out_dir)
        .context("failed to generate the spending model")?;
    print_generated(&model);
    println!("  outputs: [shouldBuy, confidence, riskScore]");
    Ok(())
}

fn verify(path: &Path, device: &str) -> Result<()> {
    let model = load_model(path).with_context(|| format!("{} is not a valid model", path.display()))?;
    model.validate()?;
    let graph = model.graph();
    println!(
        "{}: graph `{}`, opset {}, ir {}, {} nodes, {} parameters",
        path.display(),
        graph.name,
        model.opset_version(),
        model.format_revision(),
        graph.node_count(),
        graph.parameter_count()
    );

    let backend = OrtBackend::with_device(parse_device(device)?);
    let mut session = backend.load(path)?;
    let out = session.probe()?;
    info!(backend = backend.name(), shape = ?out.shape, "probe inference finished");
    println!("  probe output {:?}: {:?}", out.shape, out.values);
    Ok(())
}
