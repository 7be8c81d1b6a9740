use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use arcmodels_core::ModelRegistry;
use arcmodels_export::Exporter;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info};

use crate::{generate_model, GeneratedModel, Recipe};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a catalog run, in catalog order.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<GeneratedModel>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.generated.len() + self.failures.len()
    }

    /// True when there was work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.generated.is_empty() && !self.failures.is_empty()
    }

    fn record(&mut self, name: String, outcome: std::result::Result<GeneratedModel, String>) {
        match outcome {
            Ok(generated) => self.generated.push(generated),
            Err(error) => {
                error!(model = %name, %error, "model generation failed");
                self.failures.push(BatchFailure { name, error });
            }
        }
    }
}

/// Generates every catalog entry in order. A failing entry is logged and
/// recorded; the rest still run.
pub fn run_batch(
    registry: &ModelRegistry,
    recipe: &Recipe,
    exporter: &Exporter,
    out_dir: &Path,
) -> BatchReport {
    let mut report = BatchReport::default();
    for config in registry.list() {
        let outcome = generate_model(config, recipe, exporter, out_dir).map_err(|e| e.to_string());
        report.record(config.name.clone(), outcome);
    }
    info!(
        generated = report.generated.len(),
        failed = report.failures.len(),
        "batch finished"
    );
    report
}

/// Same as [`run_batch`] with up to `jobs` models generated at once on the
/// blocking pool. Seeds come from model names, so the files match a
/// sequential run. A task that panics is recorded as a failure of its entry.
pub async fn run_batch_parallel(
    registry: &ModelRegistry,
    recipe: &Recipe,
    exporter: &Exporter,
    out_dir: &Path,
    jobs: usize,
) -> Result<BatchReport> {
    let jobs = jobs.max(1);
    let out_dir: PathBuf = out_dir.to_path_buf();
    let mut set = JoinSet::new();
    let mut entries: HashMap<Id, (usize, String)> = HashMap::new();
    let mut finished = Vec::with_capacity(registry.len());

    for (idx, config) in registry.list().iter().cloned().enumerate() {
        if set.len() >= jobs {
            if let Some(done) = set.join_next_with_id().await {
                finished.push(settle(done, &mut entries));
            }
        }
        let name = config.name.clone();
        let recipe = recipe.clone();
        let exporter = exporter.clone();
        let out_dir = out_dir.clone();
        let handle = set.spawn_blocking(move || {
            generate_model(&config, &recipe, &exporter, &out_dir).map_err(|e| e.to_string())
        });
        entries.insert(handle.id(), (idx, name));
    }
    while let Some(done) = set.join_next_with_id().await {
        finished.push(settle(done, &mut entries));
    }

    finished.sort_by_key(|(idx, _, _)| *idx);
    let mut report = BatchReport::default();
    for (_, name, outcome) in finished {
        report.record(name, outcome);
    }
    info!(
        generated = report.generated.len(),
        failed = report.failures.len(),
        jobs,
        "parallel batch finished"
    );
    Ok(report)
}

type Settled = (usize, String, std::result::Result<GeneratedModel, String>);

fn settle(
    done: std::result::Result<(Id, std::result::Result<GeneratedModel, String>), JoinError>,
    entries: &mut HashMap<Id, (usize, String)>,
) -> Settled {
    let (id, outcome) = match done {
        Ok((id, outcome)) => (id, outcome),
        Err(err) => (err.id(), Err(format!("generation task failed: {err}"))),
    };
    let (idx, name) = entries
        .remove(&id)
        .unwrap_or_else(|| (usize::MAX, String::from("<unknown>")));
    (idx, name, outcome)
}
