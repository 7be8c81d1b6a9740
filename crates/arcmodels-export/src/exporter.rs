use std::path::{Path, PathBuf};

use arcmodels_core::{Error, ExporterVariant, Model, ModelArtifact, Result};
use arcmodels_proto::onnx;
use prost::Message;
use tracing::{debug, info, warn};

use crate::{check_model, from_proto, to_proto};

#[derive(Clone, Debug, Default)]
pub struct Exporter {
    variant: ExporterVariant,
    secondary_dir: Option<PathBuf>,
}

impl Exporter {
    pub fn new(variant: ExporterVariant) -> Self {
        Self {
            variant,
            secondary_dir: None,
        }
    }

    /// Directory owned by a downstream consumer that receives a copy of each
    /// exported file when it exists.
    pub fn with_secondary_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.secondary_dir = Some(dir.into());
        self
    }

    pub fn variant(&self) -> ExporterVariant {
        self.variant
    }

    /// Validates, lowers and checks `model`, returning the file bytes.
    pub fn encode(&self, model: &Model) -> Result<Vec<u8>> {
        model.validate()?;
        let proto = to_proto(model, self.variant);
        check_model(&proto)?;
        Ok(proto.encode_to_vec())
    }

    /// Writes `model` to `primary`, replacing any existing file, then makes
    /// the best-effort secondary copy.
    pub fn export(&self, model: &Model, primary: &Path) -> Result<ModelArtifact> {
        let bytes = self.encode(model)?;
        std::fs::write(primary, &bytes).map_err(|e| Error::io(primary, e))?;
        let size_bytes = std::fs::metadata(primary)
            .map_err(|e| Error::io(primary, e))?
            .len();
        info!(
            path = %primary.display(),
            size_bytes,
            graph = %model.graph().name,
            variant = self.variant.name(),
            "exported model"
        );

        let copied_to = self
            .secondary_dir
            .as_deref()
            .and_then(|dir| copy_to_secondary(primary, dir));

        Ok(ModelArtifact {
            path: primary.to_path_buf(),
            size_bytes,
            copied_to,
        })
    }
}

/// Writes `model` with the current exporter variant and returns the file size.
pub fn export(model: &Model, primary: &Path) -> Result<u64> {
    Ok(Exporter::default().export(model, primary)?.size_bytes)
}

/// Copies `primary` into `dir` under the same file name.
///
/// A missing directory is skipped silently; any other failure is logged and
/// leaves the primary file untouched.
pub fn copy_to_secondary(primary: &Path, dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "secondary model directory absent, skipping copy");
        return None;
    }
    let file_name = primary.file_name()?;
    let target = dir.join(file_name);
    match std::fs::copy(primary, &target) {
        Ok(_) => {
            info!(path = %target.display(), "copied model to secondary directory");
            Some(target)
        }
        Err(err) => {
            warn!(error = %err, path = %target.display(), "secondary copy failed");
            None
        }
    }
}

/// Parses ONNX bytes, checks them, and rebuilds the core model.
pub fn decode_model(bytes: &[u8]) -> Result<Model> {
    let proto =
        onnx::ModelProto::decode(bytes).map_err(|e| Error::Format(e.to_string()))?;
    check_model(&proto)?;
    from_proto(&proto)
}

pub fn load_model(path: &Path) -> Result<Model> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    decode_model(&bytes)
}
