use std::path::PathBuf;

/// Format-compatibility behavior of the exporter.
///
/// Both variants write the same nodes and initializers; they differ only in
/// how the batch dimension of the graph input and output is declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExporterVariant {
    /// Batch dimension is the fixed value `1`.
    #[default]
    Current,
    /// Batch dimension is the symbolic parameter [`LEGACY_BATCH_PARAM`].
    Legacy,
}

pub const LEGACY_BATCH_PARAM: &str = "batch_size";

impl ExporterVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Legacy => "legacy",
        }
    }
}

impl std::str::FromStr for ExporterVariant {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!(
                "unsupported exporter variant: {other} (expected current or legacy)"
            )),
        }
    }
}

/// A model file written by the exporter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Where the best-effort secondary copy landed, if it was made.
    pub copied_to: Option<PathBuf>,
}
