use std::path::PathBuf;

use thiserror::Error;

use crate::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Dimension mismatch or a non-positive dimension.
    #[error("shape error: {0}")]
    Shape(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no model named `{0}` in the catalog")]
    ConfigNotFound(String),

    /// A model file that could not be decoded into a dense graph.
    #[error("malformed model file: {0}")]
    Format(String),

    #[error("invalid catalog: {0}")]
    Catalog(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
