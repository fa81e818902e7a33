//! Error type shared by the engine, the catalog and the storage layer

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied numbers the engine cannot work with
    #[error("invalid input: {0}")]
    Validation(String),

    /// Enum text outside the known domain (e.g. an unknown ASRS type)
    #[error("unrecognized {field}: {value:?}")]
    Configuration { field: &'static str, value: String },

    /// Reference data that breaks a catalog invariant
    #[error("invalid reference data in {entry}: {reason}")]
    Catalog { entry: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn catalog(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Catalog {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
