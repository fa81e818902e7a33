//! Settings file for the calculator

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cost::CostModel;
use crate::error::{Error, Result};

pub const DEFAULT_DATABASE: &str = "asrs_data.db";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// SQLite file holding the reference catalog
    pub database: Option<PathBuf>,
    /// `tracing` filter directive, e.g. "info" or "asrs_calculator=debug"
    pub log: Option<String>,
    pub cost_model: CostModel,
    /// Component -> unit cost, applied over the database rates
    pub cost_rates: BTreeMap<String, f64>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.cost_model.validate()?;
        Ok(settings)
    }

    /// Database path, with an explicit override winning over the file
    pub fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }
}
