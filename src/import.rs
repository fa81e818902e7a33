//! Bulk import of FM Global reference data from JSON catalog files
//!
//! Each `*.json` file under the import directory holds any of `figures`,
//! `tables` and `costRates`. Files are parsed into typed entries and checked
//! against the catalog invariants before anything is written, so a bad row
//! is reported at import time instead of surfacing during a lookup.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::catalog::ReferenceCatalog;
use crate::cost::CostRateTable;
use crate::db;
use crate::error::{Error, Result};
use crate::models::{CostRate, FigureEntry, TableEntry};

/// Contents of one catalog file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub figures: Vec<FigureEntry>,
    #[serde(default)]
    pub tables: Vec<TableEntry>,
    #[serde(default)]
    pub cost_rates: Vec<CostRate>,
}

impl CatalogFile {
    pub fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        // Builds throwaway indexes purely to run the invariant checks
        ReferenceCatalog::new(file.figures.clone(), file.tables.clone())?;
        CostRateTable::new(file.cost_rates.clone())?;
        Ok(file)
    }
}

/// Find all JSON catalog files below `dir`, sorted for a stable import order
pub fn find_catalog_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_catalog_file(path: &Path) -> Result<CatalogFile> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CatalogFile::parse(&content)
}

fn store_catalog_file(conn: &Connection, file: &CatalogFile) -> Result<()> {
    for figure in &file.figures {
        db::upsert_figure(conn, figure)?;
    }
    for table in &file.tables {
        db::upsert_table(conn, table)?;
    }
    for rate in &file.cost_rates {
        db::upsert_cost_rate(conn, rate)?;
    }
    Ok(())
}

/// Import every catalog file under `dir` in a single transaction. A file that
/// fails to parse or validate is skipped as a whole and counted as an error.
///
/// With `clear`, existing reference data is replaced. A replacing import that
/// stores no file is rolled back and leaves the database untouched.
pub fn import_directory(conn: &mut Connection, dir: &Path, clear: bool) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    let files = find_catalog_files(dir)?;
    tracing::info!(dir = %dir.display(), files = files.len(), clear, "importing reference data");

    let tx = conn.transaction()?;
    if clear {
        db::clear_reference_data(&tx)?;
    }

    for path in &files {
        match read_catalog_file(path) {
            Ok(file) if file.figures.is_empty() && file.tables.is_empty() && file.cost_rates.is_empty() => {
                tracing::debug!(file = %path.display(), "no reference data, skipping");
                stats.skipped += 1;
            }
            Ok(file) => {
                store_catalog_file(&tx, &file)?;
                stats.files += 1;
                stats.figures += file.figures.len();
                stats.tables += file.tables.len();
                stats.cost_rates += file.cost_rates.len();

                tracing::info!(
                    file = %path.display(),
                    figures = file.figures.len(),
                    tables = file.tables.len(),
                    cost_rates = file.cost_rates.len(),
                    "imported catalog file"
                );
            }
            Err(error) => {
                tracing::warn!(file = %path.display(), %error, "failed to import catalog file");
                stats.errors += 1;
            }
        }
    }

    if clear && stats.files == 0 {
        return Err(Error::Validation(format!(
            "no catalog file imported from {} ({}); existing reference data kept",
            dir.display(),
            stats
        )));
    }

    tx.commit()?;
    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub figures: usize,
    pub tables: usize,
    pub cost_rates: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} files ({} figures, {} tables, {} cost rates). Skipped: {}, Errors: {}",
            self.files, self.figures, self.tables, self.cost_rates, self.skipped, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINI_LOAD_FILE: &str = r#"{
        "figures": [{
            "figureNumber": 27,
            "asrsType": "Mini-Load",
            "containerType": "Closed-Top",
            "maxDepthFt": 3,
            "maxSpacingFt": 2,
            "sprinklerCount": 4,
            "sprinklerNumbering": "1-4",
            "pageReference": 49,
            "title": "Mini-Load, 3ft depth",
            "requiresFlueSpaces": true
        }],
        "tables": [{
            "tableNumber": 20,
            "asrsType": "All",
            "protectionScheme": "Dry Pipe",
            "ceilingHeightMaxFt": 45
        }],
        "costRates": [{ "componentType": "Installation", "baseCostPerUnit": 220 }]
    }"#;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn imports_valid_files_and_counts_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mini_load.json"), MINI_LOAD_FILE).unwrap();
        fs::create_dir(dir.path().join("broken")).unwrap();
        fs::write(
            dir.path().join("broken").join("bad.json"),
            r#"{"figures":[{"figureNumber":1,"asrsType":"Carousel"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("empty.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut conn = open();
        let stats = import_directory(&mut conn, dir.path(), false).unwrap();
        assert_eq!(
            stats,
            ImportStats {
                files: 1,
                figures: 1,
                tables: 1,
                cost_rates: 1,
                skipped: 1,
                errors: 1,
            }
        );

        let figures = db::list_figures(&conn).unwrap();
        assert_eq!(figures[0].figure_number, 27);
        let rates = db::load_cost_rates(&conn).unwrap();
        assert_eq!(rates.unit_cost("Installation"), 220.0);
    }

    #[test]
    fn rejects_figures_breaking_invariants() {
        let content = MINI_LOAD_FILE.replace("\"sprinklerCount\": 4", "\"sprinklerCount\": 2");
        assert!(matches!(
            CatalogFile::parse(&content),
            Err(Error::Catalog { .. })
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            CatalogFile::parse(r#"{"figures": [], "machineReadableClaims": {}}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            find_catalog_files(&missing),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn replacing_import_swaps_out_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mini_load.json"), MINI_LOAD_FILE).unwrap();

        let mut conn = open();
        db::seed_builtin(&conn).unwrap();
        let stats = import_directory(&mut conn, dir.path(), true).unwrap();
        assert_eq!(stats.files, 1);

        let figures: Vec<u32> = db::list_figures(&conn)
            .unwrap()
            .iter()
            .map(|f| f.figure_number)
            .collect();
        assert_eq!(figures, vec![27]);
        assert_eq!(db::list_tables(&conn).unwrap().len(), 1);
    }

    #[test]
    fn replacing_import_with_only_bad_files_keeps_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), r#"{"tables": [{"tableNumber": 9}]}"#).unwrap();

        let mut conn = open();
        db::seed_builtin(&conn).unwrap();
        assert!(matches!(
            import_directory(&mut conn, dir.path(), true),
            Err(Error::Validation(_))
        ));

        assert_eq!(db::list_figures(&conn).unwrap(), crate::seed::figures());
        assert_eq!(db::list_tables(&conn).unwrap(), crate::seed::tables());
        assert_eq!(db::list_cost_rates(&conn).unwrap().len(), 3);
    }
}
