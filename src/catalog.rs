//! Reference data store for FM Global figures and tables
//!
//! The catalog is built once, validated, and indexed; after that it is
//! read-only and can be shared between any number of engines.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{group_key, require_positive, AsrsType, ContainerType, FigureEntry, TableEntry};
use crate::seed;

/// FM Global minimum number of in-rack sprinklers for any arrangement
pub const MIN_SPRINKLER_COUNT: u32 = 4;

pub const COMMODITY_CLASSES: [&str; 4] = ["Class I", "Class II", "Class III", "Class IV"];

#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    figures: Vec<FigureEntry>,
    tables: Vec<TableEntry>,
    default_table: TableEntry,
    /// `{asrsType}_{containerType}` -> figure positions, in catalog order
    figure_index: HashMap<String, Vec<usize>>,
    /// Full search key -> first figure answering it
    exact_index: HashMap<String, usize>,
    /// ASRS type -> positions of tables scoped to it or to all types
    table_index: HashMap<AsrsType, Vec<usize>>,
}

impl ReferenceCatalog {
    /// Validate and index a set of figures and tables
    pub fn new(figures: Vec<FigureEntry>, tables: Vec<TableEntry>) -> Result<Self> {
        let numbering = Regex::new(r"^\d+(?:-\d+)?(?:,\d+(?:-\d+)?)*$")
            .map_err(|e| Error::catalog("sprinkler numbering pattern", e.to_string()))?;

        for figure in &figures {
            validate_figure(figure, &numbering)?;
        }
        for table in &tables {
            validate_table(table)?;
        }

        let mut figure_index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut exact_index = HashMap::new();
        for (pos, figure) in figures.iter().enumerate() {
            figure_index.entry(figure.group_key()).or_default().push(pos);

            let key = figure.search_key();
            if let Some(&first) = exact_index.get(&key) {
                let first: &FigureEntry = &figures[first];
                tracing::warn!(
                    search_key = %key,
                    kept = first.figure_number,
                    ignored = figure.figure_number,
                    "duplicate figure configuration, keeping the first"
                );
            } else {
                exact_index.insert(key, pos);
            }
        }

        let mut table_index: HashMap<AsrsType, Vec<usize>> = HashMap::new();
        for (pos, table) in tables.iter().enumerate() {
            for asrs_type in AsrsType::ALL {
                if table.asrs_type.covers(asrs_type) {
                    table_index.entry(asrs_type).or_default().push(pos);
                }
            }
        }

        tracing::info!(
            figures = figures.len(),
            tables = tables.len(),
            "reference catalog indexed"
        );

        Ok(Self {
            figures,
            tables,
            default_table: seed::default_table(),
            figure_index,
            exact_index,
            table_index,
        })
    }

    /// The seeded FM Global 8-34 catalog
    pub fn builtin() -> Result<Self> {
        Self::new(seed::figures(), seed::tables())
    }

    /// Replace the table used when nothing in the catalog fits
    pub fn with_default_table(mut self, table: TableEntry) -> Result<Self> {
        validate_table(&table)?;
        self.default_table = table;
        Ok(self)
    }

    pub fn figures(&self) -> &[FigureEntry] {
        &self.figures
    }

    pub fn tables(&self) -> &[TableEntry] {
        &self.tables
    }

    pub fn default_table(&self) -> &TableEntry {
        &self.default_table
    }

    /// Figures for one ASRS/container combination, in catalog order.
    /// An unknown combination yields an empty list.
    pub fn get_figures_by_key(
        &self,
        asrs_type: AsrsType,
        container_type: ContainerType,
    ) -> Vec<&FigureEntry> {
        self.figure_index
            .get(&group_key(asrs_type, container_type))
            .map(|positions| positions.iter().map(|&p| &self.figures[p]).collect())
            .unwrap_or_default()
    }

    /// Tables scoped to `asrs_type` or to every type, in catalog order
    pub fn get_tables_by_asrs_type(&self, asrs_type: AsrsType) -> Vec<&TableEntry> {
        self.table_index
            .get(&asrs_type)
            .map(|positions| positions.iter().map(|&p| &self.tables[p]).collect())
            .unwrap_or_default()
    }

    pub fn exact_figure(&self, search_key: &str) -> Option<&FigureEntry> {
        self.exact_index.get(search_key).map(|&p| &self.figures[p])
    }

    /// Option lists for building an input form
    pub fn available_configurations(&self) -> AvailableConfigurations {
        let asrs_types: BTreeSet<AsrsType> = self.figures.iter().map(|f| f.asrs_type).collect();
        let container_types: BTreeSet<ContainerType> =
            self.figures.iter().map(|f| f.container_type).collect();

        AvailableConfigurations {
            asrs_types: asrs_types.into_iter().collect(),
            container_types: container_types.into_iter().collect(),
            available_depths: sorted_distinct(self.figures.iter().map(|f| f.max_depth_ft)),
            available_spacings: sorted_distinct(self.figures.iter().map(|f| f.max_spacing_ft)),
            commodity_types: COMMODITY_CLASSES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableConfigurations {
    pub asrs_types: Vec<AsrsType>,
    pub container_types: Vec<ContainerType>,
    pub available_depths: Vec<f64>,
    pub available_spacings: Vec<f64>,
    pub commodity_types: Vec<String>,
}

fn sorted_distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

fn validate_figure(figure: &FigureEntry, numbering: &Regex) -> Result<()> {
    let entry = format!("figure {} ({})", figure.figure_number, figure.group_key());
    let invalid = |reason: String| Error::catalog(entry.clone(), reason);

    require_positive("maxDepthFt", figure.max_depth_ft).map_err(|e| invalid(e.to_string()))?;
    require_positive("maxSpacingFt", figure.max_spacing_ft).map_err(|e| invalid(e.to_string()))?;

    if figure.sprinkler_count < MIN_SPRINKLER_COUNT {
        return Err(invalid(format!(
            "sprinkler count {} is below the minimum of {}",
            figure.sprinkler_count, MIN_SPRINKLER_COUNT
        )));
    }

    let positions = count_numbered_positions(&figure.sprinkler_numbering, numbering)
        .ok_or_else(|| invalid(format!("unreadable sprinkler numbering {:?}", figure.sprinkler_numbering)))?;
    if positions != figure.sprinkler_count {
        return Err(invalid(format!(
            "numbering {:?} lists {} sprinklers but the count is {}",
            figure.sprinkler_numbering, positions, figure.sprinkler_count
        )));
    }

    Ok(())
}

/// Count the sprinkler positions in a numbering such as "1-8" or "1,3,5,7"
fn count_numbered_positions(numbering: &str, pattern: &Regex) -> Option<u32> {
    let compact: String = numbering.chars().filter(|c| !c.is_whitespace()).collect();
    if !pattern.is_match(&compact) {
        return None;
    }

    let mut total = 0u32;
    for part in compact.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.parse().ok()?;
                let end: u32 = end.parse().ok()?;
                if end < start {
                    return None;
                }
                total += end - start + 1;
            }
            None => total += 1,
        }
    }
    Some(total)
}

fn validate_table(table: &TableEntry) -> Result<()> {
    let entry = format!("table {} ({})", table.table_number, table.asrs_type);
    let invalid = |reason: String| Error::catalog(entry.clone(), reason);

    if table.protection_scheme.trim().is_empty() {
        return Err(invalid("protection scheme is empty".to_string()));
    }
    for (name, bound) in [
        ("ceilingHeightMinFt", table.ceiling_height_min_ft),
        ("ceilingHeightMaxFt", table.ceiling_height_max_ft),
        ("storageHeightMaxFt", table.storage_height_max_ft),
    ] {
        if let Some(value) = bound {
            require_positive(name, value).map_err(|e| invalid(e.to_string()))?;
        }
    }
    if let (Some(min), Some(max)) = (table.ceiling_height_min_ft, table.ceiling_height_max_ft) {
        if min > max {
            return Err(invalid(format!("ceiling range {}..{} is inverted", min, max)));
        }
    }
    Ok(())
}
