//! Matching engine: resolve a rack configuration to FM Global figures and tables

use chrono::Utc;

use crate::catalog::ReferenceCatalog;
use crate::error::Result;
use crate::models::{
    search_key, Compliance, ConfigurationInput, FigureEntry, MatchType, RequirementsResult,
    ResultMetadata, Specifications, TableEntry,
};

pub const HIGH_CEILING_WARNING_FT: f64 = 30.0;
pub const DEEP_RACK_WARNING_FT: f64 = 12.0;
pub const HIGH_STORAGE_WARNING_FT: f64 = 25.0;

pub const MANUAL_REVIEW_WARNING: &str = "No exact figure match found - manual review required";

/// Deterministic FM Global 8-34 requirements lookup over a borrowed catalog.
///
/// The engine holds no state of its own; any number of engines (or threads
/// sharing one) can read the same catalog.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine<'c> {
    catalog: &'c ReferenceCatalog,
}

/// A resolved figure and how it was found
#[derive(Debug, Clone, Copy)]
pub struct FigureMatch<'c> {
    pub figure: Option<&'c FigureEntry>,
    pub match_type: MatchType,
}

/// A resolved table and whether it is the substituted default
#[derive(Debug, Clone, Copy)]
pub struct TableMatch<'c> {
    pub table: &'c TableEntry,
    pub fallback_applied: bool,
}

impl<'c> DecisionEngine<'c> {
    pub fn new(catalog: &'c ReferenceCatalog) -> Self {
        Self { catalog }
    }

    /// Get the design requirements for a configuration.
    ///
    /// Only malformed numbers are rejected; a configuration outside the
    /// catalog comes back as `MatchType::None` with a manual review warning.
    pub fn get_design_requirements(&self, input: &ConfigurationInput) -> Result<RequirementsResult> {
        input.validate()?;

        let figure_match = self.find_figure(input);
        let table_match = self.find_table(input);
        let warnings = generate_warnings(figure_match.figure, input);
        let figure = figure_match.figure;
        let table = table_match.table;

        Ok(RequirementsResult {
            compliance: Compliance {
                applicable_figure: figure.map(|f| f.figure_number),
                applicable_table: Some(table.table_number),
                page_reference: figure.map(|f| f.page_reference),
                is_compliant: figure.is_some(),
                figure_title: figure.map(|f| f.title.clone()),
            },
            specifications: Specifications {
                sprinkler_count: figure.map_or(0, |f| f.sprinkler_count),
                sprinkler_numbering: figure
                    .map(|f| f.sprinkler_numbering.clone())
                    .unwrap_or_default(),
                spacing: figure.map(|f| f.max_spacing_ft),
                rack_depth: figure.map(|f| f.max_depth_ft),
                protection_scheme: table.protection_scheme.clone(),
                flue_spaces_required: figure.is_some_and(|f| f.requires_flue_spaces),
                vertical_barriers_required: figure.is_some_and(|f| f.requires_vertical_barriers),
            },
            warnings,
            metadata: ResultMetadata {
                search_key: input_search_key(input),
                match_type: figure_match.match_type,
                fallback_applied: table_match.fallback_applied,
                timestamp: Utc::now(),
            },
        })
    }

    /// Exact key lookup, then nearest figure by depth and spacing
    pub fn find_figure(&self, input: &ConfigurationInput) -> FigureMatch<'c> {
        let key = input_search_key(input);

        if let Some(figure) = self.catalog.exact_figure(&key) {
            tracing::debug!(search_key = %key, figure = figure.figure_number, "exact figure match");
            return FigureMatch {
                figure: Some(figure),
                match_type: MatchType::Exact,
            };
        }

        let closest = self.find_closest_figure(input);
        match closest {
            Some(figure) => {
                tracing::debug!(search_key = %key, figure = figure.figure_number, "closest figure match");
                FigureMatch {
                    figure: Some(figure),
                    match_type: MatchType::Closest,
                }
            }
            None => {
                tracing::debug!(search_key = %key, "no figure for configuration");
                FigureMatch {
                    figure: None,
                    match_type: MatchType::None,
                }
            }
        }
    }

    /// Minimize depth difference, then spacing difference. Full ties keep the
    /// earlier catalog entry.
    fn find_closest_figure(&self, input: &ConfigurationInput) -> Option<&'c FigureEntry> {
        let candidates = self
            .catalog
            .get_figures_by_key(input.asrs_type, input.container_type);

        let mut best: Option<(&'c FigureEntry, f64, f64)> = None;
        for candidate in candidates {
            let depth_diff = (candidate.max_depth_ft - input.rack_depth_ft).abs();
            let spacing_diff = (candidate.max_spacing_ft - input.rack_spacing_ft).abs();

            let better = match best {
                None => true,
                Some((_, best_depth, best_spacing)) => {
                    depth_diff < best_depth || (depth_diff == best_depth && spacing_diff < best_spacing)
                }
            };
            if better {
                best = Some((candidate, depth_diff, spacing_diff));
            }
        }
        best.map(|(figure, _, _)| figure)
    }

    /// First table in catalog order that fits, or the catalog's default table
    pub fn find_table(&self, input: &ConfigurationInput) -> TableMatch<'c> {
        let commodity = input.commodity_type.as_deref();
        let found = self
            .catalog
            .get_tables_by_asrs_type(input.asrs_type)
            .into_iter()
            .find(|t| t.within_ceiling_range(input.ceiling_height_ft) && t.accepts_commodity(commodity));

        match found {
            Some(table) => TableMatch {
                table,
                fallback_applied: false,
            },
            None => {
                let table = self.catalog.default_table();
                tracing::warn!(
                    asrs_type = %input.asrs_type,
                    ceiling_height_ft = ?input.ceiling_height_ft,
                    commodity = ?commodity,
                    default_table = table.table_number,
                    "no specification table fits, applying default table"
                );
                TableMatch {
                    table,
                    fallback_applied: true,
                }
            }
        }
    }
}

fn input_search_key(input: &ConfigurationInput) -> String {
    search_key(
        input.asrs_type,
        input.container_type,
        input.rack_depth_ft,
        input.rack_spacing_ft,
    )
}

/// Advisory notes for a resolved figure and the raw input. Warnings never
/// affect compliance.
pub fn generate_warnings(figure: Option<&FigureEntry>, input: &ConfigurationInput) -> Vec<String> {
    let mut warnings = Vec::new();

    if figure.is_none() {
        warnings.push(MANUAL_REVIEW_WARNING.to_string());
    }

    if input.ceiling_height_ft.is_some_and(|h| h > HIGH_CEILING_WARNING_FT) {
        warnings.push("High ceiling configuration (>30ft) requires special consideration".to_string());
    }

    if input.rack_depth_ft > DEEP_RACK_WARNING_FT {
        warnings.push("Deep rack configuration may require additional protection measures".to_string());
    }

    if figure.is_some_and(|f| f.requires_vertical_barriers) {
        warnings.push("Vertical barriers required between storage levels".to_string());
    }

    if figure.is_some_and(|f| f.requires_flue_spaces) {
        warnings.push(
            "Flue spaces required - verify rack configuration allows proper clearances".to_string(),
        );
    }

    if input.storage_height_ft.is_some_and(|h| h > HIGH_STORAGE_WARNING_FT) {
        warnings.push("High storage configuration requires enhanced sprinkler protection".to_string());
    }

    warnings
}
