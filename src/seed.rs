//! Built-in FM Global 8-34 reference rows
//!
//! Used to populate a fresh database (`load-sample`) and as the catalog of
//! last resort when the database holds no figures.

use std::collections::BTreeSet;

use crate::models::{AsrsType, ContainerType, CostRate, FigureEntry, TableEntry, TableScope};

pub const SPRINKLER_HEAD: &str = "Sprinkler Head";
/// Priced per linear foot of pipe
pub const PIPING_SYSTEM: &str = "Piping System";
pub const INSTALLATION: &str = "Installation";

#[derive(Debug, Clone, Copy)]
struct FigureSeed {
    number: u32,
    asrs_type: AsrsType,
    container_type: ContainerType,
    depth_ft: f64,
    spacing_ft: f64,
    sprinklers: u32,
    numbering: &'static str,
    page: u32,
    title: &'static str,
    flue_spaces: bool,
    vertical_barriers: bool,
}

const FIGURE_SEEDS: &[FigureSeed] = &[
    FigureSeed {
        number: 4,
        asrs_type: AsrsType::Shuttle,
        container_type: ContainerType::ClosedTop,
        depth_ft: 3.0,
        spacing_ft: 2.5,
        sprinklers: 8,
        numbering: "1-8",
        page: 32,
        title: "Horizontal IRAS Arrangement for Closed-Top Combustible Containers, 3ft depth, 2.5ft spacing",
        flue_spaces: true,
        vertical_barriers: false,
    },
    FigureSeed {
        number: 6,
        asrs_type: AsrsType::Shuttle,
        container_type: ContainerType::ClosedTop,
        depth_ft: 6.0,
        spacing_ft: 2.5,
        sprinklers: 4,
        numbering: "1,3,5,7",
        page: 32,
        title: "Horizontal IRAS Arrangement for Closed-Top Combustible Containers, 6ft depth, 2.5ft spacing",
        flue_spaces: true,
        vertical_barriers: false,
    },
    FigureSeed {
        number: 7,
        asrs_type: AsrsType::Shuttle,
        container_type: ContainerType::ClosedTop,
        depth_ft: 6.0,
        spacing_ft: 5.0,
        sprinklers: 4,
        numbering: "1,3,5,7",
        page: 33,
        title: "Horizontal IRAS Arrangement for Closed-Top Combustible Containers, 6ft depth, 5ft spacing",
        flue_spaces: true,
        vertical_barriers: false,
    },
    FigureSeed {
        number: 26,
        asrs_type: AsrsType::MiniLoad,
        container_type: ContainerType::ClosedTop,
        depth_ft: 6.0,
        spacing_ft: 2.0,
        sprinklers: 6,
        numbering: "1,2,3,4,5,6",
        page: 48,
        title: "Horizontal IRAS Arrangement for Mini-Load ASRS, 6ft depth, 2ft spacing",
        flue_spaces: true,
        vertical_barriers: false,
    },
];

pub fn figures() -> Vec<FigureEntry> {
    FIGURE_SEEDS
        .iter()
        .map(|s| FigureEntry {
            figure_number: s.number,
            asrs_type: s.asrs_type,
            container_type: s.container_type,
            max_depth_ft: s.depth_ft,
            max_spacing_ft: s.spacing_ft,
            sprinkler_count: s.sprinklers,
            sprinkler_numbering: s.numbering.to_string(),
            page_reference: s.page,
            title: s.title.to_string(),
            requires_flue_spaces: s.flue_spaces,
            requires_vertical_barriers: s.vertical_barriers,
        })
        .collect()
}

fn commodities(classes: &[&str]) -> BTreeSet<String> {
    classes.iter().map(|c| c.to_string()).collect()
}

pub fn tables() -> Vec<TableEntry> {
    vec![
        TableEntry {
            table_number: 14,
            asrs_type: TableScope::Only(AsrsType::Shuttle),
            protection_scheme: "Wet Pipe".to_string(),
            commodity_types: commodities(&["Class I", "Class II", "Class III"]),
            ceiling_height_min_ft: Some(20.0),
            ceiling_height_max_ft: Some(35.0),
            storage_height_max_ft: Some(30.0),
        },
        TableEntry {
            table_number: 18,
            asrs_type: TableScope::Only(AsrsType::MiniLoad),
            protection_scheme: "Wet Pipe".to_string(),
            commodity_types: commodities(&["Class I", "Class II"]),
            ceiling_height_min_ft: Some(20.0),
            ceiling_height_max_ft: Some(40.0),
            storage_height_max_ft: Some(35.0),
        },
    ]
}

/// Table substituted when no catalog table fits the configuration
pub fn default_table() -> TableEntry {
    TableEntry {
        table_number: 14,
        asrs_type: TableScope::All,
        protection_scheme: "Wet Pipe".to_string(),
        commodity_types: BTreeSet::new(),
        ceiling_height_min_ft: None,
        ceiling_height_max_ft: None,
        storage_height_max_ft: None,
    }
}

pub fn cost_rates() -> Vec<CostRate> {
    [(SPRINKLER_HEAD, 150.0), (PIPING_SYSTEM, 25.0), (INSTALLATION, 200.0)]
        .into_iter()
        .map(|(component, cost)| CostRate {
            component_type: component.to_string(),
            base_cost_per_unit: cost,
        })
        .collect()
}
