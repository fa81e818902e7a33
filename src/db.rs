//! Database schema and operations for FM Global reference data

use rusqlite::Connection;

use crate::catalog::ReferenceCatalog;
use crate::cost::CostRateTable;
use crate::error::{Error, Result};
use crate::models::{CostRate, FigureEntry, TableEntry};
use crate::seed;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Sprinkler arrangement figures; one row per approved configuration
        CREATE TABLE IF NOT EXISTS fm_global_figures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            figure_number INTEGER NOT NULL,
            asrs_type TEXT NOT NULL,
            container_type TEXT NOT NULL,
            max_depth_ft REAL NOT NULL,
            max_spacing_ft REAL NOT NULL,
            sprinkler_count INTEGER NOT NULL,
            sprinkler_numbering TEXT NOT NULL,
            page_reference INTEGER NOT NULL,
            title TEXT NOT NULL,
            requires_flue_spaces INTEGER NOT NULL DEFAULT 0,
            requires_vertical_barriers INTEGER NOT NULL DEFAULT 0,
            UNIQUE (asrs_type, container_type, max_depth_ft, max_spacing_ft)
        );

        -- Protection scheme tables
        CREATE TABLE IF NOT EXISTS fm_global_tables (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            table_number INTEGER NOT NULL,
            asrs_type TEXT NOT NULL,
            protection_scheme TEXT NOT NULL,
            commodity_types TEXT NOT NULL DEFAULT '[]',  -- JSON array, empty = all
            ceiling_height_min_ft REAL,
            ceiling_height_max_ft REAL,
            storage_height_max_ft REAL,
            UNIQUE (table_number, asrs_type)
        );

        CREATE TABLE IF NOT EXISTS cost_rates (
            component_type TEXT PRIMARY KEY,
            base_cost_per_unit REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_figures_group ON fm_global_figures(asrs_type, container_type);
        CREATE INDEX IF NOT EXISTS idx_tables_asrs ON fm_global_tables(asrs_type);
        "#,
    )?;
    Ok(())
}

/// Insert a figure, or update the one with the same configuration in place.
/// Updated rows keep their id, and with it their position in the catalog.
pub fn upsert_figure(conn: &Connection, figure: &FigureEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO fm_global_figures (figure_number, asrs_type, container_type, max_depth_ft,
             max_spacing_ft, sprinkler_count, sprinkler_numbering, page_reference, title,
             requires_flue_spaces, requires_vertical_barriers)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT (asrs_type, container_type, max_depth_ft, max_spacing_ft) DO UPDATE SET
             figure_number = excluded.figure_number,
             sprinkler_count = excluded.sprinkler_count,
             sprinkler_numbering = excluded.sprinkler_numbering,
             page_reference = excluded.page_reference,
             title = excluded.title,
             requires_flue_spaces = excluded.requires_flue_spaces,
             requires_vertical_barriers = excluded.requires_vertical_barriers",
        (
            figure.figure_number,
            figure.asrs_type.as_str(),
            figure.container_type.as_str(),
            figure.max_depth_ft,
            figure.max_spacing_ft,
            figure.sprinkler_count,
            &figure.sprinkler_numbering,
            figure.page_reference,
            &figure.title,
            figure.requires_flue_spaces,
            figure.requires_vertical_barriers,
        ),
    )?;
    Ok(())
}

/// Insert a table, or update it in place keeping its catalog position
pub fn upsert_table(conn: &Connection, table: &TableEntry) -> Result<()> {
    let commodities = serde_json::to_string(&table.commodity_types)?;
    conn.execute(
        "INSERT INTO fm_global_tables (table_number, asrs_type, protection_scheme, commodity_types,
             ceiling_height_min_ft, ceiling_height_max_ft, storage_height_max_ft)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (table_number, asrs_type) DO UPDATE SET
             protection_scheme = excluded.protection_scheme,
             commodity_types = excluded.commodity_types,
             ceiling_height_min_ft = excluded.ceiling_height_min_ft,
             ceiling_height_max_ft = excluded.ceiling_height_max_ft,
             storage_height_max_ft = excluded.storage_height_max_ft",
        (
            table.table_number,
            table.asrs_type.as_str(),
            &table.protection_scheme,
            commodities,
            table.ceiling_height_min_ft,
            table.ceiling_height_max_ft,
            table.storage_height_max_ft,
        ),
    )?;
    Ok(())
}

pub fn upsert_cost_rate(conn: &Connection, rate: &CostRate) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cost_rates (component_type, base_cost_per_unit) VALUES (?1, ?2)",
        (&rate.component_type, rate.base_cost_per_unit),
    )?;
    Ok(())
}

/// Clear all reference data (for re-import)
pub fn clear_reference_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM fm_global_figures;
        DELETE FROM fm_global_tables;
        DELETE FROM cost_rates;
        "#,
    )?;
    Ok(())
}

/// Replace the reference data with the built-in catalog and cost rates
pub fn seed_builtin(conn: &Connection) -> Result<usize> {
    clear_reference_data(conn)?;

    let figures = seed::figures();
    for figure in &figures {
        upsert_figure(conn, figure)?;
    }
    for table in seed::tables() {
        upsert_table(conn, &table)?;
    }
    for rate in seed::cost_rates() {
        upsert_cost_rate(conn, &rate)?;
    }
    Ok(figures.len())
}

struct FigureRow {
    figure_number: u32,
    asrs_type: String,
    container_type: String,
    max_depth_ft: f64,
    max_spacing_ft: f64,
    sprinkler_count: u32,
    sprinkler_numbering: String,
    page_reference: u32,
    title: String,
    requires_flue_spaces: bool,
    requires_vertical_barriers: bool,
}

impl TryFrom<FigureRow> for FigureEntry {
    type Error = Error;

    fn try_from(row: FigureRow) -> Result<Self> {
        let entry = format!("fm_global_figures row for figure {}", row.figure_number);
        Ok(FigureEntry {
            figure_number: row.figure_number,
            asrs_type: row
                .asrs_type
                .parse()
                .map_err(|e: Error| Error::catalog(entry.clone(), e.to_string()))?,
            container_type: row
                .container_type
                .parse()
                .map_err(|e: Error| Error::catalog(entry.clone(), e.to_string()))?,
            max_depth_ft: row.max_depth_ft,
            max_spacing_ft: row.max_spacing_ft,
            sprinkler_count: row.sprinkler_count,
            sprinkler_numbering: row.sprinkler_numbering,
            page_reference: row.page_reference,
            title: row.title,
            requires_flue_spaces: row.requires_flue_spaces,
            requires_vertical_barriers: row.requires_vertical_barriers,
        })
    }
}

/// List all figures in insertion order
pub fn list_figures(conn: &Connection) -> Result<Vec<FigureEntry>> {
    let mut stmt = conn.prepare(
        "SELECT figure_number, asrs_type, container_type, max_depth_ft, max_spacing_ft, sprinkler_count,
                sprinkler_numbering, page_reference, title, requires_flue_spaces, requires_vertical_barriers
         FROM fm_global_figures ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(FigureRow {
            figure_number: row.get(0)?,
            asrs_type: row.get(1)?,
            container_type: row.get(2)?,
            max_depth_ft: row.get(3)?,
            max_spacing_ft: row.get(4)?,
            sprinkler_count: row.get(5)?,
            sprinkler_numbering: row.get(6)?,
            page_reference: row.get(7)?,
            title: row.get(8)?,
            requires_flue_spaces: row.get(9)?,
            requires_vertical_barriers: row.get(10)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(FigureEntry::try_from(row?)?);
    }
    Ok(results)
}

/// List all tables in insertion order
pub fn list_tables(conn: &Connection) -> Result<Vec<TableEntry>> {
    let mut stmt = conn.prepare(
        "SELECT table_number, asrs_type, protection_scheme, commodity_types,
                ceiling_height_min_ft, ceiling_height_max_ft, storage_height_max_ft
         FROM fm_global_tables ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, Option<f64>>(6)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (number, asrs_type, scheme, commodities, ceiling_min, ceiling_max, storage_max) = row?;
        let entry = format!("fm_global_tables row for table {}", number);
        results.push(TableEntry {
            table_number: number,
            asrs_type: asrs_type
                .parse()
                .map_err(|e: Error| Error::catalog(entry.clone(), e.to_string()))?,
            protection_scheme: scheme,
            commodity_types: serde_json::from_str(&commodities)
                .map_err(|e| Error::catalog(entry.clone(), e.to_string()))?,
            ceiling_height_min_ft: ceiling_min,
            ceiling_height_max_ft: ceiling_max,
            storage_height_max_ft: storage_max,
        });
    }
    Ok(results)
}

pub fn list_cost_rates(conn: &Connection) -> Result<Vec<CostRate>> {
    let mut stmt = conn.prepare(
        "SELECT component_type, base_cost_per_unit FROM cost_rates ORDER BY component_type",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(CostRate {
            component_type: row.get(0)?,
            base_cost_per_unit: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load and validate the full catalog
pub fn load_catalog(conn: &Connection) -> Result<ReferenceCatalog> {
    let figures = list_figures(conn)?;
    let tables = list_tables(conn)?;
    tracing::info!(figures = figures.len(), tables = tables.len(), "loaded reference data");
    ReferenceCatalog::new(figures, tables)
}

/// Load the catalog, taking figures or tables from the built-in catalog when
/// the database has none of that kind
pub fn load_catalog_or_builtin(conn: &Connection) -> Result<ReferenceCatalog> {
    let mut figures = list_figures(conn)?;
    let mut tables = list_tables(conn)?;

    if figures.is_empty() {
        tracing::warn!("no figures in database, using built-in figures (run 'load-sample' or 'import')");
        figures = seed::figures();
    }
    if tables.is_empty() {
        tracing::warn!("no tables in database, using built-in tables (run 'load-sample' or 'import')");
        tables = seed::tables();
    }

    tracing::info!(figures = figures.len(), tables = tables.len(), "loaded reference data");
    ReferenceCatalog::new(figures, tables)
}

/// Cost rates from the database layered over the built-in defaults
pub fn load_cost_rates(conn: &Connection) -> Result<CostRateTable> {
    CostRateTable::new(list_cost_rates(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DecisionEngine;
    use crate::models::{AsrsType, ConfigurationInput, ContainerType, TableScope};
    use crate::seed::{INSTALLATION, SPRINKLER_HEAD};
    use std::collections::BTreeSet;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn seeded_catalog_round_trips_through_sqlite() {
        let conn = open();
        assert_eq!(seed_builtin(&conn).unwrap(), 4);

        let figures = list_figures(&conn).unwrap();
        assert_eq!(figures, seed::figures());
        let tables = list_tables(&conn).unwrap();
        assert_eq!(tables, seed::tables());

        let catalog = load_catalog(&conn).unwrap();
        assert_eq!(
            catalog
                .get_figures_by_key(AsrsType::Shuttle, ContainerType::ClosedTop)
                .len(),
            3
        );
    }

    #[test]
    fn upsert_replaces_same_configuration() {
        let conn = open();
        let mut figure = seed::figures().remove(0);
        upsert_figure(&conn, &figure).unwrap();
        figure.title = "Revised".to_string();
        upsert_figure(&conn, &figure).unwrap();

        let figures = list_figures(&conn).unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].title, "Revised");
    }

    #[test]
    fn unknown_enum_text_in_database_fails_at_load() {
        let conn = open();
        conn.execute(
            "INSERT INTO fm_global_tables (table_number, asrs_type, protection_scheme) VALUES (3, 'Carousel', 'Wet Pipe')",
            [],
        )
        .unwrap();
        assert!(matches!(list_tables(&conn), Err(Error::Catalog { .. })));
    }

    #[test]
    fn empty_commodity_list_is_stored_as_all() {
        let conn = open();
        let mut table = seed::default_table();
        table.asrs_type = TableScope::All;
        upsert_table(&conn, &table).unwrap();
        let tables = list_tables(&conn).unwrap();
        assert!(tables[0].commodity_types.is_empty());
        assert_eq!(tables[0].ceiling_height_min_ft, None);
    }

    #[test]
    fn cost_rates_override_defaults() {
        let conn = open();
        upsert_cost_rate(
            &conn,
            &CostRate {
                component_type: SPRINKLER_HEAD.to_string(),
                base_cost_per_unit: 180.0,
            },
        )
        .unwrap();

        let rates = load_cost_rates(&conn).unwrap();
        assert_eq!(rates.unit_cost(SPRINKLER_HEAD), 180.0);
        assert_eq!(rates.unit_cost(INSTALLATION), 200.0);
    }

    #[test]
    fn clear_removes_everything() {
        let conn = open();
        seed_builtin(&conn).unwrap();
        clear_reference_data(&conn).unwrap();
        assert!(list_figures(&conn).unwrap().is_empty());
        assert!(list_tables(&conn).unwrap().is_empty());
        assert!(list_cost_rates(&conn).unwrap().is_empty());
    }

    fn shuttle_table_at(catalog: &ReferenceCatalog, ceiling: f64) -> u32 {
        let input = ConfigurationInput::new(AsrsType::Shuttle, ContainerType::ClosedTop, 3.0, 2.5)
            .with_ceiling_height(ceiling);
        DecisionEngine::new(catalog).find_table(&input).table.table_number
    }

    #[test]
    fn reimporting_a_table_keeps_its_catalog_position() {
        let conn = open();
        seed_builtin(&conn).unwrap();
        let wide = TableEntry {
            table_number: 15,
            asrs_type: TableScope::Only(AsrsType::Shuttle),
            protection_scheme: "Dry Pipe".to_string(),
            commodity_types: BTreeSet::new(),
            ceiling_height_min_ft: Some(10.0),
            ceiling_height_max_ft: Some(60.0),
            storage_height_max_ft: None,
        };
        upsert_table(&conn, &wide).unwrap();
        assert_eq!(shuttle_table_at(&load_catalog(&conn).unwrap(), 30.0), 14);

        let mut table_14 = seed::tables().remove(0);
        upsert_table(&conn, &table_14).unwrap();
        table_14.protection_scheme = "Wet Pipe (revised)".to_string();
        upsert_table(&conn, &table_14).unwrap();

        let tables = list_tables(&conn).unwrap();
        let order: Vec<u32> = tables.iter().map(|t| t.table_number).collect();
        assert_eq!(order, vec![14, 18, 15]);
        assert_eq!(tables[0].protection_scheme, "Wet Pipe (revised)");
        assert_eq!(shuttle_table_at(&load_catalog(&conn).unwrap(), 30.0), 14);
    }

    #[test]
    fn reimporting_a_figure_keeps_its_catalog_position() {
        let conn = open();
        seed_builtin(&conn).unwrap();
        let first = seed::figures().remove(0);
        upsert_figure(&conn, &first).unwrap();

        let numbers: Vec<u32> = list_figures(&conn)
            .unwrap()
            .iter()
            .map(|f| f.figure_number)
            .collect();
        let seeded: Vec<u32> = seed::figures().iter().map(|f| f.figure_number).collect();
        assert_eq!(numbers, seeded);
    }

    #[test]
    fn tables_only_database_keeps_its_tables() {
        let conn = open();
        let mut table = seed::tables().remove(0);
        table.table_number = 21;
        table.protection_scheme = "Dry Pipe".to_string();
        upsert_table(&conn, &table).unwrap();

        let catalog = load_catalog_or_builtin(&conn).unwrap();
        assert_eq!(catalog.figures(), seed::figures().as_slice());
        let numbers: Vec<u32> = catalog.tables().iter().map(|t| t.table_number).collect();
        assert_eq!(numbers, vec![21]);
        assert_eq!(shuttle_table_at(&catalog, 30.0), 21);
    }

    #[test]
    fn empty_database_uses_builtin_catalog() {
        let conn = open();
        let catalog = load_catalog_or_builtin(&conn).unwrap();
        assert_eq!(catalog.figures(), seed::figures().as_slice());
        assert_eq!(catalog.tables(), seed::tables().as_slice());
    }
}
