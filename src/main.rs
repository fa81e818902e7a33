//! ASRS Requirements Calculator
//!
//! FM Global 8-34 sprinkler requirements, cost estimates and lead scoring
//! for automated storage and retrieval systems.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use asrs_calculator::config::Settings;
use asrs_calculator::report::{self, CustomerInfo};
use asrs_calculator::{
    assess, db, import, ConfigurationInput, ConfigurationRequest, CostRateTable, DecisionEngine,
    ReferenceCatalog,
};

#[derive(Parser)]
#[command(name = "asrs-calculator")]
#[command(about = "FM Global 8-34 ASRS sprinkler requirements calculator")]
struct Cli {
    /// Path to the SQLite database (overrides the settings file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Replace the reference data with the built-in FM Global catalog
    LoadSample,

    /// Import reference data from a directory of JSON catalog files
    Import {
        /// Directory to scan for *.json files
        dir: PathBuf,

        /// Clear existing reference data before importing
        #[arg(long)]
        clear: bool,
    },

    /// List all figures in the catalog
    ListFigures,

    /// List all specification tables in the catalog
    ListTables,

    /// Show the configuration options the catalog supports
    Options {
        #[arg(long)]
        json: bool,
    },

    /// Determine FM Global requirements for a configuration
    Check {
        #[command(flatten)]
        configuration: ConfigurationArgs,

        #[arg(long)]
        json: bool,
    },

    /// Requirements plus cost estimate, optimizations and lead score
    Assess {
        #[command(flatten)]
        configuration: ConfigurationArgs,

        #[arg(long, conflicts_with = "csv")]
        json: bool,

        #[arg(long)]
        csv: bool,
    },

    /// Produce a customer quote as JSON
    Quote {
        #[command(flatten)]
        configuration: ConfigurationArgs,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Args)]
struct ConfigurationArgs {
    /// JSON file holding the configuration instead of flags
    #[arg(long, conflicts_with_all = ["asrs_type", "container_type", "depth", "spacing"])]
    input: Option<PathBuf>,

    /// "Shuttle" or "Mini-Load"
    #[arg(long, required_unless_present = "input")]
    asrs_type: Option<String>,

    /// "Closed-Top" or "Open-Top"
    #[arg(long, required_unless_present = "input")]
    container_type: Option<String>,

    /// Rack depth in feet
    #[arg(long, required_unless_present = "input")]
    depth: Option<f64>,

    /// Rack spacing in feet
    #[arg(long, required_unless_present = "input")]
    spacing: Option<f64>,

    /// Ceiling height in feet
    #[arg(long)]
    ceiling: Option<f64>,

    /// Commodity class, e.g. "Class II"
    #[arg(long)]
    commodity: Option<String>,

    /// Storage height in feet
    #[arg(long)]
    storage_height: Option<f64>,
}

impl ConfigurationArgs {
    fn to_input(&self) -> Result<ConfigurationInput> {
        let request = match &self.input {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str::<ConfigurationRequest>(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => ConfigurationRequest {
                asrs_type: self.asrs_type.clone().context("--asrs-type is required")?,
                container_type: self
                    .container_type
                    .clone()
                    .context("--container-type is required")?,
                rack_depth_ft: self.depth.context("--depth is required")?,
                rack_spacing_ft: self.spacing.context("--spacing is required")?,
                ceiling_height_ft: self.ceiling,
                commodity_type: self.commodity.clone(),
                storage_height_ft: self.storage_height,
            },
        };
        Ok(ConfigurationInput::try_from(request)?)
    }
}

fn init_logging(settings: &Settings) {
    let fallback = settings.log.as_deref().unwrap_or("warn");
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn open_catalog(conn: &Connection) -> Result<ReferenceCatalog> {
    db::load_catalog_or_builtin(conn).context("Failed to load reference catalog")
}

fn open_cost_rates(conn: &Connection, settings: &Settings) -> Result<CostRateTable> {
    let rates = db::load_cost_rates(conn)?.with_overrides(&settings.cost_rates)?;
    Ok(rates)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings);

    let database = settings.database_path(cli.database.as_deref());
    let mut conn = Connection::open(&database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", database.display());
        }

        Commands::LoadSample => {
            let figures = db::seed_builtin(&conn)?;
            println!("Loaded {} built-in figures", figures);
        }

        Commands::Import { dir, clear } => {
            if clear {
                println!("Replacing existing reference data...");
            }

            let stats = import::import_directory(&mut conn, &dir, clear)
                .with_context(|| format!("Failed to import from {}", dir.display()))?;
            println!("{}", stats);
        }

        Commands::ListFigures => {
            let figures = db::list_figures(&conn)?;
            if figures.is_empty() {
                println!("No figures in database. Run 'import' or 'load-sample' first.");
            } else {
                println!(
                    "{:>6} {:<10} {:<11} {:>7} {:>8} {:>11} {:>5}",
                    "Figure", "ASRS", "Container", "Depth", "Spacing", "Sprinklers", "Page"
                );
                println!("{}", "-".repeat(63));
                for f in figures {
                    println!(
                        "{:>6} {:<10} {:<11} {:>7} {:>8} {:>11} {:>5}",
                        f.figure_number,
                        f.asrs_type,
                        f.container_type,
                        f.max_depth_ft,
                        f.max_spacing_ft,
                        f.sprinkler_count,
                        f.page_reference
                    );
                }
            }
        }

        Commands::ListTables => {
            let tables = db::list_tables(&conn)?;
            if tables.is_empty() {
                println!("No tables in database. Run 'import' or 'load-sample' first.");
            } else {
                for t in tables {
                    let ceiling = match (t.ceiling_height_min_ft, t.ceiling_height_max_ft) {
                        (None, None) => "any ceiling".to_string(),
                        (min, max) => format!(
                            "ceiling {}-{} ft",
                            min.map_or("*".to_string(), |v| v.to_string()),
                            max.map_or("*".to_string(), |v| v.to_string())
                        ),
                    };
                    let commodities = if t.commodity_types.is_empty() {
                        "all commodities".to_string()
                    } else {
                        t.commodity_types.iter().cloned().collect::<Vec<_>>().join(", ")
                    };
                    println!(
                        "Table {} ({}): {} - {}; {}",
                        t.table_number, t.asrs_type, t.protection_scheme, ceiling, commodities
                    );
                }
            }
        }

        Commands::Options { json } => {
            let options = open_catalog(&conn)?.available_configurations();
            if json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                let join = |values: Vec<String>| values.join(", ");
                println!("ASRS types:      {}", join(options.asrs_types.iter().map(|t| t.to_string()).collect()));
                println!("Container types: {}", join(options.container_types.iter().map(|t| t.to_string()).collect()));
                println!("Depths (ft):     {}", join(options.available_depths.iter().map(|d| d.to_string()).collect()));
                println!("Spacings (ft):   {}", join(options.available_spacings.iter().map(|s| s.to_string()).collect()));
                println!("Commodities:     {}", options.commodity_types.join(", "));
            }
        }

        Commands::Check {
            configuration,
            json,
        } => {
            let input = configuration.to_input()?;
            let catalog = open_catalog(&conn)?;
            let engine = DecisionEngine::new(&catalog);
            let result = engine.get_design_requirements(&input)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match result.compliance.applicable_figure {
                    Some(figure) => println!(
                        "Figure {} ({:?} match), Table {}: {} sprinklers [{}], {}",
                        figure,
                        result.metadata.match_type,
                        result.compliance.applicable_table.unwrap_or_default(),
                        result.specifications.sprinkler_count,
                        result.specifications.sprinkler_numbering,
                        result.specifications.protection_scheme
                    ),
                    None => println!("No applicable figure for {}", result.metadata.search_key),
                }
                for warning in &result.warnings {
                    println!("  ! {}", warning);
                }
            }
        }

        Commands::Assess {
            configuration,
            json,
            csv,
        } => {
            let input = configuration.to_input()?;
            let catalog = open_catalog(&conn)?;
            let engine = DecisionEngine::new(&catalog);
            let rates = open_cost_rates(&conn, &settings)?;
            let assessment = assess(&engine, &input, &rates, &settings.cost_model)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else if csv {
                println!("{}", report::export_csv(&assessment));
            } else {
                print!("{}", assessment);
            }
        }

        Commands::Quote {
            configuration,
            name,
            company,
            email,
        } => {
            let input = configuration.to_input()?;
            let catalog = open_catalog(&conn)?;
            let engine = DecisionEngine::new(&catalog);
            let rates = open_cost_rates(&conn, &settings)?;
            let assessment = assess(&engine, &input, &rates, &settings.cost_model)?;

            let quote = report::generate_quote(
                assessment,
                CustomerInfo {
                    name,
                    company,
                    email,
                },
                Utc::now(),
            );
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
    }

    Ok(())
}
