//! FM Global 8-34 ASRS requirements calculator
//!
//! Maps a warehouse rack configuration to the applicable FM Global 8-34
//! figure and table, derives the sprinkler specification, and turns that
//! into a cost estimate, optimization suggestions and a lead score.
//!
//! ```no_run
//! use asrs_calculator::{
//!     AsrsType, ConfigurationInput, ContainerType, DecisionEngine, ReferenceCatalog,
//! };
//!
//! let catalog = ReferenceCatalog::builtin()?;
//! let engine = DecisionEngine::new(&catalog);
//! let input = ConfigurationInput::new(AsrsType::Shuttle, ContainerType::ClosedTop, 3.0, 2.5);
//! let result = engine.get_design_requirements(&input)?;
//! assert_eq!(result.compliance.applicable_figure, Some(4));
//! # Ok::<(), asrs_calculator::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod cost;
pub mod db;
pub mod engine;
pub mod error;
pub mod import;
pub mod models;
pub mod report;
pub mod seed;

pub use catalog::ReferenceCatalog;
pub use cost::{assess, Assessment, CostModel, CostRateTable, LeadWeights};
pub use engine::DecisionEngine;
pub use error::{Error, Result};
pub use models::{
    AsrsType, ConfigurationInput, ConfigurationRequest, ContainerType, MatchType,
    RequirementsResult,
};
