//! Data models for FM Global 8-34 reference data and engine results

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowercase and fold `_` / spaces to `-` so "Mini_Load", "mini load" and
/// "Mini-Load" all compare equal.
fn normalize(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AsrsType {
    Shuttle,
    MiniLoad,
}

impl AsrsType {
    pub const ALL: [AsrsType; 2] = [AsrsType::Shuttle, AsrsType::MiniLoad];

    pub fn as_str(&self) -> &'static str {
        match self {
            AsrsType::Shuttle => "Shuttle",
            AsrsType::MiniLoad => "Mini-Load",
        }
    }
}

impl FromStr for AsrsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "shuttle" => Ok(AsrsType::Shuttle),
            "mini-load" | "miniload" => Ok(AsrsType::MiniLoad),
            _ => Err(Error::Configuration {
                field: "asrsType",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerType {
    ClosedTop,
    OpenTop,
}

impl ContainerType {
    pub const ALL: [ContainerType; 2] = [ContainerType::ClosedTop, ContainerType::OpenTop];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::ClosedTop => "Closed-Top",
            ContainerType::OpenTop => "Open-Top",
        }
    }
}

impl FromStr for ContainerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "closed-top" | "closedtop" => Ok(ContainerType::ClosedTop),
            "open-top" | "opentop" => Ok(ContainerType::OpenTop),
            _ => Err(Error::Configuration {
                field: "containerType",
                value: s.to_string(),
            }),
        }
    }
}

/// Which ASRS types a specification table applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TableScope {
    Only(AsrsType),
    All,
}

impl TableScope {
    pub fn covers(&self, asrs_type: AsrsType) -> bool {
        match self {
            TableScope::All => true,
            TableScope::Only(t) => *t == asrs_type,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableScope::All => "All",
            TableScope::Only(t) => t.as_str(),
        }
    }
}

impl FromStr for TableScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if normalize(s) == "all" {
            return Ok(TableScope::All);
        }
        s.parse().map(TableScope::Only)
    }
}

macro_rules! string_enum_impls {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }
    )*};
}

string_enum_impls!(AsrsType, ContainerType, TableScope);

/// A documented sprinkler arrangement (an FM Global 8-34 figure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureEntry {
    pub figure_number: u32,
    pub asrs_type: AsrsType,
    pub container_type: ContainerType,
    pub max_depth_ft: f64,
    pub max_spacing_ft: f64,
    pub sprinkler_count: u32,
    pub sprinkler_numbering: String,
    pub page_reference: u32,
    pub title: String,
    #[serde(default)]
    pub requires_flue_spaces: bool,
    #[serde(default)]
    pub requires_vertical_barriers: bool,
}

impl FigureEntry {
    /// Key shared by every figure for one ASRS/container combination
    pub fn group_key(&self) -> String {
        group_key(self.asrs_type, self.container_type)
    }

    /// Full configuration key this figure answers exactly
    pub fn search_key(&self) -> String {
        search_key(
            self.asrs_type,
            self.container_type,
            self.max_depth_ft,
            self.max_spacing_ft,
        )
    }
}

pub fn group_key(asrs_type: AsrsType, container_type: ContainerType) -> String {
    format!("{}_{}", asrs_type, container_type)
}

/// `{asrsType}_{containerType}_{depth}_{spacing}`. Whole numbers print without
/// a fractional part, so 3.0 ft and 3 ft produce the same key.
pub fn search_key(
    asrs_type: AsrsType,
    container_type: ContainerType,
    depth_ft: f64,
    spacing_ft: f64,
) -> String {
    format!("{}_{}_{}_{}", asrs_type, container_type, depth_ft, spacing_ft)
}

/// A protection-scheme specification table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    pub table_number: u32,
    pub asrs_type: TableScope,
    pub protection_scheme: String,
    /// Empty means the table applies to every commodity
    #[serde(default)]
    pub commodity_types: BTreeSet<String>,
    #[serde(default)]
    pub ceiling_height_min_ft: Option<f64>,
    #[serde(default)]
    pub ceiling_height_max_ft: Option<f64>,
    #[serde(default)]
    pub storage_height_max_ft: Option<f64>,
}

impl TableEntry {
    /// Inclusive range check; a missing height or missing bound never excludes.
    pub fn within_ceiling_range(&self, ceiling_height_ft: Option<f64>) -> bool {
        let Some(height) = ceiling_height_ft else {
            return true;
        };
        if self.ceiling_height_min_ft.is_some_and(|min| height < min) {
            return false;
        }
        if self.ceiling_height_max_ft.is_some_and(|max| height > max) {
            return false;
        }
        true
    }

    pub fn accepts_commodity(&self, commodity_type: Option<&str>) -> bool {
        match commodity_type {
            None => true,
            Some(_) if self.commodity_types.is_empty() => true,
            Some(c) => self.commodity_types.contains(c.trim()),
        }
    }
}

/// Unit cost for one installed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRate {
    pub component_type: String,
    pub base_cost_per_unit: f64,
}

/// Caller-supplied configuration as it arrives over the wire, before any
/// enum parsing or range checks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRequest {
    pub asrs_type: String,
    pub container_type: String,
    #[serde(alias = "rackDepth")]
    pub rack_depth_ft: f64,
    #[serde(alias = "rackSpacing", alias = "spacingFt")]
    pub rack_spacing_ft: f64,
    #[serde(default, alias = "ceilingHeight")]
    pub ceiling_height_ft: Option<f64>,
    #[serde(default, alias = "commodityClass")]
    pub commodity_type: Option<String>,
    #[serde(default, alias = "storageHeight")]
    pub storage_height_ft: Option<f64>,
}

/// A validated rack/sprinkler configuration query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationInput {
    pub asrs_type: AsrsType,
    pub container_type: ContainerType,
    pub rack_depth_ft: f64,
    pub rack_spacing_ft: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_height_ft: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_height_ft: Option<f64>,
}

impl ConfigurationInput {
    pub fn new(
        asrs_type: AsrsType,
        container_type: ContainerType,
        rack_depth_ft: f64,
        rack_spacing_ft: f64,
    ) -> Self {
        Self {
            asrs_type,
            container_type,
            rack_depth_ft,
            rack_spacing_ft,
            ceiling_height_ft: None,
            commodity_type: None,
            storage_height_ft: None,
        }
    }

    pub fn with_ceiling_height(mut self, feet: f64) -> Self {
        self.ceiling_height_ft = Some(feet);
        self
    }

    pub fn with_commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity_type = Some(commodity.into());
        self
    }

    pub fn with_storage_height(mut self, feet: f64) -> Self {
        self.storage_height_ft = Some(feet);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("rackDepthFt", self.rack_depth_ft)?;
        require_positive("rackSpacingFt", self.rack_spacing_ft)?;
        if let Some(h) = self.ceiling_height_ft {
            require_positive("ceilingHeightFt", h)?;
        }
        if let Some(h) = self.storage_height_ft {
            require_positive("storageHeightFt", h)?;
        }
        Ok(())
    }
}

impl TryFrom<ConfigurationRequest> for ConfigurationInput {
    type Error = Error;

    fn try_from(request: ConfigurationRequest) -> Result<Self> {
        let input = ConfigurationInput {
            asrs_type: request.asrs_type.parse()?,
            container_type: request.container_type.parse()?,
            rack_depth_ft: request.rack_depth_ft,
            rack_spacing_ft: request.rack_spacing_ft,
            ceiling_height_ft: request.ceiling_height_ft,
            commodity_type: request
                .commodity_type
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            storage_height_ft: request.storage_height_ft,
        };
        input.validate()?;
        Ok(input)
    }
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Closest,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub applicable_figure: Option<u32>,
    pub applicable_table: Option<u32>,
    pub page_reference: Option<u32>,
    pub is_compliant: bool,
    pub figure_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Specifications {
    pub sprinkler_count: u32,
    pub sprinkler_numbering: String,
    pub spacing: Option<f64>,
    pub rack_depth: Option<f64>,
    pub protection_scheme: String,
    pub flue_spaces_required: bool,
    pub vertical_barriers_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub search_key: String,
    pub match_type: MatchType,
    /// Set when no table matched and the default table was substituted
    pub fallback_applied: bool,
    pub timestamp: DateTime<Utc>,
}

/// Output of the matching engine for one configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsResult {
    pub compliance: Compliance,
    pub specifications: Specifications,
    pub warnings: Vec<String>,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub sprinklers: f64,
    pub piping: f64,
    pub installation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub breakdown: CostBreakdown,
    pub complexity_multiplier: f64,
    pub subtotal: f64,
    pub total: u64,
    /// `None` when there are no sprinklers to divide by
    pub cost_per_sprinkler: Option<u64>,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationKind {
    Spacing,
    Container,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SavingsRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    #[serde(rename = "type")]
    pub kind: OptimizationKind,
    pub suggestion: String,
    pub impact: String,
    pub savings: SavingsRange,
    pub feasibility: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeadClassification {
    #[serde(rename = "Hot Lead")]
    Hot,
    #[serde(rename = "Warm Lead")]
    Warm,
    #[serde(rename = "Cold Lead")]
    Cold,
}

impl LeadClassification {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Hot => "Hot Lead",
            Self::Warm => "Warm Lead",
            Self::Cold => "Cold Lead",
        }
    }

    pub fn priority(&self) -> LeadPriority {
        match self {
            Self::Hot => LeadPriority::High,
            Self::Warm => LeadPriority::Medium,
            Self::Cold => LeadPriority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeadPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadScore {
    pub score: u8,
    pub classification: LeadClassification,
    pub priority: LeadPriority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enum_spellings() {
        assert_eq!("Mini-Load".parse::<AsrsType>().unwrap(), AsrsType::MiniLoad);
        assert_eq!("mini_load".parse::<AsrsType>().unwrap(), AsrsType::MiniLoad);
        assert_eq!(" shuttle ".parse::<AsrsType>().unwrap(), AsrsType::Shuttle);
        assert_eq!(
            "open top".parse::<ContainerType>().unwrap(),
            ContainerType::OpenTop
        );
        assert_eq!("all".parse::<TableScope>().unwrap(), TableScope::All);
    }

    #[test]
    fn unknown_enum_text_is_a_configuration_error() {
        let err = "Horizontal Carousel".parse::<AsrsType>().unwrap_err();
        assert!(matches!(err, Error::Configuration { field: "asrsType", .. }));

        let err = "Mixed".parse::<ContainerType>().unwrap_err();
        assert!(matches!(err, Error::Configuration { field: "containerType", .. }));
    }

    #[test]
    fn search_key_drops_trailing_zero() {
        assert_eq!(
            search_key(AsrsType::Shuttle, ContainerType::ClosedTop, 3.0, 2.5),
            "Shuttle_Closed-Top_3_2.5"
        );
    }

    #[test]
    fn request_converts_with_aliases() {
        let request: ConfigurationRequest = serde_json::from_str(
            r#"{"asrsType":"Shuttle","containerType":"Closed-Top","rackDepth":6,"rackSpacing":2.5,"ceilingHeight":32}"#,
        )
        .unwrap();
        let input = ConfigurationInput::try_from(request).unwrap();
        assert_eq!(input.rack_depth_ft, 6.0);
        assert_eq!(input.ceiling_height_ft, Some(32.0));
        assert_eq!(input.commodity_type, None);
    }

    #[test]
    fn request_rejects_unknown_container_and_bad_numbers() {
        let request = ConfigurationRequest {
            asrs_type: "Shuttle".into(),
            container_type: "Mixed".into(),
            rack_depth_ft: 3.0,
            rack_spacing_ft: 2.5,
            ..Default::default()
        };
        assert!(matches!(
            ConfigurationInput::try_from(request),
            Err(Error::Configuration { .. })
        ));

        let request = ConfigurationRequest {
            asrs_type: "Shuttle".into(),
            container_type: "Closed-Top".into(),
            rack_depth_ft: 0.0,
            rack_spacing_ft: 2.5,
            ..Default::default()
        };
        assert!(matches!(
            ConfigurationInput::try_from(request),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn ceiling_range_is_inclusive_and_open_when_unbounded() {
        let table = TableEntry {
            table_number: 14,
            asrs_type: TableScope::Only(AsrsType::Shuttle),
            protection_scheme: "Wet Pipe".into(),
            commodity_types: BTreeSet::new(),
            ceiling_height_min_ft: Some(20.0),
            ceiling_height_max_ft: Some(35.0),
            storage_height_max_ft: None,
        };
        assert!(table.within_ceiling_range(Some(20.0)));
        assert!(table.within_ceiling_range(Some(35.0)));
        assert!(!table.within_ceiling_range(Some(35.5)));
        assert!(table.within_ceiling_range(None));
        assert!(table.accepts_commodity(Some("Class IV")));
    }

    #[test]
    fn serializes_wire_spellings() {
        let json = serde_json::to_value(MatchType::Closest).unwrap();
        assert_eq!(json, "closest");
        let json = serde_json::to_value(LeadClassification::Warm).unwrap();
        assert_eq!(json, "Warm Lead");
        let json = serde_json::to_value(AsrsType::MiniLoad).unwrap();
        assert_eq!(json, "Mini-Load");
    }
}
