//! Rendering assessments as text, CSV and customer quotes

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cost::Assessment;
use crate::models::MatchType;

pub const QUOTE_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote_id: String,
    pub customer_info: CustomerInfo,
    pub assessment: Assessment,
    pub issued_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub terms: String,
    pub warranty: String,
}

/// Build a quote issued at `issued_at`
pub fn generate_quote(
    assessment: Assessment,
    customer_info: CustomerInfo,
    issued_at: DateTime<Utc>,
) -> Quote {
    Quote {
        quote_id: format!("ASRS-{}", issued_at.timestamp_millis()),
        customer_info,
        assessment,
        issued_at,
        valid_until: issued_at + Duration::days(QUOTE_VALIDITY_DAYS),
        terms: "Net 30".to_string(),
        warranty: "5 years parts, 1 year labor".to_string(),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Compact parameter/value/status table for spreadsheets
pub fn export_csv(assessment: &Assessment) -> String {
    let config = &assessment.configuration;
    let compliance = &assessment.requirements.compliance;

    let figure = match compliance.applicable_figure {
        Some(n) => format!("Figure {}", n),
        None => "None".to_string(),
    };
    let figure_status = if compliance.is_compliant {
        "Compliant"
    } else {
        "Manual Review"
    };

    let rows = [
        ["Parameter".to_string(), "Value".to_string(), "Compliance Status".to_string()],
        ["ASRS Type".to_string(), config.asrs_type.to_string(), "Specified".to_string()],
        ["Container Type".to_string(), config.container_type.to_string(), "Specified".to_string()],
        ["Primary Figure".to_string(), figure, figure_status.to_string()],
        [
            "Sprinkler Count".to_string(),
            assessment.requirements.specifications.sprinkler_count.to_string(),
            "Calculated".to_string(),
        ],
        [
            "Total Cost".to_string(),
            format!("${}", assessment.cost_estimate.total),
            "Estimated".to_string(),
        ],
    ];

    rows.iter()
        .map(|row| row.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = &self.configuration;
        let req = &self.requirements;
        let spec = &req.specifications;

        writeln!(f, "=== FM Global 8-34 Requirements ===")?;
        writeln!(
            f,
            "Configuration: {} / {} @ {} ft deep, {} ft spacing",
            config.asrs_type, config.container_type, config.rack_depth_ft, config.rack_spacing_ft
        )?;
        writeln!(f)?;

        writeln!(f, "Compliance:")?;
        match req.compliance.applicable_figure {
            Some(number) => {
                let how = match req.metadata.match_type {
                    MatchType::Exact => "exact match",
                    MatchType::Closest => "closest match",
                    MatchType::None => "no match",
                };
                writeln!(f, "  Figure {} ({}), page {}", number, how, req.compliance.page_reference.unwrap_or(0))?;
                if let Some(title) = &req.compliance.figure_title {
                    writeln!(f, "  {}", title)?;
                }
            }
            None => writeln!(f, "  No applicable figure")?,
        }
        if let Some(table) = req.compliance.applicable_table {
            let note = if req.metadata.fallback_applied {
                " (default)"
            } else {
                ""
            };
            writeln!(f, "  Table {}{}", table, note)?;
        }
        writeln!(
            f,
            "  Status: {}",
            if req.compliance.is_compliant { "compliant" } else { "manual review required" }
        )?;
        writeln!(f)?;

        writeln!(f, "Specifications:")?;
        writeln!(f, "  Sprinklers: {} ({})", spec.sprinkler_count, spec.sprinkler_numbering)?;
        writeln!(f, "  Protection: {}", spec.protection_scheme)?;
        writeln!(f, "  Flue spaces required: {}", yes_no(spec.flue_spaces_required))?;
        writeln!(f, "  Vertical barriers required: {}", yes_no(spec.vertical_barriers_required))?;

        if !req.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warning in &req.warnings {
                writeln!(f, "  ! {}", warning)?;
            }
        }
        writeln!(f)?;

        let cost = &self.cost_estimate;
        writeln!(f, "Cost estimate ({}):", cost.currency)?;
        writeln!(f, "  Sprinklers:   {:>10.0}", cost.breakdown.sprinklers)?;
        writeln!(f, "  Piping:       {:>10.0}", cost.breakdown.piping)?;
        writeln!(f, "  Installation: {:>10.0}", cost.breakdown.installation)?;
        writeln!(f, "  Complexity:   {:>10.2}x", cost.complexity_multiplier)?;
        writeln!(f, "  Total:        {:>10}", cost.total)?;
        match cost.cost_per_sprinkler {
            Some(per) => writeln!(f, "  Per sprinkler: {}", per)?,
            None => writeln!(f, "  Per sprinkler: n/a")?,
        }

        if !self.optimizations.is_empty() {
            writeln!(f)?;
            writeln!(f, "Optimizations:")?;
            for opt in &self.optimizations {
                writeln!(
                    f,
                    "  - {}: {} (save {:.0}-{:.0}, feasibility {})",
                    opt.suggestion, opt.impact, opt.savings.min, opt.savings.max, opt.feasibility
                )?;
            }
            writeln!(f, "  Potential savings up to {:.0}", self.total_savings)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "Lead: {} / 100 - {} ({:?} priority)",
            self.lead_score.score,
            self.lead_score.classification.display_name(),
            self.lead_score.priority
        )?;

        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
