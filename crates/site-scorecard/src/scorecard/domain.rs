use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiCategory {
    Recruitment,
    Execution,
    Safety,
    Monitoring,
    Startup,
    Sponsor,
    Team,
    Efficiency,
}

impl KpiCategory {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Recruitment,
            Self::Execution,
            Self::Safety,
            Self::Monitoring,
            Self::Startup,
            Self::Sponsor,
            Self::Team,
            Self::Efficiency,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Recruitment => "Recruitment",
            Self::Execution => "Visit Execution",
            Self::Safety => "Safety & Compliance",
            Self::Monitoring => "Monitoring & Action Items",
            Self::Startup => "Start-up & Regulatory",
            Self::Sponsor => "Sponsor Satisfaction",
            Self::Team => "Team Management",
            Self::Efficiency => "Efficiency",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Recruitment => "recruitment",
            Self::Execution => "execution",
            Self::Safety => "safety",
            Self::Monitoring => "monitoring",
            Self::Startup => "startup",
            Self::Sponsor => "sponsor",
            Self::Team => "team",
            Self::Efficiency => "efficiency",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|category| category.slug() == normalized)
    }
}

impl fmt::Display for KpiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Comparison rule used to classify a value against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KpiOperator {
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "range")]
    Range,
    #[serde(rename = "info")]
    Info,
}

impl KpiOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::AtMost => "<=",
            Self::AtLeast => ">=",
            Self::Equal => "=",
            Self::Range => "range",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for KpiOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Target as stored in the catalog: a plain number or a `"min-max"` range string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiTarget {
    Number(f64),
    Range(String),
}

impl KpiTarget {
    pub fn range(raw: &str) -> Self {
        Self::Range(raw.to_string())
    }
}

impl fmt::Display for KpiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiTarget::Number(value) => write!(f, "{value}"),
            KpiTarget::Range(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiStatus {
    OnTarget,
    Warning,
    Critical,
    Info,
    NoData,
}

impl KpiStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnTarget => "On Track",
            Self::Warning => "At Risk",
            Self::Critical => "Breached",
            Self::Info => "Informational",
            Self::NoData => "No Data",
        }
    }
}

/// Decimal places kept when a resolved value is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Whole,
    Tenths,
}

impl Precision {
    pub fn round(self, value: f64) -> f64 {
        match self {
            Self::Whole => value.round(),
            Self::Tenths => (value * 10.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingFrequency {
    Weekly,
    Monthly,
    Quarterly,
    OnEvent,
    Continuous,
}

impl ReportingFrequency {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::OnEvent => "On event",
            Self::Continuous => "Continuous",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_uses_symbol_wire_names() {
        let encoded = serde_json::to_string(&KpiOperator::AtMost).expect("operator serializes");
        assert_eq!(encoded, "\"<=\"");
        let decoded: KpiOperator = serde_json::from_str("\"range\"").expect("operator parses");
        assert_eq!(decoded, KpiOperator::Range);
    }

    #[test]
    fn target_accepts_numbers_and_range_strings() {
        let number: KpiTarget = serde_json::from_str("15").expect("numeric target parses");
        assert_eq!(number, KpiTarget::Number(15.0));
        let range: KpiTarget = serde_json::from_str("\"3-5\"").expect("range target parses");
        assert_eq!(range, KpiTarget::range("3-5"));
    }

    #[test]
    fn tenths_precision_rounds_half_away_from_zero() {
        assert_eq!(Precision::Tenths.round(2.25), 2.3);
        assert_eq!(Precision::Whole.round(16.4), 16.0);
        assert_eq!(Precision::Whole.round(16.5), 17.0);
    }

    #[test]
    fn category_parses_slugs_case_insensitively() {
        assert_eq!(KpiCategory::parse(" Safety "), Some(KpiCategory::Safety));
        assert_eq!(KpiCategory::parse("unknown"), None);
    }
}
