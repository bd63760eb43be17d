use super::domain::{KpiCategory, KpiOperator, KpiStatus, KpiTarget};
use super::snapshot::{ReportingWeek, SiteFilter};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiRow {
    pub id: &'static str,
    pub key: &'static str,
    pub label: &'static str,
    pub category: KpiCategory,
    pub category_label: &'static str,
    pub value: Option<f64>,
    pub target: Option<KpiTarget>,
    pub operator: KpiOperator,
    pub unit: &'static str,
    pub status: KpiStatus,
    pub status_label: &'static str,
}

/// Pass/fail counts over scored (non-informational) KPIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub on_target: usize,
    pub warning: usize,
    pub critical: usize,
    pub no_data: usize,
    pub total: usize,
}

impl StatusTally {
    /// Counts `status`; informational rows are not tallied.
    pub fn record(&mut self, status: KpiStatus) {
        let slot = match status {
            KpiStatus::OnTarget => &mut self.on_target,
            KpiStatus::Warning => &mut self.warning,
            KpiStatus::Critical => &mut self.critical,
            KpiStatus::NoData => &mut self.no_data,
            KpiStatus::Info => return,
        };
        *slot += 1;
        self.total += 1;
    }

    pub fn on_target_pct(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.on_target as f64 / self.total as f64 * 100.0)
        }
    }
}

pub type OverallTally = StatusTally;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryTally {
    pub label: &'static str,
    #[serde(flatten)]
    pub tally: StatusTally,
}

impl CategoryTally {
    pub fn new(category: KpiCategory) -> Self {
        Self {
            label: category.label(),
            tally: StatusTally::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    pub catalog_version: &'static str,
    pub site: SiteFilter,
    pub as_of: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<ReportingWeek>,
    pub per_kpi: Vec<KpiRow>,
    pub per_category: BTreeMap<KpiCategory, CategoryTally>,
    pub overall: OverallTally,
}

impl Scorecard {
    pub fn row(&self, key: &str) -> Option<&KpiRow> {
        self.per_kpi.iter().find(|row| row.key == key)
    }

    pub fn rows_in(&self, category: KpiCategory) -> impl Iterator<Item = &KpiRow> {
        self.per_kpi.iter().filter(move |row| row.category == category)
    }

    /// Scored rows that need attention, worst first.
    pub fn alerts(&self) -> Vec<&KpiRow> {
        let mut alerts: Vec<&KpiRow> = self
            .per_kpi
            .iter()
            .filter(|row| matches!(row.status, KpiStatus::Critical | KpiStatus::Warning))
            .collect();
        alerts.sort_by(|a, b| b.status.cmp(&a.status).then(a.id.cmp(b.id)));
        alerts
    }
}
