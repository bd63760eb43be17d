use super::domain::{KpiCategory, KpiOperator, KpiTarget, Precision, ReportingFrequency};
use super::resolver::ValueResolver;
use serde::Serialize;
use std::collections::HashSet;

/// Version of the canonical catalog.
///
/// History: `2025.1` carried 28 KPIs and flagged action items overdue after 15
/// days; `2025.2` grew to 39 KPIs without sponsor or audit coverage. Both are
/// superseded by `2025.3`, whose formulas and targets are fixed together per key.
pub const CANONICAL_CATALOG_VERSION: &str = "2025.3";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiDefinition {
    pub id: &'static str,
    pub key: &'static str,
    pub label: &'static str,
    pub category: KpiCategory,
    pub target: Option<KpiTarget>,
    pub operator: KpiOperator,
    pub unit: &'static str,
    pub frequency: ReportingFrequency,
    pub precision: Precision,
    pub description: &'static str,
}

impl KpiDefinition {
    pub fn is_informational(&self) -> bool {
        self.operator == KpiOperator::Info
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("KPI {id} uses key '{key}' which has no resolver rule")]
    UnknownKey { id: &'static str, key: &'static str },
    #[error("KPI key '{0}' is defined more than once")]
    DuplicateKey(&'static str),
    #[error("KPI id '{0}' is defined more than once")]
    DuplicateId(&'static str),
    #[error("KPI {id} pairs operator '{operator}' with an incompatible target")]
    TargetMismatch {
        id: &'static str,
        operator: KpiOperator,
    },
}

#[derive(Debug, Clone)]
pub struct KpiCatalog {
    version: &'static str,
    definitions: Vec<KpiDefinition>,
}

impl KpiCatalog {
    pub fn canonical() -> Self {
        Self::from_definitions(CANONICAL_CATALOG_VERSION, canonical_definitions())
    }

    /// Builds a catalog, ordering definitions by category then id.
    pub fn from_definitions(version: &'static str, mut definitions: Vec<KpiDefinition>) -> Self {
        definitions.sort_by(|a, b| a.category.cmp(&b.category).then(a.id.cmp(b.id)));
        Self {
            version,
            definitions,
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn definitions(&self) -> &[KpiDefinition] {
        &self.definitions
    }

    pub fn list_definitions(&self, category: Option<KpiCategory>) -> Vec<&KpiDefinition> {
        self.definitions
            .iter()
            .filter(|definition| category.map_or(true, |wanted| definition.category == wanted))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&KpiDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.key == key)
    }

    /// Number of definitions that take part in pass/fail tallies.
    pub fn scored_count(&self, category: Option<KpiCategory>) -> usize {
        self.list_definitions(category)
            .into_iter()
            .filter(|definition| !definition.is_informational())
            .count()
    }

    /// Startup self-check: unique ids and keys, one resolver rule per key, and
    /// informational KPIs without targets.
    pub fn validate(&self, resolver: &ValueResolver) -> Result<(), CatalogError> {
        let mut keys = HashSet::new();
        let mut ids = HashSet::new();

        for definition in &self.definitions {
            if !keys.insert(definition.key) {
                return Err(CatalogError::DuplicateKey(definition.key));
            }
            if !ids.insert(definition.id) {
                return Err(CatalogError::DuplicateId(definition.id));
            }
            if !resolver.has_rule(definition.key) {
                return Err(CatalogError::UnknownKey {
                    id: definition.id,
                    key: definition.key,
                });
            }

            let target_fits = match (definition.operator, &definition.target) {
                (KpiOperator::Info, target) => target.is_none(),
                (_, target) => target.is_some(),
            };
            if !target_fits {
                return Err(CatalogError::TargetMismatch {
                    id: definition.id,
                    operator: definition.operator,
                });
            }
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn kpi(
    id: &'static str,
    key: &'static str,
    label: &'static str,
    category: KpiCategory,
    operator: KpiOperator,
    target: Option<KpiTarget>,
    unit: &'static str,
    frequency: ReportingFrequency,
    precision: Precision,
    description: &'static str,
) -> KpiDefinition {
    KpiDefinition {
        id,
        key,
        label,
        category,
        target,
        operator,
        unit,
        frequency,
        precision,
        description,
    }
}

fn target(value: f64) -> Option<KpiTarget> {
    Some(KpiTarget::Number(value))
}

#[rustfmt::skip]
fn canonical_definitions() -> Vec<KpiDefinition> {
    use KpiCategory::*;
    use KpiOperator::*;
    use Precision::*;
    use ReportingFrequency::*;

    vec![
        kpi("SC-01", "screen_failure_rate", "Screen Failure Rate", Recruitment, AtMost, target(15.0), "%", Weekly, Whole,
            "Screen failures as a share of patients screened."),
        kpi("SC-02", "screening_conversion_rate", "Screening to Randomization Conversion", Recruitment, AtLeast, target(35.0), "%", Weekly, Whole,
            "Patients randomized as a share of patients screened."),
        kpi("SC-03", "randomized_vs_projection", "Randomized vs Weekly Projection", Recruitment, AtLeast, target(90.0), "%", Weekly, Whole,
            "Actual weekly randomizations against the weekly projection."),
        kpi("SC-04", "monthly_target_attainment", "Monthly Enrollment Target Attainment", Recruitment, AtLeast, target(90.0), "%", Monthly, Whole,
            "Month-to-date accumulated enrollment against the monthly target."),
        kpi("SC-05", "referral_to_contact_hours", "Referral to First Contact", Recruitment, AtMost, target(48.0), "h", Continuous, Tenths,
            "Mean hours from referral to first patient contact."),
        kpi("SC-06", "patients_screened_week", "Patients Screened (week)", Recruitment, Info, None, "qty", Weekly, Whole,
            "Patients screened in the current reporting week."),
        kpi("SC-07", "visits_completed_pct", "Visits Completed", Execution, AtLeast, target(90.0), "%", Weekly, Whole,
            "Completed visits as a share of planned visits."),
        kpi("SC-08", "visit_window_adherence_pct", "Visit Window Adherence", Execution, AtLeast, target(90.0), "%", Weekly, Whole,
            "Completed visits performed inside the protocol window."),
        kpi("SC-09", "procedures_complete_pct", "Procedures Complete", Execution, AtLeast, target(95.0), "%", Weekly, Whole,
            "Completed visits with every protocol procedure performed."),
        kpi("SC-10", "patient_retention_pct", "Patient Retention", Execution, AtLeast, target(90.0), "%", Weekly, Whole,
            "Ongoing patients at period start not lost during the period."),
        kpi("SC-11", "patients_ongoing", "Patients Ongoing", Execution, Info, None, "qty", Weekly, Whole,
            "Patients currently ongoing across studies."),
        kpi("SC-12", "sae_reported_24h_pct", "SAEs Reported Within 24h", Safety, Equal, target(100.0), "%", OnEvent, Whole,
            "SAEs reported within 24 hours of identification; 100 when none were identified."),
        kpi("SC-13", "major_deviations_week", "Major Deviations (week)", Safety, AtMost, target(2.0), "qty", Weekly, Whole,
            "Major protocol deviations recorded in the reporting week."),
        kpi("SC-14", "deviation_rate_pct", "Protocol Deviation Rate", Safety, AtMost, target(3.0), "%", Monthly, Tenths,
            "Deviations in the month as a share of procedures performed."),
        kpi("SC-15", "major_deviations_month", "Major Deviations (month)", Safety, AtMost, target(4.0), "qty", Monthly, Whole,
            "Major protocol deviations recorded month to date."),
        kpi("SC-16", "open_capas", "Open CAPAs", Safety, AtMost, target(3.0), "qty", Weekly, Whole,
            "Corrective and preventive actions still open."),
        kpi("SC-17", "overdue_capas", "Overdue CAPAs", Safety, Equal, target(0.0), "qty", Weekly, Whole,
            "Open CAPAs past their due date."),
        kpi("SC-18", "audit_readiness_score", "Audit Readiness Score", Safety, AtLeast, target(90.0), "%", Monthly, Whole,
            "Checklist completion of the latest audit readiness review."),
        kpi("SC-19", "open_action_items", "Open Action Items", Monitoring, AtMost, target(5.0), "qty", Continuous, Whole,
            "Monitoring action items not yet closed."),
        kpi("SC-20", "ai_overdue", "Overdue Action Items", Monitoring, AtMost, target(2.0), "qty", Continuous, Whole,
            "Unclosed action items past their due date."),
        kpi("SC-21", "ai_aging_30days", "Action Items Aging > 30 Days", Monitoring, Equal, target(0.0), "qty", Continuous, Whole,
            "Unclosed action items more than 30 days past their due date."),
        kpi("SC-22", "major_findings_open", "Open Major Findings", Monitoring, Equal, target(0.0), "qty", Continuous, Whole,
            "Unclosed action items with Major severity."),
        kpi("SC-23", "ai_closure_days", "Action Item Closure Time", Monitoring, AtMost, target(30.0), "d", Continuous, Tenths,
            "Mean days from creation to closure of closed action items."),
        kpi("SC-24", "ai_closed_on_time_pct", "Action Items Closed On Time", Monitoring, AtLeast, target(80.0), "%", Continuous, Whole,
            "Closed action items closed on or before their due date."),
        kpi("SC-25", "sponsor_query_response_hours", "Sponsor Query Response Time", Monitoring, AtMost, target(48.0), "h", Continuous, Tenths,
            "Mean hours from query receipt to response."),
        kpi("SC-26", "studies_in_startup", "Studies in Start-up", Startup, Info, None, "qty", Continuous, Whole,
            "Studies neither at FPFV nor suspended."),
        kpi("SC-27", "submission_to_approval_days", "Submission to Approval", Startup, AtMost, target(45.0), "d", OnEvent, Tenths,
            "Mean days from ethics submission to approval."),
        kpi("SC-28", "approval_to_fpfv_days", "Approval to FPFV", Startup, AtMost, target(60.0), "d", OnEvent, Tenths,
            "Mean days from approval to first patient first visit."),
        kpi("SC-29", "first_pass_approval_pct", "First-pass Approval Rate", Startup, AtLeast, target(80.0), "%", OnEvent, Whole,
            "Approved studies that did not require resubmission."),
        kpi("SC-30", "sponsor_performance_avg", "Sponsor Performance Score", Sponsor, AtLeast, target(4.0), "/5", Quarterly, Tenths,
            "Mean sponsor performance rating (1-5)."),
        kpi("SC-31", "sponsor_nps_avg", "Sponsor NPS Average", Sponsor, AtLeast, target(8.0), "/10", Quarterly, Tenths,
            "Mean sponsor recommendation score (0-10)."),
        kpi("SC-32", "sponsor_net_promoter", "Sponsor Net Promoter Score", Sponsor, AtLeast, target(30.0), "pts", Quarterly, Whole,
            "Share of promoters (9-10) minus share of detractors (0-6)."),
        kpi("SC-33", "gcp_current_pct", "Team GCP Current", Team, Equal, target(100.0), "%", Monthly, Whole,
            "Active members with unexpired GCP training."),
        kpi("SC-34", "gcp_expiring_30days", "GCP Expiring Within 30 Days", Team, Equal, target(0.0), "qty", Monthly, Whole,
            "Active members whose GCP certificate expires within 30 days."),
        kpi("SC-35", "avg_workload", "Average Workload Score", Team, AtMost, target(4.0), "pts", Monthly, Tenths,
            "Mean workload score of active members with a score."),
        kpi("SC-36", "performance_satisfactory_pct", "Satisfactory Performance", Team, AtLeast, target(80.0), "%", Quarterly, Whole,
            "Rated active members at Satisfactory or Exceptional."),
        kpi("SC-37", "team_attrition_pct", "Team Attrition", Team, AtMost, target(15.0), "%", Quarterly, Whole,
            "Inactive roster entries as a share of the whole roster."),
        kpi("SC-38", "training_completion_pct", "Training Completion", Team, AtLeast, target(90.0), "%", Quarterly, Whole,
            "Completed trainings against the yearly training plan."),
        kpi("SC-39", "active_headcount", "Active Headcount", Team, Info, None, "qty", Continuous, Whole,
            "Active roster members."),
        kpi("SC-40", "net_headcount_change", "Net Headcount Change", Team, Info, None, "qty", Quarterly, Whole,
            "Hires minus departures in the current year."),
        kpi("SC-41", "studies_per_coordinator", "Studies per Coordinator", Efficiency, Range, Some(KpiTarget::range("3-5")), "", Weekly, Tenths,
            "Active studies divided by coordinators."),
        kpi("SC-42", "patients_per_coordinator", "Patients per Coordinator", Efficiency, Range, Some(KpiTarget::range("15-25")), "", Weekly, Tenths,
            "Ongoing patients divided by coordinators."),
        kpi("SC-43", "mv_siv_participation_pct", "MV/SIV Participation", Efficiency, Equal, target(100.0), "%", Weekly, Whole,
            "Monitoring and initiation visits attended against planned."),
        kpi("SC-44", "contingency_resolution_hours", "Contingency Resolution Time", Efficiency, AtMost, target(72.0), "h", OnEvent, Tenths,
            "Mean hours from contingency report to resolution."),
        kpi("SC-45", "total_coordinators", "Total Coordinators", Efficiency, Info, None, "qty", Weekly, Whole,
            "Coordinators reported in the current week."),
    ]
}
