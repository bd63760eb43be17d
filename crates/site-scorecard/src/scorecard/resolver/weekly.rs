//! Rules over the current weekly counter record and the latest audit review.

use super::{percent, ratio, rule, ResolverRule};
use crate::scorecard::snapshot::ScopedSnapshot;

pub(super) const RULES: &[ResolverRule] = &[
    rule("screen_failure_rate", screen_failure_rate),
    rule("screening_conversion_rate", screening_conversion_rate),
    rule("randomized_vs_projection", randomized_vs_projection),
    rule("monthly_target_attainment", monthly_target_attainment),
    rule("patients_screened_week", patients_screened_week),
    rule("visits_completed_pct", visits_completed_pct),
    rule("visit_window_adherence_pct", visit_window_adherence_pct),
    rule("procedures_complete_pct", procedures_complete_pct),
    rule("patient_retention_pct", patient_retention_pct),
    rule("patients_ongoing", patients_ongoing),
    rule("sae_reported_24h_pct", sae_reported_24h_pct),
    rule("major_deviations_week", major_deviations_week),
    rule("deviation_rate_pct", deviation_rate_pct),
    rule("major_deviations_month", major_deviations_month),
    rule("open_capas", open_capas),
    rule("overdue_capas", overdue_capas),
    rule("audit_readiness_score", audit_readiness_score),
    rule("studies_per_coordinator", studies_per_coordinator),
    rule("patients_per_coordinator", patients_per_coordinator),
    rule("mv_siv_participation_pct", mv_siv_participation_pct),
    rule("total_coordinators", total_coordinators),
];

fn screen_failure_rate(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.screen_failures, c.patients_screened)
}

fn screening_conversion_rate(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.patients_randomized, c.patients_screened)
}

fn randomized_vs_projection(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.weekly_actual, c.weekly_projection)
}

fn monthly_target_attainment(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.monthly_accumulated, c.monthly_target)
}

fn patients_screened_week(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.patients_screened))
}

fn visits_completed_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.visits_completed, c.visits_planned)
}

fn visit_window_adherence_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.visits_in_window, c.visits_completed)
}

fn procedures_complete_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.visits_procedures_complete, c.visits_completed)
}

fn patient_retention_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    let retained = c.patients_ongoing_start.saturating_sub(c.patients_lost);
    percent(retained, c.patients_ongoing_start)
}

fn patients_ongoing(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.total_patients_ongoing))
}

// Nothing to report late when no SAE was identified.
fn sae_reported_24h_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    if c.saes_identified == 0 {
        return Some(100.0);
    }
    percent(c.saes_reported_24h, c.saes_identified)
}

fn major_deviations_week(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.major_deviations))
}

fn deviation_rate_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.total_deviations_month, c.total_procedures_month)
}

fn major_deviations_month(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.major_deviations_month))
}

fn open_capas(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.open_capas))
}

fn overdue_capas(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.overdue_capas))
}

fn audit_readiness_score(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.audit_score
}

fn studies_per_coordinator(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    ratio(c.total_studies, c.total_coordinators)
}

fn patients_per_coordinator(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    ratio(c.total_patients_ongoing, c.total_coordinators)
}

fn mv_siv_participation_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let c = s.counters()?;
    percent(c.mv_siv_participated, c.mv_siv_planned)
}

fn total_coordinators(s: &ScopedSnapshot<'_>) -> Option<f64> {
    s.counters().map(|c| f64::from(c.total_coordinators))
}
