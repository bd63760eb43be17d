use super::{count, mean, percent, rule, ResolverRule};
use crate::scorecard::snapshot::ScopedSnapshot;
use chrono::Duration;

const GCP_EXPIRY_WINDOW_DAYS: i64 = 30;

pub(super) const RULES: &[ResolverRule] = &[
    rule("gcp_current_pct", gcp_current_pct),
    rule("gcp_expiring_30days", gcp_expiring_30days),
    rule("avg_workload", avg_workload),
    rule("performance_satisfactory_pct", performance_satisfactory_pct),
    rule("team_attrition_pct", team_attrition_pct),
    rule("training_completion_pct", training_completion_pct),
    rule("active_headcount", active_headcount),
    rule("net_headcount_change", net_headcount_change),
];

/// Active members holding GCP certification that has not lapsed by `as_of`.
fn gcp_current_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let active: Vec<_> = s.active_members().collect();
    let current = active
        .iter()
        .filter(|member| member.gcp_current)
        .filter(|member| member.gcp_expiry_date.map_or(true, |expiry| expiry >= s.as_of))
        .count();
    percent(current as u32, active.len() as u32)
}

fn gcp_expiring_30days(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let horizon = s.as_of + Duration::days(GCP_EXPIRY_WINDOW_DAYS);
    count(
        s.active_members()
            .filter(|member| member.gcp_expiry_date.is_some_and(|expiry| expiry <= horizon)),
    )
}

fn avg_workload(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(s.active_members().filter_map(|member| member.workload_score))
}

fn performance_satisfactory_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let rated: Vec<_> = s
        .active_members()
        .map(|member| member.performance_rating)
        .filter(|rating| rating.is_rated())
        .collect();
    let satisfactory = rated.iter().filter(|rating| rating.meets_expectations()).count();
    percent(satisfactory as u32, rated.len() as u32)
}

fn team_attrition_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let inactive = s.team_members.iter().filter(|member| !member.is_active).count();
    percent(inactive as u32, s.team_members.len() as u32)
}

fn training_completion_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let movement = s.movement.as_ref()?;
    percent(movement.trainings_completed, movement.trainings_planned)
}

fn active_headcount(s: &ScopedSnapshot<'_>) -> Option<f64> {
    count(s.active_members())
}

fn net_headcount_change(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let movement = s.movement.as_ref()?;
    Some(f64::from(movement.hires) - f64::from(movement.departures))
}
