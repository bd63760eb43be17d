use super::{count, days_between, mean, percent, rule, ResolverRule};
use crate::scorecard::snapshot::ScopedSnapshot;

pub(super) const RULES: &[ResolverRule] = &[
    rule("studies_in_startup", studies_in_startup),
    rule("submission_to_approval_days", submission_to_approval_days),
    rule("approval_to_fpfv_days", approval_to_fpfv_days),
    rule("first_pass_approval_pct", first_pass_approval_pct),
];

fn studies_in_startup(s: &ScopedSnapshot<'_>) -> Option<f64> {
    count(
        s.startup_trackers
            .iter()
            .filter(|tracker| tracker.status.is_in_startup()),
    )
}

fn submission_to_approval_days(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.startup_trackers
            .iter()
            .filter_map(|tracker| days_between(tracker.ec_submission_date, tracker.ec_approval_date)),
    )
}

fn approval_to_fpfv_days(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.startup_trackers
            .iter()
            .filter_map(|tracker| days_between(tracker.ec_approval_date, tracker.fpfv_date)),
    )
}

fn first_pass_approval_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let approved: Vec<bool> = s
        .startup_trackers
        .iter()
        .filter(|tracker| tracker.ec_approval_date.is_some())
        .map(|tracker| !tracker.required_resubmission)
        .collect();
    let first_pass = approved.iter().filter(|first| **first).count();
    percent(first_pass as u32, approved.len() as u32)
}
