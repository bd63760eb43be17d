//! Response-time rules. Open rows (no end timestamp) are skipped until they close.

use super::{hours_between, mean, rule, ResolverRule};
use crate::scorecard::snapshot::ScopedSnapshot;

pub(super) const RULES: &[ResolverRule] = &[
    rule("referral_to_contact_hours", referral_to_contact_hours),
    rule("sponsor_query_response_hours", sponsor_query_response_hours),
    rule("contingency_resolution_hours", contingency_resolution_hours),
];

fn referral_to_contact_hours(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.patient_contacts
            .iter()
            .filter_map(|contact| hours_between(contact.referral_at, contact.contacted_at)),
    )
}

fn sponsor_query_response_hours(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.sponsor_queries
            .iter()
            .filter_map(|query| hours_between(query.received_at, query.responded_at)),
    )
}

fn contingency_resolution_hours(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.contingencies
            .iter()
            .filter_map(|contingency| hours_between(contingency.reported_at, contingency.resolved_at)),
    )
}
