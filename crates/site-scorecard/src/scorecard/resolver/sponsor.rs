use super::{mean, rule, ResolverRule};
use crate::scorecard::snapshot::ScopedSnapshot;

const PROMOTER_MIN: f64 = 9.0;
const DETRACTOR_MAX: f64 = 6.0;

pub(super) const RULES: &[ResolverRule] = &[
    rule("sponsor_performance_avg", sponsor_performance_avg),
    rule("sponsor_nps_avg", sponsor_nps_avg),
    rule("sponsor_net_promoter", sponsor_net_promoter),
];

fn sponsor_performance_avg(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.sponsor_evaluations
            .iter()
            .filter_map(|evaluation| evaluation.valid_performance()),
    )
}

fn sponsor_nps_avg(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(s.sponsor_evaluations.iter().filter_map(|evaluation| evaluation.valid_nps()))
}

/// Share of promoters minus share of detractors, in points.
fn sponsor_net_promoter(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let scores: Vec<f64> = s
        .sponsor_evaluations
        .iter()
        .filter_map(|evaluation| evaluation.valid_nps())
        .collect();
    if scores.is_empty() {
        return None;
    }

    let total = scores.len() as f64;
    let promoters = scores.iter().filter(|score| **score >= PROMOTER_MIN).count() as f64;
    let detractors = scores.iter().filter(|score| **score <= DETRACTOR_MAX).count() as f64;
    Some((promoters - detractors) / total * 100.0)
}
