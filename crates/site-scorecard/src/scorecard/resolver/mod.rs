//! Value resolution: one derivation rule per KPI key.
//!
//! Rules are pure functions over a [`ScopedSnapshot`]. A rule returns `None`
//! when its inputs cannot support a value (zero denominator, no qualifying
//! records, no current weekly report); counts over record collections return
//! zero instead. Rounding is applied afterwards from the definition's precision.

mod action_items;
mod sponsor;
mod startup;
mod team;
mod turnaround;
mod weekly;

use super::catalog::KpiDefinition;
use super::snapshot::ScopedSnapshot;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

pub(crate) type RuleFn = fn(&ScopedSnapshot<'_>) -> Option<f64>;

#[derive(Clone, Copy)]
pub(crate) struct ResolverRule {
    pub key: &'static str,
    pub compute: RuleFn,
}

const fn rule(key: &'static str, compute: RuleFn) -> ResolverRule {
    ResolverRule { key, compute }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no resolver rule for KPI key '{0}'")]
    UnknownKey(String),
}

/// Lookup table from KPI key to derivation rule.
#[derive(Clone)]
pub struct ValueResolver {
    rules: BTreeMap<&'static str, RuleFn>,
}

impl std::fmt::Debug for ValueResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueResolver")
            .field("keys", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ValueResolver {
    pub fn standard() -> Self {
        let rules = all_rules()
            .map(|rule| (rule.key, rule.compute))
            .collect();
        Self { rules }
    }

    pub fn has_rule(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    /// Raw value for `key`, before precision rounding.
    pub fn resolve(
        &self,
        key: &str,
        snapshot: &ScopedSnapshot<'_>,
    ) -> Result<Option<f64>, ResolveError> {
        let compute = self
            .rules
            .get(key)
            .ok_or_else(|| ResolveError::UnknownKey(key.to_string()))?;

        Ok(compute(snapshot).filter(|value| value.is_finite()))
    }

    /// Value for a catalog definition, rounded to the definition's precision.
    pub fn resolve_definition(
        &self,
        definition: &KpiDefinition,
        snapshot: &ScopedSnapshot<'_>,
    ) -> Result<Option<f64>, ResolveError> {
        let value = self.resolve(definition.key, snapshot)?;
        Ok(value.map(|raw| definition.precision.round(raw)))
    }
}

fn all_rules() -> impl Iterator<Item = ResolverRule> {
    weekly::RULES
        .iter()
        .chain(action_items::RULES)
        .chain(startup::RULES)
        .chain(team::RULES)
        .chain(sponsor::RULES)
        .chain(turnaround::RULES)
        .copied()
}

/// `numerator / denominator * 100`, or `None` for a zero denominator.
pub(crate) fn percent(numerator: u32, denominator: u32) -> Option<f64> {
    ratio(numerator, denominator).map(|value| value * 100.0)
}

pub(crate) fn ratio(numerator: u32, denominator: u32) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(f64::from(numerator) / f64::from(denominator))
    }
}

pub(crate) fn count<I>(items: I) -> Option<f64>
where
    I: Iterator,
{
    Some(items.count() as f64)
}

pub(crate) fn mean<I>(values: I) -> Option<f64>
where
    I: Iterator<Item = f64>,
{
    let (sum, n) = values
        .filter(|value| value.is_finite())
        .fold((0.0, 0usize), |(sum, n), value| (sum + value, n + 1));

    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Whole days from `start` to `end`; `None` when either boundary is missing or
/// the boundaries are out of order.
pub(crate) fn days_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<f64> {
    let days = (end? - start?).num_days();
    (days >= 0).then_some(days as f64)
}

pub(crate) fn hours_between(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Option<f64> {
    let minutes = (end? - start).num_minutes();
    (minutes >= 0).then_some(minutes as f64 / 60.0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::super::records::WeeklyCounters;
    use super::super::snapshot::ScopedSnapshot;
    use chrono::NaiveDate;

    pub(crate) fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid as-of date")
    }

    pub(crate) fn empty<'a>() -> ScopedSnapshot<'a> {
        ScopedSnapshot {
            as_of: as_of(),
            current_counters: None,
            current_week: None,
            audit_score: None,
            movement: None,
            action_items: Vec::new(),
            startup_trackers: Vec::new(),
            team_members: Vec::new(),
            sponsor_evaluations: Vec::new(),
            patient_contacts: Vec::new(),
            sponsor_queries: Vec::new(),
            contingencies: Vec::new(),
        }
    }

    pub(crate) fn with_counters<'a>(counters: WeeklyCounters) -> ScopedSnapshot<'a> {
        ScopedSnapshot {
            current_counters: Some(counters),
            ..empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rule_table_has_one_rule_per_key() {
        let mut seen = HashSet::new();
        for rule in all_rules() {
            assert!(seen.insert(rule.key), "duplicate rule for {}", rule.key);
        }
        assert_eq!(seen.len(), ValueResolver::standard().keys().count());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let resolver = ValueResolver::standard();
        let snapshot = fixtures::empty();
        assert_eq!(
            resolver.resolve("not_a_kpi", &snapshot),
            Err(ResolveError::UnknownKey("not_a_kpi".to_string()))
        );
    }

    #[test]
    fn helpers_guard_empty_inputs() {
        assert_eq!(percent(3, 0), None);
        assert_eq!(percent(1, 4), Some(25.0));
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([1.0, 2.0, f64::NAN].into_iter()), Some(1.5));
        assert_eq!(days_between(None, NaiveDate::from_ymd_opt(2025, 1, 1)), None);
    }

    #[test]
    fn out_of_order_boundaries_are_excluded() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 10);
        let end = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert_eq!(days_between(start, end), None);
        assert_eq!(days_between(end, start), Some(9.0));
    }
}
