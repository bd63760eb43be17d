use super::records::{
    ActionItem, AuditReadinessRecord, Contingency, PatientContact, SponsorEvaluation,
    SponsorQuery, StartupTracker, TeamMember, TeamMovement, WeeklyCounterRecord, WeeklyCounters,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entity collections read by one scorecard computation.
///
/// Collections missing from a payload deserialize as empty, so a partial fetch
/// still produces a scorecard (with `no_data` where inputs are absent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSnapshot {
    pub weekly_reports: Vec<WeeklyCounterRecord>,
    pub action_items: Vec<ActionItem>,
    pub startup_trackers: Vec<StartupTracker>,
    pub team_members: Vec<TeamMember>,
    pub team_movements: Vec<TeamMovement>,
    pub audit_readiness: Vec<AuditReadinessRecord>,
    pub sponsor_evaluations: Vec<SponsorEvaluation>,
    pub patient_contacts: Vec<PatientContact>,
    pub sponsor_queries: Vec<SponsorQuery>,
    pub contingencies: Vec<Contingency>,
}

impl SourceSnapshot {
    /// Distinct site ids present in any collection, sorted.
    pub fn site_ids(&self) -> Vec<String> {
        let mut sites: Vec<String> = self
            .weekly_reports
            .iter()
            .map(|row| row.site_id.clone())
            .chain(self.action_items.iter().map(|row| row.site_id.clone()))
            .chain(self.startup_trackers.iter().map(|row| row.site_id.clone()))
            .chain(self.team_members.iter().map(|row| row.site_id.clone()))
            .chain(self.audit_readiness.iter().map(|row| row.site_id.clone()))
            .collect();
        sites.sort();
        sites.dedup();
        sites
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteFilter {
    #[default]
    All,
    Site(String),
}

impl SiteFilter {
    /// `None`, empty and `"all"` select the portfolio view.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::All,
            Some(value) if value.eq_ignore_ascii_case("all") => Self::All,
            Some(value) => Self::Site(value.to_string()),
        }
    }

    pub fn matches(&self, site_id: &str) -> bool {
        match self {
            SiteFilter::All => true,
            SiteFilter::Site(id) => id == site_id,
        }
    }
}

impl fmt::Display for SiteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteFilter::All => f.write_str("all sites"),
            SiteFilter::Site(id) => f.write_str(id),
        }
    }
}

/// ISO-style (year, week) reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportingWeek {
    pub year: i32,
    pub week: u32,
}

impl ReportingWeek {
    pub fn of(record: &WeeklyCounterRecord) -> Self {
        Self {
            year: record.year,
            week: record.week_number,
        }
    }
}

impl fmt::Display for ReportingWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Explicit selection passed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScorecardRequest {
    #[serde(default)]
    pub site: SiteFilter,
    /// Reporting week to evaluate; weekly reports after it are ignored.
    #[serde(default)]
    pub period: Option<ReportingWeek>,
    /// Evaluation date used by every aging rule.
    pub as_of: NaiveDate,
}

impl ScorecardRequest {
    pub fn new(site: SiteFilter, as_of: NaiveDate) -> Self {
        Self {
            site,
            period: None,
            as_of,
        }
    }

    pub fn with_period(mut self, period: Option<ReportingWeek>) -> Self {
        self.period = period;
        self
    }
}

/// Snapshot narrowed to one request: site-filtered collections plus the
/// "current" rows picked by the latest-wins rules.
#[derive(Debug, Clone)]
pub struct ScopedSnapshot<'a> {
    pub as_of: NaiveDate,
    /// Current weekly counters; summed across sites for the portfolio view.
    pub current_counters: Option<WeeklyCounters>,
    /// Reporting week of the newest contributing weekly report.
    pub current_week: Option<ReportingWeek>,
    pub audit_score: Option<f64>,
    pub movement: Option<TeamMovement>,
    pub action_items: Vec<&'a ActionItem>,
    pub startup_trackers: Vec<&'a StartupTracker>,
    pub team_members: Vec<&'a TeamMember>,
    pub sponsor_evaluations: Vec<&'a SponsorEvaluation>,
    pub patient_contacts: Vec<&'a PatientContact>,
    pub sponsor_queries: Vec<&'a SponsorQuery>,
    pub contingencies: Vec<&'a Contingency>,
}

impl<'a> ScopedSnapshot<'a> {
    pub fn scope(snapshot: &'a SourceSnapshot, request: &ScorecardRequest) -> Self {
        let site = &request.site;

        let weekly: Vec<&WeeklyCounterRecord> = snapshot
            .weekly_reports
            .iter()
            .filter(|row| site.matches(&row.site_id))
            .filter(|row| match request.period {
                Some(period) => ReportingWeek::of(row) <= period,
                None => true,
            })
            .collect();
        let current_reports = latest_per_site(weekly, |row| &row.site_id, |row| row.period_start);

        let (current_counters, current_week) = if current_reports.is_empty() {
            (None, None)
        } else {
            let mut counters = WeeklyCounters::default();
            for report in &current_reports {
                counters.absorb(&report.counters);
            }
            let week = current_reports.iter().map(|row| ReportingWeek::of(row)).max();
            (Some(counters), week)
        };

        let audits: Vec<&AuditReadinessRecord> = snapshot
            .audit_readiness
            .iter()
            .filter(|row| site.matches(&row.site_id))
            .collect();
        let current_audits =
            latest_per_site(audits, |row| &row.site_id, AuditReadinessRecord::period_key);
        let audit_score = if current_audits.is_empty() {
            None
        } else {
            let total: f64 = current_audits
                .iter()
                .map(|row| row.effective_score())
                .sum();
            Some(total / current_audits.len() as f64)
        };

        let movements: Vec<&TeamMovement> = snapshot
            .team_movements
            .iter()
            .filter(|row| site.matches(&row.site_id))
            .collect();
        let current_movements = latest_per_site(movements, |row| &row.site_id, |row| row.year);
        let movement = if current_movements.is_empty() {
            None
        } else {
            let mut total = TeamMovement::default();
            for row in current_movements {
                total.year = total.year.max(row.year);
                total.headcount_start += row.headcount_start;
                total.hires += row.hires;
                total.departures += row.departures;
                total.headcount_current += row.headcount_current;
                total.trainings_planned += row.trainings_planned;
                total.trainings_completed += row.trainings_completed;
            }
            if let SiteFilter::Site(id) = site {
                total.site_id = id.clone();
            }
            Some(total)
        };

        Self {
            as_of: request.as_of,
            current_counters,
            current_week,
            audit_score,
            movement,
            action_items: filter_site(&snapshot.action_items, site, |row| &row.site_id),
            startup_trackers: filter_site(&snapshot.startup_trackers, site, |row| &row.site_id),
            team_members: filter_site(&snapshot.team_members, site, |row| &row.site_id),
            sponsor_evaluations: filter_site(&snapshot.sponsor_evaluations, site, |row| {
                &row.site_id
            }),
            patient_contacts: filter_site(&snapshot.patient_contacts, site, |row| &row.site_id),
            sponsor_queries: filter_site(&snapshot.sponsor_queries, site, |row| &row.site_id),
            contingencies: filter_site(&snapshot.contingencies, site, |row| &row.site_id),
        }
    }

    pub fn counters(&self) -> Option<&WeeklyCounters> {
        self.current_counters.as_ref()
    }

    pub fn active_members(&self) -> impl Iterator<Item = &&'a TeamMember> + '_ {
        self.team_members.iter().filter(|member| member.is_active)
    }
}

fn filter_site<'a, T, F>(rows: &'a [T], site: &SiteFilter, site_of: F) -> Vec<&'a T>
where
    F: Fn(&T) -> &String,
{
    rows.iter().filter(|row| site.matches(site_of(row))).collect()
}

/// Picks the newest row per site. Rows are visited in insertion order and a row
/// replaces the current pick when its stamp is greater than or equal to it, so
/// on equal stamps the last inserted row wins. Output is ordered by site id.
pub fn latest_per_site<'a, T, K, S, F>(rows: Vec<&'a T>, site_of: S, stamp_of: F) -> Vec<&'a T>
where
    K: Ord,
    S: Fn(&T) -> &String,
    F: Fn(&T) -> K,
{
    let mut latest: BTreeMap<&'a String, (K, &'a T)> = BTreeMap::new();

    for row in rows {
        let stamp = stamp_of(row);
        let site = site_of(row);
        match latest.get(site) {
            Some((current, _)) if stamp < *current => {}
            _ => {
                latest.insert(site, (stamp, row));
            }
        }
    }

    latest.into_values().map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn weekly(id: &str, site: &str, week: u32, start: NaiveDate, screened: u32) -> WeeklyCounterRecord {
        WeeklyCounterRecord {
            id: id.to_string(),
            site_id: site.to_string(),
            year: 2025,
            week_number: week,
            period_start: start,
            period_end: start + chrono::Duration::days(6),
            counters: WeeklyCounters {
                patients_screened: screened,
                ..WeeklyCounters::default()
            },
        }
    }

    #[test]
    fn latest_report_wins_by_period_start() {
        let snapshot = SourceSnapshot {
            weekly_reports: vec![
                weekly("w2", "site-a", 15, date(2025, 4, 7), 20),
                weekly("w1", "site-a", 14, date(2025, 3, 31), 10),
            ],
            ..SourceSnapshot::default()
        };
        let request = ScorecardRequest::new(SiteFilter::Site("site-a".into()), date(2025, 4, 14));
        let scoped = ScopedSnapshot::scope(&snapshot, &request);

        let counters = scoped.counters().expect("current report selected");
        assert_eq!(counters.patients_screened, 20);
        assert_eq!(scoped.current_week, Some(ReportingWeek { year: 2025, week: 15 }));
    }

    #[test]
    fn equal_period_start_breaks_tie_by_insertion_order() {
        let snapshot = SourceSnapshot {
            weekly_reports: vec![
                weekly("first", "site-a", 15, date(2025, 4, 7), 20),
                weekly("second", "site-a", 15, date(2025, 4, 7), 30),
            ],
            ..SourceSnapshot::default()
        };
        let request = ScorecardRequest::new(SiteFilter::Site("site-a".into()), date(2025, 4, 14));
        let scoped = ScopedSnapshot::scope(&snapshot, &request);

        assert_eq!(
            scoped.counters().map(|c| c.patients_screened),
            Some(30),
            "last inserted record wins on equal stamps"
        );
    }

    #[test]
    fn period_selection_ignores_later_reports() {
        let snapshot = SourceSnapshot {
            weekly_reports: vec![
                weekly("w1", "site-a", 14, date(2025, 3, 31), 10),
                weekly("w2", "site-a", 15, date(2025, 4, 7), 20),
            ],
            ..SourceSnapshot::default()
        };
        let request = ScorecardRequest::new(SiteFilter::Site("site-a".into()), date(2025, 4, 14))
            .with_period(Some(ReportingWeek { year: 2025, week: 14 }));
        let scoped = ScopedSnapshot::scope(&snapshot, &request);

        assert_eq!(scoped.counters().map(|c| c.patients_screened), Some(10));
    }

    #[test]
    fn portfolio_view_sums_each_sites_latest_report() {
        let snapshot = SourceSnapshot {
            weekly_reports: vec![
                weekly("a1", "site-a", 14, date(2025, 3, 31), 10),
                weekly("a2", "site-a", 15, date(2025, 4, 7), 20),
                weekly("b1", "site-b", 15, date(2025, 4, 7), 5),
            ],
            ..SourceSnapshot::default()
        };
        let request = ScorecardRequest::new(SiteFilter::All, date(2025, 4, 14));
        let scoped = ScopedSnapshot::scope(&snapshot, &request);

        assert_eq!(scoped.counters().map(|c| c.patients_screened), Some(25));
    }

    #[test]
    fn latest_audit_compares_months_numerically() {
        let review = |period: &str, score: f64| AuditReadinessRecord {
            id: String::new(),
            site_id: "site-a".to_string(),
            period: period.to_string(),
            isf_complete: true,
            regulatory_current: true,
            delegation_logs_current: true,
            consents_verified: true,
            source_docs_complete: true,
            saes_documented: true,
            deviations_documented: true,
            etmf_current: true,
            score: Some(score),
        };
        let snapshot = SourceSnapshot {
            audit_readiness: vec![review("2025-9", 40.0), review("2025-10", 95.0)],
            ..SourceSnapshot::default()
        };
        let request = ScorecardRequest::new(SiteFilter::Site("site-a".into()), date(2025, 10, 31));
        let scoped = ScopedSnapshot::scope(&snapshot, &request);

        assert_eq!(scoped.audit_score, Some(95.0));
    }

    #[test]
    fn missing_collections_scope_to_empty() {
        let snapshot: SourceSnapshot = serde_json::from_str("{}").expect("empty snapshot parses");
        let request = ScorecardRequest::new(SiteFilter::All, date(2025, 4, 14));
        let scoped = ScopedSnapshot::scope(&snapshot, &request);

        assert!(scoped.counters().is_none());
        assert!(scoped.audit_score.is_none());
        assert!(scoped.action_items.is_empty());
    }

    #[test]
    fn site_filter_parses_all_and_site_ids() {
        assert_eq!(SiteFilter::from_param(None), SiteFilter::All);
        assert_eq!(SiteFilter::from_param(Some("ALL")), SiteFilter::All);
        assert_eq!(
            SiteFilter::from_param(Some("site-a")),
            SiteFilter::Site("site-a".to_string())
        );
    }
}
