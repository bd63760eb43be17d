use super::{count, days_between, mean, percent, rule, ResolverRule};
use crate::scorecard::records::{ActionItem, ActionItemSeverity, ActionItemStatus};
use crate::scorecard::snapshot::ScopedSnapshot;

/// Items older than this many days past their due date count as aging.
const AGING_DAYS: i64 = 30;

pub(super) const RULES: &[ResolverRule] = &[
    rule("open_action_items", open_action_items),
    rule("ai_overdue", ai_overdue),
    rule("ai_aging_30days", ai_aging_30days),
    rule("major_findings_open", major_findings_open),
    rule("ai_closure_days", ai_closure_days),
    rule("ai_closed_on_time_pct", ai_closed_on_time_pct),
];

/// Items not yet closed; in-progress work still counts toward overdue and
/// aging.
fn unclosed_items<'s, 'a>(s: &'s ScopedSnapshot<'a>) -> impl Iterator<Item = &'a ActionItem> + 's {
    s.action_items
        .iter()
        .copied()
        .filter(|item| !item.is_closed())
}

/// Only items nobody has picked up yet.
fn open_action_items(s: &ScopedSnapshot<'_>) -> Option<f64> {
    count(
        s.action_items
            .iter()
            .filter(|item| item.status == ActionItemStatus::Open),
    )
}

fn ai_overdue(s: &ScopedSnapshot<'_>) -> Option<f64> {
    count(unclosed_items(s).filter(|item| item.due_date < s.as_of))
}

fn ai_aging_30days(s: &ScopedSnapshot<'_>) -> Option<f64> {
    count(unclosed_items(s).filter(|item| (s.as_of - item.due_date).num_days() > AGING_DAYS))
}

fn major_findings_open(s: &ScopedSnapshot<'_>) -> Option<f64> {
    count(unclosed_items(s).filter(|item| item.severity == ActionItemSeverity::Major))
}

fn ai_closure_days(s: &ScopedSnapshot<'_>) -> Option<f64> {
    mean(
        s.action_items
            .iter()
            .filter(|item| item.is_closed())
            .filter_map(|item| days_between(Some(item.created_at.date()), item.closed_date)),
    )
}

fn ai_closed_on_time_pct(s: &ScopedSnapshot<'_>) -> Option<f64> {
    let closed: Vec<_> = s
        .action_items
        .iter()
        .filter(|item| item.is_closed())
        .filter_map(|item| item.closed_date.map(|closed| closed <= item.due_date))
        .collect();
    let on_time = closed.iter().filter(|on_time| **on_time).count();
    percent(on_time as u32, closed.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{as_of, empty};
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn item(
        severity: ActionItemSeverity,
        status: ActionItemStatus,
        due: NaiveDate,
        closed: Option<NaiveDate>,
    ) -> ActionItem {
        ActionItem {
            id: String::new(),
            site_id: "site-a".to_string(),
            study_id: None,
            description: "finding".to_string(),
            severity,
            status,
            due_date: due,
            closed_date: closed,
            created_at: (due - Duration::days(20))
                .and_hms_opt(9, 0, 0)
                .expect("valid time"),
        }
    }

    #[test]
    fn open_count_excludes_in_progress_but_overdue_does_not() {
        let items = [
            item(ActionItemSeverity::Minor, ActionItemStatus::Open, as_of(), None),
            item(ActionItemSeverity::Minor, ActionItemStatus::InProgress, as_of(), None),
            item(
                ActionItemSeverity::Minor,
                ActionItemStatus::Closed,
                as_of(),
                Some(as_of()),
            ),
        ];
        let snapshot = ScopedSnapshot {
            action_items: items.iter().collect(),
            ..empty()
        };
        assert_eq!(open_action_items(&snapshot), Some(1.0));
        assert_eq!(ai_overdue(&snapshot), Some(0.0));

        let late = [
            item(
                ActionItemSeverity::Minor,
                ActionItemStatus::InProgress,
                as_of() - Duration::days(3),
                None,
            ),
        ];
        let snapshot = ScopedSnapshot {
            action_items: late.iter().collect(),
            ..empty()
        };
        assert_eq!(open_action_items(&snapshot), Some(0.0));
        assert_eq!(ai_overdue(&snapshot), Some(1.0));
    }

    #[test]
    fn overdue_and_aging_are_measured_from_due_date() {
        let items = [
            item(
                ActionItemSeverity::Major,
                ActionItemStatus::Open,
                as_of() - Duration::days(31),
                None,
            ),
            item(
                ActionItemSeverity::Minor,
                ActionItemStatus::Open,
                as_of() - Duration::days(30),
                None,
            ),
            item(ActionItemSeverity::Minor, ActionItemStatus::Open, as_of(), None),
        ];
        let snapshot = ScopedSnapshot {
            action_items: items.iter().collect(),
            ..empty()
        };
        assert_eq!(ai_overdue(&snapshot), Some(2.0));
        assert_eq!(ai_aging_30days(&snapshot), Some(1.0));
        assert_eq!(major_findings_open(&snapshot), Some(1.0));
    }

    #[test]
    fn closure_metrics_only_use_closed_items() {
        let due = as_of() - Duration::days(10);
        let items = [
            item(
                ActionItemSeverity::Minor,
                ActionItemStatus::Closed,
                due,
                Some(due - Duration::days(5)),
            ),
            item(
                ActionItemSeverity::Minor,
                ActionItemStatus::Closed,
                due,
                Some(due + Duration::days(5)),
            ),
            item(ActionItemSeverity::Minor, ActionItemStatus::Open, due, None),
        ];
        let snapshot = ScopedSnapshot {
            action_items: items.iter().collect(),
            ..empty()
        };
        // created 20 days before due: closures at 15 and 25 days
        assert_eq!(ai_closure_days(&snapshot), Some(20.0));
        assert_eq!(ai_closed_on_time_pct(&snapshot), Some(50.0));
    }

    #[test]
    fn no_items_means_zero_counts_and_no_closure_data() {
        let snapshot = empty();
        assert_eq!(open_action_items(&snapshot), Some(0.0));
        assert_eq!(ai_closure_days(&snapshot), None);
        assert_eq!(ai_closed_on_time_pct(&snapshot), None);
    }
}
