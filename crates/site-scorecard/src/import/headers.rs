/// Maps a spreadsheet header ("Patients Screened", "week-number") to a record
/// field name (`patients_screened`, `week_number`).
pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned
        .split(|ch: char| ch.is_whitespace() || ch == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Text,
    WholeNumber,
}

const TEXT_COLUMNS: [&str; 4] = ["id", "site_id", "period_start", "period_end"];

const NUMBER_COLUMNS: [&str; 28] = [
    "year",
    "week_number",
    "patients_screened",
    "patients_randomized",
    "screen_failures",
    "monthly_target",
    "monthly_accumulated",
    "weekly_projection",
    "weekly_actual",
    "visits_planned",
    "visits_completed",
    "visits_in_window",
    "visits_procedures_complete",
    "patients_ongoing_start",
    "patients_lost",
    "saes_identified",
    "saes_reported_24h",
    "major_deviations",
    "total_deviations_month",
    "total_procedures_month",
    "major_deviations_month",
    "open_capas",
    "overdue_capas",
    "total_coordinators",
    "total_studies",
    "total_patients_ongoing",
    "mv_siv_planned",
    "mv_siv_participated",
];

/// Kind of a normalized weekly report column; `None` for columns the record
/// does not carry (notes, reported_by, audit timestamps).
pub(crate) fn column_kind(header: &str) -> Option<ColumnKind> {
    if TEXT_COLUMNS.contains(&header) {
        Some(ColumnKind::Text)
    } else if NUMBER_COLUMNS.contains(&header) {
        Some(ColumnKind::WholeNumber)
    } else {
        None
    }
}
