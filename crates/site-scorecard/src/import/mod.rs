//! CSV import of weekly site reports.

mod headers;
mod parser;

use crate::scorecard::records::WeeklyCounterRecord;
use crate::scorecard::snapshot::SourceSnapshot;
use crate::scorecard::source::{check_weekly_report, upsert_by_key, StoreError, UpsertOutcome};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read weekly report export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid weekly report CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: column '{column}' holds '{value}', expected a whole number")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: {source}")]
    InvalidRow {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: {source}")]
    Rejected {
        line: usize,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub replaced: usize,
}

pub struct WeeklyReportImporter;

impl WeeklyReportImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<WeeklyCounterRecord>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses and checks every row; the first bad row aborts the import.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<WeeklyCounterRecord>, ImportError> {
        let records = parser::parse_weekly_rows(reader)?;
        for (index, record) in records.iter().enumerate() {
            check_weekly_report(record).map_err(|source| ImportError::Rejected {
                line: index + 2,
                source,
            })?;
        }
        Ok(records)
    }

    /// Upserts imported reports into `snapshot` under (site, year, week).
    pub fn merge_into(snapshot: &mut SourceSnapshot, records: Vec<WeeklyCounterRecord>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for record in records {
            let outcome = upsert_by_key(
                &mut snapshot.weekly_reports,
                record,
                WeeklyCounterRecord::natural_key,
            );
            match outcome {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Replaced => summary.replaced += 1,
            }
        }
        info!(
            inserted = summary.inserted,
            replaced = summary.replaced,
            "weekly reports merged"
        );
        summary
    }
}
