use super::records::{AuditReadinessRecord, WeeklyCounterRecord};
use super::snapshot::SourceSnapshot;
use std::fs;
use std::path::PathBuf;

/// Supplies the entity collections for one computation.
pub trait SnapshotSource: Send + Sync {
    fn load(&self) -> Result<SourceSnapshot, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Snapshot stored as a single JSON document keyed by collection name.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for JsonSnapshotSource {
    fn load(&self) -> Result<SourceSnapshot, SourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Record store with natural-key upserts.
///
/// Weekly reports are keyed by (site, year, week) and audit reviews by
/// (site, period). Upserting an existing key replaces the row and moves it to
/// the end of its collection, so it becomes the latest insertion for
/// tie-breaking. A batch is applied whole or not at all: one invalid record
/// rejects the batch before anything is written.
pub trait SnapshotStore: Send + Sync {
    fn snapshot(&self) -> Result<SourceSnapshot, StoreError>;
    fn upsert_weekly_reports(
        &self,
        records: Vec<WeeklyCounterRecord>,
    ) -> Result<Vec<UpsertOutcome>, StoreError>;
    fn upsert_audit_readiness(
        &self,
        records: Vec<AuditReadinessRecord>,
    ) -> Result<Vec<UpsertOutcome>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Applies a natural-key upsert to `rows`.
pub fn upsert_by_key<T, K, F>(rows: &mut Vec<T>, record: T, key_of: F) -> UpsertOutcome
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let key = key_of(&record);
    let existing = rows.iter().position(|row| key_of(row) == key);
    let outcome = match existing {
        Some(index) => {
            rows.remove(index);
            UpsertOutcome::Replaced
        }
        None => UpsertOutcome::Inserted,
    };
    rows.push(record);
    outcome
}

/// Runs `check` over every record, naming the first offender by its 1-based
/// position in the batch.
pub fn check_batch<T, F>(records: &[T], check: F) -> Result<(), StoreError>
where
    F: Fn(&T) -> Result<(), StoreError>,
{
    for (index, record) in records.iter().enumerate() {
        check(record).map_err(|err| match err {
            StoreError::Invalid(reason) => {
                StoreError::Invalid(format!("record {}: {reason}", index + 1))
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Rejects records the engine could never place in a reporting period.
pub fn check_weekly_report(record: &WeeklyCounterRecord) -> Result<(), StoreError> {
    if record.site_id.trim().is_empty() {
        return Err(StoreError::Invalid("weekly report needs a site_id".to_string()));
    }
    if !(1..=53).contains(&record.week_number) {
        return Err(StoreError::Invalid(format!(
            "week_number {} outside 1..=53",
            record.week_number
        )));
    }
    if record.period_end < record.period_start {
        return Err(StoreError::Invalid(
            "period_end is before period_start".to_string(),
        ));
    }
    Ok(())
}

pub fn check_audit_readiness(record: &AuditReadinessRecord) -> Result<(), StoreError> {
    if record.site_id.trim().is_empty() {
        return Err(StoreError::Invalid("audit review needs a site_id".to_string()));
    }
    let period = record.period.as_bytes();
    let canonical = period.len() == 7
        && period[4] == b'-'
        && period
            .iter()
            .enumerate()
            .all(|(index, byte)| index == 4 || byte.is_ascii_digit());
    if !canonical || record.period_key().is_none() {
        return Err(StoreError::Invalid(format!(
            "audit period '{}' is not YYYY-MM",
            record.period
        )));
    }
    if let Some(score) = record.score {
        if !(0.0..=100.0).contains(&score) {
            return Err(StoreError::Invalid(format!("audit score {score} outside 0..=100")));
        }
    }
    Ok(())
}
