use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use site_scorecard::scorecard::source::{
    check_audit_readiness, check_batch, check_weekly_report, upsert_by_key,
};
use site_scorecard::scorecard::{
    AuditReadinessRecord, ScorecardEngine, SnapshotStore, SourceSnapshot, StoreError,
    UpsertOutcome, WeeklyCounterRecord,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<ScorecardEngine>,
    pub(crate) store: Arc<dyn SnapshotStore>,
}

/// Process-local record store backing the HTTP service.
#[derive(Default, Clone)]
pub(crate) struct InMemorySnapshotStore {
    snapshot: Arc<RwLock<SourceSnapshot>>,
}

impl InMemorySnapshotStore {
    pub(crate) fn seeded(snapshot: SourceSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("snapshot lock poisoned".to_string())
}

impl SnapshotStore for InMemorySnapshotStore {
    fn snapshot(&self) -> Result<SourceSnapshot, StoreError> {
        let guard = self.snapshot.read().map_err(poisoned)?;
        Ok(guard.clone())
    }

    fn upsert_weekly_reports(
        &self,
        records: Vec<WeeklyCounterRecord>,
    ) -> Result<Vec<UpsertOutcome>, StoreError> {
        check_batch(&records, check_weekly_report)?;
        let mut guard = self.snapshot.write().map_err(poisoned)?;
        Ok(records
            .into_iter()
            .map(|record| {
                upsert_by_key(
                    &mut guard.weekly_reports,
                    record,
                    WeeklyCounterRecord::natural_key,
                )
            })
            .collect())
    }

    fn upsert_audit_readiness(
        &self,
        records: Vec<AuditReadinessRecord>,
    ) -> Result<Vec<UpsertOutcome>, StoreError> {
        check_batch(&records, check_audit_readiness)?;
        let mut guard = self.snapshot.write().map_err(poisoned)?;
        Ok(records
            .into_iter()
            .map(|record| {
                upsert_by_key(
                    &mut guard.audit_readiness,
                    record,
                    AuditReadinessRecord::natural_key,
                )
            })
            .collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
