//! KPI scorecard engine: catalog, value resolution, status classification and
//! aggregation over a snapshot of site records.

pub mod aggregator;
pub mod catalog;
pub mod classifier;
pub mod domain;
pub mod records;
pub mod resolver;
pub mod selector;
pub mod snapshot;
pub mod source;
pub mod views;

pub use aggregator::ScorecardEngine;
pub use catalog::{CatalogError, KpiCatalog, KpiDefinition, CANONICAL_CATALOG_VERSION};
pub use classifier::{classify, RangeError, TargetRange};
pub use domain::{KpiCategory, KpiOperator, KpiStatus, KpiTarget, Precision, ReportingFrequency};
pub use records::{
    ActionItem, ActionItemSeverity, ActionItemStatus, AuditReadinessRecord, Contingency,
    ContingencyPriority, PatientContact, PerformanceRating, SponsorEvaluation, SponsorQuery,
    StartupStatus, StartupTracker, TeamMember, TeamMovement, WeeklyCounterRecord, WeeklyCounters,
};
pub use resolver::{ResolveError, ValueResolver};
pub use selector::ScorecardSelector;
pub use snapshot::{ReportingWeek, ScopedSnapshot, ScorecardRequest, SiteFilter, SourceSnapshot};
pub use source::{
    JsonSnapshotSource, SnapshotSource, SnapshotStore, SourceError, StoreError, UpsertOutcome,
};
pub use views::{CategoryTally, KpiRow, OverallTally, Scorecard, StatusTally};
