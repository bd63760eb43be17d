use super::catalog::{CatalogError, KpiCatalog, KpiDefinition};
use super::classifier::classify;
use super::domain::KpiCategory;
use super::resolver::ValueResolver;
use super::snapshot::{ScopedSnapshot, ScorecardRequest, SourceSnapshot};
use super::views::{CategoryTally, KpiRow, OverallTally, Scorecard};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Evaluates every catalog definition against a snapshot.
///
/// Construction validates the catalog against the resolver, so `compute` never
/// meets an unknown key. The engine holds no mutable state and can be shared
/// between request handlers.
#[derive(Debug, Clone)]
pub struct ScorecardEngine {
    catalog: KpiCatalog,
    resolver: ValueResolver,
}

impl ScorecardEngine {
    pub fn new(catalog: KpiCatalog) -> Result<Self, CatalogError> {
        Self::with_resolver(catalog, ValueResolver::standard())
    }

    pub fn with_resolver(catalog: KpiCatalog, resolver: ValueResolver) -> Result<Self, CatalogError> {
        catalog.validate(&resolver)?;
        Ok(Self { catalog, resolver })
    }

    /// Engine over the canonical catalog.
    pub fn canonical() -> Result<Self, CatalogError> {
        Self::new(KpiCatalog::canonical())
    }

    pub fn catalog(&self) -> &KpiCatalog {
        &self.catalog
    }

    pub fn compute(&self, snapshot: &SourceSnapshot, request: &ScorecardRequest) -> Scorecard {
        let scoped = ScopedSnapshot::scope(snapshot, request);

        let mut per_category: BTreeMap<KpiCategory, CategoryTally> = KpiCategory::ordered()
            .into_iter()
            .filter(|category| self.catalog.scored_count(Some(*category)) > 0)
            .map(|category| (category, CategoryTally::new(category)))
            .collect();
        let mut overall = OverallTally::default();

        let per_kpi: Vec<KpiRow> = self
            .catalog
            .definitions()
            .iter()
            .map(|definition| {
                let row = self.evaluate(definition, &scoped);
                if !definition.is_informational() {
                    per_category
                        .entry(definition.category)
                        .or_insert_with(|| CategoryTally::new(definition.category))
                        .tally
                        .record(row.status);
                    overall.record(row.status);
                }
                row
            })
            .collect();

        debug!(
            site = %request.site,
            as_of = %request.as_of,
            period = ?request.period,
            current_week = ?scoped.current_week,
            on_target = overall.on_target,
            warning = overall.warning,
            critical = overall.critical,
            no_data = overall.no_data,
            "scorecard computed"
        );

        Scorecard {
            catalog_version: self.catalog.version(),
            site: request.site.clone(),
            as_of: request.as_of,
            period: request.period.or(scoped.current_week),
            per_kpi,
            per_category,
            overall,
        }
    }

    fn evaluate(&self, definition: &KpiDefinition, scoped: &ScopedSnapshot<'_>) -> KpiRow {
        let value = match self.resolver.resolve_definition(definition, scoped) {
            Ok(value) => value,
            Err(err) => {
                // unreachable for a validated catalog; degrade to no data
                warn!(kpi = definition.id, error = %err, "KPI value could not be resolved");
                None
            }
        };
        let status = classify(value, definition.target.as_ref(), definition.operator);

        KpiRow {
            id: definition.id,
            key: definition.key,
            label: definition.label,
            category: definition.category,
            category_label: definition.category.label(),
            value,
            target: definition.target.clone(),
            operator: definition.operator,
            unit: definition.unit,
            status,
            status_label: status.label(),
        }
    }
}
