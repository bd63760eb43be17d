use crate::infra::{deserialize_optional_date, AppState};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use site_scorecard::error::AppError;
use site_scorecard::import::{ImportSummary, WeeklyReportImporter};
use site_scorecard::scorecard::{
    AuditReadinessRecord, KpiCategory, KpiDefinition, ReportingWeek, Scorecard,
    ScorecardRequest, SiteFilter, SourceSnapshot, UpsertOutcome, WeeklyCounterRecord,
};
use std::io::Cursor;
use tracing::info;

pub(crate) fn scorecard_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/catalog", get(catalog_endpoint))
        .route(
            "/api/v1/scorecard",
            get(stored_scorecard_endpoint).post(inline_scorecard_endpoint),
        )
        .route(
            "/api/v1/weekly-reports",
            axum::routing::put(upsert_weekly_reports_endpoint),
        )
        .route(
            "/api/v1/audit-readiness",
            axum::routing::put(upsert_audit_readiness_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogQuery {
    #[serde(default)]
    pub(crate) category: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogResponse<'a> {
    pub(crate) version: &'static str,
    pub(crate) definitions: Vec<&'a KpiDefinition>,
}

pub(crate) fn parse_category(raw: Option<&str>) -> Result<Option<KpiCategory>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => KpiCategory::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("unknown KPI category '{value}'"))),
    }
}

pub(crate) async fn catalog_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = parse_category(query.category.as_deref())?;
    let catalog = state.engine.catalog();
    let body = CatalogResponse {
        version: catalog.version(),
        definitions: catalog.list_definitions(category),
    };
    let body = serde_json::to_value(body).map_err(axum::Error::new)?;
    Ok(Json(body))
}

/// Selection shared by the stored and inline scorecard endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SelectionParams {
    #[serde(default)]
    pub(crate) site: Option<String>,
    #[serde(default)]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    pub(crate) week: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) as_of: Option<NaiveDate>,
}

impl SelectionParams {
    pub(crate) fn into_request(self) -> Result<ScorecardRequest, AppError> {
        let period = match (self.year, self.week) {
            (Some(year), Some(week)) if (1..=53).contains(&week) => {
                Some(ReportingWeek { year, week })
            }
            (Some(_), Some(week)) => {
                return Err(AppError::BadRequest(format!(
                    "week {week} is outside 1..=53"
                )))
            }
            (None, None) => None,
            _ => {
                return Err(AppError::BadRequest(
                    "year and week must be given together".to_string(),
                ))
            }
        };
        let as_of = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        let site = SiteFilter::from_param(self.site.as_deref());
        Ok(ScorecardRequest::new(site, as_of).with_period(period))
    }
}

pub(crate) async fn stored_scorecard_endpoint(
    Extension(state): Extension<AppState>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<Scorecard>, AppError> {
    let request = params.into_request()?;
    let snapshot = state.store.snapshot()?;
    Ok(Json(state.engine.compute(&snapshot, &request)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct InlineScorecardRequest {
    #[serde(default)]
    pub(crate) snapshot: SourceSnapshot,
    /// Weekly report CSV merged into the snapshot before computing.
    #[serde(default)]
    pub(crate) weekly_csv: Option<String>,
    #[serde(flatten)]
    pub(crate) selection: SelectionParams,
}

#[derive(Debug, Serialize)]
pub(crate) struct InlineScorecardResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) imported: Option<ImportSummary>,
    pub(crate) scorecard: Scorecard,
}

pub(crate) async fn inline_scorecard_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<InlineScorecardRequest>,
) -> Result<Json<InlineScorecardResponse>, AppError> {
    let InlineScorecardRequest {
        mut snapshot,
        weekly_csv,
        selection,
    } = payload;

    let request = selection.into_request()?;
    let imported = match weekly_csv {
        Some(csv) => {
            let records = WeeklyReportImporter::from_reader(Cursor::new(csv.into_bytes()))?;
            Some(WeeklyReportImporter::merge_into(&mut snapshot, records))
        }
        None => None,
    };

    Ok(Json(InlineScorecardResponse {
        imported,
        scorecard: state.engine.compute(&snapshot, &request),
    }))
}

pub(crate) async fn upsert_weekly_reports_endpoint(
    Extension(state): Extension<AppState>,
    Json(records): Json<Vec<WeeklyCounterRecord>>,
) -> Result<Json<ImportSummary>, AppError> {
    let summary = tally(state.store.upsert_weekly_reports(records)?);
    info!(
        inserted = summary.inserted,
        replaced = summary.replaced,
        "weekly reports upserted"
    );
    Ok(Json(summary))
}

pub(crate) async fn upsert_audit_readiness_endpoint(
    Extension(state): Extension<AppState>,
    Json(records): Json<Vec<AuditReadinessRecord>>,
) -> Result<Json<ImportSummary>, AppError> {
    let summary = tally(state.store.upsert_audit_readiness(records)?);
    info!(
        inserted = summary.inserted,
        replaced = summary.replaced,
        "audit reviews upserted"
    );
    Ok(Json(summary))
}

fn tally(outcomes: Vec<UpsertOutcome>) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for outcome in outcomes {
        match outcome {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Replaced => summary.replaced += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemorySnapshotStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use site_scorecard::scorecard::{KpiStatus, ScorecardEngine, SnapshotStore};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            engine: Arc::new(ScorecardEngine::canonical().expect("canonical catalog validates")),
            store: Arc::new(InMemorySnapshotStore::default()),
        }
    }

    fn app(state: AppState) -> Router {
        scorecard_routes().layer(Extension(state))
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn weekly_report(site: &str, screened: u32, failures: u32) -> serde_json::Value {
        json!({
            "site_id": site,
            "year": 2025,
            "week_number": 26,
            "period_start": "2025-06-23",
            "period_end": "2025-06-29",
            "patients_screened": screened,
            "screen_failures": failures
        })
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let (status, body) = send(app(state(false)), Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (status, _) = send(app(state(true)), Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn catalog_filters_by_category() {
        let (status, body) = send(
            app(state(true)),
            Method::GET,
            "/api/v1/catalog?category=sponsor",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], "2025.3");
        let definitions = body["definitions"].as_array().expect("definitions listed");
        assert_eq!(definitions.len(), 3);
        assert!(definitions.iter().all(|def| def["category"] == "sponsor"));

        let (status, body) = send(
            app(state(true)),
            Method::GET,
            "/api/v1/catalog?category=finance",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error message").contains("finance"));
    }

    #[tokio::test]
    async fn upserted_reports_feed_stored_scorecard() {
        let state = state(true);

        let (status, body) = send(
            app(state.clone()),
            Method::PUT,
            "/api/v1/weekly-reports",
            Some(json!([weekly_report("site-a", 50, 5), weekly_report("site-a", 50, 8)])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "inserted": 1, "replaced": 1 }));

        let (status, body) = send(
            app(state),
            Method::GET,
            "/api/v1/scorecard?site=site-a&as_of=2025-06-30",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let row = body["per_kpi"]
            .as_array()
            .expect("rows present")
            .iter()
            .find(|row| row["key"] == "screen_failure_rate")
            .expect("screen failure row")
            .clone();
        assert_eq!(row["value"], 16.0);
        assert_eq!(row["status"], "warning");
        assert_eq!(body["period"], json!({ "year": 2025, "week": 26 }));
    }

    #[tokio::test]
    async fn invalid_weekly_report_is_a_bad_request() {
        let mut report = weekly_report("site-a", 10, 1);
        report["week_number"] = json!(0);
        let (status, _) = send(
            app(state(true)),
            Method::PUT,
            "/api/v1/weekly-reports",
            Some(json!([report])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejected_batch_leaves_store_untouched() {
        let state = state(true);
        let mut bad = weekly_report("site-a", 10, 1);
        bad["week_number"] = json!(0);

        let (status, body) = send(
            app(state.clone()),
            Method::PUT,
            "/api/v1/weekly-reports",
            Some(json!([weekly_report("site-a", 50, 5), bad])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error message").contains("record 2"));

        let snapshot = state.store.snapshot().expect("snapshot readable");
        assert!(snapshot.weekly_reports.is_empty());
    }

    #[tokio::test]
    async fn year_without_week_is_rejected() {
        let (status, body) = send(
            app(state(true)),
            Method::GET,
            "/api/v1/scorecard?year=2025&as_of=2025-06-30",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error message").contains("together"));
    }

    #[tokio::test]
    async fn inline_scorecard_merges_csv_before_computing() {
        let csv = "site_id,year,week_number,period_start,period_end,visits_planned,visits_completed\n\
site-a,2025,26,2025-06-23,2025-06-29,20,19\n";
        let state = state(true);
        let engine = Arc::clone(&state.engine);

        let Json(response) = inline_scorecard_endpoint(
            Extension(state),
            Json(InlineScorecardRequest {
                snapshot: SourceSnapshot::default(),
                weekly_csv: Some(csv.to_string()),
                selection: SelectionParams {
                    site: Some("site-a".to_string()),
                    as_of: NaiveDate::from_ymd_opt(2025, 6, 30),
                    ..SelectionParams::default()
                },
            }),
        )
        .await
        .expect("inline scorecard computes");

        assert_eq!(response.imported, Some(ImportSummary { inserted: 1, replaced: 0 }));
        let row = response
            .scorecard
            .row("visits_completed_pct")
            .expect("visits row");
        assert_eq!((row.value, row.status), (Some(95.0), KpiStatus::OnTarget));
        assert_eq!(response.scorecard.catalog_version, engine.catalog().version());
    }
}
