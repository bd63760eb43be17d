use chrono::{Local, NaiveDate};
use clap::Args;
use site_scorecard::error::AppError;
use site_scorecard::import::WeeklyReportImporter;
use site_scorecard::scorecard::{
    JsonSnapshotSource, KpiCatalog, KpiCategory, KpiRow, ReportingWeek, Scorecard,
    ScorecardEngine, ScorecardRequest, SiteFilter, SnapshotSource,
};
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScorecardReportArgs {
    /// JSON snapshot with the site record collections
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Weekly report CSV merged into the snapshot before computing
    #[arg(long)]
    pub(crate) weekly_csv: Option<PathBuf>,
    /// Site id to report on (defaults to the whole portfolio)
    #[arg(long)]
    pub(crate) site: Option<String>,
    /// Reporting year; requires --week
    #[arg(long, requires = "week")]
    pub(crate) year: Option<i32>,
    /// Reporting week (1-53); requires --year
    #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=53))]
    pub(crate) week: Option<u32>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Only print KPIs from this category
    #[arg(long, value_parser = parse_category_arg)]
    pub(crate) category: Option<KpiCategory>,
    /// Emit the scorecard as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogListArgs {
    /// Only list KPIs from this category
    #[arg(long, value_parser = parse_category_arg)]
    pub(crate) category: Option<KpiCategory>,
}

fn parse_category_arg(raw: &str) -> Result<KpiCategory, String> {
    KpiCategory::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = KpiCategory::ordered()
            .into_iter()
            .map(KpiCategory::slug)
            .collect();
        format!("unknown category '{raw}' (expected one of {})", known.join(", "))
    })
}

pub(crate) fn run_scorecard_report(args: ScorecardReportArgs) -> Result<(), AppError> {
    let ScorecardReportArgs {
        snapshot,
        weekly_csv,
        site,
        year,
        week,
        as_of,
        category,
        json,
    } = args;

    let mut snapshot = JsonSnapshotSource::new(snapshot).load()?;
    let imported = match weekly_csv {
        Some(path) => {
            let records = WeeklyReportImporter::from_path(path)?;
            Some(WeeklyReportImporter::merge_into(&mut snapshot, records))
        }
        None => None,
    };

    let period = year.zip(week).map(|(year, week)| ReportingWeek { year, week });
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let request = ScorecardRequest::new(SiteFilter::from_param(site.as_deref()), as_of)
        .with_period(period);

    let engine = ScorecardEngine::canonical()?;
    let scorecard = engine.compute(&snapshot, &request);

    if json {
        let body = serde_json::to_string_pretty(&scorecard).map_err(std::io::Error::other)?;
        println!("{body}");
        return Ok(());
    }

    if let Some(summary) = imported {
        println!(
            "Weekly CSV merged: {} inserted, {} replaced",
            summary.inserted, summary.replaced
        );
    }
    print!("{}", render_scorecard(&scorecard, category));
    Ok(())
}

pub(crate) fn run_catalog_list(args: CatalogListArgs) -> Result<(), AppError> {
    let catalog = KpiCatalog::canonical();
    print!("{}", render_catalog(&catalog, args.category));
    Ok(())
}

pub(crate) fn render_scorecard(scorecard: &Scorecard, category: Option<KpiCategory>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Site scorecard ({})", scorecard.site);
    let period = scorecard
        .period
        .map(|week| week.to_string())
        .unwrap_or_else(|| "no weekly report".to_string());
    let _ = writeln!(
        out,
        "Catalog {} | evaluated {} | reporting week {}",
        scorecard.catalog_version, scorecard.as_of, period
    );

    let overall = &scorecard.overall;
    let _ = writeln!(
        out,
        "Overall: {} on track, {} at risk, {} breached, {} no data ({} scored)",
        overall.on_target, overall.warning, overall.critical, overall.no_data, overall.total
    );
    if let Some(pct) = overall.on_target_pct() {
        let _ = writeln!(out, "Health: {pct:.0}% of scored KPIs on track");
    }

    let categories: Vec<KpiCategory> = match category {
        Some(category) => vec![category],
        None => KpiCategory::ordered().to_vec(),
    };
    for category in categories {
        let rows: Vec<&KpiRow> = scorecard.rows_in(category).collect();
        if rows.is_empty() {
            continue;
        }
        let _ = write!(out, "\n{}", category.label());
        if let Some(tally) = scorecard.per_category.get(&category) {
            let _ = write!(
                out,
                " ({}/{} on track)",
                tally.tally.on_target, tally.tally.total
            );
        }
        let _ = writeln!(out);
        for row in rows {
            let _ = writeln!(out, "- {}", format_row(row));
        }
    }

    let alerts = scorecard.alerts();
    if alerts.is_empty() {
        let _ = writeln!(out, "\nAlerts: none");
    } else {
        let _ = writeln!(out, "\nAlerts");
        for row in alerts {
            let _ = writeln!(out, "- [{}] {} {}", row.status_label, row.id, row.label);
        }
    }
    out
}

fn format_row(row: &KpiRow) -> String {
    let value = match row.value {
        Some(value) => format!("{}{}", trim_number(value), unit_suffix(row.unit)),
        None => "n/a".to_string(),
    };
    match &row.target {
        Some(target) => format!(
            "{} {}: {} (target {} {}{}) [{}]",
            row.id,
            row.label,
            value,
            row.operator,
            target,
            unit_suffix(row.unit),
            row.status_label
        ),
        None => format!("{} {}: {} [{}]", row.id, row.label, value, row.status_label),
    }
}

fn unit_suffix(unit: &str) -> String {
    match unit {
        "" | "qty" => String::new(),
        "%" => "%".to_string(),
        other => format!(" {other}"),
    }
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

pub(crate) fn render_catalog(catalog: &KpiCatalog, category: Option<KpiCategory>) -> String {
    let mut out = String::new();
    let definitions = catalog.list_definitions(category);
    let _ = writeln!(
        out,
        "KPI catalog {} ({} definitions, {} scored)",
        catalog.version(),
        definitions.len(),
        catalog.scored_count(category)
    );

    let mut current: Option<KpiCategory> = None;
    for definition in definitions {
        if current != Some(definition.category) {
            current = Some(definition.category);
            let _ = writeln!(out, "\n{}", definition.category.label());
        }
        let target = match &definition.target {
            Some(target) => format!("{} {}", definition.operator, target),
            None => "informational".to_string(),
        };
        let _ = writeln!(
            out,
            "- {} {} [{}] {} | {}",
            definition.id,
            definition.label,
            definition.key,
            target,
            definition.frequency.label()
        );
    }
    out
}
