use super::aggregator::ScorecardEngine;
use super::snapshot::{ReportingWeek, ScorecardRequest, SiteFilter, SourceSnapshot};
use super::views::Scorecard;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

/// Interactive selection state over a shared snapshot.
///
/// Every setter marks the cached scorecard stale; [`ScorecardSelector::scorecard`]
/// recomputes only when an input changed since the previous call.
#[derive(Debug)]
pub struct ScorecardSelector {
    engine: Arc<ScorecardEngine>,
    snapshot: Arc<SourceSnapshot>,
    generation: u64,
    request: ScorecardRequest,
    cached: Option<CachedScorecard>,
}

#[derive(Debug)]
struct CachedScorecard {
    generation: u64,
    request: ScorecardRequest,
    scorecard: Arc<Scorecard>,
}

impl ScorecardSelector {
    pub fn new(engine: Arc<ScorecardEngine>, snapshot: Arc<SourceSnapshot>, as_of: NaiveDate) -> Self {
        Self {
            engine,
            snapshot,
            generation: 0,
            request: ScorecardRequest::new(SiteFilter::All, as_of),
            cached: None,
        }
    }

    pub fn request(&self) -> &ScorecardRequest {
        &self.request
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn select_site(&mut self, site: SiteFilter) {
        self.request.site = site;
    }

    pub fn select_period(&mut self, period: Option<ReportingWeek>) {
        self.request.period = period;
    }

    pub fn set_as_of(&mut self, as_of: NaiveDate) {
        self.request.as_of = as_of;
    }

    /// Swaps in a freshly loaded snapshot and bumps the generation counter.
    pub fn replace_snapshot(&mut self, snapshot: Arc<SourceSnapshot>) {
        self.snapshot = snapshot;
        self.generation += 1;
    }

    pub fn scorecard(&mut self) -> Arc<Scorecard> {
        if let Some(cached) = &self.cached {
            if cached.generation == self.generation && cached.request == self.request {
                return Arc::clone(&cached.scorecard);
            }
        }

        debug!(generation = self.generation, site = %self.request.site, "recomputing scorecard");
        let scorecard = Arc::new(self.engine.compute(&self.snapshot, &self.request));
        self.cached = Some(CachedScorecard {
            generation: self.generation,
            request: self.request.clone(),
            scorecard: Arc::clone(&scorecard),
        });
        scorecard
    }
}
