use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::FetchCache;
use crate::error::LoadError;
use crate::filter;
use crate::ingest::{self, Loaded};
use crate::models::{Dataset, FilterCriteria, FilteredView, SummaryMetrics};
use crate::source::DataSource;
use crate::summary;

/// One pass of filter and aggregation over a dataset snapshot.
#[derive(Debug, Clone)]
pub struct DashboardRun<'a> {
    pub total_records: usize,
    pub view: FilteredView<'a>,
    pub metrics: SummaryMetrics,
}

pub fn run<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> DashboardRun<'a> {
    let view = filter::apply(dataset, criteria);
    let metrics = summary::summarize(&view);
    DashboardRun {
        total_records: dataset.len(),
        view,
        metrics,
    }
}

/// A data source plus the memoized result of its last successful load.
pub struct Session<S> {
    source: S,
    cache: FetchCache<Loaded>,
}

impl<S: DataSource> Session<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            cache: FetchCache::new(ttl),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn load(&mut self) -> Result<Arc<Loaded>, LoadError> {
        self.load_at(Instant::now()).await
    }

    /// Serves the cached dataset while it is fresh, otherwise fetches and
    /// normalizes again. Failures are not cached.
    pub async fn load_at(&mut self, now: Instant) -> Result<Arc<Loaded>, LoadError> {
        if let Some(loaded) = self.cache.get(now) {
            log::debug!(
                "serving cached dataset ({}s old)",
                self.cache.age(now).unwrap_or_default().as_secs()
            );
            return Ok(loaded);
        }

        log::info!("fetching {}", self.source.describe());
        let table = self.source.fetch().await?;
        let loaded = ingest::normalize(&table)?;
        log::info!(
            "loaded {} rows, cached for {}s",
            loaded.dataset.len(),
            self.cache.ttl().as_secs()
        );
        Ok(self.cache.store(now, loaded))
    }

    /// Forces the next load to hit the source.
    pub fn refresh(&mut self) {
        log::info!("cache invalidated");
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::NaiveDate;

    use super::*;
    use crate::error::FetchError;
    use crate::ingest::RawTable;
    use crate::models::{DateRange, Dimension};

    struct StubSource {
        table: Option<RawTable>,
        fetches: Cell<usize>,
    }

    impl StubSource {
        fn new(table: Option<RawTable>) -> Self {
            Self {
                table,
                fetches: Cell::new(0),
            }
        }
    }

    impl DataSource for StubSource {
        fn describe(&self) -> String {
            "stub".to_string()
        }

        async fn fetch(&self) -> Result<RawTable, FetchError> {
            self.fetches.set(self.fetches.get() + 1);
            self.table.clone().ok_or(FetchError::Status {
                status: 503,
                message: "unavailable".into(),
            })
        }
    }

    fn rows() -> RawTable {
        RawTable::new(
            vec!["Date".into(), "SDR".into(), "Status".into()],
            vec![
                vec!["2024-01-05".into(), "A".into(), "Done".into()],
                vec!["2024-01-06".into(), "A".into(), "Scheduled".into()],
                vec!["2024-01-10".into(), "B".into(), "No Show".into()],
                vec!["bad-date".into(), "B".into(), "Done".into()],
            ],
        )
    }

    #[tokio::test]
    async fn reuses_dataset_within_ttl() {
        let mut session = Session::new(StubSource::new(Some(rows())), Duration::from_secs(300));
        let start = Instant::now();

        let first = session.load_at(start).await.unwrap();
        let second = session.load_at(start + Duration::from_secs(60)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.source().fetches.get(), 1);

        session.load_at(start + Duration::from_secs(301)).await.unwrap();
        assert_eq!(session.source().fetches.get(), 2);
    }

    #[tokio::test]
    async fn refresh_forces_refetch() {
        let mut session = Session::new(StubSource::new(Some(rows())), Duration::from_secs(300));
        let start = Instant::now();
        session.load_at(start).await.unwrap();
        session.refresh();
        session.load_at(start).await.unwrap();
        assert_eq!(session.source().fetches.get(), 2);
    }

    #[tokio::test]
    async fn fetch_failures_are_not_cached() {
        let mut session = Session::new(StubSource::new(None), Duration::from_secs(300));
        let start = Instant::now();
        assert!(matches!(
            session.load_at(start).await,
            Err(LoadError::Fetch(FetchError::Status { status: 503, .. }))
        ));
        assert!(session.load_at(start).await.is_err());
        assert_eq!(session.source().fetches.get(), 2);
    }

    #[tokio::test]
    async fn schema_errors_surface_missing_columns() {
        let table = RawTable::new(vec!["When".into()], vec![]);
        let mut session = Session::new(StubSource::new(Some(table)), Duration::from_secs(300));
        match session.load().await {
            Err(LoadError::Schema(err)) => assert_eq!(err.missing, vec!["Date", "SDR"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_to_end_run() {
        let mut session = Session::new(StubSource::new(Some(rows())), Duration::from_secs(300));
        let loaded = session.load().await.unwrap();
        assert_eq!(loaded.warning.map(|w| w.unparsed_dates), Some(1));

        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let criteria = FilterCriteria::new(DateRange::new(day(1), day(31)));
        let result = run(&loaded.dataset, &criteria);
        assert_eq!(result.total_records, 4);
        assert_eq!(result.view.len(), 3);
        assert_eq!(result.metrics.done_count, 1);

        let narrowed = run(&loaded.dataset, &criteria.clone().with(Dimension::Sdr, "B"));
        assert_eq!(narrowed.metrics.total, 1);
        assert_eq!(narrowed.metrics.completion_rate, 0.0);
    }
}
