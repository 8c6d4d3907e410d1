// Fetch -> extract -> normalize -> export, per (year, category).
//
// Batches run one year at a time. A failed year is logged and recorded in
// the report; it never stops the remaining years.

use std::path::PathBuf;
use std::time::Duration;

use hoopstats_core::{
    extract, merge, normalize, CorrelationMatrix, MergeError, MergedTable, NormalizedTable,
    StatCategory,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::export::{self, ExportError};
use crate::fetch::{page_url, FetchError, PageSource};
use crate::heatmap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a single year of a batch produced no file.
#[derive(Debug, thiserror::Error)]
pub enum YearError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Failure of a single-shot merge/correlation run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cannot merge tables: {0}")]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct YearOutcome {
    pub year: i32,
    pub result: Result<PathBuf, YearError>,
}

/// Per-year outcomes of one category over a range, in ascending year order.
#[derive(Debug)]
pub struct BatchReport {
    pub category: StatCategory,
    pub outcomes: Vec<YearOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &YearOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &YearOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// True when there was at least one year and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Request pacing
// ---------------------------------------------------------------------------

/// Keeps consecutive page requests at least `delay` apart.
struct Throttle {
    delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready = last + self.delay;
            if ready > Instant::now() {
                debug!(delay_ms = self.delay.as_millis() as u64, "pacing requests");
                tokio::time::sleep_until(ready).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Single table
// ---------------------------------------------------------------------------

/// Fetch one season page and turn it into a normalized table.
pub async fn load_table(
    source: &dyn PageSource,
    config: &Config,
    year: i32,
    category: StatCategory,
) -> Result<NormalizedTable, FetchError> {
    let url = page_url(&config.source.base_url, year, category);
    let markup = source.fetch(&url).await?;
    let table = normalize(extract(&markup, category), category);
    debug!(year, category = category.source_id(), rows = table.len(), "loaded table");
    Ok(table)
}

async fn save_year(
    source: &dyn PageSource,
    config: &Config,
    category: StatCategory,
    year: i32,
) -> Result<PathBuf, YearError> {
    let table = load_table(source, config, year, category).await?;
    if table.is_empty() {
        info!(year, category = category.source_id(), "no player rows, exporting empty table");
    }
    let path = export::category_csv_path(&config.export, category, year);
    export::write_csv(&table, &path)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

async fn save_range_paced(
    source: &dyn PageSource,
    config: &Config,
    category: StatCategory,
    low: i32,
    high: i32,
    throttle: &mut Throttle,
) -> BatchReport {
    if low > high {
        warn!(low, high, "empty year range, nothing to do");
    }

    let mut outcomes = Vec::new();
    for year in low..=high {
        throttle.wait().await;
        let result = save_year(source, config, category, year).await;
        match &result {
            Ok(path) => info!(year, category = category.source_id(), "saved {}", path.display()),
            Err(e) => warn!(year, category = category.source_id(), "skipping year: {e}"),
        }
        outcomes.push(YearOutcome { year, result });
    }

    BatchReport { category, outcomes }
}

/// Export `category` for every season in `low..=high`.
pub async fn save_range(
    source: &dyn PageSource,
    config: &Config,
    category: StatCategory,
    low: i32,
    high: i32,
) -> BatchReport {
    let mut throttle = Throttle::new(config.source.request_delay());
    save_range_paced(source, config, category, low, high, &mut throttle).await
}

/// Export every category for every season in `low..=high`, one report per
/// category in `StatCategory::ALL` order.
pub async fn save_all_categories(
    source: &dyn PageSource,
    config: &Config,
    low: i32,
    high: i32,
) -> Vec<BatchReport> {
    let mut throttle = Throttle::new(config.source.request_delay());
    let mut reports = Vec::with_capacity(StatCategory::ALL.len());
    for category in StatCategory::ALL {
        reports.push(save_range_paced(source, config, category, low, high, &mut throttle).await);
    }
    reports
}

// ---------------------------------------------------------------------------
// Merge and correlation
// ---------------------------------------------------------------------------

/// Fetch both categories for `year`, join them on (Player, Age) and
/// correlate the numeric columns of the result.
pub async fn correlate_year(
    source: &dyn PageSource,
    config: &Config,
    year: i32,
    a: StatCategory,
    b: StatCategory,
) -> Result<(MergedTable, CorrelationMatrix), PipelineError> {
    let mut throttle = Throttle::new(config.source.request_delay());
    throttle.wait().await;
    let left = load_table(source, config, year, a).await?;
    throttle.wait().await;
    let right = load_table(source, config, year, b).await?;

    let merged = merge(&left, &right)?;
    info!(
        year,
        first = a.source_id(),
        second = b.source_id(),
        rows = merged.len(),
        "merged tables"
    );
    let matrix = CorrelationMatrix::from_table(&merged);
    Ok((merged, matrix))
}

/// Write the merged table for `year` to `<output_dir>/Merged/`.
pub async fn save_merged(
    source: &dyn PageSource,
    config: &Config,
    year: i32,
    a: StatCategory,
    b: StatCategory,
) -> Result<PathBuf, PipelineError> {
    let (merged, _) = correlate_year(source, config, year, a, b).await?;
    let path = export::merged_csv_path(&config.export, a, b, year);
    export::write_csv(&merged, &path)?;
    info!("saved {}", path.display());
    Ok(path)
}

/// Render the correlation heatmap for `year` to `<output_dir>/Heatmaps/`.
pub async fn save_heatmap(
    source: &dyn PageSource,
    config: &Config,
    year: i32,
    a: StatCategory,
    b: StatCategory,
    title: Option<&str>,
) -> Result<PathBuf, PipelineError> {
    let (_, matrix) = correlate_year(source, config, year, a, b).await?;
    let title = title
        .map(str::to_string)
        .unwrap_or_else(|| heatmap::default_title(year, a, b));
    let path = export::heatmap_path(&config.export, a, b, year);
    heatmap::write_heatmap(&matrix, &title, &path)?;
    info!(columns = matrix.dimension(), "saved {}", path.display());
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned markup per URL; anything unknown is a 404.
    struct StubSource {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn new(pages: &[(String, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.clone(), body.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageSource for StubSource {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    const PAGE: &str = "<table>\
        <tr><th>Rk</th><th>Player</th><th>Age</th><th>PTS</th></tr>\
        <tr><td>A. One</td><td>22</td><td>700</td></tr>\
        <tr><td>B. Two</td><td>30</td><td>1100</td></tr>\
        </table>";

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.source.base_url = "http://stub/leagues".into();
        config.source.request_delay_ms = 0;
        config.export = ExportConfig {
            output_dir: dir.to_path_buf(),
        };
        config
    }

    fn url(year: i32, category: StatCategory) -> String {
        page_url("http://stub/leagues", year, category)
    }

    // -- Reports --

    #[tokio::test]
    async fn missing_year_recorded_and_rest_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let source = StubSource::new(&[
            (url(2001, StatCategory::Totals), PAGE),
            (url(2003, StatCategory::Totals), PAGE),
        ]);

        let report = save_range(&source, &cfg, StatCategory::Totals, 2001, 2003).await;
        let years: Vec<i32> = report.outcomes.iter().map(|o| o.year).collect();
        assert_eq!(years, vec![2001, 2002, 2003]);
        assert_eq!(report.succeeded().count(), 2);
        assert_eq!(report.failed().map(|o| o.year).collect::<Vec<_>>(), vec![2002]);
        assert!(!report.all_failed());
        assert!(!tmp.path().join("Totals").join("tot2002.csv").exists());
    }

    #[tokio::test]
    async fn inverted_range_is_empty_report() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&[]);
        let report = save_range(&source, &config(tmp.path()), StatCategory::Totals, 2005, 2001).await;
        assert!(report.outcomes.is_empty());
        assert!(!report.all_failed());
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_failed_when_nothing_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&[]);
        let report = save_range(&source, &config(tmp.path()), StatCategory::Advanced, 1990, 1991).await;
        assert!(report.all_failed());
    }

    // -- Pacing --

    #[tokio::test(start_paused = true)]
    async fn requests_are_spaced_by_delay() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config(tmp.path());
        cfg.source.request_delay_ms = 3000;
        let source = StubSource::new(&[]);

        let start = Instant::now();
        save_range(&source, &cfg, StatCategory::PerGame, 2000, 2002).await;
        assert!(start.elapsed() >= Duration::from_millis(6000));
        assert_eq!(source.requests.lock().unwrap().len(), 3);
    }

    // -- Correlation --

    #[tokio::test]
    async fn correlate_requests_both_categories() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let source = StubSource::new(&[
            (url(2019, StatCategory::Totals), PAGE),
            (url(2019, StatCategory::PerGame), PAGE),
        ]);
        let (merged, matrix) =
            correlate_year(&source, &cfg, 2019, StatCategory::Totals, StatCategory::PerGame)
                .await
                .unwrap();
        assert_eq!(merged.len(), 2);
        assert!(matrix.labels().contains(&"PTS_tot".to_string()));
        assert_eq!(
            *source.requests.lock().unwrap(),
            vec![url(2019, StatCategory::Totals), url(2019, StatCategory::PerGame)]
        );
    }

    #[tokio::test]
    async fn correlate_surfaces_fetch_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&[(url(2019, StatCategory::Totals), PAGE)]);
        let err = correlate_year(
            &source,
            &config(tmp.path()),
            2019,
            StatCategory::Totals,
            StatCategory::PerGame,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(FetchError::Status { .. })));
    }
}
