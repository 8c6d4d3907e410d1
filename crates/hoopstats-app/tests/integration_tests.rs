// Integration tests for hoopstats.
//
// These drive the full fetch -> extract -> normalize -> export path through
// the library's public API, with an in-memory page source standing in for
// the website and a temporary directory as the export root.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use hoopstats_app::cli::{self, CliError, Command, PairArgs, RangeArgs, SaveArgs};
use hoopstats_app::config::{Config, ExportConfig};
use hoopstats_app::export;
use hoopstats_app::fetch::{page_url, FetchError, PageSource};
use hoopstats_app::pipeline::{self, PipelineError, YearError};
use hoopstats_core::{MergeError, StatCategory};

// ===========================================================================
// Test helpers
// ===========================================================================

const BASE: &str = "http://stub.test/leagues";

/// Page source answering from a URL -> markup map. Unknown URLs are 404s,
/// URLs listed in `timeouts` time out.
#[derive(Default)]
struct StubSource {
    pages: HashMap<String, String>,
    timeouts: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl StubSource {
    fn with(mut self, year: i32, category: StatCategory, markup: String) -> Self {
        self.pages.insert(page_url(BASE, year, category), markup);
        self
    }

    fn timing_out(mut self, year: i32, category: StatCategory) -> Self {
        self.timeouts.push(page_url(BASE, year, category));
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for StubSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.timeouts.iter().any(|t| t == url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
        })
    }
}

fn config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.source.base_url = BASE.to_string();
    config.source.request_delay_ms = 0;
    config.export = ExportConfig {
        output_dir: dir.to_path_buf(),
    };
    config
}

/// Stats page markup in the site's shape: header row of `th` (rank first),
/// data rows with the rank in a `th` and the values in `td`s, plus the
/// repeated header rows the site inserts every 20 players.
fn page(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<html><body><table id=\"stats\"><thead><tr><th>Rk</th>");
    for h in header {
        html.push_str(&format!("<th>{h}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for (i, row) in rows.iter().enumerate() {
        if i > 0 && i % 20 == 0 {
            html.push_str("<tr class=\"thead\"><th>Rk</th>");
            for h in header {
                html.push_str(&format!("<th>{h}</th>"));
            }
            html.push_str("</tr>");
        }
        html.push_str(&format!("<tr><th>{}</th>", i + 1));
        for cell in row {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></body></html>");
    html
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// ===========================================================================
// Saving seasons
// ===========================================================================

#[tokio::test]
async fn traded_player_keeps_only_aggregate_row() {
    let tmp = tempfile::tempdir().unwrap();
    let markup = page(
        &["Player", "Age", "Tm"],
        &[
            row(&["J. Doe", "25", "TOT"]),
            row(&["J. Doe", "25", "LAL"]),
            row(&["J. Doe", "25", "BOS"]),
            row(&["K. Roe", "31", "MIA"]),
        ],
    );
    let source = StubSource::default().with(2019, StatCategory::Totals, markup);

    let report = pipeline::save_range(&source, &config(tmp.path()), StatCategory::Totals, 2019, 2019).await;
    let path = report.outcomes[0].result.as_ref().unwrap();
    assert_eq!(path, &tmp.path().join("Totals").join("tot2019.csv"));

    assert_eq!(
        read_csv(path),
        vec![
            row(&["Player", "Age", "Tm"]),
            row(&["J. Doe", "25", "TOT"]),
            row(&["K. Roe", "31", "MIA"]),
        ]
    );
}

#[tokio::test]
async fn advanced_export_loses_two_spacer_columns() {
    let tmp = tempfile::tempdir().unwrap();
    let header: Vec<String> = (1..=27)
        .map(|i| match i {
            1 => "Player".to_string(),
            2 => "Age".to_string(),
            19 | 24 => String::new(),
            _ => format!("S{i}"),
        })
        .collect();
    let header_refs: Vec<&str> = header.iter().map(String::as_str).collect();
    let data: Vec<Vec<String>> = (0..3)
        .map(|p| {
            (1..=27)
                .map(|i| match i {
                    1 => format!("Player {p}"),
                    2 => (22 + p).to_string(),
                    19 | 24 => String::new(),
                    _ => format!("{}.5", i + p),
                })
                .collect()
        })
        .collect();
    let source = StubSource::default().with(2019, StatCategory::Advanced, page(&header_refs, &data));

    let report =
        pipeline::save_range(&source, &config(tmp.path()), StatCategory::Advanced, 2019, 2019).await;
    let csv = read_csv(report.outcomes[0].result.as_ref().unwrap());

    assert_eq!(csv[0].len(), 25);
    assert!(csv[0].iter().all(|name| !name.is_empty()));
    assert_eq!(csv.len(), 4);
    assert!(csv.iter().all(|r| r.len() == 25));
}

#[tokio::test]
async fn season_without_data_exports_header_line_only() {
    let tmp = tempfile::tempdir().unwrap();
    let source = StubSource::default().with(1975, StatCategory::Advanced, "<html><body></body></html>".into());

    let report =
        pipeline::save_range(&source, &config(tmp.path()), StatCategory::Advanced, 1975, 1975).await;
    let path = report.outcomes[0].result.as_ref().unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "\n");
}

#[tokio::test]
async fn failed_years_do_not_abort_the_range() {
    let tmp = tempfile::tempdir().unwrap();
    let markup = page(&["Player", "Age", "PTS"], &[row(&["A. One", "22", "100"])]);
    let source = StubSource::default()
        .with(2000, StatCategory::PerGame, markup.clone())
        .timing_out(2001, StatCategory::PerGame)
        .with(2003, StatCategory::PerGame, markup);

    let report =
        pipeline::save_range(&source, &config(tmp.path()), StatCategory::PerGame, 2000, 2003).await;

    assert_eq!(source.request_count(), 4);
    let saved: Vec<i32> = report.succeeded().map(|o| o.year).collect();
    assert_eq!(saved, vec![2000, 2003]);
    assert!(matches!(
        report.outcomes[1].result,
        Err(YearError::Fetch(FetchError::Timeout { .. }))
    ));
    assert!(matches!(
        report.outcomes[2].result,
        Err(YearError::Fetch(FetchError::Status { .. }))
    ));

    let folder = tmp.path().join("PerGame");
    let mut files: Vec<String> = fs::read_dir(&folder)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["game2000.csv", "game2003.csv"]);
}

#[tokio::test]
async fn export_failure_is_per_year() {
    let tmp = tempfile::tempdir().unwrap();
    // A file where the category folder should go.
    fs::write(tmp.path().join("Totals"), "blocker").unwrap();
    let markup = page(&["Player", "Age"], &[row(&["A. One", "22"])]);
    let source = StubSource::default()
        .with(2010, StatCategory::Totals, markup.clone())
        .with(2011, StatCategory::Totals, markup);

    let report = pipeline::save_range(&source, &config(tmp.path()), StatCategory::Totals, 2010, 2011).await;
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.all_failed());
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o.result, Err(YearError::Export(export::ExportError::NotADirectory { .. })))));
}

#[tokio::test]
async fn save_all_writes_every_category_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let markup = page(&["Player", "Age", "G"], &[row(&["A. One", "22", "82"])]);
    let mut source = StubSource::default();
    for category in StatCategory::ALL {
        source = source.with(2019, category, markup.clone());
    }

    let reports = pipeline::save_all_categories(&source, &config(tmp.path()), 2019, 2019).await;
    assert_eq!(reports.len(), 5);
    for (report, category) in reports.iter().zip(StatCategory::ALL) {
        assert_eq!(report.category, category);
        assert_eq!(report.succeeded().count(), 1);
    }
    for name in [
        "Totals/tot2019.csv",
        "PerGame/game2019.csv",
        "Per36Min/36min2019.csv",
        "Per100Poss/100poss2019.csv",
        "Advanced/adv2019.csv",
    ] {
        assert!(tmp.path().join(name).is_file(), "{name} missing");
    }
}

// ===========================================================================
// Merging and correlation
// ===========================================================================

fn league(players: impl Iterator<Item = usize>, per_game: bool) -> String {
    let rows: Vec<Vec<String>> = players
        .map(|i| {
            let total = 100 + 7 * i;
            let pts = if per_game {
                format!("{}", total as f64 / 50.0)
            } else {
                total.to_string()
            };
            vec![format!("Player {i}"), (20 + i % 15).to_string(), "BOS".into(), pts]
        })
        .collect();
    page(&["Player", "Age", "Tm", "PTS"], &rows)
}

#[tokio::test]
async fn merge_is_bounded_by_smaller_table() {
    let tmp = tempfile::tempdir().unwrap();
    let source = StubSource::default()
        .with(2019, StatCategory::Totals, league(0..400, false))
        .with(2019, StatCategory::PerGame, league((0..380).chain(1000..1020), true));
    let cfg = config(tmp.path());

    let path = pipeline::save_merged(&source, &cfg, 2019, StatCategory::Totals, StatCategory::PerGame)
        .await
        .unwrap();
    assert_eq!(path, tmp.path().join("Merged").join("tot+game2019.csv"));

    let csv = read_csv(&path);
    assert_eq!(
        csv[0],
        row(&["Player", "Age", "Tm_tot", "PTS_tot", "Tm_game", "PTS_game"])
    );
    assert_eq!(csv.len() - 1, 380);
    assert!(csv[1..].iter().all(|r| {
        let n: usize = r[0].trim_start_matches("Player ").parse().unwrap();
        n < 380
    }));
}

#[tokio::test]
async fn merged_points_correlate_perfectly() {
    let tmp = tempfile::tempdir().unwrap();
    let source = StubSource::default()
        .with(2019, StatCategory::Totals, league(0..40, false))
        .with(2019, StatCategory::PerGame, league(0..40, true));

    let (merged, matrix) = pipeline::correlate_year(
        &source,
        &config(tmp.path()),
        2019,
        StatCategory::Totals,
        StatCategory::PerGame,
    )
    .await
    .unwrap();

    assert_eq!(merged.labels(), ("tot", "game"));
    assert_eq!(matrix.labels(), &["Age", "PTS_tot", "PTS_game"]);
    assert!((matrix.between("PTS_tot", "PTS_game").unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn merging_a_table_without_players_is_a_schema_error() {
    let tmp = tempfile::tempdir().unwrap();
    let source = StubSource::default()
        .with(1975, StatCategory::Advanced, String::new())
        .with(1975, StatCategory::Totals, league(0..5, false));

    let err = pipeline::save_merged(
        &source,
        &config(tmp.path()),
        1975,
        StatCategory::Advanced,
        StatCategory::Totals,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Merge(MergeError::SchemaMismatch { .. })
    ));
    assert!(!tmp.path().join("Merged").join("adv+tot1975.csv").exists());
}

#[tokio::test]
async fn heatmap_written_with_default_title() {
    let tmp = tempfile::tempdir().unwrap();
    let source = StubSource::default()
        .with(2019, StatCategory::Advanced, league(0..30, false))
        .with(2019, StatCategory::Per36Minutes, league(0..30, true));

    let path = pipeline::save_heatmap(
        &source,
        &config(tmp.path()),
        2019,
        StatCategory::Advanced,
        StatCategory::Per36Minutes,
        None,
    )
    .await
    .unwrap();

    assert_eq!(path, tmp.path().join("Heatmaps").join("2019_adv+36min.svg"));
    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("2019 NBA Advanced"));
    assert!(svg.contains("Per 36 Minutes Stats for All Players"));
    assert!(svg.contains("PTS_adv"));
}

// ===========================================================================
// Command dispatch
// ===========================================================================

#[tokio::test]
async fn cli_save_fails_only_when_every_year_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let markup = page(&["Player", "Age"], &[row(&["A. One", "22"])]);
    let source = StubSource::default().with(2002, StatCategory::Totals, markup);

    let partly = Command::Save(SaveArgs {
        category: StatCategory::Totals,
        range: RangeArgs {
            low: 2001,
            high: Some(2002),
        },
    });
    assert!(cli::run(&partly, &cfg, &source).await.is_ok());

    let none = Command::Save(SaveArgs {
        category: StatCategory::Totals,
        range: RangeArgs {
            low: 1990,
            high: Some(1991),
        },
    });
    assert!(matches!(
        cli::run(&none, &cfg, &source).await,
        Err(CliError::BatchFailed {
            category: StatCategory::Totals
        })
    ));
}

#[tokio::test]
async fn cli_merge_uses_configured_pair() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let source = StubSource::default()
        .with(2019, StatCategory::Advanced, league(0..10, false))
        .with(2019, StatCategory::Per36Minutes, league(0..10, true));

    let command = Command::Merge(PairArgs {
        year: 2019,
        first: None,
        second: None,
    });
    cli::run(&command, &cfg, &source).await.unwrap();
    assert!(tmp.path().join("Merged").join("adv+36min2019.csv").is_file());
}
