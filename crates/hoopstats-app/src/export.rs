// File export: per-category folders, CSV writing, all-or-nothing file writes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hoopstats_core::{StatCategory, Tabular};
use tracing::{debug, warn};

use crate::config::ExportConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("path exists but is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

pub(crate) fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

pub const MERGED_FOLDER: &str = "Merged";
pub const HEATMAP_FOLDER: &str = "Heatmaps";

/// `<output_dir>/<folder>/<prefix><year>.csv`
pub fn category_csv_path(config: &ExportConfig, category: StatCategory, year: i32) -> PathBuf {
    config
        .output_dir
        .join(category.folder())
        .join(format!("{}{}.csv", category.file_prefix(), year))
}

/// `<output_dir>/Merged/<a>+<b><year>.csv`
pub fn merged_csv_path(config: &ExportConfig, a: StatCategory, b: StatCategory, year: i32) -> PathBuf {
    config
        .output_dir
        .join(MERGED_FOLDER)
        .join(format!("{}+{}{}.csv", a.file_prefix(), b.file_prefix(), year))
}

/// `<output_dir>/Heatmaps/<year>_<a>+<b>.svg`
pub fn heatmap_path(config: &ExportConfig, a: StatCategory, b: StatCategory, year: i32) -> PathBuf {
    config
        .output_dir
        .join(HEATMAP_FOLDER)
        .join(format!("{}_{}+{}.svg", year, a.file_prefix(), b.file_prefix()))
}

/// Create `dir` (and parents) unless it already exists.
pub fn ensure_directory(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() && !dir.is_dir() {
        return Err(ExportError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    if !dir.exists() {
        debug!(dir = %dir.display(), "creating directory");
        fs::create_dir_all(dir).map_err(io_err(dir))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write `path` through a sibling temp file that is renamed into place only
/// once `fill` succeeded. On any failure the temp file is removed and `path`
/// is left as it was.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut BufWriter<File>, &Path) -> Result<(), ExportError>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let result = File::create(&tmp)
        .map_err(io_err(&tmp))
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            fill(&mut out, path)?;
            out.flush().map_err(io_err(&tmp))?;
            out.get_ref().sync_all().map_err(io_err(&tmp))
        })
        .and_then(|()| fs::rename(&tmp, path).map_err(io_err(path)));

    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!(tmp = %tmp.display(), "failed to remove temp file: {e}");
        }
    }
    result
}

/// Write `table` as CSV: header line first, then one line per row.
///
/// The header line is always there; a table without columns gets an empty
/// one.
pub fn write_csv<T: Tabular + ?Sized>(table: &T, path: &Path) -> Result<(), ExportError> {
    write_atomically(path, |out, path| {
        let csv_err = |source| ExportError::Csv {
            path: path.to_path_buf(),
            source,
        };
        if table.columns().is_empty() {
            out.write_all(b"\n").map_err(io_err(path))?;
        }
        let mut writer = csv::Writer::from_writer(out);
        if !table.columns().is_empty() {
            writer.write_record(table.column_names()).map_err(csv_err)?;
        }
        for i in 0..table.row_count() {
            writer
                .write_record(table.row(i).iter().map(|cell| cell.to_string()))
                .map_err(csv_err)?;
        }
        writer.flush().map_err(io_err(path))
    })?;
    debug!(path = %path.display(), rows = table.row_count(), "wrote CSV");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
