// Configuration loading and parsing (config/hoopstats.toml).

use hoopstats_core::StatCategory;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not readable: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to install default config at {path}: {source}")]
    DefaultsCopyError {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "hoopstats.toml";

pub const DEFAULT_BASE_URL: &str = "https://www.basketball-reference.com/leagues";

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub export: ExportConfig,
    pub heatmap: HeatmapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            export: ExportConfig {
                output_dir: default_output_dir(),
            },
            heatmap: HeatmapConfig::default(),
        }
    }
}

/// Where pages come from and how politely they are requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Pause between two consecutive page requests of a batch.
    pub request_delay_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("hoopstats/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            request_delay_ms: 3000,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Destination of every exported file. Passed explicitly to the exporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

/// Category pair the `heatmap` and `merge` commands use when none is given.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub first: StatCategory,
    pub second: StatCategory,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            first: StatCategory::Advanced,
            second: StatCategory::Per36Minutes,
        }
    }
}

// ---------------------------------------------------------------------------
// File structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    source: SourceConfig,
    output: OutputSection,
    heatmap: HeatmapConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputSection {
    directory: Option<PathBuf>,
}

/// The user's desktop (where the exports traditionally land), falling back
/// to the working directory when the platform has none.
pub fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.desktop_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hoopstats")
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse configuration text. Every section and field is optional.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        source: file.source,
        export: ExportConfig {
            output_dir: file.output.directory.unwrap_or_else(default_output_dir),
        },
        heatmap: file.heatmap,
    };
    validate(&config)?;
    Ok(config)
}

/// Load and validate `config/hoopstats.toml` relative to `base_dir`.
///
/// A missing file means built-in defaults. This does not copy defaults;
/// prefer `load_config()` which does.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    if !path.exists() {
        info!("no {} found, using built-in defaults", path.display());
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    parse_config(&text, &path)
}

fn copy_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::DefaultsCopyError {
        path: path.to_path_buf(),
        source,
    }
}

/// Install every `defaults/*.toml` that `config/` does not have yet and
/// return the paths written. Files already in `config/` are never touched;
/// anything not ending in `.toml` (such as `*.toml.example`) is ignored.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    if !defaults_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut defaults: Vec<PathBuf> = std::fs::read_dir(&defaults_dir)
        .map_err(copy_err(&defaults_dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    defaults.sort();

    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(copy_err(&config_dir))?;

    let mut installed = Vec::new();
    for source in defaults {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if install_default(&source, &target)? {
            info!("installed default config {}", target.display());
            installed.push(target);
        }
    }
    Ok(installed)
}

/// Copy `source` to `target` unless `target` exists. `create_new` keeps a
/// concurrently created file intact.
fn install_default(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_err(target)(e)),
    };
    let mut src = std::fs::File::open(source).map_err(copy_err(source))?;
    std::io::copy(&mut src, &mut dest).map_err(copy_err(target))?;
    Ok(true)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let base = config.source.base_url.trim();
    if base.is_empty() || !base.starts_with("http") {
        return Err(ConfigError::ValidationError {
            field: "source.base_url".into(),
            message: format!("must be an http(s) URL, got `{base}`"),
        });
    }

    if config.source.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "source.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.export.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "output.directory".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
