// Configuration loading and parsing (tabellone.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::seed::guard::DEFAULT_MAX_DEPTH;
use crate::seed::EngineOptions;

const CONFIG_FILE: &str = "tabellone.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid `{field}`: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("cannot create {path} from defaults: {source}")]
    Init {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// tabellone.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub round_robin: RoundRobinSection,
    #[serde(default)]
    pub paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Hop budget for nested references across brackets.
    #[serde(default = "default_max_depth")]
    pub max_resolution_depth: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            max_resolution_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_true")]
    pub compact_team_names: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        DisplaySection {
            compact_team_names: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundRobinSection {
    /// Largest group-stage sub-group that gets a full round robin.
    #[serde(default = "default_group_cap")]
    pub group_size_cap: usize,
}

impl Default for RoundRobinSection {
    fn default() -> Self {
        RoundRobinSection {
            group_size_cap: crate::round_robin::DEFAULT_GROUP_CAP,
        }
    }
}

/// Data file locations, relative to the base directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub snapshot: String,
    pub group_standings: String,
    pub overall_ranking: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            snapshot: "data/snapshot.json".into(),
            group_standings: "data/group_standings.csv".into(),
            overall_ranking: "data/overall_ranking.csv".into(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_true() -> bool {
    true
}

fn default_group_cap() -> usize {
    crate::round_robin::DEFAULT_GROUP_CAP
}

impl Config {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_depth: self.engine.max_resolution_depth,
            compact_names: self.display.compact_team_names,
        }
    }

    pub fn group_cap(&self) -> usize {
        self.round_robin.group_size_cap
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config").join(CONFIG_FILE)
}

/// Load and validate `config/tabellone.toml` relative to `base_dir`.
///
/// Does not copy defaults; see `load_config()` for that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(base_dir);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
    validate(&config)?;
    Ok(config)
}

/// Copy `defaults/tabellone.toml` to `config/` unless a config is already
/// there. Returns the path written, if any.
///
/// With neither file present there is nothing to load, which `load_config_from`
/// reports as `Missing`.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = config_path(base_dir);
    let default = base_dir.join("defaults").join(CONFIG_FILE);
    if target.exists() || !default.exists() {
        return Ok(None);
    }
    let init_err = |source| ConfigError::Init {
        path: target.clone(),
        source,
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(init_err)?;
    }
    std::fs::copy(&default, &target).map_err(init_err)?;
    Ok(Some(target))
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::Missing {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::Missing {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.engine.max_resolution_depth == 0 {
        return Err(ConfigError::Invalid {
            field: "engine.max_resolution_depth",
            message: "must be greater than 0".into(),
        });
    }

    let cap = config.round_robin.group_size_cap;
    if cap < 2 {
        return Err(ConfigError::Invalid {
            field: "round_robin.group_size_cap",
            message: format!("must be at least 2, got {cap}"),
        });
    }

    let paths = [
        ("paths.snapshot", &config.paths.snapshot),
        ("paths.group_standings", &config.paths.group_standings),
        ("paths.overall_ranking", &config.paths.overall_ranking),
    ];
    if let Some((field, _)) = paths.iter().find(|(_, val)| val.trim().is_empty()) {
        return Err(ConfigError::Invalid {
            field: *field,
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
