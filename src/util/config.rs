//! Configuration file support for omake.
//!
//! omake reads two optional configuration files:
//! - Global: `<config dir>/omake/config.toml` - User-wide defaults
//! - Project: `<source dir>/.omake/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::builder::executor::DEFAULT_POLL_INTERVAL;
use crate::builder::progress::DEFAULT_BAR_WIDTH;

/// Default build description file name.
pub const DEFAULT_DESCRIPTION_FILE: &str = "omakefile.txt";

/// Default output directory, relative to the source directory.
pub const DEFAULT_OUTPUT_DIR: &str = "out";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("", "", "omake"));

/// omake configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildSettings,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildSettings {
    /// Build tool used unless the description names one
    pub make_tool: Option<String>,

    /// Build description file name
    pub description: Option<String>,

    /// Output directory
    pub output_dir: Option<PathBuf>,

    /// Progress poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Progress bar width in cells
    pub bar_width: Option<usize>,

    /// Prepend host default flags on the POSIX backend
    #[serde(default)]
    pub platform_flags: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.make_tool.is_some() {
            self.build.make_tool = other.build.make_tool;
        }
        if other.build.description.is_some() {
            self.build.description = other.build.description;
        }
        if other.build.output_dir.is_some() {
            self.build.output_dir = other.build.output_dir;
        }
        if other.build.poll_interval_ms.is_some() {
            self.build.poll_interval_ms = other.build.poll_interval_ms;
        }
        if other.build.bar_width.is_some() {
            self.build.bar_width = other.build.bar_width;
        }
        if other.build.platform_flags {
            self.build.platform_flags = true;
        }
    }

    pub fn description_file(&self) -> &str {
        self.build
            .description
            .as_deref()
            .unwrap_or(DEFAULT_DESCRIPTION_FILE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.build
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Poll interval, never zero.
    pub fn poll_interval(&self) -> Duration {
        match self.build.poll_interval_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn bar_width(&self) -> usize {
        self.build.bar_width.unwrap_or(DEFAULT_BAR_WIDTH)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.omake/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the project config path (.omake/config.toml).
pub fn project_config_path(source_dir: &Path) -> PathBuf {
    source_dir.join(".omake").join("config.toml")
}
