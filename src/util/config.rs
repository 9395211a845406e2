//! Configuration file support for berth.
//!
//! berth reads two configuration files:
//! - Global: `~/.berth/config.toml` - User-wide defaults
//! - Project: `.berth/config.toml` - Project-specific settings
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.
//!
//! Library locations do not live here: they belong in the override
//! fragment (`berth.override.toml`), which short-circuits detection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::compose::Instrumentation;
use crate::core::dependency::BlasVendor;
use crate::core::variant::VariantRequest;

/// berth configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Which optional toolchains to try
    pub toolchains: ToolchainsConfig,

    /// Per-variant requests (`auto`, `require`, `off`)
    pub variants: BTreeMap<String, VariantRequest>,

    /// Dependency search preferences
    pub dependencies: DependenciesConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Compile with OpenMP (default: true)
    pub openmp: Option<bool>,

    /// Instrumentation flags (none, timing, debug)
    pub instrumentation: Option<Instrumentation>,

    /// Override the manifest's output directory
    pub output_dir: Option<PathBuf>,

    /// Default number of parallel jobs (None = auto-detect)
    pub jobs: Option<usize>,
}

/// Optional toolchain switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainsConfig {
    /// Try to enable Fortran (default: true)
    pub fortran: Option<bool>,

    /// Try to enable CUDA (default: true)
    pub cuda: Option<bool>,
}

/// Dependency search preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependenciesConfig {
    /// Preferred BLAS implementation
    pub blas_vendor: Option<BlasVendor>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, or defaults if the file doesn't exist.
    ///
    /// A file that exists but fails to parse is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.openmp.is_some() {
            self.build.openmp = other.build.openmp;
        }
        if other.build.instrumentation.is_some() {
            self.build.instrumentation = other.build.instrumentation;
        }
        if other.build.output_dir.is_some() {
            self.build.output_dir = other.build.output_dir;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }

        if other.toolchains.fortran.is_some() {
            self.toolchains.fortran = other.toolchains.fortran;
        }
        if other.toolchains.cuda.is_some() {
            self.toolchains.cuda = other.toolchains.cuda;
        }

        // Variant requests merge per key
        self.variants.extend(other.variants);

        if other.dependencies.blas_vendor.is_some() {
            self.dependencies.blas_vendor = other.dependencies.blas_vendor;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.berth/config.toml)
/// 2. Global config (~/.berth/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path)?);
    }
    config.merge(Config::load_or_default(project_path)?);

    Ok(config)
}

/// Get the global berth config directory (~/.berth).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".berth"))
}

/// Get the global config path (~/.berth/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.berth/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".berth").join("config.toml")
}
