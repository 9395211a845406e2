//! Implementation of the configuration pass.
//!
//! One pass runs every component once, in order, and hands back immutable
//! results. The first fatal error aborts the pass; nothing partial is
//! returned.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::builder::assemble::{AssembleError, Assembler, GraphView, TargetGraph};
use crate::builder::compose::{ComposeOptions, FlagComposer, FlagTable};
use crate::builder::detect::{DependencyTable, DetectError, FeatureDetector};
use crate::builder::overrides::{OverrideError, OverrideStore, OVERRIDE_FILE_NAME};
use crate::builder::probe::HostProbe;
use crate::builder::select::{select_variants, SelectError, VariantPolicy, VariantSelection, VariantStatus};
use crate::builder::toolchain::{detect_toolchains, ToolchainError, ToolchainRequest};
use crate::core::dependency::{BlasVendor, DependencyId, DetectedDependency};
use crate::core::manifest::Manifest;
use crate::core::toolchain::ToolchainSet;
use crate::util::config::Config;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Options for one configuration pass.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    /// Override fragment named on the command line. When unset the
    /// project's `berth.override.toml` is used if it exists.
    pub overrides: Option<PathBuf>,

    /// Which optional toolchains to probe
    pub toolchains: ToolchainRequest,

    /// Instrumentation and OpenMP
    pub compose: ComposeOptions,

    /// Per-variant requests
    pub policy: VariantPolicy,

    /// Output directory, relative to the project root; beats the manifest
    pub output_dir: Option<PathBuf>,

    /// BLAS vendor preference when the override fragment names none
    pub blas_vendor: Option<BlasVendor>,
}

impl ConfigureOptions {
    /// Options from the merged configuration files.
    pub fn from_config(config: &Config) -> Self {
        let defaults = ComposeOptions::default();
        ConfigureOptions {
            overrides: None,
            toolchains: ToolchainRequest {
                fortran: config.toolchains.fortran.unwrap_or(true),
                cuda: config.toolchains.cuda.unwrap_or(true),
            },
            compose: ComposeOptions {
                instrumentation: config
                    .build
                    .instrumentation
                    .unwrap_or(defaults.instrumentation),
                openmp: config.build.openmp.unwrap_or(defaults.openmp),
            },
            policy: VariantPolicy::from(config.variants.clone()),
            output_dir: config.build.output_dir.clone(),
            blas_vendor: config.dependencies.blas_vendor,
        }
    }
}

/// Fatal error of a configuration pass.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigureError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Override(#[from] OverrideError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Assemble(#[from] AssembleError),
}

impl ConfigureError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());

        if let Some(code) = MietteDiagnostic::code(self) {
            diag = diag.with_context(format!("code: {}", code));
        }
        if let ConfigureError::Override(
            OverrideError::Parse { path, .. }
            | OverrideError::InvalidValue { path, .. }
            | OverrideError::Io { path, .. },
        ) = self
        {
            diag = diag.with_location(path.clone());
        }
        if let Some(help) = MietteDiagnostic::help(self) {
            diag = diag.with_suggestion(help.to_string());
        }
        if matches!(
            self,
            ConfigureError::Detect(_) | ConfigureError::Assemble(AssembleError::UnresolvedDependency { .. })
        ) {
            diag = diag.with_suggestion(suggestions::SUPPLY_OVERRIDE);
        }

        diag
    }
}

/// Immutable result of a configuration pass.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub root: PathBuf,
    pub overrides: OverrideStore,
    pub toolchains: ToolchainSet,
    pub dependencies: DependencyTable,
    pub flags: FlagTable,
    pub variants: VariantSelection,
    pub graph: TargetGraph,
}

impl Configuration {
    /// Serializable summary of the pass.
    pub fn report(&self) -> ConfigurationReport {
        ConfigurationReport {
            overrides: self.overrides.source().map(Path::to_path_buf),
            toolchains: self.toolchains.clone(),
            dependencies: self.dependencies.clone(),
            variants: self.variants.statuses.clone(),
            graph: self.graph.emit(),
        }
    }

    /// Pretty JSON of [`Self::report`].
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.report())
    }
}

/// What `berth configure --emit` writes.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<PathBuf>,
    pub toolchains: ToolchainSet,
    pub dependencies: BTreeMap<DependencyId, DetectedDependency>,
    pub variants: Vec<VariantStatus>,
    pub graph: GraphView,
}

/// Run one configuration pass over a project.
pub fn configure(
    manifest: &Manifest,
    root: &Path,
    opts: &ConfigureOptions,
    probe: &dyn HostProbe,
) -> Result<Configuration, ConfigureError> {
    let overrides = match &opts.overrides {
        Some(path) => OverrideStore::load_optional(path, true)?,
        None => OverrideStore::load_optional(&root.join(OVERRIDE_FILE_NAME), false)?,
    };

    let toolchains = detect_toolchains(probe, &overrides, opts.toolchains)?;

    let dependencies = FeatureDetector::new(probe, &overrides)
        .with_default_vendor(opts.blas_vendor)
        .detect(&manifest.referenced_dependencies(), &toolchains)?;

    let flags = FlagComposer::new(&overrides, opts.compose).compose(&toolchains);

    let variants = select_variants(&manifest.variants, &toolchains, &opts.policy)?;

    let output_dir = match &opts.output_dir {
        Some(dir) => root.join(dir),
        None => manifest.output_dir(root),
    };
    let graph = Assembler::new(root, output_dir, &flags, &dependencies)
        .assemble(&manifest.targets, &variants.active)?;

    Ok(Configuration {
        root: root.to_path_buf(),
        overrides,
        toolchains,
        dependencies,
        flags,
        variants,
        graph,
    })
}
