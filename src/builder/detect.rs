//! External library detection.
//!
//! Each dependency is looked up in the override fragment first. Only when
//! no override exists are its search strategies run, in order, until one
//! succeeds.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::overrides::{OverrideStore, OverrideValue};
use crate::builder::probe::HostProbe;
use crate::core::dependency::{
    BlasVendor, DependencyId, DetectedDependency, Locator, SearchStrategy,
};
use crate::core::target::Language;
use crate::core::toolchain::ToolchainSet;

/// Detection results for one configuration pass.
pub type DependencyTable = BTreeMap<DependencyId, DetectedDependency>;

#[derive(Debug, Error, Diagnostic)]
pub enum DetectError {
    #[error("required dependency {id} not found (tried {attempted})")]
    #[diagnostic(
        code(berth::detect::unresolved),
        help("install it, or set {key} in berth.override.toml")
    )]
    UnresolvedDependency {
        id: DependencyId,
        attempted: String,
        key: &'static str,
    },
}

/// Resolves external libraries against the override store and the host.
pub struct FeatureDetector<'a> {
    probe: &'a dyn HostProbe,
    overrides: &'a OverrideStore,
    blas_vendor: Option<BlasVendor>,
}

impl<'a> FeatureDetector<'a> {
    pub fn new(probe: &'a dyn HostProbe, overrides: &'a OverrideStore) -> Self {
        FeatureDetector {
            probe,
            overrides,
            blas_vendor: overrides.blas_vendor(),
        }
    }

    /// Use a vendor preference when the override fragment names none.
    pub fn with_default_vendor(mut self, vendor: Option<BlasVendor>) -> Self {
        if self.blas_vendor.is_none() {
            self.blas_vendor = vendor;
        }
        self
    }

    /// Ordered search strategies for a dependency.
    pub fn strategies(&self, id: DependencyId) -> Vec<SearchStrategy> {
        let (modules, names): (&[&str], &[&str]) = match id {
            DependencyId::Blas => match self.blas_vendor {
                Some(BlasVendor::OpenBlas) => (&["openblas"], &["openblas"]),
                Some(BlasVendor::Mkl) => (&["mkl-dynamic-lp64-seq"], &["mkl_rt"]),
                Some(BlasVendor::Generic) => (&["blas"], &["blas"]),
                None => (&["openblas", "blas"], &["openblas", "blas", "mkl_rt"]),
            },
            // openblas and mkl_rt bundle LAPACK
            DependencyId::Lapack => (&["lapack"], &["lapack", "openblas", "mkl_rt"]),
            DependencyId::Fftw => (&["fftw3"], &["fftw3"]),
            DependencyId::Cuda => (&[], &["cudart"]),
        };

        let mut strategies = Vec::new();
        if !modules.is_empty() {
            strategies.push(SearchStrategy::PkgConfig {
                modules: modules.iter().map(|m| m.to_string()).collect(),
            });
        }
        strategies.push(SearchStrategy::LibraryName {
            names: names.iter().map(|n| n.to_string()).collect(),
        });
        strategies
    }

    /// Detect one dependency. Never fails; the caller applies the policy.
    pub fn detect_dependency(
        &self,
        id: DependencyId,
        toolchains: &ToolchainSet,
    ) -> DetectedDependency {
        if let Some(value) = self.overrides.dependency(id) {
            let locator = override_locator(id, value);
            tracing::info!("{} overridden: {}", id, locator);
            return DetectedDependency::overridden(id, locator);
        }

        if id == DependencyId::Cuda && !toolchains.contains(Language::Cuda) {
            tracing::debug!("Skipping {}: no CUDA toolchain", id);
            return DetectedDependency::unresolved(id);
        }

        let extra_dirs = self.extra_library_dirs(id, toolchains);
        let mut attempted = Vec::new();

        for strategy in self.strategies(id) {
            tracing::info!("Looking for {} via {}", id, strategy);
            let found = self.run_strategy(id, &strategy, &extra_dirs);
            attempted.push(strategy);

            if let Some(locator) = found {
                tracing::info!("Found {}: {}", id, locator);
                return DetectedDependency::found(id, locator, attempted);
            }
        }

        tracing::info!("{} not found", id);
        DetectedDependency::not_found(id, attempted)
    }

    /// Detect a set of dependencies.
    ///
    /// Fails on the first required dependency that cannot be resolved.
    /// Optional ones are recorded as not found and left to the assembler.
    pub fn detect(
        &self,
        ids: &BTreeSet<DependencyId>,
        toolchains: &ToolchainSet,
    ) -> Result<DependencyTable, DetectError> {
        let mut table = DependencyTable::new();

        for &id in ids {
            let detected = self.detect_dependency(id, toolchains);
            if id.is_required() && !detected.is_resolved() {
                return Err(DetectError::UnresolvedDependency {
                    id,
                    attempted: detected.attempted_summary(),
                    key: id.override_key(),
                });
            }
            table.insert(id, detected);
        }

        Ok(table)
    }

    fn run_strategy(
        &self,
        id: DependencyId,
        strategy: &SearchStrategy,
        extra_dirs: &[PathBuf],
    ) -> Option<Locator> {
        match strategy {
            SearchStrategy::PkgConfig { modules } => modules.iter().find_map(|module| {
                self.probe.pkg_config(module).map(|lib| Locator::PkgConfig {
                    module: lib.module,
                    libs: lib.libs,
                })
            }),
            SearchStrategy::LibraryName { names } => names.iter().find_map(|name| {
                let path = self.probe.find_library(name, extra_dirs)?;
                if id == DependencyId::Cuda {
                    // cudart alone is not enough: link the rest of the runtime
                    // from the same directory
                    let dir = path.parent()?;
                    let mut spec = vec![format!("-L{}", dir.display())];
                    spec.extend(id.default_link_args());
                    return Some(Locator::LinkSpec {
                        spec: spec.join(" "),
                    });
                }
                Some(Locator::File { path })
            }),
        }
    }

    /// Toolkit library directories for the CUDA runtime.
    fn extra_library_dirs(&self, id: DependencyId, toolchains: &ToolchainSet) -> Vec<PathBuf> {
        if id != DependencyId::Cuda {
            return Vec::new();
        }

        let mut roots = Vec::new();
        if let Some(nvcc) = toolchains.get(Language::Cuda) {
            let resolved = if nvcc.compiler.is_absolute() {
                Some(nvcc.compiler.clone())
            } else {
                self.probe.find_program(&nvcc.compiler.to_string_lossy())
            };
            // <toolkit>/bin/nvcc
            if let Some(root) = resolved.as_deref().and_then(|p| p.parent()?.parent()) {
                roots.push(root.to_path_buf());
            }
        }
        for var in ["CUDA_PATH", "CUDA_HOME"] {
            if let Some(root) = self.probe.env_var(var) {
                roots.push(PathBuf::from(root));
            }
        }

        roots
            .iter()
            .flat_map(|root| [root.join("lib64"), root.join("lib")])
            .collect()
    }
}

fn override_locator(id: DependencyId, value: &OverrideValue) -> Locator {
    match value {
        OverrideValue::Text(spec) => Locator::LinkSpec { spec: spec.clone() },
        OverrideValue::List(items) => Locator::LinkSpec {
            spec: items.join(";"),
        },
        // `false` is rejected when the fragment is parsed
        OverrideValue::Bool(_) => Locator::Assumed {
            args: id.default_link_args(),
        },
    }
}
