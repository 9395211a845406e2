//! Berth.toml manifest parsing and schema.
//!
//! The manifest declares the base targets, which are always built, and the
//! backend variants, each of which owns the targets it contributes:
//!
//! ```toml
//! [project]
//! name = "nao"
//! output-dir = "lib"
//!
//! [[target]]
//! name = "np_helper"
//! sources = ["np_helper/*.c"]
//! dependencies = ["blas"]
//!
//! [[variant]]
//! name = "gpu"
//! requires = ["cuda"]
//!
//! [[variant.target]]
//! name = "gpu_sparsetools"
//! sources = ["gpu/*.cu"]
//! dependencies = ["cuda", "blas"]
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dependency::DependencyId;
use crate::core::target::TargetDecl;
use crate::core::variant::BackendVariant;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "Berth.toml";

/// `[project]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectMetadata {
    pub name: String,

    /// Output directory shared by every library, relative to the project
    /// root
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// The parsed Berth.toml manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub project: ProjectMetadata,

    /// Base targets, present in every build
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetDecl>,

    /// Optional, toolchain-gated subtrees
    #[serde(default, rename = "variant")]
    pub variants: Vec<BackendVariant>,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("invalid manifest: {}", path.display()))
    }

    /// Parse and validate manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest =
            toml::from_str(content).with_context(|| format!("failed to parse {}", MANIFEST_NAME))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check names and source lists.
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            bail!("project name must not be empty");
        }

        let mut variant_names = HashSet::new();
        for variant in &self.variants {
            if !variant_names.insert(variant.name.as_str()) {
                bail!("variant `{}` is declared more than once", variant.name);
            }
        }

        let mut target_names = HashSet::new();
        for target in self.all_targets() {
            if !target_names.insert(target.name.as_str()) {
                bail!("target `{}` is declared more than once", target.name);
            }
            if target.sources.is_empty() {
                bail!("target `{}` has no sources", target.name);
            }
        }

        Ok(())
    }

    /// Base targets followed by every variant's targets.
    pub fn all_targets(&self) -> impl Iterator<Item = &TargetDecl> {
        self.targets
            .iter()
            .chain(self.variants.iter().flat_map(|v| v.targets.iter()))
    }

    pub fn variant(&self, name: &str) -> Option<&BackendVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Dependencies the detector has to resolve: every required library
    /// plus anything a declared target links.
    pub fn referenced_dependencies(&self) -> BTreeSet<DependencyId> {
        DependencyId::ALL
            .into_iter()
            .filter(|id| id.is_required())
            .chain(self.all_targets().flat_map(|t| t.dependencies.iter().copied()))
            .collect()
    }

    /// Output directory resolved against the project root.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.project.output_dir)
    }

    /// The default layout of the native library tree.
    pub fn default_layout(name: &str) -> Self {
        // The template is covered by tests, so parsing cannot fail here.
        Self::parse(&default_manifest(name)).unwrap_or_else(|_| Manifest {
            project: ProjectMetadata {
                name: name.to_string(),
                output_dir: default_output_dir(),
            },
            targets: Vec::new(),
            variants: Vec::new(),
        })
    }
}

/// Manifest template written by `berth init`.
pub fn default_manifest(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"
output-dir = "."

# Linear-algebra helpers, always built.
[[target]]
name = "np_helper"
sources = [
    "np_helper/np_helper.c",
    "np_helper/transpose.c",
    "np_helper/pack_tril.c",
    "np_helper/npdot.c",
]
dependencies = ["blas"]

[[variant]]
name = "sparse"
description = "Sparse-matrix tools"
requires = []

[[variant.target]]
name = "sparsetools"
sources = [
    "sparsetools/csr_mat.c",
    "sparsetools/csr_spmv.c",
    "sparsetools/dense_sparse.c",
]
dependencies = ["blas"]

[[variant]]
name = "fortran"
description = "Numerical atomic orbital routines"
requires = ["fortran"]

[[variant.target]]
name = "nao"
sources = [
    "nao/m_precision.F90",
    "nao/m_fft.F90",
    "nao/m_sph_bes.F90",
    "nao/m_prod_basis.F90",
    "nao/m_dens_libnao.F90",
]
dependencies = ["lapack", "blas", "fftw"]

[[variant]]
name = "gpu"
description = "GPU sparse kernels"
requires = ["cuda"]

[[variant.target]]
name = "gpu_sparsetools"
sources = [
    "gpu/sparse_gpu.cu",
    "gpu/spmv_gpu.cu",
    "gpu/iter_div_eigenenergy.cu",
]
dependencies = ["cuda", "blas"]
"#
    )
}

/// Find the manifest starting at `start` and searching upward.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_NAME))
        .find(|candidate| candidate.is_file())
}
