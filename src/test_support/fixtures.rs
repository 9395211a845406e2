//! Test fixtures for common test scenarios.
//!
//! Pre-built project trees for configuration and build tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::builder::overrides::OVERRIDE_FILE_NAME;
use crate::core::manifest::{default_manifest, Manifest, MANIFEST_NAME};
use crate::core::target::Language;

/// Fixture for a complete project structure.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project name.
    pub name: String,
    /// Berth.toml content.
    pub manifest: String,
    /// Source files (path relative to project root -> content).
    pub sources: BTreeMap<PathBuf, String>,
    /// berth.override.toml content, if any.
    pub overrides: Option<String>,
}

impl ProjectFixture {
    /// Create a new empty project fixture.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: String::new(),
            sources: BTreeMap::new(),
            overrides: None,
        }
    }

    /// The default layout written by `berth init`, with a stub for every
    /// source it declares.
    pub fn default_layout(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = default_manifest(&name);
        let parsed = Manifest::default_layout(&name);

        let mut fixture = ProjectFixture::new(name).with_manifest(manifest);
        for target in parsed.all_targets() {
            for source in &target.sources {
                let path = PathBuf::from(source);
                let content = sources::stub(&path);
                fixture = fixture.with_source(path, content);
            }
        }
        fixture
    }

    /// A single C library.
    pub fn c_library(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = format!(
            r#"[project]
name = "{name}"
output-dir = "lib"

[[target]]
name = "{name}"
sources = ["src/*.c"]
dependencies = ["blas"]
"#
        );
        ProjectFixture::new(name.clone())
            .with_manifest(manifest)
            .with_source("src/lib.c", sources::c_unit(&name))
    }

    /// Set the manifest content.
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Add a source file.
    pub fn with_source(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.sources.insert(path.into(), content.into());
        self
    }

    /// Add an override fragment.
    pub fn with_overrides(mut self, content: impl Into<String>) -> Self {
        self.overrides = Some(content.into());
        self
    }

    /// Write this fixture to a real directory.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let project_path = base_path.join(&self.name);
        std::fs::create_dir_all(&project_path)?;

        std::fs::write(project_path.join(MANIFEST_NAME), &self.manifest)?;

        if let Some(overrides) = &self.overrides {
            std::fs::write(project_path.join(OVERRIDE_FILE_NAME), overrides)?;
        }

        for (rel_path, content) in &self.sources {
            let full_path = project_path.join(rel_path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full_path, content)?;
        }

        Ok(project_path)
    }
}

/// Common override fragments.
pub mod overrides {
    /// Every library pinned, Fortran on, CUDA forced off.
    pub fn fortran_no_cuda(fftw: &str) -> String {
        format!(
            r#"BLAS_LIBRARIES = "-lopenblas"
LAPACK_LIBRARIES = "-lopenblas"
FFTW_LIBRARIES = "{fftw}"
C_COMPILER = "/usr/bin/gcc"
Fortran_COMPILER = "/usr/bin/gfortran"
CUDA_COMPILER = false
"#
        )
    }
}

/// Common source file templates.
pub mod sources {
    use super::*;

    /// A C unit defining one function.
    pub fn c_unit(name: &str) -> String {
        format!(
            r#"#include <stddef.h>

int {name}_ready(void)
{{
        return 1;
}}
"#
        )
    }

    /// A Fortran module.
    pub fn fortran_module(name: &str) -> String {
        format!(
            r#"module {name}
  implicit none
contains
  integer function {name}_ready()
    {name}_ready = 1
  end function
end module {name}
"#
        )
    }

    /// A CUDA kernel.
    pub fn cuda_kernel(name: &str) -> String {
        format!(
            r#"__global__ void {name}_kernel(double *x, int n)
{{
        int i = blockIdx.x * blockDim.x + threadIdx.x;
        if (i < n) x[i] *= 2.0;
}}
"#
        )
    }

    /// Stub content matching a source's language.
    pub fn stub(path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().replace('-', "_"))
            .unwrap_or_else(|| "unit".to_string());
        match Language::from_path(path) {
            Some(Language::Fortran) => fortran_module(&stem),
            Some(Language::Cuda) => cuda_kernel(&stem),
            _ => c_unit(&stem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout_fixture_writes_every_source() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::default_layout("nao")
            .with_overrides("CUDA_COMPILER = false")
            .write_to(tmp.path())
            .unwrap();

        assert!(root.join(MANIFEST_NAME).is_file());
        assert!(root.join(OVERRIDE_FILE_NAME).is_file());
        assert!(root.join("nao/m_fft.F90").is_file());
        assert!(root.join("gpu/spmv_gpu.cu").is_file());
        let content = std::fs::read_to_string(root.join("nao/m_fft.F90")).unwrap();
        assert!(content.starts_with("module m_fft"));
    }
}
