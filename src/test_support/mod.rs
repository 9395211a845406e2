//! Test utilities and mocks for berth unit tests.
//!
//! [`MockProbe`] stands in for the host so toolchain and library detection
//! can be tested without touching PATH, pkg-config or the library
//! directories.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::test_support::MockProbe;
//!
//! let probe = MockProbe::new()
//!     .with_program("gcc", "/usr/bin/gcc")
//!     .with_pkg_config("lapack", &["-llapack"]);
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::builder::probe::{HostProbe, PkgConfigLibrary};

// Re-export fixtures for convenience
pub use fixtures::*;

/// In-memory host for detection tests.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    env: HashMap<String, String>,
    programs: HashMap<String, PathBuf>,
    pkg_config: HashMap<String, Vec<String>>,
    /// Libraries found regardless of the search directories
    libraries: HashMap<String, PathBuf>,
    /// Libraries only found when their directory is searched
    library_dirs: HashMap<String, Vec<PathBuf>>,
}

impl MockProbe {
    pub fn new() -> Self {
        MockProbe::default()
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Make `name` resolve to `path`.
    pub fn with_program(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.programs.insert(name.to_string(), path.into());
        self
    }

    pub fn with_pkg_config(mut self, module: &str, libs: &[&str]) -> Self {
        self.pkg_config.insert(
            module.to_string(),
            libs.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Make `lib<name>` visible in the default library directories.
    pub fn with_library(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.libraries.insert(name.to_string(), path.into());
        self
    }

    /// Make `lib<name>.so` visible only when `dir` is searched explicitly.
    pub fn with_library_in(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.library_dirs
            .entry(name.to_string())
            .or_default()
            .push(dir.into());
        self
    }
}

impl HostProbe for MockProbe {
    fn env_var(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.programs.get(name).cloned()
    }

    fn pkg_config(&self, module: &str) -> Option<PkgConfigLibrary> {
        self.pkg_config.get(module).map(|libs| PkgConfigLibrary {
            module: module.to_string(),
            libs: libs.clone(),
        })
    }

    fn find_library(&self, name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
        if let Some(dirs) = self.library_dirs.get(name) {
            if let Some(dir) = extra_dirs.iter().find(|d| dirs.contains(d)) {
                return Some(dir.join(format!("lib{}.so", name)));
            }
        }
        self.libraries.get(name).cloned()
    }
}

/// A probe for a typical Linux workstation: gcc + gfortran, OpenBLAS
/// (which bundles LAPACK) and FFTW, no CUDA.
pub fn workstation_probe() -> MockProbe {
    MockProbe::new()
        .with_program("cc", "/usr/bin/cc")
        .with_program("gcc", "/usr/bin/gcc")
        .with_program("gfortran", "/usr/bin/gfortran")
        .with_pkg_config("openblas", &["-lopenblas"])
        .with_library("openblas", "/usr/lib/x86_64-linux-gnu/libopenblas.so")
        .with_library("fftw3", "/usr/lib/x86_64-linux-gnu/libfftw3.so")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_mock_probe_library_dirs() {
        let probe = MockProbe::new().with_library_in("cudart", "/opt/cuda/lib64");
        assert!(probe.find_library("cudart", &[]).is_none());
        assert_eq!(
            probe.find_library("cudart", &[PathBuf::from("/opt/cuda/lib64")]),
            Some(Path::new("/opt/cuda/lib64/libcudart.so").to_path_buf())
        );
    }

    #[test]
    fn test_workstation_probe() {
        let probe = workstation_probe();
        assert!(probe.find_program("gfortran").is_some());
        assert!(probe.find_program("nvcc").is_none());
        assert!(probe.pkg_config("openblas").is_some());
    }
}
