//! Host environment probing.
//!
//! Detection never touches the host directly; it goes through
//! [`HostProbe`] so the toolchain and library detectors can be driven by a
//! mock in tests.

use std::path::{Path, PathBuf};

use crate::util::process::{find_executable, ProcessBuilder};

/// A library described by pkg-config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgConfigLibrary {
    pub module: String,
    /// Output of `pkg-config --libs`
    pub libs: Vec<String>,
}

/// Read-only view of the host.
pub trait HostProbe: Send + Sync {
    /// Read an environment variable.
    fn env_var(&self, key: &str) -> Option<String>;

    /// Resolve an executable on PATH (or an absolute path that exists).
    fn find_program(&self, name: &str) -> Option<PathBuf>;

    /// Query pkg-config for a module.
    fn pkg_config(&self, module: &str) -> Option<PkgConfigLibrary>;

    /// Look for `lib<name>` in the library search directories plus
    /// `extra_dirs`.
    fn find_library(&self, name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf>;
}

/// Directories searched after `LIBRARY_PATH` and `LD_LIBRARY_PATH`.
const SYSTEM_LIBRARY_DIRS: &[&str] = &[
    "/usr/local/lib",
    "/usr/local/lib64",
    "/usr/lib",
    "/usr/lib64",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    "/opt/homebrew/lib",
    "/opt/local/lib",
];

/// Probe backed by the real environment.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    pkg_config: Option<PathBuf>,
}

impl SystemProbe {
    pub fn new() -> Self {
        SystemProbe {
            pkg_config: find_executable("pkg-config").or_else(|| find_executable("pkgconf")),
        }
    }

    fn library_dirs(&self, extra_dirs: &[PathBuf]) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = extra_dirs.to_vec();
        for var in ["LIBRARY_PATH", "LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH"] {
            if let Some(value) = std::env::var_os(var) {
                dirs.extend(std::env::split_paths(&value));
            }
        }
        dirs.extend(SYSTEM_LIBRARY_DIRS.iter().map(PathBuf::from));
        dirs
    }
}

/// Candidate file names for `lib<name>`, shared objects first.
fn library_file_names(name: &str) -> Vec<String> {
    vec![
        format!("lib{}.so", name),
        format!("lib{}.dylib", name),
        format!("lib{}.a", name),
    ]
}

/// Find a library file in a directory, accepting versioned shared objects
/// (`libfftw3.so.3`) when the unversioned link is missing.
fn library_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    for file in library_file_names(name) {
        let candidate = dir.join(&file);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let pattern = dir.join(format!("lib{}.so.*", name));
    let mut versioned: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .ok()?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    versioned.sort();
    versioned.into_iter().next()
}

impl HostProbe for SystemProbe {
    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }
        find_executable(name)
    }

    fn pkg_config(&self, module: &str) -> Option<PkgConfigLibrary> {
        let pkg_config = self.pkg_config.as_ref()?;
        let output = ProcessBuilder::new(pkg_config)
            .args(["--libs", module])
            .exec()
            .ok()?;

        if !output.status.success() {
            tracing::debug!("pkg-config has no module `{}`", module);
            return None;
        }

        let libs: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .map(String::from)
            .collect();

        Some(PkgConfigLibrary {
            module: module.to_string(),
            libs,
        })
    }

    fn find_library(&self, name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
        self.library_dirs(extra_dirs)
            .iter()
            .filter(|dir| dir.is_dir())
            .find_map(|dir| library_in_dir(dir, name))
    }
}
