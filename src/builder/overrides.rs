//! The override fragment: user-supplied values that preempt detection.
//!
//! `berth.override.toml` is a flat TOML table. Every key present is taken
//! as the source of truth and is never re-verified:
//!
//! ```toml
//! LAPACK_LIBRARIES = "-L/opt/openblas/lib;-lopenblas"
//! FFTW_LIBRARIES = "/opt/fftw/lib/libfftw3.so"
//! Fortran_COMPILER = "/usr/bin/gfortran"
//! CUDA_COMPILER = false
//! Fortran_FLAGS = "-fallow-argument-mismatch"
//! CUDA_HOST_COMPILER = "g++-12"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::dependency::{BlasVendor, DependencyId};
use crate::core::target::Language;

/// Default fragment file name, looked up in the project root.
pub const OVERRIDE_FILE_NAME: &str = "berth.override.toml";

/// Recognized keys.
pub mod keys {
    pub const LAPACK_LIBRARIES: &str = "LAPACK_LIBRARIES";
    pub const BLAS_LIBRARIES: &str = "BLAS_LIBRARIES";
    pub const FFTW_LIBRARIES: &str = "FFTW_LIBRARIES";
    pub const CUDA_LIBRARIES: &str = "CUDA_LIBRARIES";
    pub const C_COMPILER: &str = "C_COMPILER";
    pub const FORTRAN_COMPILER: &str = "Fortran_COMPILER";
    pub const CUDA_COMPILER: &str = "CUDA_COMPILER";
    pub const C_FLAGS: &str = "C_FLAGS";
    pub const FORTRAN_FLAGS: &str = "Fortran_FLAGS";
    pub const CUDA_FLAGS: &str = "CUDA_FLAGS";
    pub const CUDA_HOST_COMPILER: &str = "CUDA_HOST_COMPILER";
    pub const BLAS_VENDOR: &str = "BLAS_VENDOR";

    pub const ALL: [&str; 12] = [
        LAPACK_LIBRARIES,
        BLAS_LIBRARIES,
        FFTW_LIBRARIES,
        CUDA_LIBRARIES,
        C_COMPILER,
        FORTRAN_COMPILER,
        CUDA_COMPILER,
        C_FLAGS,
        FORTRAN_FLAGS,
        CUDA_FLAGS,
        CUDA_HOST_COMPILER,
        BLAS_VENDOR,
    ];
}

/// Errors raised while loading the fragment. All of them are fatal.
#[derive(Debug, Error, Diagnostic)]
pub enum OverrideError {
    #[error("failed to read override fragment {path}")]
    #[diagnostic(code(berth::overrides::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed override fragment {path}")]
    #[diagnostic(
        code(berth::overrides::parse),
        help("the fragment must be a flat TOML table of KEY = value entries")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("override `{key}` in {path} has an unsupported value: {reason}")]
    #[diagnostic(code(berth::overrides::value))]
    InvalidValue {
        path: PathBuf,
        key: String,
        reason: String,
    },
}

/// A value supplied by the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideValue {
    /// A path, linker spec or flag string
    Text(String),
    /// A list of tokens
    List(Vec<String>),
    /// Declared available (`true`) or unavailable (`false`)
    Bool(bool),
}

impl OverrideValue {
    /// The value as whitespace/semicolon separated tokens.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            OverrideValue::Text(s) => s
                .split(|c: char| c == ';' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            OverrideValue::List(items) => items.clone(),
            OverrideValue::Bool(_) => Vec::new(),
        }
    }

    /// The value as one string, exactly as written. Lists join with `;`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            OverrideValue::Text(s) => Some(s.clone()),
            OverrideValue::List(items) => Some(items.join(";")),
            OverrideValue::Bool(_) => None,
        }
    }
}

/// Loaded override fragment. Immutable once constructed.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    entries: BTreeMap<String, OverrideValue>,
    source: Option<PathBuf>,
}

impl OverrideStore {
    /// A store with no overrides; every lookup misses.
    pub fn empty() -> Self {
        OverrideStore::default()
    }

    /// Load a fragment file.
    pub fn load(path: &Path) -> Result<Self, OverrideError> {
        let content = std::fs::read_to_string(path).map_err(|source| OverrideError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Load zero or one fragment.
    ///
    /// A missing file is not an error unless the user named it explicitly.
    pub fn load_optional(path: &Path, explicit: bool) -> Result<Self, OverrideError> {
        if !explicit && !path.exists() {
            tracing::debug!("No override fragment at {}", path.display());
            return Ok(Self::empty());
        }
        Self::load(path)
    }

    /// Parse fragment content. `path` is only used in messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, OverrideError> {
        let table: toml::Table = toml::from_str(content).map_err(|source| OverrideError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let invalid = |key: &str, reason: &str| OverrideError::InvalidValue {
            path: path.to_path_buf(),
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let mut entries = BTreeMap::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => OverrideValue::Text(s),
                toml::Value::Boolean(b) => OverrideValue::Bool(b),
                toml::Value::Array(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            toml::Value::String(s) => list.push(s),
                            _ => return Err(invalid(&key, "arrays may only contain strings")),
                        }
                    }
                    OverrideValue::List(list)
                }
                _ => return Err(invalid(&key, "expected a string, boolean or array of strings")),
            };

            if DependencyId::ALL.iter().any(|id| id.override_key() == key)
                && value == OverrideValue::Bool(false)
            {
                return Err(invalid(
                    &key,
                    "library overrides must name a linker spec or be `true`",
                ));
            }
            if Language::ALL.iter().any(|l| l.compiler_override_key() == key) {
                match &value {
                    OverrideValue::List(items) if items.is_empty() => {
                        return Err(invalid(&key, "compiler list is empty"));
                    }
                    OverrideValue::Text(path) if path.trim().is_empty() => {
                        return Err(invalid(&key, "compiler path is empty"));
                    }
                    _ => {}
                }
            }
            if key == keys::BLAS_VENDOR {
                let vendor = value
                    .as_text()
                    .ok_or_else(|| invalid(&key, "expected a vendor name"))?;
                vendor
                    .parse::<BlasVendor>()
                    .map_err(|e| invalid(&key, &e))?;
            }
            if !keys::ALL.contains(&key.as_str()) {
                tracing::warn!(
                    "Unrecognized override `{}` in {} (kept, but nothing reads it)",
                    key,
                    path.display()
                );
            }

            entries.insert(key, value);
        }

        tracing::info!(
            "Loaded {} override(s) from {}",
            entries.len(),
            path.display()
        );

        Ok(OverrideStore {
            entries,
            source: Some(path.to_path_buf()),
        })
    }

    /// Look up a raw entry.
    pub fn lookup(&self, key: &str) -> Option<&OverrideValue> {
        self.entries.get(key)
    }

    /// Look up a textual entry.
    pub fn text(&self, key: &str) -> Option<String> {
        self.lookup(key).and_then(OverrideValue::as_text)
    }

    /// Look up an entry as flag tokens.
    pub fn tokens(&self, key: &str) -> Vec<String> {
        self.lookup(key).map(OverrideValue::tokens).unwrap_or_default()
    }

    /// Override for a dependency, if any.
    pub fn dependency(&self, id: DependencyId) -> Option<&OverrideValue> {
        self.lookup(id.override_key())
    }

    /// Override for a toolchain's compiler, if any.
    pub fn toolchain(&self, language: Language) -> Option<&OverrideValue> {
        self.lookup(language.compiler_override_key())
    }

    /// Extra compile flags for a toolchain.
    pub fn flags(&self, language: Language) -> Vec<String> {
        self.tokens(language.flags_override_key())
    }

    /// BLAS vendor preference, validated at load time.
    pub fn blas_vendor(&self) -> Option<BlasVendor> {
        self.text(keys::BLAS_VENDOR).and_then(|v| v.parse().ok())
    }

    /// The file the overrides came from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
