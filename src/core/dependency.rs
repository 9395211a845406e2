//! External native libraries and their detection state.
//!
//! Targets never depend on each other, only on the libraries declared here,
//! which keeps the target graph acyclic.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An external library a target may link against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyId {
    /// BLAS family (OpenBLAS, MKL, reference BLAS)
    Blas,
    /// LAPACK
    Lapack,
    /// FFTW3
    Fftw,
    /// CUDA runtime libraries shipped with the toolkit
    #[serde(alias = "cudart")]
    Cuda,
}

impl DependencyId {
    pub const ALL: [DependencyId; 4] = [
        DependencyId::Blas,
        DependencyId::Lapack,
        DependencyId::Fftw,
        DependencyId::Cuda,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyId::Blas => "blas",
            DependencyId::Lapack => "lapack",
            DependencyId::Fftw => "fftw",
            DependencyId::Cuda => "cuda",
        }
    }

    /// Required libraries abort the configuration pass as soon as
    /// detection fails. The others only fail it when an active target
    /// links them.
    pub fn is_required(&self) -> bool {
        matches!(self, DependencyId::Blas | DependencyId::Lapack)
    }

    /// Override key whose presence suppresses detection.
    pub fn override_key(&self) -> &'static str {
        match self {
            DependencyId::Blas => "BLAS_LIBRARIES",
            DependencyId::Lapack => "LAPACK_LIBRARIES",
            DependencyId::Fftw => "FFTW_LIBRARIES",
            DependencyId::Cuda => "CUDA_LIBRARIES",
        }
    }

    /// Link flags assumed when an override only says "available".
    pub fn default_link_args(&self) -> Vec<String> {
        let libs: &[&str] = match self {
            DependencyId::Blas => &["blas"],
            DependencyId::Lapack => &["lapack"],
            DependencyId::Fftw => &["fftw3"],
            DependencyId::Cuda => &["cudart", "cublas", "cusparse"],
        };
        libs.iter().map(|l| format!("-l{}", l)).collect()
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependencyId::Blas => "BLAS",
            DependencyId::Lapack => "LAPACK",
            DependencyId::Fftw => "FFTW",
            DependencyId::Cuda => "CUDA runtime",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for DependencyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blas" => Ok(DependencyId::Blas),
            "lapack" => Ok(DependencyId::Lapack),
            "fftw" | "fftw3" => Ok(DependencyId::Fftw),
            "cuda" | "cudart" => Ok(DependencyId::Cuda),
            _ => Err(format!(
                "unknown dependency '{}', valid values: blas, lapack, fftw, cuda",
                s
            )),
        }
    }
}

/// BLAS implementation preference. Only reorders the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlasVendor {
    OpenBlas,
    Mkl,
    Generic,
}

impl std::str::FromStr for BlasVendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openblas" => Ok(BlasVendor::OpenBlas),
            "mkl" | "intel" => Ok(BlasVendor::Mkl),
            "generic" | "reference" | "netlib" => Ok(BlasVendor::Generic),
            _ => Err(format!(
                "unknown BLAS vendor '{}', valid values: openblas, mkl, generic",
                s
            )),
        }
    }
}

/// One way of looking for a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Ask pkg-config for one of these modules
    PkgConfig { modules: Vec<String> },
    /// Look for `lib<name>` files in the library search directories
    LibraryName { names: Vec<String> },
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::PkgConfig { modules } => {
                write!(f, "pkg-config module(s) {}", modules.join(", "))
            }
            SearchStrategy::LibraryName { names } => {
                let files: Vec<_> = names.iter().map(|n| format!("lib{}", n)).collect();
                write!(f, "library name(s) {}", files.join(", "))
            }
        }
    }
}

/// Where a resolved library lives, as the linker sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Locator {
    /// Linker spec taken verbatim from an override
    LinkSpec { spec: String },
    /// Override that only declared the library available
    Assumed { args: Vec<String> },
    /// pkg-config result
    PkgConfig { module: String, libs: Vec<String> },
    /// A library file found on disk
    File { path: PathBuf },
}

impl Locator {
    /// Arguments to hand to the linker.
    pub fn link_args(&self) -> Vec<String> {
        match self {
            Locator::LinkSpec { spec } => spec
                .split(|c: char| c == ';' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Locator::Assumed { args } => args.clone(),
            Locator::PkgConfig { libs, .. } => libs.clone(),
            Locator::File { path } => vec![path.display().to_string()],
        }
    }

    /// Directories to embed as runtime search paths.
    pub fn rpath_dirs(&self) -> Vec<PathBuf> {
        match self {
            Locator::File { path } => path.parent().map(PathBuf::from).into_iter().collect(),
            _ => self
                .link_args()
                .iter()
                .filter_map(|arg| {
                    if let Some(dir) = arg.strip_prefix("-L") {
                        return Some(PathBuf::from(dir));
                    }
                    let path = std::path::Path::new(arg);
                    let shared = arg.ends_with(".dylib") || arg.contains(".so");
                    (path.is_absolute() && shared)
                        .then(|| path.parent().map(PathBuf::from))
                        .flatten()
                })
                .collect(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::LinkSpec { spec } => write!(f, "{}", spec),
            Locator::Assumed { args } => write!(f, "{}", args.join(" ")),
            Locator::PkgConfig { module, libs } => write!(f, "{} ({})", libs.join(" "), module),
            Locator::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Detection state of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionState {
    /// Never searched for (e.g. its toolchain is absent)
    Unresolved,
    Found,
    NotFound,
    /// Supplied by the override fragment; detection skipped
    Overridden,
}

impl ResolutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Unresolved => "unresolved",
            ResolutionState::Found => "found",
            ResolutionState::NotFound => "not-found",
            ResolutionState::Overridden => "overridden",
        }
    }
}

/// The outcome of detecting one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedDependency {
    pub id: DependencyId,
    pub state: ResolutionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<Locator>,
    /// Strategies tried, in order. Empty for overridden dependencies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempted: Vec<SearchStrategy>,
}

impl DetectedDependency {
    pub fn unresolved(id: DependencyId) -> Self {
        DetectedDependency {
            id,
            state: ResolutionState::Unresolved,
            locator: None,
            attempted: Vec::new(),
        }
    }

    pub fn overridden(id: DependencyId, locator: Locator) -> Self {
        DetectedDependency {
            id,
            state: ResolutionState::Overridden,
            locator: Some(locator),
            attempted: Vec::new(),
        }
    }

    pub fn found(id: DependencyId, locator: Locator, attempted: Vec<SearchStrategy>) -> Self {
        DetectedDependency {
            id,
            state: ResolutionState::Found,
            locator: Some(locator),
            attempted,
        }
    }

    pub fn not_found(id: DependencyId, attempted: Vec<SearchStrategy>) -> Self {
        DetectedDependency {
            id,
            state: ResolutionState::NotFound,
            locator: None,
            attempted,
        }
    }

    /// Found or overridden.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self.state,
            ResolutionState::Found | ResolutionState::Overridden
        ) && self.locator.is_some()
    }

    /// Linker arguments, empty when unresolved.
    pub fn link_args(&self) -> Vec<String> {
        self.locator
            .as_ref()
            .map(Locator::link_args)
            .unwrap_or_default()
    }

    /// Human-readable list of the strategies tried.
    pub fn attempted_summary(&self) -> String {
        if self.attempted.is_empty() {
            return "no search performed".to_string();
        }
        self.attempted
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
