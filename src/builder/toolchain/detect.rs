//! Toolchain detection functions.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::overrides::{keys, OverrideStore, OverrideValue};
use crate::builder::probe::HostProbe;
use crate::core::target::Language;
use crate::core::toolchain::{ToolchainInfo, ToolchainOrigin, ToolchainSet};

/// Which optional toolchains to try to enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolchainRequest {
    pub fortran: bool,
    pub cuda: bool,
}

impl Default for ToolchainRequest {
    fn default() -> Self {
        ToolchainRequest {
            fortran: true,
            cuda: true,
        }
    }
}

impl ToolchainRequest {
    /// Whether detection should run for a language.
    pub fn wants(&self, language: Language) -> bool {
        match language {
            Language::C => true,
            Language::Fortran => self.fortran,
            Language::Cuda => self.cuda,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ToolchainError {
    #[error("no C compiler found (tried {tried})")]
    #[diagnostic(
        code(berth::toolchain::no_c_compiler),
        help("set CC, or C_COMPILER in berth.override.toml")
    )]
    NoCCompiler { tried: String },

    #[error("C_COMPILER = false in the override fragment, but C is required")]
    #[diagnostic(code(berth::toolchain::c_disabled))]
    CDisabled,
}

/// Detect the toolchains for one configuration pass.
pub fn detect_toolchains(
    probe: &dyn HostProbe,
    overrides: &OverrideStore,
    request: ToolchainRequest,
) -> Result<ToolchainSet, ToolchainError> {
    let mut set = ToolchainSet::new();

    for language in Language::ALL {
        if !request.wants(language) {
            tracing::info!("{} toolchain not requested", language);
            continue;
        }

        match detect_one(probe, overrides, language) {
            Some(info) => {
                tracing::info!(
                    "Found {} compiler: {} ({})",
                    language,
                    info.compiler.display(),
                    info.origin.as_str()
                );
                set.insert(info);
            }
            None if language.is_optional() => {
                tracing::info!(
                    "{} toolchain unavailable; variants that need it are disabled",
                    language
                );
            }
            None => {
                if overrides.toolchain(language) == Some(&OverrideValue::Bool(false)) {
                    return Err(ToolchainError::CDisabled);
                }
                return Err(ToolchainError::NoCCompiler {
                    tried: tried_summary(language),
                });
            }
        }
    }

    Ok(set)
}

fn detect_one(
    probe: &dyn HostProbe,
    overrides: &OverrideStore,
    language: Language,
) -> Option<ToolchainInfo> {
    let info = if let Some(value) = overrides.toolchain(language) {
        // Trusted as written: no PATH lookup, no version check
        let compiler = match value {
            OverrideValue::Text(path) => PathBuf::from(path),
            OverrideValue::List(items) => PathBuf::from(items.first()?),
            OverrideValue::Bool(true) => PathBuf::from(language.candidate_compilers()[0]),
            OverrideValue::Bool(false) => {
                tracing::info!(
                    "{} toolchain disabled by {}",
                    language,
                    language.compiler_override_key()
                );
                return None;
            }
        };
        ToolchainInfo::new(language, compiler, ToolchainOrigin::Override)
    } else if let Some(compiler) = from_environment(probe, language) {
        ToolchainInfo::new(language, compiler, ToolchainOrigin::Environment)
    } else {
        let compiler = search_compiler(probe, language)?;
        ToolchainInfo::new(language, compiler, ToolchainOrigin::Search)
    };

    if language == Language::Cuda {
        let host = overrides
            .text(keys::CUDA_HOST_COMPILER)
            .or_else(|| probe.env_var("CUDAHOSTCXX"));
        if let Some(host) = host {
            return Some(info.with_host_compiler(host));
        }
    }

    Some(info)
}

/// The compiler named by `$CC`/`$FC`/`$CUDACXX`, if it resolves to a program.
fn from_environment(probe: &dyn HostProbe, language: Language) -> Option<PathBuf> {
    let var = language.compiler_env_var();
    let value = probe.env_var(var)?;
    if value.trim().is_empty() {
        return None;
    }
    let found = probe.find_program(&value);
    if found.is_none() {
        tracing::warn!("${} names `{}`, which was not found; searching PATH", var, value);
    }
    found
}

fn search_compiler(probe: &dyn HostProbe, language: Language) -> Option<PathBuf> {
    if language == Language::Cuda {
        for var in ["CUDA_PATH", "CUDA_HOME"] {
            if let Some(root) = probe.env_var(var) {
                let nvcc = PathBuf::from(root).join("bin").join("nvcc");
                if let Some(found) = probe.find_program(&nvcc.to_string_lossy()) {
                    return Some(found);
                }
            }
        }
    }

    language
        .candidate_compilers()
        .iter()
        .find_map(|name| probe.find_program(name))
}

fn tried_summary(language: Language) -> String {
    let mut tried = vec![
        language.compiler_override_key().to_string(),
        format!("${}", language.compiler_env_var()),
    ];
    tried.extend(language.candidate_compilers().iter().map(|c| c.to_string()));
    tried.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::toolchain::CompilerFamily;
    use crate::test_support::MockProbe;
    use std::path::Path;

    fn overrides(content: &str) -> OverrideStore {
        OverrideStore::parse(content, Path::new("berth.override.toml")).unwrap()
    }

    #[test]
    fn test_detects_from_path() {
        let probe = MockProbe::new()
            .with_program("gcc", "/usr/bin/gcc")
            .with_program("gfortran", "/usr/bin/gfortran");

        let set = detect_toolchains(&probe, &OverrideStore::empty(), ToolchainRequest::default())
            .unwrap();

        assert_eq!(set.get(Language::C).unwrap().compiler, PathBuf::from("/usr/bin/gcc"));
        assert_eq!(set.get(Language::Fortran).unwrap().origin, ToolchainOrigin::Search);
        assert!(!set.contains(Language::Cuda));
    }

    #[test]
    fn test_override_skips_probing() {
        // Nothing on PATH at all: the overrides are trusted as written
        let probe = MockProbe::new();
        let set = detect_toolchains(
            &probe,
            &overrides(
                r#"
C_COMPILER = "/opt/llvm/bin/clang"
Fortran_COMPILER = true
CUDA_COMPILER = "/usr/local/cuda/bin/nvcc"
CUDA_HOST_COMPILER = "g++-12"
"#,
            ),
            ToolchainRequest::default(),
        )
        .unwrap();

        let c = set.get(Language::C).unwrap();
        assert_eq!(c.origin, ToolchainOrigin::Override);
        assert_eq!(c.family, CompilerFamily::Llvm);
        assert_eq!(set.get(Language::Fortran).unwrap().compiler, PathBuf::from("gfortran"));
        let cuda = set.get(Language::Cuda).unwrap();
        assert_eq!(cuda.host_compiler.as_deref(), Some("g++-12"));
        assert_eq!(cuda.family, CompilerFamily::Nvidia);
    }

    #[test]
    fn test_override_false_disables_toolchain() {
        let probe = MockProbe::new()
            .with_program("cc", "/usr/bin/cc")
            .with_program("nvcc", "/usr/local/cuda/bin/nvcc");

        let set = detect_toolchains(
            &probe,
            &overrides("CUDA_COMPILER = false"),
            ToolchainRequest::default(),
        )
        .unwrap();
        assert!(!set.contains(Language::Cuda));
    }

    #[test]
    fn test_environment_beats_search() {
        let probe = MockProbe::new()
            .with_env("FC", "ifx")
            .with_program("ifx", "/opt/intel/bin/ifx")
            .with_program("cc", "/usr/bin/cc")
            .with_program("gfortran", "/usr/bin/gfortran");

        let set = detect_toolchains(&probe, &OverrideStore::empty(), ToolchainRequest::default())
            .unwrap();
        let fortran = set.get(Language::Fortran).unwrap();
        assert_eq!(fortran.compiler, PathBuf::from("/opt/intel/bin/ifx"));
        assert_eq!(fortran.origin, ToolchainOrigin::Environment);
        assert_eq!(fortran.family, CompilerFamily::Intel);
    }

    #[test]
    fn test_missing_environment_compiler_falls_back_to_search() {
        let probe = MockProbe::new()
            .with_env("FC", "ifx")
            .with_program("cc", "/usr/bin/cc")
            .with_program("gfortran", "/usr/bin/gfortran");

        let set = detect_toolchains(&probe, &OverrideStore::empty(), ToolchainRequest::default())
            .unwrap();
        let fortran = set.get(Language::Fortran).unwrap();
        assert_eq!(fortran.compiler, PathBuf::from("/usr/bin/gfortran"));
        assert_eq!(fortran.origin, ToolchainOrigin::Search);
        assert_eq!(fortran.family, CompilerFamily::Gnu);
    }

    #[test]
    fn test_missing_cudacxx_leaves_cuda_unavailable() {
        let probe = MockProbe::new()
            .with_env("CUDACXX", "/usr/local/cuda-12/bin/nvcc")
            .with_program("cc", "/usr/bin/cc");

        let set = detect_toolchains(&probe, &OverrideStore::empty(), ToolchainRequest::default())
            .unwrap();
        assert!(!set.contains(Language::Cuda));
    }

    #[test]
    fn test_cuda_path_is_searched() {
        let probe = MockProbe::new()
            .with_program("cc", "/usr/bin/cc")
            .with_env("CUDA_PATH", "/opt/cuda")
            .with_program("/opt/cuda/bin/nvcc", "/opt/cuda/bin/nvcc");

        let set = detect_toolchains(&probe, &OverrideStore::empty(), ToolchainRequest::default())
            .unwrap();
        assert_eq!(
            set.get(Language::Cuda).unwrap().compiler,
            PathBuf::from("/opt/cuda/bin/nvcc")
        );
    }

    #[test]
    fn test_unrequested_toolchains_are_not_probed() {
        let probe = MockProbe::new()
            .with_program("cc", "/usr/bin/cc")
            .with_program("gfortran", "/usr/bin/gfortran")
            .with_program("nvcc", "/usr/bin/nvcc");

        let set = detect_toolchains(
            &probe,
            &OverrideStore::empty(),
            ToolchainRequest {
                fortran: false,
                cuda: false,
            },
        )
        .unwrap();
        assert_eq!(set.languages().collect::<Vec<_>>(), vec![Language::C]);
    }

    #[test]
    fn test_missing_c_compiler_is_fatal() {
        let err = detect_toolchains(
            &MockProbe::new(),
            &OverrideStore::empty(),
            ToolchainRequest::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ToolchainError::NoCCompiler { .. }));
        assert!(err.to_string().contains("$CC"));

        let err = detect_toolchains(
            &MockProbe::new(),
            &overrides("C_COMPILER = false"),
            ToolchainRequest::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ToolchainError::CDisabled));
    }
}
