//! Source languages and their toolchain conventions.
//!
//! Each language maps 1:1 onto a toolchain: C is the baseline, Fortran and
//! CUDA are optional and gate the variants that need them.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source language of a compiled unit (and the toolchain that compiles it).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C language (default)
    #[default]
    C,
    /// Fortran (free or fixed form)
    #[serde(alias = "f90", alias = "fc")]
    Fortran,
    /// CUDA C/C++ compiled by nvcc
    #[serde(alias = "cu", alias = "gpu")]
    Cuda,
}

impl Language {
    /// All languages in composition order.
    pub const ALL: [Language; 3] = [Language::C, Language::Fortran, Language::Cuda];

    /// Get the language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Fortran => "fortran",
            Language::Cuda => "cuda",
        }
    }

    /// Whether the build can proceed without this toolchain.
    pub fn is_optional(&self) -> bool {
        !matches!(self, Language::C)
    }

    /// Infer the language from a source file extension.
    ///
    /// Headers and unknown extensions return `None`.
    pub fn from_path(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "c" => Some(Language::C),
            "f" | "F" | "for" | "f77" | "f90" | "F90" | "f95" | "F95" | "f03" | "f08" => {
                Some(Language::Fortran)
            }
            "cu" => Some(Language::Cuda),
            _ => None,
        }
    }

    /// Environment variable that names this language's compiler.
    pub fn compiler_env_var(&self) -> &'static str {
        match self {
            Language::C => "CC",
            Language::Fortran => "FC",
            Language::Cuda => "CUDACXX",
        }
    }

    /// Compiler executables searched on PATH, in priority order.
    pub fn candidate_compilers(&self) -> &'static [&'static str] {
        match self {
            Language::C => &["cc", "gcc", "clang"],
            Language::Fortran => &["gfortran", "ifx", "ifort", "flang"],
            Language::Cuda => &["nvcc"],
        }
    }

    /// Override key that pins this language's compiler.
    pub fn compiler_override_key(&self) -> &'static str {
        match self {
            Language::C => "C_COMPILER",
            Language::Fortran => "Fortran_COMPILER",
            Language::Cuda => "CUDA_COMPILER",
        }
    }

    /// Override key carrying extra compile flags for this language.
    pub fn flags_override_key(&self) -> &'static str {
        match self {
            Language::C => "C_FLAGS",
            Language::Fortran => "Fortran_FLAGS",
            Language::Cuda => "CUDA_FLAGS",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = LanguageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(Language::C),
            "fortran" | "f90" | "fc" => Ok(Language::Fortran),
            "cuda" | "cu" | "gpu" => Ok(Language::Cuda),
            _ => Err(LanguageParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid language string.
#[derive(Debug, Clone)]
pub struct LanguageParseError(pub String);

impl std::fmt::Display for LanguageParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid language '{}', valid values: c, fortran, cuda",
            self.0
        )
    }
}

impl std::error::Error for LanguageParseError {}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Language::C => "C",
            Language::Fortran => "Fortran",
            Language::Cuda => "CUDA",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("np_helper/transpose.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("nao/m_sparse.F90")), Some(Language::Fortran));
        assert_eq!(Language::from_path(Path::new("nao/legacy.f")), Some(Language::Fortran));
        assert_eq!(Language::from_path(Path::new("gpu/spmv.cu")), Some(Language::Cuda));
        assert_eq!(Language::from_path(Path::new("np_helper/np_helper.h")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("C".parse::<Language>().unwrap(), Language::C);
        assert_eq!("fortran".parse::<Language>().unwrap(), Language::Fortran);
        assert_eq!("gpu".parse::<Language>().unwrap(), Language::Cuda);
        assert!("rust".parse::<Language>().is_err());
    }

    #[test]
    fn test_only_c_is_mandatory() {
        assert!(!Language::C.is_optional());
        assert!(Language::Fortran.is_optional());
        assert!(Language::Cuda.is_optional());
    }
}
