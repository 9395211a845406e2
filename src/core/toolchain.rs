//! Detected language toolchains.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::target::Language;

/// Where a toolchain's compiler came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainOrigin {
    /// Pinned by the override fragment (not verified)
    Override,
    /// Named by an environment variable such as `FC`
    Environment,
    /// Found by searching PATH
    Search,
}

impl ToolchainOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainOrigin::Override => "override",
            ToolchainOrigin::Environment => "environment",
            ToolchainOrigin::Search => "search",
        }
    }
}

/// Compiler family, which decides the spelling of some flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    /// gcc, gfortran, cc
    Gnu,
    /// clang, flang
    Llvm,
    /// icc, ifort, ifx
    Intel,
    /// nvcc
    Nvidia,
}

impl CompilerFamily {
    /// Infer the family from the compiler binary name.
    ///
    /// Unknown names default to GNU, which is what `cc` usually is.
    pub fn from_compiler(compiler: &Path) -> Self {
        let name = compiler
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();

        if name.contains("nvcc") {
            CompilerFamily::Nvidia
        } else if name.contains("clang") || name.contains("flang") {
            CompilerFamily::Llvm
        } else if name.starts_with("ifx")
            || name.starts_with("ifort")
            || name.starts_with("icx")
            || name.starts_with("icc")
        {
            CompilerFamily::Intel
        } else {
            CompilerFamily::Gnu
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gnu => "gnu",
            CompilerFamily::Llvm => "llvm",
            CompilerFamily::Intel => "intel",
            CompilerFamily::Nvidia => "nvidia",
        }
    }
}

/// An enabled toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainInfo {
    /// Language this toolchain compiles
    pub language: Language,
    /// Compiler executable
    pub compiler: PathBuf,
    /// Compiler family
    pub family: CompilerFamily,
    /// How the compiler was found
    pub origin: ToolchainOrigin,
    /// Host compiler passed through to nvcc
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_compiler: Option<String>,
}

impl ToolchainInfo {
    pub fn new(language: Language, compiler: impl Into<PathBuf>, origin: ToolchainOrigin) -> Self {
        let compiler = compiler.into();
        let family = CompilerFamily::from_compiler(&compiler);
        ToolchainInfo {
            language,
            compiler,
            family,
            origin,
            host_compiler: None,
        }
    }

    pub fn with_host_compiler(mut self, host: impl Into<String>) -> Self {
        self.host_compiler = Some(host.into());
        self
    }
}

/// The set of available toolchains for one configuration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolchainSet {
    toolchains: BTreeMap<Language, ToolchainInfo>,
}

impl ToolchainSet {
    pub fn new() -> Self {
        ToolchainSet::default()
    }

    /// Add a toolchain, replacing any previous one for the same language.
    pub fn insert(&mut self, info: ToolchainInfo) {
        self.toolchains.insert(info.language, info);
    }

    pub fn contains(&self, language: Language) -> bool {
        self.toolchains.contains_key(&language)
    }

    pub fn get(&self, language: Language) -> Option<&ToolchainInfo> {
        self.toolchains.get(&language)
    }

    /// Available languages, in a stable order.
    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.toolchains.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolchainInfo> {
        self.toolchains.values()
    }

    pub fn len(&self) -> usize {
        self.toolchains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toolchains.is_empty()
    }
}

impl FromIterator<ToolchainInfo> for ToolchainSet {
    fn from_iter<I: IntoIterator<Item = ToolchainInfo>>(iter: I) -> Self {
        let mut set = ToolchainSet::new();
        for info in iter {
            set.insert(info);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_compiler() {
        assert_eq!(CompilerFamily::from_compiler(Path::new("/usr/bin/gfortran")), CompilerFamily::Gnu);
        assert_eq!(CompilerFamily::from_compiler(Path::new("cc")), CompilerFamily::Gnu);
        assert_eq!(CompilerFamily::from_compiler(Path::new("clang-17")), CompilerFamily::Llvm);
        assert_eq!(CompilerFamily::from_compiler(Path::new("flang-new")), CompilerFamily::Llvm);
        assert_eq!(CompilerFamily::from_compiler(Path::new("/opt/intel/bin/ifx")), CompilerFamily::Intel);
        assert_eq!(
            CompilerFamily::from_compiler(Path::new("/usr/local/cuda/bin/nvcc")),
            CompilerFamily::Nvidia
        );
    }

    #[test]
    fn test_toolchain_set_is_ordered() {
        let set: ToolchainSet = [
            ToolchainInfo::new(Language::Cuda, "nvcc", ToolchainOrigin::Search),
            ToolchainInfo::new(Language::C, "cc", ToolchainOrigin::Search),
        ]
        .into_iter()
        .collect();

        let langs: Vec<_> = set.languages().collect();
        assert_eq!(langs, vec![Language::C, Language::Cuda]);
        assert!(!set.contains(Language::Fortran));
    }
}
