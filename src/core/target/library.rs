//! Shared-library targets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::dependency::{DependencyId, DetectedDependency};
use crate::core::flags::FlagSet;

use super::Language;

/// Kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Shared library (.so, .dylib)
    #[default]
    #[serde(alias = "sharedlib", alias = "cdylib")]
    Shared,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Shared => "shared",
        }
    }
}

/// A target as written in the manifest, before assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetDecl {
    /// Library name, without `lib` prefix or extension
    pub name: String,

    #[serde(default)]
    pub kind: TargetKind,

    /// Source files or glob patterns, relative to the project root
    pub sources: Vec<String>,

    /// External libraries linked by this target
    #[serde(default)]
    pub dependencies: Vec<DependencyId>,
}

impl TargetDecl {
    pub fn new(name: impl Into<String>) -> Self {
        TargetDecl {
            name: name.into(),
            kind: TargetKind::Shared,
            sources: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = DependencyId>) -> Self {
        self.dependencies.extend(deps);
        self
    }
}

/// One compiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub language: Language,
}

/// A fully assembled, buildable shared library.
#[derive(Debug, Clone)]
pub struct LibraryTarget {
    pub name: String,
    pub kind: TargetKind,
    pub sources: Vec<SourceUnit>,
    /// Resolved dependencies, in declaration order
    pub dependencies: Vec<DetectedDependency>,
    /// One flag set per language used by the sources
    pub flags: Vec<Arc<FlagSet>>,
    /// Shared output directory of the build
    pub output_dir: PathBuf,
    /// Variant that contributed this target, `None` for base targets
    pub variant: Option<String>,
}

impl LibraryTarget {
    /// Languages used by this target's sources, in a stable order.
    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<_> = self.sources.iter().map(|s| s.language).collect();
        langs.sort();
        langs.dedup();
        langs
    }

    /// Flag set for one of the target's languages.
    pub fn flags_for(&self, language: Language) -> Option<&FlagSet> {
        self.flags
            .iter()
            .find(|f| f.language() == language)
            .map(|f| f.as_ref())
    }

    /// Toolchain that drives the final link.
    ///
    /// Fortran units need the Fortran runtime, CUDA units need nvcc's
    /// device linking, so those win over plain C.
    pub fn link_language(&self) -> Language {
        let langs = self.languages();
        if langs.contains(&Language::Fortran) {
            Language::Fortran
        } else if langs.contains(&Language::Cuda) {
            Language::Cuda
        } else {
            Language::C
        }
    }

    /// File name of the produced library.
    pub fn file_name(&self) -> String {
        let ext = if cfg!(target_os = "macos") {
            "dylib"
        } else {
            "so"
        };
        format!("lib{}.{}", self.name, ext)
    }

    /// Full path of the produced library.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.file_name())
    }

    /// Object file directory for this target.
    pub fn object_dir(&self) -> PathBuf {
        object_dir(&self.output_dir, &self.name)
    }

    /// Linker arguments contributed by dependencies.
    pub fn dependency_link_args(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .flat_map(|d| d.link_args())
            .collect()
    }

    /// Runtime search paths for the dependencies.
    pub fn rpath_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .dependencies
            .iter()
            .filter_map(|d| d.locator.as_ref())
            .flat_map(|l| l.rpath_dirs())
            .collect();
        dirs.dedup();
        dirs
    }
}

/// Object directory for a target under an output root.
pub fn object_dir(output_dir: &Path, target: &str) -> PathBuf {
    output_dir.join(".berth").join("obj").join(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::Locator;

    fn target(sources: &[(&str, Language)]) -> LibraryTarget {
        LibraryTarget {
            name: "nao".to_string(),
            kind: TargetKind::Shared,
            sources: sources
                .iter()
                .map(|(p, l)| SourceUnit {
                    path: PathBuf::from(p),
                    language: *l,
                })
                .collect(),
            dependencies: vec![DetectedDependency::overridden(
                DependencyId::Fftw,
                Locator::File {
                    path: PathBuf::from("/opt/fftw/lib/libfftw3.so"),
                },
            )],
            flags: Vec::new(),
            output_dir: PathBuf::from("/proj/lib"),
            variant: Some("fortran".to_string()),
        }
    }

    #[test]
    fn test_link_language() {
        assert_eq!(target(&[("a.c", Language::C)]).link_language(), Language::C);
        assert_eq!(
            target(&[("a.c", Language::C), ("b.F90", Language::Fortran)]).link_language(),
            Language::Fortran
        );
        assert_eq!(
            target(&[("a.c", Language::C), ("k.cu", Language::Cuda)]).link_language(),
            Language::Cuda
        );
    }

    #[test]
    fn test_output_location() {
        let t = target(&[("a.c", Language::C)]);
        assert!(t.output_path().starts_with("/proj/lib"));
        assert!(t.file_name().starts_with("libnao."));
        assert_eq!(t.object_dir(), PathBuf::from("/proj/lib/.berth/obj/nao"));
    }

    #[test]
    fn test_dependency_args() {
        let t = target(&[("a.F90", Language::Fortran)]);
        assert_eq!(t.dependency_link_args(), vec!["/opt/fftw/lib/libfftw3.so"]);
        assert_eq!(t.rpath_dirs(), vec![PathBuf::from("/opt/fftw/lib")]);
    }

    #[test]
    fn test_decl_deserialize() {
        let decl: TargetDecl = toml::from_str(
            r#"
name = "np_helper"
sources = ["np_helper/*.c"]
dependencies = ["blas"]
"#,
        )
        .unwrap();
        assert_eq!(decl.kind, TargetKind::Shared);
        assert_eq!(decl.dependencies, vec![DependencyId::Blas]);
    }
}
