//! Composed compiler and linker flags.
//!
//! A [`FlagSet`] only ever grows. Exclusive options such as the
//! optimization level can be set again by a later stage; the earlier entry
//! stays in the history but is superseded and left out of the effective
//! flags.

use std::fmt;

use serde::Serialize;

use crate::core::target::Language;

/// Whether a flag goes to the compile or the link step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagPurpose {
    Compile,
    Link,
}

/// Composition stage a flag came from. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    /// Fixed warnings, optimization level, math mode
    Base,
    /// `*_FLAGS` from the override fragment (end of the base stage)
    Override,
    /// Timing or debug instrumentation
    Instrumentation,
    /// OpenMP
    Parallelism,
}

impl fmt::Display for FlagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlagSource::Base => "base",
            FlagSource::Override => "override",
            FlagSource::Instrumentation => "instrumentation",
            FlagSource::Parallelism => "parallelism",
        };
        write!(f, "{}", s)
    }
}

/// Options of which only one value may be in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusiveOption {
    OptLevel,
    Standard,
}

impl ExclusiveOption {
    /// Classify a token, if it sets an exclusive option.
    pub fn of(token: &str) -> Option<Self> {
        if token.starts_with("-O") {
            Some(ExclusiveOption::OptLevel)
        } else if token.starts_with("-std=") {
            Some(ExclusiveOption::Standard)
        } else {
            None
        }
    }
}

/// One flag with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagEntry {
    pub token: String,
    pub purpose: FlagPurpose,
    pub source: FlagSource,
}

/// Ordered flags for one toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSet {
    language: Language,
    entries: Vec<FlagEntry>,
}

impl FlagSet {
    pub fn new(language: Language) -> Self {
        FlagSet {
            language,
            entries: Vec::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Append a flag.
    pub fn push(&mut self, purpose: FlagPurpose, source: FlagSource, token: impl Into<String>) {
        let token = token.into();
        if let Some(option) = ExclusiveOption::of(&token) {
            if let Some(prev) = self.effective_exclusive(purpose, option) {
                tracing::debug!(
                    "{} {:?} flag `{}` ({}) superseded by `{}` ({})",
                    self.language,
                    purpose,
                    prev.token,
                    prev.source,
                    token,
                    source
                );
            }
        }
        self.entries.push(FlagEntry {
            token,
            purpose,
            source,
        });
    }

    /// Append several flags from the same stage.
    pub fn extend<I, S>(&mut self, purpose: FlagPurpose, source: FlagSource, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.push(purpose, source, token);
        }
    }

    /// Every entry ever appended, in order.
    pub fn entries(&self) -> &[FlagEntry] {
        &self.entries
    }

    /// Whether the entry at `index` has been superseded by a later one.
    pub fn is_superseded(&self, index: usize) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        let Some(option) = ExclusiveOption::of(&entry.token) else {
            return false;
        };
        self.entries[index + 1..]
            .iter()
            .any(|later| later.purpose == entry.purpose && ExclusiveOption::of(&later.token) == Some(option))
    }

    /// Effective compile flags.
    pub fn compile_flags(&self) -> Vec<String> {
        self.effective(FlagPurpose::Compile)
    }

    /// Effective link flags.
    pub fn link_flags(&self) -> Vec<String> {
        self.effective(FlagPurpose::Link)
    }

    /// Effective flags for one purpose: every entry in order, minus the
    /// superseded ones. Repeated tokens are kept, since a token may be the
    /// keyword of a two-token option (`-gencode <arch>`, `-fp-model <mode>`).
    pub fn effective(&self, purpose: FlagPurpose) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, e)| e.purpose == purpose && !self.is_superseded(*i))
            .map(|(_, e)| e.token.clone())
            .collect()
    }

    fn effective_exclusive(&self, purpose: FlagPurpose, option: ExclusiveOption) -> Option<&FlagEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.purpose == purpose && ExclusiveOption::of(&e.token) == Some(option))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_exclusive_wins() {
        let mut flags = FlagSet::new(Language::C);
        flags.extend(FlagPurpose::Compile, FlagSource::Base, ["-Wall", "-O3"]);
        flags.extend(FlagPurpose::Compile, FlagSource::Instrumentation, ["-g", "-O0"]);

        assert_eq!(flags.compile_flags(), vec!["-Wall", "-g", "-O0"]);
        // History is kept
        assert_eq!(flags.entries().len(), 4);
        assert!(flags.is_superseded(1));
        assert!(!flags.is_superseded(3));
    }

    #[test]
    fn test_exclusive_is_per_purpose() {
        let mut flags = FlagSet::new(Language::C);
        flags.push(FlagPurpose::Compile, FlagSource::Base, "-O3");
        flags.push(FlagPurpose::Link, FlagSource::Base, "-O1");

        assert_eq!(flags.compile_flags(), vec!["-O3"]);
        assert_eq!(flags.link_flags(), vec!["-O1"]);
        assert!(!flags.is_superseded(0));
    }

    #[test]
    fn test_repeated_tokens_are_kept() {
        let mut flags = FlagSet::new(Language::Fortran);
        flags.push(FlagPurpose::Compile, FlagSource::Override, "-fopenmp");
        flags.push(FlagPurpose::Compile, FlagSource::Parallelism, "-fopenmp");
        assert_eq!(flags.compile_flags(), vec!["-fopenmp", "-fopenmp"]);
    }

    #[test]
    fn test_two_token_options_survive_repetition() {
        let mut flags = FlagSet::new(Language::Cuda);
        flags.extend(
            FlagPurpose::Compile,
            FlagSource::Override,
            [
                "-gencode",
                "arch=compute_70,code=sm_70",
                "-gencode",
                "arch=compute_80,code=sm_80",
            ],
        );

        let effective = flags.compile_flags();
        assert_eq!(effective.iter().filter(|t| *t == "-gencode").count(), 2);
        assert_eq!(
            effective,
            vec![
                "-gencode",
                "arch=compute_70,code=sm_70",
                "-gencode",
                "arch=compute_80,code=sm_80"
            ]
        );
    }

    #[test]
    fn test_standard_is_exclusive() {
        assert_eq!(ExclusiveOption::of("-std=c99"), Some(ExclusiveOption::Standard));
        assert_eq!(ExclusiveOption::of("-O2"), Some(ExclusiveOption::OptLevel));
        assert_eq!(ExclusiveOption::of("-Wall"), None);
    }
}
