//! Compiler and linker flag composition.
//!
//! Flags are composed per toolchain in a fixed stage order: base (with the
//! override fragment's `*_FLAGS` appended at its end), then
//! instrumentation, then parallelism. The base optimization level is fixed:
//! `*_FLAGS` cannot change it, only debug instrumentation re-sets it; see
//! [`FlagSet`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::overrides::OverrideStore;
use crate::core::flags::{ExclusiveOption, FlagPurpose, FlagSet, FlagSource};
use crate::core::target::Language;
use crate::core::toolchain::{CompilerFamily, ToolchainInfo, ToolchainSet};

/// One composed flag set per available toolchain.
pub type FlagTable = BTreeMap<Language, Arc<FlagSet>>;

/// Optional instrumentation compiled into every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrumentation {
    #[default]
    None,
    /// `-DTIMING`
    Timing,
    /// `-g -O0 -DDEBUG`
    Debug,
}

/// Build-wide composition switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    pub instrumentation: Instrumentation,
    pub openmp: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            instrumentation: Instrumentation::None,
            openmp: true,
        }
    }
}

/// Composes flag sets. Pure: same inputs, same output.
pub struct FlagComposer<'a> {
    overrides: &'a OverrideStore,
    options: ComposeOptions,
}

impl<'a> FlagComposer<'a> {
    pub fn new(overrides: &'a OverrideStore, options: ComposeOptions) -> Self {
        FlagComposer { overrides, options }
    }

    /// Compose a flag set for every toolchain in the set.
    pub fn compose(&self, toolchains: &ToolchainSet) -> FlagTable {
        toolchains
            .iter()
            .map(|info| (info.language, Arc::new(self.compose_for(info))))
            .collect()
    }

    /// Compose the flag set of one toolchain.
    pub fn compose_for(&self, toolchain: &ToolchainInfo) -> FlagSet {
        let mut flags = FlagSet::new(toolchain.language);

        flags.extend(
            FlagPurpose::Compile,
            FlagSource::Base,
            base_compile_flags(toolchain.language, toolchain.family)
                .iter()
                .copied(),
        );
        if let Some(host) = &toolchain.host_compiler {
            flags.push(FlagPurpose::Compile, FlagSource::Base, format!("-ccbin={}", host));
            flags.push(FlagPurpose::Link, FlagSource::Base, format!("-ccbin={}", host));
        }
        flags.push(FlagPurpose::Link, FlagSource::Base, "-shared");
        flags.extend(
            FlagPurpose::Compile,
            FlagSource::Override,
            self.override_flags(toolchain.language),
        );

        let instrumentation: &[&str] = match self.options.instrumentation {
            Instrumentation::None => &[],
            Instrumentation::Timing => &["-DTIMING"],
            Instrumentation::Debug => &["-g", "-O0", "-DDEBUG"],
        };
        flags.extend(
            FlagPurpose::Compile,
            FlagSource::Instrumentation,
            instrumentation.iter().copied(),
        );

        if self.options.openmp {
            let openmp = openmp_flag(toolchain.family);
            flags.push(FlagPurpose::Compile, FlagSource::Parallelism, openmp);
            flags.push(FlagPurpose::Link, FlagSource::Parallelism, openmp);
        }

        flags
    }

    /// `*_FLAGS` tokens, without optimization levels: the base `-O3` is fixed.
    fn override_flags(&self, language: Language) -> Vec<String> {
        self.overrides
            .flags(language)
            .into_iter()
            .filter(|token| {
                let is_opt_level = ExclusiveOption::of(token) == Some(ExclusiveOption::OptLevel);
                if is_opt_level {
                    tracing::warn!(
                        "Ignoring `{}` in {}: the optimization level is fixed",
                        token,
                        language.flags_override_key()
                    );
                }
                !is_opt_level
            })
            .collect()
    }
}

fn base_compile_flags(language: Language, family: CompilerFamily) -> &'static [&'static str] {
    match (language, family) {
        (Language::C, CompilerFamily::Intel) => &[
            "-Wall", "-pedantic", "-std=c99", "-fPIC", "-O3", "-fp-model", "fast=2",
        ],
        (Language::C, _) => &["-Wall", "-pedantic", "-std=c99", "-fPIC", "-O3", "-ffast-math"],
        (Language::Fortran, CompilerFamily::Intel) => &[
            "-warn", "all", "-stand", "f08", "-fPIC", "-O3", "-fp-model", "fast=2",
        ],
        (Language::Fortran, _) => &["-Wall", "-pedantic", "-fPIC", "-O3", "-ffast-math"],
        (Language::Cuda, _) => &[
            "-Xcompiler=-Wall", "-O3", "--use_fast_math", "-Xcompiler=-fPIC",
        ],
    }
}

fn openmp_flag(family: CompilerFamily) -> &'static str {
    match family {
        CompilerFamily::Intel => "-qopenmp",
        CompilerFamily::Nvidia => "-Xcompiler=-fopenmp",
        CompilerFamily::Gnu | CompilerFamily::Llvm => "-fopenmp",
    }
}
