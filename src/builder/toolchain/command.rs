//! Compile and link command generation.

use std::path::{Path, PathBuf};

use crate::core::flags::FlagSet;
use crate::core::target::Language;
use crate::core::toolchain::{CompilerFamily, ToolchainInfo};

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "nvcc")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }
}

/// Generate the command compiling one source unit to an object file.
///
/// Fortran module files are written to and read from `object_dir`, so
/// targets built in parallel never see each other's `.mod` files.
pub fn compile_command(
    toolchain: &ToolchainInfo,
    flags: &FlagSet,
    source: &Path,
    output: &Path,
    object_dir: &Path,
) -> CommandSpec {
    let mut cmd = CommandSpec::new(&toolchain.compiler).args(flags.compile_flags());

    if toolchain.language == Language::Fortran {
        cmd = match toolchain.family {
            CompilerFamily::Intel => cmd
                .arg("-module")
                .arg(object_dir.display().to_string()),
            _ => cmd.arg(format!("-J{}", object_dir.display())),
        };
        cmd = cmd.arg(format!("-I{}", object_dir.display()));
    }

    cmd.arg("-c")
        .arg(source.display().to_string())
        .arg("-o")
        .arg(output.display().to_string())
}

/// Generate the command linking objects into a shared library.
pub fn link_command(
    toolchain: &ToolchainInfo,
    flags: &FlagSet,
    objects: &[PathBuf],
    output: &Path,
    libs: &[String],
    rpath_dirs: &[PathBuf],
) -> CommandSpec {
    let mut cmd = CommandSpec::new(&toolchain.compiler)
        .args(flags.link_flags())
        .arg("-o")
        .arg(output.display().to_string());

    for obj in objects {
        cmd = cmd.arg(obj.display().to_string());
    }

    cmd = cmd.args(libs.iter().cloned());

    for dir in rpath_dirs {
        cmd = match toolchain.family {
            CompilerFamily::Nvidia => cmd.arg(format!("-Xlinker=-rpath,{}", dir.display())),
            _ => cmd.arg(format!("-Wl,-rpath,{}", dir.display())),
        };
    }

    cmd
}
