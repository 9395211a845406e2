//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// berth - configure and build C, Fortran and CUDA shared libraries
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a Berth.toml with the default library layout
    Init(InitArgs),

    /// Run a configuration pass and write the target graph
    Configure(ConfigureCmdArgs),

    /// Show the composed compile/link flags with provenance
    Flags(FlagsArgs),

    /// Show the assembled targets and the libraries they link
    Graph(GraphArgs),

    /// Configure, then compile and link every target
    Build(BuildArgs),
}

/// Options shared by every command that runs a configuration pass.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigureArgs {
    /// Override fragment to use instead of ./berth.override.toml
    #[arg(long, value_name = "PATH")]
    pub overrides: Option<PathBuf>,

    /// Do not probe for a Fortran compiler
    #[arg(long)]
    pub no_fortran: bool,

    /// Do not probe for a CUDA compiler
    #[arg(long)]
    pub no_cuda: bool,

    /// Add timing instrumentation (-DTIMING)
    #[arg(long, conflicts_with = "debug_flags")]
    pub timing: bool,

    /// Add debug instrumentation (-g -O0 -DDEBUG)
    #[arg(long)]
    pub debug_flags: bool,

    /// Compile without OpenMP
    #[arg(long)]
    pub no_openmp: bool,

    /// Fail unless this variant is active
    #[arg(long, value_name = "NAME")]
    pub require_variant: Vec<String>,

    /// Never activate this variant
    #[arg(long, value_name = "NAME")]
    pub disable_variant: Vec<String>,

    /// Output directory for the libraries, relative to the project root
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Preferred BLAS implementation (openblas, mkl, generic)
    #[arg(long, value_name = "VENDOR")]
    pub blas_vendor: Option<String>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Overwrite an existing Berth.toml
    #[arg(long)]
    pub force: bool,

    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigureCmdArgs {
    /// Where to write the target graph (default: .berth/target-graph.json)
    #[arg(long, value_name = "PATH")]
    pub emit: Option<PathBuf>,

    /// Print the configuration as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Only show this language (C, Fortran, CUDA)
    pub lang: Option<String>,

    /// Only show compile flags
    #[arg(long, conflicts_with = "link")]
    pub compile: bool,

    /// Only show link flags
    #[arg(long)]
    pub link: bool,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Print Graphviz DOT
    #[arg(long)]
    pub dot: bool,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Specific targets to build
    #[arg(long)]
    pub target: Vec<String>,

    #[command(flatten)]
    pub configure: ConfigureArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_shared_configure_flags() {
        let cli = Cli::parse_from([
            "berth",
            "graph",
            "--no-cuda",
            "--require-variant",
            "fortran",
            "--disable-variant",
            "gpu",
            "--debug-flags",
        ]);
        match cli.command {
            Commands::Graph(args) => {
                assert!(args.configure.no_cuda);
                assert!(args.configure.debug_flags);
                assert_eq!(args.configure.require_variant, vec!["fortran"]);
                assert_eq!(args.configure.disable_variant, vec!["gpu"]);
            }
            _ => panic!("expected graph"),
        }
    }

    #[test]
    fn test_timing_conflicts_with_debug() {
        let res = Cli::try_parse_from(["berth", "configure", "--timing", "--debug-flags"]);
        assert!(res.is_err());
    }
}
