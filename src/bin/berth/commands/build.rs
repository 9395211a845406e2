//! `berth build` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::configure_project;
use berth::ops::build::{build, BuildOptions};
use berth::util::diagnostic::suggestions;
use berth::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: &GlobalContext) -> Result<()> {
    let session = configure_project(ctx, &args.configure)?;

    // Jobs: CLI > config > None (auto-detect)
    let jobs = args.jobs.or(session.config.build.jobs);

    let opts = BuildOptions {
        targets: args.target,
        jobs,
        verbose: ctx.is_verbose(),
    };

    let report = build(&session.configuration, &opts)?;

    for artifact in &report.artifacts {
        eprintln!(
            "     Library {} -> {}",
            artifact.target,
            artifact.path.display()
        );
    }

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("error: failed to build `{}`\n{}", failure.target, failure.message);
        }
        if !ctx.is_verbose() {
            eprintln!("{}", suggestions::BUILD_FAILED);
        }
        bail!("{} target(s) failed to build", report.failures.len());
    }

    Ok(())
}
