//! `berth configure` command

use anyhow::{Context, Result};

use crate::cli::ConfigureCmdArgs;
use crate::commands::{configure_project, GRAPH_FILE};
use berth::builder::select::InactiveReason;
use berth::ops::configure::Configuration;
use berth::util::diagnostic::{emit, Diagnostic};
use berth::util::fs::{remove_stale_file, write_string};
use berth::util::GlobalContext;

pub fn execute(args: ConfigureCmdArgs, ctx: &GlobalContext) -> Result<()> {
    let emit_path = match &args.emit {
        Some(path) => ctx.cwd().join(path),
        None => ctx.project_root()?.join(GRAPH_FILE),
    };
    remove_stale_file(&emit_path)?;

    let session = configure_project(ctx, &args.configure)?;
    let config = &session.configuration;

    let json = config
        .to_json()
        .context("failed to serialize the configuration")?;

    write_string(&emit_path, &json)?;
    tracing::debug!("Wrote target graph to {}", emit_path.display());

    if args.json {
        println!("{}", json);
    } else {
        print_summary(config);
        report_inactive_variants(config, ctx.color());
        eprintln!("     Wrote {}", emit_path.display());
    }

    Ok(())
}

fn print_summary(config: &Configuration) {
    println!("Toolchains:");
    for tc in config.toolchains.iter() {
        print!(
            "  {:<8} {} ({}, {})",
            tc.language.to_string(),
            tc.compiler.display(),
            tc.family.as_str(),
            tc.origin.as_str()
        );
        match &tc.host_compiler {
            Some(host) => println!(" host: {}", host),
            None => println!(),
        }
    }

    println!("Dependencies:");
    for dep in config.dependencies.values() {
        match &dep.locator {
            Some(locator) => println!("  {:<8} {} ({})", dep.id.to_string(), locator, dep.state.as_str()),
            None => println!(
                "  {:<8} {} (tried: {})",
                dep.id.to_string(),
                dep.state.as_str(),
                dep.attempted_summary()
            ),
        }
    }

    println!("Variants:");
    for status in &config.variants.statuses {
        match &status.reason {
            None => println!("  {:<8} active", status.name),
            Some(reason) => println!("  {:<8} inactive: {}", status.name, reason),
        }
    }

    println!("Targets:");
    for target in config.graph.targets() {
        println!(
            "  {} -> {}",
            target.name,
            target.output_path().display()
        );
    }
}

/// Unavailable optional toolchains are not fatal, but worth a warning.
fn report_inactive_variants(config: &Configuration, color: bool) {
    for status in config.variants.inactive() {
        let diag = match &status.reason {
            Some(InactiveReason::MissingToolchains { languages }) => {
                let mut diag = Diagnostic::warning(format!(
                    "variant `{}` is inactive",
                    status.name
                ));
                for lang in languages {
                    diag = diag
                        .with_context(format!("no {} toolchain was found", lang))
                        .with_suggestion(format!(
                            "Set {} in berth.override.toml, or pass --require-variant {} to make this fatal",
                            lang.compiler_override_key(),
                            status.name
                        ));
                }
                diag
            }
            Some(InactiveReason::Disabled) | None => {
                Diagnostic::note(format!("variant `{}` is disabled", status.name))
            }
        };
        emit(&diag, color);
    }
}
