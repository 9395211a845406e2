//! Command implementations

pub mod build;
pub mod configure;
pub mod flags;
pub mod graph;
pub mod init;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use crate::cli::ConfigureArgs;
use berth::builder::compose::Instrumentation;
use berth::builder::probe::SystemProbe;
use berth::core::dependency::BlasVendor;
use berth::core::variant::VariantRequest;
use berth::core::Manifest;
use berth::ops::configure::{configure, Configuration, ConfigureOptions};
use berth::util::config::Config;
use berth::util::diagnostic::emit;
use berth::util::fs::remove_stale_file;
use berth::util::GlobalContext;

/// Target graph written by `berth configure`, relative to the project root.
pub const GRAPH_FILE: &str = ".berth/target-graph.json";

/// A configured project.
pub struct Session {
    pub root: PathBuf,
    pub config: Config,
    pub configuration: Configuration,
}

/// Layer command-line switches over the options from the config files.
pub fn configure_options(args: &ConfigureArgs, config: &Config, ctx: &GlobalContext) -> Result<ConfigureOptions> {
    let mut opts = ConfigureOptions::from_config(config);

    opts.overrides = args.overrides.as_ref().map(|p| ctx.cwd().join(p));

    if args.no_fortran {
        opts.toolchains.fortran = false;
    }
    if args.no_cuda {
        opts.toolchains.cuda = false;
    }

    if args.timing {
        opts.compose.instrumentation = Instrumentation::Timing;
    } else if args.debug_flags {
        opts.compose.instrumentation = Instrumentation::Debug;
    }
    if args.no_openmp {
        opts.compose.openmp = false;
    }

    for name in &args.require_variant {
        opts.policy.set(name.clone(), VariantRequest::Require);
    }
    // Disabling beats requiring when both name a variant
    for name in &args.disable_variant {
        opts.policy.set(name.clone(), VariantRequest::Off);
    }

    if let Some(dir) = &args.output_dir {
        opts.output_dir = Some(dir.clone());
    }

    if let Some(vendor) = &args.blas_vendor {
        opts.blas_vendor = Some(
            vendor
                .parse::<BlasVendor>()
                .map_err(|e| anyhow!("invalid --blas-vendor: {}", e))?,
        );
    }

    Ok(opts)
}

/// Find the project, load its config and run one configuration pass.
pub fn configure_project(ctx: &GlobalContext, args: &ConfigureArgs) -> Result<Session> {
    let manifest_path = ctx.find_manifest()?;
    let root = ctx.project_root()?;
    let manifest = Manifest::load(&manifest_path)?;
    let config = ctx.load_config(&root)?;

    let opts = configure_options(args, &config, ctx)?;

    match configure(&manifest, &root, &opts, &SystemProbe::new()) {
        Ok(configuration) => Ok(Session {
            root,
            config,
            configuration,
        }),
        Err(err) => {
            // A failed pass produces no target graph
            remove_stale_file(&root.join(GRAPH_FILE))?;
            emit(&err.to_diagnostic(), ctx.color());
            bail!("configuration of `{}` failed", manifest.project.name);
        }
    }
}
