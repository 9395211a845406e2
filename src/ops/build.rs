//! Implementation of `berth build`.

use anyhow::{bail, Result};

use crate::builder::executor::{BuildExecutor, BuildReport};
use crate::ops::configure::Configuration;
use crate::util::diagnostic::suggestions;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Specific targets to build (empty = all)
    pub targets: Vec<String>,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Verbose output
    pub verbose: bool,
}

/// Validate that all requested targets exist in the assembled graph.
///
/// This prevents silent no-ops when the user names a target whose variant
/// is inactive.
fn validate_target_filter(config: &Configuration, targets: &[String]) -> Result<()> {
    for requested in targets {
        if config.graph.get(requested).is_none() {
            let available: Vec<_> = config
                .graph
                .targets()
                .iter()
                .map(|t| t.name.as_str())
                .collect();
            bail!(
                "unknown target `{}`\n\
                 available targets: {}\n\
                 {}",
                requested,
                if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                },
                suggestions::TARGET_NOT_FOUND
            );
        }
    }

    Ok(())
}

/// Compile and link the configured targets.
pub fn build(config: &Configuration, opts: &BuildOptions) -> Result<BuildReport> {
    validate_target_filter(config, &opts.targets)?;

    let graph = if opts.targets.is_empty() {
        config.graph.clone()
    } else {
        config.graph.select(&opts.targets)
    };

    tracing::info!("Building {} target(s)", graph.len());

    BuildExecutor::new(&graph, &config.toolchains)
        .verbose(opts.verbose)
        .execute(opts.jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;
    use crate::ops::configure::{configure, ConfigureOptions};
    use crate::test_support::{workstation_probe, ProjectFixture};
    use tempfile::TempDir;

    #[test]
    fn test_unknown_target_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::default_layout("nao").write_to(tmp.path()).unwrap();
        let manifest = Manifest::load(&root.join("Berth.toml")).unwrap();
        let config = configure(
            &manifest,
            &root,
            &ConfigureOptions::default(),
            &workstation_probe(),
        )
        .unwrap();

        // gpu_sparsetools exists in the manifest but its variant is inactive
        let opts = BuildOptions {
            targets: vec!["gpu_sparsetools".to_string()],
            ..Default::default()
        };
        let err = build(&config, &opts).unwrap_err();
        assert!(err.to_string().contains("available targets: np_helper, sparsetools, nao"));
    }
}
