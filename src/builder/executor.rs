//! Parallel build of an assembled target graph, with progress reporting.
//!
//! Targets are independent of each other, so they build in parallel.
//! Inside a target, C and CUDA units compile in parallel; Fortran units
//! compile one after another in declaration order, since a unit may use a
//! module produced by an earlier one.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::builder::assemble::TargetGraph;
use crate::builder::toolchain::{compile_command, link_command, CommandSpec};
use crate::core::target::{Language, LibraryTarget};
use crate::core::toolchain::ToolchainSet;
use crate::util::fs::ensure_dir;
use crate::util::process::ProcessBuilder;

/// One compile step.
#[derive(Debug, Clone)]
pub struct CompileStep {
    pub source: PathBuf,
    pub object: PathBuf,
    pub language: Language,
    pub command: CommandSpec,
}

/// Every command needed to produce one library.
#[derive(Debug, Clone)]
pub struct TargetPlan {
    pub target: String,
    pub object_dir: PathBuf,
    pub compiles: Vec<CompileStep>,
    pub link: CommandSpec,
    pub output: PathBuf,
}

/// A produced library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target: String,
    pub path: PathBuf,
}

/// A target that failed to build.
#[derive(Debug, Clone)]
pub struct TargetFailure {
    pub target: String,
    pub message: String,
}

/// Outcome of a build: every target either produced an artifact or failed.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<TargetFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Build executor with progress tracking.
pub struct BuildExecutor<'a> {
    graph: &'a TargetGraph,
    toolchains: &'a ToolchainSet,
    verbose: bool,
}

impl<'a> BuildExecutor<'a> {
    /// Create a new build executor.
    pub fn new(graph: &'a TargetGraph, toolchains: &'a ToolchainSet) -> Self {
        BuildExecutor {
            graph,
            toolchains,
            verbose: false,
        }
    }

    /// Enable verbose output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Generate the commands for every target without running them.
    pub fn plan(&self) -> Result<Vec<TargetPlan>> {
        self.graph
            .targets()
            .iter()
            .map(|target| self.plan_target(target))
            .collect()
    }

    fn plan_target(&self, target: &LibraryTarget) -> Result<TargetPlan> {
        let object_dir = target.object_dir();
        let mut compiles = Vec::with_capacity(target.sources.len());
        let mut names = HashSet::new();

        for (index, unit) in target.sources.iter().enumerate() {
            let toolchain = self.toolchains.get(unit.language).ok_or_else(|| {
                anyhow!("no {} toolchain for target `{}`", unit.language, target.name)
            })?;
            let flags = target.flags_for(unit.language).ok_or_else(|| {
                anyhow!("no {} flags bound to target `{}`", unit.language, target.name)
            })?;

            let file_name = unit
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("unit{}", index));
            // Same file name in two directories
            let object_name = if names.insert(file_name.clone()) {
                format!("{}.o", file_name)
            } else {
                format!("{}-{}.o", file_name, index)
            };
            let object = object_dir.join(object_name);

            compiles.push(CompileStep {
                source: unit.path.clone(),
                command: compile_command(toolchain, flags, &unit.path, &object, &object_dir),
                object,
                language: unit.language,
            });
        }

        let driver = target.link_language();
        let toolchain = self
            .toolchains
            .get(driver)
            .ok_or_else(|| anyhow!("no {} toolchain to link `{}`", driver, target.name))?;
        let flags = target
            .flags_for(driver)
            .ok_or_else(|| anyhow!("no {} flags bound to target `{}`", driver, target.name))?;

        let objects: Vec<PathBuf> = compiles.iter().map(|c| c.object.clone()).collect();
        let output = target.output_path();
        let link = link_command(
            toolchain,
            flags,
            &objects,
            &output,
            &target.dependency_link_args(),
            &target.rpath_dirs(),
        );

        Ok(TargetPlan {
            target: target.name.clone(),
            object_dir,
            compiles,
            link,
            output,
        })
    }

    /// Build every target. Per-target failures are collected in the
    /// report; only setup problems return an error.
    pub fn execute(&self, jobs: Option<usize>) -> Result<BuildReport> {
        let start = Instant::now();

        if let Some(j) = jobs {
            rayon::ThreadPoolBuilder::new()
                .num_threads(j)
                .build_global()
                .ok(); // Ignore if already set
        }

        let plans = self.plan()?;
        ensure_dir(self.graph.output_dir())?;

        let compile_count: usize = plans.iter().map(|p| p.compiles.len()).sum();
        if self.verbose {
            eprintln!("   Compiling {} file(s)", compile_count);
            eprintln!("     Linking {} target(s)", plans.len());
        }

        let steps = step_count(&plans);
        let pb = if !self.verbose && steps > 1 {
            let pb = ProgressBar::new(steps as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let results: Vec<(String, Result<Artifact>)> = plans
            .par_iter()
            .map(|plan| {
                let result = self.build_target(plan, pb.as_ref());
                (plan.target.clone(), result)
            })
            .collect();

        if let Some(pb) = &pb {
            pb.finish_with_message("done");
        }

        let mut report = BuildReport::default();
        for (target, result) in results {
            match result {
                Ok(artifact) => report.artifacts.push(artifact),
                Err(e) => {
                    tracing::error!("Failed to build `{}`", target);
                    report.failures.push(TargetFailure {
                        target,
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        let elapsed = start.elapsed();
        eprintln!(
            "    Finished {} target(s) in {:.2}s",
            report.artifacts.len(),
            elapsed.as_secs_f64()
        );

        Ok(report)
    }

    fn build_target(
        &self,
        plan: &TargetPlan,
        pb: Option<&ProgressBar>,
    ) -> Result<Artifact> {
        ensure_dir(&plan.object_dir)?;

        let (fortran, others): (Vec<&CompileStep>, Vec<&CompileStep>) = plan
            .compiles
            .iter()
            .partition(|step| step.language == Language::Fortran);

        let compile = |step: &CompileStep| -> Result<()> {
            self.compile(step)?;
            if let Some(pb) = pb {
                pb.inc(1);
                pb.set_message(plan.target.clone());
            }
            Ok(())
        };

        let (fortran_result, other_results) = rayon::join(
            || fortran.iter().try_for_each(|step| compile(step)),
            || {
                others
                    .par_iter()
                    .map(|step| compile(step))
                    .collect::<Vec<_>>()
            },
        );

        let mut errors: Vec<String> = Vec::new();
        if let Err(e) = fortran_result {
            errors.push(format!("{:#}", e));
        }
        errors.extend(
            other_results
                .into_iter()
                .filter_map(|r| r.err())
                .map(|e| format!("{:#}", e)),
        );
        if !errors.is_empty() {
            bail!("{}", errors.join("\n"));
        }

        self.run("Linking", &plan.output.display().to_string(), &plan.link)
            .with_context(|| format!("linking failed for {}", plan.output.display()))?;
        if let Some(pb) = pb {
            pb.inc(1);
        }

        Ok(Artifact {
            target: plan.target.clone(),
            path: plan.output.clone(),
        })
    }

    fn compile(&self, step: &CompileStep) -> Result<()> {
        self.run("Compiling", &step.source.display().to_string(), &step.command)
            .with_context(|| format!("compilation failed for {}", step.source.display()))
    }

    fn run(&self, status: &str, subject: &str, spec: &CommandSpec) -> Result<()> {
        let cmd = process_builder_from_spec(spec);
        tracing::debug!("{} {}: {}", status, subject, cmd.display_command());
        if self.verbose {
            eprintln!("{:>12} {}", status, subject);
        }

        cmd.exec_and_check()?;
        Ok(())
    }
}

fn process_builder_from_spec(spec: &CommandSpec) -> ProcessBuilder {
    ProcessBuilder::new(&spec.program).args(&spec.args)
}

/// One bar tick per compiled object and one per linked library.
fn step_count(plans: &[TargetPlan]) -> usize {
    plans.iter().map(|p| p.compiles.len() + 1).sum()
}
