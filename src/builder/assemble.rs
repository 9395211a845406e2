//! Target graph assembly.
//!
//! Turns target declarations into buildable [`LibraryTarget`]s: sources are
//! expanded and classified, flag sets and detected dependencies are bound,
//! and every target shares one output directory. Any error fails the whole
//! pass; no partial graph is ever returned.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::Diagnostic;
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use thiserror::Error;

use crate::builder::compose::FlagTable;
use crate::builder::detect::DependencyTable;
use crate::core::dependency::{DependencyId, DetectedDependency};
use crate::core::target::{Language, LibraryTarget, SourceUnit, TargetDecl, TargetKind};
use crate::core::variant::BackendVariant;
use crate::util::fs::expand_sources;

#[derive(Debug, Error, Diagnostic)]
pub enum AssembleError {
    #[error("target `{target}` needs {id}, which was not resolved (tried {attempted})")]
    #[diagnostic(
        code(berth::assemble::unresolved_dependency),
        help("install it, or set {key} in berth.override.toml")
    )]
    UnresolvedDependency {
        target: String,
        id: DependencyId,
        attempted: String,
        key: &'static str,
    },

    #[error("target `{target}` has {language} source {} but no {language} toolchain is available", .path.display())]
    #[diagnostic(
        code(berth::assemble::missing_toolchain),
        help("set {key} in berth.override.toml, or move the target into a variant that requires {language}")
    )]
    MissingToolchain {
        target: String,
        path: PathBuf,
        language: Language,
        key: &'static str,
    },

    #[error("target `{target}` has source {} with an unknown extension", .path.display())]
    #[diagnostic(
        code(berth::assemble::unknown_extension),
        help("sources must be C (.c), Fortran (.f, .f90, .F90, ...) or CUDA (.cu)")
    )]
    UnknownExtension { target: String, path: PathBuf },

    #[error("target `{target}` has no source units")]
    #[diagnostic(code(berth::assemble::empty_target))]
    EmptyTarget { target: String },

    #[error("target `{target}` is declared more than once")]
    #[diagnostic(code(berth::assemble::duplicate_target))]
    DuplicateTarget { target: String },

    #[error("failed to expand sources of target `{target}`: {message}")]
    #[diagnostic(code(berth::assemble::sources))]
    Sources { target: String, message: String },
}

/// Builds the target graph from one configuration pass's results.
pub struct Assembler<'a> {
    root: &'a Path,
    output_dir: PathBuf,
    flags: &'a FlagTable,
    dependencies: &'a DependencyTable,
}

impl<'a> Assembler<'a> {
    /// `root` is the directory source entries are relative to.
    pub fn new(
        root: &'a Path,
        output_dir: impl Into<PathBuf>,
        flags: &'a FlagTable,
        dependencies: &'a DependencyTable,
    ) -> Self {
        Assembler {
            root,
            output_dir: output_dir.into(),
            flags,
            dependencies,
        }
    }

    /// Assemble base targets and the targets of the active variants.
    pub fn assemble(
        &self,
        base: &[TargetDecl],
        active: &[BackendVariant],
    ) -> Result<TargetGraph, AssembleError> {
        let decls = base.iter().map(|t| (t, None)).chain(
            active
                .iter()
                .flat_map(|v| v.targets.iter().map(move |t| (t, Some(v.name.as_str())))),
        );

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for (decl, variant) in decls {
            if !seen.insert(decl.name.as_str()) {
                return Err(AssembleError::DuplicateTarget {
                    target: decl.name.clone(),
                });
            }
            targets.push(self.assemble_target(decl, variant)?);
        }

        tracing::info!(
            "Assembled {} target(s) into {}",
            targets.len(),
            self.output_dir.display()
        );

        Ok(TargetGraph {
            output_dir: self.output_dir.clone(),
            targets,
        })
    }

    fn assemble_target(
        &self,
        decl: &TargetDecl,
        variant: Option<&str>,
    ) -> Result<LibraryTarget, AssembleError> {
        let paths = expand_sources(self.root, &decl.sources).map_err(|e| AssembleError::Sources {
            target: decl.name.clone(),
            message: format!("{:#}", e),
        })?;
        if paths.is_empty() {
            return Err(AssembleError::EmptyTarget {
                target: decl.name.clone(),
            });
        }

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let language =
                Language::from_path(&path).ok_or_else(|| AssembleError::UnknownExtension {
                    target: decl.name.clone(),
                    path: path.clone(),
                })?;
            if !self.flags.contains_key(&language) {
                return Err(AssembleError::MissingToolchain {
                    target: decl.name.clone(),
                    path,
                    language,
                    key: language.compiler_override_key(),
                });
            }
            sources.push(SourceUnit { path, language });
        }

        let mut dependencies = Vec::with_capacity(decl.dependencies.len());
        for &id in &decl.dependencies {
            let detected = self
                .dependencies
                .get(&id)
                .cloned()
                .unwrap_or_else(|| DetectedDependency::unresolved(id));
            if !detected.is_resolved() {
                return Err(AssembleError::UnresolvedDependency {
                    target: decl.name.clone(),
                    id,
                    attempted: detected.attempted_summary(),
                    key: id.override_key(),
                });
            }
            if !dependencies.iter().any(|d: &DetectedDependency| d.id == id) {
                dependencies.push(detected);
            }
        }

        let mut target = LibraryTarget {
            name: decl.name.clone(),
            kind: decl.kind,
            sources,
            dependencies,
            flags: Vec::new(),
            output_dir: self.output_dir.clone(),
            variant: variant.map(String::from),
        };
        // Shared, not copied: every target using a language holds the same set
        target.flags = target
            .languages()
            .into_iter()
            .filter_map(|lang| self.flags.get(&lang).map(Arc::clone))
            .collect();

        tracing::debug!(
            "Target `{}`: {} source(s), languages {:?}, link with {}",
            target.name,
            target.sources.len(),
            target.languages(),
            target.link_language()
        );

        Ok(target)
    }
}

/// Node of the display graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Target(String),
    Dependency(DependencyId),
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Target(name) => write!(f, "lib{}", name),
            GraphNode::Dependency(id) => write!(f, "{}", id),
        }
    }
}

/// The assembled, immutable set of targets.
#[derive(Debug, Clone)]
pub struct TargetGraph {
    output_dir: PathBuf,
    targets: Vec<LibraryTarget>,
}

impl TargetGraph {
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Targets in assembly order: base targets first, then variants.
    pub fn targets(&self) -> &[LibraryTarget] {
        &self.targets
    }

    pub fn get(&self, name: &str) -> Option<&LibraryTarget> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The sub-graph made of the named targets.
    pub fn select(&self, names: &[String]) -> TargetGraph {
        TargetGraph {
            output_dir: self.output_dir.clone(),
            targets: self
                .targets
                .iter()
                .filter(|t| names.contains(&t.name))
                .cloned()
                .collect(),
        }
    }

    /// Bipartite graph: an edge from each target to each library it links.
    pub fn to_petgraph(&self) -> DiGraph<GraphNode, ()> {
        let mut graph = DiGraph::new();
        let mut dep_nodes: HashMap<DependencyId, NodeIndex> = HashMap::new();

        for target in &self.targets {
            let node = graph.add_node(GraphNode::Target(target.name.clone()));
            for dep in &target.dependencies {
                let dep_node = *dep_nodes
                    .entry(dep.id)
                    .or_insert_with(|| graph.add_node(GraphNode::Dependency(dep.id)));
                graph.add_edge(node, dep_node, ());
            }
        }

        graph
    }

    /// Graphviz rendering of [`Self::to_petgraph`].
    pub fn to_dot(&self) -> String {
        let graph = self.to_petgraph().map(|_, node| node.clone(), |_, _| "");
        format!("{}", Dot::with_config(&graph, &[DotConfig::EdgeNoLabel]))
    }

    /// Serializable description of the graph.
    pub fn emit(&self) -> GraphView {
        GraphView {
            output_dir: self.output_dir.clone(),
            targets: self.targets.iter().map(TargetView::from_target).collect(),
        }
    }

    /// Pretty JSON of [`Self::emit`].
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.emit())
    }
}

/// Effective flags of one language.
#[derive(Debug, Clone, Serialize)]
pub struct FlagView {
    pub compile: Vec<String>,
    pub link: Vec<String>,
}

/// Serializable form of a target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetView {
    pub name: String,
    pub kind: TargetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub output: PathBuf,
    pub link_language: Language,
    pub sources: Vec<SourceUnit>,
    pub dependencies: Vec<DetectedDependency>,
    pub flags: BTreeMap<Language, FlagView>,
}

impl TargetView {
    fn from_target(target: &LibraryTarget) -> Self {
        TargetView {
            name: target.name.clone(),
            kind: target.kind,
            variant: target.variant.clone(),
            output: target.output_path(),
            link_language: target.link_language(),
            sources: target.sources.clone(),
            dependencies: target.dependencies.clone(),
            flags: target
                .flags
                .iter()
                .map(|f| {
                    (
                        f.language(),
                        FlagView {
                            compile: f.compile_flags(),
                            link: f.link_flags(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Serializable form of the whole graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GraphView {
    pub output_dir: PathBuf,
    pub targets: Vec<TargetView>,
}
