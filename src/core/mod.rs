//! Core data structures for berth.
//!
//! This module contains the immutable model built by one configuration
//! pass:
//! - Toolchains and the languages they compile
//! - External dependencies and their detection state
//! - Flag sets with provenance
//! - Library targets and the variants that gate them
//! - The Berth.toml manifest

pub mod dependency;
pub mod flags;
pub mod manifest;
pub mod target;
pub mod toolchain;
pub mod variant;

pub use dependency::{DependencyId, DetectedDependency, Locator, ResolutionState, SearchStrategy};
pub use flags::{FlagPurpose, FlagSet, FlagSource};
pub use manifest::{find_manifest, Manifest, MANIFEST_NAME};
pub use target::{Language, LibraryTarget, SourceUnit, TargetDecl, TargetKind};
pub use toolchain::{ToolchainInfo, ToolchainOrigin, ToolchainSet};
pub use variant::{ActivationPredicate, BackendVariant, VariantRequest};
