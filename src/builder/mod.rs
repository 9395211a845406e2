//! Configuration pass and native build.
//!
//! Data flows one way through the pass: overrides, then toolchain and
//! library detection, then flag composition, then variant selection and
//! target graph assembly. The executor consumes the finished graph.

pub mod assemble;
pub mod compose;
pub mod detect;
pub mod executor;
pub mod overrides;
pub mod probe;
pub mod select;
pub mod toolchain;

pub use assemble::{AssembleError, Assembler, TargetGraph};
pub use compose::{ComposeOptions, FlagComposer, FlagTable, Instrumentation};
pub use detect::{DependencyTable, DetectError, FeatureDetector};
pub use executor::{BuildExecutor, BuildReport};
pub use overrides::{OverrideError, OverrideStore, OverrideValue};
pub use probe::{HostProbe, SystemProbe};
pub use select::{select_variants, SelectError, VariantPolicy, VariantSelection};
pub use toolchain::{detect_toolchains, CommandSpec, ToolchainError, ToolchainRequest};
