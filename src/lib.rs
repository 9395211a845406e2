//! berth - backend selection and flag composition for native scientific
//! shared libraries
//!
//! One configuration pass reads an optional override fragment, detects
//! the C, Fortran and CUDA toolchains and the BLAS, LAPACK, FFTW and CUDA
//! libraries, composes per-toolchain flags, gates optional backend
//! variants on toolchain availability and assembles an acyclic graph of
//! shared-library targets. The executor then compiles and links it.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for berth unit tests.
///
/// Only compiled for tests. Provides a scripted host probe and project
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    dependency::DependencyId, flags::FlagSet, manifest::Manifest, target::LibraryTarget,
    toolchain::ToolchainSet,
};

pub use ops::configure::{configure, Configuration, ConfigureError, ConfigureOptions};
pub use util::context::GlobalContext;
