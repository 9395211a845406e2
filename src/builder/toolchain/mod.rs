//! Toolchain detection and command generation.
//!
//! Toolchain detection priority, per language:
//! 1. Override fragment (`C_COMPILER`, `Fortran_COMPILER`, `CUDA_COMPILER`)
//! 2. Environment variables (`CC`, `FC`, `CUDACXX`)
//! 3. Auto-detection (searching PATH for common compilers)
//!
//! C is mandatory. Fortran and CUDA are only probed when requested and
//! their absence only deactivates the variants that need them.

mod command;
mod detect;

pub use command::{compile_command, link_command, CommandSpec};
pub use detect::{detect_toolchains, ToolchainError, ToolchainRequest};
