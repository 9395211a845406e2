//! High-level operations.
//!
//! This module contains the implementation of berth commands.

pub mod build;
pub mod configure;
pub mod init;

pub use build::{build, BuildOptions};
pub use configure::{configure, Configuration, ConfigureError, ConfigureOptions};
pub use init::{init_project, InitOptions};
