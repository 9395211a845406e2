//! Target definitions - what gets built.
//!
//! Every target is a shared library compiled from C, Fortran or CUDA
//! sources and linked against external native libraries.

mod language;
mod library;

pub use self::language::{Language, LanguageParseError};
pub use self::library::{object_dir, LibraryTarget, SourceUnit, TargetDecl, TargetKind};
