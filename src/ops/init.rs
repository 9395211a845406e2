//! Implementation of `berth init`.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::builder::overrides::OVERRIDE_FILE_NAME;
use crate::core::manifest::{default_manifest, MANIFEST_NAME};

/// Options for initializing a project.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Project name
    pub name: String,

    /// Overwrite an existing Berth.toml
    pub force: bool,
}

/// Commented override fragment written next to a new manifest.
pub fn override_template() -> &'static str {
    r#"# Pin what berth would otherwise detect. Every key is optional.
#
# Libraries: a linker spec (`;` or space separated), an array, or `true`
# to assume the library is available under its default name.
# BLAS_LIBRARIES = "-L/opt/openblas/lib;-lopenblas"
# LAPACK_LIBRARIES = "-L/opt/openblas/lib;-lopenblas"
# FFTW_LIBRARIES = "/opt/fftw/lib/libfftw3.so"
# CUDA_LIBRARIES = ["-L/usr/local/cuda/lib64", "-lcudart", "-lcublas", "-lcusparse"]
#
# Compilers: a path (not verified), or false to switch a toolchain off.
# C_COMPILER = "/usr/bin/gcc"
# Fortran_COMPILER = "/usr/bin/gfortran"
# CUDA_COMPILER = false
# CUDA_HOST_COMPILER = "g++-12"
#
# Extra compile flags, appended to the base flags.
# Fortran_FLAGS = "-fallow-argument-mismatch"
#
# BLAS_VENDOR = "openblas"   # openblas | mkl | generic
"#
}

/// Initialize a berth project in an existing or new directory.
pub fn init_project(path: &Path, opts: &InitOptions) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }

    let manifest_path = path.join(MANIFEST_NAME);
    if manifest_path.exists() && !opts.force {
        bail!(
            "`{}` already exists in `{}`\n\
             \n\
             Use `berth init --force` to overwrite it.",
            MANIFEST_NAME,
            path.display()
        );
    }

    fs::write(&manifest_path, default_manifest(&opts.name))
        .with_context(|| format!("failed to write {}", MANIFEST_NAME))?;

    // Never clobber a fragment that may hold real overrides
    let override_path = path.join(OVERRIDE_FILE_NAME);
    if !override_path.exists() {
        fs::write(&override_path, override_template())
            .with_context(|| format!("failed to write {}", OVERRIDE_FILE_NAME))?;
    }

    let gitignore = path.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "# berth build artifacts\n.berth/\n*.so\n*.dylib\n")?;
    }

    Ok(())
}
