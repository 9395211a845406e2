//! CLI integration tests for berth.
//!
//! Every project pins its compilers and libraries through
//! berth.override.toml, so the outcome does not depend on the host.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the berth binary command, isolated from the user's global config.
fn berth(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("berth").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

const MANIFEST: &str = r#"[project]
name = "mini"
output-dir = "lib"

[[target]]
name = "np_helper"
sources = ["np_helper/*.c"]
dependencies = ["blas"]

[[variant]]
name = "fortran"
requires = ["fortran"]

[[variant.target]]
name = "nao"
sources = ["nao/m_fft.F90"]
dependencies = ["lapack", "blas", "fftw"]

[[variant]]
name = "gpu"
requires = ["cuda"]

[[variant.target]]
name = "gpu_sparsetools"
sources = ["gpu/spmv_gpu.cu"]
dependencies = ["cuda", "blas"]
"#;

const PINNED: &str = r#"BLAS_LIBRARIES = "-L/opt/openblas/lib;-lopenblas"
LAPACK_LIBRARIES = "-lopenblas"
FFTW_LIBRARIES = "/opt/fftw/lib/libfftw3.so"
C_COMPILER = "/usr/bin/gcc"
Fortran_COMPILER = "/usr/bin/gfortran"
CUDA_COMPILER = false
"#;

/// A small project with a base library, a Fortran and a GPU variant.
fn project(overrides: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("mini");
    fs::create_dir_all(root.join("np_helper")).unwrap();
    fs::create_dir_all(root.join("nao")).unwrap();
    fs::create_dir_all(root.join("gpu")).unwrap();

    fs::write(root.join("Berth.toml"), MANIFEST).unwrap();
    fs::write(root.join("berth.override.toml"), overrides).unwrap();
    fs::write(root.join("np_helper/np_helper.c"), "int np_ready(void) { return 1; }\n").unwrap();
    fs::write(root.join("np_helper/transpose.c"), "int np_transpose(void) { return 0; }\n").unwrap();
    fs::write(root.join("nao/m_fft.F90"), "module m_fft\nend module m_fft\n").unwrap();
    fs::write(root.join("gpu/spmv_gpu.cu"), "__global__ void spmv(void) {}\n").unwrap();

    (tmp, root)
}

// ============================================================================
// berth init
// ============================================================================

#[test]
fn test_init_writes_manifest_and_override_template() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("pyscf_lib");

    berth(tmp.path())
        .args(["init", "pyscf_lib"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let manifest = fs::read_to_string(dir.join("Berth.toml")).unwrap();
    assert!(manifest.contains("name = \"pyscf_lib\""));
    assert!(manifest.contains("name = \"gpu\""));
    assert!(dir.join("berth.override.toml").exists());
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let tmp = TempDir::new().unwrap();

    berth(tmp.path())
        .args(["init", "--name", "first"])
        .current_dir(tmp.path())
        .assert()
        .success();

    berth(tmp.path())
        .args(["init", "--name", "second"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    berth(tmp.path())
        .args(["init", "--name", "second", "--force"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let manifest = fs::read_to_string(tmp.path().join("Berth.toml")).unwrap();
    assert!(manifest.contains("name = \"second\""));
}

// ============================================================================
// berth configure
// ============================================================================

#[test]
fn test_configure_writes_target_graph() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .arg("configure")
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("gpu      inactive: missing CUDA toolchain"))
        .stdout(predicate::str::contains("FFTW     /opt/fftw/lib/libfftw3.so (overridden)"));

    let json = fs::read_to_string(root.join(".berth/target-graph.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let targets = value["graph"]["targets"].as_array().unwrap();
    let names: Vec<_> = targets.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["np_helper", "nao"]);
    assert_eq!(value["dependencies"]["fftw"]["state"], "overridden");
}

#[test]
fn test_configure_json_to_stdout_and_custom_emit_path() {
    let (tmp, root) = project(PINNED);

    let output = berth(tmp.path())
        .args(["configure", "--json", "--emit", "out/graph.json"])
        .current_dir(&root)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["toolchains"]["fortran"].is_object());
    assert!(root.join("out/graph.json").exists());
}

#[test]
fn test_configure_no_fortran_drops_fortran_variant() {
    let (tmp, root) = project(
        r#"BLAS_LIBRARIES = "-lopenblas"
LAPACK_LIBRARIES = "-lopenblas"
C_COMPILER = "/usr/bin/gcc"
CUDA_COMPILER = false
"#,
    );

    berth(tmp.path())
        .args(["configure", "--no-fortran"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("fortran  inactive: missing Fortran toolchain"));
}

#[test]
fn test_configure_malformed_override_fails() {
    let (tmp, root) = project("BLAS_LIBRARIES = [\"-lopenblas\"\nC_COMPILER = ");

    berth(tmp.path())
        .arg("configure")
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("berth.override.toml"));

    assert!(!root.join(".berth/target-graph.json").exists());
}

#[test]
fn test_failed_pass_removes_previous_graph() {
    let (tmp, root) = project(PINNED);
    let graph = root.join(".berth/target-graph.json");

    berth(tmp.path())
        .arg("configure")
        .current_dir(&root)
        .assert()
        .success();
    assert!(graph.exists());

    fs::write(root.join("berth.override.toml"), "BLAS_LIBRARIES = 42\n").unwrap();

    berth(tmp.path())
        .arg("configure")
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("BLAS_LIBRARIES"));
    assert!(!graph.exists());
}

#[test]
fn test_failed_pass_removes_custom_emit_path() {
    let (tmp, root) = project(PINNED);
    let graph = root.join("out/graph.json");

    berth(tmp.path())
        .args(["configure", "--emit", "out/graph.json"])
        .current_dir(&root)
        .assert()
        .success();
    assert!(graph.exists());

    berth(tmp.path())
        .args(["configure", "--emit", "out/graph.json", "--require-variant", "gpu"])
        .current_dir(&root)
        .assert()
        .failure();
    assert!(!graph.exists());
}

#[test]
fn test_malformed_project_config_fails() {
    let (tmp, root) = project(PINNED);
    fs::create_dir_all(root.join(".berth")).unwrap();
    fs::write(root.join(".berth/config.toml"), "[variants]\ngpu = \"sometimes\"\n").unwrap();

    berth(tmp.path())
        .arg("configure")
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.toml"));
}

#[test]
fn test_configure_required_variant_unavailable_fails() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .args(["configure", "--require-variant", "gpu"])
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("variant `gpu` is required"))
        .stderr(predicate::str::contains("CUDA_COMPILER"));
}

#[test]
fn test_configure_unknown_variant_fails() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .args(["configure", "--disable-variant", "opencl"])
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown variant `opencl`"));
}

#[test]
fn test_configure_outside_project_fails() {
    let tmp = TempDir::new().unwrap();

    berth(tmp.path())
        .arg("configure")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `Berth.toml`"));
}

// ============================================================================
// berth flags / graph
// ============================================================================

#[test]
fn test_flags_debug_supersedes_optimization() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .args(["flags", "c", "--compile", "--debug-flags"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("-O3    # from: base (superseded)"))
        .stdout(predicate::str::contains("-O0    # from: instrumentation"))
        .stdout(predicate::str::contains("-fopenmp    # from: parallelism"));
}

#[test]
fn test_flags_for_disabled_toolchain_fails() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .args(["flags", "cuda"])
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no CUDA toolchain"));
}

#[test]
fn test_graph_dot() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .args(["graph", "--dot"])
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph"))
        .stdout(predicate::str::contains("libnao"))
        .stdout(predicate::str::contains("libgpu_sparsetools").not());
}

#[test]
fn test_graph_lists_inactive_variants() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .arg("graph")
        .current_dir(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("libnp_helper (base, linked by C)"))
        .stdout(predicate::str::contains("(variant gpu inactive: missing CUDA toolchain)"));
}

// ============================================================================
// berth build
// ============================================================================

#[test]
fn test_build_unknown_target_fails() {
    let (tmp, root) = project(PINNED);

    berth(tmp.path())
        .args(["build", "--target", "gpu_sparsetools"])
        .current_dir(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown target `gpu_sparsetools`"));
}
