//! Filesystem utilities.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Remove a file left by an earlier run. A missing file is fine.
pub fn remove_stale_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("failed to remove stale file: {}", path.display()))
        }
    }
}

/// Whether a source entry is a glob pattern rather than a literal path.
pub fn is_glob_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

/// Expand source entries relative to `base`.
///
/// Literal paths are kept as declared, even if the file does not exist
/// yet. Glob patterns are expanded against the filesystem and sorted.
/// Declaration order is preserved and duplicates are dropped.
pub fn expand_sources(base: &Path, entries: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for entry in entries {
        let full = base.join(entry);

        if !is_glob_pattern(entry) {
            if seen.insert(full.clone()) {
                results.push(full);
            }
            continue;
        }

        let pattern_str = full.to_string_lossy();
        let mut matched: Vec<PathBuf> = Vec::new();
        for path in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", entry))? {
            match path {
                Ok(path) if path.is_file() => matched.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("glob error: {}", e),
            }
        }

        if matched.is_empty() {
            tracing::warn!("source pattern `{}` matched no files", entry);
        }

        matched.sort();
        for path in matched {
            if seen.insert(path.clone()) {
                results.push(path);
            }
        }
    }

    Ok(results)
}
