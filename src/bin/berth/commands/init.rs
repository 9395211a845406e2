//! `berth init` command

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::cli::InitArgs;
use berth::core::MANIFEST_NAME;
use berth::ops::init::{init_project, InitOptions};
use berth::util::GlobalContext;

/// Project name from the arguments or the directory name.
pub fn determine_project_name(name: &Option<String>, path: &Path) -> String {
    name.clone().unwrap_or_else(|| {
        path.canonicalize()
            .ok()
            .as_deref()
            .unwrap_or(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string()
    })
}

/// Project names become library names, so keep them to identifier chars.
pub fn validate_project_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("project name cannot be empty");
    }

    if name.starts_with('-') || name.starts_with('.') {
        return Err("project name cannot start with a hyphen or a dot");
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err("project name contains invalid characters");
    }

    Ok(())
}

pub fn execute(args: InitArgs, ctx: &GlobalContext) -> Result<()> {
    let path = ctx.cwd().join(args.path.unwrap_or_else(|| PathBuf::from(".")));

    let name = determine_project_name(&args.name, &path);
    if let Err(msg) = validate_project_name(&name) {
        bail!("invalid project name `{}`: {}", name, msg);
    }

    let opts = InitOptions {
        name: name.clone(),
        force: args.force,
    };

    init_project(&path, &opts)?;

    eprintln!(
        "     Created {} for `{}` in {}",
        MANIFEST_NAME,
        name,
        path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_name_wins() {
        let name = determine_project_name(&Some("pyscf".to_string()), Path::new("/tmp/other"));
        assert_eq!(name, "pyscf");
    }

    #[test]
    fn test_name_from_directory() {
        let name = determine_project_name(&None, Path::new("/nonexistent/libnao"));
        assert_eq!(name, "libnao");
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("np_helper").is_ok());
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("-x").is_err());
        assert!(validate_project_name("a b").is_err());
    }
}
