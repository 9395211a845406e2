//! Backend variants: toolchain-gated groups of targets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::target::{Language, TargetDecl};
use crate::core::toolchain::ToolchainSet;

/// Activation predicate of a variant: every listed toolchain must be
/// available. An empty list always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationPredicate {
    requires: Vec<Language>,
}

impl ActivationPredicate {
    pub fn always() -> Self {
        ActivationPredicate::default()
    }

    pub fn requires(languages: impl IntoIterator<Item = Language>) -> Self {
        let mut requires: Vec<_> = languages.into_iter().collect();
        requires.sort();
        requires.dedup();
        ActivationPredicate { requires }
    }

    pub fn required_languages(&self) -> &[Language] {
        &self.requires
    }

    pub fn holds(&self, toolchains: &ToolchainSet) -> bool {
        self.requires.iter().all(|lang| toolchains.contains(*lang))
    }

    /// Required toolchains that are not available.
    pub fn missing(&self, toolchains: &ToolchainSet) -> Vec<Language> {
        self.requires
            .iter()
            .copied()
            .filter(|lang| !toolchains.contains(*lang))
            .collect()
    }
}

impl fmt::Display for ActivationPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requires.is_empty() {
            return write!(f, "always");
        }
        let names: Vec<_> = self.requires.iter().map(|l| l.to_string()).collect();
        write!(f, "requires {}", names.join(" + "))
    }
}

/// An optional subtree of the target graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendVariant {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "requires")]
    pub predicate: ActivationPredicate,

    /// Targets contributed when active
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetDecl>,
}

impl BackendVariant {
    pub fn new(name: impl Into<String>, predicate: ActivationPredicate) -> Self {
        BackendVariant {
            name: name.into(),
            description: None,
            predicate,
            targets: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target(mut self, target: TargetDecl) -> Self {
        self.targets.push(target);
        self
    }
}

/// How the user wants a variant treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantRequest {
    /// Active iff the predicate holds
    #[default]
    Auto,
    /// Must be active; an unmet predicate is fatal
    Require,
    /// Never active
    #[serde(alias = "disable", alias = "disabled")]
    Off,
}

impl std::str::FromStr for VariantRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(VariantRequest::Auto),
            "require" | "required" | "on" => Ok(VariantRequest::Require),
            "off" | "disable" | "disabled" => Ok(VariantRequest::Off),
            _ => Err(format!(
                "invalid variant request '{}', valid values: auto, require, off",
                s
            )),
        }
    }
}
