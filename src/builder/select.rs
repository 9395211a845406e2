//! Backend variant selection.
//!
//! Decides which variants contribute targets. Pure filtering over the
//! manifest's variants, the detected toolchains and the user's policy.

use std::collections::BTreeMap;
use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::core::target::Language;
use crate::core::toolchain::ToolchainSet;
use crate::core::variant::{BackendVariant, VariantRequest};

#[derive(Debug, Error, Diagnostic)]
pub enum SelectError {
    #[error("variant `{name}` is required but {missing} is unavailable")]
    #[diagnostic(
        code(berth::select::required_unavailable),
        help("install the toolchain or point {key} at it in berth.override.toml")
    )]
    RequiredVariantUnavailable {
        name: String,
        missing: String,
        key: String,
    },

    #[error("unknown variant `{name}` (known variants: {known})")]
    #[diagnostic(code(berth::select::unknown_variant))]
    UnknownVariant { name: String, known: String },
}

/// Per-variant requests. Variants not named are `auto`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantPolicy {
    requests: BTreeMap<String, VariantRequest>,
}

impl VariantPolicy {
    pub fn new() -> Self {
        VariantPolicy::default()
    }

    /// Set the request for a variant, replacing an earlier one.
    pub fn set(&mut self, name: impl Into<String>, request: VariantRequest) {
        self.requests.insert(name.into(), request);
    }

    pub fn with(mut self, name: impl Into<String>, request: VariantRequest) -> Self {
        self.set(name, request);
        self
    }

    pub fn request(&self, name: &str) -> VariantRequest {
        self.requests.get(name).copied().unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.requests.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, VariantRequest>> for VariantPolicy {
    fn from(requests: BTreeMap<String, VariantRequest>) -> Self {
        VariantPolicy { requests }
    }
}

/// Why a variant contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InactiveReason {
    /// Turned off by the user
    Disabled,
    /// Required toolchains are unavailable
    MissingToolchains { languages: Vec<Language> },
}

impl fmt::Display for InactiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InactiveReason::Disabled => write!(f, "disabled"),
            InactiveReason::MissingToolchains { languages } => {
                let names: Vec<_> = languages.iter().map(|l| l.to_string()).collect();
                write!(f, "missing {} toolchain", names.join(", "))
            }
        }
    }
}

/// Outcome for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantStatus {
    pub name: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InactiveReason>,
}

/// Active variants, in manifest order, plus the status of every variant.
#[derive(Debug, Clone, Default)]
pub struct VariantSelection {
    pub active: Vec<BackendVariant>,
    pub statuses: Vec<VariantStatus>,
}

impl VariantSelection {
    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|v| v.name == name)
    }

    pub fn inactive(&self) -> impl Iterator<Item = &VariantStatus> {
        self.statuses.iter().filter(|s| !s.active)
    }
}

/// Select the variants that contribute targets.
pub fn select_variants(
    variants: &[BackendVariant],
    toolchains: &ToolchainSet,
    policy: &VariantPolicy,
) -> Result<VariantSelection, SelectError> {
    for name in policy.names() {
        if !variants.iter().any(|v| v.name == name) {
            let known: Vec<_> = variants.iter().map(|v| v.name.as_str()).collect();
            return Err(SelectError::UnknownVariant {
                name: name.to_string(),
                known: if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                },
            });
        }
    }

    let mut selection = VariantSelection::default();

    for variant in variants {
        let request = policy.request(&variant.name);
        let missing = variant.predicate.missing(toolchains);

        let reason = match request {
            VariantRequest::Off => Some(InactiveReason::Disabled),
            _ if missing.is_empty() => None,
            VariantRequest::Require => {
                let names: Vec<_> = missing.iter().map(|l| l.to_string()).collect();
                return Err(SelectError::RequiredVariantUnavailable {
                    name: variant.name.clone(),
                    missing: names.join(", "),
                    key: missing[0].compiler_override_key().to_string(),
                });
            }
            VariantRequest::Auto => Some(InactiveReason::MissingToolchains { languages: missing }),
        };

        match &reason {
            None => {
                tracing::info!("Variant `{}` active ({})", variant.name, variant.predicate);
                selection.active.push(variant.clone());
            }
            Some(reason) => {
                tracing::info!("Variant `{}` inactive: {}", variant.name, reason);
            }
        }

        selection.statuses.push(VariantStatus {
            name: variant.name.clone(),
            active: reason.is_none(),
            reason,
        });
    }

    Ok(selection)
}
