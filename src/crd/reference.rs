//! # Cross-resource references
//!
//! Dependent kinds (Order, Subscription, Cart) point at their prerequisites
//! through a `Reference`. Resolution reads the prerequisite's status only,
//! never its spec.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a prerequisite resource by kind, namespace, and name.
///
/// The kind is implied by the field the reference appears in (`addressRef`
/// points at an Address); when set explicitly it is validated against the
/// expected kind so a mistyped reference fails fast instead of resolving to
/// the wrong resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Kind of the referenced resource. Optional; defaults to the kind
    /// implied by the referencing field.
    #[serde(default)]
    pub kind: Option<String>,
    /// Name of the referenced resource.
    pub name: String,
    /// Namespace of the referenced resource. Defaults to the namespace of
    /// the resource holding the reference.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Reference {
    /// Namespace to resolve against, falling back to the referrer's namespace.
    pub fn namespace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(fallback)
    }

    /// True when the declared kind (if any) does not match `expected`.
    pub fn kind_mismatch(&self, expected: &str) -> bool {
        self.kind.as_deref().is_some_and(|k| k != expected)
    }
}
