//! Feature type descriptors listed in a capabilities document.

use serde::{Deserialize, Serialize};

/// A feature type advertised by a WFS service.
///
/// Absent fields mean the source element was missing or empty; they are never
/// stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTypeDescriptor {
    /// Local name, e.g. `Roads` for `topp:Roads`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Namespace prefix (or URI) split off the qualified name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}

impl FeatureTypeDescriptor {
    /// Set the name from a possibly qualified token such as `ns:Roads`.
    ///
    /// Empty tokens leave both name and namespace unset.
    pub fn with_qualified_name(mut self, token: &str) -> Self {
        if token.is_empty() {
            return self;
        }
        let (namespace, local) = split_qualified_name(token);
        self.name = Some(local.to_string());
        self.namespace = namespace.map(str::to_string);
        self
    }

    /// The `namespace:name` form, or just the name when unqualified.
    pub fn qualified_name(&self) -> Option<String> {
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) => Some(format!("{}:{}", ns, name)),
            (None, Some(name)) => Some(name.clone()),
            _ => None,
        }
    }
}

/// Split `prefix:local` on the first colon.
///
/// Only splits when both sides are non-empty; `:Roads` and `ns:` come back
/// unchanged with no namespace.
pub fn split_qualified_name(token: &str) -> (Option<&str>, &str) {
    match token.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, token),
    }
}
