//! The `ui://namespace/resource` URI grammar.
//!
//! Enforced identically by the extractor, the builder, and the verifier:
//! exactly one namespace segment and one resource segment, both restricted to
//! `[A-Za-z0-9_-]`, no further slashes.

use serde::{Deserialize, Serialize};

pub const URI_SCHEME: &str = "ui://";

/// A parsed `ui://namespace/resource` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceUri {
    pub namespace: String,
    pub resource: String,
}

impl ResourceUri {
    /// Parse a resource URI, returning `None` when it doesn't match the
    /// grammar.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(URI_SCHEME)?;
        let (namespace, resource) = rest.split_once('/')?;
        if namespace.is_empty() || resource.is_empty() {
            return None;
        }
        if !is_segment(namespace) || !is_segment(resource) {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            resource: resource.to_string(),
        })
    }

    /// The URL path prefix the dev server mounts this resource under.
    pub fn route_prefix(&self) -> String {
        format!("/ui/{}/{}", self.namespace, self.resource)
    }
}

impl std::fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", URI_SCHEME, self.namespace, self.resource)
    }
}

fn is_segment(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a URI against the grammar without keeping the parts.
pub fn is_valid_resource_uri(uri: &str) -> bool {
    ResourceUri::parse(uri).is_some()
}

/// Map a tool id to a filesystem-safe filename, preserving dots and dashes.
pub fn tool_id_to_filename(tool_id: &str) -> String {
    tool_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Map a tool id to a URI segment, collapsing anything outside the segment
/// alphabet to dashes.
pub fn sanitize_resource_segment(tool_id: &str) -> String {
    tool_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
