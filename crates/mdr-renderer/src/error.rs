//! Error types for rendering.

use crate::node::{Node, NodeKind};

/// Error raised by a render call.
///
/// Rendering either completes or fails with one of these; there is no
/// partial output.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// No handler is registered for the node's kind.
    #[error("unsupported construct: {kind}")]
    Unsupported {
        /// Kind of the offending node.
        kind: NodeKind,
        /// The offending node, for locating it in the source document.
        node: Box<Node>,
    },

    /// The node sequence violates the token model.
    #[error("malformed input: {0}")]
    Malformed(String),
}

impl RenderError {
    /// Unsupported-construct error for `node`.
    pub fn unsupported(node: &Node) -> Self {
        Self::Unsupported {
            kind: node.kind.clone(),
            node: Box::new(node.clone()),
        }
    }

    /// Kind of the offending node, if this is an unsupported-construct error.
    pub fn unsupported_kind(&self) -> Option<&NodeKind> {
        match self {
            Self::Unsupported { kind, .. } => Some(kind),
            Self::Malformed(_) => None,
        }
    }
}
