//! Admonition container names shared by the backends.

use crate::node::{Node, NodeKind};

/// Admonition variant carried by a container node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Admonition {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl Admonition {
    /// All variants.
    pub const ALL: [Self; 5] = [
        Self::Note,
        Self::Tip,
        Self::Important,
        Self::Warning,
        Self::Caution,
    ];

    /// Container name, as used in `container_{name}_open`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
        }
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Important => "Important",
            Self::Warning => "Warning",
            Self::Caution => "Caution",
        }
    }

    /// Variant for a container name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Variant of a container open/close node.
    pub fn of(node: &Node) -> Option<Self> {
        match &node.kind {
            NodeKind::ContainerOpen(name) | NodeKind::ContainerClose(name) => {
                Self::from_name(name)
            }
            _ => None,
        }
    }
}

impl From<pulldown_cmark::BlockQuoteKind> for Admonition {
    fn from(kind: pulldown_cmark::BlockQuoteKind) -> Self {
        match kind {
            pulldown_cmark::BlockQuoteKind::Note => Self::Note,
            pulldown_cmark::BlockQuoteKind::Tip => Self::Tip,
            pulldown_cmark::BlockQuoteKind::Important => Self::Important,
            pulldown_cmark::BlockQuoteKind::Warning => Self::Warning,
            pulldown_cmark::BlockQuoteKind::Caution => Self::Caution,
        }
    }
}
