//! Inline roles understood by the bundled backends.

use crate::node::Node;

/// Name of an inline `myst_role` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Shell command, e.g. `{command}`nix-build``.
    Command,
    /// Environment variable.
    Env,
    /// File path.
    File,
    /// Configuration option.
    Option,
    /// Placeholder variable.
    Var,
    /// Manual page reference, e.g. `{manpage}`ls(1)``.
    Manpage,
}

impl Role {
    /// Role for a `myst_role` node, `None` for unknown names.
    pub fn of(node: &Node) -> Option<Self> {
        match node.role_name()? {
            "command" => Some(Self::Command),
            "env" => Some(Self::Env),
            "file" => Some(Self::File),
            "option" => Some(Self::Option),
            "var" => Some(Self::Var),
            "manpage" => Some(Self::Manpage),
            _ => None,
        }
    }

    /// Role name as written in the source.
    pub fn name(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Env => "env",
            Self::File => "file",
            Self::Option => "option",
            Self::Var => "var",
            Self::Manpage => "manpage",
        }
    }
}
