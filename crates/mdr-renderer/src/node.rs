//! Flat token model consumed by the renderer.
//!
//! A document is an ordered sequence of [`Node`]s. Block structure is encoded
//! as paired `_open`/`_close` nodes; runs of inline content are wrapped in a
//! single [`NodeKind::Inline`] node whose `children` hold the inline nodes.

use std::collections::BTreeMap;
use std::fmt;

/// Kind identifier of a [`Node`].
///
/// The base catalogue is closed, but container kinds are keyed by an arbitrary
/// extension name and [`NodeKind::Other`] carries any identifier the catalogue
/// does not know, so every token a parser can produce has a representation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Synthetic wrapper holding a run of inline nodes in `children`.
    Inline,
    #[default]
    Text,
    ParagraphOpen,
    ParagraphClose,
    Hardbreak,
    Softbreak,
    CodeInline,
    /// Indented code block.
    CodeBlock,
    /// Fenced code block; language in [`Node::info`].
    Fence,
    LinkOpen,
    LinkClose,
    ListItemOpen,
    ListItemClose,
    BulletListOpen,
    BulletListClose,
    EmOpen,
    EmClose,
    StrongOpen,
    StrongClose,
    BlockquoteOpen,
    BlockquoteClose,
    DlOpen,
    DlClose,
    DtOpen,
    DtClose,
    DdOpen,
    DdClose,
    /// Inline role; role name in `meta["name"]`, argument in `content`.
    MystRole,
    /// Opening marker of an extension container (e.g. `note`).
    ContainerOpen(String),
    /// Closing marker of an extension container.
    ContainerClose(String),
    /// Any identifier outside the catalogue above.
    Other(String),
}

const FIXED_KINDS: &[(&str, NodeKind)] = &[
    ("inline", NodeKind::Inline),
    ("text", NodeKind::Text),
    ("paragraph_open", NodeKind::ParagraphOpen),
    ("paragraph_close", NodeKind::ParagraphClose),
    ("hardbreak", NodeKind::Hardbreak),
    ("softbreak", NodeKind::Softbreak),
    ("code_inline", NodeKind::CodeInline),
    ("code_block", NodeKind::CodeBlock),
    ("fence", NodeKind::Fence),
    ("link_open", NodeKind::LinkOpen),
    ("link_close", NodeKind::LinkClose),
    ("list_item_open", NodeKind::ListItemOpen),
    ("list_item_close", NodeKind::ListItemClose),
    ("bullet_list_open", NodeKind::BulletListOpen),
    ("bullet_list_close", NodeKind::BulletListClose),
    ("em_open", NodeKind::EmOpen),
    ("em_close", NodeKind::EmClose),
    ("strong_open", NodeKind::StrongOpen),
    ("strong_close", NodeKind::StrongClose),
    ("blockquote_open", NodeKind::BlockquoteOpen),
    ("blockquote_close", NodeKind::BlockquoteClose),
    ("dl_open", NodeKind::DlOpen),
    ("dl_close", NodeKind::DlClose),
    ("dt_open", NodeKind::DtOpen),
    ("dt_close", NodeKind::DtClose),
    ("dd_open", NodeKind::DdOpen),
    ("dd_close", NodeKind::DdClose),
    ("myst_role", NodeKind::MystRole),
];

impl NodeKind {
    /// Container opening kind for the given extension name.
    pub fn container_open(name: impl Into<String>) -> Self {
        Self::ContainerOpen(name.into())
    }

    /// Container closing kind for the given extension name.
    pub fn container_close(name: impl Into<String>) -> Self {
        Self::ContainerClose(name.into())
    }

    /// Stable string identifier, e.g. `paragraph_open` or `container_tip_open`.
    pub fn identifier(&self) -> String {
        match self {
            Self::ContainerOpen(name) => format!("container_{name}_open"),
            Self::ContainerClose(name) => format!("container_{name}_close"),
            Self::Other(id) => id.clone(),
            fixed => FIXED_KINDS
                .iter()
                .find(|(_, kind)| kind == fixed)
                .map(|(id, _)| (*id).to_owned())
                .unwrap_or_default(),
        }
    }

    /// Parse an identifier back into a kind.
    ///
    /// Container identifiers are accepted both in plain form
    /// (`container_note_open`) and in attribute form (`container_{.note}_open`).
    /// Unknown identifiers become [`NodeKind::Other`].
    pub fn parse(id: &str) -> Self {
        if let Some((_, kind)) = FIXED_KINDS.iter().find(|(name, _)| *name == id) {
            return kind.clone();
        }
        if let Some(rest) = id.strip_prefix("container_") {
            if let Some(name) = rest.strip_suffix("_open") {
                return Self::ContainerOpen(container_name(name).to_owned());
            }
            if let Some(name) = rest.strip_suffix("_close") {
                return Self::ContainerClose(container_name(name).to_owned());
            }
        }
        Self::Other(id.to_owned())
    }

    /// Whether this kind is one of the base catalogue kinds (not an extension).
    pub fn is_base(&self) -> bool {
        !matches!(
            self,
            Self::ContainerOpen(_) | Self::ContainerClose(_) | Self::Other(_)
        )
    }
}

/// Strip the `{.name}` attribute wrapping some parsers put around container names.
fn container_name(raw: &str) -> &str {
    raw.strip_prefix("{.")
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(raw)
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl From<&str> for NodeKind {
    fn from(id: &str) -> Self {
        Self::parse(id)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for NodeKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.identifier())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for NodeKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(Self::parse(&id))
    }
}

/// One token of a parsed document.
///
/// With the `serde` feature the field set matches markdown-it's token JSON:
/// `null` stands for an absent field, and `attrs` is accepted both as a list
/// of pairs (markdown-it) and as an object (markdown-it-py). Unknown fields
/// such as `map` or `nesting` are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Node {
    /// Token kind.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: NodeKind,
    /// Raw text payload; meaning depends on the kind.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::null_as_default"))]
    pub content: String,
    /// Ordered attributes (e.g. `href`, `title`).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::attrs"))]
    pub attrs: Vec<(String, String)>,
    /// Child sequence, present only on [`NodeKind::Inline`].
    pub children: Option<Vec<Node>>,
    /// Fence info string.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::null_as_default"))]
    pub info: String,
    /// Source markup (e.g. `*`, `` ``` ``).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::null_as_default"))]
    pub markup: String,
    /// Nesting level assigned by the parser.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::null_as_default"))]
    pub level: u32,
    /// Parser-supplied auxiliary data.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::meta"))]
    pub meta: BTreeMap<String, String>,
    /// Set on paragraph markers of tight list items.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "de::null_as_default"))]
    pub hidden: bool,
}

/// Lenient field deserializers for parser token dumps.
#[cfg(feature = "serde")]
mod de {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Attrs {
        Pairs(Vec<(String, Value)>),
        Object(serde_json::Map<String, Value>),
    }

    pub(super) fn attrs<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        Ok(match Option::<Attrs>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(Attrs::Pairs(pairs)) => pairs
                .into_iter()
                .map(|(name, value)| (name, scalar(value)))
                .collect(),
            Some(Attrs::Object(object)) => object
                .into_iter()
                .map(|(name, value)| (name, scalar(value)))
                .collect(),
        })
    }

    pub(super) fn meta<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        let meta = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
        Ok(meta
            .into_iter()
            .flatten()
            .map(|(key, value)| (key, scalar(value)))
            .collect())
    }

    /// Strings verbatim, any other value as its JSON text.
    fn scalar(value: Value) -> String {
        match value {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl Node {
    /// Create a node of the given kind with no payload.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Create a `text` node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text).with_content(content)
    }

    /// Create a `code_inline` node.
    pub fn code_inline(content: impl Into<String>) -> Self {
        Self::new(NodeKind::CodeInline).with_content(content)
    }

    /// Create a `fence` node with the given info string.
    pub fn fence(info: impl Into<String>, content: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Fence).with_content(content);
        node.info = info.into();
        node.markup = "```".to_owned();
        node
    }

    /// Create a `link_open` node pointing at `href`.
    pub fn link_open(href: impl Into<String>) -> Self {
        Self::new(NodeKind::LinkOpen).with_attr("href", href)
    }

    /// Create a `myst_role` node.
    pub fn role(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::MystRole).with_content(content);
        node.meta.insert("name".to_owned(), name.into());
        node
    }

    /// Create an `inline` wrapper around `children`.
    pub fn inline(children: Vec<Node>) -> Self {
        let content = children
            .iter()
            .filter(|child| child.kind == NodeKind::Text)
            .map(|child| child.content.as_str())
            .collect();
        Self {
            kind: NodeKind::Inline,
            content,
            children: Some(children),
            ..Self::default()
        }
    }

    /// Set the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Look up the first attribute named `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Role name of a `myst_role` node.
    pub fn role_name(&self) -> Option<&str> {
        self.meta.get("name").map(String::as_str)
    }

    /// Language tag from the fence info string (first word).
    pub fn language(&self) -> Option<&str> {
        self.info.split_whitespace().next()
    }
}
