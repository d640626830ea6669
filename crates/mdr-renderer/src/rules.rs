//! Dispatch table from node kinds to handlers.

use std::collections::HashMap;
use std::fmt;

use crate::backend::RenderBackend;
use crate::error::RenderError;
use crate::node::{Node, NodeKind};
use crate::options::RenderOptions;

/// Handler for one node kind.
///
/// Arguments: backend, node, full sequence, index of the node in that
/// sequence, render options, per-render environment.
pub type Handler<B> = fn(
    &B,
    &Node,
    &[Node],
    usize,
    &RenderOptions,
    &mut <B as RenderBackend>::Env,
) -> Result<String, RenderError>;

/// Mapping from node kind to handler.
///
/// Built once per renderer: [`Rules::base`] binds every base kind to the
/// matching [`RenderBackend`] method, then [`RenderBackend::register`] adds
/// extension kinds or overrides. The table is not modified while rendering.
pub struct Rules<B: RenderBackend> {
    handlers: HashMap<NodeKind, Handler<B>>,
}

impl<B: RenderBackend> Rules<B> {
    /// Empty table; every kind is unsupported.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table binding every base kind to its [`RenderBackend`] method.
    #[must_use]
    pub fn base() -> Self {
        let entries: [(NodeKind, Handler<B>); 27] = [
            (NodeKind::Text, B::text),
            (NodeKind::ParagraphOpen, B::paragraph_open),
            (NodeKind::ParagraphClose, B::paragraph_close),
            (NodeKind::Hardbreak, B::hardbreak),
            (NodeKind::Softbreak, B::softbreak),
            (NodeKind::CodeInline, B::code_inline),
            (NodeKind::CodeBlock, B::code_block),
            (NodeKind::Fence, B::fence),
            (NodeKind::LinkOpen, B::link_open),
            (NodeKind::LinkClose, B::link_close),
            (NodeKind::ListItemOpen, B::list_item_open),
            (NodeKind::ListItemClose, B::list_item_close),
            (NodeKind::BulletListOpen, B::bullet_list_open),
            (NodeKind::BulletListClose, B::bullet_list_close),
            (NodeKind::EmOpen, B::em_open),
            (NodeKind::EmClose, B::em_close),
            (NodeKind::StrongOpen, B::strong_open),
            (NodeKind::StrongClose, B::strong_close),
            (NodeKind::BlockquoteOpen, B::blockquote_open),
            (NodeKind::BlockquoteClose, B::blockquote_close),
            (NodeKind::DlOpen, B::dl_open),
            (NodeKind::DlClose, B::dl_close),
            (NodeKind::DtOpen, B::dt_open),
            (NodeKind::DtClose, B::dt_close),
            (NodeKind::DdOpen, B::dd_open),
            (NodeKind::DdClose, B::dd_close),
            (NodeKind::MystRole, B::myst_role),
        ];
        Self {
            handlers: entries.into_iter().collect(),
        }
    }

    /// Register a handler, returning the one it replaces.
    pub fn insert(&mut self, kind: NodeKind, handler: Handler<B>) -> Option<Handler<B>> {
        self.handlers.insert(kind, handler)
    }

    /// Register an open/close pair for the extension container `name`.
    pub fn insert_container(&mut self, name: &str, open: Handler<B>, close: Handler<B>) {
        self.handlers.insert(NodeKind::container_open(name), open);
        self.handlers.insert(NodeKind::container_close(name), close);
    }

    /// Remove a handler so the kind becomes unsupported.
    pub fn remove(&mut self, kind: &NodeKind) -> Option<Handler<B>> {
        self.handlers.remove(kind)
    }

    /// Handler registered for `kind`.
    pub fn get(&self, kind: &NodeKind) -> Option<Handler<B>> {
        self.handlers.get(kind).copied()
    }

    /// Whether a handler is registered for `kind`.
    pub fn contains(&self, kind: &NodeKind) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Registered kinds, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &NodeKind> + '_ {
        self.handlers.keys()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke the handler for `nodes[index]`.
    ///
    /// Fails with [`RenderError::Unsupported`] when no handler is registered.
    pub fn dispatch(
        &self,
        backend: &B,
        nodes: &[Node],
        index: usize,
        options: &RenderOptions,
        env: &mut B::Env,
    ) -> Result<String, RenderError> {
        let node = &nodes[index];
        let handler = self
            .get(&node.kind)
            .ok_or_else(|| RenderError::unsupported(node))?;
        handler(backend, node, nodes, index, options, env)
    }
}

impl<B: RenderBackend> Default for Rules<B> {
    fn default() -> Self {
        Self::base()
    }
}

impl<B: RenderBackend> Clone for Rules<B> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<B: RenderBackend> fmt::Debug for Rules<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.handlers.keys().map(NodeKind::identifier).collect();
        kinds.sort();
        f.debug_struct("Rules").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl RenderBackend for Echo {
        type Env = Vec<usize>;

        fn text(
            &self,
            node: &Node,
            _nodes: &[Node],
            index: usize,
            _options: &RenderOptions,
            env: &mut Vec<usize>,
        ) -> Result<String, RenderError> {
            env.push(index);
            Ok(node.content.clone())
        }
    }

    fn shout(
        _backend: &Echo,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut Vec<usize>,
    ) -> Result<String, RenderError> {
        Ok(node.content.to_uppercase())
    }

    #[test]
    fn test_base_covers_catalogue() {
        let rules = Rules::<Echo>::base();
        assert_eq!(rules.len(), 27);
        assert!(rules.kinds().all(NodeKind::is_base));
        assert!(!rules.contains(&NodeKind::Inline));
    }

    #[test]
    fn test_dispatch_passes_index_and_env() {
        let rules = Rules::<Echo>::base();
        let nodes = [Node::text("a"), Node::text("b")];
        let mut env = Vec::new();
        let out = rules
            .dispatch(&Echo, &nodes, 1, &RenderOptions::default(), &mut env)
            .unwrap();
        assert_eq!(out, "b");
        assert_eq!(env, vec![1]);
    }

    #[test]
    fn test_default_method_is_unsupported() {
        let rules = Rules::<Echo>::base();
        let nodes = [Node::new(NodeKind::EmOpen)];
        let err = rules
            .dispatch(&Echo, &nodes, 0, &RenderOptions::default(), &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.unsupported_kind(), Some(&NodeKind::EmOpen));
    }

    #[test]
    fn test_unregistered_kind_is_unsupported() {
        let rules = Rules::<Echo>::empty();
        let nodes = [Node::text("a")];
        let err = rules
            .dispatch(&Echo, &nodes, 0, &RenderOptions::default(), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::Unsupported { .. }));
    }

    #[test]
    fn test_override_and_remove() {
        let mut rules = Rules::<Echo>::base();
        assert!(rules.insert(NodeKind::Text, shout).is_some());
        let nodes = [Node::text("quiet")];
        let out = rules
            .dispatch(&Echo, &nodes, 0, &RenderOptions::default(), &mut Vec::new())
            .unwrap();
        assert_eq!(out, "QUIET");

        rules.remove(&NodeKind::Text);
        assert!(!rules.contains(&NodeKind::Text));
    }

    #[test]
    fn test_insert_container_registers_pair() {
        let mut rules = Rules::<Echo>::empty();
        rules.insert_container("note", shout, shout);
        assert!(rules.contains(&NodeKind::container_open("note")));
        assert!(rules.contains(&NodeKind::container_close("note")));
        assert!(!rules.contains(&NodeKind::container_open("tip")));
    }

    #[test]
    fn test_debug_lists_sorted_kinds() {
        let mut rules = Rules::<Echo>::empty();
        rules.insert(NodeKind::Text, shout);
        rules.insert(NodeKind::EmOpen, shout);
        assert_eq!(
            format!("{rules:?}"),
            r#"Rules { kinds: ["em_open", "text"] }"#
        );
    }
}
