//! Traversal engine: walks a node sequence and dispatches every node.

use crate::backend::RenderBackend;
use crate::error::RenderError;
use crate::node::{Node, NodeKind};
use crate::options::RenderOptions;
use crate::rules::{Handler, Rules};

/// Generic renderer with pluggable backend.
///
/// Owns the backend and its dispatch table. The engine knows nothing about
/// output formats: it separates block from inline context, looks up a handler
/// per node and concatenates the fragments in sequence order.
///
/// The renderer holds no per-document state, so one instance can render any
/// number of documents (also from several threads, each with its own
/// environment).
#[derive(Debug)]
pub struct MarkdownRenderer<B: RenderBackend> {
    backend: B,
    rules: Rules<B>,
}

impl<B: RenderBackend> MarkdownRenderer<B> {
    /// Create a renderer, building the dispatch table from the backend.
    pub fn new(backend: B) -> Self {
        let mut rules = Rules::base();
        B::register(&mut rules);
        Self { backend, rules }
    }

    /// Register an additional handler or replace an existing one.
    #[must_use]
    pub fn with_rule(mut self, kind: NodeKind, handler: Handler<B>) -> Self {
        self.rules.insert(kind, handler);
        self
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The dispatch table.
    pub fn rules(&self) -> &Rules<B> {
        &self.rules
    }

    /// Render a top-level (block context) sequence.
    ///
    /// `inline` nodes are replaced by the inline rendering of their children;
    /// every other node goes through the dispatch table.
    pub fn render(
        &self,
        nodes: &[Node],
        options: &RenderOptions,
        env: &mut B::Env,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        for (index, node) in nodes.iter().enumerate() {
            if node.kind == NodeKind::Inline {
                let children = node.children.as_deref().ok_or_else(|| {
                    RenderError::Malformed(format!("inline node at index {index} has no children"))
                })?;
                out.push_str(&self.render_inline(children, options, env)?);
            } else {
                out.push_str(&self.rules.dispatch(&self.backend, nodes, index, options, env)?);
            }
        }
        Ok(out)
    }

    /// Render the children of an `inline` node.
    ///
    /// Every node is dispatched directly; inline sequences do not nest.
    pub fn render_inline(
        &self,
        nodes: &[Node],
        options: &RenderOptions,
        env: &mut B::Env,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        for index in 0..nodes.len() {
            out.push_str(&self.rules.dispatch(&self.backend, nodes, index, options, env)?);
        }
        Ok(out)
    }

    /// Render one document with a fresh environment.
    pub fn render_document(
        &self,
        nodes: &[Node],
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        tracing::debug!(node_count = nodes.len(), "Rendering document");
        let mut env = B::Env::default();
        match self.render(nodes, options, &mut env) {
            Ok(out) => {
                tracing::debug!(output_len = out.len(), "Rendered document");
                Ok(out)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Render aborted");
                Err(e)
            }
        }
    }
}

impl<B: RenderBackend + Default> Default for MarkdownRenderer<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
