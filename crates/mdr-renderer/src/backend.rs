//! Render backend trait for format-specific rendering.
//!
//! Every base node kind has one handler method. All of them default to
//! failing with [`RenderError::Unsupported`], so a backend supports exactly
//! the kinds it overrides and anything else aborts the render instead of
//! silently disappearing from the output.

use crate::error::RenderError;
use crate::node::Node;
use crate::options::RenderOptions;
use crate::rules::Rules;

/// Declares handler methods that fail with [`RenderError::Unsupported`]
/// unless the backend overrides them.
macro_rules! unsupported_by_default {
    ($($(#[$doc:meta])* $name:ident,)*) => {
        $(
            $(#[$doc])*
            fn $name(
                &self,
                node: &Node,
                _nodes: &[Node],
                _index: usize,
                _options: &RenderOptions,
                _env: &mut Self::Env,
            ) -> Result<String, RenderError> {
                Err(RenderError::unsupported(node))
            }
        )*
    };
}

/// Backend trait for format-specific rendering operations.
///
/// Handlers receive the node, the whole sequence it belongs to and its index
/// (for lookahead and lookbehind), the render options and the per-render
/// environment. They return the output fragment for that node.
///
/// Open and close markers are separate handlers, so a backend can push state
/// into the environment on open and pop it on close.
///
/// # Example
///
/// ```
/// use mdr_renderer::{MarkdownRenderer, Node, NodeKind, RenderBackend, RenderError, RenderOptions};
///
/// struct Plain;
///
/// impl RenderBackend for Plain {
///     type Env = ();
///
///     fn text(
///         &self,
///         node: &Node,
///         _nodes: &[Node],
///         _index: usize,
///         _options: &RenderOptions,
///         _env: &mut (),
///     ) -> Result<String, RenderError> {
///         Ok(node.content.clone())
///     }
/// }
///
/// let renderer = MarkdownRenderer::new(Plain);
/// let nodes = [Node::inline(vec![Node::text("hi")])];
/// assert_eq!(renderer.render_document(&nodes, &RenderOptions::default()).unwrap(), "hi");
///
/// let nodes = [Node::new(NodeKind::ParagraphOpen)];
/// assert!(renderer.render_document(&nodes, &RenderOptions::default()).is_err());
/// ```
pub trait RenderBackend: Sized {
    /// Mutable state shared by all handlers during one top-level render.
    ///
    /// A fresh value is created for every document.
    type Env: Default;

    /// Register extension handlers (containers, custom kinds) or override
    /// base entries.
    ///
    /// Called once when the renderer is constructed.
    fn register(_rules: &mut Rules<Self>) {}

    unsupported_by_default! {
        /// Plain text run.
        text,
        paragraph_open,
        paragraph_close,
        /// Hard line break.
        hardbreak,
        /// Soft line break.
        softbreak,
        /// Inline code span.
        code_inline,
        /// Indented code block.
        code_block,
        /// Fenced code block; language in [`Node::info`].
        fence,
        /// Link start; target in the `href` attribute, optional `title`.
        link_open,
        /// Link end.
        link_close,
        list_item_open,
        list_item_close,
        bullet_list_open,
        bullet_list_close,
        em_open,
        em_close,
        strong_open,
        strong_close,
        blockquote_open,
        blockquote_close,
        /// Definition list start.
        dl_open,
        dl_close,
        /// Definition term start.
        dt_open,
        dt_close,
        /// Definition description start.
        dd_open,
        dd_close,
        /// Inline role; name from [`Node::role_name`], argument in `content`.
        myst_role,
    }
}
