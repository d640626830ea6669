//! Trait-based renderer for markdown token streams with pluggable backends.
//!
//! A parser (markdown-it, or [`tokens_from_markdown`] over pulldown-cmark)
//! produces a flat sequence of [`Node`]s. [`MarkdownRenderer`] walks that
//! sequence, dispatches every node through a [`Rules`] table to a
//! [`RenderBackend`] handler, and concatenates the returned fragments.
//!
//! # Architecture
//!
//! Every backend handler defaults to failing with
//! [`RenderError::Unsupported`], so a backend only renders what it explicitly
//! implements and never drops content silently. Bundled backends:
//! - [`CommonMarkBackend`]: normalized `CommonMark`
//! - [`ManpageBackend`]: roff `man` macros
//! - [`HtmlBackend`]: semantic HTML5
//!
//! Containers (`container_note_open`, ...) and inline roles
//! (``{manpage}`ls(1)` ``) are extension kinds that backends register
//! in [`RenderBackend::register`].
//!
//! # Example
//!
//! ```
//! use mdr_renderer::{CommonMarkBackend, MarkdownRenderer, RenderOptions, tokens_from_markdown};
//!
//! let nodes = tokens_from_markdown("Hello *world*");
//! let renderer = MarkdownRenderer::new(CommonMarkBackend::default());
//! let out = renderer
//!     .render_document(&nodes, &RenderOptions::default())
//!     .unwrap();
//! assert_eq!(out, "Hello *world*");
//! ```

mod admonition;
mod backend;
mod cmark;
mod commonmark;
mod error;
mod escape;
mod html;
mod manpage;
mod manpage_urls;
mod node;
mod options;
mod renderer;
mod role;
mod rules;

pub use admonition::Admonition;
pub use backend::RenderBackend;
pub use cmark::{parser_options, tokens_from_markdown};
pub use commonmark::{CommonMarkBackend, CommonMarkEnv};
pub use error::RenderError;
pub use escape::{
    HTML_ESCAPES, MARKDOWN_ESCAPES, ROFF_ESCAPES, escape_html, escape_markdown, escape_roff,
    guard_roff_line,
};
pub use html::HtmlBackend;
pub use manpage::{ManpageBackend, ManpageEnv};
pub use manpage_urls::{ManpageUrls, parse_reference};
pub use node::{Node, NodeKind};
pub use options::RenderOptions;
pub use renderer::MarkdownRenderer;
pub use role::Role;
pub use rules::{Handler, Rules};
