//! HTML backend for markdown rendering.
//!
//! Produces semantic HTML5 output suitable for web display.
//!
//! Recognized render options:
//! - `lang_prefix`: class prefix for fenced code languages (default `language-`)
//! - `xhtml_out`: emit self-closing `<br />` instead of `<br>`

use crate::admonition::Admonition;
use crate::backend::RenderBackend;
use crate::error::RenderError;
use crate::escape::escape_html;
use crate::manpage_urls::{ManpageUrls, parse_reference};
use crate::node::{Node, NodeKind};
use crate::options::RenderOptions;
use crate::role::Role;
use crate::rules::Rules;

const DEFAULT_LANG_PREFIX: &str = "language-";

/// HTML render backend.
///
/// Produces semantic HTML5 with:
/// - `<pre><code>` for code blocks
/// - `<blockquote>` for blockquotes
/// - `<div class="admonition ...">` for all admonition containers
/// - manpage roles linked through the URL table
#[derive(Debug, Default)]
pub struct HtmlBackend {
    manpage_urls: ManpageUrls,
}

impl HtmlBackend {
    /// Create a backend resolving manpage roles through `manpage_urls`.
    pub fn new(manpage_urls: ManpageUrls) -> Self {
        Self { manpage_urls }
    }

    fn admonition_open(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        let admonition = Admonition::of(node).ok_or_else(|| RenderError::unsupported(node))?;
        Ok(format!(
            r#"<div class="admonition {}"><p class="admonition-title">{}</p>"#,
            admonition.name(),
            admonition.title()
        ))
    }

    fn admonition_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</div>".to_owned())
    }

    fn manpage_reference(&self, reference: &str) -> String {
        let span = format!(
            r#"<span class="manpage">{}</span>"#,
            escape_html(reference)
        );
        let url = parse_reference(reference)
            .and_then(|(name, section)| self.manpage_urls.lookup(name, section));
        match url {
            Some(url) => format!(
                r#"<a class="manpage-reference" href="{}">{span}</a>"#,
                escape_html(url)
            ),
            None => span,
        }
    }
}

fn code_block(lang: Option<&str>, content: &str, options: &RenderOptions) -> String {
    match lang {
        Some(lang) => {
            let prefix = options.get("lang_prefix").unwrap_or(DEFAULT_LANG_PREFIX);
            format!(
                r#"<pre><code class="{}{}">{}</code></pre>"#,
                escape_html(prefix),
                escape_html(lang),
                escape_html(content)
            )
        }
        None => format!("<pre><code>{}</code></pre>", escape_html(content)),
    }
}

/// Block opening tag, on a new line when it follows a hidden paragraph.
fn block_open(nodes: &[Node], index: usize, tag: &str) -> String {
    let after_hidden = index
        .checked_sub(1)
        .and_then(|prev| nodes.get(prev))
        .is_some_and(|prev| prev.hidden);
    if after_hidden {
        format!("\n{tag}")
    } else {
        tag.to_owned()
    }
}

/// Item opening tag, kept on the content line for tight items.
fn item_open(nodes: &[Node], index: usize, tag: &str) -> String {
    let tight = nodes
        .get(index + 1)
        .is_none_or(|next| next.hidden || next.kind == NodeKind::Inline);
    let tag = block_open(nodes, index, tag);
    if tight { tag } else { tag + "\n" }
}

impl RenderBackend for HtmlBackend {
    type Env = ();

    fn register(rules: &mut Rules<Self>) {
        for admonition in Admonition::ALL {
            rules.insert_container(
                admonition.name(),
                Self::admonition_open,
                Self::admonition_close,
            );
        }
    }

    fn text(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(escape_html(&node.content))
    }

    fn paragraph_open(
        &self,
        node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        if node.hidden {
            return Ok(String::new());
        }
        Ok(block_open(nodes, index, "<p>"))
    }

    fn paragraph_close(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(if node.hidden { "" } else { "</p>\n" }.to_owned())
    }

    fn hardbreak(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        let br = if options.flag("xhtml_out") { "<br />" } else { "<br>" };
        Ok(format!("{br}\n"))
    }

    fn softbreak(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("\n".to_owned())
    }

    fn code_inline(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(format!("<code>{}</code>", escape_html(&node.content)))
    }

    fn code_block(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(code_block(None, &node.content, options) + "\n")
    }

    fn fence(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(code_block(node.language(), &node.content, options) + "\n")
    }

    fn link_open(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        let href = escape_html(node.attr("href").unwrap_or_default());
        Ok(match node.attr("title") {
            Some(title) => format!(r#"<a href="{href}" title="{}">"#, escape_html(title)),
            None => format!(r#"<a href="{href}">"#),
        })
    }

    fn link_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</a>".to_owned())
    }

    fn list_item_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(item_open(nodes, index, "<li>"))
    }

    fn list_item_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</li>\n".to_owned())
    }

    fn bullet_list_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(block_open(nodes, index, "<ul>\n"))
    }

    fn bullet_list_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</ul>\n".to_owned())
    }

    fn em_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("<em>".to_owned())
    }

    fn em_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</em>".to_owned())
    }

    fn strong_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("<strong>".to_owned())
    }

    fn strong_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</strong>".to_owned())
    }

    fn blockquote_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(block_open(nodes, index, "<blockquote>\n"))
    }

    fn blockquote_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</blockquote>\n".to_owned())
    }

    fn dl_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(block_open(nodes, index, "<dl>\n"))
    }

    fn dl_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</dl>\n".to_owned())
    }

    fn dt_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(block_open(nodes, index, "<dt>"))
    }

    fn dt_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</dt>\n".to_owned())
    }

    fn dd_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok(item_open(nodes, index, "<dd>"))
    }

    fn dd_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        Ok("</dd>\n".to_owned())
    }

    fn myst_role(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut (),
    ) -> Result<String, RenderError> {
        match Role::of(node) {
            Some(Role::Manpage) => Ok(self.manpage_reference(&node.content)),
            Some(role) => Ok(format!(
                r#"<code class="role-{}">{}</code>"#,
                role.name(),
                escape_html(&node.content)
            )),
            None => Err(RenderError::unsupported(node)),
        }
    }
}
