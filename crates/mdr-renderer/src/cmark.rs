//! Markdown front end producing the node model from pulldown-cmark events.
//!
//! Block tags become `_open`/`_close` pairs and each run of inline events is
//! gathered into one `inline` node. Inline runs that sit directly inside a
//! list item or definition (tight lists) are wrapped in a paragraph.
//!
//! Constructs the bundled backends do not render (headings, ordered lists,
//! images, rules, raw HTML) map to [`NodeKind::Other`] so they fail loudly at
//! render time instead of disappearing.

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::admonition::Admonition;
use crate::node::{Node, NodeKind};

/// Parser options used by [`tokens_from_markdown`].
pub fn parser_options() -> Options {
    Options::ENABLE_DEFINITION_LIST | Options::ENABLE_GFM
}

/// Parse `markdown` into a flat block-level node sequence.
///
/// # Example
///
/// ```
/// use mdr_renderer::tokens_from_markdown;
///
/// let nodes = tokens_from_markdown("Hello *world*");
/// let kinds: Vec<_> = nodes.iter().map(|n| n.kind.identifier()).collect();
/// assert_eq!(kinds, ["paragraph_open", "inline", "paragraph_close"]);
/// assert_eq!(nodes[1].children.as_ref().map(Vec::len), Some(4));
/// ```
pub fn tokens_from_markdown(markdown: &str) -> Vec<Node> {
    let mut builder = TokenBuilder::default();
    for event in Parser::new_ext(markdown, parser_options()) {
        builder.event(event);
    }
    builder.finish()
}

/// Open block awaiting its close node.
struct Frame {
    close: NodeKind,
    /// Whether inline runs belong directly to this block.
    holds_inline: bool,
}

#[derive(Default)]
struct TokenBuilder {
    nodes: Vec<Node>,
    frames: Vec<Frame>,
    inline: Vec<Node>,
    /// Code or HTML block collecting its text.
    leaf: Option<Node>,
    /// Image collecting its alt text.
    image: Option<Node>,
}

impl TokenBuilder {
    fn event(&mut self, event: Event<'_>) {
        if self.image.is_some() {
            self.image_event(event);
            return;
        }
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match &mut self.leaf {
                Some(leaf) => leaf.content.push_str(&text),
                None => self.push_text(&text),
            },
            Event::Code(code) => self.push_code(&code),
            Event::Html(html) => match &mut self.leaf {
                Some(leaf) => leaf.content.push_str(&html),
                None => self.push_inline(other("html_inline").with_content(html.to_string())),
            },
            Event::InlineHtml(html) => {
                self.push_inline(other("html_inline").with_content(html.to_string()));
            }
            Event::SoftBreak => self.push_inline(Node::new(NodeKind::Softbreak)),
            Event::HardBreak => self.push_inline(Node::new(NodeKind::Hardbreak)),
            Event::Rule => {
                self.flush_inline();
                self.push_block(other("hr").with_content("---"));
            }
            Event::InlineMath(math) => {
                self.push_inline(other("math_inline").with_content(math.to_string()));
            }
            Event::DisplayMath(math) => {
                self.push_inline(other("math_block").with_content(math.to_string()));
            }
            Event::FootnoteReference(label) => {
                self.push_inline(other("footnote_ref").with_content(label.to_string()));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x]" } else { "[ ]" };
                self.push_inline(other("task_list_marker").with_content(marker));
            }
        }
    }

    fn image_event(&mut self, event: Event<'_>) {
        match event {
            Event::End(TagEnd::Image) => {
                if let Some(image) = self.image.take() {
                    self.push_inline(image);
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(image) = &mut self.image {
                    image.content.push_str(&text);
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open(NodeKind::ParagraphOpen, NodeKind::ParagraphClose, true),
            Tag::Heading { level, .. } => {
                self.flush_inline();
                let markup = "#".repeat(level as usize);
                self.push_block(other("heading_open").with_attr("level", markup.len().to_string()));
                self.frames.push(Frame {
                    close: NodeKind::Other("heading_close".to_owned()),
                    holds_inline: true,
                });
                if let Some(node) = self.nodes.last_mut() {
                    node.markup = markup;
                }
            }
            Tag::BlockQuote(None) => {
                self.open(NodeKind::BlockquoteOpen, NodeKind::BlockquoteClose, false);
            }
            Tag::BlockQuote(Some(kind)) => {
                let name = Admonition::from(kind).name();
                self.open(
                    NodeKind::container_open(name),
                    NodeKind::container_close(name),
                    false,
                );
            }
            Tag::CodeBlock(kind) => {
                self.flush_inline();
                let mut node = match kind {
                    CodeBlockKind::Fenced(info) => Node::fence(info.to_string(), ""),
                    CodeBlockKind::Indented => Node::new(NodeKind::CodeBlock),
                };
                node.level = self.depth();
                self.leaf = Some(node);
            }
            Tag::HtmlBlock => {
                self.flush_inline();
                self.leaf = Some(other("html_block"));
            }
            Tag::List(None) => {
                self.open(NodeKind::BulletListOpen, NodeKind::BulletListClose, false);
            }
            Tag::List(Some(start)) => {
                self.flush_inline();
                self.push_block(other("ordered_list_open").with_attr("start", start.to_string()));
                self.frames.push(Frame {
                    close: other_kind("ordered_list_close"),
                    holds_inline: false,
                });
            }
            Tag::Item => self.open(NodeKind::ListItemOpen, NodeKind::ListItemClose, false),
            Tag::DefinitionList => self.open(NodeKind::DlOpen, NodeKind::DlClose, false),
            Tag::DefinitionListTitle => self.open(NodeKind::DtOpen, NodeKind::DtClose, true),
            Tag::DefinitionListDefinition => self.open(NodeKind::DdOpen, NodeKind::DdClose, false),
            Tag::Table(_) => self.open(other_kind("table_open"), other_kind("table_close"), false),
            Tag::TableHead => self.open(other_kind("thead_open"), other_kind("thead_close"), false),
            Tag::TableRow => self.open(other_kind("tr_open"), other_kind("tr_close"), false),
            Tag::TableCell => self.open(other_kind("td_open"), other_kind("td_close"), true),
            Tag::FootnoteDefinition(label) => {
                self.flush_inline();
                self.push_block(other("footnote_open").with_attr("label", label.to_string()));
                self.frames.push(Frame {
                    close: other_kind("footnote_close"),
                    holds_inline: false,
                });
            }
            Tag::MetadataBlock(_) => {
                self.flush_inline();
                self.leaf = Some(other("front_matter"));
            }
            Tag::Emphasis => self.push_inline(Node::new(NodeKind::EmOpen)),
            Tag::Strong => self.push_inline(Node::new(NodeKind::StrongOpen)),
            Tag::Strikethrough => self.push_inline(other("s_open")),
            Tag::Superscript => self.push_inline(other("sup_open")),
            Tag::Subscript => self.push_inline(other("sub_open")),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let mut node = Node::link_open(dest_url.to_string());
                if !title.is_empty() {
                    node = node.with_attr("title", title.to_string());
                }
                if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    node.markup = "autolink".to_owned();
                    node.info = "auto".to_owned();
                }
                self.push_inline(node);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut image = other("image").with_attr("src", dest_url.to_string());
                if !title.is_empty() {
                    image = image.with_attr("title", title.to_string());
                }
                self.image = Some(image);
            }
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Emphasis => self.push_inline(Node::new(NodeKind::EmClose)),
            TagEnd::Strong => self.push_inline(Node::new(NodeKind::StrongClose)),
            TagEnd::Strikethrough => self.push_inline(other("s_close")),
            TagEnd::Superscript => self.push_inline(other("sup_close")),
            TagEnd::Subscript => self.push_inline(other("sub_close")),
            TagEnd::Link => self.push_inline(Node::new(NodeKind::LinkClose)),
            // Alt text is consumed by `image_event`.
            TagEnd::Image => {}
            TagEnd::CodeBlock | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {
                if let Some(leaf) = self.leaf.take() {
                    self.nodes.push(leaf);
                }
            }
            _ => self.close(),
        }
    }

    fn open(&mut self, open: NodeKind, close: NodeKind, holds_inline: bool) {
        self.flush_inline();
        self.push_block(Node::new(open));
        self.frames.push(Frame {
            close,
            holds_inline,
        });
    }

    fn close(&mut self) {
        self.flush_inline();
        if let Some(frame) = self.frames.pop() {
            self.push_block(Node::new(frame.close));
        }
    }

    fn depth(&self) -> u32 {
        u32::try_from(self.frames.len()).unwrap_or(u32::MAX)
    }

    fn push_block(&mut self, mut node: Node) {
        node.level = self.depth();
        self.nodes.push(node);
    }

    fn push_inline(&mut self, node: Node) {
        self.inline.push(node);
    }

    /// Append text, merging with a preceding text node.
    fn push_text(&mut self, text: &str) {
        if let Some(last) = self.inline.last_mut()
            && last.kind == NodeKind::Text
        {
            last.content.push_str(text);
            return;
        }
        self.inline.push(Node::text(text));
    }

    /// Push a code span, turning it into a role when the preceding text ends
    /// in `{name}`.
    fn push_code(&mut self, code: &str) {
        let role = match self.inline.last_mut() {
            Some(last) if last.kind == NodeKind::Text => take_role_name(&mut last.content),
            _ => None,
        };
        match role {
            Some(name) => {
                if self.inline.last().is_some_and(|n| n.content.is_empty()) {
                    self.inline.pop();
                }
                self.inline.push(Node::role(name, code));
            }
            None => self.inline.push(Node::code_inline(code)),
        }
    }

    fn flush_inline(&mut self) {
        if self.inline.is_empty() {
            return;
        }
        let children = std::mem::take(&mut self.inline);
        let wrap = !self.frames.last().is_some_and(|frame| frame.holds_inline);
        if wrap {
            self.push_block(hidden(NodeKind::ParagraphOpen));
        }
        let mut inline = Node::inline(children);
        inline.level = self.depth() + u32::from(wrap);
        self.nodes.push(inline);
        if wrap {
            self.push_block(hidden(NodeKind::ParagraphClose));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_inline();
        while !self.frames.is_empty() {
            self.close();
        }
        self.nodes
    }
}

/// Paragraph marker of a tight item; the HTML output drops it.
fn hidden(kind: NodeKind) -> Node {
    Node {
        hidden: true,
        ..Node::new(kind)
    }
}

fn other(name: &str) -> Node {
    Node::new(other_kind(name))
}

fn other_kind(name: &str) -> NodeKind {
    NodeKind::Other(name.to_owned())
}

/// Strip a trailing `{name}` from `text`, returning the name.
fn take_role_name(text: &mut String) -> Option<String> {
    let body = text.strip_suffix('}')?;
    let start = body.rfind('{')?;
    let name = &body[start + 1..];
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    let name = name.to_owned();
    text.truncate(start);
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|n| n.kind.identifier()).collect()
    }

    fn inline_kinds(node: &Node) -> Vec<String> {
        kinds(node.children.as_deref().unwrap_or_default())
    }

    #[test]
    fn test_paragraph_with_emphasis() {
        let nodes = tokens_from_markdown("Hello *world*\n");
        assert_eq!(kinds(&nodes), ["paragraph_open", "inline", "paragraph_close"]);
        assert_eq!(
            inline_kinds(&nodes[1]),
            ["text", "em_open", "text", "em_close"]
        );
        assert_eq!(nodes[1].content, "Hello world");
    }

    #[test]
    fn test_adjacent_text_merged() {
        let nodes = tokens_from_markdown("a [b c\n");
        let children = nodes[1].children.as_deref().unwrap_or_default();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].content, "a [b c");
    }

    #[test]
    fn test_fence_and_indented_code() {
        let nodes = tokens_from_markdown("```nix\n{ }\n```\n\n    plain\n");
        assert_eq!(kinds(&nodes), ["fence", "code_block"]);
        assert_eq!(nodes[0].info, "nix");
        assert_eq!(nodes[0].content, "{ }\n");
        assert_eq!(nodes[1].content, "plain\n");
    }

    #[test]
    fn test_tight_list_items_wrapped_in_paragraph() {
        let nodes = tokens_from_markdown("- a\n- b\n");
        assert_eq!(
            kinds(&nodes),
            [
                "bullet_list_open",
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "list_item_close",
                "list_item_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "list_item_close",
                "bullet_list_close",
            ]
        );
        assert_eq!(nodes[1].level, 1);
        assert!(nodes[2].hidden && nodes[4].hidden);
        assert!(!nodes[1].hidden);
    }

    #[test]
    fn test_loose_list_paragraphs_not_hidden() {
        let nodes = tokens_from_markdown("- a\n\n- b\n");
        assert_eq!(nodes[2].kind, NodeKind::ParagraphOpen);
        assert!(!nodes[2].hidden);
    }

    #[test]
    fn test_definition_list() {
        let nodes = tokens_from_markdown("term\n: definition\n");
        assert_eq!(
            kinds(&nodes),
            [
                "dl_open",
                "dt_open",
                "inline",
                "dt_close",
                "dd_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "dd_close",
                "dl_close",
            ]
        );
    }

    #[test]
    fn test_alert_becomes_container() {
        let nodes = tokens_from_markdown("> [!WARNING]\n> Careful\n");
        assert_eq!(
            kinds(&nodes),
            [
                "container_warning_open",
                "paragraph_open",
                "inline",
                "paragraph_close",
                "container_warning_close",
            ]
        );
        let nodes = tokens_from_markdown("> quoted\n");
        assert_eq!(nodes[0].kind, NodeKind::BlockquoteOpen);
    }

    #[test]
    fn test_role_detection() {
        let nodes = tokens_from_markdown("See {manpage}`nix.conf(5)` and `ls`.\n");
        let children = nodes[1].children.as_deref().unwrap_or_default();
        assert_eq!(
            kinds(children),
            ["text", "myst_role", "text", "code_inline", "text"]
        );
        assert_eq!(children[0].content, "See ");
        assert_eq!(children[1].role_name(), Some("manpage"));
        assert_eq!(children[1].content, "nix.conf(5)");
    }

    #[test]
    fn test_role_at_start_drops_empty_text() {
        let nodes = tokens_from_markdown("{command}`ls`\n");
        assert_eq!(inline_kinds(&nodes[1]), ["myst_role"]);
    }

    #[test]
    fn test_braces_without_role_name_stay_text() {
        let nodes = tokens_from_markdown("{a b}`x`\n");
        assert_eq!(inline_kinds(&nodes[1]), ["text", "code_inline"]);
    }

    #[test]
    fn test_links() {
        let nodes = tokens_from_markdown("[NixOS](https://nixos.org \"Home\") <https://nix.dev>\n");
        let children = nodes[1].children.as_deref().unwrap_or_default();
        assert_eq!(children[0].attr("href"), Some("https://nixos.org"));
        assert_eq!(children[0].attr("title"), Some("Home"));
        let auto = children
            .iter()
            .filter(|n| n.kind == NodeKind::LinkOpen)
            .nth(1)
            .map(|n| n.markup.as_str());
        assert_eq!(auto, Some("autolink"));
    }

    #[test]
    fn test_unrendered_constructs_map_to_other() {
        let nodes = tokens_from_markdown("# Title\n\n1. one\n\n---\n\n![alt *text*](a.png)\n");
        let ids = kinds(&nodes);
        assert_eq!(ids[0], "heading_open");
        assert!(ids.contains(&"ordered_list_open".to_owned()));
        assert!(ids.contains(&"hr".to_owned()));
        let image = nodes
            .iter()
            .filter_map(|n| n.children.as_deref())
            .flatten()
            .find(|n| n.kind.identifier() == "image");
        assert_eq!(image.map(|n| n.content.as_str()), Some("alt text"));
        assert_eq!(image.and_then(|n| n.attr("src")), Some("a.png"));
    }

    #[test]
    fn test_hard_and_soft_breaks() {
        let nodes = tokens_from_markdown("a  \nb\nc\n");
        assert_eq!(
            inline_kinds(&nodes[1]),
            ["text", "hardbreak", "text", "softbreak", "text"]
        );
    }
}
