//! Manual page backend.
//!
//! Produces roff using the `man` macro package. Requests such as `.PP` must
//! start a line, so the environment tracks whether the current output line
//! is open and handlers close it before emitting a request.

use crate::admonition::Admonition;
use crate::backend::RenderBackend;
use crate::error::RenderError;
use crate::escape::{escape_roff, guard_roff_line};
use crate::manpage_urls::{ManpageUrls, parse_reference};
use crate::node::{Node, NodeKind};
use crate::options::RenderOptions;
use crate::role::Role;
use crate::rules::Rules;

/// Manual page render backend.
///
/// Supports every base kind and the `note`, `important` and `warning`
/// containers.
#[derive(Debug, Default)]
pub struct ManpageBackend {
    manpage_urls: ManpageUrls,
    href_targets: bool,
}

/// Per-document state of [`ManpageBackend`].
#[derive(Debug, Default)]
pub struct ManpageEnv {
    /// Whether text has been written since the last newline.
    line_open: bool,
    /// Font stack (`I`, `B`); roman when empty.
    fonts: Vec<char>,
    /// Depth of indented blocks (quotes, lists, definitions, admonitions).
    indent_depth: usize,
    /// Depth of lists and definition lists.
    list_depth: usize,
    /// The next paragraph directly follows an item tag and needs no request.
    suppress_paragraph: bool,
    /// Destinations of open links.
    links: Vec<String>,
}

impl ManpageEnv {
    /// Emit a request on a line of its own.
    fn request(&mut self, request: &str) -> String {
        let mut out = self.end_line();
        out.push_str(request);
        out.push('\n');
        self.suppress_paragraph = false;
        out
    }

    fn end_line(&mut self) -> String {
        if std::mem::replace(&mut self.line_open, false) {
            "\n".to_owned()
        } else {
            String::new()
        }
    }

    /// Emit inline text, guarding a leading control character.
    fn inline(&mut self, text: String) -> String {
        let text = if self.line_open {
            text
        } else {
            guard_roff_line(&text)
        };
        self.line_open = true;
        text
    }

    fn current_font(&self) -> char {
        self.fonts.last().copied().unwrap_or('R')
    }

    fn push_font(&mut self, font: char) -> String {
        self.fonts.push(font);
        self.inline(format!("\\f{font}"))
    }

    fn pop_font(&mut self) -> String {
        self.fonts.pop();
        let font = self.current_font();
        self.inline(format!("\\f{font}"))
    }

    /// `text` in `font`, restoring the surrounding font afterwards.
    fn styled(&mut self, font: char, text: &str) -> String {
        let restore = self.current_font();
        self.inline(format!("\\f{font}{}\\f{restore}", escape_roff(text)))
    }

    fn enter_list(&mut self) -> String {
        let out = if self.list_depth > 0 {
            self.request(".RS 4")
        } else {
            self.end_line()
        };
        self.list_depth += 1;
        self.indent_depth += 1;
        out
    }

    fn leave_list(&mut self) -> String {
        self.list_depth = self.list_depth.saturating_sub(1);
        self.indent_depth = self.indent_depth.saturating_sub(1);
        if self.list_depth > 0 {
            self.request(".RE")
        } else {
            self.end_line()
        }
    }
}

impl ManpageBackend {
    /// Create a backend resolving manpage roles through `manpage_urls`.
    pub fn new(manpage_urls: ManpageUrls) -> Self {
        Self {
            manpage_urls,
            href_targets: false,
        }
    }

    /// Print link destinations after the link text.
    #[must_use]
    pub fn with_href_targets(mut self, enabled: bool) -> Self {
        self.href_targets = enabled;
        self
    }

    /// The URL table this backend was built with.
    pub fn manpage_urls(&self) -> &ManpageUrls {
        &self.manpage_urls
    }

    fn code(env: &mut ManpageEnv, content: &str) -> String {
        let mut out = env.request(".sp");
        out.push_str(".RS 4\n.nf\n");
        let body = guard_roff_line(&escape_roff(content));
        out.push_str(&body);
        if !body.is_empty() && !body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(".fi\n.RE\n");
        out
    }

    fn admonition_open(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        let admonition = Admonition::of(node).ok_or_else(|| RenderError::unsupported(node))?;
        let mut out = env.request(".sp");
        out.push_str(&format!(
            "\\fB{}:\\f{}\n.RS 4\n",
            admonition.title().to_uppercase(),
            env.current_font()
        ));
        env.indent_depth += 1;
        env.suppress_paragraph = true;
        Ok(out)
    }

    fn admonition_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        env.indent_depth = env.indent_depth.saturating_sub(1);
        Ok(env.request(".RE"))
    }
}

impl RenderBackend for ManpageBackend {
    type Env = ManpageEnv;

    fn register(rules: &mut Rules<Self>) {
        for admonition in [Admonition::Note, Admonition::Important, Admonition::Warning] {
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
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.inline(escape_roff(&node.content)))
    }

    fn paragraph_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        if std::mem::take(&mut env.suppress_paragraph) {
            return Ok(env.end_line());
        }
        Ok(if env.indent_depth > 0 {
            env.request(".sp")
        } else {
            env.request(".PP")
        })
    }

    fn paragraph_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.end_line())
    }

    fn hardbreak(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.request(".br"))
    }

    fn softbreak(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.end_line())
    }

    fn code_inline(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.styled('B', &node.content))
    }

    fn code_block(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(Self::code(env, &node.content))
    }

    fn fence(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(Self::code(env, &node.content))
    }

    fn link_open(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        env.links
            .push(node.attr("href").unwrap_or_default().to_owned());
        Ok(String::new())
    }

    fn link_close(
        &self,
        node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        let href = env
            .links
            .pop()
            .ok_or_else(|| RenderError::Malformed(format!("{} without link_open", node.kind)))?;
        // Autolinks already show their destination as the link text.
        let text_is_href = index
            .checked_sub(1)
            .and_then(|prev| nodes.get(prev))
            .is_some_and(|prev| prev.kind == NodeKind::Text && prev.content == href);
        if !self.href_targets || text_is_href || href.is_empty() {
            return Ok(String::new());
        }
        Ok(env.inline(format!(" \\(la{}\\(ra", escape_roff(&href))))
    }

    fn list_item_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        let out = env.request(".IP \\(bu 3");
        env.suppress_paragraph = true;
        Ok(out)
    }

    fn list_item_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        env.suppress_paragraph = false;
        Ok(env.end_line())
    }

    fn bullet_list_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.enter_list())
    }

    fn bullet_list_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.leave_list())
    }

    fn em_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.push_font('I'))
    }

    fn em_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.pop_font())
    }

    fn strong_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.push_font('B'))
    }

    fn strong_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.pop_font())
    }

    fn blockquote_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        let out = env.request(".RS 4");
        env.indent_depth += 1;
        env.suppress_paragraph = true;
        Ok(out)
    }

    fn blockquote_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        env.indent_depth = env.indent_depth.saturating_sub(1);
        Ok(env.request(".RE"))
    }

    fn dl_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.enter_list())
    }

    fn dl_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.leave_list())
    }

    fn dt_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.request(".TP"))
    }

    fn dt_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        Ok(env.end_line())
    }

    // Only the first description sits on the `.TP` tag line; later ones are
    // separate paragraphs.
    fn dd_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        env.suppress_paragraph = index
            .checked_sub(1)
            .and_then(|prev| nodes.get(prev))
            .is_some_and(|prev| prev.kind == NodeKind::DtClose);
        Ok(String::new())
    }

    fn dd_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        env.suppress_paragraph = false;
        Ok(env.end_line())
    }

    fn myst_role(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut ManpageEnv,
    ) -> Result<String, RenderError> {
        match Role::of(node) {
            Some(Role::Manpage) => match parse_reference(&node.content) {
                Some((name, section)) => {
                    let mut out = env.styled('B', name);
                    out.push_str(&escape_roff(&format!("({section})")));
                    if self.href_targets
                        && let Some(url) = self.manpage_urls.lookup(name, section)
                    {
                        out.push_str(&format!(" \\(la{}\\(ra", escape_roff(url)));
                    }
                    Ok(out)
                }
                None => Ok(env.styled('B', &node.content)),
            },
            Some(Role::Command | Role::Option) => Ok(env.styled('B', &node.content)),
            Some(Role::File | Role::Env | Role::Var) => Ok(env.styled('I', &node.content)),
            None => Err(RenderError::unsupported(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmark::tokens_from_markdown;
    use crate::renderer::MarkdownRenderer;
    use pretty_assertions::assert_eq;

    fn render_with(backend: ManpageBackend, nodes: &[Node]) -> String {
        MarkdownRenderer::new(backend)
            .render_document(nodes, &RenderOptions::default())
            .unwrap()
    }

    fn render(nodes: &[Node]) -> String {
        render_with(ManpageBackend::default(), nodes)
    }

    fn paragraph(children: Vec<Node>) -> Vec<Node> {
        vec![
            Node::new(NodeKind::ParagraphOpen),
            Node::inline(children),
            Node::new(NodeKind::ParagraphClose),
        ]
    }

    #[test]
    fn test_paragraph_with_emphasis() {
        let nodes = paragraph(vec![
            Node::text("Hello "),
            Node::new(NodeKind::EmOpen),
            Node::text("world"),
            Node::new(NodeKind::EmClose),
        ]);
        assert_eq!(render(&nodes), ".PP\nHello \\fIworld\\fR\n");
    }

    #[test]
    fn test_nested_fonts_restore_outer() {
        let nodes = paragraph(vec![
            Node::new(NodeKind::StrongOpen),
            Node::text("a "),
            Node::new(NodeKind::EmOpen),
            Node::text("b"),
            Node::new(NodeKind::EmClose),
            Node::new(NodeKind::StrongClose),
        ]);
        assert_eq!(render(&nodes), ".PP\n\\fBa \\fIb\\fB\\fR\n");
    }

    #[test]
    fn test_leading_dot_guarded_after_softbreak() {
        let nodes = paragraph(vec![
            Node::text("see"),
            Node::new(NodeKind::Softbreak),
            Node::text(".profile and --help"),
        ]);
        assert_eq!(render(&nodes), ".PP\nsee\n\\&.profile and \\-\\-help\n");
    }

    #[test]
    fn test_bullet_list() {
        let mut nodes = vec![Node::new(NodeKind::BulletListOpen)];
        for text in ["a", "b"] {
            nodes.push(Node::new(NodeKind::ListItemOpen));
            nodes.extend(paragraph(vec![Node::text(text)]));
            nodes.push(Node::new(NodeKind::ListItemClose));
        }
        nodes.push(Node::new(NodeKind::BulletListClose));
        assert_eq!(render(&nodes), ".IP \\(bu 3\na\n.IP \\(bu 3\nb\n");
    }

    #[test]
    fn test_nested_bullet_list_indented() {
        let out = render(&tokens_from_markdown("- a\n  - b\n- c\n"));
        assert_eq!(
            out,
            ".IP \\(bu 3\na\n.RS 4\n.IP \\(bu 3\nb\n.RE\n.IP \\(bu 3\nc\n"
        );
    }

    #[test]
    fn test_list_inside_blockquote() {
        let out = render(&tokens_from_markdown("> - a\n> - b\n"));
        assert_eq!(out, ".RS 4\n.IP \\(bu 3\na\n.IP \\(bu 3\nb\n.RE\n");
    }

    #[test]
    fn test_code_block() {
        let nodes = [Node::fence("sh", "$ ls -l\n.hidden\n")];
        assert_eq!(
            render(&nodes),
            ".sp\n.RS 4\n.nf\n$ ls \\-l\n\\&.hidden\n.fi\n.RE\n"
        );
    }

    #[test]
    fn test_definition_list() {
        let mut nodes = vec![
            Node::new(NodeKind::DlOpen),
            Node::new(NodeKind::DtOpen),
            Node::inline(vec![Node::code_inline("-v")]),
            Node::new(NodeKind::DtClose),
            Node::new(NodeKind::DdOpen),
        ];
        nodes.extend(paragraph(vec![Node::text("Verbose.")]));
        nodes.push(Node::new(NodeKind::DdClose));
        nodes.push(Node::new(NodeKind::DlClose));
        assert_eq!(render(&nodes), ".TP\n\\fB\\-v\\fR\nVerbose.\n");
    }

    #[test]
    fn test_several_descriptions_for_one_term() {
        let mut nodes = vec![
            Node::new(NodeKind::DlOpen),
            Node::new(NodeKind::DtOpen),
            Node::inline(vec![Node::text("term")]),
            Node::new(NodeKind::DtClose),
        ];
        for text in ["one", "two"] {
            nodes.push(Node::new(NodeKind::DdOpen));
            nodes.extend(paragraph(vec![Node::text(text)]));
            nodes.push(Node::new(NodeKind::DdClose));
        }
        nodes.push(Node::new(NodeKind::DlClose));
        assert_eq!(render(&nodes), ".TP\nterm\none\n.sp\ntwo\n");
    }

    #[test]
    fn test_blockquote() {
        let mut nodes = vec![Node::new(NodeKind::BlockquoteOpen)];
        nodes.extend(paragraph(vec![Node::text("a")]));
        nodes.extend(paragraph(vec![Node::text("b")]));
        nodes.push(Node::new(NodeKind::BlockquoteClose));
        assert_eq!(render(&nodes), ".RS 4\na\n.sp\nb\n.RE\n");
    }

    #[test]
    fn test_warning_container() {
        let mut nodes = vec![Node::new(NodeKind::container_open("warning"))];
        nodes.extend(paragraph(vec![Node::text("Danger")]));
        nodes.push(Node::new(NodeKind::container_close("warning")));
        assert_eq!(render(&nodes), ".sp\n\\fBWARNING:\\fR\n.RS 4\nDanger\n.RE\n");
    }

    #[test]
    fn test_tip_container_unsupported() {
        let renderer = MarkdownRenderer::new(ManpageBackend::default());
        let err = renderer
            .render_document(
                &[Node::new(NodeKind::container_open("tip"))],
                &RenderOptions::default(),
            )
            .unwrap_err();
        assert_eq!(
            err.unsupported_kind().map(ToString::to_string).as_deref(),
            Some("container_tip_open")
        );
    }

    #[test]
    fn test_link_targets() {
        let nodes = paragraph(vec![
            Node::link_open("https://nixos.org"),
            Node::text("NixOS"),
            Node::new(NodeKind::LinkClose),
            Node::text(" "),
            Node::link_open("https://nix.dev"),
            Node::text("https://nix.dev"),
            Node::new(NodeKind::LinkClose),
        ]);
        assert_eq!(render(&nodes), ".PP\nNixOS https://nix.dev\n");
        assert_eq!(
            render_with(ManpageBackend::default().with_href_targets(true), &nodes),
            ".PP\nNixOS \\(lahttps://nixos.org\\(ra https://nix.dev\n"
        );
    }

    #[test]
    fn test_roles() {
        let nodes = paragraph(vec![
            Node::role("manpage", "nix.conf(5)"),
            Node::text(" "),
            Node::role("file", "/etc/nix"),
            Node::text(" "),
            Node::role("option", "--dry-run"),
        ]);
        assert_eq!(
            render(&nodes),
            ".PP\n\\fBnix.conf\\fR(5) \\fI/etc/nix\\fR \\fB\\-\\-dry\\-run\\fR\n"
        );
    }

    #[test]
    fn test_manpage_role_target() {
        let urls = [("nix.conf(5)", "https://nixos.org/nix.conf.5")]
            .into_iter()
            .collect();
        let backend = ManpageBackend::new(urls).with_href_targets(true);
        let nodes = paragraph(vec![
            Node::role("manpage", "nix.conf(5)"),
            Node::text(" "),
            Node::role("manpage", "ls(1)"),
        ]);
        assert_eq!(
            render_with(backend, &nodes),
            ".PP\n\\fBnix.conf\\fR(5) \\(lahttps://nixos.org/nix.conf.5\\(ra \\fBls\\fR(1)\n"
        );
    }

    #[test]
    fn test_hardbreak() {
        let nodes = paragraph(vec![
            Node::text("a"),
            Node::new(NodeKind::Hardbreak),
            Node::text("b"),
        ]);
        assert_eq!(render(&nodes), ".PP\na\n.br\nb\n");
    }

    #[test]
    fn test_every_registered_kind_renders_alone() {
        let renderer = MarkdownRenderer::new(ManpageBackend::default());
        let kinds: Vec<NodeKind> = renderer.rules().kinds().cloned().collect();
        for kind in kinds {
            let node = match kind {
                NodeKind::MystRole => Node::role("command", "x"),
                kind => Node::new(kind),
            };
            let result = renderer.render_document(&[node], &RenderOptions::default());
            if let Err(err) = result {
                assert!(err.unsupported_kind().is_none(), "{err}");
            }
        }
    }
}
