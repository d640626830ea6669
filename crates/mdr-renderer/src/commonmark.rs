//! CommonMark backend.
//!
//! Renders the token stream back to normalized CommonMark, with roles
//! lowered to plain Markdown and admonitions written as quoted blocks.

use crate::admonition::Admonition;
use crate::backend::RenderBackend;
use crate::error::RenderError;
use crate::escape::escape_markdown;
use crate::manpage_urls::{ManpageUrls, parse_reference};
use crate::node::{Node, NodeKind};
use crate::options::RenderOptions;
use crate::role::Role;
use crate::rules::Rules;

/// CommonMark render backend.
///
/// Supports every base kind and the `note`, `important` and `warning`
/// containers.
#[derive(Debug, Default)]
pub struct CommonMarkBackend {
    manpage_urls: ManpageUrls,
}

/// Per-document state of [`CommonMarkBackend`].
#[derive(Debug, Default)]
pub struct CommonMarkEnv {
    /// Continuation prefix per open container (`"> "`, `"  "`).
    prefixes: Vec<&'static str>,
    /// Whether a block has already been written in the current container.
    block_started: bool,
    /// One entry per open list: whether an item has been written.
    lists: Vec<bool>,
    /// Destination and title of every open link.
    links: Vec<(String, Option<String>)>,
}

impl CommonMarkEnv {
    fn prefix(&self) -> String {
        self.prefixes.concat()
    }

    /// Blank line before a block unless it is the first in its container.
    fn block_break(&mut self) -> String {
        if std::mem::replace(&mut self.block_started, true) {
            let prefix = self.prefix();
            format!("\n{}\n{prefix}", prefix.trim_end())
        } else {
            String::new()
        }
    }

    /// Like [`Self::block_break`], but a block that follows the hidden
    /// paragraph of a tight item starts on the next line so the item stays
    /// tight.
    fn block_break_at(&mut self, nodes: &[Node], index: usize) -> String {
        let after_hidden = index
            .checked_sub(1)
            .and_then(|prev| nodes.get(prev))
            .is_some_and(|prev| prev.hidden && prev.kind == NodeKind::ParagraphClose);
        if after_hidden && std::mem::replace(&mut self.block_started, true) {
            format!("\n{}", self.prefix())
        } else {
            self.block_break()
        }
    }

    /// Line break before a list entry unless it is the first of its list.
    fn item_break(&mut self) -> String {
        let prefix = self.prefix();
        match self.lists.last_mut() {
            Some(started) if *started => format!("\n{prefix}"),
            Some(started) => {
                *started = true;
                String::new()
            }
            None => String::new(),
        }
    }

    fn open_container(&mut self, prefix: &'static str) {
        self.prefixes.push(prefix);
        self.block_started = false;
    }

    fn close_container(&mut self) {
        self.prefixes.pop();
        self.block_started = true;
    }
}

impl CommonMarkBackend {
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
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let admonition = Admonition::of(node).ok_or_else(|| RenderError::unsupported(node))?;
        let sep = env.block_break();
        env.open_container("> ");
        env.block_started = true;
        Ok(format!("{sep}> **{}:**", admonition.title()))
    }

    fn admonition_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.close_container();
        Ok(String::new())
    }
}

/// Code span delimited by enough backticks to contain `content`.
fn code_span(content: &str) -> String {
    let longest_run = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);
    if content.starts_with('`') || content.ends_with('`') {
        format!("{fence} {content} {fence}")
    } else {
        format!("{fence}{content}{fence}")
    }
}

/// Fenced code block with every line carrying the container prefix.
///
/// The fence is one character longer than the longest run of its character
/// in `content`, and uses tildes when `info` holds a backtick.
fn code_fence(info: &str, content: &str, prefix: &str) -> String {
    let fence_char = if info.contains('`') { '~' } else { '`' };
    let longest_run = content
        .split(|c| c != fence_char)
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = fence_char.to_string().repeat((longest_run + 1).max(3));
    let mut out = format!("{fence}{info}");
    for line in content.lines() {
        out.push('\n');
        out.push_str(prefix);
        out.push_str(line);
    }
    out.push('\n');
    out.push_str(prefix);
    out.push_str(&fence);
    out
}

/// Link destination, in angle brackets when the raw form would not parse.
fn link_destination(href: &str) -> String {
    let href = href.replace('\\', "\\\\");
    if href
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '(' | ')' | '<' | '>'))
    {
        format!("<{}>", href.replace('<', "\\<").replace('>', "\\>"))
    } else {
        href
    }
}

impl RenderBackend for CommonMarkBackend {
    type Env = CommonMarkEnv;

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
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok(escape_markdown(&node.content))
    }

    fn paragraph_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok(env.block_break())
    }

    fn paragraph_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok(String::new())
    }

    fn hardbreak(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok(format!("\\\n{}", env.prefix()))
    }

    fn softbreak(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok(format!("\n{}", env.prefix()))
    }

    fn code_inline(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok(code_span(&node.content))
    }

    fn code_block(
        &self,
        node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.block_break_at(nodes, index);
        Ok(sep + &code_fence("", &node.content, &env.prefix()))
    }

    fn fence(
        &self,
        node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.block_break_at(nodes, index);
        Ok(sep + &code_fence(&node.info, &node.content, &env.prefix()))
    }

    fn link_open(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let href = node.attr("href").unwrap_or_default().to_owned();
        let title = node.attr("title").map(str::to_owned);
        env.links.push((href, title));
        Ok("[".to_owned())
    }

    fn link_close(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let (href, title) = env
            .links
            .pop()
            .ok_or_else(|| RenderError::Malformed(format!("{} without link_open", node.kind)))?;
        let href = link_destination(&href);
        Ok(match title {
            Some(title) => format!("]({href} \"{}\")", title.replace('"', "\\\"")),
            None => format!("]({href})"),
        })
    }

    fn list_item_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.item_break();
        env.open_container("  ");
        Ok(sep + "- ")
    }

    fn list_item_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.close_container();
        Ok(String::new())
    }

    fn bullet_list_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.block_break_at(nodes, index);
        env.lists.push(false);
        Ok(sep)
    }

    fn bullet_list_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.lists.pop();
        env.block_started = true;
        Ok(String::new())
    }

    fn em_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok("*".to_owned())
    }

    fn em_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok("*".to_owned())
    }

    fn strong_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok("**".to_owned())
    }

    fn strong_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        Ok("**".to_owned())
    }

    fn blockquote_open(
        &self,
        _node: &Node,
        nodes: &[Node],
        index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.block_break_at(nodes, index);
        env.open_container("> ");
        Ok(sep + "> ")
    }

    fn blockquote_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.close_container();
        Ok(String::new())
    }

    fn dl_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.block_break();
        env.lists.push(false);
        Ok(sep)
    }

    fn dl_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.lists.pop();
        env.block_started = true;
        Ok(String::new())
    }

    // Terms are list entries; descriptions are indented paragraphs below them.
    fn dt_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        let sep = env.item_break();
        env.open_container("  ");
        Ok(sep + "- ")
    }

    fn dt_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.close_container();
        Ok(String::new())
    }

    fn dd_open(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.open_container("  ");
        env.block_started = true;
        Ok(String::new())
    }

    fn dd_close(
        &self,
        _node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        env.close_container();
        Ok(String::new())
    }

    fn myst_role(
        &self,
        node: &Node,
        _nodes: &[Node],
        _index: usize,
        _options: &RenderOptions,
        _env: &mut CommonMarkEnv,
    ) -> Result<String, RenderError> {
        match Role::of(node) {
            Some(Role::Manpage) => {
                let Some((name, section)) = parse_reference(&node.content) else {
                    return Ok(format!("**{}**", escape_markdown(&node.content)));
                };
                let reference = format!("**{}**({section})", escape_markdown(name));
                Ok(match self.manpage_urls.lookup(name, section) {
                    Some(url) => format!("[{reference}]({})", link_destination(url)),
                    None => reference,
                })
            }
            Some(_) => Ok(code_span(&node.content)),
            None => Err(RenderError::unsupported(node)),
        }
    }
}
