//! `mdr render` command implementation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use mdr_config::{Backend, CliSettings, Config};
use mdr_renderer::{
    CommonMarkBackend, HtmlBackend, ManpageBackend, ManpageUrls, MarkdownRenderer, Node,
    RenderBackend, RenderError, RenderOptions, Role, tokens_from_markdown,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Input file (`-` reads stdin).
    input: PathBuf,

    /// Output backend: commonmark, manpage or html (overrides config).
    #[arg(short, long)]
    backend: Option<String>,

    /// Treat input as a JSON token stream instead of Markdown.
    #[arg(long)]
    tokens: bool,

    /// Path to configuration file (default: auto-discover mdr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file mapping manpage references to URLs (overrides config).
    #[arg(long)]
    manpage_urls: Option<PathBuf>,

    /// Print link targets after link text in manpage output.
    #[arg(long)]
    href_targets: bool,

    /// Write output to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, input parsing or rendering fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            backend: self.backend,
            manpage_urls: self.manpage_urls,
            href_targets: self.href_targets.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let backend = config.backend()?;

        let source = read_input(&self.input)?;
        let nodes = if self.tokens {
            serde_json::from_str(&source).map_err(CliError::Tokens)?
        } else {
            tokens_from_markdown(&source)
        };
        tracing::debug!(nodes = nodes.len(), backend = %backend, "Parsed input");

        let manpage_urls = match &config.manpages_resolved.urls_file {
            Some(path) => load_manpage_urls(path)?,
            None => ManpageUrls::new(),
        };
        if manpage_urls.is_empty() && backend != Backend::Manpage && has_manpage_roles(&nodes) {
            output.warning("No manpage URL table configured, manpage references are not linked");
        }

        let options = render_options(&config);
        let rendered = render_nodes(
            backend,
            manpage_urls,
            config.manpages_resolved.href_targets,
            &nodes,
            &options,
        )?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &rendered)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                stdout.flush()?;
            }
        }

        Ok(())
    }
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn load_manpage_urls(path: &Path) -> Result<ManpageUrls, CliError> {
    let json = std::fs::read_to_string(path)?;
    let urls = ManpageUrls::from_json(&json).map_err(|source| CliError::ManpageUrls {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(entries = urls.len(), path = %path.display(), "Loaded manpage URLs");
    Ok(urls)
}

/// Render options derived from the `[render]` section.
fn render_options(config: &Config) -> RenderOptions {
    let mut options = RenderOptions::new();
    if let Some(prefix) = &config.render.lang_prefix {
        options = options.with("lang_prefix", prefix.as_str());
    }
    if config.render.xhtml_out {
        options = options.with("xhtml_out", "true");
    }
    options
}

fn has_manpage_roles(nodes: &[Node]) -> bool {
    nodes
        .iter()
        .filter_map(|node| node.children.as_deref())
        .flatten()
        .any(|node| Role::of(node) == Some(Role::Manpage))
}

fn render_nodes(
    backend: Backend,
    manpage_urls: ManpageUrls,
    href_targets: bool,
    nodes: &[Node],
    options: &RenderOptions,
) -> Result<String, RenderError> {
    match backend {
        Backend::CommonMark => render_with(CommonMarkBackend::new(manpage_urls), nodes, options),
        Backend::Manpage => render_with(
            ManpageBackend::new(manpage_urls).with_href_targets(href_targets),
            nodes,
            options,
        ),
        Backend::Html => render_with(HtmlBackend::new(manpage_urls), nodes, options),
    }
}

fn render_with<B: RenderBackend>(
    backend: B,
    nodes: &[Node],
    options: &RenderOptions,
) -> Result<String, RenderError> {
    MarkdownRenderer::new(backend).render_document(nodes, options)
}
