//! Configuration management for mdr.
//!
//! Parses `mdr.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `render.lang_prefix`
//! - `manpages.urls_file`

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output backend name.
    pub backend: Option<String>,
    /// Override manpage URL table path.
    pub manpage_urls: Option<PathBuf>,
    /// Override printing of link targets in manpage output.
    pub href_targets: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdr.toml";

/// Output backend selected by `render.backend`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Normalized `CommonMark`.
    #[default]
    CommonMark,
    /// Roff `man` macros.
    Manpage,
    /// Semantic HTML5.
    Html,
}

impl Backend {
    /// All backends, in documentation order.
    pub const ALL: [Self; 3] = [Self::CommonMark, Self::Manpage, Self::Html];

    /// Name as written in `mdr.toml` and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::CommonMark => "commonmark",
            Self::Manpage => "manpage",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.into_iter().map(Self::name).collect();
                ConfigError::Validation(format!(
                    "render.backend must be one of {}, got '{s}'",
                    names.join(", ")
                ))
            })
    }
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render configuration.
    pub render: RenderConfig,
    /// Manpage configuration (paths are relative strings from TOML).
    manpages: ManpagesConfigRaw,

    /// Resolved manpage configuration (set after loading).
    #[serde(skip)]
    pub manpages_resolved: ManpagesConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Render configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Backend name, see [`Backend`].
    pub backend: String,
    /// Class prefix for fenced code languages in HTML output.
    pub lang_prefix: Option<String>,
    /// Emit XHTML-style self-closing tags in HTML output.
    pub xhtml_out: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default().name().to_owned(),
            lang_prefix: None,
            xhtml_out: false,
        }
    }
}

/// Raw manpage configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ManpagesConfigRaw {
    urls_file: Option<String>,
    href_targets: bool,
}

/// Resolved manpage configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ManpagesConfig {
    /// JSON file mapping `name(section)` references to URLs.
    pub urls_file: Option<PathBuf>,
    /// Print link targets after link text in manpage output.
    pub href_targets: bool,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`manpages.urls_file`").
        field: String,
        /// Error message (e.g., "${`MANPAGE_URLS`}: environment variable not found").
        message: String,
    },
}

/// Require a string field to be non-empty.
/// Expand `${VAR}` references in the value of `field`.
///
/// Strings without `${` are returned as is, so a bare `$` survives.
fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }
    shellexpand::env_with_context(value, |var| std::env::var(var).map(Some))
        .map(std::borrow::Cow::into_owned)
        .map_err(|err| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}}: {}", err.var_name, err.cause),
        })
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdr.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated again after overrides.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(backend) = &settings.backend {
            self.render.backend.clone_from(backend);
        }
        if let Some(manpage_urls) = &settings.manpage_urls {
            self.manpages_resolved.urls_file = Some(manpage_urls.clone());
        }
        if let Some(href_targets) = settings.href_targets {
            self.manpages_resolved.href_targets = href_targets;
        }
    }

    /// Selected output backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `render.backend` names no backend.
    pub fn backend(&self) -> Result<Backend, ConfigError> {
        self.render.backend.parse()
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend()?;
        if let Some(prefix) = &self.render.lang_prefix {
            require_non_empty(prefix, "render.lang_prefix")?;
        }
        if let Some(urls_file) = &self.manpages_resolved.urls_file {
            require_non_empty(&urls_file.to_string_lossy(), "manpages.urls_file")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref prefix) = self.render.lang_prefix {
            self.render.lang_prefix = Some(expand_env(prefix, "render.lang_prefix")?);
        }
        if let Some(ref urls_file) = self.manpages.urls_file {
            self.manpages.urls_file = Some(expand_env(urls_file, "manpages.urls_file")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.manpages_resolved = ManpagesConfig {
            urls_file: self
                .manpages
                .urls_file
                .as_deref()
                .filter(|file| !file.is_empty())
                .map(|file| config_dir.join(file)),
            href_targets: self.manpages.href_targets,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render.backend, "commonmark");
        assert_eq!(config.backend().unwrap(), Backend::CommonMark);
        assert!(config.render.lang_prefix.is_none());
        assert!(!config.render.xhtml_out);
        assert!(config.manpages_resolved.urls_file.is_none());
        assert!(!config.manpages_resolved.href_targets);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.render.backend, "commonmark");
    }

    #[test]
    fn test_parse_render_config() {
        let toml = r#"
[render]
backend = "html"
lang_prefix = "lang-"
xhtml_out = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend().unwrap(), Backend::Html);
        assert_eq!(config.render.lang_prefix.as_deref(), Some("lang-"));
        assert!(config.render.xhtml_out);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[manpages]
urls_file = "doc/manpage-urls.json"
href_targets = true
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.manpages_resolved.urls_file,
            Some(PathBuf::from("/project/doc/manpage-urls.json"))
        );
        assert!(config.manpages_resolved.href_targets);
    }

    #[test]
    fn test_backend_names() {
        for backend in Backend::ALL {
            assert_eq!(backend.name().parse::<Backend>().unwrap(), backend);
            assert_eq!(backend.to_string(), backend.name());
        }
    }

    #[test]
    fn test_validate_unknown_backend() {
        let config = Config {
            render: RenderConfig {
                backend: "docbook".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("docbook"));
        assert!(err.to_string().contains("manpage"));
    }

    #[test]
    fn test_validate_empty_lang_prefix() {
        let config = Config {
            render: RenderConfig {
                lang_prefix: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("render.lang_prefix"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        let overrides = CliSettings {
            backend: Some("manpage".to_owned()),
            manpage_urls: Some(PathBuf::from("/custom/urls.json")),
            href_targets: Some(true),
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.backend().unwrap(), Backend::Manpage);
        assert_eq!(
            config.manpages_resolved.urls_file,
            Some(PathBuf::from("/custom/urls.json"))
        );
        assert!(config.manpages_resolved.href_targets);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.render.backend, "commonmark");
        assert!(config.manpages_resolved.urls_file.is_none());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let (dir, path) = write_config(
            r#"
[render]
backend = "manpage"

[manpages]
urls_file = "urls.json"
"#,
        );
        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.backend().unwrap(), Backend::Manpage);
        assert_eq!(
            config.manpages_resolved.urls_file,
            Some(dir.path().join("urls.json"))
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/mdr.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_invalid_backend() {
        let (_dir, path) = write_config("[render]\nbackend = \"pdf\"\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_cli_settings_validated() {
        let (_dir, path) = write_config("");
        let settings = CliSettings {
            backend: Some("pdf".to_owned()),
            ..Default::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn test_load_parse_error() {
        let (_dir, path) = write_config("[render\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_expand_env_vars_urls_file() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEST_MDR_URLS_DIR", "/srv/nixpkgs");
        }
        let toml = r#"
[manpages]
urls_file = "${TEST_MDR_URLS_DIR}/doc/manpage-urls.json"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));
        assert_eq!(
            config.manpages_resolved.urls_file,
            Some(PathBuf::from("/srv/nixpkgs/doc/manpage-urls.json"))
        );
        unsafe {
            std::env::remove_var("TEST_MDR_URLS_DIR");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("TEST_MDR_MISSING_PREFIX");
        }
        let toml = r#"
[render]
lang_prefix = "${TEST_MDR_MISSING_PREFIX}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("render.lang_prefix"));
        assert!(err.to_string().contains("TEST_MDR_MISSING_PREFIX"));
    }

    #[test]
    fn test_expand_env_leaves_bare_dollar() {
        assert_eq!(
            expand_env("$HOME/urls.json", "manpages.urls_file").unwrap(),
            "$HOME/urls.json"
        );
    }

    #[test]
    fn test_expand_env_vars_default_value() {
        let toml = r#"
[render]
lang_prefix = "${TEST_MDR_UNSET_PREFIX:-lang-}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        assert_eq!(config.render.lang_prefix.as_deref(), Some("lang-"));
    }
}
