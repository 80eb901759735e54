//! Configuration management for the markup engine.
//!
//! Parses `markup.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. The loaded
//! [`Config`] builds the renderer [`Registry`]: built-in languages first,
//! then every `[[renderers]]` entry.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! Every element of a renderer's `command` vector supports `${VAR}`
//! expansion; an unset variable is a [`ConfigError::EnvVar`].

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use markup_engine::{
    CommandSpec, DuplicatePolicy, LibrarySpec, Registry, RegistryError, RendererDescriptor,
    languages,
};
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override default command timeout in seconds (0 disables).
    pub timeout_secs: Option<u64>,
    /// Override whether built-in languages are registered.
    pub builtins: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "markup.toml";

/// Largest accepted command timeout (one hour).
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine-wide settings.
    pub engine: EngineConfig,
    /// Additional renderers declared in the config file.
    pub renderers: Vec<RendererConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Engine-wide settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default timeout for command renderers in seconds (0 disables).
    pub timeout_secs: u64,
    /// What to do when two renderers claim the same identifier.
    pub duplicates: Duplicates,
    /// Whether to register the built-in languages.
    pub builtins: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: languages::DEFAULT_TIMEOUT.as_secs(),
            duplicates: Duplicates::default(),
            builtins: true,
        }
    }
}

/// Duplicate identifier policy as written in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duplicates {
    #[default]
    Reject,
    Override,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(value: Duplicates) -> Self {
        match value {
            Duplicates::Reject => Self::Reject,
            Duplicates::Override => Self::Override,
        }
    }
}

/// A renderer declared in `[[renderers]]`.
///
/// Exactly one of `command` and `library` must be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RendererConfig {
    /// Display name.
    pub name: String,
    /// Extensions and symbolic names.
    pub identifiers: Vec<String>,
    /// Program and arguments, already split.
    pub command: Option<Vec<String>>,
    /// Library dependency name.
    pub library: Option<String>,
    /// Library converter options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Per-renderer timeout in seconds, overriding the engine default
    /// (0 disables).
    pub timeout_secs: Option<u64>,
}

impl RendererConfig {
    /// Build the engine descriptor for this entry.
    ///
    /// `default_timeout` applies to command renderers without their own bound.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if neither `command` nor `library` is set.
    pub fn to_descriptor(
        &self,
        default_timeout: Option<Duration>,
    ) -> Result<RendererDescriptor, ConfigError> {
        let descriptor = match (&self.command, &self.library) {
            (Some(argv), None) => {
                let mut spec = CommandSpec::from_argv(argv.iter().cloned()).ok_or_else(|| {
                    ConfigError::Validation(format!("renderer '{}' has an empty command", self.name))
                })?;
                spec = match self.timeout_secs {
                    Some(0) => spec.without_timeout(),
                    Some(secs) => spec.with_timeout(Duration::from_secs(secs)),
                    None => spec,
                };
                RendererDescriptor::command(&self.name, spec.with_default_timeout(default_timeout))
            }
            (None, Some(dependency)) => {
                let spec = self
                    .options
                    .iter()
                    .fold(LibrarySpec::new(dependency), |spec, (key, value)| {
                        spec.option(key, value)
                    });
                RendererDescriptor::library(&self.name, spec)
            }
            _ => {
                return Err(ConfigError::Validation(format!(
                    "renderer '{}' must set exactly one of command or library",
                    self.name
                )));
            }
        };
        Ok(descriptor.with_identifiers(&self.identifiers))
    }
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
        /// Config field path (e.g., "`renderers[0].command`").
        field: String,
        /// Error message (e.g., "${`PANDOC`} not set").
        message: String,
    },
    /// Renderer registration failed.
    #[error("Renderer registration failed: {0}")]
    Registry(#[from] RegistryError),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `markup.toml` in current directory and parents.
    /// Without any file, defaults are used.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Default timeout for command renderers, `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.engine.timeout_secs > 0).then(|| Duration::from_secs(self.engine.timeout_secs))
    }

    /// Build a registry holding the built-in and configured renderers.
    ///
    /// The registry is returned in its configuring phase so callers can add
    /// more renderers before handing it to the engine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Registry` on identifier clashes (under the
    /// `reject` policy) or invalid renderer options.
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        let mut registry = Registry::new().with_policy(self.engine.duplicates.into());
        let timeout = self.timeout();

        if self.engine.builtins {
            languages::register_builtin(&mut registry, timeout)?;
        }
        for renderer in &self.renderers {
            registry.add(renderer.to_descriptor(timeout)?)?;
        }

        Ok(registry)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(timeout_secs) = settings.timeout_secs {
            self.engine.timeout_secs = timeout_secs;
        }
        if let Some(builtins) = settings.builtins {
            self.engine.builtins = builtins;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
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

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that every renderer is fully and unambiguously specified.
    /// Called automatically by [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_engine()?;
        for (index, renderer) in self.renderers.iter().enumerate() {
            Self::validate_renderer(index, renderer)?;
        }
        Ok(())
    }

    /// Validate engine configuration.
    fn validate_engine(&self) -> Result<(), ConfigError> {
        if self.engine.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "engine.timeout_secs cannot exceed {MAX_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    /// Validate one `[[renderers]]` entry.
    fn validate_renderer(index: usize, renderer: &RendererConfig) -> Result<(), ConfigError> {
        let field = |name: &str| format!("renderers[{index}].{name}");

        require_non_empty(&renderer.name, &field("name"))?;
        if renderer.identifiers.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} must list at least one identifier",
                field("identifiers")
            )));
        }
        for identifier in &renderer.identifiers {
            require_non_empty(identifier, &field("identifiers"))?;
        }

        match (&renderer.command, &renderer.library) {
            (Some(argv), None) => {
                let program = argv.first().map_or("", String::as_str);
                require_non_empty(program, &field("command"))?;
                if !renderer.options.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "{} only applies to library renderers",
                        field("options")
                    )));
                }
            }
            (None, Some(dependency)) => {
                require_non_empty(dependency, &field("library"))?;
                if renderer.timeout_secs.is_some() {
                    return Err(ConfigError::Validation(format!(
                        "{} only applies to command renderers",
                        field("timeout_secs")
                    )));
                }
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(format!(
                    "renderers[{index}] cannot set both command and library"
                )));
            }
            (None, None) => {
                return Err(ConfigError::Validation(format!(
                    "renderers[{index}] must set command or library"
                )));
            }
        }

        if let Some(secs) = renderer.timeout_secs
            && secs > MAX_TIMEOUT_SECS
        {
            return Err(ConfigError::Validation(format!(
                "{} cannot exceed {MAX_TIMEOUT_SECS}",
                field("timeout_secs")
            )));
        }

        Ok(())
    }

    /// Expand environment variable references in renderer commands.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for (index, renderer) in self.renderers.iter_mut().enumerate() {
            if let Some(argv) = renderer.command.as_mut() {
                let field = format!("renderers[{index}].command");
                for arg in argv.iter_mut() {
                    *arg = expand::expand_env(arg, &field)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_engine::StrategyKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.engine.duplicates, Duplicates::Reject);
        assert!(config.engine.builtins);
        assert!(config.renderers.is_empty());
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.timeout_secs, 30);
        assert!(config.engine.builtins);
    }

    #[test]
    fn test_parse_engine_config() {
        let toml = r#"
[engine]
timeout_secs = 5
duplicates = "override"
builtins = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.timeout_secs, 5);
        assert_eq!(config.engine.duplicates, Duplicates::Override);
        assert!(!config.engine.builtins);
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let toml = r"
[engine]
timeout_secs = 0
";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_parse_renderers() {
        let toml = r#"
[[renderers]]
name = "Pandoc Markdown"
identifiers = ["pmd", "pandoc"]
command = ["pandoc", "-f", "markdown", "-t", "html"]
timeout_secs = 10

[[renderers]]
name = "Strict Markdown"
identifiers = ["smd"]
library = "pulldown-cmark"
options = { tables = "false" }
"#;
        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        let pandoc = config.renderers[0].to_descriptor(None).unwrap();
        assert_eq!(pandoc.name(), "Pandoc Markdown");
        assert_eq!(pandoc.identifiers(), ["pmd", "pandoc"]);
        let StrategyKind::Command(spec) = pandoc.kind() else {
            panic!("expected command renderer");
        };
        assert_eq!(spec.program(), "pandoc");
        assert_eq!(spec.arguments(), ["-f", "markdown", "-t", "html"]);
        assert_eq!(spec.timeout(), Some(Duration::from_secs(10)));

        let strict = config.renderers[1].to_descriptor(None).unwrap();
        let StrategyKind::Library(spec) = strict.kind() else {
            panic!("expected library renderer");
        };
        assert_eq!(spec.dependency(), "pulldown-cmark");
        assert_eq!(spec.options().get("tables").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_renderer_inherits_engine_timeout() {
        let toml = r#"
[[renderers]]
name = "Org"
identifiers = ["org"]
command = ["pandoc", "-f", "org"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let descriptor = config.renderers[0]
            .to_descriptor(Some(Duration::from_secs(12)))
            .unwrap();
        let StrategyKind::Command(spec) = descriptor.kind() else {
            panic!("expected command renderer");
        };
        assert_eq!(spec.timeout(), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_zero_renderer_timeout_disables_bound() {
        let toml = r#"
[[renderers]]
name = "Echo"
identifiers = ["echo"]
command = ["cat"]
timeout_secs = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        let descriptor = config.renderers[0]
            .to_descriptor(Some(Duration::from_secs(30)))
            .unwrap();
        let StrategyKind::Command(spec) = descriptor.kind() else {
            panic!("expected command renderer");
        };
        assert_eq!(spec.timeout(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_renderer_timeout_renders() {
        let mut config = config_with(RendererConfig {
            timeout_secs: Some(0),
            ..command_renderer()
        });
        config.engine.builtins = false;
        let engine = markup_engine::Engine::new(config.build_registry().unwrap());
        assert_eq!(engine.render("echo", "hello").unwrap(), "hello");
    }

    #[test]
    fn test_unknown_renderer_field_rejected() {
        let toml = r#"
[[renderers]]
name = "Org"
identifiers = ["org"]
comand = ["pandoc"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    fn command_renderer() -> RendererConfig {
        RendererConfig {
            name: "Echo".to_owned(),
            identifiers: vec!["echo".to_owned()],
            command: Some(vec!["cat".to_owned()]),
            library: None,
            options: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    fn config_with(renderer: RendererConfig) -> Config {
        Config {
            renderers: vec![renderer],
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
        assert!(config_with(command_renderer()).validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_too_high() {
        let mut config = Config::default();
        config.engine.timeout_secs = 7200;
        assert_validation_error(&config, &["engine.timeout_secs", "3600"]);
    }

    #[test]
    fn test_validate_empty_name() {
        let config = config_with(RendererConfig {
            name: String::new(),
            ..command_renderer()
        });
        assert_validation_error(&config, &["renderers[0].name", "empty"]);
    }

    #[test]
    fn test_validate_no_identifiers() {
        let config = config_with(RendererConfig {
            identifiers: Vec::new(),
            ..command_renderer()
        });
        assert_validation_error(&config, &["renderers[0].identifiers"]);
    }

    #[test]
    fn test_validate_empty_command() {
        let config = config_with(RendererConfig {
            command: Some(Vec::new()),
            ..command_renderer()
        });
        assert_validation_error(&config, &["renderers[0].command", "empty"]);
    }

    #[test]
    fn test_validate_both_command_and_library() {
        let config = config_with(RendererConfig {
            library: Some("pulldown-cmark".to_owned()),
            ..command_renderer()
        });
        assert_validation_error(&config, &["both command and library"]);
    }

    #[test]
    fn test_validate_neither_command_nor_library() {
        let config = config_with(RendererConfig {
            command: None,
            ..command_renderer()
        });
        assert_validation_error(&config, &["must set command or library"]);
    }

    #[test]
    fn test_validate_options_on_command() {
        let config = config_with(RendererConfig {
            options: BTreeMap::from([("tables".to_owned(), "true".to_owned())]),
            ..command_renderer()
        });
        assert_validation_error(&config, &["renderers[0].options"]);
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            timeout_secs: Some(3),
            builtins: Some(false),
        });
        assert_eq!(config.timeout(), Some(Duration::from_secs(3)));
        assert!(!config.engine.builtins);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.engine.timeout_secs, 30);
        assert!(config.engine.builtins);
    }

    #[test]
    fn test_expand_env_vars_in_command() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MARKUP_CONFIG_TEST_PANDOC", "/opt/pandoc/bin/pandoc");
        }

        let toml = r#"
[[renderers]]
name = "Org"
identifiers = ["org"]
command = ["${MARKUP_CONFIG_TEST_PANDOC}", "-f", "org"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.renderers[0].command.as_deref().unwrap()[0],
            "/opt/pandoc/bin/pandoc"
        );

        unsafe {
            std::env::remove_var("MARKUP_CONFIG_TEST_PANDOC");
        }
    }

    #[test]
    fn test_build_registry_with_builtins_and_custom() {
        let config = config_with(command_renderer());
        let registry = config.build_registry().unwrap();

        assert!(!registry.is_frozen());
        assert_eq!(registry.lookup("echo").unwrap().name(), "Echo");
        assert_eq!(registry.lookup("md").unwrap().name(), "Markdown");
    }

    #[test]
    fn test_build_registry_without_builtins() {
        let mut config = config_with(command_renderer());
        config.engine.builtins = false;
        let registry = config.build_registry().unwrap();

        assert!(registry.lookup("md").is_none());
        assert!(registry.lookup("echo").is_some());
    }

    #[test]
    fn test_build_registry_clash_with_builtin_rejected() {
        let config = config_with(RendererConfig {
            identifiers: vec!["md".to_owned()],
            ..command_renderer()
        });
        let err = config.build_registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registry(RegistryError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_build_registry_clash_with_builtin_overridden() {
        let mut config = config_with(RendererConfig {
            identifiers: vec!["md".to_owned()],
            ..command_renderer()
        });
        config.engine.duplicates = Duplicates::Override;
        let registry = config.build_registry().unwrap();

        assert_eq!(registry.lookup("md").unwrap().name(), "Echo");
        assert_eq!(registry.lookup("markdown").unwrap().name(), "Markdown");
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("docs/guide");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        let found = Config::discover_config(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILENAME));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[engine]
timeout_secs = 9

[[renderers]]
name = "Echo"
identifiers = ["echo"]
command = ["cat"]
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), Some(&CliSettings::default())).unwrap();
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.engine.timeout_secs, 9);
        assert_eq!(config.renderers.len(), 1);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/markup.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_validates_after_cli_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();

        let settings = CliSettings {
            timeout_secs: Some(MAX_TIMEOUT_SECS + 1),
            ..CliSettings::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
