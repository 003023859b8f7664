//! Configuration primitives and loader for the ebook-maker toolkit.
//!
//! Settings are resolved from a precedence stack:
//! override flag → working directory → git root → built-in defaults.
//! Each layer is parsed from TOML, merged field by field, then validated into
//! typed structures so downstream crates never touch raw TOML.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ebook_outline::OrphanPolicy;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".ebook-maker.toml";

const DEFAULT_AUTHOR: &str = "jachinlin.github.io";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_COMPILER: &str = "kindlegen";
const DEFAULT_COMPILER_ARG: &str = "-dont_append_source";
const DEFAULT_EXTENSION: &str = "mobi";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub book: BookSettings,
    pub outline: OutlineSettings,
    pub package: PackageSettings,
    pub render: RenderSettings,
    pub sources: ConfigSources,
}

/// Metadata defaults applied when the outline does not supply them.
#[derive(Clone, Debug)]
pub struct BookSettings {
    pub author: String,
    /// Prefix for the navigation title; today's date is appended at render time.
    pub fallback_title: String,
    pub language: String,
}

#[derive(Clone, Debug)]
pub struct OutlineSettings {
    pub orphan_subsection: OrphanPolicy,
}

/// External compiler invocation.
#[derive(Clone, Debug)]
pub struct PackageSettings {
    pub compiler: String,
    pub args: Vec<String>,
    pub extension: String,
}

#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    pub templates_dir: Option<PathBuf>,
    pub cover: Option<PathBuf>,
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn default(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default(working_dir.clone());
        let mut merged = defaults_layer(default_source.clone());
        let mut source_layers = vec![default_source];

        let git_config_path = find_git_root(&working_dir).map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            book: resolved.book,
            outline: resolved.outline,
            package: resolved.package,
            render: resolved.render,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }

    /// Built-in defaults only, without consulting the filesystem.
    pub fn builtin() -> Self {
        let base = PathBuf::from(".");
        let source = ConfigSource::default(base.clone());
        let resolved = match defaults_layer(source.clone()).finalize() {
            Ok(resolved) => resolved,
            Err(errors) => panic!("built-in ebook-maker defaults are invalid: {errors}"),
        };
        Config {
            book: resolved.book,
            outline: resolved.outline,
            package: resolved.package,
            render: resolved.render,
            sources: ConfigSources {
                working_directory: base,
                layers: vec![source],
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builtin()
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let located = |value: &str| Some(Located::new(value.to_string(), source.clone()));

    PartialConfig {
        book: BookPartial {
            author: located(DEFAULT_AUTHOR),
            fallback_title: located(DEFAULT_AUTHOR),
            language: located(DEFAULT_LANGUAGE),
        },
        outline: OutlinePartial {
            orphan_subsection: located(OrphanPolicy::Drop.as_str()),
        },
        package: PackagePartial {
            compiler: located(DEFAULT_COMPILER),
            args: Some(Located::new(
                vec![DEFAULT_COMPILER_ARG.to_string()],
                source.clone(),
            )),
            extension: located(DEFAULT_EXTENSION),
        },
        render: RenderPartial::default(),
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

struct ResolvedConfig {
    book: BookSettings,
    outline: OutlineSettings,
    package: PackageSettings,
    render: RenderSettings,
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    book: BookPartial,
    outline: OutlinePartial,
    package: PackagePartial,
    render: RenderPartial,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        self.book.merge(other.book);
        self.outline.merge(other.outline);
        self.package.merge(other.package);
        self.render.merge(other.render);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();

        let author = required_text(self.book.author, "book.author", &mut errors);
        let fallback_title =
            required_text(self.book.fallback_title, "book.fallback_title", &mut errors);
        let language = required_text(self.book.language, "book.language", &mut errors);

        let orphan_subsection = match self.outline.orphan_subsection {
            Some(located) => match located.value.parse::<OrphanPolicy>() {
                Ok(policy) => policy,
                Err(()) => {
                    let known: Vec<&str> =
                        OrphanPolicy::ALL.iter().map(|policy| policy.as_str()).collect();
                    errors.push(
                        ConfigValidationError::new(
                            Some(located.source),
                            format!(
                                "unknown policy '{}' (expected one of: {})",
                                located.value,
                                known.join(", ")
                            ),
                        )
                        .with_context("outline.orphan_subsection"),
                    );
                    OrphanPolicy::default()
                }
            },
            None => OrphanPolicy::default(),
        };

        let compiler = required_text(self.package.compiler, "package.compiler", &mut errors);
        let args = self
            .package
            .args
            .map(|located| located.value)
            .unwrap_or_default();

        let extension = match self.package.extension {
            Some(located) => {
                let value = located.value.trim().to_string();
                if value.is_empty() || value.contains(&['.', '/', '\\'][..]) {
                    errors.push(
                        ConfigValidationError::new(
                            Some(located.source),
                            format!(
                                "must be a bare file extension such as 'mobi' (received '{}')",
                                located.value
                            ),
                        )
                        .with_context("package.extension"),
                    );
                }
                value
            }
            None => DEFAULT_EXTENSION.to_string(),
        };

        let templates_dir = self.render.templates_dir.map(|located| {
            let path = resolve_path(&located);
            if !path.is_dir() {
                errors.push(
                    ConfigValidationError::new(
                        Some(located.source),
                        format!("template directory {} does not exist", path.display()),
                    )
                    .with_context("render.templates_dir"),
                );
            }
            path
        });

        let cover = self.render.cover.map(|located| {
            let path = resolve_path(&located);
            if !path.is_file() {
                errors.push(
                    ConfigValidationError::new(
                        Some(located.source),
                        format!("cover image {} does not exist", path.display()),
                    )
                    .with_context("render.cover"),
                );
            }
            path
        });

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            book: BookSettings {
                author,
                fallback_title,
                language,
            },
            outline: OutlineSettings { orphan_subsection },
            package: PackageSettings {
                compiler,
                args,
                extension,
            },
            render: RenderSettings {
                templates_dir,
                cover,
            },
        })
    }
}

fn required_text(
    located: Option<Located<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> String {
    match located {
        Some(located) if !located.value.trim().is_empty() => located.value.trim().to_string(),
        Some(located) => {
            errors.push(
                ConfigValidationError::new(Some(located.source), "must not be empty".into())
                    .with_context(context),
            );
            String::new()
        }
        None => {
            errors.push(
                ConfigValidationError::new(None, "missing value".into()).with_context(context),
            );
            String::new()
        }
    }
}

#[derive(Clone, Debug, Default)]
struct BookPartial {
    author: Option<Located<String>>,
    fallback_title: Option<Located<String>>,
    language: Option<Located<String>>,
}

impl BookPartial {
    fn merge(&mut self, other: BookPartial) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.fallback_title.is_some() {
            self.fallback_title = other.fallback_title;
        }
        if other.language.is_some() {
            self.language = other.language;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct OutlinePartial {
    orphan_subsection: Option<Located<String>>,
}

impl OutlinePartial {
    fn merge(&mut self, other: OutlinePartial) {
        if other.orphan_subsection.is_some() {
            self.orphan_subsection = other.orphan_subsection;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PackagePartial {
    compiler: Option<Located<String>>,
    args: Option<Located<Vec<String>>>,
    extension: Option<Located<String>>,
}

impl PackagePartial {
    fn merge(&mut self, other: PackagePartial) {
        if other.compiler.is_some() {
            self.compiler = other.compiler;
        }
        if other.args.is_some() {
            self.args = other.args;
        }
        if other.extension.is_some() {
            self.extension = other.extension;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct RenderPartial {
    templates_dir: Option<Located<PathBuf>>,
    cover: Option<Located<PathBuf>>,
}

impl RenderPartial {
    fn merge(&mut self, other: RenderPartial) {
        if other.templates_dir.is_some() {
            self.templates_dir = other.templates_dir;
        }
        if other.cover.is_some() {
            self.cover = other.cover;
        }
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    let path = &located.value;
    if path.is_absolute() {
        path.clone()
    } else {
        located.source.base_dir.join(path)
    }
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    book: Option<RawBook>,
    #[serde(default)]
    outline: Option<RawOutline>,
    #[serde(default)]
    package: Option<RawPackage>,
    #[serde(default)]
    render: Option<RawRender>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            book: self
                .book
                .map(|book| book.into_partial(&source))
                .unwrap_or_default(),
            outline: self
                .outline
                .map(|outline| outline.into_partial(&source))
                .unwrap_or_default(),
            package: self
                .package
                .map(|package| package.into_partial(&source))
                .unwrap_or_default(),
            render: self
                .render
                .map(|render| render.into_partial(&source))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBook {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    fallback_title: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl RawBook {
    fn into_partial(self, source: &ConfigSource) -> BookPartial {
        BookPartial {
            author: self.author.map(|value| Located::new(value, source.clone())),
            fallback_title: self
                .fallback_title
                .map(|value| Located::new(value, source.clone())),
            language: self.language.map(|value| Located::new(value, source.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutline {
    #[serde(default)]
    orphan_subsection: Option<String>,
}

impl RawOutline {
    fn into_partial(self, source: &ConfigSource) -> OutlinePartial {
        OutlinePartial {
            orphan_subsection: self
                .orphan_subsection
                .map(|value| Located::new(value, source.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackage {
    #[serde(default)]
    compiler: Option<String>,
    #[serde(default)]
    args: Option<Vec<String>>,
    #[serde(default)]
    extension: Option<String>,
}

impl RawPackage {
    fn into_partial(self, source: &ConfigSource) -> PackagePartial {
        PackagePartial {
            compiler: self.compiler.map(|value| Located::new(value, source.clone())),
            args: self.args.map(|value| Located::new(value, source.clone())),
            extension: self
                .extension
                .map(|value| Located::new(value, source.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRender {
    #[serde(default)]
    templates_dir: Option<PathBuf>,
    #[serde(default)]
    cover: Option<PathBuf>,
}

impl RawRender {
    fn into_partial(self, source: &ConfigSource) -> RenderPartial {
        RenderPartial {
            templates_dir: self
                .templates_dir
                .map(|value| Located::new(value, source.clone())),
            cover: self.cover.map(|value| Located::new(value, source.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_match_kindlegen() {
        let config = Config::builtin();
        assert_eq!(config.package.compiler, "kindlegen");
        assert_eq!(config.package.args, vec!["-dont_append_source".to_string()]);
        assert_eq!(config.package.extension, "mobi");
        assert_eq!(config.outline.orphan_subsection, OrphanPolicy::Drop);
        assert_eq!(config.book.author, DEFAULT_AUTHOR);
        assert!(config.render.templates_dir.is_none());
    }

    #[test]
    fn later_layers_replace_earlier_fields() {
        let base = ConfigSource::default(PathBuf::from("."));
        let mut merged = defaults_layer(base.clone());

        let raw: RawConfig = toml::from_str(
            r#"
            [book]
            author = "Someone"

            [package]
            extension = "azw3"
            "#,
        )
        .unwrap();
        merged.merge(raw.into_partial(base));

        let resolved = merged.finalize().unwrap();
        assert_eq!(resolved.book.author, "Someone");
        assert_eq!(resolved.book.language, DEFAULT_LANGUAGE);
        assert_eq!(resolved.package.extension, "azw3");
        assert_eq!(resolved.package.compiler, DEFAULT_COMPILER);
    }
}
