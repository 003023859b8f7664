//! Artifact renderer for ebook-maker.
//!
//! A [`Renderer`] owns the handlebars registry and turns a parsed header tree
//! into the three artifacts a Kindle build needs: the NCX navigation map
//! (`toc.ncx`), the browsable index (`toc.html`) and the OPF package manifest
//! (`<stem>.opf`). All three walk the same `Section` slice, so titles, ordering
//! and play orders agree across files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use ebook_config::{BookSettings, Config};
use ebook_outline::Section;
use ebook_utils::{atomic_write, file_stem};
use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const NAVIGATION_FILE: &str = "toc.ncx";
pub const INDEX_FILE: &str = "toc.html";
pub const COVER_FILE: &str = "cover.jpg";
pub const MANIFEST_EXTENSION: &str = "opf";

const NAVIGATION_TEMPLATE: &str = "toc.ncx";
const INDEX_TEMPLATE: &str = "toc.html";
const MANIFEST_TEMPLATE: &str = "opf";

const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    (NAVIGATION_TEMPLATE, include_str!("../templates/toc.ncx.hbs")),
    (INDEX_TEMPLATE, include_str!("../templates/toc.html.hbs")),
    (MANIFEST_TEMPLATE, include_str!("../templates/opf.hbs")),
];

const DEFAULT_COVER: &[u8] = include_bytes!("../assets/cover.jpg");

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to register template: {0}")]
    TemplateRegistration(#[from] handlebars::TemplateError),

    #[error("failed to render template: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Serialize)]
struct RenderContext<'a> {
    headers: &'a [Section],
    title: &'a str,
    author: &'a str,
    language: &'a str,
    uid: String,
    date: String,
}

/// Template environment plus the metadata defaults it falls back on.
pub struct Renderer {
    registry: Handlebars<'static>,
    book: BookSettings,
    cover: Option<PathBuf>,
}

impl Renderer {
    /// Build the registry from bundled templates, replacing any that exist in
    /// the configured `render.templates_dir`.
    pub fn new(config: &Config) -> RenderResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);

        for (name, source) in BUNDLED_TEMPLATES {
            registry.register_template_string(name, *source)?;
        }

        if let Some(dir) = &config.render.templates_dir {
            for (name, _) in BUNDLED_TEMPLATES {
                let path = dir.join(format!("{name}.hbs"));
                if path.is_file() {
                    debug!(template = name, path = %path.display(), "using template override");
                    registry.register_template_file(name, &path)?;
                }
            }
        }

        Ok(Self {
            registry,
            book: config.book.clone(),
            cover: config.render.cover.clone(),
        })
    }

    /// Write `toc.ncx` into `dir`.
    pub fn render_navigation(
        &self,
        headers: &[Section],
        title: Option<&str>,
        author: Option<&str>,
        dir: &Path,
    ) -> RenderResult<PathBuf> {
        let fallback;
        let title = match title {
            Some(title) => title,
            None => {
                fallback = format!(
                    "{}{}",
                    self.book.fallback_title,
                    Local::now().format("%Y-%m-%d")
                );
                fallback.as_str()
            }
        };
        let context = self.context(headers, title, author);
        self.render_file(NAVIGATION_TEMPLATE, &context, &dir.join(NAVIGATION_FILE))
    }

    /// Write `toc.html` into `dir`.
    pub fn render_index(&self, headers: &[Section], dir: &Path) -> RenderResult<PathBuf> {
        let context = self.context(headers, "Table of Contents", None);
        self.render_file(INDEX_TEMPLATE, &context, &dir.join(INDEX_FILE))
    }

    /// Write `<stem>.opf` into `dir`.
    pub fn render_manifest(
        &self,
        headers: &[Section],
        title: &str,
        author: Option<&str>,
        dir: &Path,
    ) -> RenderResult<PathBuf> {
        let context = self.context(headers, title, author);
        let path = dir.join(manifest_file_name(title));
        self.render_file(MANIFEST_TEMPLATE, &context, &path)
    }

    /// Put a cover image into `dir` unless one is already there.
    ///
    /// Returns `true` when a cover was written.
    pub fn ensure_cover(&self, dir: &Path) -> RenderResult<bool> {
        let destination = dir.join(COVER_FILE);
        if destination.exists() {
            return Ok(false);
        }

        let result = match &self.cover {
            Some(source) => fs::copy(source, &destination).map(|_| ()),
            None => atomic_write(&destination, DEFAULT_COVER),
        };
        result.map_err(|source| RenderError::Io {
            path: destination.clone(),
            source,
        })?;

        debug!(path = %destination.display(), "placed cover image");
        Ok(true)
    }

    fn context<'a>(
        &'a self,
        headers: &'a [Section],
        title: &'a str,
        author: Option<&'a str>,
    ) -> RenderContext<'a> {
        RenderContext {
            headers,
            title,
            author: author.unwrap_or(self.book.author.as_str()),
            language: &self.book.language,
            uid: format!("ebook-maker:{}", file_stem(title)),
            date: Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    fn render_file(
        &self,
        template: &str,
        context: &RenderContext<'_>,
        path: &Path,
    ) -> RenderResult<PathBuf> {
        let rendered = self.registry.render(template, context)?;
        atomic_write(path, rendered.as_bytes()).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(template, path = %path.display(), "rendered artifact");
        Ok(path.to_path_buf())
    }
}

/// File name of the package manifest for a book title.
pub fn manifest_file_name(title: &str) -> String {
    format!("{}.{MANIFEST_EXTENSION}", file_stem(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_in_titles_is_escaped() {
        let temp = tempfile::tempdir().unwrap();
        let renderer = Renderer::new(&Config::builtin()).unwrap();
        let headers = vec![Section {
            title: "Tom & Jerry <'Best'>".to_string(),
            play_order: 2,
            subsections: Vec::new(),
        }];

        let path = renderer.render_index(&headers, temp.path()).unwrap();
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains(">Tom &amp; Jerry &lt;&#x27;Best&#x27;&gt;</a>"));
        assert!(!html.contains("<'Best'>"));
    }

    #[test]
    fn manifest_name_uses_file_stem() {
        assert_eq!(manifest_file_name("My Book"), "My Book.opf");
        assert_eq!(manifest_file_name("Either/Or"), "Either_Or.opf");
    }

    #[test]
    fn bundled_cover_is_a_jpeg() {
        assert_eq!(&DEFAULT_COVER[..2], &[0xFF, 0xD8]);
        assert_eq!(&DEFAULT_COVER[DEFAULT_COVER.len() - 2..], &[0xFF, 0xD9]);
    }
}
