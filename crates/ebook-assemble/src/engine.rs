use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ebook_config::Config;
use ebook_outline::{parse_reader, Outline, OutlineOptions};
use ebook_render::{Renderer, INDEX_FILE};
use ebook_utils::{copy_dir_contents, file_stem};
use tracing::{debug, info, warn};

use crate::compiler::{ExternalCompiler, PackageCompiler};
use crate::error::{AssembleError, AssembleResult};
use crate::link::{link_index, LinkStatus};
use crate::staging::StagingDir;

pub const OUTLINE_FILE: &str = "toc.md";

const DEFAULT_OUTPUT_DIR: &str = "kindle_maker";

/// Where output lands when the caller does not choose.
pub fn default_output_dir() -> PathBuf {
    env::temp_dir().join(DEFAULT_OUTPUT_DIR)
}

#[derive(Debug, Clone)]
pub struct AssembleRequest {
    pub source_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub make_package: bool,
    pub link_index: bool,
    /// Overrides `book.author` for the navigation and manifest.
    pub author: Option<String>,
}

impl AssembleRequest {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: None,
            make_package: false,
            link_index: true,
            author: None,
        }
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn with_package(mut self, make_package: bool) -> Self {
        self.make_package = make_package;
        self
    }

    pub fn with_link(mut self, link_index: bool) -> Self {
        self.link_index = link_index;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssembleStatus {
    Built,
    /// `toc.md` had no title; nothing was written.
    EmptyOutline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOutcome {
    pub status: AssembleStatus,
    pub title: Option<String>,
    pub rendered_index: bool,
    pub cover_written: bool,
    pub package: Option<PathBuf>,
    pub link: LinkStatus,
}

impl AssembleOutcome {
    fn empty() -> Self {
        Self {
            status: AssembleStatus::EmptyOutline,
            title: None,
            rendered_index: false,
            cover_written: false,
            package: None,
            link: LinkStatus::NotRequested,
        }
    }
}

/// Drives parse → render → package → link for one source directory.
pub struct Assembler<C> {
    config: Config,
    renderer: Renderer,
    compiler: C,
}

impl Assembler<ExternalCompiler> {
    /// Wire the renderer and the configured external compiler.
    pub fn from_config(config: Config) -> AssembleResult<Self> {
        let renderer = Renderer::new(&config)?;
        let compiler = ExternalCompiler::from_settings(&config.package);
        Ok(Self::new(config, renderer, compiler))
    }
}

impl<C: PackageCompiler> Assembler<C> {
    pub fn new(config: Config, renderer: Renderer, compiler: C) -> Self {
        Self {
            config,
            renderer,
            compiler,
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn assemble(&self, request: &AssembleRequest) -> AssembleResult<AssembleOutcome> {
        let Some(outline) = self.read_outline(&request.source_dir)? else {
            warn!(
                source = %request.source_dir.display(),
                "outline has no title, nothing to build"
            );
            return Ok(AssembleOutcome::empty());
        };

        let source_dir = fs::canonicalize(&request.source_dir)
            .map_err(|source| AssembleError::io("resolve", &request.source_dir, source))?;

        let output_dir = request.output_dir.clone().unwrap_or_else(default_output_dir);
        fs::create_dir_all(&output_dir)
            .map_err(|source| AssembleError::io("create output directory", &output_dir, source))?;
        let output_dir = fs::canonicalize(&output_dir)
            .map_err(|source| AssembleError::io("resolve", &output_dir, source))?;

        let author = request.author.as_deref();
        let stem = file_stem(&outline.title);

        let mut outcome = AssembleOutcome {
            status: AssembleStatus::Built,
            title: Some(outline.title.clone()),
            rendered_index: false,
            cover_written: false,
            package: None,
            link: LinkStatus::NotRequested,
        };

        let index = source_dir.join(INDEX_FILE);
        if index.exists() {
            info!(index = %index.display(), "index already present, skipping render");
        } else {
            outcome.cover_written = self.renderer.ensure_cover(&source_dir)?;
            self.renderer.render_navigation(
                &outline.sections,
                Some(&outline.title),
                author,
                &source_dir,
            )?;
            self.renderer.render_index(&outline.sections, &source_dir)?;
            outcome.rendered_index = true;
        }

        if request.make_package {
            outcome.package = Some(self.package(&outline, &source_dir, &output_dir, author)?);
        }

        if request.link_index {
            outcome.link = link_index(&source_dir, &output_dir, &stem)?;
        }

        Ok(outcome)
    }

    fn read_outline(&self, source_dir: &Path) -> AssembleResult<Option<Outline>> {
        let path = source_dir.join(OUTLINE_FILE);
        if !path.is_file() {
            return Err(AssembleError::MissingOutlineFile { path });
        }

        let file = File::open(&path).map_err(|source| AssembleError::io("open", &path, source))?;
        let mut reader = BufReader::new(file);
        let options = OutlineOptions {
            orphan_policy: self.config.outline.orphan_subsection,
        };
        Ok(parse_reader(&mut reader, options)?)
    }

    fn package(
        &self,
        outline: &Outline,
        source_dir: &Path,
        output_dir: &Path,
        author: Option<&str>,
    ) -> AssembleResult<PathBuf> {
        let staging = StagingDir::create_in(output_dir)
            .map_err(|source| AssembleError::io("create staging directory in", output_dir, source))?;
        let staging_path = staging.path().to_path_buf();

        // On error the guard's drop removes the directory and logs any failure,
        // leaving the packaging error as the one reported.
        let package = self.build_package(outline, source_dir, &staging_path, output_dir, author)?;

        staging
            .close()
            .map_err(|source| AssembleError::StagingCleanupFailed {
                path: staging_path,
                source,
            })?;

        Ok(package)
    }

    fn build_package(
        &self,
        outline: &Outline,
        source_dir: &Path,
        staging: &Path,
        output_dir: &Path,
        author: Option<&str>,
    ) -> AssembleResult<PathBuf> {
        let copied = copy_dir_contents(source_dir, staging, &[staging])
            .map_err(|source| AssembleError::io("copy sources into", staging, source))?;
        debug!(files = copied, staging = %staging.display(), "staged sources");

        let manifest =
            self.renderer
                .render_manifest(&outline.sections, &outline.title, author, staging)?;

        let report = self.compiler.compile(&manifest)?;

        let file_name = format!(
            "{}.{}",
            file_stem(&outline.title),
            self.config.package.extension
        );
        let produced = staging.join(&file_name);
        if !produced.is_file() {
            return Err(AssembleError::PackagingFailed {
                expected: produced,
                code: report.code,
                detail: report.detail(),
            });
        }

        if !report.success() {
            warn!(
                code = ?report.code,
                detail = %report.detail(),
                "compiler reported a failure but produced a package"
            );
        }

        let destination = output_dir.join(&file_name);
        fs::copy(&produced, &destination)
            .map_err(|source| AssembleError::io("copy package to", &destination, source))?;

        info!(package = %destination.display(), "packaged e-book");
        Ok(destination)
    }
}
