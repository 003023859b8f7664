//! Shared test harness utilities for ebook-maker crates.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use ebook_assemble::{AssembleResult, CompileReport, PackageCompiler};
use ebook_config::Config;
use tempfile::TempDir;

/// Two chapters, one subsection: play orders 2, 3 and 4.
pub const SAMPLE_OUTLINE: &str = "My Book\n\n# Chapter One\n## Section A\n# Chapter Two\n";

/// Returns a baseline configuration for tests.
pub fn test_config() -> Config {
    Config::builtin()
}

/// Builds a throwaway source directory holding `toc.md` and chapter files.
pub struct SourceDirBuilder {
    outline: Option<String>,
    chapters: Vec<u32>,
    extra: Vec<(PathBuf, String)>,
}

impl Default for SourceDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceDirBuilder {
    pub fn new() -> Self {
        Self {
            outline: Some(SAMPLE_OUTLINE.to_string()),
            chapters: vec![2, 3, 4],
            extra: Vec::new(),
        }
    }

    pub fn outline(mut self, text: &str) -> Self {
        self.outline = Some(text.to_string());
        self
    }

    pub fn without_outline(mut self) -> Self {
        self.outline = None;
        self
    }

    pub fn file(mut self, relative: impl Into<PathBuf>, contents: &str) -> Self {
        self.extra.push((relative.into(), contents.to_string()));
        self
    }

    pub fn build(self) -> TempDir {
        let dir = TempDir::new().expect("create source dir");
        if let Some(outline) = &self.outline {
            write_file(dir.path(), "toc.md", outline);
        }
        for order in &self.chapters {
            write_file(
                dir.path(),
                format!("{order}.html"),
                &format!("<html><body><h1>Chapter {order}</h1></body></html>\n"),
            );
        }
        for (relative, contents) in &self.extra {
            write_file(dir.path(), relative, contents);
        }
        dir
    }
}

pub fn write_file(dir: &Path, relative: impl AsRef<Path>, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(&path, contents).expect("write file");
}

/// Fake compiler that writes `<manifest stem>.<extension>` next to the manifest.
pub struct ProducingCompiler {
    extension: String,
    exit_code: i32,
    invocations: RefCell<Vec<PathBuf>>,
}

impl ProducingCompiler {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            exit_code: 0,
            invocations: RefCell::new(Vec::new()),
        }
    }

    /// Produce the package but still report a non-zero exit, as kindlegen
    /// does for warnings.
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invocations.borrow().clone()
    }
}

impl PackageCompiler for ProducingCompiler {
    fn compile(&self, manifest: &Path) -> AssembleResult<CompileReport> {
        self.invocations.borrow_mut().push(manifest.to_path_buf());
        let manifest_text = fs::read_to_string(manifest).unwrap_or_default();
        fs::write(manifest.with_extension(&self.extension), manifest_text)
            .expect("write fake package");
        Ok(CompileReport {
            code: Some(self.exit_code),
            output: "Info(prcgen): MOBI File generated".to_string(),
        })
    }
}

/// Fake compiler that exits non-zero without producing anything.
#[derive(Default)]
pub struct FailingCompiler {
    invocations: RefCell<Vec<PathBuf>>,
}

impl FailingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invocations.borrow().clone()
    }
}

impl PackageCompiler for FailingCompiler {
    fn compile(&self, manifest: &Path) -> AssembleResult<CompileReport> {
        self.invocations.borrow_mut().push(manifest.to_path_buf());
        Ok(CompileReport {
            code: Some(2),
            output: "Error(core): unable to read the opf file".to_string(),
        })
    }
}
