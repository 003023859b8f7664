use std::io;
use std::path::PathBuf;

use ebook_outline::OutlineError;
use ebook_render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("outline file {path} not found")]
    MissingOutlineFile { path: PathBuf },

    #[error("invalid outline: {0}")]
    Outline(#[from] OutlineError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to launch compiler '{program}': {source}")]
    CompilerLaunch { program: String, source: io::Error },

    #[error("packaging failed: {expected} was not produced ({})", describe_exit(.code))]
    PackagingFailed {
        expected: PathBuf,
        code: Option<i32>,
        detail: String,
    },

    #[error("failed to remove staging directory {path}: {source}")]
    StagingCleanupFailed { path: PathBuf, source: io::Error },
}

impl AssembleError {
    /// True when no package was produced because the compiler could not be
    /// launched or ran without writing its output.
    pub fn is_packaging_failure(&self) -> bool {
        matches!(
            self,
            Self::CompilerLaunch { .. } | Self::PackagingFailed { .. }
        )
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("compiler exited with status {code}"),
        None => "compiler was terminated by a signal".to_string(),
    }
}

pub type AssembleResult<T> = Result<T, AssembleError>;
