use std::path::Path;
use std::process::Command;

use ebook_config::PackageSettings;
use tracing::info;

use crate::error::{AssembleError, AssembleResult};

/// Lines of compiler output kept for error reports.
const DETAIL_LINES: usize = 20;

/// Result of one compiler run. The package file itself is checked by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Exit code, or `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub output: String,
}

impl CompileReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last few lines of combined output.
    pub fn detail(&self) -> String {
        let lines: Vec<&str> = self.output.lines().collect();
        let start = lines.len().saturating_sub(DETAIL_LINES);
        lines[start..].join("\n")
    }
}

/// Turns a package manifest into a binary e-book written next to it.
pub trait PackageCompiler {
    fn compile(&self, manifest: &Path) -> AssembleResult<CompileReport>;
}

/// Runs an external program such as `kindlegen` and waits for it to exit.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: String,
    args: Vec<String>,
}

impl ExternalCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(settings: &PackageSettings) -> Self {
        Self::new(settings.compiler.clone(), settings.args.clone())
    }
}

impl PackageCompiler for ExternalCompiler {
    fn compile(&self, manifest: &Path) -> AssembleResult<CompileReport> {
        info!(program = %self.program, manifest = %manifest.display(), "running compiler");

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(manifest);
        if let Some(dir) = manifest.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .map_err(|source| AssembleError::CompilerLaunch {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CompileReport {
            code: output.status.code(),
            output: combined,
        })
    }
}
