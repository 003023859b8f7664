use std::fs;
use std::path::{Path, PathBuf};

use ebook_render::INDEX_FILE;
use ebook_utils::{relative_path, symlink_file};
use tracing::info;

use crate::error::{AssembleError, AssembleResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    NotRequested,
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Publish `<output_dir>/<stem>.html` as a relative symlink to the index in
/// `source_dir`. Anything already at that path, even a dangling link, is left
/// alone.
pub fn link_index(source_dir: &Path, output_dir: &Path, stem: &str) -> AssembleResult<LinkStatus> {
    let link = output_dir.join(format!("{stem}.html"));
    if fs::symlink_metadata(&link).is_ok() {
        return Ok(LinkStatus::AlreadyExists(link));
    }

    let index = source_dir.join(INDEX_FILE);
    let target = relative_path(&index, output_dir)
        .map_err(|source| AssembleError::io("resolve link target for", &index, source))?;

    symlink_file(&target, &link)
        .map_err(|source| AssembleError::io("create symlink", &link, source))?;

    info!(link = %link.display(), target = %target.display(), "linked index");
    Ok(LinkStatus::Created(link))
}
