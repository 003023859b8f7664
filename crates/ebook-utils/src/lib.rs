//! Filesystem helpers shared by the ebook-maker crates.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::Builder;
use tracing::trace;
use walkdir::WalkDir;

/// Atomically write `contents` to `path`, ensuring readers never observe
/// partial content. The write goes to a temporary file in the same directory
/// followed by an atomic rename. The parent directory must already exist.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = Builder::new().prefix(".ebook-maker").tempfile_in(parent)?;

    tmp.as_file_mut().write_all(contents)?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = match fs::metadata(path) {
            Ok(metadata) => metadata.permissions().mode(),
            Err(_) => 0o644,
        };
        let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode));
    }

    tmp.persist(path).map(|_| ()).map_err(|err| err.error)
}

/// Recursively copy the contents of `from` into the existing directory `to`.
///
/// Entries under any path in `skip` are left out, which keeps a destination
/// nested inside the source from copying itself. Symlinks are copied as the
/// files they point to. Returns the number of files copied.
pub fn copy_dir_contents(from: &Path, to: &Path, skip: &[&Path]) -> io::Result<usize> {
    let mut copied = 0usize;
    let walker = WalkDir::new(from)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !skip.iter().any(|skipped| entry.path().starts_with(skipped)));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
        trace!(path = %relative.display(), "copied");
    }

    Ok(copied)
}

/// Compute `target` relative to the directory `base`.
///
/// Both paths are made absolute against the current directory and lexically
/// normalised first; symlinks are not resolved.
pub fn relative_path(target: &Path, base: &Path) -> io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let target = normalize_path(cwd.join(target));
    let base = normalize_path(cwd.join(base));

    let target_parts: Vec<Component<'_>> = target.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let shared = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(left, right)| left == right)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[shared..] {
        relative.push(part.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Ok(relative)
}

/// Canonicalise `.` and `..` path segments without touching the filesystem.
pub fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Create a symbolic link at `link` that points at `target`.
pub fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, link);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }
}

/// Turn a book title into a name that is safe to use as a file stem.
pub fn file_stem(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}
