use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Replaces a leading `~` component with the current user's home directory.
/// Paths without one, or when no home directory is known, come back unchanged.
pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// False for the empty path, or when the entry definitely does not exist.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    match fs::metadata(path) {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::NotFound,
    }
}

pub fn is_dir<P: AsRef<Path>>(path: P) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

pub fn is_symlink<P: AsRef<Path>>(path: P) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Creates the parent directory of `path` (after home expansion) if needed.
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = expand_home(path);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
