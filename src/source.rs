use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, TailError};
use crate::fs;
use crate::lines::split_lines;
use crate::tail::TailReader;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

pub trait TailSource: Send + Sync {
    /// Last `n` lines, oldest first
    fn tail(&self, n: usize) -> Result<Vec<String>>;

    /// Name used in `==> name <==` headers
    fn display_name(&self) -> &str;
}

pub struct LocalFile {
    path: PathBuf,
    display_name: String,
    reader: TailReader,
}

impl LocalFile {
    pub fn open(path: &str, reader: TailReader) -> Result<Self> {
        let expanded = fs::expand_home(path);
        if !fs::exists(&expanded) {
            return Err(TailError::FileNotFound {
                path: path.to_string(),
            });
        }
        if fs::is_dir(&expanded) {
            return Err(TailError::InvalidArgument(format!("{} is a directory", path)));
        }
        if fs::is_symlink(&expanded) {
            debug!(path, "following symlink");
        }

        Ok(Self {
            path: expanded,
            display_name: path.to_string(),
            reader,
        })
    }
}

impl TailSource for LocalFile {
    fn tail(&self, n: usize) -> Result<Vec<String>> {
        self.reader.tail_file(&self.path, n)
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// A file on another machine, read through `ssh host tail -n`.
pub struct RemoteFile {
    host: String,
    path: String,
    display_name: String,
}

impl RemoteFile {
    pub fn open(host: &str, path: &str) -> Result<Self> {
        if host.is_empty() || path.is_empty() {
            return Err(TailError::InvalidArgument(format!(
                "remote source must be host:path, got {}:{}",
                host, path
            )));
        }
        Ok(Self {
            host: host.to_string(),
            path: path.to_string(),
            display_name: format!("{}:{}", host, path),
        })
    }

    fn tail_command(&self, n: usize) -> String {
        format!("tail -n {} {}", n, shell_quote(&self.path))
    }

    fn with_retry<T, F>(mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(result) => return Ok(result),
                Err(e) if attempt < MAX_RETRIES && is_retryable(&e) => {
                    warn!(attempt, error = %e, "remote tail failed, retrying");
                    thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl TailSource for RemoteFile {
    fn tail(&self, n: usize) -> Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        Self::with_retry(|| {
            let cmd = self.tail_command(n);
            debug!(host = %self.host, %cmd, "running remote tail");

            let output = Command::new("ssh").arg(&self.host).arg(&cmd).output()?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(classify_failure(&self.host, &self.path, &stderr));
            }

            Ok(split_lines(&output.stdout))
        })
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

fn is_retryable(err: &TailError) -> bool {
    matches!(err, TailError::Remote { .. } | TailError::Io(_))
}

fn classify_failure(host: &str, path: &str, stderr: &str) -> TailError {
    if stderr.contains("No such file") {
        return TailError::FileNotFound {
            path: format!("{}:{}", host, path),
        };
    }
    if stderr.contains("Permission denied") {
        return TailError::PermissionDenied {
            path: format!("{}:{}", host, path),
        };
    }
    TailError::Remote {
        host: host.to_string(),
        message: stderr.trim().to_string(),
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Splits `host:/path` style remote targets. Anything else is treated as local.
fn parse_remote(target: &str) -> Option<(&str, &str)> {
    let (host, path) = target.split_once(':')?;
    if host.is_empty() || path.is_empty() || host.contains('/') || host.contains('\\') {
        return None;
    }
    // "C:\logs" style drive letters
    if host.len() == 1 && path.starts_with('\\') {
        return None;
    }
    Some((host, path))
}

/// Opens a local file, or a remote one for `host:path` targets that do not
/// name an existing local file.
pub fn open_source(target: &str, reader: TailReader) -> Result<Box<dyn TailSource>> {
    if !fs::exists(fs::expand_home(target)) {
        if let Some((host, path)) = parse_remote(target) {
            return Ok(Box::new(RemoteFile::open(host, path)?));
        }
    }
    Ok(Box::new(LocalFile::open(target, reader)?))
}
