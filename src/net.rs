use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, TailError};
use crate::fs::{ensure_parent_dir, expand_home};

#[derive(Debug, Clone, Default)]
pub struct DownloadParams {
    pub url: String,
    /// `None` or zero means no timeout.
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
}

impl DownloadParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), pass.into()));
        self
    }

    /// Only sent when both user and password are non-empty.
    fn authorization(&self) -> Option<String> {
        match &self.basic_auth {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", user, pass))
            )),
            _ => None,
        }
    }

    fn error(&self, message: impl Into<String>) -> TailError {
        TailError::Http {
            url: self.url.clone(),
            message: message.into(),
        }
    }
}

/// Fetches `params.url` and copies the body into `output`.
/// Anything other than `200 OK` is an error. Returns the number of bytes written.
pub fn download<W: Write + ?Sized>(params: &DownloadParams, output: &mut W) -> Result<u64> {
    if params.url.is_empty() {
        return Err(TailError::InvalidArgument("download URL is empty".to_string()));
    }

    let mut builder = ureq::AgentBuilder::new();
    if let Some(timeout) = params.timeout.filter(|t| !t.is_zero()) {
        builder = builder.timeout(timeout);
    }
    let agent = builder.build();

    let mut request = agent.get(&params.url);
    for (name, value) in &params.headers {
        request = request.set(name, value);
    }
    if let Some(auth) = params.authorization() {
        request = request.set("Authorization", &auth);
    }

    debug!(url = %params.url, "starting download");
    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            return Err(params.error(format!("bad status: {} {}", code, response.status_text())));
        }
        Err(e) => return Err(params.error(format!("request failed: {}", e))),
    };

    if response.status() != 200 {
        return Err(params.error(format!(
            "bad status: {} {}",
            response.status(),
            response.status_text()
        )));
    }

    let mut body = response.into_reader();
    let copied = io::copy(&mut body, output)
        .map_err(|e| params.error(format!("failed to copy response body: {}", e)))?;

    info!(url = %params.url, bytes = copied, "download complete");
    Ok(copied)
}

/// Downloads into a file, creating its parent directory first.
/// The body lands in a sibling temp file that only replaces `path` once the
/// download has completed, so a failed fetch leaves an existing file intact.
pub fn download_to_path<P: AsRef<Path>>(params: &DownloadParams, path: P) -> Result<u64> {
    let path = expand_home(path);
    ensure_parent_dir(&path)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(parent).map_err(|source| TailError::Open {
        path: parent.display().to_string(),
        source,
    })?;

    let mut writer = BufWriter::new(temp);
    let copied = download(params, &mut writer)?;
    let temp = writer.into_inner().map_err(|e| TailError::Io(e.into_error()))?;
    temp.persist(&path).map_err(|e| TailError::Io(e.error))?;
    Ok(copied)
}
