use std::fmt;
use std::io;

#[derive(Debug)]
pub enum TailError {
    Open { path: String, source: io::Error },
    Stat(io::Error),
    Seek { offset: u64, source: io::Error },
    Read(io::Error),
    Io(io::Error),
    InvalidArgument(String),
    FileNotFound { path: String },
    PermissionDenied { path: String },
    Remote { host: String, message: String },
    Http { url: String, message: String },
}

impl std::error::Error for TailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TailError::Open { source, .. } => Some(source),
            TailError::Stat(e) => Some(e),
            TailError::Seek { source, .. } => Some(source),
            TailError::Read(e) => Some(e),
            TailError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for TailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailError::Open { path, source } => write!(f, "cannot open {}: {}", path, source),
            TailError::Stat(e) => write!(f, "cannot determine file size: {}", e),
            TailError::Seek { offset, source } => {
                write!(f, "seek to {} bytes before end failed: {}", offset, source)
            }
            TailError::Read(e) => write!(f, "read error: {}", e),
            TailError::Io(e) => write!(f, "I/O error: {}", e),
            TailError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            TailError::FileNotFound { path } => write!(f, "File not found: {}", path),
            TailError::PermissionDenied { path } => write!(f, "Permission denied: {}", path),
            TailError::Remote { host, message } => {
                write!(f, "ssh error on {}: {}", host, message)
            }
            TailError::Http { url, message } => write!(f, "download of {} failed: {}", url, message),
        }
    }
}

impl From<io::Error> for TailError {
    fn from(err: io::Error) -> Self {
        TailError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, TailError>;
