//! Last-N-lines retrieval for large files, reading only the end of the file.

pub mod error;
pub mod fs;
pub mod lines;
pub mod net;
pub mod source;
pub mod tail;

pub use error::{Result, TailError};
pub use source::{open_source, LocalFile, RemoteFile, TailSource};
pub use tail::{tail_n, TailReader, TailStats, DEFAULT_BUFFER_SIZE};
