//! Reading the last lines of a file by scanning backwards in fixed chunks.
//!
//! The read window grows from the end of the file one chunk at a time until
//! it holds more candidate lines than requested, or covers the whole file.
//! Only the bytes inside the window are ever held in memory.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TailError};
use crate::lines::{count_newlines, split_lines};

pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// I/O performed by one tail call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailStats {
    pub rounds: usize,
    pub bytes_read: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TailReader {
    buffer_size: usize,
}

impl Default for TailReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TailReader {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(TailError::InvalidArgument(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { buffer_size })
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns the last `n` lines of the file at `path`, oldest first.
    ///
    /// The file is always opened and stat'd, so a missing file is an error
    /// even for `n == 0`; nothing is read in that case.
    pub fn tail_file<P: AsRef<Path>>(&self, path: P, n: usize) -> Result<Vec<String>> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| TailError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let file_size = file.metadata().map_err(TailError::Stat)?.len();

        let (lines, stats) = self.scan(&mut file, file_size, n)?;
        debug!(
            path = %path.display(),
            file_size,
            rounds = stats.rounds,
            bytes_read = stats.bytes_read,
            lines = lines.len(),
            "tail complete"
        );
        Ok(lines)
    }

    pub fn read_tail<R: Read + Seek>(&self, reader: &mut R, n: usize) -> Result<Vec<String>> {
        self.read_tail_with_stats(reader, n).map(|(lines, _)| lines)
    }

    /// Like `read_tail`, also reporting how many rounds and bytes it took.
    /// The size of `reader` is taken from seeking to its end.
    pub fn read_tail_with_stats<R: Read + Seek>(
        &self,
        reader: &mut R,
        n: usize,
    ) -> Result<(Vec<String>, TailStats)> {
        let file_size = reader.seek(SeekFrom::End(0)).map_err(TailError::Stat)?;
        self.scan(reader, file_size, n)
    }

    fn scan<R: Read + Seek>(
        &self,
        reader: &mut R,
        file_size: u64,
        n: usize,
    ) -> Result<(Vec<String>, TailStats)> {
        let mut stats = TailStats::default();
        if file_size == 0 || n == 0 {
            return Ok((Vec::new(), stats));
        }

        let buffer_size = self.buffer_size as u64;
        let mut offset = buffer_size;
        let mut total_read: u64 = 0;
        let mut accumulated: Vec<u8> = Vec::new();
        let mut newlines = 0usize;
        // Set from the first chunk, which always holds the last byte of the file.
        let mut partial_last = false;

        loop {
            offset = offset.min(file_size);
            // At most buffer_size, so it fits in usize.
            let read_size = (offset - total_read) as usize;

            reader
                .seek(SeekFrom::Start(file_size - offset))
                .map_err(|source| TailError::Seek { offset, source })?;
            let mut chunk = vec![0u8; read_size];
            reader.read_exact(&mut chunk).map_err(TailError::Read)?;

            if accumulated.is_empty() {
                partial_last = chunk.last().is_some_and(|&b| b != b'\n');
            }
            newlines += count_newlines(&chunk);
            total_read += read_size as u64;
            stats.rounds += 1;
            stats.bytes_read = total_read;

            chunk.extend_from_slice(&accumulated);
            accumulated = chunk;

            let candidates = newlines + usize::from(partial_last);
            debug!(offset, read_size, candidates, "tail round");

            // Strictly more than n: the earliest candidate may start before the window.
            if candidates > n || offset == file_size {
                break;
            }
            offset = offset.saturating_add(buffer_size);
        }

        let mut lines = split_lines(&accumulated);
        if lines.len() > n {
            lines.drain(..lines.len() - n);
        }
        Ok((lines, stats))
    }
}

/// Returns the last `n` lines of the file at `path` using the default chunk size.
pub fn tail_n<P: AsRef<Path>>(path: P, n: usize) -> Result<Vec<String>> {
    TailReader::new().tail_file(path, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Write};
    use tempfile::NamedTempFile;

    fn temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn expected_tail(content: &str, n: usize) -> Vec<String> {
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(n);
        all[start..].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tail_n_cases() {
        let cases: [(&str, usize, &[&str]); 6] = [
            ("1\n2\n3\n4\n5", 2, &["4", "5"]),
            ("1\n2", 2, &["1", "2"]),
            ("1\n2", 3, &["1", "2"]),
            ("1\n2222\n3\n4444\n5", 2, &["4444", "5"]),
            ("", 5, &[]),
            ("1\n2\n3", 0, &[]),
        ];
        for (content, n, expect) in cases {
            let file = temp_file(content.as_bytes());
            let lines = tail_n(file.path(), n).unwrap();
            assert_eq!(lines, expect, "content {:?}, n {}", content, n);
        }
    }

    #[test]
    fn test_trailing_newline_not_a_line() {
        let file = temp_file(b"a\nb\nc\n");
        assert_eq!(tail_n(file.path(), 2).unwrap(), vec!["b", "c"]);
        assert_eq!(tail_n(file.path(), 10).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_crlf_lines() {
        let file = temp_file(b"one\r\ntwo\r\nthree\r\n");
        assert_eq!(tail_n(file.path(), 2).unwrap(), vec!["two", "three"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.log");
        assert!(matches!(tail_n(&missing, 3), Err(TailError::Open { .. })));
        assert!(matches!(tail_n(&missing, 0), Err(TailError::Open { .. })));
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        assert!(matches!(
            TailReader::with_buffer_size(0),
            Err(TailError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_lines_reads_nothing() {
        let mut cursor = Cursor::new(b"a\nb\nc\n".to_vec());
        let (lines, stats) = TailReader::new().read_tail_with_stats(&mut cursor, 0).unwrap();
        assert!(lines.is_empty());
        assert_eq!(stats, TailStats::default());
    }

    #[test]
    fn test_small_file_single_round() {
        let content = "alpha\nbeta\ngamma\ndelta\n";
        for n in 0..6 {
            let mut cursor = Cursor::new(content.as_bytes().to_vec());
            let (lines, stats) = TailReader::new().read_tail_with_stats(&mut cursor, n).unwrap();
            assert_eq!(lines, expected_tail(content, n));
            if n > 0 {
                assert_eq!(stats.rounds, 1);
                assert_eq!(stats.bytes_read, content.len() as u64);
            }
        }
    }

    #[test]
    fn test_window_grows_across_chunk_boundaries() {
        let content: String = (0..300)
            .map(|i| format!("line {} {}\n", i, "x".repeat(i % 37)))
            .collect();
        for buffer_size in [1, 2, 3, 7, 16, 64, 1024] {
            let reader = TailReader::with_buffer_size(buffer_size).unwrap();
            for n in [1, 2, 5, 17, 100, 299, 300, 301, 1000] {
                let mut cursor = Cursor::new(content.as_bytes().to_vec());
                let lines = reader.read_tail(&mut cursor, n).unwrap();
                assert_eq!(
                    lines,
                    expected_tail(&content, n),
                    "buffer {} n {}",
                    buffer_size,
                    n
                );
            }
        }
    }

    #[test]
    fn test_reads_only_the_tail() {
        let content: String = (0..10_000).map(|i| format!("{:08}\n", i)).collect();
        let mut cursor = Cursor::new(content.as_bytes().to_vec());
        let (lines, stats) = TailReader::new().read_tail_with_stats(&mut cursor, 3).unwrap();
        assert_eq!(lines, vec!["00009997", "00009998", "00009999"]);
        assert_eq!(stats.rounds, 1);
        assert_eq!(stats.bytes_read, DEFAULT_BUFFER_SIZE as u64);

        // 200 lines of 9 bytes need two 1024-byte chunks.
        let mut cursor = Cursor::new(content.as_bytes().to_vec());
        let (lines, stats) = TailReader::new().read_tail_with_stats(&mut cursor, 200).unwrap();
        assert_eq!(lines.len(), 200);
        assert_eq!(lines[0], "00009800");
        assert_eq!(stats.rounds, 2);
        assert_eq!(stats.bytes_read, 2 * DEFAULT_BUFFER_SIZE as u64);
    }

    #[test]
    fn test_whole_file_when_n_exceeds_lines() {
        let content: String = (0..500).map(|i| format!("{}\n", i)).collect();
        let mut cursor = Cursor::new(content.as_bytes().to_vec());
        let (lines, stats) = TailReader::new().read_tail_with_stats(&mut cursor, 10_000).unwrap();
        assert_eq!(lines.len(), 500);
        assert_eq!(lines[0], "0");
        assert_eq!(stats.bytes_read, content.len() as u64);
    }

    #[test]
    fn test_long_last_line_spanning_chunks() {
        let long = "z".repeat(5000);
        let content = format!("first\nsecond\n{}", long);
        let file = temp_file(content.as_bytes());
        assert_eq!(tail_n(file.path(), 1).unwrap(), vec![long.clone()]);
        assert_eq!(tail_n(file.path(), 2).unwrap(), vec!["second".to_string(), long]);
    }

    #[test]
    fn test_idempotent() {
        let content: String = (0..2000).map(|i| format!("entry-{}\n", i)).collect();
        let file = temp_file(content.as_bytes());
        let first = tail_n(file.path(), 150).unwrap();
        let second = tail_n(file.path(), 150).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, expected_tail(&content, 150));
    }

    /// Claims to be longer than the data it holds.
    struct ShrunkFile {
        inner: Cursor<Vec<u8>>,
        claimed_len: u64,
    }

    impl Read for ShrunkFile {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for ShrunkFile {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            match pos {
                SeekFrom::End(0) => Ok(self.claimed_len),
                other => self.inner.seek(other),
            }
        }
    }

    #[test]
    fn test_short_read_is_an_error() {
        let mut reader = ShrunkFile {
            inner: Cursor::new(b"a\nb\n".to_vec()),
            claimed_len: 100,
        };
        let result = TailReader::new().read_tail(&mut reader, 1);
        assert!(matches!(result, Err(TailError::Read(_))));
    }

    /// Cannot report its length.
    struct UnsizedStream(Cursor<Vec<u8>>);

    impl Read for UnsizedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Seek for UnsizedStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            match pos {
                SeekFrom::End(_) => Err(io::Error::new(io::ErrorKind::Unsupported, "no end")),
                other => self.0.seek(other),
            }
        }
    }

    #[test]
    fn test_unknown_size_is_a_stat_error() {
        let mut reader = UnsizedStream(Cursor::new(b"a\nb\n".to_vec()));
        let result = TailReader::new().read_tail(&mut reader, 1);
        assert!(matches!(result, Err(TailError::Stat(_))));
    }
}
