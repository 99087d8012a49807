//! Line splitting over an open file handle.

use crate::error::Result;
use crate::identity::{FileIdentity, FileStat};
use std::collections::VecDeque;
use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Lines are terminated by CRLF regardless of platform.
pub const LINE_SEPARATOR: &[u8] = b"\r\n";

/// Splits raw chunks into complete lines, carrying the unterminated tail
/// over to the next chunk.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    remainder: Vec<u8>,
}

impl LineSplitter {
    /// Appends `chunk` and moves every completed line into `out`. Invalid
    /// UTF-8 is replaced with U+FFFD.
    pub(crate) fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<String>) {
        // A separator may straddle the previous chunk boundary.
        let mut cursor = self.remainder.len().saturating_sub(LINE_SEPARATOR.len() - 1);
        self.remainder.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(pos) = find_separator(&self.remainder[cursor..]) {
            let end = cursor + pos;
            out.push_back(String::from_utf8_lossy(&self.remainder[start..end]).into_owned());
            start = end + LINE_SEPARATOR.len();
            cursor = start;
        }

        self.remainder.drain(..start);
    }

    #[cfg(test)]
    pub(crate) fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    pub(crate) fn clear(&mut self) {
        self.remainder.clear();
    }
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(LINE_SEPARATOR.len())
        .position(|window| window == LINE_SEPARATOR)
}

/// An open handle on one file instance, read incrementally.
pub(crate) struct OpenFile {
    file: File,
    stat: FileStat,
    position: u64,
    splitter: LineSplitter,
    buf: Vec<u8>,
}

impl OpenFile {
    /// Opens `path` for reading from the start, or returns `Ok(None)` if it
    /// does not exist.
    pub(crate) async fn open(path: &Path, chunk_size: usize) -> Result<Option<Self>> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;

        Ok(Some(Self {
            file,
            stat: FileStat::from_metadata(&metadata),
            position: 0,
            splitter: LineSplitter::default(),
            buf: vec![0; chunk_size.max(1)],
        }))
    }

    pub(crate) fn identity(&self) -> FileIdentity {
        self.stat.identity
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// Reads one chunk, queueing any lines it completes. Returns the number
    /// of bytes read; zero means no more data is available for now.
    pub(crate) async fn read_chunk(&mut self, out: &mut VecDeque<String>) -> Result<usize> {
        let n = self.file.read(&mut self.buf).await?;
        if n > 0 {
            self.position += n as u64;
            self.splitter.feed(&self.buf[..n], out);
        }
        Ok(n)
    }

    /// Restarts reading from the beginning after an in-place truncation.
    pub(crate) async fn rewind(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        self.position = 0;
        self.splitter.clear();
        Ok(())
    }

    /// Returns `true` when `current` shows the file shrank below what was
    /// already read.
    pub(crate) fn was_truncated(&self, current: &FileStat) -> bool {
        current.len < self.position()
    }
}
