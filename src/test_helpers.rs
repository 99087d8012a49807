//! Test utilities for creating, appending to and rotating temporary log files.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogFile {
    /// Create a new, empty temporary log file
    pub fn new() -> std::io::Result<Self> {
        let temp_file = Self::missing()?;
        File::create(&temp_file.path)?;
        Ok(temp_file)
    }

    /// Reserve a log path inside a fresh temp dir without creating the file
    pub fn missing() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file with one initial line
    pub fn with_content(line: &str) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_line(line)?;
        Ok(temp_file)
    }

    /// Append one CRLF-terminated line
    pub fn append_line(&self, line: &str) -> std::io::Result<()> {
        self.append_raw(format!("{}\r\n", line).as_bytes())
    }

    /// Append bytes verbatim, creating the file if needed
    pub fn append_raw(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    /// Truncate the file in place, keeping its identity
    pub fn truncate(&self) -> std::io::Result<()> {
        OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        Ok(())
    }

    /// Rename the file away and create an empty replacement at the same path
    pub fn rotate(&self) -> std::io::Result<PathBuf> {
        let rotated = self.rotated_path();
        fs::rename(&self.path, &rotated)?;
        File::create(&self.path)?;
        Ok(rotated)
    }

    /// Delete the file
    pub fn remove(&self) -> std::io::Result<()> {
        fs::remove_file(&self.path)
    }

    pub fn rotated_path(&self) -> PathBuf {
        self.path.with_extension("log.1")
    }

    /// Get the path to the temporary file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_missing_does_not_create() {
        let temp_file = TempLogFile::missing().unwrap();
        assert!(!temp_file.path().exists());
        assert!(temp_file.path().parent().unwrap().exists());
    }

    #[test]
    fn test_append_line_uses_crlf() {
        let temp_file = TempLogFile::new().unwrap();
        temp_file.append_line("line 1").unwrap();
        temp_file.append_line("line 2").unwrap();

        let content = fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "line 1\r\nline 2\r\n");
    }

    #[test]
    fn test_truncate() {
        let temp_file = TempLogFile::with_content("initial content").unwrap();
        temp_file.truncate().unwrap();

        let content = fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_remove_then_recreate() {
        let temp_file = TempLogFile::with_content("gone").unwrap();
        temp_file.remove().unwrap();
        assert!(!temp_file.path().exists());

        temp_file.append_line("back").unwrap();
        assert_eq!(fs::read_to_string(temp_file.path()).unwrap(), "back\r\n");
    }

    #[test]
    fn test_rotate_moves_old_content_aside() {
        let temp_file = TempLogFile::with_content("old").unwrap();
        let rotated = temp_file.rotate().unwrap();

        assert_eq!(fs::read_to_string(&rotated).unwrap(), "old\r\n");
        assert!(fs::read_to_string(temp_file.path()).unwrap().is_empty());
    }
}
