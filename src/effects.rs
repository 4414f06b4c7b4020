//! Side effects the UI triggers outside the terminal.
//!
//! Opening a browser and writing export files are behind small traits so the
//! app can be driven in tests without touching the desktop or the disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Opens URLs in the user's browser.
pub trait UrlOpener {
    /// Open `url`, returning once the request was handed to the OS.
    fn open_url(&self, url: &str) -> io::Result<()>;
}

/// Writes export files.
pub trait FileWriter {
    /// Write `contents` to a file named `filename`, returning its path.
    fn write_file(&self, filename: &str, contents: &str) -> io::Result<PathBuf>;
}

/// Opens URLs with the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open_url(&self, url: &str) -> io::Result<()> {
        debug!(url, "Opening in browser");
        open::that(url)
    }
}

/// Writes export files into a directory, the working directory by default.
#[derive(Debug, Clone)]
pub struct FsExportWriter {
    dir: PathBuf,
}

impl FsExportWriter {
    /// Write into the current working directory.
    pub fn new() -> Self {
        Self::in_dir(".")
    }

    /// Write into `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl Default for FsExportWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWriter for FsExportWriter {
    fn write_file(&self, filename: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.dir.join(filename);
        fs::write(&path, contents)?;
        info!(path = %path.display(), bytes = contents.len(), "Wrote export file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_export_writer_writes_file() {
        let dir = TempDir::new().unwrap();
        let writer = FsExportWriter::in_dir(dir.path());

        let path = writer
            .write_file("export_03-01-2024_101500_2.txt", "*AAA-1\nAAA-2\n")
            .unwrap();

        assert_eq!(path, dir.path().join("export_03-01-2024_101500_2.txt"));
        assert_eq!(fs::read_to_string(path).unwrap(), "*AAA-1\nAAA-2\n");
    }

    #[test]
    fn test_fs_export_writer_missing_dir_errors() {
        let dir = TempDir::new().unwrap();
        let writer = FsExportWriter::in_dir(dir.path().join("missing"));
        assert!(writer.write_file("x.txt", "").is_err());
    }
}
