//! Export destinations: a directory tree or a single zip archive.

use crate::model::error::ExportError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Where exported documents are written.
///
/// Paths handed to [`ExportSink::write`] are relative and `/`-separated.
pub trait ExportSink {
    /// Write one file.
    ///
    /// # Errors
    ///
    /// Returns an [`ExportError`] if the file cannot be written.
    fn write(&mut self, relative_path: &str, contents: &[u8]) -> Result<(), ExportError>;

    /// Flush everything and return the destination path.
    ///
    /// # Errors
    ///
    /// Returns an [`ExportError`] if the destination cannot be finalized.
    fn finish(self: Box<Self>) -> Result<PathBuf, ExportError>;
}

/// Writes files under a root directory, creating parents as needed.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Create the root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Io` if the directory cannot be created.
    pub fn create(root: &Path) -> Result<Self, ExportError> {
        std::fs::create_dir_all(root).map_err(|source| ExportError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl ExportSink for DirectorySink {
    fn write(&mut self, relative_path: &str, contents: &[u8]) -> Result<(), ExportError> {
        let path = relative_path
            .split('/')
            .fold(self.root.clone(), |acc, part| acc.join(part));
        let io_error = |source| ExportError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&path, contents).map_err(io_error)
    }

    fn finish(self: Box<Self>) -> Result<PathBuf, ExportError> {
        Ok(self.root)
    }
}

/// Writes deflated entries into one zip archive.
pub struct ZipSink {
    path: PathBuf,
    writer: ZipWriter<File>,
}

impl ZipSink {
    /// Create (or truncate) the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Io` if the archive file cannot be created.
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let io_error = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = File::create(path).map_err(io_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: ZipWriter::new(file),
        })
    }

    fn archive_error(&self, error: impl std::fmt::Display) -> ExportError {
        ExportError::Archive {
            path: self.path.clone(),
            message: error.to_string(),
        }
    }
}

impl ExportSink for ZipSink {
    fn write(&mut self, relative_path: &str, contents: &[u8]) -> Result<(), ExportError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(relative_path, options)
            .map_err(|e| self.archive_error(e))?;
        self.writer
            .write_all(contents)
            .map_err(|e| self.archive_error(e))
    }

    fn finish(self: Box<Self>) -> Result<PathBuf, ExportError> {
        let ZipSink { path, writer } = *self;
        writer.finish().map_err(|e| ExportError::Archive {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(path)
    }
}
