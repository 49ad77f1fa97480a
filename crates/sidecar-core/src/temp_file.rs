//! Download temp files and atomic finalize.
//!
//! Downloads are written to `<destination>.part` and renamed onto the final
//! path only once the transfer has completed, so a failed fetch never leaves a
//! truncated file under the name the checksum step would read.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.hdf` -> `a.hdf.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Sequential writer for a `.part` file. Removed on drop unless finalized.
pub struct PartFile {
    file: Option<File>,
    temp_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create (or truncate) the temp file for `final_path`.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(PartFile {
            file: Some(file),
            temp_path,
            written: 0,
        })
    }

    /// Append `data`.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .context("temp file already finalized")?;
        file.write_all(data)
            .with_context(|| format!("write {}", self.temp_path.display()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Sync and atomically rename the temp file to `final_path`.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(mut self, final_path: &Path) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all().context("temp file sync failed")?;
        }
        std::fs::rename(&self.temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.temp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }
}

impl io::Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e)))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                tracing::debug!(
                    path = %self.temp_path.display(),
                    "could not remove temp file: {}",
                    e
                );
            }
        }
    }
}
