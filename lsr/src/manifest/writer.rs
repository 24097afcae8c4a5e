//! Atomic manifest writer.
//!
//! Records go to `<manifest>.tmp` next to the manifest. [`ManifestWriter::commit`]
//! flushes, syncs and renames it over the manifest; dropping an uncommitted
//! writer removes the temp file and leaves the old manifest untouched.

use super::codec::encode_record;
use super::Record;
use crate::utils::errors::{LsrError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix appended to the manifest name for the in-progress file.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path of the in-progress manifest for `manifest`.
pub fn temp_path_for(manifest: &Path) -> PathBuf {
    let mut name = manifest.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

pub struct ManifestWriter {
    target: PathBuf,
    temp_path: PathBuf,
    out: Option<BufWriter<File>>,
    records: usize,
    committed: bool,
}

impl ManifestWriter {
    /// Start a new manifest that will replace `target` on commit.
    pub fn create(target: &Path) -> Result<Self> {
        let temp_path = temp_path_for(target);

        let file = {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o644);
            }
            opts.open(&temp_path)
                .map_err(|e| LsrError::file(&temp_path, e))?
        };

        debug!("Writing new manifest to {}", temp_path.display());

        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            out: Some(BufWriter::new(file)),
            records: 0,
            committed: false,
        })
    }

    /// Append one record.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let out = self.out.as_mut().ok_or_else(|| {
            LsrError::file(&self.temp_path, std::io::Error::other("manifest already committed"))
        })?;
        writeln!(out, "{}", encode_record(record)).map_err(|e| LsrError::file(&self.temp_path, e))?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flush, sync and atomically replace the target manifest.
    pub fn commit(mut self) -> Result<()> {
        let out = self.out.take().ok_or_else(|| {
            LsrError::file(&self.temp_path, std::io::Error::other("manifest already committed"))
        })?;
        let file = out
            .into_inner()
            .map_err(|e| LsrError::file(&self.temp_path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| LsrError::file(&self.temp_path, e))?;
        drop(file);

        fs::rename(&self.temp_path, &self.target).map_err(|e| LsrError::file(&self.target, e))?;

        debug!(
            "Replaced {} ({} records)",
            self.target.display(),
            self.records
        );
        self.committed = true;
        Ok(())
    }
}

impl Drop for ManifestWriter {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.out.take();
        if let Err(e) = fs::remove_file(&self.temp_path) {
            warn!(
                "Failed to remove unfinished manifest {}: {}",
                self.temp_path.display(),
                e
            );
        }
    }
}
