//! Streaming manifest reader.
//!
//! Yields one [`Record`] per line without ever holding the whole manifest.
//! Any malformed line or ordering violation ends the stream with an error;
//! a damaged manifest is never partially trusted.

use super::codec::{decode_record, display_path};
use super::order::compare_paths;
use super::Record;
use crate::utils::errors::{LsrError, Result};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub struct ManifestReader<R> {
    input: R,
    line_no: usize,
    buf: String,
    last_path: Option<Vec<u8>>,
    failed: bool,
}

impl ManifestReader<BufReader<File>> {
    /// Open the manifest at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist, which callers treat
    /// as an empty previous snapshot.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        match File::open(path) {
            Ok(file) => Ok(Some(Self::new(BufReader::new(file)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LsrError::file(path, e)),
        }
    }
}

impl<R: BufRead> ManifestReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line_no: 0,
            buf: String::new(),
            last_path: None,
            failed: false,
        }
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        self.buf.clear();
        if self.input.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        let line = self.buf.strip_suffix('\n').unwrap_or(&self.buf);
        let record = decode_record(line).map_err(|reason| LsrError::corrupt(self.line_no, reason))?;

        if let Some(last) = &self.last_path {
            if compare_paths(last, &record.path) != Ordering::Less {
                return Err(LsrError::corrupt(
                    self.line_no,
                    format!(
                        "{} is out of order after {}",
                        display_path(&record.path),
                        display_path(last)
                    ),
                ));
            }
        }
        self.last_path = Some(record.path.clone());

        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for ManifestReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.read_record().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}
