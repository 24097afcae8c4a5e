//! Change classification and the diagnostic stream.

use crate::manifest::codec::display_path;
use crate::utils::errors::Result;
use std::fmt;
use std::io::Write;

/// What happened to one path between the previous and current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Only on disk
    New,
    /// Only in the previous manifest
    Deleted,
    /// Content changed, mtime moved forward
    Modified,
    /// Content changed, mtime moved backward
    Reverted,
    /// Same content, different mtime
    Touched,
    /// Content changed but mtime did not
    Corrupted,
    Unchanged,
    /// Could not be read this run; previous records were kept
    Skipped,
}

impl Classification {
    /// One-letter code used in the diagnostic stream. `None` for unchanged paths.
    pub fn code(self) -> Option<char> {
        match self {
            Classification::New => Some('N'),
            Classification::Deleted => Some('D'),
            Classification::Modified => Some('M'),
            Classification::Reverted => Some('R'),
            Classification::Touched => Some('T'),
            Classification::Corrupted => Some('C'),
            Classification::Skipped => Some('S'),
            Classification::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: Classification,
    pub path: Vec<u8>,
}

impl ChangeEvent {
    pub fn new(kind: Classification, path: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Paths that need escaping are quoted, so one event is always one line.
impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = display_path(&self.path);
        match self.kind.code() {
            Some(code) => write!(f, "{} {}", code, path),
            None => write!(f, "  {}", path),
        }
    }
}

/// Receives every classification the diff engine produces, in path order.
pub trait EventSink {
    fn emit(&mut self, event: ChangeEvent) -> Result<()>;
}

impl EventSink for Vec<ChangeEvent> {
    fn emit(&mut self, event: ChangeEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Writes `<code> <path>` lines, staying silent for unchanged paths.
pub struct DiagnosticWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> DiagnosticWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// Number of lines written.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> EventSink for DiagnosticWriter<W> {
    fn emit(&mut self, event: ChangeEvent) -> Result<()> {
        if event.kind.code().is_some() {
            writeln!(self.out, "{}", event)?;
            self.lines += 1;
        }
        Ok(())
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total_files: usize,
    pub total_bytes: u64,
    pub new_files: usize,
    pub deleted_files: usize,
    pub modified_files: usize,
    pub reverted_files: usize,
    pub touched_files: usize,
    pub corrupted_files: usize,
    pub unchanged_files: usize,
    pub skipped_entries: usize,
    /// Previous records kept because their path was skipped
    pub carried_records: usize,
    pub hashed_files: usize,
    pub reused_digests: usize,
    pub duration_secs: u64,
}

impl ScanSummary {
    pub(crate) fn count(&mut self, kind: Classification) {
        let counter = match kind {
            Classification::New => &mut self.new_files,
            Classification::Deleted => &mut self.deleted_files,
            Classification::Modified => &mut self.modified_files,
            Classification::Reverted => &mut self.reverted_files,
            Classification::Touched => &mut self.touched_files,
            Classification::Corrupted => &mut self.corrupted_files,
            Classification::Unchanged => &mut self.unchanged_files,
            Classification::Skipped => &mut self.skipped_entries,
        };
        *counter += 1;
    }

    /// Number of paths that produced a diagnostic line.
    pub fn changes(&self) -> usize {
        self.new_files
            + self.deleted_files
            + self.modified_files
            + self.reverted_files
            + self.touched_files
            + self.corrupted_files
            + self.skipped_entries
    }
}
