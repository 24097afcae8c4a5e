//! Manifest diff engine.
//!
//! Merges the previous snapshot against the live walk in one pass. Both
//! streams arrive in [`compare_paths`] order, so a single cursor into the
//! previous snapshot is enough: records sorting before the current path were
//! deleted, an equal path is compared, anything after it is still pending.
//! Every visited file is forwarded to the new manifest in walk order.

use super::report::{ChangeEvent, Classification, EventSink, ScanSummary};
use crate::fs::hasher::Digester;
use crate::fs::walker::WalkItem;
use crate::manifest::codec::display_path;
use crate::manifest::order::is_within;
use crate::manifest::{compare_mtime, compare_paths, ManifestWriter, Record};
use crate::utils::errors::{LsrError, Result};
use std::cmp::Ordering;

/// Destination for the records of the new snapshot.
pub trait RecordSink {
    fn write_record(&mut self, record: &Record) -> Result<()>;
}

impl RecordSink for ManifestWriter {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        ManifestWriter::write_record(self, record)
    }
}

impl RecordSink for Vec<Record> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Drops records; used when the manifest is only checked.
#[derive(Debug, Default)]
pub struct Discard;

impl RecordSink for Discard {
    fn write_record(&mut self, _record: &Record) -> Result<()> {
        Ok(())
    }
}

/// Position in the previous snapshot.
pub struct PreviousCursor<I> {
    source: I,
    current: Option<Record>,
}

impl<I: Iterator<Item = Result<Record>>> PreviousCursor<I> {
    /// Prime the cursor with the first record.
    pub fn new(mut source: I) -> Result<Self> {
        let current = source.next().transpose()?;
        Ok(Self { source, current })
    }

    /// The record under the cursor, `None` at end of stream.
    pub fn peek(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Move past the current record and return it.
    pub fn advance(&mut self) -> Result<Option<Record>> {
        let next = self.source.next().transpose()?;
        if let (Some(current), Some(next)) = (&self.current, &next) {
            if compare_paths(&current.path, &next.path) != Ordering::Less {
                return Err(LsrError::OutOfOrder {
                    previous: display_path(&current.path).into_owned(),
                    current: display_path(&next.path).into_owned(),
                });
            }
        }
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Advance while the record under the cursor sorts strictly before `path`.
    fn take_before(&mut self, path: &[u8]) -> Result<Option<Record>> {
        let before = self
            .peek()
            .is_some_and(|prev| compare_paths(&prev.path, path) == Ordering::Less);
        if before {
            self.advance()
        } else {
            Ok(None)
        }
    }
}

/// Classify a path present in both snapshots.
pub fn classify(previous: &Record, current: &Record) -> Classification {
    let mtime = compare_mtime(previous.mtime, current.mtime);
    if previous.same_content(current) {
        match mtime {
            Ordering::Equal => Classification::Unchanged,
            _ => Classification::Touched,
        }
    } else {
        match mtime {
            Ordering::Less => Classification::Modified,
            Ordering::Greater => Classification::Reverted,
            Ordering::Equal => Classification::Corrupted,
        }
    }
}

/// Merge `previous` against `current`.
///
/// Emits exactly one event per path in either snapshot (one per skipped entry
/// for unreadable subtrees) and writes the new snapshot to `records`.
/// Any error aborts the merge.
pub fn diff_snapshots<P, C, D, E, R>(
    previous: P,
    current: C,
    digester: &mut D,
    events: &mut E,
    records: &mut R,
) -> Result<ScanSummary>
where
    P: IntoIterator<Item = Result<Record>>,
    C: IntoIterator<Item = Result<WalkItem>>,
    D: Digester + ?Sized,
    E: EventSink + ?Sized,
    R: RecordSink + ?Sized,
{
    let mut cursor = PreviousCursor::new(previous.into_iter())?;
    let mut summary = ScanSummary::default();
    let mut last_path: Option<Vec<u8>> = None;

    let mut emit = |summary: &mut ScanSummary, kind: Classification, path: Vec<u8>| {
        summary.count(kind);
        events.emit(ChangeEvent::new(kind, path))
    };

    for item in current {
        let item = item?;
        let path = match &item {
            WalkItem::File(file) => file.relative_path.as_slice(),
            WalkItem::Skipped { relative_path, .. } => relative_path.as_slice(),
        };

        if let Some(last) = &last_path {
            if compare_paths(last, path) != Ordering::Less {
                return Err(LsrError::OutOfOrder {
                    previous: display_path(last).into_owned(),
                    current: display_path(path).into_owned(),
                });
            }
        }
        last_path = Some(path.to_vec());

        while let Some(gone) = cursor.take_before(path)? {
            emit(&mut summary, Classification::Deleted, gone.path)?;
        }

        match item {
            WalkItem::File(file) => {
                let matched = cursor.peek().filter(|prev| prev.path == file.relative_path);
                let digest = digester.digest(&file, matched)?;
                let record = Record {
                    path: file.relative_path,
                    size: file.size,
                    mtime: file.mtime,
                    digest,
                };
                let kind = match matched {
                    Some(prev) => classify(prev, &record),
                    None => Classification::New,
                };
                if matched.is_some() {
                    cursor.advance()?;
                }

                records.write_record(&record)?;
                summary.total_files += 1;
                summary.total_bytes += record.size;
                emit(&mut summary, kind, record.path)?;
            }
            WalkItem::Skipped { relative_path, .. } => {
                while cursor
                    .peek()
                    .is_some_and(|prev| is_within(&prev.path, &relative_path))
                {
                    if let Some(kept) = cursor.advance()? {
                        records.write_record(&kept)?;
                        summary.carried_records += 1;
                    }
                }
                emit(&mut summary, Classification::Skipped, relative_path)?;
            }
        }
    }

    while let Some(gone) = cursor.advance()? {
        emit(&mut summary, Classification::Deleted, gone.path)?;
    }

    Ok(summary)
}
