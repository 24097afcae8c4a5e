//! Scan executor - runs one snapshot-and-compare pass over a directory.
//!
//! Opens the previous manifest, walks the tree, hands both streams to the
//! diff engine and, in update mode, swaps the new manifest into place once
//! everything succeeded.

pub mod diff;
pub mod report;

use crate::config::{Config, WalkErrorPolicy};
use crate::fs::hasher::{ContentHasher, Digester};
use crate::fs::walker::{WalkItem, WalkOptions, Walker};
use crate::manifest::codec::{display_path, encode_record};
use crate::manifest::writer::temp_path_for;
use crate::manifest::{ManifestReader, ManifestWriter, Record};
use crate::utils::errors::{LsrError, Result};
use diff::{diff_snapshots, Discard};
use report::{DiagnosticWriter, ScanSummary};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// What a scan does with its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Report changes and replace the manifest
    Update,
    /// Report changes, leave the manifest alone
    Check,
}

/// Scan job configuration
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub root: PathBuf,
    pub manifest_name: String,
    pub trust: bool,
    pub follow_links: bool,
    pub on_walk_error: WalkErrorPolicy,
    pub mode: ScanMode,
}

impl ScanJob {
    pub fn new(root: impl Into<PathBuf>, config: &Config, mode: ScanMode) -> Self {
        Self {
            root: root.into(),
            manifest_name: config.scan.manifest_name.clone(),
            trust: config.scan.trust,
            follow_links: config.scan.follow_links,
            on_walk_error: config.scan.on_walk_error,
            mode,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest_name)
    }

    fn walk_options(&self) -> WalkOptions {
        let temp_name = temp_path_for(Path::new(&self.manifest_name))
            .to_string_lossy()
            .into_owned();
        WalkOptions {
            follow_links: self.follow_links,
            exclude_root_names: vec![self.manifest_name.clone(), temp_name],
            skip_errors: self.on_walk_error == WalkErrorPolicy::Skip,
        }
    }
}

/// Main scan executor
pub struct ScanExecutor<W: Write> {
    out: DiagnosticWriter<W>,
}

impl<W: Write> ScanExecutor<W> {
    /// Create an executor that reports changes to `out`
    pub fn new(out: W) -> Self {
        Self {
            out: DiagnosticWriter::new(out),
        }
    }

    /// Execute a scan job
    pub fn execute(&mut self, job: &ScanJob) -> Result<ScanSummary> {
        let start_time = Instant::now();
        check_root(&job.root)?;

        let manifest_path = job.manifest_path();
        info!(
            "Scanning {} against {} (trust: {}, mode: {:?})",
            job.root.display(),
            manifest_path.display(),
            job.trust,
            job.mode
        );

        let previous = ManifestReader::open(&manifest_path)?;
        if previous.is_none() {
            info!("No previous manifest, every file will be reported as new");
        }

        let walker = Walker::new(&job.root, job.walk_options());
        let mut hasher = ContentHasher::new(job.trust);

        let mut summary = match job.mode {
            ScanMode::Update => {
                let mut writer = ManifestWriter::create(&manifest_path)?;
                let summary = diff_snapshots(
                    previous.into_iter().flatten(),
                    walker,
                    &mut hasher,
                    &mut self.out,
                    &mut writer,
                )?;
                self.out.flush()?;
                let written = writer.records();
                writer.commit()?;
                info!("Wrote {} records to {}", written, manifest_path.display());
                summary
            }
            ScanMode::Check => {
                let summary = diff_snapshots(
                    previous.into_iter().flatten(),
                    walker,
                    &mut hasher,
                    &mut self.out,
                    &mut Discard,
                )?;
                self.out.flush()?;
                summary
            }
        };

        summary.hashed_files = hasher.hashed();
        summary.reused_digests = hasher.reused();
        summary.duration_secs = start_time.elapsed().as_secs();

        info!(
            "Scan complete: {} files, {} bytes, {} changes ({} new, {} deleted, {} modified, {} reverted, {} touched, {} corrupted, {} skipped) in {}s",
            summary.total_files,
            summary.total_bytes,
            summary.changes(),
            summary.new_files,
            summary.deleted_files,
            summary.modified_files,
            summary.reverted_files,
            summary.touched_files,
            summary.corrupted_files,
            summary.skipped_entries,
            summary.duration_secs
        );
        if summary.corrupted_files > 0 {
            warn!(
                "{} files changed content without a timestamp change",
                summary.corrupted_files
            );
        }
        info!(
            "Digests: {} hashed, {} reused; {} diagnostic lines",
            summary.hashed_files,
            summary.reused_digests,
            self.out.lines()
        );

        Ok(summary)
    }
}

/// Print a full listing of `root` to `out`, one manifest line per file.
///
/// Nothing is compared and no manifest is read or written.
pub fn list_tree<W: Write>(job: &ScanJob, mut out: W) -> Result<usize> {
    check_root(&job.root)?;

    let mut hasher = ContentHasher::new(false);
    let mut listed = 0;
    for item in Walker::new(&job.root, job.walk_options()) {
        match item? {
            WalkItem::File(file) => {
                let record = Record {
                    digest: hasher.digest(&file, None)?,
                    path: file.relative_path,
                    size: file.size,
                    mtime: file.mtime,
                };
                writeln!(out, "{}", encode_record(&record))?;
                listed += 1;
            }
            WalkItem::Skipped { relative_path, reason } => {
                warn!("Not listed: {}: {}", display_path(&relative_path), reason);
            }
        }
    }
    out.flush()?;

    info!("Listed {} files under {}", listed, job.root.display());
    Ok(listed)
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| LsrError::file(root, e))?;
    if !metadata.is_dir() {
        return Err(LsrError::Config(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn job(root: &Path, mode: ScanMode, trust: bool) -> ScanJob {
        let config = Config {
            scan: crate::config::ScanConfig {
                trust,
                ..Default::default()
            },
            ..Default::default()
        };
        ScanJob::new(root, &config, mode)
    }

    fn scan(root: &Path, mode: ScanMode, trust: bool) -> Result<(Vec<String>, ScanSummary)> {
        let mut out = Vec::new();
        let summary = ScanExecutor::new(&mut out).execute(&job(root, mode, trust))?;
        let text = String::from_utf8(out).expect("utf-8 report");
        Ok((text.lines().map(str::to_string).collect(), summary))
    }

    fn update(root: &Path) -> Result<Vec<String>> {
        Ok(scan(root, ScanMode::Update, false)?.0)
    }

    fn set_mtime(path: &Path, mtime: SystemTime) -> Result<()> {
        fs::File::options().write(true).open(path)?.set_modified(mtime)?;
        Ok(())
    }

    /// Rewrite a file and put its mtime back where `offset` says.
    fn rewrite(path: &Path, contents: &[u8], base: SystemTime, offset: i64) -> Result<()> {
        fs::write(path, contents)?;
        let mtime = if offset >= 0 {
            base + Duration::from_secs(offset as u64)
        } else {
            base - Duration::from_secs(offset.unsigned_abs())
        };
        set_mtime(path, mtime)
    }

    fn base_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
    }

    fn populate(root: &Path) -> Result<()> {
        fs::create_dir_all(root.join("a/b"))?;
        for (name, body) in [
            ("a/b/c", "c"),
            ("a-b", "dash"),
            ("a.txt", "0123456789"),
            ("b.txt", "bee"),
        ] {
            fs::write(root.join(name), body)?;
            set_mtime(&root.join(name), base_time())?;
        }
        Ok(())
    }

    #[test]
    fn test_first_run_then_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        populate(dir.path())?;

        let (lines, summary) = scan(dir.path(), ScanMode::Update, false)?;
        assert_eq!(lines, ["N a/b/c", "N a-b", "N a.txt", "N b.txt"]);
        assert_eq!(summary.total_files, 4);
        assert!(dir.path().join(".lsr").exists());
        assert!(!dir.path().join(".lsr.tmp").exists());

        let (lines, summary) = scan(dir.path(), ScanMode::Update, false)?;
        assert!(lines.is_empty(), "second run reported {lines:?}");
        assert_eq!(summary.unchanged_files, 4);
        Ok(())
    }

    #[test]
    fn test_change_scenarios() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        populate(root)?;
        update(root)?;

        let a = root.join("a.txt");
        rewrite(&a, b"0123456789AB", base_time(), 60)?;
        fs::remove_file(root.join("b.txt"))?;
        fs::write(root.join("c.txt"), b"new")?;
        assert_eq!(update(root)?, ["M a.txt", "D b.txt", "N c.txt"]);

        rewrite(&a, b"0123456789", base_time(), 0)?;
        assert_eq!(update(root)?, ["R a.txt"]);

        // Same size, same mtime, different bytes
        rewrite(&a, b"012345678X", base_time(), 0)?;
        assert_eq!(update(root)?, ["C a.txt"]);

        set_mtime(&a, base_time() + Duration::from_secs(2))?;
        assert_eq!(update(root)?, ["T a.txt"]);

        assert!(update(root)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_trust_mode_skips_reading() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        populate(root)?;
        update(root)?;

        rewrite(&root.join("a.txt"), b"012345678X", base_time(), 0)?;

        let (lines, summary) = scan(root, ScanMode::Check, true)?;
        assert!(lines.is_empty());
        assert_eq!(summary.reused_digests, 4);
        assert_eq!(summary.hashed_files, 0);

        let (lines, _) = scan(root, ScanMode::Check, false)?;
        assert_eq!(lines, ["C a.txt"]);
        Ok(())
    }

    #[test]
    fn test_check_mode_leaves_manifest() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        populate(root)?;
        update(root)?;
        let before = fs::read(root.join(".lsr"))?;

        fs::write(root.join("extra"), b"x")?;
        let (lines, _) = scan(root, ScanMode::Check, false)?;
        assert_eq!(lines, ["N extra"]);
        assert_eq!(fs::read(root.join(".lsr"))?, before);

        // Still new, nothing was recorded
        assert_eq!(scan(root, ScanMode::Check, false)?.0, ["N extra"]);
        Ok(())
    }

    #[test]
    fn test_corrupt_manifest_aborts_without_replacing() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        populate(root)?;
        update(root)?;

        let mut damaged = fs::read(root.join(".lsr"))?;
        damaged.extend_from_slice(b"\"zz\"\t1\tnot-a-time\t00\n");
        fs::write(root.join(".lsr"), &damaged)?;
        fs::write(root.join("new-file"), b"x")?;

        let err = scan(root, ScanMode::Update, false).unwrap_err();
        assert!(matches!(err, LsrError::ManifestCorrupt { line: 5, .. }));
        assert_eq!(fs::read(root.join(".lsr"))?, damaged);
        assert!(!root.join(".lsr.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_custom_manifest_name() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::write(root.join("f"), b"x")?;

        let mut job = job(root, ScanMode::Update, false);
        job.manifest_name = "SUMS".to_string();
        let mut out = Vec::new();
        ScanExecutor::new(&mut out).execute(&job)?;
        ScanExecutor::new(&mut out).execute(&job)?;

        assert_eq!(String::from_utf8(out).unwrap(), "N f\n");
        assert!(root.join("SUMS").exists());
        assert!(!root.join(".lsr").exists());
        Ok(())
    }

    #[test]
    fn test_list_tree() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::write(root.join("hello"), b"hello world")?;
        set_mtime(&root.join("hello"), base_time())?;
        fs::write(root.join(".lsr"), b"ignored")?;

        let mut out = Vec::new();
        let listed = list_tree(&job(root, ScanMode::Check, false), &mut out)?;
        assert_eq!(listed, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"hello\"\t11\t2020-09-13T12:26:40Z\t\
             b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9\n"
        );
        Ok(())
    }

    #[test]
    fn test_newline_in_name_stays_on_one_line() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::write(root.join("a.txt"), b"a")?;
        let evil = root.join("evil\nD a.txt");
        fs::write(&evil, b"x")?;

        assert_eq!(update(root)?, [r#"N a.txt"#, r#"N "evil\nD a.txt""#]);
        fs::remove_file(&evil)?;
        assert_eq!(update(root)?, [r#"D "evil\nD a.txt""#]);
        assert!(update(root)?.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_tracked() -> Result<()> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new()?;
        let root = dir.path();
        let odd = root.join(OsStr::from_bytes(b"caf\xe9"));
        if fs::write(&odd, b"x").is_err() {
            // Filesystem insists on UTF-8 names
            return Ok(());
        }
        fs::write(root.join("ok"), b"y")?;

        assert_eq!(update(root)?, [r#"N "caf\xe9""#, "N ok"]);
        assert!(update(root)?.is_empty());
        fs::remove_file(&odd)?;
        assert_eq!(update(root)?, [r#"D "caf\xe9""#]);
        Ok(())
    }

    #[test]
    fn test_root_must_be_directory() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("file"), b"x")?;
        assert!(matches!(
            scan(&dir.path().join("file"), ScanMode::Update, false),
            Err(LsrError::Config(_))
        ));
        assert!(scan(&dir.path().join("missing"), ScanMode::Update, false).is_err());
        Ok(())
    }
}
