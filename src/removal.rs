//! Removal executor.
//!
//! Deletes a batch of files one at a time. Every path is attempted; a failure
//! is recorded and the batch moves on. Nothing is retried or rolled back.

use chrono::{Local, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::progress::{create_progress_bar, log_progress, ProgressMode};

/// Prefix of the per-run audit file name.
pub const AUDIT_FILE_PREFIX: &str = "deletion_audit";

/// Partition of one removal batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemovalReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl RemovalReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Deleted,
    Failed,
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    timestamp: String,
    path: &'a Path,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Append-only JSON-lines record of removal attempts, one file per run.
pub struct AuditLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AuditLog {
    /// Create a fresh `deletion_audit_YYYYmmdd_HHMMSS.jsonl` in `dir`.
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{AUDIT_FILE_PREFIX}_{stamp}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            writer: BufWriter::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, path: &Path, outcome: Outcome, reason: Option<&str>) -> std::io::Result<()> {
        let entry = AuditEntry {
            timestamp: Utc::now().to_rfc3339(),
            path,
            outcome,
            reason,
        };
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Log-and-continue wrapper; the audit never changes a removal outcome.
    fn record(&mut self, path: &Path, outcome: Outcome, reason: Option<&str>) {
        if let Err(e) = self.append(path, outcome, reason) {
            warn!("Audit write to {} failed: {}", self.path.display(), e);
        }
    }
}

/// Delete every path, independently.
///
/// Each input path ends up in exactly one of `succeeded` or `failed`, in input
/// order. `reason` is the OS error text.
pub fn delete_files<P: AsRef<Path>>(paths: &[P], mut audit: Option<&mut AuditLog>, mode: ProgressMode) -> RemovalReport {
    let total = paths.len() as u64;
    let pb = create_progress_bar(total, "Deleting files", mode);
    let mut report = RemovalReport::default();

    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                if let Some(log) = audit.as_deref_mut() {
                    log.record(path, Outcome::Deleted, None);
                }
                report.succeeded.push(path.to_path_buf());
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Failed to delete {}: {}", path.display(), reason);
                if let Some(log) = audit.as_deref_mut() {
                    log.record(path, Outcome::Failed, Some(&reason));
                }
                report.failed.push((path.to_path_buf(), reason));
            }
        }
        pb.inc(1);
        log_progress(mode, "delete", i as u64 + 1, total, 100);
    }

    pb.finish_with_message(format!(
        "Deleted {} files ({} failed)",
        report.succeeded.len(),
        report.failed.len()
    ));
    info!(
        "Removal batch: {} deleted, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    report
}
