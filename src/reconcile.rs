//! Attachment reconciliation pipeline.
//!
//! Confirms each message's integrity digest, then binds every logical
//! attachment to one authoritative file in the target tree: first by
//! content hash + logical name against the [`ContentIndex`], then (for
//! misses caused by renumbered record ids) through the stale-id
//! recovery heuristic. A message either reconciles completely or not at
//! all; there is no partial binding and no best-guess substitution.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::checksum;
use crate::error::{MmsError, Result};
use crate::index::{builder, ContentIndex, IndexStats};
use crate::model::message::MmsMessage;
use crate::normalize;
use crate::recover;

/// What to do when a message fails integrity or resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Abort the whole run on the first failed message.
    #[default]
    Strict,
    /// Skip the failed message, keep going, report all failures at the end.
    Lenient,
}

/// Pipeline parameters, threaded explicitly so multiple configurations
/// can coexist in one process.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub mode: FailureMode,
    /// Directory on the target device where attachment files live;
    /// resolved attachments get their remote path rewritten under it.
    pub remote_parts_dir: PathBuf,
}

/// One skipped message in a lenient run.
#[derive(Debug, serde::Serialize)]
pub struct MessageFailure {
    pub message: String,
    pub error: String,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Default, serde::Serialize)]
pub struct ReconcileReport {
    /// Messages fully reconciled.
    pub reconciled: usize,
    /// Messages skipped in lenient mode.
    pub failures: Vec<MessageFailure>,
    /// Attachments bound via the content index.
    pub matched_by_index: usize,
    /// Attachments bound via stale-id recovery.
    pub recovered: usize,
    /// Index build counters.
    pub index: IndexStats,
}

/// Reconcile a batch of messages against the files under `target_root`.
///
/// Messages are processed in the order supplied. In strict mode the
/// first integrity violation aborts the run with its error; in lenient
/// mode failed messages are skipped and collected in the report.
pub fn reconcile(
    messages: &mut [MmsMessage],
    target_root: &Path,
    options: &ReconcileOptions,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<ReconcileReport> {
    let index = builder::build_index(target_root, None)?;

    let mut report = ReconcileReport {
        index: index.stats().clone(),
        ..Default::default()
    };

    let total = messages.len() as u64;
    for (i, msg) in messages.iter_mut().enumerate() {
        if let Some(progress) = progress {
            progress(i as u64, total);
        }
        match reconcile_message(msg, &index, target_root, options, &mut report) {
            Ok(()) => report.reconciled += 1,
            Err(e) => match options.mode {
                FailureMode::Strict => return Err(e),
                FailureMode::Lenient => {
                    warn!(message = %msg.identity(), error = %e, "Skipping message");
                    report.failures.push(MessageFailure {
                        message: msg.identity(),
                        error: e.to_string(),
                    });
                }
            },
        }
    }
    if let Some(progress) = progress {
        progress(total, total);
    }

    info!(
        reconciled = report.reconciled,
        skipped = report.failures.len(),
        matched = report.matched_by_index,
        recovered = report.recovered,
        "Reconciliation finished"
    );
    Ok(report)
}

/// Verify and resolve a single message. Mutates the message only after
/// every attachment has been resolved.
fn reconcile_message(
    msg: &mut MmsMessage,
    index: &ContentIndex,
    target_root: &Path,
    options: &ReconcileOptions,
    report: &mut ReconcileReport,
) -> Result<()> {
    verify_checksum(msg)?;

    let mut resolved: Vec<(String, PathBuf)> = Vec::new();
    for (name, att) in &msg.attachments {
        let (hash, _) = builder::hash_file(&att.local_path)?;
        let path = match index.lookup(&hash, name) {
            Some(path) => {
                report.matched_by_index += 1;
                path.to_path_buf()
            }
            None => {
                debug!(
                    message = %msg.identity(),
                    attachment = %name,
                    "Index miss, trying stale-id recovery"
                );
                let recovered = match normalize::stale_ref(&att.raw_path) {
                    Some(stale) => {
                        recover::resolve(target_root, stale.id, name, msg.date_millis)?
                    }
                    None => None,
                };
                match recovered {
                    Some(path) => {
                        report.recovered += 1;
                        path
                    }
                    None => {
                        return Err(MmsError::UnresolvedAttachment {
                            message: msg.identity(),
                            attachment: name.clone(),
                        });
                    }
                }
            }
        };
        resolved.push((name.clone(), path));
    }

    for (name, path) in resolved {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                MmsError::MalformedAttachmentPath(path.display().to_string())
            })?;
        if let Some(att) = msg.attachments.get_mut(&name) {
            att.local_path = path;
            att.remote_path = Some(options.remote_parts_dir.join(file_name));
        }
    }
    msg.reconciled = true;
    Ok(())
}

/// Recompute a message's digest and compare it against the stored value.
pub fn verify_checksum(msg: &MmsMessage) -> Result<String> {
    let stored = msg
        .checksum
        .as_deref()
        .ok_or_else(|| MmsError::MissingChecksum(msg.identity()))?;
    let computed = checksum::message_checksum(msg)?;
    if stored != computed {
        return Err(MmsError::ChecksumMismatch {
            message: msg.identity(),
            stored: stored.to_string(),
            computed,
        });
    }
    Ok(computed)
}
