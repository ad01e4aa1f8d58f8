//! Backup orchestration.
//!
//! Drives the per-source pipeline: validate, create, verify, rotate. One
//! source failing never aborts the batch, and rotation problems never fail a
//! backup that already succeeded.

pub mod outcome;

use crate::archive::creator::ArchiveCreator;
use crate::archive::{naming, ArchiveRecord};
use crate::clock::Clock;
use crate::retention::RetentionPolicy;
use crate::utils::errors::{Result, RotatorError};
use chrono::{DateTime, SubsecRound, Utc};
use outcome::{BackupOutcome, BackupStatus, RunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One unit of work: archive this directory, then rotate its archives.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub source_dir: PathBuf,
    pub dry_run: bool,
}

/// Coordinates one run over N source directories.
///
/// All configuration is passed in at construction; the orchestrator holds no
/// ambient state. Sources are processed sequentially, and the destination
/// listing is read fresh for each source's rotation step.
pub struct BackupOrchestrator {
    destination_root: PathBuf,
    policy: RetentionPolicy,
    creator: Arc<dyn ArchiveCreator>,
    clock: Arc<dyn Clock>,
    cancel_token: CancellationToken,
    creation_timeout: Option<Duration>,
}

impl BackupOrchestrator {
    pub fn new(
        destination_root: PathBuf,
        policy: RetentionPolicy,
        creator: Arc<dyn ArchiveCreator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_cancel(
            destination_root,
            policy,
            creator,
            clock,
            CancellationToken::new(),
        )
    }

    pub fn with_cancel(
        destination_root: PathBuf,
        policy: RetentionPolicy,
        creator: Arc<dyn ArchiveCreator>,
        clock: Arc<dyn Clock>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            destination_root,
            policy,
            creator,
            clock,
            cancel_token,
            creation_timeout: None,
        }
    }

    /// Bound each archive creation; an overrun counts as a creation failure.
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = Some(timeout);
        self
    }

    /// Process every request in order and return one outcome per request.
    pub async fn run(&self, requests: Vec<BackupRequest>) -> RunSummary {
        let mut outcomes = Vec::with_capacity(requests.len());

        for request in &requests {
            let outcome = if self.cancel_token.is_cancelled() {
                info!(source = %request.source_dir.display(), "Run cancelled, skipping source");
                BackupOutcome::failed(source_label(&request.source_dir), RotatorError::Cancelled)
            } else {
                self.process_source(request).await
            };
            outcomes.push(outcome);
        }

        RunSummary { outcomes }
    }

    /// One source through the pipeline:
    /// validate -> create -> verify -> rotate.
    async fn process_source(&self, request: &BackupRequest) -> BackupOutcome {
        // Naming is resolved first so a bad source name fails before any I/O.
        let source_name = match source_name_for(&request.source_dir) {
            Ok(name) => name,
            Err(e) => {
                return BackupOutcome::failed(request.source_dir.display().to_string(), e)
            }
        };

        if let Err(e) = self.validate(&request.source_dir) {
            return BackupOutcome::failed(source_name, e);
        }

        if request.dry_run {
            let planned = match naming::build_name(&source_name, self.clock.now()) {
                Ok(name) => name,
                Err(e) => return BackupOutcome::failed(source_name, e),
            };
            info!(
                source = %source_name,
                archive = %planned,
                keep = self.policy.max_archives_per_source(),
                "Dry run: would create archive and rotate"
            );
            return BackupOutcome::dry_run(source_name);
        }

        let created_at = self.clock.now().trunc_subsecs(0);
        let destination = match self.resolve_destination(&source_name, created_at) {
            Ok(path) => path,
            Err(e) => return BackupOutcome::failed(source_name, e),
        };

        info!(source = %source_name, path = %destination.display(), "Creating archive");
        if let Err(e) = self.create_archive(&request.source_dir, &destination).await {
            return BackupOutcome::failed(source_name, e);
        }

        let size_bytes = match self.verify(&destination) {
            Ok(size) => size,
            Err(e) => return BackupOutcome::failed(source_name, e),
        };
        info!(source = %source_name, path = %destination.display(), size_bytes, "Archive created");

        let (deleted, warnings) = self.rotate(&source_name);

        BackupOutcome {
            source_name: source_name.clone(),
            status: BackupStatus::Created,
            created: Some(ArchiveRecord {
                source_name,
                created_at,
                path: destination,
                size_bytes: Some(size_bytes),
            }),
            deleted,
            warnings,
            error: None,
        }
    }

    /// Source must exist and be listable; the destination root must exist
    /// and be writable. Checks only, no mutation, so dry runs stay clean.
    fn validate(&self, source_dir: &Path) -> Result<()> {
        if !source_dir.is_dir() {
            return Err(RotatorError::Validation(format!(
                "source directory {} does not exist",
                source_dir.display()
            )));
        }
        std::fs::read_dir(source_dir).map_err(|e| {
            RotatorError::Validation(format!(
                "source directory {} is not readable: {e}",
                source_dir.display()
            ))
        })?;

        let root = &self.destination_root;
        if !root.is_dir() {
            return Err(RotatorError::Validation(format!(
                "destination root {} does not exist",
                root.display()
            )));
        }
        let meta = std::fs::metadata(root).map_err(|e| {
            RotatorError::Validation(format!(
                "destination root {} is not accessible: {e}",
                root.display()
            ))
        })?;
        if meta.permissions().readonly() {
            return Err(RotatorError::Validation(format!(
                "destination root {} is not writable",
                root.display()
            )));
        }

        Ok(())
    }

    /// Pick a collision-free destination path. Two backups of one source in
    /// the same second get `-1`, `-2`, ... counters instead of overwriting.
    fn resolve_destination(
        &self,
        source_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let base = naming::build_name(source_name, created_at)?;
        let mut candidate = self.destination_root.join(&base);
        let mut sequence = 0u32;

        while candidate.exists() {
            sequence += 1;
            candidate = self
                .destination_root
                .join(naming::with_sequence(&base, sequence));
        }

        Ok(candidate)
    }

    /// Run the creator on a blocking task, bounded by the configured timeout
    /// and the cancellation token.
    ///
    /// An abandoned creation (timeout or cancel) can only ever complete the
    /// rename with a full archive, never a partial one; a late arrival is
    /// counted by the next rotation pass.
    async fn create_archive(&self, source_dir: &Path, destination: &Path) -> Result<u64> {
        let creator = Arc::clone(&self.creator);
        let source = source_dir.to_path_buf();
        let dest = destination.to_path_buf();
        let task = tokio::task::spawn_blocking(move || creator.create(&source, &dest));

        let work = async {
            let joined = match self.creation_timeout {
                Some(limit) => match tokio::time::timeout(limit, task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        return Err(RotatorError::Creation(format!(
                            "timed out after {}s",
                            limit.as_secs()
                        )))
                    }
                },
                None => task.await,
            };

            match joined {
                Ok(result) => result.map_err(|e| match e {
                    e @ RotatorError::Creation(_) => e,
                    other => RotatorError::Creation(other.to_string()),
                }),
                Err(join_error) => Err(RotatorError::Creation(format!(
                    "archive task failed: {join_error}"
                ))),
            }
        };
        tokio::pin!(work);

        tokio::select! {
            result = &mut work => result,
            _ = self.cancel_token.cancelled() => Err(RotatorError::Cancelled),
        }
    }

    /// The archive must exist with nonzero size. A zero-size file is removed
    /// so a broken creator cannot leave junk that later rotation would count.
    fn verify(&self, path: &Path) -> Result<u64> {
        let meta = std::fs::metadata(path).map_err(|e| {
            RotatorError::Verification(format!("archive missing after creation: {e}"))
        })?;

        if meta.len() == 0 {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove empty archive");
            }
            return Err(RotatorError::Verification(format!(
                "archive {} is empty",
                path.display()
            )));
        }

        Ok(meta.len())
    }

    /// List this source's archives (the fresh one included), apply the
    /// retention policy, delete the excess. Deletion failures become
    /// warnings: the backup itself already succeeded.
    fn rotate(&self, source_name: &str) -> (Vec<ArchiveRecord>, Vec<String>) {
        let records = match self.list_source_archives(source_name) {
            Ok(records) => records,
            Err(e) => {
                warn!(source = %source_name, error = %e, "Could not list destination root for rotation");
                return (
                    Vec::new(),
                    vec![format!("could not list destination root: {e}")],
                );
            }
        };

        let excess = self.policy.select_for_deletion(&records);
        let mut deleted = Vec::with_capacity(excess.len());
        let mut warnings = Vec::new();

        for record in excess {
            match std::fs::remove_file(&record.path) {
                Ok(()) => {
                    info!(
                        source = %source_name,
                        path = %record.path.display(),
                        "Deleted archive beyond retention window"
                    );
                    deleted.push(record);
                }
                Err(e) => {
                    warn!(
                        source = %source_name,
                        path = %record.path.display(),
                        error = %e,
                        "Failed to delete archive"
                    );
                    warnings.push(format!("could not delete {}: {e}", record.path.display()));
                }
            }
        }

        (deleted, warnings)
    }

    /// Read the destination root and keep entries whose names parse for this
    /// source. Anything else (other sources, unrelated files) is skipped.
    fn list_source_archives(&self, source_name: &str) -> std::io::Result<Vec<ArchiveRecord>> {
        let mut records = Vec::new();

        for entry in std::fs::read_dir(&self.destination_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(parsed) = naming::parse_name(&file_name.to_string_lossy()) else {
                continue;
            };
            if parsed.source_name != source_name {
                continue;
            }

            records.push(ArchiveRecord {
                source_name: parsed.source_name,
                created_at: parsed.created_at,
                path: entry.path(),
                size_bytes: entry.metadata().ok().map(|m| m.len()),
            });
        }

        Ok(records)
    }
}

/// Derive the logical source name from the directory's base name.
fn source_name_for(path: &Path) -> Result<String> {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    naming::sanitize_source_name(&base)
}

/// Best-effort label for outcomes recorded before naming succeeded.
fn source_label(path: &Path) -> String {
    source_name_for(path).unwrap_or_else(|_| path.display().to_string())
}
