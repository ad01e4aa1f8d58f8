//! Run outcomes.
//!
//! A [`BackupOutcome`] is built once per source and never mutated afterwards.
//! Partial success is first-class: a created backup whose rotation cleanup
//! hit problems stays `Created` and carries the problems as warnings.

use crate::archive::ArchiveRecord;
use crate::utils::errors::RotatorError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Terminal state of one processed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Created,
    DryRunSkipped,
    Failed,
}

/// Result of processing one backup request.
#[derive(Debug, Serialize)]
pub struct BackupOutcome {
    pub source_name: String,
    pub status: BackupStatus,

    /// The archive written by this run, when one was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<ArchiveRecord>,

    /// Archives removed during rotation, oldest first.
    pub deleted: Vec<ArchiveRecord>,

    /// Rotation cleanup problems attached to an otherwise successful backup.
    pub warnings: Vec<String>,

    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<RotatorError>,
}

impl BackupOutcome {
    pub(crate) fn failed(source_name: String, error: RotatorError) -> Self {
        Self {
            source_name,
            status: BackupStatus::Failed,
            created: None,
            deleted: Vec::new(),
            warnings: Vec::new(),
            error: Some(error),
        }
    }

    pub(crate) fn dry_run(source_name: String) -> Self {
        Self {
            source_name,
            status: BackupStatus::DryRunSkipped,
            created: None,
            deleted: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    /// One-line human-readable description, independent of log verbosity.
    pub fn summary(&self) -> String {
        match self.status {
            BackupStatus::Created => {
                let path = self
                    .created
                    .as_ref()
                    .map(|r| r.path.display().to_string())
                    .unwrap_or_default();
                let size = self.created.as_ref().and_then(|r| r.size_bytes).unwrap_or(0);
                let mut line = format!(
                    "{}: created {} ({} bytes), deleted {} old archive(s)",
                    self.source_name,
                    path,
                    size,
                    self.deleted.len()
                );
                if !self.warnings.is_empty() {
                    line.push_str(&format!(", {} rotation warning(s)", self.warnings.len()));
                }
                line
            }
            BackupStatus::DryRunSkipped => {
                format!("{}: dry run, no archive written", self.source_name)
            }
            BackupStatus::Failed => format!(
                "{}: failed ({})",
                self.source_name,
                self.error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string())
            ),
        }
    }
}

/// Aggregate result of one run; outcomes are in input order.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<BackupOutcome>,
}

impl RunSummary {
    pub fn created_count(&self) -> usize {
        self.count(BackupStatus::Created)
    }

    pub fn failed_count(&self) -> usize {
        self.count(BackupStatus::Failed)
    }

    pub fn dry_run_count(&self) -> usize {
        self.count(BackupStatus::DryRunSkipped)
    }

    /// A run fails as a whole only if at least one source failed.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, status: BackupStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

fn serialize_error<S>(error: &Option<RotatorError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => {
            let mut state = serializer.serialize_struct("Error", 2)?;
            state.serialize_field("kind", e.kind())?;
            state.serialize_field("message", &e.to_string())?;
            state.end()
        }
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_serializes_typed_error() {
        let outcome = BackupOutcome::failed(
            "docs".to_string(),
            RotatorError::Validation("source directory /x does not exist".into()),
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "validation");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("does not exist"));
    }

    #[test]
    fn dry_run_outcome_is_distinguishable() {
        let outcome = BackupOutcome::dry_run("docs".to_string());
        assert_eq!(outcome.status, BackupStatus::DryRunSkipped);
        assert!(outcome.summary().contains("dry run"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "dry_run_skipped");
        assert!(json.get("created").is_none());
    }

    #[test]
    fn run_summary_counts_statuses() {
        let summary = RunSummary {
            outcomes: vec![
                BackupOutcome::dry_run("a".to_string()),
                BackupOutcome::failed("b".to_string(), RotatorError::Cancelled),
            ],
        };
        assert_eq!(summary.dry_run_count(), 1);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.created_count(), 0);
        assert!(summary.has_failures());
    }
}
