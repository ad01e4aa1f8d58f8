//! Pure retention decisions.
//!
//! [`RetentionPolicy`] decides which archives of one source are beyond the
//! retention window. It performs no I/O and cannot fail on well-formed input;
//! the orchestrator owns the deletions it prescribes.

use crate::archive::ArchiveRecord;
use crate::utils::errors::{Result, RotatorError};

/// Keep the N newest archives per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_archives_per_source: usize,
}

impl RetentionPolicy {
    /// Build a policy keeping the `max_archives_per_source` newest archives.
    /// A window of zero would delete every backup ever made, so it is
    /// rejected at construction.
    pub fn new(max_archives_per_source: usize) -> Result<Self> {
        if max_archives_per_source == 0 {
            return Err(RotatorError::Config(
                "max_archives_per_source must be at least 1".into(),
            ));
        }
        Ok(Self {
            max_archives_per_source,
        })
    }

    pub fn max_archives_per_source(&self) -> usize {
        self.max_archives_per_source
    }

    /// Select the archives to delete so that only the newest
    /// `max_archives_per_source` remain.
    ///
    /// All records are expected to belong to one source. Ordering is by the
    /// timestamp embedded in the filename, newest first; equal timestamps
    /// fall back to lexical path order so repeated runs pick the same
    /// victims. The returned list is oldest-first, letting callers log
    /// deletions chronologically.
    pub fn select_for_deletion(&self, records: &[ArchiveRecord]) -> Vec<ArchiveRecord> {
        if records.len() <= self.max_archives_per_source {
            return Vec::new();
        }

        let mut ordered: Vec<ArchiveRecord> = records.to_vec();
        ordered.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut excess = ordered.split_off(self.max_archives_per_source);
        excess.reverse();
        excess
    }
}
