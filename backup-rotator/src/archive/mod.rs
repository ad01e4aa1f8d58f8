//! Archive records and the naming/creation machinery around them.

pub mod creator;
pub mod naming;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// One stored backup artifact in the destination root.
///
/// The filename is the persisted metadata: `source_name` and `created_at`
/// are recovered from it by [`naming::parse_name`]. No separate index file
/// exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRecord {
    /// Logical backup target this archive belongs to.
    pub source_name: String,

    /// Creation timestamp embedded in the filename (second resolution).
    pub created_at: DateTime<Utc>,

    /// Location of the archive on disk.
    pub path: PathBuf,

    /// Populated once creation succeeds; `None` for records recovered from
    /// a directory listing where the size could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}
