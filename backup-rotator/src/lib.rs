//! Backup Retention Engine
//!
//! Creates compressed, timestamped archives from source directories and
//! enforces a bounded retention window per source: the newest N archives
//! are kept, older ones are deleted. The archive filename is the only
//! persisted metadata.

pub mod archive;
pub mod clock;
pub mod config;
pub mod orchestrator;
pub mod retention;
pub mod utils;

// Re-export commonly used types
pub use archive::creator::{ArchiveCreator, TarGzCreator, TarGzOptions};
pub use archive::ArchiveRecord;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use orchestrator::outcome::{BackupOutcome, BackupStatus, RunSummary};
pub use orchestrator::{BackupOrchestrator, BackupRequest};
pub use retention::RetentionPolicy;
pub use utils::errors::RotatorError;

pub type Result<T> = std::result::Result<T, RotatorError>;
