use crate::model::{BackupId, Technology};
use thiserror::Error;

/// Failures reported by the narrow client seams the adapters talk through.
/// Adapters translate these into the export/import taxonomy; they never
/// reach coordinator callers directly.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Query(String),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot read source: {0}")]
    Unavailable(String),
    #[error("failed to read '{collection}': {reason}")]
    ReadFailed { collection: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot reach destination: {0}")]
    Unavailable(String),
    #[error("write to '{collection}' failed: {reason}")]
    WriteFailed { collection: String, reason: String },
    #[error("integrity conflict in table '{table}': {reason}")]
    IntegrityConflict { table: String, reason: String },
    #[error("table '{table}': captured rows do not match the captured schema")]
    SchemaMismatch { table: String },
    #[error("snapshot '{collection}' does not match the destination technology")]
    KindMismatch { collection: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no backup with id {0}")]
    NotFound(BackupId),
    #[error("backup id {0} already exists")]
    IdAlreadyExists(BackupId),
    #[error("backup store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored artifact is not readable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup target {0} was not found")]
    TargetNotFound(String),
    #[error("failed to read source: {0}")]
    SourceRead(#[from] ExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("backup target {0} was not found")]
    TargetNotFound(String),
    #[error("did not find backup with id {0}")]
    BackupNotFound(BackupId),
    #[error("cannot restore a {from} backup into a {to} target")]
    IncompatibleKind { from: Technology, to: Technology },
    #[error("failed to write destination: {0}")]
    DestinationWrite(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression for target '{target}': {source}")]
    InvalidCron {
        target: String,
        source: cron::error::Error,
    },
    #[error("scheduled target '{0}' is not a configured source")]
    UnknownTarget(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read target configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid target configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("target '{0}' is defined more than once")]
    DuplicateTarget(String),
}
