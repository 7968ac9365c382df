pub mod adapters;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod registry;
pub mod schedule;
pub mod store;

pub use engine::BackupEngine;
pub use model::{
    BackupArtifact, BackupId, BackupSummary, HealthStatus, Target, TargetRole, Technology,
};
pub use registry::TargetRegistry;
pub use schedule::BackupScheduler;
