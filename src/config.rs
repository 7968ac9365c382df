use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;
use crate::model::Target;

/// Recurring backup definition: a configured source target plus a cron
/// expression with seconds resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledBackup {
    pub target: String,
    pub cron: String,
}

#[derive(Debug)]
pub struct Config {
    pub targets: Vec<Target>,
    pub scheduled_backups: Vec<ScheduledBackup>,
}

#[derive(Deserialize)]
struct TargetsFile {
    targets: Vec<Target>,
    #[serde(default)]
    scheduled_backups: Vec<ScheduledBackup>,
}

/// Load target definitions from a JSON file:
///
/// ```json
/// {
///   "targets": [
///     { "name": "orders", "technology": "document_store",
///       "role": "source", "connection": "mem://orders" }
///   ],
///   "scheduled_backups": [
///     { "target": "orders", "cron": "0 0 3 * * *" }
///   ]
/// }
/// ```
///
/// `role` defaults to `both` when omitted; `scheduled_backups` is optional.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let file: TargetsFile = serde_json::from_str(&content)?;
    Ok(Config {
        targets: file.targets,
        scheduled_backups: file.scheduled_backups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TargetRole, Technology};

    #[test]
    fn should_parse_targets_and_default_role_to_both() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.json");
        fs::write(
            &path,
            r#"{
                "targets": [
                    { "name": "orders", "technology": "document_store", "connection": "mem://orders" },
                    { "name": "ledger", "technology": "relational", "role": "source", "connection": "mem://ledger" }
                ]
            }"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].technology, Technology::DocumentStore);
        assert_eq!(config.targets[0].role, TargetRole::Both);
        assert_eq!(config.targets[1].role, TargetRole::Source);
        assert!(config.scheduled_backups.is_empty());
    }

    #[test]
    fn should_parse_scheduled_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.json");
        fs::write(
            &path,
            r#"{
                "targets": [
                    { "name": "orders", "technology": "document_store", "connection": "mem://orders" }
                ],
                "scheduled_backups": [
                    { "target": "orders", "cron": "0 0 3 * * *" }
                ]
            }"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.scheduled_backups.len(), 1);
        assert_eq!(config.scheduled_backups[0].target, "orders");
        assert_eq!(config.scheduled_backups[0].cron, "0 0 3 * * *");
    }

    #[test]
    fn should_reject_unreadable_configuration() {
        let err = load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
