use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{info, warn};

use crate::adapters::AdapterSet;
use crate::errors::{BackupError, RestoreError, StoreError};
use crate::model::{BackupArtifact, BackupId, BackupSummary, HealthStatus};
use crate::registry::TargetRegistry;
use crate::store::BackupStore;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Stateless orchestration over registry, adapters, and backup store. Every
/// request is independent; the engine adds no locking of its own, so
/// concurrent restores into one destination race at the database's own
/// concurrency-control level.
pub struct BackupEngine {
    registry: TargetRegistry,
    adapters: AdapterSet,
    store: Arc<dyn BackupStore>,
    probe_timeout: Duration,
}

impl BackupEngine {
    pub fn new(registry: TargetRegistry, adapters: AdapterSet, store: Arc<dyn BackupStore>) -> Self {
        BackupEngine {
            registry,
            adapters,
            store,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Bound on a single health probe. Export/import have no such bound;
    /// they take as long as the data volume requires.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Snapshot a source target and persist the artifact. Read-only with
    /// respect to the source.
    pub fn create_backup(&self, source_target: &str) -> Result<BackupId, BackupError> {
        let target = self
            .registry
            .resolve(source_target)
            .filter(|t| t.role.can_source())
            .ok_or_else(|| BackupError::TargetNotFound(source_target.to_string()))?;

        info!("starting backup of target {source_target}");
        let adapter = self.adapters.for_technology(target.technology);
        let collections = adapter.export_snapshot(&target.connection)?;

        let artifact = BackupArtifact {
            backup_id: BackupId::random(),
            source_target: source_target.to_string(),
            created_at: Local::now().fixed_offset(),
            collections,
        };
        self.store.put(&artifact)?;
        info!(
            "backup {} of target {} complete ({} collections)",
            artifact.backup_id,
            source_target,
            artifact.collections.len()
        );
        Ok(artifact.backup_id)
    }

    /// Replay a stored artifact into a destination target. The artifact is
    /// never mutated or consumed; a backup may be restored any number of
    /// times, to the same or different destinations.
    pub fn restore_backup(
        &self,
        destination_target: &str,
        backup_id: BackupId,
        drop_existing: bool,
    ) -> Result<(), RestoreError> {
        let target = self
            .registry
            .resolve(destination_target)
            .filter(|t| t.role.can_restore())
            .ok_or_else(|| RestoreError::TargetNotFound(destination_target.to_string()))?;

        let artifact = match self.store.get(backup_id) {
            Ok(artifact) => artifact,
            Err(StoreError::NotFound(id)) => return Err(RestoreError::BackupNotFound(id)),
            Err(err) => return Err(err.into()),
        };

        if let Some(snapshot) = artifact
            .collections
            .iter()
            .find(|s| s.technology() != target.technology)
        {
            return Err(RestoreError::IncompatibleKind {
                from: snapshot.technology(),
                to: target.technology,
            });
        }

        info!(
            "restoring backup {} into target {} (drop_existing={})",
            backup_id, destination_target, drop_existing
        );
        let adapter = self.adapters.for_technology(target.technology);
        adapter.import_snapshot(&target.connection, &artifact.collections, drop_existing)?;
        info!("restore of backup {backup_id} into target {destination_target} complete");
        Ok(())
    }

    /// Monitoring probe with exactly two outcomes. Unknown names, connection
    /// refusal, auth rejection, and probe timeout all come back unhealthy;
    /// this call never surfaces an error.
    pub fn check_health(&self, target_name: &str) -> HealthStatus {
        let Some(target) = self.registry.resolve(target_name) else {
            return HealthStatus { is_healthy: false };
        };

        let adapter = self.adapters.for_technology(target.technology);
        let connection = target.connection.clone();
        let (tx, rx) = mpsc::channel();
        // The probe runs on its own thread so a hung connection attempt
        // cannot block health polling past the timeout. A timed-out thread
        // is abandoned; its late result is dropped with the channel.
        thread::spawn(move || {
            let _ = tx.send(adapter.probe_health(&connection));
        });

        let is_healthy = match rx.recv_timeout(self.probe_timeout) {
            Ok(healthy) => healthy,
            Err(_) => {
                warn!("health probe of target {target_name} timed out");
                false
            }
        };
        HealthStatus { is_healthy }
    }

    pub fn list_backups(&self) -> Result<Vec<BackupSummary>, StoreError> {
        self.store.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DocumentStoreAdapter, InMemoryDocumentStore, InMemorySqlStore, RelationalAdapter, StoreAdapter};
    use crate::errors::{ExportError, ImportError};
    use crate::model::{CollectionSnapshot, Document, Target, TargetRole, Technology};
    use crate::store::MemoryBackupStore;
    use serde_json::json;

    fn target(name: &str, technology: Technology, role: TargetRole) -> Target {
        Target {
            name: name.to_string(),
            technology,
            role,
            connection: format!("mem://{name}"),
        }
    }

    fn doc(name: &str, value: i64) -> Document {
        let mut d = Document::new();
        d.insert("name".into(), json!(name));
        d.insert("value".into(), json!(value));
        d
    }

    struct Fixture {
        documents: InMemoryDocumentStore,
        engine: BackupEngine,
    }

    fn fixture(targets: Vec<Target>) -> Fixture {
        let documents = InMemoryDocumentStore::new();
        let sql = InMemorySqlStore::new();
        for target in &targets {
            let db = target.name.as_str();
            match target.technology {
                Technology::DocumentStore => documents.create_database(db),
                Technology::Relational => sql.create_database(db),
            }
        }
        let adapters = AdapterSet::new(
            Arc::new(DocumentStoreAdapter::new(Arc::new(documents.clone()))),
            Arc::new(RelationalAdapter::new(Arc::new(sql))),
        );
        let registry = TargetRegistry::new(targets).unwrap();
        let engine = BackupEngine::new(registry, adapters, Arc::new(MemoryBackupStore::new()));
        Fixture { documents, engine }
    }

    #[test]
    fn should_fail_backup_of_unknown_target() {
        let f = fixture(vec![]);
        assert!(matches!(
            f.engine.create_backup("ghost").unwrap_err(),
            BackupError::TargetNotFound(name) if name == "ghost"
        ));
    }

    #[test]
    fn should_refuse_to_back_up_a_destination_only_target() {
        let f = fixture(vec![target("sink", Technology::DocumentStore, TargetRole::Destination)]);
        assert!(matches!(
            f.engine.create_backup("sink").unwrap_err(),
            BackupError::TargetNotFound(_)
        ));
    }

    #[test]
    fn should_refuse_to_restore_into_a_source_only_target() {
        let f = fixture(vec![
            target("src", Technology::DocumentStore, TargetRole::Both),
            target("tap", Technology::DocumentStore, TargetRole::Source),
        ]);
        let id = f.engine.create_backup("src").unwrap();
        assert!(matches!(
            f.engine.restore_backup("tap", id, false).unwrap_err(),
            RestoreError::TargetNotFound(_)
        ));
    }

    #[test]
    fn should_not_mutate_source_during_backup() {
        let f = fixture(vec![target("src", Technology::DocumentStore, TargetRole::Source)]);
        f.documents.insert("src", "widgets", doc("first", 42));
        let before = f.documents.documents("src", "widgets");

        f.engine.create_backup("src").unwrap();

        assert_eq!(f.documents.documents("src", "widgets"), before);
    }

    #[test]
    fn should_fail_restore_with_backup_not_found_and_leave_destination_untouched() {
        let f = fixture(vec![target("dst", Technology::DocumentStore, TargetRole::Both)]);
        f.documents.insert("dst", "widgets", doc("keep", 1));

        let missing = BackupId::random();
        assert!(matches!(
            f.engine.restore_backup("dst", missing, true).unwrap_err(),
            RestoreError::BackupNotFound(id) if id == missing
        ));
        assert_eq!(f.documents.documents("dst", "widgets").len(), 1);
    }

    #[test]
    fn should_reject_cross_technology_restore() {
        let f = fixture(vec![
            target("src", Technology::DocumentStore, TargetRole::Both),
            target("pg", Technology::Relational, TargetRole::Both),
        ]);
        f.documents.insert("src", "widgets", doc("first", 42));
        let id = f.engine.create_backup("src").unwrap();

        assert!(matches!(
            f.engine.restore_backup("pg", id, true).unwrap_err(),
            RestoreError::IncompatibleKind {
                from: Technology::DocumentStore,
                to: Technology::Relational,
            }
        ));
    }

    #[test]
    fn should_serve_configured_mem_targets_out_of_the_box() {
        // The binary wires the engine exactly like this: embedded adapters
        // seeded from the configured target list.
        let targets = vec![
            target("orders", Technology::DocumentStore, TargetRole::Both),
            target("ledger", Technology::Relational, TargetRole::Both),
        ];
        let adapters = AdapterSet::embedded_for(&targets);
        let registry = TargetRegistry::new(targets).unwrap();
        let engine = BackupEngine::new(registry, adapters, Arc::new(MemoryBackupStore::new()));

        assert_eq!(engine.check_health("orders"), HealthStatus { is_healthy: true });
        assert_eq!(engine.check_health("ledger"), HealthStatus { is_healthy: true });

        let id = engine.create_backup("orders").unwrap();
        engine.restore_backup("orders", id, true).unwrap();
        engine.create_backup("ledger").unwrap();
    }

    #[test]
    fn should_report_unknown_target_as_unhealthy() {
        let f = fixture(vec![]);
        assert_eq!(f.engine.check_health("ghost"), HealthStatus { is_healthy: false });
    }

    #[test]
    fn should_report_reachable_target_as_healthy() {
        let f = fixture(vec![target("src", Technology::DocumentStore, TargetRole::Both)]);
        assert_eq!(f.engine.check_health("src"), HealthStatus { is_healthy: true });
    }

    #[test]
    fn should_report_unreachable_target_as_unhealthy() {
        // Configured, but its database does not exist behind the connector.
        let documents = InMemoryDocumentStore::new();
        let adapters = AdapterSet::new(
            Arc::new(DocumentStoreAdapter::new(Arc::new(documents))),
            Arc::new(RelationalAdapter::new(Arc::new(InMemorySqlStore::new()))),
        );
        let registry = TargetRegistry::new(vec![target(
            "gone",
            Technology::DocumentStore,
            TargetRole::Both,
        )])
        .unwrap();
        let engine = BackupEngine::new(registry, adapters, Arc::new(MemoryBackupStore::new()));
        assert_eq!(engine.check_health("gone"), HealthStatus { is_healthy: false });
    }

    struct HangingAdapter;

    impl StoreAdapter for HangingAdapter {
        fn technology(&self) -> Technology {
            Technology::DocumentStore
        }

        fn probe_health(&self, _connection: &str) -> bool {
            thread::sleep(Duration::from_secs(5));
            true
        }

        fn export_snapshot(&self, _: &str) -> Result<Vec<CollectionSnapshot>, ExportError> {
            unimplemented!("probe-only stub")
        }

        fn import_snapshot(&self, _: &str, _: &[CollectionSnapshot], _: bool) -> Result<(), ImportError> {
            unimplemented!("probe-only stub")
        }
    }

    #[test]
    fn should_bound_hung_probes_by_the_timeout() {
        let adapters = AdapterSet::new(
            Arc::new(HangingAdapter),
            Arc::new(RelationalAdapter::new(Arc::new(InMemorySqlStore::new()))),
        );
        let registry = TargetRegistry::new(vec![target(
            "slow",
            Technology::DocumentStore,
            TargetRole::Both,
        )])
        .unwrap();
        let engine = BackupEngine::new(registry, adapters, Arc::new(MemoryBackupStore::new()))
            .with_probe_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        assert_eq!(engine.check_health("slow"), HealthStatus { is_healthy: false });
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
