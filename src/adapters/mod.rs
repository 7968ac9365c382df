use std::sync::Arc;

use crate::errors::{ExportError, ImportError};
use crate::model::{CollectionSnapshot, Target, Technology};

pub mod document;
pub mod memory;
pub mod relational;

pub use document::{DocumentConnector, DocumentSession, DocumentStoreAdapter};
pub use memory::{InMemoryDocumentStore, InMemorySqlStore};
pub use relational::{RelationalAdapter, SqlConnector, SqlSession, SqlSnapshot};

/// Capability set every technology-specific adapter implements. Adapters
/// reach their database only through a narrow client seam, never a full
/// driver surface.
pub trait StoreAdapter: Send + Sync {
    fn technology(&self) -> Technology;

    /// Lightweight connectivity and authentication check. Must not mutate
    /// data; expected failure modes (refusal, auth rejection) become `false`.
    fn probe_health(&self, connection: &str) -> bool;

    /// Capture every collection/table visible at the connection as it exists
    /// at a single consistent instant.
    fn export_snapshot(&self, connection: &str) -> Result<Vec<CollectionSnapshot>, ExportError>;

    /// Replay captured snapshots into the destination. `drop_existing`
    /// selects destructive replace over merge.
    fn import_snapshot(
        &self,
        connection: &str,
        snapshots: &[CollectionSnapshot],
        drop_existing: bool,
    ) -> Result<(), ImportError>;
}

/// Closed set of adapters, one per technology.
pub struct AdapterSet {
    document: Arc<dyn StoreAdapter>,
    relational: Arc<dyn StoreAdapter>,
}

impl AdapterSet {
    pub fn new(document: Arc<dyn StoreAdapter>, relational: Arc<dyn StoreAdapter>) -> Self {
        AdapterSet {
            document,
            relational,
        }
    }

    /// Adapter set backed by the embedded in-memory stores, with a database
    /// created for every configured `mem://` target so those targets are
    /// reachable out of the box. Real deployments construct adapters over
    /// their own connector implementations instead.
    pub fn embedded_for<'a>(targets: impl IntoIterator<Item = &'a Target>) -> Self {
        let documents = InMemoryDocumentStore::new();
        let sql = InMemorySqlStore::new();
        for target in targets {
            let Some(database) = target.connection.strip_prefix("mem://") else {
                continue;
            };
            if database.is_empty() {
                continue;
            }
            match target.technology {
                Technology::DocumentStore => documents.create_database(database),
                Technology::Relational => sql.create_database(database),
            }
        }
        Self::new(
            Arc::new(DocumentStoreAdapter::new(Arc::new(documents))),
            Arc::new(RelationalAdapter::new(Arc::new(sql))),
        )
    }

    pub fn for_technology(&self, technology: Technology) -> Arc<dyn StoreAdapter> {
        match technology {
            Technology::DocumentStore => Arc::clone(&self.document),
            Technology::Relational => Arc::clone(&self.relational),
        }
    }
}
