use std::sync::Arc;

use crate::adapters::StoreAdapter;
use crate::errors::{ClientError, ExportError, ImportError};
use crate::model::{CollectionSnapshot, Document, DocumentSnapshot, Technology};

/// Opens sessions against a schemaless document store.
pub trait DocumentConnector: Send + Sync {
    fn connect(&self, connection: &str) -> Result<Box<dyn DocumentSession + '_>, ClientError>;
}

/// The document operations the adapter needs; one session per request.
pub trait DocumentSession {
    fn ping(&mut self) -> Result<(), ClientError>;

    /// Field the backing store injects as record identity, if any. That
    /// identity is destination-specific and must not travel in a backup.
    fn identity_field(&self) -> Option<&str>;

    fn collection_names(&mut self) -> Result<Vec<String>, ClientError>;

    fn read_all(&mut self, collection: &str) -> Result<Vec<Document>, ClientError>;

    fn delete_all(&mut self, collection: &str) -> Result<(), ClientError>;

    /// Insert records as given. Absent collections are created implicitly.
    fn insert_many(&mut self, collection: &str, records: &[Document]) -> Result<(), ClientError>;
}

pub struct DocumentStoreAdapter {
    connector: Arc<dyn DocumentConnector>,
}

impl DocumentStoreAdapter {
    pub fn new(connector: Arc<dyn DocumentConnector>) -> Self {
        DocumentStoreAdapter { connector }
    }
}

impl StoreAdapter for DocumentStoreAdapter {
    fn technology(&self) -> Technology {
        Technology::DocumentStore
    }

    fn probe_health(&self, connection: &str) -> bool {
        match self.connector.connect(connection) {
            Ok(mut session) => session.ping().is_ok(),
            Err(_) => false,
        }
    }

    fn export_snapshot(&self, connection: &str) -> Result<Vec<CollectionSnapshot>, ExportError> {
        let mut session = self
            .connector
            .connect(connection)
            .map_err(|e| ExportError::Unavailable(e.to_string()))?;
        let names = session
            .collection_names()
            .map_err(|e| ExportError::Unavailable(e.to_string()))?;

        let mut snapshots = Vec::with_capacity(names.len());
        for name in names {
            let mut records = session
                .read_all(&name)
                .map_err(|e| ExportError::ReadFailed {
                    collection: name.clone(),
                    reason: e.to_string(),
                })?;
            if let Some(field) = session.identity_field().map(str::to_owned) {
                for record in &mut records {
                    // shift_remove keeps the remaining field order intact
                    record.shift_remove(&field);
                }
            }
            snapshots.push(CollectionSnapshot::Documents(DocumentSnapshot {
                name,
                records,
            }));
        }
        Ok(snapshots)
    }

    fn import_snapshot(
        &self,
        connection: &str,
        snapshots: &[CollectionSnapshot],
        drop_existing: bool,
    ) -> Result<(), ImportError> {
        let mut session = self
            .connector
            .connect(connection)
            .map_err(|e| ImportError::Unavailable(e.to_string()))?;

        for snapshot in snapshots {
            let CollectionSnapshot::Documents(collection) = snapshot else {
                return Err(ImportError::KindMismatch {
                    collection: snapshot.name().to_string(),
                });
            };
            let write_failed = |e: ClientError| ImportError::WriteFailed {
                collection: collection.name.clone(),
                reason: e.to_string(),
            };
            if drop_existing {
                // Collection-scoped wipe, not database-scoped.
                session.delete_all(&collection.name).map_err(write_failed)?;
            }
            session
                .insert_many(&collection.name, &collection.records)
                .map_err(write_failed)?;
        }
        Ok(())
    }
}
