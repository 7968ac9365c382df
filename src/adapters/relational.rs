use std::sync::Arc;

use crate::adapters::StoreAdapter;
use crate::errors::{ClientError, ExportError, ImportError};
use crate::model::{CollectionSnapshot, Column, Row, TableSnapshot, Technology};

/// Opens sessions against a relational store.
pub trait SqlConnector: Send + Sync {
    fn connect(&self, connection: &str) -> Result<Box<dyn SqlSession + '_>, ClientError>;
}

/// The SQL operations the adapter needs; one session per request.
/// `begin`/`commit`/`rollback` delimit a single table's writes.
pub trait SqlSession: std::fmt::Debug {
    fn ping(&mut self) -> Result<(), ClientError>;

    /// Open a read-consistent view of the database, so schema and data
    /// cannot diverge from concurrent DDL/DML during an export.
    fn snapshot(&mut self) -> Result<Box<dyn SqlSnapshot + '_>, ClientError>;

    fn begin(&mut self) -> Result<(), ClientError>;
    fn commit(&mut self) -> Result<(), ClientError>;
    fn rollback(&mut self) -> Result<(), ClientError>;

    fn table_exists(&mut self, table: &str) -> Result<bool, ClientError>;
    fn drop_table(&mut self, table: &str) -> Result<(), ClientError>;
    fn create_table(&mut self, table: &str, schema: &[Column]) -> Result<(), ClientError>;
    fn insert_rows(&mut self, table: &str, rows: &[Row]) -> Result<(), ClientError>;
}

/// Read side of one consistent export.
pub trait SqlSnapshot {
    fn table_names(&mut self) -> Result<Vec<String>, ClientError>;
    fn schema_of(&mut self, table: &str) -> Result<Vec<Column>, ClientError>;
    fn rows_of(&mut self, table: &str) -> Result<Vec<Row>, ClientError>;
}

pub struct RelationalAdapter {
    connector: Arc<dyn SqlConnector>,
}

impl RelationalAdapter {
    pub fn new(connector: Arc<dyn SqlConnector>) -> Self {
        RelationalAdapter { connector }
    }

    /// One table's writes, executed inside the transaction the caller opened.
    fn restore_table(
        session: &mut dyn SqlSession,
        table: &TableSnapshot,
        drop_existing: bool,
    ) -> Result<(), ImportError> {
        let write_failed = |e: ClientError| match e {
            ClientError::UniqueViolation(reason) => ImportError::IntegrityConflict {
                table: table.name.clone(),
                reason,
            },
            other => ImportError::WriteFailed {
                collection: table.name.clone(),
                reason: other.to_string(),
            },
        };

        if drop_existing {
            if session.table_exists(&table.name).map_err(write_failed)? {
                session.drop_table(&table.name).map_err(write_failed)?;
            }
            session
                .create_table(&table.name, &table.schema)
                .map_err(write_failed)?;
        } else if !session.table_exists(&table.name).map_err(write_failed)? {
            session
                .create_table(&table.name, &table.schema)
                .map_err(write_failed)?;
        }
        // An existing table is assumed schema-compatible; a key collision
        // below is a data-integrity conflict, never silently ignored.
        session
            .insert_rows(&table.name, &table.rows)
            .map_err(write_failed)
    }
}

impl StoreAdapter for RelationalAdapter {
    fn technology(&self) -> Technology {
        Technology::Relational
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
        let mut view = session
            .snapshot()
            .map_err(|e| ExportError::Unavailable(e.to_string()))?;
        let names = view
            .table_names()
            .map_err(|e| ExportError::Unavailable(e.to_string()))?;

        let mut snapshots = Vec::with_capacity(names.len());
        for name in names {
            let read_failed = |e: ClientError| ExportError::ReadFailed {
                collection: name.clone(),
                reason: e.to_string(),
            };
            let schema = view.schema_of(&name).map_err(read_failed)?;
            let rows = view.rows_of(&name).map_err(read_failed)?;
            snapshots.push(CollectionSnapshot::Table(TableSnapshot {
                name,
                schema,
                rows,
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
            let CollectionSnapshot::Table(table) = snapshot else {
                return Err(ImportError::KindMismatch {
                    collection: snapshot.name().to_string(),
                });
            };
            // Arity must match the captured schema before anything is written.
            if table.rows.iter().any(|r| r.len() != table.schema.len()) {
                return Err(ImportError::SchemaMismatch {
                    table: table.name.clone(),
                });
            }

            // Table-level transaction: a failure partway through one table
            // leaves that table untouched. Tables already committed stay
            // written; there is no cross-table atomicity.
            session.begin().map_err(|e| ImportError::WriteFailed {
                collection: table.name.clone(),
                reason: e.to_string(),
            })?;
            match Self::restore_table(session.as_mut(), table, drop_existing) {
                Ok(()) => session.commit().map_err(|e| ImportError::WriteFailed {
                    collection: table.name.clone(),
                    reason: e.to_string(),
                })?,
                Err(err) => {
                    let _ = session.rollback();
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}
