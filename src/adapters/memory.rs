use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use uuid::Uuid;

use crate::adapters::document::{DocumentConnector, DocumentSession};
use crate::adapters::relational::{SqlConnector, SqlSession, SqlSnapshot};
use crate::errors::ClientError;
use crate::model::{Column, Document, Row};

/// Connection strings for the embedded stores: `mem://<database>`.
fn database_name(connection: &str) -> Result<&str, ClientError> {
    connection
        .strip_prefix("mem://")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ClientError::Unavailable(format!("unsupported connection string '{connection}'")))
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

// Collections keep insertion order, like a real store's namespace listing.
type DocumentDb = Vec<(String, Vec<Document>)>;

/// Process-local schemaless store. Cloning yields another handle onto the
/// same databases; this is the reference `DocumentConnector` and the test
/// substrate. Records get a synthetic `_id` on insert, mirroring the
/// storage-internal identity real document stores inject.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<Mutex<HashMap<String, DocumentDb>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DocumentDb>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_database(&self, name: &str) {
        self.lock().entry(name.to_string()).or_default();
    }

    /// Seed one record; assigns `_id` the same way `insert_many` does.
    pub fn insert(&self, database: &str, collection: &str, record: Document) {
        let mut databases = self.lock();
        let db = databases.entry(database.to_string()).or_default();
        push_record(db, collection, record);
    }

    /// Current records of a collection, identity field included. Empty when
    /// the database or collection does not exist.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.lock()
            .get(database)
            .and_then(|db| db.iter().find(|(name, _)| name == collection))
            .map(|(_, records)| records.clone())
            .unwrap_or_default()
    }
}

fn push_record(db: &mut DocumentDb, collection: &str, mut record: Document) {
    if !record.contains_key("_id") {
        record.insert("_id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    match db.iter_mut().find(|(name, _)| name == collection) {
        Some((_, records)) => records.push(record),
        None => db.push((collection.to_string(), vec![record])),
    }
}

struct MemoryDocumentSession {
    store: InMemoryDocumentStore,
    database: String,
}

impl MemoryDocumentSession {
    fn with_db<T>(
        &self,
        f: impl FnOnce(&mut DocumentDb) -> T,
    ) -> Result<T, ClientError> {
        let mut databases = self.store.lock();
        let db = databases
            .get_mut(&self.database)
            .ok_or_else(|| ClientError::Unavailable(format!("unknown database '{}'", self.database)))?;
        Ok(f(db))
    }
}

impl DocumentSession for MemoryDocumentSession {
    fn ping(&mut self) -> Result<(), ClientError> {
        self.with_db(|_| ())
    }

    fn identity_field(&self) -> Option<&str> {
        Some("_id")
    }

    fn collection_names(&mut self) -> Result<Vec<String>, ClientError> {
        self.with_db(|db| db.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_all(&mut self, collection: &str) -> Result<Vec<Document>, ClientError> {
        self.with_db(|db| {
            db.iter()
                .find(|(name, _)| name == collection)
                .map(|(_, records)| records.clone())
                .unwrap_or_default()
        })
    }

    fn delete_all(&mut self, collection: &str) -> Result<(), ClientError> {
        self.with_db(|db| {
            if let Some((_, records)) = db.iter_mut().find(|(name, _)| name == collection) {
                records.clear();
            }
        })
    }

    fn insert_many(&mut self, collection: &str, records: &[Document]) -> Result<(), ClientError> {
        self.with_db(|db| {
            for record in records {
                push_record(db, collection, record.clone());
            }
        })
    }
}

impl DocumentConnector for InMemoryDocumentStore {
    fn connect(&self, connection: &str) -> Result<Box<dyn DocumentSession + '_>, ClientError> {
        let database = database_name(connection)?.to_string();
        if !self.lock().contains_key(&database) {
            return Err(ClientError::Unavailable(format!("unknown database '{database}'")));
        }
        Ok(Box::new(MemoryDocumentSession {
            store: self.clone(),
            database,
        }))
    }
}

// ---------------------------------------------------------------------------
// Relational store
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct SqlTable {
    name: String,
    schema: Vec<Column>,
    rows: Vec<Row>,
}

#[derive(Clone, Debug, Default)]
struct SqlDb {
    tables: Vec<SqlTable>,
}

impl SqlDb {
    fn table(&self, name: &str) -> Option<&SqlTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut SqlTable, ClientError> {
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| ClientError::Query(format!("no such table '{name}'")))
    }

    fn insert_row(&mut self, table: &str, row: Row) -> Result<(), ClientError> {
        let table = self.table_mut(table)?;
        if row.len() != table.schema.len() {
            return Err(ClientError::Query(format!(
                "table '{}' expects {} values, got {}",
                table.name,
                table.schema.len(),
                row.len()
            )));
        }
        let key_columns: Vec<usize> = table
            .schema
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        if !key_columns.is_empty()
            && table
                .rows
                .iter()
                .any(|existing| key_columns.iter().all(|&i| existing[i] == row[i]))
        {
            return Err(ClientError::UniqueViolation(format!(
                "duplicate key in table '{}'",
                table.name
            )));
        }
        table.rows.push(row);
        Ok(())
    }
}

/// Process-local relational store; the reference `SqlConnector` and test
/// substrate. Table listing preserves creation order, primary keys are
/// enforced on insert, and session transactions are table-scoped: rollback
/// reverts only the tables the transaction touched, leaving concurrent
/// writes to other tables intact.
#[derive(Clone, Debug, Default)]
pub struct InMemorySqlStore {
    inner: Arc<Mutex<HashMap<String, SqlDb>>>,
}

impl InMemorySqlStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SqlDb>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_database(&self, name: &str) {
        self.lock().entry(name.to_string()).or_default();
    }

    pub fn define_table(
        &self,
        database: &str,
        table: &str,
        schema: Vec<Column>,
    ) -> Result<(), ClientError> {
        let mut databases = self.lock();
        let db = databases.entry(database.to_string()).or_default();
        if db.table(table).is_some() {
            return Err(ClientError::Query(format!("table '{table}' already exists")));
        }
        db.tables.push(SqlTable {
            name: table.to_string(),
            schema,
            rows: Vec::new(),
        });
        Ok(())
    }

    pub fn insert(&self, database: &str, table: &str, row: Row) -> Result<(), ClientError> {
        let mut databases = self.lock();
        let db = databases
            .get_mut(database)
            .ok_or_else(|| ClientError::Unavailable(format!("unknown database '{database}'")))?;
        db.insert_row(table, row)
    }

    pub fn rows(&self, database: &str, table: &str) -> Option<Vec<Row>> {
        self.lock()
            .get(database)
            .and_then(|db| db.table(table))
            .map(|t| t.rows.clone())
    }

    pub fn schema(&self, database: &str, table: &str) -> Option<Vec<Column>> {
        self.lock()
            .get(database)
            .and_then(|db| db.table(table))
            .map(|t| t.schema.clone())
    }

    pub fn table_names(&self, database: &str) -> Vec<String> {
        self.lock()
            .get(database)
            .map(|db| db.tables.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
struct MemorySqlSession {
    store: InMemorySqlStore,
    database: String,
    // Pre-images of tables touched since `begin`, keyed by table name.
    // `None` marks a table that did not exist when first touched.
    saved: Option<HashMap<String, Option<SqlTable>>>,
}

impl MemorySqlSession {
    fn with_db<T>(
        &self,
        f: impl FnOnce(&mut SqlDb) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut databases = self.store.lock();
        let db = databases
            .get_mut(&self.database)
            .ok_or_else(|| ClientError::Unavailable(format!("unknown database '{}'", self.database)))?;
        f(db)
    }

    /// Record a table's pre-image the first time a transaction touches it.
    /// No-op outside a transaction.
    fn remember(&mut self, table: &str) -> Result<(), ClientError> {
        if self.saved.is_none() {
            return Ok(());
        }
        let before = self.with_db(|db| Ok(db.table(table).cloned()))?;
        if let Some(saved) = self.saved.as_mut() {
            saved.entry(table.to_string()).or_insert(before);
        }
        Ok(())
    }
}

impl SqlSession for MemorySqlSession {
    fn ping(&mut self) -> Result<(), ClientError> {
        self.with_db(|_| Ok(()))
    }

    fn snapshot(&mut self) -> Result<Box<dyn SqlSnapshot + '_>, ClientError> {
        // Cloning the database under the lock gives a read-consistent view.
        let db = self.with_db(|db| Ok(db.clone()))?;
        Ok(Box::new(MemorySqlSnapshot { db }))
    }

    fn begin(&mut self) -> Result<(), ClientError> {
        if self.saved.is_some() {
            return Err(ClientError::Query("transaction already open".to_string()));
        }
        self.with_db(|_| Ok(()))?;
        self.saved = Some(HashMap::new());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ClientError> {
        if self.saved.take().is_none() {
            return Err(ClientError::Query("no open transaction".to_string()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ClientError> {
        let Some(saved) = self.saved.take() else {
            return Err(ClientError::Query("no open transaction".to_string()));
        };
        self.with_db(|db| {
            for (name, before) in saved {
                let position = db.tables.iter().position(|t| t.name == name);
                match (position, before) {
                    (Some(i), Some(table)) => db.tables[i] = table,
                    (Some(i), None) => {
                        db.tables.remove(i);
                    }
                    (None, Some(table)) => db.tables.push(table),
                    (None, None) => {}
                }
            }
            Ok(())
        })
    }

    fn table_exists(&mut self, table: &str) -> Result<bool, ClientError> {
        self.with_db(|db| Ok(db.table(table).is_some()))
    }

    fn drop_table(&mut self, table: &str) -> Result<(), ClientError> {
        self.remember(table)?;
        self.with_db(|db| {
            db.tables.retain(|t| t.name != table);
            Ok(())
        })
    }

    fn create_table(&mut self, table: &str, schema: &[Column]) -> Result<(), ClientError> {
        self.remember(table)?;
        self.with_db(|db| {
            if db.table(table).is_some() {
                return Err(ClientError::Query(format!("table '{table}' already exists")));
            }
            db.tables.push(SqlTable {
                name: table.to_string(),
                schema: schema.to_vec(),
                rows: Vec::new(),
            });
            Ok(())
        })
    }

    fn insert_rows(&mut self, table: &str, rows: &[Row]) -> Result<(), ClientError> {
        self.remember(table)?;
        self.with_db(|db| {
            for row in rows {
                db.insert_row(table, row.clone())?;
            }
            Ok(())
        })
    }
}

struct MemorySqlSnapshot {
    db: SqlDb,
}

impl SqlSnapshot for MemorySqlSnapshot {
    fn table_names(&mut self) -> Result<Vec<String>, ClientError> {
        Ok(self.db.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn schema_of(&mut self, table: &str) -> Result<Vec<Column>, ClientError> {
        Ok(self
            .db
            .table(table)
            .ok_or_else(|| ClientError::Query(format!("no such table '{table}'")))?
            .schema
            .clone())
    }

    fn rows_of(&mut self, table: &str) -> Result<Vec<Row>, ClientError> {
        Ok(self
            .db
            .table(table)
            .ok_or_else(|| ClientError::Query(format!("no such table '{table}'")))?
            .rows
            .clone())
    }
}

impl SqlConnector for InMemorySqlStore {
    fn connect(&self, connection: &str) -> Result<Box<dyn SqlSession + '_>, ClientError> {
        let database = database_name(connection)?.to_string();
        if !self.lock().contains_key(&database) {
            return Err(ClientError::Unavailable(format!("unknown database '{database}'")));
        }
        Ok(Box::new(MemorySqlSession {
            store: self.clone(),
            database,
            saved: None,
        }))
    }
}
