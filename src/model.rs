use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Storage technology a target speaks. New technologies are added by
/// implementing `StoreAdapter`, not by extending the data model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    DocumentStore,
    Relational,
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::DocumentStore => "document_store",
            Technology::Relational => "relational",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a configured target may be used for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Source,
    Destination,
    #[default]
    Both,
}

impl TargetRole {
    pub fn can_source(&self) -> bool {
        matches!(self, TargetRole::Source | TargetRole::Both)
    }

    pub fn can_restore(&self) -> bool {
        matches!(self, TargetRole::Destination | TargetRole::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetRole::Source => "source",
            TargetRole::Destination => "destination",
            TargetRole::Both => "both",
        }
    }
}

/// A named, configured connection endpoint. Built once at startup from the
/// target definitions file and read-only afterwards.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Target {
    pub name: String,
    pub technology: Technology,
    #[serde(default)]
    pub role: TargetRole,
    /// Opaque connection descriptor, interpreted only by the adapter's client.
    pub connection: String,
}

/// Opaque backup identifier, unique per artifact.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BackupId(Uuid);

impl BackupId {
    pub fn random() -> Self {
        BackupId(Uuid::new_v4())
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BackupId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BackupId(Uuid::parse_str(s)?))
    }
}

/// A schemaless record. Field order is preserved as read from the store.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// One relational value. Serialized untagged so artifacts stay readable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// One relational row, positionally matching the captured schema.
pub type Row = Vec<SqlValue>;

/// Column descriptor captured from a relational source.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub name: String,
    pub records: Vec<Document>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TableSnapshot {
    pub name: String,
    pub schema: Vec<Column>,
    pub rows: Vec<Row>,
}

/// Point-in-time capture of one collection or table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionSnapshot {
    Documents(DocumentSnapshot),
    Table(TableSnapshot),
}

impl CollectionSnapshot {
    pub fn name(&self) -> &str {
        match self {
            CollectionSnapshot::Documents(d) => &d.name,
            CollectionSnapshot::Table(t) => &t.name,
        }
    }

    pub fn technology(&self) -> Technology {
        match self {
            CollectionSnapshot::Documents(_) => Technology::DocumentStore,
            CollectionSnapshot::Table(_) => Technology::Relational,
        }
    }
}

/// Immutable result of one backup operation. Created by the backup
/// coordinator, persisted to the backup store, replayed any number of times.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BackupArtifact {
    pub backup_id: BackupId,
    pub source_target: String,
    pub created_at: DateTime<FixedOffset>,
    pub collections: Vec<CollectionSnapshot>,
}

/// Listing row for the operator surface.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BackupSummary {
    pub backup_id: BackupId,
    pub source_target: String,
    pub created_at: DateTime<FixedOffset>,
    pub collections: usize,
}

impl From<&BackupArtifact> for BackupSummary {
    fn from(artifact: &BackupArtifact) -> Self {
        BackupSummary {
            backup_id: artifact.backup_id,
            source_target: artifact.source_target.clone(),
            created_at: artifact.created_at,
            collections: artifact.collections.len(),
        }
    }
}

/// Outcome of a health probe. Computed fresh on every call, never cached.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    pub is_healthy: bool,
}
