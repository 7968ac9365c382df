use std::sync::Arc;

use serde_json::json;

use burrow::adapters::{
    AdapterSet, DocumentStoreAdapter, InMemoryDocumentStore, InMemorySqlStore, RelationalAdapter,
};
use burrow::model::{Column, Document, Row, SqlValue};
use burrow::store::{BackupStore, FsBackupStore, MemoryBackupStore};
use burrow::{BackupEngine, Target, TargetRegistry, TargetRole, Technology};

fn doc(name: &str, value: i64) -> Document {
    let mut d = Document::new();
    d.insert("name".into(), json!(name));
    d.insert("value".into(), json!(value));
    d
}

fn widget_schema() -> Vec<Column> {
    vec![
        Column {
            name: "id".into(),
            sql_type: "bigint".into(),
            nullable: false,
            primary_key: true,
        },
        Column {
            name: "name".into(),
            sql_type: "text".into(),
            nullable: false,
            primary_key: false,
        },
        Column {
            name: "value".into(),
            sql_type: "bigint".into(),
            nullable: true,
            primary_key: false,
        },
    ]
}

fn row(id: i64, name: &str, value: i64) -> Row {
    vec![
        SqlValue::Integer(id),
        SqlValue::Text(name.into()),
        SqlValue::Integer(value),
    ]
}

struct Fleet {
    documents: InMemoryDocumentStore,
    sql: InMemorySqlStore,
}

impl Fleet {
    fn new() -> Self {
        let documents = InMemoryDocumentStore::new();
        let sql = InMemorySqlStore::new();
        for db in ["doc-src", "doc-dst"] {
            documents.create_database(db);
        }
        for db in ["sql-src", "sql-dst"] {
            sql.create_database(db);
        }
        Fleet { documents, sql }
    }

    fn engine(&self, store: Arc<dyn BackupStore>) -> BackupEngine {
        let adapters = AdapterSet::new(
            Arc::new(DocumentStoreAdapter::new(Arc::new(self.documents.clone()))),
            Arc::new(RelationalAdapter::new(Arc::new(self.sql.clone()))),
        );
        let targets = vec![
            target("doc-src", Technology::DocumentStore),
            target("doc-dst", Technology::DocumentStore),
            target("sql-src", Technology::Relational),
            target("sql-dst", Technology::Relational),
        ];
        BackupEngine::new(TargetRegistry::new(targets).unwrap(), adapters, store)
    }
}

fn target(name: &str, technology: Technology) -> Target {
    Target {
        name: name.to_string(),
        technology,
        role: TargetRole::Both,
        connection: format!("mem://{name}"),
    }
}

fn names_of(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn should_round_trip_documents_with_destructive_restore() {
    let fleet = Fleet::new();
    fleet.documents.insert("doc-src", "widgets", doc("first", 42));
    fleet.documents.insert("doc-src", "widgets", doc("second", 43));
    fleet.documents.insert("doc-dst", "widgets", doc("third", 44));

    let engine = fleet.engine(Arc::new(MemoryBackupStore::new()));
    let id = engine.create_backup("doc-src").unwrap();
    engine.restore_backup("doc-dst", id, true).unwrap();

    let restored = fleet.documents.documents("doc-dst", "widgets");
    assert_eq!(names_of(&restored), vec!["first", "second"]);
}

#[test]
fn should_merge_documents_with_non_destructive_restore() {
    let fleet = Fleet::new();
    fleet.documents.insert("doc-src", "widgets", doc("first", 42));
    fleet.documents.insert("doc-src", "widgets", doc("second", 43));
    fleet.documents.insert("doc-dst", "widgets", doc("third", 44));

    let engine = fleet.engine(Arc::new(MemoryBackupStore::new()));
    let id = engine.create_backup("doc-src").unwrap();
    engine.restore_backup("doc-dst", id, false).unwrap();

    let restored = fleet.documents.documents("doc-dst", "widgets");
    assert_eq!(restored.len(), 3);
    let mut names = names_of(&restored);
    names.sort();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn should_round_trip_relational_tables_with_destructive_restore() {
    let fleet = Fleet::new();
    fleet.sql.define_table("sql-src", "widgets", widget_schema()).unwrap();
    fleet.sql.insert("sql-src", "widgets", row(1, "first", 42)).unwrap();
    fleet.sql.insert("sql-src", "widgets", row(2, "second", 43)).unwrap();
    fleet.sql.define_table("sql-dst", "widgets", widget_schema()).unwrap();
    fleet.sql.insert("sql-dst", "widgets", row(3, "third", 44)).unwrap();

    let engine = fleet.engine(Arc::new(MemoryBackupStore::new()));
    let id = engine.create_backup("sql-src").unwrap();
    engine.restore_backup("sql-dst", id, true).unwrap();

    assert_eq!(
        fleet.sql.rows("sql-dst", "widgets").unwrap(),
        vec![row(1, "first", 42), row(2, "second", 43)]
    );
    assert_eq!(fleet.sql.schema("sql-dst", "widgets").unwrap(), widget_schema());
}

#[test]
fn should_reach_the_same_state_when_a_destructive_restore_is_repeated() {
    let fleet = Fleet::new();
    fleet.documents.insert("doc-src", "widgets", doc("first", 42));
    fleet.documents.insert("doc-src", "widgets", doc("second", 43));

    let engine = fleet.engine(Arc::new(MemoryBackupStore::new()));
    let id = engine.create_backup("doc-src").unwrap();

    engine.restore_backup("doc-dst", id, true).unwrap();
    let first_pass = names_of(&fleet.documents.documents("doc-dst", "widgets"));
    engine.restore_backup("doc-dst", id, true).unwrap();
    let second_pass = names_of(&fleet.documents.documents("doc-dst", "widgets"));

    assert_eq!(first_pass, second_pass);
    assert_eq!(second_pass, vec!["first", "second"]);
}

#[test]
fn should_restore_from_a_filesystem_backed_store() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = Fleet::new();
    fleet.sql.define_table("sql-src", "widgets", widget_schema()).unwrap();
    fleet.sql.insert("sql-src", "widgets", row(1, "first", 42)).unwrap();

    let id = {
        let engine = fleet.engine(Arc::new(FsBackupStore::new(dir.path()).unwrap()));
        engine.create_backup("sql-src").unwrap()
    };

    // A separate engine over the same directory sees the artifact, the way
    // a fresh process would.
    let engine = fleet.engine(Arc::new(FsBackupStore::new(dir.path()).unwrap()));
    let listed = engine.list_backups().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].backup_id, id);
    assert_eq!(listed[0].source_target, "sql-src");

    engine.restore_backup("sql-dst", id, true).unwrap();
    assert_eq!(fleet.sql.rows("sql-dst", "widgets").unwrap(), vec![row(1, "first", 42)]);
}

#[test]
fn should_preserve_captured_field_order_through_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = Fleet::new();
    let mut record = Document::new();
    record.insert("zeta".into(), json!(1));
    record.insert("alpha".into(), json!(2));
    fleet.documents.insert("doc-src", "widgets", record);

    let engine = fleet.engine(Arc::new(FsBackupStore::new(dir.path()).unwrap()));
    let id = engine.create_backup("doc-src").unwrap();
    engine.restore_backup("doc-dst", id, true).unwrap();

    let restored = fleet.documents.documents("doc-dst", "widgets");
    let keys: Vec<&str> = restored[0]
        .keys()
        .map(String::as_str)
        .filter(|k| *k != "_id")
        .collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
}
