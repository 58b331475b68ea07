//! Integration tests for driftplan-core.
//!
//! File-based comparisons run everywhere. The live PostgreSQL test needs a
//! running instance and is skipped unless TEST_DATABASE_URL is set, e.g.:
//!   TEST_DATABASE_URL="host=localhost user=postgres dbname=driftplan_test"
//!
//! Run with: cargo test --test integration_test

use std::path::{Path, PathBuf};

use driftplan_core::config::{DatabaseConfig, DriftplanConfig, SslMode};
use driftplan_core::db;
use driftplan_core::introspect::{ColumnRow, MemoryCatalog, TableRow};
use driftplan_core::model::{DatabaseObject, ObjectKind};
use driftplan_core::source::SqlSource;
use driftplan_core::{diff, normalize, Action, Dialect, Driftplan, Side};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn driftplan(dialect: &str) -> Driftplan {
    let mut config = DriftplanConfig::default();
    config.compare.dialect = Some(dialect.to_string());
    Driftplan::new(config)
}

fn model_of(dialect: Dialect, path: &Path) -> driftplan_core::SchemaModel {
    let source = SqlSource::read(path).expect("fixture should be readable");
    normalize(dialect, &[source])
}

// ── Idempotence ──

#[test]
fn test_every_fixture_compares_equal_to_itself() {
    let cases = [
        ("postgres", "postgres_app.sql"),
        ("mysql", "mysql_shop.sql"),
        ("sqlite", "sqlite_notes.sql"),
        ("db2", "db2_full.sql"),
    ];
    for (dialect, file) in cases {
        let path = fixture(file);
        let report = driftplan(dialect)
            .compare(&[path.clone()], &[path])
            .unwrap();
        assert!(!report.has_changes, "{}: {}", file, report.plan);
        assert_eq!(report.plan.to_string(), "No changes detected");
        assert!(report.source_objects > 0, "{} produced no objects", file);
    }
}

#[test]
fn test_db2_full_feature_schema() {
    let path = fixture("db2_full.sql");
    let model = model_of(Dialect::Db2, &path);
    let counts = model.kind_counts();
    for kind in [
        ObjectKind::Table,
        ObjectKind::Index,
        ObjectKind::AuxiliaryTable,
        ObjectKind::Alias,
        ObjectKind::View,
        ObjectKind::Trigger,
    ] {
        assert!(
            counts.iter().any(|(k, _)| *k == kind),
            "missing {} in {:?}",
            kind,
            counts
        );
    }

    let account = model
        .iter()
        .find_map(|o| match o {
            DatabaseObject::Table(t) if t.name.name == "ACCOUNT" => Some(t),
            _ => None,
        })
        .expect("ACCOUNT table");
    assert_eq!(
        account.versioning.system_time,
        Some(("SYS_START".to_string(), "SYS_END".to_string()))
    );

    let report = driftplan("db2").compare(&[path.clone()], &[path]).unwrap();
    assert_eq!(report.plan.to_string(), "No changes detected");
}

// ── Additivity and detection ──

#[test]
fn test_mysql_appended_table_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let original = fixture("mysql_shop.sql");
    let copy = dir.path().join("shop_copy.sql");
    let mut sql = std::fs::read_to_string(&original).unwrap();
    sql.push_str("\nCREATE TABLE new_table (id INT);\n");
    std::fs::write(&copy, sql).unwrap();

    let report = driftplan("mysql").compare(&[original], &[copy]).unwrap();
    let output = report.plan.to_string();
    assert!(output.contains("Create Table"), "plan was: {}", output);
    assert!(output.contains("new_table"), "plan was: {}", output);
    assert_eq!(report.plan.len(), 1);
}

#[test]
fn test_appending_one_object_yields_one_create() {
    let base = "CREATE TABLE a (id int PRIMARY KEY);\nCREATE VIEW av AS SELECT id FROM a;\n";
    let source = normalize(Dialect::Postgres, &[SqlSource::new("s.sql", base)]);
    let target = normalize(
        Dialect::Postgres,
        &[SqlSource::new(
            "t.sql",
            format!("{}CREATE INDEX a_id ON a (id);\n", base),
        )],
    );
    let plan = diff(&source, &target);
    assert_eq!(plan.lines(), vec!["Create Index: a_id"]);
}

// ── Directories ──

#[test]
fn test_directory_matches_concatenated_file() {
    let dir = tempfile::tempdir().unwrap();
    let schema_dir = dir.path().join("schema");
    std::fs::create_dir(&schema_dir).unwrap();
    let tables = [
        "CREATE TABLE customers (id int PRIMARY KEY, email text NOT NULL);",
        "CREATE TABLE orders (id int PRIMARY KEY, customer_id int REFERENCES customers (id));",
        "CREATE TABLE items (id int PRIMARY KEY, order_id int NOT NULL REFERENCES orders (id), sku varchar(32));",
    ];
    for (i, sql) in tables.iter().enumerate() {
        std::fs::write(schema_dir.join(format!("{:02}_table.sql", i)), sql).unwrap();
    }
    // non-SQL files are ignored
    std::fs::write(schema_dir.join("README.md"), "notes").unwrap();
    let single = dir.path().join("all.sql");
    std::fs::write(&single, tables.join("\n")).unwrap();

    let report = driftplan("postgres").compare(&[schema_dir], &[single]).unwrap();
    assert!(!report.has_changes, "unexpected plan: {}", report.plan);
    assert_eq!(report.source_objects, 3);
}

#[test]
fn test_empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.sql");
    std::fs::write(&file, "CREATE TABLE a (id int);").unwrap();
    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();

    let err = driftplan("postgres").compare(&[empty], &[file]).unwrap_err();
    assert!(matches!(
        err,
        driftplan_core::DriftplanError::NoSqlFiles { side: Side::Source, .. }
    ));
}

// ── Ordering ──

#[test]
fn test_plan_order_is_dependency_safe() {
    let source = normalize(
        Dialect::Postgres,
        &[SqlSource::new(
            "old.sql",
            "CREATE TABLE legacy (id int PRIMARY KEY);
             CREATE TABLE legacy_child (id int, legacy_id int REFERENCES legacy (id));
             CREATE VIEW legacy_view AS SELECT id FROM legacy;",
        )],
    );
    let target = normalize(
        Dialect::Postgres,
        &[SqlSource::new(
            "new.sql",
            "CREATE INDEX fresh_name ON fresh (name);
             CREATE TABLE fresh (id int, name text);",
        )],
    );
    let lines = diff(&source, &target).lines();
    let pos = |line: &str| {
        lines
            .iter()
            .position(|l| l == line)
            .unwrap_or_else(|| panic!("{} missing from {:?}", line, lines))
    };

    assert!(pos("Create Table: fresh") < pos("Create Index: fresh_name"));
    assert!(pos("Drop Table: legacy_child") < pos("Drop Table: legacy"));
    assert!(pos("Drop View: legacy_view") < pos("Drop Table: legacy"));
}

// ── Live source ──

#[tokio::test]
async fn test_filtered_live_source_reports_new_table() {
    // the live database also has a view; the reader only reports tables
    let catalog = MemoryCatalog {
        tables: vec![TableRow::new("public", "t")],
        columns: vec![ColumnRow::new("public", "t", "id", "integer")],
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("target.sql");
    std::fs::write(&target, "CREATE TABLE t (id integer);\nCREATE TABLE t2 (id integer);\n").unwrap();

    let mut config = DriftplanConfig::default();
    config.compare.dialect = Some("postgres".to_string());
    config.compare.object_types = vec![ObjectKind::Table];
    let report = Driftplan::new(config)
        .compare_reader(&catalog, &[target])
        .await
        .unwrap();

    assert_eq!(report.plan.lines(), vec!["Create Table: t2"]);
    assert!(report.omitted_kinds.is_empty());
    assert_eq!(report.plan.count(Action::Drop), 0);
}

#[tokio::test]
async fn test_live_postgres_matches_its_ddl() {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping live test");
            return;
        }
    };

    let database = DatabaseConfig {
        url: Some(url.clone()),
        ssl_mode: SslMode::Disable,
        ..Default::default()
    };
    let client = db::connect(&url, &database, Side::Source)
        .await
        .expect("Failed to connect to DB");

    let schema = format!("driftplan_it_{}", fastrand::u32(..));
    let ddl = format!(
        "CREATE TABLE {s}.users (id integer PRIMARY KEY, email varchar(255) NOT NULL, created_at timestamptz NOT NULL DEFAULT now());
         CREATE TABLE {s}.posts (id bigint NOT NULL, author_id integer REFERENCES {s}.users (id), title text);
         CREATE INDEX posts_author_idx ON {s}.posts (author_id);",
        s = schema
    );
    client
        .batch_execute(&format!("CREATE SCHEMA {};\n{}", schema, ddl))
        .await
        .expect("Failed to create test schema");

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("schema.sql");
    std::fs::write(&target, &ddl).unwrap();

    let mut config = DriftplanConfig::default();
    config.compare.dialect = Some("postgres".to_string());
    config.compare.object_types = vec![ObjectKind::Table, ObjectKind::Index];
    config.database = DatabaseConfig {
        schema: schema.clone(),
        ..database
    };
    let result = Driftplan::new(config).compare_livedb(&[target]).await;

    client
        .batch_execute(&format!("DROP SCHEMA {} CASCADE", schema))
        .await
        .expect("Failed to drop test schema");

    let report = result.unwrap();
    assert!(!report.has_changes, "unexpected plan:\n{}", report.plan);
    assert_eq!(report.source_objects, 3);
}
