//! Live-database introspection.
//!
//! A [`CatalogReader`] hands back catalog rows; [`introspect`] turns them into
//! the same schema model the parsers build. Types, defaults, constraints and
//! index definitions go through the parser's own normalizers, so a live
//! database and the DDL that created it compare equal.

pub mod postgres;

use std::collections::{HashMap, HashSet};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::model::{
    Column, DatabaseObject, Generation, ObjectKind, QualifiedName, SchemaModel, Table,
};
use crate::parser::{
    canonical_expr, canonical_sql, enforce_primary_key_nullability, normalize_default,
    parse_constraint_text, parse_partition_text, parse_type_text,
};

pub use postgres::PgCatalog;

/// Object kinds live introspection builds. Everything else is reported as
/// omitted.
pub const INTROSPECTED_KINDS: [ObjectKind; 2] = [ObjectKind::Table, ObjectKind::Index];

/// Source label used for warnings raised while introspecting.
pub const LIVE_SOURCE: &str = "live database";

/// One base table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub schema: String,
    pub name: String,
    pub tablespace: Option<String>,
    /// Partition key as the catalog renders it (`RANGE (created_at)`).
    pub partition_key: Option<String>,
    /// Storage parameters (`fillfactor=70`).
    pub options: Vec<String>,
}

impl TableRow {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            tablespace: None,
            partition_key: None,
            options: Vec::new(),
        }
    }
}

/// One column, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Type as the catalog renders it (`character varying(255)`).
    pub data_type: String,
    pub nullable: bool,
    /// Default expression, or the generation expression when `generated`.
    pub default: Option<String>,
    pub identity: bool,
    pub generated: bool,
}

impl ColumnRow {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            identity: false,
            generated: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// One primary key, unique, foreign key or check constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Constraint body (`FOREIGN KEY (user_id) REFERENCES users(id)`).
    pub definition: String,
}

/// One standalone index (not backing a constraint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub schema: String,
    pub name: String,
    /// Full `CREATE INDEX` statement.
    pub definition: String,
}

/// Source of catalog rows for one schema.
///
/// Implemented by [`PgCatalog`] for PostgreSQL and by [`MemoryCatalog`] for
/// rows already in hand.
#[allow(async_fn_in_trait)]
pub trait CatalogReader {
    async fn tables(&self) -> Result<Vec<TableRow>>;
    async fn columns(&self) -> Result<Vec<ColumnRow>>;
    async fn constraints(&self) -> Result<Vec<ConstraintRow>>;
    async fn indexes(&self) -> Result<Vec<IndexRow>>;
}

/// Catalog rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    pub tables: Vec<TableRow>,
    pub columns: Vec<ColumnRow>,
    pub constraints: Vec<ConstraintRow>,
    pub indexes: Vec<IndexRow>,
}

impl CatalogReader for MemoryCatalog {
    async fn tables(&self) -> Result<Vec<TableRow>> {
        Ok(self.tables.clone())
    }

    async fn columns(&self) -> Result<Vec<ColumnRow>> {
        Ok(self.columns.clone())
    }

    async fn constraints(&self) -> Result<Vec<ConstraintRow>> {
        Ok(self.constraints.clone())
    }

    async fn indexes(&self) -> Result<Vec<IndexRow>> {
        Ok(self.indexes.clone())
    }
}

/// Model built from a live database plus what it could not see.
#[derive(Debug, Clone)]
pub struct IntrospectedSchema {
    pub model: SchemaModel,
    /// Kinds the reader does not cover; the model never contains them.
    pub omitted_kinds: Vec<ObjectKind>,
}

impl IntrospectedSchema {
    /// Omitted kinds that matter for a comparison restricted to `kinds`
    /// (empty means every kind).
    pub fn omitted_among(&self, kinds: &[ObjectKind]) -> Vec<ObjectKind> {
        self.omitted_kinds
            .iter()
            .copied()
            .filter(|k| kinds.is_empty() || kinds.contains(k))
            .collect()
    }
}

/// Build a schema model from catalog rows.
pub async fn introspect<R: CatalogReader>(reader: &R, dialect: Dialect) -> Result<IntrospectedSchema> {
    let table_rows = reader.tables().await?;
    let column_rows = reader.columns().await?;
    let constraint_rows = reader.constraints().await?;
    let index_rows = reader.indexes().await?;

    let mut model = SchemaModel::new();
    let mut tables: Vec<Table> = Vec::with_capacity(table_rows.len());
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for row in table_rows {
        let mut table = Table::new(qualify(dialect, &row.schema, &row.name));
        table.storage.placement = row.tablespace;
        table.storage.partition = row
            .partition_key
            .as_deref()
            .and_then(|key| parse_partition_text(key, dialect));
        if !row.options.is_empty() {
            table
                .options
                .insert("WITH".to_string(), canonical_sql(&row.options.join(", "), dialect));
        }
        positions.insert((row.schema, row.name), tables.len());
        tables.push(table);
    }

    for row in column_rows {
        let Some(&i) = positions.get(&(row.schema.clone(), row.table.clone())) else {
            continue;
        };
        let table = &mut tables[i];
        let ordinal = table.columns.len() + 1;
        table.columns.push(column_from_row(row, dialect, ordinal));
    }

    for row in constraint_rows {
        let Some(&i) = positions.get(&(row.schema.clone(), row.table.clone())) else {
            continue;
        };
        match parse_constraint_text(&row.definition, dialect, Some(row.name.clone())) {
            Some(constraint) => tables[i].constraints.push(constraint),
            None => {
                log::warn!(
                    "Skipping constraint that could not be read; constraint={}, table={}, definition={}",
                    row.name,
                    row.table,
                    row.definition
                );
                model.push_warning(
                    LIVE_SOURCE,
                    format!("constraint {} on {} could not be read: {}", row.name, row.table, row.definition),
                );
            }
        }
    }

    let table_names: HashSet<QualifiedName> = tables.iter().map(|t| t.name.clone()).collect();
    let (table_count, index_count) = (tables.len(), index_rows.len());
    for mut table in tables {
        enforce_primary_key_nullability(&mut table);
        model.insert(DatabaseObject::Table(table));
    }

    for row in index_rows {
        match dialect.parse(&row.definition) {
            // partition children are not tables of the model, neither are their indexes
            Some(DatabaseObject::Index(index)) if !table_names.contains(&index.table) => {
                log::debug!(
                    "Skipping index on a table outside the model; index={}, table={}",
                    row.name,
                    index.table
                );
            }
            Some(object @ DatabaseObject::Index(_)) => {
                model.insert(object);
            }
            _ => {
                log::warn!(
                    "Skipping index that could not be read; index={}, definition={}",
                    row.name,
                    row.definition
                );
                model.push_warning(
                    LIVE_SOURCE,
                    format!("index {} could not be read: {}", row.name, row.definition),
                );
            }
        }
    }

    let omitted_kinds: Vec<ObjectKind> = ObjectKind::ALL
        .iter()
        .copied()
        .filter(|k| !INTROSPECTED_KINDS.contains(k) && *k != ObjectKind::RawUnparsed)
        .collect();
    log::info!(
        "Introspected live schema; dialect={}, tables={}, indexes={}, warnings={}",
        dialect,
        table_count,
        index_count,
        model.warnings().len()
    );
    Ok(IntrospectedSchema {
        model,
        omitted_kinds,
    })
}

/// Catalog names are exact; only the dialect's implied schema is dropped.
fn qualify(dialect: Dialect, schema: &str, name: &str) -> QualifiedName {
    let schema = Some(schema.to_string())
        .filter(|s| !s.is_empty() && Some(s.as_str()) != dialect.default_schema());
    QualifiedName::new(schema, name)
}

fn column_from_row(row: ColumnRow, dialect: Dialect, ordinal: usize) -> Column {
    let data_type = parse_type_text(&row.data_type, dialect);
    let (default, generation) = if row.generated {
        let expr = row.default.as_deref().unwrap_or_default();
        (None, Generation::Computed(canonical_expr(expr, dialect)))
    } else {
        let (default, sequence) = match row.default.as_deref() {
            Some(expr) => normalize_default(expr, dialect),
            None => (None, false),
        };
        let generation = if row.identity || sequence {
            Generation::Identity
        } else {
            Generation::None
        };
        (default, generation)
    };
    Column {
        name: row.name,
        data_type,
        nullable: row.nullable,
        default,
        generation,
        ordinal,
        attributes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintKind, ObjectKey};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog {
            tables: vec![TableRow::new("public", "users"), TableRow::new("public", "orders")],
            columns: vec![
                ColumnRow::new("public", "users", "id", "integer")
                    .not_null()
                    .with_default("nextval('users_id_seq'::regclass)"),
                ColumnRow::new("public", "users", "email", "character varying(255)").not_null(),
                ColumnRow::new("public", "users", "status", "text").with_default("'active'::text"),
                ColumnRow::new("public", "orders", "id", "bigint").not_null(),
                ColumnRow::new("public", "orders", "user_id", "integer"),
            ],
            constraints: vec![
                ConstraintRow {
                    schema: "public".to_string(),
                    table: "users".to_string(),
                    name: "users_pkey".to_string(),
                    definition: "PRIMARY KEY (id)".to_string(),
                },
                ConstraintRow {
                    schema: "public".to_string(),
                    table: "orders".to_string(),
                    name: "orders_user_id_fkey".to_string(),
                    definition: "FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE".to_string(),
                },
            ],
            indexes: vec![IndexRow {
                schema: "public".to_string(),
                name: "orders_user_idx".to_string(),
                definition: "CREATE INDEX orders_user_idx ON public.orders USING btree (user_id)".to_string(),
            }],
        }
    }

    fn table<'a>(model: &'a SchemaModel, name: &str) -> &'a Table {
        let key = ObjectKey {
            kind: ObjectKind::Table,
            name: QualifiedName::unqualified(name),
        };
        match model.get(&key) {
            Some(DatabaseObject::Table(t)) => t,
            other => panic!("expected table {}, got {:?}", name, other),
        }
    }

    #[tokio::test]
    async fn test_rows_become_tables_and_indexes() {
        let schema = introspect(&catalog(), Dialect::Postgres).await.unwrap();
        let keys: Vec<String> = schema.model.iter().map(|o| o.key().to_string()).collect();
        assert_eq!(keys, vec!["Table: users", "Table: orders", "Index: orders_user_idx"]);

        let users = table(&schema.model, "users");
        assert_eq!(users.columns[0].generation, Generation::Identity);
        assert_eq!(users.columns[0].default, None);
        assert_eq!(users.columns[2].default.as_deref(), Some("'active'"));
        assert_eq!(users.columns[1].ordinal, 2);
        assert_eq!(users.constraints[0].name.as_deref(), Some("users_pkey"));

        let orders = table(&schema.model, "orders");
        match &orders.constraints[0].kind {
            ConstraintKind::ForeignKey(fk) => {
                assert_eq!(fk.table, QualifiedName::unqualified("users"));
                assert_eq!(fk.on_delete.as_deref(), Some("CASCADE"));
            }
            other => panic!("expected foreign key, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_live_model_matches_equivalent_ddl() {
        let ddl = "CREATE TABLE users (id serial PRIMARY KEY, email varchar(255) NOT NULL, status text DEFAULT 'active');\n\
                   CREATE TABLE orders (id bigint NOT NULL, user_id int REFERENCES users (id) ON DELETE CASCADE);\n\
                   CREATE INDEX orders_user_idx ON orders (user_id);";
        let parsed = crate::normalize::normalize(
            Dialect::Postgres,
            &[crate::source::SqlSource::new("schema.sql", ddl)],
        );
        let live = introspect(&catalog(), Dialect::Postgres).await.unwrap();
        let plan = crate::diff::diff(&live.model, &parsed);
        assert!(plan.is_empty(), "unexpected plan:\n{}", plan);
    }

    #[tokio::test]
    async fn test_omitted_kinds_are_reported() {
        let schema = introspect(&MemoryCatalog::default(), Dialect::Postgres).await.unwrap();
        assert!(schema.model.is_empty());
        assert!(schema.omitted_kinds.contains(&ObjectKind::View));
        assert!(!schema.omitted_kinds.contains(&ObjectKind::Table));
        assert!(!schema.omitted_kinds.contains(&ObjectKind::RawUnparsed));
        assert_eq!(schema.omitted_among(&[ObjectKind::Table]), Vec::<ObjectKind>::new());
        assert_eq!(
            schema.omitted_among(&[ObjectKind::Table, ObjectKind::Trigger]),
            vec![ObjectKind::Trigger]
        );
    }

    #[tokio::test]
    async fn test_unreadable_constraint_is_a_warning() {
        let mut rows = catalog();
        rows.constraints.push(ConstraintRow {
            schema: "public".to_string(),
            table: "users".to_string(),
            name: "users_excl".to_string(),
            definition: "EXCLUDE USING gist (email WITH =)".to_string(),
        });
        let schema = introspect(&rows, Dialect::Postgres).await.unwrap();
        assert_eq!(schema.model.warnings().len(), 1);
        assert_eq!(schema.model.warnings()[0].source, LIVE_SOURCE);
    }

    #[tokio::test]
    async fn test_partitioned_parent_without_child_indexes() {
        let mut events = TableRow::new("public", "events");
        events.partition_key = Some("RANGE (at)".to_string());
        let rows = MemoryCatalog {
            tables: vec![events],
            columns: vec![
                ColumnRow::new("public", "events", "id", "bigint").not_null(),
                ColumnRow::new("public", "events", "at", "timestamp with time zone").not_null(),
            ],
            constraints: Vec::new(),
            indexes: vec![
                IndexRow {
                    schema: "public".to_string(),
                    name: "events_at_idx".to_string(),
                    definition: "CREATE INDEX events_at_idx ON ONLY public.events USING btree (at)".to_string(),
                },
                IndexRow {
                    schema: "public".to_string(),
                    name: "events_2026_at_idx".to_string(),
                    definition: "CREATE INDEX events_2026_at_idx ON public.events_2026 USING btree (at)".to_string(),
                },
            ],
        };
        let live = introspect(&rows, Dialect::Postgres).await.unwrap();
        let keys: Vec<String> = live.model.iter().map(|o| o.key().to_string()).collect();
        assert_eq!(keys, vec!["Table: events", "Index: events_at_idx"]);
        assert!(live.model.warnings().is_empty());

        let ddl = "CREATE TABLE events (id bigint NOT NULL, at timestamptz NOT NULL) PARTITION BY RANGE (at);\n\
                   CREATE INDEX events_at_idx ON events (at);";
        let parsed = crate::normalize::normalize(
            Dialect::Postgres,
            &[crate::source::SqlSource::new("schema.sql", ddl)],
        );
        let plan = crate::diff::diff(&live.model, &parsed);
        assert!(plan.is_empty(), "unexpected plan:\n{}", plan);
    }

    #[test]
    fn test_qualify_drops_default_schema() {
        assert_eq!(qualify(Dialect::Postgres, "public", "t"), QualifiedName::unqualified("t"));
        assert_eq!(
            qualify(Dialect::Postgres, "app", "t"),
            QualifiedName::new(Some("app".to_string()), "t")
        );
    }
}
