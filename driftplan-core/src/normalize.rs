//! Schema normalizer: many SQL sources in, one schema model out.
//!
//! Sources are tokenized and parsed independently (in parallel once there are
//! enough of them), then merged strictly in source order so the result does
//! not depend on scheduling.

use rayon::prelude::*;

use crate::dialect::Dialect;
use crate::error::TokenizeError;
use crate::model::{DatabaseObject, ObjectKey, ObjectKind, SchemaModel};
use crate::parser::{self, enforce_primary_key_nullability, Parsed, TableChange};
use crate::source::SqlSource;
use crate::tokenizer::tokenize;

/// Minimum number of sources before parsing fans out across threads.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// What one statement of a source turned into.
enum Outcome {
    Parsed { location: String, parsed: Parsed },
    Failed { location: String, error: TokenizeError },
}

/// Build a schema model from `sources`.
pub fn normalize(dialect: Dialect, sources: &[SqlSource]) -> SchemaModel {
    normalize_with(dialect, sources, DEFAULT_PARALLEL_THRESHOLD)
}

/// [`normalize`] with an explicit fan-out threshold.
pub fn normalize_with(dialect: Dialect, sources: &[SqlSource], parallel_threshold: usize) -> SchemaModel {
    let per_source: Vec<Vec<Outcome>> = if sources.len() >= parallel_threshold.max(1) {
        sources
            .par_iter()
            .map(|source| parse_source(dialect, source))
            .collect()
    } else {
        sources.iter().map(|source| parse_source(dialect, source)).collect()
    };

    let mut model = SchemaModel::new();
    // ALTER TABLE folds wait until every CREATE is known, so file order never matters
    let mut table_changes = Vec::new();
    for outcome in per_source.into_iter().flatten() {
        match outcome {
            Outcome::Parsed {
                location,
                parsed: Parsed::Object(object),
            } => insert(&mut model, &location, object),
            Outcome::Parsed { location, parsed } => table_changes.push((location, parsed)),
            Outcome::Failed { location, error } => {
                log::warn!(
                    "Keeping unsplittable SQL as raw text; location={}, reason={}, snippet={}",
                    location,
                    error.reason,
                    error.preview()
                );
                model.push_warning(&location, error.to_string());
                let raw = parser::raw_unparsed(dialect, &error.snippet);
                insert(&mut model, &location, DatabaseObject::Raw(raw));
            }
        }
    }
    for (location, parsed) in table_changes {
        merge(&mut model, dialect, &location, parsed);
    }

    log::info!(
        "Schema model built; dialect={}, sources={}, objects={}, warnings={}",
        dialect,
        sources.len(),
        model.len(),
        model.warnings().len()
    );
    model
}

fn parse_source(dialect: Dialect, source: &SqlSource) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    for item in tokenize(&source.sql, dialect) {
        match item {
            Ok(statement) => {
                let location = format!("{}:{}", source.label, statement.line);
                if let Some(parsed) = parser::parse_statement(dialect, &statement.text) {
                    outcomes.push(Outcome::Parsed { location, parsed });
                }
            }
            Err(error) => outcomes.push(Outcome::Failed {
                location: format!("{}:{}", source.label, error.line),
                error,
            }),
        }
    }
    outcomes
}

fn merge(model: &mut SchemaModel, dialect: Dialect, location: &str, parsed: Parsed) {
    match parsed {
        Parsed::Object(object) => insert(model, location, object),
        Parsed::TableChange {
            table,
            changes,
            fallback,
        } => {
            let key = ObjectKey {
                kind: ObjectKind::Table,
                name: table,
            };
            match model.get_mut(&key) {
                Some(DatabaseObject::Table(target)) => {
                    for change in changes {
                        match change {
                            TableChange::AddColumn(mut column) => {
                                match target.columns.iter_mut().find(|c| c.name == column.name) {
                                    Some(existing) => {
                                        column.ordinal = existing.ordinal;
                                        *existing = column;
                                    }
                                    None => {
                                        column.ordinal = target.columns.len() + 1;
                                        target.columns.push(column);
                                    }
                                }
                            }
                            TableChange::AddConstraint(constraint) => {
                                if !target.constraints.iter().any(|c| c.equivalent(&constraint)) {
                                    target.constraints.push(constraint);
                                }
                            }
                        }
                    }
                    enforce_primary_key_nullability(target);
                    log::debug!("Folded ALTER TABLE into table; dialect={}, table={}", dialect, key.name);
                }
                _ => insert(model, location, DatabaseObject::Raw(fallback)),
            }
        }
    }
}

fn insert(model: &mut SchemaModel, location: &str, object: DatabaseObject) {
    let key = object.key();
    if model.insert(object).is_some() {
        log::warn!("Duplicate definition replaces earlier one; object={}, location={}", key, location);
        model.push_warning(location, format!("duplicate definition of {} replaces the earlier one", key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintKind, QualifiedName};

    fn table_key(name: &str) -> ObjectKey {
        ObjectKey {
            kind: ObjectKind::Table,
            name: QualifiedName::unqualified(name),
        }
    }

    #[test]
    fn test_sources_merge_in_order() {
        let sources = vec![
            SqlSource::new("a.sql", "CREATE TABLE a (id int);\nSELECT 1;"),
            SqlSource::new("b.sql", "CREATE TABLE b (id int); CREATE INDEX b_idx ON b (id);"),
        ];
        let model = normalize(Dialect::Postgres, &sources);
        let names: Vec<String> = model.iter().map(|o| o.key().to_string()).collect();
        assert_eq!(names, vec!["Table: a", "Table: b", "Index: b_idx"]);
        assert!(model.warnings().is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sources: Vec<SqlSource> = (0..12)
            .map(|i| SqlSource::new(format!("{}.sql", i), format!("CREATE TABLE t{} (id int);", i)))
            .collect();
        let sequential = normalize_with(Dialect::Postgres, &sources, usize::MAX);
        let parallel = normalize_with(Dialect::Postgres, &sources, 2);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 12);
    }

    #[test]
    fn test_duplicate_replaces_and_warns() {
        let sources = vec![
            SqlSource::new("one.sql", "CREATE TABLE t (a int); CREATE TABLE u (x int);"),
            SqlSource::new("two.sql", "CREATE TABLE t (a int, b int);"),
        ];
        let model = normalize(Dialect::Postgres, &sources);
        assert_eq!(model.len(), 2);
        assert_eq!(model.position(&table_key("t")), Some(0));
        match model.get(&table_key("t")) {
            Some(DatabaseObject::Table(t)) => assert_eq!(t.columns.len(), 2),
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(model.warnings().len(), 1);
        assert_eq!(model.warnings()[0].source, "two.sql:1");
        assert!(model.warnings()[0].message.contains("Table: t"));
    }

    #[test]
    fn test_alter_table_folds_into_known_table() {
        let sql = "CREATE TABLE users (id int);\n\
                   CREATE TABLE orders (id int, user_id int);\n\
                   ALTER TABLE ONLY public.users ADD CONSTRAINT users_pkey PRIMARY KEY (id);\n\
                   ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) REFERENCES users(id);\n\
                   ALTER TABLE missing ADD COLUMN x int;";
        let model = normalize(Dialect::Postgres, &[SqlSource::new("dump.sql", sql)]);
        match model.get(&table_key("users")) {
            Some(DatabaseObject::Table(t)) => {
                assert_eq!(t.constraints.len(), 1);
                assert_eq!(t.constraints[0].kind, ConstraintKind::PrimaryKey);
                assert!(!t.columns[0].nullable);
            }
            other => panic!("expected table, got {:?}", other),
        }
        match model.get(&table_key("orders")) {
            Some(DatabaseObject::Table(t)) => {
                assert_eq!(t.referenced_tables(), vec![QualifiedName::unqualified("users")]);
            }
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(model.len(), 3);
        assert!(model.iter().any(|o| o.kind() == ObjectKind::RawUnparsed));
    }

    #[test]
    fn test_alter_table_in_earlier_file_still_folds() {
        let split = vec![
            SqlSource::new(
                "constraints/fk.sql",
                "ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) REFERENCES users(id);",
            ),
            SqlSource::new(
                "tables/orders.sql",
                "CREATE TABLE users (id int PRIMARY KEY);\nCREATE TABLE orders (id int, user_id int);",
            ),
        ];
        let concatenated = vec![SqlSource::new(
            "all.sql",
            "CREATE TABLE users (id int PRIMARY KEY);\n\
             CREATE TABLE orders (id int, user_id int);\n\
             ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) REFERENCES users(id);",
        )];
        let from_dir = normalize(Dialect::Postgres, &split);
        assert_eq!(from_dir.len(), 2);
        assert!(!from_dir.iter().any(|o| o.kind() == ObjectKind::RawUnparsed));
        assert_eq!(from_dir, normalize(Dialect::Postgres, &concatenated));
    }

    #[test]
    fn test_tokenize_error_becomes_raw_and_warning() {
        let sql = "CREATE TABLE ok (id int);\nCREATE VIEW broken AS SELECT 'unterminated";
        let model = normalize(Dialect::Postgres, &[SqlSource::new("bad.sql", sql)]);
        assert_eq!(model.len(), 2);
        assert_eq!(model.warnings().len(), 1);
        assert_eq!(model.warnings()[0].source, "bad.sql:2");
        let raw = model.iter().nth(1).unwrap();
        assert_eq!(raw.kind(), ObjectKind::RawUnparsed);
        assert_eq!(raw.name().to_string(), "VIEW broken");
    }
}
