//! Dialect-aware DDL parsing.
//!
//! Every dialect shares one common grammar (tables, indexes, views, triggers,
//! routines, aliases) and plugs its own clauses in through [`DialectGrammar`].
//! Statements that are DDL but not understood degrade to
//! [`DatabaseObject::Raw`]; statements that are not DDL are skipped.

mod cursor;
mod db2;
mod mysql;
mod objects;
mod postgres;
mod sqlite;
mod table;
mod types;

use crate::dialect::Dialect;
use crate::model::{
    Column, Constraint, DatabaseObject, Index, IndexKind, QualifiedName, RawUnparsed, RoutineKind,
    Table,
};

use cursor::Cursor;

pub(crate) use cursor::{canonical_expr, canonical_sql};
pub(crate) use table::{
    enforce_primary_key_nullability, normalize_default, parse_constraint_text, parse_partition_text,
};
pub(crate) use types::parse_type_text;

/// Outcome of parsing one statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
    Object(DatabaseObject),
    /// `ALTER TABLE t ADD ...` that can be folded into `t` when `t` is known.
    TableChange {
        table: QualifiedName,
        changes: Vec<TableChange>,
        fallback: RawUnparsed,
    },
}

impl Parsed {
    pub fn into_object(self) -> DatabaseObject {
        match self {
            Parsed::Object(object) => object,
            Parsed::TableChange { fallback, .. } => DatabaseObject::Raw(fallback),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TableChange {
    AddColumn(Column),
    AddConstraint(Constraint),
}

/// Hooks a dialect uses to extend the common grammar.
///
/// Each hook is handed the cursor at a clause boundary and returns `true` when
/// it consumed a clause it recognizes.
pub(crate) trait DialectGrammar: Sync {
    /// Clauses between `CREATE [OR REPLACE]` and the object keyword.
    fn create_prefix(&self, _cur: &mut Cursor<'_>) -> bool {
        false
    }

    /// `CREATE` forms only this dialect has. Called after the prefix.
    fn create(&self, _cur: &mut Cursor<'_>) -> Option<DatabaseObject> {
        None
    }

    /// Table body elements other than columns and table constraints.
    fn table_element(&self, _cur: &mut Cursor<'_>, _table: &mut Table) -> bool {
        false
    }

    /// Clauses following the table body.
    fn table_clause(&self, _cur: &mut Cursor<'_>, _table: &mut Table) -> bool {
        false
    }

    fn column_clause(&self, _cur: &mut Cursor<'_>, _column: &mut Column) -> bool {
        false
    }

    fn index_clause(&self, _cur: &mut Cursor<'_>, _index: &mut Index) -> bool {
        false
    }
}

fn grammar_for(dialect: Dialect) -> &'static dyn DialectGrammar {
    match dialect {
        Dialect::Postgres => &postgres::PostgresGrammar,
        Dialect::MySql => &mysql::MySqlGrammar,
        Dialect::Sqlite => &sqlite::SqliteGrammar,
        Dialect::Db2 => &db2::Db2Grammar,
    }
}

impl Dialect {
    /// Parse one statement into a database object.
    ///
    /// Returns `None` for statements that define nothing (`SELECT`, `INSERT`,
    /// `SET`, `GRANT`, ...). DDL that is not understood comes back as
    /// [`DatabaseObject::Raw`].
    pub fn parse(&self, statement: &str) -> Option<DatabaseObject> {
        parse_statement(*self, statement).map(Parsed::into_object)
    }
}

pub(crate) fn parse_statement(dialect: Dialect, text: &str) -> Option<Parsed> {
    let grammar = grammar_for(dialect);
    let mut cur = Cursor::new(text, dialect);
    let verb = cur.peek_upper()?;
    match verb.as_str() {
        "CREATE" => {
            cur.advance();
            let object = match parse_create(&mut cur, grammar) {
                Some(object) => object,
                None => {
                    log::debug!("Keeping CREATE statement as raw SQL; dialect={}", dialect);
                    DatabaseObject::Raw(raw_unparsed(dialect, text))
                }
            };
            Some(Parsed::Object(object))
        }
        "ALTER" => {
            cur.advance();
            let fallback = raw_unparsed(dialect, text);
            match parse_alter_table(&mut cur, grammar) {
                Some((table, changes)) => Some(Parsed::TableChange {
                    table,
                    changes,
                    fallback,
                }),
                None => Some(Parsed::Object(DatabaseObject::Raw(fallback))),
            }
        }
        "DROP" | "RENAME" => Some(Parsed::Object(DatabaseObject::Raw(raw_unparsed(
            dialect, text,
        )))),
        _ => None,
    }
}

fn parse_create(cur: &mut Cursor<'_>, grammar: &dyn DialectGrammar) -> Option<DatabaseObject> {
    cur.eat_keywords(&["OR", "REPLACE"]);
    while grammar.create_prefix(cur) {}

    let mut attempt = cur.clone();
    if let Some(object) = grammar.create(&mut attempt) {
        return Some(object);
    }

    let mut unique = false;
    let mut index_kind = IndexKind::Default;
    let mut materialized = false;
    while let Some(word) = cur.peek_upper() {
        match word.as_str() {
            "TEMP" | "TEMPORARY" | "UNLOGGED" | "GLOBAL" | "LOCAL" | "PUBLIC" | "RECURSIVE"
            | "CONSTRAINT" => {}
            "UNIQUE" => unique = true,
            "FULLTEXT" => index_kind = IndexKind::Fulltext,
            "SPATIAL" => index_kind = IndexKind::Spatial,
            "MATERIALIZED" => materialized = true,
            _ => break,
        }
        cur.advance();
    }

    let keyword = cur.eat_one_of(&[
        "TABLE",
        "INDEX",
        "VIEW",
        "TRIGGER",
        "PROCEDURE",
        "FUNCTION",
        "ALIAS",
        "SYNONYM",
    ])?;
    match keyword.as_str() {
        "TABLE" => table::parse_create_table(cur, grammar).map(DatabaseObject::Table),
        "INDEX" => objects::parse_index(cur, unique, index_kind, grammar).map(DatabaseObject::Index),
        "VIEW" => objects::parse_view(cur, materialized).map(DatabaseObject::View),
        "TRIGGER" => objects::parse_trigger(cur).map(DatabaseObject::Trigger),
        "PROCEDURE" => {
            objects::parse_routine(cur, RoutineKind::Procedure).map(DatabaseObject::Procedure)
        }
        "FUNCTION" => {
            objects::parse_routine(cur, RoutineKind::Function).map(DatabaseObject::Procedure)
        }
        _ => objects::parse_alias(cur).map(DatabaseObject::Alias),
    }
}

/// `ALTER TABLE t ADD ...[, ADD ...]` where every action adds a column or a
/// table constraint.
fn parse_alter_table(
    cur: &mut Cursor<'_>,
    grammar: &dyn DialectGrammar,
) -> Option<(QualifiedName, Vec<TableChange>)> {
    if !cur.eat_keyword("TABLE") {
        return None;
    }
    cur.eat_keywords(&["IF", "EXISTS"]);
    cur.eat_keyword("ONLY");
    let table = cur.qualified_name()?;

    let mut changes = Vec::new();
    for mut action in cur.split_commas() {
        if !action.eat_keyword("ADD") {
            return None;
        }
        if table::starts_table_constraint(&action) {
            changes.push(TableChange::AddConstraint(table::parse_table_constraint(
                &mut action,
            )?));
            continue;
        }
        if action.peek_upper().is_some_and(|w| {
            matches!(w.as_str(), "KEY" | "INDEX" | "FULLTEXT" | "SPATIAL" | "PERIOD" | "PARTITION")
        }) {
            return None;
        }
        action.eat_keyword("COLUMN");
        action.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let (column, lifted) = table::parse_column(&mut action, 0, grammar)?;
        changes.push(TableChange::AddColumn(column));
        changes.extend(lifted.into_iter().map(TableChange::AddConstraint));
    }
    if changes.is_empty() {
        return None;
    }
    Some((table, changes))
}

/// Words that may sit between `CREATE` and the object type.
const CREATE_MODIFIERS: &[&str] = &[
    "OR",
    "REPLACE",
    "TEMP",
    "TEMPORARY",
    "UNLOGGED",
    "GLOBAL",
    "LOCAL",
    "PUBLIC",
    "UNIQUE",
    "FULLTEXT",
    "SPATIAL",
    "MATERIALIZED",
    "RECURSIVE",
    "VIRTUAL",
    "AUX",
    "AUXILIARY",
    "LOB",
    "TRUSTED",
    "PROCEDURAL",
    "DEFAULT",
];

/// Build the placeholder for a statement no parser modeled.
pub(crate) fn raw_unparsed(dialect: Dialect, text: &str) -> RawUnparsed {
    let canonical = canonical_sql(text, dialect);
    let mut cur = Cursor::new(text, dialect);
    let verb = cur.peek_upper().unwrap_or_default();
    let label = if verb == "CREATE" {
        cur.advance();
        create_label(&mut cur).unwrap_or_else(|| canonical.clone())
    } else {
        canonical.clone()
    };
    RawUnparsed {
        label: QualifiedName::unqualified(label),
        verb,
        text: canonical,
    }
}

/// `SEQUENCE app.order_seq` for `CREATE [modifiers] SEQUENCE [IF NOT EXISTS] app.order_seq ...`.
fn create_label(cur: &mut Cursor<'_>) -> Option<String> {
    while cur
        .peek_upper()
        .is_some_and(|w| CREATE_MODIFIERS.contains(&w.as_str()))
    {
        cur.advance();
    }
    let mut object_type = cur.peek_upper()?;
    cur.advance();
    if matches!(object_type.as_str(), "FOREIGN" | "EVENT" | "TEXT" | "ACCESS") {
        if let Some(next) = cur.peek_upper() {
            cur.advance();
            object_type = format!("{} {}", object_type, next);
        }
    }
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = cur.qualified_name()?;
    Some(format!("{} {}", object_type, name))
}
