//! `CREATE TABLE`: columns, constraints and trailing options.

use std::collections::BTreeMap;

use crate::dialect::Dialect;
use crate::model::{
    Column, Constraint, ConstraintKind, DataType, ForeignKeyRef, Generation, PartitionSpec, Table,
    TypeToken,
};

use super::cursor::{canonical_expr, canonical_sql, Cursor, TokenKind};
use super::types::parse_data_type;
use super::DialectGrammar;

/// Words that end a `DEFAULT` expression or other column clause.
pub(crate) const COLUMN_CLAUSE_WORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "CONSTRAINT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "GENERATED",
    "AS",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "IDENTITY",
    "COLLATE",
    "COMMENT",
    "ON",
    "WITH",
    "IMPLICITLY",
    "CHARACTER",
    "CHARSET",
    "INLINE",
    "VISIBLE",
    "INVISIBLE",
    "STORED",
    "VIRTUAL",
];

/// Words that can open a column clause directly after the column name, which
/// means the column has no declared type.
const TYPELESS_MARKERS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "CONSTRAINT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "GENERATED",
    "AS",
    "COLLATE",
];

pub(crate) fn parse_create_table(cur: &mut Cursor<'_>, grammar: &dyn DialectGrammar) -> Option<Table> {
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = cur.qualified_name()?;
    let body = cur.group()?;
    let mut table = Table::new(name);

    for mut element in body.split_commas() {
        if element.at_end() {
            continue;
        }
        if element.peek_keyword("LIKE") {
            return None;
        }
        if grammar.table_element(&mut element, &mut table) {
            continue;
        }
        if element.eat_keywords(&["PERIOD", "FOR", "SYSTEM_TIME"]) {
            let columns = column_list(&mut element);
            if let [start, end] = columns.as_slice() {
                table.versioning.system_time = Some((start.clone(), end.clone()));
            }
            continue;
        }
        if starts_table_constraint(&element) {
            if element.peek_keyword("EXCLUDE") {
                table.options.insert(
                    "EXCLUDE".to_string(),
                    canonical_sql(element.rest_text(), element.dialect),
                );
                continue;
            }
            match parse_table_constraint(&mut element) {
                Some(constraint) => table.constraints.push(constraint),
                None => return None,
            }
            continue;
        }
        let ordinal = table.columns.len() + 1;
        let (column, lifted) = parse_column(&mut element, ordinal, grammar)?;
        table.columns.push(column);
        table.constraints.extend(lifted);
    }
    enforce_primary_key_nullability(&mut table);

    while !cur.at_end() {
        if cur.eat_symbol(",") {
            continue;
        }
        if grammar.table_clause(cur, &mut table) {
            continue;
        }
        generic_option(cur, &mut table.options);
    }
    Some(table)
}

/// Primary-key columns are never nullable.
pub(crate) fn enforce_primary_key_nullability(table: &mut Table) {
    let key_columns: Vec<String> = table
        .constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::PrimaryKey)
        .flat_map(|c| c.columns.iter())
        .filter_map(|c| c.split_whitespace().next().map(|s| s.to_string()))
        .collect();
    for column in &mut table.columns {
        if key_columns.contains(&column.name) {
            column.nullable = false;
        }
    }
}

pub(crate) fn starts_table_constraint(cur: &Cursor<'_>) -> bool {
    cur.peek_keyword("CONSTRAINT")
        || cur.peek_keywords(&["PRIMARY", "KEY"])
        || cur.peek_keywords(&["FOREIGN", "KEY"])
        || cur.peek_keyword("CHECK")
        || cur.peek_keyword("EXCLUDE")
        || (cur.peek_keyword("UNIQUE")
            && (cur.peek_at(1).is_some_and(|t| cur.slice(t) == "(")
                || cur.word_at(1).is_some_and(|w| {
                    w.eq_ignore_ascii_case("KEY") || w.eq_ignore_ascii_case("INDEX")
                })))
}

/// Parse an out-of-line constraint (`[CONSTRAINT n] PRIMARY KEY (...)`, ...).
pub(crate) fn parse_table_constraint(cur: &mut Cursor<'_>) -> Option<Constraint> {
    let mut name = None;
    if cur.eat_keyword("CONSTRAINT")
        && !["PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]
            .iter()
            .any(|kw| cur.peek_keyword(kw))
    {
        name = cur.ident();
    }

    let (kind, columns) = if cur.eat_keywords(&["PRIMARY", "KEY"]) {
        skip_index_method(cur);
        (ConstraintKind::PrimaryKey, column_list(cur))
    } else if cur.eat_keyword("UNIQUE") {
        cur.eat_one_of(&["KEY", "INDEX"]);
        if !cur.peek_symbol("(") && !cur.peek_keyword("USING") {
            let index_name = cur.ident();
            if name.is_none() {
                name = index_name;
            }
        }
        skip_index_method(cur);
        (ConstraintKind::Unique, column_list(cur))
    } else if cur.eat_keywords(&["FOREIGN", "KEY"]) {
        if !cur.peek_symbol("(") {
            let index_name = cur.ident();
            if name.is_none() {
                name = index_name;
            }
        }
        let columns = column_list(cur);
        let reference = parse_references(cur)?;
        (ConstraintKind::ForeignKey(reference), columns)
    } else if cur.eat_keyword("CHECK") {
        let expr = cur.group_text()?;
        (ConstraintKind::Check(canonical_expr(expr, cur.dialect)), Vec::new())
    } else {
        return None;
    };

    skip_index_method(cur);
    let modifiers = remaining_modifiers(cur);
    Some(Constraint {
        name,
        kind,
        columns,
        modifiers,
    })
}

/// Parse constraint text as rendered by a catalog (`pg_get_constraintdef`).
pub(crate) fn parse_constraint_text(
    text: &str,
    dialect: Dialect,
    name: Option<String>,
) -> Option<Constraint> {
    let mut cur = Cursor::new(text, dialect);
    let mut constraint = parse_table_constraint(&mut cur)?;
    if constraint.name.is_none() {
        constraint.name = name;
    }
    Some(constraint)
}

fn skip_index_method(cur: &mut Cursor<'_>) {
    if cur.peek_keyword("USING") && cur.word_at(1).is_some_and(|w| {
        w.eq_ignore_ascii_case("BTREE") || w.eq_ignore_ascii_case("HASH")
    }) {
        cur.advance();
        cur.advance();
    }
}

fn remaining_modifiers(cur: &mut Cursor<'_>) -> Vec<String> {
    let rest = cur.take_rest();
    if rest.is_empty() {
        Vec::new()
    } else {
        vec![canonical_sql(rest, cur.dialect).to_uppercase()]
    }
}

/// `REFERENCES t [(cols)] [ON DELETE a] [ON UPDATE a] [MATCH m]`.
fn parse_references(cur: &mut Cursor<'_>) -> Option<ForeignKeyRef> {
    if !cur.eat_keyword("REFERENCES") {
        return None;
    }
    let table = cur.qualified_name()?;
    let columns = if cur.peek_symbol("(") {
        column_list(cur)
    } else {
        Vec::new()
    };
    let mut on_delete = None;
    let mut on_update = None;
    loop {
        if cur.eat_keywords(&["ON", "DELETE"]) {
            on_delete = referential_action(cur);
        } else if cur.eat_keywords(&["ON", "UPDATE"]) {
            on_update = referential_action(cur);
        } else if cur.eat_keyword("MATCH") {
            cur.advance();
        } else {
            break;
        }
    }
    Some(ForeignKeyRef {
        table,
        columns,
        on_delete,
        on_update,
    })
}

/// `NO ACTION` is the default and normalizes to `None`.
fn referential_action(cur: &mut Cursor<'_>) -> Option<String> {
    if cur.eat_keywords(&["NO", "ACTION"]) {
        return None;
    }
    if cur.eat_keywords(&["SET", "NULL"]) {
        return Some("SET NULL".to_string());
    }
    if cur.eat_keywords(&["SET", "DEFAULT"]) {
        return Some("SET DEFAULT".to_string());
    }
    cur.eat_one_of(&["CASCADE", "RESTRICT"])
}

/// Parenthesized key column list. Plain columns are identifier-normalized
/// (`id`, `created_at DESC`); expressions are canonicalized.
pub(crate) fn column_list(cur: &mut Cursor<'_>) -> Vec<String> {
    let Some(group) = cur.group() else {
        return Vec::new();
    };
    group.split_commas().into_iter().map(key_column).collect()
}

fn key_column(mut item: Cursor<'_>) -> String {
    let fallback = item.clone();
    if item
        .peek_at(0)
        .is_some_and(|t| matches!(t.kind, TokenKind::Word | TokenKind::Quoted))
    {
        if let Some(mut column) = item.ident() {
            if let Some(prefix) = item.group_text() {
                column = format!("{}({})", column, canonical_sql(prefix, item.dialect));
            }
            if item.eat_keyword("DESC") {
                column.push_str(" DESC");
            } else {
                item.eat_keyword("ASC");
            }
            if item.at_end() {
                return column;
            }
        }
    }
    let text = canonical_sql(fallback.rest_text(), fallback.dialect);
    text.strip_suffix(" asc").map(str::to_string).unwrap_or(text)
}

/// Parse one column definition. Inline constraints are returned separately so
/// they compare equal to their out-of-line spelling.
pub(crate) fn parse_column(
    cur: &mut Cursor<'_>,
    ordinal: usize,
    grammar: &dyn DialectGrammar,
) -> Option<(Column, Vec<Constraint>)> {
    let name = cur.ident()?;
    let typeless = cur.at_end()
        || TYPELESS_MARKERS
            .iter()
            .any(|w| cur.peek_keyword(w))
        || cur.peek_at(0).is_some_and(|t| t.kind == TokenKind::Symbol);
    let (data_type, serial) = if typeless {
        (
            DataType {
                token: TypeToken::Other(String::new()),
                params: Vec::new(),
                raw: String::new(),
            },
            false,
        )
    } else {
        let parsed = parse_data_type(cur)?;
        (parsed.data_type, parsed.serial)
    };

    let mut column = Column {
        name: name.clone(),
        data_type,
        nullable: true,
        default: None,
        generation: if serial {
            Generation::Identity
        } else {
            Generation::None
        },
        ordinal,
        attributes: Vec::new(),
    };
    let mut lifted = Vec::new();
    let mut pending_name: Option<String> = None;

    while !cur.at_end() {
        if grammar.column_clause(cur, &mut column) {
            continue;
        }
        let Some(word) = cur.peek_upper() else {
            cur.advance();
            continue;
        };
        match word.as_str() {
            "NOT" if cur.peek_keywords(&["NOT", "NULL"]) => {
                cur.advance();
                cur.advance();
                column.nullable = false;
            }
            "NULL" => {
                cur.advance();
                column.nullable = true;
            }
            "DEFAULT" => {
                cur.advance();
                let expr = cur.take_until(COLUMN_CLAUSE_WORDS);
                let (default, identity) = normalize_default(expr, cur.dialect);
                column.default = default;
                if identity {
                    column.generation = Generation::Identity;
                }
            }
            "CONSTRAINT" => {
                cur.advance();
                pending_name = cur.ident();
            }
            "PRIMARY" if cur.peek_keywords(&["PRIMARY", "KEY"]) => {
                cur.advance();
                cur.advance();
                cur.eat_one_of(&["ASC", "DESC"]);
                column.nullable = false;
                lifted.push(inline_constraint(
                    pending_name.take(),
                    ConstraintKind::PrimaryKey,
                    &name,
                ));
            }
            "UNIQUE" => {
                cur.advance();
                cur.eat_keyword("KEY");
                lifted.push(inline_constraint(pending_name.take(), ConstraintKind::Unique, &name));
            }
            "REFERENCES" => {
                let reference = parse_references(cur)?;
                lifted.push(inline_constraint(
                    pending_name.take(),
                    ConstraintKind::ForeignKey(reference),
                    &name,
                ));
            }
            "CHECK" => {
                cur.advance();
                let expr = cur.group_text().unwrap_or_default();
                let mut check = inline_constraint(
                    pending_name.take(),
                    ConstraintKind::Check(canonical_expr(expr, cur.dialect)),
                    &name,
                );
                check.columns.clear();
                lifted.push(check);
            }
            "GENERATED" => parse_generated(cur, &mut column),
            "AS" => {
                cur.advance();
                let expr = cur.group_text().unwrap_or_default();
                column.generation = Generation::Computed(canonical_expr(expr, cur.dialect));
                cur.eat_one_of(&["STORED", "VIRTUAL", "PERSISTENT"]);
            }
            "AUTO_INCREMENT" | "AUTOINCREMENT" | "IDENTITY" => {
                cur.advance();
                cur.group();
                column.generation = Generation::Identity;
            }
            "COLLATE" => {
                cur.advance();
                let value = cur.take_value().unwrap_or_default();
                column
                    .attributes
                    .push(format!("COLLATE {}", canonical_sql(value, cur.dialect)));
            }
            "COMMENT" => {
                cur.advance();
                let value = cur.take_value().unwrap_or_default();
                column.attributes.push(format!("COMMENT {}", value));
            }
            "CHARACTER" | "CHARSET" => {
                cur.advance();
                cur.eat_keyword("SET");
                let value = cur.take_value().unwrap_or_default();
                column
                    .attributes
                    .push(format!("CHARACTER SET {}", canonical_sql(value, cur.dialect)));
            }
            "ON" if cur.peek_keywords(&["ON", "UPDATE"]) => {
                cur.advance();
                cur.advance();
                let expr = cur.take_until(COLUMN_CLAUSE_WORDS);
                column
                    .attributes
                    .push(format!("ON UPDATE {}", canonical_expr(expr, cur.dialect)));
            }
            other => {
                cur.advance();
                let mut attribute = other.to_string();
                if let Some(args) = cur.group_text() {
                    attribute = format!("{}({})", attribute, canonical_sql(args, cur.dialect));
                }
                column.attributes.push(attribute);
            }
        }
    }
    // serial and identity columns are implicitly NOT NULL
    if cur.dialect == Dialect::Postgres && column.generation == Generation::Identity {
        column.nullable = false;
    }
    Some((column, lifted))
}

fn inline_constraint(name: Option<String>, kind: ConstraintKind, column: &str) -> Constraint {
    Constraint {
        name,
        kind,
        columns: vec![column.to_string()],
        modifiers: Vec::new(),
    }
}

/// `GENERATED {ALWAYS | BY DEFAULT} AS ...`
fn parse_generated(cur: &mut Cursor<'_>, column: &mut Column) {
    cur.advance();
    if !cur.eat_keyword("ALWAYS") {
        cur.eat_keywords(&["BY", "DEFAULT"]);
    }
    if cur.eat_keywords(&["AS", "IDENTITY"]) {
        cur.group();
        column.generation = Generation::Identity;
    } else if cur.eat_keywords(&["AS", "ROW", "BEGIN"]) || cur.eat_keywords(&["AS", "ROW", "START"]) {
        column.generation = Generation::RowStart;
    } else if cur.eat_keywords(&["AS", "ROW", "END"]) {
        column.generation = Generation::RowEnd;
    } else if cur.eat_keywords(&["AS", "TRANSACTION", "START", "ID"]) {
        column.generation = Generation::TransactionId;
    } else if cur.eat_keyword("AS") {
        let expr = cur.group_text().unwrap_or_default();
        column.generation = Generation::Computed(canonical_expr(expr, cur.dialect));
        cur.eat_one_of(&["STORED", "VIRTUAL"]);
    } else if cur.eat_keywords(&["FOR", "EACH", "ROW", "ON", "UPDATE", "AS", "ROW", "CHANGE", "TIMESTAMP"]) {
        column.attributes.push("ROW CHANGE TIMESTAMP".to_string());
    } else {
        column.attributes.push("GENERATED".to_string());
    }
}

/// Normalize a default expression. Returns the default and whether it is a
/// sequence-backed identity (`nextval(...)`). `NULL` means no default.
pub(crate) fn normalize_default(expr: &str, dialect: Dialect) -> (Option<String>, bool) {
    let canonical = canonical_expr(expr, dialect);
    if canonical.is_empty() || canonical == "null" {
        return (None, false);
    }
    if canonical.starts_with("nextval(") {
        return (None, true);
    }
    (Some(canonical), false)
}

/// Fallback for unmodeled trailing clauses: `KEY [=] value` or a lone flag
/// word, recorded in the option bag.
pub(crate) fn generic_option(cur: &mut Cursor<'_>, options: &mut BTreeMap<String, String>) {
    let Some(key) = cur.word_at(0).map(str::to_uppercase) else {
        if cur.peek_symbol("(") {
            if let Some(group) = cur.take_value() {
                options.insert(option_value(group, cur.dialect), String::new());
            }
        } else {
            cur.advance();
        }
        return;
    };
    cur.advance();
    let takes_value = cur.eat_symbol("=")
        || cur.peek_symbol("(")
        || cur
            .peek_at(0)
            .is_some_and(|t| matches!(t.kind, TokenKind::Str | TokenKind::Number))
        || (WORD_VALUED_OPTIONS.contains(&key.as_str()) && cur.word_at(0).is_some());
    let value = if takes_value {
        cur.take_value().map(|v| option_value(v, cur.dialect))
    } else {
        None
    };
    options.insert(key, value.unwrap_or_default());
}

/// Trailing options whose value is a bare word (`BUFFERPOOL BP2`, `CLOSE NO`).
/// Any other bare word after an option name is an option of its own.
const WORD_VALUED_OPTIONS: &[&str] = &[
    "BUFFERPOOL",
    "CLOSE",
    "COMPRESS",
    "GBPCACHE",
    "LOCKSIZE",
    "LOCKMAX",
    "MAXROWS",
    "DEFINE",
    "EDITPROC",
    "VALIDPROC",
    "VOLATILE",
    "APPEND",
    "TRACKMOD",
];

/// Option values: string literals verbatim, everything else upper-cased.
pub(crate) fn option_value(text: &str, dialect: Dialect) -> String {
    let canonical = canonical_sql(text, dialect);
    if canonical.starts_with('\'') {
        canonical
    } else {
        canonical.to_uppercase()
    }
}

/// Partition key as rendered by a catalog (`pg_get_partkeydef`: `RANGE (created_at)`).
pub(crate) fn parse_partition_text(text: &str, dialect: Dialect) -> Option<PartitionSpec> {
    parse_partition(&mut Cursor::new(text, dialect))
}

/// `[method] (key) [PARTITIONS n] [(partition, ...)]`, after `PARTITION BY`.
pub(crate) fn parse_partition(cur: &mut Cursor<'_>) -> Option<PartitionSpec> {
    let mut method: Vec<String> = Vec::new();
    while let Some(word) = cur.word_at(0) {
        method.push(word.to_uppercase());
        cur.advance();
    }
    let key = cur.group_text()?;
    let mut spec = PartitionSpec {
        method: if method.is_empty() {
            "RANGE".to_string()
        } else {
            method.join(" ")
        },
        key: canonical_sql(key, cur.dialect),
        partitions: Vec::new(),
    };
    if cur.eat_keyword("PARTITIONS") {
        if let Some(count) = cur.advance() {
            spec.partitions.push(format!("PARTITIONS {}", cur.slice(count)));
        }
    }
    if cur.peek_symbol("(") {
        if let Some(group) = cur.group() {
            spec.partitions.extend(
                group
                    .split_commas()
                    .iter()
                    .map(|p| canonical_sql(p.rest_text(), cur.dialect)),
            );
        }
    }
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DatabaseObject, QualifiedName};

    fn table(dialect: Dialect, sql: &str) -> Table {
        match dialect.parse(sql) {
            Some(DatabaseObject::Table(t)) => t,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_columns_and_ordinals() {
        let t = table(
            Dialect::Postgres,
            "CREATE TABLE users (id INT NOT NULL, email VARCHAR(255) DEFAULT 'x', bio TEXT)",
        );
        assert_eq!(t.name, QualifiedName::unqualified("users"));
        assert_eq!(t.columns.len(), 3);
        assert_eq!(t.columns[1].name, "email");
        assert_eq!(t.columns[1].ordinal, 2);
        assert_eq!(t.columns[1].default.as_deref(), Some("'x'"));
        assert!(!t.columns[0].nullable);
        assert!(t.columns[2].nullable);
    }

    #[test]
    fn test_inline_and_out_of_line_constraints_match() {
        let inline = table(
            Dialect::Postgres,
            "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users(id) ON DELETE CASCADE)",
        );
        let out_of_line = table(
            Dialect::Postgres,
            "CREATE TABLE orders (id INT, user_id INT, PRIMARY KEY (id), FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE)",
        );
        assert_eq!(inline.columns, out_of_line.columns);
        assert_eq!(inline.constraints.len(), 2);
        for (a, b) in inline.constraints.iter().zip(out_of_line.constraints.iter()) {
            assert!(a.equivalent(b), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_primary_key_columns_not_null() {
        let t = table(Dialect::Sqlite, "CREATE TABLE t (a INTEGER, b TEXT, PRIMARY KEY (a))");
        assert!(!t.columns[0].nullable);
        assert!(t.columns[1].nullable);
    }

    #[test]
    fn test_serial_and_nextval_are_identity() {
        let t = table(
            Dialect::Postgres,
            "CREATE TABLE t (a SERIAL, b integer DEFAULT nextval('t_b_seq'::regclass) NOT NULL)",
        );
        assert_eq!(t.columns[0].generation, Generation::Identity);
        assert_eq!(t.columns[1].generation, Generation::Identity);
        assert_eq!(t.columns[0].data_type, t.columns[1].data_type);
        assert_eq!(t.columns[1].default, None);
        assert!(!t.columns[0].nullable);
    }

    #[test]
    fn test_default_normalization() {
        let t = table(
            Dialect::Postgres,
            "CREATE TABLE t (a varchar(10) DEFAULT 'active'::character varying, b timestamp DEFAULT (NOW()), c int DEFAULT NULL)",
        );
        assert_eq!(t.columns[0].default.as_deref(), Some("'active'"));
        assert_eq!(t.columns[1].default.as_deref(), Some("now()"));
        assert_eq!(t.columns[2].default, None);
    }

    #[test]
    fn test_check_constraint_expression() {
        let t = table(
            Dialect::Postgres,
            "CREATE TABLE p (price NUMERIC CONSTRAINT positive CHECK (price > 0))",
        );
        let check = &t.constraints[0];
        assert_eq!(check.name.as_deref(), Some("positive"));
        assert_eq!(check.kind, ConstraintKind::Check("price > 0".to_string()));
    }

    #[test]
    fn test_constraint_text_from_catalog() {
        let c = parse_constraint_text(
            "CHECK ((price > (0)::numeric))",
            Dialect::Postgres,
            Some("positive".to_string()),
        )
        .unwrap();
        assert_eq!(c.kind, ConstraintKind::Check("price > 0".to_string()));
        assert_eq!(c.name.as_deref(), Some("positive"));

        let fk = parse_constraint_text(
            "FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE",
            Dialect::Postgres,
            None,
        )
        .unwrap();
        match fk.kind {
            ConstraintKind::ForeignKey(r) => {
                assert_eq!(r.table, QualifiedName::unqualified("users"));
                assert_eq!(r.on_delete.as_deref(), Some("CASCADE"));
            }
            other => panic!("expected foreign key, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_columns() {
        let t = table(
            Dialect::Db2,
            "CREATE TABLE T (ID INT GENERATED ALWAYS AS IDENTITY (START WITH 1), S TIMESTAMP(12) GENERATED ALWAYS AS ROW BEGIN NOT NULL, E TIMESTAMP(12) GENERATED ALWAYS AS ROW END NOT NULL, X TIMESTAMP(12) GENERATED ALWAYS AS TRANSACTION START ID, PERIOD FOR SYSTEM_TIME (S, E))",
        );
        let gens: Vec<Generation> = t.columns.iter().map(|c| c.generation.clone()).collect();
        assert_eq!(
            gens,
            vec![
                Generation::Identity,
                Generation::RowStart,
                Generation::RowEnd,
                Generation::TransactionId
            ]
        );
        assert_eq!(
            t.versioning.system_time,
            Some(("S".to_string(), "E".to_string()))
        );
    }

    #[test]
    fn test_like_degrades_to_raw() {
        assert!(matches!(
            Dialect::Postgres.parse("CREATE TABLE t2 (LIKE t1)"),
            Some(DatabaseObject::Raw(_))
        ));
    }

    #[test]
    fn test_unknown_trailing_clause_goes_to_options() {
        let t = table(Dialect::Sqlite, "CREATE TABLE t (a int) ROW_FORMAT = dynamic, COMPRESSED");
        assert_eq!(t.options.get("ROW_FORMAT").map(String::as_str), Some("DYNAMIC"));
        assert_eq!(t.options.get("COMPRESSED").map(String::as_str), Some(""));
    }

    #[test]
    fn test_bare_words_after_a_flag_are_separate_flags() {
        let t = table(Dialect::Db2, "CREATE TABLE T (A INT) NOT LOGGED INITIALLY FILLFACTOR 70 COMPRESS YES");
        assert_eq!(t.options.get("NOT").map(String::as_str), Some(""));
        assert_eq!(t.options.get("LOGGED").map(String::as_str), Some(""));
        assert_eq!(t.options.get("INITIALLY").map(String::as_str), Some(""));
        assert_eq!(t.options.get("FILLFACTOR").map(String::as_str), Some("70"));
        assert_eq!(t.options.get("COMPRESS").map(String::as_str), Some("YES"));
    }
}
