//! MySQL / MariaDB clauses: `DEFINER=` prefixes, inline `KEY` definitions and
//! trailing table options.

use crate::model::{Index, IndexKind, QualifiedName, Table};

use super::cursor::{Cursor, TokenKind};
use super::table::{column_list, option_value, parse_partition};
use super::DialectGrammar;

pub(crate) struct MySqlGrammar;

impl DialectGrammar for MySqlGrammar {
    fn create_prefix(&self, cur: &mut Cursor<'_>) -> bool {
        if cur.eat_keyword("DEFINER") {
            cur.eat_symbol("=");
            cur.take_value();
            if cur.peek_symbol("(") {
                cur.group();
            }
            while cur.eat_symbol("@") {
                cur.take_value();
            }
            true
        } else if cur.eat_keyword("ALGORITHM") {
            cur.eat_symbol("=");
            cur.advance();
            true
        } else if cur.eat_keywords(&["SQL", "SECURITY"]) {
            cur.advance();
            true
        } else {
            false
        }
    }

    fn table_element(&self, cur: &mut Cursor<'_>, table: &mut Table) -> bool {
        let kind = if cur.peek_keyword("FULLTEXT") {
            IndexKind::Fulltext
        } else if cur.peek_keyword("SPATIAL") {
            IndexKind::Spatial
        } else if is_inline_key(cur) {
            IndexKind::Default
        } else {
            return false;
        };
        if kind != IndexKind::Default {
            cur.advance();
        }
        cur.eat_one_of(&["KEY", "INDEX"]);

        let name = if cur.peek_symbol("(") || cur.peek_keyword("USING") {
            None
        } else {
            cur.ident()
        };
        if cur.eat_keyword("USING") {
            cur.advance();
        }
        let columns = column_list(cur);
        let Some(first) = columns.first() else {
            return false;
        };
        let name = name.unwrap_or_else(|| {
            first
                .split(|ch: char| ch == ' ' || ch == '(')
                .next()
                .unwrap_or_default()
                .to_string()
        });

        let mut index = Index::new(
            QualifiedName::new(table.name.schema.clone(), name),
            table.name.clone(),
        );
        index.columns = columns;
        index.kind = kind;
        while !cur.at_end() {
            if !self.index_clause(cur, &mut index) {
                super::table::generic_option(cur, &mut index.options);
            }
        }
        table.indexes.push(index);
        true
    }

    fn table_clause(&self, cur: &mut Cursor<'_>, table: &mut Table) -> bool {
        if cur.peek_keyword("DEFAULT")
            && cur
                .word_at(1)
                .is_some_and(|w| ["CHARSET", "CHARACTER", "COLLATE"].iter().any(|k| w.eq_ignore_ascii_case(k)))
        {
            cur.advance();
        }

        if cur.eat_keyword("ENGINE") {
            table.storage.engine = assigned_value(cur);
        } else if cur.eat_keyword("AUTO_INCREMENT") {
            // counter state, not structure
            assigned_value(cur);
        } else if cur.eat_keyword("CHARSET") || cur.eat_keywords(&["CHARACTER", "SET"]) {
            if let Some(charset) = assigned_value(cur) {
                table.options.insert("CHARSET".to_string(), charset);
            }
        } else if cur.eat_keyword("COLLATE") {
            if let Some(collation) = assigned_value(cur) {
                table.options.insert("COLLATE".to_string(), collation);
            }
        } else if cur.eat_keyword("COMMENT") {
            if let Some(comment) = assigned_value(cur) {
                table.options.insert("COMMENT".to_string(), comment);
            }
        } else if cur.eat_keywords(&["PARTITION", "BY"]) {
            table.storage.partition = parse_partition(cur);
        } else if cur.eat_keywords(&["WITH", "SYSTEM", "VERSIONING"]) {
            table.versioning.system_versioned = true;
        } else {
            return false;
        }
        true
    }

    fn index_clause(&self, cur: &mut Cursor<'_>, index: &mut Index) -> bool {
        if cur.eat_keyword("ALGORITHM") || cur.eat_keyword("LOCK") {
            assigned_value(cur);
        } else if cur.eat_keyword("USING") {
            if let Some(method) = cur.ident().filter(|m| !m.eq_ignore_ascii_case("btree")) {
                index.modifiers.push(format!("USING {}", method.to_lowercase()));
            }
        } else if cur.eat_keyword("COMMENT") {
            if let Some(comment) = assigned_value(cur) {
                index.options.insert("COMMENT".to_string(), comment);
            }
        } else if cur.eat_keyword("VISIBLE") {
            // default visibility
        } else if cur.eat_keyword("INVISIBLE") {
            index.modifiers.push("INVISIBLE".to_string());
        } else {
            return false;
        }
        true
    }
}

/// `[=] value`
fn assigned_value(cur: &mut Cursor<'_>) -> Option<String> {
    cur.eat_symbol("=");
    cur.take_value().map(|v| option_value(v, cur.dialect))
}

/// `KEY`/`INDEX` opening an index definition rather than a column with that
/// name: a column would be followed by a type, whose parameters are numbers.
fn is_inline_key(cur: &Cursor<'_>) -> bool {
    if !cur.peek_keyword("KEY") && !cur.peek_keyword("INDEX") {
        return false;
    }
    let Some(next) = cur.peek_at(1) else {
        return false;
    };
    if cur.slice(next) == "(" || cur.word_at(1).is_some_and(|w| w.eq_ignore_ascii_case("USING")) {
        return true;
    }
    if !matches!(next.kind, TokenKind::Word | TokenKind::Quoted) {
        return false;
    }
    match cur.peek_at(2) {
        Some(open) if cur.slice(open) == "(" => cur
            .peek_at(3)
            .is_some_and(|t| matches!(t.kind, TokenKind::Word | TokenKind::Quoted)),
        Some(_) => cur.word_at(2).is_some_and(|w| w.eq_ignore_ascii_case("USING")),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::model::*;

    fn table(sql: &str) -> Table {
        match Dialect::MySql.parse(sql) {
            Some(DatabaseObject::Table(t)) => t,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_table_options() {
        let t = table(
            "CREATE TABLE `Orders` (`id` INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`)) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci ROW_FORMAT=DYNAMIC",
        );
        assert_eq!(t.name, QualifiedName::unqualified("Orders"));
        assert_eq!(t.columns[0].generation, Generation::Identity);
        assert_eq!(t.storage.engine.as_deref(), Some("INNODB"));
        assert_eq!(t.options.get("CHARSET").map(String::as_str), Some("UTF8MB4"));
        assert_eq!(
            t.options.get("COLLATE").map(String::as_str),
            Some("UTF8MB4_UNICODE_CI")
        );
        assert_eq!(t.options.get("ROW_FORMAT").map(String::as_str), Some("DYNAMIC"));
        assert!(!t.options.contains_key("AUTO_INCREMENT"));
    }

    #[test]
    fn test_auto_increment_counter_is_not_structure() {
        let a = table("CREATE TABLE t (id INT) ENGINE=InnoDB AUTO_INCREMENT=1");
        let b = table("CREATE TABLE t (id INT) ENGINE=InnoDB AUTO_INCREMENT=9000");
        assert_eq!(a, b);
    }

    #[test]
    fn test_inline_keys() {
        let t = table(
            "CREATE TABLE posts (id INT, title VARCHAR(200), body TEXT, `key` VARCHAR(10), KEY idx_title (title), FULLTEXT KEY ft_body (body), UNIQUE KEY uk_title (title))",
        );
        assert_eq!(t.columns.len(), 4);
        assert_eq!(t.columns[3].name, "key");
        assert_eq!(t.indexes.len(), 2);
        assert_eq!(t.indexes[0].name, QualifiedName::unqualified("idx_title"));
        assert_eq!(t.indexes[0].kind, IndexKind::Default);
        assert_eq!(t.indexes[1].kind, IndexKind::Fulltext);
        assert_eq!(t.constraints.len(), 1);
        assert_eq!(t.constraints[0].name.as_deref(), Some("uk_title"));
    }

    #[test]
    fn test_key_named_column_is_a_column() {
        let t = table("CREATE TABLE kv (key VARCHAR(64) NOT NULL, value TEXT)");
        assert_eq!(t.columns.len(), 2);
        assert!(t.indexes.is_empty());
    }

    #[test]
    fn test_partitioning() {
        let t = table(
            "CREATE TABLE sales (id INT, yr INT) PARTITION BY RANGE (yr) (PARTITION p0 VALUES LESS THAN (2020), PARTITION p1 VALUES LESS THAN MAXVALUE)",
        );
        let partition = t.storage.partition.unwrap();
        assert_eq!(partition.method, "RANGE");
        assert_eq!(partition.key, "yr");
        assert_eq!(partition.partitions.len(), 2);
    }

    #[test]
    fn test_definer_is_ignored() {
        let a = Dialect::MySql
            .parse("CREATE DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW v AS SELECT 1 FROM t")
            .unwrap();
        let b = Dialect::MySql.parse("CREATE VIEW v AS SELECT 1 FROM t").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fulltext_index_statement() {
        match Dialect::MySql.parse("CREATE FULLTEXT INDEX ft ON posts (title, body)") {
            Some(DatabaseObject::Index(idx)) => {
                assert_eq!(idx.kind, IndexKind::Fulltext);
                assert_eq!(idx.columns, vec!["title", "body"]);
            }
            other => panic!("expected index, got {:?}", other),
        }
    }

    #[test]
    fn test_system_versioning() {
        let t = table("CREATE TABLE h (a INT) WITH SYSTEM VERSIONING");
        assert!(t.versioning.system_versioned);
    }
}
