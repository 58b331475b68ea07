//! DB2 for z/OS and LUW clauses: table space placement, storage groups and
//! quotas, auxiliary LOB tables, clustering indexes and `WITH DEFAULT`.

use crate::model::{AuxiliaryTable, Column, DatabaseObject, Index, Storage, Table};

use super::cursor::{canonical_sql, Cursor};
use super::table::{normalize_default, option_value, parse_partition, COLUMN_CLAUSE_WORDS};
use super::DialectGrammar;

pub(crate) struct Db2Grammar;

impl DialectGrammar for Db2Grammar {
    /// `CREATE AUX[ILIARY] | LOB TABLE name [IN db.ts] STORES t COLUMN c [PART n]`
    fn create(&self, cur: &mut Cursor<'_>) -> Option<DatabaseObject> {
        cur.eat_one_of(&["AUX", "AUXILIARY", "LOB"])?;
        if !cur.eat_keyword("TABLE") {
            return None;
        }
        let name = cur.qualified_name()?;
        let placement = if cur.eat_keyword("IN") {
            placement(cur)
        } else {
            None
        };
        if !cur.eat_keyword("STORES") {
            return None;
        }
        let base_table = cur.qualified_name()?;
        if !cur.eat_keyword("COLUMN") {
            return None;
        }
        let column = cur.ident()?;
        let part = if cur.eat_keyword("PART") {
            cur.take_value().and_then(|n| n.parse::<u32>().ok())
        } else {
            None
        };
        Some(DatabaseObject::AuxiliaryTable(AuxiliaryTable {
            name,
            placement,
            base_table,
            column,
            part,
        }))
    }

    fn table_clause(&self, cur: &mut Cursor<'_>, table: &mut Table) -> bool {
        if storage_clause(cur, &mut table.storage) {
            return true;
        }
        if cur.eat_keyword("IN") {
            table.storage.placement = placement(cur);
        } else if cur.eat_keyword("AUDIT") {
            table.storage.audit = cur.peek_upper();
            cur.advance();
        } else if cur.eat_keyword("CCSID") {
            table.storage.ccsid = cur.peek_upper();
            cur.advance();
        } else if cur.eat_keywords(&["PARTITION", "BY"]) {
            table.storage.partition = parse_partition(cur);
        } else if cur.eat_keywords(&["DATA", "CAPTURE"]) {
            let mode = cur.peek_upper().unwrap_or_default();
            cur.advance();
            table.options.insert("DATA CAPTURE".to_string(), mode);
        } else {
            return false;
        }
        true
    }

    fn column_clause(&self, cur: &mut Cursor<'_>, column: &mut Column) -> bool {
        if cur.eat_keywords(&["WITH", "DEFAULT"]) {
            let expr = cur.take_until(COLUMN_CLAUSE_WORDS);
            column.default = if expr.is_empty() {
                // type's implicit default
                Some("WITH DEFAULT".to_string())
            } else {
                normalize_default(expr, cur.dialect).0
            };
        } else if cur.eat_keywords(&["IMPLICITLY", "HIDDEN"]) {
            column.attributes.push("IMPLICITLY HIDDEN".to_string());
        } else if cur.eat_keywords(&["INLINE", "LENGTH"]) {
            let length = cur.take_value().unwrap_or_default();
            column.attributes.push(format!("INLINE LENGTH {}", length));
        } else {
            return false;
        }
        true
    }

    fn index_clause(&self, cur: &mut Cursor<'_>, index: &mut Index) -> bool {
        if storage_clause(cur, &mut index.storage) {
            return true;
        }
        if cur.eat_keywords(&["NOT", "CLUSTER"]) || cur.eat_keywords(&["NOT", "PADDED"]) {
            // defaults
        } else if cur.eat_keyword("CLUSTER") {
            index.modifiers.push("CLUSTER".to_string());
        } else if cur.eat_keyword("PARTITIONED") {
            index.modifiers.push("PARTITIONED".to_string());
        } else if cur.eat_keyword("PADDED") {
            index.modifiers.push("PADDED".to_string());
        } else if cur.eat_keyword("IN") {
            index.storage.placement = placement(cur);
        } else {
            return false;
        }
        true
    }
}

/// `[USING] STOGROUP sg`, `PRIQTY n`, `SECQTY n`, shared by tables and indexes.
fn storage_clause(cur: &mut Cursor<'_>, storage: &mut Storage) -> bool {
    if cur.eat_keywords(&["USING", "STOGROUP"]) || cur.eat_keyword("STOGROUP") {
        storage.stogroup = cur.ident();
    } else if cur.eat_keywords(&["USING", "VCAT"]) {
        storage.stogroup = cur.ident().map(|v| format!("VCAT {}", v));
    } else if cur.eat_keyword("PRIQTY") {
        storage.priqty = cur.take_value().map(|v| option_value(v, cur.dialect));
    } else if cur.eat_keyword("SECQTY") {
        storage.secqty = cur.take_value().map(|v| option_value(v, cur.dialect));
    } else {
        return false;
    }
    true
}

/// `db.ts`, `DATABASE db` or a bare table space name.
fn placement(cur: &mut Cursor<'_>) -> Option<String> {
    if cur.eat_keyword("DATABASE") {
        return cur.ident().map(|db| format!("DATABASE {}", db));
    }
    let mut parts = vec![cur.ident()?];
    while cur.eat_symbol(".") {
        if let Some(part) = cur.ident() {
            parts.push(part);
        }
    }
    Some(canonical_sql(&parts.join("."), cur.dialect).to_uppercase())
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::model::*;

    fn parse(sql: &str) -> DatabaseObject {
        Dialect::Db2.parse(sql).expect("statement should parse")
    }

    #[test]
    fn test_table_storage_clauses() {
        match parse(
            "CREATE TABLE prod.account (acct_id INTEGER NOT NULL, name VARCHAR(40) NOT NULL WITH DEFAULT, opened DATE WITH DEFAULT CURRENT DATE, PRIMARY KEY (acct_id)) IN dbprod.tsacct AUDIT CHANGES CCSID UNICODE USING STOGROUP sgprod PRIQTY 720 SECQTY 720",
        ) {
            DatabaseObject::Table(t) => {
                assert_eq!(t.name, QualifiedName::new(Some("PROD".to_string()), "ACCOUNT"));
                assert_eq!(t.columns[0].name, "ACCT_ID");
                assert_eq!(t.columns[1].default.as_deref(), Some("WITH DEFAULT"));
                assert_eq!(t.columns[2].default.as_deref(), Some("current date"));
                assert_eq!(t.storage.placement.as_deref(), Some("DBPROD.TSACCT"));
                assert_eq!(t.storage.audit.as_deref(), Some("CHANGES"));
                assert_eq!(t.storage.ccsid.as_deref(), Some("UNICODE"));
                assert_eq!(t.storage.stogroup.as_deref(), Some("SGPROD"));
                assert_eq!(t.storage.priqty.as_deref(), Some("720"));
                assert_eq!(t.storage.secqty.as_deref(), Some("720"));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_in_database() {
        match parse("CREATE TABLE t (a INT) IN DATABASE dbx") {
            DatabaseObject::Table(t) => {
                assert_eq!(t.storage.placement.as_deref(), Some("DATABASE DBX"));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_aux_table() {
        match parse("CREATE AUX TABLE prod.acct_doc_aux IN dbprod.tsdoc STORES prod.account COLUMN doc PART 2") {
            DatabaseObject::AuxiliaryTable(aux) => {
                assert_eq!(aux.name, QualifiedName::new(Some("PROD".to_string()), "ACCT_DOC_AUX"));
                assert_eq!(aux.placement.as_deref(), Some("DBPROD.TSDOC"));
                assert_eq!(aux.base_table, QualifiedName::new(Some("PROD".to_string()), "ACCOUNT"));
                assert_eq!(aux.column, "DOC");
                assert_eq!(aux.part, Some(2));
            }
            other => panic!("expected auxiliary table, got {:?}", other),
        }
    }

    #[test]
    fn test_clustered_partitioned_index() {
        match parse(
            "CREATE UNIQUE INDEX prod.ix_acct ON prod.account (acct_id ASC) USING STOGROUP sgprod PRIQTY 48 SECQTY 48 CLUSTER PARTITIONED BUFFERPOOL BP2 CLOSE NO",
        ) {
            DatabaseObject::Index(idx) => {
                assert!(idx.unique);
                assert_eq!(idx.columns, vec!["ACCT_ID"]);
                assert_eq!(idx.modifiers, vec!["CLUSTER", "PARTITIONED"]);
                assert_eq!(idx.storage.stogroup.as_deref(), Some("SGPROD"));
                assert_eq!(idx.storage.priqty.as_deref(), Some("48"));
                assert_eq!(idx.options.get("BUFFERPOOL").map(String::as_str), Some("BP2"));
            }
            other => panic!("expected index, got {:?}", other),
        }
    }

    #[test]
    fn test_not_cluster_is_default() {
        let a = parse("CREATE INDEX IX1 ON T (A) NOT CLUSTER");
        let b = parse("CREATE INDEX IX1 ON T (A)");
        assert_eq!(a, b);
    }
}
