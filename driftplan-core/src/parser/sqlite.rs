//! SQLite clauses: virtual tables, `WITHOUT ROWID`, `STRICT` and column
//! conflict clauses.

use crate::model::{Column, DatabaseObject, Table, VirtualTable};

use super::cursor::{canonical_sql, Cursor};
use super::DialectGrammar;

pub(crate) struct SqliteGrammar;

impl DialectGrammar for SqliteGrammar {
    fn create(&self, cur: &mut Cursor<'_>) -> Option<DatabaseObject> {
        cur.eat_one_of(&["TEMP", "TEMPORARY"]);
        if !cur.eat_keywords(&["VIRTUAL", "TABLE"]) {
            return None;
        }
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let name = cur.qualified_name()?;
        if !cur.eat_keyword("USING") {
            return None;
        }
        let module = cur.ident()?;
        let args = cur
            .group()
            .map(|g| {
                g.split_commas()
                    .iter()
                    .map(|a| canonical_sql(a.rest_text(), cur.dialect))
                    .collect()
            })
            .unwrap_or_default();
        Some(DatabaseObject::VirtualTable(VirtualTable { name, module, args }))
    }

    fn table_clause(&self, cur: &mut Cursor<'_>, table: &mut Table) -> bool {
        if cur.eat_keywords(&["WITHOUT", "ROWID"]) {
            table.options.insert("WITHOUT ROWID".to_string(), String::new());
        } else if cur.eat_keyword("STRICT") {
            table.options.insert("STRICT".to_string(), String::new());
        } else {
            return false;
        }
        true
    }

    fn column_clause(&self, cur: &mut Cursor<'_>, column: &mut Column) -> bool {
        if !cur.eat_keywords(&["ON", "CONFLICT"]) {
            return false;
        }
        if let Some(action) = cur.peek_upper() {
            cur.advance();
            column.attributes.push(format!("ON CONFLICT {}", action));
        }
        true
    }
}
