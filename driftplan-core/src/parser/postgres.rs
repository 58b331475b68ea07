//! PostgreSQL clauses. The common grammar already is PostgreSQL-shaped, so
//! only trailing table and index clauses live here.

use crate::model::{Index, Table};

use super::cursor::{canonical_sql, Cursor};
use super::table::parse_partition;
use super::DialectGrammar;

pub(crate) struct PostgresGrammar;

impl DialectGrammar for PostgresGrammar {
    fn table_clause(&self, cur: &mut Cursor<'_>, table: &mut Table) -> bool {
        if cur.eat_keywords(&["PARTITION", "BY"]) {
            table.storage.partition = parse_partition(cur);
        } else if cur.eat_keyword("INHERITS") {
            let parents = cur
                .group()
                .map(|g| {
                    g.split_commas()
                        .into_iter()
                        .filter_map(|mut p| p.qualified_name())
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            table.options.insert("INHERITS".to_string(), parents);
        } else if cur.eat_keyword("TABLESPACE") {
            table.storage.placement = cur.ident();
        } else if cur.peek_keyword("WITH") && cur.peek_at(1).is_some_and(|t| cur.slice(t) == "(") {
            cur.advance();
            let params = cur.group_text().unwrap_or_default();
            table
                .options
                .insert("WITH".to_string(), canonical_sql(params, cur.dialect));
        } else if cur.eat_keywords(&["WITHOUT", "OIDS"]) || cur.eat_keywords(&["WITH", "OIDS"]) {
            // no-op since PostgreSQL 12
        } else if cur.eat_keywords(&["ON", "COMMIT"]) {
            let action = cur.take_until(&[]);
            table
                .options
                .insert("ON COMMIT".to_string(), canonical_sql(action, cur.dialect).to_uppercase());
        } else if cur.eat_keyword("USING") {
            let method = cur.ident().unwrap_or_default();
            if method != "heap" {
                table.options.insert("USING".to_string(), method);
            }
        } else {
            return false;
        }
        true
    }

    fn index_clause(&self, cur: &mut Cursor<'_>, index: &mut Index) -> bool {
        if cur.eat_keywords(&["NULLS", "NOT", "DISTINCT"]) {
            index.modifiers.push("NULLS NOT DISTINCT".to_string());
            true
        } else if cur.eat_keywords(&["NULLS", "DISTINCT"]) {
            true
        } else {
            false
        }
    }
}
