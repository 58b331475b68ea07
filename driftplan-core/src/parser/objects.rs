//! Indexes, views, triggers, routines and aliases.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::model::{
    Alias, Index, IndexKind, Procedure, QualifiedName, RoutineKind, Trigger, TriggerEvent,
    TriggerTiming, View,
};

use super::cursor::{canonical_expr, canonical_sql, Cursor};
use super::table::{column_list, generic_option};
use super::DialectGrammar;

/// Table names following `FROM` or `JOIN` in a view query.
static VIEW_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:FROM|JOIN)\s+((?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_][\w$#]*)(?:\s*\.\s*(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_][\w$#]*))*)"#,
    )
    .unwrap()
});

/// Words that may follow `FROM` without naming a table.
const NOT_A_TABLE: &[&str] = &["LATERAL", "ONLY", "UNNEST", "TABLE", "SELECT"];

pub(crate) fn parse_index(
    cur: &mut Cursor<'_>,
    unique: bool,
    kind: IndexKind,
    grammar: &dyn DialectGrammar,
) -> Option<Index> {
    cur.eat_keyword("CONCURRENTLY");
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = if cur.peek_keyword("ON") {
        None
    } else {
        Some(cur.qualified_name()?)
    };
    let mut method = None;
    if cur.eat_keyword("USING") {
        method = cur.ident();
    }
    if !cur.eat_keyword("ON") {
        return None;
    }
    cur.eat_keyword("ONLY");
    let table = cur.qualified_name()?;
    if cur.eat_keyword("USING") {
        method = cur.ident();
    }
    let columns = column_list(cur);
    if columns.is_empty() {
        return None;
    }

    let mut name = name.unwrap_or_else(|| {
        let stem: Vec<&str> = columns
            .iter()
            .filter_map(|c| c.split(|ch: char| !ch.is_alphanumeric() && ch != '_').next())
            .collect();
        QualifiedName::unqualified(format!("{}_{}_idx", table.name, stem.join("_")))
    });
    if name.schema.is_none() {
        name.schema = table.schema.clone();
    }

    let mut index = Index::new(name, table);
    index.columns = columns;
    index.unique = unique;
    index.kind = kind;

    while !cur.at_end() {
        if grammar.index_clause(cur, &mut index) {
            continue;
        }
        if cur.eat_keyword("INCLUDE") {
            let included = column_list(cur);
            index
                .modifiers
                .push(format!("INCLUDE ({})", included.join(", ")));
        } else if cur.eat_keyword("WHERE") {
            let predicate = canonical_expr(cur.take_rest(), cur.dialect);
            index.modifiers.push(format!("WHERE {}", predicate));
        } else if cur.peek_keyword("WITH") && cur.peek_at(1).is_some_and(|t| cur.slice(t) == "(") {
            cur.advance();
            let params = cur.group_text().unwrap_or_default();
            index
                .options
                .insert("WITH".to_string(), canonical_sql(params, cur.dialect));
        } else if cur.eat_keyword("TABLESPACE") {
            index.storage.placement = cur.ident();
        } else if cur.eat_keyword("USING") {
            method = cur.ident();
        } else {
            generic_option(cur, &mut index.options);
        }
    }

    if let Some(method) = method.filter(|m| !m.eq_ignore_ascii_case("btree")) {
        index
            .modifiers
            .insert(0, format!("USING {}", method.to_lowercase()));
    }
    Some(index)
}

pub(crate) fn parse_view(cur: &mut Cursor<'_>, materialized: bool) -> Option<View> {
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = cur.qualified_name()?;
    let columns = if cur.peek_symbol("(") {
        column_list(cur)
    } else {
        Vec::new()
    };
    if cur.eat_keyword("WITH") {
        cur.group();
    }
    if !cur.eat_keyword("AS") {
        return None;
    }
    let query_text = cur.take_rest();
    let query = canonical_sql(query_text, cur.dialect);

    let mut references: Vec<QualifiedName> = Vec::new();
    for caps in VIEW_REFERENCE_RE.captures_iter(query_text) {
        let Some(found) = caps.get(1) else { continue };
        let mut name_cur = Cursor::new(found.as_str(), cur.dialect);
        if name_cur
            .peek_upper()
            .is_some_and(|w| NOT_A_TABLE.contains(&w.as_str()))
        {
            continue;
        }
        if let Some(referenced) = name_cur.qualified_name() {
            if referenced != name && !references.contains(&referenced) {
                references.push(referenced);
            }
        }
    }

    Some(View {
        name,
        query,
        materialized,
        columns,
        references,
    })
}

pub(crate) fn parse_trigger(cur: &mut Cursor<'_>) -> Option<Trigger> {
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = cur.qualified_name()?;

    let timing = if cur.eat_keywords(&["NO", "CASCADE", "BEFORE"]) || cur.eat_keyword("BEFORE") {
        TriggerTiming::Before
    } else if cur.eat_keyword("AFTER") {
        TriggerTiming::After
    } else if cur.eat_keywords(&["INSTEAD", "OF"]) {
        TriggerTiming::InsteadOf
    } else {
        TriggerTiming::Before
    };

    let mut events = Vec::new();
    while let Some(event) = cur.eat_one_of(&["INSERT", "UPDATE", "DELETE", "TRUNCATE"]) {
        events.push(match event.as_str() {
            "INSERT" => TriggerEvent::Insert,
            "UPDATE" => TriggerEvent::Update,
            "DELETE" => TriggerEvent::Delete,
            _ => TriggerEvent::Truncate,
        });
        if event == "UPDATE" && cur.eat_keyword("OF") {
            while !cur.at_end() && !cur.peek_keyword("ON") && !cur.peek_keyword("OR") {
                cur.advance();
            }
        }
        if !cur.eat_keyword("OR") && !cur.eat_symbol(",") {
            break;
        }
    }
    if events.is_empty() || !cur.eat_keyword("ON") {
        return None;
    }
    let table = cur.qualified_name()?;
    events.sort();
    events.dedup();

    Some(Trigger {
        name,
        table,
        timing,
        events,
        body: canonical_sql(cur.take_rest(), cur.dialect),
    })
}

pub(crate) fn parse_routine(cur: &mut Cursor<'_>, routine: RoutineKind) -> Option<Procedure> {
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = cur.qualified_name()?;
    Some(Procedure {
        name,
        routine,
        body: canonical_sql(cur.take_rest(), cur.dialect),
    })
}

/// `ALIAS name FOR [TABLE | SEQUENCE] target`, also `SYNONYM`.
pub(crate) fn parse_alias(cur: &mut Cursor<'_>) -> Option<Alias> {
    cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = cur.qualified_name()?;
    if !cur.eat_keyword("FOR") {
        return None;
    }
    cur.eat_one_of(&["TABLE", "SEQUENCE"]);
    let target = cur.qualified_name()?;
    Some(Alias { name, target })
}
