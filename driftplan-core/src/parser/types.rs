//! Column type canonicalization.

use crate::model::{DataType, TypeToken};

use super::cursor::{canonical_sql, Cursor, TokenKind};

/// Word sequences that continue a type name (`DOUBLE PRECISION`,
/// `TIMESTAMP WITH TIME ZONE`, `INT UNSIGNED`, `VARCHAR(8) FOR BIT DATA`).
const CONTINUATIONS: &[&[&str]] = &[
    &["VARYING"],
    &["PRECISION"],
    &["WITH", "TIME", "ZONE"],
    &["WITHOUT", "TIME", "ZONE"],
    &["WITH", "LOCAL", "TIME", "ZONE"],
    &["LARGE", "OBJECT"],
    &["UNSIGNED"],
    &["SIGNED"],
    &["ZEROFILL"],
    &["FOR", "BIT", "DATA"],
    &["FOR", "SBCS", "DATA"],
    &["FOR", "MIXED", "DATA"],
];

/// Words that only continue a type directly after its first word.
const LEADING_CONTINUATIONS: &[(&str, &str)] = &[
    ("LONG", "VARCHAR"),
    ("LONG", "VARGRAPHIC"),
    ("NATIONAL", "CHARACTER"),
    ("NATIONAL", "CHAR"),
];

/// Modifiers kept as parameters rather than folded into the type family.
const MODIFIERS: &[&str] = &[
    "UNSIGNED",
    "SIGNED",
    "ZEROFILL",
    "FOR BIT DATA",
    "FOR SBCS DATA",
    "FOR MIXED DATA",
];

/// A parsed column type plus whether it was a PostgreSQL serial pseudo-type.
pub(crate) struct ParsedType {
    pub data_type: DataType,
    pub serial: bool,
}

/// Parse a column type at the cursor. Returns `None` when the next token
/// cannot start a type (SQLite allows typeless columns).
pub(crate) fn parse_data_type(cur: &mut Cursor<'_>) -> Option<ParsedType> {
    let first = cur.peek_at(0)?;
    if !matches!(first.kind, TokenKind::Word | TokenKind::Quoted) {
        return None;
    }
    let start = first.start;
    let mut end = first.end;
    cur.advance();

    let mut words: Vec<String> = vec![cur.slice(first).trim_matches('"').to_uppercase()];
    let mut params: Vec<String> = Vec::new();

    if let Some(next) = cur.peek_upper() {
        if LEADING_CONTINUATIONS
            .iter()
            .any(|(a, b)| words[0] == *a && next == *b)
        {
            if let Some(t) = cur.advance() {
                end = t.end;
            }
            words.push(next);
        }
    }

    loop {
        if let Some(seq) = CONTINUATIONS.iter().find(|seq| cur.peek_keywords(seq)) {
            for _ in 0..seq.len() {
                if let Some(t) = cur.advance() {
                    end = t.end;
                }
            }
            words.push(seq.join(" "));
            continue;
        }
        if params.is_empty() && cur.peek_symbol("(") {
            if let Some(group) = cur.group() {
                params = group
                    .split_commas()
                    .iter()
                    .map(|p| canonical_sql(p.rest_text(), cur.dialect))
                    .collect();
            }
            if let Some(last) = cur.last_end() {
                end = last;
            }
            continue;
        }
        if cur.peek_symbol("[") && cur.peek_at(1).is_some_and(|t| cur.slice(t) == "]") {
            cur.advance();
            if let Some(t) = cur.advance() {
                end = t.end;
            }
            words.push("[]".to_string());
            continue;
        }
        break;
    }

    let raw = cur.source()[start..end].to_string();
    let mut modifiers: Vec<String> = Vec::new();
    let mut base: Vec<String> = Vec::new();
    for word in words {
        if MODIFIERS.contains(&word.as_str()) {
            modifiers.push(word);
        } else {
            base.push(word);
        }
    }
    let base = base.join(" ").replace(" []", "[]");
    let (token, serial) = classify(&base);
    params.extend(modifiers);

    Some(ParsedType {
        data_type: DataType { token, params, raw },
        serial,
    })
}

/// Parse a type written as free text (catalog `format_type` output).
pub(crate) fn parse_type_text(text: &str, dialect: crate::dialect::Dialect) -> DataType {
    let mut cur = Cursor::new(text, dialect);
    match parse_data_type(&mut cur) {
        Some(parsed) => parsed.data_type,
        None => DataType {
            token: TypeToken::Other(text.trim().to_uppercase()),
            params: Vec::new(),
            raw: text.trim().to_string(),
        },
    }
}

/// Map an upper-cased base type name to its token.
fn classify(base: &str) -> (TypeToken, bool) {
    let token = match base {
        "TINYINT" | "INT1" => TypeToken::TinyInt,
        "SMALLINT" | "INT2" => TypeToken::SmallInt,
        "SMALLSERIAL" | "SERIAL2" => return (TypeToken::SmallInt, true),
        "INT" | "INTEGER" | "INT4" | "MEDIUMINT" => TypeToken::Integer,
        "SERIAL" | "SERIAL4" => return (TypeToken::Integer, true),
        "BIGINT" | "INT8" => TypeToken::BigInt,
        "BIGSERIAL" | "SERIAL8" => return (TypeToken::BigInt, true),
        "DECIMAL" | "DEC" | "NUMERIC" => TypeToken::Decimal,
        "REAL" | "FLOAT4" => TypeToken::Real,
        "FLOAT" => TypeToken::Float,
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => TypeToken::Double,
        "BOOL" | "BOOLEAN" => TypeToken::Boolean,
        "CHAR" | "CHARACTER" | "NCHAR" | "NATIONAL CHARACTER" | "NATIONAL CHAR" | "BPCHAR" => {
            TypeToken::Char
        }
        "VARCHAR" | "CHARACTER VARYING" | "CHAR VARYING" | "NVARCHAR" | "VARCHAR2" => {
            TypeToken::Varchar
        }
        "TEXT" => TypeToken::Text,
        "BINARY" => TypeToken::Binary,
        "VARBINARY" | "BINARY VARYING" => TypeToken::Varbinary,
        "BLOB" | "BYTEA" | "BINARY LARGE OBJECT" => TypeToken::Blob,
        "CLOB" | "CHARACTER LARGE OBJECT" | "CHAR LARGE OBJECT" => TypeToken::Clob,
        "DATE" => TypeToken::Date,
        "TIME" | "TIME WITHOUT TIME ZONE" => TypeToken::Time,
        "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => TypeToken::Timestamp,
        "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => TypeToken::TimestampTz,
        "INTERVAL" => TypeToken::Interval,
        "JSON" => TypeToken::Json,
        "UUID" => TypeToken::Uuid,
        "XML" => TypeToken::Xml,
        other => TypeToken::Other(other.to_string()),
    };
    (token, false)
}
