//! SQL dialect tags and per-dialect lexical rules.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::DriftplanError;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL, also used for generic SQL.
    Postgres,
    MySql,
    Sqlite,
    Db2,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Sqlite,
        Dialect::Db2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Db2 => "db2",
        }
    }

    /// Normalize one identifier part.
    ///
    /// Quoted identifiers keep their case with the quoting removed; unquoted
    /// ones fold to upper case on DB2 and lower case everywhere else.
    pub fn normalize_ident(&self, raw: &str) -> String {
        let raw = raw.trim();
        if let Some(inner) = unquote(raw) {
            return inner;
        }
        match self {
            Dialect::Db2 => raw.to_uppercase(),
            _ => raw.to_lowercase(),
        }
    }

    /// Schema qualifier that is implied when none is written.
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => Some("public"),
            _ => None,
        }
    }

    // ── lexical features ──

    pub(crate) fn dollar_quotes(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    pub(crate) fn backslash_escapes(&self) -> bool {
        matches!(self, Dialect::MySql)
    }

    pub(crate) fn bracket_identifiers(&self) -> bool {
        matches!(self, Dialect::Sqlite)
    }

    pub(crate) fn hash_comments(&self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `DELIMITER <token>` client directive.
    pub(crate) fn delimiter_directive(&self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// `--#SET TERMINATOR <char>` CLP directive.
    pub(crate) fn terminator_directive(&self) -> bool {
        matches!(self, Dialect::Db2)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = DriftplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" | "generic" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "db2" | "db2z" | "db2luw" => Ok(Dialect::Db2),
            _ => Err(DriftplanError::UnsupportedDialect {
                name: s.to_string(),
            }),
        }
    }
}

/// Strip identifier quoting (`"x"`, `` `x` ``, `[x]`), unescaping doubled quotes.
fn unquote(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let (open, close) = (bytes[0], bytes[bytes.len() - 1]);
    let inner = &raw[1..raw.len() - 1];
    match (open, close) {
        (b'"', b'"') => Some(inner.replace("\"\"", "\"")),
        (b'`', b'`') => Some(inner.replace("``", "`")),
        (b'[', b']') => Some(inner.to_string()),
        _ => None,
    }
}
