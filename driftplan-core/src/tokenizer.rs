//! Statement splitting for SQL source text.
//!
//! Splits on the active delimiter while skipping comments, string literals,
//! quoted identifiers, dollar-quoted bodies and `BEGIN ... END` blocks. The
//! delimiter can be changed mid-stream by the MySQL `DELIMITER` directive or the
//! DB2 `--#SET TERMINATOR` directive; that state lives in the iterator.

use crate::dialect::Dialect;
use crate::error::TokenizeError;

/// One statement, with comments replaced by a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// Byte offset of the first non-comment character.
    pub offset: usize,
    /// 1-based line of `offset`.
    pub line: usize,
}

/// Split `sql` into statements for `dialect`.
pub fn tokenize(sql: &str, dialect: Dialect) -> Statements<'_> {
    Statements {
        sql,
        dialect,
        pos: 0,
        delimiter: ";".to_string(),
        line: 1,
        line_pos: 0,
    }
}

/// Lazy statement iterator. Cloning it restarts from the clone's position.
#[derive(Debug, Clone)]
pub struct Statements<'a> {
    sql: &'a str,
    dialect: Dialect,
    pos: usize,
    delimiter: String,
    line: usize,
    line_pos: usize,
}

const BLOCK_CLOSERS_IGNORED: &[&str] = &["IF", "LOOP", "WHILE", "REPEAT", "FOR"];
const TRANSACTION_WORDS: &[&str] = &[
    "TRANSACTION",
    "WORK",
    "ISOLATION",
    "DEFERRED",
    "IMMEDIATE",
    "EXCLUSIVE",
    "READ",
];

impl<'a> Statements<'a> {
    /// Currently active statement delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn line_at(&mut self, offset: usize) -> usize {
        if offset > self.line_pos {
            self.line += self.sql.as_bytes()[self.line_pos..offset]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.line_pos = offset;
        }
        self.line
    }

    fn fail(&mut self, start: usize, end: usize, reason: &str) -> TokenizeError {
        let line = self.line_at(start);
        TokenizeError {
            reason: reason.to_string(),
            offset: start,
            line,
            snippet: self.sql[start..end].trim().to_string(),
        }
    }

    /// Whether the `BEGIN` ending at `pos` opens a block rather than a transaction.
    fn opens_block(&self, pos: usize) -> bool {
        let bytes = self.sql.as_bytes();
        let next = skip_whitespace(bytes, pos);
        if next >= bytes.len() || bytes[next..].starts_with(self.delimiter.as_bytes()) {
            return false;
        }
        match next_word(self.sql, next) {
            Some((word, _)) => !TRANSACTION_WORDS
                .iter()
                .any(|w| word.eq_ignore_ascii_case(w)),
            None => true,
        }
    }
}

impl Iterator for Statements<'_> {
    type Item = Result<Statement, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let sql = self.sql;
        let bytes = sql.as_bytes();
        let len = bytes.len();
        let mut i = self.pos;
        let mut code_start: Option<usize> = None;
        let mut text = String::new();
        let mut seg_start = i;
        let mut depth: usize = 0;
        let mut last_word = "";
        let mut prev_word = "";
        // First delimiter seen while a block was open: (end, resume, delimiter).
        let mut fallback: Option<(usize, usize, String)> = None;

        while i < len {
            let b = bytes[i];

            // Line comments
            let line_comment = (b == b'-' && bytes.get(i + 1) == Some(&b'-'))
                || (b == b'#' && self.dialect.hash_comments());
            if line_comment {
                let end = line_end(bytes, i);
                if b == b'-' && self.dialect.terminator_directive() {
                    if let Some(term) = terminator_directive(&sql[i + 2..end]) {
                        self.delimiter = term;
                    }
                }
                if code_start.is_some() {
                    text.push_str(&sql[seg_start..i]);
                    text.push(' ');
                }
                i = end;
                seg_start = i;
                continue;
            }

            // Block comments (nested)
            if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
                let Some(end) = skip_block_comment(bytes, i) else {
                    self.pos = len;
                    return Some(Err(self.fail(
                        code_start.unwrap_or(i),
                        len,
                        "unterminated block comment",
                    )));
                };
                if code_start.is_some() {
                    text.push_str(&sql[seg_start..i]);
                    text.push(' ');
                }
                i = end;
                seg_start = i;
                continue;
            }

            if b.is_ascii_whitespace() {
                i += 1;
                continue;
            }

            if code_start.is_none() {
                if self.dialect.delimiter_directive() && is_word_start(b) {
                    if let Some((word, end)) = next_word(sql, i) {
                        if word.eq_ignore_ascii_case("DELIMITER") {
                            let eol = line_end(bytes, end);
                            if let Some(token) = sql[end..eol].split_whitespace().next() {
                                self.delimiter = token.to_string();
                            }
                            i = eol;
                            seg_start = i;
                            continue;
                        }
                    }
                }
            }

            // Statement delimiter
            if bytes[i..].starts_with(self.delimiter.as_bytes()) {
                let after = i + self.delimiter.len();
                if depth == 0 {
                    if let Some(start) = code_start {
                        text.push_str(&sql[seg_start..i]);
                        self.pos = after;
                        let line = self.line_at(start);
                        return Some(Ok(Statement {
                            text: text.trim().to_string(),
                            offset: start,
                            line,
                        }));
                    }
                } else if fallback.is_none() {
                    fallback = Some((i, after, self.delimiter.clone()));
                }
                i = after;
                continue;
            }

            if code_start.is_none() {
                code_start = Some(i);
                seg_start = i;
            }

            match b {
                b'\'' => {
                    let escape_string = i > 0
                        && (bytes[i - 1] == b'E' || bytes[i - 1] == b'e')
                        && (i < 2 || !is_word_byte(bytes[i - 2]));
                    let backslash = self.dialect.backslash_escapes() || escape_string;
                    match skip_quoted(bytes, i, b'\'', backslash) {
                        Some(end) => i = end,
                        None => {
                            self.pos = len;
                            let start = code_start.unwrap_or(i);
                            return Some(Err(self.fail(start, len, "unterminated string literal")));
                        }
                    }
                }
                b'"' | b'`' => {
                    let backslash = b == b'"' && self.dialect.backslash_escapes();
                    match skip_quoted(bytes, i, b, backslash) {
                        Some(end) => i = end,
                        None => {
                            self.pos = len;
                            let start = code_start.unwrap_or(i);
                            return Some(Err(self.fail(start, len, "unterminated quoted identifier")));
                        }
                    }
                }
                b'[' if self.dialect.bracket_identifiers() => match skip_quoted(bytes, i, b']', false) {
                    Some(end) => i = end,
                    None => {
                        self.pos = len;
                        let start = code_start.unwrap_or(i);
                        return Some(Err(self.fail(start, len, "unterminated quoted identifier")));
                    }
                },
                b'$' if self.dialect.dollar_quotes() => match dollar_tag_end(bytes, i) {
                    Some(tag_end) => {
                        let tag = &bytes[i..tag_end];
                        match find_bytes(bytes, tag_end, tag) {
                            Some(close) => i = close + tag.len(),
                            None => {
                                self.pos = len;
                                let start = code_start.unwrap_or(i);
                                return Some(Err(self.fail(
                                    start,
                                    len,
                                    "unterminated dollar-quoted string",
                                )));
                            }
                        }
                    }
                    None => i += 1,
                },
                _ if is_word_start(b) && (i == 0 || !is_word_byte(bytes[i - 1])) => {
                    let end = word_end_before(bytes, i, self.delimiter.as_bytes());
                    let word = &sql[i..end];
                    let mut resume = end;
                    // `AS ROW BEGIN` / `AS ROW END` are DB2 column generation clauses
                    let after_row = last_word.eq_ignore_ascii_case("ROW")
                        && prev_word.eq_ignore_ascii_case("AS");
                    if word.eq_ignore_ascii_case("BEGIN") {
                        if !after_row && self.opens_block(end) {
                            depth += 1;
                        }
                    } else if word.eq_ignore_ascii_case("CASE") {
                        depth += 1;
                    } else if word.eq_ignore_ascii_case("END") && !after_row {
                        match next_word(sql, skip_whitespace(bytes, end)) {
                            Some((next, next_end))
                                if BLOCK_CLOSERS_IGNORED
                                    .iter()
                                    .any(|w| next.eq_ignore_ascii_case(w)) =>
                            {
                                resume = next_end;
                            }
                            Some((next, next_end)) if next.eq_ignore_ascii_case("CASE") => {
                                depth = depth.saturating_sub(1);
                                resume = next_end;
                            }
                            _ => depth = depth.saturating_sub(1),
                        }
                    }
                    prev_word = last_word;
                    last_word = word;
                    i = resume;
                }
                _ => i += 1,
            }
        }

        self.pos = len;
        let start = code_start?;
        if depth > 0 {
            let (end, resume) = match fallback {
                Some((end, resume, delimiter)) => {
                    self.delimiter = delimiter;
                    (end, resume)
                }
                None => (len, len),
            };
            let err = self.fail(start, end, "unterminated BEGIN ... END block");
            self.pos = resume;
            return Some(Err(err));
        }
        text.push_str(&sql[seg_start..len]);
        let line = self.line_at(start);
        Some(Ok(Statement {
            text: text.trim().to_string(),
            offset: start,
            line,
        }))
    }
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn word_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && is_word_byte(bytes[i]) {
        i += 1;
    }
    i
}

/// Like [`word_end`], but stops where the active delimiter starts (`END$$`).
fn word_end_before(bytes: &[u8], start: usize, delimiter: &[u8]) -> usize {
    let end = word_end(bytes, start);
    (start + 1..end)
        .find(|&p| bytes[p..].starts_with(delimiter))
        .unwrap_or(end)
}

fn next_word(sql: &str, pos: usize) -> Option<(&str, usize)> {
    let bytes = sql.as_bytes();
    if pos < bytes.len() && is_word_start(bytes[pos]) {
        let end = word_end(bytes, pos);
        Some((&sql[pos..end], end))
    } else {
        None
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn line_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

/// End of a nested block comment starting at `start`, or `None` if unterminated.
fn skip_block_comment(bytes: &[u8], start: usize) -> Option<usize> {
    let len = bytes.len();
    let mut i = start + 2;
    let mut depth = 1;
    while i < len {
        if i + 1 < len && bytes[i] == b'/' && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
        } else if i + 1 < len && bytes[i] == b'*' && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Some(i);
            }
        } else {
            i += 1;
        }
    }
    None
}

/// End (exclusive) of a quoted run opened at `start`. A doubled closing quote
/// is an escape; with `backslash` so is `\x`.
fn skip_quoted(bytes: &[u8], start: usize, close: u8, backslash: bool) -> Option<usize> {
    let len = bytes.len();
    let mut i = start + 1;
    while i < len {
        if backslash && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == close {
            if i + 1 < len && bytes[i + 1] == close {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// End (exclusive) of a `$tag$` opener at `start`, if one is there.
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if i < bytes.len() && bytes[i].is_ascii_digit() {
        return None;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'$' {
        Some(i + 1)
    } else {
        None
    }
}

fn find_bytes(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Parse the body of a `--#SET TERMINATOR x` comment.
fn terminator_directive(comment: &str) -> Option<String> {
    let rest = comment.trim_start().strip_prefix('#')?;
    let mut parts = rest.split_whitespace();
    let set = parts.next()?;
    let terminator = parts.next()?;
    if !set.eq_ignore_ascii_case("SET") || !terminator.eq_ignore_ascii_case("TERMINATOR") {
        return None;
    }
    parts.next().map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sql: &str, dialect: Dialect) -> Vec<String> {
        tokenize(sql, dialect)
            .map(|r| r.expect("statement").text)
            .collect()
    }

    // ── basic splitting ──

    #[test]
    fn test_split_simple_statements() {
        assert_eq!(
            texts("SELECT 1; SELECT 2;", Dialect::Postgres),
            vec!["SELECT 1", "SELECT 2"]
        );
    }

    #[test]
    fn test_split_no_trailing_delimiter() {
        assert_eq!(
            texts("CREATE TABLE a (id int);\nCREATE TABLE b (id int)", Dialect::Postgres),
            vec!["CREATE TABLE a (id int)", "CREATE TABLE b (id int)"]
        );
    }

    #[test]
    fn test_split_respects_string_literals() {
        assert_eq!(
            texts("SELECT 'hello;world'; SELECT 2;", Dialect::Postgres),
            vec!["SELECT 'hello;world'", "SELECT 2"]
        );
    }

    #[test]
    fn test_split_respects_dollar_quoting() {
        let sql = "CREATE FUNCTION f() RETURNS void AS $body$ BEGIN; END; $body$ LANGUAGE plpgsql; SELECT 1;";
        let stmts = texts(sql, Dialect::Postgres);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("BEGIN; END;"));
    }

    #[test]
    fn test_mysql_backslash_escape() {
        let sql = "INSERT INTO t VALUES ('it\\'s; fine'); SELECT 1";
        assert_eq!(texts(sql, Dialect::MySql).len(), 2);
    }

    #[test]
    fn test_comments_are_stripped_and_comment_only_skipped() {
        let sql = "-- header\n;\n/* only a comment */;\nCREATE TABLE t ( -- trailing\n id int /* inline */ );";
        let stmts = texts(sql, Dialect::Postgres);
        assert_eq!(stmts.len(), 1);
        assert!(!stmts[0].contains("trailing"));
        assert!(!stmts[0].contains("inline"));
        assert!(stmts[0].starts_with("CREATE TABLE t"));
    }

    #[test]
    fn test_line_numbers() {
        let stmts: Vec<Statement> = tokenize("SELECT 1;\n\n-- c\nSELECT 2;", Dialect::Postgres)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(stmts[0].line, 1);
        assert_eq!(stmts[1].line, 4);
        assert_eq!(stmts[1].offset, 16);
    }

    #[test]
    fn test_clone_restarts() {
        let iter = tokenize("SELECT 1; SELECT 2;", Dialect::Postgres);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }

    // ── delimiters and blocks ──

    #[test]
    fn test_mysql_delimiter_directive() {
        let sql = "DELIMITER //\nCREATE PROCEDURE p() BEGIN SELECT 1; END //\nDELIMITER ;\nCREATE TABLE t (id INT);";
        let stmts = texts(sql, Dialect::MySql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("END"));
        assert_eq!(stmts[1], "CREATE TABLE t (id INT)");
    }

    #[test]
    fn test_delimiter_state_persists_until_next_directive() {
        let sql = "DELIMITER $$\nCREATE TABLE a (id INT)$$\nCREATE TABLE b (id INT)$$";
        let mut iter = tokenize(sql, Dialect::MySql);
        assert_eq!(iter.next().unwrap().unwrap().text, "CREATE TABLE a (id INT)");
        assert_eq!(iter.delimiter(), "$$");
        assert_eq!(iter.next().unwrap().unwrap().text, "CREATE TABLE b (id INT)");
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_delimiter_glued_to_end() {
        let sql = "DELIMITER $$\nCREATE PROCEDURE p() BEGIN SELECT 1; END$$\nDELIMITER ;\nSELECT 2;";
        let stmts = texts(sql, Dialect::MySql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("END"));
    }

    #[test]
    fn test_begin_end_block_without_directive() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON t BEGIN UPDATE c SET n = n + 1; END; SELECT 1;";
        let stmts = texts(sql, Dialect::Sqlite);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("END"));
    }

    #[test]
    fn test_end_if_does_not_close_block() {
        let sql = "CREATE PROCEDURE p() BEGIN IF x THEN SELECT 1; END IF; END; SELECT 2;";
        let stmts = texts(sql, Dialect::MySql);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "SELECT 2");
    }

    #[test]
    fn test_case_expression_is_balanced() {
        let sql = "CREATE VIEW v AS SELECT CASE WHEN a THEN 1 ELSE 0 END AS x FROM t; SELECT 1;";
        assert_eq!(texts(sql, Dialect::Postgres).len(), 2);
    }

    #[test]
    fn test_transaction_begin_is_not_a_block() {
        let sql = "BEGIN; CREATE TABLE a (id int); COMMIT;";
        assert_eq!(texts(sql, Dialect::Postgres).len(), 3);
    }

    #[test]
    fn test_db2_terminator_directive() {
        let sql = "--#SET TERMINATOR @\nCREATE TRIGGER trg AFTER INSERT ON T FOR EACH ROW BEGIN ATOMIC UPDATE C SET N = 1; END@\nCREATE TABLE T2 (C INT)@";
        let stmts = texts(sql, Dialect::Db2);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TRIGGER"));
        assert_eq!(stmts[1], "CREATE TABLE T2 (C INT)");
    }

    #[test]
    fn test_db2_row_begin_end_columns() {
        let sql = "CREATE TABLE T (S TIMESTAMP(12) GENERATED ALWAYS AS ROW BEGIN NOT NULL, E TIMESTAMP(12) GENERATED ALWAYS AS ROW END NOT NULL); CREATE TABLE U (C INT);";
        assert_eq!(texts(sql, Dialect::Db2).len(), 2);
    }

    // ── errors ──

    #[test]
    fn test_unterminated_quote_consumes_rest() {
        let sql = "CREATE TABLE a (id int); INSERT INTO x VALUES ('abc; CREATE TABLE b (id int);";
        let items: Vec<_> = tokenize(sql, Dialect::Postgres).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.reason, "unterminated string literal");
        assert!(err.snippet.starts_with("INSERT INTO x"));
    }

    #[test]
    fn test_unterminated_block_resumes_after_first_terminator() {
        let sql = "CREATE PROCEDURE p() BEGIN SELECT 1; CREATE TABLE t (id int);";
        let items: Vec<_> = tokenize(sql, Dialect::MySql).collect();
        assert_eq!(items.len(), 2);
        let err = items[0].as_ref().unwrap_err();
        assert_eq!(err.snippet, "CREATE PROCEDURE p() BEGIN SELECT 1");
        assert_eq!(err.line, 1);
        assert_eq!(items[1].as_ref().unwrap().text, "CREATE TABLE t (id int)");
    }

    #[test]
    fn test_unterminated_block_comment() {
        let items: Vec<_> = tokenize("SELECT 1; /* open", Dialect::Postgres).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1].as_ref().unwrap_err().reason,
            "unterminated block comment"
        );
    }
}
