//! Token stream and cursor used by the DDL parsers.
//!
//! Statements arrive with comments already removed by the tokenizer; the lexer
//! here only needs to separate words, quoted identifiers, literals and symbols.
//! Lexing never fails: an unterminated quote simply runs to the end.

use std::ops::Range;

use crate::dialect::Dialect;
use crate::model::QualifiedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Word,
    Quoted,
    Str,
    Number,
    Symbol,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

const TWO_CHAR_SYMBOLS: &[&[u8; 2]] = &[b"::", b"<=", b">=", b"<>", b"!=", b"||", b"=>", b":="];

pub(crate) fn lex(text: &str, dialect: Dialect) -> Vec<Token> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        let start = i;
        let kind = match b {
            _ if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match find(bytes, i + 2, b"*/") {
                    Some(p) => p + 2,
                    None => len,
                };
                continue;
            }
            b'\'' => {
                let escape = dialect.backslash_escapes()
                    || (i > 0 && matches!(bytes[i - 1], b'E' | b'e'));
                i = close_quote(bytes, i, b'\'', escape);
                TokenKind::Str
            }
            b'"' | b'`' => {
                i = close_quote(bytes, i, b, false);
                TokenKind::Quoted
            }
            b'[' if dialect.bracket_identifiers() => {
                i = close_quote(bytes, i, b']', false);
                TokenKind::Quoted
            }
            b'$' if dialect.dollar_quotes() => match dollar_tag(bytes, i) {
                Some(tag_end) => {
                    let tag = &bytes[i..tag_end];
                    i = match find(bytes, tag_end, tag) {
                        Some(p) => p + tag.len(),
                        None => len,
                    };
                    TokenKind::Str
                }
                None => {
                    i += 1;
                    while i < len && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    TokenKind::Symbol
                }
            },
            _ if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(|c| c.is_ascii_digit())) => {
                i += 1;
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    i += 1;
                }
                TokenKind::Number
            }
            _ if b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 => {
                // E'...' and N'...' prefixes belong to the literal that follows.
                if matches!(b, b'E' | b'e' | b'N' | b'n' | b'X' | b'x' | b'B' | b'b')
                    && bytes.get(i + 1) == Some(&b'\'')
                {
                    i += 1;
                    continue;
                }
                while i < len
                    && (bytes[i].is_ascii_alphanumeric()
                        || bytes[i] == b'_'
                        || bytes[i] == b'$'
                        || bytes[i] == b'#'
                        || bytes[i] >= 0x80)
                {
                    i += 1;
                }
                TokenKind::Word
            }
            _ => {
                if i + 1 < len && TWO_CHAR_SYMBOLS.iter().any(|s| s[0] == b && s[1] == bytes[i + 1]) {
                    i += 2;
                } else {
                    i += 1;
                    // keep multi-byte characters whole
                    while i < len && !text.is_char_boundary(i) {
                        i += 1;
                    }
                }
                TokenKind::Symbol
            }
        };
        tokens.push(Token { kind, start, end: i });
    }
    tokens
}

fn close_quote(bytes: &[u8], start: usize, close: u8, backslash: bool) -> usize {
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
            return i + 1;
        }
        i += 1;
    }
    len
}

fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if i < bytes.len() && bytes[i].is_ascii_digit() {
        return None;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    (i < bytes.len() && bytes[i] == b'$').then_some(i + 1)
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Read position over a token list.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    pub dialect: Dialect,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str, dialect: Dialect) -> Self {
        Self {
            text,
            tokens: lex(text, dialect),
            pos: 0,
            dialect,
        }
    }

    fn sub(&self, range: Range<usize>) -> Cursor<'a> {
        Cursor {
            text: self.text,
            tokens: self.tokens[range].to_vec(),
            pos: 0,
            dialect: self.dialect,
        }
    }

    /// Full statement text the tokens index into.
    pub fn source(&self) -> &'a str {
        self.text
    }

    /// End offset of the most recently consumed token.
    pub fn last_end(&self) -> Option<usize> {
        self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)).map(|t| t.end)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).copied()
    }

    pub fn slice(&self, token: Token) -> &'a str {
        &self.text[token.start..token.end]
    }

    pub fn advance(&mut self) -> Option<Token> {
        let token = self.peek_at(0)?;
        self.pos += 1;
        Some(token)
    }

    /// Text of the next token, whatever its kind.
    pub fn peek_text(&self) -> Option<&'a str> {
        self.peek_at(0).map(|t| self.slice(t))
    }

    pub fn word_at(&self, n: usize) -> Option<&'a str> {
        self.peek_at(n)
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| self.slice(t))
    }

    pub fn peek_keyword(&self, keyword: &str) -> bool {
        self.word_at(0)
            .is_some_and(|w| w.eq_ignore_ascii_case(keyword))
    }

    pub fn peek_keywords(&self, keywords: &[&str]) -> bool {
        keywords.iter().enumerate().all(|(n, kw)| {
            self.word_at(n)
                .is_some_and(|w| w.eq_ignore_ascii_case(kw))
        })
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a keyword sequence, all or nothing.
    pub fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        if self.peek_keywords(keywords) {
            self.pos += keywords.len();
            true
        } else {
            false
        }
    }

    /// Consume one of `keywords`, returning it upper-cased.
    pub fn eat_one_of(&mut self, keywords: &[&str]) -> Option<String> {
        let word = self.word_at(0)?;
        let hit = keywords.iter().find(|kw| word.eq_ignore_ascii_case(kw))?;
        self.pos += 1;
        Some(hit.to_uppercase())
    }

    pub fn peek_symbol(&self, symbol: &str) -> bool {
        self.peek_at(0)
            .is_some_and(|t| t.kind == TokenKind::Symbol && self.slice(t) == symbol)
    }

    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.peek_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Next word upper-cased, without consuming it.
    pub fn peek_upper(&self) -> Option<String> {
        self.word_at(0).map(|w| w.to_uppercase())
    }

    /// Consume an identifier (word or quoted), normalized for the dialect.
    pub fn ident(&mut self) -> Option<String> {
        let token = self.peek_at(0)?;
        match token.kind {
            TokenKind::Word | TokenKind::Quoted => {
                self.pos += 1;
                Some(self.dialect.normalize_ident(self.slice(token)))
            }
            _ => None,
        }
    }

    /// Consume `[catalog.][schema.]name`.
    ///
    /// The dialect's default schema is dropped so that written and implied
    /// qualifiers compare equal.
    pub fn qualified_name(&mut self) -> Option<QualifiedName> {
        let mut parts = vec![self.ident()?];
        while self.peek_symbol(".") {
            self.pos += 1;
            match self.ident() {
                Some(part) => parts.push(part),
                None => break,
            }
        }
        let name = parts.pop()?;
        let schema = parts
            .pop()
            .filter(|s| Some(s.as_str()) != self.dialect.default_schema());
        Some(QualifiedName::new(schema, name))
    }

    /// Index of the `)` matching the `(` at token index `open`.
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            if token.kind != TokenKind::Symbol {
                continue;
            }
            match self.slice(*token) {
                "(" => depth += 1,
                ")" => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Consume a parenthesized group, returning a cursor over its contents.
    /// An unbalanced group runs to the end of the statement.
    pub fn group(&mut self) -> Option<Cursor<'a>> {
        if !self.peek_symbol("(") {
            return None;
        }
        let open = self.pos;
        let close = self.matching_close(open).unwrap_or(self.tokens.len());
        self.pos = (close + 1).min(self.tokens.len());
        Some(self.sub(open + 1..close))
    }

    /// Consume a parenthesized group, returning its inner text.
    pub fn group_text(&mut self) -> Option<&'a str> {
        self.group().map(|g| g.rest_text())
    }

    /// Remaining tokens split on top-level commas.
    pub fn split_commas(&self) -> Vec<Cursor<'a>> {
        let mut parts = Vec::new();
        let mut depth = 0i32;
        let mut start = self.pos;
        for idx in self.pos..self.tokens.len() {
            let token = self.tokens[idx];
            if token.kind != TokenKind::Symbol {
                continue;
            }
            match self.slice(token) {
                "(" | "[" => depth += 1,
                ")" | "]" => depth -= 1,
                "," if depth == 0 => {
                    parts.push(self.sub(start..idx));
                    start = idx + 1;
                }
                _ => {}
            }
        }
        if start < self.tokens.len() {
            parts.push(self.sub(start..self.tokens.len()));
        }
        parts
    }

    /// Source text of the remaining tokens.
    pub fn rest_text(&self) -> &'a str {
        self.text_between(self.pos, self.tokens.len())
    }

    /// Consume everything, returning its source text.
    pub fn take_rest(&mut self) -> &'a str {
        let text = self.rest_text();
        self.pos = self.tokens.len();
        text
    }

    fn text_between(&self, from: usize, to: usize) -> &'a str {
        if from >= to || from >= self.tokens.len() {
            return "";
        }
        &self.text[self.tokens[from].start..self.tokens[to - 1].end]
    }

    /// Consume tokens up to (not including) a top-level word in `stops` or a
    /// top-level comma, returning their source text.
    pub fn take_until(&mut self, stops: &[&str]) -> &'a str {
        let from = self.pos;
        while let Some(token) = self.peek_at(0) {
            if token.kind == TokenKind::Symbol {
                match self.slice(token) {
                    "(" => {
                        self.group();
                        continue;
                    }
                    "::" => {
                        self.pos += 1;
                        self.skip_cast_type();
                        continue;
                    }
                    "," => break,
                    _ => {}
                }
            }
            if token.kind == TokenKind::Word
                && stops.iter().any(|s| self.slice(token).eq_ignore_ascii_case(s))
            {
                break;
            }
            self.pos += 1;
        }
        self.text_between(from, self.pos)
    }

    /// Cast target after `::`; its words never end a clause.
    fn skip_cast_type(&mut self) {
        if self
            .peek_at(0)
            .is_some_and(|t| matches!(t.kind, TokenKind::Word | TokenKind::Quoted))
        {
            self.pos += 1;
        }
        while self
            .word_at(0)
            .is_some_and(|w| CAST_TYPE_CONTINUATIONS.iter().any(|c| w.eq_ignore_ascii_case(c)))
        {
            self.pos += 1;
        }
        if self.peek_symbol("(") {
            self.group();
        }
    }

    /// Consume a single token or, if one starts here, a parenthesized group.
    pub fn take_value(&mut self) -> Option<&'a str> {
        if self.peek_symbol("(") {
            let from = self.pos;
            self.group();
            return Some(self.text_between(from, self.pos));
        }
        self.advance().map(|t| self.slice(t))
    }
}

// ── text canonicalization ──

fn is_tight_before(symbol: &str) -> bool {
    matches!(symbol, ")" | "," | "." | "(" | "::" | "]" | "[")
}

fn is_tight_after(symbol: &str) -> bool {
    matches!(symbol, "(" | "." | "::" | "[")
}

fn render(text: &str, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;
    for token in tokens {
        let raw = &text[token.start..token.end];
        let piece = match token.kind {
            TokenKind::Word => raw.to_lowercase(),
            _ => raw.to_string(),
        };
        if let Some(p) = prev {
            let tight = (token.kind == TokenKind::Symbol && is_tight_before(raw))
                || is_tight_after(p);
            if !tight {
                out.push(' ');
            }
        }
        out.push_str(&piece);
        prev = Some(if token.kind == TokenKind::Symbol { raw } else { "" });
    }
    out
}

/// Whitespace- and case-normalized SQL text. String literals and quoted
/// identifiers are kept verbatim.
pub(crate) fn canonical_sql(text: &str, dialect: Dialect) -> String {
    render(text, &lex(text, dialect))
}

const CAST_TYPE_CONTINUATIONS: &[&str] = &["VARYING", "PRECISION", "WITH", "WITHOUT", "TIME", "ZONE"];

/// [`canonical_sql`] for expressions: also drops PostgreSQL `::type` casts,
/// parentheses around single operands and parentheses around the whole
/// expression, so catalog-rendered and hand-written forms agree.
pub(crate) fn canonical_expr(text: &str, dialect: Dialect) -> String {
    let tokens = lex(text, dialect);
    let sym = |t: &Token| t.kind == TokenKind::Symbol;
    let raw = |t: &Token| &text[t.start..t.end];

    // drop casts
    let mut kept: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if sym(&token) && raw(&token) == "::" {
            i += 1;
            if i < tokens.len() && matches!(tokens[i].kind, TokenKind::Word | TokenKind::Quoted) {
                i += 1;
                while i < tokens.len()
                    && tokens[i].kind == TokenKind::Word
                    && CAST_TYPE_CONTINUATIONS
                        .iter()
                        .any(|c| raw(&tokens[i]).eq_ignore_ascii_case(c))
                {
                    i += 1;
                }
                if i < tokens.len() && sym(&tokens[i]) && raw(&tokens[i]) == "(" {
                    let mut depth = 0;
                    while i < tokens.len() {
                        if sym(&tokens[i]) {
                            match raw(&tokens[i]) {
                                "(" => depth += 1,
                                ")" => depth -= 1,
                                _ => {}
                            }
                        }
                        i += 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                while i + 1 < tokens.len() && raw(&tokens[i]) == "[" && raw(&tokens[i + 1]) == "]" {
                    i += 2;
                }
            }
            continue;
        }
        kept.push(token);
        i += 1;
    }

    // `(x)` around a single operand, unless it is a call's argument list
    let mut changed = true;
    while changed {
        changed = false;
        let mut j = 0;
        while j + 2 < kept.len() {
            let is_group = sym(&kept[j])
                && raw(&kept[j]) == "("
                && !sym(&kept[j + 1])
                && sym(&kept[j + 2])
                && raw(&kept[j + 2]) == ")";
            let is_call = j > 0 && matches!(kept[j - 1].kind, TokenKind::Word | TokenKind::Quoted);
            if is_group && !is_call {
                kept.remove(j + 2);
                kept.remove(j);
                changed = true;
            } else {
                j += 1;
            }
        }
    }

    // outer parentheses
    loop {
        if kept.len() < 2 || !(sym(&kept[0]) && raw(&kept[0]) == "(") {
            break;
        }
        let mut depth = 0i32;
        let mut closes_at = None;
        for (idx, t) in kept.iter().enumerate() {
            if sym(t) {
                match raw(t) {
                    "(" => depth += 1,
                    ")" => {
                        depth -= 1;
                        if depth == 0 {
                            closes_at = Some(idx);
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        if closes_at == Some(kept.len() - 1) {
            kept.pop();
            kept.remove(0);
        } else {
            break;
        }
    }

    render(text, &kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_kinds() {
        let text = "CREATE TABLE \"T\" (a numeric(10,2) DEFAULT 'x''y')";
        let kinds: Vec<TokenKind> = lex(text, Dialect::Postgres).iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Word);
        assert_eq!(kinds[2], TokenKind::Quoted);
        assert_eq!(*kinds.last().unwrap(), TokenKind::Symbol);
        assert!(kinds.contains(&TokenKind::Str));
        assert!(kinds.contains(&TokenKind::Number));
    }

    #[test]
    fn test_qualified_name_drops_default_schema() {
        let mut cur = Cursor::new("public.Users", Dialect::Postgres);
        assert_eq!(cur.qualified_name(), Some(QualifiedName::unqualified("users")));

        let mut cur = Cursor::new("app.\"Users\"", Dialect::Postgres);
        assert_eq!(
            cur.qualified_name(),
            Some(QualifiedName::new(Some("app".to_string()), "Users"))
        );
    }

    #[test]
    fn test_group_and_split_commas() {
        let mut cur = Cursor::new("(a int, b numeric(10, 2), c text) rest", Dialect::Postgres);
        let inner = cur.group().unwrap();
        let parts: Vec<String> = inner.split_commas().iter().map(|p| p.rest_text().to_string()).collect();
        assert_eq!(parts, vec!["a int", "b numeric(10, 2)", "c text"]);
        assert!(cur.peek_keyword("rest"));
    }

    #[test]
    fn test_take_until_stops_at_keyword_outside_parens() {
        let mut cur = Cursor::new("coalesce(a, 'NOT') NOT NULL", Dialect::Postgres);
        assert_eq!(cur.take_until(&["NOT", "NULL"]), "coalesce(a, 'NOT')");
        assert!(cur.peek_keywords(&["NOT", "NULL"]));

        let mut cur = Cursor::new("'a'::character varying NOT NULL", Dialect::Postgres);
        assert_eq!(cur.take_until(&["NOT", "CHARACTER"]), "'a'::character varying");
    }

    #[test]
    fn test_canonical_sql_spacing_and_case() {
        assert_eq!(
            canonical_sql("SELECT  id ,Name\n FROM Users WHERE x = 'A'", Dialect::Postgres),
            "select id, name from users where x = 'A'"
        );
        assert_eq!(canonical_sql("COUNT( * )", Dialect::Postgres), "count(*)");
    }

    #[test]
    fn test_canonical_expr_strips_casts_and_parens() {
        assert_eq!(
            canonical_expr("'active'::character varying", Dialect::Postgres),
            "'active'"
        );
        assert_eq!(
            canonical_expr("((price > (0)::numeric))", Dialect::Postgres),
            "price > 0"
        );
        assert_eq!(canonical_expr("price > 0", Dialect::Postgres), "price > 0");
        assert_eq!(canonical_expr("(now())", Dialect::Postgres), "now()");
        assert_eq!(canonical_expr("NOW()", Dialect::Postgres), "now()");
    }
}
