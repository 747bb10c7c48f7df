//! # GQL Parser
//!
//! Parses the GQL subset rendered by [`Grammar`](crate::query::Grammar) so
//! the in-memory store can execute it:
//!
//! ```text
//! SELECT (* | name, ...) FROM name
//!   [WHERE name op value ((AND | OR) name op value)*]
//!   [ORDER BY name [ASC | DESC], ...]
//!   [LIMIT int] [OFFSET int]
//! ```
//!
//! Values: strings, numbers, `TRUE`/`FALSE`/`NULL`, `KEY(kind, id, ...)`,
//! `DATETIME('rfc3339')` and `ARRAY(value, ...)`. Keywords are
//! case-insensitive; back-quoted names are never keywords.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

use crate::key::KeyId;
use crate::query::{Operator, SortDirection, SortSpec};

use super::errors::{StoreError, StoreResult};

/// Right-hand side of a parsed condition
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Value(Value),
    Timestamp(DateTime<Utc>),
    /// Key path, ancestors first
    Key(Vec<(String, KeyId)>),
}

/// A single `field op value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Literal,
}

/// Parsed query
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// Empty means `*`
    pub projection: Vec<String>,
    pub kind: String,
    /// Disjunction of conjunctions; AND binds tighter than OR.
    /// Empty means no filter.
    pub filter: Vec<Vec<Condition>>,
    pub orders: Vec<SortSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ParsedQuery {
    /// Returns true if the query embeds literal values
    pub fn has_literals(&self) -> bool {
        !self.filter.is_empty()
    }
}

/// Parses a GQL query string
pub fn parse(text: &str) -> StoreResult<ParsedQuery> {
    let tokens = tokenize(text)?;
    Parser { tokens, pos: 0 }.parse_query()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Bare word: identifier or keyword
    Word(String),
    /// Back-quoted name
    Quoted(String),
    Str(String),
    Number(Number),
    Op(Operator),
    Comma,
    LParen,
    RParen,
    Star,
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidQuery(msg.into())
}

fn tokenize(text: &str) -> StoreResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '\'' | '"' | '`' => {
                let (s, next) = read_quoted(&chars, i)?;
                tokens.push(if c == '`' { Token::Quoted(s) } else { Token::Str(s) });
                i = next;
            }
            '=' | '<' | '>' | '!' => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let (op, len) = match two.as_str() {
                    "<=" => (Operator::Lte, 2),
                    ">=" => (Operator::Gte, 2),
                    "<>" => (Operator::NotEqual, 2),
                    "!=" => (Operator::Ne, 2),
                    _ => match c {
                        '=' => (Operator::Eq, 1),
                        '<' => (Operator::Lt, 1),
                        '>' => (Operator::Gt, 1),
                        _ => return Err(invalid(format!("unexpected '{}' at {}", c, i))),
                    },
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || matches!(chars[i], '.' | 'e' | 'E')
                        || (matches!(chars[i], '+' | '-') && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                tokens.push(Token::Number(parse_number(&raw)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(format!("unexpected '{}' at {}", other, i))),
        }
    }

    Ok(tokens)
}

/// Reads a quoted run starting at `start`.
///
/// A doubled quote is an escaped quote; a backslash escapes the next char.
fn read_quoted(chars: &[char], start: usize) -> StoreResult<(String, usize)> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(invalid(format!("unterminated {} literal", quote))),
            Some('\\') => match chars.get(i + 1) {
                Some(&escaped) => {
                    out.push(escaped);
                    i += 2;
                }
                None => return Err(invalid(format!("unterminated {} literal", quote))),
            },
            Some(&c) if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    out.push(quote);
                    i += 2;
                } else {
                    return Ok((out, i + 1));
                }
            }
            Some(&c) => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn parse_number(raw: &str) -> StoreResult<Number> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Number::from(n));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| invalid(format!("invalid number: {}", raw)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> StoreResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| invalid("unexpected end of query"))?;
        self.pos += 1;
        Ok(token)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> StoreResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(invalid(format!("expected {} at token {}", keyword, self.pos)))
        }
    }

    fn expect(&mut self, expected: Token) -> StoreResult<()> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(invalid(format!("expected {:?}, found {:?}", expected, token)))
        }
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_query(mut self) -> StoreResult<ParsedQuery> {
        self.expect_keyword("SELECT")?;

        let projection = if self.eat(&Token::Star) {
            Vec::new()
        } else {
            let mut fields = vec![self.parse_name()?];
            while self.eat(&Token::Comma) {
                fields.push(self.parse_name()?);
            }
            fields
        };

        self.expect_keyword("FROM")?;
        let kind = self.parse_name()?;

        let mut filter = Vec::new();
        if self.eat_keyword("WHERE") {
            let mut group = vec![self.parse_condition()?];
            loop {
                if self.eat_keyword("AND") {
                    group.push(self.parse_condition()?);
                } else if self.eat_keyword("OR") {
                    filter.push(std::mem::take(&mut group));
                    group.push(self.parse_condition()?);
                } else {
                    break;
                }
            }
            filter.push(group);
        }

        let mut orders = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let field = self.parse_name()?;
                let direction = if self.eat_keyword("DESC") {
                    SortDirection::Desc
                } else {
                    self.eat_keyword("ASC");
                    SortDirection::Asc
                };
                orders.push(SortSpec { field, direction });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.eat_keyword("LIMIT") {
            Some(self.parse_count()?)
        } else {
            None
        };
        let offset = if self.eat_keyword("OFFSET") {
            Some(self.parse_count()?)
        } else {
            None
        };

        if let Some(token) = self.peek() {
            return Err(invalid(format!("unexpected trailing token {:?}", token)));
        }

        Ok(ParsedQuery {
            projection,
            kind,
            filter,
            orders,
            limit,
            offset,
        })
    }

    fn parse_name(&mut self) -> StoreResult<String> {
        match self.next()? {
            Token::Word(w) | Token::Quoted(w) => Ok(w),
            other => Err(invalid(format!("expected name, found {:?}", other))),
        }
    }

    fn parse_count(&mut self) -> StoreResult<u64> {
        match self.next()? {
            Token::Number(n) => n
                .as_u64()
                .ok_or_else(|| invalid(format!("expected non-negative integer, found {}", n))),
            other => Err(invalid(format!("expected integer, found {:?}", other))),
        }
    }

    fn parse_condition(&mut self) -> StoreResult<Condition> {
        let field = self.parse_name()?;
        let op = match self.next()? {
            Token::Op(op) => op,
            other => return Err(invalid(format!("expected operator, found {:?}", other))),
        };
        let value = self.parse_literal()?;
        Ok(Condition { field, op, value })
    }

    fn parse_literal(&mut self) -> StoreResult<Literal> {
        if self.eat_keyword("KEY") {
            return self.parse_key().map(Literal::Key);
        }
        if self.eat_keyword("DATETIME") {
            self.expect(Token::LParen)?;
            let raw = match self.next()? {
                Token::Str(s) => s,
                other => return Err(invalid(format!("expected datetime string, found {:?}", other))),
            };
            self.expect(Token::RParen)?;
            let ts = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| invalid(format!("invalid datetime '{}': {}", raw, e)))?;
            return Ok(Literal::Timestamp(ts.with_timezone(&Utc)));
        }
        self.parse_value().map(Literal::Value)
    }

    fn parse_value(&mut self) -> StoreResult<Value> {
        if self.eat_keyword("ARRAY") {
            self.expect(Token::LParen)?;
            let mut items = Vec::new();
            if !self.eat(&Token::RParen) {
                loop {
                    items.push(self.parse_value()?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    self.expect(Token::Comma)?;
                }
            }
            return Ok(Value::Array(items));
        }
        match self.next()? {
            Token::Str(s) => Ok(Value::String(s)),
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Word(w) if w.eq_ignore_ascii_case("TRUE") => Ok(Value::Bool(true)),
            Token::Word(w) if w.eq_ignore_ascii_case("FALSE") => Ok(Value::Bool(false)),
            Token::Word(w) if w.eq_ignore_ascii_case("NULL") => Ok(Value::Null),
            other => Err(invalid(format!("expected value, found {:?}", other))),
        }
    }

    /// `(kind, id [, kind, id]*)` after the KEY keyword
    fn parse_key(&mut self) -> StoreResult<Vec<(String, KeyId)>> {
        self.expect(Token::LParen)?;
        let mut path = Vec::new();
        loop {
            let kind = self.parse_name()?;
            self.expect(Token::Comma)?;
            let id = match self.next()? {
                Token::Number(n) => n
                    .as_i64()
                    .map(KeyId::Id)
                    .ok_or_else(|| invalid(format!("invalid key id {}", n)))?,
                Token::Str(s) => KeyId::Name(s),
                other => return Err(invalid(format!("expected key id, found {:?}", other))),
            };
            path.push((kind, id));
            if self.eat(&Token::RParen) {
                return Ok(path);
            }
            self.expect(Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_select_all() {
        let q = parse("SELECT * FROM Widget").unwrap();
        assert!(q.projection.is_empty());
        assert_eq!(q.kind, "Widget");
        assert!(q.filter.is_empty());
        assert!(!q.has_literals());
    }

    #[test]
    fn test_parse_full() {
        let q = parse(
            "select name, `unit price` from Widget where price >= 2.5 and name != 'o''brien' \
             order by price desc, name limit 10 offset 3",
        )
        .unwrap();
        assert_eq!(q.projection, vec!["name", "unit price"]);
        assert_eq!(q.filter.len(), 1);
        assert_eq!(q.filter[0].len(), 2);
        assert_eq!(q.filter[0][0].op, Operator::Gte);
        assert_eq!(q.filter[0][1].value, Literal::Value(json!("o'brien")));
        assert_eq!(q.orders, vec![SortSpec::desc("price"), SortSpec::asc("name")]);
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.offset, Some(3));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let q = parse("SELECT * FROM W WHERE a = 1 AND b = 2 OR c = 3").unwrap();
        assert_eq!(q.filter.len(), 2);
        assert_eq!(q.filter[0].len(), 2);
        assert_eq!(q.filter[1].len(), 1);
        assert_eq!(q.filter[1][0].field, "c");
    }

    #[test]
    fn test_parse_key_literal() {
        let q = parse("SELECT * FROM Widget WHERE __key__ = KEY(Shelf, 'north', Widget, 7)")
            .unwrap();
        assert_eq!(
            q.filter[0][0].value,
            Literal::Key(vec![
                ("Shelf".to_string(), KeyId::Name("north".to_string())),
                ("Widget".to_string(), KeyId::Id(7)),
            ])
        );
    }

    #[test]
    fn test_parse_datetime_and_array() {
        let q = parse(
            "SELECT * FROM E WHERE at > DATETIME('2024-03-01T12:00:00Z') AND tags = ARRAY('a', -2)",
        )
        .unwrap();
        match &q.filter[0][0].value {
            Literal::Timestamp(ts) => assert_eq!(ts.to_rfc3339(), "2024-03-01T12:00:00+00:00"),
            other => panic!("expected timestamp, got {:?}", other),
        }
        assert_eq!(q.filter[0][1].value, Literal::Value(json!(["a", -2])));
    }

    #[test]
    fn test_parse_backslash_escapes() {
        let q = parse(r"SELECT * FROM `a\\b` WHERE path = 'C:\\tmp\\' AND n = 'it\'s'").unwrap();
        assert_eq!(q.kind, "a\\b");
        assert_eq!(q.filter[0][0].value, Literal::Value(json!("C:\\tmp\\")));
        assert_eq!(q.filter[0][1].value, Literal::Value(json!("it's")));
        assert!(parse(r"SELECT * FROM W WHERE a = 'x\").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("SELECT * Widget").is_err());
        assert!(parse("SELECT * FROM Widget WHERE a LIKE 'x'").is_err());
        assert!(parse("SELECT * FROM Widget WHERE a = 'open").is_err());
        assert!(parse("SELECT * FROM Widget LIMIT -1").is_err());
        assert!(parse("SELECT * FROM Widget garbage").is_err());
    }
}
