//! Parser for boolean domain expressions.
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! expression := clause (AND clause)*
//! clause     := '(' expression ')'
//!             | IDENT op literal
//!             | IDENT [NOT] IN '(' literal (',' literal)* ')'
//!             | IDENT BETWEEN literal AND literal
//!             | IDENT IS [NOT] NULL
//! op         := '==' | '=' | '!=' | '<>' | '<' | '<=' | '>' | '>='
//! ```
//!
//! Parsing is all-or-nothing: any malformed fragment fails the whole
//! expression with `InvalidDomain`, so a filter is never partially applied.

use super::predicate::{DomainExpression, Literal, Operand, Operator, Predicate};
use crate::error::{EstimationError, Result};
use regex::Regex;
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        \A\s*(?:
            (?P<num>-?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)
          | (?P<str>'(?:[^']|'')*'|"[^"]*")
          | (?P<ident>[A-Za-z_][A-Za-z0-9_]*)
          | (?P<op>==|!=|<>|<=|>=|=|<|>)
          | (?P<punct>[(),])
        )"#,
    )
    .expect("domain token pattern is valid")
});

/// Longest fragment quoted back in error messages
const FRAGMENT_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(Literal),
    Text(String),
    Ident(String),
    Keyword(Keyword),
    Op(Operator),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    And,
    Or,
    In,
    Not,
    Between,
    Is,
    Null,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

/// Parse a domain expression into a conjunction of predicates
pub fn parse_expression(input: &str) -> Result<DomainExpression> {
    if input.trim().is_empty() {
        return Ok(DomainExpression::empty());
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        position: 0,
    };
    let predicates = parser.expression()?;

    if let Some(token) = parser.peek() {
        return Err(parser.error_at(token.offset, "unexpected trailing input"));
    }
    Ok(DomainExpression::new(predicates))
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < input.len() {
        let rest = &input[offset..];
        if rest.trim().is_empty() {
            break;
        }

        let start = offset + (rest.len() - rest.trim_start().len());
        let captures = TOKEN_PATTERN.captures(rest).ok_or_else(|| {
            EstimationError::invalid_domain(fragment_at(input, start), "unrecognised token")
        })?;
        let whole = captures.get(0).map_or(0, |m| m.end());

        let kind = if let Some(m) = captures.name("num") {
            TokenKind::Number(parse_number(m.as_str(), input, start)?)
        } else if let Some(m) = captures.name("str") {
            TokenKind::Text(unquote(m.as_str()))
        } else if let Some(m) = captures.name("ident") {
            match m.as_str().to_uppercase().as_str() {
                "AND" => TokenKind::Keyword(Keyword::And),
                "OR" => TokenKind::Keyword(Keyword::Or),
                "IN" => TokenKind::Keyword(Keyword::In),
                "NOT" => TokenKind::Keyword(Keyword::Not),
                "BETWEEN" => TokenKind::Keyword(Keyword::Between),
                "IS" => TokenKind::Keyword(Keyword::Is),
                "NULL" => TokenKind::Keyword(Keyword::Null),
                _ => TokenKind::Ident(m.as_str().to_string()),
            }
        } else if let Some(m) = captures.name("op") {
            TokenKind::Op(match m.as_str() {
                "==" | "=" => Operator::Eq,
                "!=" | "<>" => Operator::NotEq,
                "<" => Operator::Lt,
                "<=" => Operator::LtEq,
                ">" => Operator::Gt,
                _ => Operator::GtEq,
            })
        } else {
            match captures.name("punct").map(|m| m.as_str()) {
                Some("(") => TokenKind::LParen,
                Some(")") => TokenKind::RParen,
                _ => TokenKind::Comma,
            }
        };

        tokens.push(Token {
            kind,
            offset: start,
        });
        offset += whole;
    }

    Ok(tokens)
}

fn parse_number(text: &str, input: &str, offset: usize) -> Result<Literal> {
    let is_float = text.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(value) = text.parse::<i64>() {
            return Ok(Literal::Int(value));
        }
    }
    text.parse::<f64>()
        .map(Literal::Float)
        .map_err(|_| EstimationError::invalid_domain(fragment_at(input, offset), "invalid number"))
}

fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    if text.starts_with('\'') {
        inner.replace("''", "'")
    } else {
        inner.to_string()
    }
}

fn fragment_at(input: &str, offset: usize) -> String {
    let rest = input.get(offset..).unwrap_or("").trim();
    if rest.is_empty() {
        return "<end of expression>".to_string();
    }
    rest.chars().take(FRAGMENT_CHARS).collect()
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn end_offset(&self) -> usize {
        self.input.len()
    }

    fn error_at(&self, offset: usize, reason: &str) -> EstimationError {
        EstimationError::invalid_domain(fragment_at(self.input, offset), reason)
    }

    fn expect_next(&mut self, reason: &str) -> Result<Token> {
        let offset = self.end_offset();
        self.next().ok_or_else(|| self.error_at(offset, reason))
    }

    fn expression(&mut self) -> Result<Vec<Predicate>> {
        let mut predicates = self.clause()?;
        loop {
            match self.peek().map(|t| (t.kind.clone(), t.offset)) {
                Some((TokenKind::Keyword(Keyword::And), _)) => {
                    self.position += 1;
                    predicates.extend(self.clause()?);
                }
                Some((TokenKind::Keyword(Keyword::Or), offset)) => {
                    return Err(self.error_at(offset, "disjunction (OR) is not supported"));
                }
                _ => return Ok(predicates),
            }
        }
    }

    fn clause(&mut self) -> Result<Vec<Predicate>> {
        let token = self.expect_next("expected a column name")?;
        let column = match token.kind {
            TokenKind::LParen => {
                let inner = self.expression()?;
                let close = self.expect_next("missing closing parenthesis")?;
                if close.kind != TokenKind::RParen {
                    return Err(self.error_at(close.offset, "expected ')'"));
                }
                return Ok(inner);
            }
            TokenKind::Ident(name) => name,
            _ => return Err(self.error_at(token.offset, "expected a column name")),
        };

        let op_token = self.expect_next("expected an operator")?;
        let predicate = match op_token.kind {
            TokenKind::Op(operator) => {
                let value = self.literal()?;
                Predicate::new(column, operator, Operand::Scalar(value))
            }
            TokenKind::Keyword(Keyword::In) => {
                Predicate::new(column, Operator::In, Operand::List(self.literal_list()?))
            }
            TokenKind::Keyword(Keyword::Not) => {
                let next = self.expect_next("expected IN after NOT")?;
                if next.kind != TokenKind::Keyword(Keyword::In) {
                    return Err(self.error_at(next.offset, "expected IN after NOT"));
                }
                Predicate::new(column, Operator::NotIn, Operand::List(self.literal_list()?))
            }
            TokenKind::Keyword(Keyword::Between) => {
                let low = self.literal()?;
                let and = self.expect_next("expected AND in BETWEEN")?;
                if and.kind != TokenKind::Keyword(Keyword::And) {
                    return Err(self.error_at(and.offset, "expected AND in BETWEEN"));
                }
                let high = self.literal()?;
                Predicate::new(column, Operator::Between, Operand::Range(low, high))
            }
            TokenKind::Keyword(Keyword::Is) => {
                let mut next = self.expect_next("expected NULL after IS")?;
                let negated = next.kind == TokenKind::Keyword(Keyword::Not);
                if negated {
                    next = self.expect_next("expected NULL after IS NOT")?;
                }
                if next.kind != TokenKind::Keyword(Keyword::Null) {
                    return Err(self.error_at(next.offset, "expected NULL"));
                }
                let operator = if negated {
                    Operator::IsNotNull
                } else {
                    Operator::IsNull
                };
                Predicate::new(column, operator, Operand::None)
            }
            _ => return Err(self.error_at(op_token.offset, "expected an operator")),
        };

        Ok(vec![predicate])
    }

    fn literal(&mut self) -> Result<Literal> {
        let token = self.expect_next("expected a value")?;
        match token.kind {
            TokenKind::Number(value) => Ok(value),
            TokenKind::Text(text) => Ok(Literal::Text(text)),
            _ => Err(self.error_at(token.offset, "expected a number or quoted string")),
        }
    }

    fn literal_list(&mut self) -> Result<Vec<Literal>> {
        let open = self.expect_next("expected '(' after IN")?;
        if open.kind != TokenKind::LParen {
            return Err(self.error_at(open.offset, "expected '(' after IN"));
        }

        let mut values = vec![self.literal()?];
        loop {
            let token = self.expect_next("missing closing parenthesis")?;
            match token.kind {
                TokenKind::Comma => values.push(self.literal()?),
                TokenKind::RParen => return Ok(values),
                _ => return Err(self.error_at(token.offset, "expected ',' or ')'")),
            }
        }
    }
}
