//! Suite qualifier expressions
//!
//! Boolean expressions over a test's name and labels, e.g.
//! `test.Name.Contains("[Serial]") && !test.Labels.Contains("Slow")`.
//!
//! Grammar (`&&` binds tighter than `||`):
//!
//! ```text
//! expr    := and ("||" and)*
//! and     := unary ("&&" unary)*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | "true" | "false" | "test" "." field "." method "(" string ")"
//! field   := "Name" | "Labels"
//! method  := "Contains" | "StartsWith" | "EndsWith"
//! ```

use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// Qualifier parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QualifierError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("expected {expected} at offset {offset}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },

    #[error("unknown field '{name}' at offset {offset}")]
    UnknownField { name: String, offset: usize },

    #[error("method '{method}' is not supported on {field} (offset {offset})")]
    UnsupportedMethod {
        field: &'static str,
        method: String,
        offset: usize,
    },
}

/// What a qualifier is evaluated against
#[derive(Clone, Copy, Debug)]
pub struct TestView<'a> {
    pub name: &'a str,
    pub labels: &'a BTreeSet<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StrMethod {
    Contains,
    StartsWith,
    EndsWith,
}

/// Parsed qualifier expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Qualifier {
    Literal(bool),
    Name(StrMethodArg),
    HasLabel(String),
    Not(Box<Qualifier>),
    And(Box<Qualifier>, Box<Qualifier>),
    Or(Box<Qualifier>, Box<Qualifier>),
}

/// A string method applied to the test name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrMethodArg {
    method: StrMethod,
    arg: String,
}

impl Qualifier {
    pub fn parse(input: &str) -> Result<Self, QualifierError> {
        let tokens = lex(input)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: input.len(),
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some((tok, offset)) => Err(QualifierError::Expected {
                expected: "end of expression",
                found: tok.describe(),
                offset,
            }),
        }
    }

    pub fn matches(&self, test: &TestView<'_>) -> bool {
        match self {
            Qualifier::Literal(value) => *value,
            Qualifier::Name(StrMethodArg { method, arg }) => match method {
                StrMethod::Contains => test.name.contains(arg.as_str()),
                StrMethod::StartsWith => test.name.starts_with(arg.as_str()),
                StrMethod::EndsWith => test.name.ends_with(arg.as_str()),
            },
            Qualifier::HasLabel(label) => test.labels.contains(label),
            Qualifier::Not(inner) => !inner.matches(test),
            Qualifier::And(lhs, rhs) => lhs.matches(test) && rhs.matches(test),
            Qualifier::Or(lhs, rhs) => lhs.matches(test) || rhs.matches(test),
        }
    }
}

impl FromStr for Qualifier {
    type Err = QualifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Dot,
    LParen,
    RParen,
    And,
    Or,
    Not,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{name}'"),
            Token::Str(s) => format!("\"{s}\""),
            Token::Dot => "'.'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
            Token::Not => "'!'".to_string(),
        }
    }
}

fn lex(input: &str) -> Result<Vec<(Token, usize)>, QualifierError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '.' => Token::Dot,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '!' => Token::Not,
            '&' | '|' => match chars.peek() {
                Some((_, next)) if *next == ch => {
                    chars.next();
                    if ch == '&' {
                        Token::And
                    } else {
                        Token::Or
                    }
                }
                _ => return Err(QualifierError::UnexpectedChar { ch, offset }),
            },
            '"' => {
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(QualifierError::UnterminatedString { offset });
                }
                Token::Str(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some((_, next)) = chars.peek() {
                    if next.is_alphanumeric() || *next == '_' {
                        ident.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(ident)
            }
            other => return Err(QualifierError::UnexpectedChar { ch: other, offset }),
        };
        tokens.push((token, offset));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<(Token, usize)> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, want: Token, expected: &'static str) -> Result<usize, QualifierError> {
        match self.advance() {
            Some((tok, offset)) if tok == want => Ok(offset),
            other => Err(self.unexpected(expected, other)),
        }
    }

    fn unexpected(&self, expected: &'static str, found: Option<(Token, usize)>) -> QualifierError {
        match found {
            Some((tok, offset)) => QualifierError::Expected {
                expected,
                found: tok.describe(),
                offset,
            },
            None => QualifierError::Expected {
                expected,
                found: "end of expression".to_string(),
                offset: self.end,
            },
        }
    }

    fn expr(&mut self) -> Result<Qualifier, QualifierError> {
        let mut lhs = self.and()?;
        while matches!(self.peek(), Some((Token::Or, _))) {
            self.advance();
            let rhs = self.and()?;
            lhs = Qualifier::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Qualifier, QualifierError> {
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some((Token::And, _))) {
            self.advance();
            let rhs = self.unary()?;
            lhs = Qualifier::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Qualifier, QualifierError> {
        if matches!(self.peek(), Some((Token::Not, _))) {
            self.advance();
            return Ok(Qualifier::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Qualifier, QualifierError> {
        match self.advance() {
            Some((Token::LParen, _)) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some((Token::Ident(ident), offset)) => match ident.as_str() {
                "true" => Ok(Qualifier::Literal(true)),
                "false" => Ok(Qualifier::Literal(false)),
                "test" => self.member(),
                _ => Err(QualifierError::UnknownField { name: ident, offset }),
            },
            other => Err(self.unexpected("expression", other)),
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<(String, usize), QualifierError> {
        match self.advance() {
            Some((Token::Ident(name), offset)) => Ok((name, offset)),
            other => Err(self.unexpected(expected, other)),
        }
    }

    fn member(&mut self) -> Result<Qualifier, QualifierError> {
        self.expect(Token::Dot, "'.'")?;
        let (field, field_offset) = self.ident("field name")?;
        self.expect(Token::Dot, "'.'")?;
        let (method, method_offset) = self.ident("method name")?;
        self.expect(Token::LParen, "'('")?;
        let arg = match self.advance() {
            Some((Token::Str(s), _)) => s,
            other => return Err(self.unexpected("string literal", other)),
        };
        self.expect(Token::RParen, "')'")?;

        match field.as_str() {
            "Name" | "name" => {
                let method = match method.as_str() {
                    "Contains" | "contains" => StrMethod::Contains,
                    "StartsWith" | "startsWith" => StrMethod::StartsWith,
                    "EndsWith" | "endsWith" => StrMethod::EndsWith,
                    _ => {
                        return Err(QualifierError::UnsupportedMethod {
                            field: "Name",
                            method,
                            offset: method_offset,
                        })
                    }
                };
                Ok(Qualifier::Name(StrMethodArg { method, arg }))
            }
            "Labels" | "labels" => match method.as_str() {
                "Contains" | "contains" => Ok(Qualifier::HasLabel(arg)),
                _ => Err(QualifierError::UnsupportedMethod {
                    field: "Labels",
                    method,
                    offset: method_offset,
                }),
            },
            _ => Err(QualifierError::UnknownField {
                name: field,
                offset: field_offset,
            }),
        }
    }
}
