//! Inline contract markup
//!
//! By-value contracts never get a descriptor element of their own; wherever
//! they are used they are written as a short markup string:
//!
//! ```text
//! #Enum0                        reference to a by-reference node
//! i32, string, bytes, ...       primitives
//! {empty}
//! {nullable <markup>}
//! {list <markup>}
//! {dictionary <markup> <markup>}
//! ```

use std::fmt;
use std::iter::Peekable;
use std::vec::IntoIter;

use crate::error::{ContractError, Result};
use crate::types::PrimitiveType;

/// Parsed markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// `#Id`
    Ref(String),
    Primitive(PrimitiveType),
    Empty,
    Nullable(Box<Markup>),
    List(Box<Markup>),
    Dictionary(Box<Markup>, Box<Markup>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Word(&'a str),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in input.char_indices() {
        if c == '{' || c == '}' || c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token::Word(&input[s..i]));
            }
            match c {
                '{' => tokens.push(Token::Open),
                '}' => tokens.push(Token::Close),
                _ => {}
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Word(&input[s..]));
    }
    tokens
}

struct Parser<'a> {
    input: &'a str,
    tokens: Peekable<IntoIter<Token<'a>>>,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> ContractError {
        ContractError::markup(self.input, reason)
    }

    fn node(&mut self) -> Result<Markup> {
        match self.tokens.next() {
            Some(Token::Word(word)) => self.word(word),
            Some(Token::Open) => {
                let markup = match self.tokens.next() {
                    Some(Token::Word("empty")) => Markup::Empty,
                    Some(Token::Word("nullable")) => Markup::Nullable(Box::new(self.node()?)),
                    Some(Token::Word("list")) => Markup::List(Box::new(self.node()?)),
                    Some(Token::Word("dictionary")) => {
                        let key = self.node()?;
                        let value = self.node()?;
                        Markup::Dictionary(Box::new(key), Box::new(value))
                    }
                    Some(Token::Word(other)) => return Err(self.error(format!("unknown form '{}'", other))),
                    _ => return Err(self.error("expected a form name after '{'")),
                };
                match self.tokens.next() {
                    Some(Token::Close) => Ok(markup),
                    _ => Err(self.error("expected '}'")),
                }
            }
            Some(Token::Close) => Err(self.error("unexpected '}'")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn word(&self, word: &str) -> Result<Markup> {
        if let Some(id) = word.strip_prefix('#') {
            if id.is_empty() {
                return Err(self.error("empty reference"));
            }
            return Ok(Markup::Ref(id.to_string()));
        }
        PrimitiveType::from_name(word)
            .map(Markup::Primitive)
            .ok_or_else(|| self.error(format!("unknown primitive '{}'", word)))
    }
}

impl Markup {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            input,
            tokens: tokenize(input).into_iter().peekable(),
        };
        let markup = parser.node()?;
        if parser.tokens.peek().is_some() {
            return Err(parser.error("trailing input"));
        }
        Ok(markup)
    }

    /// Descriptor ids referenced anywhere inside this markup
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Markup::Ref(id) => refs.push(id.as_str()),
            Markup::Primitive(_) | Markup::Empty => {}
            Markup::Nullable(inner) | Markup::List(inner) => inner.collect_references(refs),
            Markup::Dictionary(key, value) => {
                key.collect_references(refs);
                value.collect_references(refs);
            }
        }
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Ref(id) => write!(f, "#{}", id),
            Markup::Primitive(p) => write!(f, "{}", p.name()),
            Markup::Empty => f.write_str("{empty}"),
            Markup::Nullable(inner) => write!(f, "{{nullable {}}}", inner),
            Markup::List(item) => write!(f, "{{list {}}}", item),
            Markup::Dictionary(key, value) => write!(f, "{{dictionary {} {}}}", key, value),
        }
    }
}
