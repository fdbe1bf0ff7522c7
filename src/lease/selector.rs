//! Kubernetes label selector parsing.
//!
//! # Responsibilities
//! - Tokenize and parse selector strings such as `app=web,tier!=db,env in (a,b)`
//! - Validate label keys and values
//! - Match a label set against a parsed selector
//!
//! # Design Decisions
//! - The empty string is the match-everything selector
//! - Set values are stored sorted and deduplicated so `Display` is canonical
//! - Errors report the byte offset of the offending token

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("static regex")
});

static DNS_SUBDOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("static regex")
});

/// Errors produced while parsing a selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("invalid label key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("invalid label value {value:?}: {reason}")]
    InvalidValue { value: String, reason: &'static str },

    #[error("found {found:?} at position {position}, expected {expected}")]
    Unexpected {
        found: String,
        position: usize,
        expected: &'static str,
    },

    #[error("values for '{0}' cannot be empty")]
    EmptySet(Operator),
}

/// Relation between a label key and its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Exists => "exists",
            Operator::DoesNotExist => "!",
        };
        f.write_str(s)
    }
}

/// One clause of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
    pub values: BTreeSet<String>,
}

impl Requirement {
    /// Whether `labels` satisfies this clause.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
            Operator::Equals | Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotEquals | Operator::NotIn => !value.is_some_and(|v| self.values.contains(v)),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Exists => f.write_str(&self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
            Operator::Equals | Operator::NotEquals => {
                let value = self.values.iter().next().map(String::as_str).unwrap_or("");
                write!(f, "{}{}{}", self.key, self.operator, value)
            }
            Operator::In | Operator::NotIn => {
                let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
                write!(f, "{} {} ({})", self.key, self.operator, values.join(","))
            }
        }
    }
}

/// A parsed label selector: every requirement must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// True for the match-everything selector.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", requirement)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Identifier(&'a str),
    Comma,
    Equals,
    DoubleEquals,
    NotEquals,
    Bang,
    OpenParen,
    CloseParen,
    End,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Identifier(s) => s.to_string(),
            Token::Comma => ",".into(),
            Token::Equals => "=".into(),
            Token::DoubleEquals => "==".into(),
            Token::NotEquals => "!=".into(),
            Token::Bang => "!".into(),
            Token::OpenParen => "(".into(),
            Token::CloseParen => ")".into(),
            Token::End => "end of input".into(),
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, ',' | '=' | '!' | '(' | ')')
}

fn tokenize(input: &str) -> Vec<(Token<'_>, usize)> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match c {
            ',' => {
                chars.next();
                Token::Comma
            }
            '(' => {
                chars.next();
                Token::OpenParen
            }
            ')' => {
                chars.next();
                Token::CloseParen
            }
            '=' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::DoubleEquals
                } else {
                    Token::Equals
                }
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::NotEquals
                } else {
                    Token::Bang
                }
            }
            _ => {
                let mut end = input.len();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || is_special(c) {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                Token::Identifier(&input[pos..end])
            }
        };
        tokens.push((token, pos));
    }
    tokens.push((Token::End, input.len()));
    tokens
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, usize)>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)].0
    }

    fn next(&mut self) -> (Token<'a>, usize) {
        let idx = self.cursor.min(self.tokens.len() - 1);
        self.cursor += 1;
        self.tokens[idx].clone()
    }

    fn unexpected(token: &Token<'_>, position: usize, expected: &'static str) -> SelectorError {
        SelectorError::Unexpected {
            found: token.describe(),
            position,
            expected,
        }
    }

    fn parse(mut self) -> Result<LabelSelector, SelectorError> {
        let mut requirements = Vec::new();
        loop {
            requirements.push(self.requirement()?);
            match self.next() {
                (Token::End, _) => break,
                (Token::Comma, _) => continue,
                (token, pos) => return Err(Self::unexpected(&token, pos, "',' or end of input")),
            }
        }
        Ok(LabelSelector { requirements })
    }

    fn requirement(&mut self) -> Result<Requirement, SelectorError> {
        let (token, pos) = self.next();
        let key = match token {
            Token::Bang => {
                let key = self.key()?;
                return Ok(Requirement {
                    key,
                    operator: Operator::DoesNotExist,
                    values: BTreeSet::new(),
                });
            }
            Token::Identifier(key) => {
                validate_key(key)?;
                key.to_string()
            }
            other => return Err(Self::unexpected(&other, pos, "label key")),
        };

        let (operator, values) = match self.peek() {
            Token::End | Token::Comma => (Operator::Exists, BTreeSet::new()),
            Token::Equals | Token::DoubleEquals => {
                self.next();
                (Operator::Equals, BTreeSet::from([self.single_value()?]))
            }
            Token::NotEquals => {
                self.next();
                (Operator::NotEquals, BTreeSet::from([self.single_value()?]))
            }
            Token::Identifier("in") => {
                self.next();
                (Operator::In, self.value_set(Operator::In)?)
            }
            Token::Identifier("notin") => {
                self.next();
                (Operator::NotIn, self.value_set(Operator::NotIn)?)
            }
            _ => {
                let (token, pos) = self.next();
                return Err(Self::unexpected(&token, pos, "operator"));
            }
        };

        Ok(Requirement {
            key,
            operator,
            values,
        })
    }

    fn key(&mut self) -> Result<String, SelectorError> {
        match self.next() {
            (Token::Identifier(key), _) => {
                validate_key(key)?;
                Ok(key.to_string())
            }
            (token, pos) => Err(Self::unexpected(&token, pos, "label key")),
        }
    }

    /// Value after `=`, `==` or `!=`; a missing value means the empty string.
    fn single_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Token::End | Token::Comma => Ok(String::new()),
            Token::Identifier(value) => {
                let value = value.to_string();
                self.next();
                validate_value(&value)?;
                Ok(value)
            }
            _ => {
                let (token, pos) = self.next();
                Err(Self::unexpected(&token, pos, "label value"))
            }
        }
    }

    fn value_set(&mut self, operator: Operator) -> Result<BTreeSet<String>, SelectorError> {
        match self.next() {
            (Token::OpenParen, _) => {}
            (token, pos) => return Err(Self::unexpected(&token, pos, "'('")),
        }

        let mut values = BTreeSet::new();
        if *self.peek() == Token::CloseParen {
            self.next();
            return Err(SelectorError::EmptySet(operator));
        }
        loop {
            match self.next() {
                (Token::Identifier(value), _) => {
                    validate_value(value)?;
                    values.insert(value.to_string());
                }
                (token, pos) => return Err(Self::unexpected(&token, pos, "label value")),
            }
            match self.next() {
                (Token::Comma, _) => continue,
                (Token::CloseParen, _) => break,
                (token, pos) => return Err(Self::unexpected(&token, pos, "',' or ')'")),
            }
        }
        Ok(values)
    }
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name part must be non-empty");
    }
    if name.len() > MAX_NAME_LEN {
        return Err("name part must be no more than 63 characters");
    }
    if !NAME_RE.is_match(name) {
        return Err("name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character");
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let invalid = |reason| SelectorError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() {
                return Err(invalid("prefix part must be non-empty"));
            }
            if prefix.len() > MAX_PREFIX_LEN {
                return Err(invalid("prefix part must be no more than 253 characters"));
            }
            if !DNS_SUBDOMAIN_RE.is_match(prefix) {
                return Err(invalid("prefix part must be a lowercase DNS subdomain"));
            }
            name
        }
        None => key,
    };
    validate_name(name).map_err(invalid)
}

fn validate_value(value: &str) -> Result<(), SelectorError> {
    if value.is_empty() {
        return Ok(());
    }
    validate_name(value).map_err(|reason| SelectorError::InvalidValue {
        value: value.to_string(),
        reason,
    })
}

/// Parse a label selector string.
pub fn parse_label_selector(input: &str) -> Result<LabelSelector, SelectorError> {
    if input.trim().is_empty() {
        return Ok(LabelSelector::default());
    }
    Parser {
        tokens: tokenize(input),
        cursor: 0,
    }
    .parse()
}
