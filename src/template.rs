//! Strict claim templates
//!
//! A small subset of Go `text/template` syntax, enough to map token claims onto
//! identity fields:
//!
//! ```text
//! {{ .sub }}                                  field of the root context
//! oidc:{{ .user.name }}                       nested fields and literal text
//! {{ . }}                                     the root context itself
//! {{ index . "kubernetes.io" "namespace" }}   keys that are not identifiers
//! {{- .sub -}}                                trim surrounding whitespace
//! {{/* ignored */}}                           comment
//! ```
//!
//! Lookups never fall back to an empty value: a missing key, a field access on
//! something that is not an object, or rendering `null`, an array or an object
//! fails the execution.

use std::borrow::Cow;

use serde_json::Value;

use crate::claims::kind_of;
use crate::error::TemplateError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

/// A compiled claim template
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Action(Command),
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Term(Term),
    Index(Term, Vec<Term>),
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    /// Field chain starting at the root context; empty for `.`
    Field(Vec<String>),
    Str(String),
    Int(i64),
}

enum Token {
    Ident(String),
    Term(Term),
}

impl Template {
    /// Compile `source`, naming the template `name` in error messages
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let nodes = Parser::new(name, source).parse()?;
        Ok(Self { nodes })
    }

    /// Render the template with `data` as the root context
    pub fn execute(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();

        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(command) => write_value(&mut out, &*command.eval(data)?)?,
            }
        }

        Ok(out)
    }
}

impl Command {
    fn eval<'a>(&self, dot: &'a Value) -> Result<Cow<'a, Value>, TemplateError> {
        match self {
            Command::Term(term) => term.eval(dot),
            Command::Index(item, keys) => {
                let mut item = item.eval(dot)?;

                for key in keys {
                    let key = key.eval(dot)?;
                    item = match item {
                        Cow::Borrowed(value) => Cow::Borrowed(index_value(value, &key)?),
                        Cow::Owned(value) => Cow::Owned(index_value(&value, &key)?.clone()),
                    };
                }

                Ok(item)
            }
        }
    }
}

impl Term {
    fn eval<'a>(&self, dot: &'a Value) -> Result<Cow<'a, Value>, TemplateError> {
        match self {
            Term::Field(chain) => resolve_fields(dot, chain).map(Cow::Borrowed),
            Term::Str(s) => Ok(Cow::Owned(Value::String(s.clone()))),
            Term::Int(i) => Ok(Cow::Owned(Value::from(*i))),
        }
    }
}

fn resolve_fields<'a>(dot: &'a Value, chain: &[String]) -> Result<&'a Value, TemplateError> {
    chain.iter().try_fold(dot, |current, field| match current {
        Value::Object(map) => map
            .get(field)
            .ok_or_else(|| TemplateError::MissingKey(field.clone())),
        other => Err(TemplateError::NotAnObject {
            field: field.clone(),
            found: kind_of(other),
        }),
    })
}

fn index_value<'a>(item: &'a Value, key: &Value) -> Result<&'a Value, TemplateError> {
    match (item, key) {
        (Value::Object(map), Value::String(k)) => {
            map.get(k).ok_or_else(|| TemplateError::MissingKey(k.clone()))
        }
        (Value::Array(items), Value::Number(n)) => {
            let index = n.as_i64().unwrap_or(-1);
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .ok_or(TemplateError::IndexOutOfRange {
                    index,
                    len: items.len(),
                })
        }
        (other, key) => Err(TemplateError::BadIndex {
            key: key.to_string(),
            found: kind_of(other),
        }),
    }
}

fn write_value(out: &mut String, value: &Value) -> Result<(), TemplateError> {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        other => return Err(TemplateError::Unprintable(kind_of(other))),
    }

    Ok(())
}

struct Parser<'a> {
    name: &'a str,
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(name: &'a str, src: &'a str) -> Self {
        Self { name, src, pos: 0 }
    }

    fn parse(mut self) -> Result<Vec<Node>, TemplateError> {
        let mut nodes = Vec::new();
        let mut trim_next = false;

        loop {
            let start = self.pos;
            let end = self.rest().find(LEFT_DELIM).map(|i| start + i);
            let mut text = &self.src[start..end.unwrap_or(self.src.len())];

            if trim_next {
                text = text.trim_start_matches(is_space);
            }

            let Some(end) = end else {
                push_text(&mut nodes, text);
                return Ok(nodes);
            };

            self.pos = end + LEFT_DELIM.len();
            if self.at_trim_marker() {
                text = text.trim_end_matches(is_space);
                self.pos += 1;
            }
            push_text(&mut nodes, text);

            let (command, trim_right) = self.action()?;
            if let Some(command) = command {
                nodes.push(Node::Action(command));
            }
            trim_next = trim_right;
        }
    }

    fn action(&mut self) -> Result<(Option<Command>, bool), TemplateError> {
        self.skip_space();

        if self.rest().starts_with("/*") {
            let close = self
                .rest()
                .find("*/")
                .ok_or_else(|| self.error("unclosed comment"))?;
            self.pos += close + 2;
            self.skip_space();
            let trim = self.close_action()?;
            return Ok((None, trim));
        }

        let mut tokens = Vec::new();
        loop {
            self.skip_space();
            if self.at_close() {
                break;
            }
            tokens.push(self.token()?);
        }

        let command = self.command(tokens)?;
        let trim = self.close_action()?;
        Ok((Some(command), trim))
    }

    fn command(&self, tokens: Vec<Token>) -> Result<Command, TemplateError> {
        let mut tokens = tokens.into_iter();

        match tokens.next() {
            None => Err(self.error("missing value for command")),
            Some(Token::Ident(ident)) if ident == "index" => {
                let mut args = tokens.map(|token| match token {
                    Token::Term(term) => Ok(term),
                    Token::Ident(ident) => Err(self.undefined(&ident)),
                });
                let item = args.next().ok_or_else(|| {
                    self.error("wrong number of args for index: want at least 1 got 0")
                })??;
                let keys = args.collect::<Result<Vec<_>, _>>()?;
                Ok(Command::Index(item, keys))
            }
            Some(Token::Ident(ident)) => Err(self.undefined(&ident)),
            Some(Token::Term(term)) => {
                if tokens.next().is_some() {
                    return Err(self.error("can't give argument to non-function"));
                }
                Ok(Command::Term(term))
            }
        }
    }

    fn token(&mut self) -> Result<Token, TemplateError> {
        match self.peek() {
            None => Err(self.error("unclosed action")),
            Some('.') => self.fields().map(Token::Term),
            Some('"') => self.quoted().map(|s| Token::Term(Term::Str(s))),
            Some('`') => self.raw().map(|s| Token::Term(Term::Str(s))),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                self.number().map(|i| Token::Term(Term::Int(i)))
            }
            Some(c) if is_ident_start(c) => Ok(Token::Ident(self.ident())),
            Some(c) => Err(self.error(&format!("unexpected {c:?} in operand"))),
        }
    }

    fn fields(&mut self) -> Result<Term, TemplateError> {
        let mut chain = Vec::new();

        while self.peek() == Some('.') {
            self.pos += 1;
            let ident = self.ident();
            if ident.is_empty() {
                if chain.is_empty() {
                    break;
                }
                return Err(self.error("unexpected . after term"));
            }
            chain.push(ident);
        }

        Ok(Term::Field(chain))
    }

    fn quoted(&mut self) -> Result<String, TemplateError> {
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, c @ ('"' | '\\'))) => out.push(c),
                    _ => return Err(self.error("invalid escape in quoted string")),
                },
                '\n' => break,
                c => out.push(c),
            }
        }

        Err(self.error("unterminated quoted string"))
    }

    fn raw(&mut self) -> Result<String, TemplateError> {
        self.pos += 1;
        let close = self
            .rest()
            .find('`')
            .ok_or_else(|| self.error("unterminated raw quoted string"))?;
        let out = self.rest()[..close].to_string();
        self.pos += close + 1;
        Ok(out)
    }

    fn number(&mut self) -> Result<i64, TemplateError> {
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - sign);
        let literal = &rest[..sign + digits];

        let value = literal
            .parse::<i64>()
            .map_err(|_| self.error(&format!("bad number syntax: {literal:?}")))?;
        self.pos += literal.len();
        Ok(value)
    }

    fn ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn close_action(&mut self) -> Result<bool, TemplateError> {
        if self.rest().starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            return Ok(false);
        }

        if self.at_close() {
            self.pos += 1 + RIGHT_DELIM.len();
            return Ok(true);
        }

        match self.peek() {
            None => Err(self.error("unclosed action")),
            Some(c) => Err(self.error(&format!("unexpected {c:?} in command"))),
        }
    }

    fn at_close(&self) -> bool {
        let rest = self.rest();
        rest.starts_with(RIGHT_DELIM)
            || (rest.starts_with("-}}") && self.src[..self.pos].ends_with(is_space))
    }

    fn at_trim_marker(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('-') && chars.next().is_some_and(is_space)
    }

    fn skip_space(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches(is_space).len();
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn undefined(&self, ident: &str) -> TemplateError {
        self.error(&format!("function {ident:?} not defined"))
    }

    fn error(&self, message: &str) -> TemplateError {
        let line = self.src[..self.pos].matches('\n').count() + 1;
        TemplateError::Syntax(format!("template: {}:{line}: {message}", self.name))
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}
