//! Reader for the Hugin `.net` format.
//!
//! Only the discrete subset is understood:
//!
//! ```text
//! net { }
//! node A { states = ("yes" "no"); }
//! node B { states = ("yes" "no"); label = "B"; }
//! potential (A) { data = (0.2 0.8); }
//! potential (B | A) { data = ((0.9 0.1) (0.3 0.7)); }
//! ```
//!
//! Unknown properties are skipped. Nested parentheses in `data` are
//! flattened in reading order, which is the Hugin table order.

use log::debug;

use crate::bayesnet::BayesNet;
use crate::error::{Error, Result};
use crate::types::{Probability, Variable};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    Punct(char),
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn tokens(mut self, what: &str) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '%' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '"' => {
                    self.chars.next();
                    let mut s = String::new();
                    loop {
                        match self.chars.next() {
                            Some('"') => break,
                            Some('\n') => {
                                self.line += 1;
                                s.push('\n');
                            }
                            Some(c) => s.push(c),
                            None => return Err(Error::parse(what, self.line, "unterminated string")),
                        }
                    }
                    tokens.push((Token::Str(s), self.line));
                }
                '(' | ')' | '{' | '}' | '=' | ';' | '|' => {
                    self.chars.next();
                    tokens.push((Token::Punct(c), self.line));
                }
                _ => {
                    let mut word = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_whitespace() || "(){}=;|\"%".contains(c) {
                            break;
                        }
                        word.push(c);
                        self.chars.next();
                    }
                    let starts_numeric = word.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == '+');
                    let token = match word.parse::<f64>() {
                        Ok(x) if starts_numeric => Token::Number(x),
                        _ => Token::Ident(word),
                    };
                    tokens.push((token, self.line));
                }
            }
        }
        Ok(tokens)
    }
}

struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    what: &'a str,
}

impl Parser<'_> {
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |(_, l)| *l)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.what, self.line(), message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Result<Token> {
        let t = self
            .tokens
            .get(self.pos)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(t)
    }

    fn expect(&mut self, c: char) -> Result<()> {
        match self.next()? {
            Token::Punct(p) if p == c => Ok(()),
            t => Err(self.error(format!("expected '{}', found {:?}", c, t))),
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(s) => Ok(s),
            t => Err(self.error(format!("expected identifier, found {:?}", t))),
        }
    }

    /// Flatten a property value into its leaf tokens.
    fn value(&mut self, out: &mut Vec<Token>) -> Result<()> {
        match self.next()? {
            Token::Punct('(') => {
                while self.peek() != Some(&Token::Punct(')')) {
                    self.value(out)?;
                }
                self.expect(')')
            }
            Token::Punct(c) => Err(self.error(format!("unexpected '{}'", c))),
            t => {
                out.push(t);
                Ok(())
            }
        }
    }

    /// Parse `{ key = value; ... }` into (key, flattened value) pairs.
    fn properties(&mut self) -> Result<Vec<(String, Vec<Token>)>> {
        self.expect('{')?;
        let mut props = Vec::new();
        while self.peek() != Some(&Token::Punct('}')) {
            let key = self.ident()?;
            self.expect('=')?;
            let mut value = Vec::new();
            self.value(&mut value)?;
            self.expect(';')?;
            props.push((key, value));
        }
        self.expect('}')?;
        Ok(props)
    }
}

/// Parse a network from `.net` text.
pub fn parse(text: &str) -> Result<BayesNet> {
    parse_named(text, "<net>")
}

pub(crate) fn parse_named(text: &str, what: &str) -> Result<BayesNet> {
    let tokens = Lexer::new(text).tokens(what)?;
    let mut p = Parser { tokens, pos: 0, what };
    let mut bn = BayesNet::new();
    let mut potentials: Vec<(Variable, Vec<Variable>, Vec<Probability>, usize)> = Vec::new();

    while p.peek().is_some() {
        let line = p.line();
        let keyword = p.ident()?;
        match keyword.as_str() {
            "net" => {
                p.properties()?;
            }
            "discrete" => {
                let node = p.ident()?;
                if node != "node" {
                    return Err(p.error(format!("expected 'node' after 'discrete', found '{}'", node)));
                }
                parse_node(&mut p, &mut bn)?;
            }
            "node" => parse_node(&mut p, &mut bn)?,
            "continuous" => return Err(p.error("continuous nodes are not supported")),
            "potential" => {
                p.expect('(')?;
                let child_name = p.ident()?;
                let child = bn
                    .variable(&child_name)
                    .ok_or_else(|| p.error(format!("unknown node '{}'", child_name)))?;
                let mut parents = Vec::new();
                if p.peek() == Some(&Token::Punct('|')) {
                    p.next()?;
                    while p.peek() != Some(&Token::Punct(')')) {
                        let name = p.ident()?;
                        let v = bn.variable(&name).ok_or_else(|| p.error(format!("unknown node '{}'", name)))?;
                        parents.push(v);
                    }
                }
                p.expect(')')?;
                let mut data = Vec::new();
                for (key, value) in p.properties()? {
                    if key == "data" {
                        for t in value {
                            match t {
                                Token::Number(x) => data.push(x),
                                t => return Err(p.error(format!("non-numeric entry {:?} in data", t))),
                            }
                        }
                    }
                }
                potentials.push((child, parents, data, line));
            }
            other => return Err(p.error(format!("unexpected '{}'", other))),
        }
    }

    for (child, parents, data, line) in potentials {
        bn.set_potential(child, &parents, data).map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(what, line, message),
            e => e,
        })?;
    }
    debug!("parsed {} variables, {} probabilities", bn.nr_variables(), bn.nr_probabilities());
    Ok(bn)
}

fn parse_node(p: &mut Parser<'_>, bn: &mut BayesNet) -> Result<()> {
    let name = p.ident()?;
    if bn.variable(&name).is_some() {
        return Err(p.error(format!("duplicate node '{}'", name)));
    }
    let mut states = Vec::new();
    for (key, value) in p.properties()? {
        if key == "states" {
            for t in value {
                match t {
                    Token::Str(s) | Token::Ident(s) => states.push(s),
                    Token::Number(x) => states.push(x.to_string()),
                    Token::Punct(_) => unreachable!("flattened values carry no punctuation"),
                }
            }
        }
    }
    if states.is_empty() {
        return Err(p.error(format!("node '{}' has no states", name)));
    }
    let refs: Vec<&str> = states.iter().map(String::as_str).collect();
    bn.add_variable(&name, &refs);
    Ok(())
}
