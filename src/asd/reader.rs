//! Grammar text format reader
//!
//! A grammar file is a sequence of word entries:
//!
//! ```text
//! (word (
//!   (id begins successors [types-or-value [action [x y]]])
//!   ...
//! ))
//! ```
//!
//! - `begins` is `nil` (not initial), `T` (initial, types unspecified) or a
//!   parenthesized list of phrase types the node begins.
//! - `successors` is a parenthesized list of `(word id [x y])` links for a
//!   non-final node, or a bare phrase type name for a final node.
//! - the optional fourth field is `T`, `nil` or a list of successor phrase
//!   types for a non-final node, or a quoted semantic value for a final one.
//! - the optional action is `nil` or a quoted string, optionally followed by
//!   integer display coordinates.
//!
//! Quoted strings use `'` or `"`; a backslash escapes the next character and
//! is kept verbatim. Keywords are case-insensitive.

use super::error::GrammarError;
use super::grammar::{Coords, GrammarNode, GrammarStore, NodeKind, SuccessorLink};
use memchr::{memchr2, memchr_iter};
use std::path::Path;

/// One lexical token of the grammar text format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `(`
    Open,
    /// `)`
    Close,
    /// A quoted string, quotes included
    Quoted(&'a str),
    /// A run of characters up to whitespace, a parenthesis or `"`
    Word(&'a str),
}

impl Token<'_> {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn is_nil(&self) -> bool {
        self.is_keyword("nil") || self.is_keyword("null")
    }
}

/// Tokenizer for the grammar text format
pub struct TokenReader<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> TokenReader<'a> {
    /// Create a reader over `input`
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    /// Line number of the reader's position, starting at 1
    pub fn line(&self) -> usize {
        self.line
    }

    fn error(&self, message: impl Into<String>) -> GrammarError {
        GrammarError::syntax(message, self.line)
    }

    fn advance_to(&mut self, end: usize) {
        let skipped = &self.input.as_bytes()[self.pos..end];
        self.line += memchr_iter(b'\n', skipped).count();
        self.pos = end;
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        let end = self.pos + (rest.len() - trimmed.len());
        self.advance_to(end);
    }

    /// The next token, or None at end of input
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, GrammarError> {
        self.skip_whitespace();
        let input = self.input;
        let Some(c) = input[self.pos..].chars().next() else {
            return Ok(None);
        };
        match c {
            '(' => {
                self.pos += 1;
                Ok(Some(Token::Open))
            }
            ')' => {
                self.pos += 1;
                Ok(Some(Token::Close))
            }
            '\'' | '"' => self.quoted(c as u8).map(Some),
            _ => {
                let start = self.pos;
                let len = input[start..]
                    .find(|ch: char| ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"')
                    .unwrap_or(input.len() - start);
                self.pos += len;
                Ok(Some(Token::Word(&input[start..start + len])))
            }
        }
    }

    fn quoted(&mut self, quote: u8) -> Result<Token<'a>, GrammarError> {
        let input = self.input;
        let bytes = input.as_bytes();
        let start = self.pos;
        let mut scan = start + 1;
        loop {
            let Some(offset) = memchr2(quote, b'\\', &bytes[scan..]) else {
                self.advance_to(bytes.len());
                return Err(self.error("missing quote at end of quoted string ending at end of input"));
            };
            let at = scan + offset;
            if bytes[at] == quote {
                self.advance_to(at + 1);
                return Ok(Token::Quoted(&input[start..at + 1]));
            }
            // Escaped character, kept verbatim.
            match input[at + 1..].chars().next() {
                Some(escaped) => scan = at + 1 + escaped.len_utf8(),
                None => {
                    self.advance_to(bytes.len());
                    return Err(self.error("unexpected end of input after \\ character"));
                }
            }
        }
    }

    fn expect_close(&mut self, message: &str) -> Result<(), GrammarError> {
        match self.next_token()? {
            Some(Token::Close) => Ok(()),
            _ => Err(self.error(message)),
        }
    }
}

/// Builds a [`GrammarStore`] from grammar text
pub struct GrammarReader<'a> {
    tokens: TokenReader<'a>,
}

impl<'a> GrammarReader<'a> {
    /// Create a reader over `input`
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: TokenReader::new(input),
        }
    }

    /// Read every word entry
    ///
    /// A word appearing in more than one entry accumulates the instances of
    /// all of them. Incoming edges are left unmarked.
    pub fn read(mut self) -> Result<GrammarStore, GrammarError> {
        let mut store = GrammarStore::new();
        while let Some((word, instances)) = self.word_entry()? {
            store.add_word(&word);
            for node in instances {
                store.add_node(node);
            }
        }
        Ok(store)
    }

    fn error(&self, message: impl Into<String>) -> GrammarError {
        self.tokens.error(message)
    }

    fn word_entry(&mut self) -> Result<Option<(String, Vec<GrammarNode>)>, GrammarError> {
        match self.tokens.next_token()? {
            None => return Ok(None),
            Some(Token::Open) => {}
            Some(_) => return Err(self.error("missing ( at beginning of a word entry")),
        }
        let word = match self.tokens.next_token()? {
            Some(Token::Word(w)) | Some(Token::Quoted(w)) => w.to_string(),
            _ => return Err(self.error("missing word in a word entry")),
        };
        if self.tokens.next_token()? != Some(Token::Open) {
            return Err(self.error(format!(
                "missing ( around list of instance entries\nfor word {}",
                word
            )));
        }

        let mut instances = Vec::new();
        while let Some(node) = self.instance_entry(&word)? {
            instances.push(node);
        }
        self.tokens.expect_close("missing ) where expected")?;
        Ok(Some((word, instances)))
    }

    fn instance_entry(&mut self, word: &str) -> Result<Option<GrammarNode>, GrammarError> {
        match self.tokens.next_token()? {
            Some(Token::Close) => return Ok(None),
            Some(Token::Open) => {}
            _ => return Err(self.error(format!("missing ( at start of an instance entry\nfor word {}", word))),
        }
        let instance = match self.tokens.next_token()? {
            Some(Token::Word(id)) => id.to_string(),
            _ => {
                return Err(self.error(format!(
                    "missing instance id in an instance entry\nfor word {}",
                    word
                )))
            }
        };
        let context = format!("for word {} instance {}", word, instance);

        let (initial, begins_types) = self.begins_field(&context)?;
        let mut node = self.successors_field(word, &instance, &context)?;
        node.set_initial(initial, begins_types);

        // Optional successor types or semantic value
        let token = self.tokens.next_token()?;
        match token {
            Some(Token::Close) => {
                node.set_successor_types(Some(Vec::new()));
                return Ok(Some(node));
            }
            Some(t) if t.is_keyword("t") => node.set_successor_types(None),
            Some(t) if t.is_nil() => node.set_successor_types(Some(Vec::new())),
            Some(Token::Open) => {
                let types = self.type_list("successorTypes", &context)?;
                node.set_successor_types(Some(types));
            }
            Some(Token::Quoted(q)) => {
                node.set_successor_types(Some(Vec::new()));
                node.set_value(unquote(q));
            }
            _ => {
                return Err(self.error(format!(
                    "missing quote at beginning of semantic value field\n{}",
                    context
                )))
            }
        }

        // Optional semantic action
        match self.tokens.next_token()? {
            Some(Token::Close) => return Ok(Some(node)),
            Some(t) if t.is_nil() => {}
            Some(Token::Quoted(q)) => node.set_action(unquote(q)),
            _ => {
                return Err(self.error(format!(
                    "missing quote at beginning of semantic action field\n{}",
                    context
                )))
            }
        }

        // Optional display coordinates
        match self.tokens.next_token()? {
            Some(Token::Close) => {}
            Some(Token::Word(x)) => {
                let x = self.coordinate(x, &context)?;
                let y = match self.tokens.next_token()? {
                    Some(Token::Word(y)) => self.coordinate(y, &context)?,
                    _ => {
                        return Err(self.error(format!(
                            "invalid or missing pixel coordinate\nin entry {}",
                            context
                        )))
                    }
                };
                node.set_coords(Coords::new(x, y));
                self.tokens
                    .expect_close(&format!("missing ) at end of a word instance entry\n{}", context))?;
            }
            None => {
                return Err(self.error(format!("unexpected end of grammar file in entry {}", context)))
            }
            _ => {
                return Err(self.error(format!(
                    "missing ) at end of a word instance entry\n{}",
                    context
                )))
            }
        }
        Ok(Some(node))
    }

    fn begins_field(&mut self, context: &str) -> Result<(bool, Option<Vec<String>>), GrammarError> {
        match self.tokens.next_token()? {
            Some(t) if t.is_nil() || t.is_keyword("false") => Ok((false, None)),
            Some(t) if t.is_keyword("t") || t.is_keyword("true") => Ok((true, None)),
            Some(Token::Open) => {
                let types = self.type_list("begins", context)?;
                if types.is_empty() {
                    Ok((false, None))
                } else {
                    Ok((true, Some(types)))
                }
            }
            _ => Err(self.error(format!(
                "missing parenthesis at start of 'begins' field\n{}",
                context
            ))),
        }
    }

    /// Phrase type names up to the closing parenthesis
    fn type_list(&mut self, field: &str, context: &str) -> Result<Vec<String>, GrammarError> {
        let mut types = Vec::new();
        loop {
            match self.tokens.next_token()? {
                Some(Token::Close) => return Ok(types),
                Some(Token::Word(name)) if !name.starts_with(|c: char| c.is_ascii_digit()) => {
                    types.push(name.to_string());
                }
                None => {
                    return Err(self.error(format!("missing ) at end of '{}' list\n{}", field, context)))
                }
                Some(_) => {
                    return Err(self.error(format!(
                        "expected phrase type name missing in '{}' field\n{}",
                        field, context
                    )))
                }
            }
        }
    }

    fn successors_field(
        &mut self,
        word: &str,
        instance: &str,
        context: &str,
    ) -> Result<GrammarNode, GrammarError> {
        match self.tokens.next_token()? {
            None | Some(Token::Close) => {
                Err(self.error(format!("successors field missing\n{}", context)))
            }
            Some(Token::Open) => {
                let mut successors = Vec::new();
                loop {
                    match self.tokens.next_token()? {
                        Some(Token::Close) => break,
                        Some(Token::Open) => successors.push(self.successor_link(context)?),
                        _ => {
                            return Err(self.error(format!(
                                "missing ( at start of a (word instance ... ) entry\nin successors list {}",
                                context
                            )))
                        }
                    }
                }
                Ok(GrammarNode::non_final(word, instance, successors))
            }
            Some(Token::Word(phrase_type)) | Some(Token::Quoted(phrase_type)) => {
                Ok(GrammarNode::new(
                    word,
                    instance,
                    NodeKind::Final {
                        phrase_type: phrase_type.to_string(),
                        value: None,
                    },
                ))
            }
        }
    }

    /// `word id [x y])`, after the opening parenthesis
    fn successor_link(&mut self, context: &str) -> Result<SuccessorLink, GrammarError> {
        let missing = || format!("missing word or instance in successors list\n{}", context);
        let word = match self.tokens.next_token()? {
            Some(Token::Word(w)) => w,
            _ => return Err(self.error(missing())),
        };
        let instance = match self.tokens.next_token()? {
            Some(Token::Word(i)) => i,
            _ => return Err(self.error(missing())),
        };
        let mut link = SuccessorLink::new(word, instance);

        let unclosed = format!(
            "missing ) at end of (word instance ... ) entry\nin successors list {}",
            context
        );
        match self.tokens.next_token()? {
            Some(Token::Close) => {}
            Some(Token::Word(x)) => {
                let x = self.coordinate(x, context)?;
                let y = match self.tokens.next_token()? {
                    Some(Token::Word(y)) => self.coordinate(y, context)?,
                    _ => return Err(self.error(unclosed)),
                };
                link = link.with_coords(Coords::new(x, y));
                self.tokens.expect_close(&unclosed)?;
            }
            _ => return Err(self.error(unclosed)),
        }
        Ok(link)
    }

    fn coordinate(&self, token: &str, context: &str) -> Result<i32, GrammarError> {
        token.parse::<i32>().map_err(|_| {
            self.error(format!(
                "invalid pixel coordinate \"{}\"\nin entry {}",
                token, context
            ))
        })
    }
}

/// Strip surrounding quotes; an empty string reads as absent
fn unquote(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

impl GrammarStore {
    /// Read a grammar from text and mark its incoming edges
    pub fn parse_text(text: &str) -> Result<Self, GrammarError> {
        let mut store = GrammarReader::new(text).read()?;
        store.mark_incoming_edges_logged();
        Ok(store)
    }

    /// Read a grammar file and mark its incoming edges
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GrammarError::io(path, &e))?;
        Self::parse_text(&text)
    }
}
