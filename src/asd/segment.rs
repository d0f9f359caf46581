//! Input segmentation
//!
//! Splits an utterance into the tokens that seed a phrase structure: runs of
//! ordinary characters form words, each special character is a token of its
//! own, whitespace separates, and a quoted string is kept whole (quotes
//! included) with internal whitespace runs collapsed to one space.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default whitespace characters
pub const DEFAULT_SPACE_CHARS: &str = " \t\n\r";

/// Default characters that always form single-character tokens
pub const DEFAULT_SPECIAL_CHARS: &str = ",.;:?!$@#%&*()[]{}+=<>/~\\";

/// Default opening and closing quote
pub const DEFAULT_QUOTE: char = '"';

/// Character classes used by [`Segmenter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Characters treated as whitespace
    pub space_chars: String,
    /// Characters split off as single tokens
    pub special_chars: String,
    /// Character opening a quoted string
    pub open_quote: char,
    /// Character closing a quoted string
    pub close_quote: char,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            space_chars: DEFAULT_SPACE_CHARS.to_string(),
            special_chars: DEFAULT_SPECIAL_CHARS.to_string(),
            open_quote: DEFAULT_QUOTE,
            close_quote: DEFAULT_QUOTE,
        }
    }
}

/// Tokenizer for parser input
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    pieces: Regex,
}

impl Segmenter {
    /// Build a segmenter for the given character classes
    pub fn new(config: SegmenterConfig) -> Self {
        let mut delimiters = String::new();
        for c in config
            .space_chars
            .chars()
            .chain(config.special_chars.chars())
            .chain([config.open_quote, config.close_quote])
        {
            delimiters.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        }
        // A single delimiter, or a maximal run of anything else.
        let pattern = format!("[{0}]|[^{0}]+", delimiters);
        let pieces = Regex::new(&pattern).unwrap_or_else(|err| {
            unreachable!("escaped character class failed to compile: {}", err)
        });
        Self { config, pieces }
    }

    /// The character classes in use
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split `input` into tokens
    ///
    /// An unterminated quoted string is dropped.
    pub fn segment(&self, input: &str) -> Vec<String> {
        let close = self.config.close_quote.to_string();
        let open = self.config.open_quote.to_string();
        let mut tokens = Vec::new();
        let mut quoted: Option<String> = None;
        let mut last_blank = false;

        for piece in self.pieces.find_iter(input) {
            let token = piece.as_str().trim();
            match quoted.as_mut() {
                Some(buffer) => {
                    if token.is_empty() {
                        if !last_blank {
                            buffer.push(' ');
                        }
                        last_blank = true;
                        continue;
                    }
                    buffer.push_str(token);
                    if token == close {
                        tokens.extend(quoted.take());
                    }
                }
                None if token.is_empty() => {}
                None if token == open => quoted = Some(token.to_string()),
                None => tokens.push(token.to_string()),
            }
            last_blank = false;
        }
        tokens
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}
