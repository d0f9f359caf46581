//! Error types for grammar loading and engine construction
//!
//! Parse-time outcomes are not errors: a failed alternative is reported
//! through [`Signal`](super::semantics::Signal) and the driver's boolean or
//! signed step-count result. The types here cover the surrounding plumbing.

use std::fmt;

/// Error raised while reading, writing or combining grammars
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Malformed grammar text
    Syntax {
        /// What was expected or found
        message: String,
        /// 1-based line where the problem was detected
        line: usize,
    },

    /// Failure reading or writing a grammar file
    Io {
        /// The file involved
        path: String,
        /// Message from the underlying I/O error
        message: String,
    },

    /// Malformed JSON grammar
    Json {
        /// Message from serde_json
        message: String,
    },

    /// A merge needed to renumber an instance id that is not an integer
    NonNumericInstance {
        /// Word owning the instance
        word: String,
        /// The offending instance id
        instance: String,
    },
}

impl GrammarError {
    /// Create a syntax error at the given line
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        GrammarError::Syntax {
            message: message.into(),
            line,
        }
    }

    /// Wrap an I/O error for `path`
    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        GrammarError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Syntax { message, line } => {
                write!(f, "grammar syntax error at line {}: {}", line, message)
            }
            GrammarError::Io { path, message } => {
                write!(f, "cannot access grammar file {}: {}", path, message)
            }
            GrammarError::Json { message } => write!(f, "invalid grammar JSON: {}", message),
            GrammarError::NonNumericInstance { word, instance } => write!(
                f,
                "cannot renumber instance {} of word {}: instance ids must be integers",
                instance, word
            ),
        }
    }
}

impl std::error::Error for GrammarError {}

impl From<serde_json::Error> for GrammarError {
    fn from(err: serde_json::Error) -> Self {
        GrammarError::Json {
            message: err.to_string(),
        }
    }
}

/// Error raised when a parser cannot be constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The grammar's incoming-edge sweep has not been run
    ///
    /// Call [`GrammarStore::mark_incoming_edges`](super::grammar::GrammarStore::mark_incoming_edges)
    /// first, or build the parser with [`AsdParser::prepare`](super::parser::AsdParser::prepare).
    UnmarkedGrammar,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnmarkedGrammar => {
                write!(f, "grammar incoming edges have not been marked")
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = GrammarError::syntax("missing word", 3);
        assert_eq!(
            err.to_string(),
            "grammar syntax error at line 3: missing word"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: GrammarError = serde_json::from_str::<Vec<u8>>("{")
            .map_err(GrammarError::from)
            .unwrap_err();
        assert!(matches!(err, GrammarError::Json { .. }));
    }

    #[test]
    fn test_engine_error_display() {
        assert!(EngineError::UnmarkedGrammar.to_string().contains("marked"));
    }
}
