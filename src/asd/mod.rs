//! Augmented state diagram (ASD) grammars and their parser
//!
//! An ASD grammar is a lexicon of words, each with numbered instances linked
//! into a directed graph. A phrase of some type is a path through the graph
//! from an initial instance to a final instance ending that type; phrase
//! types can themselves appear as words, so phrases nest.
//!
//! # Module Organization
//!
//! ## Grammar
//! - [`grammar`] - Grammar store, nodes and successor links
//! - [`builder`] - Fluent construction of grammars in code
//! - [`reader`] / [`writer`] - The grammar text format
//! - [`optimizer`] - Begin-set closure and successor types
//! - [`grammar_analysis`] - Structural warnings and statistics
//!
//! ## Parsing
//! - [`parser`] - The backtracking parse engine
//! - [`arena`] - Phrase structure storage
//! - [`segment`] - Input tokenization
//! - [`semantics`] - Semantic action and value callbacks
//! - [`parallel`] - Batch parsing, on rayon when enabled
//!
//! ## Support
//! - [`error`] - Error types
//! - [`diagnostics`] - Diagnostic message sinks
//! - [`debug`] - Tree printing, tracing and grammar visualization

// ============================================================================
// Module Declarations
// ============================================================================

pub mod arena;
pub mod builder;
pub mod debug;
pub mod diagnostics;
pub mod error;
pub mod grammar;
pub mod grammar_analysis;
pub mod optimizer;
pub mod parser;
pub mod reader;
pub mod segment;
pub mod semantics;
pub mod value;
pub mod writer;

// Batch parsing (always available, uses rayon when feature is enabled)
pub mod parallel;

// ============================================================================
// Core Types
// ============================================================================

pub use arena::{PhraseArena, PhraseId, PhraseNode};
pub use error::{EngineError, GrammarError};
pub use grammar::{Coords, GrammarNode, GrammarStore, NodeId, NodeKind, SuccessorLink, DUMMY_WORD};
pub use parser::{AdvanceKind, AsdParser, ParseChoice, ParseSummary, ParserConfig};
pub use semantics::{
    CallbackTable, Features, NoSemantics, SemanticContext, Semantics, Signal, ValueOutcome,
};
pub use value::Value;
