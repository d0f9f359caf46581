//! asd-parser - Backtracking phrase-structure parsing with ASD grammars
//!
//! An augmented state diagram (ASD) grammar describes phrases as paths
//! through a graph of word instances. This crate provides:
//! - A grammar store with lazily resolved successor links
//! - A text format reader and writer for grammars
//! - A grammar optimizer that precomputes which phrase types each node can
//!   begin
//! - A backtracking parse engine with in-place collapse of uniquely parsed
//!   subphrases
//! - Pluggable semantic actions and values
//! - Developer tools (tree printing, tracing, DOT visualization)
//! - Batch parsing over rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use asd_parser::asd::{AsdParser, GrammarStore};
//!
//! let grammar = GrammarStore::parse_text(
//!     "(a ((1 T ((cat 1)))))
//!      (cat ((1 T NOUN)))",
//! )
//! .unwrap();
//!
//! let mut parser = AsdParser::new(&grammar).unwrap();
//! parser.initialize("a cat", &["NOUN"]);
//! assert!(parser.parse());
//! assert_eq!(parser.bracket_phrase(), "(a cat)");
//! ```
//!
//! ## Building Grammars in Code
//!
//! ```rust
//! use asd_parser::asd::builder::{node, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::new()
//!     .node(node("the", "1").initial().to("dog", "1"))
//!     .node(node("dog", "1").ends("NP").value("dog"))
//!     .build();
//! assert_eq!(grammar.node_count(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate
//! - `parallel` - Parse batches on the rayon thread pool

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

// Must precede the modules that use the macros
#[macro_use]
mod logging;

// Prelude module for convenient imports
pub mod prelude;

pub mod asd;

/// Re-export commonly used types for convenience
pub use asd::{
    // Builder
    builder::{node, GrammarBuilder, NodeBuilder},
    // Debug tools
    debug::{GrammarVisualizer, ParseTrace, TreePrinter},
    // Analysis
    grammar_analysis::{GrammarAnalyzer, GrammarStats, GrammarWarning, WarningKind},
    AsdParser,
    CallbackTable,
    EngineError,
    GrammarError,
    GrammarStore,
    ParseSummary,
    ParserConfig,
    Semantics,
    Signal,
    Value,
};
