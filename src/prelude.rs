//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from
//! asd-parser. Importing this module with a wildcard import brings the core
//! types into scope:
//!
//! ```
//! use asd_parser::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Grammar
//! - [`GrammarStore`] - Lexicon of word instances
//! - [`GrammarNode`] - One instance of a word or phrase type
//! - [`SuccessorLink`] - Named edge to a successor instance
//! - [`GrammarBuilder`] and [`node()`] - Fluent grammar construction
//!
//! ## Parsing
//! - [`AsdParser`] - The parse engine
//! - [`ParserConfig`] - Engine configuration
//! - [`ParseChoice`] - One candidate move
//! - [`ParseSummary`] - Outcome of a complete parse
//!
//! ## Semantics
//! - [`Semantics`] - Callback trait
//! - [`SemanticContext`] - View of the parse handed to callbacks
//! - [`CallbackTable`] - Closure-based semantics
//! - [`Signal`] / [`ValueOutcome`] - Callback results
//! - [`Value`] - Dynamic value type
//!
//! ## Errors
//! - [`GrammarError`] - Grammar loading and merging errors
//! - [`EngineError`] - Parser construction errors

pub use crate::asd::builder::{node, GrammarBuilder};
pub use crate::asd::error::{EngineError, GrammarError};
pub use crate::asd::grammar::{GrammarNode, GrammarStore, NodeId, SuccessorLink};
pub use crate::asd::parser::{AsdParser, ParseChoice, ParseSummary, ParserConfig};
pub use crate::asd::semantics::{CallbackTable, SemanticContext, Semantics, Signal, ValueOutcome};
pub use crate::asd::value::Value;
