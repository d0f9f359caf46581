//! Batch parsing
//!
//! Parses many independent inputs against one grammar. The grammar is only
//! read during parsing, so a single marked store is shared by every worker;
//! each input gets its own parser and phrase arena.
//!
//! # Feature Flag
//!
//! Work is spread over the rayon thread pool when the `parallel` feature is
//! enabled, and runs sequentially otherwise:
//!
//! ```toml
//! [dependencies]
//! asd-parser = { version = "0.1", features = ["parallel"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use asd_parser::asd::builder::{node, GrammarBuilder};
//! use asd_parser::asd::parallel::parse_batch_parallel;
//! use asd_parser::asd::parser::ParserConfig;
//!
//! let grammar = GrammarBuilder::new()
//!     .node(node("a", "1").initial().to("cat", "1"))
//!     .node(node("cat", "1").initial().ends("NOUN"))
//!     .build();
//!
//! let results =
//!     parse_batch_parallel(&grammar, &["a cat", "cat a"], &["NOUN"], &ParserConfig::default())
//!         .unwrap();
//! assert!(results[0].success);
//! assert!(!results[1].success);
//! ```

use super::error::EngineError;
use super::grammar::GrammarStore;
use super::parser::{AsdParser, ParseSummary, ParserConfig};
use super::semantics::Semantics;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn parse_one(
    grammar: &GrammarStore,
    input: &str,
    goals: &[&str],
    config: &ParserConfig,
) -> Result<ParseSummary, EngineError> {
    let mut parser = AsdParser::with_config(grammar, config.clone())?;
    Ok(parser.run(input, goals))
}

fn parse_one_with<S: Semantics>(
    grammar: &GrammarStore,
    input: &str,
    goals: &[&str],
    config: &ParserConfig,
    semantics: S,
) -> Result<ParseSummary, EngineError> {
    let mut parser = AsdParser::with_semantics(grammar, config.clone(), semantics)?;
    Ok(parser.run(input, goals))
}

/// Parse every input sequentially
///
/// Summaries are returned in input order. Fails if the grammar's incoming
/// edges have not been marked.
pub fn parse_batch(
    grammar: &GrammarStore,
    inputs: &[&str],
    goals: &[&str],
    config: &ParserConfig,
) -> Result<Vec<ParseSummary>, EngineError> {
    inputs
        .iter()
        .map(|input| parse_one(grammar, input, goals, config))
        .collect()
}

/// Parse multiple inputs in parallel
///
/// # Returns
/// Summaries in the same order as `inputs`
#[cfg(feature = "rayon")]
pub fn parse_batch_parallel(
    grammar: &GrammarStore,
    inputs: &[&str],
    goals: &[&str],
    config: &ParserConfig,
) -> Result<Vec<ParseSummary>, EngineError> {
    if !grammar.incoming_marked() {
        return Err(EngineError::UnmarkedGrammar);
    }
    inputs
        .par_iter()
        .map(|input| parse_one(grammar, input, goals, config))
        .collect()
}

/// Parse multiple inputs sequentially (fallback when rayon is not available)
#[cfg(not(feature = "rayon"))]
pub fn parse_batch_parallel(
    grammar: &GrammarStore,
    inputs: &[&str],
    goals: &[&str],
    config: &ParserConfig,
) -> Result<Vec<ParseSummary>, EngineError> {
    parse_batch(grammar, inputs, goals, config)
}

/// Parse multiple inputs in parallel, each with semantics from `factory`
///
/// The factory runs once per input on the worker that parses it, so the
/// semantics themselves need not be thread-safe.
#[cfg(feature = "rayon")]
pub fn parse_batch_parallel_with<S, F>(
    grammar: &GrammarStore,
    inputs: &[&str],
    goals: &[&str],
    config: &ParserConfig,
    factory: F,
) -> Result<Vec<ParseSummary>, EngineError>
where
    S: Semantics,
    F: Fn() -> S + Sync,
{
    inputs
        .par_iter()
        .map(|input| parse_one_with(grammar, input, goals, config, factory()))
        .collect()
}

/// Parse multiple inputs sequentially, each with semantics from `factory`
#[cfg(not(feature = "rayon"))]
pub fn parse_batch_parallel_with<S, F>(
    grammar: &GrammarStore,
    inputs: &[&str],
    goals: &[&str],
    config: &ParserConfig,
    factory: F,
) -> Result<Vec<ParseSummary>, EngineError>
where
    S: Semantics,
    F: Fn() -> S + Sync,
{
    inputs
        .iter()
        .map(|input| parse_one_with(grammar, input, goals, config, factory()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asd::builder::{node, GrammarBuilder};
    use crate::asd::semantics::{CallbackTable, ValueOutcome};
    use crate::asd::value::Value;

    fn grammar() -> GrammarStore {
        GrammarBuilder::new()
            .node(node("a", "1").initial().to("cat", "1"))
            .node(node("cat", "1").initial().ends("NOUN").value("size"))
            .build()
    }

    #[test]
    fn test_batch_preserves_order() {
        let grammar = grammar();
        let inputs = ["cat", "a cat", "cat a", "dog"];
        let results =
            parse_batch_parallel(&grammar, &inputs, &["NOUN"], &ParserConfig::default()).unwrap();
        let success: Vec<bool> = results.iter().map(|r| r.success).collect();
        assert_eq!(success, vec![true, true, false, false]);
        assert_eq!(results[1].input, "a cat");
        assert_eq!(results[1].bracketed.as_deref(), Some("(a cat)"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grammar = grammar();
        let inputs = ["cat", "a cat", "cat a"];
        let config = ParserConfig::default();
        assert_eq!(
            parse_batch_parallel(&grammar, &inputs, &["NOUN"], &config).unwrap(),
            parse_batch(&grammar, &inputs, &["NOUN"], &config).unwrap()
        );
    }

    #[test]
    fn test_unmarked_grammar_rejected() {
        let grammar = GrammarBuilder::new()
            .node(node("cat", "1").initial().ends("NOUN"))
            .build_unmarked();
        let result = parse_batch_parallel(&grammar, &["cat"], &["NOUN"], &ParserConfig::default());
        assert_eq!(result, Err(EngineError::UnmarkedGrammar));
    }

    #[test]
    fn test_batch_with_semantics() {
        let grammar = grammar();
        let results = parse_batch_parallel_with(
            &grammar,
            &["cat", "a cat"],
            &["NOUN"],
            &ParserConfig::default(),
            || {
                CallbackTable::new().on_value("size", |ctx| {
                    ValueOutcome::Value(Value::Int(ctx.current_word().len() as i64))
                })
            },
        )
        .unwrap();
        assert_eq!(results[0].value, Some(Value::Int(3)));
        assert_eq!(results[1].value, Some(Value::Int(3)));
    }
}
