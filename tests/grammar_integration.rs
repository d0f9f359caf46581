//! Integration tests for grammar loading, optimization and maintenance
//!
//! These tests cover:
//! - Reading grammars from the text format and parsing with them
//! - Optimization and its effect on the parse
//! - Text and JSON round trips
//! - Merging grammars
//! - Structural warnings

use asd_parser::asd::grammar_analysis::{GrammarAnalyzer, WarningKind};
use asd_parser::asd::{AsdParser, GrammarError, GrammarStore, ParserConfig};

const SENTENCES: &str = "
(the (
  (1 T ((NOUN 1)) T)
))

(dog (
  (1 T NOUN)
))

(cat (
  (1 T NOUN)
))

(NOUN (
  (1 nil NP)
))

(NP (
  (1 T ((barks 1) (sleeps 1)))
))

(barks (
  (1 nil S)
))

(sleeps (
  (1 nil S)
))
";

fn sentences() -> GrammarStore {
    GrammarStore::parse_text(SENTENCES).expect("Should read sentence grammar")
}

fn parse(grammar: &GrammarStore, input: &str, goals: &[&str]) -> Option<String> {
    let mut parser = AsdParser::new(grammar).expect("Should accept marked grammar");
    parser.initialize(input, goals);
    parser.parse().then(|| parser.bracket_phrase())
}

// ============================================================================
// Reading and Parsing
// ============================================================================

#[test]
fn test_parse_with_loaded_grammar() {
    let grammar = sentences();
    assert_eq!(grammar.word_count(), 7);
    assert_eq!(grammar.node_count(), 7);

    assert_eq!(parse(&grammar, "the dog barks", &["S"]).as_deref(), Some("((the dog) barks)"));
    assert_eq!(parse(&grammar, "the cat sleeps", &["S"]).as_deref(), Some("((the cat) sleeps)"));
    assert_eq!(parse(&grammar, "the cat", &["NP"]).as_deref(), Some("(the cat)"));
    assert_eq!(parse(&grammar, "dog the barks", &["S"]), None);
}

#[test]
fn test_omitted_successor_types_block_subphrases() {
    // Without the fourth field "the" expects no phrase type after it.
    let grammar = GrammarStore::parse_text(
        "(the ((1 T ((NOUN 1)))))
         (dog ((1 T NOUN)))
         (NOUN ((1 nil NP)))",
    )
    .expect("Should read grammar");
    let the = grammar.node(grammar.find_instance("the", "1").expect("Should find the/1"));
    assert_eq!(the.successor_types(), Some(&[][..]));
    assert_eq!(parse(&grammar, "the dog", &["NP"]), None);

    let grammar = GrammarStore::parse_text(
        "(the ((1 T ((NOUN 1)) T)))
         (dog ((1 T NOUN)))
         (NOUN ((1 nil NP)))",
    )
    .expect("Should read grammar");
    assert_eq!(parse(&grammar, "the dog", &["NP"]).as_deref(), Some("(the dog)"));
}

#[test]
fn test_optimized_grammar_parses_the_same() {
    let plain = sentences();
    let mut optimized = sentences();
    optimized.optimize();

    for input in ["the dog barks", "the cat sleeps", "cat barks", "barks the dog"] {
        assert_eq!(parse(&plain, input, &["S"]), parse(&optimized, input, &["S"]), "{}", input);
    }
}

#[test]
fn test_optimize_sets_begins_and_successor_types() {
    let mut grammar = sentences();
    grammar.optimize();

    let the = grammar.node(grammar.find_instance("the", "1").expect("Should find the/1"));
    assert_eq!(the.begins_types(), Some(&["NP".to_string(), "S".to_string()][..]));
    assert_eq!(the.successor_types(), Some(&["NOUN".to_string()][..]));

    let np = grammar.node(grammar.find_instance("NP", "1").expect("Should find NP/1"));
    assert_eq!(np.begins_types(), Some(&["S".to_string()][..]));
    assert_eq!(np.successor_types(), Some(&[][..]));
}

#[test]
fn test_optimized_goal_filtering() {
    let mut grammar = sentences();
    grammar.optimize();
    let mut parser = AsdParser::new(&grammar).expect("Should accept marked grammar");

    // "dog" begins only NOUN and the phrases it leads into.
    parser.initialize("dog", &["VERB"]);
    assert!(!parser.parse());
    assert_eq!(parser.step_number(), 0);
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_optimized_text_round_trip() {
    let mut grammar = sentences();
    let first = grammar.to_text(true);

    let mut reloaded = GrammarStore::parse_text(&first).expect("Should reread written grammar");
    let second = reloaded.to_text(true);
    assert_eq!(first, second);

    for (_, node) in reloaded.nodes() {
        let id = grammar
            .find_instance(node.word(), node.instance())
            .expect("Should find every reloaded node");
        let original = grammar.node(id);
        assert_eq!(node.begins_types(), original.begins_types());
        assert_eq!(node.successor_types(), original.successor_types());
    }
}

#[test]
fn test_plain_text_round_trip_parses() {
    let mut grammar = sentences();
    let text = grammar.to_text(false);
    let reloaded = GrammarStore::parse_text(&text).expect("Should reread written grammar");
    assert_eq!(
        parse(&reloaded, "the dog barks", &["S"]).as_deref(),
        Some("((the dog) barks)")
    );
}

#[test]
fn test_json_round_trip() {
    let grammar = sentences();
    let json = grammar.to_json().expect("Should serialize grammar");
    let mut restored = GrammarStore::from_json(&json).expect("Should deserialize grammar");
    assert!(!restored.incoming_marked());

    let mut parser = AsdParser::prepare(&mut restored);
    parser.initialize("the cat sleeps", &["S"]);
    assert!(parser.parse());
    assert_eq!(parser.bracket_phrase(), "((the cat) sleeps)");
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_merge_then_parse() {
    let mut nouns = GrammarStore::parse_text("(cat ((1 T NOUN)))").expect("Should read nouns");
    let verbs = GrammarStore::parse_text(
        "(a ((1 T ((cat 1)))))
         (cat ((1 nil VERB)))",
    )
    .expect("Should read verbs");

    nouns.merge(verbs).expect("Should merge numeric instances");
    assert!(!nouns.incoming_marked());
    assert_eq!(nouns.lookup_word("cat").map(<[_]>::len), Some(2));
    let merged_cat = nouns.find_instance("cat", "2").expect("Should renumber merged cat");
    assert_eq!(nouns.node(merged_cat).phrase_type(), Some("VERB"));

    let mut parser = AsdParser::prepare(&mut nouns);
    parser.initialize("a cat", &["VERB"]);
    assert!(parser.parse());
    assert_eq!(parser.bracket_phrase(), "(a cat)");
}

#[test]
fn test_merge_rejects_named_instances() {
    let mut base = GrammarStore::parse_text("(cat ((1 T NOUN)))").expect("Should read base");
    let other = GrammarStore::parse_text("(cat ((x T VERB)))").expect("Should read other");
    let err = base.merge(other).expect_err("Should reject non-numeric id");
    assert!(matches!(err, GrammarError::NonNumericInstance { .. }));
    assert_eq!(base.node_count(), 1);
}

// ============================================================================
// Analysis
// ============================================================================

#[test]
fn test_warnings_for_defective_grammar() {
    let text = "
(a ((1 T ((dog 1)))))
(orphan ((1 nil X)))
(stuck ((1 T ())))
(empty ())
";
    let mut diagnostics: Vec<String> = Vec::new();
    let mut grammar = asd_parser::asd::reader::GrammarReader::new(text)
        .read()
        .expect("Should read defective grammar");
    assert_eq!(grammar.mark_incoming_edges(&mut diagnostics), 1);
    assert_eq!(diagnostics, vec!["(a 1) has edge to non-existent node (dog 1).".to_string()]);

    let kinds: Vec<WarningKind> = GrammarAnalyzer::new(&grammar)
        .analyze()
        .into_iter()
        .map(|w| w.kind)
        .collect();
    assert!(kinds.contains(&WarningKind::DanglingSuccessor));
    assert!(kinds.contains(&WarningKind::NoIncomingEdges));
    assert!(kinds.contains(&WarningKind::NoOutgoingEdges));
    assert!(kinds.contains(&WarningKind::EmptyWord));
}

#[test]
fn test_parser_config_is_independent_of_grammar() {
    let grammar = GrammarStore::parse_text("(* ((1 T ((! 1))))) (! ((1 nil EXCLAMATION)))")
        .expect("Should read wildcard grammar");
    let config = ParserConfig::new().with_anything_word("*");
    let mut parser = AsdParser::with_config(&grammar, config).expect("Should accept marked grammar");
    parser.initialize("hey!", &["EXCLAMATION"]);
    assert!(parser.parse());
    assert_eq!(parser.bracket_phrase(), "(hey !)");
}
