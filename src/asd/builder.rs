//! Fluent construction of grammars in code
//!
//! # Example
//!
//! ```
//! use asd_parser::asd::builder::{node, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::new()
//!     .node(node("a", "1").initial().to("cat", "1"))
//!     .node(node("cat", "1").initial().ends("NOUN"))
//!     .build();
//!
//! assert_eq!(grammar.node_count(), 2);
//! assert!(grammar.incoming_marked());
//! ```

use super::diagnostics::{DiagnosticSink, LogSink};
use super::grammar::{Coords, GrammarNode, GrammarStore, NodeKind, SuccessorLink};

/// Builder for a single grammar node
///
/// A node is final once [`ends`](NodeBuilder::ends) is called; otherwise it
/// is non-final with the successors added through [`to`](NodeBuilder::to).
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    word: String,
    instance: String,
    initial: bool,
    begins: Option<Vec<String>>,
    phrase_type: Option<String>,
    value: Option<String>,
    successors: Vec<SuccessorLink>,
    successor_types: Option<Vec<String>>,
    action: Option<String>,
    coords: Coords,
}

/// Start building instance `instance` of `word`
pub fn node(word: &str, instance: &str) -> NodeBuilder {
    NodeBuilder {
        word: word.to_string(),
        instance: instance.to_string(),
        initial: false,
        begins: None,
        phrase_type: None,
        value: None,
        successors: Vec::new(),
        successor_types: None,
        action: None,
        coords: Coords::default(),
    }
}

impl NodeBuilder {
    /// Mark the node initial, able to begin any phrase type
    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    /// Mark the node initial, beginning only the listed phrase types
    pub fn begins(mut self, types: &[&str]) -> Self {
        self.initial = true;
        self.begins = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Make the node final, ending `phrase_type`
    pub fn ends(mut self, phrase_type: &str) -> Self {
        self.phrase_type = Some(phrase_type.to_string());
        self
    }

    /// Semantic value expression (final nodes)
    pub fn value(mut self, expression: &str) -> Self {
        self.value = Some(expression.to_string());
        self
    }

    /// Add a successor link
    pub fn to(mut self, word: &str, instance: &str) -> Self {
        self.successors.push(SuccessorLink::new(word, instance));
        self
    }

    /// Declare the successor phrase types (non-final nodes)
    pub fn successor_types(mut self, types: &[&str]) -> Self {
        self.successor_types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Semantic action expression
    pub fn action(mut self, expression: &str) -> Self {
        self.action = Some(expression.to_string());
        self
    }

    /// Display coordinates
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.coords = Coords::new(x, y);
        self
    }

    /// Produce the grammar node
    pub fn finish(self) -> GrammarNode {
        let kind = match self.phrase_type {
            Some(phrase_type) => NodeKind::Final {
                phrase_type,
                value: self.value,
            },
            None => NodeKind::NonFinal {
                successors: self.successors,
                successor_types: self.successor_types,
            },
        };
        let mut node = GrammarNode::new(self.word, self.instance, kind);
        node.set_initial(self.initial, self.begins);
        node.set_action(self.action);
        node.set_coords(self.coords);
        node
    }
}

/// Grammar builder for constructing grammar stores
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    store: GrammarStore,
}

impl GrammarBuilder {
    /// Create a new grammar builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    pub fn node(mut self, node: NodeBuilder) -> Self {
        self.store.add_node(node.finish());
        self
    }

    /// Add a lexicon entry with no instances
    pub fn word(mut self, word: &str) -> Self {
        self.store.add_word(word);
        self
    }

    /// Finish the store, marking incoming edges and logging dangling links
    pub fn build(self) -> GrammarStore {
        self.build_with(&mut LogSink)
    }

    /// Finish the store, reporting dangling links to `sink`
    pub fn build_with(mut self, sink: &mut dyn DiagnosticSink) -> GrammarStore {
        self.store.mark_incoming_edges(sink);
        self.store
    }

    /// Finish the store without marking incoming edges
    pub fn build_unmarked(self) -> GrammarStore {
        self.store
    }
}
