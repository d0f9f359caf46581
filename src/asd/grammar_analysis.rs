//! Grammar analysis and warnings
//!
//! This module checks a grammar for structural defects that do not stop it
//! from loading but usually indicate authoring mistakes:
//! - Words with no instances
//! - Non-initial nodes nothing leads to
//! - Non-final nodes that lead nowhere
//! - Successor links naming instances that do not exist
//!
//! # Example
//!
//! ```
//! use asd_parser::asd::builder::{node, GrammarBuilder};
//! use asd_parser::asd::grammar_analysis::{GrammarAnalyzer, WarningKind};
//!
//! let grammar = GrammarBuilder::new()
//!     .node(node("a", "1").initial().to("cat", "1"))
//!     .build_unmarked();
//!
//! let warnings = GrammarAnalyzer::new(&grammar).analyze();
//! assert!(warnings.iter().any(|w| w.kind == WarningKind::DanglingSuccessor));
//! ```

use super::grammar::{GrammarStore, NodeId};
use ahash::AHashSet;
use std::fmt;

/// Kind of grammar warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A lexicon entry without instances
    EmptyWord,

    /// A non-initial node that no successor link targets
    ///
    /// The parser can never reach such a node.
    NoIncomingEdges,

    /// A non-final node with an empty successor list
    NoOutgoingEdges,

    /// A successor link naming a missing instance
    DanglingSuccessor,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWord => write!(f, "empty word"),
            Self::NoIncomingEdges => write!(f, "no incoming edges"),
            Self::NoOutgoingEdges => write!(f, "no outgoing edges"),
            Self::DanglingSuccessor => write!(f, "dangling successor"),
        }
    }
}

/// A grammar warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarWarning {
    /// The kind of warning
    pub kind: WarningKind,
    /// The word involved
    pub word: String,
    /// The node involved, if the warning concerns one instance
    pub node: Option<NodeId>,
    /// Human-readable message
    pub message: String,
}

impl GrammarWarning {
    /// Create a new warning
    pub fn new(kind: WarningKind, word: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            word: word.to_string(),
            node: None,
            message: message.into(),
        }
    }

    /// Attach the node the warning concerns
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

impl fmt::Display for GrammarWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Size summary of a grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrammarStats {
    /// Lexicon entries (words and phrase types)
    pub words: usize,
    /// Grammar nodes (instances)
    pub nodes: usize,
    /// Successor links that resolve
    pub valid_edges: usize,
}

impl fmt::Display for GrammarStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Words & phrase types:   {}", self.words)?;
        writeln!(f, "Nodes (instances):      {}", self.nodes)?;
        write!(f, "Valid edges:            {}", self.valid_edges)
    }
}

/// Grammar analyzer
pub struct GrammarAnalyzer<'a> {
    grammar: &'a GrammarStore,
}

impl<'a> GrammarAnalyzer<'a> {
    /// Create a new analyzer for the given grammar
    pub fn new(grammar: &'a GrammarStore) -> Self {
        Self { grammar }
    }

    /// Analyze the grammar and return all warnings
    ///
    /// Warnings are ordered by word, then by instance order.
    pub fn analyze(&self) -> Vec<GrammarWarning> {
        let targets = self.link_targets();
        let mut warnings = Vec::new();

        for word in self.grammar.words() {
            let ids = self.grammar.lookup_word(word).unwrap_or_default();
            if ids.is_empty() {
                warnings.push(GrammarWarning::new(
                    WarningKind::EmptyWord,
                    word,
                    format!("Word \"{}\" has no instances.", word),
                ));
                continue;
            }
            for &id in ids {
                self.check_node(id, &targets, &mut warnings);
            }
        }
        warnings
    }

    /// Count words, nodes and resolvable edges
    pub fn stats(&self) -> GrammarStats {
        let valid_edges = self
            .grammar
            .nodes()
            .flat_map(|(_, node)| node.successors())
            .filter(|link| self.grammar.lookup_instance(link).is_some())
            .count();
        GrammarStats {
            words: self.grammar.word_count(),
            nodes: self.grammar.node_count(),
            valid_edges,
        }
    }

    fn check_node(&self, id: NodeId, targets: &AHashSet<NodeId>, warnings: &mut Vec<GrammarWarning>) {
        let node = self.grammar.node(id);
        if !node.is_initial() && !targets.contains(&id) {
            warnings.push(
                GrammarWarning::new(
                    WarningKind::NoIncomingEdges,
                    node.word(),
                    format!(
                        "Non-initial node ({} {}) has no incoming edges.",
                        node.word(),
                        node.instance()
                    ),
                )
                .with_node(id),
            );
        }
        if node.is_final() {
            return;
        }
        if node.successors().is_empty() {
            warnings.push(
                GrammarWarning::new(
                    WarningKind::NoOutgoingEdges,
                    node.word(),
                    format!(
                        "Non-final node ({} {}) has no outgoing edges.",
                        node.word(),
                        node.instance()
                    ),
                )
                .with_node(id),
            );
        }
        for link in node.successors() {
            if self.grammar.lookup_instance(link).is_none() {
                warnings.push(
                    GrammarWarning::new(
                        WarningKind::DanglingSuccessor,
                        node.word(),
                        format!(
                            "({} {}) has edge to non-existent node ({} {}).",
                            node.word(),
                            node.instance(),
                            link.word(),
                            link.instance()
                        ),
                    )
                    .with_node(id),
                );
            }
        }
    }

    /// Every node some resolvable link points at
    fn link_targets(&self) -> AHashSet<NodeId> {
        self.grammar
            .nodes()
            .flat_map(|(_, node)| node.successors())
            .filter_map(|link| self.grammar.lookup_instance(link))
            .collect()
    }
}
