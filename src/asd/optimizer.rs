//! Grammar optimization: the "begins" closure and successor types
//!
//! A grammar records only the phrase types each initial node begins
//! directly. [`expand_begins`] widens that to everything the node can begin
//! transitively, by walking a working digraph that adds, for every final
//! node ending type `T`, an edge to every initial instance of the word `T`
//! (a completed subphrase of type `T` can itself begin whatever an initial
//! `T` node begins). Those synthetic edges exist only in [`BeginsDigraph`];
//! the grammar's successor lists are never touched.
//!
//! [`compute_successor_types`] then records, for every non-final node, which
//! of its successor words are phrase types, so the parser can prune
//! sub-grammar descent by type.

use super::grammar::{GrammarStore, NodeId};
use ahash::AHashSet;
use std::collections::BTreeSet;

/// Disposable digraph over a grammar's nodes
#[derive(Debug, Clone)]
pub struct BeginsDigraph<'a> {
    grammar: &'a GrammarStore,
    edges: Vec<Vec<NodeId>>,
}

impl<'a> BeginsDigraph<'a> {
    /// Build the digraph of direct successor edges
    ///
    /// Links that do not resolve contribute no edge.
    pub fn new(grammar: &'a GrammarStore) -> Self {
        let edges = grammar
            .nodes()
            .map(|(_, node)| {
                node.successors()
                    .iter()
                    .filter_map(|link| grammar.lookup_instance(link))
                    .collect()
            })
            .collect();
        Self { grammar, edges }
    }

    /// Build the digraph including synthetic phrase-completion edges
    pub fn with_phrase_edges(grammar: &'a GrammarStore) -> Self {
        let mut graph = Self::new(grammar);
        graph.add_phrase_edges();
        graph
    }

    /// Add an edge from each final node to every initial instance of its phrase type
    pub fn add_phrase_edges(&mut self) {
        let grammar = self.grammar;
        for (id, node) in grammar.nodes() {
            let Some(phrase_type) = node.phrase_type() else {
                continue;
            };
            let Some(instances) = grammar.lookup_word(phrase_type) else {
                continue;
            };
            for &target in instances {
                if grammar.node(target).is_initial() {
                    self.add_edge(id, target);
                }
            }
        }
    }

    /// Add an edge between two nodes
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges[from.index()].push(to);
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Nodes reachable from `from` by one or more edges
    pub fn descendants(&self, from: NodeId) -> AHashSet<NodeId> {
        let mut visited = AHashSet::new();
        let mut stack: Vec<NodeId> = self.edges[from.index()].clone();
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                stack.extend(self.edges[id.index()].iter().copied());
            }
        }
        visited
    }

    /// Phrase types an initial node can begin, or None for non-initial nodes
    ///
    /// The node's own phrase type is included when it is final.
    pub fn begins_closure(&self, id: NodeId) -> Option<BTreeSet<String>> {
        let node = self.grammar.node(id);
        if !node.is_initial() {
            return None;
        }
        let mut types = BTreeSet::new();
        if let Some(phrase_type) = node.phrase_type() {
            types.insert(phrase_type.to_string());
        }
        for reached in self.descendants(id) {
            if let Some(phrase_type) = self.grammar.node(reached).phrase_type() {
                types.insert(phrase_type.to_string());
            }
        }
        Some(types)
    }
}

/// Replace every initial node's begin set with its full closure
pub fn expand_begins(grammar: &mut GrammarStore) {
    let closures: Vec<(NodeId, BTreeSet<String>)> = {
        let graph = BeginsDigraph::with_phrase_edges(grammar);
        grammar
            .nodes()
            .filter_map(|(id, _)| graph.begins_closure(id).map(|types| (id, types)))
            .collect()
    };
    log_debug!("expanded begins sets for {} initial nodes", closures.len());
    for (id, types) in closures {
        grammar
            .node_mut(id)
            .set_begins_types(Some(types.into_iter().collect()));
    }
}

/// Record, on every non-final node, its successor words that are phrase types
pub fn compute_successor_types(grammar: &mut GrammarStore) {
    let phrase_types = grammar.phrase_types();
    let updates: Vec<(NodeId, Vec<String>)> = grammar
        .nodes()
        .filter(|(_, node)| !node.is_final())
        .map(|(id, node)| {
            let types: BTreeSet<&str> = node
                .successors()
                .iter()
                .map(|link| link.word())
                .filter(|word| phrase_types.contains(*word))
                .collect();
            (id, types.into_iter().map(str::to_string).collect())
        })
        .collect();
    for (id, types) in updates {
        grammar.node_mut(id).set_successor_types(Some(types));
    }
}

/// Expand begin sets, then recompute successor types
pub fn optimize(grammar: &mut GrammarStore) {
    expand_begins(grammar);
    compute_successor_types(grammar);
}
