//! Grammar data model
//!
//! An ASD grammar is a lexicon mapping each word (or phrase type) to an
//! ordered list of grammar-node instances. Non-final instances list their
//! successors by `(word, instance)` name; those links are resolved lazily
//! against the store and memoized.
//!
//! The store owns every node in a flat arena addressed by [`NodeId`];
//! successor links only cache ids, never own nodes.

use super::diagnostics::{DiagnosticSink, LogSink};
use super::error::GrammarError;
use super::grammar_analysis::{GrammarAnalyzer, GrammarWarning};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Word of the sentinel entry used for epsilon (dummy) transitions
pub const DUMMY_WORD: &str = "$$";

/// Stable index of a grammar node inside its [`GrammarStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the store's arena
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

/// Display coordinates carried through from grammar authoring tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coords {
    /// Horizontal position
    pub x: i32,
    /// Vertical position
    pub y: i32,
}

impl Coords {
    /// Create coordinates
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Named reference from a non-final node to one of its successors
///
/// The resolved target is memoized on the first successful lookup. Failed
/// lookups are not cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessorLink {
    word: String,
    instance: String,
    #[serde(default)]
    coords: Coords,
    #[serde(skip)]
    resolved: OnceLock<NodeId>,
}

impl SuccessorLink {
    /// Create a link to `(word, instance)`
    pub fn new(word: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            instance: instance.into(),
            coords: Coords::default(),
            resolved: OnceLock::new(),
        }
    }

    /// Attach display coordinates
    pub fn with_coords(mut self, coords: Coords) -> Self {
        self.coords = coords;
        self
    }

    /// Word of the target instance
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Instance id of the target
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Display coordinates of the link
    pub fn coords(&self) -> Coords {
        self.coords
    }

    /// The memoized target, if the link has been resolved
    pub fn resolved(&self) -> Option<NodeId> {
        self.resolved.get().copied()
    }

    pub(crate) fn reset_resolution(&mut self) {
        self.resolved = OnceLock::new();
    }
}

impl PartialEq for SuccessorLink {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word && self.instance == other.instance && self.coords == other.coords
    }
}

impl Eq for SuccessorLink {}

/// Whether a node ends a phrase or continues to successors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Ends a phrase of the named type
    Final {
        /// Phrase type completed at this node
        phrase_type: String,
        /// Semantic value expression evaluated on completion
        #[serde(default)]
        value: Option<String>,
    },

    /// Continues to one of the listed successors
    NonFinal {
        /// Successors in declaration order
        successors: Vec<SuccessorLink>,
        /// Successor words that are phrase types (None = unspecified)
        #[serde(default)]
        successor_types: Option<Vec<String>>,
    },
}

/// One instance of a word or phrase type in the grammar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarNode {
    word: String,
    instance: String,
    #[serde(default)]
    initial: bool,
    #[serde(default)]
    begins_types: Option<Vec<String>>,
    kind: NodeKind,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    coords: Coords,
    #[serde(skip)]
    has_incoming: bool,
}

impl GrammarNode {
    /// Create a node with the given kind (not initial, no action)
    pub fn new(word: impl Into<String>, instance: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            word: word.into(),
            instance: instance.into(),
            initial: false,
            begins_types: None,
            kind,
            action: None,
            coords: Coords::default(),
            has_incoming: false,
        }
    }

    /// Create a final node ending `phrase_type`
    pub fn final_node(
        word: impl Into<String>,
        instance: impl Into<String>,
        phrase_type: impl Into<String>,
    ) -> Self {
        Self::new(
            word,
            instance,
            NodeKind::Final {
                phrase_type: phrase_type.into(),
                value: None,
            },
        )
    }

    /// Create a non-final node with the given successors
    pub fn non_final(
        word: impl Into<String>,
        instance: impl Into<String>,
        successors: Vec<SuccessorLink>,
    ) -> Self {
        Self::new(
            word,
            instance,
            NodeKind::NonFinal {
                successors,
                successor_types: None,
            },
        )
    }

    /// The word this node is an instance of
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Instance id, unique among the word's instances
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Whether the node can begin a phrase
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    /// Phrase types this node can begin (None = unspecified, assume any)
    pub fn begins_types(&self) -> Option<&[String]> {
        self.begins_types.as_deref()
    }

    /// Final or non-final payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether the node ends a phrase
    pub fn is_final(&self) -> bool {
        matches!(self.kind, NodeKind::Final { .. })
    }

    /// Phrase type ended here, for final nodes
    pub fn phrase_type(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Final { phrase_type, .. } => Some(phrase_type),
            NodeKind::NonFinal { .. } => None,
        }
    }

    /// Semantic value expression, for final nodes
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Final { value, .. } => value.as_deref(),
            NodeKind::NonFinal { .. } => None,
        }
    }

    /// Successor links (empty for final nodes)
    pub fn successors(&self) -> &[SuccessorLink] {
        match &self.kind {
            NodeKind::NonFinal { successors, .. } => successors,
            NodeKind::Final { .. } => &[],
        }
    }

    /// Declared successor phrase types, for non-final nodes
    pub fn successor_types(&self) -> Option<&[String]> {
        match &self.kind {
            NodeKind::NonFinal {
                successor_types, ..
            } => successor_types.as_deref(),
            NodeKind::Final { .. } => None,
        }
    }

    /// Semantic action evaluated when the parser enters this node
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Display coordinates
    pub fn coords(&self) -> Coords {
        self.coords
    }

    /// Whether any successor link in the grammar targets this node
    ///
    /// Only meaningful after [`GrammarStore::mark_incoming_edges`].
    pub fn has_incoming(&self) -> bool {
        self.has_incoming
    }

    /// Mark the node initial with the given begin set, or not initial
    pub fn set_initial(&mut self, initial: bool, begins_types: Option<Vec<String>>) {
        self.initial = initial;
        self.begins_types = if initial { begins_types } else { None };
    }

    /// Replace the begin set of an initial node
    pub fn set_begins_types(&mut self, begins_types: Option<Vec<String>>) {
        self.begins_types = begins_types;
    }

    /// Replace the successor-type set of a non-final node
    ///
    /// Has no effect on final nodes.
    pub fn set_successor_types(&mut self, types: Option<Vec<String>>) {
        if let NodeKind::NonFinal {
            successor_types, ..
        } = &mut self.kind
        {
            *successor_types = types;
        }
    }

    /// Set the semantic value expression of a final node
    ///
    /// Has no effect on non-final nodes.
    pub fn set_value(&mut self, expression: Option<String>) {
        if let NodeKind::Final { value, .. } = &mut self.kind {
            *value = expression;
        }
    }

    /// Set the semantic action expression
    pub fn set_action(&mut self, action: Option<String>) {
        self.action = action;
    }

    /// Set the display coordinates
    pub fn set_coords(&mut self, coords: Coords) {
        self.coords = coords;
    }

    pub(crate) fn successors_mut(&mut self) -> Option<&mut Vec<SuccessorLink>> {
        match &mut self.kind {
            NodeKind::NonFinal { successors, .. } => Some(successors),
            NodeKind::Final { .. } => None,
        }
    }
}

/// Serialized form of one lexicon entry
#[derive(Debug, Serialize, Deserialize)]
struct WordEntry {
    word: String,
    instances: Vec<GrammarNode>,
}

/// The lexicon of an ASD grammar
///
/// Nodes are never removed or reordered; each word's instances keep their
/// creation order.
#[derive(Debug, Clone, Default)]
pub struct GrammarStore {
    nodes: Vec<GrammarNode>,
    lexicon: HashMap<String, Vec<NodeId>>,
    incoming_marked: bool,
}

impl GrammarStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node to its word's instance list
    pub fn add_node(&mut self, node: GrammarNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.lexicon.entry(node.word.clone()).or_default().push(id);
        self.nodes.push(node);
        self.incoming_marked = false;
        id
    }

    /// Ensure a lexicon entry exists for `word`, even with no instances
    pub fn add_word(&mut self, word: &str) {
        if !self.lexicon.contains_key(word) {
            self.lexicon.insert(word.to_string(), Vec::new());
        }
    }

    /// The node with the given id
    ///
    /// # Panics
    /// Panics if `id` was not issued by this store.
    #[inline]
    pub fn node(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id.index()]
    }

    /// The node with the given id, if it exists
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&GrammarNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut GrammarNode {
        &mut self.nodes[id.index()]
    }

    /// All nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GrammarNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_index(i), node))
    }

    /// Number of grammar nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of lexicon entries
    pub fn word_count(&self) -> usize {
        self.lexicon.len()
    }

    /// Instances of `word` in creation order
    pub fn lookup_word(&self, word: &str) -> Option<&[NodeId]> {
        self.lexicon.get(word).map(Vec::as_slice)
    }

    /// Find an instance by name without touching any link cache
    pub fn find_instance(&self, word: &str, instance: &str) -> Option<NodeId> {
        self.lookup_word(word)?
            .iter()
            .copied()
            .find(|&id| self.node(id).instance == instance)
    }

    /// Resolve a successor link, memoizing the target on success
    pub fn lookup_instance(&self, link: &SuccessorLink) -> Option<NodeId> {
        if let Some(&id) = link.resolved.get() {
            return Some(id);
        }
        let id = self.find_instance(&link.word, &link.instance)?;
        Some(*link.resolved.get_or_init(|| id))
    }

    /// Whether `word` has exactly one instance
    pub fn unique_instance(&self, word: &str) -> bool {
        self.lookup_word(word).is_some_and(|ids| ids.len() == 1)
    }

    /// Lexicon words, the dummy word first and the rest case-insensitively
    pub fn words(&self) -> Vec<&str> {
        let mut words: Vec<&str> = self.lexicon.keys().map(String::as_str).collect();
        words.sort_by(|a, b| {
            (*a != DUMMY_WORD, a.to_lowercase(), *a).cmp(&(*b != DUMMY_WORD, b.to_lowercase(), *b))
        });
        words
    }

    /// Every phrase type ended by some final node
    pub fn phrase_types(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .filter_map(|node| node.phrase_type().map(str::to_string))
            .collect()
    }

    /// Set the has-incoming flag on every successor target
    ///
    /// Links that fail to resolve are reported to `sink`. Returns the number
    /// of dangling links.
    pub fn mark_incoming_edges(&mut self, sink: &mut dyn DiagnosticSink) -> usize {
        let mut targets = Vec::new();
        let mut dangling = 0;
        for node in &self.nodes {
            for link in node.successors() {
                match self.lookup_instance(link) {
                    Some(target) => targets.push(target),
                    None => {
                        dangling += 1;
                        sink.report(&format!(
                            "({} {}) has edge to non-existent node ({} {}).",
                            node.word, node.instance, link.word, link.instance
                        ));
                    }
                }
            }
        }
        for node in &mut self.nodes {
            node.has_incoming = false;
        }
        for target in targets {
            self.nodes[target.index()].has_incoming = true;
        }
        self.incoming_marked = true;
        log_debug!(
            "marked incoming edges over {} nodes, {} dangling",
            self.nodes.len(),
            dangling
        );
        dangling
    }

    /// [`mark_incoming_edges`](Self::mark_incoming_edges) reporting through [`LogSink`]
    pub fn mark_incoming_edges_logged(&mut self) -> usize {
        self.mark_incoming_edges(&mut LogSink)
    }

    /// Whether incoming edges are marked for the current contents
    pub fn incoming_marked(&self) -> bool {
        self.incoming_marked
    }

    /// Merge another grammar into this one
    ///
    /// Instance ids of the other grammar are shifted past the instances this
    /// grammar already has for the same word, and successor references are
    /// shifted the same way. Fails without modifying `self` when a shifted
    /// id is not an integer.
    pub fn merge(&mut self, other: GrammarStore) -> Result<(), GrammarError> {
        let existing = |word: &str| self.lookup_word(word).map_or(0, <[NodeId]>::len);

        let mut renumbered = Vec::with_capacity(other.nodes.len());
        for mut node in other.nodes {
            node.instance = shift_instance(&node.word, node.instance, existing(&node.word))?;
            if let Some(successors) = node.successors_mut() {
                for link in successors.iter_mut() {
                    let instance = std::mem::take(&mut link.instance);
                    link.instance = shift_instance(&link.word, instance, existing(&link.word))?;
                    link.reset_resolution();
                }
            }
            node.has_incoming = false;
            renumbered.push(node);
        }

        for word in other.lexicon.keys() {
            self.add_word(word);
        }
        for node in renumbered {
            self.add_node(node);
        }
        self.incoming_marked = false;
        Ok(())
    }

    /// Run the begins closure and successor-type computation
    pub fn optimize(&mut self) {
        super::optimizer::optimize(self);
    }

    /// Check the grammar for structural defects
    pub fn analyze_warnings(&self) -> Vec<GrammarWarning> {
        GrammarAnalyzer::new(self).analyze()
    }

    /// Serialize to JSON as an ordered list of word entries
    pub fn to_json(&self) -> Result<String, GrammarError> {
        let entries: Vec<WordEntry> = self
            .words()
            .into_iter()
            .map(|word| WordEntry {
                word: word.to_string(),
                instances: self
                    .lookup_word(word)
                    .unwrap_or_default()
                    .iter()
                    .map(|&id| self.node(id).clone())
                    .collect(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Deserialize from JSON produced by [`to_json`](Self::to_json)
    ///
    /// Incoming edges are left unmarked.
    pub fn from_json(s: &str) -> Result<Self, GrammarError> {
        let entries: Vec<WordEntry> = serde_json::from_str(s)?;
        let mut store = GrammarStore::new();
        for entry in entries {
            store.add_word(&entry.word);
            for mut node in entry.instances {
                node.word = entry.word.clone();
                store.add_node(node);
            }
        }
        Ok(store)
    }
}

fn shift_instance(word: &str, instance: String, offset: usize) -> Result<String, GrammarError> {
    if offset == 0 {
        return Ok(instance);
    }
    match instance.trim().parse::<i64>() {
        Ok(n) => Ok((n + offset as i64).to_string()),
        Err(_) => Err(GrammarError::NonNumericInstance {
            word: word.to_string(),
            instance,
        }),
    }
}
