//! Arena storage for phrase structures
//!
//! A phrase structure is a chain of [`PhraseNode`]s linked through `next`,
//! each optionally expanding into a nested subphrase chain. Nodes live in a
//! [`PhraseArena`] and refer to each other by [`PhraseId`].
//!
//! The parse engine never frees nodes during a parse. Copying a node pushes
//! a new slot, so a snapshot that still holds the old id keeps seeing the
//! old contents, while every holder of a shared id observes in-place edits.
//! Completed subphrases are shared between alternatives by id.

use super::grammar::NodeId;
use super::value::Value;

/// Index of a phrase node in its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhraseId(u32);

impl PhraseId {
    /// Position of the node in the arena
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One unit of a phrase structure
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhraseNode {
    pub(crate) word: String,
    pub(crate) instance: Option<NodeId>,
    pub(crate) next: Option<PhraseId>,
    pub(crate) subphrase: Option<PhraseId>,
    pub(crate) value: Option<Value>,
}

impl PhraseNode {
    /// Create an unmatched node for `word`
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    /// Surface token or completed phrase type
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Grammar node this phrase node is matched to
    pub fn instance(&self) -> Option<NodeId> {
        self.instance
    }

    /// Following node on the same level
    pub fn next(&self) -> Option<PhraseId> {
        self.next
    }

    /// First node of the nested expansion
    pub fn subphrase(&self) -> Option<PhraseId> {
        self.subphrase
    }

    /// Semantic value of a completed subphrase
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// The arena allocator for phrase nodes
///
/// Slots are never freed one at a time. Spine copies and reductions leave
/// the slots they replace unreachable, so the arena grows with the number of
/// steps taken in one parse, backtracking included. [`PhraseArena::reset`]
/// releases everything; `AsdParser::initialize` calls it before each input.
#[derive(Debug, Clone, Default)]
pub struct PhraseArena {
    nodes: Vec<PhraseNode>,
}

impl PhraseArena {
    /// Create a new arena with default capacity
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a new arena with specified initial capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Number of allocated nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been allocated
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node, invalidating all ids
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    /// Allocate a node
    #[inline]
    pub fn alloc(&mut self, node: PhraseNode) -> PhraseId {
        let id = PhraseId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocate a copy of an existing node
    #[inline]
    pub fn duplicate(&mut self, id: PhraseId) -> PhraseId {
        let copy = self.nodes[id.index()].clone();
        self.alloc(copy)
    }

    /// The node with the given id
    #[inline]
    pub fn get(&self, id: PhraseId) -> &PhraseNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: PhraseId) -> &mut PhraseNode {
        &mut self.nodes[id.index()]
    }

    /// Allocate a chain for `tokens` behind a header node with word `header`
    ///
    /// Returns the header.
    pub fn chain(&mut self, header: &str, tokens: &[String]) -> PhraseId {
        let head = self.alloc(PhraseNode::new(header));
        let mut last = head;
        for token in tokens {
            let id = self.alloc(PhraseNode::new(token.as_str()));
            self.get_mut(last).next = Some(id);
            last = id;
        }
        head
    }

    /// Ids along the `next` chain starting at `from`
    pub fn iter_chain(&self, from: Option<PhraseId>) -> ChainIter<'_> {
        ChainIter {
            arena: self,
            current: from,
        }
    }

    /// Render the phrase starting at `from`, parenthesizing every
    /// subphrase with more than one word other than `dummy_word`
    pub fn bracket_phrase(&self, from: PhraseId, dummy_word: &str) -> String {
        let node = self.get(from);
        if node.next.is_none() {
            return match node.subphrase {
                Some(sub) => self.bracket_phrase(sub, dummy_word),
                None => node.word.clone(),
            };
        }

        let mut real = self
            .iter_chain(Some(from))
            .filter(|&id| self.get(id).word != dummy_word);
        if let (Some(only), None) = (real.next(), real.next()) {
            return match self.get(only).subphrase {
                Some(sub) => self.bracket_phrase(sub, dummy_word),
                None => self.get(only).word.clone(),
            };
        }

        let mut out = String::new();
        let mut sep = '(';
        for id in self.iter_chain(Some(from)) {
            let node = self.get(id);
            match node.subphrase {
                Some(sub) => {
                    out.push(sep);
                    out.push_str(&self.bracket_phrase(sub, dummy_word));
                }
                None if node.word != dummy_word => {
                    out.push(sep);
                    out.push_str(&node.word);
                }
                None => {}
            }
            sep = ' ';
        }
        out.push(')');
        out
    }
}

/// Iterator over a `next` chain
pub struct ChainIter<'a> {
    arena: &'a PhraseArena,
    current: Option<PhraseId>,
}

impl Iterator for ChainIter<'_> {
    type Item = PhraseId;

    fn next(&mut self) -> Option<PhraseId> {
        let id = self.current?;
        self.current = self.arena.get(id).next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_chain_links_tokens() {
        let mut arena = PhraseArena::new();
        let head = arena.chain("nil", &tokens(&["a", "cat"]));
        let words: Vec<&str> = arena
            .iter_chain(Some(head))
            .map(|id| arena.get(id).word())
            .collect();
        assert_eq!(words, vec!["nil", "a", "cat"]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut arena = PhraseArena::new();
        let head = arena.chain("nil", &tokens(&["cat"]));
        let copy = arena.duplicate(head);
        arena.get_mut(copy).next = None;
        assert!(arena.get(head).next().is_some());
        assert_eq!(arena.get(copy).word(), "nil");
    }

    #[test]
    fn test_bracket_single_word() {
        let mut arena = PhraseArena::new();
        let head = arena.chain("nil", &tokens(&["cat"]));
        let first = arena.get(head).next().unwrap();
        assert_eq!(arena.bracket_phrase(first, "$$"), "cat");
    }

    #[test]
    fn test_bracket_nested() {
        let mut arena = PhraseArena::new();
        let head = arena.chain("nil", &tokens(&["a", "cat"]));
        let a = arena.get(head).next().unwrap();
        let noun = arena.alloc(PhraseNode {
            word: "NOUN".to_string(),
            subphrase: Some(a),
            ..PhraseNode::default()
        });
        assert_eq!(arena.bracket_phrase(noun, "$$"), "(a cat)");
    }

    #[test]
    fn test_bracket_skips_dummies() {
        let mut arena = PhraseArena::new();
        let head = arena.chain("nil", &tokens(&["$$", "cat", "$$"]));
        let first = arena.get(head).next().unwrap();
        assert_eq!(arena.bracket_phrase(first, "$$"), "cat");

        let head = arena.chain("nil", &tokens(&["big", "$$", "cat"]));
        let first = arena.get(head).next().unwrap();
        assert_eq!(arena.bracket_phrase(first, "$$"), "(big cat)");
    }
}
