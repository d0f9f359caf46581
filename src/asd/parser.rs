//! The backtracking ASD parse engine
//!
//! A parse walks the input's phrase structure one move at a time. At each
//! position the engine computes the legal moves ([`ParseChoice`]s) from the
//! grammar node matched there:
//!
//! - **Initial**: begin a new subphrase at the next phrase node
//! - **NonDummy**: continue the open subphrase onto the next phrase node
//! - **Dummy**: continue through an epsilon node inserted after the current one
//! - **Final**: complete the open subphrase, reducing it to one node named
//!   by its phrase type
//!
//! Whenever more than one move is available the engine snapshots its state
//! onto a backtrack stack before committing to the first; [`AsdParser::backup`]
//! resumes the most recent snapshot with the remaining moves.
//!
//! Snapshots copy only the spine of the phrase structure that later moves
//! would change. Completed subphrases are shared between snapshots. A
//! subphrase whose parse is provably unique (its first instance has no
//! incoming edges and its words have a single lexicon instance each) is
//! collapsed in place on completion instead of being copied, and
//! [`backup`](AsdParser::backup) prunes the choices that such a collapse
//! made obsolete.
//!
//! # Example
//!
//! ```
//! use asd_parser::asd::builder::{node, GrammarBuilder};
//! use asd_parser::asd::parser::AsdParser;
//!
//! let grammar = GrammarBuilder::new()
//!     .node(node("a", "1").initial().to("cat", "1"))
//!     .node(node("cat", "1").initial().ends("NOUN"))
//!     .build();
//!
//! let mut parser = AsdParser::new(&grammar).unwrap();
//! parser.initialize("a cat", &["NOUN"]);
//! assert!(parser.parse());
//! assert_eq!(parser.bracket_phrase(), "(a cat)");
//! ```

use super::arena::{PhraseArena, PhraseId, PhraseNode};
use super::debug::TreePrinter;
use super::error::EngineError;
use super::grammar::{GrammarStore, NodeId, NodeKind, DUMMY_WORD};
use super::segment::{Segmenter, SegmenterConfig};
use super::semantics::{Features, NoSemantics, SemanticContext, Semantics, Signal, ValueOutcome};
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::rc::Rc;

/// Default wildcard word, matching any token
pub const DEFAULT_ANYTHING: &str = "ANYTHING";

/// Default lexicon entry consulted for unlisted integer tokens
pub const DEFAULT_NUMBER: &str = "NUMBER";

/// Default lexicon entry consulted for unlisted quoted tokens
pub const DEFAULT_STRING: &str = "STRING";

/// Default lexicon entry consulted for other unlisted tokens
pub const DEFAULT_UNKNOWN: &str = "UNKNOWN";

/// Word of the synthetic node heading every phrase structure
pub const HEADER_WORD: &str = "nil";

/// Parser configuration
///
/// # Example
///
/// ```rust
/// use asd_parser::asd::parser::ParserConfig;
///
/// let config = ParserConfig::new()
///     .with_anything_word("*")
///     .with_save_uniquely_parsed_subphrases(false);
/// assert_eq!(config.dummy_word, "$$");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Successor word matching any token
    pub anything_word: String,
    /// Successor word marking an epsilon move
    pub dummy_word: String,
    /// Lexicon entry for unlisted integers
    pub number_word: String,
    /// Lexicon entry for unlisted quoted strings
    pub string_word: String,
    /// Lexicon entry for other unlisted tokens
    pub unknown_word: String,
    /// Collapse uniquely parsed subphrases in place
    pub save_uniquely_parsed_subphrases: bool,
    /// Input tokenization
    pub segmenter: SegmenterConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            anything_word: DEFAULT_ANYTHING.to_string(),
            dummy_word: DUMMY_WORD.to_string(),
            number_word: DEFAULT_NUMBER.to_string(),
            string_word: DEFAULT_STRING.to_string(),
            unknown_word: DEFAULT_UNKNOWN.to_string(),
            save_uniquely_parsed_subphrases: true,
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl ParserConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wildcard word
    pub fn with_anything_word(mut self, word: &str) -> Self {
        self.anything_word = word.to_string();
        self
    }

    /// Set the dummy word
    pub fn with_dummy_word(mut self, word: &str) -> Self {
        self.dummy_word = word.to_string();
        self
    }

    /// Set the lexicon entry for unlisted integers
    pub fn with_number_word(mut self, word: &str) -> Self {
        self.number_word = word.to_string();
        self
    }

    /// Set the lexicon entry for unlisted quoted strings
    pub fn with_string_word(mut self, word: &str) -> Self {
        self.string_word = word.to_string();
        self
    }

    /// Set the lexicon entry for other unlisted tokens
    pub fn with_unknown_word(mut self, word: &str) -> Self {
        self.unknown_word = word.to_string();
        self
    }

    /// Enable or disable in-place collapse of uniquely parsed subphrases
    pub fn with_save_uniquely_parsed_subphrases(mut self, save: bool) -> Self {
        self.save_uniquely_parsed_subphrases = save;
        self
    }

    /// Set the input tokenization
    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }
}

/// Kind of move that produced a parse state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvanceKind {
    /// Began a subphrase
    Initial,
    /// Completed a subphrase
    Final,
    /// Took an epsilon move
    Dummy,
    /// Continued onto the next token
    NonDummy,
}

/// One candidate move from a parse position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseChoice {
    /// Begin a subphrase at the next phrase node, matched to this instance
    Initial(NodeId),
    /// Continue onto the next phrase node, matched to this instance
    NonDummy(NodeId),
    /// Insert an epsilon node matched to this instance
    Dummy(NodeId),
    /// Complete the open subphrase as this phrase type
    Final(String),
}

impl ParseChoice {
    /// The kind of move
    pub fn kind(&self) -> AdvanceKind {
        match self {
            ParseChoice::Initial(_) => AdvanceKind::Initial,
            ParseChoice::NonDummy(_) => AdvanceKind::NonDummy,
            ParseChoice::Dummy(_) => AdvanceKind::Dummy,
            ParseChoice::Final(_) => AdvanceKind::Final,
        }
    }

    /// Grammar node entered by the move
    pub fn target(&self) -> Option<NodeId> {
        match self {
            ParseChoice::Initial(id) | ParseChoice::NonDummy(id) | ParseChoice::Dummy(id) => Some(*id),
            ParseChoice::Final(_) => None,
        }
    }
}

/// Saved context of a suspended subphrase
#[derive(Debug, Clone)]
struct SubphraseFrame {
    beginning: usize,
    features: Features,
    unique: bool,
}

/// Persistent list of the moves on the current path
#[derive(Debug)]
struct PathLink {
    choice: ParseChoice,
    prev: Option<Rc<PathLink>>,
}

/// Everything that distinguishes one alternative from another
#[derive(Debug, Clone)]
struct ParseState {
    phrase_structure: PhraseId,
    current: PhraseId,
    /// Untried moves at `current`; None until computed
    choices: Option<VecDeque<ParseChoice>>,
    /// Position of the open subphrase's first node, counted from the header
    beginning: usize,
    features: Features,
    unique: bool,
    frames: Vec<SubphraseFrame>,
    /// Subphrase of the node after `current` when this state was saved
    next_node_subphrase: Option<PhraseId>,
    advance_case: Option<AdvanceKind>,
    path: Option<Rc<PathLink>>,
}

impl ParseState {
    fn at_header(header: PhraseId) -> Self {
        Self {
            phrase_structure: header,
            current: header,
            choices: None,
            beginning: 0,
            features: Features::new(),
            unique: false,
            frames: Vec::new(),
            next_node_subphrase: None,
            advance_case: None,
            path: None,
        }
    }
}

/// Outcome of one complete parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSummary {
    /// The parsed input
    pub input: String,
    /// Whether a goal phrase was recognized
    pub success: bool,
    /// Advances and backups performed
    pub steps: u64,
    /// The recognized phrase type
    pub phrase_type: Option<String>,
    /// Bracketed rendering of the recognized phrase
    pub bracketed: Option<String>,
    /// Semantic value of the recognized phrase
    pub value: Option<Value>,
}

#[cold]
fn broken_invariant(what: &str) -> ! {
    panic!("ASD parser invariant violated: {}", what)
}

/// The ASD parse engine
///
/// One parser holds one parse at a time; the grammar is only read and may
/// be shared by any number of parsers.
pub struct AsdParser<'g, S = NoSemantics> {
    grammar: &'g GrammarStore,
    config: ParserConfig,
    segmenter: Segmenter,
    semantics: Option<S>,
    arena: PhraseArena,
    state: ParseState,
    backstack: Vec<ParseState>,
    expected_types: Vec<String>,
    step: u64,
}

impl<'g> AsdParser<'g, NoSemantics> {
    /// Create a parser without semantics
    ///
    /// Fails if the grammar's incoming edges have not been marked.
    pub fn new(grammar: &'g GrammarStore) -> Result<Self, EngineError> {
        Self::with_config(grammar, ParserConfig::default())
    }

    /// Create a parser without semantics using `config`
    pub fn with_config(grammar: &'g GrammarStore, config: ParserConfig) -> Result<Self, EngineError> {
        if !grammar.incoming_marked() {
            return Err(EngineError::UnmarkedGrammar);
        }
        Ok(Self::assemble(grammar, config, None))
    }

    /// Mark the grammar's incoming edges if needed, then create a parser
    pub fn prepare(grammar: &'g mut GrammarStore) -> Self {
        if !grammar.incoming_marked() {
            grammar.mark_incoming_edges_logged();
        }
        let grammar: &'g GrammarStore = grammar;
        Self::assemble(grammar, ParserConfig::default(), None)
    }
}

impl<'g, S: Semantics> AsdParser<'g, S> {
    /// Create a parser that evaluates actions and values through `semantics`
    pub fn with_semantics(
        grammar: &'g GrammarStore,
        config: ParserConfig,
        semantics: S,
    ) -> Result<Self, EngineError> {
        if !grammar.incoming_marked() {
            return Err(EngineError::UnmarkedGrammar);
        }
        Ok(Self::assemble(grammar, config, Some(semantics)))
    }

    fn assemble(grammar: &'g GrammarStore, config: ParserConfig, semantics: Option<S>) -> Self {
        let segmenter = Segmenter::new(config.segmenter.clone());
        let mut arena = PhraseArena::new();
        let header = arena.chain(HEADER_WORD, &[]);
        Self {
            grammar,
            config,
            segmenter,
            semantics,
            arena,
            state: ParseState::at_header(header),
            backstack: Vec::new(),
            expected_types: Vec::new(),
            step: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The grammar being parsed against
    pub fn grammar(&self) -> &'g GrammarStore {
        self.grammar
    }

    /// The configuration in use
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// The semantics, if any
    pub fn semantics(&self) -> Option<&S> {
        self.semantics.as_ref()
    }

    /// The semantics, mutably
    pub fn semantics_mut(&mut self) -> Option<&mut S> {
        self.semantics.as_mut()
    }

    /// The phrase node arena
    pub fn arena(&self) -> &PhraseArena {
        &self.arena
    }

    /// Header of the current phrase structure
    pub fn phrase_structure(&self) -> PhraseId {
        self.state.phrase_structure
    }

    /// The phrase node the parse is at
    pub fn current_node(&self) -> PhraseId {
        self.state.current
    }

    /// Goal phrase types of the current parse
    pub fn expected_types(&self) -> &[String] {
        &self.expected_types
    }

    /// Advances and backups performed since initialization
    pub fn step_number(&self) -> u64 {
        self.step
    }

    /// Number of saved alternatives
    pub fn backtrack_depth(&self) -> usize {
        self.backstack.len()
    }

    /// Whether the open subphrase is so far uniquely parsed
    pub fn is_unique(&self) -> bool {
        self.state.unique
    }

    /// Kind of the last move taken on this path
    pub fn advance_case(&self) -> Option<AdvanceKind> {
        self.state.advance_case
    }

    /// Untried moves at the current position, if computed
    pub fn pending_choices(&self) -> Option<&VecDeque<ParseChoice>> {
        self.state.choices.as_ref()
    }

    /// Features of the open subphrase
    pub fn features(&self) -> &Features {
        &self.state.features
    }

    /// Value of a feature of the open subphrase
    pub fn get(&self, feature: &str) -> Option<&Value> {
        self.state.features.get(feature)
    }

    /// Set a feature of the open subphrase
    pub fn set(&mut self, feature: &str, value: Value) {
        self.state.features.insert(feature.to_string(), value);
    }

    /// Moves on the current path, oldest first, excluding abandoned ones
    pub fn taken_choices(&self) -> Vec<ParseChoice> {
        let mut choices = Vec::new();
        let mut link = self.state.path.as_deref();
        while let Some(l) = link {
            choices.push(l.choice.clone());
            link = l.prev.as_deref();
        }
        choices.reverse();
        choices
    }

    /// First node after the header
    pub fn top_phrase(&self) -> Option<PhraseId> {
        self.arena.get(self.state.phrase_structure).next()
    }

    /// Phrase type recognized by a completed parse
    pub fn completed_type(&self) -> Option<&str> {
        if !self.done() {
            return None;
        }
        self.top_phrase().map(|id| self.arena.get(id).word())
    }

    /// Semantic value of the phrase recognized by a completed parse
    pub fn completed_value(&self) -> Option<&Value> {
        if !self.done() {
            return None;
        }
        self.top_phrase().and_then(|id| self.arena.get(id).value())
    }

    /// The phrase structure with every multi-word subphrase parenthesized
    pub fn bracket_phrase(&self) -> String {
        match self.top_phrase() {
            Some(first) => self.arena.bracket_phrase(first, &self.config.dummy_word),
            None => String::new(),
        }
    }

    /// Indented rendering of the phrase structure, current node marked `*->`
    pub fn show_tree(&self) -> String {
        TreePrinter::new().print(
            &self.arena,
            self.grammar,
            self.state.phrase_structure,
            Some(self.state.current),
        )
    }

    // ========================================================================
    // Driving a parse
    // ========================================================================

    /// Start a new parse of `input` looking for one of the `goals` phrase types
    pub fn initialize(&mut self, input: &str, goals: &[&str]) {
        let tokens = self.segmenter.segment(input);
        self.initialize_tokens(&tokens, goals);
    }

    /// Start a new parse of pre-segmented tokens
    pub fn initialize_tokens(&mut self, tokens: &[String], goals: &[&str]) {
        self.arena.reset();
        let header = self.arena.chain(HEADER_WORD, tokens);
        self.state = ParseState::at_header(header);
        self.backstack.clear();
        self.expected_types = goals.iter().map(|g| g.to_string()).collect();
        self.step = 0;
        log_debug!("initialized parse of {} tokens", tokens.len());
    }

    /// Whether the parse is complete: back at the header with a single
    /// top-level node whose word is a goal type
    pub fn done(&self) -> bool {
        if self.state.current != self.state.phrase_structure {
            return false;
        }
        let Some(top) = self.top_phrase() else {
            return false;
        };
        let top = self.arena.get(top);
        top.next().is_none() && self.expected_types.iter().any(|t| t == top.word())
    }

    /// Find the next parse
    ///
    /// Returns false when every alternative is exhausted or a callback quits.
    pub fn parse(&mut self) -> bool {
        loop {
            match self.advance() {
                Signal::Quit => return false,
                Signal::Succeed => {
                    if self.done() {
                        return true;
                    }
                }
                Signal::NoAdvance => {
                    if !self.backup() {
                        return false;
                    }
                }
            }
        }
    }

    /// Find the next parse within `max_steps` advances
    ///
    /// Returns the number of advances made, positive on success and
    /// negative on failure, quit or exhaustion of the budget.
    pub fn parse_bounded(&mut self, max_steps: u64) -> i64 {
        let mut steps: i64 = 0;
        while (steps as u64) < max_steps {
            steps += 1;
            match self.advance() {
                Signal::Quit => return -steps,
                Signal::Succeed => {
                    if self.done() {
                        return steps;
                    }
                }
                Signal::NoAdvance => {
                    if !self.backup() {
                        return -steps;
                    }
                }
            }
        }
        -steps
    }

    /// Initialize, parse and summarize in one call
    pub fn run(&mut self, input: &str, goals: &[&str]) -> ParseSummary {
        self.initialize(input, goals);
        let success = self.parse();
        self.summary(input, success)
    }

    /// Summarize the current parse
    pub fn summary(&self, input: &str, success: bool) -> ParseSummary {
        ParseSummary {
            input: input.to_string(),
            success,
            steps: self.step,
            phrase_type: success.then(|| self.completed_type().map(str::to_string)).flatten(),
            bracketed: success.then(|| self.bracket_phrase()),
            value: success.then(|| self.completed_value().cloned()).flatten(),
        }
    }

    /// Re-run a recorded sequence of moves from a fresh parse of `input`
    ///
    /// Returns whether every move applied and the parse ended complete.
    pub fn replay(&mut self, input: &str, goals: &[&str], choices: &[ParseChoice]) -> bool {
        self.initialize(input, goals);
        for choice in choices {
            if self.advance_with(choice) != Signal::Succeed {
                return false;
            }
        }
        self.done()
    }

    /// Advance by a specific move, if it is among the current choices
    ///
    /// The remaining choices stay available for backup.
    pub fn advance_with(&mut self, choice: &ParseChoice) -> Signal {
        let mut pending = match self.state.choices.take() {
            Some(pending) => pending,
            None => self.choices(true, None),
        };
        let Some(pos) = pending.iter().position(|c| c == choice) else {
            self.state.choices = Some(pending);
            return Signal::NoAdvance;
        };
        if let Some(chosen) = pending.remove(pos) {
            pending.push_front(chosen);
        }
        self.state.choices = Some(pending);
        self.advance()
    }

    /// Take the next untried move from the current position
    pub fn advance(&mut self) -> Signal {
        let mut pending = match self.state.choices.take() {
            Some(pending) => pending,
            None => self.choices(true, None),
        };
        let Some(choice) = pending.pop_front() else {
            self.state.choices = Some(pending);
            return Signal::NoAdvance;
        };
        self.state.advance_case = Some(choice.kind());
        let ambiguous = !pending.is_empty();
        self.state.choices = Some(pending);
        if ambiguous {
            self.state.unique = false;
            self.state.next_node_subphrase = self
                .arena
                .get(self.state.current)
                .next()
                .and_then(|next| self.arena.get(next).subphrase());
            self.backstack.push(self.state.clone());
        }
        log_debug!("step {}: {:?}", self.step + 1, choice);

        let entered = match &choice {
            ParseChoice::Final(phrase_type) => {
                let signal = self.advance_final(phrase_type);
                if signal != Signal::Succeed {
                    return signal;
                }
                None
            }
            ParseChoice::Initial(target) => {
                self.advance_initial(*target);
                Some(*target)
            }
            ParseChoice::NonDummy(target) => {
                self.advance_non_dummy(*target);
                Some(*target)
            }
            ParseChoice::Dummy(target) => {
                self.advance_dummy(*target);
                Some(*target)
            }
        };
        if let Some(target) = entered {
            let signal = self.run_action(target);
            if signal != Signal::Succeed {
                return signal;
            }
        }

        self.state.path = Some(Rc::new(PathLink {
            choice,
            prev: self.state.path.take(),
        }));
        self.step += 1;
        Signal::Succeed
    }

    /// Resume the most recently saved alternative
    ///
    /// Returns false when no alternative is left.
    pub fn backup(&mut self) -> bool {
        let Some(saved) = self.backstack.pop() else {
            return false;
        };
        self.state = saved;

        if let Some(next) = self.arena.get(self.state.current).next() {
            // A collapse at the next node since this state was saved
            // invalidates the choices that led into it.
            if self.arena.get(next).subphrase() != self.state.next_node_subphrase {
                let mut pending = self.state.choices.take().unwrap_or_default();
                if self.state.advance_case == Some(AdvanceKind::Dummy) {
                    let dummies: Vec<NodeId> = pending
                        .iter()
                        .filter_map(|c| match c {
                            ParseChoice::Dummy(id) => Some(*id),
                            _ => None,
                        })
                        .collect();
                    pending = self.choices(true, Some(&dummies));
                } else {
                    pending.retain(|c| matches!(c, ParseChoice::Dummy(_)));
                }
                self.state.choices = Some(pending);
            }
        }

        self.step += 1;
        log_debug!("step {}: backed up, {} saved states left", self.step, self.backstack.len());
        true
    }

    // ========================================================================
    // Choice generation
    // ========================================================================

    /// Legal moves from the current position
    ///
    /// Dummy moves are included only when `include_dummies` is set, and then
    /// only those into `dummies` when it is given.
    fn choices(&self, include_dummies: bool, dummies: Option<&[NodeId]>) -> VecDeque<ParseChoice> {
        let anything = self.config.anything_word.as_str();
        let current = self.state.current;

        if current == self.state.phrase_structure {
            let Some(next) = self.arena.get(current).next() else {
                return VecDeque::new();
            };
            let goals = Some(self.expected_types.as_slice());
            let mut result: VecDeque<ParseChoice> =
                self.initials_for_types(self.arena.get(next).word(), goals).into();
            result.extend(self.initials_for_types(anything, goals));
            return result;
        }

        let grammar = self.grammar;
        let matched = self
            .arena
            .get(current)
            .instance()
            .unwrap_or_else(|| broken_invariant("interior phrase node has no grammar instance"));
        let (successors, types) = match grammar.node(matched).kind() {
            NodeKind::Final { phrase_type, .. } => {
                return VecDeque::from([ParseChoice::Final(phrase_type.clone())]);
            }
            NodeKind::NonFinal {
                successors,
                successor_types,
            } => (successors, successor_types.as_deref()),
        };

        let next_word = self.arena.get(current).next().map(|next| self.arena.get(next).word());
        let mut result = VecDeque::new();
        let mut initials_in = false;
        for link in successors {
            if link.word() == self.config.dummy_word {
                if !include_dummies {
                    continue;
                }
                let Some(target) = grammar.lookup_instance(link) else {
                    continue;
                };
                if dummies.map_or(true, |only| only.contains(&target)) {
                    result.push_back(ParseChoice::Dummy(target));
                }
                continue;
            }

            let Some(next_word) = next_word else {
                continue;
            };
            if next_word == link.word() || link.word() == anything {
                if let Some(target) = grammar.lookup_instance(link) {
                    result.push_back(ParseChoice::NonDummy(target));
                }
            }
            if initials_in {
                continue;
            }
            match types {
                None => {
                    initials_in = true;
                    result.extend(self.initials_for_types(next_word, None));
                    result.extend(self.initials_for_types(anything, None));
                }
                Some(types) if types.iter().any(|t| t == link.word()) => {
                    initials_in = true;
                    result.extend(self.initials_for_types(next_word, Some(types)));
                    result.extend(self.initials_for_types(anything, Some(types)));
                }
                Some(_) => {}
            }
        }
        result
    }

    /// Initial instances of `word` able to begin one of the `expected` types
    ///
    /// Words missing from the lexicon fall back to the number, string or
    /// unknown entry. `expected` of None admits every initial instance.
    fn initials_for_types(&self, word: &str, expected: Option<&[String]>) -> Vec<ParseChoice> {
        let config = &self.config;
        let mut entry = self.grammar.lookup_word(word);
        if entry.is_none() && word != config.anything_word {
            let fallback = if word.parse::<i32>().is_ok() {
                &config.number_word
            } else if word.starts_with(config.segmenter.open_quote) {
                &config.string_word
            } else {
                &config.unknown_word
            };
            entry = self.grammar.lookup_word(fallback);
        }

        entry
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|&id| {
                let node = self.grammar.node(id);
                if !node.is_initial() {
                    return false;
                }
                match (node.begins_types(), expected) {
                    (Some(begins), Some(expected)) => expected.iter().any(|t| begins.contains(t)),
                    _ => true,
                }
            })
            .map(ParseChoice::Initial)
            .collect()
    }

    // ========================================================================
    // Moves
    // ========================================================================

    fn next_of(&self, id: PhraseId) -> PhraseId {
        self.arena
            .get(id)
            .next()
            .unwrap_or_else(|| broken_invariant("phrase chain ended before the current node"))
    }

    /// Copy the spine from the header through `last`, returning the copy of `last`
    ///
    /// The copy becomes the phrase structure of the current state.
    fn copy_spine_through(&mut self, last: PhraseId) -> PhraseId {
        let header = self.state.phrase_structure;
        let mut copy = self.arena.duplicate(header);
        self.state.phrase_structure = copy;
        let mut old = header;
        while old != last {
            old = self.next_of(old);
            let next_copy = self.arena.duplicate(old);
            self.arena.get_mut(copy).next = Some(next_copy);
            copy = next_copy;
        }
        copy
    }

    fn advance_initial(&mut self, target: NodeId) {
        let current = self.next_of(self.state.current);
        self.state.current = current;
        self.arena.get_mut(current).instance = Some(target);

        self.state.frames.push(SubphraseFrame {
            beginning: self.state.beginning,
            features: std::mem::take(&mut self.state.features),
            unique: self.state.unique,
        });
        self.state.beginning = self
            .arena
            .iter_chain(Some(self.state.phrase_structure))
            .take_while(|&id| id != current)
            .count();
        self.state.unique = !self.grammar.node(target).has_incoming()
            && self.grammar.unique_instance(self.arena.get(current).word());
        self.state.choices = None;
    }

    fn advance_non_dummy(&mut self, target: NodeId) {
        let current = self.next_of(self.state.current);
        self.state.current = current;
        self.arena.get_mut(current).instance = Some(target);
        self.state.choices = None;
        self.state.unique =
            self.state.unique && self.grammar.unique_instance(self.arena.get(current).word());
    }

    fn advance_dummy(&mut self, target: NodeId) {
        let current = self.state.current;
        let dummy = self.arena.alloc(PhraseNode {
            word: self.config.dummy_word.clone(),
            instance: Some(target),
            next: self.arena.get(current).next(),
            subphrase: None,
            value: None,
        });
        let insert_after = if self.backstack.is_empty() {
            current
        } else {
            self.copy_spine_through(current)
        };
        self.arena.get_mut(insert_after).next = Some(dummy);
        self.state.current = dummy;
        self.state.choices = None;
    }

    fn advance_final(&mut self, phrase_type: &str) -> Signal {
        let grammar = self.grammar;
        let current = self.state.current;
        let matched = self
            .arena
            .get(current)
            .instance()
            .unwrap_or_else(|| broken_invariant("final move from an unmatched phrase node"));

        let value = match (grammar.node(matched).value(), self.semantics.as_mut()) {
            (Some(expression), Some(semantics)) if !expression.is_empty() => {
                let mut ctx =
                    SemanticContext::new(grammar, &self.arena, current, &mut self.state.features);
                match semantics.semantic_value(expression, &mut ctx) {
                    ValueOutcome::Value(value) => Some(value),
                    ValueOutcome::NoAdvance => return Signal::NoAdvance,
                    ValueOutcome::Quit => return Signal::Quit,
                }
            }
            (expression, _) => expression.map(Value::string),
        };

        let mut prev = self.state.phrase_structure;
        for _ in 1..self.state.beginning {
            prev = self.next_of(prev);
        }
        let first = self.next_of(prev);

        if !self.config.save_uniquely_parsed_subphrases
            || (!self.state.unique && !self.backstack.is_empty())
        {
            self.reduce_by_copy(phrase_type, value, first);
        } else {
            self.reduce_in_place(phrase_type, value, prev, first);
        }

        let frame = self
            .state
            .frames
            .pop()
            .unwrap_or_else(|| broken_invariant("completed a subphrase that was never opened"));
        self.state.unique = frame.unique && self.state.unique;
        self.state.features = frame.features;
        self.state.beginning = frame.beginning;

        self.state.choices = if self.done() {
            None
        } else {
            Some(self.choices(false, None))
        };
        Signal::Succeed
    }

    /// Reduce `first..=current` under a new node on a copied spine
    ///
    /// Nothing reachable from a saved state is modified.
    fn reduce_by_copy(&mut self, phrase_type: &str, value: Option<Value>, first: PhraseId) {
        let current = self.state.current;
        let reduced = self.arena.alloc(PhraseNode {
            word: phrase_type.to_string(),
            instance: None,
            next: self.arena.get(current).next(),
            subphrase: None,
            value,
        });

        let mut copy = self.arena.duplicate(first);
        self.arena.get_mut(reduced).subphrase = Some(copy);
        let mut old = first;
        while old != current {
            old = self.next_of(old);
            let next_copy = self.arena.duplicate(old);
            self.arena.get_mut(copy).next = Some(next_copy);
            copy = next_copy;
        }
        self.arena.get_mut(copy).next = None;

        let header = self.state.phrase_structure;
        let mut before = header;
        while self.arena.get(before).next() != Some(first) {
            before = self.next_of(before);
        }
        let spine_end = self.copy_spine_through(before);
        self.arena.get_mut(spine_end).next = Some(reduced);
        self.state.current = spine_end;
    }

    /// Reduce `first..=current` by rewriting `first` in place
    ///
    /// `first`'s old contents move one level down as a fresh copy. When saved
    /// states may still point into the subphrase, its remaining nodes are
    /// copied rather than truncated.
    fn reduce_in_place(
        &mut self,
        phrase_type: &str,
        value: Option<Value>,
        prev: PhraseId,
        first: PhraseId,
    ) {
        let current = self.state.current;
        let pushed_down = self.arena.duplicate(first);
        let after = self.arena.get(current).next();
        {
            let node = self.arena.get_mut(first);
            node.word = phrase_type.to_string();
            node.instance = None;
            node.subphrase = Some(pushed_down);
            node.value = value;
            node.next = after;
        }

        if current == first {
            self.arena.get_mut(pushed_down).next = None;
        } else if self.backstack.is_empty() {
            self.arena.get_mut(current).next = None;
        } else {
            let mut old = self.next_of(pushed_down);
            let mut copy = self.arena.duplicate(old);
            self.arena.get_mut(pushed_down).next = Some(copy);
            while old != current {
                old = self.next_of(old);
                let next_copy = self.arena.duplicate(old);
                self.arena.get_mut(copy).next = Some(next_copy);
                copy = next_copy;
            }
            self.arena.get_mut(copy).next = None;
        }
        self.state.current = prev;
    }

    fn run_action(&mut self, target: NodeId) -> Signal {
        let grammar = self.grammar;
        let Some(action) = grammar.node(target).action().filter(|a| !a.is_empty()) else {
            return Signal::Succeed;
        };
        let Some(semantics) = self.semantics.as_mut() else {
            return Signal::Succeed;
        };
        let mut ctx = SemanticContext::new(
            grammar,
            &self.arena,
            self.state.current,
            &mut self.state.features,
        );
        semantics.semantic_action(action, &mut ctx)
    }
}
