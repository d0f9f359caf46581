//! Developer tools
//!
//! Inspection aids for grammars and running parses:
//! - Phrase structure printing
//! - Step-by-step parse tracing
//! - Grammar visualization as GraphViz DOT

use super::arena::{PhraseArena, PhraseId};
use super::grammar::{GrammarStore, NodeKind};
use super::parser::{AsdParser, ParseChoice};
use super::semantics::{Semantics, Signal};
use std::fmt::Write;

/// Phrase structure pretty printer
///
/// Prints one node per line as `word instance`, nesting subphrases one
/// indentation level deeper. The marked node's line starts with `*->`.
pub struct TreePrinter {
    /// Indentation per nesting level
    indent: String,
    /// Maximum depth to print
    max_depth: Option<usize>,
}

impl TreePrinter {
    /// Create a new tree printer
    pub fn new() -> Self {
        Self {
            indent: "   ".to_string(),
            max_depth: None,
        }
    }

    /// Set the indentation string
    pub fn indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }

    /// Set the maximum depth to print
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Print the chain starting at `from` and everything nested under it
    pub fn print(
        &self,
        arena: &PhraseArena,
        grammar: &GrammarStore,
        from: PhraseId,
        marked: Option<PhraseId>,
    ) -> String {
        let mut output = String::new();
        self.print_chain(arena, grammar, from, marked, 0, &mut output);
        output
    }

    fn print_chain(
        &self,
        arena: &PhraseArena,
        grammar: &GrammarStore,
        from: PhraseId,
        marked: Option<PhraseId>,
        depth: usize,
        output: &mut String,
    ) {
        let indent = self.indent.repeat(depth);
        if self.max_depth.is_some_and(|max| depth > max) {
            writeln!(output, "   {}...", indent).unwrap();
            return;
        }

        for id in arena.iter_chain(Some(from)) {
            let node = arena.get(id);
            let marker = if marked == Some(id) { "*->" } else { "   " };
            let instance = node
                .instance()
                .map(|inst| grammar.node(inst).instance())
                .unwrap_or("nil");
            writeln!(output, "{}{}{} {}", marker, indent, node.word(), instance).unwrap();
            if let Some(sub) = node.subphrase() {
                self.print_chain(arena, grammar, sub, marked, depth + 1, output);
            }
        }
    }
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Grammar visualizer
pub struct GrammarVisualizer<'a> {
    grammar: &'a GrammarStore,
}

impl<'a> GrammarVisualizer<'a> {
    /// Create a new grammar visualizer
    pub fn new(grammar: &'a GrammarStore) -> Self {
        Self { grammar }
    }

    /// Generate a GraphViz DOT diagram
    ///
    /// Initial instances are filled, final instances are drawn as ellipses
    /// labeled with their phrase type, and dangling successor links are
    /// drawn dashed to a placeholder node.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph Grammar {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n");

        for (id, node) in self.grammar.nodes() {
            let mut attrs = match node.kind() {
                NodeKind::Final { phrase_type, .. } => format!(
                    "label=\"{} {}\\n=> {}\", shape=ellipse",
                    escape(node.word()),
                    escape(node.instance()),
                    escape(phrase_type)
                ),
                NodeKind::NonFinal { .. } => format!(
                    "label=\"{} {}\"",
                    escape(node.word()),
                    escape(node.instance())
                ),
            };
            if node.is_initial() {
                attrs.push_str(", style=filled, fillcolor=lightblue");
            }
            writeln!(output, "  n{} [{}]", id.index(), attrs).unwrap();
        }

        for (id, node) in self.grammar.nodes() {
            for link in node.successors() {
                match self.grammar.lookup_instance(link) {
                    Some(target) => {
                        writeln!(output, "  n{} -> n{}", id.index(), target.index()).unwrap();
                    }
                    None => {
                        writeln!(
                            output,
                            "  \"{} {}\" [shape=plaintext]\n  n{} -> \"{} {}\" [style=dashed]",
                            escape(link.word()),
                            escape(link.instance()),
                            id.index(),
                            escape(link.word()),
                            escape(link.instance())
                        )
                        .unwrap();
                    }
                }
            }
        }

        output.push_str("}\n");
        output
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Debug trace of a parse
#[derive(Debug, Clone)]
pub struct ParseTrace {
    /// Trace entries
    pub entries: Vec<TraceEntry>,
}

/// A single trace entry
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Engine step number after the event
    pub step: u64,
    /// What happened
    pub action: TraceAction,
    /// Saved alternatives after the event
    pub depth: usize,
    /// Bracketed phrase structure after the event
    pub phrase: String,
}

/// Trace action
#[derive(Debug, Clone, PartialEq)]
pub enum TraceAction {
    /// Took a move
    Advance(ParseChoice),
    /// No move was possible or a callback refused it
    Blocked,
    /// Resumed a saved alternative
    Backup,
    /// No alternative left
    Exhausted,
    /// A callback abandoned the parse
    Quit,
    /// A goal phrase was recognized
    Complete,
}

impl ParseTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry
    pub fn add(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Drive an initialized parser to its next parse, recording each event
    ///
    /// Stops after `max_events` events.
    pub fn record<S: Semantics>(parser: &mut AsdParser<'_, S>, max_events: usize) -> Self {
        let mut trace = Self::new();
        while trace.entries.len() < max_events {
            let signal = parser.advance();
            let action = match signal {
                Signal::Succeed => {
                    let taken = parser.taken_choices().pop();
                    taken.map_or(TraceAction::Blocked, TraceAction::Advance)
                }
                Signal::NoAdvance => TraceAction::Blocked,
                Signal::Quit => TraceAction::Quit,
            };
            trace.push_event(parser, action);

            match signal {
                Signal::Quit => break,
                Signal::Succeed if parser.done() => {
                    trace.push_event(parser, TraceAction::Complete);
                    break;
                }
                Signal::Succeed => {}
                Signal::NoAdvance => {
                    if parser.backup() {
                        trace.push_event(parser, TraceAction::Backup);
                    } else {
                        trace.push_event(parser, TraceAction::Exhausted);
                        break;
                    }
                }
            }
        }
        trace
    }

    fn push_event<S: Semantics>(&mut self, parser: &AsdParser<'_, S>, action: TraceAction) {
        self.add(TraceEntry {
            step: parser.step_number(),
            action,
            depth: parser.backtrack_depth(),
            phrase: parser.bracket_phrase(),
        });
    }

    /// Whether the traced parse recognized a goal phrase
    pub fn completed(&self) -> bool {
        self.entries
            .last()
            .is_some_and(|e| e.action == TraceAction::Complete)
    }

    /// Format as a readable string
    pub fn format(&self, grammar: &GrammarStore) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            let indent = "  ".repeat(entry.depth);
            match &entry.action {
                TraceAction::Advance(choice) => {
                    let target = choice
                        .target()
                        .map(|id| {
                            let node = grammar.node(id);
                            format!(" {} {}", node.word(), node.instance())
                        })
                        .unwrap_or_default();
                    writeln!(
                        output,
                        "{:4} {}{:?}{}  {}",
                        entry.step,
                        indent,
                        choice.kind(),
                        target,
                        entry.phrase
                    )
                    .unwrap();
                }
                TraceAction::Blocked => {
                    writeln!(output, "{:4} {}blocked", entry.step, indent).unwrap();
                }
                TraceAction::Backup => {
                    writeln!(output, "{:4} {}backup  {}", entry.step, indent, entry.phrase).unwrap();
                }
                TraceAction::Exhausted => {
                    writeln!(output, "{:4} {}no more alternatives", entry.step, indent).unwrap();
                }
                TraceAction::Quit => {
                    writeln!(output, "{:4} {}quit", entry.step, indent).unwrap();
                }
                TraceAction::Complete => {
                    writeln!(output, "{:4} {}complete  {}", entry.step, indent, entry.phrase)
                        .unwrap();
                }
            }
        }
        output
    }
}

impl Default for ParseTrace {
    fn default() -> Self {
        Self::new()
    }
}
