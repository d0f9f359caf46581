//! Semantic callback interface
//!
//! Grammar nodes carry optional expression strings: a semantic *action*
//! evaluated when the parser enters the node, and a semantic *value*
//! evaluated when a final node completes a subphrase. Their meaning belongs
//! to the host application, which supplies a [`Semantics`] implementation.
//! Callbacks see the parse through a [`SemanticContext`], which exposes the
//! feature map of the open subphrase and the current phrase node.

use super::arena::{PhraseArena, PhraseId, PhraseNode};
use super::grammar::{GrammarNode, GrammarStore};
use super::value::Value;
use hashbrown::HashMap;

/// Feature map scoped to one open subphrase
pub type Features = HashMap<String, Value>;

/// Result of a semantic action, and of one engine advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The move stands
    Succeed,
    /// The current alternative fails; backtracking may continue
    NoAdvance,
    /// Abandon the whole parse
    Quit,
}

/// Result of evaluating a semantic value expression
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOutcome {
    /// The computed value
    Value(Value),
    /// The current alternative fails; backtracking may continue
    NoAdvance,
    /// Abandon the whole parse
    Quit,
}

/// Host-application semantics
pub trait Semantics {
    /// Evaluate the action attached to the node just entered
    fn semantic_action(&mut self, action: &str, ctx: &mut SemanticContext<'_>) -> Signal;

    /// Evaluate the value expression of a completed subphrase
    ///
    /// Called while the completed subphrase's features are still in scope.
    fn semantic_value(&mut self, expression: &str, ctx: &mut SemanticContext<'_>) -> ValueOutcome;
}

/// Placeholder for parsers running without semantics
///
/// A parser built without semantics never calls these; completed phrases
/// keep the raw value expression as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSemantics;

impl Semantics for NoSemantics {
    fn semantic_action(&mut self, _action: &str, _ctx: &mut SemanticContext<'_>) -> Signal {
        Signal::Succeed
    }

    fn semantic_value(&mut self, expression: &str, _ctx: &mut SemanticContext<'_>) -> ValueOutcome {
        ValueOutcome::Value(Value::string(expression))
    }
}

/// View of the parse handed to semantic callbacks
pub struct SemanticContext<'a> {
    grammar: &'a GrammarStore,
    arena: &'a PhraseArena,
    current: PhraseId,
    features: &'a mut Features,
}

impl<'a> SemanticContext<'a> {
    pub(crate) fn new(
        grammar: &'a GrammarStore,
        arena: &'a PhraseArena,
        current: PhraseId,
        features: &'a mut Features,
    ) -> Self {
        Self {
            grammar,
            arena,
            current,
            features,
        }
    }

    /// Value of a feature of the open subphrase
    pub fn get(&self, feature: &str) -> Option<&Value> {
        self.features.get(feature)
    }

    /// Set a feature of the open subphrase
    pub fn set(&mut self, feature: &str, value: Value) {
        self.features.insert(feature.to_string(), value);
    }

    /// All features of the open subphrase
    pub fn features(&self) -> &Features {
        self.features
    }

    /// The phrase node the parser is at
    pub fn current_node(&self) -> &PhraseNode {
        self.arena.get(self.current)
    }

    /// Word of the current phrase node
    pub fn current_word(&self) -> &str {
        self.current_node().word()
    }

    /// Value of the current phrase node
    pub fn current_value(&self) -> Option<&Value> {
        self.current_node().value()
    }

    /// Grammar node the current phrase node is matched to
    pub fn current_instance(&self) -> Option<&GrammarNode> {
        self.current_node().instance().map(|id| self.grammar.node(id))
    }

    /// The phrase structure arena
    pub fn arena(&self) -> &PhraseArena {
        self.arena
    }

    /// Copy the entries of a map-valued current node into the features
    ///
    /// Does nothing when the current value is not a map.
    pub fn raise_features(&mut self) {
        let Some(Value::Map(map)) = self.arena.get(self.current).value() else {
            return;
        };
        for (feature, value) in map {
            self.features.insert(feature.clone(), value.clone());
        }
    }

    /// Like [`raise_features`](Self::raise_features), but refuses conflicts
    ///
    /// Returns [`Signal::NoAdvance`] if a feature already holds a different
    /// value, and [`Signal::Quit`] if the current value is not a map.
    pub fn raise_features_checking(&mut self) -> Signal {
        let Some(Value::Map(map)) = self.arena.get(self.current).value() else {
            return Signal::Quit;
        };
        for (feature, value) in map {
            if let Some(existing) = self.features.get(feature) {
                if existing != value {
                    return Signal::NoAdvance;
                }
            }
            self.features.insert(feature.clone(), value.clone());
        }
        Signal::Succeed
    }
}

type ActionFn = Box<dyn FnMut(&mut SemanticContext<'_>) -> Signal>;
type ValueFn = Box<dyn FnMut(&mut SemanticContext<'_>) -> ValueOutcome>;

/// Semantics dispatching expression names to registered closures
///
/// Value expressions that are integer literals or double-quoted strings are
/// evaluated directly. Unknown action names succeed; unknown value names
/// evaluate to nil. Both are logged.
#[derive(Default)]
pub struct CallbackTable {
    actions: HashMap<String, ActionFn>,
    values: HashMap<String, ValueFn>,
}

impl CallbackTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action
    pub fn on_action<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnMut(&mut SemanticContext<'_>) -> Signal + 'static,
    {
        self.actions.insert(name.to_string(), Box::new(f));
        self
    }

    /// Register a value
    pub fn on_value<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnMut(&mut SemanticContext<'_>) -> ValueOutcome + 'static,
    {
        self.values.insert(name.to_string(), Box::new(f));
        self
    }
}

impl Semantics for CallbackTable {
    fn semantic_action(&mut self, action: &str, ctx: &mut SemanticContext<'_>) -> Signal {
        match self.actions.get_mut(action) {
            Some(f) => f(ctx),
            None => {
                log_warn!("no semantic action named {}", action);
                Signal::Succeed
            }
        }
    }

    fn semantic_value(&mut self, expression: &str, ctx: &mut SemanticContext<'_>) -> ValueOutcome {
        if let Ok(n) = expression.parse::<i64>() {
            return ValueOutcome::Value(Value::Int(n));
        }
        if expression.len() >= 2 && expression.starts_with('"') && expression.ends_with('"') {
            return ValueOutcome::Value(Value::string(&expression[1..expression.len() - 1]));
        }
        match self.values.get_mut(expression) {
            Some(f) => f(ctx),
            None => {
                log_warn!("no semantic value named {}", expression);
                ValueOutcome::Value(Value::Nil)
            }
        }
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&String> = self.actions.keys().collect();
        let mut values: Vec<&String> = self.values.keys().collect();
        actions.sort();
        values.sort();
        f.debug_struct("CallbackTable")
            .field("actions", &actions)
            .field("values", &values)
            .finish()
    }
}
