//! Grammar text format writer
//!
//! Output is readable by [`GrammarReader`](super::reader::GrammarReader).
//! Words are written in [`GrammarStore::words`] order, each instance on its
//! own line with its action, coordinates and (for final nodes) value.

use super::error::GrammarError;
use super::grammar::{GrammarNode, GrammarStore, NodeKind};
use super::optimizer;
use std::fmt::Write;
use std::path::Path;

impl GrammarStore {
    /// Render the grammar as text
    ///
    /// Successor types are recomputed first. With `optimize`, begin sets are
    /// expanded to their closure and both begin sets and successor types are
    /// written out in full; otherwise every initial node is written as `T`
    /// and successor types as `T` or `nil`.
    pub fn to_text(&mut self, optimize: bool) -> String {
        if optimize {
            optimizer::optimize(self);
        } else {
            optimizer::compute_successor_types(self);
        }

        let mut output = String::new();
        for word in self.words() {
            writeln!(output, "({} (", word).unwrap();
            for &id in self.lookup_word(word).unwrap_or_default() {
                write_instance(&mut output, self.node(id), optimize);
            }
            output.push_str("))\n\n");
        }
        output
    }

    /// Write the grammar to a file
    pub fn save(&mut self, path: impl AsRef<Path>, optimize: bool) -> Result<(), GrammarError> {
        let path = path.as_ref();
        let text = self.to_text(optimize);
        std::fs::write(path, text).map_err(|e| GrammarError::io(path, &e))
    }
}

fn write_instance(output: &mut String, node: &GrammarNode, optimize: bool) {
    write!(output, "  ({} ", node.instance()).unwrap();

    match (node.is_initial(), node.begins_types()) {
        (false, _) => output.push_str("nil "),
        (true, Some(types)) if optimize => write!(output, "({}) ", types.join(" ")).unwrap(),
        (true, _) => output.push_str("T "),
    }

    match node.kind() {
        NodeKind::Final { phrase_type, value } => {
            write!(output, "{} '{}' ", phrase_type, value.as_deref().unwrap_or("")).unwrap();
        }
        NodeKind::NonFinal {
            successors,
            successor_types,
        } => {
            let links: Vec<String> = successors
                .iter()
                .map(|s| format!("({} {} {} {})", s.word(), s.instance(), s.coords().x, s.coords().y))
                .collect();
            write!(output, "({})", links.join(" ")).unwrap();

            let types = successor_types.as_deref().unwrap_or_default();
            if optimize {
                write!(output, " ({}) ", types.join(" ")).unwrap();
            } else if types.is_empty() {
                output.push_str(" nil ");
            } else {
                output.push_str(" T ");
            }
        }
    }

    writeln!(
        output,
        "'{}' {} {})",
        node.action().unwrap_or(""),
        node.coords().x,
        node.coords().y
    )
    .unwrap();
}
