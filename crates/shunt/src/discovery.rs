//! Import discovery over a parsed module.

use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use shunt_cst::{NodeId, NodeKind, SyntaxTree};
use tracing::debug;

use crate::adapters::{ImportAdapter, MatchConfig};

/// Bind an adapter to every import statement in `tree`, in document order.
///
/// The walk visits children before parents, so the most specific node of
/// each statement gets the first classification attempt. Once a statement
/// is claimed its remaining nodes are skipped, which is what keeps a dotted
/// path inside `import a.b, c` from also binding a single-target adapter.
pub fn get_imports(tree: &SyntaxTree, config: &Rc<MatchConfig>) -> Vec<ImportAdapter> {
    let mut claimed: HashSet<NodeId> = HashSet::new();
    let mut found = Vec::new();
    for node in tree.walk_reverse(tree.root()) {
        let Some(statement) = tree.statement_of(node) else {
            continue;
        };
        if claimed.contains(&statement) {
            continue;
        }
        if let Some(adapter) = ImportAdapter::classify(tree, node, config) {
            claimed.insert(adapter.statement());
            found.push(adapter);
        }
    }
    // The reverse walk surfaces later statements first.
    found.reverse();
    debug!(count = found.len(), "discovered import statements");
    found
}

/// Identifier tokens appearing outside import statements.
///
/// This is a textual notion of "used": attribute chains contribute each of
/// their segments, and no scoping is attempted. Import adapters consult it
/// to decide whether a name pulled out of a from-import is still referenced.
pub fn used_names(tree: &SyntaxTree) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for node in tree.walk(tree.root()) {
        if tree.kind(node) != NodeKind::Name {
            continue;
        }
        let in_import = tree
            .statement_of(node)
            .is_some_and(|stmt| tree.kind(stmt).is_import());
        if !in_import {
            names.insert(tree.value(node).to_string());
        }
    }
    names
}
