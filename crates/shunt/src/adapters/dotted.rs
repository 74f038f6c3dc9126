//! Adapter for comma-joined plain-import lists.

use std::collections::BTreeSet;
use std::rc::Rc;

use shunt_cst::{NodeId, NodeKind, SyntaxTree};

use crate::adapters::{path_segments, replace_path, splice_path_prefix, MatchConfig};
use crate::error::ShuntResult;
use crate::namespace::Namespace;

/// Adapter for `import a, b.c, d as e`.
///
/// Claimed at the `DottedAsNames` list under `ImportName`. Each element is
/// matched independently, and only matching elements are touched, so the
/// other list entries keep their exact bytes. Unlike the single-target
/// adapter there is no from-import conversion here: one element of a list
/// cannot become its own statement without disturbing its neighbors, so a
/// partial match always respells the matched prefix in place.
#[derive(Debug)]
pub struct DottedImport {
    statement: NodeId,
    list: NodeId,
    config: Rc<MatchConfig>,
}

impl DottedImport {
    pub(crate) fn accept(
        tree: &SyntaxTree,
        node: NodeId,
        config: &Rc<MatchConfig>,
    ) -> Option<Self> {
        if tree.kind(node) != NodeKind::DottedAsNames {
            return None;
        }
        let parent = tree.parent(node)?;
        if tree.kind(parent) != NodeKind::ImportName {
            return None;
        }
        Some(DottedImport {
            statement: parent,
            list: node,
            config: Rc::clone(config),
        })
    }

    pub fn statement(&self) -> NodeId {
        self.statement
    }

    /// The list elements, commas skipped.
    fn elements(&self, tree: &SyntaxTree) -> Vec<NodeId> {
        tree.children(self.list)
            .iter()
            .copied()
            .filter(|child| {
                matches!(
                    tree.kind(*child),
                    NodeKind::Name | NodeKind::DottedName | NodeKind::DottedAsName
                )
            })
            .collect()
    }

    fn path_node(tree: &SyntaxTree, element: NodeId) -> NodeId {
        if tree.kind(element) == NodeKind::DottedAsName {
            tree.children(element)[0]
        } else {
            element
        }
    }

    fn alias_of(tree: &SyntaxTree, element: NodeId) -> Option<String> {
        if tree.kind(element) == NodeKind::DottedAsName {
            tree.children(element)
                .last()
                .map(|leaf| tree.value(*leaf).to_string())
        } else {
            None
        }
    }

    pub fn namespaces(&self, tree: &SyntaxTree) -> BTreeSet<String> {
        self.elements(tree)
            .into_iter()
            .map(|element| path_segments(tree, Self::path_node(tree, element)).join("."))
            .collect()
    }

    pub fn bindings(&self, tree: &SyntaxTree) -> Vec<(String, Option<String>)> {
        self.elements(tree)
            .into_iter()
            .map(|element| {
                let ns = path_segments(tree, Self::path_node(tree, element)).join(".");
                (ns, Self::alias_of(tree, element))
            })
            .collect()
    }

    /// Rewrite every matching element. Returns whether anything changed.
    pub fn replace(
        &self,
        tree: &mut SyntaxTree,
        old: &Namespace,
        new: &Namespace,
    ) -> ShuntResult<bool> {
        let old_segments = old.segments();
        let mut changed = false;
        for element in self.elements(tree) {
            let path = Self::path_node(tree, element);
            let segments = path_segments(tree, path);
            let exact = segments.as_slice() == old_segments;
            let as_prefix = !exact
                && self.config.partial
                && segments.len() > old_segments.len()
                && segments[..old_segments.len()] == *old_segments;
            if exact {
                replace_path(tree, path, new)?;
                changed = true;
            } else if as_prefix {
                splice_path_prefix(tree, path, old_segments.len(), new)?;
                changed = true;
            }
        }
        Ok(changed)
    }
}
