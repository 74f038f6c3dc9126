//! Adapter for from-import statements.

use std::collections::BTreeSet;
use std::rc::Rc;

use shunt_cst::{NodeId, NodeKind, SyntaxTree};
use tracing::{debug, warn};

use crate::adapters::{
    build_from_import, path_segments, replace_path, splice_path_prefix, MatchConfig,
    ReplaceContext,
};
use crate::error::{ShuntError, ShuntResult};
use crate::namespace::Namespace;

/// One imported name in the statement's tail.
#[derive(Debug, Clone)]
struct TailName {
    /// The `Name` or `ImportAsName` node in the list.
    element: NodeId,
    /// The leaf carrying the imported name itself.
    name_leaf: NodeId,
    name: String,
    alias: Option<String>,
}

impl TailName {
    /// The module-scope identifier this entry binds.
    fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Adapter for `from a.b import c, d as e`.
///
/// Relative imports (`from . import x`) are declined at acceptance time:
/// their meaning depends on the importing file's own location, which a
/// namespace-to-namespace rewrite cannot reason about. Star imports are
/// accepted but provide no namespaces, so no request ever matches them.
#[derive(Debug)]
pub struct FromImport {
    statement: NodeId,
    config: Rc<MatchConfig>,
}

impl FromImport {
    pub(crate) fn accept(
        tree: &SyntaxTree,
        node: NodeId,
        config: &Rc<MatchConfig>,
    ) -> Option<Self> {
        if tree.kind(node) != NodeKind::ImportFrom {
            return None;
        }
        // Leading dots before the base mean a relative import.
        for child in tree.children(node) {
            match tree.kind(*child) {
                NodeKind::Operator => return None,
                NodeKind::Name | NodeKind::DottedName => break,
                _ => {}
            }
        }
        Some(FromImport {
            statement: node,
            config: Rc::clone(config),
        })
    }

    pub fn statement(&self) -> NodeId {
        self.statement
    }

    fn import_kw_pos(&self, tree: &SyntaxTree) -> ShuntResult<usize> {
        tree.children(self.statement)
            .iter()
            .position(|c| tree.kind(*c) == NodeKind::Keyword && tree.value(*c) == "import")
            .ok_or_else(|| ShuntError::internal("from-import without an import keyword"))
    }

    fn base_node(&self, tree: &SyntaxTree) -> ShuntResult<NodeId> {
        tree.children(self.statement)
            .iter()
            .copied()
            .find(|c| matches!(tree.kind(*c), NodeKind::Name | NodeKind::DottedName))
            .ok_or_else(|| ShuntError::internal("from-import without a base module"))
    }

    /// The imported names after the `import` keyword, parentheses and star
    /// forms normalized away (a star yields an empty list).
    fn tail_elements(&self, tree: &SyntaxTree) -> ShuntResult<Vec<TailName>> {
        let import_pos = self.import_kw_pos(tree)?;
        let mut out = Vec::new();
        for child in tree.children(self.statement)[import_pos + 1..].to_vec() {
            match tree.kind(child) {
                NodeKind::Name => out.push(Self::bare_tail(tree, child)),
                NodeKind::ImportAsName => out.push(Self::aliased_tail(tree, child)),
                NodeKind::ImportAsNames => {
                    for sub in tree.children(child).to_vec() {
                        match tree.kind(sub) {
                            NodeKind::Name => out.push(Self::bare_tail(tree, sub)),
                            NodeKind::ImportAsName => out.push(Self::aliased_tail(tree, sub)),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn bare_tail(tree: &SyntaxTree, name: NodeId) -> TailName {
        TailName {
            element: name,
            name_leaf: name,
            name: tree.value(name).to_string(),
            alias: None,
        }
    }

    fn aliased_tail(tree: &SyntaxTree, element: NodeId) -> TailName {
        let parts = tree.children(element);
        let name_leaf = parts[0];
        let alias = parts.last().map(|leaf| tree.value(*leaf).to_string());
        TailName {
            element,
            name_leaf,
            name: tree.value(name_leaf).to_string(),
            alias,
        }
    }

    pub fn namespaces(&self, tree: &SyntaxTree) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let Ok(base) = self.base_node(tree) else {
            return out;
        };
        let base_text = path_segments(tree, base).join(".");
        if let Ok(tails) = self.tail_elements(tree) {
            for tail in tails {
                out.insert(format!("{base_text}.{}", tail.name));
            }
        }
        out
    }

    pub fn bindings(&self, tree: &SyntaxTree) -> Vec<(String, Option<String>)> {
        let Ok(base) = self.base_node(tree) else {
            return Vec::new();
        };
        let base_text = path_segments(tree, base).join(".");
        match self.tail_elements(tree) {
            Ok(tails) => tails
                .into_iter()
                .map(|tail| (format!("{base_text}.{}", tail.name), tail.alias))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Rewrite `old` to `new` in this statement.
    ///
    /// Three shapes of match, tried in order:
    ///
    /// 1. `old` equals the base (partial only): respell the base.
    /// 2. `old` is base plus one of the imported names: either split that
    ///    name into its own statement or rebase the whole statement,
    ///    depending on whether the other names are covered by the request
    ///    set and still referenced in the file.
    /// 3. `old` is a proper dotted prefix of the base (partial only):
    ///    respell the matched leading segments.
    pub fn replace(
        &self,
        tree: &mut SyntaxTree,
        old: &Namespace,
        new: &Namespace,
        ctx: &ReplaceContext,
    ) -> ShuntResult<bool> {
        let base_node = self.base_node(tree)?;
        let base = path_segments(tree, base_node);
        let old_segments = old.segments();

        if self.config.partial && old_segments == base.as_slice() {
            replace_path(tree, base_node, new)?;
            return Ok(true);
        }

        if old_segments.len() == base.len() + 1 && old_segments[..base.len()] == base[..] {
            let tails = self.tail_elements(tree)?;
            let Some(target) = tails.iter().find(|t| t.name == *old.last()).cloned() else {
                return Ok(false);
            };
            let Some(new_base) = new.parent() else {
                // `from <nothing> import x` cannot be spelled.
                warn!(
                    old = %old,
                    new = %new,
                    "cannot rewrite a from-import name to a single-segment namespace"
                );
                return Ok(false);
            };

            let others: Vec<&TailName> = tails
                .iter()
                .filter(|t| t.element != target.element)
                .collect();
            let base_text = base.join(".");
            let fully_described = others.iter().all(|t| {
                self.config
                    .namespaces
                    .contains(&format!("{base_text}.{}", t.name))
            });
            let still_used = others
                .iter()
                .any(|t| ctx.used_names.contains(t.bound_name()));

            if !self.config.partial && !fully_described && still_used {
                debug!(old = %old, new = %new, "splitting from-import: other names remain in use");
                self.split_out(tree, &target, &new_base, new.last())?;
            } else {
                replace_path(tree, base_node, &new_base)?;
                tree.set_value(target.name_leaf, new.last());
            }
            return Ok(true);
        }

        if self.config.partial
            && old_segments.len() < base.len()
            && base[..old_segments.len()] == *old_segments
        {
            splice_path_prefix(tree, base_node, old_segments.len(), new)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Pull `target` out of the name list and append a fresh
    /// `from <new_base> import <new_name>` statement on the next line.
    fn split_out(
        &self,
        tree: &mut SyntaxTree,
        target: &TailName,
        new_base: &Namespace,
        new_name: &str,
    ) -> ShuntResult<()> {
        let wrapper = tree
            .parent(target.element)
            .ok_or_else(|| ShuntError::internal("tail name has no parent"))?;
        if tree.kind(wrapper) != NodeKind::ImportAsNames {
            return Err(ShuntError::internal(
                "from-import split requires a multi-name list",
            ));
        }
        let pos = tree
            .position_in_parent(target.element)
            .ok_or_else(|| ShuntError::internal("tail name missing from its list"))?;

        // Drop the element plus its separating comma.
        if pos == 0 {
            tree.remove_child(wrapper, 0);
            let comma_is_next = tree
                .children(wrapper)
                .first()
                .is_some_and(|c| tree.kind(*c) == NodeKind::Operator);
            if comma_is_next {
                tree.remove_child(wrapper, 0);
            }
        } else {
            tree.remove_child(wrapper, pos);
            tree.remove_child(wrapper, pos - 1);
        }

        let module = tree
            .parent(self.statement)
            .ok_or_else(|| ShuntError::internal("from-import has no parent module"))?;
        let slot = tree
            .position_in_parent(self.statement)
            .ok_or_else(|| ShuntError::internal("from-import missing from module"))?;

        let statement_prefix = tree
            .first_leaf(self.statement)
            .map(|leaf| tree.prefix(leaf).to_string())
            .unwrap_or_default();
        let indent = statement_prefix
            .rsplit(|c: char| c == '\n' || c == '\r')
            .next()
            .unwrap_or("")
            .to_string();

        // The new statement starts its own line, so it goes after the last
        // statement sharing this physical line (`;` chains included).
        let module_children: Vec<NodeId> = tree.children(module).to_vec();
        let mut anchor = slot;
        while anchor + 1 < module_children.len() {
            let ends_line = tree
                .children(module_children[anchor])
                .last()
                .is_some_and(|c| tree.kind(*c) == NodeKind::Newline);
            if ends_line || tree.kind(module_children[anchor + 1]) == NodeKind::EndMarker {
                break;
            }
            anchor += 1;
        }
        let terminator = tree
            .children(module_children[anchor])
            .last()
            .copied()
            .filter(|c| tree.kind(*c) == NodeKind::Newline)
            .map(|c| tree.value(c).to_string())
            .unwrap_or_default();

        let leading = if terminator.is_empty() {
            format!("\n{indent}")
        } else {
            indent
        };
        let new_stmt = build_from_import(
            tree,
            new_base,
            new_name,
            target.alias.as_deref(),
            &leading,
        );
        if !terminator.is_empty() {
            let newline = tree.new_leaf(NodeKind::Newline, terminator, "");
            tree.push_child(new_stmt, newline);
        }
        tree.insert_child(module, anchor + 1, new_stmt);
        Ok(())
    }
}
