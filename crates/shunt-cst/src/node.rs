//! Arena-backed concrete syntax tree.
//!
//! Nodes live in a single `Vec` owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`] handles. Ids stay valid across structural edits: removing a node
//! from its parent detaches it but never invalidates other handles, so callers
//! can hold ids across splices. Every leaf stores the token text in `value`
//! plus the whitespace and comments that precede it in `prefix`, which is what
//! makes serialization reproduce the original source byte for byte.

use std::fmt;

// ============================================================================
// Node kinds
// ============================================================================

/// Type tag for a node in the tree.
///
/// The first group are composite (inner) nodes, the second group are leaves
/// that carry source text directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// File root. Children are statements followed by one `EndMarker`.
    Module,
    /// A plain import statement: `import a.b, c as d`.
    ImportName,
    /// A from-import statement: `from a.b import c, d as e`.
    ImportFrom,
    /// A dotted path: `a.b.c` (alternating `Name` and `.` leaves).
    DottedName,
    /// An aliased plain-import target: `a.b as c`.
    DottedAsName,
    /// A comma-joined list of plain-import targets: `a, b.c as d`.
    DottedAsNames,
    /// An aliased from-import name: `c as d`.
    ImportAsName,
    /// A comma-joined list of from-import names: `c, d as e`.
    ImportAsNames,
    /// Any non-import logical line, stored as a flat token sequence with
    /// dotted references grouped into `DottedRef` children.
    ExprStmt,
    /// A grouped `name.name...` reference inside an `ExprStmt`.
    DottedRef,
    /// Identifier leaf.
    Name,
    /// Numeric literal leaf.
    Number,
    /// String literal leaf (quotes and string prefix included in the value).
    String,
    /// Operator or delimiter leaf.
    Operator,
    /// Reserved-word leaf (`import`, `from`, `as`, `def`, ...).
    Keyword,
    /// Logical line terminator leaf. The value may be empty when the source
    /// ends without a trailing newline.
    Newline,
    /// End-of-file leaf; always the last child of `Module`.
    EndMarker,
}

impl NodeKind {
    /// True for kinds that carry token text directly.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::Name
                | NodeKind::Number
                | NodeKind::String
                | NodeKind::Operator
                | NodeKind::Keyword
                | NodeKind::Newline
                | NodeKind::EndMarker
        )
    }

    /// True for the two import statement kinds.
    pub fn is_import(self) -> bool {
        matches!(self, NodeKind::ImportName | NodeKind::ImportFrom)
    }
}

// ============================================================================
// Node ids
// ============================================================================

/// Stable handle to a node in a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Token text; empty for composite nodes.
    value: String,
    /// Whitespace and comments preceding the token; empty for composite nodes.
    prefix: String,
}

// ============================================================================
// Syntax tree
// ============================================================================

/// A mutable, round-trippable concrete syntax tree for one Python module.
///
/// Build one with [`crate::parse`]. [`SyntaxTree::serialize`] of an unmodified
/// tree returns the exact input text.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl SyntaxTree {
    /// Create an empty tree containing only a `Module` root.
    pub(crate) fn new() -> Self {
        let root_data = NodeData {
            kind: NodeKind::Module,
            parent: None,
            children: Vec::new(),
            value: String::new(),
            prefix: String::new(),
        };
        SyntaxTree {
            nodes: vec![root_data],
            root: NodeId::new(0),
        }
    }

    /// The `Module` root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    /// Token text of a leaf. Empty string for composite nodes.
    pub fn value(&self, id: NodeId) -> &str {
        &self.data(id).value
    }

    /// Whitespace and comments preceding a leaf. Empty for composite nodes.
    pub fn prefix(&self, id: NodeId) -> &str {
        &self.data(id).prefix
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.data(id).kind.is_leaf()
    }

    /// Index of `id` within its parent's child list.
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// True while the node is still reachable from the root.
    ///
    /// Splicing detaches replaced nodes rather than destroying them, so
    /// callers holding stale ids can use this to skip dead subtrees.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Iterator over ancestors, nearest first, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(id),
        }
    }

    /// The statement (direct child of `Module`) containing `id`, or `id`
    /// itself when it already is one. `None` for the root and for the
    /// end marker.
    pub fn statement_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            if parent == self.root {
                if self.kind(current) == NodeKind::EndMarker {
                    return None;
                }
                return Some(current);
            }
            current = parent;
        }
    }

    /// All nodes under `from` (inclusive) in document order.
    ///
    /// The returned snapshot stays valid while the tree is mutated, which is
    /// why this returns a `Vec` rather than a borrowing iterator.
    pub fn walk(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            // Push children reversed so the leftmost is popped first.
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// All nodes under `from` in reverse document order: every node appears
    /// before its parent, and later siblings appear before earlier ones.
    pub fn walk_reverse(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = self.walk(from);
        out.reverse();
        out
    }

    /// Leaf nodes under `id` in document order. A leaf id yields itself.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.walk(id)
            .into_iter()
            .filter(|n| self.is_leaf(*n))
            .collect()
    }

    pub fn first_leaf(&self, id: NodeId) -> Option<NodeId> {
        if self.is_leaf(id) {
            return Some(id);
        }
        let first = *self.children(id).first()?;
        self.first_leaf(first)
    }

    /// Source text of the subtree, excluding the first leaf's prefix.
    ///
    /// This is the form used for structural matching: `text_of` on a
    /// `DottedName` for `a.b` returns `"a.b"` regardless of what whitespace
    /// precedes it.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        for (i, leaf) in self.leaves(id).into_iter().enumerate() {
            if i > 0 {
                out.push_str(self.prefix(leaf));
            }
            out.push_str(self.value(leaf));
        }
        out
    }

    /// Full source text of the module, prefixes included.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for leaf in self.leaves(self.root) {
            out.push_str(self.prefix(leaf));
            out.push_str(self.value(leaf));
        }
        out
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Allocate a detached leaf.
    pub fn new_leaf(
        &mut self,
        kind: NodeKind,
        value: impl Into<String>,
        prefix: impl Into<String>,
    ) -> NodeId {
        debug_assert!(kind.is_leaf(), "new_leaf called with composite kind");
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            value: value.into(),
            prefix: prefix.into(),
        });
        id
    }

    /// Allocate a composite node over `children`, reparenting each child.
    ///
    /// The children must be detached (freshly built or previously removed).
    pub fn new_node(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        debug_assert!(!kind.is_leaf(), "new_node called with leaf kind");
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            value: String::new(),
            prefix: String::new(),
        });
        for child in &children {
            self.data_mut(*child).parent = Some(id);
        }
        self.data_mut(id).children = children;
        id
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Overwrite a leaf's token text.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        debug_assert!(self.is_leaf(id), "set_value on composite node");
        self.data_mut(id).value = value.into();
    }

    /// Overwrite a leaf's preceding whitespace.
    pub fn set_prefix(&mut self, id: NodeId, prefix: impl Into<String>) {
        debug_assert!(self.is_leaf(id), "set_prefix on composite node");
        self.data_mut(id).prefix = prefix.into();
    }

    /// Append a detached node to `parent`'s child list.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.data(child).parent.is_none(), "child already attached");
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.push(child);
    }

    /// Insert a detached node at `index` in `parent`'s child list.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(self.data(child).parent.is_none(), "child already attached");
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.insert(index, child);
    }

    /// Detach and return the child at `index`.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        let child = self.data_mut(parent).children.remove(index);
        self.data_mut(child).parent = None;
        child
    }

    /// Replace the children of `parent` in `[start, end)` with `replacement`.
    ///
    /// Removed children are detached; replacement nodes are reparented. Ids
    /// outside the spliced range keep their positions relative to each other.
    pub fn replace_child_range(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
        replacement: Vec<NodeId>,
    ) {
        debug_assert!(start <= end);
        let removed: Vec<NodeId> = self.data(parent).children[start..end].to_vec();
        for child in &removed {
            self.data_mut(*child).parent = None;
        }
        for child in &replacement {
            debug_assert!(self.data(*child).parent.is_none(), "replacement attached");
            self.data_mut(*child).parent = Some(parent);
        }
        self.data_mut(parent)
            .children
            .splice(start..end, replacement);
    }
}

/// See [`SyntaxTree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a tiny `import a.b` tree by hand.
    fn import_tree() -> (SyntaxTree, NodeId, NodeId) {
        let mut tree = SyntaxTree::new();
        let kw = tree.new_leaf(NodeKind::Keyword, "import", "");
        let a = tree.new_leaf(NodeKind::Name, "a", " ");
        let dot = tree.new_leaf(NodeKind::Operator, ".", "");
        let b = tree.new_leaf(NodeKind::Name, "b", "");
        let dotted = tree.new_node(NodeKind::DottedName, vec![a, dot, b]);
        let newline = tree.new_leaf(NodeKind::Newline, "\n", "");
        let stmt = tree.new_node(NodeKind::ImportName, vec![kw, dotted, newline]);
        let root = tree.root();
        tree.push_child(root, stmt);
        let end = tree.new_leaf(NodeKind::EndMarker, "", "");
        tree.push_child(root, end);
        (tree, stmt, dotted)
    }

    #[test]
    fn test_serialize_concatenates_prefixes_and_values() {
        let (tree, _, _) = import_tree();
        assert_eq!(tree.serialize(), "import a.b\n");
    }

    #[test]
    fn test_text_of_drops_leading_prefix() {
        let (tree, stmt, dotted) = import_tree();
        assert_eq!(tree.text_of(dotted), "a.b");
        assert_eq!(tree.text_of(stmt), "import a.b\n");
    }

    #[test]
    fn test_walk_is_document_order() {
        let (tree, stmt, dotted) = import_tree();
        let order = tree.walk(tree.root());
        let stmt_pos = order.iter().position(|n| *n == stmt).unwrap();
        let dotted_pos = order.iter().position(|n| *n == dotted).unwrap();
        assert!(stmt_pos < dotted_pos, "parent before child in walk order");
        assert_eq!(order[0], tree.root());
    }

    #[test]
    fn test_walk_reverse_visits_children_before_parents() {
        let (tree, stmt, dotted) = import_tree();
        let order = tree.walk_reverse(tree.root());
        let stmt_pos = order.iter().position(|n| *n == stmt).unwrap();
        let dotted_pos = order.iter().position(|n| *n == dotted).unwrap();
        assert!(dotted_pos < stmt_pos, "child before parent in reverse order");
        assert_eq!(*order.last().unwrap(), tree.root());
    }

    #[test]
    fn test_replace_child_range_detaches_old_nodes() {
        let (mut tree, _, dotted) = import_tree();
        let x = tree.new_leaf(NodeKind::Name, "x", " ");
        let old_children: Vec<NodeId> = tree.children(dotted).to_vec();
        let parent = tree.parent(dotted).unwrap();
        let pos = tree.position_in_parent(dotted).unwrap();
        tree.replace_child_range(parent, pos, pos + 1, vec![x]);

        assert!(!tree.is_attached(dotted));
        for child in old_children {
            assert!(!tree.is_attached(child));
        }
        assert_eq!(tree.serialize(), "import x\n");
    }

    #[test]
    fn test_set_value_rewrites_single_token() {
        let (mut tree, _, dotted) = import_tree();
        let first = tree.first_leaf(dotted).unwrap();
        tree.set_value(first, "zz");
        assert_eq!(tree.serialize(), "import zz.b\n");
    }

    #[test]
    fn test_statement_of_climbs_to_module_child() {
        let (tree, stmt, dotted) = import_tree();
        let leaf = tree.first_leaf(dotted).unwrap();
        assert_eq!(tree.statement_of(leaf), Some(stmt));
        assert_eq!(tree.statement_of(stmt), Some(stmt));
        assert_eq!(tree.statement_of(tree.root()), None);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (tree, stmt, dotted) = import_tree();
        let leaf = tree.first_leaf(dotted).unwrap();
        let chain: Vec<NodeId> = tree.ancestors(leaf).collect();
        assert_eq!(chain, vec![dotted, stmt, tree.root()]);
    }

    #[test]
    fn test_insert_and_remove_child() {
        let mut tree = SyntaxTree::new();
        let a = tree.new_leaf(NodeKind::Name, "a", "");
        let b = tree.new_leaf(NodeKind::Name, "b", " ");
        let root = tree.root();
        tree.push_child(root, a);
        tree.insert_child(root, 0, b);
        assert_eq!(tree.children(root), &[b, a]);

        let removed = tree.remove_child(root, 0);
        assert_eq!(removed, b);
        assert!(tree.parent(b).is_none());
        assert_eq!(tree.children(root), &[a]);
    }
}
