//! Per-shape import rewrite adapters.
//!
//! Each import statement in a parsed module is claimed by exactly one
//! adapter, picked by [`ImportAdapter::classify`] in fixed priority order:
//! from-imports first, then comma-joined plain imports, then single-target
//! plain imports. The predicates are anchored on node kind plus parent kind,
//! so a dotted path inside a from-import can never be mistaken for a plain
//! import target.
//!
//! Adapters answer two questions about their statement: which dotted
//! namespaces it provides ([`ImportAdapter::namespaces`]) and how to rewrite
//! one of them in place ([`ImportAdapter::replace`]), preserving every byte
//! the rewrite does not require changing.

mod dotted;
mod from_import;
mod simple;

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use shunt_cst::{NodeId, NodeKind, SyntaxTree};

pub use dotted::DottedImport;
pub use from_import::FromImport;
pub use simple::SimpleImport;

use crate::error::{ShuntError, ShuntResult};
use crate::namespace::Namespace;

// ============================================================================
// Import kinds
// ============================================================================

/// Which statement keyword an adapter rewrites. Used by the `--types` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportKind {
    /// `import a.b` and friends.
    Import,
    /// `from a.b import c` and friends.
    FromImport,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Import => "import",
            ImportKind::FromImport => "from-import",
        }
    }

    /// Parse a `--types` filter value.
    pub fn parse(value: &str) -> ShuntResult<Self> {
        match value {
            "import" => Ok(ImportKind::Import),
            "from-import" => Ok(ImportKind::FromImport),
            other => Err(ShuntError::UnknownImportType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Matching configuration
// ============================================================================

/// Matching rules shared by every adapter of one discovery pass.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Rewrite dotted prefixes, not just whole namespaces.
    pub partial: bool,
    /// Allow rewrites that would collide with an existing top-level binding,
    /// on the theory that an alias keeps the old name reachable.
    pub aliases: bool,
    /// Every `old` namespace the caller asked to rewrite, as dotted text.
    pub namespaces: BTreeSet<String>,
}

impl MatchConfig {
    /// Exact matching against an empty namespace set is rejected: no adapter
    /// could ever match, which invariably means a caller bug.
    pub fn new(partial: bool, aliases: bool, namespaces: BTreeSet<String>) -> ShuntResult<Self> {
        if !partial && namespaces.is_empty() {
            return Err(ShuntError::EmptyMatchSet);
        }
        Ok(MatchConfig {
            partial,
            aliases,
            namespaces,
        })
    }
}

/// Tree-state snapshot passed to each [`ImportAdapter::replace`] call.
///
/// Both sets are recomputed by the caller between calls because earlier
/// replacements change what the file uses and imports.
#[derive(Debug, Clone, Default)]
pub struct ReplaceContext {
    /// Identifiers referenced outside import statements.
    pub used_names: BTreeSet<String>,
    /// Namespaces provided by the file's other import statements.
    pub sibling_namespaces: BTreeSet<String>,
}

// ============================================================================
// The adapter registry
// ============================================================================

/// One import statement plus the knowledge of how to rewrite it.
#[derive(Debug)]
pub enum ImportAdapter {
    Simple(SimpleImport),
    Dotted(DottedImport),
    From(FromImport),
}

impl ImportAdapter {
    /// Try each adapter's acceptance predicate in priority order and bind
    /// the first that claims `node`. Returns `None` for non-import nodes.
    pub fn classify(
        tree: &SyntaxTree,
        node: NodeId,
        config: &Rc<MatchConfig>,
    ) -> Option<ImportAdapter> {
        if let Some(adapter) = FromImport::accept(tree, node, config) {
            return Some(ImportAdapter::From(adapter));
        }
        if let Some(adapter) = DottedImport::accept(tree, node, config) {
            return Some(ImportAdapter::Dotted(adapter));
        }
        if let Some(adapter) = SimpleImport::accept(tree, node, config) {
            return Some(ImportAdapter::Simple(adapter));
        }
        None
    }

    /// The claimed import statement node (a direct child of the module).
    pub fn statement(&self) -> NodeId {
        match self {
            ImportAdapter::Simple(a) => a.statement(),
            ImportAdapter::Dotted(a) => a.statement(),
            ImportAdapter::From(a) => a.statement(),
        }
    }

    pub fn kind(&self) -> ImportKind {
        match self {
            ImportAdapter::Simple(_) | ImportAdapter::Dotted(_) => ImportKind::Import,
            ImportAdapter::From(_) => ImportKind::FromImport,
        }
    }

    /// False once the statement has been spliced out of the tree by an
    /// earlier rewrite; dead adapters are skipped by the caller.
    pub fn is_live(&self, tree: &SyntaxTree) -> bool {
        tree.is_attached(self.statement())
    }

    /// Every dotted namespace this statement provides.
    pub fn namespaces(&self, tree: &SyntaxTree) -> BTreeSet<String> {
        match self {
            ImportAdapter::Simple(a) => a.namespaces(tree),
            ImportAdapter::Dotted(a) => a.namespaces(tree),
            ImportAdapter::From(a) => a.namespaces(tree),
        }
    }

    /// `(namespace, alias)` pairs for insertion bookkeeping. The alias is
    /// `None` when the statement binds the namespace under its own name.
    pub fn bindings(&self, tree: &SyntaxTree) -> Vec<(String, Option<String>)> {
        match self {
            ImportAdapter::Simple(a) => a.bindings(tree),
            ImportAdapter::Dotted(a) => a.bindings(tree),
            ImportAdapter::From(a) => a.bindings(tree),
        }
    }

    /// True when this statement provides `old` itself or anything nested
    /// under it.
    pub fn contains(&self, tree: &SyntaxTree, old: &Namespace) -> bool {
        self.namespaces(tree).iter().any(|ns| old.covers_text(ns))
    }

    /// Rewrite `old` to `new` within the claimed statement. Returns whether
    /// the tree changed. A `false` return means the statement matched by
    /// namespace but the concrete rewrite declined (collision guard, shape
    /// limits); the caller moves on to the next pair.
    pub fn replace(
        &self,
        tree: &mut SyntaxTree,
        old: &Namespace,
        new: &Namespace,
        ctx: &ReplaceContext,
    ) -> ShuntResult<bool> {
        match self {
            ImportAdapter::Simple(a) => a.replace(tree, old, new, ctx),
            ImportAdapter::Dotted(a) => a.replace(tree, old, new),
            ImportAdapter::From(a) => a.replace(tree, old, new, ctx),
        }
    }
}

// ============================================================================
// Shared token plumbing
// ============================================================================

/// Name-leaf values of a `Name` or `DottedName` node, in order.
pub(crate) fn path_segments(tree: &SyntaxTree, path: NodeId) -> Vec<String> {
    tree.leaves(path)
        .into_iter()
        .filter(|leaf| tree.kind(*leaf) == NodeKind::Name)
        .map(|leaf| tree.value(leaf).to_string())
        .collect()
}

/// Build a detached `Name` leaf or `DottedName` node spelling out `ns`.
/// The first name carries `first_prefix`; everything after is unspaced.
pub(crate) fn build_path_node(tree: &mut SyntaxTree, ns: &Namespace, first_prefix: &str) -> NodeId {
    let segments = ns.segments();
    if segments.len() == 1 {
        return tree.new_leaf(NodeKind::Name, segments[0].clone(), first_prefix);
    }
    let mut children = Vec::with_capacity(segments.len() * 2 - 1);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            children.push(tree.new_leaf(NodeKind::Operator, ".", ""));
        }
        let prefix = if i == 0 { first_prefix } else { "" };
        children.push(tree.new_leaf(NodeKind::Name, segment.clone(), prefix));
    }
    tree.new_node(NodeKind::DottedName, children)
}

/// Replace the whole dotted path at `path` with `new`.
///
/// When segment counts line up the rename is token-for-token, preserving any
/// exotic spacing around the dots. Otherwise the path node is spliced out
/// for freshly built tokens that inherit only the original leading prefix.
pub(crate) fn replace_path(tree: &mut SyntaxTree, path: NodeId, new: &Namespace) -> ShuntResult<()> {
    let names: Vec<NodeId> = tree
        .leaves(path)
        .into_iter()
        .filter(|leaf| tree.kind(*leaf) == NodeKind::Name)
        .collect();
    if names.len() == new.segment_count() {
        for (leaf, segment) in names.iter().zip(new.segments()) {
            tree.set_value(*leaf, segment.clone());
        }
        return Ok(());
    }
    let first_prefix = tree
        .first_leaf(path)
        .map(|leaf| tree.prefix(leaf).to_string())
        .unwrap_or_default();
    let parent = tree
        .parent(path)
        .ok_or_else(|| ShuntError::internal("import path node has no parent"))?;
    let slot = tree
        .position_in_parent(path)
        .ok_or_else(|| ShuntError::internal("import path node missing from parent"))?;
    let replacement = build_path_node(tree, new, &first_prefix);
    tree.replace_child_range(parent, slot, slot + 1, vec![replacement]);
    Ok(())
}

/// Replace the first `old_count` segments of the `DottedName` at `path` with
/// `new`, keeping the separator dot and the trailing segments untouched.
pub(crate) fn splice_path_prefix(
    tree: &mut SyntaxTree,
    path: NodeId,
    old_count: usize,
    new: &Namespace,
) -> ShuntResult<()> {
    debug_assert_eq!(tree.kind(path), NodeKind::DottedName);
    let children_len = tree.children(path).len();
    let span = 2 * old_count - 1;
    if span >= children_len {
        return Err(ShuntError::internal(
            "prefix splice span covers the whole dotted path",
        ));
    }
    let first_prefix = tree
        .first_leaf(path)
        .map(|leaf| tree.prefix(leaf).to_string())
        .unwrap_or_default();
    let segments = new.segments();
    let mut replacement = Vec::with_capacity(segments.len() * 2 - 1);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            replacement.push(tree.new_leaf(NodeKind::Operator, ".", ""));
        }
        let prefix = if i == 0 { first_prefix.as_str() } else { "" };
        replacement.push(tree.new_leaf(NodeKind::Name, segment.clone(), prefix));
    }
    tree.replace_child_range(path, 0, span, replacement);
    Ok(())
}

/// Build a detached `import <ns>` statement.
pub(crate) fn build_plain_import(
    tree: &mut SyntaxTree,
    ns: &Namespace,
    leading: &str,
    newline: &str,
) -> NodeId {
    let kw = tree.new_leaf(NodeKind::Keyword, "import", leading);
    let path = build_path_node(tree, ns, " ");
    let end = tree.new_leaf(NodeKind::Newline, newline, "");
    tree.new_node(NodeKind::ImportName, vec![kw, path, end])
}

/// Build a detached `from <base> import <name>[ as <alias>]` statement
/// without a terminator; the caller appends carried-over trailing tokens.
pub(crate) fn build_from_import(
    tree: &mut SyntaxTree,
    base: &Namespace,
    name: &str,
    alias: Option<&str>,
    leading: &str,
) -> NodeId {
    let from_kw = tree.new_leaf(NodeKind::Keyword, "from", leading);
    let path = build_path_node(tree, base, " ");
    let import_kw = tree.new_leaf(NodeKind::Keyword, "import", " ");
    let name_leaf = tree.new_leaf(NodeKind::Name, name, " ");
    let tail = match alias {
        Some(alias) => {
            let as_kw = tree.new_leaf(NodeKind::Keyword, "as", " ");
            let alias_leaf = tree.new_leaf(NodeKind::Name, alias, " ");
            tree.new_node(NodeKind::ImportAsName, vec![name_leaf, as_kw, alias_leaf])
        }
        None => name_leaf,
    };
    tree.new_node(NodeKind::ImportFrom, vec![from_kw, path, import_kw, tail])
}
