//! Rewrites of bare namespace references and insertion of missing imports.
//!
//! Import statements are rewritten by their adapters; this module covers the
//! rest of the file. A reference like `foo.bar.baz(x)` is matched textually
//! against the request namespaces, the matching leading tokens are collapsed
//! into a single renamed token, and any module the new spelling relies on
//! gets an import statement inserted at the top of the file unless one
//! already provides it.

use std::collections::{BTreeSet, HashSet};

use shunt_cst::{NodeId, NodeKind, SyntaxTree};
use tracing::debug;

use crate::adapters::build_plain_import;
use crate::error::{ShuntError, ShuntResult};
use crate::namespace::{Namespace, RequestKind, RewriteRequest};

// ============================================================================
// Reference substitution
// ============================================================================

/// Rewrite every bare occurrence of a request's `old` namespace.
///
/// Matching is purely textual and token-aligned: a dotted chain matches only
/// when its leading tokens spell `old` exactly, with no stray whitespace
/// between segments and the boundary falling on a dot. The matched tokens
/// are replaced by one token carrying the full dotted `new` text, so a
/// longer chain keeps its remaining attribute accesses.
///
/// Returns the requests that fired at least once, deduplicated, so the
/// caller knows which new namespaces need a providing import.
pub fn replace_references(
    tree: &mut SyntaxTree,
    pairs: &[RewriteRequest],
) -> ShuntResult<Vec<RewriteRequest>> {
    let mut fired: Vec<RewriteRequest> = Vec::new();
    // Tokens produced by a substitution never match again, which keeps
    // mutually-renaming request sets from ping-ponging.
    let mut produced: HashSet<NodeId> = HashSet::new();

    loop {
        let Some(hit) = find_next_reference(tree, pairs, &produced) else {
            break;
        };
        let request = pairs[hit.pair].clone();
        let token = apply_reference(tree, &hit, &request.new)?;
        produced.insert(token);
        debug!(old = %request.old, new = %request.new, "rewrote reference");
        if !fired.contains(&request) {
            fired.push(request);
        }
    }
    Ok(fired)
}

/// A located reference match.
struct ReferenceHit {
    /// The `DottedRef` node or bare `Name` leaf that matched.
    node: NodeId,
    /// Number of leading children of a `DottedRef` that spell the old text;
    /// zero for a bare leaf match.
    span: usize,
    /// Index into `pairs` of the request that matched.
    pair: usize,
}

fn find_next_reference(
    tree: &SyntaxTree,
    pairs: &[RewriteRequest],
    produced: &HashSet<NodeId>,
) -> Option<ReferenceHit> {
    for node in tree.walk(tree.root()) {
        match tree.kind(node) {
            NodeKind::DottedRef => {
                let first = *tree.children(node).first()?;
                if produced.contains(&first) {
                    continue;
                }
                for (pair, request) in pairs.iter().enumerate() {
                    if let Some(span) = match_leading_children(tree, node, &request.old) {
                        return Some(ReferenceHit { node, span, pair });
                    }
                }
            }
            NodeKind::Name => {
                if produced.contains(&node) || !is_reference_position(tree, node) {
                    continue;
                }
                for (pair, request) in pairs.iter().enumerate() {
                    if request.old.segment_count() == 1
                        && tree.value(node) == request.old.head()
                    {
                        return Some(ReferenceHit {
                            node,
                            span: 0,
                            pair,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// A bare `Name` leaf counts as a reference only outside import statements,
/// outside dotted chains (those match through their `DottedRef`), and not in
/// attribute position after a dot (`f().attr`).
fn is_reference_position(tree: &SyntaxTree, node: NodeId) -> bool {
    let Some(parent) = tree.parent(node) else {
        return false;
    };
    if tree.kind(parent) != NodeKind::ExprStmt {
        return false;
    }
    if tree
        .statement_of(node)
        .is_some_and(|stmt| tree.kind(stmt).is_import())
    {
        return false;
    }
    let Some(pos) = tree.position_in_parent(node) else {
        return false;
    };
    if pos > 0 {
        let before = tree.children(parent)[pos - 1];
        if tree.kind(before) == NodeKind::Operator && tree.value(before) == "." {
            return false;
        }
    }
    true
}

/// How many leading children of `chain` spell `old` exactly, dot-aligned.
///
/// The concatenated text of the candidate slice must equal the dotted
/// namespace with nothing in between, and the slice must either cover the
/// whole chain or stop right before a dot.
fn match_leading_children(tree: &SyntaxTree, chain: NodeId, old: &Namespace) -> Option<usize> {
    let children = tree.children(chain);
    let target = old.to_string();
    let mut text = String::new();
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            text.push_str(tree.prefix(*child));
        }
        text.push_str(tree.value(*child));
        if text.len() > target.len() {
            return None;
        }
        if text == target {
            let span = i + 1;
            let boundary_ok =
                span == children.len() || tree.value(children[span]) == ".";
            return boundary_ok.then_some(span);
        }
    }
    None
}

/// Perform the edit described by `hit`; returns the freshly renamed token.
fn apply_reference(
    tree: &mut SyntaxTree,
    hit: &ReferenceHit,
    new: &Namespace,
) -> ShuntResult<NodeId> {
    let new_text = new.to_string();

    // Bare leaf: rename in place, the prefix stays untouched.
    if hit.span == 0 {
        tree.set_value(hit.node, new_text);
        return Ok(hit.node);
    }

    let children = tree.children(hit.node);
    let first = *children
        .first()
        .ok_or_else(|| ShuntError::internal("empty dotted reference"))?;
    let prefix = tree.prefix(first).to_string();
    let token = tree.new_leaf(NodeKind::Name, new_text, prefix);

    if hit.span == tree.children(hit.node).len() {
        // The whole chain matched: swap the chain for the single token.
        let parent = tree
            .parent(hit.node)
            .ok_or_else(|| ShuntError::internal("dotted reference has no parent"))?;
        let pos = tree
            .position_in_parent(hit.node)
            .ok_or_else(|| ShuntError::internal("dotted reference missing from parent"))?;
        tree.replace_child_range(parent, pos, pos + 1, vec![token]);
    } else {
        tree.replace_child_range(hit.node, 0, hit.span, vec![token]);
    }
    Ok(token)
}

// ============================================================================
// Import insertion
// ============================================================================

/// The modules the rewritten spellings rely on.
///
/// An attribute request's final segment names an attribute, so the module
/// is everything before it; an import request's new namespace is itself a
/// module path. A single-segment replacement is its own module.
pub fn required_imports(fired: &[RewriteRequest]) -> BTreeSet<Namespace> {
    fired
        .iter()
        .map(|req| match req.kind {
            RequestKind::Attribute => req.new.parent().unwrap_or_else(|| req.new.clone()),
            RequestKind::Import => req.new.clone(),
        })
        .collect()
}

/// Insert a plain import at the top of the file for every module in
/// `required` that neither `existing` nor `inserted` already provides.
///
/// `existing` holds the namespaces of the file's current import statements;
/// `inserted` is a running set carried across calls within one pass, which
/// makes repeated calls idempotent. Returns whether the tree changed.
///
/// The first inserted statement takes over the file's leading prefix, so a
/// shebang or header comment stays on top.
pub fn add_imports(
    tree: &mut SyntaxTree,
    required: &BTreeSet<Namespace>,
    existing: &BTreeSet<String>,
    inserted: &mut BTreeSet<String>,
) -> ShuntResult<bool> {
    let newline = newline_style(tree);
    let root = tree.root();
    let mut changed = false;
    let mut stole_prefix = false;
    let mut insert_at = 0;

    for module in required {
        let text = module.to_string();
        if inserted.contains(&text) {
            continue;
        }
        let provided = existing
            .iter()
            .chain(inserted.iter())
            .any(|ns| module.covers_text(ns));
        inserted.insert(text);
        if provided {
            continue;
        }

        let leading = if stole_prefix {
            String::new()
        } else {
            stole_prefix = true;
            match tree.first_leaf(root) {
                Some(leaf) => {
                    let prefix = tree.prefix(leaf).to_string();
                    tree.set_prefix(leaf, "");
                    prefix
                }
                None => String::new(),
            }
        };
        let statement = build_plain_import(tree, module, &leading, &newline);
        tree.insert_child(root, insert_at, statement);
        insert_at += 1;
        changed = true;
        debug!(module = %module, "inserted missing import");
    }
    Ok(changed)
}

/// The file's line terminator, taken from its first real newline token.
fn newline_style(tree: &SyntaxTree) -> String {
    tree.leaves(tree.root())
        .into_iter()
        .find(|leaf| tree.kind(*leaf) == NodeKind::Newline && !tree.value(*leaf).is_empty())
        .map(|leaf| tree.value(leaf).to_string())
        .unwrap_or_else(|| "\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shunt_cst::parse;

    fn ns(text: &str) -> Namespace {
        Namespace::parse(text).unwrap()
    }

    fn attr(old: &str, new: &str) -> RewriteRequest {
        RewriteRequest::attribute(ns(old), ns(new))
    }

    #[test]
    fn leading_chain_segments_collapse_into_one_token() {
        let mut tree = parse("x = foo.bar.baz(1)\n").unwrap();
        let fired = replace_references(&mut tree, &[attr("foo.bar", "other.bar")]).unwrap();
        assert_eq!(tree.serialize(), "x = other.bar.baz(1)\n");
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn whole_chain_match_replaces_the_reference() {
        let mut tree = parse("value = foo.bar\n").unwrap();
        replace_references(&mut tree, &[attr("foo.bar", "other.bar")]).unwrap();
        assert_eq!(tree.serialize(), "value = other.bar\n");
    }

    #[test]
    fn single_name_reference_is_renamed_in_place() {
        let mut tree = parse("helper(1, 2)\n").unwrap();
        replace_references(&mut tree, &[attr("helper", "tools.helper")]).unwrap();
        assert_eq!(tree.serialize(), "tools.helper(1, 2)\n");
    }

    #[test]
    fn attribute_after_a_call_is_not_a_reference() {
        let mut tree = parse("y = f().foo\n").unwrap();
        let fired = replace_references(&mut tree, &[attr("foo", "x")]).unwrap();
        assert!(fired.is_empty());
        assert_eq!(tree.serialize(), "y = f().foo\n");
    }

    #[test]
    fn whitespace_inside_a_chain_defeats_the_match() {
        let mut tree = parse("foo . bar\n").unwrap();
        let fired = replace_references(&mut tree, &[attr("foo.bar", "other.bar")]).unwrap();
        assert!(fired.is_empty());
        assert_eq!(tree.serialize(), "foo . bar\n");
    }

    #[test]
    fn match_stops_at_segment_boundaries() {
        let mut tree = parse("foo.barx.baz\n").unwrap();
        let fired = replace_references(&mut tree, &[attr("foo.bar", "other.bar")]).unwrap();
        assert!(fired.is_empty());
        assert_eq!(tree.serialize(), "foo.barx.baz\n");
    }

    #[test]
    fn swapped_pairs_do_not_ping_pong() {
        let mut tree = parse("alpha\n").unwrap();
        let pairs = [attr("alpha", "beta"), attr("beta", "alpha")];
        let fired = replace_references(&mut tree, &pairs).unwrap();
        assert_eq!(tree.serialize(), "beta\n");
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn repeated_occurrences_fire_the_request_once() {
        let mut tree = parse("a = foo.bar\nb = foo.bar\n").unwrap();
        let fired = replace_references(&mut tree, &[attr("foo.bar", "other.bar")]).unwrap();
        assert_eq!(tree.serialize(), "a = other.bar\nb = other.bar\n");
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn import_statements_are_left_to_their_adapters() {
        let mut tree = parse("import foo.bar\n").unwrap();
        let fired = replace_references(&mut tree, &[attr("foo.bar", "other.bar")]).unwrap();
        assert!(fired.is_empty());
        assert_eq!(tree.serialize(), "import foo.bar\n");
    }

    #[test]
    fn required_imports_strip_the_attribute_segment() {
        let fired = vec![attr("foo.bar", "other.bar"), attr("x", "plain")];
        let required: Vec<String> = required_imports(&fired)
            .into_iter()
            .map(|ns| ns.to_string())
            .collect();
        assert_eq!(required, vec!["other".to_string(), "plain".to_string()]);
    }

    #[test]
    fn required_imports_keep_whole_module_paths() {
        let fired = vec![RewriteRequest::import(ns("a.b"), ns("x.y"))];
        let required: Vec<String> = required_imports(&fired)
            .into_iter()
            .map(|ns| ns.to_string())
            .collect();
        assert_eq!(required, vec!["x.y".to_string()]);
    }

    #[test]
    fn add_imports_inserts_at_the_top() {
        let mut tree = parse("x = other.bar\n").unwrap();
        let required: BTreeSet<Namespace> = [ns("other")].into_iter().collect();
        let mut inserted = BTreeSet::new();
        let changed =
            add_imports(&mut tree, &required, &BTreeSet::new(), &mut inserted).unwrap();
        assert!(changed);
        assert_eq!(tree.serialize(), "import other\nx = other.bar\n");
    }

    #[test]
    fn a_shebang_stays_on_the_first_line() {
        let mut tree = parse("#!/usr/bin/env python\nx = other.bar\n").unwrap();
        let required: BTreeSet<Namespace> = [ns("other")].into_iter().collect();
        let mut inserted = BTreeSet::new();
        add_imports(&mut tree, &required, &BTreeSet::new(), &mut inserted).unwrap();
        assert_eq!(
            tree.serialize(),
            "#!/usr/bin/env python\nimport other\nx = other.bar\n"
        );
    }

    #[test]
    fn provided_modules_are_not_inserted_again() {
        let mut tree = parse("import other.sub\nx = other.bar\n").unwrap();
        let required: BTreeSet<Namespace> = [ns("other")].into_iter().collect();
        let existing: BTreeSet<String> = ["other.sub".to_string()].into_iter().collect();
        let mut inserted = BTreeSet::new();
        let changed = add_imports(&mut tree, &required, &existing, &mut inserted).unwrap();
        assert!(!changed);
        assert_eq!(tree.serialize(), "import other.sub\nx = other.bar\n");
    }

    #[test]
    fn repeated_calls_are_idempotent() {
        let mut tree = parse("x = 1\n").unwrap();
        let required: BTreeSet<Namespace> = [ns("other")].into_iter().collect();
        let mut inserted = BTreeSet::new();
        add_imports(&mut tree, &required, &BTreeSet::new(), &mut inserted).unwrap();
        let changed =
            add_imports(&mut tree, &required, &BTreeSet::new(), &mut inserted).unwrap();
        assert!(!changed);
        assert_eq!(tree.serialize(), "import other\nx = 1\n");
    }

    #[test]
    fn insertion_follows_the_file_line_terminator() {
        let mut tree = parse("x = 1\r\n").unwrap();
        let required: BTreeSet<Namespace> = [ns("other")].into_iter().collect();
        let mut inserted = BTreeSet::new();
        add_imports(&mut tree, &required, &BTreeSet::new(), &mut inserted).unwrap();
        assert_eq!(tree.serialize(), "import other\r\nx = 1\r\n");
    }

    #[test]
    fn several_modules_insert_in_sorted_order() {
        let mut tree = parse("x = 1\n").unwrap();
        let required: BTreeSet<Namespace> =
            [ns("zlib"), ns("alpha.core")].into_iter().collect();
        let mut inserted = BTreeSet::new();
        add_imports(&mut tree, &required, &BTreeSet::new(), &mut inserted).unwrap();
        assert_eq!(
            tree.serialize(),
            "import alpha.core\nimport zlib\nx = 1\n"
        );
    }
}
