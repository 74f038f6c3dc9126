//! Adapter for single-target plain imports.

use std::collections::BTreeSet;
use std::rc::Rc;

use shunt_cst::{NodeId, NodeKind, SyntaxTree};
use tracing::debug;

use crate::adapters::{
    build_from_import, path_segments, replace_path, splice_path_prefix, MatchConfig,
    ReplaceContext,
};
use crate::error::{ShuntError, ShuntResult};
use crate::namespace::Namespace;

/// Adapter for `import x`, `import a.b.c`, and `import a.b.c as y`.
///
/// Claimed at the statement's single import target: a bare `Name`, a
/// `DottedName`, or an aliased `DottedAsName` directly under `ImportName`.
/// Comma-joined targets belong to [`crate::adapters::DottedImport`].
#[derive(Debug)]
pub struct SimpleImport {
    statement: NodeId,
    target: NodeId,
    config: Rc<MatchConfig>,
}

impl SimpleImport {
    pub(crate) fn accept(
        tree: &SyntaxTree,
        node: NodeId,
        config: &Rc<MatchConfig>,
    ) -> Option<Self> {
        let parent = tree.parent(node)?;
        if tree.kind(parent) != NodeKind::ImportName {
            return None;
        }
        if !matches!(
            tree.kind(node),
            NodeKind::Name | NodeKind::DottedName | NodeKind::DottedAsName
        ) {
            return None;
        }
        Some(SimpleImport {
            statement: parent,
            target: node,
            config: Rc::clone(config),
        })
    }

    pub fn statement(&self) -> NodeId {
        self.statement
    }

    /// The dotted path node: the target itself, or its path when aliased.
    fn path_node(&self, tree: &SyntaxTree) -> NodeId {
        if tree.kind(self.target) == NodeKind::DottedAsName {
            tree.children(self.target)[0]
        } else {
            self.target
        }
    }

    fn alias_leaf(&self, tree: &SyntaxTree) -> Option<NodeId> {
        if tree.kind(self.target) == NodeKind::DottedAsName {
            tree.children(self.target).last().copied()
        } else {
            None
        }
    }

    pub fn namespaces(&self, tree: &SyntaxTree) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        out.insert(path_segments(tree, self.path_node(tree)).join("."));
        out
    }

    pub fn bindings(&self, tree: &SyntaxTree) -> Vec<(String, Option<String>)> {
        let ns = path_segments(tree, self.path_node(tree)).join(".");
        let alias = self
            .alias_leaf(tree)
            .map(|leaf| tree.value(leaf).to_string());
        vec![(ns, alias)]
    }

    /// Rewrite `old` to `new` in this statement.
    ///
    /// Whole-path matches are respelled in place. With partial matching on,
    /// a match on all but the final segment converts the statement to
    /// `from <new> import <final>` so the bound name survives, and a match
    /// leaving two or more trailing segments respells just the matched
    /// prefix.
    pub fn replace(
        &self,
        tree: &mut SyntaxTree,
        old: &Namespace,
        new: &Namespace,
        ctx: &ReplaceContext,
    ) -> ShuntResult<bool> {
        let path = self.path_node(tree);
        let segments = path_segments(tree, path);
        let old_segments = old.segments();
        let exact = segments.as_slice() == old_segments;
        let as_prefix = !exact
            && self.config.partial
            && segments.len() > old_segments.len()
            && segments[..old_segments.len()] == *old_segments;
        if !exact && !as_prefix {
            return Ok(false);
        }

        // A replacement head that another import already provides would
        // shadow or be shadowed at module scope; skip unless the caller
        // promised aliases keep the old spelling reachable.
        if !self.config.aliases
            && ctx
                .sibling_namespaces
                .iter()
                .any(|ns| ns.split('.').next() == Some(new.head()))
        {
            debug!(
                old = %old,
                new = %new,
                "skipping plain-import rewrite: replacement head collides with another import"
            );
            return Ok(false);
        }

        if exact {
            replace_path(tree, path, new)?;
            return Ok(true);
        }

        let tail = &segments[old_segments.len()..];
        if tail.len() == 1 {
            self.convert_to_from_import(tree, new, &tail[0])?;
            return Ok(true);
        }
        splice_path_prefix(tree, path, old_segments.len(), new)?;
        Ok(true)
    }

    /// Swap the whole statement for `from <base> import <final>`, keeping
    /// the leading prefix, any alias clause, and the trailing tokens.
    fn convert_to_from_import(
        &self,
        tree: &mut SyntaxTree,
        base: &Namespace,
        final_name: &str,
    ) -> ShuntResult<()> {
        let statement = self.statement;
        let module = tree
            .parent(statement)
            .ok_or_else(|| ShuntError::internal("import statement has no parent"))?;
        let slot = tree
            .position_in_parent(statement)
            .ok_or_else(|| ShuntError::internal("import statement missing from module"))?;
        let leading = tree
            .first_leaf(statement)
            .map(|leaf| tree.prefix(leaf).to_string())
            .unwrap_or_default();
        let alias = self
            .alias_leaf(tree)
            .map(|leaf| tree.value(leaf).to_string());
        let replacement = build_from_import(tree, base, final_name, alias.as_deref(), &leading);

        // Carry the statement's trailing tokens (newline or `;`) over.
        let target_pos = tree
            .children(statement)
            .iter()
            .position(|c| *c == self.target)
            .ok_or_else(|| ShuntError::internal("import target missing from statement"))?;
        let mut carried = Vec::new();
        while tree.children(statement).len() > target_pos + 1 {
            carried.push(tree.remove_child(statement, target_pos + 1));
        }
        for leaf in carried {
            tree.push_child(replacement, leaf);
        }

        tree.replace_child_range(module, slot, slot + 1, vec![replacement]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shunt_cst::parse;

    fn config(partial: bool, aliases: bool) -> Rc<MatchConfig> {
        let mut namespaces = BTreeSet::new();
        namespaces.insert("a.b".to_string());
        namespaces.insert("foo".to_string());
        Rc::new(MatchConfig::new(partial, aliases, namespaces).unwrap())
    }

    fn adapter(tree: &SyntaxTree, config: &Rc<MatchConfig>) -> SimpleImport {
        tree.walk_reverse(tree.root())
            .into_iter()
            .find_map(|node| SimpleImport::accept(tree, node, config))
            .expect("no simple import in source")
    }

    fn ns(text: &str) -> Namespace {
        Namespace::parse(text).unwrap()
    }

    fn rewrite(source: &str, old: &str, new: &str, partial: bool) -> String {
        let mut tree = parse(source).unwrap();
        let config = config(partial, false);
        let simple = adapter(&tree, &config);
        let changed = simple
            .replace(&mut tree, &ns(old), &ns(new), &ReplaceContext::default())
            .unwrap();
        assert!(changed, "expected a rewrite for {source:?}");
        tree.serialize()
    }

    #[test]
    fn exact_match_renames_tokens_in_place() {
        assert_eq!(rewrite("import a.b\n", "a.b", "x.y", false), "import x.y\n");
        // Exotic spacing survives a same-length rename.
        assert_eq!(
            rewrite("import  a . b  # keep\n", "a.b", "x.y", false),
            "import  x . y  # keep\n"
        );
    }

    #[test]
    fn exact_match_respells_when_lengths_differ() {
        assert_eq!(rewrite("import a.b\n", "a.b", "zzz", false), "import zzz\n");
        assert_eq!(
            rewrite("import a.b\n", "a.b", "x.y.z", false),
            "import x.y.z\n"
        );
    }

    #[test]
    fn exact_match_keeps_alias_clause() {
        assert_eq!(
            rewrite("import a.b as m\n", "a.b", "x.y", false),
            "import x.y as m\n"
        );
    }

    #[test]
    fn partial_match_on_all_but_last_converts_to_from_import() {
        assert_eq!(
            rewrite("import a.b.c\n", "a.b", "x.y", true),
            "from x.y import c\n"
        );
        // Trailing comment rides on the carried newline token.
        assert_eq!(
            rewrite("import a.b.c  # keep\n", "a.b", "x.y", true),
            "from x.y import c  # keep\n"
        );
    }

    #[test]
    fn partial_conversion_preserves_alias() {
        assert_eq!(
            rewrite("import a.b.c as q\n", "a.b", "x.y", true),
            "from x.y import c as q\n"
        );
    }

    #[test]
    fn partial_match_with_longer_tail_respells_prefix_only() {
        assert_eq!(
            rewrite("import a.b.c.d\n", "a.b", "x", true),
            "import x.c.d\n"
        );
    }

    #[test]
    fn indented_conversion_keeps_leading_prefix() {
        let source = "if flag:\n    import a.b.c\n";
        assert_eq!(
            rewrite(source, "a.b", "x.y", true),
            "if flag:\n    from x.y import c\n"
        );
    }

    #[test]
    fn unrelated_namespace_does_not_match() {
        let mut tree = parse("import a.b\n").unwrap();
        let config = config(false, false);
        let simple = adapter(&tree, &config);
        let changed = simple
            .replace(
                &mut tree,
                &ns("other"),
                &ns("x"),
                &ReplaceContext::default(),
            )
            .unwrap();
        assert!(!changed);
        assert_eq!(tree.serialize(), "import a.b\n");
    }

    #[test]
    fn head_collision_skips_unless_aliases_enabled() {
        let mut ctx = ReplaceContext::default();
        ctx.sibling_namespaces.insert("bar".to_string());

        let mut tree = parse("import foo as f\n").unwrap();
        let config = config(false, false);
        let simple = adapter(&tree, &config);
        let changed = simple
            .replace(&mut tree, &ns("foo"), &ns("bar"), &ctx)
            .unwrap();
        assert!(!changed, "collision without aliases must skip");
        assert_eq!(tree.serialize(), "import foo as f\n");

        let mut tree = parse("import foo as f\n").unwrap();
        let config = self::config(false, true);
        let simple = adapter(&tree, &config);
        let changed = simple
            .replace(&mut tree, &ns("foo"), &ns("bar"), &ctx)
            .unwrap();
        assert!(changed, "aliases make the collision acceptable");
        assert_eq!(tree.serialize(), "import bar as f\n");
    }

    #[test]
    fn namespaces_and_bindings_reflect_the_target() {
        let tree = parse("import a.b as m\n").unwrap();
        let config = config(false, false);
        let simple = adapter(&tree, &config);
        assert_eq!(
            simple.namespaces(&tree).into_iter().collect::<Vec<_>>(),
            vec!["a.b".to_string()]
        );
        assert_eq!(
            simple.bindings(&tree),
            vec![("a.b".to_string(), Some("m".to_string()))]
        );
    }
}
