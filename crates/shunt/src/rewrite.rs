//! The batch rewrite pipeline.
//!
//! [`move_imports`] drives everything: it validates the request set, plans
//! which requests address imports and which address bare references, then
//! processes each file in turn. Per file the order is fixed: substitute
//! references, rewrite import statements through their adapters, re-discover
//! imports, and insert any import a substituted reference now needs. A file
//! is only written back when its serialized text differs byte-for-byte from
//! what was read.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use shunt_cst::{parse, SyntaxTree};
use tracing::{debug, info, warn};

use crate::adapters::{ImportAdapter, ImportKind, MatchConfig, ReplaceContext};
use crate::attributes::{add_imports, replace_references, required_imports};
use crate::discovery::{get_imports, used_names};
use crate::error::{ShuntError, ShuntResult};
use crate::namespace::{RequestKind, RewriteRequest};

// ============================================================================
// Options
// ============================================================================

/// Knobs for one [`move_imports`] batch.
#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    /// Match dotted prefixes of import paths, not just whole namespaces.
    pub partial: bool,
    /// Allow rewrites whose new head collides with an existing import head.
    pub aliases: bool,
    /// Restrict rewriting to these statement kinds. `None` means all.
    pub import_types: Option<BTreeSet<ImportKind>>,
    /// Log and skip files that fail to parse instead of aborting the batch.
    pub continue_on_syntax_error: bool,
    /// Report which files would change without writing anything.
    pub dry_run: bool,
}

impl MoveOptions {
    fn wants(&self, kind: ImportKind) -> bool {
        self.import_types
            .as_ref()
            .is_none_or(|types| types.contains(&kind))
    }
}

// ============================================================================
// Request planning
// ============================================================================

/// The request set split by what it addresses, in deterministic order.
struct RewritePlan {
    /// Requests applied to import statements, most specific first.
    import_requests: Vec<RewriteRequest>,
    /// Requests applied to bare references, most specific first.
    reference_requests: Vec<RewriteRequest>,
    /// Matching configuration shared by every adapter of the batch.
    config: Rc<MatchConfig>,
}

impl RewritePlan {
    fn build(requests: &[RewriteRequest], options: &MoveOptions) -> ShuntResult<RewritePlan> {
        let explicit: Vec<RewriteRequest> = requests
            .iter()
            .filter(|req| req.kind == RequestKind::Import)
            .cloned()
            .collect();
        let attributes: Vec<RewriteRequest> = requests
            .iter()
            .filter(|req| req.kind == RequestKind::Attribute)
            .cloned()
            .collect();

        // An attribute request also wants the import that brought its module
        // in rewritten. The module is the old text minus the attribute
        // segment; a request whose import side an explicit request already
        // covers derives nothing.
        let mut import_requests = explicit.clone();
        for attr in &attributes {
            if explicit.iter().any(|imp| attr.old.starts_with(&imp.old)) {
                debug!(old = %attr.old, "import side already covered by an explicit request");
                continue;
            }
            match (attr.old.parent(), attr.new.parent()) {
                (Some(old_module), Some(new_module)) => {
                    if old_module == new_module {
                        continue;
                    }
                    let derived = RewriteRequest::import(old_module, new_module);
                    if !import_requests.contains(&derived) {
                        debug!(
                            old = %derived.old,
                            new = %derived.new,
                            "derived import request from attribute request"
                        );
                        import_requests.push(derived);
                    }
                }
                _ => {
                    // Single-segment side: no module to infer. The reference
                    // substitution still runs; the imports are left alone.
                    warn!(
                        old = %attr.old,
                        new = %attr.new,
                        "cannot infer the import behind an attribute request"
                    );
                }
            }
        }

        // Partial matching extends import requests to bare references too.
        let mut reference_requests = attributes;
        if options.partial {
            reference_requests.extend(explicit);
        }

        import_requests.sort_by(specificity_order);
        import_requests.dedup();
        reference_requests.sort_by(specificity_order);
        reference_requests.dedup();

        let namespaces: BTreeSet<String> =
            requests.iter().map(|req| req.old.to_string()).collect();
        let config = Rc::new(MatchConfig::new(
            options.partial,
            options.aliases,
            namespaces,
        )?);

        Ok(RewritePlan {
            import_requests,
            reference_requests,
            config,
        })
    }
}

/// Longer old namespaces first, ties broken lexicographically, so a request
/// for `a.b.c` always gets a shot before one for `a.b` and batch order
/// never depends on the caller's argument order.
fn specificity_order(a: &RewriteRequest, b: &RewriteRequest) -> Ordering {
    b.old
        .segment_count()
        .cmp(&a.old.segment_count())
        .then_with(|| a.old.cmp(&b.old))
        .then_with(|| a.new.cmp(&b.new))
}

fn validate_requests(requests: &[RewriteRequest]) -> ShuntResult<()> {
    if requests.is_empty() {
        return Err(ShuntError::EmptyRequests);
    }
    for req in requests {
        if req.old == req.new {
            return Err(ShuntError::IdenticalPair {
                namespace: req.old.to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// The batch driver
// ============================================================================

/// Apply every request to every file; returns the set of changed paths.
///
/// Configuration errors abort before any file is read. A parse failure
/// aborts the batch unless `continue_on_syntax_error` is set, in which case
/// the file is logged and skipped. Files already written stay written when
/// a later file fails; there is no cross-file transaction.
pub fn move_imports(
    files: &[PathBuf],
    requests: &[RewriteRequest],
    options: &MoveOptions,
) -> ShuntResult<BTreeSet<PathBuf>> {
    validate_requests(requests)?;
    let plan = RewritePlan::build(requests, options)?;

    let mut changed = BTreeSet::new();
    for path in files {
        let display_path = path.display().to_string();
        let source =
            fs::read_to_string(path).map_err(|err| ShuntError::io(display_path.clone(), err))?;
        let mut tree = match parse(&source) {
            Ok(tree) => tree,
            Err(err) => {
                if options.continue_on_syntax_error {
                    warn!(path = %display_path, error = %err, "skipping file with syntax error");
                    continue;
                }
                return Err(ShuntError::parse(display_path, err));
            }
        };

        if !rewrite_tree(&mut tree, &plan, options)? {
            continue;
        }
        let output = tree.serialize();
        if output == source {
            continue;
        }
        if options.dry_run {
            info!(path = %display_path, "would rewrite");
        } else {
            fs::write(path, &output).map_err(|err| ShuntError::io(display_path.clone(), err))?;
            info!(path = %display_path, "rewrote");
        }
        changed.insert(path.clone());
    }
    Ok(changed)
}

/// The per-file pipeline. Returns whether the tree may have changed.
fn rewrite_tree(
    tree: &mut SyntaxTree,
    plan: &RewritePlan,
    options: &MoveOptions,
) -> ShuntResult<bool> {
    let mut changed = false;

    // References first: adapters see the post-substitution used-name set.
    let mut fired: Vec<RewriteRequest> = Vec::new();
    if !plan.reference_requests.is_empty() {
        fired = replace_references(tree, &plan.reference_requests)?;
        changed |= !fired.is_empty();
    }

    for adapter in get_imports(tree, &plan.config) {
        if !options.wants(adapter.kind()) {
            continue;
        }
        for request in &plan.import_requests {
            // A conversion can splice the statement out from under us.
            if !adapter.is_live(tree) {
                break;
            }
            if !adapter.contains(tree, &request.old) {
                continue;
            }
            let ctx = replace_context(tree, &adapter, &plan.config);
            if adapter.replace(tree, &request.old, &request.new, &ctx)? {
                changed = true;
            }
        }
    }

    // Substituted references may now rely on modules nothing imports.
    if !fired.is_empty() {
        let existing: BTreeSet<String> = get_imports(tree, &plan.config)
            .iter()
            .flat_map(|adapter| adapter.namespaces(tree))
            .collect();
        let required = required_imports(&fired);
        let mut inserted = BTreeSet::new();
        changed |= add_imports(tree, &required, &existing, &mut inserted)?;
    }

    Ok(changed)
}

/// Snapshot of tree state an adapter needs to decide a rewrite. Recomputed
/// before every replace call because earlier rewrites in the same pass
/// change both sets.
fn replace_context(
    tree: &SyntaxTree,
    adapter: &ImportAdapter,
    config: &Rc<MatchConfig>,
) -> ReplaceContext {
    let mut sibling_namespaces = BTreeSet::new();
    for other in get_imports(tree, config) {
        if other.statement() == adapter.statement() {
            continue;
        }
        sibling_namespaces.extend(other.namespaces(tree));
    }
    ReplaceContext {
        used_names: used_names(tree),
        sibling_namespaces,
    }
}
