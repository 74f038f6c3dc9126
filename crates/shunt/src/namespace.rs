//! Dotted namespace paths and rewrite requests.
//!
//! A [`Namespace`] is the engine's currency: both sides of every rewrite
//! request, the keys of adapter namespace sets, and the targets of auto
//! inserted imports are all dotted paths of Python identifiers.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("empty namespace")]
    Empty,
    #[error("invalid segment {segment:?} in namespace {text:?}")]
    InvalidSegment { text: String, segment: String },
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ============================================================================
// Namespace
// ============================================================================

/// A non-empty dotted path of identifier segments, like `app.billing.ledger`.
///
/// Ordering is segment-wise lexicographic, which keeps collections of
/// namespaces deterministic without extra sorting rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    /// Parse a dotted path, validating each segment as an identifier.
    pub fn parse(text: &str) -> Result<Self, NamespaceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(NamespaceError::Empty);
        }
        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            if !is_identifier(segment) {
                return Err(NamespaceError::InvalidSegment {
                    text: trimmed.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Namespace { segments })
    }

    /// Build from already-validated segments. `None` when `segments` is empty.
    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        Some(Namespace { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// First segment: the name a plain `import` of this path binds.
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Everything but the last segment. `None` for single-segment paths.
    pub fn parent(&self) -> Option<Namespace> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Namespace {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `prefix` is this namespace or a dotted ancestor of it.
    pub fn starts_with(&self, prefix: &Namespace) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// True when `text` names this namespace or something nested under it.
    ///
    /// Matching is on dotted-segment boundaries: `a.b` covers `a.b` and
    /// `a.b.c` but not `a.bc`.
    pub fn covers_text(&self, text: &str) -> bool {
        let mut joined = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                joined.push('.');
            }
            joined.push_str(segment);
        }
        match text.strip_prefix(&joined) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

// ============================================================================
// Rewrite requests
// ============================================================================

/// How a request addresses the file: through import statements or through
/// bare attribute references in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Import,
    Attribute,
}

/// One `old -> new` namespace mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub old: Namespace,
    pub new: Namespace,
    pub kind: RequestKind,
}

impl RewriteRequest {
    pub fn import(old: Namespace, new: Namespace) -> Self {
        RewriteRequest {
            old,
            new,
            kind: RequestKind::Import,
        }
    }

    pub fn attribute(old: Namespace, new: Namespace) -> Self {
        RewriteRequest {
            old,
            new,
            kind: RequestKind::Attribute,
        }
    }
}
