//! Namespace-rewriting engine for Python import refactors.
//!
//! This crate moves dotted namespaces across a tree of Python files while
//! preserving every byte the rewrite does not require changing. It includes:
//! - Import discovery and per-shape rewrite adapters
//! - Bare reference substitution with automatic import insertion
//! - The batch orchestration and its CLI surface
//!
//! The CST itself lives in the `shunt-cst` crate; this crate consumes it.
//!
//! ```
//! use std::path::PathBuf;
//! use shunt::{move_imports, MoveOptions, Namespace, RewriteRequest};
//!
//! let requests = vec![RewriteRequest::import(
//!     Namespace::parse("old.pkg").unwrap(),
//!     Namespace::parse("new.pkg").unwrap(),
//! )];
//! let changed = move_imports(&[] as &[PathBuf], &requests, &MoveOptions::default());
//! assert!(changed.unwrap().is_empty());
//! ```

pub mod adapters;
pub mod attributes;
pub mod discovery;
pub mod error;
pub mod files;
pub mod namespace;
pub mod output;
pub mod rewrite;

pub use adapters::ImportKind;
pub use error::{OutputErrorCode, ShuntError, ShuntResult};
pub use namespace::{Namespace, RequestKind, RewriteRequest};
pub use rewrite::{move_imports, MoveOptions};
