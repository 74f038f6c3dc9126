//! A round-tripping Python tokenizer and concrete syntax tree.
//!
//! The tree is built for one job: letting an import rewriter edit small
//! pieces of a module while leaving every other byte untouched. To that end
//! each leaf stores the whitespace and comments preceding it (`prefix`)
//! alongside its token text (`value`), and serializing an unmodified tree
//! reproduces the input exactly.
//!
//! Import statements are parsed into full structure; all other logical lines
//! become flat token runs with dotted references grouped for matching. See
//! [`node::NodeKind`] for the complete shape inventory.
//!
//! # Quick start
//!
//! ```
//! let source = "import os\nprint(os.path.sep)\n";
//! let tree = shunt_cst::parse(source).expect("parse error");
//!
//! // Round trip: an unmodified tree serializes to the original text.
//! assert_eq!(tree.serialize(), source);
//! ```

pub mod error;
pub mod node;
mod parser;
mod tokenizer;

pub use error::ParseError;
pub use node::{Ancestors, NodeId, NodeKind, SyntaxTree};
pub use parser::parse;
