//! Statement-level parser.
//!
//! The grammar is deliberately shallow: import statements get their full
//! internal structure (dotted names, alias clauses, name lists) because the
//! rewriting engine needs to address those pieces individually, while every
//! other logical line becomes a flat `ExprStmt` token sequence with
//! `name.name` chains grouped into `DottedRef` nodes for reference matching.
//! Block structure (indentation, suites) is not modeled; nested statements
//! sit in the module's flat statement list with their indentation preserved
//! in token prefixes.

use crate::error::ParseError;
use crate::node::{NodeId, NodeKind, SyntaxTree};
use crate::tokenizer::{tokenize, Token, TokenKind};

/// Python reserved words. Soft keywords (`match`, `case`, `type`) are left
/// as ordinary names because they are common identifiers.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Parse Python source into a [`SyntaxTree`].
///
/// Serializing the result of a successful parse reproduces `source` exactly.
pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    let tokens = tokenize(source)?;
    let parser = Parser {
        source,
        tokens,
        pos: 0,
        tree: SyntaxTree::new(),
    };
    parser.parse_module()
}

fn leaf_kind(token: &Token) -> NodeKind {
    match token.kind {
        TokenKind::Name if is_keyword(&token.value) => NodeKind::Keyword,
        TokenKind::Name => NodeKind::Name,
        TokenKind::Number => NodeKind::Number,
        TokenKind::Str => NodeKind::String,
        TokenKind::Op => NodeKind::Operator,
        TokenKind::Newline => NodeKind::Newline,
        TokenKind::EndMarker => NodeKind::EndMarker,
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    tree: SyntaxTree,
}

impl Parser<'_> {
    fn current(&self) -> &Token {
        // The tokenizer guarantees a trailing EndMarker and the parser never
        // advances past it.
        &self.tokens[self.pos]
    }

    fn at_op(&self, value: &str) -> bool {
        let token = self.current();
        token.kind == TokenKind::Op && token.value == value
    }

    fn at_keyword(&self, value: &str) -> bool {
        let token = self.current();
        token.kind == TokenKind::Name && token.value == value && is_keyword(value)
    }

    /// A name token that is not a reserved word.
    fn at_plain_name(&self) -> bool {
        let token = self.current();
        token.kind == TokenKind::Name && !is_keyword(&token.value)
    }

    fn next_is_plain_name(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .is_some_and(|t| t.kind == TokenKind::Name && !is_keyword(&t.value))
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::at_offset(message, self.source, self.current().offset)
    }

    /// Turn the current token into a leaf and advance.
    fn take_leaf(&mut self) -> NodeId {
        let token = &self.tokens[self.pos];
        let kind = leaf_kind(token);
        let value = token.value.clone();
        let prefix = token.prefix.clone();
        self.pos += 1;
        self.tree.new_leaf(kind, value, prefix)
    }

    fn expect_name(&mut self, context: &str) -> Result<NodeId, ParseError> {
        if self.at_plain_name() {
            return Ok(self.take_leaf());
        }
        Err(self.error_here(format!(
            "expected identifier {context}, found {:?}",
            self.current().value
        )))
    }

    // ------------------------------------------------------------------
    // Module and statements
    // ------------------------------------------------------------------

    fn parse_module(mut self) -> Result<SyntaxTree, ParseError> {
        loop {
            if self.current().kind == TokenKind::EndMarker {
                let end = self.take_leaf();
                let root = self.tree.root();
                self.tree.push_child(root, end);
                return Ok(self.tree);
            }
            let stmt = self.parse_statement()?;
            let root = self.tree.root();
            self.tree.push_child(root, stmt);
        }
    }

    fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        if self.at_keyword("import") {
            self.parse_import_name()
        } else if self.at_keyword("from") {
            self.parse_import_from()
        } else {
            self.parse_expr_stmt()
        }
    }

    /// Consume the statement terminator: a logical newline or a `;` that
    /// hands the rest of the physical line to the next statement.
    fn finish_statement(
        &mut self,
        children: &mut Vec<NodeId>,
        context: &str,
    ) -> Result<(), ParseError> {
        match self.current().kind {
            TokenKind::Newline => {
                children.push(self.take_leaf());
                Ok(())
            }
            TokenKind::Op if self.current().value == ";" => {
                children.push(self.take_leaf());
                Ok(())
            }
            TokenKind::EndMarker => Ok(()),
            _ => Err(self.error_here(format!(
                "unexpected token {:?} after {context}",
                self.current().value
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Import statements
    // ------------------------------------------------------------------

    fn parse_import_name(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.take_leaf()]; // `import`
        children.push(self.parse_import_targets()?);
        self.finish_statement(&mut children, "import statement")?;
        Ok(self.tree.new_node(NodeKind::ImportName, children))
    }

    /// One or more comma-joined plain-import targets. A single target is
    /// returned bare; multiple targets are wrapped in `DottedAsNames`.
    fn parse_import_targets(&mut self) -> Result<NodeId, ParseError> {
        let first = self.parse_dotted_as_name()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut children = vec![first];
        while self.at_op(",") {
            children.push(self.take_leaf());
            children.push(self.parse_dotted_as_name()?);
        }
        Ok(self.tree.new_node(NodeKind::DottedAsNames, children))
    }

    /// `a.b.c` or `a.b.c as d`.
    fn parse_dotted_as_name(&mut self) -> Result<NodeId, ParseError> {
        let path = self.parse_dotted_name()?;
        if self.at_keyword("as") {
            let kw = self.take_leaf();
            let alias = self.expect_name("after 'as'")?;
            return Ok(self
                .tree
                .new_node(NodeKind::DottedAsName, vec![path, kw, alias]));
        }
        Ok(path)
    }

    /// A dotted module path. A single segment stays a bare `Name` leaf.
    fn parse_dotted_name(&mut self) -> Result<NodeId, ParseError> {
        let first = self.expect_name("in module path")?;
        if !self.at_op(".") {
            return Ok(first);
        }
        let mut children = vec![first];
        while self.at_op(".") {
            children.push(self.take_leaf());
            children.push(self.expect_name("after '.'")?);
        }
        Ok(self.tree.new_node(NodeKind::DottedName, children))
    }

    fn parse_import_from(&mut self) -> Result<NodeId, ParseError> {
        let mut children = vec![self.take_leaf()]; // `from`
        let mut has_dots = false;
        while self.at_op(".") || self.at_op("...") {
            children.push(self.take_leaf());
            has_dots = true;
        }
        if self.at_plain_name() {
            children.push(self.parse_dotted_name()?);
        } else if !has_dots {
            return Err(self.error_here("expected module name after 'from'"));
        }
        if !self.at_keyword("import") {
            return Err(self.error_here("expected 'import' in from-import"));
        }
        children.push(self.take_leaf());
        if self.at_op("*") {
            children.push(self.take_leaf());
        } else if self.at_op("(") {
            children.push(self.take_leaf());
            children.push(self.parse_import_as_names(true)?);
            if !self.at_op(")") {
                return Err(self.error_here("expected ')' in from-import"));
            }
            children.push(self.take_leaf());
        } else {
            children.push(self.parse_import_as_names(false)?);
        }
        self.finish_statement(&mut children, "from-import")?;
        Ok(self.tree.new_node(NodeKind::ImportFrom, children))
    }

    /// Comma list of `name` / `name as alias`. Inside parentheses a trailing
    /// comma is allowed. A single unaliased name stays a bare leaf.
    fn parse_import_as_names(&mut self, parenthesized: bool) -> Result<NodeId, ParseError> {
        let first = self.parse_import_as_name()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut children = vec![first];
        while self.at_op(",") {
            children.push(self.take_leaf());
            if parenthesized && self.at_op(")") {
                break;
            }
            children.push(self.parse_import_as_name()?);
        }
        Ok(self.tree.new_node(NodeKind::ImportAsNames, children))
    }

    fn parse_import_as_name(&mut self) -> Result<NodeId, ParseError> {
        let name = self.expect_name("in import list")?;
        if self.at_keyword("as") {
            let kw = self.take_leaf();
            let alias = self.expect_name("after 'as'")?;
            return Ok(self
                .tree
                .new_node(NodeKind::ImportAsName, vec![name, kw, alias]));
        }
        Ok(name)
    }

    // ------------------------------------------------------------------
    // Everything else
    // ------------------------------------------------------------------

    /// A non-import logical line: a flat token run with `name.name` chains
    /// grouped into `DottedRef` nodes. Chains are only started on a name
    /// whose previous token is not a dot, so attribute access hanging off a
    /// call (`f().a.b`) is not mistaken for a namespace reference.
    fn parse_expr_stmt(&mut self) -> Result<NodeId, ParseError> {
        let mut children: Vec<NodeId> = Vec::new();
        let mut prev_was_dot = false;
        loop {
            let kind = self.current().kind;
            if kind == TokenKind::EndMarker {
                break;
            }
            if kind == TokenKind::Newline {
                children.push(self.take_leaf());
                break;
            }
            if kind == TokenKind::Op && self.current().value == ";" {
                children.push(self.take_leaf());
                break;
            }
            if self.at_plain_name() && !prev_was_dot {
                children.push(self.parse_dotted_ref());
                continue;
            }
            prev_was_dot = kind == TokenKind::Op && self.current().value == ".";
            children.push(self.take_leaf());
        }
        Ok(self.tree.new_node(NodeKind::ExprStmt, children))
    }

    /// Greedily group `name(.name)*`. A lone name stays a bare leaf.
    fn parse_dotted_ref(&mut self) -> NodeId {
        let first = self.take_leaf();
        if !(self.at_op(".") && self.next_is_plain_name()) {
            return first;
        }
        let mut children = vec![first];
        while self.at_op(".") && self.next_is_plain_name() {
            children.push(self.take_leaf());
            children.push(self.take_leaf());
        }
        self.tree.new_node(NodeKind::DottedRef, children)
    }
}
