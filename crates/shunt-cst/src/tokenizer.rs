//! Prefix-preserving Python tokenizer.
//!
//! Every token carries the whitespace, comments, escaped newlines, and
//! non-logical line breaks that precede it in `prefix`, so the concatenation
//! of `prefix + value` over a token stream reproduces the source exactly.
//! Indentation is deliberately not tracked as separate tokens: the tree this
//! feeds keeps statements in a flat list and only needs logical line
//! boundaries, which `Newline` tokens provide.

use crate::error::ParseError;

/// Token category. Keywords are ordinary `Name` tokens here; the parser
/// decides which names are reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Name,
    Number,
    Str,
    Op,
    Newline,
    EndMarker,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub prefix: String,
    /// Byte offset of the value in the source, for error positions.
    pub offset: usize,
}

/// Split `source` into a token stream ending in one `EndMarker`.
///
/// Newline tokens are emitted only at logical line ends: line breaks inside
/// brackets, after a backslash continuation, or on blank and comment-only
/// lines are folded into the following token's prefix. When the source does
/// not end with a newline, a `Newline` token with an empty value is emitted
/// before the end marker so the parser always sees terminated statements.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut scanner = Scanner {
        source,
        pos: 0,
        depth: 0,
        line_has_token: false,
    };
    let mut tokens = Vec::new();

    loop {
        let prefix_start = scanner.pos;
        scanner.scan_prefix();
        let prefix = &source[prefix_start..scanner.pos];

        let Some(ch) = scanner.peek() else {
            if scanner.depth > 0 {
                return Err(scanner.error("unexpected end of file inside brackets"));
            }
            if scanner.line_has_token {
                // Source ended without a newline; synthesize an empty one.
                tokens.push(Token {
                    kind: TokenKind::Newline,
                    value: String::new(),
                    prefix: prefix.to_string(),
                    offset: scanner.pos,
                });
                tokens.push(Token {
                    kind: TokenKind::EndMarker,
                    value: String::new(),
                    prefix: String::new(),
                    offset: scanner.pos,
                });
            } else {
                tokens.push(Token {
                    kind: TokenKind::EndMarker,
                    value: String::new(),
                    prefix: prefix.to_string(),
                    offset: scanner.pos,
                });
            }
            return Ok(tokens);
        };

        let token = if ch == '\n' || ch == '\r' {
            // Prefix scanning leaves newlines in place only at logical ends.
            let offset = scanner.pos;
            let value = scanner.consume_newline().to_string();
            scanner.line_has_token = false;
            Token {
                kind: TokenKind::Newline,
                value,
                prefix: prefix.to_string(),
                offset,
            }
        } else {
            scanner.line_has_token = true;
            let start = scanner.pos;
            let kind = if is_name_start(ch) {
                scanner.scan_name_or_string(start)?
            } else if ch.is_ascii_digit() || (ch == '.' && scanner.peek_second().is_some_and(|c| c.is_ascii_digit())) {
                scanner.scan_number();
                TokenKind::Number
            } else if ch == '\'' || ch == '"' {
                scanner.scan_string(start)?;
                TokenKind::Str
            } else {
                scanner.scan_operator()?;
                TokenKind::Op
            };
            Token {
                kind,
                value: source[start..scanner.pos].to_string(),
                prefix: prefix.to_string(),
                offset: start,
            }
        };
        tokens.push(token);
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// True for identifier text that Python accepts as a string literal prefix
/// (`r"..."`, `rb'...'`, `f"..."` and friends).
fn is_string_prefix(word: &str) -> bool {
    word.len() <= 2 && word.chars().all(|c| "rRbBuUfF".contains(c))
}

const OPS3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const OPS2: &[&str] = &[
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "@=", "&=", "|=", "^=",
];
const OPS1: &str = "+-*/%@&|^~<>=,.:;()[]{}";

struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    /// Open `(`/`[`/`{` nesting depth; newlines inside brackets are prefix.
    depth: usize,
    /// Whether the current logical line has produced a token yet.
    line_has_token: bool,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.source[self.pos..].starts_with(pat)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at_offset(message, self.source, self.pos)
    }

    fn error_at(&self, message: impl Into<String>, offset: usize) -> ParseError {
        ParseError::at_offset(message, self.source, offset)
    }

    /// Consume one line break (`\r\n`, `\n`, or a lone `\r`).
    fn consume_newline(&mut self) -> &str {
        let start = self.pos;
        if self.starts_with("\r\n") {
            self.pos += 2;
        } else {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    /// Consume everything that belongs in the next token's prefix.
    fn scan_prefix(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\u{0c}') => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' || ch == '\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('\\') if matches!(self.peek_second(), Some('\n') | Some('\r')) => {
                    self.bump();
                    self.consume_newline();
                }
                Some('\n') | Some('\r') if self.depth > 0 || !self.line_has_token => {
                    self.consume_newline();
                }
                _ => break,
            }
        }
    }

    /// Scan an identifier, continuing into a string literal when the
    /// identifier turns out to be a string prefix (`r'...'`).
    fn scan_name_or_string(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        while let Some(ch) = self.peek() {
            if !is_name_continue(ch) {
                break;
            }
            self.bump();
        }
        let word = &self.source[start..self.pos];
        if is_string_prefix(word) && matches!(self.peek(), Some('\'') | Some('"')) {
            self.scan_string(start)?;
            return Ok(TokenKind::Str);
        }
        Ok(TokenKind::Name)
    }

    /// Scan a numeric literal. Loose by intent: any run of alphanumerics,
    /// underscores, and dots starting with a digit is taken verbatim, with
    /// exponent signs (`1e-5`) folded in. Invalid literals round-trip
    /// unchanged and are left for Python itself to reject.
    fn scan_number(&mut self) {
        let start = self.pos;
        self.bump();
        let prefixed = {
            let rest = &self.source[start..];
            ["0x", "0X", "0b", "0B", "0o", "0O"]
                .iter()
                .any(|p| rest.starts_with(p))
        };
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.bump();
                if (ch == 'e' || ch == 'E')
                    && !prefixed
                    && matches!(self.peek(), Some('+') | Some('-'))
                    && self.peek_second().is_some_and(|c| c.is_ascii_digit())
                {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Scan a string literal starting at the current quote character.
    /// `token_start` is where the token began (before any string prefix) and
    /// is used for error positions.
    fn scan_string(&mut self, token_start: usize) -> Result<(), ParseError> {
        let quote = self.peek().ok_or_else(|| self.error("expected quote"))?;
        let triple_quote = quote.to_string().repeat(3);
        let triple = self.starts_with(&triple_quote);
        if triple {
            self.pos += 3;
        } else {
            self.bump();
        }
        loop {
            match self.peek() {
                None => {
                    return Err(self.error_at("unterminated string literal", token_start));
                }
                Some('\\') => {
                    // Backslash always protects the next character from
                    // terminating the literal, raw strings included.
                    self.bump();
                    if matches!(self.peek(), Some('\n') | Some('\r')) {
                        self.consume_newline();
                    } else {
                        self.bump();
                    }
                }
                Some('\n') | Some('\r') if !triple => {
                    return Err(self.error_at("unterminated string literal", token_start));
                }
                Some(ch) if ch == quote => {
                    if triple {
                        if self.starts_with(&triple_quote) {
                            self.pos += 3;
                            return Ok(());
                        }
                        self.bump();
                    } else {
                        self.bump();
                        return Ok(());
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Scan one operator or delimiter, longest match first.
    fn scan_operator(&mut self) -> Result<(), ParseError> {
        for op in OPS3 {
            if self.starts_with(op) {
                self.pos += op.len();
                return Ok(());
            }
        }
        for op in OPS2 {
            if self.starts_with(op) {
                self.pos += op.len();
                return Ok(());
            }
        }
        let ch = self.peek().ok_or_else(|| self.error("expected operator"))?;
        if OPS1.contains(ch) {
            match ch {
                '(' | '[' | '{' => self.depth += 1,
                ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
            return Ok(());
        }
        Err(self.error(format!("unexpected character {ch:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokenize and flatten to (kind, value, prefix) triples for comparison.
    fn tokens_of(source: &str) -> Vec<(TokenKind, String, String)> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| (t.kind, t.value, t.prefix))
            .collect()
    }

    fn triple(kind: TokenKind, value: &str, prefix: &str) -> (TokenKind, String, String) {
        (kind, value.to_string(), prefix.to_string())
    }

    #[test]
    fn test_simple_import_line() {
        assert_eq!(
            tokens_of("import os\n"),
            vec![
                triple(TokenKind::Name, "import", ""),
                triple(TokenKind::Name, "os", " "),
                triple(TokenKind::Newline, "\n", ""),
                triple(TokenKind::EndMarker, "", ""),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_fold_into_prefix() {
        let tokens = tokens_of("# header\n\nimport os\n");
        assert_eq!(tokens[0], triple(TokenKind::Name, "import", "# header\n\n"));
    }

    #[test]
    fn test_trailing_comment_attaches_to_newline() {
        let tokens = tokens_of("x = 1  # note\n");
        let newline = tokens.iter().find(|t| t.0 == TokenKind::Newline).unwrap();
        assert_eq!(newline.1, "\n");
        assert_eq!(newline.2, "  # note");
    }

    #[test]
    fn test_missing_final_newline_synthesizes_empty_token() {
        assert_eq!(
            tokens_of("x"),
            vec![
                triple(TokenKind::Name, "x", ""),
                triple(TokenKind::Newline, "", ""),
                triple(TokenKind::EndMarker, "", ""),
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_prefix() {
        let tokens = tokens_of("f(a,\n  b)\n");
        let newline_count = tokens.iter().filter(|t| t.0 == TokenKind::Newline).count();
        assert_eq!(newline_count, 1, "only the closing newline is logical");
        let b = tokens.iter().find(|t| t.1 == "b").unwrap();
        assert_eq!(b.2, "\n  ");
    }

    #[test]
    fn test_backslash_continuation_is_prefix() {
        let tokens = tokens_of("x = \\\n    1\n");
        let one = tokens.iter().find(|t| t.1 == "1").unwrap();
        assert_eq!(one.2, " \\\n    ");
    }

    #[test]
    fn test_crlf_newline_value_preserved() {
        let tokens = tokens_of("import a\r\nimport b\r\n");
        let newlines: Vec<_> = tokens.iter().filter(|t| t.0 == TokenKind::Newline).collect();
        assert_eq!(newlines.len(), 2);
        assert!(newlines.iter().all(|t| t.1 == "\r\n"));
    }

    #[test]
    fn test_string_with_hash_is_not_a_comment() {
        let tokens = tokens_of("s = 'a#b'\n");
        assert!(tokens.iter().any(|t| t.0 == TokenKind::Str && t.1 == "'a#b'"));
    }

    #[test]
    fn test_prefixed_and_triple_strings() {
        let tokens = tokens_of("a = r'\\d+'\nb = '''x\ny'''\nc = f\"{v}\"\n");
        let strings: Vec<&str> = tokens
            .iter()
            .filter(|t| t.0 == TokenKind::Str)
            .map(|t| t.1.as_str())
            .collect();
        assert_eq!(strings, vec!["r'\\d+'", "'''x\ny'''", "f\"{v}\""]);
    }

    #[test]
    fn test_operators_longest_match() {
        let tokens = tokens_of("x **= 2 ** 3 != 4\n");
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.0 == TokenKind::Op)
            .map(|t| t.1.as_str())
            .collect();
        assert_eq!(ops, vec!["**=", "**", "!="]);
    }

    #[test]
    fn test_number_with_exponent_sign() {
        let tokens = tokens_of("x = 1.5e-10 + 0xFE\n");
        let numbers: Vec<&str> = tokens
            .iter()
            .filter(|t| t.0 == TokenKind::Number)
            .map(|t| t.1.as_str())
            .collect();
        assert_eq!(numbers, vec!["1.5e-10", "0xFE"]);
    }

    #[test]
    fn test_unterminated_string_reports_start_position() {
        let err = tokenize("x = 'abc\n").unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn test_unexpected_character_is_an_error() {
        let err = tokenize("x = $y\n").unwrap_err();
        assert!(err.message.contains("unexpected character"));
    }

    #[test]
    fn test_unclosed_bracket_is_an_error() {
        let err = tokenize("f(a, b\n").unwrap_err();
        assert!(err.message.contains("end of file inside brackets"));
    }

    #[test]
    fn test_stream_concatenation_reproduces_source() {
        let source = "#!/usr/bin/env python\nimport os , sys\n\nclass A:\n    x = {\n      1: 'a',\n    }  # map\n\nprint(A)";
        let mut rebuilt = String::new();
        for token in tokenize(source).unwrap() {
            rebuilt.push_str(&token.prefix);
            rebuilt.push_str(&token.value);
        }
        assert_eq!(rebuilt, source);
    }
}
