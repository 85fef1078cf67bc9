//! Character-level scanner for CSS source text.
//!
//! The scanner finds structural boundaries only: it splits a source buffer
//! into rule preludes (the text before `{` or `;`) and raw, balanced block
//! bodies, while treating string literals as opaque and tracking 1-based
//! line/column positions for error reporting. Comments are erased up front
//! by [`strip_comments`] so every later stage sees a comment-free buffer
//! with unchanged byte offsets.

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub(crate) fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// What terminated a prelude read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreludeEnd {
    /// A `{` was consumed; a block body follows.
    BlockOpen,
    /// A `;` was consumed; the prelude was a statement.
    Semicolon,
    /// A stray `}` was consumed.
    BlockClose,
    /// End of input.
    Eof,
}

/// Replace `/* ... */` comments with spaces, preserving newlines so byte
/// offsets and line/column positions stay valid. Comment openers inside
/// string literals are left alone.
pub fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if ch == q || ch == '\n' {
                    // An unescaped newline ends a (bad) string token.
                    quote = None;
                }
            }
            None => {
                if ch == '/' && chars.peek() == Some(&'*') {
                    out.push(' ');
                    out.push(' ');
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '*' && chars.peek() == Some(&'/') {
                            out.push(' ');
                            out.push(' ');
                            chars.next();
                            break;
                        }
                        out.push(if c == '\n' { '\n' } else { ' ' });
                    }
                } else {
                    out.push(ch);
                    if ch == '"' || ch == '\'' {
                        quote = Some(ch);
                    }
                }
            }
        }
    }

    out
}

/// A cursor over (comment-free) CSS text.
///
/// Block bodies are handed back as owned strings and re-scanned with a
/// fresh `Scanner` carrying the body's origin position, so positions stay
/// accurate through arbitrarily nested blocks.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::with_origin(src, SourcePosition::start())
    }

    /// Create a scanner whose position counter starts at `origin` instead
    /// of line 1, column 1.
    pub fn with_origin(src: &'a str, origin: SourcePosition) -> Self {
        Self {
            src,
            pos: 0,
            line: origin.line,
            column: origin.column,
        }
    }

    /// Current position (1-based).
    pub fn position(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Whether the remaining input starts with `prefix`, ASCII
    /// case-insensitively.
    pub fn at_keyword(&self, prefix: &str) -> bool {
        self.src[self.pos..]
            .as_bytes()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Copy a string literal (opening quote already consumed) into `out`.
    fn copy_string(&mut self, quote: char, out: &mut String) {
        while let Some(ch) = self.bump() {
            out.push(ch);
            if ch == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            } else if ch == quote || ch == '\n' {
                // An unescaped newline ends a (bad) string token.
                break;
            }
        }
    }

    /// Read text up to the next structural terminator: `{`, `;`, or `}` at
    /// paren/bracket depth zero. The terminator is consumed but not
    /// included in the returned text.
    pub fn read_prelude(&mut self) -> (String, PreludeEnd) {
        let mut out = String::new();
        let mut paren = 0usize;
        let mut bracket = 0usize;

        while let Some(ch) = self.peek() {
            match ch {
                '{' if paren == 0 && bracket == 0 => {
                    self.bump();
                    return (out, PreludeEnd::BlockOpen);
                }
                ';' if paren == 0 && bracket == 0 => {
                    self.bump();
                    return (out, PreludeEnd::Semicolon);
                }
                '}' if paren == 0 && bracket == 0 => {
                    self.bump();
                    return (out, PreludeEnd::BlockClose);
                }
                '"' | '\'' => {
                    self.bump();
                    out.push(ch);
                    self.copy_string(ch, &mut out);
                }
                '(' => {
                    paren += 1;
                    self.bump();
                    out.push(ch);
                }
                ')' => {
                    paren = paren.saturating_sub(1);
                    self.bump();
                    out.push(ch);
                }
                '[' => {
                    bracket += 1;
                    self.bump();
                    out.push(ch);
                }
                ']' => {
                    bracket = bracket.saturating_sub(1);
                    self.bump();
                    out.push(ch);
                }
                _ => {
                    self.bump();
                    out.push(ch);
                }
            }
        }

        (out, PreludeEnd::Eof)
    }

    /// Read a block body after its opening `{` has been consumed, up to the
    /// matching `}`. Returns the raw body (inner braces included, outer
    /// braces excluded) and whether the closing brace was actually found —
    /// `false` means EOF was reached with the block still open.
    pub fn read_block(&mut self) -> (String, bool) {
        let mut out = String::new();
        let mut depth = 1usize;

        while let Some(ch) = self.peek() {
            match ch {
                '{' => {
                    depth += 1;
                    self.bump();
                    out.push(ch);
                }
                '}' => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return (out, true);
                    }
                    out.push(ch);
                }
                '"' | '\'' => {
                    self.bump();
                    out.push(ch);
                    self.copy_string(ch, &mut out);
                }
                _ => {
                    self.bump();
                    out.push(ch);
                }
            }
        }

        (out, false)
    }
}
