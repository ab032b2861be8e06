//! Functions and data structures for lexing Z80 assembly.
//!
//! Lexical analysis, or lexing, is the process of splitting a source string into a sequence
//! of meaningful "tokens." Each token records what kind of text it is, the slice of the
//! source it came from, and where that slice starts. Here's an example:
//!
//! ```
//! # use zasm::lex::*;
//! # use zasm::lex::TokenKind::*;
//! let source = "ld a, $1F ; load it";
//! let kinds = Lexer::new(source).map(|token| (token.kind, token.text)).collect::<Vec<_>>();
//! assert_eq!(kinds,
//!     vec![
//!         (Identifier,  "ld"),
//!         (Identifier,  "a"),
//!         (Comma,       ","),
//!         (Hexadecimal, "1F"),
//!     ]);
//! ```
//!
//! Whitespace and comments don't produce tokens at all. Notice also that the hexadecimal
//! literal's text is only its digits: prefixes and suffixes that select a base are consumed
//! but not kept, since the [`TokenKind`] already says which base to use.
//!
//! Newlines are significant, because the parser recovers from errors one line at a time.
//! A newline is only emitted for a line that produced at least one other token, so blank
//! lines and comment-only lines disappear entirely.
//!
//! Lexing never fails. Text that can't be understood becomes an [`Error`](TokenKind::Error)
//! token carrying a [`LexError`], and lexing continues after it.
use std::fmt::{Display, Formatter};
use std::ops::Range;

use num_traits::{FromPrimitive, Num};
use regex::Regex;

use crate::error::{LexError, LiteralError};

/// What kind of text a [`Token`] represents.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TokenKind {
    /// End of input. Returned again on every call once the input is exhausted.
    End,
    /// Text which doesn't form any valid token.
    Error(LexError),

    /// A name: `[a-zA-Z_][a-zA-Z0-9_]*`. Mnemonics, registers, and labels are all identifiers.
    Identifier,
    /// A character literal (e.g., `'a'` or `'\n'`). The text excludes the quotes.
    Char,
    /// A string literal. The text is the raw body between the quotes.
    String,

    /// A decimal number (e.g., `42` or `42d`).
    Decimal,
    /// A hexadecimal number (e.g., `0x1F`, `$1F`, or `#1F`).
    Hexadecimal,
    /// An octal number (e.g., `42q`, `42o`, or `0q42`).
    Octal,
    /// A binary number (e.g., `101b`, `0b101`, or `%101`).
    Binary,

    LeftParen,
    RightParen,
    /// A lone `<`.
    LeftAngle,
    /// A lone `>`.
    RightAngle,
    Comma,
    Colon,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,
    Caret,
    Tilde,
    Ampersand,
    Bar,
    ShiftLeft,
    ShiftRight,
    DoubleAmpersand,
    DoubleBar,
    Bang,
    BangEqual,
    EqualEqual,
    GreaterEqual,
    LessEqual,

    Newline,
}

impl TokenKind {
    pub fn is_numeral(self) -> bool {
        matches!(self, TokenKind::Decimal | TokenKind::Hexadecimal | TokenKind::Octal | TokenKind::Binary)
    }

    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            End             => "END",
            Error(_)        => "ERROR",
            Identifier      => "ID",
            Char            => "CHAR",
            String          => "STRING",
            Decimal         => "DECIMAL",
            Hexadecimal     => "HEXADECIMAL",
            Octal           => "OCTAL",
            Binary          => "BINARY",
            LeftParen       => "LEFT_PAREN",
            RightParen      => "RIGHT_PAREN",
            LeftAngle       => "LEFT_ANGLE",
            RightAngle      => "RIGHT_ANGLE",
            Comma           => "COMMA",
            Colon           => "COLON",
            Minus           => "MINUS",
            Plus            => "PLUS",
            Slash           => "SLASH",
            Star            => "STAR",
            Percent         => "PERCENT",
            Caret           => "CARET",
            Tilde           => "TILDE",
            Ampersand       => "AMPERSAND",
            Bar             => "BAR",
            ShiftLeft       => "SHIFT_LEFT",
            ShiftRight      => "SHIFT_RIGHT",
            DoubleAmpersand => "DOUBLE_AMPERSAND",
            DoubleBar       => "DOUBLE_BAR",
            Bang            => "BANG",
            BangEqual       => "BANG_EQUAL",
            EqualEqual      => "EQUAL_EQUAL",
            GreaterEqual    => "GREATER_EQUAL",
            LessEqual       => "LESS_EQUAL",
            Newline         => "NEWLINE",
        }
    }
}

/// A unit of meaningful text in Z80 assembly code.
///
/// Tokens borrow their text from the source string, so they can't outlive it.
/// Produced by a [`Lexer`]. See the [module-level documentation](crate::lex) for examples.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column of the token's first character.
    pub column: usize,
    /// Whether this operator is used as a unary operator.
    ///
    /// Only set on operator tokens in the output of the
    /// [expression compiler](crate::expr::ExprCompiler).
    pub unary: bool,
}

impl<'src> Token<'src> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_line_end(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::End)
    }

    /// The integer value of a numeral or character literal.
    ///
    /// ```
    /// # use zasm::lex::Lexer;
    /// let mut lexer = Lexer::new("0x1F '\\n' 300");
    /// assert_eq!(Ok(31u8), lexer.next_token().value());
    /// assert_eq!(Ok(10u8), lexer.next_token().value());
    /// assert!(lexer.next_token().value::<u8>().is_err());
    /// ```
    pub fn value<T: Num + FromPrimitive>(&self) -> Result<T, LiteralError> {
        let radix = match self.kind {
            TokenKind::Decimal => 10,
            TokenKind::Hexadecimal => 16,
            TokenKind::Octal => 8,
            TokenKind::Binary => 2,
            TokenKind::Char => {
                let value = char_value(self.text)?;
                return T::from_u32(value).ok_or(LiteralError::OutOfRange);
            }
            _ => return Err(LiteralError::NotANumeral),
        };
        T::from_str_radix(self.text, radix)
            .map_err(|_| LiteralError::OutOfRange)
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Error(reason) => write!(f, "{}:{}:{}:{}", self.line, self.column, self.kind.name(), reason),
            _ => write!(f, "{}:{}:{}:{}", self.line, self.column, self.kind.name(), self.text.escape_debug()),
        }
    }
}

fn char_value(text: &str) -> Result<u32, LiteralError> {
    let mut chars = text.chars();
    match chars.next() {
        Some('\\') => {
            let value = match chars.next() {
                Some('\\') => 92,
                Some('?') => 63,
                Some('\'') => 39,
                Some('"') => 34,
                Some('0') => 0,
                Some('a') | Some('A') => 7,
                Some('b') | Some('B') => 8,
                Some('d') | Some('D') => 127,
                Some('e') | Some('E') => 27,
                Some('f') | Some('F') => 12,
                Some('n') | Some('N') => 10,
                Some('r') | Some('R') => 13,
                Some('t') | Some('T') => 9,
                Some('v') | Some('V') => 11,
                _ => return Err(LiteralError::UnknownEscape),
            };
            Ok(value)
        }
        Some(c) => Ok(c as u32),
        None => Err(LiteralError::NotANumeral),
    }
}

/// Letters allowed after a backslash in character and string literals.
const ESCAPES: &str = "abdefnrtvABDEFNRTV0'\"\\";

/// Turns a borrowed source string into [`Token`]s, one at a time.
pub struct Lexer<'src> {
    src: &'src str,
    numerals: Vec<(Regex, TokenKind)>,
    cur: usize,
    start: usize,
    start_line: usize,
    start_column: usize,
    line: usize,
    bol: usize,
    line_has_tokens: bool,
}

impl<'src> Lexer<'src> {

    // Every numeral pattern is tried at the current position and the longest match wins.
    // On a tie the earlier pattern wins, so a bare `0b` is a prefix without digits.
    // Group 1 captures the digits, which become the token's text.
    // Registering a pattern will add ^ to the beginning, so don't use ^.
    const NUMERALS: [(&'static str, TokenKind); 7] = [
        (r"(?:0[xX]|\$|#)([0-9a-fA-F]*)", TokenKind::Hexadecimal),
        (r"0[bB]([01]*)",                TokenKind::Binary),
        (r"%([01]+)",                    TokenKind::Binary), // A lone % is the modulo operator.
        (r"0[qQ]([0-7]*)",               TokenKind::Octal),
        (r"([01]+)b",                    TokenKind::Binary),
        (r"([0-7]+)[oOqQ]",              TokenKind::Octal),
        (r"([0-9]+)[dD]?",               TokenKind::Decimal),
    ];

    pub fn new(src: &'src str) -> Lexer<'src> {
        let mut this = Lexer {
            src,
            numerals: Vec::new(),
            cur: 0,
            start: 0,
            start_line: 1,
            start_column: 1,
            line: 1,
            bol: 0,
            line_has_tokens: false,
        };

        for (pattern, kind) in Self::NUMERALS.iter() {
            this.register_numeral(pattern, *kind);
        }

        this
    }

    fn register_numeral(&mut self, pattern: &str, kind: TokenKind) {
        assert!(!pattern.starts_with('^'));
        let pattern = format!("^{}", pattern);
        let regex = Regex::new(pattern.as_str()).expect("Invalid regex");
        self.numerals.push((regex, kind))
    }

    /// The text of the given 1-based line, without its line break.
    pub fn line(&self, number: usize) -> Option<&'src str> {
        source_line(self.src, number)
    }

    /// Produce the next token.
    ///
    /// Once the input is exhausted, every call returns an [`End`](TokenKind::End) token.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_insignificant();
        self.begin();

        let token = if self.at_end() {
            self.make(TokenKind::End)
        } else if let Some(token) = self.numeral() {
            token
        } else if let Some(token) = self.identifier() {
            token
        } else {
            self.punctuation()
        };

        self.line_has_tokens = !token.is(TokenKind::Newline);
        token
    }

    fn tail(&self) -> &'src str {
        &self.src[self.cur..]
    }

    fn at_end(&self) -> bool {
        self.cur >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.tail().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cur += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.bol = self.cur;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_insignificant(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some(';') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('\n') if !self.line_has_tokens => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn begin(&mut self) {
        self.start = self.cur;
        self.start_line = self.line;
        self.start_column = self.src[self.bol..self.cur].chars().count() + 1;
    }

    fn make(&self, kind: TokenKind) -> Token<'src> {
        self.make_with_text(kind, &self.src[self.start..self.cur])
    }

    fn make_with_text(&self, kind: TokenKind, text: &'src str) -> Token<'src> {
        Token {
            kind,
            text,
            line: self.start_line,
            column: self.start_column,
            unary: false,
        }
    }

    fn error(&self, reason: LexError) -> Token<'src> {
        self.make(TokenKind::Error(reason))
    }

    fn numeral(&mut self) -> Option<Token<'src>> {
        let tail = self.tail();
        let mut longest: Option<(usize, TokenKind, Range<usize>)> = None;
        for (pattern, kind) in &self.numerals {
            if let Some(captures) = pattern.captures(tail) {
                let len = captures.get(0).map_or(0, |m| m.end());
                let digits = captures.get(1).map_or(0..0, |m| m.range());
                if longest.as_ref().map_or(true, |(longest_len, _, _)| len > *longest_len) {
                    longest = Some((len, *kind, digits));
                }
            }
        }

        let (len, kind, digits) = longest?;
        self.cur += len;
        if digits.is_empty() {
            let reason = match kind {
                TokenKind::Hexadecimal => LexError::IncorrectHexadecimal,
                TokenKind::Octal => LexError::IncorrectOctal,
                _ => LexError::IncorrectBinary,
            };
            return Some(self.error(reason));
        }
        Some(self.make_with_text(kind, &tail[digits]))
    }

    fn identifier(&mut self) -> Option<Token<'src>> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Some(self.make(TokenKind::Identifier))
    }

    fn punctuation(&mut self) -> Token<'src> {
        use TokenKind::*;
        let c = match self.bump() {
            Some(c) => c,
            None => return self.make(End),
        };
        let kind = match c {
            '(' => LeftParen,
            ')' => RightParen,
            ',' => Comma,
            ':' => Colon,
            '-' => Minus,
            '+' => Plus,
            '/' => Slash,
            '*' => Star,
            '%' => Percent,
            '^' => Caret,
            '~' => Tilde,
            '&' => if self.eat('&') { DoubleAmpersand } else { Ampersand },
            '|' => if self.eat('|') { DoubleBar } else { Bar },
            '!' => if self.eat('=') { BangEqual } else { Bang },
            '=' => if self.eat('=') { EqualEqual } else { return self.error(LexError::ExpectedEqualSign) },
            '<' => {
                if self.eat('=') { LessEqual } else if self.eat('<') { ShiftLeft } else { LeftAngle }
            }
            '>' => {
                if self.eat('=') { GreaterEqual } else if self.eat('>') { ShiftRight } else { RightAngle }
            }
            '\'' => return self.char_literal(),
            '"' => return self.string_literal(),
            '\n' => Newline,
            _ => return self.error(LexError::UnexpectedCharacter),
        };
        self.make(kind)
    }

    /// Consume one raw character or one escape sequence of a literal's body.
    fn literal_char(&mut self) -> Result<(), LexError> {
        match self.peek() {
            None | Some('\n') => Err(LexError::ExpectedCharacter),
            Some('\\') => {
                self.bump();
                match self.peek() {
                    Some(c) if ESCAPES.contains(c) => {
                        self.bump();
                        Ok(())
                    }
                    _ => Err(LexError::IncorrectEscape),
                }
            }
            Some(_) => {
                self.bump();
                Ok(())
            }
        }
    }

    /// Skip the rest of a broken literal, up to and including its closing quote,
    /// but never past the end of the line.
    fn recover_literal(&mut self, quote: char) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
            if c == quote {
                break;
            }
        }
    }

    fn char_literal(&mut self) -> Token<'src> {
        let body = self.cur;
        if let Err(reason) = self.literal_char() {
            self.recover_literal('\'');
            return self.error(reason);
        }
        let text = &self.src[body..self.cur];
        if !self.eat('\'') {
            self.recover_literal('\'');
            return self.error(LexError::ExpectedClosingMark);
        }
        self.make_with_text(TokenKind::Char, text)
    }

    fn string_literal(&mut self) -> Token<'src> {
        let body = self.cur;
        loop {
            if self.peek() == Some('"') {
                let text = &self.src[body..self.cur];
                self.bump();
                return self.make_with_text(TokenKind::String, text);
            }
            match self.literal_char() {
                Ok(()) => {}
                Err(LexError::ExpectedCharacter) => return self.error(LexError::ExpectedClosingMark),
                Err(reason) => {
                    self.recover_literal('"');
                    return self.error(reason);
                }
            }
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    /// Yields every token before the end of input.
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is(TokenKind::End) {
            None
        } else {
            Some(token)
        }
    }
}

/// The text of the given 1-based line of `src`, without its line break.
pub fn source_line(src: &str, number: usize) -> Option<&str> {
    if number == 0 {
        return None;
    }
    src.split('\n')
        .nth(number - 1)
        .map(|line| line.trim_end_matches('\r'))
}
