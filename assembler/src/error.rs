use std::fmt::{Display, Formatter, Result};

use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};

use crate::expr::{ExprError, ExprErrorKind};
use crate::lex::Token;

use DiagnosticKind::*;

/// The reason a run of source text could not be turned into a meaningful token.
///
/// Carried by [`TokenKind::Error`](crate::lex::TokenKind::Error) tokens. Lexing never stops
/// at a bad character; the parser decides what to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexError {
    UnexpectedCharacter,
    ExpectedEqualSign,
    IncorrectHexadecimal,
    IncorrectBinary,
    IncorrectOctal,
    ExpectedCharacter,
    IncorrectEscape,
    ExpectedClosingMark,
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        use LexError::*;
        match self {
            UnexpectedCharacter  => write!(f, "unexpected character"),
            ExpectedEqualSign    => write!(f, "expected equal sign"),
            IncorrectHexadecimal => write!(f, "incorrect hexadecimal number"),
            IncorrectBinary      => write!(f, "incorrect binary number"),
            IncorrectOctal       => write!(f, "incorrect octal number"),
            ExpectedCharacter    => write!(f, "expected a character"),
            IncorrectEscape      => write!(f, "incorrect escape char"),
            ExpectedClosingMark  => write!(f, "expected closing mark"),
        }
    }
}

/// Why a token could not be converted to an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralError {
    NotANumeral,
    OutOfRange,
    UnknownEscape,
}

impl Display for LiteralError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        use LiteralError::*;
        match self {
            NotANumeral   => write!(f, "token is not a numeral"),
            OutOfRange    => write!(f, "value does not fit the requested type"),
            UnknownEscape => write!(f, "unknown escape sequence"),
        }
    }
}

impl std::error::Error for LiteralError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownInstruction { mnemonic: String },
    ExpectedInstructionName,
    WrongOperands { mnemonic: String },
    ExcessiveCharacters { found: String },
    Expression(ExprErrorKind),
    InvalidToken(LexError),
    DuplicateLabel { name: String, first_line: usize },
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            UnknownInstruction { mnemonic } => write!(f, "unknown instruction: {}", mnemonic),
            ExpectedInstructionName => write!(f, "expected instruction name"),
            WrongOperands { mnemonic } => write!(f, "wrong operands to instruction {}", mnemonic),
            ExcessiveCharacters { found } => write!(f, "excessive characters at the end of an instruction: {}", found),
            Expression(reason) => write!(f, "invalid expression: {}", reason),
            InvalidToken(reason) => write!(f, "invalid token: {}", reason),
            DuplicateLabel { name, first_line } => write!(f, "label {} is already defined on line {}", name, first_line),
        }
    }
}

/// One problem found while parsing, positioned at the token that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based character column of the offending token.
    pub column: usize,
    /// Width of the offending token in characters, at least 1.
    pub width: usize,
    /// Copy of the whole source line, when it could be found.
    pub source_line: Option<String>,
}

impl Diagnostic {
    pub(crate) fn new(kind: DiagnosticKind, token: &Token, source_line: Option<&str>) -> Self {
        Self {
            kind,
            line: token.line,
            column: token.column,
            width: token.text.chars().count().max(1),
            source_line: source_line.map(str::to_owned),
        }
    }

    pub(crate) fn from_expr_error(error: &ExprError, source_line: Option<&str>) -> Self {
        Self::new(Expression(error.kind), &error.token, source_line)
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    fn annotation_label(&self) -> &'static str {
        match self.kind {
            UnknownInstruction { .. } | ExpectedInstructionName => "instruction name here",
            WrongOperands { .. } => "operands start here",
            ExcessiveCharacters { .. } => "unexpected text here",
            Expression(_) => "in this expression",
            InvalidToken(_) => "invalid token here",
            DuplicateLabel { .. } => "redefined here",
        }
    }

    /// Render this diagnostic as an annotated source snippet.
    ///
    /// `origin` names the file in the snippet header. When the source line is unknown,
    /// only the title is rendered.
    pub fn render_snippet(&self, origin: Option<&str>, color: bool) -> String {
        let message = self.message();
        // Trailing space gives end-of-line tokens (newline, end of input) a character to point at.
        let source = self.source_line.as_ref().map(|line| format!("{} ", line));
        let slices = match &source {
            Some(source) => {
                let len = source.chars().count();
                let start = (self.column - 1).min(len - 1);
                let end = (start + self.width).min(len);
                vec![Slice {
                    source: source.as_str(),
                    line_start: self.line,
                    origin,
                    fold: false,
                    annotations: vec![SourceAnnotation {
                        range: (start, end),
                        label: self.annotation_label(),
                        annotation_type: AnnotationType::Error,
                    }],
                }]
            }
            None => vec![],
        };
        let snippet = Snippet {
            title: Some(Annotation {
                label: Some(message.as_str()),
                id: None,
                annotation_type: AnnotationType::Error,
            }),
            footer: vec![],
            slices,
            opt: FormatOptions {
                color,
                ..Default::default()
            },
        };
        DisplayList::from(snippet).to_string()
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}:{}: error: {}", self.line, self.column, self.kind)?;
        if let Some(source_line) = &self.source_line {
            // Tabs are kept so the caret lines up under the echoed line.
            let padding = source_line.chars()
                .chain(std::iter::repeat(' '))
                .take(self.column.saturating_sub(1))
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect::<String>();
            write!(f, "\n{}\n{}^", source_line, padding)?;
        }
        Ok(())
    }
}
