//! Front end of a Z80 assembler.
//!
//! Source text is [lexed](lex) into tokens, [parsed](parse) line by line into
//! [IR nodes](ir::IrNode), and every problem found along the way becomes a
//! [`Diagnostic`]. Operand expressions are [compiled to postfix](expr) but not evaluated.

pub mod error;
pub mod expr;
pub mod ir;
mod isa;
pub mod lex;
pub mod parse;

pub use error::{Diagnostic, DiagnosticKind};
pub use parse::{Parsed, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeniencyLevel {
    Strict,
    Lenient,
}

impl Default for LeniencyLevel {
    fn default() -> Self {
        LeniencyLevel::Strict
    }
}

impl LeniencyLevel {
    pub fn duplicate_labels_allowed(&self) -> bool {
        match self {
            LeniencyLevel::Lenient => true,
            LeniencyLevel::Strict => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub leniency: LeniencyLevel,
}

/// Parse a whole source file.
pub fn parse(source: &str, options: ParseOptions) -> Parsed<'_> {
    Parser::new(source, options).parse()
}
