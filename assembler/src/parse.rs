//! Functions and data structures for parsing Z80 assembly.
//!
//! Parsing structures the [tokens](crate::lex) of one source file into a list of
//! [IR nodes](crate::ir::IrNode): labels and instructions, in program order. Operand
//! expressions are handed to the [expression compiler](crate::expr) and stored unevaluated.
//!
//! ```
//! # use zasm::{parse, ParseOptions};
//! let parsed = parse("start: ld a, 1+2\n", ParseOptions::default());
//! let rendered = parsed.nodes.iter().map(ToString::to_string).collect::<Vec<_>>();
//! assert_eq!(rendered, vec![
//!     "LABEL name=start line=1 addr=?",
//!     "INSTRUCTION (BYTE 3e), (BYTE 1 2 +)",
//! ]);
//! ```
//!
//! Each instruction line is matched against an ordered list of operand shapes for its mnemonic.
//! A shape that doesn't fit is rolled back and the next one is tried.
//!
//! Parsing always finishes. A malformed line produces exactly one [`Diagnostic`], the rest of
//! that line is skipped, and parsing resumes on the next line.
use std::collections::HashMap;

use log::{debug, trace};

use crate::error::{Diagnostic, DiagnosticKind};
use crate::expr::{ExprCompiler, Expression};
use crate::ir::{Instruction, IrNode, Label};
use crate::isa;
use crate::lex::{Lexer, Token, TokenKind};
use crate::ParseOptions;

/// Why an operand matcher or an instruction alternative did not produce a value.
#[derive(Debug)]
pub(crate) enum Miss {
    /// The input doesn't have this shape. Another alternative may still fit.
    NoMatch,
    /// The input has this shape but is broken. The line is abandoned.
    Fail(Diagnostic),
}

pub(crate) type Attempt<T> = Result<T, Miss>;

/// The result of parsing one source file.
#[derive(Debug)]
pub struct Parsed<'src> {
    /// Labels and instructions in program order.
    pub nodes: Vec<IrNode<'src>>,
    /// Index into `nodes` of each label's [`IrNode::Label`].
    pub labels: HashMap<String, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'src> Parsed<'src> {
    pub fn label(&self, name: &str) -> Option<&Label> {
        match self.nodes.get(*self.labels.get(name)?) {
            Some(IrNode::Label(label)) => Some(label),
            _ => None,
        }
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction<'src>> {
        self.nodes.iter().filter_map(|node| match node {
            IrNode::Instruction(instruction) => Some(instruction),
            IrNode::Label(_) => None,
        })
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    /// Tokens of the current line read so far. Grows as far as backtracking needs.
    buffer: Vec<Token<'src>>,
    pos: usize,
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
    labels: HashMap<String, usize>,
    nodes: Vec<IrNode<'src>>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, options: ParseOptions) -> Self {
        Self {
            lexer: Lexer::new(source),
            buffer: Vec::new(),
            pos: 0,
            options,
            diagnostics: Vec::new(),
            labels: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Parse the whole source.
    pub fn parse(mut self) -> Parsed<'src> {
        while !self.current().is(TokenKind::End) {
            if self.parse_label() {
                self.parse_instruction();
            }
            self.finish_line();
        }
        Parsed {
            nodes: self.nodes,
            labels: self.labels,
            diagnostics: self.diagnostics,
        }
    }

    fn token_at(&mut self, index: usize) -> Token<'src> {
        while self.buffer.len() <= index {
            let token = self.lexer.next_token();
            trace!("buffered {}", token);
            self.buffer.push(token);
        }
        self.buffer[index]
    }

    fn current(&mut self) -> Token<'src> {
        self.token_at(self.pos)
    }

    fn peek(&mut self, offset: usize) -> Token<'src> {
        self.token_at(self.pos + offset)
    }

    fn advance(&mut self) -> Token<'src> {
        let token = self.current();
        self.pos += 1;
        token
    }

    /// Run `f`, rewinding to where it started if it doesn't match.
    pub(crate) fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Attempt<T>) -> Attempt<T> {
        let start = self.pos;
        let result = f(self);
        if let Err(Miss::NoMatch) = result {
            self.pos = start;
        }
        result
    }

    fn diagnostic(&self, kind: DiagnosticKind, token: &Token) -> Diagnostic {
        Diagnostic::new(kind, token, self.lexer.line(token.line))
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!("line {} abandoned: {}", diagnostic.line, diagnostic.kind);
        self.diagnostics.push(diagnostic);
        self.skip_line();
    }

    fn skip_line(&mut self) {
        while !self.current().is_line_end() {
            self.advance();
        }
    }

    fn finish_line(&mut self) {
        if self.current().is(TokenKind::Newline) {
            self.advance();
        }
        self.buffer.drain(..self.pos);
        self.pos = 0;
    }

    /// The current token, unless it's an error token.
    fn significant(&mut self) -> Attempt<Token<'src>> {
        let token = self.current();
        match token.kind {
            TokenKind::Error(reason) => Err(Miss::Fail(self.diagnostic(DiagnosticKind::InvalidToken(reason), &token))),
            _ => Ok(token),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Attempt<Token<'src>> {
        let token = self.significant()?;
        if token.is(kind) {
            Ok(self.advance())
        } else {
            Err(Miss::NoMatch)
        }
    }

    fn identifier_in<T: Copy>(&mut self, table: &[(&str, T)]) -> Attempt<T> {
        let token = self.significant()?;
        if !token.is(TokenKind::Identifier) {
            return Err(Miss::NoMatch);
        }
        let value = table.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token.text))
            .map(|(_, value)| *value)
            .ok_or(Miss::NoMatch)?;
        self.advance();
        Ok(value)
    }

    /// An 8-bit register; yields its encoding.
    pub(crate) fn register(&mut self) -> Attempt<u8> {
        self.identifier_in(isa::REGISTERS)
    }

    /// A register pair from `table`; yields its encoding.
    pub(crate) fn pair(&mut self, table: &[(&str, u8)]) -> Attempt<u8> {
        self.identifier_in(table)
    }

    pub(crate) fn keyword(&mut self, word: &str) -> Attempt<()> {
        self.identifier_in(&[(word, ())])
    }

    pub(crate) fn comma(&mut self) -> Attempt<()> {
        self.expect(TokenKind::Comma).map(|_| ())
    }

    /// `(hl)`
    pub(crate) fn indirect_hl(&mut self) -> Attempt<()> {
        self.expect(TokenKind::LeftParen)?;
        self.keyword("hl")?;
        self.expect(TokenKind::RightParen)?;
        Ok(())
    }

    /// A register pair from `table` in parentheses, like `(de)`; yields its encoding.
    pub(crate) fn indirect_pair(&mut self, table: &[(&str, u8)]) -> Attempt<u8> {
        self.expect(TokenKind::LeftParen)?;
        let pair = self.pair(table)?;
        self.expect(TokenKind::RightParen)?;
        Ok(pair)
    }

    /// A one-byte integer literal accepted by `accept`.
    pub(crate) fn small_int(&mut self, accept: fn(u8) -> bool) -> Attempt<u8> {
        let token = self.significant()?;
        match token.value::<u8>() {
            Ok(value) if token.kind.is_numeral() && accept(value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(Miss::NoMatch),
        }
    }

    /// An expression operand enclosed as a whole in one pair of parentheses, like `(label+1)`.
    pub(crate) fn address(&mut self) -> Attempt<Expression<'src>> {
        let end = self.operand_end()?;
        if !self.wholly_parenthesized(end) {
            return Err(Miss::NoMatch);
        }
        self.operand_expression(end)
    }

    /// An expression operand that isn't enclosed as a whole in parentheses.
    pub(crate) fn immediate(&mut self) -> Attempt<Expression<'src>> {
        let end = self.operand_end()?;
        if self.wholly_parenthesized(end) {
            return Err(Miss::NoMatch);
        }
        self.operand_expression(end)
    }

    /// Index of the token terminating the operand at the cursor: a line end, or a comma
    /// outside parentheses. Operands naming a register are not expressions.
    fn operand_end(&mut self) -> Attempt<usize> {
        let mut depth = 0usize;
        let mut index = self.pos;
        loop {
            let token = self.token_at(index);
            match token.kind {
                TokenKind::Newline | TokenKind::End => break,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth = depth.saturating_sub(1),
                TokenKind::Identifier if isa::is_register_name(token.text) => return Err(Miss::NoMatch),
                TokenKind::Error(reason) => {
                    return Err(Miss::Fail(self.diagnostic(DiagnosticKind::InvalidToken(reason), &token)));
                }
                _ => {}
            }
            index += 1;
        }
        if index == self.pos {
            Err(Miss::NoMatch)
        } else {
            Ok(index)
        }
    }

    /// Whether the tokens from the cursor up to `end` open with a parenthesis that closes
    /// on the last one.
    fn wholly_parenthesized(&self, end: usize) -> bool {
        let tokens = &self.buffer[self.pos..end];
        if !matches!(tokens.first(), Some(token) if token.is(TokenKind::LeftParen)) {
            return false;
        }
        let mut depth = 0usize;
        for (index, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return index == tokens.len() - 1;
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn operand_expression(&mut self, end: usize) -> Attempt<Expression<'src>> {
        let mut compiler = ExprCompiler::new();
        while self.pos < end {
            let token = self.advance();
            if let Err(error) = compiler.feed(token) {
                return Err(Miss::Fail(Diagnostic::from_expr_error(&error, self.lexer.line(error.token.line))));
            }
        }
        let terminator = self.current();
        compiler.finish(terminator)
            .map_err(|error| Miss::Fail(Diagnostic::from_expr_error(&error, self.lexer.line(error.token.line))))
    }

    /// Parse a leading `name:` if there is one. Returns whether the rest of the line should
    /// still be parsed.
    fn parse_label(&mut self) -> bool {
        let name = self.current();
        if !name.is(TokenKind::Identifier) || !self.peek(1).is(TokenKind::Colon) {
            return true;
        }
        self.pos += 2;

        if let Some(&index) = self.labels.get(name.text) {
            if !self.options.leniency.duplicate_labels_allowed() {
                let first_line = match &self.nodes[index] {
                    IrNode::Label(label) => label.line,
                    IrNode::Instruction(_) => name.line,
                };
                let kind = DiagnosticKind::DuplicateLabel { name: name.text.to_string(), first_line };
                let diagnostic = self.diagnostic(kind, &name);
                self.report(diagnostic);
                return false;
            }
        }

        debug!("label {} on line {}", name.text, name.line);
        self.labels.insert(name.text.to_string(), self.nodes.len());
        self.nodes.push(IrNode::Label(Label::new(name.text, name.line)));
        true
    }

    fn parse_instruction(&mut self) {
        let head = self.current();
        match head.kind {
            TokenKind::Newline | TokenKind::End => {}
            TokenKind::Identifier => match isa::alternatives(head.text) {
                Some(alternatives) => {
                    self.advance();
                    self.match_alternatives(head, alternatives);
                }
                None => {
                    let kind = DiagnosticKind::UnknownInstruction { mnemonic: head.text.to_string() };
                    let diagnostic = self.diagnostic(kind, &head);
                    self.report(diagnostic);
                }
            },
            TokenKind::Error(reason) => {
                let diagnostic = self.diagnostic(DiagnosticKind::InvalidToken(reason), &head);
                self.report(diagnostic);
            }
            _ => {
                let diagnostic = self.diagnostic(DiagnosticKind::ExpectedInstructionName, &head);
                self.report(diagnostic);
            }
        }
    }

    fn match_alternatives(&mut self, head: Token<'src>, alternatives: &[isa::Alternative]) {
        for alternative in alternatives {
            match self.attempt(|parser| alternative(parser)) {
                Ok(instruction) => {
                    let next = self.current();
                    if next.is_line_end() {
                        debug!("line {}: {}", head.line, instruction);
                        self.nodes.push(IrNode::Instruction(instruction));
                    } else {
                        let kind = DiagnosticKind::ExcessiveCharacters { found: next.text.to_string() };
                        let diagnostic = self.diagnostic(kind, &next);
                        self.report(diagnostic);
                    }
                    return;
                }
                Err(Miss::NoMatch) => continue,
                Err(Miss::Fail(diagnostic)) => {
                    self.report(diagnostic);
                    return;
                }
            }
        }
        let operands = self.current();
        let kind = DiagnosticKind::WrongOperands { mnemonic: head.text.to_string() };
        let diagnostic = self.diagnostic(kind, &operands);
        self.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeniencyLevel;
    use crate::error::LexError;
    use crate::expr::ExprErrorKind;
    use crate::ir::EncodedItem;

    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Parsed {
        Parser::new(source, ParseOptions::default()).parse()
    }

    fn rendered(parsed: &Parsed) -> Vec<String> {
        parsed.nodes.iter().map(ToString::to_string).collect()
    }

    fn kinds(parsed: &Parsed) -> Vec<(DiagnosticKind, usize, usize)> {
        parsed.diagnostics.iter()
            .map(|diagnostic| (diagnostic.kind.clone(), diagnostic.line, diagnostic.column))
            .collect()
    }

    #[test]
    fn lone_label() {
        let parsed = parse("loop:");
        assert_eq!(vec!["LABEL name=loop line=1 addr=?"], rendered(&parsed));
        assert_eq!(Some(&Label::new("loop", 1)), parsed.label("loop"));
        assert_eq!(1, parsed.labels.len());
        assert!(!parsed.has_errors());
    }

    #[test]
    fn label_then_instruction_on_one_line() {
        let parsed = parse("\n\nstart: nop\n");
        assert_eq!(
            vec!["LABEL name=start line=3 addr=?", "INSTRUCTION (BYTE 00)"],
            rendered(&parsed));
    }

    #[test]
    fn mnemonics_and_registers_ignore_case() {
        let parsed = parse("LD A, B\nld a, b\n");
        assert_eq!(vec!["INSTRUCTION (BYTE 78)"; 2], rendered(&parsed));
    }

    #[test]
    fn alternatives_are_tried_in_order() {
        let parsed = parse(concat!(
            "ld a, (hl)\n",
            "ld (hl), e\n",
            "ld (hl), 7\n",
            "ld a, (buffer+1)\n",
            "ld (0x8000), a\n",
            "ld c, 'x'\n",
            "ld hl, table\n",
        ));
        assert_eq!(
            vec![
                "INSTRUCTION (BYTE 7e)",
                "INSTRUCTION (BYTE 73)",
                "INSTRUCTION (BYTE 36), (BYTE 7)",
                "INSTRUCTION (BYTE 3a), (WORD buffer 1 +)",
                "INSTRUCTION (BYTE 32), (WORD 8000)",
                "INSTRUCTION (BYTE 0e), (BYTE x)",
                "INSTRUCTION (BYTE 21), (WORD table)",
            ],
            rendered(&parsed));
        assert!(!parsed.has_errors());
    }

    #[test]
    fn partially_parenthesized_operand_is_immediate() {
        let parsed = parse("ld a, (1)+(2)");
        assert_eq!(vec!["INSTRUCTION (BYTE 3e), (BYTE 1 2 +)"], rendered(&parsed));
    }

    #[test]
    fn unknown_instruction_then_recovery() {
        let parsed = parse("frob a, b\nnop\n");
        assert_eq!(
            vec![(DiagnosticKind::UnknownInstruction { mnemonic: "frob".to_string() }, 1, 1)],
            kinds(&parsed));
        assert_eq!(vec!["INSTRUCTION (BYTE 00)"], rendered(&parsed));
    }

    #[test]
    fn wrong_operands_yield_one_diagnostic() {
        let parsed = parse("ld b, (label)\nhalt");
        assert_eq!(
            vec![(DiagnosticKind::WrongOperands { mnemonic: "ld".to_string() }, 1, 4)],
            kinds(&parsed));
        assert_eq!(vec!["INSTRUCTION (BYTE 76)"], rendered(&parsed));
    }

    #[test]
    fn register_names_are_not_expression_symbols() {
        let parsed = parse("ld a,(bc)\nld (de),a\nld sp,hl\nld a,hl\njp hl\nld a,(hl+1)\nld (ix),a\n");
        assert_eq!(
            vec!["INSTRUCTION (BYTE 0a)", "INSTRUCTION (BYTE 12)", "INSTRUCTION (BYTE f9)"],
            rendered(&parsed));
        let wrong = |mnemonic: &str, line: usize, column: usize| {
            (DiagnosticKind::WrongOperands { mnemonic: mnemonic.to_string() }, line, column)
        };
        assert_eq!(
            vec![wrong("ld", 4, 4), wrong("jp", 5, 4), wrong("ld", 6, 4), wrong("ld", 7, 4)],
            kinds(&parsed));
    }

    #[test]
    fn expected_instruction_name() {
        let parsed = parse(", nop\n42\nret");
        assert_eq!(
            vec![
                (DiagnosticKind::ExpectedInstructionName, 1, 1),
                (DiagnosticKind::ExpectedInstructionName, 2, 1),
            ],
            kinds(&parsed));
        assert_eq!(vec!["INSTRUCTION (BYTE c9)"], rendered(&parsed));
    }

    #[test]
    fn excessive_characters_are_not_rolled_back() {
        let parsed = parse("ret nz\nnop");
        assert_eq!(
            vec![(DiagnosticKind::ExcessiveCharacters { found: "nz".to_string() }, 1, 5)],
            kinds(&parsed));
        assert_eq!(vec!["INSTRUCTION (BYTE 00)"], rendered(&parsed));
    }

    #[test]
    fn expression_errors_are_positioned() {
        let parsed = parse("ld a, (1+2\nld b, 1 * * 2\njp 1,");
        assert_eq!(
            vec![
                (DiagnosticKind::Expression(ExprErrorKind::UnbalancedLeftParen), 1, 11),
                (DiagnosticKind::Expression(ExprErrorKind::WrongUnaryOp), 2, 11),
            ],
            kinds(&parsed)[..2].to_vec());
        assert_eq!(3, parsed.diagnostics.len());
        assert!(parsed.nodes.is_empty());
    }

    #[test]
    fn invalid_token_in_operand() {
        let parsed = parse("ld a, @\nnop");
        assert_eq!(
            vec![(DiagnosticKind::InvalidToken(LexError::UnexpectedCharacter), 1, 7)],
            kinds(&parsed));
        assert_eq!(1, parsed.nodes.len());
    }

    #[test]
    fn invalid_token_at_line_start() {
        let parsed = parse("0x\nnop");
        assert_eq!(
            vec![(DiagnosticKind::InvalidToken(LexError::IncorrectHexadecimal), 1, 1)],
            kinds(&parsed));
    }

    #[test]
    fn duplicate_label_is_reported_when_strict() {
        let parsed = parse("a1: nop\na1: halt\n");
        assert_eq!(
            vec![(DiagnosticKind::DuplicateLabel { name: "a1".to_string(), first_line: 1 }, 2, 1)],
            kinds(&parsed));
        assert_eq!(vec!["LABEL name=a1 line=1 addr=?", "INSTRUCTION (BYTE 00)"], rendered(&parsed));
        assert_eq!(1, parsed.label("a1").map_or(0, |label| label.line));
    }

    #[test]
    fn duplicate_label_overwrites_when_lenient() {
        let options = ParseOptions { leniency: LeniencyLevel::Lenient };
        let parsed = Parser::new("a1: nop\na1: halt\n", options).parse();
        assert!(!parsed.has_errors());
        assert_eq!(4, parsed.nodes.len());
        assert_eq!(2, parsed.label("a1").map_or(0, |label| label.line));
    }

    #[test]
    fn small_literals() {
        let parsed = parse("rst 0x38\nim 2\nrst 7\nim 3");
        assert_eq!(
            vec!["INSTRUCTION (BYTE ff)", "INSTRUCTION (BYTE ed), (BYTE 5e)"],
            rendered(&parsed));
        assert_eq!(
            vec![
                (DiagnosticKind::WrongOperands { mnemonic: "rst".to_string() }, 3, 5),
                (DiagnosticKind::WrongOperands { mnemonic: "im".to_string() }, 4, 4),
            ],
            kinds(&parsed));
    }

    #[test]
    fn long_lines_backtrack() {
        let operand = (0..100).map(|n| n.to_string()).collect::<Vec<_>>().join(" + ");
        let source = format!("ld a, {}\nld a, ({})", operand, operand);
        let parsed = parse(&source);
        assert!(!parsed.has_errors());
        let opcodes = parsed.instructions()
            .map(|instruction| instruction.items[0].clone())
            .collect::<Vec<_>>();
        assert_eq!(vec![EncodedItem::Byte(0x3e), EncodedItem::Byte(0x3a)], opcodes);
    }
}
