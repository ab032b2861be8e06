//! Infix to postfix conversion of operand expressions.
//!
//! [`ExprCompiler`] is a shunting-yard compiler fed one token at a time. Its output is an
//! [`Expression`]: the same tokens in postfix order, with every operator that was used as a
//! prefix operator flagged [`unary`](Token::unary). Nothing is evaluated here.
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::lex::{Lexer, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprErrorKind {
    WrongUnaryOp,
    UnbalancedLeftParen,
    UnbalancedRightParen,
    UnexpectedToken,
}

impl Display for ExprErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        use ExprErrorKind::*;
        match self {
            WrongUnaryOp         => write!(f, "operator can't be unary"),
            UnbalancedLeftParen  => write!(f, "unbalanced left paren"),
            UnbalancedRightParen => write!(f, "unbalanced right paren"),
            UnexpectedToken      => write!(f, "unexpected token"),
        }
    }
}

/// The first structural problem found in an expression, with the token that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprError<'src> {
    pub kind: ExprErrorKind,
    pub token: Token<'src>,
}

impl Display for ExprError<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}: {}", self.token.line, self.token.column, self.kind)
    }
}

impl std::error::Error for ExprError<'_> {}

/// Prefix `+`/`-` bind tighter than any binary operator, so `-1*2` negates before multiplying.
const UNARY_PRECEDENCE: u8 = 110;

/// Binding strength of a binary operator; higher binds tighter.
pub fn precedence(kind: TokenKind) -> u8 {
    use TokenKind::*;
    match kind {
        DoubleBar => 10,
        DoubleAmpersand => 20,
        Bar => 30,
        Caret => 40,
        Ampersand => 50,
        EqualEqual | BangEqual => 60,
        LessEqual | GreaterEqual | LeftAngle | RightAngle => 70,
        ShiftLeft | ShiftRight => 80,
        Plus | Minus => 90,
        Star | Slash | Percent => 100,
        Bang | Tilde => UNARY_PRECEDENCE,
        _ => 0,
    }
}

fn stacked_precedence(token: &Token) -> u8 {
    if token.unary {
        UNARY_PRECEDENCE
    } else {
        precedence(token.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Operand,
    Operator,
    Open,
    Close,
    End,
    Other,
}

fn classify(kind: TokenKind) -> Class {
    use TokenKind::*;
    match kind {
        Decimal | Hexadecimal | Octal | Binary | Char | Identifier => Class::Operand,
        LeftParen => Class::Open,
        RightParen => Class::Close,
        End | Newline => Class::End,
        _ if precedence(kind) > 0 => Class::Operator,
        _ => Class::Other,
    }
}

/// Whether a token of this class leaves a complete value behind it.
fn ends_value(class: Option<Class>) -> bool {
    matches!(class, Some(Class::Operand) | Some(Class::Close))
}

/// Shunting-yard compiler for a single expression.
///
/// Feed tokens in order with [`feed`](ExprCompiler::feed) and collect the postfix output with
/// [`finish`](ExprCompiler::finish). The first error sticks: every later call reports it again.
#[derive(Debug, Default)]
pub struct ExprCompiler<'src> {
    output: Vec<Token<'src>>,
    operators: Vec<Token<'src>>,
    previous: Option<Class>,
    error: Option<ExprError<'src>>,
    finished: bool,
}

impl<'src> ExprCompiler<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next token. An end-of-line or end-of-input token flushes the operator stack.
    pub fn feed(&mut self, token: Token<'src>) -> Result<(), ExprError<'src>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let result = if self.finished {
            Err(ExprErrorKind::UnexpectedToken)
        } else {
            self.step(token)
        };
        result.map_err(|kind| {
            let error = ExprError { kind, token };
            self.error = Some(error);
            error
        })
    }

    /// Flush the operator stack at `end` and return the postfix expression.
    ///
    /// `end` may be any terminator (a comma between operands, say); it only positions errors.
    pub fn finish(mut self, end: Token<'src>) -> Result<Expression<'src>, ExprError<'src>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.finished {
            self.flush().map_err(|kind| ExprError { kind, token: end })?;
        }
        Ok(Expression { tokens: self.output })
    }

    fn step(&mut self, token: Token<'src>) -> Result<(), ExprErrorKind> {
        let class = classify(token.kind);
        match class {
            Class::Operand => {
                if ends_value(self.previous) {
                    return Err(ExprErrorKind::UnexpectedToken);
                }
                self.output.push(token);
            }
            Class::Operator if !ends_value(self.previous) => {
                if !matches!(token.kind, TokenKind::Plus | TokenKind::Minus) {
                    return Err(ExprErrorKind::WrongUnaryOp);
                }
                self.operators.push(Token { unary: true, ..token });
            }
            Class::Operator => {
                let incoming = precedence(token.kind);
                while let Some(top) = self.operators.last() {
                    if top.is(TokenKind::LeftParen) || stacked_precedence(top) < incoming {
                        break;
                    }
                    self.pop_to_output();
                }
                self.operators.push(token);
            }
            Class::Open => {
                if ends_value(self.previous) {
                    return Err(ExprErrorKind::UnexpectedToken);
                }
                self.operators.push(token);
            }
            Class::Close => {
                if !ends_value(self.previous) {
                    return Err(ExprErrorKind::UnexpectedToken);
                }
                loop {
                    match self.operators.pop() {
                        None => return Err(ExprErrorKind::UnbalancedRightParen),
                        Some(top) if top.is(TokenKind::LeftParen) => break,
                        Some(top) => self.output.push(top),
                    }
                }
            }
            Class::End => self.flush()?,
            Class::Other => return Err(ExprErrorKind::UnexpectedToken),
        }
        self.previous = Some(class);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ExprErrorKind> {
        if !ends_value(self.previous) {
            return Err(ExprErrorKind::UnexpectedToken);
        }
        while let Some(top) = self.operators.pop() {
            if top.is(TokenKind::LeftParen) {
                return Err(ExprErrorKind::UnbalancedLeftParen);
            }
            self.output.push(top);
        }
        self.finished = true;
        Ok(())
    }

    fn pop_to_output(&mut self) {
        if let Some(top) = self.operators.pop() {
            self.output.push(top);
        }
    }
}

/// Compile a whole source string as one expression.
pub fn compile(source: &str) -> Result<Expression<'_>, ExprError<'_>> {
    let mut lexer = Lexer::new(source);
    let mut compiler = ExprCompiler::new();
    loop {
        let token = lexer.next_token();
        if token.is(TokenKind::End) {
            return compiler.finish(token);
        }
        compiler.feed(token)?;
    }
}

/// An unevaluated expression in postfix order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression<'src> {
    tokens: Vec<Token<'src>>,
}

impl<'src> Expression<'src> {
    pub fn tokens(&self) -> &[Token<'src>] {
        &self.tokens
    }

    /// Whether walking the tokens left to right leaves exactly one value, with every operator
    /// finding the operands it needs.
    pub fn is_well_formed(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens {
            match classify(token.kind) {
                Class::Operand => depth += 1,
                Class::Operator if token.unary => {
                    if depth < 1 {
                        return false;
                    }
                }
                Class::Operator => {
                    if depth < 2 {
                        return false;
                    }
                    depth -= 1;
                }
                _ => return false,
            }
        }
        depth == 1
    }
}

impl Display for Expression<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = self.tokens.iter()
            .map(|token| if token.unary { format!("u{}", token.text) } else { token.text.to_string() })
            .join(" ");
        write!(f, "{}", text)
    }
}
