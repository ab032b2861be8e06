use std::fmt::{Display, Formatter, Result};

use itertools::Itertools;

use crate::expr::Expression;

/// How many bytes an expression operand will occupy once evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn bytes(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }
}

impl Display for Width {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Width::Byte => write!(f, "BYTE"),
            Width::Word => write!(f, "WORD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedItem<'src> {
    Byte(u8),
    /// An expression left for a later stage to evaluate.
    Expr(Width, Expression<'src>),
}

impl EncodedItem<'_> {
    pub fn width(&self) -> Width {
        match self {
            EncodedItem::Byte(_) => Width::Byte,
            EncodedItem::Expr(width, _) => *width,
        }
    }
}

impl Display for EncodedItem<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            EncodedItem::Byte(value) => write!(f, "(BYTE {:02x})", value),
            EncodedItem::Expr(width, expression) => write!(f, "({} {})", width, expression),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'src> {
    pub items: Vec<EncodedItem<'src>>,
}

impl<'src> Instruction<'src> {
    /// Encoded size in bytes.
    pub fn size(&self) -> u16 {
        self.items.iter()
            .map(|item| item.width().bytes())
            .sum()
    }

    /// The literal bytes, or `None` if any item still needs evaluation.
    pub fn literal_bytes(&self) -> Option<Vec<u8>> {
        self.items.iter()
            .map(|item| match item {
                EncodedItem::Byte(value) => Some(*value),
                EncodedItem::Expr(..) => None,
            })
            .collect()
    }
}

impl Display for Instruction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "INSTRUCTION {}", self.items.iter().join(", "))
    }
}

/// Builds an [`Instruction`] from encoded items, in order.
#[derive(Debug, Default)]
pub struct InstructionBuilder<'src> {
    items: Vec<EncodedItem<'src>>,
}

impl<'src> InstructionBuilder<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte(mut self, value: u8) -> Self {
        self.items.push(EncodedItem::Byte(value));
        self
    }

    pub fn expr(mut self, width: Width, expression: Expression<'src>) -> Self {
        self.items.push(EncodedItem::Expr(width, expression));
        self
    }

    pub fn build(self) -> Instruction<'src> {
        Instruction { items: self.items }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// Line the label is defined on.
    pub line: usize,
    /// Filled in once addresses are assigned.
    pub address: Option<u16>,
}

impl Label {
    pub fn new(name: &str, line: usize) -> Self {
        Self { name: name.to_string(), line, address: None }
    }

    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    pub fn set_address(&mut self, address: u16) {
        self.address = Some(address);
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "LABEL name={} line={}", self.name, self.line)?;
        match self.address {
            Some(address) => write!(f, " addr={:#06x}", address),
            None => write!(f, " addr=?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrNode<'src> {
    Instruction(Instruction<'src>),
    Label(Label),
}

impl Display for IrNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            IrNode::Instruction(instruction) => write!(f, "{}", instruction),
            IrNode::Label(label) => write!(f, "{}", label),
        }
    }
}
