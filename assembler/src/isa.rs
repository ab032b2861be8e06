//! The supported Z80 instructions and the operand shapes each one accepts.
//!
//! Every mnemonic maps to an ordered list of [`Alternative`]s. An alternative either builds the
//! whole instruction or misses; the parser tries them in order and rewinds between tries.
use crate::ir::{Instruction, InstructionBuilder, Width};
use crate::parse::{Attempt, Miss, Parser};

pub(crate) type Alternative = for<'src> fn(&mut Parser<'src>) -> Attempt<Instruction<'src>>;

pub(crate) const REGISTERS: &[(&str, u8)] = &[
    ("b", 0),
    ("c", 1),
    ("d", 2),
    ("e", 3),
    ("h", 4),
    ("l", 5),
    ("a", 7),
];

/// Pairs usable with 16-bit loads and arithmetic.
const PAIRS_SP: &[(&str, u8)] = &[("bc", 0), ("de", 1), ("hl", 2), ("sp", 3)];

/// Pairs usable with the stack.
const PAIRS_AF: &[(&str, u8)] = &[("bc", 0), ("de", 1), ("hl", 2), ("af", 3)];

/// Pairs the accumulator can be loaded from or stored through.
const PAIRS_INDIRECT: &[(&str, u8)] = &[("bc", 0), ("de", 1)];

/// Registers no listed form takes as an operand; they still can't name a symbol.
const OTHER_REGISTERS: &[&str] = &["i", "r", "ix", "iy"];

/// Whether `name` is a register or register pair, which an operand expression may not use.
pub(crate) fn is_register_name(name: &str) -> bool {
    REGISTERS.iter().chain(PAIRS_SP).chain(PAIRS_AF)
        .map(|(register, _)| register)
        .chain(OTHER_REGISTERS)
        .any(|register| register.eq_ignore_ascii_case(name))
}

/// The alternatives for a mnemonic, matched case-insensitively.
pub(crate) fn alternatives(mnemonic: &str) -> Option<&'static [Alternative]> {
    let alternatives = match mnemonic.to_ascii_lowercase().as_str() {
        "nop" => NOP,
        "halt" => HALT,
        "ret" => RET,
        "ld" => LD,
        "push" => PUSH,
        "pop" => POP,
        "inc" => INC,
        "dec" => DEC,
        "add" => ADD,
        "sub" => SUB,
        "and" => AND,
        "xor" => XOR,
        "or" => OR,
        "cp" => CP,
        "jp" => JP,
        "call" => CALL,
        "jr" => JR,
        "djnz" => DJNZ,
        "rst" => RST,
        "im" => IM,
        "out" => OUT,
        "in" => IN,
        _ => return None,
    };
    Some(alternatives)
}

fn opcode<'src>(byte: u8) -> InstructionBuilder<'src> {
    InstructionBuilder::new().byte(byte)
}

macro_rules! implied {
    ($name:ident, $function:ident, $byte:expr) => {
        fn $function<'src>(_: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
            Ok(opcode($byte).build())
        }
        const $name: &[Alternative] = &[$function];
    };
}

implied!(NOP, nop, 0x00);
implied!(HALT, halt, 0x76);
implied!(RET, ret, 0xc9);

const LD: &[Alternative] = &[
    ld_r_r,
    ld_r_hl,
    ld_hl_r,
    ld_hl_n,
    ld_a_bcde,
    ld_bcde_a,
    ld_a_nn,
    ld_nn_a,
    ld_sp_hl,
    ld_dd_nn,
    ld_r_n,
];

fn ld_r_r<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let dst = p.register()?;
    p.comma()?;
    let src = p.register()?;
    Ok(opcode(0x40 | dst << 3 | src).build())
}

fn ld_r_hl<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let dst = p.register()?;
    p.comma()?;
    p.indirect_hl()?;
    Ok(opcode(0x46 | dst << 3).build())
}

fn ld_hl_r<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.indirect_hl()?;
    p.comma()?;
    let src = p.register()?;
    Ok(opcode(0x70 | src).build())
}

fn ld_hl_n<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.indirect_hl()?;
    p.comma()?;
    let n = p.immediate()?;
    Ok(opcode(0x36).expr(Width::Byte, n).build())
}

fn ld_a_bcde<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.keyword("a")?;
    p.comma()?;
    let pair = p.indirect_pair(PAIRS_INDIRECT)?;
    Ok(opcode(0x0a | pair << 4).build())
}

fn ld_bcde_a<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let pair = p.indirect_pair(PAIRS_INDIRECT)?;
    p.comma()?;
    p.keyword("a")?;
    Ok(opcode(0x02 | pair << 4).build())
}

fn ld_a_nn<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.keyword("a")?;
    p.comma()?;
    let nn = p.address()?;
    Ok(opcode(0x3a).expr(Width::Word, nn).build())
}

fn ld_nn_a<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let nn = p.address()?;
    p.comma()?;
    p.keyword("a")?;
    Ok(opcode(0x32).expr(Width::Word, nn).build())
}

fn ld_sp_hl<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.keyword("sp")?;
    p.comma()?;
    p.keyword("hl")?;
    Ok(opcode(0xf9).build())
}

fn ld_dd_nn<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let dd = p.pair(PAIRS_SP)?;
    p.comma()?;
    let nn = p.immediate()?;
    Ok(opcode(0x01 | dd << 4).expr(Width::Word, nn).build())
}

fn ld_r_n<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let dst = p.register()?;
    p.comma()?;
    let n = p.immediate()?;
    Ok(opcode(0x06 | dst << 3).expr(Width::Byte, n).build())
}

const PUSH: &[Alternative] = &[push];
const POP: &[Alternative] = &[pop];

fn push<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let qq = p.pair(PAIRS_AF)?;
    Ok(opcode(0xc5 | qq << 4).build())
}

fn pop<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let qq = p.pair(PAIRS_AF)?;
    Ok(opcode(0xc1 | qq << 4).build())
}

const INC: &[Alternative] = &[inc_r, inc_ss];
const DEC: &[Alternative] = &[dec_r, dec_ss];

fn inc_r<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let r = p.register()?;
    Ok(opcode(0x04 | r << 3).build())
}

fn inc_ss<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let ss = p.pair(PAIRS_SP)?;
    Ok(opcode(0x03 | ss << 4).build())
}

fn dec_r<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let r = p.register()?;
    Ok(opcode(0x05 | r << 3).build())
}

fn dec_ss<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let ss = p.pair(PAIRS_SP)?;
    Ok(opcode(0x0b | ss << 4).build())
}

const ADD: &[Alternative] = &[add_a_r, add_a_n];

fn add_a_r<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.keyword("a")?;
    p.comma()?;
    let r = p.register()?;
    Ok(opcode(0x80 | r).build())
}

fn add_a_n<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.keyword("a")?;
    p.comma()?;
    let n = p.immediate()?;
    Ok(opcode(0xc6).expr(Width::Byte, n).build())
}

/// Accumulator arithmetic taking a register or an immediate byte.
macro_rules! alu {
    ($name:ident, $register:ident, $immediate:ident, $register_base:expr, $immediate_opcode:expr) => {
        fn $register<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
            let r = p.register()?;
            Ok(opcode($register_base | r).build())
        }
        fn $immediate<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
            let n = p.immediate()?;
            Ok(opcode($immediate_opcode).expr(Width::Byte, n).build())
        }
        const $name: &[Alternative] = &[$register, $immediate];
    };
}

alu!(SUB, sub_r, sub_n, 0x90, 0xd6);
alu!(AND, and_r, and_n, 0xa0, 0xe6);
alu!(XOR, xor_r, xor_n, 0xa8, 0xee);
alu!(OR, or_r, or_n, 0xb0, 0xf6);
alu!(CP, cp_r, cp_n, 0xb8, 0xfe);

const JP: &[Alternative] = &[jp_hl, jp_nn];
const CALL: &[Alternative] = &[call_nn];

fn jp_hl<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.indirect_hl()?;
    Ok(opcode(0xe9).build())
}

fn jp_nn<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let nn = p.immediate()?;
    Ok(opcode(0xc3).expr(Width::Word, nn).build())
}

fn call_nn<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let nn = p.immediate()?;
    Ok(opcode(0xcd).expr(Width::Word, nn).build())
}

const JR: &[Alternative] = &[jr_e];
const DJNZ: &[Alternative] = &[djnz_e];

// The displacement is relative to the next instruction; a later stage resolves it.
fn jr_e<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let e = p.immediate()?;
    Ok(opcode(0x18).expr(Width::Byte, e).build())
}

fn djnz_e<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let e = p.immediate()?;
    Ok(opcode(0x10).expr(Width::Byte, e).build())
}

const RST: &[Alternative] = &[rst];
const IM: &[Alternative] = &[im];

fn rst<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let target = p.small_int(|value| value & !0x38 == 0)?;
    Ok(opcode(0xc7 | target).build())
}

fn im<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let mode = p.small_int(|value| value <= 2)?;
    let second = match mode {
        0 => 0x46,
        1 => 0x56,
        2 => 0x5e,
        _ => return Err(Miss::NoMatch),
    };
    Ok(opcode(0xed).byte(second).build())
}

const OUT: &[Alternative] = &[out_n_a];
const IN: &[Alternative] = &[in_a_n];

fn out_n_a<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    let port = p.address()?;
    p.comma()?;
    p.keyword("a")?;
    Ok(opcode(0xd3).expr(Width::Byte, port).build())
}

fn in_a_n<'src>(p: &mut Parser<'src>) -> Attempt<Instruction<'src>> {
    p.keyword("a")?;
    p.comma()?;
    let port = p.address()?;
    Ok(opcode(0xdb).expr(Width::Byte, port).build())
}
