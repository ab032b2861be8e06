extern crate zasm;

use zasm::error::LexError;
use zasm::expr::ExprErrorKind;
use zasm::{parse, DiagnosticKind, LeniencyLevel, ParseOptions, Parsed};

use pretty_assertions::assert_eq;

#[test]
fn counter() {
    test(
        include_str!("inputs/counter.asm"),
        &[
            "INSTRUCTION (BYTE 06), (BYTE 10)",
            "LABEL name=loop line=3 addr=?",
            "INSTRUCTION (BYTE 05)",
            "INSTRUCTION (BYTE 78)",
            "INSTRUCTION (BYTE fe), (BYTE 0)",
            "INSTRUCTION (BYTE c3), (WORD nz_check)",
            "LABEL name=nz_check line=8 addr=?",
            "INSTRUCTION (BYTE 10), (BYTE loop 2 -)",
            "INSTRUCTION (BYTE 76)",
        ]
    );
}

#[test]
fn memory() {
    test(
        include_str!("inputs/memory.asm"),
        &[
            "LABEL name=start line=2 addr=?",
            "INSTRUCTION (BYTE 21), (WORD buffer)",
            "INSTRUCTION (BYTE 3a), (WORD buffer 1 +)",
            "INSTRUCTION (BYTE 77)",
            "INSTRUCTION (BYTE 32), (WORD 8000)",
            "INSTRUCTION (BYTE f5)",
            "INSTRUCTION (BYTE c1)",
            "INSTRUCTION (BYTE d3), (BYTE FE)",
            "INSTRUCTION (BYTE db), (BYTE FE)",
            "INSTRUCTION (BYTE c9)",
            "LABEL name=buffer line=13 addr=?",
        ]
    );
}

#[test]
fn labels_index_their_nodes() {
    let parsed = parse(include_str!("inputs/memory.asm"), ParseOptions::default());
    let mut names = parsed.labels.keys().cloned().collect::<Vec<_>>();
    names.sort();
    assert_eq!(vec!["buffer", "start"], names);
    assert_eq!(Some(13), parsed.label("buffer").map(|label| label.line));
    assert!(parsed.label("nowhere").is_none());
}

#[test]
fn one_diagnostic_per_broken_line() {
    let parsed = parse(include_str!("inputs/broken.asm"), ParseOptions::default());
    let positions = parsed.diagnostics.iter()
        .map(|diagnostic| (diagnostic.kind.clone(), diagnostic.line, diagnostic.column))
        .collect::<Vec<_>>();
    assert_eq!(
        vec![
            (DiagnosticKind::UnknownInstruction { mnemonic: "frob".to_string() }, 2, 9),
            (DiagnosticKind::Expression(ExprErrorKind::UnbalancedLeftParen), 3, 21),
            (DiagnosticKind::WrongOperands { mnemonic: "ld".to_string() }, 4, 12),
            (DiagnosticKind::ExcessiveCharacters { found: "nz".to_string() }, 5, 13),
            (DiagnosticKind::DuplicateLabel { name: "start".to_string(), first_line: 1 }, 6, 1),
            (DiagnosticKind::ExpectedInstructionName, 7, 9),
            (DiagnosticKind::InvalidToken(LexError::UnexpectedCharacter), 8, 15),
        ],
        positions);
    assert_eq!(
        vec![
            "LABEL name=start line=1 addr=?",
            "INSTRUCTION (BYTE 00)",
            "INSTRUCTION (BYTE c6), (BYTE 101 x *)",
        ],
        rendered(&parsed));
}

#[test]
fn lenient_parsing_accepts_redefinitions() {
    let options = ParseOptions { leniency: LeniencyLevel::Lenient };
    let parsed = parse(include_str!("inputs/broken.asm"), options);
    assert_eq!(6, parsed.diagnostics.len());
    assert_eq!(Some(6), parsed.label("start").map(|label| label.line));
}

#[test]
fn plain_diagnostic_rendering() {
    let parsed = parse(include_str!("inputs/broken.asm"), ParseOptions::default());
    assert_eq!(
        "2:9: error: unknown instruction: frob\n        frob a, b\n        ^",
        parsed.diagnostics[0].to_string());
    assert_eq!(
        "3:21: error: invalid expression: unbalanced left paren\n        ld a, (1 + 2\n                    ^",
        parsed.diagnostics[1].to_string());
}

#[test]
fn snippet_diagnostic_rendering() {
    let parsed = parse("  ld a, (1+2))\n", ParseOptions::default());
    assert_eq!(1, parsed.diagnostics.len());
    let rendered = parsed.diagnostics[0].render_snippet(Some("unbalanced.asm"), false);
    assert!(rendered.contains("error: invalid expression: unbalanced right paren"));
    assert!(rendered.contains("unbalanced.asm"));
    assert!(rendered.contains("  ld a, (1+2))"));
}

#[test]
fn single_instructions() {
    single_instruction_tests(&[
        ("nop",            "INSTRUCTION (BYTE 00)"),
        ("LD A, 'z'",      "INSTRUCTION (BYTE 3e), (BYTE z)"),
        ("ld e, -(1 + 2)", "INSTRUCTION (BYTE 1e), (BYTE 1 2 + u-)"),
        ("ld de, %1010",   "INSTRUCTION (BYTE 11), (WORD 1010)"),
        ("add a, 10b",     "INSTRUCTION (BYTE c6), (BYTE 10)"),
        ("and 0x0f",       "INSTRUCTION (BYTE e6), (BYTE 0f)"),
        ("xor 17q",        "INSTRUCTION (BYTE ee), (BYTE 17)"),
        ("or a",           "INSTRUCTION (BYTE b7)"),
        ("sub 1 << 3",     "INSTRUCTION (BYTE d6), (BYTE 1 3 <<)"),
        ("jr end - $10",   "INSTRUCTION (BYTE 18), (BYTE end 10 -)"),
        ("call #1234",     "INSTRUCTION (BYTE cd), (WORD 1234)"),
        ("jp x || y && z", "INSTRUCTION (BYTE c3), (WORD x y z && ||)"),
        ("rst 0x18",       "INSTRUCTION (BYTE df)"),
        ("im 1",           "INSTRUCTION (BYTE ed), (BYTE 56)"),
    ]);
}

fn rendered(parsed: &Parsed) -> Vec<String> {
    parsed.nodes.iter().map(ToString::to_string).collect()
}

fn test(input: &str, expected: &[&str]) {
    let parsed = parse(input, ParseOptions::default());
    assert_eq!(Vec::<zasm::Diagnostic>::new(), parsed.diagnostics);
    assert_eq!(expected.to_vec(), rendered(&parsed));
}

fn single_instruction_tests(tests: &[(&str, &str)]) {
    for (input, expected) in tests {
        test(input, &[*expected]);
    }
}
