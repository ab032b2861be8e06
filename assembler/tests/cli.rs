use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

fn write_input(name: &str, source: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("zasm-cli-{}-{}.asm", std::process::id(), name));
    fs::write(&path, source).unwrap();
    path
}

fn zasm(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zasm"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn clean_input_exits_zero() {
    let path = write_input("clean", include_str!("inputs/counter.asm"));
    let output = zasm(&[path.to_str().unwrap()]);
    assert_eq!(Some(0), output.status.code());
    assert!(output.stderr.is_empty());
}

#[test]
fn diagnostics_exit_one() {
    let path = write_input("broken", "frob\nnop\n");
    let output = zasm(&[path.to_str().unwrap()]);
    assert_eq!(Some(1), output.status.code());
    assert_eq!(
        "1:1: error: unknown instruction: frob\nfrob\n^\n",
        String::from_utf8_lossy(&output.stderr));
}

#[test]
fn missing_file_exits_two() {
    let output = zasm(&["/nonexistent/zasm/input.asm"]);
    assert_eq!(Some(2), output.status.code());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not read"));
}

#[test]
fn dump_ir() {
    let path = write_input("dump", "here: jp here\n");
    let output = zasm(&["--dump-ir", path.to_str().unwrap()]);
    assert_eq!(Some(0), output.status.code());
    assert_eq!(
        "LABEL name=here line=1 addr=?\nINSTRUCTION (BYTE c3), (WORD here)\n",
        String::from_utf8_lossy(&output.stdout));
}

#[test]
fn lenient_redefinition() {
    let path = write_input("lenient", "a: nop\na: nop\n");
    assert_eq!(Some(1), zasm(&[path.to_str().unwrap()]).status.code());
    assert_eq!(Some(0), zasm(&["--lenient", path.to_str().unwrap()]).status.code());
}
