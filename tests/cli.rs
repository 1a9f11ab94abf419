//! End-to-end CLI tests driving the compiled `eplusplus` binary, per
//! SPEC_FULL.md §2.5. These exercise the binary-level surface (exit
//! codes, `--tokens`/`--ast` flags, file I/O errors) rather than
//! re-asserting exact interpreter semantics, which are covered more
//! precisely by the library's own unit tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn cmd() -> Command {
    Command::cargo_bin("eplusplus").unwrap()
}

fn script(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".epp").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn running_a_valid_script_exits_zero_and_prints_its_value() {
    let file = script("VAR x = 2 + 3\nx");
    cmd()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));
}

#[test]
fn a_script_with_a_runtime_error_still_exits_zero() {
    // Only an unreadable file is a hard CLI failure; lex/parse/runtime
    // errors are reported on stderr and the process exits 0.
    let file = script("1 / 0");
    cmd()
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Runtime Error"));
}

#[test]
fn an_unreadable_file_exits_with_failure() {
    cmd()
        .arg("/nonexistent/path/to/a/script.epp")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn tokens_flag_prints_the_token_stream_instead_of_evaluating() {
    let file = script("VAR x = 1");
    cmd()
        .arg(file.path())
        .arg("--tokens")
        .assert()
        .success()
        .stdout(predicate::str::contains("Keyword:VAR"));
}

#[test]
fn ast_flag_prints_the_syntax_tree_instead_of_evaluating() {
    let file = script("VAR x = 1");
    cmd()
        .arg(file.path())
        .arg("--ast")
        .assert()
        .success()
        .stdout(predicate::str::contains("VarAssign"));
}

#[test]
fn multi_statement_scripts_print_one_value_per_line() {
    let file = script("1\n2\n3");
    cmd()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n2\n3\n"));
}

#[test]
fn a_script_with_only_a_syntax_error_exits_zero_with_a_diagnostic() {
    let file = script("VAR = 1");
    cmd()
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Invalid Syntax"));
}
