//! Property tests over generated inputs, run against the library crate
//! directly (not the compiled binary; see `tests/cli.rs` for the
//! end-to-end scenarios).

use eplusplus::host::NullHost;
use eplusplus::lexer::Lexer;
use eplusplus::parser::Parser;
use eplusplus::symbol_table::SymbolTable;
use eplusplus::value::Value;
use proptest::prelude::*;
use std::path::PathBuf;

fn run(src: &str) -> Result<Value, eplusplus::error::LangError> {
    let (tokens, err) = Lexer::new("prop", src).tokenize();
    if let Some(e) = err {
        return Err(e);
    }
    let ast = Parser::new(tokens).parse()?;
    let table = SymbolTable::with_builtins();
    let mut interp = eplusplus::interpreter::Interpreter::new(Box::new(NullHost::default()), PathBuf::from("."));
    let res = interp.run(&ast, table);
    match res.error {
        Some(e) => Err(e),
        None => Ok(res.value.unwrap()),
    }
}

proptest! {
    // Every token's span satisfies start.idx <= end.idx <= len(text)+1,
    // and the EOF token's span lies at text end.
    #[test]
    fn token_spans_are_well_formed(src in "[a-zA-Z0-9_ \t]{0,64}") {
        let (tokens, _err) = Lexer::new("prop", src.as_str()).tokenize();
        for tok in &tokens {
            prop_assert!(tok.start.idx() <= tok.end.idx());
            prop_assert!((tok.end.idx() as usize) <= src.len() + 1);
        }
        if let Some(last) = tokens.last() {
            if last.kind == eplusplus::token::TokenKind::Eof {
                prop_assert_eq!(last.start.idx() as usize, src.len());
            }
        }
    }

    // FUNC f(x)->x applied to any representable number returns exactly
    // that number.
    #[test]
    fn identity_function_returns_its_argument(n in -1.0e12f64..1.0e12f64) {
        let src = format!("FUNC f(x) -> x\nf({:?})", n);
        let value = run(&src).expect("program should evaluate without error");
        let Value::List(stmts) = value else { panic!("expected statements list") };
        let result = stmts.borrow().last().unwrap().as_number().unwrap();
        prop_assert_eq!(result, n);
    }

    // APPEND(L, x); LENGTH(L) is the previous length plus one.
    #[test]
    fn append_increases_length_by_one(len in 0usize..8) {
        let elements: Vec<String> = (0..len).map(|i| i.to_string()).collect();
        let src = format!(
            "VAR L = [{}]\nVAR before = LENGTH(L)\nAPPEND(L, 0)\nLENGTH(L) - before",
            elements.join(", ")
        );
        let value = run(&src).expect("program should evaluate without error");
        let Value::List(stmts) = value else { panic!("expected statements list") };
        let delta = stmts.borrow().last().unwrap().as_number().unwrap();
        prop_assert_eq!(delta, 1.0);
    }

    // Dividing any number by zero yields a Runtime error whose message
    // contains "Division by zero".
    #[test]
    fn division_by_zero_always_reports_runtime_error(n in -1.0e9f64..1.0e9f64) {
        let src = format!("{:?} / 0", n);
        let err = run(&src).expect_err("division by zero must fail");
        prop_assert!(err.to_string().contains("Division by zero"));
    }
}
