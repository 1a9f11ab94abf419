//! A tree-walking interpreter for the E++ scripting language: a small
//! dynamically-typed language with numbers, strings, lists,
//! first-class functions, and C-like control flow, embedded as both a
//! library and a CLI (REPL or file runner).

pub mod ast;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod natives;
pub mod parse_result;
pub mod parser;
pub mod position;
pub mod rt_result;
pub mod symbol_table;
pub mod token;
pub mod value;

use crate::ast::Ast;
use crate::error::LangError;
use crate::host::Host;
use crate::interpreter::Interpreter;
use crate::rt_result::RTResult;
use crate::symbol_table::SymbolTable;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

/// Lexes and parses `source`, returning the resulting token stream and
/// AST. Useful on its own for the `--tokens`/`--ast` CLI flags and for
/// tooling that only needs the syntax tree.
pub fn parse(file_name: impl Into<Rc<str>>, source: &str) -> Result<(Vec<token::Token>, Ast), LangError> {
    let (tokens, err) = lexer::Lexer::new(file_name, source).tokenize();
    if let Some(err) = err {
        return Err(err);
    }
    let ast = parser::Parser::new(tokens.clone()).parse()?;
    Ok((tokens, ast))
}

/// A reusable interpreter session: one global [`SymbolTable`] plus the
/// [`Interpreter`] that evaluates against it. The REPL keeps one of
/// these alive across lines so `VAR`/`FUNC` bindings persist.
pub struct Session {
    table: Rc<RefCell<SymbolTable>>,
    interpreter: Interpreter,
}

impl Session {
    pub fn new(host: Box<dyn Host>, base_dir: PathBuf) -> Self {
        Self {
            table: SymbolTable::with_builtins(),
            interpreter: Interpreter::new(host, base_dir),
        }
    }

    pub fn run_source(&mut self, file_name: impl Into<Rc<str>>, source: &str) -> Result<RTResult, LangError> {
        let (_, ast) = parse(file_name, source)?;
        Ok(self.interpreter.run(&ast, self.table.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    #[test]
    fn session_persists_bindings_across_calls() {
        let mut session = Session::new(Box::new(NullHost::default()), PathBuf::from("."));
        session.run_source("repl", "VAR x = 5").unwrap();
        let res = session.run_source("repl", "x + 1").unwrap();
        match res.value {
            Some(crate::value::Value::List(items)) => {
                assert_eq!(items.borrow()[0].as_number(), Some(6.0));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn parse_surfaces_lex_errors() {
        let err = parse("test", "1 $").unwrap_err();
        assert!(matches!(err, LangError::IllegalCharacter { .. }));
    }
}
