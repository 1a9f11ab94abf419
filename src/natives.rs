use crate::error::LangError;
use crate::interpreter::Interpreter;
use crate::position::Position;
use crate::rt_result::RTResult;
use crate::symbol_table::SymbolTable;
use crate::value::{NativeFunction, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Registers every native builtin into a freshly created root scope.
/// Called once per top-level run and once per `# IMPORT`ed module, so
/// each script (and each module) sees the full builtin set regardless
/// of import order.
pub fn install(table: &Rc<RefCell<SymbolTable>>) {
    const BUILTINS: &[(&str, usize, usize, crate::value::NativeFn)] = &[
        ("PRINT", 1, 1, print),
        ("PRINTLN", 1, 1, println_),
        ("LENGTH", 1, 1, length),
        ("INPUT_STR", 0, 0, input_str),
        ("INPUT_NUM", 0, 0, input_num),
        ("CLEAR", 0, 0, clear),
        ("IS_NUM", 1, 1, is_num),
        ("IS_STR", 1, 1, is_str),
        ("IS_LIST", 1, 1, is_list),
        ("IS_FUNC", 1, 1, is_func),
        ("APPEND", 2, 2, append),
        ("POP", 1, 2, pop),
        ("EXTEND", 2, 2, extend),
        ("SYSTEM", 1, 1, system),
        ("RANDOM", 2, 2, random),
        ("RANDOMIZE", 0, 1, randomize),
    ];

    let mut t = table.borrow_mut();
    for (name, min_arity, max_arity, func) in BUILTINS {
        t.set(
            name,
            Value::Native(Rc::new(NativeFunction {
                name: name.to_string(),
                min_arity: *min_arity,
                max_arity: *max_arity,
                func: *func,
            })),
        );
    }
}

fn print(interp: &mut Interpreter, args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    interp.host.print(&args[0].display());
    RTResult::value(args[0].clone())
}

fn println_(interp: &mut Interpreter, args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    interp.host.print(&args[0].display());
    interp.host.print("\n");
    RTResult::value(args[0].clone())
}

fn length(_interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    match &args[0] {
        Value::List(items) => RTResult::value(Value::Number(items.borrow().len() as f64)),
        Value::String(s) => RTResult::value(Value::Number(s.chars().count() as f64)),
        other => RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            format!("LENGTH expects a list or string, got a {}", other.type_name()),
        )),
    }
}

fn input_str(interp: &mut Interpreter, _args: &[Value], start: &Position, end: &Position) -> RTResult {
    match interp.host.read_line() {
        Ok(line) => RTResult::value(Value::string(line)),
        Err(e) => RTResult::error(LangError::runtime(start.clone(), end.clone(), e.to_string())),
    }
}

fn input_num(interp: &mut Interpreter, _args: &[Value], start: &Position, end: &Position) -> RTResult {
    match interp.host.read_line() {
        Ok(line) => match line.trim().parse::<f64>() {
            Ok(n) => RTResult::value(Value::Number(n)),
            Err(_) => RTResult::error(LangError::runtime(
                start.clone(),
                end.clone(),
                format!("'{}' is not a valid number", line.trim()),
            )),
        },
        Err(e) => RTResult::error(LangError::runtime(start.clone(), end.clone(), e.to_string())),
    }
}

fn clear(interp: &mut Interpreter, _args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    interp.host.clear_screen();
    RTResult::value(Value::Number(0.0))
}

fn is_num(_interp: &mut Interpreter, args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    RTResult::value(Value::Number(matches!(args[0], Value::Number(_)) as i64 as f64))
}

fn is_str(_interp: &mut Interpreter, args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    RTResult::value(Value::Number(matches!(args[0], Value::String(_)) as i64 as f64))
}

fn is_list(_interp: &mut Interpreter, args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    RTResult::value(Value::Number(matches!(args[0], Value::List(_)) as i64 as f64))
}

fn is_func(_interp: &mut Interpreter, args: &[Value], _s: &Position, _e: &Position) -> RTResult {
    RTResult::value(Value::Number(
        matches!(args[0], Value::Function(_) | Value::Native(_)) as i64 as f64,
    ))
}

fn append(_interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    match &args[0] {
        Value::List(items) => {
            items.borrow_mut().push(args[1].clone());
            RTResult::value(Value::Number(0.0))
        }
        other => RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            format!("APPEND expects a list, got a {}", other.type_name()),
        )),
    }
}

fn pop(_interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    let Value::List(items) = &args[0] else {
        return RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            format!("POP expects a list, got a {}", args[0].type_name()),
        ));
    };

    let mut items = items.borrow_mut();
    let len = items.len() as i64;
    // A lone argument pops the tail; an explicit index pops there instead.
    let idx = match args.get(1) {
        Some(v) => match v.as_number() {
            Some(n) => n as i64,
            None => {
                return RTResult::error(LangError::runtime(
                    start.clone(),
                    end.clone(),
                    "POP expects a numeric index",
                ))
            }
        },
        None => len - 1,
    };
    let real_idx = if idx < 0 { len + idx } else { idx };
    if real_idx < 0 || real_idx >= len {
        return RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "List index out of range",
        ));
    }
    RTResult::value(items.remove(real_idx as usize))
}

fn extend(_interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    let (Value::List(dst), Value::List(src)) = (&args[0], &args[1]) else {
        return RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "EXTEND expects two lists",
        ));
    };
    let extra: Vec<Value> = src.borrow().clone();
    dst.borrow_mut().extend(extra);
    RTResult::value(Value::Number(0.0))
}

fn system(interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    let Value::String(command) = &args[0] else {
        return RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "SYSTEM expects a string command",
        ));
    };
    let code = interp.host.run_system_command(command);
    RTResult::value(Value::Number(code as f64))
}

fn random(interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    let (Some(lo), Some(hi)) = (args[0].as_number(), args[1].as_number()) else {
        return RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "RANDOM expects two numeric bounds",
        ));
    };
    let unit = interp.next_random();
    RTResult::value(Value::Number(lo + unit * (hi - lo)))
}

fn randomize(interp: &mut Interpreter, args: &[Value], start: &Position, end: &Position) -> RTResult {
    let seed = match args.first() {
        Some(v) => match v.as_number() {
            Some(n) => n as u64,
            None => {
                return RTResult::error(LangError::runtime(
                    start.clone(),
                    end.clone(),
                    "RANDOMIZE expects a numeric seed",
                ))
            }
        },
        None => {
            use rand::Rng;
            rand::thread_rng().gen::<u64>()
        }
    };
    interp.seed_random(seed);
    RTResult::value(Value::Number(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use std::path::PathBuf;

    fn run(src: &str) -> Result<Value, LangError> {
        let (tokens, err) = crate::lexer::Lexer::new("test", src).tokenize();
        assert!(err.is_none());
        let ast = crate::parser::Parser::new(tokens).parse().unwrap();
        let table = SymbolTable::with_builtins();
        let mut interp = Interpreter::new(Box::new(NullHost::default()), PathBuf::from("."));
        let res = interp.run(&ast, table);
        match res.error {
            Some(e) => Err(e),
            None => Ok(res.value.unwrap()),
        }
    }

    /// Every program is a `statements` list at the top level, even a
    /// single expression, so tests pull the last statement's value out.
    fn last(src: &str) -> Value {
        match run(src).unwrap() {
            Value::List(items) => items.borrow().last().unwrap().clone(),
            other => other,
        }
    }

    #[test]
    fn length_of_list() {
        match last("LENGTH([1, 2, 3])") {
            Value::Number(n) => assert_eq!(n, 3.0),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn append_mutates_in_place() {
        match last("VAR l = [1]\nAPPEND(l, 2)\nl") {
            Value::List(items) => assert_eq!(items.borrow().len(), 2),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn is_num_predicate() {
        match last("IS_NUM(5)") {
            Value::Number(n) => assert_eq!(n, 1.0),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn randomize_is_deterministic() {
        let a = last("RANDOMIZE(42)\nRANDOM(0, 1)");
        let b = last("RANDOMIZE(42)\nRANDOM(0, 1)");
        assert_eq!(a.as_number(), b.as_number());
    }

    #[test]
    fn pop_removes_and_returns_element() {
        match last("VAR l = [1, 2, 3]\nPOP(l, 1)") {
            Value::Number(n) => assert_eq!(n, 2.0),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn pop_with_no_index_removes_the_tail() {
        match last("VAR l = [1, 2, 3]\nPOP(l)") {
            Value::Number(n) => assert_eq!(n, 3.0),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn randomize_with_no_seed_still_succeeds() {
        assert!(run("RANDOMIZE()\nRANDOM(0, 10)").is_ok());
    }

    #[test]
    fn is_num_with_zero_args_is_runtime_error() {
        let err = run("IS_NUM()").unwrap_err();
        assert!(matches!(err, LangError::Runtime { .. }));
    }

    #[test]
    fn and_or_do_not_short_circuit_but_compute_logical_result() {
        assert_eq!(last("1 AND 0").as_number(), Some(0.0));
        assert_eq!(last("0 OR 1").as_number(), Some(1.0));
    }
}
