use crate::ast::Ast;
use crate::error::LangError;
use crate::position::Position;
use crate::rt_result::RTResult;
use crate::symbol_table::SymbolTable;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A user-defined function closure: its parameter names and body.
/// Holds no captured environment of its own. Calls build their local
/// scope from the *caller's* current table instead, the dynamic
/// scoping rule applied in [`crate::value::call_user_function`],
/// invoked from [`crate::interpreter::Interpreter`]'s `visit_call`.
#[derive(Debug)]
pub struct UserFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Ast,
    pub auto_return: bool,
}

pub type NativeFn = fn(&mut crate::interpreter::Interpreter, &[Value], &Position, &Position) -> RTResult;

/// A built-in function implemented in Rust rather than E++.
///
/// Arity is a closed `[min, max]` range rather than a single count so
/// that `POP(list)` / `POP(list, index)` can share one entry; the
/// range collapses to `min == max` for every other builtin.
pub struct NativeFunction {
    pub name: String,
    pub min_arity: usize,
    pub max_arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .finish()
    }
}

/// Every runtime value the interpreter can produce or bind.
///
/// `List` and `UserFunction`/`NativeFunction` are `Rc<RefCell<_>>`
/// handles so that `APPEND`/`POP`/`EXTEND` mutate a list in place and
/// so a function value can be passed around and called without
/// cloning its body.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<UserFunction>),
    Native(Rc<NativeFunction>),
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Native(_) => "function",
        }
    }

    /// Truthiness is only defined for numbers (nonzero is true); there
    /// is no implicit coercion from strings, lists, or functions.
    /// `IF`/`WHILE`/`NOT`/`AND`/`OR` reject anything else as a runtime
    /// error rather than guessing a meaning for it.
    pub fn as_truthy(&self) -> Option<bool> {
        match self {
            Value::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::List(items) => {
                let items = items.borrow();
                match items.as_slice() {
                    [] => String::new(),
                    [single] => single.display(),
                    rest => {
                        let rendered: Vec<String> = rest.iter().map(Value::display).collect();
                        format!("[{}]", rendered.join(", "))
                    }
                }
            }
            Value::Function(f) => match &f.name {
                Some(name) => format!("<function '{}'>", name),
                None => "<function '<anonymous>'>".to_string(),
            },
            Value::Native(f) => format!("<built-in function '{}'>", f.name),
        }
    }
}

/// Prints integral floats without a trailing `.0`, matching the
/// original interpreter's number formatting.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{:.15}", n)
    }
}

pub fn call_user_function(
    interp: &mut crate::interpreter::Interpreter,
    func: &Rc<UserFunction>,
    args: &[Value],
    caller_table: Rc<RefCell<SymbolTable>>,
    start: &Position,
    end: &Position,
) -> RTResult {
    if args.len() != func.params.len() {
        return RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "Incorrect number of arguments",
        ));
    }

    let local = Rc::new(RefCell::new(SymbolTable::with_parent(caller_table)));
    for (name, value) in func.params.iter().zip(args.iter()) {
        local.borrow_mut().set(name, value.clone());
    }

    let res = interp.execute_body(&func.body, local);
    if res.should_return() && !res.is_func_return() {
        return res;
    }

    let value = match res.func_return_value {
        Some(v) => v,
        None if func.auto_return => res.value.unwrap_or(Value::Number(0.0)),
        None => Value::Number(0.0),
    };
    RTResult::value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_decimal() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn fractional_numbers_print_with_fixed_precision() {
        assert_eq!(format_number(0.5), "0.500000000000000");
    }

    #[test]
    fn empty_list_displays_as_empty_string() {
        assert_eq!(Value::list(vec![]).display(), "");
    }

    #[test]
    fn single_element_list_displays_as_the_element() {
        let v = Value::list(vec![Value::Number(5.0)]);
        assert_eq!(v.display(), "5");
    }

    #[test]
    fn multi_element_list_displays_bracketed() {
        let v = Value::list(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(v.display(), "[1, 2]");
    }

    #[test]
    fn string_displays_unquoted() {
        assert_eq!(Value::string("hi").display(), "hi");
    }

    #[test]
    fn type_name_reports_expected_labels() {
        assert_eq!(Value::Number(0.0).type_name(), "number");
        assert_eq!(Value::string("x").type_name(), "string");
        assert_eq!(Value::list(vec![]).type_name(), "list");
    }

    #[test]
    fn truthy_is_defined_only_for_numbers() {
        assert_eq!(Value::Number(0.0).as_truthy(), Some(false));
        assert_eq!(Value::Number(1.0).as_truthy(), Some(true));
        assert_eq!(Value::string("x").as_truthy(), None);
    }

    #[test]
    fn calling_with_the_wrong_argument_count_reports_a_runtime_error() {
        use crate::host::NullHost;
        use crate::symbol_table::SymbolTable;
        use std::path::PathBuf;

        let (_, ast) = crate::parse("test", "FUNC f(a, b) -> a + b\nf(1)").unwrap();
        let table = SymbolTable::with_builtins();
        let mut interp = crate::interpreter::Interpreter::new(Box::new(NullHost::default()), PathBuf::from("."));
        let res = interp.run(&ast, table);
        match res.error {
            Some(LangError::Runtime { details, .. }) => {
                assert_eq!(details, "Incorrect number of arguments");
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }
}
