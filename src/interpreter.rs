use crate::ast::{Ast, NodeKind};
use crate::error::LangError;
use crate::host::Host;
use crate::position::Position;
use crate::rt_result::RTResult;
use crate::symbol_table::SymbolTable;
use crate::token::TokenKind;
use crate::value::{call_user_function, UserFunction, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Walks an [`Ast`] and produces an [`RTResult`].
///
/// Holds the module registry populated by `# IMPORT ... AS ...`
/// statements and the [`Host`] the native SYSTEM/CLEAR/INPUT_STR/
/// INPUT_NUM builtins delegate to. One `Interpreter` corresponds to
/// one run of one top-level script; nested function calls reuse it,
/// threading a fresh child [`SymbolTable`] per call.
pub struct Interpreter {
    pub host: Box<dyn Host>,
    modules: HashMap<String, Rc<RefCell<SymbolTable>>>,
    base_dir: PathBuf,
    rng: Option<rand::rngs::StdRng>,
}

impl Interpreter {
    pub fn new(host: Box<dyn Host>, base_dir: PathBuf) -> Self {
        Self {
            host,
            modules: HashMap::new(),
            base_dir,
            rng: None,
        }
    }

    /// `RANDOM` draws from this seeded generator once `RANDOMIZE` has
    /// been called in the running script, falling back to the thread
    /// RNG so a script that never calls `RANDOMIZE` still gets entropy.
    pub fn next_random(&mut self) -> f64 {
        use rand::Rng;
        match &mut self.rng {
            Some(rng) => rng.gen::<f64>(),
            None => rand::thread_rng().gen::<f64>(),
        }
    }

    pub fn seed_random(&mut self, seed: u64) {
        use rand::SeedableRng;
        self.rng = Some(rand::rngs::StdRng::seed_from_u64(seed));
    }

    pub fn run(&mut self, ast: &Ast, table: Rc<RefCell<SymbolTable>>) -> RTResult {
        let span = tracing::trace_span!("run", kind = ?ast.kind);
        let _enter = span.enter();
        let res = self.visit(ast, table);
        if let Some(err) = &res.error {
            tracing::debug!(error = %err, "run failed");
        }
        res
    }

    /// Runs a function body, then unwraps a `CONTINUE`/`BREAK` signal
    /// leaking out of a function (a language error) into a runtime error.
    pub fn execute_body(&mut self, body: &Ast, table: Rc<RefCell<SymbolTable>>) -> RTResult {
        let res = self.visit(body, table);
        if res.loop_should_continue || res.loop_should_break {
            return RTResult::error(LangError::runtime(
                body.start.clone(),
                body.end.clone(),
                "Cannot use 'break' or 'continue' outside of a loop",
            ));
        }
        res
    }

    fn visit(&mut self, node: &Ast, table: Rc<RefCell<SymbolTable>>) -> RTResult {
        match &node.kind {
            NodeKind::Number(tok) => RTResult::value(Value::Number(tok.number().unwrap_or(0.0))),
            NodeKind::String(tok) => {
                RTResult::value(Value::string(tok.text().unwrap_or_default().to_string()))
            }
            NodeKind::List(items) => self.visit_list(items, table, node),
            NodeKind::VarAccess { name, module } => self.visit_var_access(name, module.as_deref(), table, node),
            NodeKind::VarAssign { name, value } => self.visit_var_assign(name, value, table, node),
            NodeKind::BinOp { left, op, right } => self.visit_bin_op(left, op, right, table, node),
            NodeKind::UnaryOp { op, operand } => self.visit_unary_op(op, operand, table, node),
            NodeKind::If { cases, else_case } => self.visit_if(cases, else_case, table),
            NodeKind::For { .. } => self.visit_for(node, table),
            NodeKind::While {
                condition,
                body,
                returns_null,
            } => self.visit_while(condition, body, *returns_null, table),
            NodeKind::FuncDef {
                name,
                params,
                body,
                auto_return,
            } => self.visit_func_def(name, params, body, *auto_return, table),
            NodeKind::Call { callee, args } => self.visit_call(callee, args, table, node),
            NodeKind::Return(expr) => self.visit_return(expr.as_deref(), table),
            NodeKind::Continue => RTResult::do_continue(),
            NodeKind::Break => RTResult::do_break(),
            NodeKind::Import { path, alias } => self.visit_import(path, alias, table, node),
        }
    }

    fn visit_list(&mut self, items: &[Ast], table: Rc<RefCell<SymbolTable>>, node: &Ast) -> RTResult {
        let mut res = RTResult::new();
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let v = self.visit(item, table.clone());
            match res.register(v) {
                Some(value) => values.push(value),
                None => return res,
            }
        }
        let _ = node;
        RTResult::value(Value::list(values))
    }

    fn visit_var_access(
        &mut self,
        name: &str,
        module: Option<&str>,
        table: Rc<RefCell<SymbolTable>>,
        node: &Ast,
    ) -> RTResult {
        let value = match module {
            Some(alias) => match self.modules.get(alias) {
                Some(module_table) => module_table.borrow().get(name),
                None => {
                    return RTResult::error(LangError::runtime(
                        node.start.clone(),
                        node.end.clone(),
                        format!("Module '{}' not found", alias),
                    ));
                }
            },
            None => table.borrow().get(name),
        };

        match value {
            Some(v) => RTResult::value(v),
            None => RTResult::error(LangError::runtime(
                node.start.clone(),
                node.end.clone(),
                format!("'{}' is not defined", name),
            )),
        }
    }

    fn visit_var_assign(
        &mut self,
        name: &str,
        value: &Ast,
        table: Rc<RefCell<SymbolTable>>,
        _node: &Ast,
    ) -> RTResult {
        let mut res = RTResult::new();
        let evaluated = match res.register(self.visit(value, table.clone())) {
            Some(v) => v,
            None => return res,
        };
        table.borrow_mut().set(name, evaluated.clone());
        RTResult::value(evaluated)
    }

    fn visit_bin_op(
        &mut self,
        left: &Ast,
        op: &crate::token::Token,
        right: &Ast,
        table: Rc<RefCell<SymbolTable>>,
        node: &Ast,
    ) -> RTResult {
        // Both operands are evaluated unconditionally, even for AND/OR.
        // The language does not short-circuit.
        let mut res = RTResult::new();
        let lhs = match res.register(self.visit(left, table.clone())) {
            Some(v) => v,
            None => return res,
        };
        let rhs = match res.register(self.visit(right, table)) {
            Some(v) => v,
            None => return res,
        };

        apply_bin_op(op, &lhs, &rhs, &node.start, &node.end)
    }

    fn visit_unary_op(
        &mut self,
        op: &crate::token::Token,
        operand: &Ast,
        table: Rc<RefCell<SymbolTable>>,
        node: &Ast,
    ) -> RTResult {
        let mut res = RTResult::new();
        let value = match res.register(self.visit(operand, table)) {
            Some(v) => v,
            None => return res,
        };

        if op.matches_keyword("NOT") {
            return match value.as_truthy() {
                Some(b) => RTResult::value(Value::Number(!b as i64 as f64)),
                None => RTResult::error(LangError::runtime(
                    node.start.clone(),
                    node.end.clone(),
                    format!("NOT expects a number, got a {}", value.type_name()),
                )),
            };
        }
        match op.kind {
            TokenKind::Minus => match value.as_number() {
                Some(n) => RTResult::value(Value::Number(-n)),
                None => RTResult::error(LangError::runtime(
                    node.start.clone(),
                    node.end.clone(),
                    format!("Cannot negate a {}", value.type_name()),
                )),
            },
            TokenKind::Plus => match value.as_number() {
                Some(n) => RTResult::value(Value::Number(n)),
                None => RTResult::error(LangError::runtime(
                    node.start.clone(),
                    node.end.clone(),
                    format!("Cannot apply unary '+' to a {}", value.type_name()),
                )),
            },
            _ => RTResult::error(LangError::runtime(
                node.start.clone(),
                node.end.clone(),
                "Unsupported unary operator",
            )),
        }
    }

    fn visit_if(
        &mut self,
        cases: &[crate::ast::IfCase],
        else_case: &Option<(Box<Ast>, bool)>,
        table: Rc<RefCell<SymbolTable>>,
    ) -> RTResult {
        let mut res = RTResult::new();
        for case in cases {
            let cond = match res.register(self.visit(&case.condition, table.clone())) {
                Some(v) => v,
                None => return res,
            };
            let truthy = match cond.as_truthy() {
                Some(b) => b,
                None => {
                    return RTResult::error(LangError::runtime(
                        case.condition.start.clone(),
                        case.condition.end.clone(),
                        format!("IF condition must be a number, got a {}", cond.type_name()),
                    ));
                }
            };
            if truthy {
                let body_res = self.visit(&case.body, table);
                return if case.returns_null {
                    let mut wrapped = RTResult::new();
                    match wrapped.register(body_res) {
                        Some(_) => RTResult::value(Value::Number(0.0)),
                        None => wrapped,
                    }
                } else {
                    body_res
                };
            }
        }

        if let Some((body, returns_null)) = else_case {
            let body_res = self.visit(body, table);
            return if *returns_null {
                let mut wrapped = RTResult::new();
                match wrapped.register(body_res) {
                    Some(_) => RTResult::value(Value::Number(0.0)),
                    None => wrapped,
                }
            } else {
                body_res
            };
        }

        RTResult::value(Value::Number(0.0))
    }

    fn visit_for(&mut self, node: &Ast, table: Rc<RefCell<SymbolTable>>) -> RTResult {
        let NodeKind::For {
            var_name,
            start_value,
            end_value,
            step_value,
            body,
            returns_null,
        } = &node.kind
        else {
            unreachable!()
        };

        let mut res = RTResult::new();
        let start = match res.register(self.visit(start_value, table.clone())) {
            Some(v) => v,
            None => return res,
        };
        let end = match res.register(self.visit(end_value, table.clone())) {
            Some(v) => v,
            None => return res,
        };
        let step = match step_value {
            Some(expr) => match res.register(self.visit(expr, table.clone())) {
                Some(v) => v,
                None => return res,
            },
            None => Value::Number(1.0),
        };

        let (Some(mut i), Some(end_n), Some(step_n)) = (start.as_number(), end.as_number(), step.as_number())
        else {
            return RTResult::error(LangError::runtime(
                node.start.clone(),
                node.end.clone(),
                "FOR bounds and step must be numbers",
            ));
        };
        if step_n == 0.0 {
            return RTResult::error(LangError::runtime(
                node.start.clone(),
                node.end.clone(),
                "FOR step cannot be zero",
            ));
        }

        let mut elements = Vec::new();
        while (step_n > 0.0 && i < end_n) || (step_n < 0.0 && i > end_n) {
            table.borrow_mut().set(var_name, Value::Number(i));
            let body_res = self.visit(body, table.clone());
            if body_res.loop_should_break {
                break;
            }
            if !body_res.loop_should_continue {
                match res.register(body_res) {
                    Some(v) => elements.push(v),
                    None => return res,
                }
            }
            i += step_n;
        }

        if *returns_null {
            RTResult::value(Value::Number(0.0))
        } else {
            RTResult::value(Value::list(elements))
        }
    }

    fn visit_while(
        &mut self,
        condition: &Ast,
        body: &Ast,
        returns_null: bool,
        table: Rc<RefCell<SymbolTable>>,
    ) -> RTResult {
        let mut res = RTResult::new();
        let mut elements = Vec::new();

        loop {
            let cond = match res.register(self.visit(condition, table.clone())) {
                Some(v) => v,
                None => return res,
            };
            let truthy = match cond.as_truthy() {
                Some(b) => b,
                None => {
                    return RTResult::error(LangError::runtime(
                        condition.start.clone(),
                        condition.end.clone(),
                        format!("WHILE condition must be a number, got a {}", cond.type_name()),
                    ));
                }
            };
            if !truthy {
                break;
            }

            let body_res = self.visit(body, table.clone());
            if body_res.loop_should_break {
                break;
            }
            if !body_res.loop_should_continue {
                match res.register(body_res) {
                    Some(v) => elements.push(v),
                    None => return res,
                }
            }
        }

        if returns_null {
            RTResult::value(Value::Number(0.0))
        } else {
            RTResult::value(Value::list(elements))
        }
    }

    fn visit_func_def(
        &mut self,
        name: &Option<String>,
        params: &[String],
        body: &Ast,
        auto_return: bool,
        table: Rc<RefCell<SymbolTable>>,
    ) -> RTResult {
        let func = Rc::new(UserFunction {
            name: name.clone(),
            params: params.to_vec(),
            body: body.clone(),
            auto_return,
        });
        if let Some(n) = name {
            table.borrow_mut().set(n, Value::Function(func));
        }
        // Defining a function yields null. The definition is a binding
        // side effect, not an expression value.
        RTResult::value(Value::Number(0.0))
    }

    fn visit_call(&mut self, callee: &Ast, args: &[Ast], table: Rc<RefCell<SymbolTable>>, node: &Ast) -> RTResult {
        let mut res = RTResult::new();
        let callee_value = match res.register(self.visit(callee, table.clone())) {
            Some(v) => v,
            None => return res,
        };

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            match res.register(self.visit(arg, table.clone())) {
                Some(v) => arg_values.push(v),
                None => return res,
            }
        }

        match callee_value {
            Value::Function(func) => {
                tracing::trace!(
                    name = func.name.as_deref().unwrap_or("<anonymous>"),
                    args = arg_values.len(),
                    pos = ?node.start,
                    "calling user function"
                );
                call_user_function(self, &func, &arg_values, table, &node.start, &node.end)
            }
            Value::Native(native) => {
                let n = arg_values.len();
                if n < native.min_arity || n > native.max_arity {
                    let expected = if native.min_arity == native.max_arity {
                        format!("{}", native.min_arity)
                    } else {
                        format!("{}-{}", native.min_arity, native.max_arity)
                    };
                    return RTResult::error(LangError::runtime(
                        node.start.clone(),
                        node.end.clone(),
                        format!(
                            "{} takes {} argument(s) but {} were given",
                            native.name, expected, n
                        ),
                    ));
                }
                (native.func)(self, &arg_values, &node.start, &node.end)
            }
            other => RTResult::error(LangError::runtime(
                node.start.clone(),
                node.end.clone(),
                format!("{} is not callable", other.type_name()),
            )),
        }
    }

    fn visit_return(&mut self, expr: Option<&Ast>, table: Rc<RefCell<SymbolTable>>) -> RTResult {
        match expr {
            None => RTResult::func_return(Value::Number(0.0)),
            Some(expr) => {
                let mut res = RTResult::new();
                match res.register(self.visit(expr, table)) {
                    Some(v) => RTResult::func_return(v),
                    None => res,
                }
            }
        }
    }

    fn visit_import(
        &mut self,
        path: &crate::token::Token,
        alias: &str,
        table: Rc<RefCell<SymbolTable>>,
        node: &Ast,
    ) -> RTResult {
        let path_text = path.text().unwrap_or_default();
        let full_path = self.base_dir.join(path_text);
        let source = match std::fs::read_to_string(&full_path) {
            Ok(s) => s,
            Err(e) => {
                return RTResult::error(LangError::runtime(
                    node.start.clone(),
                    node.end.clone(),
                    format!("Cannot import '{}': {}", path_text, e),
                ));
            }
        };

        let file_name: Rc<str> = Rc::from(path_text);
        let (tokens, lex_err) = crate::lexer::Lexer::new(file_name.clone(), source.as_str()).tokenize();
        if let Some(err) = lex_err {
            return RTResult::error(err);
        }
        let ast = match crate::parser::Parser::new(tokens).parse() {
            Ok(ast) => ast,
            Err(err) => return RTResult::error(err),
        };

        // Parent to the *importer's* current table, not a fresh root, so
        // the module can see caller globals. Builtins are still reachable
        // by walking that chain up to wherever `with_builtins` seeded it.
        let module_table = Rc::new(RefCell::new(SymbolTable::with_parent(table)));
        let run_res = self.visit(&ast, module_table.clone());
        if run_res.error.is_some() {
            return run_res;
        }

        self.modules.insert(alias.to_string(), module_table);
        RTResult::value(Value::Number(0.0))
    }
}

fn apply_bin_op(op: &crate::token::Token, lhs: &Value, rhs: &Value, start: &Position, end: &Position) -> RTResult {
    use Value::*;

    if op.matches_keyword("AND") || op.matches_keyword("OR") {
        let (a, b) = match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return RTResult::error(LangError::runtime(
                    start.clone(),
                    end.clone(),
                    "Unsupported operand types for binary operation",
                ))
            }
        };
        let result = if op.matches_keyword("AND") {
            (a != 0.0) && (b != 0.0)
        } else {
            (a != 0.0) || (b != 0.0)
        };
        return RTResult::value(Number(result as i64 as f64));
    }

    match (op.kind, lhs, rhs) {
        (TokenKind::Plus, Number(a), Number(b)) => RTResult::value(Number(a + b)),
        (TokenKind::Plus, String(a), String(b)) => {
            RTResult::value(Value::string(format!("{}{}", a, b)))
        }
        (TokenKind::Plus, List(items), other) => {
            let mut cloned = items.borrow().clone();
            cloned.push(other.clone());
            RTResult::value(Value::list(cloned))
        }
        (TokenKind::Minus, Number(a), Number(b)) => RTResult::value(Number(a - b)),
        (TokenKind::Mul, Number(a), Number(b)) => RTResult::value(Number(a * b)),
        (TokenKind::Mul, String(s), Number(n)) => {
            RTResult::value(Value::string(s.repeat((*n).max(0.0) as usize)))
        }
        (TokenKind::Mul, Number(n), String(s)) => {
            RTResult::value(Value::string(s.repeat((*n).max(0.0) as usize)))
        }
        (TokenKind::Mul, List(a), List(b)) => {
            let mut cloned = a.borrow().clone();
            cloned.extend(b.borrow().iter().cloned());
            RTResult::value(Value::list(cloned))
        }
        (TokenKind::Div, Number(_), Number(b)) if *b == 0.0 => RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "Division by zero",
        )),
        (TokenKind::Div, Number(a), Number(b)) => RTResult::value(Number(a / b)),
        (TokenKind::Pow, Number(a), Number(b)) => RTResult::value(Number(a.powf(*b))),
        (TokenKind::At, List(items), Number(n)) => {
            let items = items.borrow();
            let idx = *n as i64;
            let len = items.len() as i64;
            let real_idx = if idx < 0 { len + idx } else { idx };
            if real_idx < 0 || real_idx >= len {
                return RTResult::error(LangError::runtime(
                    start.clone(),
                    end.clone(),
                    "Index out of bounds in list",
                ));
            }
            RTResult::value(items[real_idx as usize].clone())
        }
        // Comparisons are defined for Number,Number only. A List (or a
        // String, despite `+`/`*` supporting strings) falls through to
        // the generic unsupported-operand error below.
        (TokenKind::EqEq, Number(a), Number(b)) => RTResult::value(Number((a == b) as i64 as f64)),
        (TokenKind::Neq, Number(a), Number(b)) => RTResult::value(Number((a != b) as i64 as f64)),
        (TokenKind::Lt, Number(a), Number(b)) => RTResult::value(Number((a < b) as i64 as f64)),
        (TokenKind::Gt, Number(a), Number(b)) => RTResult::value(Number((a > b) as i64 as f64)),
        (TokenKind::LtEq, Number(a), Number(b)) => RTResult::value(Number((a <= b) as i64 as f64)),
        (TokenKind::GtEq, Number(a), Number(b)) => RTResult::value(Number((a >= b) as i64 as f64)),
        (_, _, _) => RTResult::error(LangError::runtime(
            start.clone(),
            end.clone(),
            "Unsupported operand types for binary operation",
        )),
    }
}
