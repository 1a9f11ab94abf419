use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A name-to-value scope with an optional parent.
///
/// Lookup walks up the parent chain; assignment (`VAR x = ...` after
/// the first binding) only ever touches the *local* table, per the
/// language rule that a function body cannot rebind a name it merely
/// sees through its parent scope without redeclaring it locally.
/// Function calls build their local table with the *caller's* current
/// table as parent rather than the function's lexical definition site.
/// This interpreter is dynamically scoped, not lexically scoped.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Value>,
    parent: Option<Rc<RefCell<SymbolTable>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<RefCell<SymbolTable>>) -> Self {
        Self {
            symbols: HashMap::new(),
            parent: Some(parent),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.symbols.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.symbols.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) {
        self.symbols.remove(name);
    }

    /// Seeds the root scope with the language's predefined constants.
    pub fn with_builtins() -> Rc<RefCell<SymbolTable>> {
        let table = Rc::new(RefCell::new(SymbolTable::new()));
        {
            let mut t = table.borrow_mut();
            t.set("NULL", Value::Number(0.0));
            t.set("TRUE", Value::Number(1.0));
            t.set("FALSE", Value::Number(0.0));
            t.set("MATH_PI", Value::Number(std::f64::consts::PI));
        }
        crate::natives::install(&table);
        table
    }
}
