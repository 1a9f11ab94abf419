use crate::error::LangError;
use crate::value::Value;

/// Five-way control-flow signal threaded through every evaluation
/// step, in place of native exceptions or early returns: a plain
/// value, a `RETURN` carrying its value (or null), a loop `CONTINUE`,
/// a loop `BREAK`, or an error. Composite evaluators (lists of
/// statements, loop bodies) check [`should_return`](Self::should_return)
/// after each child and stop folding further children as soon as one
/// of these signals appears.
#[derive(Debug, Default)]
pub struct RTResult {
    pub value: Option<Value>,
    pub func_return_value: Option<Value>,
    pub loop_should_continue: bool,
    pub loop_should_break: bool,
    pub error: Option<LangError>,
}

impl RTResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn error(error: LangError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn func_return(value: Value) -> Self {
        Self {
            func_return_value: Some(value),
            ..Self::default()
        }
    }

    pub fn do_continue() -> Self {
        Self {
            loop_should_continue: true,
            ..Self::default()
        }
    }

    pub fn do_break() -> Self {
        Self {
            loop_should_break: true,
            ..Self::default()
        }
    }

    /// Register a child result: fold its value in, or propagate it
    /// unchanged (as `None`) if it carries any of the four non-value
    /// signals, so the caller can stop evaluating immediately.
    pub fn register(&mut self, res: RTResult) -> Option<Value> {
        if res.error.is_some() {
            self.error = res.error;
            return None;
        }
        if res.func_return_value.is_some() {
            self.func_return_value = res.func_return_value;
            return None;
        }
        if res.loop_should_continue {
            self.loop_should_continue = true;
            return None;
        }
        if res.loop_should_break {
            self.loop_should_break = true;
            return None;
        }
        res.value
    }

    pub fn is_func_return(&self) -> bool {
        self.func_return_value.is_some()
    }

    /// Any non-value signal that should stop the enclosing evaluator
    /// from continuing to the next statement or loop iteration.
    pub fn should_return(&self) -> bool {
        self.error.is_some()
            || self.func_return_value.is_some()
            || self.loop_should_continue
            || self.loop_should_break
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use std::rc::Rc;

    fn pos() -> Position {
        Position::new(0, 0, 0, Rc::from("t"), Rc::from(""))
    }

    #[test]
    fn register_propagates_error() {
        let mut outer = RTResult::new();
        let inner = RTResult::error(LangError::runtime(pos(), pos(), "boom"));
        assert!(outer.register(inner).is_none());
        assert!(outer.should_return());
    }

    #[test]
    fn register_propagates_break_without_value() {
        let mut outer = RTResult::new();
        let inner = RTResult::do_break();
        assert!(outer.register(inner).is_none());
        assert!(outer.loop_should_break);
    }

    #[test]
    fn register_passes_through_plain_value() {
        let mut outer = RTResult::new();
        let inner = RTResult::value(Value::Number(4.0));
        let got = outer.register(inner);
        assert!(matches!(got, Some(Value::Number(n)) if n == 4.0));
        assert!(!outer.should_return());
    }
}
