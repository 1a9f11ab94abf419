use crate::ast::Ast;
use crate::error::LangError;

/// Accumulator threaded through every parser production.
///
/// `advancement_count` counts how many tokens this production (and
/// everything it registered) consumed; `to_reverse_count` records how
/// far a speculative alternative advanced before failing, so the
/// caller can rewind the token cursor by that amount and try the next
/// alternative. `failure` only overwrites an existing error when no
/// progress was made or no error is set yet; callers that advanced
/// further keep their (more specific) error, which is how the parser
/// reports the longest partial match as the diagnosis.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub node: Option<Ast>,
    pub error: Option<LangError>,
    pub advancement_count: usize,
    pub to_reverse_count: usize,
}

impl ParseResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_advancement(&mut self) {
        self.advancement_count += 1;
    }

    /// Fold a child result's advancement into self and adopt its node;
    /// any error the child carried propagates unconditionally.
    pub fn register(&mut self, res: ParseResult) -> Option<Ast> {
        self.advancement_count += res.advancement_count;
        if res.error.is_some() {
            self.error = res.error;
        }
        res.node
    }

    /// Like [`register`](Self::register) but for a speculative
    /// alternative: on failure, record how far it advanced (for
    /// rewinding) instead of folding the error in, and yield `None` so
    /// the caller can try another production.
    pub fn try_register(&mut self, res: ParseResult) -> Option<Ast> {
        if res.error.is_some() {
            self.to_reverse_count = res.advancement_count;
            None
        } else {
            self.register(res)
        }
    }

    pub fn success(mut self, node: Ast) -> Self {
        self.node = Some(node);
        self
    }

    pub fn failure(mut self, error: LangError) -> Self {
        if self.error.is_none() || self.advancement_count == 0 {
            self.error = Some(error);
        }
        self
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

    fn err(msg: &str) -> LangError {
        LangError::invalid_syntax(pos(), pos(), msg)
    }

    #[test]
    fn failure_sets_error_when_none_present() {
        let res = ParseResult::new().failure(err("first"));
        assert_eq!(res.error.unwrap().details(), "first");
    }

    #[test]
    fn failure_keeps_deeper_error_when_progress_was_made() {
        let mut res = ParseResult::new();
        res.advancement_count = 3;
        res = res.failure(err("first"));
        res = res.failure(err("second"));
        assert_eq!(res.error.unwrap().details(), "first");
    }

    #[test]
    fn failure_overwrites_when_no_progress_was_made() {
        let mut res = ParseResult::new().failure(err("first"));
        res.advancement_count = 0;
        res = res.failure(err("second"));
        assert_eq!(res.error.unwrap().details(), "second");
    }

    #[test]
    fn try_register_records_reverse_count_on_error() {
        let mut outer = ParseResult::new();
        let mut inner = ParseResult::new();
        inner.advancement_count = 2;
        inner.error = Some(err("nope"));
        let node = outer.try_register(inner);
        assert!(node.is_none());
        assert_eq!(outer.to_reverse_count, 2);
        assert_eq!(outer.advancement_count, 0);
    }
}
