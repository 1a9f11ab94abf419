use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// An immutable snapshot of where the lexer is in the source text.
///
/// Every [`Token`](crate::token::Token) and AST node carries a
/// (start, end) pair of these so diagnostics can point back at the
/// exact source text that produced them.
#[derive(Debug, Clone)]
pub struct Position {
    idx: isize,
    line: usize,
    column: isize,
    file_name: Rc<str>,
    file_text: Rc<str>,
}

impl Position {
    pub fn new(idx: isize, line: usize, column: isize, file_name: Rc<str>, file_text: Rc<str>) -> Self {
        Self {
            idx,
            line,
            column,
            file_name,
            file_text,
        }
    }

    /// Starting position for a fresh lexer: one byte before index 0, so
    /// that the first call to `advance` lands on index 0 column 0.
    pub fn start(file_name: Rc<str>, file_text: Rc<str>) -> Self {
        Self::new(-1, 0, -1, file_name, file_text)
    }

    pub fn idx(&self) -> isize {
        self.idx
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> isize {
        self.column
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_text(&self) -> &str {
        &self.file_text
    }

    /// Advance past `current`, wrapping to a new line when it is `\n`.
    pub fn advance(&self, current: Option<u8>) -> Self {
        let mut next = self.clone();
        next.idx += 1;
        next.column += 1;
        if current == Some(b'\n') {
            next.line += 1;
            next.column = 0;
        }
        next
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line + 1, self.column)
    }
}
