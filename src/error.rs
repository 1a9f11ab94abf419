use crate::position::Position;

/// The four error kinds named in the language's diagnostics.
///
/// Errors are values, not exceptions: the lexer returns one alongside
/// its partial token list, the parser threads one through
/// [`ParseResult`](crate::parse_result::ParseResult), and the
/// interpreter threads one through
/// [`RTResult`](crate::rt_result::RTResult). Composite evaluators
/// propagate an error unchanged rather than unwinding the Rust stack.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LangError {
    #[error("Illegal Character: {details}")]
    IllegalCharacter {
        start: Position,
        end: Position,
        details: String,
    },
    #[error("Expected Character: {details}")]
    ExpectedCharacter {
        start: Position,
        end: Position,
        details: String,
    },
    #[error("Invalid Syntax: {details}")]
    InvalidSyntax {
        start: Position,
        end: Position,
        details: String,
    },
    #[error("Runtime Error: {details}")]
    Runtime {
        start: Position,
        end: Position,
        details: String,
    },
}

impl LangError {
    pub fn illegal_char(start: Position, end: Position, details: impl Into<String>) -> Self {
        Self::IllegalCharacter {
            start,
            end,
            details: details.into(),
        }
    }

    pub fn expected_char(start: Position, end: Position, details: impl Into<String>) -> Self {
        Self::ExpectedCharacter {
            start,
            end,
            details: details.into(),
        }
    }

    pub fn invalid_syntax(start: Position, end: Position, details: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            start,
            end,
            details: details.into(),
        }
    }

    pub fn runtime(start: Position, end: Position, details: impl Into<String>) -> Self {
        Self::Runtime {
            start,
            end,
            details: details.into(),
        }
    }

    pub fn start(&self) -> &Position {
        match self {
            Self::IllegalCharacter { start, .. }
            | Self::ExpectedCharacter { start, .. }
            | Self::InvalidSyntax { start, .. }
            | Self::Runtime { start, .. } => start,
        }
    }

    pub fn end(&self) -> &Position {
        match self {
            Self::IllegalCharacter { end, .. }
            | Self::ExpectedCharacter { end, .. }
            | Self::InvalidSyntax { end, .. }
            | Self::Runtime { end, .. } => end,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::IllegalCharacter { .. } => "Illegal Character",
            Self::ExpectedCharacter { .. } => "Expected Character",
            Self::InvalidSyntax { .. } => "Invalid Syntax",
            Self::Runtime { .. } => "Runtime Error",
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Self::IllegalCharacter { details, .. }
            | Self::ExpectedCharacter { details, .. }
            | Self::InvalidSyntax { details, .. }
            | Self::Runtime { details, .. } => details,
        }
    }

    /// Render the full multi-line diagnostic block: kind, details,
    /// file/line, the offending source line, and a caret underline.
    pub fn render(&self) -> String {
        let start = self.start();
        format!(
            "{}: {}\nFile {}, line {}\n\n{}\n",
            self.kind_name(),
            self.details(),
            start.file_name(),
            start.line() + 1,
            string_with_arrows(start.file_text(), start, self.end()),
        )
    }
}

fn string_with_arrows(text: &str, start: &Position, end: &Position) -> String {
    let idx_start = line_start(text, start);
    let idx_end = line_end(text, idx_start);
    let line = &text[idx_start..idx_end];

    let col_start = start.column().max(0) as usize;
    let mut col_end = end.column().max(0) as usize;
    if col_end < col_start {
        col_end = col_start;
    }
    let carets = (col_end - col_start).max(1);

    format!("{}\n{}{}", line, " ".repeat(col_start), "^".repeat(carets))
}

fn line_start(text: &str, pos: &Position) -> usize {
    let idx = (pos.idx().max(0) as usize).min(text.len());
    match text[..idx].rfind('\n') {
        Some(i) => i + 1,
        None => 0,
    }
}

fn line_end(text: &str, from: usize) -> usize {
    match text[from..].find('\n') {
        Some(i) => from + i,
        None => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn make_pos(idx: isize, line: usize, column: isize, text: &str) -> Position {
        Position::new(idx, line, column, Rc::from("test.epp"), Rc::from(text))
    }

    #[test]
    fn render_has_at_least_one_caret() {
        let text = "1/0";
        let start = make_pos(0, 0, 0, text);
        let end = make_pos(3, 0, 3, text);
        let err = LangError::runtime(start, end, "Division by zero");
        let rendered = err.render();
        assert!(rendered.contains("Runtime Error: Division by zero"));
        assert!(rendered.contains('^'));
    }
}
