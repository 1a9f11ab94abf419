use crate::error::LangError;
use crate::position::Position;
use crate::token::{Token, TokenKind, TokenValue, KEYWORDS};
use std::rc::Rc;

const DIGITS: &[u8] = b"0123456789";

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_letter_or_digit(c: u8) -> bool {
    is_letter(c) || c.is_ascii_digit()
}

/// Turns source text into a token stream.
///
/// Discards spaces and tabs; a newline or `;` both emit a single
/// [`TokenKind::Newline`] (the parser treats them as statement
/// terminators inside blocks). On the first unrecognized byte the
/// lexer stops and returns the tokens produced so far alongside the
/// error, rather than panicking or silently skipping.
pub struct Lexer {
    text: Rc<str>,
    pos: Position,
    current: Option<u8>,
}

impl Lexer {
    pub fn new(file_name: impl Into<Rc<str>>, text: impl Into<Rc<str>>) -> Self {
        let file_name = file_name.into();
        let text = text.into();
        let pos = Position::start(file_name, text.clone());
        let mut lexer = Self {
            text,
            pos,
            current: None,
        };
        lexer.advance();
        lexer
    }

    fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    fn advance(&mut self) {
        self.pos = self.pos.advance(self.current);
        let idx = self.pos.idx();
        self.current = if idx >= 0 && (idx as usize) < self.bytes().len() {
            Some(self.bytes()[idx as usize])
        } else {
            None
        };
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Option<LangError>) {
        let span = tracing::trace_span!("tokenize", bytes = self.text.len());
        let _enter = span.enter();
        let mut tokens = Vec::new();

        while let Some(c) = self.current {
            match c {
                b' ' | b'\t' => self.advance(),
                b'\n' | b';' => {
                    let start = self.pos.clone();
                    self.advance();
                    tokens.push(Token::new(TokenKind::Newline, None, start.clone(), start));
                }
                c if c.is_ascii_digit() => tokens.push(self.make_number()),
                c if is_letter(c) => tokens.push(self.make_identifier()),
                b'"' => match self.make_string() {
                    Ok(tok) => tokens.push(tok),
                    Err(err) => return (tokens, Some(err)),
                },
                b'+' => tokens.push(self.single(TokenKind::Plus)),
                b'-' => tokens.push(self.make_minus_or_arrow()),
                b'*' => tokens.push(self.single(TokenKind::Mul)),
                b'/' => tokens.push(self.single(TokenKind::Div)),
                b'^' => tokens.push(self.single(TokenKind::Pow)),
                b'(' => tokens.push(self.single(TokenKind::LParen)),
                b')' => tokens.push(self.single(TokenKind::RParen)),
                b'[' => tokens.push(self.single(TokenKind::LSquare)),
                b']' => tokens.push(self.single(TokenKind::RSquare)),
                b',' => tokens.push(self.single(TokenKind::Comma)),
                b'@' => tokens.push(self.single(TokenKind::At)),
                b'#' => tokens.push(self.single(TokenKind::Hash)),
                b'}' => tokens.push(self.single(TokenKind::RCurlyBracket)),
                b'=' => tokens.push(self.make_equals()),
                b'<' => tokens.push(self.make_less_than()),
                b'>' => tokens.push(self.make_greater_than()),
                b':' => match self.make_dbl_colon() {
                    Ok(tok) => tokens.push(tok),
                    Err(err) => return (tokens, Some(err)),
                },
                b'!' => match self.make_not_equals() {
                    Ok(tok) => tokens.push(tok),
                    Err(err) => return (tokens, Some(err)),
                },
                other => {
                    let start = self.pos.clone();
                    self.advance();
                    let end = self.pos.clone();
                    let ch = other as char;
                    tracing::debug!(pos = ?start, char = %ch, "illegal character");
                    return (
                        tokens,
                        Some(LangError::illegal_char(start, end, format!("'{}'", ch))),
                    );
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            None,
            self.pos.clone(),
            self.pos.clone(),
        ));
        tracing::trace!(count = tokens.len(), "tokenize complete");
        (tokens, None)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos.clone();
        self.advance();
        Token::new(kind, None, start, self.pos.clone())
    }

    fn make_number(&mut self) -> Token {
        let start = self.pos.clone();
        let mut text = String::new();
        let mut dot_count = 0;

        while let Some(c) = self.current {
            if c.is_ascii_digit() {
                text.push(c as char);
                self.advance();
            } else if c == b'.' {
                if dot_count >= 1 {
                    break;
                }
                dot_count += 1;
                text.push('.');
                self.advance();
            } else {
                break;
            }
        }

        let value: f64 = text.parse().unwrap_or(0.0);
        let kind = if dot_count == 0 {
            TokenKind::Int
        } else {
            TokenKind::Float
        };
        Token::new(kind, Some(TokenValue::Number(value)), start, self.pos.clone())
    }

    fn make_identifier(&mut self) -> Token {
        let start = self.pos.clone();
        let mut text = String::new();

        while let Some(c) = self.current {
            if is_letter_or_digit(c) {
                text.push(c as char);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if KEYWORDS.contains(text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, Some(TokenValue::Text(text)), start, self.pos.clone())
    }

    fn make_string(&mut self) -> Result<Token, LangError> {
        let start = self.pos.clone();
        self.advance(); // opening quote
        let mut text = String::new();
        let mut escaping = false;

        loop {
            match self.current {
                None => {
                    return Err(LangError::expected_char(
                        start,
                        self.pos.clone(),
                        "'\"'",
                    ));
                }
                Some(b'"') if !escaping => {
                    self.advance();
                    break;
                }
                Some(b'\\') if !escaping => {
                    escaping = true;
                    self.advance();
                }
                Some(c) => {
                    if escaping {
                        text.push(match c {
                            b'n' => '\n',
                            b't' => '\t',
                            b'"' => '"',
                            b'\\' => '\\',
                            other => other as char,
                        });
                        escaping = false;
                    } else {
                        text.push(c as char);
                    }
                    self.advance();
                }
            }
        }

        Ok(Token::new(
            TokenKind::String,
            Some(TokenValue::Text(text)),
            start,
            self.pos.clone(),
        ))
    }

    fn make_minus_or_arrow(&mut self) -> Token {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(b'>') {
            self.advance();
            Token::new(TokenKind::Arrow, None, start, self.pos.clone())
        } else {
            Token::new(TokenKind::Minus, None, start, self.pos.clone())
        }
    }

    fn make_equals(&mut self) -> Token {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(b'=') {
            self.advance();
            Token::new(TokenKind::EqEq, None, start, self.pos.clone())
        } else {
            Token::new(TokenKind::Eq, None, start, self.pos.clone())
        }
    }

    fn make_less_than(&mut self) -> Token {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(b'=') {
            self.advance();
            Token::new(TokenKind::LtEq, None, start, self.pos.clone())
        } else {
            Token::new(TokenKind::Lt, None, start, self.pos.clone())
        }
    }

    fn make_greater_than(&mut self) -> Token {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(b'=') {
            self.advance();
            Token::new(TokenKind::GtEq, None, start, self.pos.clone())
        } else {
            Token::new(TokenKind::Gt, None, start, self.pos.clone())
        }
    }

    fn make_not_equals(&mut self) -> Result<Token, LangError> {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(b'=') {
            self.advance();
            Ok(Token::new(TokenKind::Neq, None, start, self.pos.clone()))
        } else {
            Err(LangError::expected_char(
                start,
                self.pos.clone(),
                "'=' (after '!')",
            ))
        }
    }

    fn make_dbl_colon(&mut self) -> Result<Token, LangError> {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(b':') {
            self.advance();
            Ok(Token::new(TokenKind::DblColon, None, start, self.pos.clone()))
        } else {
            Err(LangError::illegal_char(start, self.pos.clone(), "':'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, err) = Lexer::new("test", src).tokenize();
        assert!(err.is_none(), "unexpected lex error: {:?}", err);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn number_with_dot_is_float() {
        let (tokens, _) = Lexer::new("test", "3.14").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].number(), Some(3.14));
    }

    #[test]
    fn number_without_dot_is_int() {
        let (tokens, _) = Lexer::new("test", "42").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].number(), Some(42.0));
    }

    #[test]
    fn keyword_vs_identifier() {
        let (tokens, _) = Lexer::new("test", "VAR x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn string_escapes() {
        let (tokens, _) = Lexer::new("test", r#""a\nb\t\"\\""#).tokenize();
        assert_eq!(tokens[0].text(), Some("a\nb\t\"\\"));
    }

    #[test]
    fn unterminated_string_is_expected_char() {
        let (_, err) = Lexer::new("test", "\"abc").tokenize();
        assert!(matches!(err, Some(LangError::ExpectedCharacter { .. })));
    }

    #[test]
    fn bare_bang_requires_equals() {
        let (_, err) = Lexer::new("test", "!a").tokenize();
        assert!(matches!(err, Some(LangError::ExpectedCharacter { .. })));
    }

    #[test]
    fn double_colon_and_operators() {
        assert_eq!(
            kinds("a::b == c != d <= e >= f"),
            vec![
                TokenKind::Identifier,
                TokenKind::DblColon,
                TokenKind::Identifier,
                TokenKind::EqEq,
                TokenKind::Identifier,
                TokenKind::Neq,
                TokenKind::Identifier,
                TokenKind::LtEq,
                TokenKind::Identifier,
                TokenKind::GtEq,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn minus_vs_arrow() {
        assert_eq!(kinds("- ->"), vec![TokenKind::Minus, TokenKind::Arrow, TokenKind::Eof]);
    }

    #[test]
    fn illegal_char_stops_lexing() {
        let (tokens, err) = Lexer::new("test", "1 $").tokenize();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(err, Some(LangError::IllegalCharacter { .. })));
    }

    #[test]
    fn semicolon_and_newline_both_emit_newline() {
        assert_eq!(
            kinds("1;2\n3"),
            vec![
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Int,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn eof_span_is_at_text_end() {
        let (tokens, _) = Lexer::new("test", "1").tokenize();
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.start.idx(), 1);
    }
}
