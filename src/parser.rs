use crate::ast::{Ast, IfCase, NodeKind};
use crate::error::LangError;
use crate::parse_result::ParseResult;
use crate::token::{Token, TokenKind};

/// Recursive-descent parser with one token of lookahead.
///
/// Productions follow the precedence chain `statements -> statement ->
/// expr -> comp_expr -> arith_expr -> term -> factor -> power -> call
/// -> atom`. Every production returns a [`ParseResult`]; callers use
/// `register`/`try_register` to thread advancement counts and errors
/// through without unwinding the Rust call stack.
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(!tokens.is_empty());
        Self { tokens, index: 0 }
    }

    pub fn parse(mut self) -> Result<Ast, LangError> {
        let span = tracing::trace_span!("parse", tokens = self.tokens.len());
        let _enter = span.enter();
        let res = self.statements();
        if res.error.is_none() && self.current().kind != TokenKind::Eof {
            let start = self.current().start.clone();
            let end = self.current().end.clone();
            tracing::debug!(pos = ?start, "trailing tokens after statements");
            return Err(LangError::invalid_syntax(
                start,
                end,
                "Expected an operator or end of input",
            ));
        }
        match res.node {
            Some(node) => {
                tracing::trace!(advanced = res.advancement_count, "parse complete");
                Ok(node)
            }
            None => {
                let err = res.error.unwrap();
                tracing::debug!(error = %err, "parse failed");
                Err(err)
            }
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn reverse(&mut self, count: usize) {
        self.index = self.index.saturating_sub(count);
    }

    fn skip_newlines(&mut self, res: &mut ParseResult) -> usize {
        let mut count = 0;
        while self.current().kind == TokenKind::Newline {
            res.register_advancement();
            self.advance();
            count += 1;
        }
        count
    }

    // statements = NEWLINE* statement ( NEWLINE+ statement )*
    fn statements(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();
        let mut stmts = Vec::new();

        self.skip_newlines(&mut res);

        let first = match res.register(self.statement()) {
            Some(node) => node,
            None => return res,
        };
        stmts.push(first);

        loop {
            let newline_count = self.skip_newlines(&mut res);
            if newline_count == 0 {
                break;
            }
            if matches!(
                self.current().kind,
                TokenKind::Eof | TokenKind::RCurlyBracket
            ) {
                break;
            }
            let stmt_res = self.statement();
            match res.try_register(stmt_res) {
                Some(node) => stmts.push(node),
                None => {
                    self.reverse(res.to_reverse_count);
                    break;
                }
            }
        }

        let pos_end = stmts
            .last()
            .map(|n: &Ast| n.end.clone())
            .unwrap_or_else(|| pos_start.clone());
        res.success(Ast::new(NodeKind::List(stmts), pos_start, pos_end))
    }

    // statement = RETURN expr? | CONTINUE | BREAK | '#' IMPORT STRING AS IDENT | expr
    fn statement(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();

        if self.current().matches_keyword("RETURN") {
            res.register_advancement();
            self.advance();

            let expr = if !matches!(
                self.current().kind,
                TokenKind::Newline | TokenKind::RCurlyBracket | TokenKind::Eof
            ) {
                match res.try_register(self.expr()) {
                    Some(node) => Some(Box::new(node)),
                    None => {
                        self.reverse(res.to_reverse_count);
                        None
                    }
                }
            } else {
                None
            };
            let pos_end = expr
                .as_ref()
                .map(|e| e.end.clone())
                .unwrap_or_else(|| self.current().start.clone());
            return res.success(Ast::new(NodeKind::Return(expr), pos_start, pos_end));
        }

        if self.current().matches_keyword("CONTINUE") {
            let pos_end = self.current().end.clone();
            res.register_advancement();
            self.advance();
            return res.success(Ast::new(NodeKind::Continue, pos_start, pos_end));
        }

        if self.current().matches_keyword("BREAK") {
            let pos_end = self.current().end.clone();
            res.register_advancement();
            self.advance();
            return res.success(Ast::new(NodeKind::Break, pos_start, pos_end));
        }

        if self.current().kind == TokenKind::Hash {
            return self.import_statement(res, pos_start);
        }

        let expr = match res.register(self.expr()) {
            Some(node) => node,
            None => return res,
        };
        res.success(expr)
    }

    fn import_statement(&mut self, mut res: ParseResult, pos_start: crate::position::Position) -> ParseResult {
        res.register_advancement();
        self.advance();

        if !self.current().matches_keyword("IMPORT") {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected 'IMPORT'",
            ));
        }
        res.register_advancement();
        self.advance();

        if self.current().kind != TokenKind::String {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected a string literal path",
            ));
        }
        let path = self.current().clone();
        res.register_advancement();
        self.advance();

        if !self.current().matches_keyword("AS") {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected 'AS'",
            ));
        }
        res.register_advancement();
        self.advance();

        if self.current().kind != TokenKind::Identifier {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected an identifier",
            ));
        }
        let alias = self.current().text().unwrap().to_string();
        let pos_end = self.current().end.clone();
        res.register_advancement();
        self.advance();

        res.success(Ast::new(NodeKind::Import { path, alias }, pos_start, pos_end))
    }

    // expr = VAR IDENT '=' expr | comp_expr ( (AND|OR) comp_expr )*
    fn expr(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();

        if self.current().matches_keyword("VAR") {
            res.register_advancement();
            self.advance();

            if self.current().kind != TokenKind::Identifier {
                return res.failure(LangError::invalid_syntax(
                    self.current().start.clone(),
                    self.current().end.clone(),
                    "Expected an identifier",
                ));
            }
            let name = self.current().text().unwrap().to_string();
            res.register_advancement();
            self.advance();

            if self.current().kind != TokenKind::Eq {
                return res.failure(LangError::invalid_syntax(
                    self.current().start.clone(),
                    self.current().end.clone(),
                    "Expected '='",
                ));
            }
            res.register_advancement();
            self.advance();

            let value = match res.register(self.expr()) {
                Some(node) => node,
                None => return res,
            };
            let pos_end = value.end.clone();
            return res.success(Ast::new(
                NodeKind::VarAssign {
                    name,
                    value: Box::new(value),
                },
                pos_start,
                pos_end,
            ));
        }

        let mut left = match res.register(self.comp_expr()) {
            Some(node) => node,
            None => return res,
        };

        while self.current().matches_keyword("AND") || self.current().matches_keyword("OR") {
            let op = self.current().clone();
            res.register_advancement();
            self.advance();

            let right = match res.register(self.comp_expr()) {
                Some(node) => node,
                None => return res,
            };
            let start = left.start.clone();
            let end = right.end.clone();
            left = Ast::new(
                NodeKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
                end,
            );
        }

        res.success(left)
    }

    // comp_expr = NOT comp_expr | arith_expr ( (==|!=|<|>|<=|>=) arith_expr )*
    fn comp_expr(&mut self) -> ParseResult {
        let mut res = ParseResult::new();

        if self.current().matches_keyword("NOT") {
            let op = self.current().clone();
            let pos_start = op.start.clone();
            res.register_advancement();
            self.advance();

            let operand = match res.register(self.comp_expr()) {
                Some(node) => node,
                None => return res,
            };
            let pos_end = operand.end.clone();
            return res.success(Ast::new(
                NodeKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
                pos_start,
                pos_end,
            ));
        }

        let mut left = match res.register(self.arith_expr()) {
            Some(node) => node,
            None => return res,
        };

        const COMPARISONS: &[TokenKind] = &[
            TokenKind::EqEq,
            TokenKind::Neq,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::LtEq,
            TokenKind::GtEq,
        ];
        while COMPARISONS.contains(&self.current().kind) {
            let op = self.current().clone();
            res.register_advancement();
            self.advance();

            let right = match res.register(self.arith_expr()) {
                Some(node) => node,
                None => return res,
            };
            let start = left.start.clone();
            let end = right.end.clone();
            left = Ast::new(
                NodeKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
                end,
            );
        }

        res.success(left)
    }

    // arith_expr = term ( (+|-|@) term )*
    fn arith_expr(&mut self) -> ParseResult {
        const OPS: &[TokenKind] = &[TokenKind::Plus, TokenKind::Minus, TokenKind::At];
        self.left_assoc_bin_op(OPS, |p| p.term())
    }

    // term = factor ( (*|/) factor )*
    fn term(&mut self) -> ParseResult {
        const OPS: &[TokenKind] = &[TokenKind::Mul, TokenKind::Div];
        self.left_assoc_bin_op(OPS, |p| p.factor())
    }

    fn left_assoc_bin_op(
        &mut self,
        ops: &[TokenKind],
        operand: impl Fn(&mut Self) -> ParseResult,
    ) -> ParseResult {
        let mut res = ParseResult::new();
        let mut left = match res.register(operand(self)) {
            Some(node) => node,
            None => return res,
        };

        while ops.contains(&self.current().kind) {
            let op = self.current().clone();
            res.register_advancement();
            self.advance();

            let right = match res.register(operand(self)) {
                Some(node) => node,
                None => return res,
            };
            let start = left.start.clone();
            let end = right.end.clone();
            left = Ast::new(
                NodeKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
                end,
            );
        }

        res.success(left)
    }

    // factor = (+|-) factor | power
    fn factor(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let tok = self.current().clone();

        if matches!(tok.kind, TokenKind::Plus | TokenKind::Minus) {
            res.register_advancement();
            self.advance();
            let operand = match res.register(self.factor()) {
                Some(node) => node,
                None => return res,
            };
            let pos_end = operand.end.clone();
            return res.success(Ast::new(
                NodeKind::UnaryOp {
                    op: tok.clone(),
                    operand: Box::new(operand),
                },
                tok.start,
                pos_end,
            ));
        }

        self.power()
    }

    // power = call ( '^' factor )*  -- right associative: the right operand recurses into factor
    fn power(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let mut left = match res.register(self.call()) {
            Some(node) => node,
            None => return res,
        };

        while self.current().kind == TokenKind::Pow {
            let op = self.current().clone();
            res.register_advancement();
            self.advance();

            let right = match res.register(self.factor()) {
                Some(node) => node,
                None => return res,
            };
            let start = left.start.clone();
            let end = right.end.clone();
            left = Ast::new(
                NodeKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
                end,
            );
        }

        res.success(left)
    }

    // call = atom ( '(' (expr (',' expr)*)? ')' )?
    fn call(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let atom = match res.register(self.atom()) {
            Some(node) => node,
            None => return res,
        };

        if self.current().kind != TokenKind::LParen {
            return res.success(atom);
        }

        res.register_advancement();
        self.advance();
        let mut args = Vec::new();

        if self.current().kind == TokenKind::RParen {
            res.register_advancement();
            self.advance();
        } else {
            let first = match res.register(self.expr()) {
                Some(node) => node,
                None => {
                    return res.failure(LangError::invalid_syntax(
                        self.current().start.clone(),
                        self.current().end.clone(),
                        "Expected an expression, ')'",
                    ));
                }
            };
            args.push(first);

            while self.current().kind == TokenKind::Comma {
                res.register_advancement();
                self.advance();
                let next = match res.register(self.expr()) {
                    Some(node) => node,
                    None => return res,
                };
                args.push(next);
            }

            if self.current().kind != TokenKind::RParen {
                return res.failure(LangError::invalid_syntax(
                    self.current().start.clone(),
                    self.current().end.clone(),
                    "Expected ',' or ')'",
                ));
            }
            res.register_advancement();
            self.advance();
        }

        let pos_start = atom.start.clone();
        let pos_end = self.tokens[self.index.saturating_sub(1)].end.clone();
        res.success(Ast::new(
            NodeKind::Call {
                callee: Box::new(atom),
                args,
            },
            pos_start,
            pos_end,
        ))
    }

    // atom = INT | FLOAT | STRING | IDENT ('::' IDENT)? | '(' expr ')'
    //      | list_expr | if_expr | for_expr | while_expr | func_def
    fn atom(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let tok = self.current().clone();

        match tok.kind {
            TokenKind::Int | TokenKind::Float => {
                res.register_advancement();
                self.advance();
                res.success(Ast::new(NodeKind::Number(tok.clone()), tok.start, tok.end))
            }
            TokenKind::String => {
                res.register_advancement();
                self.advance();
                res.success(Ast::new(NodeKind::String(tok.clone()), tok.start, tok.end))
            }
            TokenKind::Identifier => {
                res.register_advancement();
                self.advance();
                let name = tok.text().unwrap().to_string();
                let mut pos_end = tok.end.clone();

                let module = if self.current().kind == TokenKind::DblColon {
                    res.register_advancement();
                    self.advance();
                    if self.current().kind != TokenKind::Identifier {
                        return res.failure(LangError::invalid_syntax(
                            self.current().start.clone(),
                            self.current().end.clone(),
                            "Expected an identifier after '::'",
                        ));
                    }
                    let member = self.current().text().unwrap().to_string();
                    pos_end = self.current().end.clone();
                    res.register_advancement();
                    self.advance();
                    // module::name form: `name` is the alias, `member` is the lookup target.
                    return res.success(Ast::new(
                        NodeKind::VarAccess {
                            name: member,
                            module: Some(name),
                        },
                        tok.start,
                        pos_end,
                    ));
                } else {
                    None
                };

                res.success(Ast::new(
                    NodeKind::VarAccess { name, module },
                    tok.start,
                    pos_end,
                ))
            }
            TokenKind::LParen => {
                res.register_advancement();
                self.advance();
                let expr = match res.register(self.expr()) {
                    Some(node) => node,
                    None => return res,
                };
                if self.current().kind != TokenKind::RParen {
                    return res.failure(LangError::invalid_syntax(
                        self.current().start.clone(),
                        self.current().end.clone(),
                        "Expected ')'",
                    ));
                }
                res.register_advancement();
                self.advance();
                res.success(expr)
            }
            TokenKind::LSquare => self.list_expr(),
            TokenKind::Keyword if tok.matches_keyword("IF") => self.if_expr(),
            TokenKind::Keyword if tok.matches_keyword("FOR") => self.for_expr(),
            TokenKind::Keyword if tok.matches_keyword("WHILE") => self.while_expr(),
            TokenKind::Keyword if tok.matches_keyword("FUNC") => self.func_def(),
            _ => res.failure(LangError::invalid_syntax(
                tok.start.clone(),
                tok.end.clone(),
                "Expected int, float, identifier, '+', '-', '(', '[' or a keyword",
            )),
        }
    }

    // list_expr = '[' (expr (',' expr)*)? ']'
    fn list_expr(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();
        res.register_advancement();
        self.advance();

        let mut elements = Vec::new();

        if self.current().kind == TokenKind::RSquare {
            res.register_advancement();
            self.advance();
        } else {
            let first = match res.register(self.expr()) {
                Some(node) => node,
                None => {
                    return res.failure(LangError::invalid_syntax(
                        self.current().start.clone(),
                        self.current().end.clone(),
                        "Expected an expression or ']'",
                    ));
                }
            };
            elements.push(first);

            while self.current().kind == TokenKind::Comma {
                res.register_advancement();
                self.advance();
                let next = match res.register(self.expr()) {
                    Some(node) => node,
                    None => return res,
                };
                elements.push(next);
            }

            if self.current().kind != TokenKind::RSquare {
                return res.failure(LangError::invalid_syntax(
                    self.current().start.clone(),
                    self.current().end.clone(),
                    "Expected ',' or ']'",
                ));
            }
            res.register_advancement();
            self.advance();
        }

        let pos_end = self.tokens[self.index.saturating_sub(1)].end.clone();
        res.success(Ast::new(NodeKind::List(elements), pos_start, pos_end))
    }

    /// `inline-or-block`: a single inline statement, or a newline-led
    /// block of statements closed by `}`. Returns (body, returns_null).
    fn inline_or_block(&mut self, res: &mut ParseResult) -> Option<(Ast, bool)> {
        if self.current().kind == TokenKind::Newline {
            res.register_advancement();
            self.advance();

            let statements = match res.register(self.statements()) {
                Some(node) => node,
                None => return None,
            };

            if self.current().kind != TokenKind::RCurlyBracket {
                *res = std::mem::take(res).failure(LangError::invalid_syntax(
                    self.current().start.clone(),
                    self.current().end.clone(),
                    "Expected '}'",
                ));
                return None;
            }
            res.register_advancement();
            self.advance();
            Some((statements, true))
        } else {
            let stmt = match res.register(self.statement()) {
                Some(node) => node,
                None => return None,
            };
            Some((stmt, false))
        }
    }

    // if_expr = IF expr THEN inline_or_block
    //           (ELIF expr THEN inline_or_block)*
    //           (ELSE inline_or_block)?
    fn if_expr(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();
        let mut cases = Vec::new();
        let mut else_case = None;

        res.register_advancement();
        self.advance(); // IF

        let condition = match res.register(self.expr()) {
            Some(node) => node,
            None => return res,
        };

        if !self.current().matches_keyword("THEN") {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected 'THEN'",
            ));
        }
        res.register_advancement();
        self.advance();

        let (body, returns_null) = match self.inline_or_block(&mut res) {
            Some(pair) => pair,
            None => return res,
        };
        cases.push(IfCase {
            condition,
            body,
            returns_null,
        });

        loop {
            if !self.current().matches_keyword("ELIF") {
                break;
            }
            res.register_advancement();
            self.advance();

            let condition = match res.register(self.expr()) {
                Some(node) => node,
                None => return res,
            };

            if !self.current().matches_keyword("THEN") {
                return res.failure(LangError::invalid_syntax(
                    self.current().start.clone(),
                    self.current().end.clone(),
                    "Expected 'THEN'",
                ));
            }
            res.register_advancement();
            self.advance();

            let (body, returns_null) = match self.inline_or_block(&mut res) {
                Some(pair) => pair,
                None => return res,
            };
            cases.push(IfCase {
                condition,
                body,
                returns_null,
            });
        }

        if self.current().matches_keyword("ELSE") {
            res.register_advancement();
            self.advance();
            let (body, returns_null) = match self.inline_or_block(&mut res) {
                Some(pair) => pair,
                None => return res,
            };
            else_case = Some((Box::new(body), returns_null));
        }

        let pos_end = else_case
            .as_ref()
            .map(|(b, _)| b.end.clone())
            .unwrap_or_else(|| cases.last().unwrap().body.end.clone());

        res.success(Ast::new(
            NodeKind::If { cases, else_case },
            pos_start,
            pos_end,
        ))
    }

    // for_expr = FOR IDENT '=' expr TO expr (STEP expr)? THEN inline_or_block
    fn for_expr(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();
        res.register_advancement();
        self.advance(); // FOR

        if self.current().kind != TokenKind::Identifier {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected an identifier",
            ));
        }
        let var_name = self.current().text().unwrap().to_string();
        res.register_advancement();
        self.advance();

        if self.current().kind != TokenKind::Eq {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected '='",
            ));
        }
        res.register_advancement();
        self.advance();

        let start_value = match res.register(self.expr()) {
            Some(node) => node,
            None => return res,
        };

        if !self.current().matches_keyword("TO") {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected 'TO'",
            ));
        }
        res.register_advancement();
        self.advance();

        let end_value = match res.register(self.expr()) {
            Some(node) => node,
            None => return res,
        };

        let step_value = if self.current().matches_keyword("STEP") {
            res.register_advancement();
            self.advance();
            match res.register(self.expr()) {
                Some(node) => Some(Box::new(node)),
                None => return res,
            }
        } else {
            None
        };

        if !self.current().matches_keyword("THEN") {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected 'THEN'",
            ));
        }
        res.register_advancement();
        self.advance();

        let (body, returns_null) = match self.inline_or_block(&mut res) {
            Some(pair) => pair,
            None => return res,
        };
        let pos_end = body.end.clone();

        res.success(Ast::new(
            NodeKind::For {
                var_name,
                start_value: Box::new(start_value),
                end_value: Box::new(end_value),
                step_value,
                body: Box::new(body),
                returns_null,
            },
            pos_start,
            pos_end,
        ))
    }

    // while_expr = WHILE expr THEN inline_or_block
    fn while_expr(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();
        res.register_advancement();
        self.advance(); // WHILE

        let condition = match res.register(self.expr()) {
            Some(node) => node,
            None => return res,
        };

        if !self.current().matches_keyword("THEN") {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected 'THEN'",
            ));
        }
        res.register_advancement();
        self.advance();

        let (body, returns_null) = match self.inline_or_block(&mut res) {
            Some(pair) => pair,
            None => return res,
        };
        let pos_end = body.end.clone();

        res.success(Ast::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
                returns_null,
            },
            pos_start,
            pos_end,
        ))
    }

    // func_def = FUNC IDENT? '(' (IDENT (',' IDENT)*)? ')' ( '->' expr | NEWLINE statements '}' )
    fn func_def(&mut self) -> ParseResult {
        let mut res = ParseResult::new();
        let pos_start = self.current().start.clone();
        res.register_advancement();
        self.advance(); // FUNC

        let name = if self.current().kind == TokenKind::Identifier {
            let n = self.current().text().unwrap().to_string();
            res.register_advancement();
            self.advance();
            Some(n)
        } else {
            None
        };

        if self.current().kind != TokenKind::LParen {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected '('",
            ));
        }
        res.register_advancement();
        self.advance();

        let mut params = Vec::new();
        if self.current().kind == TokenKind::Identifier {
            params.push(self.current().text().unwrap().to_string());
            res.register_advancement();
            self.advance();

            while self.current().kind == TokenKind::Comma {
                res.register_advancement();
                self.advance();
                if self.current().kind != TokenKind::Identifier {
                    return res.failure(LangError::invalid_syntax(
                        self.current().start.clone(),
                        self.current().end.clone(),
                        "Expected an identifier",
                    ));
                }
                params.push(self.current().text().unwrap().to_string());
                res.register_advancement();
                self.advance();
            }
        }

        if self.current().kind != TokenKind::RParen {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected ',' or ')'",
            ));
        }
        res.register_advancement();
        self.advance();

        if self.current().kind == TokenKind::Arrow {
            res.register_advancement();
            self.advance();
            let body = match res.register(self.expr()) {
                Some(node) => node,
                None => return res,
            };
            let pos_end = body.end.clone();
            return res.success(Ast::new(
                NodeKind::FuncDef {
                    name,
                    params,
                    body: Box::new(body),
                    auto_return: true,
                },
                pos_start,
                pos_end,
            ));
        }

        if self.current().kind != TokenKind::Newline {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected '->' or a newline",
            ));
        }
        res.register_advancement();
        self.advance();

        let body = match res.register(self.statements()) {
            Some(node) => node,
            None => return res,
        };

        if self.current().kind != TokenKind::RCurlyBracket {
            return res.failure(LangError::invalid_syntax(
                self.current().start.clone(),
                self.current().end.clone(),
                "Expected '}'",
            ));
        }
        let pos_end = self.current().end.clone();
        res.register_advancement();
        self.advance();

        res.success(Ast::new(
            NodeKind::FuncDef {
                name,
                params,
                body: Box::new(body),
                auto_return: false,
            },
            pos_start,
            pos_end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_ok(src: &str) -> Ast {
        let (tokens, err) = Lexer::new("test", src).tokenize();
        assert!(err.is_none(), "lex error: {:?}", err);
        Parser::new(tokens).parse().expect("parse error")
    }

    fn parse_err(src: &str) -> LangError {
        let (tokens, err) = Lexer::new("test", src).tokenize();
        assert!(err.is_none(), "lex error: {:?}", err);
        Parser::new(tokens).parse().expect_err("expected parse error")
    }

    #[test]
    fn arithmetic_precedence() {
        let ast = parse_ok("2 + 3 * 4");
        match ast.kind {
            NodeKind::List(stmts) => {
                assert_eq!(stmts.len(), 1);
                match &stmts[0].kind {
                    NodeKind::BinOp { op, right, .. } => {
                        assert_eq!(op.kind, TokenKind::Plus);
                        assert!(matches!(right.kind, NodeKind::BinOp { .. }));
                    }
                    other => panic!("expected BinOp, got {:?}", other),
                }
            }
            other => panic!("expected List, got {:?}", other),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let ast = parse_ok("2^3^2");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::BinOp { left, right, .. } = &stmts[0].kind else { panic!() };
        assert!(matches!(left.kind, NodeKind::Number(_)));
        assert!(matches!(right.kind, NodeKind::BinOp { .. }));
    }

    #[test]
    fn var_assign() {
        let ast = parse_ok("VAR a = 5");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        assert!(matches!(stmts[0].kind, NodeKind::VarAssign { .. }));
    }

    #[test]
    fn module_access() {
        let ast = parse_ok("m::x");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::VarAccess { name, module } = &stmts[0].kind else { panic!() };
        assert_eq!(name, "x");
        assert_eq!(module.as_deref(), Some("m"));
    }

    #[test]
    fn inline_if_else() {
        let ast = parse_ok("IF 0 THEN 1 ELIF 0 THEN 2 ELSE 3");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::If { cases, else_case } = &stmts[0].kind else { panic!() };
        assert_eq!(cases.len(), 2);
        assert!(else_case.is_some());
        assert!(!cases[0].returns_null);
    }

    #[test]
    fn block_func_def() {
        let ast = parse_ok("FUNC f(x)\nRETURN x\n}");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::FuncDef { auto_return, params, .. } = &stmts[0].kind else { panic!() };
        assert!(!auto_return);
        assert_eq!(params, &["x".to_string()]);
    }

    #[test]
    fn inline_func_def() {
        let ast = parse_ok("FUNC sq(x) -> x^2");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::FuncDef { auto_return, .. } = &stmts[0].kind else { panic!() };
        assert!(auto_return);
    }

    #[test]
    fn call_with_args() {
        let ast = parse_ok("sq(5)");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::Call { args, .. } = &stmts[0].kind else { panic!() };
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn list_indexing_with_at() {
        let ast = parse_ok("L @ 0 + L @ 2");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        assert!(matches!(stmts[0].kind, NodeKind::BinOp { .. }));
    }

    #[test]
    fn multiple_statements_become_a_list() {
        let ast = parse_ok("VAR a = 1\nVAR b = 2");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn trailing_garbage_is_invalid_syntax() {
        let err = parse_err("1 2");
        assert!(matches!(err, LangError::InvalidSyntax { .. }));
    }

    #[test]
    fn import_statement_parses() {
        let ast = parse_ok("# IMPORT \"util.epp\" AS util");
        let NodeKind::List(stmts) = ast.kind else { panic!() };
        let NodeKind::Import { alias, .. } = &stmts[0].kind else { panic!() };
        assert_eq!(alias, "util");
    }
}
