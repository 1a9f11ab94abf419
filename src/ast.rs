use crate::position::Position;
use crate::token::{Token, TokenKind};
use std::borrow::Cow;

/// One case of an `IF`/`ELIF` chain: its condition, its body, and
/// whether the body was parsed in block form (in which case the
/// case's value is null regardless of what the body evaluates to).
#[derive(Debug, Clone)]
pub struct IfCase {
    pub condition: Ast,
    pub body: Ast,
    pub returns_null: bool,
}

/// The closed set of syntactic node variants the parser produces.
/// Every node carries its own (start, end) span via [`Ast`].
#[derive(Debug, Clone)]
pub enum NodeKind {
    Number(Token),
    String(Token),
    List(Vec<Ast>),
    VarAccess {
        name: String,
        module: Option<String>,
    },
    VarAssign {
        name: String,
        value: Box<Ast>,
    },
    BinOp {
        left: Box<Ast>,
        op: Token,
        right: Box<Ast>,
    },
    UnaryOp {
        op: Token,
        operand: Box<Ast>,
    },
    If {
        cases: Vec<IfCase>,
        else_case: Option<(Box<Ast>, bool)>,
    },
    For {
        var_name: String,
        start_value: Box<Ast>,
        end_value: Box<Ast>,
        step_value: Option<Box<Ast>>,
        body: Box<Ast>,
        returns_null: bool,
    },
    While {
        condition: Box<Ast>,
        body: Box<Ast>,
        returns_null: bool,
    },
    FuncDef {
        name: Option<String>,
        params: Vec<String>,
        body: Box<Ast>,
        auto_return: bool,
    },
    Call {
        callee: Box<Ast>,
        args: Vec<Ast>,
    },
    Return(Option<Box<Ast>>),
    Continue,
    Break,
    Import {
        path: Token,
        alias: String,
    },
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub kind: NodeKind,
    pub start: Position,
    pub end: Position,
}

impl Ast {
    pub fn new(kind: NodeKind, start: Position, end: Position) -> Self {
        Self { kind, start, end }
    }

    fn label(&self) -> String {
        match &self.kind {
            NodeKind::Number(t) => format!("Number({:?})", t.number()),
            NodeKind::String(t) => format!("String({:?})", t.text()),
            NodeKind::List(_) => "List".to_string(),
            NodeKind::VarAccess { name, module } => match module {
                Some(m) => format!("VarAccess({}::{})", m, name),
                None => format!("VarAccess({})", name),
            },
            NodeKind::VarAssign { name, .. } => format!("VarAssign({})", name),
            NodeKind::BinOp { op, .. } => format!("BinOp({:?})", op),
            NodeKind::UnaryOp { op, .. } => format!("UnaryOp({:?})", op),
            NodeKind::If { .. } => "If".to_string(),
            NodeKind::For { var_name, .. } => format!("For({})", var_name),
            NodeKind::While { .. } => "While".to_string(),
            NodeKind::FuncDef { name, .. } => match name {
                Some(n) => format!("FuncDef({})", n),
                None => "FuncDef(anonymous)".to_string(),
            },
            NodeKind::Call { .. } => "Call".to_string(),
            NodeKind::Return(_) => "Return".to_string(),
            NodeKind::Continue => "Continue".to_string(),
            NodeKind::Break => "Break".to_string(),
            NodeKind::Import { alias, .. } => format!("Import(as {})", alias),
        }
    }

    fn child_nodes(&self) -> Vec<Ast> {
        match &self.kind {
            NodeKind::Number(_) | NodeKind::String(_) | NodeKind::Continue | NodeKind::Break => {
                Vec::new()
            }
            NodeKind::List(items) => items.clone(),
            NodeKind::VarAccess { .. } => Vec::new(),
            NodeKind::VarAssign { value, .. } => vec![(**value).clone()],
            NodeKind::BinOp { left, right, .. } => vec![(**left).clone(), (**right).clone()],
            NodeKind::UnaryOp { operand, .. } => vec![(**operand).clone()],
            NodeKind::If { cases, else_case } => {
                let mut out = Vec::new();
                for case in cases {
                    out.push(case.condition.clone());
                    out.push(case.body.clone());
                }
                if let Some((body, _)) = else_case {
                    out.push((**body).clone());
                }
                out
            }
            NodeKind::For {
                start_value,
                end_value,
                step_value,
                body,
                ..
            } => {
                let mut out = vec![(**start_value).clone(), (**end_value).clone()];
                if let Some(step) = step_value {
                    out.push((**step).clone());
                }
                out.push((**body).clone());
                out
            }
            NodeKind::While {
                condition, body, ..
            } => vec![(**condition).clone(), (**body).clone()],
            NodeKind::FuncDef { body, .. } => vec![(**body).clone()],
            NodeKind::Call { callee, args } => {
                let mut out = vec![(**callee).clone()];
                out.extend(args.iter().cloned());
                out
            }
            NodeKind::Return(expr) => expr.iter().map(|e| (**e).clone()).collect(),
            NodeKind::Import { .. } => Vec::new(),
        }
    }
}

impl ptree::TreeItem for Ast {
    type Child = Ast;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{} @ {}-{}", self.label(), self.start, self.end)
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(self.child_nodes())
    }
}

impl Ast {
    pub fn print_tree(&self) -> std::io::Result<()> {
        ptree::print_tree(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenValue;
    use std::rc::Rc;

    fn dummy_pos() -> Position {
        Position::new(0, 0, 0, Rc::from("t"), Rc::from(""))
    }

    #[test]
    fn number_node_has_no_children() {
        let tok = Token::new(
            TokenKind::Int,
            Some(TokenValue::Number(1.0)),
            dummy_pos(),
            dummy_pos(),
        );
        let node = Ast::new(NodeKind::Number(tok), dummy_pos(), dummy_pos());
        assert!(node.child_nodes().is_empty());
    }

    #[test]
    fn binop_node_has_two_children() {
        let tok = Token::new(
            TokenKind::Int,
            Some(TokenValue::Number(1.0)),
            dummy_pos(),
            dummy_pos(),
        );
        let op = Token::new(TokenKind::Plus, None, dummy_pos(), dummy_pos());
        let left = Ast::new(NodeKind::Number(tok.clone()), dummy_pos(), dummy_pos());
        let right = Ast::new(NodeKind::Number(tok), dummy_pos(), dummy_pos());
        let node = Ast::new(
            NodeKind::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            dummy_pos(),
            dummy_pos(),
        );
        assert_eq!(node.child_nodes().len(), 2);
    }
}
