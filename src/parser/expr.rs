use std::fmt;

use crate::lexer::{Position, TokenKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Binary {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
        pos: Position,
    },
    Literal(Literal),
    Ident(Identifier),
    Call(Identifier, Vec<Expr>),
    Index(Identifier, Box<Expr>),
    StackPop(Identifier),
}

impl Expr {
    pub fn binary(op: BinOpKind, left: Expr, right: Expr, pos: Position) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        }
    }

    /// Where the expression starts, or its operator for binary nodes.
    pub fn pos(&self) -> Position {
        match self {
            Expr::Binary { pos, .. } => *pos,
            Expr::Literal(l) => l.pos,
            Expr::Ident(ident)
            | Expr::Call(ident, _)
            | Expr::Index(ident, _)
            | Expr::StackPop(ident) => ident.pos,
        }
    }
}

/// Prefix form with explicit parentheses, e.g. `(+ 2 (* 3 4))`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "({op} {left} {right})"),
            Expr::Literal(l) => write!(f, "{l}"),
            Expr::Ident(ident) => write!(f, "{}", ident.name),
            Expr::Call(ident, args) => {
                write!(f, "(call {}", ident.name)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            Expr::Index(ident, index) => write!(f, "{}[{index}]", ident.name),
            Expr::StackPop(ident) => write!(f, "{}.pop()", ident.name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinOpKind {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(BinOpKind::Add),
            TokenKind::Minus => Some(BinOpKind::Sub),
            TokenKind::Star => Some(BinOpKind::Mul),
            TokenKind::Slash => Some(BinOpKind::Div),
            TokenKind::DoubleEqual => Some(BinOpKind::Equal),
            TokenKind::NotEqual => Some(BinOpKind::NotEqual),
            TokenKind::LessThan => Some(BinOpKind::LessThan),
            TokenKind::LessEqual => Some(BinOpKind::LessEqual),
            TokenKind::GreaterThan => Some(BinOpKind::GreaterThan),
            TokenKind::GreaterEqual => Some(BinOpKind::GreaterEqual),
            _ => None,
        }
    }

    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Div
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Equal => "==",
            BinOpKind::NotEqual => "!=",
            BinOpKind::LessThan => "<",
            BinOpKind::LessEqual => "<=",
            BinOpKind::GreaterThan => ">",
            BinOpKind::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Float,
    String,
}

/// `value` keeps the source text; string literals are stored without their quotes.
#[derive(Clone, Debug, PartialEq)]
pub struct Literal {
    pub value: String,
    pub kind: LiteralKind,
    pub pos: Position,
}

impl Literal {
    pub fn number(lexeme: &str, pos: Position) -> Self {
        let kind = if lexeme.contains('.') {
            LiteralKind::Float
        } else {
            LiteralKind::Integer
        };
        Self {
            value: lexeme.to_string(),
            kind,
            pos,
        }
    }

    pub fn string(lexeme: &str, pos: Position) -> Self {
        Self {
            value: lexeme.trim_matches('"').to_string(),
            kind: LiteralKind::String,
            pos,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiteralKind::String => write!(f, "\"{}\"", self.value),
            _ => write!(f, "{}", self.value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub pos: Position,
}

impl Identifier {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}
