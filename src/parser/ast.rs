use std::fmt;

use crate::lexer::Position;

use super::{Expr, Identifier};

#[derive(Clone, Debug, PartialEq)]
pub struct Program(pub Vec<Stmt>);

/// Statements between a pair of curly braces.
#[derive(Clone, Debug, PartialEq)]
pub struct Block(pub Vec<Stmt>);

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    If(Expr, Block, Option<Block>),
    While(Expr, Block),
    DoWhile(Block, Expr),
    For(Box<Assignment>, Expr, Box<Assignment>, Block),
    FunctionDecl(FunctionDecl),

    Declaration(Declaration),
    Assign(Assignment),
    StackPush(StackPush),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Identifier,
    pub params: Vec<Param>,
    pub body: Block,
    pub ret: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Identifier,
    pub ty: Option<TypeName>,
}

/// `name: type (= expr)?;`
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: Identifier,
    pub ty: TypeName,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub target: LValue,
    pub expr: Expr,
    pub pos: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LValue {
    Ident(Identifier),
    Index(Identifier, Expr),
}

impl LValue {
    pub fn base(&self) -> &Identifier {
        match self {
            LValue::Ident(ident) | LValue::Index(ident, _) => ident,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackPush {
    pub stack: Identifier,
    pub value: Expr,
}

/// A type annotation as written in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Float,
    String,
    Array(Box<TypeName>),
    Stack(Box<TypeName>),
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Int => write!(f, "int"),
            TypeName::Float => write!(f, "float"),
            TypeName::String => write!(f, "string"),
            TypeName::Array(t) => write!(f, "array<{t}>"),
            TypeName::Stack(t) => write!(f, "stack<{t}>"),
        }
    }
}
