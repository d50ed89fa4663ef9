use std::fmt;

use crate::parser::{LiteralKind, TypeName};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Integer,
    Float,
    String,
    Array(Box<Ty>),
    Stack(Box<Ty>),
    Func(Vec<Ty>, Box<Ty>),
}

impl Ty {
    pub fn get_inner(&self) -> Option<Ty> {
        match self {
            Ty::Array(ty) | Ty::Stack(ty) => Some(*ty.clone()),
            _ => None,
        }
    }

    pub fn get_return_type(&self) -> Option<Ty> {
        match self {
            Ty::Func(_, ty) => Some(*ty.clone()),
            _ => None,
        }
    }
}

impl From<&TypeName> for Ty {
    fn from(type_name: &TypeName) -> Self {
        match type_name {
            TypeName::Int => Ty::Integer,
            TypeName::Float => Ty::Float,
            TypeName::String => Ty::String,
            TypeName::Array(t) => Ty::Array(Box::new(Ty::from(t.as_ref()))),
            TypeName::Stack(t) => Ty::Stack(Box::new(Ty::from(t.as_ref()))),
        }
    }
}

impl From<LiteralKind> for Ty {
    fn from(kind: LiteralKind) -> Self {
        match kind {
            LiteralKind::Integer => Ty::Integer,
            LiteralKind::Float => Ty::Float,
            LiteralKind::String => Ty::String,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Integer => write!(f, "int"),
            Ty::Float => write!(f, "float"),
            Ty::String => write!(f, "string"),
            Ty::Array(t) => write!(f, "array<{t}>"),
            Ty::Stack(t) => write!(f, "stack<{t}>"),
            Ty::Func(params, ret) => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}
