use thiserror::Error;

use crate::{analyzer::SemanticError, lexer::LexError, parser::SyntaxError};

pub type CompileResult<T> = Result<T, CompileError>;

/// The first failure of a compilation, from whichever stage produced it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("lexical error at {0}")]
    Lex(#[from] LexError),
    #[error("syntax error at {0}")]
    Syntax(#[from] SyntaxError),
    #[error("semantic error at {0}")]
    Semantic(#[from] SemanticError),
}
