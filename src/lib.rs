pub mod analyzer;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod source;

use log::debug;

use analyzer::{AnnotatedProgram, SemanticVisitor};
use codegen::{Codegen, Instruction};
use error::CompileResult;
use lexer::{Lexer, Token};
use parser::Parser;

/// Everything produced by a successful compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub program: AnnotatedProgram,
    pub code: Vec<Instruction>,
}

/// Runs every stage in order and stops at the first error.
pub fn compile(source: &str) -> CompileResult<Compilation> {
    debug!("compiling {} bytes of source", source.len());
    let tokens = Lexer::tokenize(source)?;

    let mut parser = Parser::new(tokens.clone());
    let program = parser.parse()?;

    let program = SemanticVisitor::new().visit_program(program)?;

    let code = Codegen::new().generate(&program);

    Ok(Compilation {
        tokens,
        program,
        code,
    })
}
