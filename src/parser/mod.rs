mod ast;
mod expr;
mod parser;

pub use ast::*;
pub use expr::*;
pub use parser::*;
