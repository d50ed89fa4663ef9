use log::debug;
use thiserror::Error;

use crate::lexer::Position;
use crate::parser::{
    Assignment, Block, Declaration, Expr, FunctionDecl, Identifier, LValue, Program, StackPush,
    Stmt,
};

use super::{ScopeError, Symbol, SymbolTable, Ty};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SemanticErrorKind {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("type mismatch for '{operator}': {left} vs {right}")]
    TypeMismatch {
        left: Ty,
        right: Ty,
        operator: String,
    },
    #[error("'{name}' is not an array (found {ty})")]
    NotAnArray { name: String, ty: Ty },
    #[error("'{name}' is not a stack (found {ty})")]
    NotAStack { name: String, ty: Ty },
    #[error("'{name}' is not a function (found {ty})")]
    NotAFunction { name: String, ty: Ty },
    #[error("'{name}' takes {expected} arguments but {actual} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{pos}: {kind}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub pos: Position,
}

type SemanticResult<T> = Result<T, SemanticError>;

trait At<T> {
    fn at(self, pos: Position) -> SemanticResult<T>;
}

impl<T, E: Into<SemanticErrorKind>> At<T> for Result<T, E> {
    fn at(self, pos: Position) -> SemanticResult<T> {
        self.map_err(|e| SemanticError {
            kind: e.into(),
            pos,
        })
    }
}

fn mismatch(left: &Ty, right: &Ty, operator: &str, pos: Position) -> SemanticError {
    SemanticError {
        kind: SemanticErrorKind::TypeMismatch {
            left: left.clone(),
            right: right.clone(),
            operator: operator.to_string(),
        },
        pos,
    }
}

/// A program that passed semantic analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedProgram {
    pub program: Program,
    /// Every symbol in the order it was declared, across all scopes.
    pub declarations: Vec<Symbol>,
}

pub struct SemanticVisitor {
    symbol_table: SymbolTable,
    declarations: Vec<Symbol>,
}

impl Default for SemanticVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticVisitor {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            declarations: vec![],
        }
    }

    pub fn visit_program(mut self, program: Program) -> SemanticResult<AnnotatedProgram> {
        for stmt in program.0.iter() {
            self.visit_stmt(stmt)?;
        }
        debug!(
            "program is valid with {} declarations",
            self.declarations.len()
        );

        Ok(AnnotatedProgram {
            program,
            declarations: self.declarations,
        })
    }

    fn declare(&mut self, ident: &Identifier, ty: Ty) -> SemanticResult<()> {
        let symbol = self.symbol_table.declare(&ident.name, ty).at(ident.pos)?;
        self.declarations.push(symbol.clone());
        Ok(())
    }

    fn lookup(&self, ident: &Identifier) -> SemanticResult<Ty> {
        let symbol = self.symbol_table.lookup(&ident.name).at(ident.pos)?;
        Ok(symbol.ty.clone())
    }

    fn visit_scoped_block(&mut self, block: &Block, pos: Position) -> SemanticResult<()> {
        self.symbol_table.enter_scope();
        self.visit_block(block)?;
        self.symbol_table.exit_scope().at(pos)
    }

    fn visit_block(&mut self, block: &Block) -> SemanticResult<()> {
        for stmt in block.0.iter() {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> SemanticResult<()> {
        match stmt {
            Stmt::If(cond, then_block, else_block) => {
                self.visit_expr(cond)?;
                self.visit_scoped_block(then_block, cond.pos())?;
                if let Some(else_block) = else_block {
                    self.visit_scoped_block(else_block, cond.pos())?;
                }
                Ok(())
            }
            Stmt::While(cond, body) => {
                self.visit_expr(cond)?;
                self.visit_scoped_block(body, cond.pos())
            }
            Stmt::DoWhile(body, cond) => {
                self.visit_scoped_block(body, cond.pos())?;
                self.visit_expr(cond)?;
                Ok(())
            }
            Stmt::For(init, cond, update, body) => self.visit_for(init, cond, update, body),
            Stmt::FunctionDecl(f) => self.visit_function_decl(f),
            Stmt::Declaration(d) => self.visit_declaration(d),
            Stmt::Assign(a) => self.visit_assignment(a),
            Stmt::StackPush(p) => self.visit_stack_push(p),
            Stmt::Expr(expr) => self.visit_expr(expr).map(|_| ()),
        }
    }

    fn visit_for(
        &mut self,
        init: &Assignment,
        cond: &Expr,
        update: &Assignment,
        body: &Block,
    ) -> SemanticResult<()> {
        self.symbol_table.enter_scope();
        self.visit_assignment(init)?;
        self.visit_expr(cond)?;
        self.visit_assignment(update)?;
        self.visit_block(body)?;
        self.symbol_table.exit_scope().at(init.pos)
    }

    fn visit_function_decl(&mut self, f: &FunctionDecl) -> SemanticResult<()> {
        self.symbol_table.enter_scope();

        let mut params = vec![];
        for param in f.params.iter() {
            let ty = param.ty.as_ref().map(Ty::from).unwrap_or(Ty::Integer);
            self.declare(&param.name, ty.clone())?;
            params.push(ty);
        }

        self.visit_block(&f.body)?;
        let ret = match &f.ret {
            Some(expr) => self.visit_expr(expr)?,
            None => Ty::Integer,
        };

        self.symbol_table.exit_scope().at(f.name.pos)?;
        self.declare(&f.name, Ty::Func(params, Box::new(ret)))
    }

    fn visit_declaration(&mut self, d: &Declaration) -> SemanticResult<()> {
        let ty = Ty::from(&d.ty);
        if let Some(init) = &d.init {
            let init_ty = self.visit_expr(init)?;
            if init_ty != ty {
                return Err(mismatch(&ty, &init_ty, "=", init.pos()));
            }
        }
        self.declare(&d.name, ty)
    }

    /// The first assignment to a name declares it in the current scope;
    /// later ones must keep the declared type.
    fn visit_assignment(&mut self, a: &Assignment) -> SemanticResult<()> {
        match &a.target {
            LValue::Ident(ident) => {
                let ty = self.visit_expr(&a.expr)?;
                match self.symbol_table.lookup(&ident.name) {
                    Ok(symbol) if symbol.ty == ty => Ok(()),
                    Ok(symbol) => Err(mismatch(&symbol.ty, &ty, "=", a.pos)),
                    Err(_) => self.declare(ident, ty),
                }
            }
            LValue::Index(ident, index) => {
                let elem = self.visit_index(ident, index)?;
                let ty = self.visit_expr(&a.expr)?;
                if ty != elem {
                    return Err(mismatch(&elem, &ty, "=", a.pos));
                }
                Ok(())
            }
        }
    }

    fn visit_stack_push(&mut self, p: &StackPush) -> SemanticResult<()> {
        let elem = self.visit_stack(&p.stack)?;
        let ty = self.visit_expr(&p.value)?;
        if ty != elem {
            return Err(mismatch(&elem, &ty, "push", p.value.pos()));
        }
        Ok(())
    }

    /// Checks `ident[index]` and returns the element type.
    fn visit_index(&mut self, ident: &Identifier, index: &Expr) -> SemanticResult<Ty> {
        let ty = self.lookup(ident)?;
        let Ty::Array(elem) = ty else {
            return Err(SemanticError {
                kind: SemanticErrorKind::NotAnArray {
                    name: ident.name.clone(),
                    ty,
                },
                pos: ident.pos,
            });
        };

        let index_ty = self.visit_expr(index)?;
        if index_ty != Ty::Integer {
            return Err(mismatch(&Ty::Integer, &index_ty, "[]", index.pos()));
        }
        Ok(*elem)
    }

    /// Checks that `ident` is a stack and returns the element type.
    fn visit_stack(&mut self, ident: &Identifier) -> SemanticResult<Ty> {
        match self.lookup(ident)? {
            Ty::Stack(elem) => Ok(*elem),
            ty => Err(SemanticError {
                kind: SemanticErrorKind::NotAStack {
                    name: ident.name.clone(),
                    ty,
                },
                pos: ident.pos,
            }),
        }
    }

    fn visit_call(&mut self, ident: &Identifier, args: &[Expr]) -> SemanticResult<Ty> {
        let mut arg_tys = vec![];
        for arg in args {
            arg_tys.push(self.visit_expr(arg)?);
        }

        let (params, ret) = match self.lookup(ident)? {
            Ty::Func(params, ret) => (params, ret),
            ty => {
                return Err(SemanticError {
                    kind: SemanticErrorKind::NotAFunction {
                        name: ident.name.clone(),
                        ty,
                    },
                    pos: ident.pos,
                })
            }
        };

        if params.len() != args.len() {
            return Err(SemanticError {
                kind: SemanticErrorKind::ArityMismatch {
                    name: ident.name.clone(),
                    expected: params.len(),
                    actual: args.len(),
                },
                pos: ident.pos,
            });
        }
        for ((param, arg_ty), arg) in params.iter().zip(arg_tys.iter()).zip(args) {
            if param != arg_ty {
                return Err(mismatch(param, arg_ty, "call", arg.pos()));
            }
        }

        Ok(*ret)
    }

    fn visit_expr(&mut self, expr: &Expr) -> SemanticResult<Ty> {
        match expr {
            Expr::Binary {
                op,
                left,
                right,
                pos,
            } => {
                let t1 = self.visit_expr(left)?;
                let t2 = self.visit_expr(right)?;
                if t1 != t2 {
                    return Err(mismatch(&t1, &t2, op.as_str(), *pos));
                }
                if op.is_comparison() {
                    Ok(Ty::Integer)
                } else {
                    Ok(t1)
                }
            }
            Expr::Literal(l) => Ok(Ty::from(l.kind)),
            Expr::Ident(ident) => self.lookup(ident),
            Expr::Call(ident, args) => self.visit_call(ident, args),
            Expr::Index(ident, index) => self.visit_index(ident, index),
            Expr::StackPop(ident) => self.visit_stack(ident),
        }
    }
}
