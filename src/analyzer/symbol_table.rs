use log::debug;
use thiserror::Error;

use super::Ty;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScopeError {
    #[error("'{name}' is already declared in this scope")]
    DuplicateDeclaration { name: String },
    #[error("'{name}' is not declared")]
    UndeclaredVariable { name: String },
    #[error("cannot exit the root scope")]
    ScopeUnderflow,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Ty,
    /// Nesting depth of the declaring scope, 0 for the root.
    pub depth: usize,
}

type Scope = Vec<Symbol>;

/// A stack of lexical scopes. The root scope is always open.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::new());
        debug!("entered scope {}", self.depth());
    }

    pub fn exit_scope(&mut self) -> Result<(), ScopeError> {
        if self.scopes.len() == 1 {
            return Err(ScopeError::ScopeUnderflow);
        }
        let depth = self.depth();
        if let Some(scope) = self.scopes.pop() {
            debug!("exited scope {} dropping {} symbols", depth, scope.len());
        }
        Ok(())
    }

    fn current_scope(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.current_scope().iter().any(|s| s.name == name)
    }

    pub fn declare(&mut self, name: &str, ty: Ty) -> Result<&Symbol, ScopeError> {
        if self.is_declared_in_current_scope(name) {
            return Err(ScopeError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }

        let depth = self.depth();
        debug!("declared {}: {} at depth {}", name, ty, depth);
        let scope = &mut self.scopes[depth];
        scope.push(Symbol {
            name: name.to_string(),
            ty,
            depth,
        });
        Ok(&scope[scope.len() - 1])
    }

    pub fn lookup(&self, name: &str) -> Result<&Symbol, ScopeError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|s| s.name == name))
            .ok_or_else(|| ScopeError::UndeclaredVariable {
                name: name.to_string(),
            })
    }
}
