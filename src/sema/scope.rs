//! Lexical scopes
//!
//! A [`ScopeStack`] holds one symbol table per open scope; index 0 is file
//! scope and is never popped. Lookup walks from the innermost scope out.

use super::errors::SemanticError;
use crate::memory::slots::SlotId;
use crate::parser::ast::SourceLocation;
use crate::types::Type;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Global,
    Parameter,
    Local,
    EnumConstant(i64),
    Function,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    /// Present for parameters and locals.
    pub slot: Option<SlotId>,
}

#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<FxHashMap<String, Symbol>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "attempting to exit file scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn at_file_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Add `symbol` to the innermost scope; a name already declared there is
    /// a redefinition.
    pub fn declare(&mut self, symbol: Symbol, location: SourceLocation) -> Result<(), SemanticError> {
        let scope = self.scopes.last_mut().ok_or_else(|| SemanticError::Redefinition {
            name: symbol.name.clone(),
            location,
        })?;
        if scope.contains_key(&symbol.name) {
            return Err(SemanticError::Redefinition {
                name: symbol.name,
                location,
            });
        }
        scope.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Look `name` up in the innermost scope only.
    pub fn lookup_current(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str, slot: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            ty: Type::INT,
            storage: Storage::Local,
            slot: Some(SlotId(slot)),
        }
    }

    #[test]
    fn test_innermost_scope_wins() {
        let mut scopes = ScopeStack::new();
        scopes.declare(local("x", 0), SourceLocation::default()).unwrap();
        scopes.push();
        scopes.declare(local("x", 1), SourceLocation::default()).unwrap();

        assert_eq!(scopes.lookup("x").and_then(|s| s.slot), Some(SlotId(1)));
        scopes.pop();
        assert_eq!(scopes.lookup("x").and_then(|s| s.slot), Some(SlotId(0)));
    }

    #[test]
    fn test_redefinition_in_same_scope() {
        let mut scopes = ScopeStack::new();
        scopes.declare(local("x", 0), SourceLocation::default()).unwrap();
        let err = scopes
            .declare(local("x", 1), SourceLocation::new(2, 9))
            .unwrap_err();
        assert!(matches!(err, SemanticError::Redefinition { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_file_scope_is_never_popped() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.pop();
        assert!(scopes.at_file_scope());
        assert!(scopes.lookup("missing").is_none());
    }
}
