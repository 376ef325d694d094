//! Per-function lowering environment
//!
//! Tracks local bindings while a body lowers. Each lexical block gets its
//! own scope level holding the names bound inside it and the statement
//! buffer the block's lowered statements accumulate into. Closing a level
//! appends an unbind for every name it introduced, so a binding never
//! outlives its block and a re-entered loop body starts from a clean slate.
//!
//! Generated local names are unique per function: the source name when
//! free, otherwise suffixed the same way the global scope suffixes
//! colliding names.

use rustc_hash::FxHashMap;

use super::form::{Form, LoweredStmt};
use super::scope::pick_unique_name;
use crate::types::NativeType;

struct BlockScope {
    /// Names bound in this block, in binding order.
    names: Vec<String>,
    /// Source name -> generated name, for identifier lookup.
    by_source: FxHashMap<String, String>,
    /// Lowered statements of this block.
    stmts: Vec<LoweredStmt>,
}

impl BlockScope {
    fn new() -> Self {
        BlockScope {
            names: Vec::new(),
            by_source: FxHashMap::default(),
            stmts: Vec::new(),
        }
    }
}

/// Lowering-time state of one function body.
pub struct FuncEnv {
    /// Every generated name issued in this function, with its type.
    vars: FxHashMap<String, NativeType>,
    scopes: Vec<BlockScope>,
}

impl FuncEnv {
    pub fn new() -> Self {
        FuncEnv {
            vars: FxHashMap::default(),
            scopes: vec![BlockScope::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(BlockScope::new());
    }

    /// Close the innermost scope, returning its statements with unbinds
    /// appended in reverse binding order.
    pub fn pop_scope(&mut self) -> Vec<LoweredStmt> {
        let mut scope = match self.scopes.pop() {
            Some(scope) => scope,
            None => return Vec::new(),
        };
        for name in scope.names.iter().rev() {
            scope.stmts.push(LoweredStmt::Unbind { name: name.clone() });
        }
        scope.stmts
    }

    /// Append a lowered statement to the innermost scope's buffer.
    pub fn emit(&mut self, stmt: LoweredStmt) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.stmts.push(stmt);
        }
    }

    /// Bind a new local in the innermost scope. The initializer must
    /// produce a cell. Returns the generated name.
    pub fn register_new_var(&mut self, source_name: &str, ty: NativeType, init: Form) -> String {
        let generated = self.issue_name(source_name);
        self.emit(LoweredStmt::Bind {
            name: generated.clone(),
            init,
        });
        self.record(source_name, &generated, ty);
        generated
    }

    /// Bind a parameter: the caller seeds the frame under the generated
    /// name, and the bind re-wraps that cell into the declared type.
    pub fn register_param(&mut self, source_name: &str, ty: NativeType) -> String {
        let base = if source_name.is_empty() {
            "arg"
        } else {
            source_name
        };
        let generated = self.issue_name(base);
        self.emit(LoweredStmt::Bind {
            name: generated.clone(),
            init: Form::NewInstance {
                ty: ty.clone(),
                init: Some(Box::new(Form::LocalRef(generated.clone()))),
            },
        });
        self.record(source_name, &generated, ty);
        generated
    }

    fn issue_name(&self, source_name: &str) -> String {
        pick_unique_name(source_name, |candidate| self.vars.contains_key(candidate))
    }

    fn record(&mut self, source_name: &str, generated: &str, ty: NativeType) {
        self.vars.insert(generated.to_string(), ty);
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.push(generated.to_string());
            if !source_name.is_empty() {
                scope
                    .by_source
                    .insert(source_name.to_string(), generated.to_string());
            }
        }
    }

    /// Look a source identifier up through the open scopes, innermost
    /// first.
    pub fn lookup(&self, source_name: &str) -> Option<(String, NativeType)> {
        for scope in self.scopes.iter().rev() {
            if let Some(generated) = scope.by_source.get(source_name) {
                let ty = self.vars.get(generated)?.clone();
                return Some((generated.clone(), ty));
            }
        }
        None
    }
}

impl Default for FuncEnv {
    fn default() -> Self {
        FuncEnv::new()
    }
}
