//! Global scope: lazy name resolution and name generation
//!
//! The global scope is the single namespace translated code runs against. It
//! resolves identifiers lazily, on first use, against the declaration store
//! (globals, then typedefs, then functions) and against host objects the
//! session has registered.
//! Every resolved or registered entity gets a generated name, unique within
//! the scope, that the executable form refers to from then on.
//!
//! # Name generation
//!
//! The preferred name is used bare when free. On a collision, suffixed
//! candidates are tried in order: `base_a` .. `base_z`, `base_0` .. `base_9`,
//! `base_aa`, `base_ab`, and so on. Host objects registered without a
//! preferred name start from the base `__dummy`. The listing's reserved
//! names (`g`, `values`, `helpers`) are never issued.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use super::wrap::WrapToken;
use crate::memory::value::{cell, Cell};
use crate::parser::ast::{DeclId, FuncDecl, TypedefDecl, VarDecl};
use crate::parser::state::State;
use crate::types::NativeType;

/// What a generated scope name refers to.
#[derive(Debug, Clone)]
pub enum ScopeEntry {
    Var(Rc<VarDecl>),
    Type(Rc<TypedefDecl>),
    Func(Rc<FuncDecl>),
    Wrapped(WrapToken),
}

/// The session-wide namespace.
#[derive(Debug, Default)]
pub struct GlobalScope {
    entries: FxHashMap<String, ScopeEntry>,
    decl_names: FxHashMap<DeclId, String>,
    wrap_names: FxHashMap<WrapToken, String>,
    global_cells: FxHashMap<String, Cell>,
}

impl GlobalScope {
    pub fn new() -> Self {
        GlobalScope::default()
    }

    /// Resolve an identifier, registering it on first use. Returns the
    /// generated scope name together with the entry.
    pub fn resolve(&mut self, state: &State, name: &str) -> Option<(String, ScopeEntry)> {
        if let Some(generated) = self.decl_names_for(state, name) {
            let entry = self.entries.get(&generated)?.clone();
            return Some((generated, entry));
        }
        if let Some(entry) = self.entries.get(name) {
            return Some((name.to_string(), entry.clone()));
        }
        if let Some(decl) = state.vars.get(name) {
            let generated = self.install(name, ScopeEntry::Var(decl.clone()));
            self.decl_names.insert(decl.id, generated.clone());
            let entry = self.entries[&generated].clone();
            return Some((generated, entry));
        }
        if let Some(decl) = state.typedefs.get(name) {
            let generated = self.install(name, ScopeEntry::Type(decl.clone()));
            self.decl_names.insert(decl.id, generated.clone());
            let entry = self.entries[&generated].clone();
            return Some((generated, entry));
        }
        if let Some(decl) = state.funcs.get(name) {
            let generated = self.install(name, ScopeEntry::Func(decl.clone()));
            self.decl_names.insert(decl.id, generated.clone());
            let entry = self.entries[&generated].clone();
            return Some((generated, entry));
        }
        None
    }

    fn decl_names_for(&self, state: &State, name: &str) -> Option<String> {
        let id = state
            .vars
            .get(name)
            .map(|d| d.id)
            .or_else(|| state.typedefs.get(name).map(|d| d.id))
            .or_else(|| state.funcs.get(name).map(|d| d.id))?;
        self.decl_names.get(&id).cloned()
    }

    /// Register a host object under a preferred name (or `__dummy` when none
    /// is given). Re-registering the same token returns its existing name.
    pub fn register_extern(
        &mut self,
        state: &State,
        preferred: Option<&str>,
        token: WrapToken,
    ) -> String {
        if let Some(existing) = self.wrap_names.get(&token) {
            return existing.clone();
        }
        let base = preferred.unwrap_or("__dummy");
        let generated = self.install_checked(base, ScopeEntry::Wrapped(token), state);
        self.wrap_names.insert(token, generated.clone());
        generated
    }

    /// Generated name for a declaration, if it has been resolved.
    pub fn name_for(&self, id: DeclId) -> Option<&String> {
        self.decl_names.get(&id)
    }

    pub fn entry(&self, generated: &str) -> Option<&ScopeEntry> {
        self.entries.get(generated)
    }

    /// The storage cell backing a global variable, created zero-initialized
    /// on first access and shared thereafter.
    pub fn global_cell(&mut self, state: &State, generated: &str) -> Result<Cell, String> {
        if let Some(existing) = self.global_cells.get(generated) {
            return Ok(existing.clone());
        }
        let decl = match self.entries.get(generated) {
            Some(ScopeEntry::Var(decl)) => decl.clone(),
            _ => return Err(format!("'{}' is not a global variable", generated)),
        };
        let ty = NativeType::resolve(&decl.ty, state)?;
        let storage = cell(ty.zero()?);
        self.global_cells.insert(generated.to_string(), storage.clone());
        Ok(storage)
    }

    fn install(&mut self, base: &str, entry: ScopeEntry) -> String {
        let name = pick_unique_name(base, |candidate| self.entries.contains_key(candidate));
        self.entries.insert(name.clone(), entry);
        name
    }

    /// Like [`Self::install`], but also refuses candidate names that would
    /// shadow a declaration not yet pulled into the scope.
    fn install_checked(&mut self, base: &str, entry: ScopeEntry, state: &State) -> String {
        let name = pick_unique_name(base, |candidate| {
            self.entries.contains_key(candidate)
                || state.vars.contains_key(candidate)
                || state.funcs.contains_key(candidate)
                || state.typedefs.contains_key(candidate)
        });
        self.entries.insert(name.clone(), entry);
        name
    }
}

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Names the lowered listing environment claims for itself. Never issued
/// as generated names, so user identifiers cannot shadow them.
const RESERVED_NAMES: &[&str] = &["g", "values", "helpers"];

/// The `n`-th collision suffix: `a`..`z`, `0`..`9`, `aa`, `ab`, ...
/// (bijective base 36 over the alphabet).
pub(crate) fn suffix_for(mut n: u64) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(SUFFIX_ALPHABET[(n % 36) as usize] as char);
        if n < 36 {
            break;
        }
        n = n / 36 - 1;
    }
    digits.iter().rev().collect()
}

/// First name in `base`, `base_a`, `base_b`, ... that is neither reserved
/// nor `taken`.
pub(crate) fn pick_unique_name<F: Fn(&str) -> bool>(base: &str, taken: F) -> String {
    let unavailable = |candidate: &str| RESERVED_NAMES.contains(&candidate) || taken(candidate);
    if !unavailable(base) {
        return base.to_string();
    }
    let mut n = 0u64;
    loop {
        let candidate = format!("{}_{}", base, suffix_for(n));
        if !unavailable(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
