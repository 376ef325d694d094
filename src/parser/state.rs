//! Declaration store for one translation session.
//!
//! Owns every parsed declaration and hands out [`DeclId`]s so that later
//! stages can key reverse-lookup tables by declaration identity instead of
//! by pointer. Also performs typedef chain resolution.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use super::ast::{CType, DeclId, EnumDecl, FuncDecl, RecordDecl, TypedefDecl, VarDecl};

/// All declarations of a parsed translation unit, queryable by name.
#[derive(Debug, Default)]
pub struct State {
    pub vars: FxHashMap<String, Rc<VarDecl>>,
    pub typedefs: FxHashMap<String, Rc<TypedefDecl>>,
    pub funcs: FxHashMap<String, Rc<FuncDecl>>,
    pub structs: FxHashMap<String, Rc<RecordDecl>>,
    pub unions: FxHashMap<String, Rc<RecordDecl>>,
    pub enums: FxHashMap<String, Rc<EnumDecl>>,
    next_decl_id: DeclId,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    /// Issue the next declaration identity token.
    pub fn issue_id(&mut self) -> DeclId {
        let id = self.next_decl_id;
        self.next_decl_id += 1;
        id
    }

    pub fn add_var(&mut self, decl: Rc<VarDecl>) {
        self.vars.insert(decl.name.clone(), decl);
    }

    pub fn add_typedef(&mut self, decl: Rc<TypedefDecl>) {
        self.typedefs.insert(decl.name.clone(), decl);
    }

    pub fn add_func(&mut self, decl: Rc<FuncDecl>) {
        self.funcs.insert(decl.name.clone(), decl);
    }

    pub fn add_record(&mut self, decl: Rc<RecordDecl>) {
        if decl.is_union {
            self.unions.insert(decl.name.clone(), decl);
        } else {
            self.structs.insert(decl.name.clone(), decl);
        }
    }

    pub fn add_enum(&mut self, decl: Rc<EnumDecl>) {
        self.enums.insert(decl.name.clone(), decl);
    }

    pub fn record(&self, name: &str, is_union: bool) -> Option<&Rc<RecordDecl>> {
        if is_union {
            self.unions.get(name)
        } else {
            self.structs.get(name)
        }
    }

    /// Chase a typedef chain down to a non-typedef descriptor.
    ///
    /// The chain length bound guards against `typedef a b; typedef b a;`
    /// cycles, which the parser cannot rule out.
    pub fn resolve_typedefs(&self, ty: &CType) -> Result<CType, String> {
        let mut current = ty.clone();
        let mut hops = 0usize;
        while let CType::Typedef(name) = &current {
            let name = name.clone();
            let Some(td) = self.typedefs.get(&name) else {
                return Err(format!("typedef '{}' does not resolve", name));
            };
            hops += 1;
            if hops > 64 {
                return Err(format!("typedef chain through '{}' is cyclic", name));
            }
            current = td.ty.clone();
        }
        Ok(current)
    }
}
