//! Host objects and the wrap table
//!
//! Host values and callables made visible to translated code are stored in
//! an arena ([`WrapTable`]) and referred to by [`WrapToken`]. Interning is by
//! object identity, so registering the same cell or closure twice hands back
//! the same token, which in turn keeps its generated scope name stable.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use crate::memory::value::Cell;

/// Arguments a host caller can pass to [`crate::translator::Translator::invoke`].
#[derive(Debug, Clone)]
pub enum HostArg {
    /// An integer, converted to the parameter's declared width.
    Int(i128),
    /// Serialized into a NUL-terminated buffer; the parameter sees a pointer.
    Str(String),
    /// Serialized element-wise into a buffer with one zeroed trailing
    /// element; the parameter sees a pointer to the first element.
    Seq(Vec<HostArg>),
    /// The null pointer.
    Null,
}

/// A host-provided function callable from translated code.
pub type HostFn = Rc<dyn Fn(&[Cell]) -> Result<Cell, String>>;

/// An object the host has injected into the global scope.
#[derive(Clone)]
pub enum HostObject {
    Value(Cell),
    Callable(HostFn),
}

impl std::fmt::Debug for HostObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostObject::Value(cell) => f.debug_tuple("Value").field(&cell.borrow()).finish(),
            HostObject::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Stable handle to a wrapped host object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WrapToken(u32);

/// Identity-interning arena of host objects.
#[derive(Debug, Default)]
pub struct WrapTable {
    entries: Vec<HostObject>,
    by_identity: FxHashMap<usize, WrapToken>,
}

impl WrapTable {
    pub fn new() -> Self {
        WrapTable::default()
    }

    /// Intern an object, reusing the token of an already-wrapped one.
    pub fn intern(&mut self, obj: HostObject) -> WrapToken {
        let key = match &obj {
            HostObject::Value(cell) => Rc::as_ptr(cell) as usize,
            HostObject::Callable(f) => Rc::as_ptr(f) as *const () as usize,
        };
        if let Some(token) = self.by_identity.get(&key) {
            return *token;
        }
        let token = WrapToken(self.entries.len() as u32);
        self.entries.push(obj);
        self.by_identity.insert(key, token);
        token
    }

    pub fn get(&self, token: WrapToken) -> Option<&HostObject> {
        self.entries.get(token.0 as usize)
    }
}
