//! Runtime value representation
//!
//! This module defines the [`Value`] enum, a tagged rendition of native C
//! storage. Each integer variant carries exactly the bits of its C
//! counterpart, so width and signedness behavior (truncation on store,
//! wrap-around, sign extension on widening) fall out of the Rust integer
//! types rather than being simulated.
//!
//! # Value Types
//!
//! - [`Value::I8`] .. [`Value::I64`]: signed fixed-width integers
//! - [`Value::U8`] .. [`Value::U64`]: unsigned fixed-width integers
//! - [`Value::Char`]: 8-bit signed character (distinct from `I8` so that
//!   listings and diagnostics can tell `char` and `int8_t` apart)
//! - [`Value::Ptr`]: 64-bit memory address
//! - [`Value::Struct`]: named fields, each its own shared cell
//! - [`Value::Unit`]: the `void` result of expressions with no value
//!
//! # Cells
//!
//! Expressions evaluate to shared, mutable cells ([`Cell`]). Assignment and
//! increment helpers mutate the cell in place, so a value bound to a name and
//! the value an expression produced can alias the same storage, matching how
//! lvalues behave natively.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Memory address type (64-bit)
pub type Address = u64;

/// A shared, mutable slot holding one runtime value.
pub type Cell = Rc<RefCell<Value>>;

/// Wrap a value into a fresh cell.
pub fn cell(value: Value) -> Cell {
    Rc::new(RefCell::new(value))
}

/// Runtime values with native widths.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Char(i8),
    Ptr(Address),
    Struct(FxHashMap<String, Cell>),
    #[default]
    Unit,
}

impl Value {
    /// Widen to a raw arithmetic quantity. Signed variants sign-extend,
    /// unsigned variants zero-extend, and pointers yield their address.
    pub fn raw(&self) -> Result<i128, String> {
        match self {
            Value::I8(v) => Ok(*v as i128),
            Value::I16(v) => Ok(*v as i128),
            Value::I32(v) => Ok(*v as i128),
            Value::I64(v) => Ok(*v as i128),
            Value::U8(v) => Ok(*v as i128),
            Value::U16(v) => Ok(*v as i128),
            Value::U32(v) => Ok(*v as i128),
            Value::U64(v) => Ok(*v as i128),
            Value::Char(v) => Ok(*v as i128),
            Value::Ptr(addr) => Ok(*addr as i128),
            Value::Struct(_) => Err("a struct value has no scalar content".into()),
            Value::Unit => Err("a void value has no scalar content".into()),
        }
    }

    /// Store a raw quantity into this value, truncating to the variant's
    /// width. Out-of-range quantities wrap, as a native store would.
    pub fn assign_raw(&mut self, raw: i128) -> Result<(), String> {
        match self {
            Value::I8(v) => *v = raw as i8,
            Value::I16(v) => *v = raw as i16,
            Value::I32(v) => *v = raw as i32,
            Value::I64(v) => *v = raw as i64,
            Value::U8(v) => *v = raw as u8,
            Value::U16(v) => *v = raw as u16,
            Value::U32(v) => *v = raw as u32,
            Value::U64(v) => *v = raw as u64,
            Value::Char(v) => *v = raw as i8,
            Value::Ptr(addr) => *addr = raw as u64,
            Value::Struct(_) => return Err("cannot store a scalar into a struct value".into()),
            Value::Unit => return Err("cannot store a scalar into a void value".into()),
        }
        Ok(())
    }

    /// Get the pointer address, if this value is a pointer.
    pub fn as_ptr(&self) -> Option<Address> {
        match self {
            Value::Ptr(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Fetch a struct field cell by name.
    pub fn field(&self, name: &str) -> Option<Cell> {
        match self {
            Value::Struct(fields) => fields.get(name).cloned(),
            _ => None,
        }
    }

    /// Storage width in bytes.
    pub fn size(&self) -> usize {
        match self {
            Value::I8(_) | Value::U8(_) | Value::Char(_) => 1,
            Value::I16(_) | Value::U16(_) => 2,
            Value::I32(_) | Value::U32(_) => 4,
            Value::I64(_) | Value::U64(_) | Value::Ptr(_) => 8,
            Value::Struct(_) | Value::Unit => 0,
        }
    }

    /// Little-endian byte image of a scalar value, for serialization into
    /// argument buffers.
    pub fn to_le_bytes(&self) -> Result<Vec<u8>, String> {
        match self {
            Value::I8(v) => Ok(v.to_le_bytes().to_vec()),
            Value::I16(v) => Ok(v.to_le_bytes().to_vec()),
            Value::I32(v) => Ok(v.to_le_bytes().to_vec()),
            Value::I64(v) => Ok(v.to_le_bytes().to_vec()),
            Value::U8(v) => Ok(v.to_le_bytes().to_vec()),
            Value::U16(v) => Ok(v.to_le_bytes().to_vec()),
            Value::U32(v) => Ok(v.to_le_bytes().to_vec()),
            Value::U64(v) => Ok(v.to_le_bytes().to_vec()),
            Value::Char(v) => Ok(v.to_le_bytes().to_vec()),
            Value::Ptr(addr) => Ok(addr.to_le_bytes().to_vec()),
            Value::Struct(_) => Err("cannot serialize a struct value".into()),
            Value::Unit => Err("cannot serialize a void value".into()),
        }
    }

    /// Human-readable type tag, for diagnostics and listings.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::I8(_) => "int8_t",
            Value::I16(_) => "int16_t",
            Value::I32(_) => "int32_t",
            Value::I64(_) => "int64_t",
            Value::U8(_) => "uint8_t",
            Value::U16(_) => "uint16_t",
            Value::U32(_) => "uint32_t",
            Value::U64(_) => "uint64_t",
            Value::Char(_) => "char",
            Value::Ptr(_) => "ptr",
            Value::Struct(_) => "struct",
            Value::Unit => "void",
        }
    }
}
