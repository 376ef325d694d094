//! Bridge from parsed C type descriptors to native storage shapes
//!
//! A [`NativeType`] is a [`crate::parser::ast::CType`] with every typedef
//! chased, every record definition resolved into a [`RecordLayout`], and an
//! exact width attached. The translator computes these once per lowering and
//! bakes the resulting sizes into the executable form, so the evaluator never
//! consults the declaration store.
//!
//! Struct layout follows the common 64-bit data model: each field aligned to
//! its natural alignment, total size rounded up to the widest alignment.
//! Unions overlay every field at offset zero.

use std::rc::Rc;

use crate::memory::value::{cell, Value};
use crate::parser::ast::{Builtin, CType, StdInt};
use crate::parser::state::State;

/// Resolved layout of a struct or union.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    pub name: String,
    pub is_union: bool,
    pub fields: Vec<(String, NativeType)>,
    pub size: usize,
    pub align: usize,
}

impl RecordLayout {
    pub fn field(&self, name: &str) -> Option<&NativeType> {
        self.fields
            .iter()
            .find(|(f, _)| f == name)
            .map(|(_, ty)| ty)
    }
}

/// A fully resolved type with native width semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeType {
    Int(StdInt),
    Char,
    Void,
    Ptr(Box<NativeType>),
    Record(Rc<RecordLayout>),
}

impl NativeType {
    /// Resolve a parsed type descriptor against the declaration store.
    pub fn resolve(ty: &CType, state: &State) -> Result<NativeType, String> {
        let ty = state.resolve_typedefs(ty)?;
        match ty {
            CType::Builtin(Builtin::Void) => Ok(NativeType::Void),
            CType::Builtin(Builtin::Char) => Ok(NativeType::Char),
            CType::Builtin(Builtin::Short) => Ok(NativeType::Int(StdInt::I16)),
            CType::Builtin(Builtin::Int) => Ok(NativeType::Int(StdInt::I32)),
            CType::Builtin(Builtin::Long) => Ok(NativeType::Int(StdInt::I64)),
            CType::StdInt(k) => Ok(NativeType::Int(k)),
            CType::Ptr(pointee) => Ok(NativeType::Ptr(Box::new(NativeType::resolve(
                &pointee, state,
            )?))),
            CType::Struct(name) => Self::resolve_record(&name, false, state),
            CType::Union(name) => Self::resolve_record(&name, true, state),
            // Enums carry int width; variant values become plain literals
            // at lowering time.
            CType::Enum(_) => Ok(NativeType::Int(StdInt::I32)),
            CType::Typedef(name) => Err(format!("typedef '{}' survived resolution", name)),
        }
    }

    fn resolve_record(name: &str, is_union: bool, state: &State) -> Result<NativeType, String> {
        let decl = state.record(name, is_union).ok_or_else(|| {
            format!(
                "{} '{}' is not defined",
                if is_union { "union" } else { "struct" },
                name
            )
        })?;
        let mut fields = Vec::with_capacity(decl.fields.len());
        let mut size = 0usize;
        let mut align = 1usize;
        for field in &decl.fields {
            let fty = NativeType::resolve(&field.ty, state)?;
            let fsize = fty.size_of();
            let falign = fty.align_of();
            align = align.max(falign);
            if is_union {
                size = size.max(fsize);
            } else {
                // pad to the field's natural alignment
                size = (size + falign - 1) / falign * falign;
                size += fsize;
            }
            fields.push((field.name.clone(), fty));
        }
        size = (size + align - 1) / align * align;
        Ok(NativeType::Record(Rc::new(RecordLayout {
            name: name.to_string(),
            is_union,
            fields,
            size,
            align,
        })))
    }

    /// Storage size in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            NativeType::Int(k) => match k {
                StdInt::I8 | StdInt::U8 => 1,
                StdInt::I16 | StdInt::U16 => 2,
                StdInt::I32 | StdInt::U32 => 4,
                StdInt::I64 | StdInt::U64 => 8,
            },
            NativeType::Char => 1,
            NativeType::Void => 1, // so that void* arithmetic steps by one byte
            NativeType::Ptr(_) => 8,
            NativeType::Record(layout) => layout.size,
        }
    }

    /// Natural alignment in bytes.
    pub fn align_of(&self) -> usize {
        match self {
            NativeType::Record(layout) => layout.align,
            NativeType::Void => 1,
            other => other.size_of(),
        }
    }

    /// Pointee type, if this is a pointer.
    pub fn pointee(&self) -> Option<&NativeType> {
        match self {
            NativeType::Ptr(p) => Some(p),
            _ => None,
        }
    }

    /// A fresh zero instance of this type. Records get a fresh cell per
    /// field, recursively zeroed.
    pub fn zero(&self) -> Result<Value, String> {
        match self {
            NativeType::Int(k) => Ok(int_value(*k, 0)),
            NativeType::Char => Ok(Value::Char(0)),
            NativeType::Void => Ok(Value::Unit),
            NativeType::Ptr(_) => Ok(Value::Ptr(0)),
            NativeType::Record(layout) => {
                let mut fields = rustc_hash::FxHashMap::default();
                for (name, fty) in &layout.fields {
                    fields.insert(name.clone(), cell(fty.zero()?));
                }
                Ok(Value::Struct(fields))
            }
        }
    }

    /// Build an instance of this type from a raw quantity, truncating to
    /// the type's width.
    pub fn from_raw(&self, raw: i128) -> Result<Value, String> {
        match self {
            NativeType::Int(k) => Ok(int_value(*k, raw)),
            NativeType::Char => Ok(Value::Char(raw as i8)),
            NativeType::Void => Ok(Value::Unit),
            NativeType::Ptr(_) => Ok(Value::Ptr(raw as u64)),
            NativeType::Record(layout) => Err(format!(
                "cannot build {} '{}' from a scalar",
                if layout.is_union { "union" } else { "struct" },
                layout.name
            )),
        }
    }

    /// Display name, matching the C spelling.
    pub fn name(&self) -> String {
        match self {
            NativeType::Int(k) => k.name().to_string(),
            NativeType::Char => "char".into(),
            NativeType::Void => "void".into(),
            NativeType::Ptr(p) => format!("{}*", p.name()),
            NativeType::Record(layout) => {
                if layout.is_union {
                    format!("union {}", layout.name)
                } else {
                    format!("struct {}", layout.name)
                }
            }
        }
    }
}

/// Build an integer value of the given width from a raw quantity.
pub fn int_value(kind: StdInt, raw: i128) -> Value {
    match kind {
        StdInt::I8 => Value::I8(raw as i8),
        StdInt::I16 => Value::I16(raw as i16),
        StdInt::I32 => Value::I32(raw as i32),
        StdInt::I64 => Value::I64(raw as i64),
        StdInt::U8 => Value::U8(raw as u8),
        StdInt::U16 => Value::U16(raw as u16),
        StdInt::U32 => Value::U32(raw as u32),
        StdInt::U64 => Value::U64(raw as u64),
    }
}

/// Smallest signed fixed-width integer type that can hold `value`.
/// Quantities past the 64-bit range settle on `int64_t`.
pub fn min_int_type_for(value: i128) -> StdInt {
    if i8::try_from(value).is_ok() {
        StdInt::I8
    } else if i16::try_from(value).is_ok() {
        StdInt::I16
    } else if i32::try_from(value).is_ok() {
        StdInt::I32
    } else {
        StdInt::I64
    }
}
