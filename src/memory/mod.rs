//! Native-accurate memory model
//!
//! This module provides the storage abstractions the translator runs on:
//! - [`value`]: tagged runtime values with exact native widths, held in
//!   shared mutable cells
//! - [`heap`]: buffer arena backing host string and sequence arguments
//!
//! # Type Sizes
//!
//! Widths follow the common 64-bit data model:
//! - `char`: 1 byte, signed
//! - `short`: 2 bytes, `int`: 4 bytes, `long`: 8 bytes
//! - fixed-width `<stdint.h>` types: their stated widths
//! - pointers: 8 bytes regardless of pointee type
//!
//! # Pointer Arithmetic
//!
//! Pointer arithmetic is scaled by pointee size at lowering time:
//! ```text
//! ptr + n  →  ptr + (n * sizeof(*ptr))
//! ```
//! so the evaluator only ever adds raw byte offsets.

pub mod heap;
pub mod value;

pub use heap::Heap;
pub use value::{cell, Address, Cell, Value};
