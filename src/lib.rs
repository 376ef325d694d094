//! # Introduction
//!
//! ccall parses a subset of C, lowers individual function bodies into an
//! executable form on demand, and invokes them by name with host-native
//! arguments. No compiler or toolchain is involved; the point is to call
//! one function out of a translation unit without building the unit.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → Declarations → Lowering → Executable form → Invoke
//! ```
//!
//! 1. [`parser`] — tokenises the source and collects declarations.
//! 2. [`types`] — resolves declared types into native storage shapes with
//!    exact widths and struct layout.
//! 3. [`memory`] — the value model: tagged values with native widths in
//!    shared mutable cells, plus the buffer arena backing string and
//!    sequence arguments.
//! 4. [`translator`] — lowers bodies lazily, caches the result, and
//!    evaluates them; host values and callables can be injected into the
//!    global scope.
//!
//! ## Example
//!
//! ```no_run
//! use ccall::translator::{HostArg, Translator};
//!
//! let mut session = Translator::from_source(
//!     "int add(int a, int b) { return a + b; }",
//! ).unwrap();
//! let result = session.invoke("add", &[HostArg::Int(3), HostArg::Int(4)]).unwrap();
//! assert_eq!(result.raw().unwrap(), 7);
//! ```

pub mod memory;
pub mod parser;
pub mod translator;
pub mod types;

pub use memory::value::Value;
pub use translator::{BufferPolicy, HostArg, TranslateError, Translator};
