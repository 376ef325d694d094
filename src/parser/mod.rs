//! C source code parser
//!
//! This module transforms C source text into declarations held by a
//! [`state::State`]:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parser`]: Parsing (tokens → declarations)
//! - [`ast`]: Type descriptors, declarations, statements, expressions
//! - [`state`]: Declaration store for one translation session
//!
//! # Supported C Subset
//!
//! - Types: `void`, `char`, `short`, `int`, `long`, `<stdint.h>` fixed-width
//!   integers, pointers, typedefs, structs, unions, enums
//! - Statements: declarations, expression statements, blocks, `if`, `while`,
//!   `return`; `for`, `do-while` and `switch` are parsed but lower to no-ops
//! - Expressions: arithmetic, logical, bitwise, comparisons, ternary,
//!   assignment and compound assignment, increment/decrement, casts, calls,
//!   member access, string/char literals
//! - No preprocessor (directive lines are skipped); no arrays or function
//!   pointers
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one method per binary operator
//! precedence level. No external parser generator dependencies.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod state;

pub use parser::{ParseError, Parser};
pub use state::State;
