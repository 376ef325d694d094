//! Translation and invocation engine
//!
//! This module turns parsed function bodies into an executable form and
//! runs them:
//! - [`engine`]: the session object ([`Translator`]) with the translation
//!   cache, argument coercion and the invoke entry point
//! - [`lower`]: lowering of parsed statements into the executable form
//! - [`form`]: the executable form itself, plus the listing renderer
//! - [`exec`]: the evaluator that runs lowered bodies
//! - [`scope`]: the lazily-populated global namespace and name generation
//! - [`env`]: per-function block scoping during lowering
//! - [`wrap`]: host values and callables injected into the scope
//! - [`errors`]: translation and invocation error types
//!
//! # Translation Model
//!
//! Functions translate on demand and stay cached for the session. A body
//! lowers once, with type widths and pointer steps baked in; invocation
//! evaluates the lowered form against shared mutable cells. Callees
//! translate lazily at their first call, so recursive and mutually
//! recursive functions translate without special handling.

pub mod engine;
pub mod env;
pub mod errors;
pub mod exec;
pub mod form;
pub mod lower;
pub mod scope;
pub mod wrap;

pub use engine::{BufferPolicy, CompiledFunc, Translator, DEFAULT_BUFFER_LIMIT};
pub use errors::TranslateError;
pub use wrap::{HostArg, HostFn, HostObject};
