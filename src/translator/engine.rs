//! Translation session
//!
//! [`Translator`] owns everything one session needs: the declaration store,
//! the global scope, wrapped host objects, the argument buffer arena and the
//! per-function translation cache. Functions translate on demand, the first
//! time they are invoked or called, and the compiled form is cached for the
//! session's lifetime.

use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

use super::env::FuncEnv;
use super::errors::TranslateError;
use super::exec;
use super::form::{render_func, Form, LoweredStmt};
use super::lower::Lowerer;
use super::scope::GlobalScope;
use super::wrap::{HostArg, HostFn, HostObject, WrapTable};
use crate::memory::heap::Heap;
use crate::memory::value::{cell, Cell, Value};
use crate::parser::ast::FuncDecl;
use crate::parser::parser::Parser;
use crate::parser::state::State;
use crate::types::{int_value, min_int_type_for, NativeType};

/// Default size of the argument buffer arena.
pub const DEFAULT_BUFFER_LIMIT: usize = 1 << 20;

/// Lifetime policy for argument buffers backing string and sequence
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPolicy {
    /// Buffers are discarded after each invocation. Pointers into them must
    /// not be retained across calls.
    Call,
    /// Buffers live for the whole session, so addresses handed out by one
    /// invocation stay readable in later ones.
    Session,
}

/// One function translated into executable form.
#[derive(Debug)]
pub struct CompiledFunc {
    pub name: String,
    /// Generated parameter names with their declared types, in order.
    pub params: Vec<(String, NativeType)>,
    pub ret: NativeType,
    pub body: Vec<LoweredStmt>,
    pub listing: String,
    /// False when the declaration had no body at translation time.
    pub available: bool,
}

/// A translation session.
pub struct Translator {
    pub(crate) state: State,
    pub(crate) scope: GlobalScope,
    pub(crate) wraps: WrapTable,
    pub(crate) heap: Heap,
    pub(crate) cache: FxHashMap<String, Rc<CompiledFunc>>,
    in_progress: FxHashSet<String>,
    policy: BufferPolicy,
    buffer_limit: usize,
}

impl Translator {
    pub fn new() -> Self {
        Translator {
            state: State::new(),
            scope: GlobalScope::new(),
            wraps: WrapTable::new(),
            heap: Heap::new(DEFAULT_BUFFER_LIMIT),
            cache: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            policy: BufferPolicy::Session,
            buffer_limit: DEFAULT_BUFFER_LIMIT,
        }
    }

    /// Parse a translation unit and start a session over it.
    pub fn from_source(source: &str) -> Result<Self, TranslateError> {
        let mut translator = Translator::new();
        translator.add_source(source)?;
        Ok(translator)
    }

    /// Parse additional source into the session. Later declarations shadow
    /// earlier ones of the same name; compiled functions are re-translated
    /// on their next use so a definition arriving late takes effect.
    pub fn add_source(&mut self, source: &str) -> Result<(), TranslateError> {
        let state = std::mem::take(&mut self.state);
        let parser = Parser::with_state(source, state)?;
        self.state = parser.parse_unit()?;
        self.cache.clear();
        Ok(())
    }

    pub fn set_buffer_policy(&mut self, policy: BufferPolicy) {
        self.policy = policy;
    }

    pub fn set_buffer_limit(&mut self, limit: usize) {
        self.buffer_limit = limit;
        self.heap = Heap::new(limit);
    }

    /// Expose a host value cell under a preferred name. Registering the
    /// same cell again returns its existing scope name.
    pub fn register_host_cell(&mut self, preferred: Option<&str>, storage: Cell) -> String {
        let token = self.wraps.intern(HostObject::Value(storage));
        self.scope.register_extern(&self.state, preferred, token)
    }

    /// Expose a host value under a preferred name. The value is moved into
    /// a fresh cell; use [`Self::register_host_cell`] to keep a handle on
    /// the storage.
    pub fn register_host_value(&mut self, preferred: Option<&str>, value: Value) -> String {
        self.register_host_cell(preferred, cell(value))
    }

    /// Expose a host callable under a preferred name. Registering the same
    /// closure again returns its existing scope name.
    pub fn register_host_callable(&mut self, preferred: Option<&str>, f: HostFn) -> String {
        let token = self.wraps.intern(HostObject::Callable(f));
        self.scope.register_extern(&self.state, preferred, token)
    }

    /// Translate a function into executable form, caching the result.
    pub fn translate(&mut self, name: &str) -> Result<Rc<CompiledFunc>, TranslateError> {
        if let Some(compiled) = self.cache.get(name) {
            return Ok(compiled.clone());
        }
        if self.in_progress.contains(name) {
            return Err(TranslateError::CyclicTranslation {
                name: name.to_string(),
            });
        }
        let decl = self
            .state
            .funcs
            .get(name)
            .cloned()
            .ok_or_else(|| TranslateError::NotFound {
                name: name.to_string(),
            })?;
        self.in_progress.insert(name.to_string());
        let result = self.lower_func(&decl);
        self.in_progress.remove(name);
        let compiled = Rc::new(result?);
        self.cache.insert(name.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Listing of a function's executable form.
    pub fn dump_source(&mut self, name: &str) -> Result<String, TranslateError> {
        Ok(self.translate(name)?.listing.clone())
    }

    /// Invoke a function by name with host arguments.
    pub fn invoke(&mut self, name: &str, args: &[HostArg]) -> Result<Value, TranslateError> {
        let compiled = self.translate(name)?;
        if !compiled.available {
            return Err(TranslateError::NotAvailable {
                name: name.to_string(),
            });
        }
        if compiled.params.len() != args.len() {
            return Err(TranslateError::ArityMismatch {
                func: name.to_string(),
                expected: compiled.params.len(),
                got: args.len(),
            });
        }
        let mut frame = exec::Frame::new();
        for (index, ((param, ty), arg)) in compiled.params.iter().zip(args).enumerate() {
            let storage = self.coerce_arg(name, index, ty, arg)?;
            frame.locals.insert(param.clone(), storage);
        }
        let result = exec::call_compiled(self, &compiled, frame);
        if self.policy == BufferPolicy::Call {
            self.heap = Heap::new(self.buffer_limit);
        }
        result
    }

    /// Read back bytes from an argument buffer, for callers that passed a
    /// string or sequence and want to observe what the function did to it.
    pub fn read_buffer(&self, address: u64, len: usize) -> Result<Vec<u8>, TranslateError> {
        self.heap
            .read_bytes(address, len)
            .map(|bytes| bytes.to_vec())
            .map_err(|message| TranslateError::Evaluation { message })
    }

    fn coerce_arg(
        &mut self,
        func: &str,
        index: usize,
        ty: &NativeType,
        arg: &HostArg,
    ) -> Result<Cell, TranslateError> {
        let coercion_err = |message: String| TranslateError::ArgumentCoercion {
            func: func.to_string(),
            index,
            message,
        };
        match arg {
            HostArg::Int(v) => {
                if matches!(ty, NativeType::Record(_)) {
                    return Err(coercion_err(format!(
                        "integer passed for parameter of type '{}'",
                        ty.name()
                    )));
                }
                // smallest fitting signed width; the parameter's own binding
                // then narrows it to the declared type
                Ok(cell(int_value(min_int_type_for(*v), *v)))
            }
            HostArg::Null => match ty {
                NativeType::Ptr(_) => Ok(cell(Value::Ptr(0))),
                other => Err(coercion_err(format!(
                    "null passed for non-pointer parameter of type '{}'",
                    other.name()
                ))),
            },
            HostArg::Str(s) => match ty {
                NativeType::Ptr(_) => {
                    let address = self.heap.allocate_c_string(s).map_err(|_| {
                        TranslateError::OutOfMemory {
                            requested: s.len() + 1,
                            limit: self.heap.max_size(),
                        }
                    })?;
                    Ok(cell(Value::Ptr(address)))
                }
                other => Err(coercion_err(format!(
                    "string passed for non-pointer parameter of type '{}'",
                    other.name()
                ))),
            },
            HostArg::Seq(elems) => {
                let pointee = match ty {
                    NativeType::Ptr(pointee) => pointee.as_ref().clone(),
                    other => {
                        return Err(coercion_err(format!(
                            "sequence passed for non-pointer parameter of type '{}'",
                            other.name()
                        )));
                    }
                };
                let mut values = Vec::with_capacity(elems.len());
                for elem in elems {
                    match elem {
                        HostArg::Int(v) => {
                            values.push(pointee.from_raw(*v).map_err(&coercion_err)?)
                        }
                        other => {
                            return Err(coercion_err(format!(
                                "sequence elements must be integers, found {:?}",
                                other
                            )));
                        }
                    }
                }
                let elem_size = pointee.size_of();
                let requested = (values.len() + 1) * elem_size;
                let address = self
                    .heap
                    .allocate_sequence(&values, elem_size)
                    .map_err(|_| TranslateError::OutOfMemory {
                        requested,
                        limit: self.heap.max_size(),
                    })?;
                Ok(cell(Value::Ptr(address)))
            }
        }
    }

    fn lower_func(&mut self, decl: &Rc<FuncDecl>) -> Result<CompiledFunc, TranslateError> {
        let ret = NativeType::resolve(&decl.ret, &self.state).map_err(|message| {
            TranslateError::TypeMismatch {
                message,
                func: decl.name.clone(),
            }
        })?;
        // pull the function into the scope under its own name
        self.scope.resolve(&self.state, &decl.name);

        let Some(body) = &decl.body else {
            eprintln!(
                "warning: function '{}' is declared without a body; invocation will report it as unavailable",
                decl.name
            );
            let mut params = Vec::with_capacity(decl.params.len());
            for param in &decl.params {
                let ty = NativeType::resolve(&param.ty, &self.state).map_err(|message| {
                    TranslateError::TypeMismatch {
                        message,
                        func: decl.name.clone(),
                    }
                })?;
                params.push((param.name.clone(), ty));
            }
            let listing = render_func(&decl.name, &params, &ret, &[], false);
            return Ok(CompiledFunc {
                name: decl.name.clone(),
                params,
                ret,
                body: Vec::new(),
                listing,
                available: false,
            });
        };

        let mut lowerer = Lowerer {
            state: &self.state,
            scope: &mut self.scope,
            wraps: &self.wraps,
            env: FuncEnv::new(),
            func: &decl.name,
            ret: ret.clone(),
        };
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = lowerer.resolve_type(&param.ty)?;
            let generated = lowerer.env.register_param(&param.name, ty.clone());
            params.push((generated, ty));
        }
        lowerer.lower_stmts(body)?;
        let mut stmts = lowerer.env.pop_scope();

        let ends_with_return = stmts
            .iter()
            .rev()
            .find(|s| !matches!(s, LoweredStmt::Unbind { .. }))
            .map_or(false, |s| matches!(s, LoweredStmt::Return(_)));
        if !ends_with_return {
            stmts.push(LoweredStmt::Return(Form::NewInstance {
                ty: ret.clone(),
                init: None,
            }));
        }

        let listing = render_func(&decl.name, &params, &ret, &stmts, true);
        Ok(CompiledFunc {
            name: decl.name.clone(),
            params,
            ret,
            body: stmts,
            listing,
            available: true,
        })
    }
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new()
    }
}
