//! Evaluator for the executable form
//!
//! Walks the lowered statements of one call frame. Expressions evaluate to
//! a [`Slot`]: either a shared cell or a raw quantity. All width handling
//! happens when a raw lands in a typed cell; arithmetic itself runs in
//! `i128` and wraps on store.
//!
//! Callees translate lazily here, on their first call, which is what makes
//! direct and mutual recursion work: the caller's own translation finished
//! before its body ever runs.

use rustc_hash::FxHashMap;

use super::engine::{CompiledFunc, Translator};
use super::errors::TranslateError;
use super::form::{Form, HelperOp, LoweredStmt, RawUnaryOp};
use super::scope::ScopeEntry;
use super::wrap::HostObject;
use crate::memory::value::{cell, Cell, Value};
use crate::parser::ast::{BinaryOp, CompareOp, LogicalOp};

/// Local bindings of one invocation, keyed by generated name.
pub(crate) struct Frame {
    pub locals: FxHashMap<String, Cell>,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            locals: FxHashMap::default(),
        }
    }
}

/// Result of evaluating a form.
pub(crate) enum Slot {
    Cell(Cell),
    Raw(i128),
}

impl Slot {
    fn raw(&self) -> Result<i128, TranslateError> {
        match self {
            Slot::Cell(storage) => storage.borrow().raw().map_err(eval_err),
            Slot::Raw(v) => Ok(*v),
        }
    }

    fn into_cell(self) -> Result<Cell, TranslateError> {
        match self {
            Slot::Cell(storage) => Ok(storage),
            Slot::Raw(v) => Err(eval_err(format!(
                "raw quantity {} used where a value was required",
                v
            ))),
        }
    }
}

/// Control flow out of a statement.
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

fn eval_err(message: impl Into<String>) -> TranslateError {
    TranslateError::Evaluation {
        message: message.into(),
    }
}

/// Run a compiled function over a seeded frame.
pub(crate) fn call_compiled(
    tr: &mut Translator,
    compiled: &CompiledFunc,
    mut frame: Frame,
) -> Result<Value, TranslateError> {
    match exec_stmts(tr, &mut frame, &compiled.body)? {
        Flow::Return(value) => Ok(value),
        // lowering appends an implicit return, but a body can still be empty
        Flow::Normal => compiled.ret.zero().map_err(eval_err),
    }
}

fn exec_stmts(
    tr: &mut Translator,
    frame: &mut Frame,
    stmts: &[LoweredStmt],
) -> Result<Flow, TranslateError> {
    for stmt in stmts {
        match exec_stmt(tr, frame, stmt)? {
            Flow::Normal => {}
            flow @ Flow::Return(_) => return Ok(flow),
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(
    tr: &mut Translator,
    frame: &mut Frame,
    stmt: &LoweredStmt,
) -> Result<Flow, TranslateError> {
    match stmt {
        LoweredStmt::Bind { name, init } => {
            let storage = eval(tr, frame, init)?.into_cell()?;
            frame.locals.insert(name.clone(), storage);
            Ok(Flow::Normal)
        }
        LoweredStmt::Unbind { name } => {
            frame.locals.remove(name);
            Ok(Flow::Normal)
        }
        LoweredStmt::Expr(form) => {
            eval(tr, frame, form)?;
            Ok(Flow::Normal)
        }
        LoweredStmt::If {
            cond,
            then_body,
            else_body,
        } => {
            if eval(tr, frame, cond)?.raw()? != 0 {
                exec_stmts(tr, frame, then_body)
            } else {
                exec_stmts(tr, frame, else_body)
            }
        }
        LoweredStmt::While { cond, body } => {
            while eval(tr, frame, cond)?.raw()? != 0 {
                match exec_stmts(tr, frame, body)? {
                    Flow::Normal => {}
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        }
        LoweredStmt::Block(body) => exec_stmts(tr, frame, body),
        LoweredStmt::Return(form) => {
            let value = match eval(tr, frame, form)? {
                Slot::Cell(storage) => storage.borrow().clone(),
                Slot::Raw(v) => Value::I64(v as i64),
            };
            Ok(Flow::Return(value))
        }
        LoweredStmt::Nop { .. } => Ok(Flow::Normal),
    }
}

fn eval(tr: &mut Translator, frame: &mut Frame, form: &Form) -> Result<Slot, TranslateError> {
    match form {
        Form::IntConst(v) => Ok(Slot::Raw(*v)),
        Form::StrConst(s) => {
            let address =
                tr.heap
                    .intern_c_string(s)
                    .map_err(|_| TranslateError::OutOfMemory {
                        requested: s.len() + 1,
                        limit: tr.heap.max_size(),
                    })?;
            Ok(Slot::Cell(cell(Value::Ptr(address))))
        }
        Form::NewInstance { ty, init } => {
            let value = match init {
                None => ty.zero().map_err(eval_err)?,
                Some(init) => {
                    let raw = eval(tr, frame, init)?.raw()?;
                    ty.from_raw(raw).map_err(eval_err)?
                }
            };
            Ok(Slot::Cell(cell(value)))
        }
        Form::LocalRef(name) => frame
            .locals
            .get(name)
            .cloned()
            .map(Slot::Cell)
            .ok_or_else(|| eval_err(format!("local '{}' is not bound", name))),
        Form::GlobalRef(name) => {
            let entry = tr.scope.entry(name).cloned();
            match entry {
                Some(ScopeEntry::Var(_)) => {
                    let storage = tr
                        .scope
                        .global_cell(&tr.state, name)
                        .map_err(eval_err)?;
                    Ok(Slot::Cell(storage))
                }
                Some(ScopeEntry::Wrapped(token)) => match tr.wraps.get(token) {
                    Some(HostObject::Value(storage)) => Ok(Slot::Cell(storage.clone())),
                    _ => Err(eval_err(format!("'{}' is not a value", name))),
                },
                Some(ScopeEntry::Func(_)) => {
                    Err(eval_err(format!("function '{}' used as a value", name)))
                }
                Some(ScopeEntry::Type(_)) => {
                    Err(eval_err(format!("type '{}' used as a value", name)))
                }
                None => Err(eval_err(format!("scope entry '{}' vanished", name))),
            }
        }
        Form::Member { base, field } => {
            let storage = eval(tr, frame, base)?.into_cell()?;
            let field_cell = storage.borrow().field(field);
            field_cell
                .map(Slot::Cell)
                .ok_or_else(|| eval_err(format!("value has no field '{}'", field)))
        }
        Form::Helper {
            op,
            target,
            operand,
        } => eval_helper(tr, frame, op, target, operand.as_deref()),
        Form::Binary { op, left, right } => {
            let l = eval(tr, frame, left)?.raw()?;
            let r = eval(tr, frame, right)?.raw()?;
            Ok(Slot::Raw(apply_binop(*op, l, r).map_err(eval_err)?))
        }
        Form::Compare { op, left, right } => {
            let l = eval(tr, frame, left)?.raw()?;
            let r = eval(tr, frame, right)?.raw()?;
            let holds = match op {
                CompareOp::Eq => l == r,
                CompareOp::Ne => l != r,
                CompareOp::Lt => l < r,
                CompareOp::Le => l <= r,
                CompareOp::Gt => l > r,
                CompareOp::Ge => l >= r,
            };
            Ok(Slot::Raw(holds as i128))
        }
        Form::Logical { op, left, right } => {
            let l = eval(tr, frame, left)?.raw()?;
            let result = match op {
                LogicalOp::And => {
                    if l == 0 {
                        0
                    } else {
                        (eval(tr, frame, right)?.raw()? != 0) as i128
                    }
                }
                LogicalOp::Or => {
                    if l != 0 {
                        1
                    } else {
                        (eval(tr, frame, right)?.raw()? != 0) as i128
                    }
                }
            };
            Ok(Slot::Raw(result))
        }
        Form::Unary { op, expr } => {
            let raw = eval(tr, frame, expr)?.raw()?;
            let result = match op {
                RawUnaryOp::BitNot => !raw,
                RawUnaryOp::Neg => raw.wrapping_neg(),
                RawUnaryOp::Not => (raw == 0) as i128,
            };
            Ok(Slot::Raw(result))
        }
        Form::Ternary {
            cond,
            then_val,
            else_val,
        } => {
            if eval(tr, frame, cond)?.raw()? != 0 {
                eval(tr, frame, then_val)
            } else {
                eval(tr, frame, else_val)
            }
        }
        Form::Call { name, args } => {
            let mut cells = Vec::with_capacity(args.len());
            for arg in args {
                cells.push(eval(tr, frame, arg)?.into_cell()?);
            }
            let entry = tr.scope.entry(name).cloned();
            match entry {
                Some(ScopeEntry::Func(decl)) => {
                    let compiled = tr.translate(&decl.name)?;
                    if !compiled.available {
                        return Err(TranslateError::NotAvailable {
                            name: decl.name.clone(),
                        });
                    }
                    let mut callee_frame = Frame::new();
                    for ((param, _), storage) in compiled.params.iter().zip(cells) {
                        callee_frame.locals.insert(param.clone(), storage);
                    }
                    let value = call_compiled(tr, &compiled, callee_frame)?;
                    Ok(Slot::Cell(cell(value)))
                }
                Some(ScopeEntry::Wrapped(token)) => {
                    let callable = match tr.wraps.get(token) {
                        Some(HostObject::Callable(f)) => f.clone(),
                        _ => return Err(eval_err(format!("'{}' is not callable", name))),
                    };
                    let result = callable(&cells).map_err(eval_err)?;
                    Ok(Slot::Cell(result))
                }
                _ => Err(eval_err(format!("'{}' is not callable", name))),
            }
        }
    }
}

fn eval_helper(
    tr: &mut Translator,
    frame: &mut Frame,
    op: &HelperOp,
    target: &Form,
    operand: Option<&Form>,
) -> Result<Slot, TranslateError> {
    let target = eval(tr, frame, target)?.into_cell()?;
    match op {
        HelperOp::Copy => {
            let copied = deep_copy_value(&target.borrow());
            Ok(Slot::Cell(cell(copied)))
        }
        HelperOp::Assign => {
            let value = operand_slot(tr, frame, operand)?;
            store(&target, &value)?;
            Ok(Slot::Cell(target))
        }
        HelperOp::AugAssign(binop) => {
            let rhs = operand_slot(tr, frame, operand)?.raw()?;
            let lhs = target.borrow().raw().map_err(eval_err)?;
            let result = apply_binop(*binop, lhs, rhs).map_err(eval_err)?;
            target.borrow_mut().assign_raw(result).map_err(eval_err)?;
            Ok(Slot::Cell(target))
        }
        HelperOp::AugAssignPtr { op: binop, step } => {
            let rhs = operand_slot(tr, frame, operand)?.raw()?;
            let lhs = target.borrow().raw().map_err(eval_err)?;
            let offset = rhs.wrapping_mul(*step as i128);
            let result = apply_binop(*binop, lhs, offset).map_err(eval_err)?;
            target.borrow_mut().assign_raw(result).map_err(eval_err)?;
            Ok(Slot::Cell(target))
        }
        HelperOp::PrefixInc => step_cell(&target, 1, false),
        HelperOp::PrefixDec => step_cell(&target, -1, false),
        HelperOp::PostfixInc => step_cell(&target, 1, true),
        HelperOp::PostfixDec => step_cell(&target, -1, true),
        HelperOp::PrefixIncPtr { step } => step_cell(&target, *step as i128, false),
        HelperOp::PrefixDecPtr { step } => step_cell(&target, -(*step as i128), false),
        HelperOp::PostfixIncPtr { step } => step_cell(&target, *step as i128, true),
        HelperOp::PostfixDecPtr { step } => step_cell(&target, -(*step as i128), true),
    }
}

fn operand_slot(
    tr: &mut Translator,
    frame: &mut Frame,
    operand: Option<&Form>,
) -> Result<Slot, TranslateError> {
    match operand {
        Some(form) => eval(tr, frame, form),
        None => Err(eval_err("helper is missing its operand")),
    }
}

/// Advance a cell by `delta`; postfix variants hand back the old value in a
/// fresh cell, prefix variants the mutated cell itself.
fn step_cell(target: &Cell, delta: i128, postfix: bool) -> Result<Slot, TranslateError> {
    let old = target.borrow().raw().map_err(eval_err)?;
    target
        .borrow_mut()
        .assign_raw(old.wrapping_add(delta))
        .map_err(eval_err)?;
    if postfix {
        let mut detached = deep_copy_value(&target.borrow());
        detached.assign_raw(old).map_err(eval_err)?;
        Ok(Slot::Cell(cell(detached)))
    } else {
        Ok(Slot::Cell(target.clone()))
    }
}

/// Store a value into a target cell: scalar content by raw quantity, record
/// content field by field.
fn store(target: &Cell, value: &Slot) -> Result<(), TranslateError> {
    let is_record = matches!(&*target.borrow(), Value::Struct(_));
    if !is_record {
        let raw = value.raw()?;
        return target.borrow_mut().assign_raw(raw).map_err(eval_err);
    }
    let source = match value {
        Slot::Cell(storage) => storage.clone(),
        Slot::Raw(_) => return Err(eval_err("cannot store a raw quantity into a record")),
    };
    // collect field pairs first so aliasing targets never hold two borrows
    let pairs: Vec<(Cell, Cell)> = {
        let target_val = target.borrow();
        let source_val = source.borrow();
        let (Value::Struct(target_fields), Value::Struct(source_fields)) =
            (&*target_val, &*source_val)
        else {
            return Err(eval_err("record assignment requires record operands"));
        };
        let mut pairs = Vec::with_capacity(target_fields.len());
        for (name, tcell) in target_fields {
            let scell = source_fields
                .get(name)
                .ok_or_else(|| eval_err(format!("source record has no field '{}'", name)))?;
            pairs.push((tcell.clone(), scell.clone()));
        }
        pairs
    };
    for (tcell, scell) in pairs {
        store(&tcell, &Slot::Cell(scell))?;
    }
    Ok(())
}

fn deep_copy_value(value: &Value) -> Value {
    match value {
        Value::Struct(fields) => Value::Struct(
            fields
                .iter()
                .map(|(name, storage)| (name.clone(), cell(deep_copy_value(&storage.borrow()))))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn apply_binop(op: BinaryOp, l: i128, r: i128) -> Result<i128, String> {
    match op {
        BinaryOp::Add => Ok(l.wrapping_add(r)),
        BinaryOp::Sub => Ok(l.wrapping_sub(r)),
        BinaryOp::Mul => Ok(l.wrapping_mul(r)),
        BinaryOp::Div => {
            if r == 0 {
                Err("division by zero".into())
            } else {
                Ok(l.wrapping_div(r))
            }
        }
        BinaryOp::Mod => {
            if r == 0 {
                Err("remainder by zero".into())
            } else {
                Ok(l.wrapping_rem(r))
            }
        }
        BinaryOp::Shl => {
            if !(0..128).contains(&r) {
                Err(format!("shift amount {} out of range", r))
            } else {
                Ok(l.wrapping_shl(r as u32))
            }
        }
        BinaryOp::Shr => {
            if !(0..128).contains(&r) {
                Err(format!("shift amount {} out of range", r))
            } else {
                Ok(l.wrapping_shr(r as u32))
            }
        }
        BinaryOp::BitOr => Ok(l | r),
        BinaryOp::BitXor => Ok(l ^ r),
        BinaryOp::BitAnd => Ok(l & r),
    }
}
