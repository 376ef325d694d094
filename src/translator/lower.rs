//! Lowering: parsed statements to the executable form
//!
//! One [`Lowerer`] exists per function translation. Expressions lower to a
//! [`Form`] paired with the C type the expression carries; statements lower
//! into the environment's block buffers. Typing follows the operand rules
//! the listings make visible: a binary expression carries its left
//! operand's type, a ternary its middle operand's type, comparisons and
//! logical operators carry `int`.
//!
//! Pointer arithmetic is scaled here, at lowering time: the pointee size is
//! baked into the form as a multiplication, so the evaluator only ever sees
//! byte offsets.

use super::env::FuncEnv;
use super::errors::TranslateError;
use super::form::{Form, HelperOp, LoweredStmt, RawUnaryOp};
use super::scope::{GlobalScope, ScopeEntry};
use super::wrap::{HostObject, WrapTable};
use crate::memory::value::Value;
use crate::parser::ast::{BinaryOp, CType, Expr, IncDec, Stmt, StdInt, UnaryOp};
use crate::parser::state::State;
use crate::types::{min_int_type_for, NativeType};

pub(crate) struct Lowerer<'a> {
    pub state: &'a State,
    pub scope: &'a mut GlobalScope,
    pub wraps: &'a WrapTable,
    pub env: FuncEnv,
    pub func: &'a str,
    pub ret: NativeType,
}

impl<'a> Lowerer<'a> {
    fn unsupported(&self, construct: impl Into<String>) -> TranslateError {
        TranslateError::UnsupportedConstruct {
            construct: construct.into(),
            func: self.func.to_string(),
        }
    }

    fn type_err(&self, message: impl Into<String>) -> TranslateError {
        TranslateError::TypeMismatch {
            message: message.into(),
            func: self.func.to_string(),
        }
    }

    pub(crate) fn resolve_type(&self, ty: &CType) -> Result<NativeType, TranslateError> {
        NativeType::resolve(ty, self.state).map_err(|message| self.type_err(message))
    }

    /// The value of an enum variant, if any enum in the session defines it.
    fn enum_variant(&self, name: &str) -> Option<i64> {
        for decl in self.state.enums.values() {
            for (variant, value) in &decl.variants {
                if variant == name {
                    return Some(*value);
                }
            }
        }
        None
    }

    pub fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), TranslateError> {
        match stmt {
            Stmt::Decl(decl) => {
                let ty = self.resolve_type(&decl.ty)?;
                let init = match &decl.init {
                    Some(expr) => {
                        if matches!(ty, NativeType::Record(_)) {
                            return Err(
                                self.type_err("record locals cannot take an initializer")
                            );
                        }
                        let (form, _) = self.lower_expr(expr)?;
                        Form::NewInstance {
                            ty: ty.clone(),
                            init: Some(Box::new(form)),
                        }
                    }
                    None => Form::NewInstance {
                        ty: ty.clone(),
                        init: None,
                    },
                };
                self.env.register_new_var(&decl.name, ty, init);
                Ok(())
            }
            Stmt::Expr(expr) => {
                let (form, _) = self.lower_expr(expr)?;
                self.env.emit(LoweredStmt::Expr(form));
                Ok(())
            }
            Stmt::Block(body) => {
                self.env.push_scope();
                let result = self.lower_stmts(body);
                let lowered = self.env.pop_scope();
                result?;
                self.env.emit(LoweredStmt::Block(lowered));
                Ok(())
            }
            Stmt::While { cond, body } => {
                let (cond_form, _) = self.lower_expr(cond)?;
                self.env.push_scope();
                let result = self.lower_stmts(body);
                let lowered = self.env.pop_scope();
                result?;
                self.env.emit(LoweredStmt::While {
                    cond: cond_form,
                    body: lowered,
                });
                Ok(())
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let (cond_form, _) = self.lower_expr(cond)?;
                self.env.push_scope();
                let result = self.lower_stmts(then_body);
                let lowered_then = self.env.pop_scope();
                result?;
                let lowered_else = match else_body {
                    Some(body) => {
                        self.env.push_scope();
                        let result = self.lower_stmts(body);
                        let lowered = self.env.pop_scope();
                        result?;
                        lowered
                    }
                    None => Vec::new(),
                };
                self.env.emit(LoweredStmt::If {
                    cond: cond_form,
                    then_body: lowered_then,
                    else_body: lowered_else,
                });
                Ok(())
            }
            Stmt::Return { expr, .. } => {
                let returns_void = matches!(self.ret, NativeType::Void);
                if returns_void && expr.is_some() {
                    return Err(self.type_err("'return' carries a value in a void function"));
                }
                if !returns_void && expr.is_none() {
                    return Err(
                        self.type_err("'return' carries no value in a non-void function")
                    );
                }
                let form = match expr {
                    Some(expr) => {
                        let (value, _) = self.lower_expr(expr)?;
                        if matches!(self.ret, NativeType::Record(_)) {
                            // detach from locals before the frame unwinds
                            Form::Helper {
                                op: HelperOp::Copy,
                                target: Box::new(value),
                                operand: None,
                            }
                        } else {
                            // the caller sees the declared return type
                            Form::NewInstance {
                                ty: self.ret.clone(),
                                init: Some(Box::new(value)),
                            }
                        }
                    }
                    None => Form::NewInstance {
                        ty: self.ret.clone(),
                        init: None,
                    },
                };
                self.env.emit(LoweredStmt::Return(form));
                Ok(())
            }
            Stmt::For { .. } | Stmt::DoWhile { .. } | Stmt::Switch { .. } => {
                eprintln!(
                    "warning: {}: {} statement lowers to a no-op",
                    self.func,
                    stmt.kind()
                );
                self.env.emit(LoweredStmt::Nop {
                    construct: stmt.kind(),
                });
                Ok(())
            }
        }
    }

    pub fn lower_stmts(&mut self, stmts: &[Stmt]) -> Result<(), TranslateError> {
        for stmt in stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn lower_expr(&mut self, expr: &Expr) -> Result<(Form, NativeType), TranslateError> {
        match expr {
            Expr::IntLit(value, _) => {
                let ty = NativeType::Int(min_int_type_for(*value));
                Ok((
                    Form::NewInstance {
                        ty: ty.clone(),
                        init: Some(Box::new(Form::IntConst(*value))),
                    },
                    ty,
                ))
            }
            Expr::CharLit(c, _) => Ok((
                Form::NewInstance {
                    ty: NativeType::Char,
                    init: Some(Box::new(Form::IntConst(*c as i128))),
                },
                NativeType::Char,
            )),
            Expr::StrLit(s, _) => Ok((
                Form::StrConst(s.clone()),
                NativeType::Ptr(Box::new(NativeType::Char)),
            )),
            Expr::Ident(name, _) => self.lower_ident(name),
            Expr::Member {
                base,
                field,
                arrow,
                ..
            } => {
                if *arrow {
                    return Err(self.unsupported("'->' member access"));
                }
                let (base_form, base_ty) = self.lower_expr(base)?;
                let layout = match &base_ty {
                    NativeType::Record(layout) => layout.clone(),
                    other => {
                        return Err(self.type_err(format!(
                            "member access on non-record type '{}'",
                            other.name()
                        )));
                    }
                };
                let field_ty = layout.field(field).cloned().ok_or_else(|| {
                    TranslateError::MissingField {
                        record: base_ty.name(),
                        field: field.clone(),
                        func: self.func.to_string(),
                    }
                })?;
                Ok((
                    Form::Member {
                        base: Box::new(base_form),
                        field: field.clone(),
                    },
                    field_ty,
                ))
            }
            Expr::Call { callee, args, .. } => self.lower_call(callee, args),
            Expr::Cast { ty, expr, .. } => {
                let target = self.resolve_type(ty)?;
                if matches!(target, NativeType::Record(_)) {
                    return Err(self.type_err(format!("cannot cast to '{}'", target.name())));
                }
                let (form, _) = self.lower_expr(expr)?;
                Ok((
                    Form::NewInstance {
                        ty: target.clone(),
                        init: Some(Box::new(form)),
                    },
                    target,
                ))
            }
            Expr::Unary { op, expr, .. } => self.lower_unary(*op, expr),
            Expr::IncDec {
                op, postfix, expr, ..
            } => self.lower_incdec(*op, *postfix, expr),
            Expr::Binary {
                op, left, right, ..
            } => self.lower_binary(*op, left, right),
            Expr::Logical {
                op, left, right, ..
            } => {
                let (left_form, _) = self.lower_expr(left)?;
                let (right_form, _) = self.lower_expr(right)?;
                let ty = NativeType::Int(StdInt::I32);
                Ok((
                    Form::NewInstance {
                        ty: ty.clone(),
                        init: Some(Box::new(Form::Logical {
                            op: *op,
                            left: Box::new(left_form),
                            right: Box::new(right_form),
                        })),
                    },
                    ty,
                ))
            }
            Expr::Compare {
                op, left, right, ..
            } => {
                let (left_form, _) = self.lower_expr(left)?;
                let (right_form, _) = self.lower_expr(right)?;
                let ty = NativeType::Int(StdInt::I32);
                Ok((
                    Form::NewInstance {
                        ty: ty.clone(),
                        init: Some(Box::new(Form::Compare {
                            op: *op,
                            left: Box::new(left_form),
                            right: Box::new(right_form),
                        })),
                    },
                    ty,
                ))
            }
            Expr::Assign { target, value, .. } => {
                let (target_form, target_ty) = self.lower_lvalue(target)?;
                let (value_form, _) = self.lower_expr(value)?;
                Ok((
                    Form::Helper {
                        op: HelperOp::Assign,
                        target: Box::new(target_form),
                        operand: Some(Box::new(value_form)),
                    },
                    target_ty,
                ))
            }
            Expr::AugAssign {
                op, target, value, ..
            } => {
                let (target_form, target_ty) = self.lower_lvalue(target)?;
                let (value_form, _) = self.lower_expr(value)?;
                let helper = match &target_ty {
                    NativeType::Ptr(pointee) => match op {
                        BinaryOp::Add | BinaryOp::Sub => HelperOp::AugAssignPtr {
                            op: *op,
                            step: pointee.size_of() as u64,
                        },
                        other => {
                            return Err(self.type_err(format!(
                                "'{}=' is not defined for pointers",
                                other.symbol()
                            )));
                        }
                    },
                    _ => HelperOp::AugAssign(*op),
                };
                Ok((
                    Form::Helper {
                        op: helper,
                        target: Box::new(target_form),
                        operand: Some(Box::new(value_form)),
                    },
                    target_ty,
                ))
            }
            Expr::Ternary {
                cond,
                then_val,
                else_val,
                ..
            } => {
                let (cond_form, _) = self.lower_expr(cond)?;
                let (then_form, then_ty) = self.lower_expr(then_val)?;
                let (else_form, _) = self.lower_expr(else_val)?;
                Ok((
                    Form::Ternary {
                        cond: Box::new(cond_form),
                        then_val: Box::new(then_form),
                        else_val: Box::new(else_form),
                    },
                    then_ty,
                ))
            }
        }
    }

    fn lower_ident(&mut self, name: &str) -> Result<(Form, NativeType), TranslateError> {
        if let Some((generated, ty)) = self.env.lookup(name) {
            return Ok((Form::LocalRef(generated), ty));
        }
        if let Some(value) = self.enum_variant(name) {
            let ty = NativeType::Int(StdInt::I32);
            return Ok((
                Form::NewInstance {
                    ty: ty.clone(),
                    init: Some(Box::new(Form::IntConst(value as i128))),
                },
                ty,
            ));
        }
        match self.scope.resolve(self.state, name) {
            Some((generated, ScopeEntry::Var(decl))) => {
                let ty = self.resolve_type(&decl.ty)?;
                Ok((Form::GlobalRef(generated), ty))
            }
            Some((_, ScopeEntry::Type(_))) => {
                Err(self.type_err(format!("'{}' names a type, not a value", name)))
            }
            Some((_, ScopeEntry::Func(_))) => {
                Err(self.unsupported(format!("taking function '{}' as a value", name)))
            }
            Some((generated, ScopeEntry::Wrapped(token))) => {
                match self.wraps.get(token) {
                    Some(HostObject::Value(cell)) => {
                        let ty = native_type_of_value(&cell.borrow())
                            .map_err(|message| self.type_err(message))?;
                        Ok((Form::GlobalRef(generated), ty))
                    }
                    Some(HostObject::Callable(_)) => Err(self.unsupported(format!(
                        "taking host callable '{}' as a value",
                        name
                    ))),
                    None => Err(TranslateError::UnresolvedIdentifier {
                        name: name.to_string(),
                        func: self.func.to_string(),
                    }),
                }
            }
            None => Err(TranslateError::UnresolvedIdentifier {
                name: name.to_string(),
                func: self.func.to_string(),
            }),
        }
    }

    fn lower_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
    ) -> Result<(Form, NativeType), TranslateError> {
        let Expr::Ident(name, _) = callee else {
            return Err(self.unsupported("indirect call"));
        };
        if self.env.lookup(name).is_some() {
            return Err(self.unsupported(format!("calling local '{}'", name)));
        }
        let mut lowered_args = Vec::with_capacity(args.len());
        for arg in args {
            let (form, _) = self.lower_expr(arg)?;
            lowered_args.push(form);
        }
        match self.scope.resolve(self.state, name) {
            Some((generated, ScopeEntry::Func(decl))) => {
                if decl.params.len() != lowered_args.len() {
                    return Err(TranslateError::ArityMismatch {
                        func: decl.name.clone(),
                        expected: decl.params.len(),
                        got: lowered_args.len(),
                    });
                }
                let ret = self.resolve_type(&decl.ret)?;
                Ok((
                    Form::Call {
                        name: generated,
                        args: lowered_args,
                    },
                    ret,
                ))
            }
            Some((generated, ScopeEntry::Wrapped(token))) => match self.wraps.get(token) {
                Some(HostObject::Callable(_)) => Ok((
                    Form::Call {
                        name: generated,
                        args: lowered_args,
                    },
                    // host callables carry no declared return type
                    NativeType::Int(StdInt::I64),
                )),
                _ => Err(self.type_err(format!("'{}' is not callable", name))),
            },
            Some((_, ScopeEntry::Var(_))) | Some((_, ScopeEntry::Type(_))) => {
                Err(self.type_err(format!("'{}' is not callable", name)))
            }
            None => Err(TranslateError::UnresolvedIdentifier {
                name: name.to_string(),
                func: self.func.to_string(),
            }),
        }
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        expr: &Expr,
    ) -> Result<(Form, NativeType), TranslateError> {
        match op {
            UnaryOp::Deref => Err(self.unsupported("pointer dereference")),
            UnaryOp::AddrOf => Err(self.unsupported("address-of")),
            UnaryOp::Plus => self.lower_expr(expr),
            UnaryOp::BitNot | UnaryOp::Neg => {
                let raw_op = if op == UnaryOp::BitNot {
                    RawUnaryOp::BitNot
                } else {
                    RawUnaryOp::Neg
                };
                let (form, ty) = self.lower_expr(expr)?;
                if matches!(ty, NativeType::Record(_) | NativeType::Void) {
                    return Err(self.type_err(format!(
                        "unary '{}' on non-scalar type '{}'",
                        op.symbol(),
                        ty.name()
                    )));
                }
                Ok((
                    Form::NewInstance {
                        ty: ty.clone(),
                        init: Some(Box::new(Form::Unary {
                            op: raw_op,
                            expr: Box::new(form),
                        })),
                    },
                    ty,
                ))
            }
            UnaryOp::Not => {
                let (form, _) = self.lower_expr(expr)?;
                let ty = NativeType::Int(StdInt::I32);
                Ok((
                    Form::NewInstance {
                        ty: ty.clone(),
                        init: Some(Box::new(Form::Unary {
                            op: RawUnaryOp::Not,
                            expr: Box::new(form),
                        })),
                    },
                    ty,
                ))
            }
        }
    }

    fn lower_incdec(
        &mut self,
        op: IncDec,
        postfix: bool,
        expr: &Expr,
    ) -> Result<(Form, NativeType), TranslateError> {
        let (target, ty) = self.lower_lvalue(expr)?;
        let helper = match (&ty, op, postfix) {
            (NativeType::Ptr(pointee), IncDec::Inc, false) => HelperOp::PrefixIncPtr {
                step: pointee.size_of() as u64,
            },
            (NativeType::Ptr(pointee), IncDec::Dec, false) => HelperOp::PrefixDecPtr {
                step: pointee.size_of() as u64,
            },
            (NativeType::Ptr(pointee), IncDec::Inc, true) => HelperOp::PostfixIncPtr {
                step: pointee.size_of() as u64,
            },
            (NativeType::Ptr(pointee), IncDec::Dec, true) => HelperOp::PostfixDecPtr {
                step: pointee.size_of() as u64,
            },
            (_, IncDec::Inc, false) => HelperOp::PrefixInc,
            (_, IncDec::Dec, false) => HelperOp::PrefixDec,
            (_, IncDec::Inc, true) => HelperOp::PostfixInc,
            (_, IncDec::Dec, true) => HelperOp::PostfixDec,
        };
        Ok((
            Form::Helper {
                op: helper,
                target: Box::new(target),
                operand: None,
            },
            ty,
        ))
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<(Form, NativeType), TranslateError> {
        let (left_form, left_ty) = self.lower_expr(left)?;
        let (right_form, right_ty) = self.lower_expr(right)?;
        let left_ptr = matches!(left_ty, NativeType::Ptr(_));
        let right_ptr = matches!(right_ty, NativeType::Ptr(_));

        // pointer difference: element count, not bytes
        if left_ptr && right_ptr && op == BinaryOp::Sub {
            let step = left_ty
                .pointee()
                .map(NativeType::size_of)
                .unwrap_or(1)
                .max(1);
            let ty = NativeType::Int(StdInt::I64);
            let diff = Form::Binary {
                op: BinaryOp::Div,
                left: Box::new(Form::Binary {
                    op: BinaryOp::Sub,
                    left: Box::new(left_form),
                    right: Box::new(right_form),
                }),
                right: Box::new(Form::IntConst(step as i128)),
            };
            return Ok((
                Form::NewInstance {
                    ty: ty.clone(),
                    init: Some(Box::new(diff)),
                },
                ty,
            ));
        }

        // pointer +/- integer: scale the integer side by the pointee size
        if left_ptr && matches!(op, BinaryOp::Add | BinaryOp::Sub) && !right_ptr {
            let step = left_ty.pointee().map(NativeType::size_of).unwrap_or(1);
            return Ok((
                scaled_ptr_form(op, left_form, right_form, step, &left_ty),
                left_ty,
            ));
        }
        if right_ptr && op == BinaryOp::Add && !left_ptr {
            let step = right_ty.pointee().map(NativeType::size_of).unwrap_or(1);
            return Ok((
                scaled_ptr_form(op, right_form, left_form, step, &right_ty),
                right_ty,
            ));
        }

        if left_ptr || right_ptr {
            return Err(self.type_err(format!(
                "'{}' is not defined for pointer operands",
                op.symbol()
            )));
        }
        if matches!(left_ty, NativeType::Record(_) | NativeType::Void) {
            return Err(self.type_err(format!(
                "'{}' on non-scalar type '{}'",
                op.symbol(),
                left_ty.name()
            )));
        }
        Ok((
            Form::NewInstance {
                ty: left_ty.clone(),
                init: Some(Box::new(Form::Binary {
                    op,
                    left: Box::new(left_form),
                    right: Box::new(right_form),
                })),
            },
            left_ty,
        ))
    }

    /// Lower an expression that must denote storage.
    fn lower_lvalue(&mut self, expr: &Expr) -> Result<(Form, NativeType), TranslateError> {
        let (form, ty) = self.lower_expr(expr)?;
        match form {
            Form::LocalRef(_) | Form::GlobalRef(_) | Form::Member { .. } => Ok((form, ty)),
            _ => Err(self.type_err(format!("{} is not assignable", expr.kind()))),
        }
    }
}

fn scaled_ptr_form(
    op: BinaryOp,
    ptr_form: Form,
    int_form: Form,
    step: usize,
    ptr_ty: &NativeType,
) -> Form {
    Form::NewInstance {
        ty: ptr_ty.clone(),
        init: Some(Box::new(Form::Binary {
            op,
            left: Box::new(ptr_form),
            right: Box::new(Form::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Form::IntConst(step as i128)),
                right: Box::new(int_form),
            }),
        })),
    }
}

/// Native type of a host-wrapped value, for typing extern identifiers.
fn native_type_of_value(value: &Value) -> Result<NativeType, String> {
    match value {
        Value::I8(_) => Ok(NativeType::Int(StdInt::I8)),
        Value::I16(_) => Ok(NativeType::Int(StdInt::I16)),
        Value::I32(_) => Ok(NativeType::Int(StdInt::I32)),
        Value::I64(_) => Ok(NativeType::Int(StdInt::I64)),
        Value::U8(_) => Ok(NativeType::Int(StdInt::U8)),
        Value::U16(_) => Ok(NativeType::Int(StdInt::U16)),
        Value::U32(_) => Ok(NativeType::Int(StdInt::U32)),
        Value::U64(_) => Ok(NativeType::Int(StdInt::U64)),
        Value::Char(_) => Ok(NativeType::Char),
        Value::Ptr(_) => Ok(NativeType::Ptr(Box::new(NativeType::Void))),
        Value::Struct(_) => Err("wrapped record values carry no declared type".into()),
        Value::Unit => Ok(NativeType::Void),
    }
}
