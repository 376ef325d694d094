//! Executable form of a lowered function body
//!
//! A function body lowers into a tree of [`Form`] expressions and
//! [`LoweredStmt`] statements. All type widths, pointer step sizes and scope
//! names are baked in at lowering time; evaluation only moves raw quantities
//! and cells around.
//!
//! The form can be rendered back into a readable listing for inspection.
//! Listings use three reserved names: `g` (the global scope), `values`
//! (typed instance construction) and `helpers` (in-place mutation helpers).

use crate::parser::ast::{BinaryOp, CompareOp, LogicalOp};
use crate::types::NativeType;

/// In-place mutation helpers. Pointer variants carry the byte step the
/// pointee size dictates.
#[derive(Debug, Clone, PartialEq)]
pub enum HelperOp {
    /// Detach: a fresh cell holding a copy of the operand's value.
    Copy,
    PrefixInc,
    PrefixDec,
    PostfixInc,
    PostfixDec,
    PrefixIncPtr { step: u64 },
    PrefixDecPtr { step: u64 },
    PostfixIncPtr { step: u64 },
    PostfixDecPtr { step: u64 },
    /// Store the operand's content into the target cell.
    Assign,
    AugAssign(BinaryOp),
    AugAssignPtr { op: BinaryOp, step: u64 },
}

impl HelperOp {
    fn name(&self) -> String {
        match self {
            HelperOp::Copy => "copy".into(),
            HelperOp::PrefixInc => "prefix_inc".into(),
            HelperOp::PrefixDec => "prefix_dec".into(),
            HelperOp::PostfixInc => "postfix_inc".into(),
            HelperOp::PostfixDec => "postfix_dec".into(),
            HelperOp::PrefixIncPtr { step } => format!("prefix_inc_ptr<{}>", step),
            HelperOp::PrefixDecPtr { step } => format!("prefix_dec_ptr<{}>", step),
            HelperOp::PostfixIncPtr { step } => format!("postfix_inc_ptr<{}>", step),
            HelperOp::PostfixDecPtr { step } => format!("postfix_dec_ptr<{}>", step),
            HelperOp::Assign => "assign".into(),
            HelperOp::AugAssign(op) => format!("aug_assign<{}>", op.symbol()),
            HelperOp::AugAssignPtr { op, step } => {
                format!("aug_assign_ptr<{}, {}>", op.symbol(), step)
            }
        }
    }
}

/// Unary raw operators surviving into the executable form. `&` and `*`
/// never lower; unary `+` lowers to its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawUnaryOp {
    BitNot,
    Neg,
    Not,
}

impl RawUnaryOp {
    fn symbol(self) -> &'static str {
        match self {
            RawUnaryOp::BitNot => "~",
            RawUnaryOp::Neg => "-",
            RawUnaryOp::Not => "!",
        }
    }
}

/// An expression of the executable form. Evaluates to either a shared cell
/// or a raw quantity.
#[derive(Debug, Clone)]
pub enum Form {
    /// Raw integer constant.
    IntConst(i128),
    /// String literal: a NUL-terminated buffer, evaluated to its address.
    StrConst(String),
    /// A fresh typed instance; without an initializer, zeroed.
    NewInstance {
        ty: NativeType,
        init: Option<Box<Form>>,
    },
    /// A local binding, by generated name.
    LocalRef(String),
    /// A global scope entry, by generated name.
    GlobalRef(String),
    /// A struct field cell of the base value.
    Member { base: Box<Form>, field: String },
    Helper {
        op: HelperOp,
        target: Box<Form>,
        operand: Option<Box<Form>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Form>,
        right: Box<Form>,
    },
    Compare {
        op: CompareOp,
        left: Box<Form>,
        right: Box<Form>,
    },
    /// Short-circuit: the right operand is evaluated only when needed.
    Logical {
        op: LogicalOp,
        left: Box<Form>,
        right: Box<Form>,
    },
    Unary {
        op: RawUnaryOp,
        expr: Box<Form>,
    },
    /// Lazy in both branches.
    Ternary {
        cond: Box<Form>,
        then_val: Box<Form>,
        else_val: Box<Form>,
    },
    /// Call through a global scope entry (translated function or wrapped
    /// host callable).
    Call { name: String, args: Vec<Form> },
}

/// A statement of the executable form.
#[derive(Debug, Clone)]
pub enum LoweredStmt {
    /// Introduce a local binding. The initializer must produce a cell.
    Bind { name: String, init: Form },
    /// Remove a binding at the end of its block.
    Unbind { name: String },
    Expr(Form),
    If {
        cond: Form,
        then_body: Vec<LoweredStmt>,
        else_body: Vec<LoweredStmt>,
    },
    While {
        cond: Form,
        body: Vec<LoweredStmt>,
    },
    Block(Vec<LoweredStmt>),
    Return(Form),
    /// A recognized construct that deliberately lowers to nothing.
    Nop { construct: &'static str },
}

// --- listing renderer ---

pub fn render_form(form: &Form) -> String {
    match form {
        Form::IntConst(v) => v.to_string(),
        Form::StrConst(s) => format!("{:?}", s),
        Form::NewInstance { ty, init: None } => format!("values.zero::<{}>()", ty.name()),
        Form::NewInstance {
            ty,
            init: Some(init),
        } => format!("values.new::<{}>({})", ty.name(), render_form(init)),
        Form::LocalRef(name) => name.clone(),
        Form::GlobalRef(name) => format!("g.{}", name),
        Form::Member { base, field } => format!("{}.{}", render_form(base), field),
        Form::Helper {
            op,
            target,
            operand,
        } => match operand {
            Some(operand) => format!(
                "helpers.{}({}, {})",
                op.name(),
                render_form(target),
                render_form(operand)
            ),
            None => format!("helpers.{}({})", op.name(), render_form(target)),
        },
        Form::Binary { op, left, right } => format!(
            "({} {} {})",
            render_form(left),
            op.symbol(),
            render_form(right)
        ),
        Form::Compare { op, left, right } => format!(
            "({} {} {})",
            render_form(left),
            op.symbol(),
            render_form(right)
        ),
        Form::Logical { op, left, right } => format!(
            "({} {} {})",
            render_form(left),
            op.symbol(),
            render_form(right)
        ),
        Form::Unary { op, expr } => format!("({}{})", op.symbol(), render_form(expr)),
        Form::Ternary {
            cond,
            then_val,
            else_val,
        } => format!(
            "({} ? {} : {})",
            render_form(cond),
            render_form(then_val),
            render_form(else_val)
        ),
        Form::Call { name, args } => {
            let rendered: Vec<String> = args.iter().map(render_form).collect();
            format!("g.{}({})", name, rendered.join(", "))
        }
    }
}

fn render_stmt(stmt: &LoweredStmt, indent: usize, out: &mut String) {
    let pad = "    ".repeat(indent);
    match stmt {
        LoweredStmt::Bind { name, init } => {
            out.push_str(&format!("{}let {} = {};\n", pad, name, render_form(init)));
        }
        LoweredStmt::Unbind { name } => {
            out.push_str(&format!("{}drop({});\n", pad, name));
        }
        LoweredStmt::Expr(form) => {
            out.push_str(&format!("{}{};\n", pad, render_form(form)));
        }
        LoweredStmt::If {
            cond,
            then_body,
            else_body,
        } => {
            out.push_str(&format!("{}if {} {{\n", pad, render_form(cond)));
            for s in then_body {
                render_stmt(s, indent + 1, out);
            }
            if else_body.is_empty() {
                out.push_str(&format!("{}}}\n", pad));
            } else {
                out.push_str(&format!("{}}} else {{\n", pad));
                for s in else_body {
                    render_stmt(s, indent + 1, out);
                }
                out.push_str(&format!("{}}}\n", pad));
            }
        }
        LoweredStmt::While { cond, body } => {
            out.push_str(&format!("{}while {} {{\n", pad, render_form(cond)));
            for s in body {
                render_stmt(s, indent + 1, out);
            }
            out.push_str(&format!("{}}}\n", pad));
        }
        LoweredStmt::Block(body) => {
            out.push_str(&format!("{}{{\n", pad));
            for s in body {
                render_stmt(s, indent + 1, out);
            }
            out.push_str(&format!("{}}}\n", pad));
        }
        LoweredStmt::Return(form) => {
            out.push_str(&format!("{}return {};\n", pad, render_form(form)));
        }
        LoweredStmt::Nop { construct } => {
            out.push_str(&format!("{}/* {}: not translated */;\n", pad, construct));
        }
    }
}

/// Render a whole translated function as a listing.
pub fn render_func(
    name: &str,
    params: &[(String, NativeType)],
    ret: &NativeType,
    body: &[LoweredStmt],
    available: bool,
) -> String {
    let rendered_params: Vec<String> = params
        .iter()
        .map(|(p, ty)| format!("{} {}", ty.name(), p))
        .collect();
    let mut out = format!("{} {}({}) {{\n", ret.name(), name, rendered_params.join(", "));
    if !available {
        out.push_str("    /* definition not available */;\n");
    }
    for stmt in body {
        render_stmt(stmt, 1, &mut out);
    }
    out.push_str("}\n");
    out
}
