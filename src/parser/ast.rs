// AST definitions: C type descriptors, declarations, statements and expressions.

use std::fmt;
use std::rc::Rc;

/// Stable identity of a declaration, issued by the declaration store.
/// Used for reverse name lookup (declaration -> generated name).
pub type DeclId = u32;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Builtin primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Void,
    Char,
    Short,
    Int,
    Long,
}

/// Fixed-width integer types (`<stdint.h>` names)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdInt {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl StdInt {
    pub fn name(self) -> &'static str {
        match self {
            StdInt::I8 => "int8_t",
            StdInt::I16 => "int16_t",
            StdInt::I32 => "int32_t",
            StdInt::I64 => "int64_t",
            StdInt::U8 => "uint8_t",
            StdInt::U16 => "uint16_t",
            StdInt::U32 => "uint32_t",
            StdInt::U64 => "uint64_t",
        }
    }

    pub fn from_name(name: &str) -> Option<StdInt> {
        match name {
            "int8_t" => Some(StdInt::I8),
            "int16_t" => Some(StdInt::I16),
            "int32_t" => Some(StdInt::I32),
            "int64_t" => Some(StdInt::I64),
            "uint8_t" => Some(StdInt::U8),
            "uint16_t" => Some(StdInt::U16),
            "uint32_t" => Some(StdInt::U32),
            "uint64_t" => Some(StdInt::U64),
            _ => None,
        }
    }
}

/// Abstract C type descriptor.
///
/// Typedef descriptors must resolve, transitively, to a non-typedef
/// descriptor through the declaration store.
#[derive(Debug, Clone, PartialEq)]
pub enum CType {
    Builtin(Builtin),
    StdInt(StdInt),
    Ptr(Box<CType>),
    Typedef(String),
    Struct(String),
    Union(String),
    Enum(String),
}

impl CType {
    pub fn ptr_to(pointee: CType) -> CType {
        CType::Ptr(Box::new(pointee))
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Builtin(Builtin::Void) => write!(f, "void"),
            CType::Builtin(Builtin::Char) => write!(f, "char"),
            CType::Builtin(Builtin::Short) => write!(f, "short"),
            CType::Builtin(Builtin::Int) => write!(f, "int"),
            CType::Builtin(Builtin::Long) => write!(f, "long"),
            CType::StdInt(k) => write!(f, "{}", k.name()),
            CType::Ptr(p) => write!(f, "{}*", p),
            CType::Typedef(n) => write!(f, "{}", n),
            CType::Struct(n) => write!(f, "struct {}", n),
            CType::Union(n) => write!(f, "union {}", n),
            CType::Enum(n) => write!(f, "enum {}", n),
        }
    }
}

/// Variable declaration (global or local), with an optional initializer.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub id: DeclId,
    pub name: String,
    pub ty: CType,
    pub init: Option<Expr>,
}

/// Function parameter declaration. The name may be empty in a prototype.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub id: DeclId,
    pub name: String,
    pub ty: CType,
}

/// Function declaration. An absent body means the definition has not been
/// seen yet ("not yet available"); this is a soft condition, not an error.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub id: DeclId,
    pub name: String,
    pub ret: CType,
    pub params: Vec<Rc<ParamDecl>>,
    pub body: Option<Vec<Stmt>>,
}

/// Struct or union field
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: CType,
}

/// Struct or union definition
#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub is_union: bool,
}

/// Enum definition with explicit variant values
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<(String, i64)>,
}

/// Typedef: a name bound to another type descriptor
#[derive(Debug, Clone)]
pub struct TypedefDecl {
    pub id: DeclId,
    pub name: String,
    pub ty: CType,
}

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    BitNot, // ~x
    Not,    // !x
    Plus,   // +x
    Neg,    // -x
    Deref,  // *x
    AddrOf, // &x
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
        }
    }
}

/// Increment/decrement, prefix or postfix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDec {
    Inc,
    Dec,
}

/// Binary arithmetic/bitwise operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
        }
    }
}

/// Short-circuit logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    IntLit(i128, SourceLocation),
    CharLit(i8, SourceLocation),
    StrLit(String, SourceLocation),
    Ident(String, SourceLocation),
    Member {
        base: Box<Expr>,
        field: String,
        arrow: bool,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    Cast {
        ty: CType,
        expr: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        location: SourceLocation,
    },
    IncDec {
        op: IncDec,
        postfix: bool,
        expr: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    AugAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Ternary {
        cond: Box<Expr>,
        then_val: Box<Expr>,
        else_val: Box<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Short description of the expression kind, for error reporting.
    pub fn kind(&self) -> String {
        match self {
            Expr::IntLit(..) => "integer literal".into(),
            Expr::CharLit(..) => "char literal".into(),
            Expr::StrLit(..) => "string literal".into(),
            Expr::Ident(name, _) => format!("identifier '{}'", name),
            Expr::Member { field, arrow, .. } => {
                if *arrow {
                    format!("'->' member access '{}'", field)
                } else {
                    format!("member access '{}'", field)
                }
            }
            Expr::Call { .. } => "call".into(),
            Expr::Cast { ty, .. } => format!("cast to '{}'", ty),
            Expr::Unary { op, .. } => format!("unary '{}'", op.symbol()),
            Expr::IncDec { postfix, .. } => {
                if *postfix {
                    "postfix increment/decrement".into()
                } else {
                    "prefix increment/decrement".into()
                }
            }
            Expr::Binary { op, .. } => format!("binary '{}'", op.symbol()),
            Expr::Logical { op, .. } => format!("logical '{}'", op.symbol()),
            Expr::Compare { op, .. } => format!("comparison '{}'", op.symbol()),
            Expr::Assign { .. } => "assignment".into(),
            Expr::AugAssign { op, .. } => format!("compound assignment '{}='", op.symbol()),
            Expr::Ternary { .. } => "ternary".into(),
        }
    }
}

/// One `case`/`default` arm of a switch statement. Parsed for completeness;
/// switch lowering is an explicit no-op.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: Option<Expr>, // None for `default:`
    pub body: Vec<Stmt>,
}

/// Statements
#[derive(Debug, Clone)]
pub enum Stmt {
    Decl(Rc<VarDecl>),
    Expr(Expr),
    Block(Vec<Stmt>),
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    Switch {
        expr: Expr,
        cases: Vec<SwitchCase>,
    },
    Return {
        expr: Option<Expr>,
        location: SourceLocation,
    },
}

impl Stmt {
    /// Short description of the statement kind, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Decl(_) => "declaration",
            Stmt::Expr(_) => "expression statement",
            Stmt::Block(_) => "block",
            Stmt::While { .. } => "while",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::DoWhile { .. } => "do-while",
            Stmt::Switch { .. } => "switch",
            Stmt::Return { .. } => "return",
        }
    }
}
