//! Recursive-descent parser for the supported C subset.
//!
//! Parses a translation unit into the declaration store ([`State`]):
//! typedefs, struct/union/enum definitions, global variables, and function
//! declarations (with or without bodies). Expressions use one method per
//! precedence level, tightest at the bottom.

use std::fmt;
use std::rc::Rc;

use super::ast::*;
use super::lexer::{LexError, Lexer, Token, TokenKind};
use super::state::State;

/// Parse failure with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    state: State,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Parser::with_state(source, State::new())
    }

    /// Parse into an existing declaration store, so later source can extend
    /// a session without re-issuing declaration identities.
    pub fn with_state(source: &str, state: State) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser {
            tokens,
            pos: 0,
            state,
        })
    }

    /// Parse the whole translation unit into a declaration store.
    pub fn parse_unit(mut self) -> Result<State, ParseError> {
        while !self.check(&TokenKind::Eof) {
            self.parse_top_level()?;
        }
        Ok(self.state)
    }

    fn parse_top_level(&mut self) -> Result<(), ParseError> {
        if self.check(&TokenKind::Typedef) {
            return self.parse_typedef();
        }
        if self.is_record_definition() {
            return self.parse_record_definition();
        }
        if self.is_enum_definition() {
            return self.parse_enum_definition();
        }

        let ty = self.parse_type()?;
        let name = self.expect_ident("declaration name")?;
        if self.check(&TokenKind::LParen) {
            self.parse_function(ty, name)
        } else {
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(&TokenKind::Semicolon, "expected ';' after declaration")?;
            let id = self.state.issue_id();
            self.state.add_var(Rc::new(VarDecl { id, name, ty, init }));
            Ok(())
        }
    }

    fn parse_typedef(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::Typedef, "expected 'typedef'")?;
        let ty = self.parse_type()?;
        let name = self.expect_ident("typedef name")?;
        self.expect(&TokenKind::Semicolon, "expected ';' after typedef")?;
        let id = self.state.issue_id();
        self.state.add_typedef(Rc::new(TypedefDecl { id, name, ty }));
        Ok(())
    }

    /// `struct X { ... };` or `union X { ... };` at the top level.
    fn is_record_definition(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Struct | TokenKind::Union
        ) && matches!(self.peek_kind_at(1), TokenKind::Ident(_))
            && matches!(self.peek_kind_at(2), TokenKind::LBrace)
    }

    fn is_enum_definition(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Enum)
            && matches!(self.peek_kind_at(1), TokenKind::Ident(_))
            && matches!(self.peek_kind_at(2), TokenKind::LBrace)
    }

    fn parse_record_definition(&mut self) -> Result<(), ParseError> {
        let is_union = self.eat(&TokenKind::Union);
        if !is_union {
            self.expect(&TokenKind::Struct, "expected 'struct' or 'union'")?;
        }
        let name = self.expect_ident("record name")?;
        self.expect(&TokenKind::LBrace, "expected '{' in record definition")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let ty = self.parse_type()?;
            let field_name = self.expect_ident("field name")?;
            self.expect(&TokenKind::Semicolon, "expected ';' after field")?;
            fields.push(FieldDecl {
                name: field_name,
                ty,
            });
        }
        self.expect(&TokenKind::RBrace, "expected '}' after fields")?;
        self.expect(&TokenKind::Semicolon, "expected ';' after record definition")?;
        self.state.add_record(Rc::new(RecordDecl {
            name,
            fields,
            is_union,
        }));
        Ok(())
    }

    fn parse_enum_definition(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::Enum, "expected 'enum'")?;
        let name = self.expect_ident("enum name")?;
        self.expect(&TokenKind::LBrace, "expected '{' in enum definition")?;
        let mut variants = Vec::new();
        let mut next_value = 0i64;
        while !self.check(&TokenKind::RBrace) {
            let variant = self.expect_ident("enum variant")?;
            if self.eat(&TokenKind::Eq) {
                let location = self.current_location();
                match self.parse_expression()? {
                    Expr::IntLit(v, _) => next_value = v as i64,
                    other => {
                        return Err(ParseError {
                            message: format!(
                                "enum value must be an integer literal, found {}",
                                other.kind()
                            ),
                            location,
                        });
                    }
                }
            }
            variants.push((variant, next_value));
            next_value += 1;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "expected '}' after enum variants")?;
        self.expect(&TokenKind::Semicolon, "expected ';' after enum definition")?;
        self.state.add_enum(Rc::new(EnumDecl { name, variants }));
        Ok(())
    }

    fn parse_function(&mut self, ret: CType, name: String) -> Result<(), ParseError> {
        self.expect(&TokenKind::LParen, "expected '('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            // `f(void)` declares zero parameters
            if self.check(&TokenKind::Void) && matches!(self.peek_kind_at(1), TokenKind::RParen) {
                self.advance();
            } else {
                loop {
                    let ty = self.parse_type()?;
                    let pname = match self.peek_kind() {
                        TokenKind::Ident(_) => self.expect_ident("parameter name")?,
                        _ => String::new(), // unnamed, prototype only
                    };
                    let id = self.state.issue_id();
                    params.push(Rc::new(ParamDecl {
                        id,
                        name: pname,
                        ty,
                    }));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
        }
        self.expect(&TokenKind::RParen, "expected ')' after parameters")?;

        let body = if self.eat(&TokenKind::Semicolon) {
            None // forward declaration, definition not yet available
        } else {
            Some(self.parse_block()?)
        };
        let id = self.state.issue_id();
        self.state.add_func(Rc::new(FuncDecl {
            id,
            name,
            ret,
            params,
            body,
        }));
        Ok(())
    }

    fn parse_type(&mut self) -> Result<CType, ParseError> {
        let location = self.current_location();
        let base = match self.peek_kind().clone() {
            TokenKind::Void => {
                self.advance();
                CType::Builtin(Builtin::Void)
            }
            TokenKind::Char => {
                self.advance();
                CType::Builtin(Builtin::Char)
            }
            TokenKind::Short => {
                self.advance();
                CType::Builtin(Builtin::Short)
            }
            TokenKind::Int => {
                self.advance();
                CType::Builtin(Builtin::Int)
            }
            TokenKind::Long => {
                self.advance();
                CType::Builtin(Builtin::Long)
            }
            TokenKind::Struct => {
                self.advance();
                CType::Struct(self.expect_ident("struct name")?)
            }
            TokenKind::Union => {
                self.advance();
                CType::Union(self.expect_ident("union name")?)
            }
            TokenKind::Enum => {
                self.advance();
                CType::Enum(self.expect_ident("enum name")?)
            }
            TokenKind::Ident(name) => {
                if let Some(k) = StdInt::from_name(&name) {
                    self.advance();
                    CType::StdInt(k)
                } else if self.state.typedefs.contains_key(&name) {
                    self.advance();
                    CType::Typedef(name)
                } else {
                    return Err(ParseError {
                        message: format!("'{}' does not name a type", name),
                        location,
                    });
                }
            }
            other => {
                return Err(ParseError {
                    message: format!("expected a type, found {:?}", other),
                    location,
                });
            }
        };
        let mut ty = base;
        while self.eat(&TokenKind::Star) {
            ty = CType::ptr_to(ty);
        }
        Ok(ty)
    }

    /// Whether the token at `offset` can begin a type.
    fn is_type_start_at(&self, offset: usize) -> bool {
        match self.peek_kind_at(offset) {
            TokenKind::Void
            | TokenKind::Char
            | TokenKind::Short
            | TokenKind::Int
            | TokenKind::Long
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum => true,
            TokenKind::Ident(name) => {
                StdInt::from_name(name).is_some() || self.state.typedefs.contains_key(name)
            }
            _ => false,
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace, "expected '{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(ParseError {
                    message: "unexpected end of file inside block".into(),
                    location: self.current_location(),
                });
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace, "expected '}'")?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            _ if self.is_type_start_at(0) => self.parse_var_decl_statement(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "expected ';' after expression")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_var_decl_statement(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_ident("variable name")?;
        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon, "expected ';' after declaration")?;
        let id = self.state.issue_id();
        Ok(Stmt::Decl(Rc::new(VarDecl { id, name, ty, init })))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect(&TokenKind::Return, "expected 'return'")?;
        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "expected ';' after return")?;
        Ok(Stmt::Return { expr, location })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::If, "expected 'if'")?;
        self.expect(&TokenKind::LParen, "expected '(' after 'if'")?;
        let cond = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')' after condition")?;
        let then_body = self.parse_statement_or_block()?;
        let else_body = if self.eat(&TokenKind::Else) {
            Some(self.parse_statement_or_block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::While, "expected 'while'")?;
        self.expect(&TokenKind::LParen, "expected '(' after 'while'")?;
        let cond = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')' after condition")?;
        let body = self.parse_statement_or_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::Do, "expected 'do'")?;
        let body = self.parse_statement_or_block()?;
        self.expect(&TokenKind::While, "expected 'while' after do body")?;
        self.expect(&TokenKind::LParen, "expected '('")?;
        let cond = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')'")?;
        self.expect(&TokenKind::Semicolon, "expected ';' after do-while")?;
        Ok(Stmt::DoWhile { body, cond })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::For, "expected 'for'")?;
        self.expect(&TokenKind::LParen, "expected '(' after 'for'")?;
        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else if self.is_type_start_at(0) {
            Some(Box::new(self.parse_var_decl_statement()?))
        } else {
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::Semicolon, "expected ';' in for header")?;
            Some(Box::new(Stmt::Expr(expr)))
        };
        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "expected ';' in for header")?;
        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen, "expected ')' after for header")?;
        let body = self.parse_statement_or_block()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&TokenKind::Switch, "expected 'switch'")?;
        self.expect(&TokenKind::LParen, "expected '(' after 'switch'")?;
        let expr = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "expected ')'")?;
        self.expect(&TokenKind::LBrace, "expected '{' after switch head")?;
        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let value = if self.eat(&TokenKind::Case) {
                let v = self.parse_expression()?;
                self.expect(&TokenKind::Colon, "expected ':' after case value")?;
                Some(v)
            } else {
                self.expect(&TokenKind::Default, "expected 'case' or 'default'")?;
                self.expect(&TokenKind::Colon, "expected ':' after 'default'")?;
                None
            };
            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace
            ) {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { value, body });
        }
        self.expect(&TokenKind::RBrace, "expected '}' after switch body")?;
        Ok(Stmt::Switch { expr, cases })
    }

    fn parse_statement_or_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&TokenKind::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    // --- expressions, tightest precedence at the bottom ---

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_ternary()?;
        let location = self.current_location();
        let aug = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::SlashEq => Some(BinaryOp::Div),
            TokenKind::PercentEq => Some(BinaryOp::Mod),
            TokenKind::LtLtEq => Some(BinaryOp::Shl),
            TokenKind::GtGtEq => Some(BinaryOp::Shr),
            TokenKind::AmpEq => Some(BinaryOp::BitAnd),
            TokenKind::PipeEq => Some(BinaryOp::BitOr),
            TokenKind::CaretEq => Some(BinaryOp::BitXor),
            _ => return Ok(target),
        };
        self.advance();
        let value = Box::new(self.parse_assignment()?);
        Ok(match aug {
            None => Expr::Assign {
                target: Box::new(target),
                value,
                location,
            },
            Some(op) => Expr::AugAssign {
                op,
                target: Box::new(target),
                value,
                location,
            },
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_logical_or()?;
        if !self.check(&TokenKind::Question) {
            return Ok(cond);
        }
        let location = self.current_location();
        self.advance();
        let then_val = Box::new(self.parse_assignment()?);
        self.expect(&TokenKind::Colon, "expected ':' in ternary")?;
        let else_val = Box::new(self.parse_assignment()?);
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then_val,
            else_val,
            location,
        })
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.check(&TokenKind::OrOr) {
            let location = self.current_location();
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        while self.check(&TokenKind::AndAnd) {
            let location = self.current_location();
            self.advance();
            let right = self.parse_bitwise_or()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.check(&TokenKind::Pipe) {
            let location = self.current_location();
            self.advance();
            let right = self.parse_bitwise_xor()?;
            left = Expr::Binary {
                op: BinaryOp::BitOr,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.check(&TokenKind::Caret) {
            let location = self.current_location();
            self.advance();
            let right = self.parse_bitwise_and()?;
            left = Expr::Binary {
                op: BinaryOp::BitXor,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::Amp) {
            let location = self.current_location();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary {
                op: BinaryOp::BitAnd,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => CompareOp::Eq,
                TokenKind::NotEq => CompareOp::Ne,
                _ => return Ok(left),
            };
            let location = self.current_location();
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => CompareOp::Lt,
                TokenKind::Le => CompareOp::Le,
                TokenKind::Gt => CompareOp::Gt,
                TokenKind::Ge => CompareOp::Ge,
                _ => return Ok(left),
            };
            let location = self.current_location();
            self.advance();
            let right = self.parse_shift()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::LtLt => BinaryOp::Shl,
                TokenKind::GtGt => BinaryOp::Shr,
                _ => return Ok(left),
            };
            let location = self.current_location();
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            let location = self.current_location();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            let location = self.current_location();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let op = match self.peek_kind() {
            TokenKind::PlusPlus => {
                self.advance();
                let expr = Box::new(self.parse_unary()?);
                return Ok(Expr::IncDec {
                    op: IncDec::Inc,
                    postfix: false,
                    expr,
                    location,
                });
            }
            TokenKind::MinusMinus => {
                self.advance();
                let expr = Box::new(self.parse_unary()?);
                return Ok(Expr::IncDec {
                    op: IncDec::Dec,
                    postfix: false,
                    expr,
                    location,
                });
            }
            TokenKind::LParen if self.is_type_start_at(1) => {
                // C-style cast: (type)expr
                self.advance();
                let ty = self.parse_type()?;
                self.expect(&TokenKind::RParen, "expected ')' after cast type")?;
                let expr = Box::new(self.parse_unary()?);
                return Ok(Expr::Cast { ty, expr, location });
            }
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::AddrOf,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let expr = Box::new(self.parse_unary()?);
        Ok(Expr::Unary { op, expr, location })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let location = self.current_location();
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_assignment()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "expected ')' after arguments")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        location,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_ident("field name")?;
                    expr = Expr::Member {
                        base: Box::new(expr),
                        field,
                        arrow: false,
                        location,
                    };
                }
                TokenKind::Arrow => {
                    self.advance();
                    let field = self.expect_ident("field name")?;
                    expr = Expr::Member {
                        base: Box::new(expr),
                        field,
                        arrow: true,
                        location,
                    };
                }
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = Expr::IncDec {
                        op: IncDec::Inc,
                        postfix: true,
                        expr: Box::new(expr),
                        location,
                    };
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = Expr::IncDec {
                        op: IncDec::Dec,
                        postfix: true,
                        expr: Box::new(expr),
                        location,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        match self.peek_kind().clone() {
            TokenKind::IntLiteral(v) => {
                self.advance();
                Ok(Expr::IntLit(v, location))
            }
            TokenKind::CharLiteral(c) => {
                self.advance();
                Ok(Expr::CharLit(c, location))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Ok(Expr::StrLit(s, location))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name, location))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "expected ')'")?;
                Ok(expr)
            }
            other => Err(ParseError {
                message: format!("expected an expression, found {:?}", other),
                location,
            }),
        }
    }

    // --- token plumbing ---

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn current_location(&self) -> SourceLocation {
        self.tokens[self.pos.min(self.tokens.len() - 1)].location
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {:?}", message, self.peek_kind()),
                location: self.current_location(),
            })
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError {
                message: format!("expected {}, found {:?}", what, other),
                location: self.current_location(),
            }),
        }
    }
}
