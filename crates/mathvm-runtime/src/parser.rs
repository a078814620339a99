//! Recursive-descent parser
//!
//! Produces the arena [`Ast`]. Declarations (`int x;`, `function ...`)
//! register into the current scope and are not statements; everything else
//! becomes a [`Stmt`]. The whole program is wrapped into the synthesized
//! top-level function.

use crate::ast::{
    AssignOp, Ast, AstFunction, BinaryOp, Block, Expr, ExprKind, FnId, Param, ScopeData, ScopeId,
    Stmt, StmtKind, Type, UnaryOp, VarData,
};
use crate::diagnostic::TranslationError;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Name of the synthesized top-level function
pub const TOP_FUNCTION_NAME: &str = "<top>";

/// Parser state
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    scopes: Vec<ScopeData>,
    functions: Vec<AstFunction>,
    vars: Vec<VarData>,
}

impl Parser {
    /// Create a parser over a token stream (must end with `Eof`)
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            scopes: Vec::new(),
            functions: Vec::new(),
            vars: Vec::new(),
        }
    }

    /// Parse the whole program into an [`Ast`]
    pub fn parse(mut self) -> Result<Ast, TranslationError> {
        let top_scope = self.new_scope(None);
        let stmts = self.block_items(top_scope)?;
        self.expect(TokenKind::Eof)?;

        let top = self.functions.len();
        self.functions.push(AstFunction {
            name: TOP_FUNCTION_NAME.to_string(),
            return_type: Type::Void,
            params: Vec::new(),
            body: Block {
                scope: top_scope,
                stmts,
            },
            span: Span::new(0, 0),
        });

        Ok(Ast {
            scopes: self.scopes,
            functions: self.functions,
            vars: self.vars,
            top,
        })
    }

    fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(ScopeData {
            parent,
            ..ScopeData::default()
        });
        self.scopes.len() - 1
    }

    /// Parse declarations and statements until `}` or end of input
    fn block_items(&mut self, scope: ScopeId) -> Result<Vec<Stmt>, TranslationError> {
        let mut stmts = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Eof | TokenKind::RightBrace => break,
                TokenKind::KwInt | TokenKind::KwDouble | TokenKind::KwString => {
                    self.var_declaration(scope)?;
                }
                TokenKind::Function => {
                    let id = self.function_declaration(scope)?;
                    self.scopes[scope].functions.push(id);
                }
                _ => stmts.push(self.statement(scope)?),
            }
        }
        Ok(stmts)
    }

    /// `int x;`: registers the variable into `scope`
    fn var_declaration(&mut self, scope: ScopeId) -> Result<(), TranslationError> {
        let ty = self.parse_type()?;
        let (name, span) = self.expect_ident()?;
        self.expect(TokenKind::Semicolon)?;
        let id = self.vars.len();
        self.vars.push(VarData { name, ty, span });
        self.scopes[scope].vars.push(id);
        Ok(())
    }

    /// `function <type> name(<type> p, ...) { ... }`
    ///
    /// Parameters become the first variables of the body scope, so their
    /// local ids are `0..params.len()` after declaration.
    fn function_declaration(&mut self, scope: ScopeId) -> Result<FnId, TranslationError> {
        self.expect(TokenKind::Function)?;
        let return_type = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;

        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if self.peek().kind != TokenKind::RightParen {
            loop {
                let ty = self.parse_type()?;
                let (param_name, param_span) = self.expect_ident()?;
                params.push(Param {
                    name: param_name,
                    ty,
                    span: param_span,
                });
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;

        let body_scope = self.new_scope(Some(scope));
        for param in &params {
            let id = self.vars.len();
            self.vars.push(VarData {
                name: param.name.clone(),
                ty: param.ty,
                span: param.span,
            });
            self.scopes[body_scope].vars.push(id);
        }

        self.expect(TokenKind::LeftBrace)?;
        let stmts = self.block_items(body_scope)?;
        self.expect(TokenKind::RightBrace)?;

        let id = self.functions.len();
        self.functions.push(AstFunction {
            name,
            return_type,
            params,
            body: Block {
                scope: body_scope,
                stmts,
            },
            span: name_span,
        });
        Ok(id)
    }

    fn statement(&mut self, scope: ScopeId) -> Result<Stmt, TranslationError> {
        match self.peek().kind {
            TokenKind::If => self.if_statement(scope),
            TokenKind::While => self.while_statement(scope),
            TokenKind::For => self.for_statement(scope),
            TokenKind::Return => self.return_statement(),
            TokenKind::Print => self.print_statement(),
            TokenKind::Ident(_) if self.peek_is_assignment() => self.assignment(),
            _ => {
                let expr = self.expression()?;
                let span = expr.span;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                })
            }
        }
    }

    fn peek_is_assignment(&self) -> bool {
        matches!(
            self.peek_nth(1).map(|t| &t.kind),
            Some(TokenKind::Equal | TokenKind::PlusEqual | TokenKind::MinusEqual)
        )
    }

    fn assignment(&mut self) -> Result<Stmt, TranslationError> {
        let (name, _) = self.expect_ident()?;
        let op_token = self.advance();
        let op_span = op_token.span;
        let op = match op_token.kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::IncrSet,
            TokenKind::MinusEqual => AssignOp::DecrSet,
            _ => unreachable!("guarded by peek_is_assignment"),
        };
        let value = self.expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt {
            kind: StmtKind::Assign { name, op, value },
            span: op_span,
        })
    }

    fn if_statement(&mut self, scope: ScopeId) -> Result<Stmt, TranslationError> {
        let span = self.expect(TokenKind::If)?.span;
        self.expect(TokenKind::LeftParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RightParen)?;
        let then_block = self.block(scope)?;
        let else_block = if self.match_kind(&TokenKind::Else) {
            Some(self.block(scope)?)
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_block,
                else_block,
            },
            span,
        })
    }

    fn while_statement(&mut self, scope: ScopeId) -> Result<Stmt, TranslationError> {
        let span = self.expect(TokenKind::While)?.span;
        self.expect(TokenKind::LeftParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = self.block(scope)?;
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            span,
        })
    }

    /// `for (i in lo..hi) { ... }`
    fn for_statement(&mut self, scope: ScopeId) -> Result<Stmt, TranslationError> {
        let span = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LeftParen)?;
        let (var, _) = self.expect_ident()?;
        self.expect(TokenKind::In)?;
        let lo = self.expression()?;
        self.expect(TokenKind::Range)?;
        let hi = self.expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = self.block(scope)?;
        Ok(Stmt {
            kind: StmtKind::For { var, lo, hi, body },
            span,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, TranslationError> {
        let span = self.expect(TokenKind::Return)?.span;
        let value = if self.peek().kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt, TranslationError> {
        let span = self.expect(TokenKind::Print)?.span;
        self.expect(TokenKind::LeftParen)?;
        let mut operands = Vec::new();
        if self.peek().kind != TokenKind::RightParen {
            loop {
                operands.push(self.expression()?);
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt {
            kind: StmtKind::Print(operands),
            span,
        })
    }

    fn block(&mut self, parent: ScopeId) -> Result<Block, TranslationError> {
        self.expect(TokenKind::LeftBrace)?;
        let scope = self.new_scope(Some(parent));
        let stmts = self.block_items(scope)?;
        self.expect(TokenKind::RightBrace)?;
        Ok(Block { scope, stmts })
    }

    fn parse_type(&mut self) -> Result<Type, TranslationError> {
        let token = self.advance();
        match token.kind {
            TokenKind::KwInt => Ok(Type::Int),
            TokenKind::KwDouble => Ok(Type::Double),
            TokenKind::KwString => Ok(Type::String),
            TokenKind::KwVoid => Ok(Type::Void),
            other => Err(TranslationError::new(
                format!("Expected type, found {}", other.describe()),
                token.span,
            )),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, TranslationError> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(&[(TokenKind::PipePipe, BinaryOp::Or)], Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(&[(TokenKind::AmpAmp, BinaryOp::And)], Self::bit_or)
    }

    fn bit_or(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(&[(TokenKind::Pipe, BinaryOp::BitOr)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(&[(TokenKind::Caret, BinaryOp::BitXor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(&[(TokenKind::Amp, BinaryOp::BitAnd)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(
            &[
                (TokenKind::EqualEqual, BinaryOp::Eq),
                (TokenKind::BangEqual, BinaryOp::Neq),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(
            &[
                (TokenKind::Less, BinaryOp::Lt),
                (TokenKind::LessEqual, BinaryOp::Le),
                (TokenKind::Greater, BinaryOp::Gt),
                (TokenKind::GreaterEqual, BinaryOp::Ge),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::factor,
        )
    }

    fn factor(&mut self) -> Result<Expr, TranslationError> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::unary,
        )
    }

    /// One left-associative precedence level
    fn binary_level(
        &mut self,
        ops: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, TranslationError>,
    ) -> Result<Expr, TranslationError> {
        let mut expr = next(self)?;
        'outer: loop {
            for (kind, op) in ops {
                if self.peek().kind == *kind {
                    let op_span = self.advance().span;
                    let rhs = next(self)?;
                    expr = Expr {
                        kind: ExprKind::Binary {
                            op: *op,
                            lhs: Box::new(expr),
                            rhs: Box::new(rhs),
                        },
                        span: op_span,
                    };
                    continue 'outer;
                }
            }
            break;
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, TranslationError> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let op_span = self.advance().span;
            let operand = self.unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span: op_span,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, TranslationError> {
        let token = self.advance();
        let span = token.span;
        match token.kind {
            TokenKind::Int(value) => Ok(Expr {
                kind: ExprKind::Int(value),
                span,
            }),
            TokenKind::Double(value) => Ok(Expr {
                kind: ExprKind::Double(value),
                span,
            }),
            TokenKind::Str(value) => Ok(Expr {
                kind: ExprKind::Str(value),
                span,
            }),
            TokenKind::Ident(name) => {
                if self.peek().kind == TokenKind::LeftParen {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek().kind != TokenKind::RightParen {
                        loop {
                            args.push(self.expression()?);
                            if !self.match_kind(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RightParen)?;
                    Ok(Expr {
                        kind: ExprKind::Call { name, args },
                        span,
                    })
                } else {
                    Ok(Expr {
                        kind: ExprKind::Load(name),
                        span,
                    })
                }
            }
            TokenKind::LeftParen => {
                let expr = self.expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            other => Err(TranslationError::new(
                format!("Expected expression, found {}", other.describe()),
                span,
            )),
        }
    }

    // ── Token cursor helpers ─────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, TranslationError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(TranslationError::new(
                format!(
                    "Expected {}, found {}",
                    kind.describe(),
                    token.kind.describe()
                ),
                token.span,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), TranslationError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.span)),
            other => Err(TranslationError::new(
                format!("Expected identifier, found {}", other.describe()),
                token.span,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Ast {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    #[test]
    fn test_top_level_program() {
        let ast = parse("int x; x = 1; print(x);");
        let top = &ast.functions[ast.top];
        assert_eq!(top.name, TOP_FUNCTION_NAME);
        assert_eq!(top.return_type, Type::Void);
        assert_eq!(top.body.stmts.len(), 2);
        assert_eq!(ast.scopes[top.body.scope].vars.len(), 1);
        assert_eq!(ast.vars[0].name, "x");
        assert_eq!(ast.vars[0].ty, Type::Int);
    }

    #[test]
    fn test_function_declaration() {
        let ast = parse("function int add(int a, int b) { return a + b; }");
        let top = &ast.functions[ast.top];
        assert_eq!(ast.scopes[top.body.scope].functions.len(), 1);
        let f = &ast.functions[ast.scopes[top.body.scope].functions[0]];
        assert_eq!(f.name, "add");
        assert_eq!(f.return_type, Type::Int);
        assert_eq!(f.params.len(), 2);
        // Parameters are the first variables of the body scope.
        let body_vars = &ast.scopes[f.body.scope].vars;
        assert_eq!(body_vars.len(), 2);
        assert_eq!(ast.vars[body_vars[0]].name, "a");
        assert_eq!(ast.vars[body_vars[1]].name, "b");
    }

    #[test]
    fn test_nested_function_scope_chain() {
        let ast = parse(
            "function int outer() { int x; function int inner() { return x; } return inner(); }",
        );
        let top = &ast.functions[ast.top];
        let outer = &ast.functions[ast.scopes[top.body.scope].functions[0]];
        let inner_id = ast.scopes[outer.body.scope].functions[0];
        let inner = &ast.functions[inner_id];
        // `x` resolves from inner's body scope through the chain.
        let x = ast.lookup_variable(inner.body.scope, "x").unwrap();
        assert_eq!(ast.vars[x].name, "x");
        // `inner` resolves from outer's body scope.
        assert_eq!(ast.lookup_function(outer.body.scope, "inner"), Some(inner_id));
    }

    #[test]
    fn test_precedence() {
        let ast = parse("print(1 + 2 * 3 == 7 && 1 < 2);");
        let top = &ast.functions[ast.top];
        let StmtKind::Print(operands) = &top.body.stmts[0].kind else {
            panic!("expected print");
        };
        // Outermost operator is `&&`.
        let ExprKind::Binary { op, lhs, .. } = &operands[0].kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::And);
        let ExprKind::Binary { op: eq_op, rhs, .. } = &lhs.kind else {
            panic!("expected binary lhs");
        };
        assert_eq!(*eq_op, BinaryOp::Eq);
        // `==` right side is untouched 7; left is 1 + 2*3.
        assert!(matches!(rhs.kind, ExprKind::Int(7)));
    }

    #[test]
    fn test_binary_span_is_operator_span() {
        let source = "print(1 + 'a');";
        let ast = parse(source);
        let top = &ast.functions[ast.top];
        let StmtKind::Print(operands) = &top.body.stmts[0].kind else {
            panic!("expected print");
        };
        assert_eq!(&source[operands[0].span.start..operands[0].span.end], "+");
    }

    #[test]
    fn test_for_statement() {
        let ast = parse("int i; for (i in 1..5) { print(i); }");
        let top = &ast.functions[ast.top];
        let StmtKind::For { var, .. } = &top.body.stmts[0].kind else {
            panic!("expected for");
        };
        assert_eq!(var, "i");
    }

    #[test]
    fn test_compound_assignment() {
        let ast = parse("int i; i += 1;");
        let top = &ast.functions[ast.top];
        let StmtKind::Assign { op, .. } = &top.body.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(*op, AssignOp::IncrSet);
    }

    #[test]
    fn test_parse_error_has_position() {
        let tokens = Lexer::new("int ;").tokenize().unwrap();
        let err = Parser::new(tokens).parse().unwrap_err();
        assert!(err.message.starts_with("Expected identifier"));
        assert_eq!(err.span.start, 4);
    }
}
