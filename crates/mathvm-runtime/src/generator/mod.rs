//! AST to bytecode translation
//!
//! The generator walks the AST and emits each function's instruction
//! stream into its own buffer in the [`Code`] registry. Expressions leave
//! exactly one value on the operand stack (or none for void calls);
//! statements leave nothing. Numeric promotions, short-circuit logicals,
//! and boolean normalization are synthesized here; the interpreter trusts
//! the stream to be type-correct.
//!
//! The first translation error aborts the walk and is reported with the
//! offending node's source position.

mod context;

pub use context::{Context, VarInfo};

use crate::ast::{
    AssignOp, Ast, BinaryOp, Block, Expr, ExprKind, FnId, Stmt, StmtKind, Type, UnaryOp, VarId,
};
use crate::bytecode::{Label, Opcode};
use crate::code::Code;
use crate::diagnostic::TranslationError;
use crate::span::Span;

type Result<T> = std::result::Result<T, TranslationError>;

/// Translates a parsed program into executable [`Code`]
pub struct BytecodeGenerator<'a> {
    ast: &'a Ast,
    ctx: Context,
}

impl<'a> BytecodeGenerator<'a> {
    /// Create a generator for `ast`
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            ctx: Context::new(ast),
        }
    }

    /// Translate the whole program
    ///
    /// The top-level function registers first and becomes id 0.
    pub fn generate(mut self) -> Result<Code> {
        let top_id = self.ctx.register_function(self.ast, self.ast.top);
        self.visit_function(self.ast.top, top_id)?;
        Ok(self.ctx.into_code())
    }

    fn is_top(&self, id: u16) -> bool {
        id == 0
    }

    /// Generate one function: scope entry, parameter prologue, nested
    /// functions, body statements, terminator.
    fn visit_function(&mut self, function: FnId, id: u16) -> Result<()> {
        let ast = self.ast;
        let data = &ast.functions[function];

        self.ctx.enter_function(id);
        self.ctx.enter_scope(data.body.scope);

        for &var in &ast.scopes[data.body.scope].vars {
            self.ctx.declare(var);
        }

        if !self.is_top(id) {
            // Arguments arrive on the operand stack rightmost on top; pop
            // them into their slots in reverse declaration order.
            for param in &data.params {
                if !param.ty.is_numeric() {
                    return Err(TranslationError::new(
                        "Parameter can't have not-numeric type",
                        param.span,
                    ));
                }
            }
            for (slot, param) in data.params.iter().enumerate().rev() {
                let op = match param.ty {
                    Type::Int => Opcode::StoreIvar,
                    _ => Opcode::StoreDvar,
                };
                self.ctx.bc().add_insn(op);
                self.ctx.bc().add_u16(slot as u16);
            }
        }

        for &nested in &ast.scopes[data.body.scope].functions {
            self.ctx.register_function(ast, nested);
        }
        for &nested in &ast.scopes[data.body.scope].functions {
            let nested_id = self
                .ctx
                .function_id_of(nested)
                .expect("nested function registered above");
            self.visit_function(nested, nested_id)?;
        }

        for stmt in &data.body.stmts {
            self.visit_stmt(stmt)?;
        }

        self.ctx.exit_scope();

        if self.is_top(id) {
            self.ctx.bc().add_insn(Opcode::Stop);
        } else {
            self.ctx.bc().add_insn(Opcode::Return);
        }

        let pending = self.ctx.pending_branches();
        debug_assert_eq!(pending, 0, "function finished with unbound labels");
        if pending != 0 {
            return Err(TranslationError::new(
                "Internal error: unbound branch target",
                data.span,
            ));
        }

        self.ctx.exit_function();
        Ok(())
    }

    /// Generate a nested block: enter scope, declare variables, register
    /// and generate nested functions, then the child statements.
    fn visit_block(&mut self, block: &Block) -> Result<()> {
        let ast = self.ast;
        self.ctx.enter_scope(block.scope);

        for &var in &ast.scopes[block.scope].vars {
            self.ctx.declare(var);
        }
        for &nested in &ast.scopes[block.scope].functions {
            self.ctx.register_function(ast, nested);
        }
        for &nested in &ast.scopes[block.scope].functions {
            let nested_id = self
                .ctx
                .function_id_of(nested)
                .expect("nested function registered above");
            self.visit_function(nested, nested_id)?;
        }

        for stmt in &block.stmts {
            self.visit_stmt(stmt)?;
        }

        self.ctx.exit_scope();
        Ok(())
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                let ty = self.visit_expr(expr)?;
                // An unused non-void value must not leak onto the stack.
                if ty != Type::Void {
                    self.ctx.bc().add_insn(Opcode::Pop);
                }
                Ok(())
            }
            StmtKind::Assign { name, op, value } => self.assignment(name, *op, value, stmt.span),
            StmtKind::Print(operands) => self.print(operands),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => self.if_stmt(cond, then_block, else_block.as_ref()),
            StmtKind::While { cond, body } => self.while_stmt(cond, body),
            StmtKind::For { var, lo, hi, body } => self.for_stmt(var, lo, hi, body, stmt.span),
            StmtKind::Return(value) => self.return_stmt(value.as_ref(), stmt.span),
        }
    }

    fn assignment(&mut self, name: &str, op: AssignOp, value: &Expr, span: Span) -> Result<()> {
        let var = self.resolve_variable(name, span)?;
        let var_ty = self.ast.vars[var].ty;
        if !var_ty.is_numeric() {
            return Err(TranslationError::new(
                "Variable can't have not-numeric type",
                span,
            ));
        }

        let value_ty = self.visit_expr(value)?;
        match (value_ty, var_ty) {
            (Type::Int, Type::Int) | (Type::Double, Type::Double) => {}
            (Type::Int, Type::Double) => self.ctx.bc().add_insn(Opcode::I2d),
            (Type::Double, Type::Int) => self.ctx.bc().add_insn(Opcode::D2i),
            _ => return Err(TranslationError::new("Wrong RHS type", span)),
        }

        let info = self.var_allocation(var, span)?;
        let is_int = var_ty == Type::Int;
        if op != AssignOp::Assign {
            self.load_var(var_ty, info, span)?;
            match op {
                AssignOp::IncrSet => {
                    self.ctx
                        .bc()
                        .add_insn(if is_int { Opcode::Iadd } else { Opcode::Dadd });
                }
                AssignOp::DecrSet => {
                    // Stack is [rhs, current]; the difference wanted is
                    // current - rhs, so the operands swap first.
                    self.ctx.bc().add_insn(Opcode::Swap);
                    self.ctx
                        .bc()
                        .add_insn(if is_int { Opcode::Isub } else { Opcode::Dsub });
                }
                AssignOp::Assign => {}
            }
        }

        self.store_var(var_ty, info, span)
    }

    fn print(&mut self, operands: &[Expr]) -> Result<()> {
        for operand in operands {
            let ty = self.visit_expr(operand)?;
            let op = match ty {
                Type::Int => Opcode::Iprint,
                Type::Double => Opcode::Dprint,
                Type::String => Opcode::Sprint,
                _ => {
                    return Err(TranslationError::new(
                        "Print is only applicable to int, double, string",
                        operand.span,
                    ))
                }
            };
            self.ctx.bc().add_insn(op);
        }
        Ok(())
    }

    fn if_stmt(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> Result<()> {
        let cond_ty = self.visit_expr(cond)?;
        if cond_ty != Type::Int {
            return Err(TranslationError::new(
                "Condition must have int type",
                cond.span,
            ));
        }

        let mut then_label = Label::new();
        let mut end = Label::new();

        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(Opcode::IficmpNe, &mut then_label);
        if let Some(block) = else_block {
            self.visit_block(block)?;
        }
        self.ctx.bc().add_branch(Opcode::Ja, &mut end);
        self.ctx.bc().bind(&mut then_label);
        self.visit_block(then_block)?;
        self.ctx.bc().bind(&mut end);
        Ok(())
    }

    fn while_stmt(&mut self, cond: &Expr, body: &Block) -> Result<()> {
        let mut top = Label::new();
        let mut end = Label::new();

        self.ctx.bc().bind(&mut top);
        let cond_ty = self.visit_expr(cond)?;
        if cond_ty != Type::Int {
            return Err(TranslationError::new(
                "Condition must have int type",
                cond.span,
            ));
        }
        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(Opcode::IficmpE, &mut end);
        self.visit_block(body)?;
        self.ctx.bc().add_branch(Opcode::Ja, &mut top);
        self.ctx.bc().bind(&mut end);
        Ok(())
    }

    /// `for (i in lo..hi)` with inclusive upper bound, step 1
    ///
    /// The upper bound is evaluated once into a hidden local of the current
    /// function.
    fn for_stmt(&mut self, var: &str, lo: &Expr, hi: &Expr, body: &Block, span: Span) -> Result<()> {
        let var_id = self.resolve_variable(var, span)?;
        if self.ast.vars[var_id].ty != Type::Int {
            return Err(TranslationError::new("For variable must have int type", span));
        }
        let info = self.var_allocation(var_id, span)?;

        let lo_ty = self.visit_expr(lo)?;
        if lo_ty != Type::Int {
            return Err(TranslationError::new(
                "For bounds must have int type",
                lo.span,
            ));
        }
        self.store_var(Type::Int, info, span)?;

        let hi_ty = self.visit_expr(hi)?;
        if hi_ty != Type::Int {
            return Err(TranslationError::new(
                "For bounds must have int type",
                hi.span,
            ));
        }
        let bound = self.ctx.declare_hidden();
        self.ctx.bc().add_insn(Opcode::StoreIvar);
        self.ctx.bc().add_u16(bound);

        let mut top = Label::new();
        let mut end = Label::new();

        // Exit once the bound is below the loop variable.
        self.ctx.bc().bind(&mut top);
        self.ctx.bc().add_insn(Opcode::LoadIvar);
        self.ctx.bc().add_u16(bound);
        self.load_var(Type::Int, info, span)?;
        self.ctx.bc().add_branch(Opcode::IficmpL, &mut end);

        self.visit_block(body)?;

        self.load_var(Type::Int, info, span)?;
        self.ctx.bc().add_insn(Opcode::Iload1);
        self.ctx.bc().add_insn(Opcode::Iadd);
        self.store_var(Type::Int, info, span)?;
        self.ctx.bc().add_branch(Opcode::Ja, &mut top);
        self.ctx.bc().bind(&mut end);
        Ok(())
    }

    fn return_stmt(&mut self, value: Option<&Expr>, span: Span) -> Result<()> {
        if let Some(expr) = value {
            let value_ty = self.visit_expr(expr)?;
            let return_ty = self.ctx.current_return_type();
            match (value_ty, return_ty) {
                (Type::Int, Type::Int)
                | (Type::Double, Type::Double)
                | (Type::String, Type::String) => {}
                (Type::Int, Type::Double) => self.ctx.bc().add_insn(Opcode::I2d),
                (Type::Double, Type::Int) => self.ctx.bc().add_insn(Opcode::D2i),
                _ => return Err(TranslationError::new("Wrong return value type", span)),
            }
        }
        self.ctx.bc().add_insn(Opcode::Return);
        Ok(())
    }

    // ── Expressions ──────────────────────────────────────────────────────

    /// Emit an expression and return its inferred type
    ///
    /// Consumers must use the returned type; nothing re-infers a value's
    /// type from the variable it came from.
    fn visit_expr(&mut self, expr: &Expr) -> Result<Type> {
        match &expr.kind {
            ExprKind::Int(value) => {
                self.ctx.bc().add_insn(Opcode::Iload);
                self.ctx.bc().add_i64(*value);
                Ok(Type::Int)
            }
            ExprKind::Double(value) => {
                self.ctx.bc().add_insn(Opcode::Dload);
                self.ctx.bc().add_double(*value);
                Ok(Type::Double)
            }
            ExprKind::Str(value) => {
                let id = self.ctx.intern_string(value);
                self.ctx.bc().add_insn(Opcode::Sload);
                self.ctx.bc().add_u16(id);
                Ok(Type::String)
            }
            ExprKind::Load(name) => {
                let var = self.resolve_variable(name, expr.span)?;
                let ty = self.ast.vars[var].ty;
                let info = self.var_allocation(var, expr.span)?;
                self.load_var(ty, info, expr.span)?;
                Ok(ty)
            }
            ExprKind::Call { name, args } => self.call(name, args, expr.span),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::And | BinaryOp::Or => self.logical_op(*op, lhs, rhs, expr.span),
                BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::BitXor => {
                    self.bitwise_op(*op, lhs, rhs, expr.span)
                }
                BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Lt
                | BinaryOp::Le => self.comparison_op(*op, lhs, rhs, expr.span),
                BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Mod => self.arithmetic_op(*op, lhs, rhs, expr.span),
            },
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => self.neg_op(operand, expr.span),
                UnaryOp::Not => self.not_op(operand, expr.span),
            },
        }
    }

    fn call(&mut self, name: &str, args: &[Expr], span: Span) -> Result<Type> {
        let ast = self.ast;
        let function = ast
            .lookup_function(self.ctx.current_scope(), name)
            .ok_or_else(|| {
                TranslationError::new(format!("Function '{}' is not defined", name), span)
            })?;
        let callee = &ast.functions[function];

        if args.len() != callee.params.len() {
            return Err(TranslationError::new(
                format!("Wrong number of arguments for function '{}'", name),
                span,
            ));
        }

        for (arg, param) in args.iter().zip(&callee.params) {
            let arg_ty = self.visit_expr(arg)?;
            match (arg_ty, param.ty) {
                (Type::Int, Type::Int) | (Type::Double, Type::Double) => {}
                (Type::Int, Type::Double) => self.ctx.bc().add_insn(Opcode::I2d),
                (Type::Double, Type::Int) => self.ctx.bc().add_insn(Opcode::D2i),
                _ => {
                    return Err(TranslationError::new(
                        format!("Wrong argument type in call of function '{}'", name),
                        arg.span,
                    ))
                }
            }
        }

        let id = self
            .ctx
            .function_id_of(function)
            .expect("callee registered when its scope was entered");
        self.ctx.bc().add_insn(Opcode::Call);
        self.ctx.bc().add_u16(id);
        Ok(callee.return_type)
    }

    /// Short-circuit `&&` / `||`; both operands int, result 0 or 1
    fn logical_op(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, _span: Span) -> Result<Type> {
        let is_and = op == BinaryOp::And;
        let mut evaluate_right = Label::new();
        let mut set_true = Label::new();
        let mut end = Label::new();

        let lhs_ty = self.visit_expr(lhs)?;
        if lhs_ty != Type::Int {
            return Err(TranslationError::new(
                "Logical operator is only applicable to int operands",
                lhs.span,
            ));
        }

        self.ctx.bc().add_insn(Opcode::Iload0);
        if is_and {
            // left == 0 decides the whole expression
            self.ctx
                .bc()
                .add_branch(Opcode::IficmpNe, &mut evaluate_right);
            self.ctx.bc().add_insn(Opcode::Iload0);
            self.ctx.bc().add_branch(Opcode::Ja, &mut end);
        } else {
            // left != 0 decides the whole expression
            self.ctx.bc().add_branch(Opcode::IficmpNe, &mut set_true);
        }

        self.ctx.bc().bind(&mut evaluate_right);
        let rhs_ty = self.visit_expr(rhs)?;
        if rhs_ty != Type::Int {
            return Err(TranslationError::new(
                "Logical operator is only applicable to int operands",
                rhs.span,
            ));
        }

        // Only reachable as `1 && right` or `0 || right`: the right side
        // alone decides, normalized to 0/1.
        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(Opcode::IficmpNe, &mut set_true);
        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(Opcode::Ja, &mut end);

        self.ctx.bc().bind(&mut set_true);
        self.ctx.bc().add_insn(Opcode::Iload1);
        self.ctx.bc().bind(&mut end);
        Ok(Type::Int)
    }

    fn bitwise_op(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Result<Type> {
        let lhs_ty = self.visit_expr(lhs)?;
        let rhs_ty = self.visit_expr(rhs)?;
        if lhs_ty != Type::Int || rhs_ty != Type::Int {
            return Err(TranslationError::new(
                "Bitwise operator is only applicable to int operands",
                span,
            ));
        }
        let insn = match op {
            BinaryOp::BitOr => Opcode::Iaor,
            BinaryOp::BitAnd => Opcode::Iaand,
            _ => Opcode::Iaxor,
        };
        self.ctx.bc().add_insn(insn);
        Ok(Type::Int)
    }

    /// Comparison via three-way compare against zero, normalized to 0/1
    fn comparison_op(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Result<Type> {
        let lhs_ty = self.visit_expr(lhs)?;
        let rhs_ty = self.visit_expr(rhs)?;
        let common = self.cast_operands_numeric(lhs_ty, rhs_ty, span)?;

        let branch = match op {
            BinaryOp::Eq => Opcode::IficmpE,
            BinaryOp::Neq => Opcode::IficmpNe,
            BinaryOp::Gt => Opcode::IficmpG,
            BinaryOp::Ge => Opcode::IficmpGe,
            BinaryOp::Lt => Opcode::IficmpL,
            _ => Opcode::IficmpLe,
        };

        let mut set_true = Label::new();
        let mut end = Label::new();

        self.ctx.bc().add_insn(if common == Type::Int {
            Opcode::Icmp
        } else {
            Opcode::Dcmp
        });
        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(branch, &mut set_true);
        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(Opcode::Ja, &mut end);
        self.ctx.bc().bind(&mut set_true);
        self.ctx.bc().add_insn(Opcode::Iload1);
        self.ctx.bc().bind(&mut end);
        Ok(Type::Int)
    }

    fn arithmetic_op(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Result<Type> {
        let lhs_ty = self.visit_expr(lhs)?;
        let rhs_ty = self.visit_expr(rhs)?;
        let common = self.cast_operands_numeric(lhs_ty, rhs_ty, span)?;

        let is_int = common == Type::Int;
        let insn = match op {
            BinaryOp::Add => {
                if is_int {
                    Opcode::Iadd
                } else {
                    Opcode::Dadd
                }
            }
            BinaryOp::Sub => {
                if is_int {
                    Opcode::Isub
                } else {
                    Opcode::Dsub
                }
            }
            BinaryOp::Mul => {
                if is_int {
                    Opcode::Imul
                } else {
                    Opcode::Dmul
                }
            }
            BinaryOp::Div => {
                if is_int {
                    Opcode::Idiv
                } else {
                    Opcode::Ddiv
                }
            }
            _ => {
                if is_int {
                    Opcode::Imod
                } else {
                    return Err(TranslationError::new(
                        "Modulo (%) is only applicable to integers",
                        span,
                    ));
                }
            }
        };
        self.ctx.bc().add_insn(insn);
        Ok(common)
    }

    fn neg_op(&mut self, operand: &Expr, span: Span) -> Result<Type> {
        let ty = self.visit_expr(operand)?;
        match ty {
            Type::Int => {
                self.ctx.bc().add_insn(Opcode::Ineg);
                Ok(Type::Int)
            }
            Type::Double => {
                self.ctx.bc().add_insn(Opcode::Dneg);
                Ok(Type::Double)
            }
            _ => Err(TranslationError::new(
                "Unary sub (-) is only applicable to int/double",
                span,
            )),
        }
    }

    /// `!x` is 1 iff x is 0, else 0
    fn not_op(&mut self, operand: &Expr, span: Span) -> Result<Type> {
        let ty = self.visit_expr(operand)?;
        if ty != Type::Int {
            return Err(TranslationError::new(
                "Unary not (!) is only applicable to int",
                span,
            ));
        }

        let mut set_false = Label::new();
        let mut end = Label::new();

        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().add_branch(Opcode::IficmpNe, &mut set_false);
        self.ctx.bc().add_insn(Opcode::Iload1);
        self.ctx.bc().add_branch(Opcode::Ja, &mut end);
        self.ctx.bc().bind(&mut set_false);
        self.ctx.bc().add_insn(Opcode::Iload0);
        self.ctx.bc().bind(&mut end);
        Ok(Type::Int)
    }

    /// Promote mixed int/double operands to a common numeric type
    ///
    /// The stack holds [lhs, rhs] with rhs on top; promoting the deeper
    /// operand needs a swap around the conversion.
    fn cast_operands_numeric(&mut self, lower: Type, upper: Type, span: Span) -> Result<Type> {
        if !lower.is_numeric() || !upper.is_numeric() {
            return Err(TranslationError::new(
                "Operator is only applicable to numbers",
                span,
            ));
        }

        if lower == Type::Int && upper == Type::Int {
            return Ok(Type::Int);
        }

        if lower == Type::Int {
            self.ctx.bc().add_insn(Opcode::Swap);
            self.ctx.bc().add_insn(Opcode::I2d);
            self.ctx.bc().add_insn(Opcode::Swap);
        }
        if upper == Type::Int {
            self.ctx.bc().add_insn(Opcode::I2d);
        }
        Ok(Type::Double)
    }

    // ── Variable access ──────────────────────────────────────────────────

    fn resolve_variable(&self, name: &str, span: Span) -> Result<VarId> {
        self.ast
            .lookup_variable(self.ctx.current_scope(), name)
            .ok_or_else(|| {
                TranslationError::new(format!("Variable '{}' is not defined", name), span)
            })
    }

    fn var_allocation(&self, var: VarId, span: Span) -> Result<VarInfo> {
        self.ctx.var_info(var).ok_or_else(|| {
            TranslationError::new(
                format!("Variable '{}' is not defined", self.ast.vars[var].name),
                span,
            )
        })
    }

    /// Context depth of a variable access: how many lexical function
    /// boundaries separate the use site from the defining function
    fn context_depth(&self, info: VarInfo) -> u16 {
        let current = self.ctx.current_function_id();
        if info.function_id == current {
            return 0;
        }
        // An inner function sees outer variables, so the defining function's
        // depth is always the smaller one.
        self.ctx.function_depth(current) - self.ctx.function_depth(info.function_id)
    }

    fn load_var(&mut self, ty: Type, info: VarInfo, span: Span) -> Result<()> {
        let context = self.context_depth(info);
        let insn = match (ty, context) {
            (Type::Int, 0) => Opcode::LoadIvar,
            (Type::Int, _) => Opcode::LoadCtxIvar,
            (Type::Double, 0) => Opcode::LoadDvar,
            (Type::Double, _) => Opcode::LoadCtxDvar,
            _ => {
                return Err(TranslationError::new(
                    "Wrong var reference type (only numbers are supported)",
                    span,
                ))
            }
        };
        self.ctx.bc().add_insn(insn);
        if context != 0 {
            self.ctx.bc().add_u16(context);
        }
        self.ctx.bc().add_u16(info.local_id);
        Ok(())
    }

    fn store_var(&mut self, ty: Type, info: VarInfo, span: Span) -> Result<()> {
        let context = self.context_depth(info);
        let insn = match (ty, context) {
            (Type::Int, 0) => Opcode::StoreIvar,
            (Type::Int, _) => Opcode::StoreCtxIvar,
            (Type::Double, 0) => Opcode::StoreDvar,
            (Type::Double, _) => Opcode::StoreCtxDvar,
            _ => {
                return Err(TranslationError::new(
                    "Wrong var reference type (only numbers are supported)",
                    span,
                ))
            }
        };
        self.ctx.bc().add_insn(insn);
        if context != 0 {
            self.ctx.bc().add_u16(context);
        }
        self.ctx.bc().add_u16(info.local_id);
        Ok(())
    }
}
