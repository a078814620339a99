//! Translation context
//!
//! Tracks the stacks of active function ids and scopes while the generator
//! walks the AST, owns the [`Code`] registry being built, assigns local ids
//! to declared variables, and keeps the variable side table mapping each
//! AST variable to its `(function_id, local_id)` pair.

use crate::ast::{Ast, FnId, ScopeId, VarId};
use crate::bytecode::Bytecode;
use crate::code::{BytecodeFunction, Code};

/// Allocation record of a declared variable
#[derive(Debug, Clone, Copy)]
pub struct VarInfo {
    /// Function the variable belongs to
    pub function_id: u16,
    /// Slot index within that function's variable region
    pub local_id: u16,
}

/// Generator state shared across visits
pub struct Context {
    code: Code,
    /// Active function ids, innermost last
    function_ids: Vec<u16>,
    /// Active scopes, innermost last
    scopes: Vec<ScopeId>,
    /// AST function id → bytecode function id, assigned at registration
    registered: Vec<Option<u16>>,
    /// AST variable id → allocation record, assigned at declaration
    var_info: Vec<Option<VarInfo>>,
}

impl Context {
    /// Create a context sized for `ast`
    pub fn new(ast: &Ast) -> Self {
        Self {
            code: Code::new(),
            function_ids: Vec::new(),
            scopes: Vec::new(),
            registered: vec![None; ast.functions.len()],
            var_info: vec![None; ast.vars.len()],
        }
    }

    /// Register a function, assigning its id and static depth
    ///
    /// Idempotent: an already-registered function keeps its id. The depth is
    /// the size of the active function stack at registration time, so the
    /// top-level function registers at depth 0 and every nesting level adds
    /// one.
    pub fn register_function(&mut self, ast: &Ast, function: FnId) -> u16 {
        if let Some(id) = self.registered[function] {
            return id;
        }
        let data = &ast.functions[function];
        let depth = self.function_ids.len() as u16;
        let id = self.code.add_function(BytecodeFunction {
            id: 0,
            name: data.name.clone(),
            return_type: data.return_type,
            params: data
                .params
                .iter()
                .map(|p| (p.name.clone(), p.ty))
                .collect(),
            bytecode: Bytecode::new(),
            locals_count: 0,
            depth,
        });
        self.registered[function] = Some(id);
        id
    }

    /// Bytecode id of a registered function
    pub fn function_id_of(&self, function: FnId) -> Option<u16> {
        self.registered[function]
    }

    /// Push a function onto the active stack
    pub fn enter_function(&mut self, id: u16) {
        self.function_ids.push(id);
    }

    /// Pop the active function stack
    pub fn exit_function(&mut self) {
        self.function_ids
            .pop()
            .expect("exit_function with no active function");
    }

    /// Innermost active function id
    pub fn current_function_id(&self) -> u16 {
        *self
            .function_ids
            .last()
            .expect("no active function")
    }

    /// Push a scope onto the active stack
    pub fn enter_scope(&mut self, scope: ScopeId) {
        self.scopes.push(scope);
    }

    /// Pop the active scope stack
    pub fn exit_scope(&mut self) {
        self.scopes.pop().expect("exit_scope with no active scope");
    }

    /// Innermost active scope
    pub fn current_scope(&self) -> ScopeId {
        *self.scopes.last().expect("no active scope")
    }

    /// Declare a variable in the current function
    ///
    /// Allocates the next local id, bumps the function's `locals_count`, and
    /// records the allocation on the variable.
    pub fn declare(&mut self, var: VarId) -> VarInfo {
        let function_id = self.current_function_id();
        let local_id = self.allocate_local(function_id);
        let info = VarInfo {
            function_id,
            local_id,
        };
        self.var_info[var] = Some(info);
        info
    }

    /// Allocate an anonymous local in the current function
    ///
    /// Used for compiler temporaries such as the for-loop upper bound.
    pub fn declare_hidden(&mut self) -> u16 {
        let function_id = self.current_function_id();
        self.allocate_local(function_id)
    }

    fn allocate_local(&mut self, function_id: u16) -> u16 {
        let function = self
            .code
            .function_by_id_mut(function_id)
            .expect("current function not registered");
        let local_id = function.locals_count;
        function.locals_count += 1;
        local_id
    }

    /// Allocation record of a declared variable
    pub fn var_info(&self, var: VarId) -> Option<VarInfo> {
        self.var_info[var]
    }

    /// Static depth of a registered function
    pub fn function_depth(&self, id: u16) -> u16 {
        self.code
            .function_by_id(id)
            .map(|f| f.depth)
            .unwrap_or(0)
    }

    /// Instruction buffer of the current function
    pub fn bc(&mut self) -> &mut Bytecode {
        let id = self.current_function_id();
        &mut self
            .code
            .function_by_id_mut(id)
            .expect("current function not registered")
            .bytecode
    }

    /// Pending (unbound) branch count of the current function's stream
    pub fn pending_branches(&self) -> usize {
        let id = self.current_function_id();
        self.code
            .function_by_id(id)
            .map(|f| f.bytecode.pending_branches())
            .unwrap_or(0)
    }

    /// Declared return type of the current function
    pub fn current_return_type(&self) -> crate::ast::Type {
        let id = self.current_function_id();
        self.code
            .function_by_id(id)
            .map(|f| f.return_type)
            .unwrap_or(crate::ast::Type::Invalid)
    }

    /// Intern a string constant
    pub fn intern_string(&mut self, s: &str) -> u16 {
        self.code.intern_string(s)
    }

    /// Finish translation, releasing the built registry
    pub fn into_code(self) -> Code {
        self.code
    }
}
