//! Function bodies: register assignment, parameters, hoisting and the
//! definition of nested functions.

use espanda_ast::{FunctionFlags, NodeId, NodeKind};

use crate::context::JobKind;
use crate::error::CompileResult;
use crate::insn::{Opcode, Operand, VReg};
use crate::pandagen::{formal_length, formal_params, PandaGen, FUNCTION_REG, IMPLICIT_PARAMS, THIS_REG};
use crate::program::CompiledFunction;

impl PandaGen<'_, '_> {
    /// Compile the job this generator was created for.
    pub(crate) fn generate(mut self, job: JobKind) -> CompileResult<CompiledFunction> {
        match job {
            JobKind::Main => self.compile_main()?,
            JobKind::Function(function) => self.compile_function_body(function)?,
            JobKind::ImplicitConstructor { class } => self.compile_implicit_constructor(class)?,
        }
        Ok(self.finish())
    }

    fn compile_main(&mut self) -> CompileResult {
        let ast = self.ast;
        self.allocate_locals(&[])?;
        self.enter_function_env();
        if let NodeKind::Program { statements } = ast.kind(self.root) {
            self.compile_statements(statements)?;
        }
        self.implicit_return()
    }

    fn compile_function_body(&mut self, function: NodeId) -> CompileResult {
        let ast = self.ast;
        let NodeKind::ScriptFunction { id, body, .. } = ast.kind(function) else {
            unreachable!("function job for a {}", ast.kind(function).type_name());
        };
        let params = formal_params(ast, function);
        self.allocate_locals(&params)?;

        // base class fields are set up before the constructor body runs
        if let Some(class) = self.ctor_class {
            if !is_derived(ast, class) {
                self.initialize_fields(class)?;
            }
        }
        self.enter_function_env();
        let body_begin = self.builder_prologue()?;
        self.initialize_params(&params)?;
        if let Some(id) = *id {
            if self.is_own_name(id) {
                self.load_acc(FUNCTION_REG);
                self.store_var(id, true);
            }
        }

        match *body {
            Some(body) => match ast.kind(body) {
                NodeKind::BlockStatement { statements } => self.compile_statements(statements)?,
                _ => {
                    self.compile_expression(body)?;
                    self.return_value()?;
                }
            },
            None => {}
        }
        self.implicit_return()?;
        self.builder_epilogue(body_begin);
        Ok(())
    }

    /// `constructor(...args) { super(...args); }` for derived classes, an
    /// empty constructor otherwise. Fields are initialized either way.
    fn compile_implicit_constructor(&mut self, class: NodeId) -> CompileResult {
        if is_derived(self.ast, class) {
            self.with_reg_scope(|pg| {
                pg.emit0(Opcode::GetUnmappedArgs);
                let args = pg.spill()?;
                pg.load_acc(FUNCTION_REG);
                pg.emit1(Opcode::SuperCallSpread, args);
                pg.store_this();
                Ok(())
            })?;
        }
        self.initialize_fields(class)?;
        self.implicit_return()
    }

    /// Create the function's lexical environment and park `this` in it
    /// when nested arrow functions need it.
    fn enter_function_env(&mut self) {
        let scope = self.scopes.scope(self.scope);
        let (size, this_slot) = (scope.lex_env_size, scope.this_slot);
        if size > 0 {
            self.emit1(Opcode::NewLexEnv, size);
        }
        if let Some(slot) = this_slot {
            self.load_acc(THIS_REG);
            self.emit2(Opcode::StLexVar, 0u32, slot);
        }
    }

    /// Give every register-allocated variable of this function a register.
    /// Simple parameters that are never captured use their argument
    /// register directly.
    fn allocate_locals(&mut self, params: &[NodeId]) -> CompileResult {
        let ast = self.ast;
        for (index, &param) in params.iter().enumerate() {
            let ident = match ast.kind(param) {
                NodeKind::Identifier { .. } => param,
                NodeKind::AssignmentPattern { left, .. } if ast.identifier_name(*left).is_some() => *left,
                _ => continue,
            };
            if let Some(variable) = self.scopes.reference(ident) {
                if self.scopes.variable(variable).lex_slot.is_none() {
                    self.locals.insert(variable, VReg(IMPLICIT_PARAMS + index as u32));
                }
            }
        }
        let function_scope = self.scopes.scope(self.scope).function_scope;
        let variables = self.program.locals(function_scope).to_vec();
        for variable in variables {
            if !self.locals.contains_key(&variable) {
                let reg = self.alloc_reg()?;
                self.locals.insert(variable, reg);
            }
        }
        Ok(())
    }

    fn initialize_params(&mut self, params: &[NodeId]) -> CompileResult {
        let ast = self.ast;
        for (index, &param) in params.iter().enumerate() {
            let arg = VReg(IMPLICIT_PARAMS + index as u32);
            match ast.kind(param) {
                NodeKind::Identifier { .. } => {
                    if !self.lives_in(param, arg) {
                        self.load_acc(arg);
                        self.store_var(param, true);
                    }
                }
                NodeKind::AssignmentPattern { left, right } => {
                    let has_value = self.alloc_label();
                    self.load_undefined();
                    self.emit1(Opcode::StrictEq, arg);
                    self.emit1(Opcode::Jeqz, has_value);
                    self.compile_expression(*right)?;
                    self.store_acc(arg);
                    self.bind_label(has_value);
                    if !self.lives_in(*left, arg) {
                        self.with_reg_scope(|pg| pg.destructure(*left, arg, true))?;
                    }
                }
                NodeKind::RestElement { argument, .. } => {
                    self.emit1(Opcode::CopyRestArgs, index as u32);
                    self.with_reg_scope(|pg| {
                        let rest = pg.spill()?;
                        pg.destructure(*argument, rest, true)
                    })?;
                }
                _ => self.with_reg_scope(|pg| pg.destructure(param, arg, true))?,
            }
        }
        Ok(())
    }

    /// Whether the variable bound by `ident` is held in `reg`.
    fn lives_in(&self, ident: NodeId, reg: VReg) -> bool {
        self.scopes
            .reference(ident)
            .and_then(|variable| self.locals.get(&variable))
            .is_some_and(|&held| held == reg)
    }

    /// Whether `id` names a function expression inside itself.
    fn is_own_name(&self, id: NodeId) -> bool {
        self.scopes
            .reference(id)
            .is_some_and(|variable| self.scopes.variable(variable).scope == self.scope)
    }

    // ========================================================================
    // Statement lists
    // ========================================================================

    /// Compile a statement list, defining its function declarations first.
    pub(crate) fn compile_statements(&mut self, statements: &[NodeId]) -> CompileResult {
        for &statement in statements {
            self.hoist_function(statement)?;
        }
        for &statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn hoist_function(&mut self, statement: NodeId) -> CompileResult {
        let ast = self.ast;
        let declaration = match ast.kind(statement) {
            NodeKind::ExportNamedDeclaration { declaration } | NodeKind::ExportDefaultDeclaration { declaration } => {
                *declaration
            }
            _ => statement,
        };
        let NodeKind::FunctionDeclaration { function } = ast.kind(declaration) else {
            return Ok(());
        };
        let NodeKind::ScriptFunction {
            id: Some(id),
            body: Some(_),
            ..
        } = ast.kind(*function)
        else {
            return Ok(());
        };
        self.define_function(*function)?;
        self.store_var(*id, true);
        Ok(())
    }

    /// Create the closure for `function` in the accumulator. Methods expect
    /// their home object in the accumulator.
    pub(crate) fn define_function(&mut self, function: NodeId) -> CompileResult {
        let ast = self.ast;
        let flags = match ast.kind(function) {
            NodeKind::ScriptFunction { flags, .. } => *flags,
            _ => FunctionFlags::empty(),
        };
        let name = self.program.function_name(ast, function);
        let length = formal_length(ast, function);
        let opcode = if flags.intersects(FunctionFlags::METHOD | FunctionFlags::GETTER | FunctionFlags::SETTER) {
            Opcode::DefineMethod
        } else {
            Opcode::DefineFunc
        };
        self.emit2(opcode, Operand::Function(name), length);
        Ok(())
    }
}

pub(crate) fn is_derived(ast: &espanda_ast::Ast, class: NodeId) -> bool {
    matches!(
        ast.kind(class),
        NodeKind::ClassDefinition {
            super_class: Some(_),
            ..
        }
    )
}
