//! `PandaGen`: the instruction emitter for one function.
//!
//! Owns the instruction list, labels, the register file, catch tables,
//! the dynamic-context stack and the resume table of the function being
//! compiled. The per-node compile methods live in sibling modules as
//! further `impl PandaGen` blocks.

use espanda_ast::{Ast, FunctionFlags, NodeId, NodeKind, ScopeId, VariableId};
use espanda_binder::{ScopeTree, VariableKind};
use espanda_core::collections::FxHashMap;
use espanda_core::intern::Atom;
use smallvec::smallvec;

use crate::context::{FunctionJob, JobKind, ProgramContext};
use crate::dynamic_context::DynamicContext;
use crate::error::{CompileError, CompileResult};
use crate::insn::{Insn, Label, Opcode, Operand, VReg};
use crate::program::{
    CatchTable, CompiledFunction, FunctionKind, LabelTargetEntry, LiteralValue, ResumePoint, SuspendKind,
};

/// Register file limit of one function.
pub const MAX_REGISTERS: u32 = u16::MAX as u32;

/// The implicit parameters every function receives before its formals.
pub const FUNCTION_REG: VReg = VReg(0);
pub const NEW_TARGET_REG: VReg = VReg(1);
pub const THIS_REG: VReg = VReg(2);
pub const IMPLICIT_PARAMS: u32 = 3;

/// Where a variable lives at runtime, seen from the current function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarLocation {
    Register(VReg),
    Lexical { level: u32, slot: u32 },
    /// A `var` or function declared at the top level of the file.
    GlobalVar,
    /// A `let`, `const` or class declared at the top level of the file.
    GlobalRecord,
    Unresolved,
}

pub(crate) struct PandaGen<'a, 'p> {
    pub(crate) ast: &'a Ast,
    pub(crate) scopes: &'a ScopeTree,
    pub(crate) program: &'p mut ProgramContext,
    pub(crate) name: String,
    pub(crate) kind: FunctionKind,
    pub(crate) flags: FunctionFlags,
    /// The `ScriptFunction`, `Program` or (for implicit constructors)
    /// `ClassDefinition` being compiled.
    pub(crate) root: NodeId,
    /// The scope code of this function runs in.
    pub(crate) scope: ScopeId,
    /// Set when compiling a class constructor.
    pub(crate) ctor_class: Option<NodeId>,
    pub(crate) params: u32,
    insns: Vec<Insn>,
    label_offsets: Vec<Option<u32>>,
    next_reg: u32,
    max_reg: u32,
    pub(crate) locals: FxHashMap<VariableId, VReg>,
    pub(crate) contexts: Vec<DynamicContext>,
    pub(crate) label_targets: Vec<LabelTargetEntry>,
    catch_tables: Vec<CatchTable>,
    pub(crate) try_depth: u32,
    resume_points: Vec<ResumePoint>,
    /// Generator or async function object, for suspending functions.
    pub(crate) builder_reg: Option<VReg>,
    /// Label the innermost optional chain jumps to on a nullish base.
    pub(crate) optional_chain: Option<Label>,
}

impl<'a, 'p> PandaGen<'a, 'p> {
    pub(crate) fn new(ast: &'a Ast, scopes: &'a ScopeTree, program: &'p mut ProgramContext, job: &FunctionJob) -> Self {
        let (root, scope, flags, params, ctor_class) = match job.kind {
            JobKind::Main => (ast.root(), scopes.global_scope(), FunctionFlags::empty(), 0, None),
            JobKind::Function(function) => {
                let flags = match ast.kind(function) {
                    NodeKind::ScriptFunction { flags, .. } => *flags,
                    _ => FunctionFlags::empty(),
                };
                let scope = scopes.scope_of(function).unwrap_or_else(|| scopes.global_scope());
                let params = formal_params(ast, function).len() as u32;
                let ctor_class = flags
                    .contains(FunctionFlags::CONSTRUCTOR)
                    .then(|| class_of_constructor(ast, function))
                    .flatten();
                (function, scope, flags, params, ctor_class)
            }
            JobKind::ImplicitConstructor { class } => {
                let scope = scopes.scope_of(class).unwrap_or_else(|| scopes.global_scope());
                (class, scope, FunctionFlags::CONSTRUCTOR, 0, Some(class))
            }
        };
        let kind = match (flags.is_async(), flags.is_generator()) {
            (false, false) => FunctionKind::Normal,
            (true, false) => FunctionKind::Async,
            (false, true) => FunctionKind::Generator,
            (true, true) => FunctionKind::AsyncGenerator,
        };
        let first_free = IMPLICIT_PARAMS + params;
        Self {
            ast,
            scopes,
            program,
            name: job.name.clone(),
            kind,
            flags,
            root,
            scope,
            ctor_class,
            params,
            insns: Vec::new(),
            label_offsets: Vec::new(),
            next_reg: first_free,
            max_reg: first_free,
            locals: FxHashMap::default(),
            contexts: Vec::new(),
            label_targets: Vec::new(),
            catch_tables: Vec::new(),
            try_depth: 0,
            resume_points: Vec::new(),
            builder_reg: None,
            optional_chain: None,
        }
    }

    pub(crate) fn finish(mut self) -> CompiledFunction {
        // innermost handlers are searched first
        self.catch_tables.sort_by(|a, b| b.depth.cmp(&a.depth));
        tracing::debug!(
            function = %self.name,
            insns = self.insns.len(),
            regs = self.max_reg,
            "compiled function"
        );
        CompiledFunction {
            name: self.name,
            kind: self.kind,
            params: self.params,
            regs: self.max_reg,
            insns: self.insns,
            label_offsets: self.label_offsets,
            catch_tables: self.catch_tables,
            resume_points: self.resume_points,
            label_targets: self.label_targets,
        }
    }

    // ========================================================================
    // Errors
    // ========================================================================

    pub(crate) fn unsupported(&self, node: NodeId, feature: &str) -> CompileError {
        CompileError::Unsupported {
            file: self.ast.file_name().to_string(),
            offset: self.ast.range(node).pos,
            feature: feature.to_string(),
        }
    }

    // ========================================================================
    // Emission
    // ========================================================================

    pub(crate) fn emit0(&mut self, opcode: Opcode) {
        self.insns.push(Insn::new(opcode, smallvec![]));
    }

    pub(crate) fn emit1(&mut self, opcode: Opcode, a: impl Into<Operand>) {
        self.insns.push(Insn::new(opcode, smallvec![a.into()]));
    }

    pub(crate) fn emit2(&mut self, opcode: Opcode, a: impl Into<Operand>, b: impl Into<Operand>) {
        self.insns.push(Insn::new(opcode, smallvec![a.into(), b.into()]));
    }

    pub(crate) fn emit3(
        &mut self,
        opcode: Opcode,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        c: impl Into<Operand>,
    ) {
        self.insns.push(Insn::new(opcode, smallvec![a.into(), b.into(), c.into()]));
    }

    pub(crate) fn emit4(
        &mut self,
        opcode: Opcode,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        c: impl Into<Operand>,
        d: impl Into<Operand>,
    ) {
        self.insns
            .push(Insn::new(opcode, smallvec![a.into(), b.into(), c.into(), d.into()]));
    }

    pub(crate) fn offset(&self) -> u32 {
        self.insns.len() as u32
    }

    /// Whether control can reach the next instruction emitted.
    pub(crate) fn falls_through(&self) -> bool {
        let at_label = self.label_offsets.contains(&Some(self.offset()));
        at_label || self.insns.last().map_or(true, |insn| !insn.opcode.is_terminator())
    }

    // ========================================================================
    // Labels
    // ========================================================================

    pub(crate) fn alloc_label(&mut self) -> Label {
        self.label_offsets.push(None);
        Label(self.label_offsets.len() as u32 - 1)
    }

    pub(crate) fn bind_label(&mut self, label: Label) {
        debug_assert!(self.label_offsets[label.0 as usize].is_none(), "label bound twice");
        self.label_offsets[label.0 as usize] = Some(self.offset());
    }

    pub(crate) fn jump(&mut self, label: Label) {
        self.emit1(Opcode::Jmp, label);
    }

    /// Jump when the accumulator is falsy.
    pub(crate) fn branch_if_false(&mut self, label: Label) {
        self.emit0(Opcode::IsFalse);
        self.emit1(Opcode::Jnez, label);
    }

    /// Jump when the accumulator is truthy.
    pub(crate) fn branch_if_true(&mut self, label: Label) {
        self.emit0(Opcode::IsTrue);
        self.emit1(Opcode::Jnez, label);
    }

    /// Jump when the value in `value` is `null` or `undefined`. Leaves the
    /// accumulator clobbered.
    pub(crate) fn branch_if_nullish(&mut self, value: VReg, label: Label) {
        self.emit0(Opcode::LdNull);
        self.emit1(Opcode::Eq, value);
        self.emit1(Opcode::Jnez, label);
    }

    // ========================================================================
    // Registers
    // ========================================================================

    pub(crate) fn alloc_reg(&mut self) -> CompileResult<VReg> {
        self.alloc_regs(1)
    }

    /// `count` consecutive registers; returns the first.
    pub(crate) fn alloc_regs(&mut self, count: u32) -> CompileResult<VReg> {
        let first = self.next_reg;
        let next = first + count;
        if next > MAX_REGISTERS {
            return Err(CompileError::RegisterOverflow {
                function: self.name.clone(),
                limit: MAX_REGISTERS,
            });
        }
        self.next_reg = next;
        self.max_reg = self.max_reg.max(next);
        Ok(VReg(first))
    }

    /// Run `f` and release every register it allocated, on success and on
    /// error alike.
    pub(crate) fn with_reg_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> CompileResult<T>) -> CompileResult<T> {
        let saved = self.next_reg;
        let result = f(self);
        self.next_reg = saved;
        result
    }

    pub(crate) fn load_acc(&mut self, reg: VReg) {
        self.emit1(Opcode::Lda, reg);
    }

    pub(crate) fn store_acc(&mut self, reg: VReg) {
        self.emit1(Opcode::Sta, reg);
    }

    /// Store the accumulator in a fresh register.
    pub(crate) fn spill(&mut self) -> CompileResult<VReg> {
        let reg = self.alloc_reg()?;
        self.store_acc(reg);
        Ok(reg)
    }

    // ========================================================================
    // Constants
    // ========================================================================

    pub(crate) fn load_number(&mut self, value: f64) {
        match number_literal(value) {
            LiteralValue::Integer(int) => self.emit1(Opcode::Ldai, int),
            _ => self.emit1(Opcode::Fldai, Operand::Double(value)),
        }
    }

    pub(crate) fn load_string(&mut self, value: &str) {
        self.emit1(Opcode::LdaStr, value);
    }

    pub(crate) fn load_undefined(&mut self) {
        self.emit0(Opcode::LdUndefined);
    }

    // ========================================================================
    // Variables
    // ========================================================================

    pub(crate) fn locate(&self, variable: Option<VariableId>) -> VarLocation {
        let Some(variable) = variable else {
            return VarLocation::Unresolved;
        };
        if self.scopes.is_global(variable) {
            return match self.scopes.variable(variable).kind {
                VariableKind::Let | VariableKind::Const | VariableKind::Class => VarLocation::GlobalRecord,
                _ => VarLocation::GlobalVar,
            };
        }
        if let Some((level, slot)) = self.scopes.lex_address(self.scope, variable) {
            return VarLocation::Lexical { level, slot };
        }
        match self.locals.get(&variable) {
            Some(&reg) => VarLocation::Register(reg),
            None => VarLocation::Unresolved,
        }
    }

    /// Load the variable an identifier refers to.
    pub(crate) fn load_var(&mut self, node: NodeId, name: Atom) {
        let variable = self.scopes.reference(node);
        let name = self.ast.str(name);
        match self.locate(variable) {
            VarLocation::Register(reg) => self.load_acc(reg),
            VarLocation::Lexical { level, slot } => self.emit2(Opcode::LdLexVar, level, slot),
            VarLocation::GlobalVar => self.emit1(Opcode::LdGlobalVar, name),
            VarLocation::GlobalRecord | VarLocation::Unresolved => self.emit1(Opcode::TryLdGlobalByName, name),
        }
    }

    /// Store the accumulator into the variable a binding or reference
    /// identifier names. The accumulator is left unchanged.
    pub(crate) fn store_var(&mut self, node: NodeId, is_declaration: bool) {
        let Some(name) = self.ast.identifier_name(node) else {
            return;
        };
        let variable = self.scopes.reference(node);
        let name = self.ast.str(name);
        let kind = variable.map(|v| self.scopes.variable(v).kind);
        if !is_declaration && kind == Some(VariableKind::Const) {
            self.emit1(Opcode::ThrowConstAssignment, name);
            return;
        }
        match self.locate(variable) {
            VarLocation::Register(reg) => self.store_acc(reg),
            VarLocation::Lexical { level, slot } => self.emit2(Opcode::StLexVar, level, slot),
            VarLocation::GlobalVar => self.emit1(Opcode::StGlobalVar, name),
            VarLocation::GlobalRecord if is_declaration => match kind {
                Some(VariableKind::Const) => self.emit1(Opcode::StConstToGlobalRecord, name),
                _ => self.emit1(Opcode::StToGlobalRecord, name),
            },
            VarLocation::GlobalRecord | VarLocation::Unresolved => self.emit1(Opcode::TryStGlobalByName, name),
        }
    }

    pub(crate) fn load_this(&mut self) {
        if self.ctor_class.is_none() {
            if let Some((level, slot)) = self.scopes.this_address(self.scope) {
                self.emit2(Opcode::LdLexVar, level, slot);
                return;
            }
        }
        self.load_acc(THIS_REG);
    }

    /// Record the accumulator as `this`; used after `super(...)` returns.
    pub(crate) fn store_this(&mut self) {
        self.store_acc(THIS_REG);
        if let Some(slot) = self.scopes.scope(self.scope).this_slot {
            self.emit2(Opcode::StLexVar, 0u32, slot);
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call the function in `callee` with `argc` arguments starting at
    /// `args`, without a receiver.
    pub(crate) fn call(&mut self, callee: VReg, args: VReg, argc: u32) {
        self.load_acc(callee);
        match argc {
            0 => self.emit0(Opcode::CallArg0),
            1 => self.emit1(Opcode::CallArg1, args),
            2 => self.emit2(Opcode::CallArgs2, args, args.offset(1)),
            3 => self.emit3(Opcode::CallArgs3, args, args.offset(1), args.offset(2)),
            _ => self.emit2(Opcode::CallRange, argc, args),
        }
    }

    /// Call the function in `callee` with receiver `this`; the arguments
    /// follow `this` in consecutive registers.
    pub(crate) fn call_this(&mut self, callee: VReg, this: VReg, argc: u32) {
        self.load_acc(callee);
        let arg = |n: u32| this.offset(n + 1);
        match argc {
            0 => self.emit1(Opcode::CallThis0, this),
            1 => self.emit2(Opcode::CallThis1, this, arg(0)),
            2 => self.emit3(Opcode::CallThis2, this, arg(0), arg(1)),
            3 => self.emit4(Opcode::CallThis3, this, arg(0), arg(1), arg(2)),
            _ => self.emit2(Opcode::CallThisRange, argc, this),
        }
    }

    /// Call `callee` with the arguments in the array `args`.
    pub(crate) fn call_spread(&mut self, callee: VReg, this: VReg, args: VReg) {
        self.load_acc(callee);
        self.emit2(Opcode::Apply, this, args);
    }

    /// `new` with the constructor in `start` and the arguments after it.
    /// `argc` counts the constructor.
    pub(crate) fn new_object(&mut self, start: VReg, argc: u32) {
        self.emit2(Opcode::NewObjRange, argc, start);
    }

    // ========================================================================
    // Exceptions and suspension
    // ========================================================================

    pub(crate) fn add_catch_table(&mut self, try_begin: Label, try_end: Label, catch_begin: Label, depth: u32) {
        self.catch_tables.push(CatchTable {
            try_begin,
            try_end,
            catch_begin,
            depth,
        });
    }

    pub(crate) fn record_resume_point(&mut self, kind: SuspendKind) {
        let offset = self.offset();
        self.resume_points.push(ResumePoint { kind, offset });
    }
}

// ============================================================================
// Helpers shared by the compile modules
// ============================================================================

/// A number as a literal buffer entry: integral values that fit `i32` (and
/// are not `-0`) become integers.
pub(crate) fn number_literal(value: f64) -> LiteralValue {
    let integral = value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    if integral && !(value == 0.0 && value.is_sign_negative()) {
        LiteralValue::Integer(value as i64)
    } else {
        LiteralValue::Double(value)
    }
}

/// Parameters that occupy argument registers, in order. A leading `this`
/// parameter is a type annotation only.
pub(crate) fn formal_params(ast: &Ast, function: NodeId) -> Vec<NodeId> {
    let NodeKind::ScriptFunction { params, .. } = ast.kind(function) else {
        return Vec::new();
    };
    params
        .iter()
        .copied()
        .filter(|&param| ast.identifier_name(param).map_or(true, |name| ast.str(name) != "this"))
        .collect()
}

/// The `length` of a function: parameters before the first default or
/// rest parameter.
pub(crate) fn formal_length(ast: &Ast, function: NodeId) -> u32 {
    formal_params(ast, function)
        .into_iter()
        .take_while(|&param| {
            !matches!(
                ast.kind(param),
                NodeKind::AssignmentPattern { .. } | NodeKind::RestElement { .. }
            )
        })
        .count() as u32
}

/// The class a constructor `ScriptFunction` belongs to.
pub(crate) fn class_of_constructor(ast: &Ast, function: NodeId) -> Option<NodeId> {
    ast.ancestors(function)
        .find(|&node| matches!(ast.kind(node), NodeKind::ClassDefinition { .. }))
}

/// The name a non-computed property key spells.
pub(crate) fn static_property_name(ast: &Ast, key: NodeId) -> Option<String> {
    match ast.kind(key) {
        NodeKind::Identifier { name, .. } => Some(ast.str(*name).to_string()),
        NodeKind::StringLiteral { value } => Some(ast.str(*value).to_string()),
        NodeKind::NumberLiteral { value } => Some(espanda_core::format_number(*value)),
        _ => None,
    }
}

/// The value of a literal node that can go into a literal buffer.
pub(crate) fn constant_literal(ast: &Ast, node: NodeId) -> Option<LiteralValue> {
    match ast.kind(node) {
        NodeKind::NumberLiteral { value } => Some(number_literal(*value)),
        NodeKind::StringLiteral { value } => Some(LiteralValue::String(ast.str(*value).to_string())),
        NodeKind::BooleanLiteral { value } => Some(LiteralValue::Bool(*value)),
        NodeKind::NullLiteral => Some(LiteralValue::Null),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal(3.0), LiteralValue::Integer(3));
        assert_eq!(number_literal(-7.0), LiteralValue::Integer(-7));
        assert_eq!(number_literal(1.5), LiteralValue::Double(1.5));
        assert_eq!(number_literal(-0.0), LiteralValue::Double(-0.0));
        assert_eq!(number_literal(4294967296.0), LiteralValue::Double(4294967296.0));
    }
}
