//! Program-wide code generation state and the compile entry point.
//!
//! Functions are compiled one at a time off a work queue: compiling a
//! function that defines nested functions names them and queues them.

use std::collections::VecDeque;

use espanda_ast::{Ast, FunctionFlags, NodeId, NodeKind, ScopeId, VariableId};
use espanda_binder::ScopeTree;
use espanda_checker::CheckedTypes;
use espanda_core::collections::{FxHashMap, FxHashSet};

use crate::error::CompileResult;
use crate::pandagen::PandaGen;
use crate::program::{CompiledProgram, LiteralBuffer, LiteralValue};
use crate::type_recorder::TypeRecorder;

/// Name of the function holding a file's top-level code.
pub const MAIN_FUNCTION: &str = "func_main_0";

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Prefix of literal buffer ids; usually derived from the file name.
    pub record_name: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            record_name: "_ESModuleRecord".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobKind {
    Main,
    Function(NodeId),
    /// The constructor of a class that declares none.
    ImplicitConstructor { class: NodeId },
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionJob {
    pub(crate) kind: JobKind,
    pub(crate) name: String,
}

pub(crate) struct ProgramContext {
    pub(crate) record_name: String,
    literal_buffers: Vec<LiteralBuffer>,
    queue: VecDeque<FunctionJob>,
    used_names: FxHashSet<String>,
    name_counter: u32,
    /// Internal name of every function already queued, keyed by its
    /// `ScriptFunction` (or `ClassDefinition` for implicit constructors).
    function_names: FxHashMap<NodeId, String>,
    /// Register-allocated variables of each function scope.
    locals: FxHashMap<ScopeId, Vec<VariableId>>,
}

impl ProgramContext {
    fn new(ast: &Ast, scopes: &ScopeTree, record_name: String) -> Self {
        Self {
            record_name,
            literal_buffers: Vec::new(),
            queue: VecDeque::new(),
            used_names: FxHashSet::default(),
            name_counter: 0,
            function_names: FxHashMap::default(),
            locals: collect_locals(ast, scopes),
        }
    }

    pub(crate) fn locals(&self, function_scope: ScopeId) -> &[VariableId] {
        self.locals.get(&function_scope).map_or(&[], Vec::as_slice)
    }

    /// Add a literal buffer and return its id.
    pub(crate) fn add_literal_buffer(&mut self, entries: Vec<LiteralValue>) -> String {
        let id = format!("{}_{}", self.record_name, self.literal_buffers.len());
        self.literal_buffers.push(LiteralBuffer {
            id: id.clone(),
            entries,
        });
        id
    }

    /// The internal name of `function`, queueing it on first use.
    pub(crate) fn function_name(&mut self, ast: &Ast, function: NodeId) -> String {
        if let Some(name) = self.function_names.get(&function) {
            return name.clone();
        }
        let name = self.unique_name(name_hint(ast, function));
        self.enqueue(function, JobKind::Function(function), name)
    }

    /// The internal name of the implicit constructor of `class`.
    pub(crate) fn implicit_constructor_name(&mut self, ast: &Ast, class: NodeId) -> String {
        if let Some(name) = self.function_names.get(&class) {
            return name.clone();
        }
        let hint = match ast.kind(class) {
            NodeKind::ClassDefinition { id: Some(id), .. } => ast.identifier_name(*id).map(|n| ast.str(n).to_string()),
            _ => None,
        }
        .or_else(|| binding_name(ast, class));
        let name = self.unique_name(hint);
        self.enqueue(class, JobKind::ImplicitConstructor { class }, name)
    }

    fn enqueue(&mut self, node: NodeId, kind: JobKind, name: String) -> String {
        self.function_names.insert(node, name.clone());
        self.queue.push_back(FunctionJob {
            kind,
            name: name.clone(),
        });
        name
    }

    /// `hint` itself when unused; otherwise `#n#hint`, or `#n#` for
    /// anonymous functions.
    fn unique_name(&mut self, hint: Option<String>) -> String {
        let name = match hint {
            Some(hint) if !hint.is_empty() && !self.used_names.contains(&hint) => hint,
            hint => {
                self.name_counter += 1;
                format!("#{}#{}", self.name_counter, hint.unwrap_or_default())
            }
        };
        self.used_names.insert(name.clone());
        name
    }
}

/// Compile every function of a bound file.
#[tracing::instrument(level = "debug", skip_all, fields(file = %ast.file_name()))]
pub fn compile(ast: &Ast, scopes: &ScopeTree, options: &CodegenOptions) -> CompileResult<CompiledProgram> {
    compile_program(ast, scopes, None, options)
}

/// Compile a checked file and record the declared types of its top-level
/// bindings in type buffers after the code's own literal buffers.
#[tracing::instrument(level = "debug", skip_all, fields(file = %ast.file_name()))]
pub fn compile_with_types(
    ast: &Ast,
    scopes: &ScopeTree,
    types: &CheckedTypes,
    options: &CodegenOptions,
) -> CompileResult<CompiledProgram> {
    compile_program(ast, scopes, Some(types), options)
}

fn compile_program(
    ast: &Ast,
    scopes: &ScopeTree,
    types: Option<&CheckedTypes>,
    options: &CodegenOptions,
) -> CompileResult<CompiledProgram> {
    let mut program = ProgramContext::new(ast, scopes, options.record_name.clone());
    program.used_names.insert(MAIN_FUNCTION.to_string());
    program.queue.push_back(FunctionJob {
        kind: JobKind::Main,
        name: MAIN_FUNCTION.to_string(),
    });

    let mut functions = Vec::new();
    while let Some(job) = program.queue.pop_front() {
        let function = PandaGen::new(ast, scopes, &mut program, &job).generate(job.kind)?;
        functions.push(function);
    }

    let type_info = types.map(|types| TypeRecorder::new(ast, types).record(scopes, &mut program));

    Ok(CompiledProgram {
        record_name: program.record_name,
        functions,
        literal_buffers: program.literal_buffers,
        type_info,
    })
}

// ============================================================================
// Naming
// ============================================================================

/// The source name a function is known by: its own id, or the name of
/// whatever it is assigned to.
pub(crate) fn name_hint(ast: &Ast, function: NodeId) -> Option<String> {
    if let NodeKind::ScriptFunction { id, flags, .. } = ast.kind(function) {
        if let Some(name) = id.and_then(|id| ast.identifier_name(id)) {
            return Some(ast.str(name).to_string());
        }
        // constructors are named after their class
        if flags.contains(FunctionFlags::CONSTRUCTOR) {
            let class = crate::pandagen::class_of_constructor(ast, function)?;
            return match ast.kind(class) {
                NodeKind::ClassDefinition { id: Some(id), .. } => {
                    ast.identifier_name(*id).map(|n| ast.str(n).to_string())
                }
                _ => binding_name(ast, class),
            };
        }
    }
    // ScriptFunction -> FunctionExpression / ArrowFunctionExpression -> holder
    let expression = ast.parent(function)?;
    binding_name(ast, expression)
}

fn binding_name(ast: &Ast, node: NodeId) -> Option<String> {
    let mut node = node;
    if matches!(ast.kind(node), NodeKind::ClassDefinition { .. }) {
        node = ast.parent(node)?;
    }
    let holder = ast.parent(node)?;
    let name_of = |target: NodeId| ast.identifier_name(target).map(|n| ast.str(n).to_string());
    match ast.kind(holder) {
        NodeKind::VariableDeclarator { id, .. } => name_of(*id),
        NodeKind::AssignmentExpression { left, .. } => name_of(*left),
        NodeKind::AssignmentPattern { left, .. } => name_of(*left),
        NodeKind::Property { key, computed: false, .. }
        | NodeKind::MethodDefinition { key, computed: false, .. }
        | NodeKind::ClassProperty { key, computed: false, .. } => crate::pandagen::static_property_name(ast, *key),
        NodeKind::ExportDefaultDeclaration { .. } => Some("default".to_string()),
        _ => None,
    }
}

// ============================================================================
// Register-allocated variables
// ============================================================================

/// Variables that live in registers: everything that is neither
/// type-only, captured nor global, grouped by owning function scope.
fn collect_locals(ast: &Ast, scopes: &ScopeTree) -> FxHashMap<ScopeId, Vec<VariableId>> {
    let mut locals: FxHashMap<ScopeId, Vec<VariableId>> = FxHashMap::default();
    for variable in scopes.variables() {
        if variable.kind.is_type_only() || variable.lex_slot.is_some() || scopes.is_global(variable.id) {
            continue;
        }
        let scope = scopes.scope(variable.scope);
        let signature_only = matches!(
            ast.kind(scope.node),
            NodeKind::TSFunctionType { .. }
                | NodeKind::TSConstructorType { .. }
                | NodeKind::TSMethodSignature { .. }
                | NodeKind::TSSignatureDeclaration { .. }
        );
        if !signature_only {
            locals.entry(scope.function_scope).or_default().push(variable.id);
        }
    }
    locals
}
