//! The output of code generation.

use serde::Serialize;
use std::fmt;

use crate::insn::{Insn, Label, Opcode};

/// Every function of one file plus the literal buffers they reference.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompiledProgram {
    pub record_name: String,
    /// In compilation order; the first entry is the file's top-level code.
    pub functions: Vec<CompiledFunction>,
    pub literal_buffers: Vec<LiteralBuffer>,
    /// Declared types of the top-level bindings, when checked types were
    /// supplied.
    pub type_info: Option<TypeInfo>,
}

impl CompiledProgram {
    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn main(&self) -> Option<&CompiledFunction> {
        self.functions.first()
    }

    pub fn literal_buffer(&self, id: &str) -> Option<&LiteralBuffer> {
        self.literal_buffers.iter().find(|b| b.id == id)
    }

    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.insns.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Normal,
    Async,
    Generator,
    AsyncGenerator,
}

impl FunctionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionKind::Normal => "normal",
            FunctionKind::Async => "async",
            FunctionKind::Generator => "generator",
            FunctionKind::AsyncGenerator => "async_generator",
        }
    }

    pub fn is_async(self) -> bool {
        matches!(self, FunctionKind::Async | FunctionKind::AsyncGenerator)
    }

    pub fn is_generator(self) -> bool {
        matches!(self, FunctionKind::Generator | FunctionKind::AsyncGenerator)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledFunction {
    /// Internal name, unique within the program.
    pub name: String,
    pub kind: FunctionKind,
    /// Declared parameter count, not counting the implicit ones.
    pub params: u32,
    /// Registers used, implicit parameters included.
    pub regs: u32,
    pub insns: Vec<Insn>,
    /// Instruction offset of each label, indexed by label number.
    pub label_offsets: Vec<Option<u32>>,
    /// Innermost handlers first.
    pub catch_tables: Vec<CatchTable>,
    pub resume_points: Vec<ResumePoint>,
    /// Every break/continue target that was live while compiling.
    pub label_targets: Vec<LabelTargetEntry>,
}

impl CompiledFunction {
    pub fn label_offset(&self, label: Label) -> Option<u32> {
        self.label_offsets.get(label.0 as usize).copied().flatten()
    }

    /// Offsets of the instructions with `opcode`.
    pub fn find(&self, opcode: Opcode) -> impl Iterator<Item = usize> + '_ {
        self.insns
            .iter()
            .enumerate()
            .filter(move |(_, insn)| insn.opcode == opcode)
            .map(|(i, _)| i)
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        self.insns.iter().map(|insn| insn.opcode).collect()
    }
}

/// An exception handler range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatchTable {
    pub try_begin: Label,
    pub try_end: Label,
    pub catch_begin: Label,
    /// Nesting depth of the `try`; deeper tables are searched first.
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendKind {
    /// The suspension a generator performs before running its body.
    Initial,
    Await,
    Yield,
}

/// An instruction offset execution resumes at after a suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResumePoint {
    pub kind: SuspendKind,
    pub offset: u32,
}

/// A loop, switch or labelled statement and the labels jumps to it use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelTargetEntry {
    /// The statement's node id.
    pub node: u32,
    /// Source label, for labelled statements.
    pub label: Option<String>,
    pub break_label: Option<Label>,
    pub continue_label: Option<Label>,
}

/// A constant table used by `createobjectwithbuffer`,
/// `createarraywithbuffer` and `defineclass`.
#[derive(Debug, Clone, Serialize)]
pub struct LiteralBuffer {
    pub id: String,
    pub entries: Vec<LiteralValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    Undefined,
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// A method: its internal function name and formal parameter count.
    Method { function: String, params: u32 },
    /// Another literal buffer, by id.
    LiteralArray(String),
}

/// Where the recorded types of a program live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    /// Id of the summary buffer, which lists every user type buffer.
    pub summary: String,
    /// Type index of each top-level value binding, in declaration order.
    pub bindings: Vec<TypedBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedBinding {
    pub name: String,
    pub type_index: i64,
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Undefined => f.write_str("undefined"),
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Bool(value) => write!(f, "{value}"),
            LiteralValue::Integer(value) => write!(f, "{value}"),
            LiteralValue::Double(value) => write!(f, "{value:?}"),
            LiteralValue::String(value) => write!(f, "{value:?}"),
            LiteralValue::Method { function, params } => write!(f, "method {function}({params})"),
            LiteralValue::LiteralArray(id) => write!(f, "literalarray {id}"),
        }
    }
}

// ============================================================================
// Disassembly
// ============================================================================

impl fmt::Display for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".record {}", self.record_name)?;
        if let Some(info) = &self.type_info {
            writeln!(f, ".typesummary {}", info.summary)?;
            for binding in &info.bindings {
                writeln!(f, ".typeof {} {}", binding.name, binding.type_index)?;
            }
        }
        for buffer in &self.literal_buffers {
            write!(f, "\n.literals {} {{", buffer.id)?;
            for (i, entry) in buffer.entries.iter().enumerate() {
                f.write_str(if i == 0 { " " } else { ", " })?;
                write!(f, "{entry}")?;
            }
            writeln!(f, " }}")?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

impl fmt::Display for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            ".function {}({}) kind={} regs={}",
            self.name,
            self.params,
            self.kind.as_str(),
            self.regs
        )?;
        let mut labels_at: Vec<(u32, Label)> = self
            .label_offsets
            .iter()
            .enumerate()
            .filter_map(|(i, offset)| offset.map(|offset| (offset, Label(i as u32))))
            .collect();
        labels_at.sort();
        let mut next = labels_at.iter().peekable();
        for (offset, insn) in self.insns.iter().enumerate() {
            while let Some((_, label)) = next.next_if(|(at, _)| *at as usize == offset) {
                writeln!(f, "{label}:")?;
            }
            writeln!(f, "    {insn}")?;
        }
        for (_, label) in next {
            writeln!(f, "{label}:")?;
        }
        for table in &self.catch_tables {
            writeln!(
                f,
                ".catch {}, {}, {} depth={}",
                table.try_begin, table.try_end, table.catch_begin, table.depth
            )?;
        }
        for point in &self.resume_points {
            let kind = match point.kind {
                SuspendKind::Initial => "initial",
                SuspendKind::Await => "await",
                SuspendKind::Yield => "yield",
            };
            writeln!(f, ".resume {kind} @{}", point.offset)?;
        }
        writeln!(f, ".end")
    }
}
