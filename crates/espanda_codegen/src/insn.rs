//! The instruction model: opcodes, operands, registers and labels.
//!
//! The machine is an accumulator machine with virtual registers. Most
//! instructions read or write the accumulator implicitly; register operands
//! name the other inputs.

use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

/// A virtual register of the current function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VReg(pub u32);

impl VReg {
    /// The register `n` slots after this one.
    pub fn offset(self, n: u32) -> VReg {
        VReg(self.0 + n)
    }
}

impl fmt::Display for VReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A jump target inside one function. Bound to an instruction offset by
/// `PandaGen::bind_label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

macro_rules! opcodes {
    ($($variant:ident => $mnemonic:literal,)*) => {
        /// Every instruction the code generator emits.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }
        }
    };
}

opcodes! {
    // constants
    LdUndefined => "ldundefined",
    LdNull => "ldnull",
    LdTrue => "ldtrue",
    LdFalse => "ldfalse",
    LdHole => "ldhole",
    LdNan => "ldnan",
    LdInfinity => "ldinfinity",
    LdGlobal => "ldglobal",
    Ldai => "ldai",
    Fldai => "fldai",
    LdaStr => "ldastr",
    LdBigInt => "ldbigint",
    CreateRegExpWithLiteral => "createregexpwithliteral",

    // accumulator and registers
    Lda => "lda",
    Sta => "sta",
    Mov => "mov",

    // control flow
    Jmp => "jmp",
    Jeqz => "jeqz",
    Jnez => "jnez",
    Return => "return",
    ReturnUndefined => "returnundefined",
    Throw => "throw",
    ThrowConstAssignment => "throwconstassignment",
    ThrowIfNotObject => "throwifnotobject",
    ThrowUndefinedIfHole => "throwundefinedifhole",
    Debugger => "debugger",

    // operators
    Add2 => "add2",
    Sub2 => "sub2",
    Mul2 => "mul2",
    Div2 => "div2",
    Mod2 => "mod2",
    Exp => "exp",
    Shl2 => "shl2",
    Shr2 => "shr2",
    Ashr2 => "ashr2",
    And2 => "and2",
    Or2 => "or2",
    Xor2 => "xor2",
    Eq => "eq",
    NotEq => "noteq",
    StrictEq => "stricteq",
    StrictNotEq => "strictnoteq",
    Less => "less",
    LessEq => "lesseq",
    Greater => "greater",
    GreaterEq => "greatereq",
    IsIn => "isin",
    InstanceOf => "instanceof",
    TypeOf => "typeof",
    ToNumber => "tonumber",
    ToNumeric => "tonumeric",
    Neg => "neg",
    Not => "not",
    Inc => "inc",
    Dec => "dec",
    IsTrue => "istrue",
    IsFalse => "isfalse",

    // calls
    CallArg0 => "callarg0",
    CallArg1 => "callarg1",
    CallArgs2 => "callargs2",
    CallArgs3 => "callargs3",
    CallRange => "callrange",
    CallThis0 => "callthis0",
    CallThis1 => "callthis1",
    CallThis2 => "callthis2",
    CallThis3 => "callthis3",
    CallThisRange => "callthisrange",
    Apply => "apply",
    NewObjRange => "newobjrange",
    NewObjApply => "newobjapply",
    SuperCallThisRange => "supercallthisrange",
    SuperCallSpread => "supercallspread",

    // functions and classes
    DefineFunc => "definefunc",
    DefineMethod => "definemethod",
    DefineClass => "defineclass",
    DefineFieldByName => "definefieldbyname",
    CopyRestArgs => "copyrestargs",
    GetUnmappedArgs => "getunmappedargs",

    // objects and arrays
    CreateEmptyObject => "createemptyobject",
    CreateEmptyArray => "createemptyarray",
    CreateObjectWithBuffer => "createobjectwithbuffer",
    CreateArrayWithBuffer => "createarraywithbuffer",
    CreateObjectWithExcludedKeys => "createobjectwithexcludedkeys",
    CopyDataProperties => "copydataproperties",
    DefineGetterSetterByValue => "definegettersetterbyvalue",
    StArraySpread => "starrayspread",
    LdObjByName => "ldobjbyname",
    LdObjByValue => "ldobjbyvalue",
    StObjByName => "stobjbyname",
    StObjByValue => "stobjbyvalue",
    StOwnByName => "stownbyname",
    StOwnByValue => "stownbyvalue",
    StOwnByIndex => "stownbyindex",
    DelObjProp => "delobjprop",
    LdSuperByName => "ldsuperbyname",
    LdSuperByValue => "ldsuperbyvalue",
    StSuperByName => "stsuperbyname",
    StSuperByValue => "stsuperbyvalue",

    // variables
    TryLdGlobalByName => "tryldglobalbyname",
    TryStGlobalByName => "trystglobalbyname",
    LdGlobalVar => "ldglobalvar",
    StGlobalVar => "stglobalvar",
    StToGlobalRecord => "sttoglobalrecord",
    StConstToGlobalRecord => "stconsttoglobalrecord",
    NewLexEnv => "newlexenv",
    LdLexVar => "ldlexvar",
    StLexVar => "stlexvar",
    StModuleVar => "stmodulevar",

    // iteration
    GetIterator => "getiterator",
    GetAsyncIterator => "getasynciterator",
    CloseIterator => "closeiterator",
    GetPropIterator => "getpropiterator",
    GetNextPropName => "getnextpropname",

    // suspension
    CreateIterResultObj => "createiterresultobj",
    CreateGeneratorObj => "creategeneratorobj",
    CreateAsyncGeneratorObj => "createasyncgeneratorobj",
    SuspendGenerator => "suspendgenerator",
    ResumeGenerator => "resumegenerator",
    GetResumeMode => "getresumemode",
    AsyncFunctionEnter => "asyncfunctionenter",
    AsyncFunctionAwaitUncaught => "asyncfunctionawaituncaught",
    AsyncFunctionResolve => "asyncfunctionresolve",
    AsyncFunctionReject => "asyncfunctionreject",
    AsyncGeneratorResolve => "asyncgeneratorresolve",
    AsyncGeneratorReject => "asyncgeneratorreject",
}

impl Opcode {
    /// Instructions that transfer control to a label operand.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jeqz | Opcode::Jnez)
    }

    /// Instructions after which control never falls through.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Return | Opcode::ReturnUndefined | Opcode::Throw
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    Reg(VReg),
    Imm(i64),
    Double(f64),
    /// A string constant or a property / global name.
    Str(String),
    Label(Label),
    /// Internal name of a compiled function.
    Function(String),
    /// Id of a literal buffer.
    Literal(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(value) => write!(f, "{value}"),
            Operand::Double(value) => write!(f, "{value:?}"),
            Operand::Str(value) => write!(f, "{value:?}"),
            Operand::Label(label) => write!(f, "{label}"),
            Operand::Function(name) | Operand::Literal(name) => f.write_str(name),
        }
    }
}

impl From<VReg> for Operand {
    fn from(reg: VReg) -> Self {
        Operand::Reg(reg)
    }
}

impl From<Label> for Operand {
    fn from(label: Label) -> Self {
        Operand::Label(label)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Imm(value)
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Imm(i64::from(value))
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Str(value.to_string())
    }
}

pub type Operands = SmallVec<[Operand; 3]>;

/// One emitted instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insn {
    pub opcode: Opcode,
    pub operands: Operands,
}

impl Insn {
    pub fn new(opcode: Opcode, operands: Operands) -> Self {
        Self { opcode, operands }
    }

    /// The label a jump instruction targets.
    pub fn jump_target(&self) -> Option<Label> {
        if !self.opcode.is_jump() {
            return None;
        }
        self.operands.iter().find_map(|operand| match operand {
            Operand::Label(label) => Some(*label),
            _ => None,
        })
    }

    pub fn registers(&self) -> impl Iterator<Item = VReg> + '_ {
        self.operands.iter().filter_map(|operand| match operand {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        })
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.as_str())?;
        for (i, operand) in self.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{operand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_display() {
        let insn = Insn::new(Opcode::StOwnByName, smallvec!["x".into(), VReg(3).into()]);
        assert_eq!(insn.to_string(), "stownbyname \"x\", v3");
        assert_eq!(Insn::new(Opcode::ReturnUndefined, smallvec![]).to_string(), "returnundefined");
    }

    #[test]
    fn test_jump_target() {
        let jump = Insn::new(Opcode::Jeqz, smallvec![Label(4).into()]);
        assert_eq!(jump.jump_target(), Some(Label(4)));
        let store = Insn::new(Opcode::Sta, smallvec![VReg(0).into()]);
        assert_eq!(store.jump_target(), None);
    }
}
