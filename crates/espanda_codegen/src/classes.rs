//! Class definitions and instance field initialization.

use espanda_ast::{Ast, MethodKind, NodeId, NodeKind};

use crate::error::CompileResult;
use crate::insn::{Opcode, Operand, VReg};
use crate::pandagen::{formal_length, static_property_name, PandaGen, FUNCTION_REG, THIS_REG};
use crate::program::LiteralValue;

impl PandaGen<'_, '_> {
    /// Define the class `definition`, leaving the constructor in the
    /// accumulator.
    ///
    /// Plain named methods travel in the class literal buffer:
    /// `[name, method]` pairs for the prototype, then for the constructor,
    /// then the static pair count. Accessors, computed methods and static
    /// fields are attached after `defineclass`.
    pub(crate) fn compile_class(&mut self, definition: NodeId) -> CompileResult {
        let ast = self.ast;
        let NodeKind::ClassDefinition { super_class, body, .. } = ast.kind(definition) else {
            unreachable!("class codegen for a {}", ast.kind(definition).type_name());
        };
        self.with_reg_scope(|pg| {
            let base = pg.alloc_reg()?;
            match super_class {
                Some(super_class) => pg.compile_expression(*super_class)?,
                None => pg.emit0(Opcode::LdHole),
            }
            pg.store_acc(base);

            let (ctor_name, ctor_length) = match constructor_function(ast, definition) {
                Some(function) => (pg.program.function_name(ast, function), formal_length(ast, function)),
                None => (pg.program.implicit_constructor_name(ast, definition), 0),
            };

            let mut instance = Vec::new();
            let mut statics = Vec::new();
            for &member in body {
                let Some((name, function, is_static)) = buffered_method(ast, member) else {
                    continue;
                };
                let entries = if is_static { &mut statics } else { &mut instance };
                entries.push(LiteralValue::String(name));
                entries.push(LiteralValue::Method {
                    function: pg.program.function_name(ast, function),
                    params: formal_length(ast, function),
                });
            }
            let static_pairs = (statics.len() / 2) as i64;
            let mut entries = instance;
            entries.extend(statics);
            entries.push(LiteralValue::Integer(static_pairs));
            let literal = pg.program.add_literal_buffer(entries);

            pg.emit4(
                Opcode::DefineClass,
                Operand::Function(ctor_name),
                Operand::Literal(literal),
                ctor_length,
                base,
            );
            let class = pg.spill()?;
            pg.emit1(Opcode::LdObjByName, "prototype");
            let proto = pg.spill()?;

            for &member in body {
                if buffered_method(ast, member).is_none() {
                    pg.compile_class_member(member, class, proto)?;
                }
            }
            pg.load_acc(class);
            Ok(())
        })
    }

    fn compile_class_member(&mut self, member: NodeId, class: VReg, proto: VReg) -> CompileResult {
        let ast = self.ast;
        match ast.kind(member) {
            NodeKind::MethodDefinition {
                kind,
                key,
                is_static,
                computed,
                ..
            } => {
                let Some(function) = method_function(ast, member) else {
                    return Ok(());
                };
                if *kind == MethodKind::Constructor {
                    return Ok(());
                }
                let target = if *is_static { class } else { proto };
                self.with_reg_scope(|pg| {
                    let key = pg.compile_property_key(*key, *computed)?;
                    pg.load_acc(target);
                    pg.define_function(function)?;
                    match kind {
                        MethodKind::Get | MethodKind::Set => pg.define_accessor(target, key, *kind == MethodKind::Get),
                        _ => {
                            pg.emit2(Opcode::StOwnByValue, target, key);
                            Ok(())
                        }
                    }
                })
            }
            NodeKind::ClassProperty {
                key,
                value,
                is_static: true,
                computed,
                ..
            } => self.with_reg_scope(|pg| {
                let name = (!*computed).then(|| static_property_name(ast, *key)).flatten();
                let key = match name {
                    Some(_) => None,
                    None => Some(pg.compile_property_key(*key, true)?),
                };
                match value {
                    Some(value) => pg.compile_expression(*value)?,
                    None => pg.load_undefined(),
                }
                match (name, key) {
                    (Some(name), _) => pg.emit2(Opcode::StOwnByName, name.as_str(), class),
                    (None, Some(key)) => pg.emit2(Opcode::StOwnByValue, class, key),
                    (None, None) => {}
                }
                Ok(())
            }),
            NodeKind::ClassProperty { computed: true, .. } => {
                Err(self.unsupported(member, "computed instance field names"))
            }
            _ => Ok(()),
        }
    }

    /// Evaluate a property key into a fresh register.
    pub(crate) fn compile_property_key(&mut self, key: NodeId, computed: bool) -> CompileResult<VReg> {
        match (!computed).then(|| static_property_name(self.ast, key)).flatten() {
            Some(name) => self.load_string(&name),
            None => self.compile_expression(key)?,
        }
        self.spill()
    }

    /// Install the function in the accumulator as the getter or setter
    /// named by `key` on `target`.
    pub(crate) fn define_accessor(&mut self, target: VReg, key: VReg, is_getter: bool) -> CompileResult {
        let function = self.spill()?;
        let missing = self.alloc_reg()?;
        self.load_undefined();
        self.store_acc(missing);
        let (getter, setter) = if is_getter { (function, missing) } else { (missing, function) };
        self.emit0(Opcode::LdFalse);
        self.emit4(Opcode::DefineGetterSetterByValue, target, key, getter, setter);
        Ok(())
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Run the instance field initializers of `class` against `this`.
    /// Initializers see the scope the class was defined in.
    pub(crate) fn initialize_fields(&mut self, class: NodeId) -> CompileResult {
        let class_scope = self.scopes.scope_of(class).unwrap_or(self.scope);
        let saved = std::mem::replace(&mut self.scope, class_scope);
        let result = self.define_fields(class);
        self.scope = saved;
        result
    }

    fn define_fields(&mut self, class: NodeId) -> CompileResult {
        let ast = self.ast;
        let NodeKind::ClassDefinition { body, .. } = ast.kind(class) else {
            return Ok(());
        };
        for &member in body {
            let NodeKind::ClassProperty {
                key,
                value,
                is_static: false,
                computed,
                ..
            } = ast.kind(member)
            else {
                continue;
            };
            let Some(name) = (!*computed).then(|| static_property_name(ast, *key)).flatten() else {
                return Err(self.unsupported(member, "computed instance field names"));
            };
            match value {
                Some(value) => self.compile_expression(*value)?,
                None => self.load_undefined(),
            }
            self.emit2(Opcode::DefineFieldByName, name.as_str(), THIS_REG);
        }
        Ok(())
    }

    /// `super(...)`: construct through the parent class and bind `this`.
    pub(crate) fn compile_super_call(&mut self, node: NodeId, arguments: &[NodeId]) -> CompileResult {
        let Some(class) = self.ctor_class else {
            return Err(self.unsupported(node, "'super' call outside a constructor"));
        };
        let ast = self.ast;
        let has_spread = arguments
            .iter()
            .any(|&arg| matches!(ast.kind(arg), NodeKind::SpreadElement { .. }));
        self.with_reg_scope(|pg| {
            if has_spread {
                let args = pg.alloc_reg()?;
                pg.compile_array_into(arguments, args)?;
                pg.load_acc(FUNCTION_REG);
                pg.emit1(Opcode::SuperCallSpread, args);
            } else {
                let start = pg.alloc_regs(arguments.len() as u32)?;
                for (i, &arg) in arguments.iter().enumerate() {
                    pg.compile_expression(arg)?;
                    pg.store_acc(start.offset(i as u32));
                }
                pg.load_acc(FUNCTION_REG);
                pg.emit2(Opcode::SuperCallThisRange, arguments.len() as u32, start);
            }
            Ok(())
        })?;
        self.store_this();
        self.with_reg_scope(|pg| {
            let instance = pg.spill()?;
            pg.initialize_fields(class)?;
            pg.load_acc(instance);
            Ok(())
        })
    }
}

/// The `ScriptFunction` a method definition holds, if it has a body.
pub(crate) fn method_function(ast: &Ast, method: NodeId) -> Option<NodeId> {
    let NodeKind::MethodDefinition { value, .. } = ast.kind(method) else {
        return None;
    };
    let NodeKind::FunctionExpression { function } = ast.kind(*value) else {
        return None;
    };
    match ast.kind(*function) {
        NodeKind::ScriptFunction { body: Some(_), .. } => Some(*function),
        _ => None,
    }
}

/// The implementation of the class constructor, skipping overload
/// signatures.
fn constructor_function(ast: &Ast, class: NodeId) -> Option<NodeId> {
    let NodeKind::ClassDefinition { ctor, body, .. } = ast.kind(class) else {
        return None;
    };
    ctor.iter()
        .chain(body.iter())
        .filter(|&&member| {
            matches!(
                ast.kind(member),
                NodeKind::MethodDefinition {
                    kind: MethodKind::Constructor,
                    ..
                }
            )
        })
        .find_map(|&member| method_function(ast, member))
}

/// A plain method with a static name: `(name, function, is_static)`.
fn buffered_method(ast: &Ast, member: NodeId) -> Option<(String, NodeId, bool)> {
    let NodeKind::MethodDefinition {
        kind: MethodKind::Method,
        key,
        is_static,
        computed: false,
        ..
    } = ast.kind(member)
    else {
        return None;
    };
    let name = static_property_name(ast, *key)?;
    Some((name, method_function(ast, member)?, *is_static))
}
