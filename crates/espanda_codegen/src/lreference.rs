//! Assignment targets and destructuring.

use espanda_ast::{NodeId, NodeKind};

use crate::error::CompileResult;
use crate::insn::{Opcode, VReg};
use crate::pandagen::{static_property_name, PandaGen};

/// An evaluated assignment target. Creating one evaluates the object and
/// key parts into registers of the caller's register scope, so the value
/// can be read and written afterwards without evaluating them again.
#[derive(Debug, Clone)]
pub(crate) enum Reference {
    Variable { node: NodeId },
    Named { object: VReg, name: String },
    Keyed { object: VReg, key: VReg },
    SuperNamed { this: VReg, name: String },
    SuperKeyed { this: VReg, key: VReg },
    /// A destructuring pattern; write-only.
    Pattern { node: NodeId },
}

impl PandaGen<'_, '_> {
    pub(crate) fn reference_of(&mut self, target: NodeId) -> CompileResult<Reference> {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Identifier { .. } => Ok(Reference::Variable { node: target }),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let name = (!*computed).then(|| static_property_name(ast, *property)).flatten();
                if matches!(ast.kind(*object), NodeKind::SuperExpression) {
                    self.load_this();
                    let this = self.spill()?;
                    return Ok(match name {
                        Some(name) => Reference::SuperNamed { this, name },
                        None => {
                            self.compile_expression(*property)?;
                            Reference::SuperKeyed {
                                this,
                                key: self.spill()?,
                            }
                        }
                    });
                }
                self.compile_expression(*object)?;
                let object = self.spill()?;
                Ok(match name {
                    Some(name) => Reference::Named { object, name },
                    None => {
                        self.compile_expression(*property)?;
                        Reference::Keyed {
                            object,
                            key: self.spill()?,
                        }
                    }
                })
            }
            NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. } => Ok(Reference::Pattern { node: target }),
            NodeKind::TSAsExpression { expression, .. } | NodeKind::TSNonNullExpression { expression } => {
                self.reference_of(*expression)
            }
            _ => Err(self.unsupported(target, "this assignment target")),
        }
    }

    /// Load the target's current value.
    pub(crate) fn get_value(&mut self, reference: &Reference) -> CompileResult {
        match reference {
            Reference::Variable { node } => {
                if let Some(name) = self.ast.identifier_name(*node) {
                    self.load_var(*node, name);
                }
            }
            Reference::Named { object, name } => {
                self.load_acc(*object);
                self.emit1(Opcode::LdObjByName, name.as_str());
            }
            Reference::Keyed { object, key } => {
                self.load_acc(*key);
                self.emit1(Opcode::LdObjByValue, *object);
            }
            Reference::SuperNamed { this, name } => {
                self.load_acc(*this);
                self.emit1(Opcode::LdSuperByName, name.as_str());
            }
            Reference::SuperKeyed { this, key } => {
                self.load_acc(*key);
                self.emit1(Opcode::LdSuperByValue, *this);
            }
            Reference::Pattern { node } => return Err(self.unsupported(*node, "reading a destructuring pattern")),
        }
        Ok(())
    }

    /// Store the accumulator into the target; the accumulator keeps the
    /// stored value.
    pub(crate) fn set_value(&mut self, reference: &Reference) -> CompileResult {
        match reference {
            Reference::Variable { node } => self.store_var(*node, false),
            Reference::Named { object, name } => self.emit2(Opcode::StObjByName, name.as_str(), *object),
            Reference::Keyed { object, key } => self.emit2(Opcode::StObjByValue, *object, *key),
            Reference::SuperNamed { this, name } => self.emit2(Opcode::StSuperByName, name.as_str(), *this),
            Reference::SuperKeyed { this, key } => self.emit2(Opcode::StSuperByValue, *this, *key),
            Reference::Pattern { node } => {
                let node = *node;
                self.with_reg_scope(|pg| {
                    let value = pg.spill()?;
                    pg.destructure(node, value, false)?;
                    pg.load_acc(value);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Destructuring
    // ========================================================================

    /// Assign `value` to `target`: a name, a pattern or (outside
    /// declarations) any assignment target. Clobbers the accumulator.
    pub(crate) fn destructure(&mut self, target: NodeId, value: VReg, is_declaration: bool) -> CompileResult {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Identifier { .. } => {
                self.load_acc(value);
                self.store_var(target, is_declaration);
                Ok(())
            }
            NodeKind::AssignmentPattern { left, right } => self.with_reg_scope(|pg| {
                let has_value = pg.alloc_label();
                let resolved = pg.alloc_reg()?;
                pg.load_acc(value);
                pg.store_acc(resolved);
                pg.load_undefined();
                pg.emit1(Opcode::StrictEq, resolved);
                pg.emit1(Opcode::Jeqz, has_value);
                pg.compile_expression(*right)?;
                pg.store_acc(resolved);
                pg.bind_label(has_value);
                pg.destructure(*left, resolved, is_declaration)
            }),
            NodeKind::ArrayPattern { elements, .. } => self.destructure_array(elements, value, is_declaration),
            NodeKind::ObjectPattern { properties, .. } => self.destructure_object(properties, value, is_declaration),
            _ => self.with_reg_scope(|pg| {
                let reference = pg.reference_of(target)?;
                pg.load_acc(value);
                pg.set_value(&reference)
            }),
        }
    }

    /// Array patterns pull from the value's iterator one step per element.
    /// `done` records exhaustion so later steps yield `undefined` without
    /// calling `next` again, and so an unfinished iterator gets closed.
    fn destructure_array(&mut self, elements: &[NodeId], value: VReg, is_declaration: bool) -> CompileResult {
        let ast = self.ast;
        self.with_reg_scope(|pg| {
            pg.load_acc(value);
            pg.emit0(Opcode::GetIterator);
            let iterator = pg.spill()?;
            pg.emit1(Opcode::LdObjByName, "next");
            let next = pg.spill()?;
            let done = pg.alloc_reg()?;
            pg.emit0(Opcode::LdFalse);
            pg.store_acc(done);

            for &element in elements {
                pg.with_reg_scope(|pg| match ast.kind(element) {
                    NodeKind::RestElement { argument, .. } => {
                        let rest = pg.collect_rest(iterator, next, done)?;
                        pg.destructure(*argument, rest, is_declaration)
                    }
                    NodeKind::OmittedExpression => {
                        pg.iterator_step(iterator, next, done)?;
                        Ok(())
                    }
                    _ => {
                        pg.iterator_step(iterator, next, done)?;
                        let item = pg.spill()?;
                        pg.destructure(element, item, is_declaration)
                    }
                })?;
            }

            let closed = pg.alloc_label();
            pg.load_acc(done);
            pg.emit1(Opcode::Jnez, closed);
            pg.emit1(Opcode::CloseIterator, iterator);
            pg.bind_label(closed);
            Ok(())
        })
    }

    /// Load the iterator's next value, or `undefined` once it is done.
    fn iterator_step(&mut self, iterator: VReg, next: VReg, done: VReg) -> CompileResult {
        let (exhausted, end) = (self.alloc_label(), self.alloc_label());
        self.with_reg_scope(|pg| {
            pg.load_acc(done);
            pg.emit1(Opcode::Jnez, exhausted);
            pg.load_acc(next);
            pg.emit1(Opcode::CallThis0, iterator);
            pg.emit0(Opcode::ThrowIfNotObject);
            let result = pg.spill()?;
            pg.emit1(Opcode::LdObjByName, "done");
            pg.store_acc(done);
            pg.emit1(Opcode::Jnez, exhausted);
            pg.load_acc(result);
            pg.emit1(Opcode::LdObjByName, "value");
            pg.jump(end);
            Ok(())
        })?;
        self.bind_label(exhausted);
        self.load_undefined();
        self.bind_label(end);
        Ok(())
    }

    /// Drain the iterator into a new array.
    fn collect_rest(&mut self, iterator: VReg, next: VReg, done: VReg) -> CompileResult<VReg> {
        self.emit0(Opcode::CreateEmptyArray);
        let rest = self.spill()?;
        let index = self.alloc_reg()?;
        self.emit1(Opcode::Ldai, 0i64);
        self.store_acc(index);
        let (again, end) = (self.alloc_label(), self.alloc_label());
        self.bind_label(again);
        self.with_reg_scope(|pg| {
            pg.load_acc(done);
            pg.emit1(Opcode::Jnez, end);
            pg.load_acc(next);
            pg.emit1(Opcode::CallThis0, iterator);
            pg.emit0(Opcode::ThrowIfNotObject);
            let result = pg.spill()?;
            pg.emit1(Opcode::LdObjByName, "done");
            pg.store_acc(done);
            pg.emit1(Opcode::Jnez, end);
            pg.load_acc(result);
            pg.emit1(Opcode::LdObjByName, "value");
            pg.emit2(Opcode::StOwnByValue, rest, index);
            pg.load_acc(index);
            pg.emit0(Opcode::Inc);
            pg.store_acc(index);
            pg.jump(again);
            Ok(())
        })?;
        self.bind_label(end);
        Ok(rest)
    }

    fn destructure_object(&mut self, properties: &[NodeId], value: VReg, is_declaration: bool) -> CompileResult {
        let ast = self.ast;
        let mut excluded = Vec::new();
        for &property in properties {
            match ast.kind(property) {
                NodeKind::Property {
                    key,
                    value: target,
                    computed,
                    ..
                } => {
                    let name = (!*computed).then(|| static_property_name(ast, *key)).flatten();
                    self.with_reg_scope(|pg| {
                        match &name {
                            Some(name) => {
                                pg.load_acc(value);
                                pg.emit1(Opcode::LdObjByName, name.as_str());
                            }
                            None => {
                                pg.compile_expression(*key)?;
                                pg.emit1(Opcode::LdObjByValue, value);
                            }
                        }
                        let item = pg.spill()?;
                        pg.destructure(*target, item, is_declaration)
                    })?;
                    excluded.push((property, name));
                }
                NodeKind::RestElement { argument, .. } => {
                    // the rest object needs every key seen so far
                    if let Some(&(computed, _)) = excluded.iter().find(|(_, name)| name.is_none()) {
                        return Err(self.unsupported(computed, "object rest after a computed key"));
                    }
                    let count = excluded.len() as u32;
                    self.with_reg_scope(|pg| {
                        let first = pg.alloc_regs(count.max(1))?;
                        for (i, (_, name)) in excluded.iter().enumerate() {
                            pg.load_string(name.as_deref().unwrap_or_default());
                            pg.store_acc(first.offset(i as u32));
                        }
                        pg.emit3(Opcode::CreateObjectWithExcludedKeys, count, value, first);
                        let rest = pg.spill()?;
                        pg.destructure(*argument, rest, is_declaration)
                    })?;
                }
                _ => unreachable!("{} in an object pattern", ast.kind(property).type_name()),
            }
        }
        Ok(())
    }
}
