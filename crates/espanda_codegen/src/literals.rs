//! Array and object literals.
//!
//! A leading run of constant elements (or constant `key: value`
//! properties) goes into a literal buffer and is created in one
//! instruction; the rest is stored one element at a time.

use espanda_ast::{NodeId, NodeKind, PropertyKind};

use crate::error::CompileResult;
use crate::insn::{Opcode, Operand, VReg};
use crate::pandagen::{constant_literal, static_property_name, PandaGen};
use crate::program::LiteralValue;

impl PandaGen<'_, '_> {
    pub(crate) fn compile_array_literal(&mut self, elements: &[NodeId]) -> CompileResult {
        self.with_reg_scope(|pg| {
            let array = pg.alloc_reg()?;
            pg.compile_array_into(elements, array)?;
            pg.load_acc(array);
            Ok(())
        })
    }

    /// Build an array from `elements` (spreads and holes included) into
    /// `array`. Also used to collect spread call arguments.
    pub(crate) fn compile_array_into(&mut self, elements: &[NodeId], array: VReg) -> CompileResult {
        let ast = self.ast;
        let constants: Vec<LiteralValue> = elements
            .iter()
            .map_while(|&element| constant_literal(ast, element))
            .collect();
        let buffered = constants.len();
        if constants.is_empty() {
            self.emit0(Opcode::CreateEmptyArray);
        } else {
            let literal = self.program.add_literal_buffer(constants);
            self.emit1(Opcode::CreateArrayWithBuffer, Operand::Literal(literal));
        }
        self.store_acc(array);

        // indices are immediates until the first spread makes them dynamic
        let mut index_reg: Option<VReg> = None;
        for (position, &element) in elements.iter().enumerate().skip(buffered) {
            if let NodeKind::SpreadElement { argument } = ast.kind(element) {
                let index = match index_reg {
                    Some(index) => index,
                    None => {
                        let index = self.alloc_reg()?;
                        self.emit1(Opcode::Ldai, position as i64);
                        self.store_acc(index);
                        index_reg = Some(index);
                        index
                    }
                };
                self.compile_expression(*argument)?;
                self.emit2(Opcode::StArraySpread, array, index);
                self.load_acc(array);
                self.emit1(Opcode::LdObjByName, "length");
                self.store_acc(index);
                continue;
            }

            match ast.kind(element) {
                NodeKind::OmittedExpression => self.emit0(Opcode::LdHole),
                _ => self.compile_expression(element)?,
            }
            match index_reg {
                Some(index) => {
                    self.emit2(Opcode::StOwnByValue, array, index);
                    self.load_acc(index);
                    self.emit0(Opcode::Inc);
                    self.store_acc(index);
                }
                None => self.emit2(Opcode::StOwnByIndex, array, position as u32),
            }
        }
        Ok(())
    }

    pub(crate) fn compile_object_literal(&mut self, properties: &[NodeId]) -> CompileResult {
        let ast = self.ast;
        let mut constants = Vec::new();
        for &property in properties {
            match constant_property(ast, property) {
                Some((name, value)) => {
                    constants.push(LiteralValue::String(name));
                    constants.push(value);
                }
                None => break,
            }
        }
        let buffered = constants.len() / 2;
        if constants.is_empty() {
            self.emit0(Opcode::CreateEmptyObject);
        } else {
            let literal = self.program.add_literal_buffer(constants);
            self.emit1(Opcode::CreateObjectWithBuffer, Operand::Literal(literal));
        }

        self.with_reg_scope(|pg| {
            let object = pg.spill()?;
            for &property in &properties[buffered..] {
                pg.with_reg_scope(|pg| pg.compile_object_property(object, property))?;
            }
            pg.load_acc(object);
            Ok(())
        })
    }

    fn compile_object_property(&mut self, object: VReg, property: NodeId) -> CompileResult {
        let ast = self.ast;
        match ast.kind(property) {
            NodeKind::SpreadElement { argument } => {
                self.compile_expression(*argument)?;
                self.emit1(Opcode::CopyDataProperties, object);
                Ok(())
            }
            NodeKind::Property {
                kind,
                key,
                value,
                computed,
                ..
            } => {
                let name = (!*computed).then(|| static_property_name(ast, *key)).flatten();
                let key = match name {
                    Some(_) if !matches!(kind, PropertyKind::Get | PropertyKind::Set) => None,
                    _ => Some(self.compile_property_key(*key, *computed)?),
                };
                match kind {
                    PropertyKind::Get | PropertyKind::Set => {
                        let Some(key) = key else {
                            return Ok(());
                        };
                        self.load_acc(object);
                        self.compile_property_value(*value)?;
                        self.define_accessor(object, key, *kind == PropertyKind::Get)
                    }
                    PropertyKind::Init | PropertyKind::Method => {
                        if *kind == PropertyKind::Method {
                            self.load_acc(object);
                        }
                        self.compile_property_value(*value)?;
                        match (name, key) {
                            (Some(name), _) => self.emit2(Opcode::StOwnByName, name.as_str(), object),
                            (None, Some(key)) => self.emit2(Opcode::StOwnByValue, object, key),
                            (None, None) => {}
                        }
                        Ok(())
                    }
                }
            }
            _ => unreachable!("{} in an object literal", ast.kind(property).type_name()),
        }
    }

    /// Methods and accessors are defined against the home object already in
    /// the accumulator.
    fn compile_property_value(&mut self, value: NodeId) -> CompileResult {
        match self.ast.kind(value) {
            NodeKind::FunctionExpression { function } => self.define_function(*function),
            _ => self.compile_expression(value),
        }
    }
}

/// `name: constant` with a static name.
fn constant_property(ast: &espanda_ast::Ast, property: NodeId) -> Option<(String, LiteralValue)> {
    let NodeKind::Property {
        kind: PropertyKind::Init,
        key,
        value,
        computed: false,
        ..
    } = ast.kind(property)
    else {
        return None;
    };
    Some((static_property_name(ast, *key)?, constant_literal(ast, *value)?))
}
