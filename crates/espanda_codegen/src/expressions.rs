//! Expression codegen. Every expression leaves its value in the
//! accumulator.

use espanda_ast::{
    AssignmentOperator, BinaryOperator, MetaPropertyKind, NodeId, NodeKind, UnaryOperator, UpdateOperator,
};
use espanda_core::intern::Atom;

use crate::error::CompileResult;
use crate::insn::{Label, Opcode, VReg};
use crate::pandagen::{static_property_name, PandaGen, NEW_TARGET_REG};

impl PandaGen<'_, '_> {
    pub(crate) fn compile_expression(&mut self, node: NodeId) -> CompileResult {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::NumberLiteral { value } => self.load_number(*value),
            NodeKind::StringLiteral { value } => self.load_string(ast.str(*value)),
            NodeKind::BooleanLiteral { value } => self.emit0(if *value { Opcode::LdTrue } else { Opcode::LdFalse }),
            NodeKind::NullLiteral => self.emit0(Opcode::LdNull),
            NodeKind::BigIntLiteral { value } => self.emit1(Opcode::LdBigInt, ast.str(*value)),
            NodeKind::RegExpLiteral { pattern, flags } => {
                self.emit2(Opcode::CreateRegExpWithLiteral, ast.str(*pattern), ast.str(*flags))
            }
            NodeKind::TemplateLiteral { quasis, expressions } => self.compile_template(quasis, expressions)?,
            NodeKind::Identifier { name, .. } => self.compile_identifier(node, *name),
            NodeKind::ThisExpression => self.load_this(),
            NodeKind::SuperExpression => return Err(self.unsupported(node, "'super' outside a call or member access")),
            NodeKind::ArrayExpression { elements } => self.compile_array_literal(elements)?,
            NodeKind::ObjectExpression { properties } => self.compile_object_literal(properties)?,
            NodeKind::FunctionExpression { function } | NodeKind::ArrowFunctionExpression { function } => {
                self.define_function(*function)?
            }
            NodeKind::ClassExpression { definition } => self.compile_class(*definition)?,
            NodeKind::UnaryExpression { operator, argument } => self.compile_unary(node, *operator, *argument)?,
            NodeKind::UpdateExpression {
                operator,
                prefix,
                argument,
            } => self.compile_update(*operator, *prefix, *argument)?,
            NodeKind::BinaryExpression { operator, left, right } => self.compile_binary(*operator, *left, *right)?,
            NodeKind::AssignmentExpression { operator, left, right } => {
                self.compile_assignment(*operator, *left, *right)?
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let (otherwise, end) = (self.alloc_label(), self.alloc_label());
                self.compile_condition(*test, otherwise)?;
                self.compile_expression(*consequent)?;
                self.jump(end);
                self.bind_label(otherwise);
                self.compile_expression(*alternate)?;
                self.bind_label(end);
            }
            NodeKind::SequenceExpression { expressions } => {
                for &expression in expressions {
                    self.compile_expression(expression)?;
                }
            }
            NodeKind::CallExpression { .. } | NodeKind::MemberExpression { .. } => self.compile_chain(node)?,
            NodeKind::NewExpression { callee, arguments, .. } => self.compile_new(*callee, arguments)?,
            NodeKind::AwaitExpression { argument } => {
                match argument {
                    Some(argument) => self.compile_expression(*argument)?,
                    None => self.load_undefined(),
                }
                self.emit_await(node)?;
            }
            NodeKind::YieldExpression { argument, delegate } => {
                if *delegate {
                    return Err(self.unsupported(node, "'yield*'"));
                }
                match argument {
                    Some(argument) => self.compile_expression(*argument)?,
                    None => self.load_undefined(),
                }
                self.emit_yield(node)?;
            }
            NodeKind::MetaProperty { kind } => match kind {
                MetaPropertyKind::NewTarget if !self.flags.is_arrow() => self.load_acc(NEW_TARGET_REG),
                MetaPropertyKind::NewTarget => return Err(self.unsupported(node, "'new.target' inside an arrow function")),
                MetaPropertyKind::ImportMeta => return Err(self.unsupported(node, "'import.meta'")),
            },
            NodeKind::TSAsExpression { expression, .. } | NodeKind::TSNonNullExpression { expression } => {
                self.compile_expression(*expression)?
            }
            kind => unreachable!("{} is not an expression", kind.type_name()),
        }
        Ok(())
    }

    fn compile_identifier(&mut self, node: NodeId, name: Atom) {
        let unresolved = self.scopes.reference(node).is_none();
        match self.ast.str(name) {
            "undefined" if unresolved => self.load_undefined(),
            "arguments" if unresolved && !self.flags.is_arrow() && self.root != self.ast.root() => {
                self.emit0(Opcode::GetUnmappedArgs)
            }
            _ => self.load_var(node, name),
        }
    }

    fn compile_template(&mut self, quasis: &[Atom], expressions: &[NodeId]) -> CompileResult {
        let ast = self.ast;
        let head = quasis.first().map_or("", |&quasi| ast.str(quasi));
        self.load_string(head);
        if expressions.is_empty() {
            return Ok(());
        }
        self.with_reg_scope(|pg| {
            let partial = pg.alloc_reg()?;
            for (i, &expression) in expressions.iter().enumerate() {
                pg.store_acc(partial);
                pg.compile_expression(expression)?;
                pg.emit1(Opcode::Add2, partial);
                let tail = quasis.get(i + 1).map_or("", |&quasi| ast.str(quasi));
                if !tail.is_empty() {
                    pg.store_acc(partial);
                    pg.load_string(tail);
                    pg.emit1(Opcode::Add2, partial);
                }
            }
            Ok(())
        })
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn compile_unary(&mut self, node: NodeId, operator: UnaryOperator, argument: NodeId) -> CompileResult {
        let ast = self.ast;
        match operator {
            UnaryOperator::Typeof => {
                // `typeof undeclared` must not throw
                let global_name = ast
                    .identifier_name(argument)
                    .filter(|_| self.scopes.reference(argument).is_none());
                match global_name {
                    Some(name) => {
                        self.emit0(Opcode::LdGlobal);
                        self.emit1(Opcode::LdObjByName, ast.str(name));
                    }
                    None => self.compile_expression(argument)?,
                }
                self.emit0(Opcode::TypeOf);
            }
            UnaryOperator::Delete => self.compile_delete(node, argument)?,
            _ => {
                self.compile_expression(argument)?;
                match operator {
                    UnaryOperator::Plus => self.emit0(Opcode::ToNumber),
                    UnaryOperator::Minus => self.emit0(Opcode::Neg),
                    UnaryOperator::Not => self.emit0(Opcode::IsFalse),
                    UnaryOperator::BitNot => self.emit0(Opcode::Not),
                    UnaryOperator::Void => self.load_undefined(),
                    UnaryOperator::Typeof | UnaryOperator::Delete => {}
                }
            }
        }
        Ok(())
    }

    fn compile_delete(&mut self, node: NodeId, argument: NodeId) -> CompileResult {
        let ast = self.ast;
        match ast.kind(argument) {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                if matches!(ast.kind(*object), NodeKind::SuperExpression) {
                    return Err(self.unsupported(node, "'delete' of a super property"));
                }
                self.with_reg_scope(|pg| {
                    pg.compile_expression(*object)?;
                    let target = pg.spill()?;
                    match (!*computed).then(|| static_property_name(ast, *property)).flatten() {
                        Some(name) => pg.load_string(&name),
                        None => pg.compile_expression(*property)?,
                    }
                    pg.emit1(Opcode::DelObjProp, target);
                    Ok(())
                })
            }
            NodeKind::Identifier { name, .. } if self.scopes.reference(argument).is_none() => {
                self.with_reg_scope(|pg| {
                    pg.emit0(Opcode::LdGlobal);
                    let global = pg.spill()?;
                    pg.load_string(ast.str(*name));
                    pg.emit1(Opcode::DelObjProp, global);
                    Ok(())
                })
            }
            // declared bindings cannot be deleted
            NodeKind::Identifier { .. } => {
                self.emit0(Opcode::LdFalse);
                Ok(())
            }
            _ => {
                self.compile_expression(argument)?;
                self.emit0(Opcode::LdTrue);
                Ok(())
            }
        }
    }

    fn compile_update(&mut self, operator: UpdateOperator, prefix: bool, argument: NodeId) -> CompileResult {
        self.with_reg_scope(|pg| {
            let reference = pg.reference_of(argument)?;
            pg.get_value(&reference)?;
            pg.emit0(Opcode::ToNumeric);
            let old = if prefix { None } else { Some(pg.spill()?) };
            pg.emit0(match operator {
                UpdateOperator::Increment => Opcode::Inc,
                UpdateOperator::Decrement => Opcode::Dec,
            });
            pg.set_value(&reference)?;
            if let Some(old) = old {
                pg.load_acc(old);
            }
            Ok(())
        })
    }

    fn compile_binary(&mut self, operator: BinaryOperator, left: NodeId, right: NodeId) -> CompileResult {
        if operator.is_logical() {
            return self.compile_logical(operator, left, right);
        }
        self.with_reg_scope(|pg| {
            pg.compile_expression(left)?;
            let lhs = pg.spill()?;
            pg.compile_expression(right)?;
            pg.emit1(binary_opcode(operator), lhs);
            Ok(())
        })
    }

    /// `&&`, `||` and `??`: the result is whichever operand decided.
    fn compile_logical(&mut self, operator: BinaryOperator, left: NodeId, right: NodeId) -> CompileResult {
        self.with_reg_scope(|pg| {
            let end = pg.alloc_label();
            pg.compile_expression(left)?;
            let value = pg.spill()?;
            pg.branch_short_circuit(operator, value, end);
            pg.compile_expression(right)?;
            pg.store_acc(value);
            pg.bind_label(end);
            pg.load_acc(value);
            Ok(())
        })
    }

    /// Jump to `decided` when the value in `value` (also in the
    /// accumulator) settles a logical `operator` without its right side.
    fn branch_short_circuit(&mut self, operator: BinaryOperator, value: VReg, decided: Label) {
        match operator {
            BinaryOperator::LogicalAnd => self.branch_if_false(decided),
            BinaryOperator::LogicalOr => self.branch_if_true(decided),
            _ => {
                let nullish = self.alloc_label();
                self.branch_if_nullish(value, nullish);
                self.jump(decided);
                self.bind_label(nullish);
            }
        }
    }

    fn compile_assignment(&mut self, operator: AssignmentOperator, left: NodeId, right: NodeId) -> CompileResult {
        let ast = self.ast;
        if operator == AssignmentOperator::Assign {
            if matches!(
                ast.kind(left),
                NodeKind::Identifier { .. } | NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. }
            ) {
                self.compile_expression(right)?;
                return self.bind_value(left, false);
            }
            return self.with_reg_scope(|pg| {
                let reference = pg.reference_of(left)?;
                pg.compile_expression(right)?;
                pg.set_value(&reference)
            });
        }
        let Some(binary) = operator.binary_operator() else {
            return Ok(());
        };
        self.with_reg_scope(|pg| {
            let reference = pg.reference_of(left)?;
            pg.get_value(&reference)?;
            let current = pg.spill()?;
            if binary.is_logical() {
                let end = pg.alloc_label();
                pg.branch_short_circuit(binary, current, end);
                pg.compile_expression(right)?;
                pg.set_value(&reference)?;
                pg.store_acc(current);
                pg.bind_label(end);
                pg.load_acc(current);
            } else {
                pg.compile_expression(right)?;
                pg.emit1(binary_opcode(binary), current);
                pg.set_value(&reference)?;
            }
            Ok(())
        })
    }

    /// Jump to `if_false` when `test` is falsy; fall through otherwise.
    pub(crate) fn compile_condition(&mut self, test: NodeId, if_false: Label) -> CompileResult {
        let ast = self.ast;
        match ast.kind(test) {
            NodeKind::BinaryExpression {
                operator: BinaryOperator::LogicalAnd,
                left,
                right,
            } => {
                self.compile_condition(*left, if_false)?;
                self.compile_condition(*right, if_false)
            }
            NodeKind::BinaryExpression {
                operator: BinaryOperator::LogicalOr,
                left,
                right,
            } => {
                let if_true = self.alloc_label();
                self.compile_expression(*left)?;
                self.branch_if_true(if_true);
                self.compile_condition(*right, if_false)?;
                self.bind_label(if_true);
                Ok(())
            }
            NodeKind::BinaryExpression { operator, left, right }
                if operator.is_equality() || operator.is_relational() =>
            {
                self.with_reg_scope(|pg| {
                    pg.compile_expression(*left)?;
                    let lhs = pg.spill()?;
                    pg.compile_expression(*right)?;
                    pg.emit1(binary_opcode(*operator), lhs);
                    pg.emit1(Opcode::Jeqz, if_false);
                    Ok(())
                })
            }
            NodeKind::UnaryExpression {
                operator: UnaryOperator::Not,
                argument,
            } => {
                self.compile_expression(*argument)?;
                self.branch_if_true(if_false);
                Ok(())
            }
            _ => {
                self.compile_expression(test)?;
                self.branch_if_false(if_false);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Calls and member access
    // ========================================================================

    /// Member accesses and calls. The outermost element of a chain that
    /// contains `?.` owns the label a nullish base short-circuits to.
    fn compile_chain(&mut self, node: NodeId) -> CompileResult {
        if !self.chain_is_optional(node) {
            return self.compile_chain_element(node);
        }
        let (nullish, end) = (self.alloc_label(), self.alloc_label());
        let saved = self.optional_chain.replace(nullish);
        let result = self.compile_chain_element(node);
        self.optional_chain = saved;
        result?;
        self.jump(end);
        self.bind_label(nullish);
        self.load_undefined();
        self.bind_label(end);
        Ok(())
    }

    fn chain_is_optional(&self, node: NodeId) -> bool {
        let ast = self.ast;
        let mut current = node;
        loop {
            match ast.kind(current) {
                NodeKind::MemberExpression { object, optional, .. } => {
                    if *optional {
                        return true;
                    }
                    current = *object;
                }
                NodeKind::CallExpression { callee, optional, .. } => {
                    if *optional {
                        return true;
                    }
                    current = *callee;
                }
                NodeKind::TSNonNullExpression { expression } => current = *expression,
                _ => return false,
            }
        }
    }

    fn compile_chain_element(&mut self, node: NodeId) -> CompileResult {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => {
                if matches!(ast.kind(*object), NodeKind::SuperExpression) {
                    return self.load_super_property(*property, *computed);
                }
                self.compile_chain_object(*object)?;
                if *optional {
                    self.short_circuit_if_nullish()?;
                }
                self.load_property(*property, *computed)
            }
            NodeKind::CallExpression {
                callee,
                arguments,
                optional,
                ..
            } => self.compile_call(node, *callee, arguments, *optional),
            NodeKind::TSNonNullExpression { expression } => self.compile_chain_object(*expression),
            _ => self.compile_expression(node),
        }
    }

    /// The base of a chain element: nested chain elements continue the
    /// current chain instead of starting their own.
    fn compile_chain_object(&mut self, object: NodeId) -> CompileResult {
        match self.ast.kind(object) {
            NodeKind::MemberExpression { .. } | NodeKind::CallExpression { .. } | NodeKind::TSNonNullExpression { .. }
                if self.optional_chain.is_some() =>
            {
                self.compile_chain_element(object)
            }
            _ => self.compile_expression(object),
        }
    }

    fn short_circuit_if_nullish(&mut self) -> CompileResult {
        let Some(nullish) = self.optional_chain else {
            return Ok(());
        };
        self.with_reg_scope(|pg| {
            let value = pg.spill()?;
            pg.branch_if_nullish(value, nullish);
            pg.load_acc(value);
            Ok(())
        })
    }

    /// `acc = acc[property]`.
    pub(crate) fn load_property(&mut self, property: NodeId, computed: bool) -> CompileResult {
        match (!computed).then(|| static_property_name(self.ast, property)).flatten() {
            Some(name) => {
                self.emit1(Opcode::LdObjByName, name.as_str());
                Ok(())
            }
            None => self.with_reg_scope(|pg| {
                let object = pg.spill()?;
                pg.compile_expression(property)?;
                pg.emit1(Opcode::LdObjByValue, object);
                Ok(())
            }),
        }
    }

    fn load_super_property(&mut self, property: NodeId, computed: bool) -> CompileResult {
        match (!computed).then(|| static_property_name(self.ast, property)).flatten() {
            Some(name) => {
                self.load_this();
                self.emit1(Opcode::LdSuperByName, name.as_str());
                Ok(())
            }
            None => self.with_reg_scope(|pg| {
                pg.load_this();
                let this = pg.spill()?;
                pg.compile_expression(property)?;
                pg.emit1(Opcode::LdSuperByValue, this);
                Ok(())
            }),
        }
    }

    fn compile_call(&mut self, node: NodeId, callee: NodeId, arguments: &[NodeId], optional: bool) -> CompileResult {
        let ast = self.ast;
        if matches!(ast.kind(callee), NodeKind::SuperExpression) {
            return self.compile_super_call(node, arguments);
        }
        let has_spread = arguments
            .iter()
            .any(|&arg| matches!(ast.kind(arg), NodeKind::SpreadElement { .. }));
        let argc = arguments.len() as u32;

        self.with_reg_scope(|pg| {
            // callee, then the receiver, then the arguments
            let receiver_slots = u32::from(is_member_callee(ast, callee));
            let arg_slots = if has_spread { 0 } else { argc };
            let function = pg.alloc_regs(1 + receiver_slots + arg_slots)?;
            let this = (receiver_slots == 1).then(|| function.offset(1));

            match (ast.kind(callee), this) {
                (
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed,
                        optional: member_optional,
                    },
                    Some(this),
                ) => {
                    if matches!(ast.kind(*object), NodeKind::SuperExpression) {
                        pg.load_this();
                        pg.store_acc(this);
                        pg.load_super_property(*property, *computed)?;
                    } else {
                        pg.compile_chain_object(*object)?;
                        if *member_optional {
                            pg.short_circuit_if_nullish()?;
                        }
                        pg.store_acc(this);
                        pg.load_property(*property, *computed)?;
                    }
                }
                _ => pg.compile_chain_object(callee)?,
            }
            pg.store_acc(function);
            if optional {
                pg.short_circuit_if_nullish()?;
            }

            if has_spread {
                let args = pg.alloc_reg()?;
                pg.compile_array_into(arguments, args)?;
                let this = match this {
                    Some(this) => this,
                    None => {
                        pg.load_undefined();
                        pg.spill()?
                    }
                };
                pg.call_spread(function, this, args);
                return Ok(());
            }

            let first_arg = function.offset(1 + receiver_slots);
            for (i, &arg) in arguments.iter().enumerate() {
                pg.compile_expression(arg)?;
                pg.store_acc(first_arg.offset(i as u32));
            }
            match this {
                Some(this) => pg.call_this(function, this, argc),
                None => pg.call(function, first_arg, argc),
            }
            Ok(())
        })
    }

    fn compile_new(&mut self, callee: NodeId, arguments: &[NodeId]) -> CompileResult {
        let ast = self.ast;
        let has_spread = arguments
            .iter()
            .any(|&arg| matches!(ast.kind(arg), NodeKind::SpreadElement { .. }));
        self.with_reg_scope(|pg| {
            if has_spread {
                pg.compile_expression(callee)?;
                let constructor = pg.spill()?;
                let args = pg.alloc_reg()?;
                pg.compile_array_into(arguments, args)?;
                pg.load_acc(args);
                pg.emit1(Opcode::NewObjApply, constructor);
                return Ok(());
            }
            let argc = arguments.len() as u32;
            let start = pg.alloc_regs(argc + 1)?;
            pg.compile_expression(callee)?;
            pg.store_acc(start);
            for (i, &arg) in arguments.iter().enumerate() {
                pg.compile_expression(arg)?;
                pg.store_acc(start.offset(i as u32 + 1));
            }
            pg.new_object(start, argc + 1);
            Ok(())
        })
    }
}

fn is_member_callee(ast: &espanda_ast::Ast, callee: NodeId) -> bool {
    matches!(ast.kind(callee), NodeKind::MemberExpression { .. })
}

fn binary_opcode(operator: BinaryOperator) -> Opcode {
    match operator {
        BinaryOperator::Add => Opcode::Add2,
        BinaryOperator::Sub => Opcode::Sub2,
        BinaryOperator::Mul => Opcode::Mul2,
        BinaryOperator::Div => Opcode::Div2,
        BinaryOperator::Mod => Opcode::Mod2,
        BinaryOperator::Exp => Opcode::Exp,
        BinaryOperator::Shl => Opcode::Shl2,
        BinaryOperator::Shr => Opcode::Ashr2,
        BinaryOperator::UShr => Opcode::Shr2,
        BinaryOperator::BitAnd => Opcode::And2,
        BinaryOperator::BitOr => Opcode::Or2,
        BinaryOperator::BitXor => Opcode::Xor2,
        BinaryOperator::Eq => Opcode::Eq,
        BinaryOperator::NotEq => Opcode::NotEq,
        BinaryOperator::StrictEq => Opcode::StrictEq,
        BinaryOperator::StrictNotEq => Opcode::StrictNotEq,
        BinaryOperator::Lt => Opcode::Less,
        BinaryOperator::LtEq => Opcode::LessEq,
        BinaryOperator::Gt => Opcode::Greater,
        BinaryOperator::GtEq => Opcode::GreaterEq,
        BinaryOperator::In => Opcode::IsIn,
        BinaryOperator::InstanceOf => Opcode::InstanceOf,
        BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr | BinaryOperator::Nullish => {
            unreachable!("logical operators short-circuit")
        }
    }
}
