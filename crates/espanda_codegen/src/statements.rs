//! Statement codegen: declarations, control flow, loops and exceptions.

use espanda_ast::{NodeId, NodeKind, VariableDeclarationKind};
use espanda_core::intern::Atom;

use crate::dynamic_context::{ContextKind, DynamicContext, JumpKind, LabelTarget};
use crate::error::CompileResult;
use crate::insn::{Label, Opcode, VReg};
use crate::pandagen::PandaGen;

impl PandaGen<'_, '_> {
    pub(crate) fn compile_statement(&mut self, node: NodeId) -> CompileResult {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::BlockStatement { statements } => self.compile_statements(statements),
            NodeKind::EmptyStatement => Ok(()),
            NodeKind::DebuggerStatement => {
                self.emit0(Opcode::Debugger);
                Ok(())
            }
            NodeKind::ExpressionStatement { expression } => self.compile_expression(*expression),
            NodeKind::VariableDeclaration {
                kind,
                declarators,
                declare,
            } => {
                if *declare {
                    return Ok(());
                }
                for &declarator in declarators {
                    self.compile_declarator(*kind, declarator)?;
                }
                Ok(())
            }
            // defined when the enclosing statement list starts
            NodeKind::FunctionDeclaration { .. } => Ok(()),
            NodeKind::ClassDeclaration { definition } => {
                self.compile_class(*definition)?;
                if let NodeKind::ClassDefinition { id: Some(id), .. } = ast.kind(*definition) {
                    self.store_var(*id, true);
                }
                Ok(())
            }
            NodeKind::ReturnStatement { argument } => self.compile_return(*argument),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => self.compile_if(*test, *consequent, *alternate),
            NodeKind::ForUpdateStatement {
                init,
                test,
                update,
                body,
            } => self.compile_for_update(node, *init, *test, *update, *body),
            NodeKind::ForInStatement { left, right, body } => self.compile_for_in(node, *left, *right, *body),
            NodeKind::ForOfStatement {
                left,
                right,
                body,
                is_await,
            } => self.compile_for_of(node, *left, *right, *body, *is_await),
            NodeKind::WhileStatement { test, body } => self.compile_while(node, *test, *body),
            NodeKind::DoWhileStatement { body, test } => self.compile_do_while(node, *body, *test),
            NodeKind::BreakStatement { label } => self.compile_jump(node, JumpKind::Break, *label),
            NodeKind::ContinueStatement { label } => self.compile_jump(node, JumpKind::Continue, *label),
            NodeKind::LabelledStatement { label, body } => self.compile_labelled(node, *label, *body),
            NodeKind::SwitchStatement { discriminant, cases } => self.compile_switch(node, *discriminant, cases),
            NodeKind::ThrowStatement { argument } => {
                self.compile_expression(*argument)?;
                self.emit0(Opcode::Throw);
                Ok(())
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => self.compile_try(*block, *handler, *finalizer),
            NodeKind::ExportNamedDeclaration { declaration } => self.compile_statement(*declaration),
            NodeKind::ExportDefaultDeclaration { declaration } => self.compile_export_default(*declaration),
            NodeKind::TSTypeAliasDeclaration { .. } | NodeKind::TSInterfaceDeclaration { .. } => Ok(()),
            kind => unreachable!("{} is not a statement", kind.type_name()),
        }
    }

    fn compile_export_default(&mut self, declaration: NodeId) -> CompileResult {
        let ast = self.ast;
        match ast.kind(declaration) {
            NodeKind::FunctionDeclaration { function } => {
                let NodeKind::ScriptFunction { id, body, .. } = ast.kind(*function) else {
                    return Ok(());
                };
                if body.is_none() {
                    return Ok(());
                }
                match id.and_then(|id| ast.identifier_name(id).map(|name| (id, name))) {
                    Some((id, name)) => self.load_var(id, name),
                    None => self.define_function(*function)?,
                }
            }
            NodeKind::ClassDeclaration { .. } => {
                self.compile_statement(declaration)?;
            }
            _ => self.compile_expression(declaration)?,
        }
        self.emit1(Opcode::StModuleVar, "default");
        Ok(())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn compile_declarator(&mut self, kind: VariableDeclarationKind, declarator: NodeId) -> CompileResult {
        let ast = self.ast;
        let NodeKind::VariableDeclarator { id, init } = ast.kind(declarator) else {
            unreachable!("{} in a variable declaration", ast.kind(declarator).type_name());
        };
        match init {
            Some(init) => self.compile_expression(*init)?,
            // `var x;` leaves a hoisted value alone
            None if kind == VariableDeclarationKind::Var => return Ok(()),
            None => self.load_undefined(),
        }
        self.bind_value(*id, true)
    }

    /// Assign the accumulator to a declaration or assignment target.
    pub(crate) fn bind_value(&mut self, target: NodeId, is_declaration: bool) -> CompileResult {
        if self.ast.identifier_name(target).is_some() {
            self.store_var(target, is_declaration);
            return Ok(());
        }
        self.with_reg_scope(|pg| {
            let value = pg.spill()?;
            pg.destructure(target, value, is_declaration)?;
            pg.load_acc(value);
            Ok(())
        })
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn compile_return(&mut self, argument: Option<NodeId>) -> CompileResult {
        match argument {
            Some(argument) => self.compile_expression(argument)?,
            None if self.ctor_class.is_some() => self.load_this(),
            None => self.load_undefined(),
        }
        self.return_value()
    }

    fn compile_if(&mut self, test: NodeId, consequent: NodeId, alternate: Option<NodeId>) -> CompileResult {
        let otherwise = self.alloc_label();
        self.compile_condition(test, otherwise)?;
        self.compile_statement(consequent)?;
        match alternate {
            Some(alternate) => {
                let end = self.alloc_label();
                self.jump(end);
                self.bind_label(otherwise);
                self.compile_statement(alternate)?;
                self.bind_label(end);
            }
            None => self.bind_label(otherwise),
        }
        Ok(())
    }

    fn compile_labelled(&mut self, node: NodeId, label: Atom, body: NodeId) -> CompileResult {
        let ast = self.ast;
        let provides_labels = ast.kind(body).is_loop() || matches!(ast.kind(body), NodeKind::SwitchStatement { .. });
        let end = (!provides_labels).then(|| self.alloc_label());
        let mut labelled = body;
        while let NodeKind::LabelledStatement { body, .. } = ast.kind(labelled) {
            labelled = *body;
        }
        let context = DynamicContext {
            kind: ContextKind::Label,
            target: LabelTarget::for_label(label, end, ast.kind(labelled).is_loop()),
        };
        self.with_context(node, context, |pg| pg.compile_statement(body))?;
        if let Some(end) = end {
            self.bind_label(end);
        }
        Ok(())
    }

    fn compile_switch(&mut self, node: NodeId, discriminant: NodeId, cases: &[NodeId]) -> CompileResult {
        let ast = self.ast;
        self.with_reg_scope(|pg| {
            pg.compile_expression(discriminant)?;
            let value = pg.spill()?;
            let end = pg.alloc_label();
            let labels: Vec<Label> = cases.iter().map(|_| pg.alloc_label()).collect();

            let mut default = None;
            for (&case, &label) in cases.iter().zip(&labels) {
                match ast.kind(case) {
                    NodeKind::SwitchCaseStatement { test: Some(test), .. } => {
                        pg.compile_expression(*test)?;
                        pg.emit1(Opcode::StrictEq, value);
                        pg.emit1(Opcode::Jnez, label);
                    }
                    _ => default = Some(label),
                }
            }
            pg.jump(default.unwrap_or(end));

            let context = DynamicContext {
                kind: ContextKind::Switch,
                target: LabelTarget::for_switch(end),
            };
            pg.with_context(node, context, |pg| {
                for (&case, &label) in cases.iter().zip(&labels) {
                    pg.bind_label(label);
                    if let NodeKind::SwitchCaseStatement { consequent, .. } = ast.kind(case) {
                        pg.compile_statements(consequent)?;
                    }
                }
                Ok(())
            })?;
            pg.bind_label(end);
            Ok(())
        })
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// Compile a loop body with break/continue targets pushed.
    fn with_loop<T>(
        &mut self,
        node: NodeId,
        kind: ContextKind,
        end: Label,
        next: Label,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        let context = DynamicContext {
            kind,
            target: LabelTarget::for_loop(end, next),
        };
        self.with_context(node, context, f)
    }

    fn compile_while(&mut self, node: NodeId, test: NodeId, body: NodeId) -> CompileResult {
        let (next, end) = (self.alloc_label(), self.alloc_label());
        self.bind_label(next);
        self.compile_condition(test, end)?;
        self.with_loop(node, ContextKind::Loop, end, next, |pg| pg.compile_statement(body))?;
        self.jump(next);
        self.bind_label(end);
        Ok(())
    }

    fn compile_do_while(&mut self, node: NodeId, body: NodeId, test: NodeId) -> CompileResult {
        let (start, next, end) = (self.alloc_label(), self.alloc_label(), self.alloc_label());
        self.bind_label(start);
        self.with_loop(node, ContextKind::Loop, end, next, |pg| pg.compile_statement(body))?;
        self.bind_label(next);
        self.compile_condition(test, end)?;
        self.jump(start);
        self.bind_label(end);
        Ok(())
    }

    fn compile_for_update(
        &mut self,
        node: NodeId,
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    ) -> CompileResult {
        let ast = self.ast;
        if let Some(init) = init {
            match ast.kind(init) {
                NodeKind::VariableDeclaration { .. } => self.compile_statement(init)?,
                _ => self.compile_expression(init)?,
            }
        }
        let (start, next, end) = (self.alloc_label(), self.alloc_label(), self.alloc_label());
        self.bind_label(start);
        if let Some(test) = test {
            self.compile_condition(test, end)?;
        }
        self.with_loop(node, ContextKind::Loop, end, next, |pg| pg.compile_statement(body))?;
        self.bind_label(next);
        if let Some(update) = update {
            self.compile_expression(update)?;
        }
        self.jump(start);
        self.bind_label(end);
        Ok(())
    }

    fn compile_for_in(&mut self, node: NodeId, left: NodeId, right: NodeId, body: NodeId) -> CompileResult {
        self.with_reg_scope(|pg| {
            pg.compile_expression(right)?;
            pg.emit0(Opcode::GetPropIterator);
            let iterator = pg.spill()?;
            let key = pg.alloc_reg()?;
            let (next, end) = (pg.alloc_label(), pg.alloc_label());

            pg.bind_label(next);
            pg.emit1(Opcode::GetNextPropName, iterator);
            pg.store_acc(key);
            pg.load_undefined();
            pg.emit1(Opcode::StrictEq, key);
            pg.emit1(Opcode::Jnez, end);
            pg.load_acc(key);
            pg.bind_loop_target(left, key)?;
            pg.with_loop(node, ContextKind::Loop, end, next, |pg| pg.compile_statement(body))?;
            pg.jump(next);
            pg.bind_label(end);
            Ok(())
        })
    }

    fn compile_for_of(&mut self, node: NodeId, left: NodeId, right: NodeId, body: NodeId, is_await: bool) -> CompileResult {
        self.with_reg_scope(|pg| {
            pg.compile_expression(right)?;
            pg.emit0(if is_await {
                Opcode::GetAsyncIterator
            } else {
                Opcode::GetIterator
            });
            let iterator = pg.spill()?;
            pg.emit1(Opcode::LdObjByName, "next");
            let next_method = pg.spill()?;
            let result = pg.alloc_reg()?;
            let (next, end) = (pg.alloc_label(), pg.alloc_label());

            pg.bind_label(next);
            pg.load_acc(next_method);
            pg.emit1(Opcode::CallThis0, iterator);
            if is_await {
                pg.emit_await(node)?;
            }
            pg.emit0(Opcode::ThrowIfNotObject);
            pg.store_acc(result);
            pg.emit1(Opcode::LdObjByName, "done");
            pg.emit1(Opcode::Jnez, end);
            pg.load_acc(result);
            pg.emit1(Opcode::LdObjByName, "value");

            let kind = ContextKind::Iterator { iterator };
            pg.with_loop(node, kind, end, next, |pg| {
                // a throwing assignment target leaves the loop too
                pg.with_reg_scope(|pg| {
                    let value = pg.spill()?;
                    pg.bind_loop_target(left, value)
                })?;
                pg.compile_statement(body)
            })?;
            pg.jump(next);
            pg.bind_label(end);
            Ok(())
        })
    }

    /// Assign the loop value held in `value` (and the accumulator) to the
    /// head of a `for-in` or `for-of`.
    fn bind_loop_target(&mut self, left: NodeId, value: VReg) -> CompileResult {
        let ast = self.ast;
        let (target, is_declaration) = match ast.kind(left) {
            NodeKind::VariableDeclaration { declarators, .. } => match declarators.first().map(|&d| ast.kind(d)) {
                Some(NodeKind::VariableDeclarator { id, .. }) => (*id, true),
                _ => return Ok(()),
            },
            _ => (left, false),
        };
        if is_declaration || self.ast.identifier_name(target).is_some() {
            self.load_acc(value);
            return self.bind_value(target, is_declaration);
        }
        self.with_reg_scope(|pg| {
            let reference = pg.reference_of(target)?;
            pg.load_acc(value);
            pg.set_value(&reference)
        })
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn compile_try(&mut self, block: NodeId, handler: Option<NodeId>, finalizer: Option<NodeId>) -> CompileResult {
        let Some(finalizer) = finalizer else {
            let Some(handler) = handler else {
                return self.compile_statement(block);
            };
            return self.compile_try_catch(block, handler);
        };

        let (begin, end, on_exception, done) = (
            self.alloc_label(),
            self.alloc_label(),
            self.alloc_label(),
            self.alloc_label(),
        );
        let depth = self.try_depth;
        self.try_depth += 1;
        self.bind_label(begin);
        let context = DynamicContext {
            kind: ContextKind::Try { finalizer },
            target: LabelTarget::default(),
        };
        let result = self.with_context(block, context, |pg| match handler {
            Some(handler) => pg.compile_try_catch(block, handler),
            None => pg.compile_statement(block),
        });
        self.try_depth -= 1;
        result?;
        self.bind_label(end);

        // normal completion
        self.compile_statement(finalizer)?;
        self.jump(done);

        // exceptional completion: run the finalizer and rethrow
        self.bind_label(on_exception);
        self.with_reg_scope(|pg| {
            let exception = pg.spill()?;
            pg.compile_statement(finalizer)?;
            pg.load_acc(exception);
            pg.emit0(Opcode::Throw);
            Ok(())
        })?;
        self.bind_label(done);
        self.add_catch_table(begin, end, on_exception, depth);
        Ok(())
    }

    fn compile_try_catch(&mut self, block: NodeId, handler: NodeId) -> CompileResult {
        let ast = self.ast;
        let (begin, end, catch_begin, after) = (
            self.alloc_label(),
            self.alloc_label(),
            self.alloc_label(),
            self.alloc_label(),
        );
        let depth = self.try_depth;
        self.try_depth += 1;
        self.bind_label(begin);
        let result = self.compile_statement(block);
        self.try_depth -= 1;
        result?;
        self.bind_label(end);
        self.jump(after);

        // the exception arrives in the accumulator
        self.bind_label(catch_begin);
        if let NodeKind::CatchClause { param, body } = ast.kind(handler) {
            if let Some(param) = param {
                self.bind_value(*param, true)?;
            }
            self.compile_statement(*body)?;
        }
        self.bind_label(after);
        self.add_catch_table(begin, end, catch_begin, depth);
        Ok(())
    }
}
