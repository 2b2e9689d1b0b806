//! Entry, return and suspension sequences that depend on the function
//! kind: plain, async, generator and async generator.

use espanda_ast::NodeId;

use crate::error::CompileResult;
use crate::insn::{Label, Opcode, VReg};
use crate::pandagen::{PandaGen, FUNCTION_REG};
use crate::program::{FunctionKind, SuspendKind};

/// Values `getresumemode` produces.
const RESUME_RETURN: i64 = 0;
const RESUME_THROW: i64 = 1;

impl PandaGen<'_, '_> {
    /// Emit the kind-specific function entry. For async kinds, returns the
    /// label the body's rejection handler range starts at.
    pub(crate) fn builder_prologue(&mut self) -> CompileResult<Option<Label>> {
        match self.kind {
            FunctionKind::Normal => Ok(None),
            FunctionKind::Async => {
                self.emit0(Opcode::AsyncFunctionEnter);
                self.builder_reg = Some(self.spill()?);
                Ok(Some(self.open_body_handler()))
            }
            FunctionKind::Generator => {
                self.emit1(Opcode::CreateGeneratorObj, FUNCTION_REG);
                self.builder_reg = Some(self.spill()?);
                self.load_undefined();
                self.suspend(SuspendKind::Initial)?;
                Ok(None)
            }
            FunctionKind::AsyncGenerator => {
                self.emit1(Opcode::CreateAsyncGeneratorObj, FUNCTION_REG);
                self.builder_reg = Some(self.spill()?);
                let begin = self.open_body_handler();
                self.load_undefined();
                self.suspend(SuspendKind::Initial)?;
                Ok(Some(begin))
            }
        }
    }

    /// Close the handler opened by [`builder_prologue`](Self::builder_prologue):
    /// an exception escaping the body rejects the function's promise.
    pub(crate) fn builder_epilogue(&mut self, body_begin: Option<Label>) {
        let Some(begin) = body_begin else {
            return;
        };
        let end = self.alloc_label();
        self.bind_label(end);
        let handler = self.alloc_label();
        self.bind_label(handler);
        let reject = match self.kind {
            FunctionKind::AsyncGenerator => Opcode::AsyncGeneratorReject,
            _ => Opcode::AsyncFunctionReject,
        };
        let object = self.generator_reg();
        self.emit1(reject, object);
        self.emit0(Opcode::Return);
        self.add_catch_table(begin, end, handler, 0);
    }

    fn open_body_handler(&mut self) -> Label {
        // user try blocks nest inside the body handler
        self.try_depth = 1;
        let begin = self.alloc_label();
        self.bind_label(begin);
        begin
    }

    fn generator_reg(&self) -> VReg {
        self.builder_reg.unwrap_or(FUNCTION_REG)
    }

    // ========================================================================
    // Returns
    // ========================================================================

    /// Return the accumulator, leaving every enclosing `finally` and
    /// `for-of` on the way.
    pub(crate) fn return_value(&mut self) -> CompileResult {
        if self.return_needs_abort() {
            self.with_reg_scope(|pg| {
                let value = pg.spill()?;
                pg.abort_for_return()?;
                pg.load_acc(value);
                Ok(())
            })?;
        }
        self.emit_return()
    }

    /// The return sequence for the accumulator's value.
    fn emit_return(&mut self) -> CompileResult {
        match self.kind {
            FunctionKind::Normal => self.emit0(Opcode::Return),
            FunctionKind::Async => {
                let object = self.generator_reg();
                self.emit1(Opcode::AsyncFunctionResolve, object);
                self.emit0(Opcode::Return);
            }
            FunctionKind::Generator | FunctionKind::AsyncGenerator => {
                self.with_reg_scope(|pg| {
                    let value = pg.spill()?;
                    let done = pg.alloc_reg()?;
                    pg.emit0(Opcode::LdTrue);
                    pg.store_acc(done);
                    pg.iter_result(value, done);
                    Ok(())
                })?;
                self.emit0(Opcode::Return);
            }
        }
        Ok(())
    }

    /// Return at the end of the body when control can reach it.
    pub(crate) fn implicit_return(&mut self) -> CompileResult {
        if !self.falls_through() {
            return Ok(());
        }
        if self.ctor_class.is_some() {
            self.load_this();
            return self.emit_return();
        }
        match self.kind {
            FunctionKind::Normal => {
                self.emit0(Opcode::ReturnUndefined);
                Ok(())
            }
            _ => {
                self.load_undefined();
                self.emit_return()
            }
        }
    }

    // ========================================================================
    // Suspension
    // ========================================================================

    /// `await` the accumulator.
    pub(crate) fn emit_await(&mut self, node: NodeId) -> CompileResult {
        if !self.kind.is_async() {
            return Err(self.unsupported(node, "'await' outside an async function"));
        }
        let object = self.generator_reg();
        self.emit1(Opcode::AsyncFunctionAwaitUncaught, object);
        self.suspend(SuspendKind::Await)
    }

    /// `yield` the accumulator.
    pub(crate) fn emit_yield(&mut self, node: NodeId) -> CompileResult {
        if !self.kind.is_generator() {
            return Err(self.unsupported(node, "'yield' outside a generator"));
        }
        self.with_reg_scope(|pg| {
            let value = pg.spill()?;
            let done = pg.alloc_reg()?;
            pg.emit0(Opcode::LdFalse);
            pg.store_acc(done);
            pg.iter_result(value, done);
            Ok(())
        })?;
        self.suspend(SuspendKind::Yield)
    }

    /// Package `value` and `done` for the caller: an iterator result object
    /// for generators, a resolved request for async generators.
    fn iter_result(&mut self, value: VReg, done: VReg) {
        match self.kind {
            FunctionKind::AsyncGenerator => {
                let object = self.generator_reg();
                self.emit3(Opcode::AsyncGeneratorResolve, object, value, done);
            }
            _ => self.emit2(Opcode::CreateIterResultObj, value, done),
        }
    }

    /// Suspend with the accumulator as the produced value, then dispatch on
    /// how the function was resumed. Leaves the sent value in the
    /// accumulator.
    fn suspend(&mut self, kind: SuspendKind) -> CompileResult {
        let object = self.generator_reg();
        self.emit1(Opcode::SuspendGenerator, object);
        self.record_resume_point(kind);
        self.emit1(Opcode::ResumeGenerator, object);
        self.with_reg_scope(|pg| {
            let value = pg.spill()?;
            pg.emit1(Opcode::GetResumeMode, object);
            let mode = pg.spill()?;

            let not_throw = pg.alloc_label();
            pg.emit1(Opcode::Ldai, RESUME_THROW);
            pg.emit1(Opcode::StrictEq, mode);
            pg.emit1(Opcode::Jeqz, not_throw);
            pg.load_acc(value);
            pg.emit0(Opcode::Throw);
            pg.bind_label(not_throw);

            if kind != SuspendKind::Await {
                let not_return = pg.alloc_label();
                pg.emit1(Opcode::Ldai, RESUME_RETURN);
                pg.emit1(Opcode::StrictEq, mode);
                pg.emit1(Opcode::Jeqz, not_return);
                pg.load_acc(value);
                pg.return_value()?;
                pg.bind_label(not_return);
            }
            pg.load_acc(value);
            Ok(())
        })
    }
}
