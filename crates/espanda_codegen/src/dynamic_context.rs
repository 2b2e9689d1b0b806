//! Dynamic contexts: the statements a `break`, `continue` or `return` may
//! have to leave, and what leaving each of them costs.
//!
//! Every loop, switch, labelled statement, `try` with a `finally` and
//! `for-of` pushes a context while its body compiles. A jump walks the
//! stack innermost first to find its target, then aborts every context it
//! crosses: finalizers are inlined and iterators closed.

use espanda_ast::NodeId;
use espanda_core::intern::Atom;

use crate::error::{CompileError, CompileResult};
use crate::insn::{Label, Opcode, VReg};
use crate::pandagen::PandaGen;
use crate::program::LabelTargetEntry;

/// What a `break` or `continue` is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JumpName {
    /// Unlabelled `break`.
    Break,
    /// Unlabelled `continue`.
    Continue,
    Named(Atom),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JumpKind {
    Break,
    Continue,
}

/// The labels a context offers and the names that select them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LabelTarget {
    pub(crate) break_label: Option<Label>,
    pub(crate) continue_label: Option<Label>,
    pub(crate) break_name: Option<JumpName>,
    pub(crate) continue_name: Option<JumpName>,
}

impl LabelTarget {
    pub(crate) fn for_loop(break_label: Label, continue_label: Label) -> Self {
        Self {
            break_label: Some(break_label),
            continue_label: Some(continue_label),
            break_name: Some(JumpName::Break),
            continue_name: Some(JumpName::Continue),
        }
    }

    pub(crate) fn for_switch(break_label: Label) -> Self {
        Self {
            break_label: Some(break_label),
            break_name: Some(JumpName::Break),
            ..Self::default()
        }
    }

    /// A labelled statement. Its own break label is only present when its
    /// body is not a loop or switch; those provide the labels themselves.
    /// `continue label` only selects it when it labels a loop, whose
    /// continue label is then the nearest one inside.
    pub(crate) fn for_label(label: Atom, break_label: Option<Label>, labels_loop: bool) -> Self {
        Self {
            break_label,
            continue_label: None,
            break_name: Some(JumpName::Named(label)),
            continue_name: labels_loop.then_some(JumpName::Named(label)),
        }
    }

    fn label(&self, kind: JumpKind) -> Option<Label> {
        match kind {
            JumpKind::Break => self.break_label,
            JumpKind::Continue => self.continue_label,
        }
    }

    fn name(&self, kind: JumpKind) -> Option<JumpName> {
        match kind {
            JumpKind::Break => self.break_name,
            JumpKind::Continue => self.continue_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Label,
    Loop,
    Switch,
    /// A `try` with a `finally` block.
    Try { finalizer: NodeId },
    /// A `for-of` loop; leaving it closes the iterator.
    Iterator { iterator: VReg },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DynamicContext {
    pub(crate) kind: ContextKind,
    pub(crate) target: LabelTarget,
}

/// Why contexts are being aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Jump(JumpKind, Label),
    Return,
}

impl PandaGen<'_, '_> {
    /// Compile `f` with `context` pushed; pops it on every path.
    pub(crate) fn with_context<T>(
        &mut self,
        node: NodeId,
        context: DynamicContext,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        if context.target.break_label.is_some() || context.target.continue_label.is_some() {
            let label = match context.target.break_name {
                Some(JumpName::Named(label)) => Some(self.ast.str(label).to_string()),
                _ => None,
            };
            self.label_targets.push(LabelTargetEntry {
                node: node.0,
                label,
                break_label: context.target.break_label,
                continue_label: context.target.continue_label,
            });
        }
        self.contexts.push(context);
        let result = f(self);
        self.contexts.pop();
        result
    }

    /// Whether a `return` from here has to run finalizers or close
    /// iterators first.
    pub(crate) fn return_needs_abort(&self) -> bool {
        self.contexts
            .iter()
            .any(|context| matches!(context.kind, ContextKind::Try { .. } | ContextKind::Iterator { .. }))
    }

    /// Compile a `break` or `continue`.
    pub(crate) fn compile_jump(&mut self, node: NodeId, kind: JumpKind, label: Option<Atom>) -> CompileResult {
        let name = match (label, kind) {
            (Some(label), _) => JumpName::Named(label),
            (None, JumpKind::Break) => JumpName::Break,
            (None, JumpKind::Continue) => JumpName::Continue,
        };
        let Some((index, target)) = self.resolve_jump(kind, name) else {
            let keyword = match kind {
                JumpKind::Break => "break",
                JumpKind::Continue => "continue",
            };
            let statement = match label {
                Some(label) => format!("{keyword} {}", self.ast.str(label)),
                None => keyword.to_string(),
            };
            return Err(CompileError::UnresolvedJumpTarget {
                file: self.ast.file_name().to_string(),
                offset: self.ast.range(node).pos,
                statement,
            });
        };
        self.abort_contexts(index, Exit::Jump(kind, target))?;
        self.jump(target);
        Ok(())
    }

    /// Run every finalizer and close every iterator between here and the
    /// function boundary. The value being returned must already be saved
    /// outside the accumulator.
    pub(crate) fn abort_for_return(&mut self) -> CompileResult {
        self.abort_contexts(0, Exit::Return)
    }

    /// Find the context whose name matches, innermost first. The target is
    /// the last label of the requested kind seen on the way out, so a
    /// labelled loop answers through its loop context.
    fn resolve_jump(&self, kind: JumpKind, name: JumpName) -> Option<(usize, Label)> {
        let mut nearest = None;
        for (index, context) in self.contexts.iter().enumerate().rev() {
            if let Some(label) = context.target.label(kind) {
                nearest = Some(label);
            }
            if context.target.name(kind) == Some(name) {
                return nearest.map(|label| (index, label));
            }
        }
        None
    }

    /// Abort contexts `down_to..` innermost first.
    fn abort_contexts(&mut self, down_to: usize, exit: Exit) -> CompileResult {
        for index in (down_to..self.contexts.len()).rev() {
            match self.contexts[index].kind {
                ContextKind::Try { finalizer } => {
                    // the finalizer runs outside its own try
                    let inner = self.contexts.split_off(index);
                    let result = self.compile_statement(finalizer);
                    self.contexts.extend(inner);
                    result?;
                }
                ContextKind::Iterator { iterator } => {
                    let continue_label = self.contexts[index].target.continue_label;
                    let continues_loop = matches!(
                        exit,
                        Exit::Jump(JumpKind::Continue, target) if continue_label == Some(target)
                    );
                    if !continues_loop {
                        self.emit1(Opcode::CloseIterator, iterator);
                    }
                }
                ContextKind::Label | ContextKind::Loop | ContextKind::Switch => {}
            }
        }
        Ok(())
    }
}
