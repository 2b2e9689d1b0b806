//! The node arena for one compilation unit.

use crate::node::{Node, NodeKind};
use crate::types::NodeId;
use espanda_core::index::IndexArena;
use espanda_core::intern::{Atom, StringInterner};
use espanda_core::text::{LineMap, TextRange};

/// Owns every node of one source file.
///
/// Nodes are allocated bottom-up: a node's children exist before the node,
/// and [`Ast::alloc`] points each child's `parent` at the new node.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: IndexArena<NodeId, Node>,
    root: NodeId,
    file_name: String,
    source: String,
    line_map: LineMap,
    interner: StringInterner,
    /// Bumped by every structural rewrite.
    revision: u64,
}

impl Ast {
    pub fn new(file_name: impl Into<String>, source: impl Into<String>, interner: StringInterner) -> Self {
        let source = source.into();
        Self {
            nodes: IndexArena::with_capacity(source.len() / 4),
            root: NodeId::INVALID,
            file_name: file_name.into(),
            line_map: LineMap::new(&source),
            source,
            interner,
            revision: 0,
        }
    }

    /// Allocate a node and adopt its children.
    pub fn alloc(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = self.nodes.alloc_with(|id| Node {
            id,
            kind,
            range,
            parent: None,
        });
        for child in self.children(id) {
            self.nodes[child].parent = Some(id);
        }
        id
    }

    /// Replace the kind of `id` in place and adopt the new kind's children.
    /// The parser uses this to reinterpret an expression as a pattern.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id].kind = kind;
        for child in self.children(id) {
            self.nodes[child].parent = Some(id);
        }
        self.bump_revision();
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    #[inline]
    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id].range
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Overwrite a node's range; used by the parser when a node turns out to
    /// extend further than first assumed.
    pub fn set_range(&mut self, id: NodeId, range: TextRange) {
        self.nodes[id].range = range;
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// The nearest enclosing `ScriptFunction`, not counting `id` itself.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| matches!(self.kind(a), NodeKind::ScriptFunction { .. }))
    }

    /// Whether `id` is the declaration of an `export default`.
    pub fn is_export_default(&self, id: NodeId) -> bool {
        self.parent(id)
            .is_some_and(|p| matches!(self.kind(p), NodeKind::ExportDefaultDeclaration { .. }))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        self.nodes.indices()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    #[inline]
    pub fn intern(&self, s: &str) -> Atom {
        self.interner.intern(s)
    }

    #[inline]
    pub fn str(&self, atom: Atom) -> &str {
        self.interner.resolve(atom)
    }

    /// Name of an `Identifier` node, `None` for any other kind.
    pub fn identifier_name(&self, id: NodeId) -> Option<Atom> {
        match self.kind(id) {
            NodeKind::Identifier { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// The `Identifier` nodes bound by a declaration target, in source order:
    /// the name itself, or every name inside a destructuring pattern.
    pub fn binding_identifiers(&self, target: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_binding_identifiers(target, &mut out);
        out
    }

    fn collect_binding_identifiers(&self, target: NodeId, out: &mut Vec<NodeId>) {
        match self.kind(target) {
            NodeKind::Identifier { name, .. } => {
                if !self.str(*name).is_empty() {
                    out.push(target);
                }
            }
            NodeKind::ArrayPattern { elements, .. } => {
                for &element in elements {
                    self.collect_binding_identifiers(element, out);
                }
            }
            NodeKind::ObjectPattern { properties, .. } => {
                for &property in properties {
                    match self.kind(property) {
                        NodeKind::Property { value, .. } => self.collect_binding_identifiers(*value, out),
                        _ => self.collect_binding_identifiers(property, out),
                    }
                }
            }
            NodeKind::AssignmentPattern { left, .. } => self.collect_binding_identifiers(*left, out),
            NodeKind::RestElement { argument, .. } => self.collect_binding_identifiers(*argument, out),
            _ => {}
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }
}
