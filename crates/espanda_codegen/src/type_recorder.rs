//! Declared-type recording.
//!
//! Every top-level binding's checked type is written out as a type index.
//! Primitive types have fixed indices below [`USER_TYPE_INDEX_HEAD`]. Each
//! user type gets a literal buffer of its own and the index
//! `USER_TYPE_INDEX_HEAD + n`, `n` being its position among the type
//! buffers. A summary buffer follows them and lists each one in order.
//!
//! Buffer layouts, after the leading [`UserTypeTag`]:
//!
//! - function: modifiers, name, this flag (always 0), parameter count,
//!   parameter types, return type
//! - class: abstract flag (always 0), base class type, implements count
//!   (always 0), then the own instance fields as (name, type, access,
//!   readonly), the own instance methods as (name, type), the static fields
//!   and the static methods, each group prefixed by its count
//! - class instance: class type
//! - interface: heritage count (always 0, inherited members are flattened
//!   in), fields, methods
//! - union: member count, member types
//! - array: element type
//! - object: property count, then (name, type) pairs
//! - summary: user type count, then one literal array per user type
//!
//! Arrays and unions are shared by structure; everything else by type id.

use espanda_ast::{Ast, FunctionFlags, NodeKind, TypeId};
use espanda_binder::{ScopeTree, VariableKind};
use espanda_checker::{CheckedTypes, ObjectKind, ObjectType, Property, Signature, TypeKind, TypeTable};
use espanda_core::collections::FxHashMap;
use espanda_core::Atom;

use crate::context::{name_hint, ProgramContext};
use crate::program::{LiteralValue, TypeInfo, TypedBinding};

/// Index of the first user type.
pub const USER_TYPE_INDEX_HEAD: i64 = 100;

const MODIFIER_STATIC: i64 = 4;
const MODIFIER_ASYNC: i64 = 8;
const MODIFIER_GENERATOR: i64 = 16;
const ACCESS_PUBLIC: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Any = 0,
    Number,
    Boolean,
    Void,
    String,
    Symbol,
    Null,
    Undefined,
}

impl PrimitiveType {
    pub fn index(self) -> i64 {
        self as i64
    }
}

/// First entry of every type buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTypeTag {
    Counter = 0,
    Class,
    ClassInstance,
    Function,
    Union,
    Array,
    Object,
    /// 7 belongs to imported types, which are not recorded.
    Interface = 8,
}

impl UserTypeTag {
    pub fn value(self) -> i64 {
        self as i64
    }
}

fn int(value: i64) -> LiteralValue {
    LiteralValue::Integer(value)
}

fn tag(tag: UserTypeTag) -> LiteralValue {
    int(tag.value())
}

pub(crate) struct TypeRecorder<'a> {
    ast: &'a Ast,
    types: &'a CheckedTypes,
    /// Entries of each user type, in index order.
    buffers: Vec<Vec<LiteralValue>>,
    indices: FxHashMap<TypeId, i64>,
    arrays: FxHashMap<i64, i64>,
    unions: FxHashMap<Vec<i64>, i64>,
}

impl<'a> TypeRecorder<'a> {
    pub(crate) fn new(ast: &'a Ast, types: &'a CheckedTypes) -> Self {
        Self {
            ast,
            types,
            buffers: Vec::new(),
            indices: FxHashMap::default(),
            arrays: FxHashMap::default(),
            unions: FxHashMap::default(),
        }
    }

    /// Record the types of the global scope's bindings and add the type
    /// buffers to `program`. Aliases and interfaces get buffers but no
    /// binding entry.
    pub(crate) fn record(mut self, scopes: &ScopeTree, program: &mut ProgramContext) -> TypeInfo {
        let mut bindings = Vec::new();
        for variable in scopes.variables().filter(|v| scopes.is_global(v.id)) {
            match variable.kind {
                VariableKind::TypeAlias | VariableKind::Interface => {
                    if let Some(ty) = self.types.declared_type(variable.id) {
                        self.type_index(ty);
                    }
                }
                VariableKind::TypeParameter => {}
                _ => {
                    if let Some(ty) = self.types.value_type(self.ast, variable) {
                        let type_index = self.type_index(ty);
                        bindings.push(TypedBinding {
                            name: self.ast.str(variable.name).to_string(),
                            type_index,
                        });
                    }
                }
            }
        }

        let ids: Vec<String> = self
            .buffers
            .into_iter()
            .map(|entries| program.add_literal_buffer(entries))
            .collect();
        let mut summary = vec![tag(UserTypeTag::Counter), int(ids.len() as i64)];
        summary.extend(ids.into_iter().map(LiteralValue::LiteralArray));
        let summary = program.add_literal_buffer(summary);
        tracing::debug!(bindings = bindings.len(), %summary, "recorded types");
        TypeInfo { summary, bindings }
    }

    fn type_index(&mut self, ty: TypeId) -> i64 {
        if let Some(&index) = self.indices.get(&ty) {
            return index;
        }
        let types = self.types;
        let primitive = match types.table().kind(ty) {
            TypeKind::Number | TypeKind::NumberLiteral(_) => PrimitiveType::Number,
            TypeKind::Boolean | TypeKind::BooleanLiteral(_) => PrimitiveType::Boolean,
            TypeKind::String | TypeKind::StringLiteral(_) => PrimitiveType::String,
            TypeKind::Void => PrimitiveType::Void,
            TypeKind::Symbol => PrimitiveType::Symbol,
            TypeKind::Null => PrimitiveType::Null,
            TypeKind::Undefined => PrimitiveType::Undefined,
            TypeKind::Array(element) => return self.array_index(ty, *element),
            TypeKind::Union(members) => return self.union_index(ty, members),
            TypeKind::NonPrimitive => return self.add_user_type(ty, |r| r.object_entries(Vec::new())),
            TypeKind::Object(object) => return self.object_index(ty, object),
            _ => PrimitiveType::Any,
        };
        primitive.index()
    }

    /// Reserve `ty`'s index before building its entries, so members that
    /// refer back to it see the index.
    fn add_user_type(&mut self, ty: TypeId, build: impl FnOnce(&mut Self) -> Vec<LiteralValue>) -> i64 {
        let slot = self.buffers.len();
        let index = USER_TYPE_INDEX_HEAD + slot as i64;
        self.buffers.push(Vec::new());
        self.indices.insert(ty, index);
        self.buffers[slot] = build(self);
        index
    }

    fn push(&mut self, entries: Vec<LiteralValue>) -> i64 {
        self.buffers.push(entries);
        USER_TYPE_INDEX_HEAD + self.buffers.len() as i64 - 1
    }

    fn array_index(&mut self, ty: TypeId, element: TypeId) -> i64 {
        let element = self.type_index(element);
        let index = match self.arrays.get(&element) {
            Some(&index) => index,
            None => {
                let index = self.push(vec![tag(UserTypeTag::Array), int(element)]);
                self.arrays.insert(element, index);
                index
            }
        };
        self.indices.insert(ty, index);
        index
    }

    fn union_index(&mut self, ty: TypeId, members: &[TypeId]) -> i64 {
        let mut members: Vec<i64> = members.iter().map(|&m| self.type_index(m)).collect();
        members.sort_unstable();
        members.dedup();
        let index = match members.len() {
            0 => PrimitiveType::Any.index(),
            // `true | false` is plain boolean
            1 => members[0],
            _ => match self.unions.get(&members) {
                Some(&index) => index,
                None => {
                    let mut entries = vec![tag(UserTypeTag::Union), int(members.len() as i64)];
                    entries.extend(members.iter().map(|&m| int(m)));
                    let index = self.push(entries);
                    self.unions.insert(members, index);
                    index
                }
            },
        };
        self.indices.insert(ty, index);
        index
    }

    fn object_index(&mut self, ty: TypeId, object: &'a ObjectType) -> i64 {
        let types = self.types;
        match object.kind {
            ObjectKind::Function => match object.desc.call_signatures.first() {
                Some(signature) => self.add_user_type(ty, |r| r.function_entries(ty, object.name, signature)),
                None => PrimitiveType::Any.index(),
            },
            ObjectKind::Constructor => {
                let instance = object.desc.construct_signatures.first().map(|s| s.return_type);
                match instance.filter(|&i| types.class_of_instance(i) == Some(ty)) {
                    Some(instance) => self.add_user_type(ty, |r| r.class_entries(ty, instance)),
                    None => self.add_user_type(ty, |r| r.object_entries(object.desc.properties.values().collect())),
                }
            }
            ObjectKind::ClassInstance => match types.class_of_instance(ty) {
                Some(class) => self.add_user_type(ty, |r| {
                    let class = r.type_index(class);
                    vec![tag(UserTypeTag::ClassInstance), int(class)]
                }),
                None => self.add_user_type(ty, |r| r.object_entries(object.desc.properties.values().collect())),
            },
            ObjectKind::Interface => self.add_user_type(ty, |r| {
                let mut entries = vec![tag(UserTypeTag::Interface), int(0)];
                entries.extend(r.member_entries(object.desc.properties.values().collect()));
                entries
            }),
            ObjectKind::ObjectLiteral => {
                self.add_user_type(ty, |r| r.object_entries(object.desc.properties.values().collect()))
            }
        }
    }

    fn function_entries(&mut self, ty: TypeId, name: Option<Atom>, signature: &'a Signature) -> Vec<LiteralValue> {
        let ast = self.ast;
        let node = self.types.function_node(ty);
        let modifiers = match node.map(|node| ast.kind(node)) {
            Some(NodeKind::ScriptFunction { flags, .. }) => modifiers(*flags),
            _ => 0,
        };
        let name = match name {
            Some(name) => ast.str(name).to_string(),
            None => node.and_then(|node| name_hint(ast, node)).unwrap_or_default(),
        };
        let param_count = signature.params.len() + usize::from(signature.rest.is_some());
        let mut entries = vec![
            tag(UserTypeTag::Function),
            int(modifiers),
            LiteralValue::String(name),
            int(0),
            int(param_count as i64),
        ];
        for param in &signature.params {
            entries.push(int(self.type_index(param.ty)));
        }
        if let Some(rest) = signature.rest {
            entries.push(int(self.type_index(rest)));
        }
        let return_type = self.types.return_type(signature);
        entries.push(int(self.type_index(return_type)));
        entries
    }

    fn class_entries(&mut self, constructor: TypeId, instance: TypeId) -> Vec<LiteralValue> {
        let types = self.types;
        let table = types.table();
        let base = types.base_class(constructor);
        let base_instance = base
            .and_then(|base| table.construct_signatures(base).first())
            .map(|signature| signature.return_type);
        let extends = match base {
            Some(base) => self.type_index(base),
            None => PrimitiveType::Any.index(),
        };
        let mut entries = vec![tag(UserTypeTag::Class), int(0), int(extends), int(0)];
        entries.extend(self.member_entries(own_properties(table, instance, base_instance)));
        entries.extend(self.member_entries(own_properties(table, constructor, base)));
        entries
    }

    /// Fields, then methods: properties whose type is a function type.
    fn member_entries(&mut self, properties: Vec<&'a Property>) -> Vec<LiteralValue> {
        let types = self.types;
        let table = types.table();
        let (methods, fields): (Vec<&Property>, Vec<&Property>) = properties
            .into_iter()
            .partition(|p| table.object_type(p.ty).is_some_and(|o| o.kind == ObjectKind::Function));

        let mut entries = vec![int(fields.len() as i64)];
        for field in fields {
            entries.push(LiteralValue::String(self.ast.str(field.name).to_string()));
            entries.push(int(self.type_index(field.ty)));
            entries.push(int(ACCESS_PUBLIC));
            entries.push(int(i64::from(field.readonly)));
        }
        entries.push(int(methods.len() as i64));
        for method in methods {
            entries.push(LiteralValue::String(self.ast.str(method.name).to_string()));
            entries.push(int(self.type_index(method.ty)));
        }
        entries
    }

    fn object_entries(&mut self, properties: Vec<&'a Property>) -> Vec<LiteralValue> {
        let mut entries = vec![tag(UserTypeTag::Object), int(properties.len() as i64)];
        for property in properties {
            entries.push(LiteralValue::String(self.ast.str(property.name).to_string()));
            entries.push(int(self.type_index(property.ty)));
        }
        entries
    }
}

fn modifiers(flags: FunctionFlags) -> i64 {
    let mut modifiers = 0;
    if flags.contains(FunctionFlags::STATIC) {
        modifiers |= MODIFIER_STATIC;
    }
    if flags.is_async() {
        modifiers |= MODIFIER_ASYNC;
    }
    if flags.is_generator() {
        modifiers |= MODIFIER_GENERATOR;
    }
    modifiers
}

/// Properties of `ty` that `base` does not already provide with the same
/// type.
fn own_properties(table: &TypeTable, ty: TypeId, base: Option<TypeId>) -> Vec<&Property> {
    let Some(object) = table.object_type(ty) else {
        return Vec::new();
    };
    let inherited = base.and_then(|base| table.object_type(base));
    object
        .desc
        .properties
        .values()
        .filter(|p| {
            inherited
                .and_then(|b| b.desc.properties.get(&p.name))
                .map_or(true, |b| b.ty != p.ty)
        })
        .collect()
}
