//! Type system representation.
//!
//! Types are stored in a [`TypeTable`] (type arena) and referenced by
//! [`TypeId`]. Recursive structures such as self-referential interfaces are
//! plain id cycles, so no type owns another.

use espanda_ast::{NodeId, TypeId};
use espanda_core::collections::FxHashMap;
use espanda_core::index::IndexArena;
use espanda_core::intern::Atom;
use indexmap::IndexMap;

/// A type in the table.
#[derive(Debug, Clone)]
pub struct Type {
    pub id: TypeId,
    pub kind: TypeKind,
}

/// The closed set of type kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
    /// The `object` keyword type.
    NonPrimitive,
    NumberLiteral(f64),
    StringLiteral(Atom),
    BooleanLiteral(bool),
    BigIntLiteral(Atom),
    Object(ObjectType),
    Array(TypeId),
    Tuple(Vec<TypeId>),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    TypeParameter {
        name: Atom,
        constraint: Option<TypeId>,
        default: Option<TypeId>,
    },
}

impl TypeKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TypeKind::NumberLiteral(_)
                | TypeKind::StringLiteral(_)
                | TypeKind::BooleanLiteral(_)
                | TypeKind::BigIntLiteral(_)
        )
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, TypeKind::Null | TypeKind::Undefined | TypeKind::Void)
    }

    /// Primitive and literal kinds: the ones an object type can never be.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Number
                | TypeKind::String
                | TypeKind::Boolean
                | TypeKind::BigInt
                | TypeKind::Symbol
                | TypeKind::Void
                | TypeKind::Undefined
                | TypeKind::Null
        ) || self.is_literal()
    }

    pub fn is_number_like(&self) -> bool {
        matches!(self, TypeKind::Number | TypeKind::NumberLiteral(_))
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self, TypeKind::String | TypeKind::StringLiteral(_))
    }

    pub fn is_bigint_like(&self) -> bool {
        matches!(self, TypeKind::BigInt | TypeKind::BigIntLiteral(_))
    }

    pub fn is_boolean_like(&self) -> bool {
        matches!(self, TypeKind::Boolean | TypeKind::BooleanLiteral(_))
    }

    pub fn is_any_or_unknown(&self) -> bool {
        matches!(self, TypeKind::Any | TypeKind::Unknown)
    }

    /// Object-like kinds: objects, arrays, tuples and `object`.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            TypeKind::Object(_) | TypeKind::Array(_) | TypeKind::Tuple(_) | TypeKind::NonPrimitive
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    ObjectLiteral,
    Function,
    Constructor,
    Interface,
    ClassInstance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub kind: ObjectKind,
    /// Declared name for interfaces, classes and named functions.
    pub name: Option<Atom>,
    /// Type arguments of an instantiated generic reference, for display.
    pub type_args: Vec<TypeId>,
    pub desc: ObjectDescriptor,
}

/// Members of an object type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectDescriptor {
    pub properties: IndexMap<Atom, Property>,
    pub call_signatures: Vec<Signature>,
    pub construct_signatures: Vec<Signature>,
    pub string_index: Option<IndexInfo>,
    pub number_index: Option<IndexInfo>,
}

impl ObjectDescriptor {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.call_signatures.is_empty()
            && self.construct_signatures.is_empty()
            && self.string_index.is_none()
            && self.number_index.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: Atom,
    pub ty: TypeId,
    pub optional: bool,
    pub readonly: bool,
}

impl Property {
    pub fn new(name: Atom, ty: TypeId) -> Self {
        Self {
            name,
            ty,
            optional: false,
            readonly: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub ty: TypeId,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Atom,
    pub ty: TypeId,
    pub optional: bool,
}

/// A call or construct signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub type_params: Vec<TypeId>,
    pub params: Vec<Param>,
    /// Array type of the rest parameter.
    pub rest: Option<TypeId>,
    pub min_arg_count: u32,
    pub return_type: TypeId,
    /// The function the signature was built from, when the return type is
    /// inferred lazily.
    pub decl: Option<NodeId>,
}

impl Signature {
    pub fn new(params: Vec<Param>, return_type: TypeId) -> Self {
        let min_arg_count = params.iter().take_while(|p| !p.optional).count() as u32;
        Self {
            type_params: Vec::new(),
            params,
            rest: None,
            min_arg_count,
            return_type,
            decl: None,
        }
    }
}

/// Canonical ids of the intrinsic types.
#[derive(Debug, Clone, Copy)]
pub struct GlobalTypesHolder {
    pub any: TypeId,
    pub unknown: TypeId,
    pub never: TypeId,
    pub void: TypeId,
    pub undefined: TypeId,
    pub null: TypeId,
    pub number: TypeId,
    pub string: TypeId,
    pub boolean: TypeId,
    pub bigint: TypeId,
    pub symbol: TypeId,
    pub object: TypeId,
    pub true_type: TypeId,
    pub false_type: TypeId,
    pub empty_object: TypeId,
    pub any_array: TypeId,
    /// Stands in for the return type of a function whose return type is
    /// being inferred. Behaves like `any`.
    pub resolving_return_type: TypeId,
}

/// The type arena of one checker.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: IndexArena<TypeId, Type>,
    globals: GlobalTypesHolder,
    number_literals: FxHashMap<u64, TypeId>,
    string_literals: FxHashMap<Atom, TypeId>,
    bigint_literals: FxHashMap<Atom, TypeId>,
    arrays: FxHashMap<TypeId, TypeId>,
    unions: FxHashMap<Vec<TypeId>, TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut types = IndexArena::with_capacity(256);
        let mut intrinsic = |kind: TypeKind| types.alloc_with(|id| Type { id, kind });
        let any = intrinsic(TypeKind::Any);
        let unknown = intrinsic(TypeKind::Unknown);
        let never = intrinsic(TypeKind::Never);
        let void = intrinsic(TypeKind::Void);
        let undefined = intrinsic(TypeKind::Undefined);
        let null = intrinsic(TypeKind::Null);
        let number = intrinsic(TypeKind::Number);
        let string = intrinsic(TypeKind::String);
        let boolean = intrinsic(TypeKind::Boolean);
        let bigint = intrinsic(TypeKind::BigInt);
        let symbol = intrinsic(TypeKind::Symbol);
        let object = intrinsic(TypeKind::NonPrimitive);
        let true_type = intrinsic(TypeKind::BooleanLiteral(true));
        let false_type = intrinsic(TypeKind::BooleanLiteral(false));
        let empty_object = intrinsic(TypeKind::Object(ObjectType {
            kind: ObjectKind::ObjectLiteral,
            name: None,
            type_args: Vec::new(),
            desc: ObjectDescriptor::default(),
        }));
        let any_array = intrinsic(TypeKind::Array(any));
        let resolving_return_type = intrinsic(TypeKind::Any);

        let mut arrays = FxHashMap::default();
        arrays.insert(any, any_array);
        Self {
            types,
            globals: GlobalTypesHolder {
                any,
                unknown,
                never,
                void,
                undefined,
                null,
                number,
                string,
                boolean,
                bigint,
                symbol,
                object,
                true_type,
                false_type,
                empty_object,
                any_array,
                resolving_return_type,
            },
            number_literals: FxHashMap::default(),
            string_literals: FxHashMap::default(),
            bigint_literals: FxHashMap::default(),
            arrays,
            unions: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn globals(&self) -> &GlobalTypesHolder {
        &self.globals
    }

    pub fn alloc(&mut self, kind: TypeKind) -> TypeId {
        self.types.alloc_with(|id| Type { id, kind })
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id]
    }

    #[inline]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id].kind
    }

    /// Overwrite the kind of `id`. Used to fill placeholders allocated before
    /// their members were known.
    pub fn set_kind(&mut self, id: TypeId, kind: TypeKind) {
        self.types[id].kind = kind;
    }

    pub fn kind_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.types[id].kind
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ========================================================================
    // Literal interning
    // ========================================================================

    pub fn number_literal(&mut self, value: f64) -> TypeId {
        // -0 and 0 are the same literal type
        let value = if value == 0.0 { 0.0 } else { value };
        let key = value.to_bits();
        if let Some(&id) = self.number_literals.get(&key) {
            return id;
        }
        let id = self.alloc(TypeKind::NumberLiteral(value));
        self.number_literals.insert(key, id);
        id
    }

    pub fn string_literal(&mut self, value: Atom) -> TypeId {
        if let Some(&id) = self.string_literals.get(&value) {
            return id;
        }
        let id = self.alloc(TypeKind::StringLiteral(value));
        self.string_literals.insert(value, id);
        id
    }

    pub fn bigint_literal(&mut self, value: Atom) -> TypeId {
        if let Some(&id) = self.bigint_literals.get(&value) {
            return id;
        }
        let id = self.alloc(TypeKind::BigIntLiteral(value));
        self.bigint_literals.insert(value, id);
        id
    }

    pub fn boolean_literal(&self, value: bool) -> TypeId {
        if value {
            self.globals.true_type
        } else {
            self.globals.false_type
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn array(&mut self, element: TypeId) -> TypeId {
        if let Some(&id) = self.arrays.get(&element) {
            return id;
        }
        let id = self.alloc(TypeKind::Array(element));
        self.arrays.insert(element, id);
        id
    }

    pub fn tuple(&mut self, elements: Vec<TypeId>) -> TypeId {
        self.alloc(TypeKind::Tuple(elements))
    }

    pub fn object(&mut self, kind: ObjectKind, name: Option<Atom>, desc: ObjectDescriptor) -> TypeId {
        self.alloc(TypeKind::Object(ObjectType {
            kind,
            name,
            type_args: Vec::new(),
            desc,
        }))
    }

    /// An anonymous function type with one call signature.
    pub fn function(&mut self, signature: Signature) -> TypeId {
        self.object(
            ObjectKind::Function,
            None,
            ObjectDescriptor {
                call_signatures: vec![signature],
                ..ObjectDescriptor::default()
            },
        )
    }

    /// Build a union: nested unions are flattened, duplicates and `never`
    /// dropped, literals absorbed by their base primitive and `true | false`
    /// collapsed to `boolean`. The same member set always yields the same id.
    pub fn union(&mut self, members: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut flat = Vec::new();
        for member in members {
            self.flatten_union_member(member, &mut flat);
        }
        let g = self.globals;
        if flat.contains(&g.any) || flat.contains(&g.resolving_return_type) {
            return g.any;
        }
        if flat.contains(&g.unknown) {
            return g.unknown;
        }

        let mut seen = Vec::with_capacity(flat.len());
        for id in flat {
            if id != g.never && !seen.contains(&id) {
                seen.push(id);
            }
        }
        if seen.contains(&g.true_type) && seen.contains(&g.false_type) {
            let first = seen
                .iter()
                .position(|&t| t == g.true_type || t == g.false_type)
                .unwrap_or(0);
            seen[first] = g.boolean;
            seen.retain(|&t| t != g.true_type && t != g.false_type);
            seen.dedup();
        }
        let has = |kind: TypeKind, seen: &[TypeId]| seen.iter().any(|&t| *self.kind(t) == kind);
        let (has_number, has_string, has_boolean, has_bigint) = (
            has(TypeKind::Number, &seen),
            has(TypeKind::String, &seen),
            has(TypeKind::Boolean, &seen),
            has(TypeKind::BigInt, &seen),
        );
        seen.retain(|&t| match self.kind(t) {
            TypeKind::NumberLiteral(_) => !has_number,
            TypeKind::StringLiteral(_) => !has_string,
            TypeKind::BooleanLiteral(_) => !has_boolean,
            TypeKind::BigIntLiteral(_) => !has_bigint,
            _ => true,
        });

        match seen.len() {
            0 => g.never,
            1 => seen[0],
            _ => {
                let mut key = seen.clone();
                key.sort_unstable();
                if let Some(&id) = self.unions.get(&key) {
                    return id;
                }
                let id = self.alloc(TypeKind::Union(seen));
                self.unions.insert(key, id);
                id
            }
        }
    }

    fn flatten_union_member(&self, id: TypeId, out: &mut Vec<TypeId>) {
        match self.kind(id) {
            TypeKind::Union(members) => {
                for &member in members {
                    self.flatten_union_member(member, out);
                }
            }
            _ => out.push(id),
        }
    }

    pub fn intersection(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut unique = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        let g = self.globals;
        if unique.contains(&g.never) {
            return g.never;
        }
        if unique.contains(&g.any) {
            return g.any;
        }
        unique.retain(|&t| t != g.unknown);
        match unique.len() {
            0 => g.unknown,
            1 => unique[0],
            _ => self.alloc(TypeKind::Intersection(unique)),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn object_type(&self, id: TypeId) -> Option<&ObjectType> {
        match self.kind(id) {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn call_signatures(&self, id: TypeId) -> &[Signature] {
        self.object_type(id).map_or(&[], |o| &o.desc.call_signatures)
    }

    pub fn construct_signatures(&self, id: TypeId) -> &[Signature] {
        self.object_type(id).map_or(&[], |o| &o.desc.construct_signatures)
    }

    /// A declared property of an object type, looking through intersections.
    pub fn property(&self, id: TypeId, name: Atom) -> Option<&Property> {
        match self.kind(id) {
            TypeKind::Object(object) => object.desc.properties.get(&name),
            TypeKind::Intersection(members) => members.iter().find_map(|&m| self.property(m, name)),
            _ => None,
        }
    }

    /// Literal types widen to their base primitive; unions widen member-wise.
    pub fn base_type_of_literal(&mut self, id: TypeId) -> TypeId {
        let g = self.globals;
        match self.kind(id) {
            TypeKind::NumberLiteral(_) => g.number,
            TypeKind::StringLiteral(_) => g.string,
            TypeKind::BooleanLiteral(_) => g.boolean,
            TypeKind::BigIntLiteral(_) => g.bigint,
            TypeKind::Union(members) => {
                let members = members.clone();
                let widened: Vec<_> = members.into_iter().map(|m| self.base_type_of_literal(m)).collect();
                self.union(widened)
            }
            _ => id,
        }
    }

    /// `id` without its `null`/`undefined` members.
    pub fn non_nullable(&mut self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Null | TypeKind::Undefined => self.globals.never,
            TypeKind::Union(members) => {
                let kept: Vec<_> = members
                    .iter()
                    .copied()
                    .filter(|&m| !matches!(self.kind(m), TypeKind::Null | TypeKind::Undefined))
                    .collect();
                self.union(kept)
            }
            _ => id,
        }
    }

    /// Whether `id` or any of its union members satisfies `predicate`.
    pub fn contains_kind(&self, id: TypeId, predicate: impl Fn(&TypeKind) -> bool + Copy) -> bool {
        match self.kind(id) {
            TypeKind::Union(members) => members.iter().any(|&m| self.contains_kind(m, predicate)),
            kind => predicate(kind),
        }
    }

    /// Whether every member of `id` satisfies `predicate`.
    pub fn all_kinds(&self, id: TypeId, predicate: impl Fn(&TypeKind) -> bool + Copy) -> bool {
        match self.kind(id) {
            TypeKind::Union(members) => members.iter().all(|&m| self.all_kinds(m, predicate)),
            kind => predicate(kind),
        }
    }

    /// Members of a union, or the type itself.
    pub fn members(&self, id: TypeId) -> Vec<TypeId> {
        match self.kind(id) {
            TypeKind::Union(members) => members.clone(),
            _ => vec![id],
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use espanda_core::StringInterner;

    #[test]
    fn test_number_literals_are_interned() {
        let mut table = TypeTable::new();
        let a = table.number_literal(1.5);
        let b = table.number_literal(1.5);
        assert_eq!(a, b);
        assert_ne!(a, table.number_literal(2.0));
        assert_eq!(table.number_literal(-0.0), table.number_literal(0.0));
    }

    #[test]
    fn test_nan_literal_is_stable() {
        let mut table = TypeTable::new();
        assert_eq!(table.number_literal(f64::NAN), table.number_literal(f64::NAN));
    }

    #[test]
    fn test_string_literals_are_interned() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let a = table.string_literal(interner.intern("a"));
        assert_eq!(a, table.string_literal(interner.intern("a")));
        assert_ne!(a, table.string_literal(interner.intern("b")));
    }

    #[test]
    fn test_union_normalisation() {
        let mut table = TypeTable::new();
        let g = *table.globals();
        let one = table.number_literal(1.0);

        assert_eq!(table.union([g.number]), g.number);
        assert_eq!(table.union([g.number, g.number]), g.number);
        assert_eq!(table.union([one, g.number]), g.number);
        assert_eq!(table.union([g.never, g.string]), g.string);
        assert_eq!(table.union([g.string, g.any]), g.any);
        assert_eq!(table.union([g.true_type, g.false_type]), g.boolean);
        assert_eq!(table.union(Vec::new()), g.never);

        let a = table.union([g.string, g.null]);
        let b = table.union([g.null, g.string]);
        assert_eq!(a, b);
        let nested = table.union([a, g.number]);
        assert_eq!(table.members(nested).len(), 3);
    }

    #[test]
    fn test_widening() {
        let mut table = TypeTable::new();
        let g = *table.globals();
        let one = table.number_literal(1.0);
        assert_eq!(table.base_type_of_literal(one), g.number);
        assert_eq!(table.base_type_of_literal(g.true_type), g.boolean);
        let two = table.number_literal(2.0);
        let union = table.union([one, two]);
        assert_eq!(table.base_type_of_literal(union), g.number);
    }

    #[test]
    fn test_non_nullable() {
        let mut table = TypeTable::new();
        let g = *table.globals();
        let union = table.union([g.string, g.null, g.undefined]);
        assert_eq!(table.non_nullable(union), g.string);
        assert_eq!(table.non_nullable(g.null), g.never);
    }
}
