//! Type relations: identity, assignability and comparability.
//!
//! Assignability is split between the two sides of a relation. The source
//! type gets the first word ([`TypeRelation::assignment_source`]): `never`,
//! `any`, unions and nullable sources decide on their own. When the source
//! stays silent the target decides ([`TypeRelation::assignment_target`]).
//! The two rules are deliberately not symmetric; `never` is assignable to
//! everything yet accepts only itself.
//!
//! Results are cached per `(source, target)` pair. A pair that is still being
//! computed answers [`RelationResult::Maybe`], which counts as success, so
//! relating recursive types terminates.

use espanda_ast::TypeId;
use espanda_core::collections::FxHashMap;
use std::mem::discriminant;

use crate::types::{ObjectType, Signature, TypeKind, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Identical,
    Assignable,
    Comparable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationResult {
    True,
    False,
    /// The pair is on the current relation path.
    Maybe,
}

#[derive(Debug, Clone, Default)]
pub struct TypeRelation {
    cache: FxHashMap<(TypeId, TypeId, RelationKind), RelationResult>,
    strict_null_checks: bool,
}

impl TypeRelation {
    pub fn new(strict_null_checks: bool) -> Self {
        Self {
            cache: FxHashMap::default(),
            strict_null_checks,
        }
    }

    pub fn strict_null_checks(&self) -> bool {
        self.strict_null_checks
    }

    pub fn is_identical_to(&mut self, table: &TypeTable, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        self.cached(RelationKind::Identical, source, target, |relation| {
            relation.identical(table, target, source)
        })
    }

    pub fn is_assignable_to(&mut self, table: &TypeTable, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        self.cached(RelationKind::Assignable, source, target, |relation| {
            match relation.assignment_source(table, source, target) {
                Some(result) => result,
                None => relation.assignment_target(table, target, source),
            }
        })
    }

    /// Assignable in either direction. A union source is comparable when any
    /// member is.
    pub fn is_comparable_to(&mut self, table: &TypeTable, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        self.cached(RelationKind::Comparable, source, target, |relation| {
            if let TypeKind::Union(members) = table.kind(source) {
                return members.iter().any(|&m| relation.is_comparable_to(table, m, target));
            }
            relation.is_assignable_to(table, source, target) || relation.is_assignable_to(table, target, source)
        })
    }

    fn cached(
        &mut self,
        kind: RelationKind,
        source: TypeId,
        target: TypeId,
        compute: impl FnOnce(&mut Self) -> bool,
    ) -> bool {
        let key = (source, target, kind);
        if let Some(&result) = self.cache.get(&key) {
            return result != RelationResult::False;
        }
        self.cache.insert(key, RelationResult::Maybe);
        let result = compute(self);
        self.cache.insert(
            key,
            if result {
                RelationResult::True
            } else {
                RelationResult::False
            },
        );
        result
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// `target`'s identity rule: same kind first, then the payload.
    fn identical(&mut self, table: &TypeTable, target: TypeId, source: TypeId) -> bool {
        let (t, s) = (table.kind(target), table.kind(source));
        if discriminant(t) != discriminant(s) {
            return false;
        }
        match (t, s) {
            (TypeKind::NumberLiteral(a), TypeKind::NumberLiteral(b)) => a == b || (a.is_nan() && b.is_nan()),
            (TypeKind::StringLiteral(a), TypeKind::StringLiteral(b))
            | (TypeKind::BigIntLiteral(a), TypeKind::BigIntLiteral(b)) => a == b,
            (TypeKind::BooleanLiteral(a), TypeKind::BooleanLiteral(b)) => a == b,
            (TypeKind::Array(a), TypeKind::Array(b)) => self.is_identical_to(table, *b, *a),
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| self.is_identical_to(table, y, x))
            }
            (TypeKind::Union(a), TypeKind::Union(b)) | (TypeKind::Intersection(a), TypeKind::Intersection(b)) => {
                a.len() == b.len()
                    && b.iter()
                        .all(|&sm| a.iter().any(|&tm| self.is_identical_to(table, sm, tm)))
            }
            (TypeKind::Object(a), TypeKind::Object(b)) => self.identical_objects(table, a, b),
            // distinct type parameters are never identical
            (TypeKind::TypeParameter { .. }, _) => false,
            _ => true,
        }
    }

    fn identical_objects(&mut self, table: &TypeTable, target: &ObjectType, source: &ObjectType) -> bool {
        let (t, s) = (&target.desc, &source.desc);
        if t.properties.len() != s.properties.len()
            || t.call_signatures.len() != s.call_signatures.len()
            || t.construct_signatures.len() != s.construct_signatures.len()
        {
            return false;
        }
        for (name, tp) in &t.properties {
            let Some(sp) = s.properties.get(name) else {
                return false;
            };
            if tp.optional != sp.optional || tp.readonly != sp.readonly || !self.is_identical_to(table, sp.ty, tp.ty) {
                return false;
            }
        }
        let signatures = t
            .call_signatures
            .iter()
            .zip(&s.call_signatures)
            .chain(t.construct_signatures.iter().zip(&s.construct_signatures));
        for (ts, ss) in signatures {
            if !self.identical_signatures(table, ts, ss) {
                return false;
            }
        }
        for (ti, si) in [(&t.string_index, &s.string_index), (&t.number_index, &s.number_index)] {
            match (ti, si) {
                (None, None) => {}
                (Some(ti), Some(si)) if self.is_identical_to(table, si.ty, ti.ty) => {}
                _ => return false,
            }
        }
        true
    }

    fn identical_signatures(&mut self, table: &TypeTable, target: &Signature, source: &Signature) -> bool {
        target.params.len() == source.params.len()
            && target.min_arg_count == source.min_arg_count
            && target.rest.is_some() == source.rest.is_some()
            && target
                .params
                .iter()
                .zip(&source.params)
                .all(|(tp, sp)| self.is_identical_to(table, sp.ty, tp.ty))
            && self.is_identical_to(table, source.return_type, target.return_type)
    }

    // ========================================================================
    // Assignability
    // ========================================================================

    /// The source side of assignability. `None` leaves the decision to the
    /// target.
    fn assignment_source(&mut self, table: &TypeTable, source: TypeId, target: TypeId) -> Option<bool> {
        let target_kind = table.kind(target);
        match table.kind(source) {
            // a `null` target turns `never` away itself
            TypeKind::Never if matches!(target_kind, TypeKind::Null) => None,
            TypeKind::Never => Some(true),
            TypeKind::Any => Some(!matches!(target_kind, TypeKind::Never)),
            TypeKind::Null | TypeKind::Undefined if !self.strict_null_checks => {
                Some(!matches!(target_kind, TypeKind::Never))
            }
            TypeKind::Undefined if matches!(target_kind, TypeKind::Void) => Some(true),
            TypeKind::Union(members) => Some(members.iter().all(|&m| self.is_assignable_to(table, m, target))),
            TypeKind::Intersection(members) => members
                .iter()
                .any(|&m| self.is_assignable_to(table, m, target))
                .then_some(true),
            TypeKind::TypeParameter { constraint, .. } => match target_kind {
                TypeKind::Any | TypeKind::Unknown => Some(true),
                TypeKind::Union(_) => None,
                _ => Some(constraint.is_some_and(|c| self.is_assignable_to(table, c, target))),
            },
            _ => None,
        }
    }

    /// The target side of assignability.
    fn assignment_target(&mut self, table: &TypeTable, target: TypeId, source: TypeId) -> bool {
        let source_kind = table.kind(source);
        match table.kind(target) {
            TypeKind::Any | TypeKind::Unknown => true,
            TypeKind::Never => false,
            TypeKind::Void => matches!(source_kind, TypeKind::Void | TypeKind::Undefined),
            TypeKind::Undefined => matches!(source_kind, TypeKind::Undefined),
            TypeKind::Null if self.strict_null_checks => matches!(source_kind, TypeKind::Null),
            TypeKind::Null => !matches!(source_kind, TypeKind::Never),
            TypeKind::Number => source_kind.is_number_like(),
            TypeKind::String => source_kind.is_string_like(),
            TypeKind::Boolean => source_kind.is_boolean_like(),
            TypeKind::BigInt => source_kind.is_bigint_like(),
            TypeKind::Symbol => matches!(source_kind, TypeKind::Symbol),
            TypeKind::NonPrimitive => source_kind.is_object_like(),
            TypeKind::NumberLiteral(_)
            | TypeKind::StringLiteral(_)
            | TypeKind::BooleanLiteral(_)
            | TypeKind::BigIntLiteral(_) => self.is_identical_to(table, source, target),
            TypeKind::Union(members) => {
                // without strictNullChecks `T | null` is just `T`
                let nullable = |m: TypeId| matches!(table.kind(m), TypeKind::Null | TypeKind::Undefined);
                let erase = !self.strict_null_checks && members.iter().any(|&m| !nullable(m));
                members
                    .iter()
                    .filter(|&&m| !(erase && nullable(m)))
                    .any(|&m| self.is_assignable_to(table, source, m))
            }
            TypeKind::Intersection(members) => members.iter().all(|&m| self.is_assignable_to(table, source, m)),
            TypeKind::TypeParameter { .. } => false,
            TypeKind::Array(element) => match source_kind {
                TypeKind::Array(source_element) => self.is_assignable_to(table, *source_element, *element),
                TypeKind::Tuple(elements) => elements.iter().all(|&e| self.is_assignable_to(table, e, *element)),
                _ => false,
            },
            TypeKind::Tuple(elements) => match source_kind {
                TypeKind::Tuple(source_elements) => {
                    source_elements.len() == elements.len()
                        && source_elements
                            .iter()
                            .zip(elements)
                            .all(|(&s, &t)| self.is_assignable_to(table, s, t))
                }
                _ => false,
            },
            TypeKind::Object(object) => self.object_accepts(table, object, source),
        }
    }

    /// Structural check of `source` against an object target.
    fn object_accepts(&mut self, table: &TypeTable, target: &ObjectType, source: TypeId) -> bool {
        let desc = &target.desc;
        let weak = desc.call_signatures.is_empty()
            && desc.construct_signatures.is_empty()
            && desc.properties.values().all(|p| p.optional);
        let source_object = match table.kind(source) {
            TypeKind::Object(object) => Some(object),
            TypeKind::Intersection(_) => None,
            kind if kind.is_primitive() => return weak && !kind.is_nullish(),
            // arrays, tuples and `object` only have the members every object has
            _ => return weak && desc.string_index.is_none(),
        };

        for (name, target_prop) in &desc.properties {
            match table.property(source, *name) {
                Some(source_prop) => {
                    if !self.is_assignable_to(table, source_prop.ty, target_prop.ty) {
                        return false;
                    }
                }
                None if target_prop.optional => {}
                None => return false,
            }
        }

        let source_calls = table.call_signatures(source);
        for target_sig in &desc.call_signatures {
            if !source_calls.iter().any(|s| self.signature_assignable(table, s, target_sig)) {
                return false;
            }
        }
        let source_constructs = table.construct_signatures(source);
        for target_sig in &desc.construct_signatures {
            if !source_constructs.iter().any(|s| self.signature_assignable(table, s, target_sig)) {
                return false;
            }
        }

        let implicit_index = source_object.is_some_and(|o| o.kind == crate::types::ObjectKind::ObjectLiteral);
        for (target_index, is_string) in [(&desc.string_index, true), (&desc.number_index, false)] {
            let Some(target_index) = target_index else {
                continue;
            };
            let source_index = source_object.and_then(|o| {
                if is_string {
                    o.desc.string_index.as_ref()
                } else {
                    o.desc.number_index.as_ref().or(o.desc.string_index.as_ref())
                }
            });
            match source_index {
                Some(source_index) => {
                    if !self.is_assignable_to(table, source_index.ty, target_index.ty) {
                        return false;
                    }
                }
                None if implicit_index && is_string => {
                    let props: Vec<TypeId> = source_object
                        .map(|o| o.desc.properties.values().map(|p| p.ty).collect())
                        .unwrap_or_default();
                    if !props.iter().all(|&p| self.is_assignable_to(table, p, target_index.ty)) {
                        return false;
                    }
                }
                None if implicit_index => {}
                None => return false,
            }
        }
        true
    }

    /// Parameters compare bivariantly, returns covariantly. A target that
    /// returns `void` accepts any return type.
    fn signature_assignable(&mut self, table: &TypeTable, source: &Signature, target: &Signature) -> bool {
        if source.min_arg_count as usize > target.params.len() && target.rest.is_none() {
            return false;
        }
        let generic = !source.type_params.is_empty() || !target.type_params.is_empty();
        let involves_type_param =
            |ty: TypeId| generic && table.contains_kind(ty, |k| matches!(k, TypeKind::TypeParameter { .. }));
        for (sp, tp) in source.params.iter().zip(&target.params) {
            if involves_type_param(sp.ty) || involves_type_param(tp.ty) {
                continue;
            }
            if !self.is_assignable_to(table, tp.ty, sp.ty) && !self.is_assignable_to(table, sp.ty, tp.ty) {
                return false;
            }
        }
        if matches!(table.kind(target.return_type), TypeKind::Void)
            || involves_type_param(source.return_type)
            || involves_type_param(target.return_type)
        {
            return true;
        }
        self.is_assignable_to(table, source.return_type, target.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectDescriptor, ObjectKind, Param, Property};
    use espanda_core::StringInterner;

    fn object(table: &mut TypeTable, props: &[(espanda_core::Atom, TypeId, bool)]) -> TypeId {
        let mut desc = ObjectDescriptor::default();
        for &(name, ty, optional) in props {
            desc.properties.insert(
                name,
                Property {
                    optional,
                    ..Property::new(name, ty)
                },
            );
        }
        table.object(ObjectKind::ObjectLiteral, None, desc)
    }

    #[test]
    fn test_never_is_asymmetric() {
        let table = TypeTable::new();
        let g = *table.globals();
        let mut relation = TypeRelation::new(false);
        assert!(relation.is_assignable_to(&table, g.never, g.number));
        assert!(relation.is_assignable_to(&table, g.never, g.never));
        assert!(!relation.is_assignable_to(&table, g.number, g.never));
        assert!(!relation.is_assignable_to(&table, g.any, g.never));
    }

    #[test]
    fn test_any_and_unknown() {
        let table = TypeTable::new();
        let g = *table.globals();
        let mut relation = TypeRelation::new(true);
        assert!(relation.is_assignable_to(&table, g.any, g.string));
        assert!(relation.is_assignable_to(&table, g.string, g.unknown));
        assert!(!relation.is_assignable_to(&table, g.unknown, g.string));
        assert!(relation.is_assignable_to(&table, g.unknown, g.any));
    }

    #[test]
    fn test_null_depends_on_strict_null_checks() {
        let table = TypeTable::new();
        let g = *table.globals();
        let mut loose = TypeRelation::new(false);
        assert!(loose.is_assignable_to(&table, g.null, g.number));
        assert!(loose.is_assignable_to(&table, g.undefined, g.string));
        let mut strict = TypeRelation::new(true);
        assert!(!strict.is_assignable_to(&table, g.null, g.number));
        assert!(strict.is_assignable_to(&table, g.undefined, g.void));
        assert!(!strict.is_assignable_to(&table, g.void, g.undefined));
    }

    #[test]
    fn test_literals_and_unions() {
        let mut table = TypeTable::new();
        let g = *table.globals();
        let one = table.number_literal(1.0);
        let two = table.number_literal(2.0);
        let one_or_two = table.union([one, two]);
        let string_or_number = table.union([g.string, g.number]);
        let mut relation = TypeRelation::new(false);

        assert!(relation.is_assignable_to(&table, one, g.number));
        assert!(!relation.is_assignable_to(&table, g.number, one));
        assert!(relation.is_assignable_to(&table, one, one_or_two));
        assert!(relation.is_assignable_to(&table, one_or_two, g.number));
        assert!(!relation.is_assignable_to(&table, string_or_number, g.number));
        assert!(relation.is_assignable_to(&table, g.number, string_or_number));
        assert!(!relation.is_assignable_to(&table, g.boolean, string_or_number));
    }

    #[test]
    fn test_structural_objects() {
        let interner = StringInterner::new();
        let (a, b) = (interner.intern("a"), interner.intern("b"));
        let mut table = TypeTable::new();
        let g = *table.globals();
        let ab = object(&mut table, &[(a, g.number, false), (b, g.string, false)]);
        let only_a = object(&mut table, &[(a, g.number, false)]);
        let optional_b = object(&mut table, &[(a, g.number, false), (b, g.string, true)]);
        let mut relation = TypeRelation::new(false);

        assert!(relation.is_assignable_to(&table, ab, only_a));
        assert!(!relation.is_assignable_to(&table, only_a, ab));
        assert!(relation.is_assignable_to(&table, only_a, optional_b));
        assert!(relation.is_assignable_to(&table, g.string, g.empty_object));
        assert!(!relation.is_assignable_to(&table, g.string, only_a));
    }

    #[test]
    fn test_recursive_object_terminates() {
        let interner = StringInterner::new();
        let next = interner.intern("next");
        let mut table = TypeTable::new();
        let first = table.alloc(TypeKind::Any);
        let second = table.alloc(TypeKind::Any);
        for (id, other) in [(first, first), (second, second)] {
            let mut desc = ObjectDescriptor::default();
            desc.properties.insert(next, Property::new(next, other));
            table.set_kind(
                id,
                TypeKind::Object(ObjectType {
                    kind: ObjectKind::Interface,
                    name: None,
                    type_args: Vec::new(),
                    desc,
                }),
            );
        }
        let mut relation = TypeRelation::new(false);
        assert!(relation.is_assignable_to(&table, first, second));
        assert!(relation.is_identical_to(&table, first, second));
    }

    #[test]
    fn test_function_signatures() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let mut table = TypeTable::new();
        let g = *table.globals();
        let param = |ty| Param {
            name: x,
            ty,
            optional: false,
        };
        let takes_number = table.function(Signature::new(vec![param(g.number)], g.string));
        let takes_nothing = table.function(Signature::new(Vec::new(), g.string));
        let returns_void = table.function(Signature::new(vec![param(g.number)], g.void));
        let takes_string = table.function(Signature::new(vec![param(g.string)], g.string));
        let mut relation = TypeRelation::new(false);

        assert!(relation.is_assignable_to(&table, takes_nothing, takes_number));
        assert!(!relation.is_assignable_to(&table, takes_number, takes_nothing));
        assert!(relation.is_assignable_to(&table, takes_number, returns_void));
        assert!(!relation.is_assignable_to(&table, takes_string, takes_number));
    }

    #[test]
    fn test_comparable() {
        let mut table = TypeTable::new();
        let g = *table.globals();
        let one = table.number_literal(1.0);
        let string_or_number = table.union([g.string, g.number]);
        let mut relation = TypeRelation::new(false);
        assert!(relation.is_comparable_to(&table, g.number, one));
        assert!(relation.is_comparable_to(&table, string_or_number, one));
        assert!(!relation.is_comparable_to(&table, g.string, one));
    }

    #[test]
    fn test_literal_identity_is_symmetric() {
        let mut table = TypeTable::new();
        let five = table.number_literal(5.0);
        let other_five = table.number_literal(5.0);
        let six = table.number_literal(6.0);
        let mut relation = TypeRelation::new(false);
        assert_eq!(five, other_five);
        assert!(relation.is_identical_to(&table, five, other_five));
        assert!(relation.is_identical_to(&table, other_five, five));
        assert!(!relation.is_identical_to(&table, five, six));
        assert!(!relation.is_identical_to(&table, six, five));
    }

    #[test]
    fn test_undefined_into_never_fails_in_both_modes() {
        let table = TypeTable::new();
        let g = *table.globals();
        for strict in [false, true] {
            let mut relation = TypeRelation::new(strict);
            assert!(!relation.is_assignable_to(&table, g.undefined, g.never));
            assert!(!relation.is_assignable_to(&table, g.null, g.never));
        }
    }

    #[test]
    fn test_null_target_is_asymmetric() {
        let mut table = TypeTable::new();
        let g = *table.globals();
        let mut loose = TypeRelation::new(false);
        assert!(loose.is_assignable_to(&table, g.number, g.null));
        assert!(!loose.is_assignable_to(&table, g.never, g.null));
        assert!(loose.is_assignable_to(&table, g.null, g.number));

        let mut strict = TypeRelation::new(true);
        assert!(!strict.is_assignable_to(&table, g.number, g.null));
        assert!(!strict.is_assignable_to(&table, g.never, g.null));
        assert!(strict.is_assignable_to(&table, g.never, g.number));

        // the null member of a union target does not open it up
        let string_or_null = table.union([g.string, g.null]);
        assert!(!loose.is_assignable_to(&table, g.number, string_or_null));
        assert!(loose.is_assignable_to(&table, g.null, string_or_null));
        assert!(!strict.is_assignable_to(&table, g.number, string_or_null));
        assert!(strict.is_assignable_to(&table, g.null, string_or_null));
    }
}
