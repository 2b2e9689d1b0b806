//! Substitution of type arguments for type parameters.

use espanda_ast::TypeId;
use espanda_core::collections::FxHashMap;

use crate::types::{IndexInfo, Param, Signature, TypeKind, TypeTable};

/// Rewrites types under a parameter-to-argument mapping.
///
/// Primitive, literal and nominal types come back unchanged. Every object
/// type is copied: the fresh id is registered before the members are
/// rewritten, so self-referential interfaces instantiate to a cycle of
/// copies, and the copy's descriptor shares nothing with the original.
#[derive(Debug, Default)]
pub struct Instantiator {
    mapper: FxHashMap<TypeId, TypeId>,
    visited: FxHashMap<TypeId, TypeId>,
}

impl Instantiator {
    pub fn new(mapper: FxHashMap<TypeId, TypeId>) -> Self {
        Self {
            mapper,
            visited: FxHashMap::default(),
        }
    }

    pub fn from_pairs(params: &[TypeId], args: &[TypeId]) -> Self {
        Self::new(params.iter().copied().zip(args.iter().copied()).collect())
    }

    pub fn instantiate(&mut self, table: &mut TypeTable, id: TypeId) -> TypeId {
        if let Some(&mapped) = self.visited.get(&id) {
            return mapped;
        }
        match table.kind(id).clone() {
            TypeKind::TypeParameter { .. } => self.mapper.get(&id).copied().unwrap_or(id),
            TypeKind::Array(element) => {
                let element = self.instantiate(table, element);
                table.array(element)
            }
            TypeKind::Tuple(elements) => {
                let elements = elements.into_iter().map(|e| self.instantiate(table, e)).collect();
                table.tuple(elements)
            }
            TypeKind::Union(members) => {
                let members: Vec<_> = members.into_iter().map(|m| self.instantiate(table, m)).collect();
                table.union(members)
            }
            TypeKind::Intersection(members) => {
                let members = members.into_iter().map(|m| self.instantiate(table, m)).collect();
                table.intersection(members)
            }
            TypeKind::Object(mut object) => {
                let copy = table.alloc(TypeKind::Any);
                self.visited.insert(id, copy);

                object.type_args = object.type_args.iter().map(|&t| self.instantiate(table, t)).collect();
                let desc = &mut object.desc;
                for property in desc.properties.values_mut() {
                    property.ty = self.instantiate(table, property.ty);
                }
                for signature in desc
                    .call_signatures
                    .iter_mut()
                    .chain(desc.construct_signatures.iter_mut())
                {
                    *signature = self.instantiate_signature(table, signature);
                }
                for index in [&mut desc.string_index, &mut desc.number_index].into_iter().flatten() {
                    *index = IndexInfo {
                        ty: self.instantiate(table, index.ty),
                        readonly: index.readonly,
                    };
                }
                table.set_kind(copy, TypeKind::Object(object));
                copy
            }
            _ => id,
        }
    }

    pub fn instantiate_signature(&mut self, table: &mut TypeTable, signature: &Signature) -> Signature {
        Signature {
            type_params: signature
                .type_params
                .iter()
                .copied()
                .filter(|p| !self.mapper.contains_key(p))
                .collect(),
            params: signature
                .params
                .iter()
                .map(|p| Param {
                    name: p.name,
                    ty: self.instantiate(table, p.ty),
                    optional: p.optional,
                })
                .collect(),
            rest: signature.rest.map(|r| self.instantiate(table, r)),
            min_arg_count: signature.min_arg_count,
            return_type: self.instantiate(table, signature.return_type),
            decl: signature.decl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectDescriptor, ObjectKind, Property};
    use espanda_core::StringInterner;

    #[test]
    fn test_instantiate_array_and_union() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let t = table.alloc(TypeKind::TypeParameter {
            name: interner.intern("T"),
            constraint: None,
            default: None,
        });
        let array = table.array(t);
        let nullable = table.union([t, g.null]);

        let mut instantiator = Instantiator::from_pairs(&[t], &[g.number]);
        let number_array = table.array(g.number);
        assert_eq!(instantiator.instantiate(&mut table, array), number_array);
        let expected = table.union([g.number, g.null]);
        assert_eq!(instantiator.instantiate(&mut table, nullable), expected);
        assert_eq!(instantiator.instantiate(&mut table, g.string), g.string);
    }

    #[test]
    fn test_instantiate_recursive_object() {
        let interner = StringInterner::new();
        let (value, next) = (interner.intern("value"), interner.intern("next"));
        let mut table = TypeTable::new();
        let g = *table.globals();
        let t = table.alloc(TypeKind::TypeParameter {
            name: interner.intern("T"),
            constraint: None,
            default: None,
        });
        let node = table.alloc(TypeKind::Any);
        let mut desc = ObjectDescriptor::default();
        desc.properties.insert(value, Property::new(value, t));
        desc.properties.insert(next, Property::new(next, node));
        table.set_kind(
            node,
            TypeKind::Object(crate::types::ObjectType {
                kind: ObjectKind::Interface,
                name: Some(interner.intern("Node")),
                type_args: vec![t],
                desc,
            }),
        );

        let mut instantiator = Instantiator::from_pairs(&[t], &[g.string]);
        let copy = instantiator.instantiate(&mut table, node);
        assert_ne!(copy, node);
        assert_eq!(table.property(copy, value).map(|p| p.ty), Some(g.string));
        assert_eq!(table.property(copy, next).map(|p| p.ty), Some(copy));
    }

    #[test]
    fn test_primitives_and_literals_are_returned_as_is() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let t = table.alloc(TypeKind::TypeParameter {
            name: interner.intern("T"),
            constraint: None,
            default: None,
        });
        let five = table.number_literal(5.0);
        let hello = table.string_literal(interner.intern("hello"));

        let mut instantiator = Instantiator::from_pairs(&[t], &[g.number]);
        for id in [g.any, g.null, g.undefined, g.void, g.symbol, g.object, five, hello] {
            assert_eq!(instantiator.instantiate(&mut table, id), id);
        }
    }

    #[test]
    fn test_function_copy_is_independent() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let t = table.alloc(TypeKind::TypeParameter {
            name: interner.intern("T"),
            constraint: None,
            default: None,
        });
        let param = Param {
            name: interner.intern("x"),
            ty: t,
            optional: false,
        };
        let function = table.function(Signature::new(vec![param], t));

        let mut instantiator = Instantiator::from_pairs(&[t], &[g.number]);
        let copy = instantiator.instantiate(&mut table, function);
        assert_ne!(copy, function);

        let TypeKind::Object(object) = table.kind(copy) else {
            panic!("expected an object type");
        };
        let signature = &object.desc.call_signatures[0];
        assert_eq!(signature.params[0].ty, g.number);
        assert_eq!(signature.return_type, g.number);

        if let TypeKind::Object(object) = table.kind_mut(copy) {
            object.desc.call_signatures.push(Signature::new(Vec::new(), g.string));
            object.desc.call_signatures[0].return_type = g.string;
        }
        let TypeKind::Object(original) = table.kind(function) else {
            panic!("expected an object type");
        };
        assert_eq!(original.desc.call_signatures.len(), 1);
        assert_eq!(original.desc.call_signatures[0].return_type, t);
    }

    #[test]
    fn test_objects_are_always_copied() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let mut table = TypeTable::new();
        let g = *table.globals();
        let t = table.alloc(TypeKind::TypeParameter {
            name: interner.intern("T"),
            constraint: None,
            default: None,
        });
        let param = Param {
            name: x,
            ty: g.number,
            optional: false,
        };
        let function = table.function(Signature::new(vec![param], g.string));
        let mut desc = ObjectDescriptor::default();
        desc.properties.insert(x, Property::new(x, g.number));
        let literal = table.object(ObjectKind::ObjectLiteral, None, desc);

        let mut mapped = Instantiator::from_pairs(&[t], &[g.number]);
        let function_copy = mapped.instantiate(&mut table, function);
        let literal_copy = mapped.instantiate(&mut table, literal);
        assert_ne!(function_copy, function);
        assert_ne!(literal_copy, literal);
        assert_eq!(table.call_signatures(function_copy)[0].return_type, g.string);
        assert_eq!(table.property(literal_copy, x).map(|p| p.ty), Some(g.number));

        let mut empty = Instantiator::default();
        assert_ne!(empty.instantiate(&mut table, function), function);
        assert_eq!(empty.instantiate(&mut table, g.number), g.number);
    }
}
