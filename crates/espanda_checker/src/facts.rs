//! Type facts: what a runtime check can reveal about a value of a type.
//!
//! Narrowing filters union members by the facts a condition establishes.

use espanda_ast::TypeId;
use espanda_core::StringInterner;

use crate::types::{TypeKind, TypeTable};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFacts: u32 {
        const TYPEOF_EQ_STRING    = 1 << 0;
        const TYPEOF_EQ_NUMBER    = 1 << 1;
        const TYPEOF_EQ_BIGINT    = 1 << 2;
        const TYPEOF_EQ_BOOLEAN   = 1 << 3;
        const TYPEOF_EQ_SYMBOL    = 1 << 4;
        const TYPEOF_EQ_OBJECT    = 1 << 5;
        const TYPEOF_EQ_FUNCTION  = 1 << 6;
        const TYPEOF_EQ_UNDEFINED = 1 << 7;
        const TYPEOF_NE_STRING    = 1 << 8;
        const TYPEOF_NE_NUMBER    = 1 << 9;
        const TYPEOF_NE_BIGINT    = 1 << 10;
        const TYPEOF_NE_BOOLEAN   = 1 << 11;
        const TYPEOF_NE_SYMBOL    = 1 << 12;
        const TYPEOF_NE_OBJECT    = 1 << 13;
        const TYPEOF_NE_FUNCTION  = 1 << 14;
        const TYPEOF_NE_UNDEFINED = 1 << 15;
        const EQ_UNDEFINED        = 1 << 16;
        const EQ_NULL             = 1 << 17;
        const EQ_UNDEFINED_OR_NULL = 1 << 18;
        const NE_UNDEFINED        = 1 << 19;
        const NE_NULL             = 1 << 20;
        const NE_UNDEFINED_OR_NULL = 1 << 21;
        const TRUTHY              = 1 << 22;
        const FALSY               = 1 << 23;

        const TYPEOF_NE_ALL = Self::TYPEOF_NE_STRING.bits()
            | Self::TYPEOF_NE_NUMBER.bits()
            | Self::TYPEOF_NE_BIGINT.bits()
            | Self::TYPEOF_NE_BOOLEAN.bits()
            | Self::TYPEOF_NE_SYMBOL.bits()
            | Self::TYPEOF_NE_OBJECT.bits()
            | Self::TYPEOF_NE_FUNCTION.bits()
            | Self::TYPEOF_NE_UNDEFINED.bits();
        const NOT_NULLISH = Self::NE_UNDEFINED.bits()
            | Self::NE_NULL.bits()
            | Self::NE_UNDEFINED_OR_NULL.bits();
    }
}

impl TypeFacts {
    fn primitive(typeof_eq: TypeFacts, typeof_ne: TypeFacts, truthiness: TypeFacts) -> TypeFacts {
        typeof_eq | (TypeFacts::TYPEOF_NE_ALL - typeof_ne) | TypeFacts::NOT_NULLISH | truthiness
    }

    /// Facts established by `typeof x === tag` (or `!==` when `equal` is
    /// false). `None` for a tag `typeof` never produces.
    pub fn for_typeof(tag: &str, equal: bool) -> Option<TypeFacts> {
        let (eq, ne) = match tag {
            "string" => (TypeFacts::TYPEOF_EQ_STRING, TypeFacts::TYPEOF_NE_STRING),
            "number" => (TypeFacts::TYPEOF_EQ_NUMBER, TypeFacts::TYPEOF_NE_NUMBER),
            "bigint" => (TypeFacts::TYPEOF_EQ_BIGINT, TypeFacts::TYPEOF_NE_BIGINT),
            "boolean" => (TypeFacts::TYPEOF_EQ_BOOLEAN, TypeFacts::TYPEOF_NE_BOOLEAN),
            "symbol" => (TypeFacts::TYPEOF_EQ_SYMBOL, TypeFacts::TYPEOF_NE_SYMBOL),
            "object" => (TypeFacts::TYPEOF_EQ_OBJECT, TypeFacts::TYPEOF_NE_OBJECT),
            "function" => (TypeFacts::TYPEOF_EQ_FUNCTION, TypeFacts::TYPEOF_NE_FUNCTION),
            "undefined" => (TypeFacts::TYPEOF_EQ_UNDEFINED, TypeFacts::TYPEOF_NE_UNDEFINED),
            _ => return None,
        };
        Some(if equal { eq } else { ne })
    }
}

/// Facts that can hold for a value of type `id`.
pub fn type_facts(table: &TypeTable, interner: &StringInterner, id: TypeId) -> TypeFacts {
    let truthy_or_falsy = TypeFacts::TRUTHY | TypeFacts::FALSY;
    let object_facts = |function: bool| {
        let (eq, ne) = if function {
            (TypeFacts::TYPEOF_EQ_FUNCTION, TypeFacts::TYPEOF_NE_FUNCTION)
        } else {
            (TypeFacts::TYPEOF_EQ_OBJECT, TypeFacts::TYPEOF_NE_OBJECT)
        };
        eq | (TypeFacts::TYPEOF_NE_ALL - ne) | TypeFacts::NOT_NULLISH | TypeFacts::TRUTHY
    };

    match table.kind(id) {
        TypeKind::Any | TypeKind::Unknown => TypeFacts::all(),
        TypeKind::Never => TypeFacts::empty(),
        TypeKind::Number => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_NUMBER,
            TypeFacts::TYPEOF_NE_NUMBER,
            truthy_or_falsy,
        ),
        TypeKind::NumberLiteral(value) => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_NUMBER,
            TypeFacts::TYPEOF_NE_NUMBER,
            truthiness(*value != 0.0 && !value.is_nan()),
        ),
        TypeKind::String => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_STRING,
            TypeFacts::TYPEOF_NE_STRING,
            truthy_or_falsy,
        ),
        TypeKind::StringLiteral(value) => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_STRING,
            TypeFacts::TYPEOF_NE_STRING,
            truthiness(!interner.resolve(*value).is_empty()),
        ),
        TypeKind::BigInt => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_BIGINT,
            TypeFacts::TYPEOF_NE_BIGINT,
            truthy_or_falsy,
        ),
        TypeKind::BigIntLiteral(value) => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_BIGINT,
            TypeFacts::TYPEOF_NE_BIGINT,
            truthiness(!is_zero_bigint(interner.resolve(*value))),
        ),
        TypeKind::Boolean => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_BOOLEAN,
            TypeFacts::TYPEOF_NE_BOOLEAN,
            truthy_or_falsy,
        ),
        TypeKind::BooleanLiteral(value) => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_BOOLEAN,
            TypeFacts::TYPEOF_NE_BOOLEAN,
            truthiness(*value),
        ),
        TypeKind::Symbol => TypeFacts::primitive(
            TypeFacts::TYPEOF_EQ_SYMBOL,
            TypeFacts::TYPEOF_NE_SYMBOL,
            TypeFacts::TRUTHY,
        ),
        TypeKind::Null => {
            TypeFacts::TYPEOF_EQ_OBJECT
                | (TypeFacts::TYPEOF_NE_ALL - TypeFacts::TYPEOF_NE_OBJECT)
                | TypeFacts::EQ_NULL
                | TypeFacts::EQ_UNDEFINED_OR_NULL
                | TypeFacts::NE_UNDEFINED
                | TypeFacts::FALSY
        }
        TypeKind::Undefined | TypeKind::Void => {
            TypeFacts::TYPEOF_EQ_UNDEFINED
                | (TypeFacts::TYPEOF_NE_ALL - TypeFacts::TYPEOF_NE_UNDEFINED)
                | TypeFacts::EQ_UNDEFINED
                | TypeFacts::EQ_UNDEFINED_OR_NULL
                | TypeFacts::NE_NULL
                | TypeFacts::FALSY
        }
        TypeKind::NonPrimitive => object_facts(false) | object_facts(true),
        TypeKind::Array(_) | TypeKind::Tuple(_) => object_facts(false),
        TypeKind::Object(object) => {
            object_facts(!object.desc.call_signatures.is_empty() || !object.desc.construct_signatures.is_empty())
        }
        TypeKind::Union(members) | TypeKind::Intersection(members) => members
            .iter()
            .fold(TypeFacts::empty(), |acc, &m| acc | type_facts(table, interner, m)),
        TypeKind::TypeParameter { constraint, .. } => match constraint {
            Some(constraint) => type_facts(table, interner, *constraint),
            None => TypeFacts::all(),
        },
    }
}

fn truthiness(truthy: bool) -> TypeFacts {
    if truthy {
        TypeFacts::TRUTHY
    } else {
        TypeFacts::FALSY
    }
}

fn is_zero_bigint(text: &str) -> bool {
    let digits = match text.get(..2) {
        Some("0x" | "0X" | "0o" | "0O" | "0b" | "0B") => &text[2..],
        _ => text,
    };
    digits.bytes().all(|b| b == b'0')
}

/// Keep the members of `id` for which any of `facts` can hold. `boolean`
/// is split into `true | false` first, so truthiness narrows it to a literal.
pub fn filter_type(table: &mut TypeTable, interner: &StringInterner, id: TypeId, facts: TypeFacts) -> TypeId {
    let g = *table.globals();
    if matches!(table.kind(id), TypeKind::Any) {
        return id;
    }
    let mut kept = Vec::new();
    let mut changed = false;
    for member in table.members(id) {
        let parts = if member == g.boolean {
            vec![g.true_type, g.false_type]
        } else {
            vec![member]
        };
        for part in parts {
            if type_facts(table, interner, part).intersects(facts) {
                kept.push(part);
            } else {
                changed = true;
            }
        }
    }
    if !changed {
        return id;
    }
    table.union(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falsy_literals() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let zero = table.number_literal(0.0);
        let nan = table.number_literal(f64::NAN);
        let empty = table.string_literal(interner.intern(""));
        let zero_n = table.bigint_literal(interner.intern("0x00"));
        for falsy in [zero, nan, empty, zero_n] {
            let facts = type_facts(&table, &interner, falsy);
            assert!(facts.contains(TypeFacts::FALSY));
            assert!(!facts.contains(TypeFacts::TRUTHY));
        }
        let one = table.number_literal(1.0);
        assert!(!type_facts(&table, &interner, one).contains(TypeFacts::FALSY));
    }

    #[test]
    fn test_truthiness_removes_nullish() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let nullable = table.union([g.string, g.null, g.undefined]);
        assert_eq!(filter_type(&mut table, &interner, nullable, TypeFacts::TRUTHY), g.string);
        assert_eq!(filter_type(&mut table, &interner, g.boolean, TypeFacts::TRUTHY), g.true_type);
        assert_eq!(filter_type(&mut table, &interner, g.boolean, TypeFacts::FALSY), g.false_type);
    }

    #[test]
    fn test_typeof_facts() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let union = table.union([g.string, g.number]);
        let number = TypeFacts::for_typeof("number", true).unwrap();
        let not_number = TypeFacts::for_typeof("number", false).unwrap();
        assert_eq!(filter_type(&mut table, &interner, union, number), g.number);
        assert_eq!(filter_type(&mut table, &interner, union, not_number), g.string);
        assert!(TypeFacts::for_typeof("integer", true).is_none());
    }

    #[test]
    fn test_null_checks() {
        let interner = StringInterner::new();
        let mut table = TypeTable::new();
        let g = *table.globals();
        let nullable = table.union([g.number, g.null]);
        assert_eq!(filter_type(&mut table, &interner, nullable, TypeFacts::NE_NULL), g.number);
        assert_eq!(filter_type(&mut table, &interner, nullable, TypeFacts::EQ_NULL), g.null);
        assert_eq!(filter_type(&mut table, &interner, g.any, TypeFacts::EQ_NULL), g.any);
    }
}
